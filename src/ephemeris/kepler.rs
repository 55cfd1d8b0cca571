use log::warn;
use nalgebra::{Matrix3, Vector3};

use crate::{
    constants::{Constants, HALF_WEEK_SECONDS, KEPLER_CONVERGENCE_M, MAX_KEPLER_ITER, WEEK_SECONDS},
    ephemeris::RawEphemeris,
    error::Error,
    prelude::{Epoch, TimeScale, SV},
};

/// BeiDou GEO orbital plane inclination (rad)
const BDS_GEO_INCLINATION_RAD: f64 = -5.0 * std::f64::consts::PI / 180.0;

/// Folds a time difference within (-302400, 302400] seconds,
/// to absorb week rollovers.
pub(crate) fn fold_half_week(dt_s: f64) -> f64 {
    if dt_s > -HALF_WEEK_SECONDS && dt_s <= HALF_WEEK_SECONDS {
        return dt_s;
    }
    let folded = (dt_s + HALF_WEEK_SECONDS).rem_euclid(WEEK_SECONDS) - HALF_WEEK_SECONDS;
    if folded <= -HALF_WEEK_SECONDS {
        folded + WEEK_SECONDS
    } else {
        folded
    }
}

/// Keplerian elements shared by GPS, Galileo, BeiDou, QZSS and IRNSS.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Keplerian {
    /// Time of Ephemeris, expressed in the constellation timescale
    pub toe: Epoch,
    /// Time of Ephemeris, in seconds of week
    pub toe_sow: f64,
    /// Square root of semi major axis (m^1/2)
    pub sqrt_a: f64,
    /// Eccentricity
    pub e: f64,
    /// Mean anomaly at reference time (rad)
    pub m0: f64,
    /// Mean motion difference (rad.s⁻¹)
    pub dn: f64,
    /// Inclination at reference time (rad)
    pub i0: f64,
    /// Inclination rate (rad.s⁻¹)
    pub idot: f64,
    /// Longitude of ascending node at weekly epoch (rad)
    pub omega0: f64,
    /// Rate of right ascension (rad.s⁻¹)
    pub omega_dot: f64,
    /// Argument of perigee (rad)
    pub omega: f64,
    /// Harmonic corrections to the argument of latitude (rad)
    pub cuc: f64,
    pub cus: f64,
    /// Harmonic corrections to the orbit radius (m)
    pub crc: f64,
    pub crs: f64,
    /// Harmonic corrections to the inclination (rad)
    pub cic: f64,
    pub cis: f64,
}

/// Solved Kepler state, in ECEF
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct KeplerState {
    /// Position (m)
    pub position: Vector3<f64>,
    /// Velocity (m.s⁻¹)
    pub velocity: Vector3<f64>,
}

impl Keplerian {
    /// Decodes the Keplerian slots (#4 to #19) of a [RawEphemeris].
    /// `week` is counted in `week_ts`, ToE is expressed in `ts`.
    /// ToE must lie within half a week of ToC.
    pub(crate) fn from_raw(
        raw: &RawEphemeris,
        week: u32,
        week_ts: TimeScale,
        ts: TimeScale,
    ) -> Result<Self, Error> {
        let toe_sow = raw.slot(11);
        if !(0.0..WEEK_SECONDS).contains(&toe_sow) {
            return Err(Error::InvalidField(11));
        }

        let (toc_week, _) = raw.toc.to_time_scale(week_ts).to_time_of_week();
        if week.abs_diff(toc_week) > 1 {
            return Err(Error::InvalidWeek(raw.slot(21)));
        }

        let toe = Epoch::from_time_of_week(week, (toe_sow * 1.0E9).round() as u64, week_ts)
            .to_time_scale(ts);

        if (toe - raw.toc).abs().to_seconds() > HALF_WEEK_SECONDS {
            return Err(Error::InvalidWeek(raw.slot(21)));
        }

        Ok(Self {
            toe,
            toe_sow,
            crs: raw.slot(4),
            dn: raw.slot(5),
            m0: raw.slot(6),
            cuc: raw.slot(7),
            e: raw.slot(8),
            cus: raw.slot(9),
            sqrt_a: raw.slot(10),
            cic: raw.slot(12),
            omega0: raw.slot(13),
            cis: raw.slot(14),
            i0: raw.slot(15),
            crc: raw.slot(16),
            omega: raw.slot(17),
            omega_dot: raw.slot(18),
            idot: raw.slot(19),
        })
    }

    /// Semi major axis (m)
    pub fn semi_major_axis_m(&self) -> f64 {
        self.sqrt_a.powi(2)
    }

    /// Elapsed time since ToE, folded to half a week
    pub(crate) fn t_k(&self, t: Epoch) -> f64 {
        fold_half_week((t - self.toe).to_seconds())
    }

    /// Solves Kepler's equation `E = M + e sin(E)` by fixed point iteration,
    /// seeded with the mean anomaly. Returns (E, Edot).
    pub(crate) fn eccentric_anomaly(&self, sv: SV, t: Epoch) -> (f64, f64) {
        let a = self.semi_major_axis_m();
        let gm = Constants::gm(sv);

        let t_k = self.t_k(t);
        let n0 = (gm / a.powi(3)).sqrt();
        let n = n0 + self.dn;
        let m_k = self.m0 + n * t_k;

        let mut e_k = m_k;
        let mut converged = false;

        for _ in 0..MAX_KEPLER_ITER {
            let e_next = m_k + self.e * e_k.sin();
            let delta = (e_next - e_k).abs();
            e_k = e_next;
            if delta * a < KEPLER_CONVERGENCE_M {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!("{}({}) - kepler solver did not converge", t, sv);
        }

        let e_dot = n / (1.0 - self.e * e_k.cos());
        (e_k, e_dot)
    }

    /// Resolves the ECEF state at `t`, with analytical velocity.
    /// `geo` selects the BeiDou GEO frame transformation.
    pub(crate) fn resolve(&self, sv: SV, t: Epoch, geo: bool) -> KeplerState {
        let omega_e = Constants::omega(sv);
        let a = self.semi_major_axis_m();
        let e = self.e;
        let t_k = self.t_k(t);

        let (e_k, e_dot) = self.eccentric_anomaly(sv, t);
        let (sin_e, cos_e) = e_k.sin_cos();

        let sqrt_1_e2 = (1.0 - e.powi(2)).sqrt();
        let v_k = (sqrt_1_e2 * sin_e).atan2(cos_e - e);
        let v_dot = sqrt_1_e2 * e_dot / (1.0 - e * cos_e);

        let phi = v_k + self.omega;
        let (sin_2phi, cos_2phi) = (2.0 * phi).sin_cos();

        let u_k = phi + self.cuc * cos_2phi + self.cus * sin_2phi;
        let r_k = a * (1.0 - e * cos_e) + self.crc * cos_2phi + self.crs * sin_2phi;
        let i_k = self.i0 + self.idot * t_k + self.cic * cos_2phi + self.cis * sin_2phi;

        let u_dot = v_dot * (1.0 + 2.0 * (self.cus * cos_2phi - self.cuc * sin_2phi));
        let r_dot = a * e * sin_e * e_dot + 2.0 * v_dot * (self.crs * cos_2phi - self.crc * sin_2phi);
        let i_dot = self.idot + 2.0 * v_dot * (self.cis * cos_2phi - self.cic * sin_2phi);

        let (sin_u, cos_u) = u_k.sin_cos();
        let (x_p, y_p) = (r_k * cos_u, r_k * sin_u);
        let x_p_dot = r_dot * cos_u - r_k * u_dot * sin_u;
        let y_p_dot = r_dot * sin_u + r_k * u_dot * cos_u;

        // GEO: inertial node, rotated afterwards
        let (omega_k, omega_k_dot) = if geo {
            (
                self.omega0 + self.omega_dot * t_k - omega_e * self.toe_sow,
                self.omega_dot,
            )
        } else {
            (
                self.omega0 + (self.omega_dot - omega_e) * t_k - omega_e * self.toe_sow,
                self.omega_dot - omega_e,
            )
        };

        let (sin_o, cos_o) = omega_k.sin_cos();
        let (sin_i, cos_i) = i_k.sin_cos();

        let x = x_p * cos_o - y_p * cos_i * sin_o;
        let y = x_p * sin_o + y_p * cos_i * cos_o;
        let z = y_p * sin_i;

        let vx = x_p_dot * cos_o - y_p_dot * cos_i * sin_o + y_p * sin_i * i_dot * sin_o
            - omega_k_dot * y;
        let vy = x_p_dot * sin_o + y_p_dot * cos_i * cos_o - y_p * sin_i * i_dot * cos_o
            + omega_k_dot * x;
        let vz = y_p_dot * sin_i + y_p * cos_i * i_dot;

        let position = Vector3::new(x, y, z);
        let velocity = Vector3::new(vx, vy, vz);

        if !geo {
            return KeplerState { position, velocity };
        }

        let (sin_f, cos_f) = BDS_GEO_INCLINATION_RAD.sin_cos();
        let rx = Matrix3::new(1.0, 0.0, 0.0, 0.0, cos_f, sin_f, 0.0, -sin_f, cos_f);

        let (sin_z, cos_z) = (omega_e * t_k).sin_cos();
        let rz = Matrix3::new(cos_z, sin_z, 0.0, -sin_z, cos_z, 0.0, 0.0, 0.0, 1.0);
        let rz_dot = Matrix3::new(-sin_z, cos_z, 0.0, -cos_z, -sin_z, 0.0, 0.0, 0.0, 0.0) * omega_e;

        let rx_g = rx * position;

        KeplerState {
            position: rz * rx_g,
            velocity: rz_dot * rx_g + rz * rx * velocity,
        }
    }

    /// Relativistic clock correction (s), `F e sqrt(A) sin(E)`.
    pub(crate) fn relativistic_correction(&self, sv: SV, t: Epoch) -> f64 {
        let (e_k, _) = self.eccentric_anomaly(sv, t);
        Constants::dtr_f(sv) * self.e * self.sqrt_a * e_k.sin()
    }
}
