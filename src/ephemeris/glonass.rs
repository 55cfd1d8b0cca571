use nalgebra::{Vector3, Vector6};

use crate::{
    constants::{
        Constants, DAY_SECONDS, GM, MAX_GLONASS_STEPS, MIN_GLONASS_STEP_S, Omega, PZ90,
    },
    ephemeris::{
        check::{seconds_of_day, Checker, Issue},
        timescale, ClockPolynomial, RawEphemeris, DEFAULT_GLONASS_STEP_S,
    },
    error::Error,
    prelude::{Epoch, SV},
};

use hifitime::Unit;
use log::warn;

/// GLONASS state vector message
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlonassEphemeris {
    pub sv: SV,
    /// Clock model `-tau_n + gamma_n dt`
    pub clock: ClockPolynomial,
    /// Message frame time
    pub tot: Epoch,
    /// PZ-90 position at ToC (m)
    pub position: Vector3<f64>,
    /// PZ-90 velocity at ToC (m.s⁻¹)
    pub velocity: Vector3<f64>,
    /// Luni-solar acceleration (m.s⁻²)
    pub acceleration: Vector3<f64>,
    pub health: u32,
    /// Frequency channel
    pub channel: i8,
    /// Age of operational information (days)
    pub age_days: u32,
}

impl GlonassEphemeris {
    pub(crate) fn decode(raw: &RawEphemeris, checker: &mut Checker) -> Result<Self, Error> {
        let sv = raw.sv;
        let ts = timescale(sv)?;
        let toc = raw.toc.to_time_scale(ts);

        // tk is in seconds of (UTC) day or week: keep the nearest day
        let tk_sod = raw.slot(2).rem_euclid(DAY_SECONDS);
        let mut dt = tk_sod - seconds_of_day(toc);
        if dt > DAY_SECONDS / 2.0 {
            dt -= DAY_SECONDS;
        } else if dt <= -DAY_SECONDS / 2.0 {
            dt += DAY_SECONDS;
        }

        let channel = raw.slot(10);
        if !(-7.0..=6.0).contains(&channel) {
            checker.push(Issue::FrequencyChannel(channel));
        }

        Ok(Self {
            sv,
            clock: ClockPolynomial::linear(toc, raw.slot(0), raw.slot(1)),
            tot: toc + dt * Unit::Second,
            position: Vector3::new(raw.slot(3), raw.slot(7), raw.slot(11)),
            velocity: Vector3::new(raw.slot(4), raw.slot(8), raw.slot(12)),
            acceleration: Vector3::new(raw.slot(5), raw.slot(9), raw.slot(13)),
            health: raw.slot_u32(6),
            channel: channel.round().clamp(-128.0, 127.0) as i8,
            age_days: raw.slot_u32(14),
        })
    }

    pub(crate) fn self_check(&self, checker: &mut Checker) {
        checker.radius(self.position.norm(), Constants::GLONASS_RADIUS_RANGE_M);
    }

    /// Issue of Data: index of the 15' interval (Moscow time) within the day
    pub fn iod(&self) -> u32 {
        let sod_msk = (seconds_of_day(self.clock.toc) + 10_800.0).rem_euclid(DAY_SECONDS);
        (sod_msk / 900.0).round() as u32
    }

    /// Numerical integration of the equations of motion from ToC to `t`,
    /// using fixed step RK4, steps being at most `max_step_s` long.
    /// Steps are never shorter than [MIN_GLONASS_STEP_S], a non positive
    /// `max_step_s` selects [DEFAULT_GLONASS_STEP_S], and the number of
    /// steps is capped to [MAX_GLONASS_STEPS].
    pub(crate) fn position_velocity(&self, t: Epoch, max_step_s: f64) -> (Vector3<f64>, Vector3<f64>) {
        let dt = (t - self.clock.toc).to_seconds();

        let step_s = if max_step_s > 0.0 {
            max_step_s.max(MIN_GLONASS_STEP_S)
        } else {
            warn!("{}({}) - invalid integration step {}s", t, self.sv, max_step_s);
            DEFAULT_GLONASS_STEP_S
        };

        let mut state = Vector6::new(
            self.position[0],
            self.position[1],
            self.position[2],
            self.velocity[0],
            self.velocity[1],
            self.velocity[2],
        );

        if dt != 0.0 {
            let n = (dt.abs() / step_s).ceil().clamp(1.0, MAX_GLONASS_STEPS as f64);
            let h = dt / n;
            for _ in 0..n as usize {
                state = rk4_step(&state, &self.acceleration, h);
            }
        }

        (
            Vector3::new(state[0], state[1], state[2]),
            Vector3::new(state[3], state[4], state[5]),
        )
    }
}

/// PZ-90 equations of motion, in the rotating frame, with J2
/// and constant luni-solar acceleration.
fn derivatives(state: &Vector6<f64>, acc: &Vector3<f64>) -> Vector6<f64> {
    let (x, y, z) = (state[0], state[1], state[2]);
    let (vx, vy, vz) = (state[3], state[4], state[5]);

    let r2 = x.powi(2) + y.powi(2) + z.powi(2);
    let r = r2.sqrt();
    let r3 = r2 * r;
    let r5 = r3 * r2;

    let mu = GM::GLO;
    let omega = Omega::GLO;
    let omega2 = omega.powi(2);

    let j2_term = 1.5 * PZ90::J2 * mu * PZ90::AE_M.powi(2) / r5;
    let z2_r2 = 5.0 * z.powi(2) / r2;

    let ax = -mu / r3 * x - j2_term * x * (1.0 - z2_r2) + omega2 * x + 2.0 * omega * vy + acc[0];
    let ay = -mu / r3 * y - j2_term * y * (1.0 - z2_r2) + omega2 * y - 2.0 * omega * vx + acc[1];
    let az = -mu / r3 * z - j2_term * z * (3.0 - z2_r2) + acc[2];

    Vector6::new(vx, vy, vz, ax, ay, az)
}

fn rk4_step(state: &Vector6<f64>, acc: &Vector3<f64>, h: f64) -> Vector6<f64> {
    let k1 = derivatives(state, acc);
    let k2 = derivatives(&(state + k1 * (h / 2.0)), acc);
    let k3 = derivatives(&(state + k2 * (h / 2.0)), acc);
    let k4 = derivatives(&(state + k3 * h), acc);
    state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0)
}
