use nalgebra::Vector3;

use crate::{
    constants::Constants,
    ephemeris::{
        check::{seconds_of_week, Checker},
        timescale, ClockPolynomial, RawEphemeris,
    },
    error::Error,
    prelude::{Epoch, SV},
};

/// SBAS (GEO) state vector message
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SbasEphemeris {
    pub sv: SV,
    pub clock: ClockPolynomial,
    pub tot: Epoch,
    /// Position at ToC (m)
    pub position: Vector3<f64>,
    /// Velocity at ToC (m.s⁻¹)
    pub velocity: Vector3<f64>,
    /// Acceleration (m.s⁻²)
    pub acceleration: Vector3<f64>,
    pub health: u32,
    /// User Range Accuracy (m)
    pub ura_m: f64,
    /// Issue of Data, Navigation
    pub iodn: u32,
}

impl SbasEphemeris {
    pub(crate) fn decode(raw: &RawEphemeris, checker: &mut Checker) -> Result<Self, Error> {
        let sv = raw.sv;
        let ts = timescale(sv)?;
        let toc = raw.toc.to_time_scale(ts);

        checker.issue_of_data(raw.slot(14), 255.0);

        Ok(Self {
            sv,
            clock: ClockPolynomial::linear(toc, raw.slot(0), raw.slot(1)),
            tot: raw.transmission_time(2, seconds_of_week(toc)),
            position: Vector3::new(raw.slot(3), raw.slot(7), raw.slot(11)),
            velocity: Vector3::new(raw.slot(4), raw.slot(8), raw.slot(12)),
            acceleration: Vector3::new(raw.slot(5), raw.slot(9), raw.slot(13)),
            health: raw.slot_u32(6),
            ura_m: raw.slot(10),
            iodn: raw.slot_u32(14),
        })
    }

    pub(crate) fn self_check(&self, checker: &mut Checker) {
        checker.radius(self.position.norm(), Constants::SBAS_RADIUS_RANGE_M);
    }

    /// Quadratic propagation of the state vector
    pub(crate) fn position_velocity(&self, t: Epoch) -> (Vector3<f64>, Vector3<f64>) {
        let dt = (t - self.clock.toc).to_seconds();
        let position = self.position + self.velocity * dt + self.acceleration * (0.5 * dt.powi(2));
        let velocity = self.velocity + self.acceleration * dt;
        (position, velocity)
    }
}
