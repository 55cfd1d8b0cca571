use nalgebra::Vector3;

use crate::{
    ephemeris::{
        check::{seconds_of_week, Checker},
        timescale, ClockPolynomial, Keplerian, RawEphemeris,
    },
    error::Error,
    prelude::{Epoch, TimeScale, SV},
};

/// QZSS LNAV ephemeris. Same layout as GPS, but QZSS uploads
/// are more frequent and IODC is not tied to IODE.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QzssEphemeris {
    pub sv: SV,
    pub kepler: Keplerian,
    pub clock: ClockPolynomial,
    pub tot: Epoch,
    pub iode: u32,
    pub iodc: u32,
    pub health: u32,
    /// User Range Accuracy (m)
    pub ura_m: f64,
    /// L1/L2 group delay (s)
    pub tgd: f64,
    /// Fit interval flag
    pub fit_interval: f64,
}

impl QzssEphemeris {
    pub(crate) fn decode(raw: &RawEphemeris, checker: &mut Checker) -> Result<Self, Error> {
        let sv = raw.sv;
        let week = raw.week()?;
        let ts = timescale(sv)?;

        let toc = raw.toc.to_time_scale(ts);
        let kepler = Keplerian::from_raw(raw, week, TimeScale::GPST, ts)?;

        checker.issue_of_data(raw.slot(3), 255.0);
        checker.issue_of_data(raw.slot(26), 1023.0);

        let mut tgd = raw.slot(25);
        checker.group_delay(sv, &mut tgd);

        Ok(Self {
            sv,
            kepler,
            clock: ClockPolynomial::new(toc, raw.slot(0), raw.slot(1), raw.slot(2)),
            tot: raw.transmission_time(27, seconds_of_week(toc)),
            iode: raw.slot_u32(3),
            iodc: raw.slot_u32(26),
            health: raw.slot_u32(24),
            ura_m: raw.slot(23),
            tgd,
            fit_interval: raw.slot(28),
        })
    }

    pub(crate) fn position_velocity(&self, t: Epoch) -> (Vector3<f64>, Vector3<f64>) {
        let state = self.kepler.resolve(self.sv, t, false);
        (state.position, state.velocity)
    }
}
