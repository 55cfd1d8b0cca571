use nalgebra::Vector3;

use crate::{
    ephemeris::{
        check::{seconds_of_week, Checker},
        timescale, ClockPolynomial, Keplerian, RawEphemeris,
    },
    error::Error,
    prelude::{Epoch, TimeScale, SV},
};

/// IRNSS (NavIC) ephemeris
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IrnssEphemeris {
    pub sv: SV,
    pub kepler: Keplerian,
    pub clock: ClockPolynomial,
    pub tot: Epoch,
    /// Issue of Data, Ephemeris and Clock
    pub iodec: u32,
    pub health: u32,
    /// User Range Accuracy (m)
    pub ura_m: f64,
    /// Group delay (s)
    pub tgd: f64,
}

impl IrnssEphemeris {
    pub(crate) fn decode(raw: &RawEphemeris, checker: &mut Checker) -> Result<Self, Error> {
        let sv = raw.sv;
        // IRN week is aligned to GPS week
        let week = raw.week()?;
        let ts = timescale(sv)?;

        let toc = raw.toc.to_time_scale(ts);
        let kepler = Keplerian::from_raw(raw, week, TimeScale::GPST, ts)?;

        checker.issue_of_data(raw.slot(3), 255.0);

        let mut tgd = raw.slot(25);
        checker.group_delay(sv, &mut tgd);

        Ok(Self {
            sv,
            kepler,
            clock: ClockPolynomial::new(toc, raw.slot(0), raw.slot(1), raw.slot(2)),
            tot: raw.transmission_time(27, seconds_of_week(toc)),
            iodec: raw.slot_u32(3),
            health: raw.slot_u32(24),
            ura_m: raw.slot(23),
            tgd,
        })
    }

    pub(crate) fn position_velocity(&self, t: Epoch) -> (Vector3<f64>, Vector3<f64>) {
        let state = self.kepler.resolve(self.sv, t, false);
        (state.position, state.velocity)
    }
}
