use nalgebra::Vector3;

use crate::{
    cfg::GalileoSource,
    ephemeris::{
        check::{seconds_of_week, Checker},
        timescale, ClockPolynomial, Keplerian, RawEphemeris,
    },
    error::Error,
    prelude::{Epoch, TimeScale, SV},
};

/// Galileo I/NAV or F/NAV ephemeris
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GalileoEphemeris {
    pub sv: SV,
    pub kepler: Keplerian,
    pub clock: ClockPolynomial,
    pub tot: Epoch,
    /// Issue of Data of the navigation batch
    pub iodnav: u32,
    /// Data sources bitmask
    pub data_sources: u32,
    /// SV health bitmask
    pub health: u32,
    /// Signal In Space Accuracy (m)
    pub sisa_m: f64,
    /// E5a/E1 broadcast group delay (s)
    pub bgd_e5a_e1: f64,
    /// E5b/E1 broadcast group delay (s)
    pub bgd_e5b_e1: f64,
}

impl GalileoEphemeris {
    pub(crate) fn decode(raw: &RawEphemeris, checker: &mut Checker) -> Result<Self, Error> {
        let sv = raw.sv;
        // GAL week is aligned to GPS week
        let week = raw.week()?;
        let ts = timescale(sv)?;

        let toc = raw.toc.to_time_scale(ts);
        let kepler = Keplerian::from_raw(raw, week, TimeScale::GPST, ts)?;

        checker.issue_of_data(raw.slot(3), 1023.0);

        let mut bgd_e5a_e1 = raw.slot(25);
        checker.group_delay(sv, &mut bgd_e5a_e1);

        let mut bgd_e5b_e1 = raw.slot(26);
        checker.group_delay(sv, &mut bgd_e5b_e1);

        Ok(Self {
            sv,
            kepler,
            clock: ClockPolynomial::new(toc, raw.slot(0), raw.slot(1), raw.slot(2)),
            tot: raw.transmission_time(27, seconds_of_week(toc)),
            iodnav: raw.slot_u32(3),
            data_sources: raw.slot_u32(20),
            health: raw.slot_u32(24),
            sisa_m: raw.slot(23),
            bgd_e5a_e1,
            bgd_e5b_e1,
        })
    }

    /// Navigation message this record was decoded from
    pub fn source(&self) -> Option<GalileoSource> {
        GalileoSource::from_data_sources(self.data_sources)
    }

    pub(crate) fn position_velocity(&self, t: Epoch) -> (Vector3<f64>, Vector3<f64>) {
        let state = self.kepler.resolve(self.sv, t, false);
        (state.position, state.velocity)
    }
}
