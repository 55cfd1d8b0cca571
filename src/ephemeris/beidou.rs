use nalgebra::Vector3;

use crate::{
    ephemeris::{
        check::{seconds_of_week, Checker},
        timescale, ClockPolynomial, Keplerian, RawEphemeris,
    },
    error::Error,
    prelude::{Epoch, TimeScale, SV},
};

/// BeiDou D1/D2 ephemeris
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BeiDouEphemeris {
    pub sv: SV,
    pub kepler: Keplerian,
    pub clock: ClockPolynomial,
    pub tot: Epoch,
    /// Age of Data, Ephemeris
    pub aode: u32,
    /// Age of Data, Clock
    pub aodc: u32,
    /// Autonomous satellite health (SatH1)
    pub health: u32,
    /// User Range Accuracy (m)
    pub ura_m: f64,
    /// B1/B3 group delay (s)
    pub tgd1: f64,
    /// B2/B3 group delay (s)
    pub tgd2: f64,
}

impl BeiDouEphemeris {
    pub(crate) fn decode(raw: &RawEphemeris, checker: &mut Checker) -> Result<Self, Error> {
        let sv = raw.sv;
        let week = raw.week()?;
        let ts = timescale(sv)?;

        let toc = raw.toc.to_time_scale(ts);
        let kepler = Keplerian::from_raw(raw, week, TimeScale::BDT, ts)?;

        checker.issue_of_data(raw.slot(3), 255.0);
        checker.issue_of_data(raw.slot(28), 255.0);

        let mut tgd1 = raw.slot(25);
        checker.group_delay(sv, &mut tgd1);

        let mut tgd2 = raw.slot(26);
        checker.group_delay(sv, &mut tgd2);

        Ok(Self {
            sv,
            kepler,
            clock: ClockPolynomial::new(toc, raw.slot(0), raw.slot(1), raw.slot(2)),
            tot: raw.transmission_time(27, seconds_of_week(toc)),
            aode: raw.slot_u32(3),
            aodc: raw.slot_u32(28),
            health: raw.slot_u32(24),
            ura_m: raw.slot(23),
            tgd1,
            tgd2,
        })
    }

    /// GEO vehicles (PRN 1..5 and 59+) use a dedicated frame rotation
    pub fn is_geo(&self) -> bool {
        self.sv.prn <= 5 || self.sv.prn >= 59
    }

    /// Issue of Data, derived from ToC. AODE is not an identifier,
    /// this mirrors what SSR producers use.
    pub fn iod(&self) -> u32 {
        let toc_sow = seconds_of_week(self.clock.toc);
        ((toc_sow / 720.0).floor() as u32) % 240
    }

    pub(crate) fn position_velocity(&self, t: Epoch) -> (Vector3<f64>, Vector3<f64>) {
        let state = self.kepler.resolve(self.sv, t, self.is_geo());
        (state.position, state.velocity)
    }
}
