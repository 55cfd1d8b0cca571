use std::sync::Arc;

use hifitime::Unit;
use log::debug;

use crate::{
    cfg::BroadcastConfig,
    constants::Constants,
    ephemeris::{check::seconds_of_day, Ephemeris},
    error::Error,
    prelude::{Constellation, Epoch, SV},
};

/// Galileo records are only used 10' after ToE
const GALILEO_TOE_OFFSET_S: f64 = 600.0;

/// Maximal number of records we step over when correcting the candidate
const MAX_SCAN: usize = 5;

/// Record selection over one satellite's time ordered records.
pub(crate) struct Selection<'a> {
    pub cfg: &'a BroadcastConfig,
    pub health_mask: bool,
}

impl<'a> Selection<'a> {
    pub fn new(cfg: &'a BroadcastConfig, health_mask: bool) -> Self {
        Self { cfg, health_mask }
    }

    /// Selects the record to use at `t`. `records` is sorted by epoch.
    pub fn find<'r>(
        &self,
        sv: SV,
        records: &'r [Arc<Ephemeris>],
        t: Epoch,
    ) -> Result<&'r Arc<Ephemeris>, Error> {
        if records.is_empty() {
            return Err(Error::NoEphemeris(sv, t));
        }

        let max_validity_s = Constants::max_validity_s(sv.constellation);

        // first record at or after t, last one otherwise
        let mut idx = records.partition_point(|eph| eph.epoch() < t);
        if idx == records.len() {
            idx -= 1;
        }

        idx = match sv.constellation {
            Constellation::Galileo => {
                self.backward_scan(records, idx, t, GALILEO_TOE_OFFSET_S, max_validity_s)
            },
            Constellation::BeiDou => self.backward_scan(records, idx, t, 0.0, max_validity_s),
            Constellation::Glonass => Self::nearest(records, idx, t),
            _ => self.regular(records, idx, t),
        };

        if sv.constellation == Constellation::Galileo {
            idx = self.galileo_preference(records, idx);
        }

        let candidate = &records[idx];

        if (t - candidate.epoch()).abs().to_seconds() > max_validity_s {
            debug!("{}({}) - no ephemeris within {}s", t, sv, max_validity_s);
            return Err(Error::NoEphemeris(sv, t));
        }

        if self.cfg.check_tot && candidate.tot() > t {
            debug!("{}({}) - ephemeris not transmitted yet", t, sv);
            return Err(Error::NoEphemeris(sv, t));
        }

        if self.health_mask && !candidate.healthy() {
            debug!("{}({}) - unhealthy", t, sv);
            return Err(Error::Unhealthy(sv, t));
        }

        Ok(candidate)
    }

    /// Galileo and BeiDou: the candidate must verify `toe + offset <= t <= toe + max`.
    /// Otherwise, we look backwards for a record that was already transmitted.
    fn backward_scan(
        &self,
        records: &[Arc<Ephemeris>],
        idx: usize,
        t: Epoch,
        offset_s: f64,
        max_validity_s: f64,
    ) -> usize {
        let within = |eph: &Ephemeris| {
            let toe = eph.toe();
            t >= toe + offset_s * Unit::Second && t <= toe + max_validity_s * Unit::Second
        };

        if within(&records[idx]) {
            return idx;
        }

        if self.cfg.check_tot {
            for k in 1..=MAX_SCAN.min(idx) {
                if records[idx - k].tot() <= t {
                    return idx - k;
                }
            }
            idx
        } else if idx > 0 && records[idx].epoch() > t {
            idx - 1
        } else {
            idx
        }
    }

    /// GLONASS: records are narrow snapshots, we simply keep the closest one.
    fn nearest(records: &[Arc<Ephemeris>], idx: usize, t: Epoch) -> usize {
        if idx == 0 {
            return idx;
        }
        let after = (records[idx].epoch() - t).abs();
        let before = (t - records[idx - 1].epoch()).abs();
        if before <= after {
            idx - 1
        } else {
            idx
        }
    }

    /// GPS, QZSS, IRNSS and SBAS.
    fn regular(&self, records: &[Arc<Ephemeris>], idx: usize, t: Epoch) -> usize {
        let candidate = &records[idx];

        if self.cfg.check_tot && candidate.tot() > t {
            // off the hourly grid: continuous upload, look forward
            let sod = seconds_of_day(candidate.epoch());
            if sod.rem_euclid(3600.0) != 0.0 {
                let end = (idx + MAX_SCAN).min(records.len() - 1);
                for j in idx + 1..=end {
                    if records[j].tot() <= t {
                        return j;
                    }
                }
            }
        }

        if idx > 0 && candidate.epoch() > t {
            let previous = &records[idx - 1];
            let not_transmitted = self.cfg.check_tot && candidate.tot() > t;
            let closer = (t - previous.epoch()) < (candidate.epoch() - t);
            if not_transmitted || closer {
                return idx - 1;
            }
        }

        idx
    }

    /// Several Galileo records may share the same epoch:
    /// retain the preferred message source, if any.
    fn galileo_preference(&self, records: &[Arc<Ephemeris>], idx: usize) -> usize {
        let Some(preferred) = self.cfg.galileo_source else {
            return idx;
        };

        let epoch = records[idx].epoch();
        let start = records.partition_point(|eph| eph.epoch() < epoch);

        records[start..]
            .iter()
            .take_while(|eph| eph.epoch() == epoch)
            .position(|eph| eph.galileo_source() == Some(preferred))
            .map(|offset| start + offset)
            .unwrap_or(idx)
    }

    /// Record that carries this issue of data, and is valid at `t`
    pub fn find_iod<'r>(
        &self,
        sv: SV,
        records: &'r [Arc<Ephemeris>],
        iod: u32,
        t: Epoch,
    ) -> Result<&'r Arc<Ephemeris>, Error> {
        records
            .iter()
            .rev()
            .filter(|eph| eph.iod() == iod && eph.is_valid_at(t))
            .find(|eph| !self.health_mask || eph.healthy())
            .ok_or(Error::NoEphemeris(sv, t))
    }
}
