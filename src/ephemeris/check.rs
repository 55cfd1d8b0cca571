use log::warn;

use crate::{
    constants::Constants,
    prelude::{Constellation, Epoch, TimeScale, SV},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// [Issue]s raised by the record self check
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Issue {
    /// |ToT - ToC| (s) exceeds the constellation limit
    TransmissionTime(f64),
    /// Issue of Data out of range
    IssueOfData(f64),
    /// GPS IODE does not match the 8 LSB of IODC
    IodMismatch { iode: u32, iodc: u32 },
    /// Implausible semi major axis (m)
    SemiMajorAxis(f64),
    /// Eccentricity outside [0, 1[
    Eccentricity(f64),
    /// Implausible state vector radius (m)
    OrbitRadius(f64),
    /// Group delay (s) too large, even after rescaling
    GroupDelay(f64),
    /// Group delay (s) was scaled by 1E-10: producer specific unit issue.
    /// This one is not fatal.
    GroupDelayRescaled(f64),
    /// Clock epoch is not aligned to the constellation grid,
    /// offset (s) into the grid.
    EpochGrid(f64),
    /// GLONASS frequency channel out of range
    FrequencyChannel(f64),
}

impl Issue {
    /// Fatal [Issue]s cause the record to be rejected
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::GroupDelayRescaled(_))
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::TransmissionTime(dt) => write!(f, "|tot-toc|={}s", dt),
            Self::IssueOfData(iod) => write!(f, "iod={} out of range", iod),
            Self::IodMismatch { iode, iodc } => write!(f, "iode={} iodc={}", iode, iodc),
            Self::SemiMajorAxis(a) => write!(f, "semi major axis {}m", a),
            Self::Eccentricity(e) => write!(f, "eccentricity {}", e),
            Self::OrbitRadius(r) => write!(f, "orbit radius {}m", r),
            Self::GroupDelay(tgd) => write!(f, "group delay {}s", tgd),
            Self::GroupDelayRescaled(tgd) => write!(f, "group delay rescaled to {}s", tgd),
            Self::EpochGrid(dt) => write!(f, "off grid by {}s", dt),
            Self::FrequencyChannel(k) => write!(f, "frequency channel {}", k),
        }
    }
}

/// Accumulates [Issue]s while checking one record
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Checker {
    pub issues: Vec<Issue>,
}

impl Checker {
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn is_fatal(&self) -> bool {
        self.issues.iter().any(|issue| issue.is_fatal())
    }

    /// |tot - toc| within constellation limit
    pub fn transmission_time(&mut self, sv: SV, tot: Epoch, toc: Epoch) {
        let dt = (tot - toc).to_seconds().abs();
        if dt > Constants::max_tot_toc_s(sv.constellation) {
            self.push(Issue::TransmissionTime(dt));
        }
    }

    /// Issue of data within [0, max]
    pub fn issue_of_data(&mut self, iod: f64, max: f64) {
        if !(0.0..=max).contains(&iod) || iod.fract() != 0.0 {
            self.push(Issue::IssueOfData(iod));
        }
    }

    pub fn semi_major_axis(&mut self, a_m: f64) {
        let (min, max) = Constants::SEMI_MAJOR_AXIS_RANGE_M;
        if !(min..=max).contains(&a_m) {
            self.push(Issue::SemiMajorAxis(a_m));
        }
    }

    pub fn eccentricity(&mut self, e: f64) {
        if !(0.0..1.0).contains(&e) {
            self.push(Issue::Eccentricity(e));
        }
    }

    pub fn radius(&mut self, r_m: f64, range: (f64, f64)) {
        if !(range.0..=range.1).contains(&r_m) {
            self.push(Issue::OrbitRadius(r_m));
        }
    }

    /// Some producers write group delays in 1E-10 s units.
    /// Rescales the value when this pattern is detected, then verifies the magnitude.
    pub fn group_delay(&mut self, sv: SV, tgd: &mut f64) {
        if tgd.abs() > 1.0 {
            *tgd /= 1.0E10;
            warn!("{} - group delay rescaled to {}s", sv, tgd);
            self.push(Issue::GroupDelayRescaled(*tgd));
        }
        if tgd.abs() >= Constants::MAX_GROUP_DELAY_S {
            self.push(Issue::GroupDelay(*tgd));
        }
    }

    /// Clock epoch alignment. `seconds` is the time of week
    /// (time of day for GLONASS) of the clock epoch.
    pub fn epoch_grid(&mut self, constellation: Constellation, seconds: f64) {
        let Some(grid) = Constants::epoch_grid_s(constellation) else {
            return;
        };

        let offset = seconds.rem_euclid(grid);

        let aligned = if constellation == Constellation::GPS {
            Constants::GPS_GRID_WHITELIST
                .iter()
                .any(|whitelisted| (offset - whitelisted).abs() < 1.0E-3)
        } else {
            offset < 1.0E-3 || grid - offset < 1.0E-3
        };

        if !aligned {
            self.push(Issue::EpochGrid(offset));
        }
    }
}

/// Seconds of week of this [Epoch], in its own timescale
pub(crate) fn seconds_of_week(t: Epoch) -> f64 {
    let (_, nanos) = t.to_time_of_week();
    nanos as f64 * 1.0E-9
}

/// Seconds of day of this [Epoch], in its own timescale
pub(crate) fn seconds_of_day(t: Epoch) -> f64 {
    if t.time_scale == TimeScale::UTC {
        let (_, _, _, h, m, s, ns) = t.to_gregorian_utc();
        h as f64 * 3600.0 + m as f64 * 60.0 + s as f64 + ns as f64 * 1.0E-9
    } else {
        seconds_of_week(t).rem_euclid(86_400.0)
    }
}
