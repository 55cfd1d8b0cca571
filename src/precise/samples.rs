use std::str::FromStr;

use itertools::Itertools;
use nalgebra::Vector3;

use crate::prelude::{Epoch, SV};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Clock identifier: satellite, or receiver/station clock
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClockId {
    Satellite(SV),
    Station(String),
}

impl FromStr for ClockId {
    type Err = std::convert::Infallible;

    /// Three character identifiers that describe an [SV] are satellite clocks,
    /// anything else is a station clock.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 3 {
            if let Ok(sv) = SV::from_str(s) {
                return Ok(Self::Satellite(sv));
            }
        }
        Ok(Self::Station(s.to_string()))
    }
}

impl From<&str> for ClockId {
    fn from(s: &str) -> Self {
        match Self::from_str(s) {
            Ok(id) => id,
            Err(never) => match never {},
        }
    }
}

impl From<SV> for ClockId {
    fn from(sv: SV) -> Self {
        Self::Satellite(sv)
    }
}

impl std::fmt::Display for ClockId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Satellite(sv) => write!(f, "{}", sv),
            Self::Station(name) => write!(f, "{}", name),
        }
    }
}

/// Precise (SP3) position sample
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct PositionSample {
    /// Position (m)
    pub position: Vector3<f64>,
    /// Standard deviation (m), when published
    pub sdev: Option<Vector3<f64>>,
}

/// Scalar clock sample (SP3 clock column)
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct ScalarSample {
    /// Clock offset (s)
    pub value: f64,
    /// Standard deviation (s), when published
    pub sdev: Option<f64>,
}

/// Clock RINEX sample
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct ClockSample {
    /// Bias (s)
    pub bias: f64,
    /// Drift (s.s⁻¹)
    pub drift: Option<f64>,
    /// Inter frequency bias (s)
    pub ifb: Option<f64>,
}

/// Discrete time series, sorted by [Epoch], one sample per [Epoch].
/// The revision counter is incremented on each modification.
#[derive(Debug, Clone)]
pub(crate) struct Series<T> {
    samples: Vec<(Epoch, T)>,
    revision: u64,
}

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            revision: 0,
        }
    }
}

impl<T> Series<T> {
    /// Inserts a new sample. Existing samples are only replaced when
    /// `overwrite` is set. Returns true if the series was modified.
    pub fn insert(&mut self, epoch: Epoch, value: T, overwrite: bool) -> bool {
        let idx = self.samples.partition_point(|(e, _)| *e < epoch);

        if let Some((e, existing)) = self.samples.get_mut(idx) {
            if *e == epoch {
                if !overwrite {
                    return false;
                }
                *existing = value;
                self.revision += 1;
                return true;
            }
        }

        self.samples.insert(idx, (epoch, value));
        self.revision += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn epoch(&self, index: usize) -> Epoch {
        self.samples[index].0
    }

    pub fn value(&self, index: usize) -> &T {
        &self.samples[index].1
    }

    pub fn first_epoch(&self) -> Option<Epoch> {
        self.samples.first().map(|(e, _)| *e)
    }

    pub fn last_epoch(&self) -> Option<Epoch> {
        self.samples.last().map(|(e, _)| *e)
    }

    /// Sample at this exact [Epoch]
    pub fn at(&self, epoch: Epoch) -> Option<&T> {
        let idx = self.samples.partition_point(|(e, _)| *e < epoch);
        match self.samples.get(idx) {
            Some((e, value)) if *e == epoch => Some(value),
            _ => None,
        }
    }

    /// Index of the last sample at or before `t`
    pub fn last_before(&self, t: Epoch) -> Option<usize> {
        self.samples.partition_point(|(e, _)| *e <= t).checked_sub(1)
    }

    /// Number of samples within [first, last]
    pub fn count_within(&self, first: Epoch, last: Epoch) -> usize {
        let start = self.samples.partition_point(|(e, _)| *e < first);
        let end = self.samples.partition_point(|(e, _)| *e <= last);
        end.saturating_sub(start)
    }

    /// Drops samples outside [begin, end]. Returns the number of samples removed.
    pub fn retain_within(&mut self, begin: Epoch, end: Epoch) -> usize {
        let before = self.samples.len();
        self.samples.retain(|(e, _)| *e >= begin && *e <= end);
        let removed = before - self.samples.len();
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    /// Minimal interval between two successive samples
    pub fn interval(&self) -> Option<hifitime::Duration> {
        self.samples
            .iter()
            .tuple_windows()
            .map(|((previous, _), (next, _))| *next - *previous)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}
