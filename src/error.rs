use thiserror::Error;

use crate::{
    ephemeris::Issue,
    prelude::{Constellation, Epoch, SV},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// This [SV] was never proposed to the store.
    #[error("unknown satellite {0}")]
    UnknownSatellite(SV),

    /// No record passes the validity window (and possibly health mask)
    /// at requested [Epoch].
    #[error("{1}({0}) - no usable ephemeris")]
    NoEphemeris(SV, Epoch),

    /// The only record covering this [Epoch] is flagged unhealthy.
    #[error("{1}({0}) - unhealthy")]
    Unhealthy(SV, Epoch),

    /// Not enough discrete samples to form the interpolation window.
    #[error("{sv} - not enough samples: {available} < {needed}")]
    InsufficientData {
        sv: SV,
        needed: usize,
        available: usize,
    },

    /// No usable sample for this (station) clock
    #[error("{1}({0}) - no usable clock")]
    NoClock(String, Epoch),

    /// Query lies outside the sampled span (no extrapolation).
    #[error("{1}({0}) - outside of sampled span")]
    OutOfSpan(SV, Epoch),

    /// Ingested record failed self check
    #[error("{1}({0}) - rejected record: {2:?}")]
    Rejected(SV, Epoch, Vec<Issue>),

    /// Raw record does not have the expected number of slots
    #[error("malformed record: expecting {expected} slots, got {found}")]
    FieldCount { expected: usize, found: usize },

    /// Negative or garbage week counter
    #[error("invalid week number {0}")]
    InvalidWeek(f64),

    /// A raw field is not a finite number
    #[error("invalid value in slot #{0}")]
    InvalidField(usize),

    /// Same record was already stored
    #[error("{1}({0}) - duplicate record")]
    Duplicate(SV, Epoch),

    /// This [Constellation] has no ephemeris model
    #[error("{0} is not supported")]
    NotSupported(Constellation),

    /// Cannot resolve the [SV] timescale
    #[error("unknown timescale for {0}")]
    UnknownTimescale(SV),

    /// Nothing to fit
    #[error("polynomial fit: no samples")]
    EmptyFit,

    /// Abscissa and ordinates do not have the same length
    #[error("polynomial fit: {0} abscissa for {1} values")]
    MismatchedLengths(usize, usize),

    /// Least squares requires more samples than unknowns
    #[error("polynomial fit: {samples} samples for degree {degree}")]
    UnderDeterminedFit { samples: usize, degree: usize },

    /// Normal equations could not be solved
    #[error("polynomial fit: singular design matrix")]
    SingularSystem,

    /// Two samples share the same abscissa
    #[error("polynomial fit: repeated abscissa")]
    RepeatedAbscissa,

    /// Correction code is not recognized
    #[error("unknown correction code")]
    UnknownCorrectionCode,

    /// Time system correction is not available
    #[error("missing time system correction")]
    UnknownTimeCorrection,

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
