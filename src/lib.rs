#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod broadcast;
mod cfg;
mod constants;
mod corrections;
mod ephemeris;
mod error;
mod polynomial;
mod precise;
mod source;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::broadcast::{BroadcastStore, Rejection};
    pub use crate::cfg::{BroadcastConfig, Config, GalileoSource, PreciseConfig};
    pub use crate::constants::{
        is_undefined_clock, is_undefined_position, Constants, SPEED_OF_LIGHT_M_S,
        UNDEFINED_CLOCK, UNDEFINED_CLOCK_EXTENDED, UNDEFINED_POSITION,
    };
    pub use crate::corrections::{CorrectionCode, Corrections};
    pub use crate::ephemeris::{
        BeiDouEphemeris, ClockPolynomial, ClockState, Ephemeris, GalileoEphemeris,
        GlonassEphemeris, GpsEphemeris, IrnssEphemeris, Issue, Keplerian, PositionState,
        QzssEphemeris, RawEphemeris, SbasEphemeris, Validated, RAW_FIELDS,
    };
    pub use crate::error::Error;
    pub use crate::polynomial::{lagrange_interpolate, Polynomial};
    pub use crate::precise::{CacheReport, CacheStatistics, ClockId, PreciseStore};
    pub use crate::source::EphemerisSource;
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}

// pub export
pub use error::Error;
