use crate::{
    broadcast::BroadcastStore,
    ephemeris::{ClockState, PositionState},
    error::Error,
    precise::PreciseStore,
    prelude::{Epoch, SV},
};

/// Any ephemeris provider should implement the [EphemerisSource] trait,
/// so positioning pipelines can be generic over broadcast only
/// or precise setups.
///
/// Requests are usually in chronological order, following the measurements,
/// but this is not a requirement.
pub trait EphemerisSource {
    /// [SV] position (and velocity) at requested [Epoch].
    /// `health_mask` excludes unhealthy vehicles.
    fn position(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<PositionState, Error>;

    /// [SV] clock state at requested [Epoch]
    fn clock(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<ClockState, Error>;

    /// Health status, defaults to true when unknown
    fn healthy(&self, sv: SV, t: Epoch) -> bool;

    /// All satellites this source may describe
    fn satellites(&self) -> Vec<SV>;
}

impl EphemerisSource for BroadcastStore {
    fn position(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<PositionState, Error> {
        BroadcastStore::position(self, sv, t, health_mask)
    }

    fn clock(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<ClockState, Error> {
        BroadcastStore::clock(self, sv, t, health_mask)
    }

    fn healthy(&self, sv: SV, t: Epoch) -> bool {
        BroadcastStore::healthy(self, sv, t)
    }

    fn satellites(&self) -> Vec<SV> {
        BroadcastStore::satellites(self)
    }
}

impl EphemerisSource for PreciseStore {
    fn position(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<PositionState, Error> {
        PreciseStore::position(self, sv, t, health_mask)
    }

    fn clock(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<ClockState, Error> {
        PreciseStore::clock(self, sv, t, health_mask)
    }

    fn healthy(&self, sv: SV, t: Epoch) -> bool {
        PreciseStore::healthy(self, sv, t)
    }

    fn satellites(&self) -> Vec<SV> {
        PreciseStore::satellites(self)
    }
}
