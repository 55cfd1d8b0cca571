#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::{constants::MIN_GLONASS_STEP_S, error::Error};

mod source;
pub use source::GalileoSource;

fn default_true() -> bool {
    true
}

fn default_multimap() -> bool {
    false
}

fn default_grid_check() -> bool {
    true
}

fn default_health_fallback() -> bool {
    false
}

fn default_glonass_step_s() -> f64 {
    60.0
}

fn default_diagnostics_capacity() -> usize {
    256
}

fn default_orbit_degree() -> usize {
    9
}

fn default_clock_degree() -> usize {
    1
}

fn default_clock_samples() -> usize {
    2
}

fn default_nav_degree() -> usize {
    12
}

fn default_nav_samples() -> usize {
    24
}

fn default_overwrite() -> bool {
    false
}

/// Broadcast ephemeris store settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct BroadcastConfig {
    /// Keep all records sharing the same epoch (Galileo message variants),
    /// instead of overwriting.
    #[cfg_attr(feature = "serde", serde(default = "default_multimap"))]
    pub multimap: bool,
    /// Run the constellation self check on every ingested record.
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub self_check: bool,
    /// Only select records that were transmitted prior the query.
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub check_tot: bool,
    /// Verify clock epochs fall on the constellation grid.
    #[cfg_attr(feature = "serde", serde(default = "default_grid_check"))]
    pub grid_check: bool,
    /// When the health mask leaves nothing, retry without it.
    #[cfg_attr(feature = "serde", serde(default = "default_health_fallback"))]
    pub health_fallback: bool,
    /// Preferred Galileo message source, when several are stored.
    #[cfg_attr(feature = "serde", serde(default))]
    pub galileo_source: Option<GalileoSource>,
    /// Maximal single Runge-Kutta step (s) in GLONASS integration.
    #[cfg_attr(feature = "serde", serde(default = "default_glonass_step_s"))]
    pub glonass_step_s: f64,
    /// Number of rejection reports we keep.
    #[cfg_attr(feature = "serde", serde(default = "default_diagnostics_capacity"))]
    pub diagnostics_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            multimap: default_multimap(),
            self_check: default_true(),
            check_tot: default_true(),
            grid_check: default_grid_check(),
            health_fallback: default_health_fallback(),
            galileo_source: None,
            glonass_step_s: default_glonass_step_s(),
            diagnostics_capacity: default_diagnostics_capacity(),
        }
    }
}

/// Precise products store settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct PreciseConfig {
    /// Orbit fit degree (SP3 positions)
    #[cfg_attr(feature = "serde", serde(default = "default_orbit_degree"))]
    pub orbit_degree: usize,
    /// Clock fit degree (Clock RINEX and SP3 clock column)
    #[cfg_attr(feature = "serde", serde(default = "default_clock_degree"))]
    pub clock_degree: usize,
    /// Clock window length. Least squares when larger than clock_degree +1.
    #[cfg_attr(feature = "serde", serde(default = "default_clock_samples"))]
    pub clock_samples: usize,
    /// Degree of the navigation (moving window) fit
    #[cfg_attr(feature = "serde", serde(default = "default_nav_degree"))]
    pub nav_degree: usize,
    /// Window length of the navigation fit
    #[cfg_attr(feature = "serde", serde(default = "default_nav_samples"))]
    pub nav_samples: usize,
    /// Replace samples that already exist
    #[cfg_attr(feature = "serde", serde(default = "default_overwrite"))]
    pub overwrite: bool,
    /// Use broadcast ephemeris when no precise product is available
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub broadcast_fallback: bool,
    /// Clock RINEX series is first in line for clock queries
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub use_clock_rinex: bool,
    /// SP3 clock column comes second
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub use_sp3_clock: bool,
    /// Broadcast clock polynomials come last
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub use_broadcast_clock: bool,
    /// Cache fitted polynomials. When turned off, every
    /// query is resolved with direct Lagrange interpolation.
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub cache: bool,
}

impl Default for PreciseConfig {
    fn default() -> Self {
        Self {
            orbit_degree: default_orbit_degree(),
            clock_degree: default_clock_degree(),
            clock_samples: default_clock_samples(),
            nav_degree: default_nav_degree(),
            nav_samples: default_nav_samples(),
            overwrite: default_overwrite(),
            broadcast_fallback: default_true(),
            use_clock_rinex: default_true(),
            use_sp3_clock: default_true(),
            use_broadcast_clock: default_true(),
            cache: default_true(),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    /// [BroadcastConfig]
    #[cfg_attr(feature = "serde", serde(default))]
    pub broadcast: BroadcastConfig,
    /// [PreciseConfig]
    #[cfg_attr(feature = "serde", serde(default))]
    pub precise: PreciseConfig,
}

impl Config {
    /// Verifies this [Config] is self consistent
    pub fn validate(&self) -> Result<(), Error> {
        let precise = &self.precise;

        if precise.orbit_degree == 0 {
            return Err(Error::InvalidConfig("orbit_degree must be at least 1"));
        }
        if precise.clock_degree == 0 {
            return Err(Error::InvalidConfig("clock_degree must be at least 1"));
        }
        if precise.clock_samples <= precise.clock_degree {
            return Err(Error::InvalidConfig("clock_samples must exceed clock_degree"));
        }
        if precise.nav_samples < 4 {
            return Err(Error::InvalidConfig("nav_samples must be at least 4"));
        }
        if precise.nav_samples <= precise.nav_degree {
            return Err(Error::InvalidConfig("nav_samples must exceed nav_degree"));
        }
        if !(self.broadcast.glonass_step_s >= MIN_GLONASS_STEP_S) {
            return Err(Error::InvalidConfig("glonass_step_s must be at least 1s"));
        }
        Ok(())
    }

    /// Returns [Config] with desired [BroadcastConfig]
    pub fn with_broadcast(&self, broadcast: BroadcastConfig) -> Self {
        let mut s = self.clone();
        s.broadcast = broadcast;
        s
    }

    /// Returns [Config] with desired [PreciseConfig]
    pub fn with_precise(&self, precise: PreciseConfig) -> Self {
        let mut s = self.clone();
        s.precise = precise;
        s
    }
}
