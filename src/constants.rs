use crate::prelude::{Constellation, SV};

/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Undefined precise position component (per axis)
pub const UNDEFINED_POSITION: f64 = 0.0;

/// Undefined precise clock offset
pub const UNDEFINED_CLOCK: f64 = 999_999.999;

/// Undefined precise clock offset, extended form
pub const UNDEFINED_CLOCK_EXTENDED: f64 = 999_999_999.999;

/// Tolerance (in seconds) applied at the edges of any fitted span.
/// This is the only extrapolation we ever allow.
pub const SPAN_SLACK_S: f64 = 0.25;

/// Seconds in one week
pub const WEEK_SECONDS: f64 = 604_800.0;

/// Seconds in half a week
pub const HALF_WEEK_SECONDS: f64 = 302_400.0;

/// Seconds in one day
pub const DAY_SECONDS: f64 = 86_400.0;

/// Smallest GLONASS integration step (s)
pub const MIN_GLONASS_STEP_S: f64 = 1.0;

/// Maximal number of GLONASS integration steps per query
pub const MAX_GLONASS_STEPS: usize = 10_000;

/// Maximal number of Kepler iterations
pub const MAX_KEPLER_ITER: usize = 30;

/// Kepler convergence criterion, expressed in meters along the orbit
pub const KEPLER_CONVERGENCE_M: f64 = 1.0E-3;

/// Earth gravitational constants (m³.s⁻²)
pub(crate) struct GM;

impl GM {
    pub const GPS: f64 = 3.9860050E14;
    pub const GAL: f64 = 3.986004418E14;
    pub const BDS: f64 = 3.986004418E14;
    pub const GLO: f64 = 3.9860044E14;
}

/// Earth angular velocity (rad.s⁻¹)
pub(crate) struct Omega;

impl Omega {
    pub const GPS: f64 = 7.2921151467E-5;
    pub const GAL: f64 = 7.2921151467E-5;
    pub const BDS: f64 = 7.292115E-5;
    pub const GLO: f64 = 7.292115E-5;
}

/// GLONASS PZ-90 geopotential
pub(crate) struct PZ90;

impl PZ90 {
    /// Equatorial radius (m)
    pub const AE_M: f64 = 6_378_136.0;
    /// Second zonal harmonic
    pub const J2: f64 = 1.0826257E-3;
}

/// Process wide constants, resolved per [SV].
pub struct Constants;

impl Constants {
    /// Gravitational constant for this [SV]
    pub const fn gm(sv: SV) -> f64 {
        match sv.constellation {
            Constellation::Galileo => GM::GAL,
            Constellation::BeiDou => GM::BDS,
            Constellation::Glonass => GM::GLO,
            _ => GM::GPS,
        }
    }

    /// Earth rotation rate, as used by this [SV]'s control segment
    pub const fn omega(sv: SV) -> f64 {
        match sv.constellation {
            Constellation::Galileo => Omega::GAL,
            Constellation::BeiDou => Omega::BDS,
            Constellation::Glonass => Omega::GLO,
            _ => Omega::GPS,
        }
    }

    /// Relativistic clock correction factor F = -2 * sqrt(GM) / c²
    pub fn dtr_f(sv: SV) -> f64 {
        -2.0 * Self::gm(sv).sqrt() / SPEED_OF_LIGHT_M_S.powi(2)
    }

    /// Maximal distance (in seconds) between a query and the reference
    /// epoch of the broadcast record being used.
    pub fn max_validity_s(constellation: Constellation) -> f64 {
        match constellation {
            Constellation::GPS => 7200.0,
            Constellation::QZSS => 3600.0,
            Constellation::Galileo => 10800.0,
            Constellation::IRNSS => 7200.0,
            Constellation::Glonass => 1020.0,
            Constellation::BeiDou => 3900.0,
            _ => 360.0,
        }
    }

    /// Maximal |tot - toc| tolerated at ingestion.
    pub fn max_tot_toc_s(constellation: Constellation) -> f64 {
        match constellation {
            Constellation::GPS | Constellation::QZSS | Constellation::IRNSS => 14400.0,
            Constellation::Galileo => 10800.0,
            Constellation::BeiDou => 7200.0,
            Constellation::Glonass => 3600.0,
            _ => 600.0,
        }
    }

    /// Clock epochs must be aligned to this grid (seconds), or None
    /// when no alignment is expected.
    pub fn epoch_grid_s(constellation: Constellation) -> Option<f64> {
        match constellation {
            Constellation::GPS => Some(7200.0),
            Constellation::QZSS => Some(900.0),
            Constellation::Galileo => Some(60.0),
            Constellation::BeiDou => Some(8.0),
            Constellation::IRNSS => Some(16.0),
            Constellation::Glonass => Some(900.0),
            _ => None,
        }
    }

    /// Known offsets (seconds into the grid) of GPS clock epochs
    /// following an upload.
    pub const GPS_GRID_WHITELIST: [f64; 5] = [0.0, 16.0, 3584.0, 3600.0, 7184.0];

    /// Acceptable semi major axis (m) for Keplerian constellations
    pub const SEMI_MAJOR_AXIS_RANGE_M: (f64, f64) = (1.0E7, 5.0E7);

    /// Acceptable orbit radius (m) for GLONASS state vectors
    pub const GLONASS_RADIUS_RANGE_M: (f64, f64) = (1.9E7, 2.7E7);

    /// Acceptable orbit radius (m) for SBAS (GEO) state vectors
    pub const SBAS_RADIUS_RANGE_M: (f64, f64) = (4.0E7, 4.4E7);

    /// Maximal group delay magnitude (s)
    pub const MAX_GROUP_DELAY_S: f64 = 1.0E-6;
}

/// Returns true if this precise clock value is one of the UNDEF sentinels.
pub fn is_undefined_clock(value: f64) -> bool {
    !value.is_finite() || value >= 999_999.0
}

/// Returns true if this precise position component is the UNDEF sentinel.
pub fn is_undefined_position(value: f64) -> bool {
    !value.is_finite() || value == UNDEFINED_POSITION
}
