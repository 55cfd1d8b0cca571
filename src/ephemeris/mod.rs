use nalgebra::Vector3;

use crate::{
    cfg::{BroadcastConfig, GalileoSource},
    constants::{Constants, SPEED_OF_LIGHT_M_S},
    error::Error,
    prelude::{Constellation, Duration, Epoch, TimeScale, SV},
};

pub(crate) mod check;
pub(crate) mod clock;
pub(crate) mod kepler;

mod beidou;
mod galileo;
mod glonass;
mod gps;
mod irnss;
mod qzss;
mod sbas;

pub use beidou::BeiDouEphemeris;
pub use check::Issue;
pub use clock::ClockPolynomial;
pub use galileo::GalileoEphemeris;
pub use glonass::GlonassEphemeris;
pub use gps::GpsEphemeris;
pub use irnss::IrnssEphemeris;
pub use kepler::Keplerian;
pub use qzss::QzssEphemeris;
pub use sbas::SbasEphemeris;

use check::Checker;

/// Number of slots in a raw broadcast record
pub const RAW_FIELDS: usize = 29;

/// Default maximal single step (s) of the GLONASS integrator
pub const DEFAULT_GLONASS_STEP_S: f64 = 60.0;

/// Satellite position (and velocity) solved at one instant, ECEF.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PositionState {
    /// Position (m)
    pub position: Vector3<f64>,
    /// Velocity (m.s⁻¹)
    pub velocity: Vector3<f64>,
    /// Position variance (m²) per axis, when known
    pub variance: Option<Vector3<f64>>,
}

/// Satellite clock state solved at one instant
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClockState {
    /// Offset to the constellation timescale (s)
    pub offset_s: f64,
    /// Drift (s.s⁻¹)
    pub drift_s_s: f64,
    /// Offset variance (s²), when known
    pub variance: Option<f64>,
}

/// Raw broadcast record, as proposed by a navigation decoder.
/// Slots follow the RINEX navigation layout of each constellation,
/// with all values already converted to SI units.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEphemeris {
    /// [SV]
    pub sv: SV,
    /// Time of Clock (record epoch)
    pub toc: Epoch,
    /// Raw slots
    pub fields: [f64; RAW_FIELDS],
}

/// Result of a successful validation: the immutable [Ephemeris]
/// and possible non fatal [Issue]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub ephemeris: Ephemeris,
    pub warnings: Vec<Issue>,
}

impl RawEphemeris {
    /// Builds a new [RawEphemeris]. Missing trailing slots are padded
    /// with zeros; too many slots is an error.
    pub fn new(sv: SV, toc: Epoch, fields: &[f64]) -> Result<Self, Error> {
        if fields.len() > RAW_FIELDS || fields.is_empty() {
            return Err(Error::FieldCount {
                expected: RAW_FIELDS,
                found: fields.len(),
            });
        }

        let mut slots = [0.0; RAW_FIELDS];
        slots[..fields.len()].copy_from_slice(fields);

        Ok(Self {
            sv,
            toc,
            fields: slots,
        })
    }

    /// Returns slot value
    pub(crate) fn slot(&self, index: usize) -> f64 {
        self.fields[index]
    }

    /// Returns slot value as unsigned integer
    pub(crate) fn slot_u32(&self, index: usize) -> u32 {
        let value = self.fields[index];
        if value > 0.0 {
            value.round() as u32
        } else {
            0
        }
    }

    /// Week counter held in slot #21. Negative or garbage values reject the record.
    pub(crate) fn week(&self) -> Result<u32, Error> {
        let week = self.fields[21];
        if !week.is_finite() || week < 0.0 || week.fract() != 0.0 || week > u32::MAX as f64 {
            return Err(Error::InvalidWeek(week));
        }
        Ok(week as u32)
    }

    /// Structural verification: all slots must be finite numbers
    fn structure(&self) -> Result<(), Error> {
        match self.fields.iter().position(|value| !value.is_finite()) {
            Some(slot) => Err(Error::InvalidField(slot)),
            None => Ok(()),
        }
    }

    /// Time of transmission, from seconds of week held in `slot`.
    /// Unknown (>= 9E8) transmission time defaults to ToC.
    pub(crate) fn transmission_time(&self, slot: usize, toc_sow: f64) -> Epoch {
        let tot_sow = self.fields[slot];
        if tot_sow >= 9.0E8 {
            self.toc
        } else {
            self.toc + kepler::fold_half_week(tot_sow - toc_sow) * hifitime::Unit::Second
        }
    }

    /// Two phase construction: decodes this record, runs the self check
    /// and returns either an immutable [Ephemeris] or a rejection.
    pub fn validate(&self, cfg: &BroadcastConfig) -> Result<Validated, Error> {
        self.structure()?;

        let sv = self.sv;
        let mut checker = Checker::default();

        let ephemeris = match sv.constellation {
            Constellation::GPS => Ephemeris::Gps(GpsEphemeris::decode(self, &mut checker)?),
            Constellation::QZSS => Ephemeris::Qzss(QzssEphemeris::decode(self, &mut checker)?),
            Constellation::Galileo => {
                Ephemeris::Galileo(GalileoEphemeris::decode(self, &mut checker)?)
            },
            Constellation::BeiDou => {
                Ephemeris::BeiDou(BeiDouEphemeris::decode(self, &mut checker)?)
            },
            Constellation::IRNSS => Ephemeris::Irnss(IrnssEphemeris::decode(self, &mut checker)?),
            Constellation::Glonass => {
                Ephemeris::Glonass(GlonassEphemeris::decode(self, &mut checker)?)
            },
            c => {
                if c.is_sbas() {
                    Ephemeris::Sbas(SbasEphemeris::decode(self, &mut checker)?)
                } else {
                    return Err(Error::NotSupported(c));
                }
            },
        };

        if cfg.self_check {
            ephemeris.self_check(cfg, &mut checker);
        }

        if cfg.self_check && checker.is_fatal() {
            return Err(Error::Rejected(sv, self.toc, checker.issues));
        }

        Ok(Validated {
            ephemeris,
            warnings: checker.issues,
        })
    }
}

/// Timescale used by this [SV]. IRNSS time is steered to GPST.
pub(crate) fn timescale(sv: SV) -> Result<TimeScale, Error> {
    match sv.constellation {
        Constellation::IRNSS => Ok(TimeScale::GPST),
        c => c.timescale().ok_or(Error::UnknownTimescale(sv)),
    }
}

/// Validated broadcast ephemeris, one variant per constellation.
/// Immutable once built, shared by reference counting.
#[derive(Debug, Clone, PartialEq)]
pub enum Ephemeris {
    Gps(GpsEphemeris),
    Glonass(GlonassEphemeris),
    Galileo(GalileoEphemeris),
    BeiDou(BeiDouEphemeris),
    Qzss(QzssEphemeris),
    Sbas(SbasEphemeris),
    Irnss(IrnssEphemeris),
}

impl Ephemeris {
    /// [SV] this [Ephemeris] applies to
    pub fn sv(&self) -> SV {
        match self {
            Self::Gps(eph) => eph.sv,
            Self::Glonass(eph) => eph.sv,
            Self::Galileo(eph) => eph.sv,
            Self::BeiDou(eph) => eph.sv,
            Self::Qzss(eph) => eph.sv,
            Self::Sbas(eph) => eph.sv,
            Self::Irnss(eph) => eph.sv,
        }
    }

    /// Reference epoch (Time of Clock), index of this record in the store
    pub fn epoch(&self) -> Epoch {
        self.clock_model().toc
    }

    /// Time of Ephemeris. State vector epoch for GLONASS and SBAS.
    pub fn toe(&self) -> Epoch {
        match self.keplerian() {
            Some(kepler) => kepler.toe,
            None => self.epoch(),
        }
    }

    /// Time of transmission
    pub fn tot(&self) -> Epoch {
        match self {
            Self::Gps(eph) => eph.tot,
            Self::Glonass(eph) => eph.tot,
            Self::Galileo(eph) => eph.tot,
            Self::BeiDou(eph) => eph.tot,
            Self::Qzss(eph) => eph.tot,
            Self::Sbas(eph) => eph.tot,
            Self::Irnss(eph) => eph.tot,
        }
    }

    /// Issue of Data
    pub fn iod(&self) -> u32 {
        match self {
            Self::Gps(eph) => eph.iode,
            Self::Glonass(eph) => eph.iod(),
            Self::Galileo(eph) => eph.iodnav,
            Self::BeiDou(eph) => eph.iod(),
            Self::Qzss(eph) => eph.iode,
            Self::Sbas(eph) => eph.iodn,
            Self::Irnss(eph) => eph.iodec,
        }
    }

    /// Raw health code
    pub fn health(&self) -> u32 {
        match self {
            Self::Gps(eph) => eph.health,
            Self::Glonass(eph) => eph.health,
            Self::Galileo(eph) => eph.health,
            Self::BeiDou(eph) => eph.health,
            Self::Qzss(eph) => eph.health,
            Self::Sbas(eph) => eph.health,
            Self::Irnss(eph) => eph.health,
        }
    }

    /// True when the broadcast health code is nominal
    pub fn healthy(&self) -> bool {
        self.health() == 0
    }

    /// Maximal distance between a query and [Self::epoch]
    pub fn validity_interval(&self) -> Duration {
        Constants::max_validity_s(self.sv().constellation) * hifitime::Unit::Second
    }

    /// True if `t` lies within the validity interval
    pub fn is_valid_at(&self, t: Epoch) -> bool {
        (t - self.epoch()).abs() <= self.validity_interval()
    }

    /// [Keplerian] elements, if this is a Keplerian record
    pub fn keplerian(&self) -> Option<&Keplerian> {
        match self {
            Self::Gps(eph) => Some(&eph.kepler),
            Self::Galileo(eph) => Some(&eph.kepler),
            Self::BeiDou(eph) => Some(&eph.kepler),
            Self::Qzss(eph) => Some(&eph.kepler),
            Self::Irnss(eph) => Some(&eph.kepler),
            Self::Glonass(_) | Self::Sbas(_) => None,
        }
    }

    /// [ClockPolynomial] of this record
    pub fn clock_model(&self) -> &ClockPolynomial {
        match self {
            Self::Gps(eph) => &eph.clock,
            Self::Glonass(eph) => &eph.clock,
            Self::Galileo(eph) => &eph.clock,
            Self::BeiDou(eph) => &eph.clock,
            Self::Qzss(eph) => &eph.clock,
            Self::Sbas(eph) => &eph.clock,
            Self::Irnss(eph) => &eph.clock,
        }
    }

    /// Signal in space accuracy (m), when published
    pub fn accuracy_m(&self) -> Option<f64> {
        let accuracy = match self {
            Self::Gps(eph) => eph.ura_m,
            Self::Galileo(eph) => eph.sisa_m,
            Self::BeiDou(eph) => eph.ura_m,
            Self::Qzss(eph) => eph.ura_m,
            Self::Sbas(eph) => eph.ura_m,
            Self::Irnss(eph) => eph.ura_m,
            Self::Glonass(_) => return None,
        };
        if accuracy > 0.0 {
            Some(accuracy)
        } else {
            None
        }
    }

    /// Main group delay (s): TGD, BGD E5a/E1 or TGD1.
    pub fn group_delay(&self) -> Option<f64> {
        match self {
            Self::Gps(eph) => Some(eph.tgd),
            Self::Galileo(eph) => Some(eph.bgd_e5a_e1),
            Self::BeiDou(eph) => Some(eph.tgd1),
            Self::Qzss(eph) => Some(eph.tgd),
            Self::Irnss(eph) => Some(eph.tgd),
            Self::Glonass(_) | Self::Sbas(_) => None,
        }
    }

    /// Galileo message source
    pub fn galileo_source(&self) -> Option<GalileoSource> {
        match self {
            Self::Galileo(eph) => eph.source(),
            _ => None,
        }
    }

    /// GLONASS frequency channel
    pub fn glonass_channel(&self) -> Option<i8> {
        match self {
            Self::Glonass(eph) => Some(eph.channel),
            _ => None,
        }
    }

    fn self_check(&self, cfg: &BroadcastConfig, checker: &mut Checker) {
        let sv = self.sv();
        checker.transmission_time(sv, self.tot(), self.epoch());

        match self {
            Self::Gps(eph) => eph.self_check(checker),
            Self::Glonass(eph) => eph.self_check(checker),
            Self::Sbas(eph) => eph.self_check(checker),
            Self::Galileo(_) | Self::BeiDou(_) | Self::Qzss(_) | Self::Irnss(_) => {},
        }

        if let Some(kepler) = self.keplerian() {
            checker.semi_major_axis(kepler.semi_major_axis_m());
            checker.eccentricity(kepler.e);
        }

        if cfg.grid_check {
            let toc = self.epoch();
            let seconds = match self {
                Self::Glonass(_) => check::seconds_of_day(toc),
                _ => check::seconds_of_week(toc),
            };
            checker.epoch_grid(sv.constellation, seconds);
        }
    }

    /// Resolves the ECEF position and velocity at `t`.
    pub fn position(&self, t: Epoch) -> Result<PositionState, Error> {
        self.position_with_step(t, DEFAULT_GLONASS_STEP_S)
    }

    /// Resolves the ECEF position and velocity at `t`, with desired
    /// maximal step size for numerical integration.
    pub fn position_with_step(&self, t: Epoch, max_step_s: f64) -> Result<PositionState, Error> {
        if !self.is_valid_at(t) {
            return Err(Error::NoEphemeris(self.sv(), t));
        }

        let (position, velocity) = match self {
            Self::Gps(eph) => eph.position_velocity(t),
            Self::Glonass(eph) => eph.position_velocity(t, max_step_s),
            Self::Galileo(eph) => eph.position_velocity(t),
            Self::BeiDou(eph) => eph.position_velocity(t),
            Self::Qzss(eph) => eph.position_velocity(t),
            Self::Sbas(eph) => eph.position_velocity(t),
            Self::Irnss(eph) => eph.position_velocity(t),
        };

        let variance = self.accuracy_m().map(|accuracy| {
            let var = accuracy.powi(2);
            Vector3::new(var, var, var)
        });

        Ok(PositionState {
            position,
            velocity,
            variance,
        })
    }

    /// Resolves the clock offset and drift at `t`. The relativistic
    /// correction is not included, see [Self::relativistic_correction].
    pub fn clock(&self, t: Epoch) -> Result<ClockState, Error> {
        if !self.is_valid_at(t) {
            return Err(Error::NoEphemeris(self.sv(), t));
        }

        let (offset_s, drift_s_s) = self.clock_model().evaluate(t);

        let variance = self
            .accuracy_m()
            .map(|accuracy| (accuracy / SPEED_OF_LIGHT_M_S).powi(2));

        Ok(ClockState {
            offset_s,
            drift_s_s,
            variance,
        })
    }

    /// Relativistic clock correction (s) due to orbit eccentricity.
    /// Null for state vector records.
    pub fn relativistic_correction(&self, t: Epoch) -> f64 {
        match self.keplerian() {
            Some(kepler) => kepler.relativistic_correction(self.sv(), t),
            None => 0.0,
        }
    }
}
