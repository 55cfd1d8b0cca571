use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, warn};
use nalgebra::Vector3;

use crate::{
    broadcast::BroadcastStore,
    cfg::PreciseConfig,
    constants::{is_undefined_clock, is_undefined_position},
    ephemeris::{ClockState, PositionState},
    error::Error,
    prelude::{Duration, Epoch, SV},
};

mod fit;
mod samples;
mod window;

pub use samples::ClockId;

use fit::Fit;
use samples::{ClockSample, PositionSample, ScalarSample, Series};
use window::{Direction, Shortfall, Window};

/// Hit and refit counters of one cache family
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    pub hits: u64,
    pub refits: u64,
}

/// [CacheStatistics] of all precise caches
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheReport {
    /// Position cache
    pub orbit: CacheStatistics,
    /// Navigation (long window) cache
    pub nav: CacheStatistics,
    /// Clock caches
    pub clock: CacheStatistics,
}

/// Why the precise path could not answer
#[derive(Debug)]
enum Failure {
    /// No samples at all
    Missing,
    Shortfall(Shortfall),
    Numerical(Error),
}

impl From<Shortfall> for Failure {
    fn from(shortfall: Shortfall) -> Self {
        Self::Shortfall(shortfall)
    }
}

impl From<Error> for Failure {
    fn from(e: Error) -> Self {
        Self::Numerical(e)
    }
}

impl Failure {
    fn into_error(self, sv: SV, t: Epoch) -> Error {
        match self {
            Self::Missing => Error::UnknownSatellite(sv),
            Self::Shortfall(Shortfall::Insufficient { needed, available }) => {
                Error::InsufficientData {
                    sv,
                    needed,
                    available,
                }
            },
            Self::Shortfall(Shortfall::OutOfSpan) => Error::OutOfSpan(sv, t),
            Self::Numerical(e) => e,
        }
    }
}

/// Fit parameters of one cache family
#[derive(Debug, Copy, Clone)]
struct Plan {
    /// Window size
    size: usize,
    degree: usize,
    /// Minimal number of samples
    minimum: usize,
    /// Window slides with the queries
    sliding: bool,
}

impl Plan {
    fn orbit(cfg: &PreciseConfig) -> Self {
        Self {
            size: cfg.orbit_degree + 1,
            degree: cfg.orbit_degree,
            minimum: cfg.orbit_degree,
            sliding: false,
        }
    }

    fn nav(cfg: &PreciseConfig) -> Self {
        Self {
            size: cfg.nav_samples,
            degree: cfg.nav_degree,
            minimum: cfg.nav_degree,
            sliding: true,
        }
    }

    fn clock(cfg: &PreciseConfig) -> Self {
        Self {
            size: cfg.clock_samples,
            degree: cfg.clock_degree,
            minimum: cfg.clock_degree,
            sliding: false,
        }
    }
}

#[derive(Default)]
struct Satellite {
    positions: Series<PositionSample>,
    clocks: Series<ScalarSample>,
    velocities: Series<Vector3<f64>>,
    orbit_fit: Option<Fit>,
    nav_fit: Option<Fit>,
    clock_fit: Option<Fit>,
}

impl Satellite {
    fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.clocks.is_empty() && self.velocities.is_empty()
    }

    fn retain_within(&mut self, begin: Epoch, end: Epoch) -> usize {
        let removed = self.positions.retain_within(begin, end)
            + self.clocks.retain_within(begin, end)
            + self.velocities.retain_within(begin, end);

        if removed > 0 {
            self.orbit_fit = None;
            self.nav_fit = None;
            self.clock_fit = None;
        }
        removed
    }
}

/// Clock RINEX track
#[derive(Default)]
struct ClockTrack {
    samples: Series<ClockSample>,
    fit: Option<Fit>,
}

#[derive(Default)]
struct Inner {
    satellites: BTreeMap<SV, Satellite>,
    clocks: BTreeMap<ClockId, ClockTrack>,
    statistics: CacheReport,
    agency: Option<String>,
}

/// Returns a [Fit] of `series` that covers `t`: the cached one when
/// still usable, a fresh one otherwise.
fn cached<'a, T>(
    cache: &'a mut Option<Fit>,
    series: &Series<T>,
    t: Epoch,
    plan: Plan,
    components: usize,
    statistics: &mut CacheStatistics,
    extract: impl Fn(&T, usize) -> f64,
) -> Result<&'a Fit, Failure> {
    let direction = match cache.as_mut() {
        Some(fit) if fit.covers(t) && !fit.is_stale(series) => {
            fit.revision = series.revision();
            None
        },
        Some(fit) if plan.sliding && t > fit.zone.1 => Some(Direction::Forward),
        Some(fit) if plan.sliding && t < fit.zone.0 => Some(Direction::Backward),
        _ => Some(Direction::Centered),
    };

    match direction {
        None => statistics.hits += 1,
        Some(direction) => {
            let window = Window::plan(series, t, plan.size, plan.minimum, direction)?;
            let fit = Fit::new(series, &window, plan.degree, components, extract)?;
            debug!(
                "refit over [{}, {}] ({} samples, {:?})",
                fit.first, fit.last, fit.len, direction
            );
            statistics.refits += 1;
            *cache = Some(fit);
        },
    }

    cache.as_ref().ok_or(Failure::Missing)
}

/// Evaluates N components of `series` and their rates at `t`,
/// either through the cache or by direct Lagrange interpolation.
fn evaluate<T, const N: usize>(
    cache: &mut Option<Fit>,
    series: &Series<T>,
    t: Epoch,
    plan: Plan,
    use_cache: bool,
    statistics: &mut CacheStatistics,
    extract: impl Fn(&T, usize) -> f64,
) -> Result<([f64; N], [f64; N]), Failure> {
    let (mut values, mut rates) = ([0.0; N], [0.0; N]);

    if series.is_empty() {
        return Err(Failure::Missing);
    }

    if use_cache {
        let fit = cached(cache, series, t, plan, N, statistics, &extract)?;
        for i in 0..N {
            (values[i], rates[i]) = fit.evaluate(i, t);
        }
    } else {
        let window = Window::plan(series, t, plan.degree + 1, plan.minimum, Direction::Centered)?;
        for i in 0..N {
            (values[i], rates[i]) = fit::lagrange(series, &window, t, i, &extract)?;
        }
    }

    Ok((values, rates))
}

/// Index of the sample closest to `t`
fn nearest<T>(series: &Series<T>, t: Epoch) -> Option<usize> {
    if series.is_empty() {
        return None;
    }
    let j = series.last_before(t).unwrap_or(0);
    if j + 1 < series.len() && (series.epoch(j + 1) - t).abs() < (t - series.epoch(j)).abs() {
        Some(j + 1)
    } else {
        Some(j)
    }
}

/// [PreciseStore] holds precise (SP3 and Clock RINEX) samples of all satellites
/// and interpolates them at any instant. It may be backed by a [BroadcastStore],
/// used when precise products do not cover the request.
///
/// Like the [BroadcastStore], all methods take `&self` and the state is guarded
/// by a single lock. The [BroadcastStore] is only invoked once that lock is released.
pub struct PreciseStore {
    cfg: PreciseConfig,
    broadcast: Option<Arc<BroadcastStore>>,
    inner: Mutex<Inner>,
}

impl Default for PreciseStore {
    fn default() -> Self {
        Self::new(PreciseConfig::default())
    }
}

impl PreciseStore {
    /// Creates a new precise only [PreciseStore]
    pub fn new(cfg: PreciseConfig) -> Self {
        Self {
            cfg,
            broadcast: None,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Creates a new [PreciseStore] backed by this [BroadcastStore]
    pub fn with_broadcast(cfg: PreciseConfig, broadcast: Arc<BroadcastStore>) -> Self {
        Self {
            cfg,
            broadcast: Some(broadcast),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// [PreciseConfig] in use
    pub fn config(&self) -> &PreciseConfig {
        &self.cfg
    }

    /// Backing [BroadcastStore], if any
    pub fn broadcast(&self) -> Option<&Arc<BroadcastStore>> {
        self.broadcast.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Defines the analysis center that produced the samples
    pub fn set_agency(&self, agency: &str) {
        let mut inner = self.lock();
        inner.agency = Some(agency.to_string());
    }

    /// Analysis center that produced the samples
    pub fn agency(&self) -> Option<String> {
        let inner = self.lock();
        inner.agency.clone()
    }

    /// Stores a new SP3 sample. Undefined positions (any null axis) and undefined
    /// clocks are not stored. Existing samples are only replaced when
    /// [PreciseConfig::overwrite] is set. Returns true if anything was stored.
    pub fn add_position(
        &self,
        sv: SV,
        epoch: Epoch,
        position: Vector3<f64>,
        clock_s: f64,
        sdev: Option<Vector3<f64>>,
        clock_sdev: Option<f64>,
    ) -> bool {
        let position_defined = !position.iter().any(|value| is_undefined_position(*value));
        let clock_defined = !is_undefined_clock(clock_s);

        if !position_defined && !clock_defined {
            debug!("{}({}) - undefined sample", epoch, sv);
            return false;
        }

        let mut inner = self.lock();
        let satellite = inner.satellites.entry(sv).or_default();

        let mut stored = false;

        if position_defined {
            stored |= satellite.positions.insert(
                epoch,
                PositionSample { position, sdev },
                self.cfg.overwrite,
            );
        }

        if clock_defined {
            stored |= satellite.clocks.insert(
                epoch,
                ScalarSample {
                    value: clock_s,
                    sdev: clock_sdev,
                },
                self.cfg.overwrite,
            );
        }

        if !stored {
            debug!("{}({}) - sample already stored", epoch, sv);
        }
        stored
    }

    /// Stores a new SP3 velocity sample (m.s⁻¹)
    pub fn add_velocity(&self, sv: SV, epoch: Epoch, velocity: Vector3<f64>) -> bool {
        if velocity.iter().any(|value| is_undefined_position(*value)) {
            debug!("{}({}) - undefined velocity", epoch, sv);
            return false;
        }

        let mut inner = self.lock();
        let satellite = inner.satellites.entry(sv).or_default();
        satellite
            .velocities
            .insert(epoch, velocity, self.cfg.overwrite)
    }

    /// Stores a new Clock RINEX sample. `values` are (bias, drift, drift rate)
    /// with an optional fourth inter frequency bias term. Undefined biases
    /// are not stored. Returns true if the sample was stored.
    pub fn add_clock(
        &self,
        id: impl Into<ClockId>,
        epoch: Epoch,
        values: &[f64],
    ) -> Result<bool, Error> {
        if values.is_empty() || values.len() > 4 {
            return Err(Error::FieldCount {
                expected: 4,
                found: values.len(),
            });
        }

        if let Some(slot) = values.iter().position(|value| !value.is_finite()) {
            return Err(Error::InvalidField(slot));
        }

        let id = id.into();

        if is_undefined_clock(values[0]) {
            debug!("{}({}) - undefined clock", epoch, id);
            return Ok(false);
        }

        let defined = |slot: usize| values.get(slot).copied().filter(|v| !is_undefined_clock(*v));

        let sample = ClockSample {
            bias: values[0],
            drift: defined(1),
            ifb: defined(3),
        };

        let mut inner = self.lock();
        let track = inner.clocks.entry(id).or_default();
        Ok(track.samples.insert(epoch, sample, self.cfg.overwrite))
    }

    /// Position and velocity from the precise samples only
    fn precise_position(
        &self,
        sv: SV,
        t: Epoch,
        plan: Plan,
        nav: bool,
    ) -> Result<PositionState, Failure> {
        let mut inner = self.lock();
        let Inner {
            satellites,
            statistics,
            ..
        } = &mut *inner;

        let satellite = satellites.get_mut(&sv).ok_or(Failure::Missing)?;

        let (cache, statistics) = if nav {
            (&mut satellite.nav_fit, &mut statistics.nav)
        } else {
            (&mut satellite.orbit_fit, &mut statistics.orbit)
        };

        let (values, rates) = evaluate::<_, 3>(
            cache,
            &satellite.positions,
            t,
            plan,
            self.cfg.cache,
            statistics,
            |sample: &PositionSample, i| sample.position[i],
        )?;

        let position = match satellite.positions.at(t) {
            Some(sample) => sample.position,
            None => Vector3::from(values),
        };

        let velocity = if satellite.velocities.is_empty() {
            Vector3::from(rates)
        } else {
            match Window::plan(
                &satellite.velocities,
                t,
                self.cfg.orbit_degree + 1,
                2,
                Direction::Centered,
            ) {
                Ok(window) => {
                    let mut velocity = Vector3::<f64>::zeros();
                    for i in 0..3 {
                        let (value, _) = fit::lagrange(
                            &satellite.velocities,
                            &window,
                            t,
                            i,
                            |v: &Vector3<f64>, k| v[k],
                        )?;
                        velocity[i] = value;
                    }
                    velocity
                },
                Err(_) => Vector3::from(rates),
            }
        };

        let variance = nearest(&satellite.positions, t)
            .and_then(|j| satellite.positions.value(j).sdev)
            .map(|sdev| sdev.component_mul(&sdev));

        Ok(PositionState {
            position,
            velocity,
            variance,
        })
    }

    /// Runs the precise evaluation, falls back to the broadcast
    /// store if permitted.
    fn position_or_fallback(
        &self,
        sv: SV,
        t: Epoch,
        health_mask: bool,
        nav: bool,
    ) -> Result<PositionState, Error> {
        if health_mask && !self.healthy(sv, t) {
            return Err(Error::Unhealthy(sv, t));
        }

        let plan = if nav {
            Plan::nav(&self.cfg)
        } else {
            Plan::orbit(&self.cfg)
        };

        // lock is released on return
        let precise = self.precise_position(sv, t, plan, nav);

        match precise {
            Ok(state) => Ok(state),
            Err(failure) => {
                let e = failure.into_error(sv, t);
                match &self.broadcast {
                    Some(broadcast) if self.cfg.broadcast_fallback => {
                        debug!("{}({}) - {}: broadcast fallback", t, sv, e);
                        broadcast.position(sv, t, health_mask)
                    },
                    _ => Err(e),
                }
            },
        }
    }

    /// Satellite position (and velocity) at `t`, interpolated from
    /// the precise samples.
    pub fn position(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<PositionState, Error> {
        self.position_or_fallback(sv, t, health_mask, false)
    }

    /// Position and clock states at `t`. Positions are obtained from a long
    /// sliding window fit, adapted to regular queries of a navigation filter.
    pub fn nav(
        &self,
        sv: SV,
        t: Epoch,
        health_mask: bool,
    ) -> Result<(PositionState, ClockState), Error> {
        let position = self.position_or_fallback(sv, t, health_mask, true)?;
        let clock = self.clock(sv, t, false)?;
        Ok((position, clock))
    }

    /// Clock RINEX evaluation
    fn rinex_clock(
        &self,
        inner: &mut Inner,
        id: &ClockId,
        t: Epoch,
    ) -> Result<ClockState, Failure> {
        let Inner {
            clocks, statistics, ..
        } = inner;

        let track = clocks.get_mut(id).ok_or(Failure::Missing)?;

        let fitted = evaluate::<_, 1>(
            &mut track.fit,
            &track.samples,
            t,
            Plan::clock(&self.cfg),
            self.cfg.cache,
            &mut statistics.clock,
            |sample: &ClockSample, _| sample.bias,
        );

        match (track.samples.at(t), fitted) {
            (Some(sample), fitted) => Ok(ClockState {
                offset_s: sample.bias,
                drift_s_s: sample
                    .drift
                    .or(fitted.ok().map(|(_, rates)| rates[0]))
                    .unwrap_or(0.0),
                variance: None,
            }),
            (None, Ok((values, rates))) => Ok(ClockState {
                offset_s: values[0],
                drift_s_s: rates[0],
                variance: None,
            }),
            (None, Err(failure)) => Err(failure),
        }
    }

    /// SP3 clock evaluation
    fn sp3_clock(&self, inner: &mut Inner, sv: SV, t: Epoch) -> Result<ClockState, Failure> {
        let Inner {
            satellites,
            statistics,
            ..
        } = inner;

        let satellite = satellites.get_mut(&sv).ok_or(Failure::Missing)?;

        let fitted = evaluate::<_, 1>(
            &mut satellite.clock_fit,
            &satellite.clocks,
            t,
            Plan::clock(&self.cfg),
            self.cfg.cache,
            &mut statistics.clock,
            |sample: &ScalarSample, _| sample.value,
        );

        let variance = nearest(&satellite.clocks, t)
            .and_then(|j| satellite.clocks.value(j).sdev)
            .map(|sdev| sdev.powi(2));

        match (satellite.clocks.at(t), fitted) {
            (Some(sample), fitted) => Ok(ClockState {
                offset_s: sample.value,
                drift_s_s: fitted.map(|(_, rates)| rates[0]).unwrap_or(0.0),
                variance,
            }),
            (None, Ok((values, rates))) => Ok(ClockState {
                offset_s: values[0],
                drift_s_s: rates[0],
                variance,
            }),
            (None, Err(failure)) => Err(failure),
        }
    }

    /// Satellite clock state at `t`. Sources are tried in this order,
    /// each one may be disabled in the [PreciseConfig]:
    /// - Clock RINEX samples
    /// - SP3 clock samples
    /// - broadcast clock model
    pub fn clock(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<ClockState, Error> {
        if health_mask && !self.healthy(sv, t) {
            return Err(Error::Unhealthy(sv, t));
        }

        let mut failure = None;

        {
            let mut inner = self.lock();

            if self.cfg.use_clock_rinex {
                match self.rinex_clock(&mut inner, &ClockId::Satellite(sv), t) {
                    Ok(state) => return Ok(state),
                    Err(f) => failure = Some(f),
                }
            }

            if self.cfg.use_sp3_clock {
                match self.sp3_clock(&mut inner, sv, t) {
                    Ok(state) => return Ok(state),
                    Err(Failure::Missing) => {},
                    Err(f) => failure = Some(f),
                }
            }
        }

        if self.cfg.use_broadcast_clock {
            if let Some(broadcast) = &self.broadcast {
                return broadcast.clock(sv, t, health_mask);
            }
        }

        let e = failure
            .map(|f| f.into_error(sv, t))
            .unwrap_or(Error::NoEphemeris(sv, t));

        warn!("{}({}) - no clock: {}", t, sv, e);
        Err(e)
    }

    /// Receiver (station) clock state at `t`, from Clock RINEX samples
    pub fn station_clock(&self, name: &str, t: Epoch) -> Result<ClockState, Error> {
        let id = ClockId::Station(name.to_string());
        let mut inner = self.lock();
        self.rinex_clock(&mut inner, &id, t).map_err(|failure| match failure {
            Failure::Numerical(e) => e,
            _ => Error::NoClock(name.to_string(), t),
        })
    }

    /// Inter frequency bias (s) of the latest Clock RINEX sample at or before `t`
    pub fn inter_frequency_bias(&self, id: &ClockId, t: Epoch) -> Option<f64> {
        let inner = self.lock();
        let track = inner.clocks.get(id)?;
        let j = track.samples.last_before(t)?;
        track.samples.value(j).ifb
    }

    /// Health status at `t`. Precise products do not carry health
    /// information: we rely on the [BroadcastStore], healthy by default.
    pub fn healthy(&self, sv: SV, t: Epoch) -> bool {
        match &self.broadcast {
            Some(broadcast) => broadcast.healthy(sv, t),
            None => true,
        }
    }

    /// Satellites described by this store, including those only
    /// known to the [BroadcastStore]
    pub fn satellites(&self) -> Vec<SV> {
        let mut satellites = {
            let inner = self.lock();
            inner
                .satellites
                .iter()
                .filter_map(|(sv, sat)| if sat.is_empty() { None } else { Some(*sv) })
                .chain(inner.clocks.keys().filter_map(|id| match id {
                    ClockId::Satellite(sv) => Some(*sv),
                    ClockId::Station(_) => None,
                }))
                .collect::<BTreeSet<_>>()
        };

        if let Some(broadcast) = &self.broadcast {
            satellites.extend(broadcast.satellites());
        }

        satellites.into_iter().collect()
    }

    /// Receivers (stations) we have clock samples for
    pub fn stations(&self) -> Vec<String> {
        let inner = self.lock();
        inner
            .clocks
            .keys()
            .filter_map(|id| match id {
                ClockId::Station(name) => Some(name.clone()),
                ClockId::Satellite(_) => None,
            })
            .collect()
    }

    /// Number of position samples for this satellite
    pub fn epoch_count(&self, sv: SV) -> usize {
        let inner = self.lock();
        inner
            .satellites
            .get(&sv)
            .map(|sat| sat.positions.len())
            .unwrap_or(0)
    }

    /// Number of Clock RINEX samples for this clock
    pub fn clock_count(&self, id: &ClockId) -> usize {
        let inner = self.lock();
        inner
            .clocks
            .get(id)
            .map(|track| track.samples.len())
            .unwrap_or(0)
    }

    /// Sampling interval of the position samples
    pub fn interval(&self, sv: SV) -> Option<Duration> {
        let inner = self.lock();
        inner.satellites.get(&sv)?.positions.interval()
    }

    /// Cache hit and refit counters
    pub fn cache_statistics(&self) -> CacheReport {
        let inner = self.lock();
        inner.statistics
    }

    /// Removes all samples strictly outside [begin, end] and drops the
    /// affected caches, then cleans up the [BroadcastStore].
    /// Returns the number of samples (and records) removed.
    pub fn clean_outer(&self, begin: Epoch, end: Epoch) -> usize {
        let removed = {
            let mut inner = self.lock();
            let mut removed = 0;

            for (sv, satellite) in inner.satellites.iter_mut() {
                let count = satellite.retain_within(begin, end);
                if count > 0 {
                    debug!("{} - {} sample(s) evicted", sv, count);
                }
                removed += count;
            }

            for (id, track) in inner.clocks.iter_mut() {
                let count = track.samples.retain_within(begin, end);
                if count > 0 {
                    debug!("{} - {} clock sample(s) evicted", id, count);
                    track.fit = None;
                }
                removed += count;
            }

            inner.satellites.retain(|_, sat| !sat.is_empty());
            inner.clocks.retain(|_, track| !track.samples.is_empty());
            removed
        };

        match &self.broadcast {
            Some(broadcast) => removed + broadcast.clean_outer(begin, end),
            None => removed,
        }
    }
}
