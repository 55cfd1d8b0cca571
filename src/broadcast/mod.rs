use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, error, warn};

use crate::{
    cfg::BroadcastConfig,
    corrections::{CorrectionCode, Corrections},
    ephemeris::{ClockState, Ephemeris, Issue, PositionState, RawEphemeris},
    error::Error,
    prelude::{Constellation, Epoch, SV},
};

mod selection;

use selection::Selection;

/// Rejected record report
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub sv: SV,
    pub epoch: Epoch,
    pub issues: Vec<Issue>,
}

#[derive(Default)]
struct Inner {
    /// Records per [SV], sorted by epoch
    records: BTreeMap<SV, Vec<Arc<Ephemeris>>>,
    /// Ionospheric and time system corrections
    corrections: Corrections,
    /// GLONASS frequency channels
    glonass_channels: BTreeMap<SV, i8>,
    /// Latest rejections
    diagnostics: VecDeque<Rejection>,
}

/// [BroadcastStore] owns all broadcast [Ephemeris] of all satellites,
/// and selects the record to use for any query.
///
/// All methods take `&self`: the state is guarded by a single lock,
/// so the store may be shared between decoding and processing threads.
pub struct BroadcastStore {
    cfg: BroadcastConfig,
    inner: Mutex<Inner>,
}

impl Default for BroadcastStore {
    fn default() -> Self {
        Self::new(BroadcastConfig::default())
    }
}

impl BroadcastStore {
    /// Creates a new [BroadcastStore]
    pub fn new(cfg: BroadcastConfig) -> Self {
        Self {
            cfg,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// [BroadcastConfig] in use
    pub fn config(&self) -> &BroadcastConfig {
        &self.cfg
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Validates and stores a new record. Rejected records are reported
    /// in [Self::diagnostics] and never stored.
    pub fn add(&self, raw: &RawEphemeris) -> Result<Arc<Ephemeris>, Error> {
        let validated = match raw.validate(&self.cfg) {
            Ok(validated) => validated,
            Err(e) => {
                if let Error::Rejected(sv, epoch, issues) = &e {
                    warn!("{}({}) - rejected: {:?}", epoch, sv, issues);
                    let mut inner = self.lock();
                    if self.cfg.diagnostics_capacity > 0 {
                        if inner.diagnostics.len() == self.cfg.diagnostics_capacity {
                            inner.diagnostics.pop_front();
                        }
                        inner.diagnostics.push_back(Rejection {
                            sv: *sv,
                            epoch: *epoch,
                            issues: issues.clone(),
                        });
                    }
                } else {
                    error!("{}({}) - invalid record: {}", raw.toc, raw.sv, e);
                }
                return Err(e);
            },
        };

        let ephemeris = Arc::new(validated.ephemeris);
        let (sv, epoch) = (ephemeris.sv(), ephemeris.epoch());

        for warning in validated.warnings.iter() {
            debug!("{}({}) - {}", epoch, sv, warning);
        }

        let mut inner = self.lock();

        let records = inner.records.entry(sv).or_default();
        let start = records.partition_point(|eph| eph.epoch() < epoch);
        let end = start
            + records[start..]
                .iter()
                .take_while(|eph| eph.epoch() == epoch)
                .count();

        if sv.constellation == Constellation::Galileo {
            let source = ephemeris.galileo_source();
            if records[start..end]
                .iter()
                .any(|eph| eph.galileo_source() == source)
            {
                debug!("{}({}) - duplicate record", epoch, sv);
                return Err(Error::Duplicate(sv, epoch));
            }
        }

        if self.cfg.multimap {
            records.insert(end, ephemeris.clone());
        } else {
            records.splice(start..end, [ephemeris.clone()]);
        }

        if let Some(channel) = ephemeris.glonass_channel() {
            inner.glonass_channels.insert(sv, channel);
        }

        Ok(ephemeris)
    }

    /// Selects the [Ephemeris] to be used at `t`. When `health_mask` is set,
    /// unhealthy records are not proposed.
    pub fn find(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<Arc<Ephemeris>, Error> {
        let inner = self.lock();
        let records = inner.records.get(&sv).ok_or(Error::UnknownSatellite(sv))?;
        let selection = Selection::new(&self.cfg, health_mask);
        selection.find(sv, records, t).cloned()
    }

    /// Selects the [Ephemeris] that carries this Issue of Data and is valid at `t`.
    pub fn find_iod(&self, sv: SV, iod: u32, t: Epoch) -> Result<Arc<Ephemeris>, Error> {
        let inner = self.lock();
        let records = inner.records.get(&sv).ok_or(Error::UnknownSatellite(sv))?;
        let selection = Selection::new(&self.cfg, false);
        selection.find_iod(sv, records, iod, t).cloned()
    }

    /// [Self::find] with optional retry without health mask
    fn select(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<Arc<Ephemeris>, Error> {
        match self.find(sv, t, health_mask) {
            Ok(eph) => Ok(eph),
            Err(e) => {
                if health_mask && self.cfg.health_fallback {
                    warn!("{}({}) - {}: retrying without health mask", t, sv, e);
                    self.find(sv, t, false)
                } else {
                    Err(e)
                }
            },
        }
    }

    /// Satellite position and velocity at `t`
    pub fn position(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<PositionState, Error> {
        let eph = self.select(sv, t, health_mask)?;
        eph.position_with_step(t, self.cfg.glonass_step_s)
    }

    /// Satellite clock offset and drift at `t`
    pub fn clock(&self, sv: SV, t: Epoch, health_mask: bool) -> Result<ClockState, Error> {
        let eph = self.select(sv, t, health_mask)?;
        eph.clock(t)
    }

    /// Position and clock states from the same record
    pub fn nav(
        &self,
        sv: SV,
        t: Epoch,
        health_mask: bool,
    ) -> Result<(PositionState, ClockState), Error> {
        let eph = self.select(sv, t, health_mask)?;
        let position = eph.position_with_step(t, self.cfg.glonass_step_s)?;
        let clock = eph.clock(t)?;
        Ok((position, clock))
    }

    /// Health status at `t`. Defaults to healthy when we have no record
    /// for this satellite, so precise only setups are not starved.
    pub fn healthy(&self, sv: SV, t: Epoch) -> bool {
        let inner = self.lock();
        let Some(records) = inner.records.get(&sv) else {
            return true;
        };
        let selection = Selection::new(&self.cfg, false);
        match selection.find(sv, records, t) {
            Ok(eph) => eph.healthy(),
            Err(_) => true,
        }
    }

    /// Satellites we have records for
    pub fn satellites(&self) -> Vec<SV> {
        let inner = self.lock();
        inner
            .records
            .iter()
            .filter_map(|(sv, records)| if records.is_empty() { None } else { Some(*sv) })
            .collect()
    }

    /// Number of records stored for this satellite
    pub fn epoch_count(&self, sv: SV) -> usize {
        let inner = self.lock();
        inner.records.get(&sv).map(|records| records.len()).unwrap_or(0)
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        let inner = self.lock();
        inner.records.values().map(|records| records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all records strictly before `begin` or strictly after `end`,
    /// unless they are still referenced elsewhere. Returns the number
    /// of records removed.
    pub fn clean_outer(&self, begin: Epoch, end: Epoch) -> usize {
        let mut inner = self.lock();
        let mut removed = 0;

        for (sv, records) in inner.records.iter_mut() {
            let before = records.len();
            records.retain(|eph| {
                let epoch = eph.epoch();
                let outside = epoch < begin || epoch > end;
                !outside || Arc::strong_count(eph) > 1
            });
            let count = before - records.len();
            if count > 0 {
                debug!("{} - {} record(s) evicted", sv, count);
            }
            removed += count;
        }

        inner.records.retain(|_, records| !records.is_empty());
        removed
    }

    /// Stores a new correction, first writer wins.
    pub fn add_correction(&self, code: CorrectionCode, values: [f64; 4]) -> bool {
        let mut inner = self.lock();
        inner.corrections.add(code, values)
    }

    /// Returns correction terms
    pub fn correction(&self, code: CorrectionCode) -> Option<[f64; 4]> {
        let inner = self.lock();
        inner.corrections.get(code)
    }

    /// GPS Klobuchar (alpha, beta) terms, default model if never proposed
    pub fn klobuchar(&self) -> ([f64; 4], [f64; 4]) {
        let inner = self.lock();
        inner.corrections.klobuchar()
    }

    /// Evaluates time system correction at `t` (s)
    pub fn time_correction_seconds(&self, code: CorrectionCode, t: Epoch) -> Result<f64, Error> {
        let inner = self.lock();
        inner.corrections.time_correction_seconds(code, t)
    }

    /// GLONASS frequency channel of this satellite
    pub fn glonass_channel(&self, sv: SV) -> Option<i8> {
        let inner = self.lock();
        inner.glonass_channels.get(&sv).copied()
    }

    /// Latest rejected records
    pub fn diagnostics(&self) -> Vec<Rejection> {
        let inner = self.lock();
        inner.diagnostics.iter().cloned().collect()
    }
}
