use std::sync::Arc;

use hifitime::Unit;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    prelude::{
        BroadcastStore, CacheStatistics, ClockId, Epoch, Error, PreciseConfig, PreciseStore,
        Vector3, SV, UNDEFINED_CLOCK,
    },
    tests::{epoch, gps_record, init_logger, load_sp3, sp3_clock, sv, CircularOrbit},
};

/// GPS week 2200, 172800s
fn t0() -> Epoch {
    epoch("2022-03-01T00:00:00 GPST")
}

fn at(t0: Epoch, offset_s: f64) -> Epoch {
    t0 + offset_s * Unit::Second
}

/// One day of 15' SP3 samples
fn daily_store(cfg: PreciseConfig) -> (PreciseStore, SV, CircularOrbit) {
    let g01 = sv("G01");
    let orbit = CircularOrbit::meo(t0());
    let store = PreciseStore::new(cfg);
    load_sp3(&store, g01, &orbit, t0(), 900.0, 96);
    (store, g01, orbit)
}

fn assert_close(lhs: Vector3<f64>, rhs: Vector3<f64>, tolerance: f64, context: &str) {
    let err = (lhs - rhs).norm();
    assert!(err < tolerance, "{}: error={}", context, err);
}

#[test]
fn exact_samples() {
    init_logger();
    let g01 = sv("G01");
    let orbit = CircularOrbit::meo(t0());

    let store = PreciseStore::default();
    load_sp3(&store, g01, &orbit, t0(), 900.0, 9);

    assert_eq!(store.epoch_count(g01), 9);
    assert_eq!(store.interval(g01), Some(900.0 * Unit::Second));

    let t = at(t0(), 1800.0);
    let (expected, _) = orbit.state(t);

    let state = store.position(g01, t, true).unwrap();
    assert_close(state.position, expected, 1.0E-6, "third sample");

    let variance = state.variance.unwrap();
    assert!((variance[0] - 1.0E-4).abs() < 1.0E-12);
    assert!((variance[2] - 4.0E-4).abs() < 1.0E-12);

    let clock = store.clock(g01, t, true).unwrap();
    assert_eq!(clock.offset_s, sp3_clock(t0(), t));
    assert!((clock.drift_s_s - 1.0E-11).abs() < 1.0E-17);
    assert_eq!(clock.variance, None);

    // in between samples
    for offset_s in [450.0, 1000.0, 3700.0, 6500.0] {
        let t = at(t0(), offset_s);
        let (position, velocity) = orbit.state(t);
        let state = store.position(g01, t, true).unwrap();
        assert_close(state.position, position, 5.0E-2, &format!("t0+{}s", offset_s));
        assert_close(state.velocity, velocity, 1.0E-3, &format!("t0+{}s", offset_s));
    }
}

#[test]
fn duplicate_clock_samples() {
    init_logger();
    let store = PreciseStore::default();
    let id = ClockId::from("G01");
    let t = t0();

    assert_eq!(store.add_clock("G01", t, &[1.0E-4, 1.0E-12]), Ok(true));
    assert_eq!(store.add_clock("G01", t, &[2.0E-4, 1.0E-12]), Ok(false));
    assert_eq!(store.clock_count(&id), 1);

    assert_eq!(
        store.add_clock("G01", t, &[]),
        Err(Error::FieldCount {
            expected: 4,
            found: 0
        })
    );
    assert_eq!(
        store.add_clock("G01", t, &[1.0E-4; 5]),
        Err(Error::FieldCount {
            expected: 4,
            found: 5
        })
    );
    assert_eq!(
        store.add_clock("G01", t, &[1.0E-4, f64::NAN]),
        Err(Error::InvalidField(1))
    );

    // undefined bias is silently dropped
    assert_eq!(store.add_clock("G01", at(t, 30.0), &[UNDEFINED_CLOCK]), Ok(false));
    assert_eq!(store.clock_count(&id), 1);

    // first writer wins
    let clock = store.clock(sv("G01"), t, false).unwrap();
    assert_eq!(clock.offset_s, 1.0E-4);
    assert_eq!(clock.drift_s_s, 1.0E-12);

    let cfg = PreciseConfig {
        overwrite: true,
        ..Default::default()
    };
    let store = PreciseStore::new(cfg);
    assert_eq!(store.add_clock("G01", t, &[1.0E-4]), Ok(true));
    assert_eq!(store.add_clock("G01", t, &[2.0E-4]), Ok(true));
    assert_eq!(store.clock_count(&id), 1);
    assert_eq!(store.clock(sv("G01"), t, false).unwrap().offset_s, 2.0E-4);
}

#[test]
fn interpolation() {
    init_logger();
    let (store, g01, orbit) = daily_store(PreciseConfig::default());

    for k in 0..95 {
        let t = at(t0(), k as f64 * 900.0 + 317.0);
        let (position, velocity) = orbit.state(t);
        let state = store.position(g01, t, false).unwrap();
        assert_close(state.position, position, 5.0E-2, &format!("{}", t));
        assert_close(state.velocity, velocity, 1.0E-3, &format!("{}", t));
    }
}

#[test]
fn cache_coherence() {
    init_logger();
    let (store, g01, orbit) = daily_store(PreciseConfig::default());
    let mut rng = SmallRng::seed_from_u64(0);

    let queries = 200;

    for _ in 0..queries {
        let t = at(t0(), rng.random_range(4.0 * 3600.0..20.0 * 3600.0));

        let first = store.position(g01, t, false).unwrap();
        let second = store.position(g01, t, false).unwrap();
        assert_eq!(first, second, "{}: cached result differs", t);

        let (position, _) = orbit.state(t);
        assert_close(first.position, position, 5.0E-2, &format!("{}", t));
    }

    let statistics = store.cache_statistics();
    assert_eq!(statistics.orbit.hits + statistics.orbit.refits, 2 * queries);
    assert!(statistics.orbit.hits >= queries);
    assert_eq!(statistics.nav, CacheStatistics::default());
}

#[test]
fn refit_on_boundary() {
    init_logger();
    let (store, g01, _) = daily_store(PreciseConfig::default());

    // centered window [16, 25], valid over [18, 23]
    let t = at(t0(), 20.0 * 900.0 + 100.0);
    store.position(g01, t, false).unwrap();
    assert_eq!(store.cache_statistics().orbit.refits, 1);

    store.position(g01, at(t0(), 18.0 * 900.0 + 10.0), false).unwrap();
    store.position(g01, at(t0(), 23.0 * 900.0), false).unwrap();

    let statistics = store.cache_statistics().orbit;
    assert_eq!(statistics.refits, 1);
    assert_eq!(statistics.hits, 2);

    store.position(g01, at(t0(), 23.0 * 900.0 + 1.0), false).unwrap();
    assert_eq!(store.cache_statistics().orbit.refits, 2);

    // previous area requires a new fit
    store.position(g01, at(t0(), 17.0 * 900.0), false).unwrap();
    assert_eq!(store.cache_statistics().orbit.refits, 3);
}

#[test]
fn late_samples() {
    init_logger();
    let g01 = sv("G01");
    let orbit = CircularOrbit::meo(t0());
    let store = PreciseStore::default();

    for k in (0..40).filter(|k| *k != 20) {
        let t = at(t0(), k as f64 * 900.0);
        let (position, _) = orbit.state(t);
        assert!(store.add_position(g01, t, position, 1.0E-4, None, None));
    }

    let t = at(t0(), 20.0 * 900.0 + 60.0);
    let before = store.position(g01, t, false).unwrap();
    assert_eq!(store.cache_statistics().orbit.refits, 1);

    // missing sample shows up: cached fit no longer describes the series
    let missing = at(t0(), 20.0 * 900.0);
    let (position, _) = orbit.state(missing);
    assert!(store.add_position(g01, missing, position, 1.0E-4, None, None));

    let after = store.position(g01, t, false).unwrap();
    assert_eq!(store.cache_statistics().orbit.refits, 2);
    assert_ne!(before.position, after.position);

    let (expected, _) = orbit.state(t);
    assert_close(after.position, expected, 5.0E-2, "refitted");

    // a sample outside of the fitted window leaves the cache untouched
    let far = at(t0(), 60.0 * 900.0);
    let (position, _) = orbit.state(far);
    assert!(store.add_position(g01, far, position, 1.0E-4, None, None));

    assert_eq!(store.position(g01, t, false).unwrap(), after);
    let statistics = store.cache_statistics().orbit;
    assert_eq!(statistics.refits, 2);
    assert_eq!(statistics.hits, 1);
}

#[test]
fn no_extrapolation() {
    init_logger();
    let (store, g01, _) = daily_store(PreciseConfig::default());
    let last = at(t0(), 95.0 * 900.0);

    for t in [at(t0(), -0.3), at(t0(), -900.0), at(last, 0.3), at(last, 3600.0)] {
        assert_eq!(store.position(g01, t, false), Err(Error::OutOfSpan(g01, t)));
        assert_eq!(store.clock(g01, t, false), Err(Error::OutOfSpan(g01, t)));
    }

    for t in [at(t0(), -0.2), last, at(last, 0.2)] {
        assert!(store.position(g01, t, false).is_ok(), "{}", t);
    }

    let g02 = sv("G02");
    assert_eq!(
        store.position(g02, t0(), false),
        Err(Error::UnknownSatellite(g02))
    );
}

#[test]
fn broadcast_fallback() {
    init_logger();
    let g01 = sv("G01");
    let orbit = CircularOrbit::meo(t0());

    let broadcast = Arc::new(BroadcastStore::default());
    broadcast.add(&gps_record(1, 2200, 172_800.0)).unwrap();

    let store = PreciseStore::with_broadcast(PreciseConfig::default(), broadcast.clone());
    load_sp3(&store, g01, &orbit, t0(), 900.0, 5);

    let t = at(t0(), 1000.0);
    let expected = broadcast.position(g01, t, true).unwrap();
    assert_eq!(store.position(g01, t, true).unwrap(), expected);

    // beyond SP3 coverage
    let t = at(t0(), 5400.0);
    let expected = broadcast.position(g01, t, true).unwrap();
    assert_eq!(store.position(g01, t, true).unwrap(), expected);

    // not described by either
    let t = at(t0(), 8000.0);
    assert_eq!(
        store.position(g01, t, true),
        Err(Error::NoEphemeris(g01, t))
    );

    let cfg = PreciseConfig {
        broadcast_fallback: false,
        ..Default::default()
    };
    let store = PreciseStore::with_broadcast(cfg, broadcast);
    load_sp3(&store, g01, &orbit, t0(), 900.0, 5);

    let t = at(t0(), 1000.0);
    assert_eq!(
        store.position(g01, t, true),
        Err(Error::InsufficientData {
            sv: g01,
            needed: 9,
            available: 5
        })
    );
}

#[test]
fn health_from_broadcast() {
    init_logger();
    let g01 = sv("G01");
    let orbit = CircularOrbit::meo(t0());

    let mut raw = gps_record(1, 2200, 172_800.0);
    raw.fields[24] = 1.0;

    let broadcast = Arc::new(BroadcastStore::default());
    broadcast.add(&raw).unwrap();

    let store = PreciseStore::with_broadcast(PreciseConfig::default(), broadcast);
    load_sp3(&store, g01, &orbit, t0(), 900.0, 12);

    let t = at(t0(), 1000.0);
    assert!(!store.healthy(g01, t));
    assert_eq!(store.position(g01, t, true), Err(Error::Unhealthy(g01, t)));
    assert_eq!(store.clock(g01, t, true), Err(Error::Unhealthy(g01, t)));

    assert!(store.position(g01, t, false).is_ok());
    assert!(store.clock(g01, t, false).is_ok());

    // no broadcast record: healthy
    let g02 = sv("G02");
    assert!(store.healthy(g02, t));
}

#[test]
fn clock_precedence() {
    init_logger();
    let g01 = sv("G01");
    let orbit = CircularOrbit::meo(t0());

    let broadcast = Arc::new(BroadcastStore::default());
    broadcast.add(&gps_record(1, 2200, 172_800.0)).unwrap();

    let rinex_clock = |t: Epoch| 2.0E-4 + 1.0E-12 * (t - t0()).to_seconds();

    let build = |cfg: PreciseConfig| {
        let store = PreciseStore::with_broadcast(cfg, broadcast.clone());
        load_sp3(&store, g01, &orbit, t0(), 900.0, 9);
        for k in 0..=240 {
            let t = at(t0(), k as f64 * 30.0);
            assert_eq!(store.add_clock(g01, t, &[rinex_clock(t), 1.0E-12]), Ok(true));
        }
        store
    };

    let t = at(t0(), 1015.0);

    let store = build(PreciseConfig::default());
    let clock = store.clock(g01, t, true).unwrap();
    assert!((clock.offset_s - rinex_clock(t)).abs() < 1.0E-15);
    assert!((clock.drift_s_s - 1.0E-12).abs() < 1.0E-17);

    let store = build(PreciseConfig {
        use_clock_rinex: false,
        ..Default::default()
    });
    let clock = store.clock(g01, t, true).unwrap();
    assert!((clock.offset_s - sp3_clock(t0(), t)).abs() < 1.0E-15);

    let store = build(PreciseConfig {
        use_clock_rinex: false,
        use_sp3_clock: false,
        ..Default::default()
    });
    let clock = store.clock(g01, t, true).unwrap();
    assert_eq!(clock, broadcast.clock(g01, t, true).unwrap());

    let store = build(PreciseConfig {
        use_clock_rinex: false,
        use_sp3_clock: false,
        use_broadcast_clock: false,
        ..Default::default()
    });
    assert_eq!(store.clock(g01, t, true), Err(Error::NoEphemeris(g01, t)));

    // clock RINEX does not cover: next in line
    let store = build(PreciseConfig::default());
    let t = at(t0(), 7250.0);
    let clock = store.clock(g01, t, true).unwrap();
    assert_eq!(clock, broadcast.clock(g01, t, true).unwrap());
}

#[test]
fn station_clocks() {
    init_logger();
    let store = PreciseStore::default();
    let abmf = ClockId::from("ABMF");
    assert_eq!(abmf, ClockId::Station("ABMF".to_string()));

    for k in 0..10 {
        let t = at(t0(), k as f64 * 30.0);
        let bias = 1.0E-6 + 2.0E-10 * k as f64;
        assert_eq!(store.add_clock("ABMF", t, &[bias, 0.0, 0.0, 3.0E-9]), Ok(true));
    }

    assert_eq!(store.stations(), vec!["ABMF".to_string()]);
    assert_eq!(store.clock_count(&abmf), 10);
    assert!(store.satellites().is_empty());

    let t = at(t0(), 45.0);
    let clock = store.station_clock("ABMF", t).unwrap();
    assert!((clock.offset_s - (1.0E-6 + 3.0E-10)).abs() < 1.0E-16);

    assert_eq!(store.inter_frequency_bias(&abmf, t), Some(3.0E-9));
    assert_eq!(store.inter_frequency_bias(&abmf, at(t0(), -1.0)), None);

    assert_eq!(
        store.station_clock("ABMF", at(t0(), 600.0)),
        Err(Error::NoClock("ABMF".to_string(), at(t0(), 600.0)))
    );
    assert_eq!(
        store.station_clock("BRUX", t),
        Err(Error::NoClock("BRUX".to_string(), t))
    );
}

#[test]
fn navigation_window() {
    init_logger();
    let (store, g01, orbit) = daily_store(PreciseConfig::default());

    let start = at(t0(), 4.0 * 3600.0);
    let queries = 721;

    for k in 0..queries {
        let t = at(start, k as f64 * 30.0);
        let (state, clock) = store.nav(g01, t, true).unwrap();

        let (position, velocity) = orbit.state(t);
        assert_close(state.position, position, 5.0E-2, &format!("{}", t));
        assert_close(state.velocity, velocity, 1.0E-3, &format!("{}", t));
        assert!((clock.offset_s - sp3_clock(t0(), t)).abs() < 1.0E-15);
    }

    let statistics = store.cache_statistics().nav;
    assert_eq!(statistics.hits + statistics.refits, queries as u64);
    assert!(statistics.refits <= 4, "too many refits: {}", statistics.refits);
    assert_eq!(store.cache_statistics().orbit, CacheStatistics::default());

    // going backwards, down to the first sample
    for k in 0..=480 {
        let t = at(start, -(k as f64) * 30.0);
        let (state, _) = store.nav(g01, t, true).unwrap();
        let (position, _) = orbit.state(t);
        assert_close(state.position, position, 5.0E-2, &format!("{}", t));
    }

    let statistics = store.cache_statistics().nav;
    assert!(statistics.refits <= 8, "too many refits: {}", statistics.refits);
}

#[test]
fn direct_interpolation() {
    init_logger();
    let (cached, g01, _) = daily_store(PreciseConfig::default());
    let (direct, _, _) = daily_store(PreciseConfig {
        cache: false,
        ..Default::default()
    });

    let mut rng = SmallRng::seed_from_u64(1);

    for _ in 0..50 {
        let t = at(t0(), rng.random_range(3600.0..80000.0));
        let lhs = cached.position(g01, t, false).unwrap();
        let rhs = direct.position(g01, t, false).unwrap();
        assert_close(lhs.position, rhs.position, 1.0E-2, &format!("{}", t));
        assert_close(lhs.velocity, rhs.velocity, 1.0E-3, &format!("{}", t));

        let lhs = cached.clock(g01, t, false).unwrap();
        let rhs = direct.clock(g01, t, false).unwrap();
        assert!((lhs.offset_s - rhs.offset_s).abs() < 1.0E-15);
    }

    assert_eq!(direct.cache_statistics(), Default::default());
}

#[test]
fn velocity_samples() {
    init_logger();
    let (store, g01, orbit) = daily_store(PreciseConfig::default());

    for k in 0..96 {
        let t = at(t0(), k as f64 * 900.0);
        let (_, velocity) = orbit.state(t);
        assert!(store.add_velocity(g01, t, velocity));
    }

    assert!(!store.add_velocity(g01, t0(), Vector3::new(1.0, 2.0, 3.0)));
    assert!(!store.add_velocity(g01, at(t0(), 10.0), Vector3::new(0.0, 2.0, 3.0)));

    for offset_s in [3600.0 + 17.0, 40000.0, 70000.0 + 450.0] {
        let t = at(t0(), offset_s);
        let (_, velocity) = orbit.state(t);
        let state = store.position(g01, t, false).unwrap();
        assert_close(state.velocity, velocity, 1.0E-5, &format!("t0+{}s", offset_s));
    }
}

#[test]
fn undefined_samples() {
    init_logger();
    let g01 = sv("G01");
    let store = PreciseStore::default();
    let position = Vector3::new(1.5E7, -1.0E7, 1.8E7);

    assert!(!store.add_position(
        g01,
        t0(),
        Vector3::new(0.0, -1.0E7, 1.8E7),
        UNDEFINED_CLOCK,
        None,
        None
    ));
    assert!(store.satellites().is_empty());

    // clock only
    assert!(store.add_position(g01, t0(), Vector3::new(0.0, -1.0E7, 1.8E7), 1.0E-4, None, None));
    assert_eq!(store.epoch_count(g01), 0);
    assert_eq!(store.satellites(), vec![g01]);

    // position only
    let t = at(t0(), 900.0);
    assert!(store.add_position(g01, t, position, 999_999_999.999, None, None));
    assert_eq!(store.epoch_count(g01), 1);

    // position already stored, clock is new
    assert!(store.add_position(g01, t, position, 1.0E-4, None, None));
    assert!(!store.add_position(g01, t, position, 1.0E-4, None, None));
    assert_eq!(store.epoch_count(g01), 1);
}

#[test]
fn clean_outer() {
    init_logger();
    let g01 = sv("G01");
    let orbit = CircularOrbit::meo(t0());

    let broadcast = Arc::new(BroadcastStore::default());
    broadcast.add(&gps_record(1, 2200, 172_800.0)).unwrap();

    let store = PreciseStore::with_broadcast(PreciseConfig::default(), broadcast.clone());
    store.set_agency("IGS");
    assert_eq!(store.agency(), Some("IGS".to_string()));

    load_sp3(&store, g01, &orbit, t0(), 900.0, 96);
    store.add_clock("G01", t0(), &[1.0E-4]).unwrap();

    let t = at(t0(), 15.0 * 900.0);
    assert!(store.position(g01, t, false).is_ok());

    let (begin, end) = (at(t0(), 10.0 * 900.0), at(t0(), 20.0 * 900.0));

    // 85 positions, 85 clocks, 1 clock RINEX sample and 1 broadcast record
    assert_eq!(store.clean_outer(begin, end), 172);
    assert_eq!(store.epoch_count(g01), 11);
    assert_eq!(store.clock_count(&ClockId::from(g01)), 0);
    assert!(broadcast.is_empty());

    // remaining samples are still usable
    let (position, _) = orbit.state(t);
    assert_close(
        store.position(g01, t, false).unwrap().position,
        position,
        5.0E-2,
        "after eviction",
    );

    // broadcast store was emptied too
    let t = at(t0(), 5.0 * 900.0);
    assert_eq!(
        store.position(g01, t, false),
        Err(Error::UnknownSatellite(g01))
    );

    assert_eq!(store.clean_outer(begin, end), 0);
    assert_eq!(store.clean_outer(at(end, 1.0), at(end, 3600.0)), 22);
    assert!(store.satellites().is_empty());
}
