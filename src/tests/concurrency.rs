use std::{sync::Arc, thread};

use hifitime::Unit;

use crate::{
    prelude::{BroadcastStore, Epoch, PreciseConfig, PreciseStore, SV},
    tests::{epoch, gps_record, init_logger, load_sp3, sv, CircularOrbit},
};

const READERS: usize = 4;

fn t0() -> Epoch {
    epoch("2022-03-01T00:00:00 GPST")
}

#[test]
fn shared_broadcast_store() {
    init_logger();
    let store = Arc::new(BroadcastStore::default());

    let satellites = (1..=8).map(|prn| sv(&format!("G{:02}", prn))).collect::<Vec<SV>>();

    for prn in 1..=4 {
        store.add(&gps_record(prn, 2200, 172_800.0)).unwrap();
    }

    let t = t0() + 1800.0 * Unit::Second;

    // single threaded reference
    let reference = satellites[..4]
        .iter()
        .map(|sv| store.position(*sv, t, true).unwrap())
        .collect::<Vec<_>>();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for prn in 5..=8 {
                for k in 0..12 {
                    store
                        .add(&gps_record(prn, 2200, 172_800.0 + k as f64 * 7200.0))
                        .unwrap();
                }
            }
        })
    };

    let readers = (0..READERS)
        .map(|_| {
            let store = Arc::clone(&store);
            let satellites = satellites.clone();
            let reference = reference.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    for (sv, expected) in satellites.iter().zip(reference.iter()) {
                        let eph = store.find(*sv, t, true).unwrap();
                        assert_eq!(store.position(*sv, t, true).unwrap(), *expected);
                        assert_eq!(eph.position(t).unwrap(), *expected);
                    }
                    for sv in satellites[4..].iter() {
                        // not yet ingested, or usable
                        if let Ok(state) = store.position(*sv, t, true) {
                            assert!(state.position.norm() > 2.0E7);
                        }
                    }
                }
            })
        })
        .collect::<Vec<_>>();

    let cleaner = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let (begin, end) = (t0(), t0() + 7.0 * Unit::Day);
            for _ in 0..100 {
                store.clean_outer(begin, end);
            }
        })
    };

    writer.join().unwrap();
    cleaner.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.len(), 4 + 4 * 12);
    for sv in satellites[4..].iter() {
        assert_eq!(store.epoch_count(*sv), 12);
    }
}

#[test]
fn shared_precise_store() {
    init_logger();
    let g01 = sv("G01");
    let orbit = CircularOrbit::meo(t0());

    let broadcast = Arc::new(BroadcastStore::default());
    let store = Arc::new(PreciseStore::with_broadcast(
        PreciseConfig::default(),
        Arc::clone(&broadcast),
    ));

    load_sp3(&store, g01, &orbit, t0(), 900.0, 96);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for prn in 2..=6 {
                let sv = sv(&format!("G{:02}", prn));
                let orbit = CircularOrbit {
                    u0: prn as f64,
                    ..CircularOrbit::meo(t0())
                };
                load_sp3(&store, sv, &orbit, t0(), 900.0, 96);
                for k in 0..2880 {
                    let t = t0() + (k as f64 * 30.0) * Unit::Second;
                    store.add_clock(sv, t, &[1.0E-4, 1.0E-12]).unwrap();
                }
            }
        })
    };

    let broadcast_writer = {
        let broadcast = Arc::clone(&broadcast);
        thread::spawn(move || {
            for k in 0..12 {
                broadcast
                    .add(&gps_record(1, 2200, 172_800.0 + k as f64 * 7200.0))
                    .unwrap();
            }
        })
    };

    let readers = (0..READERS)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for k in 0..500 {
                    let offset_s = ((i * 7919 + k * 173) % 85_000) as f64;
                    let t = t0() + offset_s * Unit::Second;

                    let (state, _) = store.nav(g01, t, false).unwrap();
                    let (expected, _) = orbit.state(t);
                    assert!((state.position - expected).norm() < 5.0E-2, "{}", t);

                    let state = store.position(g01, t, false).unwrap();
                    assert!((state.position - expected).norm() < 5.0E-2, "{}", t);
                }
            })
        })
        .collect::<Vec<_>>();

    writer.join().unwrap();
    broadcast_writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.satellites().len(), 6);
    assert_eq!(broadcast.epoch_count(g01), 12);

    let report = store.cache_statistics();
    assert_eq!(report.nav.hits + report.nav.refits, (READERS * 500) as u64);
    assert_eq!(report.orbit.hits + report.orbit.refits, (READERS * 500) as u64);
}
