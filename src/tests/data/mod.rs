use std::str::FromStr;

use hifitime::Unit;

use crate::prelude::{
    Constellation, Epoch, PreciseStore, RawEphemeris, TimeScale, Vector3, RAW_FIELDS, SV,
};

mod orbit;
pub use orbit::CircularOrbit;

/// Parses an [SV] description, panics on error
pub fn sv(desc: &str) -> SV {
    SV::from_str(desc.trim()).unwrap_or_else(|_| panic!("Bad SV description: \"{}\"", desc))
}

/// Parses an [Epoch] description, panics on error
pub fn epoch(desc: &str) -> Epoch {
    Epoch::from_str(desc.trim()).unwrap_or_else(|_| panic!("Bad epoch description: \"{}\"", desc))
}

/// Builds a [RawEphemeris] from its textual description
pub fn raw_record(sv_desc: &str, toc_desc: &str, fields: &[f64]) -> RawEphemeris {
    let (sv, toc) = (sv(sv_desc), epoch(toc_desc));
    RawEphemeris::new(sv, toc, fields)
        .unwrap_or_else(|e| panic!("Bad raw record ({}, {}): {}", sv_desc, toc_desc, e))
}

/// Keplerian (LNAV like) field layout, expressed at `sow` of `week`.
/// GPS, QZSS, IRNSS, Galileo and BeiDou share this layout.
pub fn keplerian_fields(week: u32, sow: f64) -> [f64; RAW_FIELDS] {
    let mut fields = [0.0; RAW_FIELDS];
    fields[0] = 2.5E-4; // af0
    fields[1] = -1.1E-12; // af1
    fields[2] = 0.0; // af2
    fields[3] = 50.0; // iode
    fields[4] = -30.0; // crs
    fields[5] = 4.5E-9; // dn
    fields[6] = 1.2; // m0
    fields[7] = -1.5E-6; // cuc
    fields[8] = 0.01; // e
    fields[9] = 8.0E-6; // cus
    fields[10] = 5153.6; // sqrt(a)
    fields[11] = sow; // toe
    fields[12] = 1.0E-7; // cic
    fields[13] = -2.0; // omega0
    fields[14] = -5.0E-8; // cis
    fields[15] = 0.96; // i0
    fields[16] = 220.0; // crc
    fields[17] = 0.7; // omega
    fields[18] = -8.0E-9; // omega dot
    fields[19] = 2.0E-10; // idot
    fields[20] = 1.0; // l2 codes
    fields[21] = week as f64;
    fields[22] = 0.0; // l2p flag
    fields[23] = 2.0; // accuracy
    fields[24] = 0.0; // health
    fields[25] = -1.0E-8; // tgd
    fields[26] = 50.0; // iodc
    fields[27] = sow - 3600.0; // tot
    fields[28] = 4.0; // fit interval
    fields
}

/// GPS record, ToC = ToE = `sow` of `week`
pub fn gps_record(prn: u8, week: u32, sow: f64) -> RawEphemeris {
    let sv = SV::new(Constellation::GPS, prn);
    let toc = Epoch::from_time_of_week(week, (sow * 1.0E9) as u64, TimeScale::GPST);
    RawEphemeris::new(sv, toc, &keplerian_fields(week, sow))
        .unwrap_or_else(|e| panic!("Bad GPS record: {}", e))
}

/// QZSS record, ToC = ToE = `sow` of `week`, transmitted at `tot_sow`
pub fn qzss_record(prn: u8, week: u32, sow: f64, tot_sow: f64) -> RawEphemeris {
    let sv = SV::new(Constellation::QZSS, prn);
    let toc = Epoch::from_time_of_week(week, (sow * 1.0E9) as u64, TimeScale::GPST);

    let mut fields = keplerian_fields(week, sow);
    fields[27] = tot_sow;

    RawEphemeris::new(sv, toc, &fields).unwrap_or_else(|e| panic!("Bad QZSS record: {}", e))
}

/// Galileo record, ToC = ToE = `sow` of (GPS) `week`
pub fn galileo_record(prn: u8, week: u32, sow: f64, data_sources: u32) -> RawEphemeris {
    let sv = SV::new(Constellation::Galileo, prn);
    let toc = Epoch::from_time_of_week(week, (sow * 1.0E9) as u64, TimeScale::GPST)
        .to_time_scale(TimeScale::GST);

    let mut fields = keplerian_fields(week, sow);
    fields[3] = 80.0; // iodnav
    fields[8] = 3.0E-4;
    fields[10] = 5440.6;
    fields[20] = data_sources as f64;
    fields[23] = 3.12; // sisa
    fields[25] = 1.0E-9; // bgd e5a/e1
    fields[26] = 1.2E-9; // bgd e5b/e1
    fields[27] = sow - 600.0;
    fields[28] = 0.0;

    RawEphemeris::new(sv, toc, &fields).unwrap_or_else(|e| panic!("Bad GAL record: {}", e))
}

/// BeiDou record, ToC = ToE = `sow` of BDT `week`
pub fn beidou_record(prn: u8, week: u32, sow: f64) -> RawEphemeris {
    let sv = SV::new(Constellation::BeiDou, prn);
    let toc = Epoch::from_time_of_week(week, (sow * 1.0E9) as u64, TimeScale::BDT);

    let mut fields = keplerian_fields(week, sow);
    fields[3] = 1.0; // aode
    fields[10] = if prn <= 5 || prn >= 59 { 6493.4 } else { 5282.6 };
    fields[15] = if prn <= 5 || prn >= 59 { 0.05 } else { 0.96 };
    fields[25] = 2.0E-9; // tgd1
    fields[26] = -3.0E-9; // tgd2
    fields[27] = sow - 1800.0;
    fields[28] = 1.0; // aodc

    RawEphemeris::new(sv, toc, &fields).unwrap_or_else(|e| panic!("Bad BDS record: {}", e))
}

/// GLONASS record at `toc` (UTC)
pub fn glonass_record(prn: u8, toc: Epoch, channel: f64) -> RawEphemeris {
    let sv = SV::new(Constellation::Glonass, prn);
    let toc = toc.to_time_scale(TimeScale::UTC);
    let (_, _, _, h, m, s, _) = toc.to_gregorian_utc();
    let sod = h as f64 * 3600.0 + m as f64 * 60.0 + s as f64;

    let mut fields = [0.0; RAW_FIELDS];
    fields[0] = -1.0E-5; // -tau_n
    fields[1] = 1.0E-12; // gamma_n
    fields[2] = sod - 30.0; // tk
    fields[3] = 1.2E7;
    fields[4] = 1.5E3;
    fields[5] = 1.0E-6;
    fields[6] = 0.0; // health
    fields[7] = -1.3E7;
    fields[8] = 2.0E3;
    fields[9] = -2.0E-6;
    fields[10] = channel;
    fields[11] = 1.6E7;
    fields[12] = 0.5E3;
    fields[13] = 0.0;
    fields[14] = 0.0; // age

    RawEphemeris::new(sv, toc, &fields).unwrap_or_else(|e| panic!("Bad GLO record: {}", e))
}

/// SBAS (GEO) record, `sow` of `week`
pub fn sbas_record(prn: u8, week: u32, sow: f64) -> RawEphemeris {
    let sv = SV::new(Constellation::EGNOS, prn);
    let toc = Epoch::from_time_of_week(week, (sow * 1.0E9) as u64, TimeScale::GPST);

    let mut fields = [0.0; RAW_FIELDS];
    fields[0] = 1.0E-8;
    fields[1] = 0.0;
    fields[2] = sow - 60.0; // tot
    fields[3] = 4.0E7;
    fields[4] = 1.0;
    fields[5] = 0.0;
    fields[6] = 0.0; // health
    fields[7] = 1.0E7;
    fields[8] = -2.0;
    fields[9] = 0.0;
    fields[10] = 4.0; // ura
    fields[11] = 1.0E5;
    fields[12] = 0.1;
    fields[13] = 0.0;
    fields[14] = 12.0; // iodn

    RawEphemeris::new(sv, toc, &fields).unwrap_or_else(|e| panic!("Bad SBAS record: {}", e))
}

/// Proposes `count` SP3 samples of this [CircularOrbit] at `interval_s`,
/// starting at `t0`. Clock offsets follow a linear model.
pub fn load_sp3(
    store: &PreciseStore,
    sv: SV,
    orbit: &CircularOrbit,
    t0: Epoch,
    interval_s: f64,
    count: usize,
) {
    for i in 0..count {
        let t = t0 + (i as f64 * interval_s) * Unit::Second;
        let (position, _) = orbit.state(t);
        let clock = sp3_clock(t0, t);
        assert!(
            store.add_position(sv, t, position, clock, Some(Vector3::new(0.01, 0.01, 0.02)), None),
            "failed to load {}({})",
            t,
            sv
        );
    }
}

/// Clock model used by [load_sp3]
pub fn sp3_clock(t0: Epoch, t: Epoch) -> f64 {
    1.0E-4 + 1.0E-11 * (t - t0).to_seconds()
}
