use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::{
    error::Error,
    prelude::{Epoch, TimeScale},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Default Klobuchar coefficients (alpha, beta) used when no
    /// broadcast GPS ionospheric model was ever proposed.
    pub static ref DEFAULT_KLOBUCHAR: ([f64; 4], [f64; 4]) = (
        [0.1118E-07, -0.7451E-08, -0.5961E-07, 0.1192E-06],
        [0.1167E+06, -0.2294E+06, -0.1311E+06, 0.1049E+07],
    );
}

/// Correction codes, as found in broadcast navigation headers.
/// Ionospheric models and time system offsets share the same table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CorrectionCode {
    /// GPS Klobuchar alpha terms
    GPSA,
    /// GPS Klobuchar beta terms
    GPSB,
    /// Galileo NeQuick-G terms
    GAL,
    /// BeiDou Klobuchar alpha terms
    BDSA,
    /// BeiDou Klobuchar beta terms
    BDSB,
    /// QZSS Klobuchar alpha terms
    QZSA,
    /// QZSS Klobuchar beta terms
    QZSB,
    /// IRNSS Klobuchar alpha terms
    IRNA,
    /// IRNSS Klobuchar beta terms
    IRNB,
    /// |GPST - UTC|
    GPUT,
    /// |GST - UTC|
    GAUT,
    /// |GST - GPST|
    GAGP,
    /// |BDT - UTC|
    BDUT,
    /// |BDT - GPST|
    BDGP,
    /// |QZSST - UTC|
    QZUT,
    /// |QZSST - GPST|
    QZGP,
    /// |IRNSST - UTC|
    IRUT,
    /// |IRNSST - GPST|
    IRGP,
    /// |GLONASST - UTC|
    GLUT,
    /// |GLONASST - GPST|
    GLGP,
}

impl CorrectionCode {
    /// True if this code describes an ionospheric model
    pub fn is_ionospheric(&self) -> bool {
        matches!(
            self,
            Self::GPSA
                | Self::GPSB
                | Self::GAL
                | Self::BDSA
                | Self::BDSB
                | Self::QZSA
                | Self::QZSB
                | Self::IRNA
                | Self::IRNB
        )
    }

    /// Returns (lhs, rhs) [TimeScale]s of a time system correction.
    /// Systems hifitime does not distinguish (QZSST, IRNSST) are aliased to GPST.
    pub fn timescales(&self) -> Option<(TimeScale, TimeScale)> {
        match self {
            Self::GPUT | Self::QZUT | Self::IRUT => Some((TimeScale::GPST, TimeScale::UTC)),
            Self::GAUT => Some((TimeScale::GST, TimeScale::UTC)),
            Self::GAGP => Some((TimeScale::GST, TimeScale::GPST)),
            Self::BDUT => Some((TimeScale::BDT, TimeScale::UTC)),
            Self::BDGP => Some((TimeScale::BDT, TimeScale::GPST)),
            Self::GLUT => Some((TimeScale::UTC, TimeScale::UTC)),
            Self::GLGP => Some((TimeScale::UTC, TimeScale::GPST)),
            Self::QZGP | Self::IRGP => Some((TimeScale::GPST, TimeScale::GPST)),
            _ => None,
        }
    }
}

impl std::fmt::Display for CorrectionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for CorrectionCode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GPSA" => Ok(Self::GPSA),
            "GPSB" => Ok(Self::GPSB),
            "GAL" => Ok(Self::GAL),
            "BDSA" => Ok(Self::BDSA),
            "BDSB" => Ok(Self::BDSB),
            "QZSA" => Ok(Self::QZSA),
            "QZSB" => Ok(Self::QZSB),
            "IRNA" => Ok(Self::IRNA),
            "IRNB" => Ok(Self::IRNB),
            "GPUT" => Ok(Self::GPUT),
            "GAUT" => Ok(Self::GAUT),
            "GAGP" | "GPGA" => Ok(Self::GAGP),
            "BDUT" => Ok(Self::BDUT),
            "BDGP" => Ok(Self::BDGP),
            "QZUT" => Ok(Self::QZUT),
            "QZGP" => Ok(Self::QZGP),
            "IRUT" => Ok(Self::IRUT),
            "IRGP" => Ok(Self::IRGP),
            "GLUT" => Ok(Self::GLUT),
            "GLGP" => Ok(Self::GLGP),
            _ => Err(Error::UnknownCorrectionCode),
        }
    }
}

/// Side table of ionospheric and time system corrections.
/// Each code is written once: the first writer wins.
///
/// Time system corrections are stored as `[a0, a1, t_ref (s of week), week]`.
#[derive(Debug, Clone, Default)]
pub struct Corrections {
    table: BTreeMap<CorrectionCode, [f64; 4]>,
}

impl Corrections {
    /// Stores a new correction. Returns false when this code
    /// was already defined, in which case nothing is modified.
    pub fn add(&mut self, code: CorrectionCode, values: [f64; 4]) -> bool {
        if self.table.contains_key(&code) {
            return false;
        }
        self.table.insert(code, values);
        true
    }

    /// Returns the terms stored for this [CorrectionCode]
    pub fn get(&self, code: CorrectionCode) -> Option<[f64; 4]> {
        self.table.get(&code).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns GPS Klobuchar (alpha, beta) terms, or the
    /// default model when not both are available.
    pub fn klobuchar(&self) -> ([f64; 4], [f64; 4]) {
        match (self.get(CorrectionCode::GPSA), self.get(CorrectionCode::GPSB)) {
            (Some(alpha), Some(beta)) => (alpha, beta),
            _ => *DEFAULT_KLOBUCHAR,
        }
    }

    /// Evaluates a time system correction `a0 + a1 * (t - t_ref)`, in seconds.
    pub fn time_correction_seconds(&self, code: CorrectionCode, t: Epoch) -> Result<f64, Error> {
        let (lhs, _) = code.timescales().ok_or(Error::UnknownTimeCorrection)?;
        let [a0, a1, t_ref_s, week] = self.get(code).ok_or(Error::UnknownTimeCorrection)?;

        if !(week >= 0.0) || !(t_ref_s >= 0.0) {
            return Err(Error::UnknownTimeCorrection);
        }

        let t_ref = Epoch::from_time_of_week(
            week as u32,
            (t_ref_s * 1.0E9).round() as u64,
            TimeScale::GPST,
        )
        .to_time_scale(lhs);

        let dt_s = (t - t_ref).to_seconds();
        Ok(a0 + a1 * dt_s)
    }

    /// Returns the correction between two [TimeScale]s, in seconds,
    /// whichever way it was stored.
    pub fn timescale_correction_seconds(
        &self,
        t: Epoch,
        lhs: TimeScale,
        rhs: TimeScale,
    ) -> Result<f64, Error> {
        if let Some(code) = self
            .table
            .keys()
            .find(|code| code.timescales() == Some((lhs, rhs)))
        {
            self.time_correction_seconds(*code, t)
        } else if let Some(code) = self
            .table
            .keys()
            .find(|code| code.timescales() == Some((rhs, lhs)))
        {
            let correction = self.time_correction_seconds(*code, t)?;
            Ok(-correction)
        } else {
            Err(Error::UnknownTimeCorrection)
        }
    }
}
