use crate::prelude::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Galileo navigation message source, as described by the
/// "data sources" field of the broadcast record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GalileoSource {
    /// I/NAV message (E1-B and/or E5b-I)
    INAV,

    /// F/NAV message (E5a-I)
    FNAV,
}

impl GalileoSource {
    /// Resolves the message source from the data sources bitmask.
    /// Bit 9 (or bits 0/2) identify I/NAV, bit 8 (or bit 1) F/NAV.
    pub fn from_data_sources(bits: u32) -> Option<Self> {
        if bits & (1 << 9) != 0 || bits & 0b101 != 0 {
            Some(Self::INAV)
        } else if bits & (1 << 8) != 0 || bits & 0b010 != 0 {
            Some(Self::FNAV)
        } else {
            None
        }
    }
}

impl std::fmt::Display for GalileoSource {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::INAV => write!(fmt, "I/NAV"),
            Self::FNAV => write!(fmt, "F/NAV"),
        }
    }
}

impl std::str::FromStr for GalileoSource {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('/', "").as_str() {
            "inav" => Ok(Self::INAV),
            "fnav" => Ok(Self::FNAV),
            _ => Err(Error::InvalidConfig("unknown galileo message source")),
        }
    }
}
