//! Intraday bar data model.
//!
//! A [`Bar`] is one OHLCV observation for a fixed [`Granularity`]. Bars are
//! owned entirely by the external store: this system transports them but
//! never constructs or mutates one.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One open/high/low/close/volume observation.
///
/// Timestamps are exchange-local naive datetimes serialized as ISO 8601.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Bar series granularity. Selects which underlying table is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    #[serde(rename = "15min")]
    Min15,
    #[serde(rename = "30min")]
    Min30,
    #[serde(rename = "60min")]
    Min60,
}

impl Granularity {
    pub const ALL: [Self; 3] = [Self::Min15, Self::Min30, Self::Min60];

    /// Wire token used in tool parameters and REST paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Min15 => "15min",
            Self::Min30 => "30min",
            Self::Min60 => "60min",
        }
    }

    /// Name of the backing store table holding this series.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Min15 => "bars_15min",
            Self::Min30 => "bars_30min",
            Self::Min60 => "bars_60min",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct GranularityParseError {
    pub value: String,
}

impl fmt::Display for GranularityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = &self.value;
        write!(f, "invalid time level: {value}, expected one of 15min, 30min, 60min")
    }
}

impl Error for GranularityParseError {}

impl FromStr for Granularity {
    type Err = GranularityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "15min" => Ok(Self::Min15),
            "30min" => Ok(Self::Min30),
            "60min" => Ok(Self::Min60),
            other => Err(GranularityParseError {
                value: other.to_string(),
            }),
        }
    }
}

/// Returns true when timestamps are strictly ascending with no duplicates.
///
/// A violation indicates corrupt upstream data and must be surfaced to the
/// caller, never silently reordered.
#[must_use]
pub fn strictly_ascending(bars: &[Bar]) -> bool {
    bars.windows(2).all(|pair| pair[0].timestamp < pair[1].timestamp)
}
