#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use bars_core::{Bar, BarStore, Granularity, StoreError};

/// Arguments captured from one store call.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Latest {
        symbol: String,
        granularity: Granularity,
        before: NaiveDateTime,
        limit: u32,
    },
    Range {
        symbol: String,
        granularity: Granularity,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// In-memory bar store that serves a fixed ascending series and records
/// every call it receives.
#[derive(Default)]
pub struct MockStore {
    pub bars: Vec<Bar>,
    pub fail: bool,
    pub scramble_order: bool,
    pub calls: Mutex<Vec<StoreCall>>,
}

impl MockStore {
    pub fn with_bars(bars: Vec<Bar>) -> Self {
        Self {
            bars,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn finish(&self, mut bars: Vec<Bar>) -> Result<Vec<Bar>, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        if self.scramble_order {
            bars.reverse();
        }
        Ok(bars)
    }
}

#[async_trait]
impl BarStore for MockStore {
    async fn fetch_latest(
        &self,
        symbol: &str,
        granularity: Granularity,
        before: NaiveDateTime,
        limit: u32,
    ) -> Result<Vec<Bar>, StoreError> {
        self.calls.lock().expect("calls lock").push(StoreCall::Latest {
            symbol: symbol.to_string(),
            granularity,
            before,
            limit,
        });
        let eligible: Vec<Bar> = self
            .bars
            .iter()
            .filter(|bar| bar.timestamp <= before)
            .cloned()
            .collect();
        let skip = eligible.len().saturating_sub(limit as usize);
        self.finish(eligible.into_iter().skip(skip).collect())
    }

    async fn fetch_range(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, StoreError> {
        self.calls.lock().expect("calls lock").push(StoreCall::Range {
            symbol: symbol.to_string(),
            granularity,
            start,
            end,
        });
        let bars = self
            .bars
            .iter()
            .filter(|bar| bar.timestamp >= start && bar.timestamp <= end)
            .cloned()
            .collect();
        self.finish(bars)
    }
}

pub fn ts(text: &str) -> NaiveDateTime {
    text.parse().expect("valid timestamp")
}

pub fn bar(timestamp: &str) -> Bar {
    Bar {
        timestamp: ts(timestamp),
        open: 24.10,
        high: 24.55,
        low: 23.98,
        close: 24.32,
        volume: 15_300,
    }
}

/// Fifteen-minute series for one trading hour, ascending.
pub fn quarter_hour_series() -> Vec<Bar> {
    vec![
        bar("2025-08-01T06:15:00"),
        bar("2025-08-01T06:30:00"),
        bar("2025-08-01T06:45:00"),
        bar("2025-08-01T07:00:00"),
        bar("2025-08-01T07:15:00"),
        bar("2025-08-01T07:30:00"),
    ]
}
