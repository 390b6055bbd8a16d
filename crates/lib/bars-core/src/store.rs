//! Abstract bar query collaborator.
//!
//! The external managed store is consumed through [`BarStore`]; both query
//! shapes must return ascending, duplicate-free sequences or signal a fetch
//! failure. An empty sequence is a valid result, not an error.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::bar::{Bar, Granularity};

#[derive(Debug)]
pub enum StoreError {
    /// The store was unreachable, timed out, or rejected the query.
    Unavailable(String),
    /// The store answered but the payload could not be trusted.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "bar store unavailable: {message}"),
            Self::Corrupt(message) => write!(f, "bar store returned corrupt data: {message}"),
        }
    }
}

impl Error for StoreError {}

/// Read-only query interface over the external bar store.
#[async_trait]
pub trait BarStore: Send + Sync {
    /// Fetches the `limit` most recent bars with timestamp at or before
    /// `before`, returned in ascending timestamp order.
    async fn fetch_latest(
        &self,
        symbol: &str,
        granularity: Granularity,
        before: NaiveDateTime,
        limit: u32,
    ) -> Result<Vec<Bar>, StoreError>;

    /// Fetches all bars with `start <= timestamp <= end`, ascending.
    async fn fetch_range(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, StoreError>;
}
