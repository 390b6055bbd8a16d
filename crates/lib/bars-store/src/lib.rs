//! PostgREST-backed implementation of the bar store.
//!
//! The managed store exposes its bar tables through a PostgREST query API
//! (one table per granularity). Each fetch is a single bounded HTTP round
//! trip; the request timeout is enforced here so callers can treat an
//! exceeded deadline as an unavailable upstream.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tracing::debug;

use bars_core::{Bar, BarStore, Granularity, StoreError};

const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Connection settings for the PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl PostgrestConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug)]
pub enum StoreInitError {
    InvalidApiKey,
    Client(reqwest::Error),
}

impl fmt::Display for StoreInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidApiKey => write!(f, "api key is not a valid header value"),
            Self::Client(err) => write!(f, "failed to build http client: {err}"),
        }
    }
}

impl Error for StoreInitError {}

/// Bar store client speaking the PostgREST filter dialect.
#[derive(Debug, Clone)]
pub struct PostgrestBarStore {
    client: Client,
    base_url: String,
}

impl PostgrestBarStore {
    /// Builds a client with the api key headers and request timeout baked in.
    ///
    /// # Errors
    /// Returns [`StoreInitError`] when the api key is not a valid header
    /// value or the HTTP client cannot be constructed.
    pub fn new(config: PostgrestConfig) -> Result<Self, StoreInitError> {
        let key_value = header::HeaderValue::from_str(&config.api_key)
            .map_err(|_| StoreInitError::InvalidApiKey)?;
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| StoreInitError::InvalidApiKey)?;

        let mut headers = header::HeaderMap::new();
        headers.insert("apikey", key_value);
        headers.insert(header::AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(StoreInitError::Client)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, granularity: Granularity) -> String {
        let base = &self.base_url;
        let table = granularity.table();
        format!("{base}/rest/v1/{table}")
    }

    async fn query(
        &self,
        granularity: Granularity,
        filters: &[(String, String)],
    ) -> Result<Vec<Bar>, StoreError> {
        let url = self.table_url(granularity);
        debug!("querying {url}");

        let response = self
            .client
            .get(&url)
            .query(filters)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown store error".to_string());
            return Err(map_status_error(status, &detail));
        }

        let rows: Vec<BarRow> = response
            .json()
            .await
            .map_err(|err| StoreError::Corrupt(err.to_string()))?;
        Ok(rows.into_iter().map(BarRow::into_bar).collect())
    }
}

#[async_trait]
impl BarStore for PostgrestBarStore {
    async fn fetch_latest(
        &self,
        symbol: &str,
        granularity: Granularity,
        before: NaiveDateTime,
        limit: u32,
    ) -> Result<Vec<Bar>, StoreError> {
        let mut bars = self
            .query(granularity, &latest_filters(symbol, before, limit))
            .await?;
        // The query walks backward from `before`; callers get chronological.
        bars.reverse();
        Ok(bars)
    }

    async fn fetch_range(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, StoreError> {
        self.query(granularity, &range_filters(symbol, start, end))
            .await
    }
}

/// One row of a bar table as PostgREST serves it.
#[derive(Debug, Deserialize)]
struct BarRow {
    time: NaiveDateTime,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: u64,
}

impl BarRow {
    fn into_bar(self) -> Bar {
        Bar {
            timestamp: self.time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

fn latest_filters(symbol: &str, before: NaiveDateTime, limit: u32) -> Vec<(String, String)> {
    vec![
        ("select".to_string(), "*".to_string()),
        ("stock_code".to_string(), format!("eq.{symbol}")),
        (
            "time".to_string(),
            format!("lte.{}", before.format(QUERY_TIME_FORMAT)),
        ),
        ("order".to_string(), "time.desc".to_string()),
        ("limit".to_string(), limit.to_string()),
    ]
}

fn range_filters(symbol: &str, start: NaiveDateTime, end: NaiveDateTime) -> Vec<(String, String)> {
    vec![
        ("select".to_string(), "*".to_string()),
        ("stock_code".to_string(), format!("eq.{symbol}")),
        (
            "time".to_string(),
            format!("gte.{}", start.format(QUERY_TIME_FORMAT)),
        ),
        (
            "time".to_string(),
            format!("lte.{}", end.format(QUERY_TIME_FORMAT)),
        ),
        ("order".to_string(), "time.asc".to_string()),
    ]
}

fn map_transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Unavailable("request timed out".to_string())
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

fn map_status_error(status: StatusCode, detail: &str) -> StoreError {
    StoreError::Unavailable(format!("store responded {status}: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(text: &str) -> NaiveDateTime {
        text.parse().expect("valid timestamp")
    }

    #[test]
    fn latest_filters_walk_backward_with_a_limit() {
        let filters = latest_filters("sz002353", ts("2025-08-01T07:00:00"), 5);
        assert!(filters.contains(&("stock_code".to_string(), "eq.sz002353".to_string())));
        assert!(filters.contains(&("time".to_string(), "lte.2025-08-01T07:00:00".to_string())));
        assert!(filters.contains(&("order".to_string(), "time.desc".to_string())));
        assert!(filters.contains(&("limit".to_string(), "5".to_string())));
    }

    #[test]
    fn range_filters_bound_both_ends_ascending() {
        let filters = range_filters("sz002353", ts("2025-08-01T06:00:00"), ts("2025-08-01T07:00:00"));
        let time_filters: Vec<&str> = filters
            .iter()
            .filter(|(key, _)| key == "time")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(
            time_filters,
            ["gte.2025-08-01T06:00:00", "lte.2025-08-01T07:00:00"]
        );
        assert!(filters.contains(&("order".to_string(), "time.asc".to_string())));
    }

    #[test]
    fn bar_row_decodes_store_payloads() {
        let json = r#"{
            "time": "2025-08-01T06:15:00",
            "stock_code": "sz002353",
            "open": 24.1,
            "close": 24.32,
            "high": 24.55,
            "low": 23.98,
            "volume": 15300
        }"#;
        let row: BarRow = serde_json::from_str(json).expect("row decodes");
        let bar = row.into_bar();
        assert_eq!(bar.timestamp, ts("2025-08-01T06:15:00"));
        assert_eq!(bar.volume, 15_300);
    }

    #[test]
    fn base_url_is_normalized() {
        let store = PostgrestBarStore::new(PostgrestConfig::new(
            "https://example.supabase.co/",
            "anon-key",
        ))
        .expect("client builds");
        assert_eq!(
            store.table_url(Granularity::Min30),
            "https://example.supabase.co/rest/v1/bars_30min"
        );
    }
}
