use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::NaiveDateTime;
use serde_json::Value;
use tower::ServiceExt;

use bars_core::{Bar, BarStore, Clock, Granularity, StoreError};
use bars_http::rest_router;

struct FixedStore {
    bars: Vec<Bar>,
    fail: bool,
}

#[async_trait]
impl BarStore for FixedStore {
    async fn fetch_latest(
        &self,
        _symbol: &str,
        _granularity: Granularity,
        before: NaiveDateTime,
        limit: u32,
    ) -> Result<Vec<Bar>, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        let eligible: Vec<Bar> = self
            .bars
            .iter()
            .filter(|bar| bar.timestamp <= before)
            .cloned()
            .collect();
        let skip = eligible.len().saturating_sub(limit as usize);
        Ok(eligible.into_iter().skip(skip).collect())
    }

    async fn fetch_range(
        &self,
        _symbol: &str,
        _granularity: Granularity,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(self
            .bars
            .iter()
            .filter(|bar| bar.timestamp >= start && bar.timestamp <= end)
            .cloned()
            .collect())
    }
}

struct TestClock;

impl Clock for TestClock {
    fn now(&self) -> NaiveDateTime {
        ts("2025-08-01T08:00:00")
    }
}

fn ts(text: &str) -> NaiveDateTime {
    text.parse().expect("valid timestamp")
}

fn bar(timestamp: &str) -> Bar {
    Bar {
        timestamp: ts(timestamp),
        open: 24.10,
        high: 24.55,
        low: 23.98,
        close: 24.32,
        volume: 15_300,
    }
}

fn app(fail: bool) -> axum::Router {
    let store = FixedStore {
        bars: vec![
            bar("2025-08-01T06:15:00"),
            bar("2025-08-01T06:30:00"),
            bar("2025-08-01T06:45:00"),
            bar("2025-08-01T07:00:00"),
        ],
        fail,
    };
    rest_router(Arc::new(store), Arc::new(TestClock))
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("valid request"))
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body readable");
    let value = serde_json::from_slice(&bytes).expect("JSON body");
    (status, value)
}

#[tokio::test]
async fn latest_bars_returns_chronological_data_with_count() {
    let (status, body) = get_json(
        app(false),
        "/api/latest_bars/15min/sz002353?end_time=2025-08-01T07:00:00&limit=2",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["time_level"], "15min");
    assert_eq!(body["stock_code"], "sz002353");
    assert_eq!(body["data"][0]["timestamp"], "2025-08-01T06:45:00");
    assert_eq!(body["data"][1]["timestamp"], "2025-08-01T07:00:00");
}

#[tokio::test]
async fn bars_range_empty_window_is_a_200_with_zero_count() {
    let (status, body) = get_json(
        app(false),
        "/api/bars_range/15min/sz002353?start_time=2026-01-01T00:00:00&end_time=2026-01-02T00:00:00",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"].as_array().expect("data array").len(), 0);
}

#[tokio::test]
async fn invalid_time_level_is_a_bad_request() {
    let (status, body) = get_json(
        app(false),
        "/api/latest_bars/daily/sz002353",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error message").contains("daily"));
}

#[tokio::test]
async fn inverted_range_is_a_bad_request() {
    let (status, body) = get_json(
        app(false),
        "/api/bars_range/15min/sz002353?start_time=2025-08-01T07:00:00&end_time=2025-08-01T06:00:00",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error message").contains("start_time"));
}

#[tokio::test]
async fn store_failure_is_a_bad_gateway() {
    let (status, body) = get_json(app(true), "/api/latest_bars/15min/sz002353").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().expect("error message").contains("unavailable"));
}
