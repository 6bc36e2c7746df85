//! Shared HTTP-mocking helpers for the integration suite: a handful of
//! `Config` presets and a custom `wiremock` matcher for telling request
//! chunks apart by the size of a comma-joined query parameter, since the
//! exact joined string (e.g. 250 codes) is too unwieldy to match literally.

use std::time::Duration;

use boj_api_client::Config;
use serde_json::{json, Value};
use wiremock::{Match, Request};

/// Fast-retrying config: short backoff cap and no throttle wait, so a test
/// that forces a couple of retries does not spend real wall-clock time on
/// it.
pub fn fast_config(base_url: &str) -> Config {
    Config::builder(base_url)
        .max_attempts(2)
        .max_backoff(Duration::from_millis(5))
        .total_retry_budget(Duration::from_secs(5))
        .min_wait_interval(Duration::from_millis(0))
        .build()
        .unwrap()
}

pub fn fast_config_with_checkpointing(base_url: &str) -> Config {
    Config::builder(base_url)
        .max_attempts(2)
        .max_backoff(Duration::from_millis(5))
        .total_retry_budget(Duration::from_secs(5))
        .min_wait_interval(Duration::from_millis(0))
        .checkpoint(true, Duration::from_secs(3600))
        .build()
        .unwrap()
}

pub fn fast_config_with_auto_partition(base_url: &str) -> Config {
    Config::builder(base_url)
        .max_attempts(2)
        .max_backoff(Duration::from_millis(5))
        .min_wait_interval(Duration::from_millis(0))
        .enable_layer_auto_partition(true)
        .build()
        .unwrap()
}

/// A `getDataCode`/`getDataLayer` success body: one `RESULTSET` entry per
/// code, no observations, end of stream.
pub fn series_body(codes: &[String]) -> Value {
    json!({
        "STATUS": 200,
        "MESSAGEID": null,
        "MESSAGE": null,
        "DATE": "2026-07-27",
        "RESULTSET": codes.iter().map(|c| json!({"SERIES_CODE": c})).collect::<Vec<_>>(),
        "NEXTPOSITION": null,
    })
}

pub fn series_body_with_next(codes: &[String], next_position: Option<u64>) -> Value {
    let mut body = series_body(codes);
    body["NEXTPOSITION"] = match next_position {
        Some(p) => json!(p),
        None => Value::Null,
    };
    body
}

pub fn server_error_body() -> Value {
    json!({"STATUS": 500, "MESSAGEID": null, "MESSAGE": "internal error", "DATE": null})
}

/// Matches a request whose query parameter `key` is a comma-joined list
/// with exactly `len` entries (e.g. `code=A,B,C` has `len == 3`).
pub struct CsvParamLen {
    pub key: &'static str,
    pub len: usize,
}

impl Match for CsvParamLen {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .find(|(k, _)| k == self.key)
            .map(|(_, v)| v.split(',').count() == self.len)
            .unwrap_or(false)
    }
}

pub fn codes(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("C{i:04}")).collect()
}
