use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::clock::MonotonicClock;
use crate::config::Config;
use crate::error::BojApiError;
use crate::params::WireParams;
use crate::retry::RetryPolicy;
use crate::telemetry::{BojEvent, BojObserver, NoopObserver};
use crate::throttle::MinIntervalThrottler;

use super::{as_query_pairs, build_url, decode_body, network_error, Page};

/// Blocking HTTP transport backed by `reqwest::blocking::Client`.
pub struct SyncTransport {
    base_url: String,
    user_agent: String,
    client: reqwest::blocking::Client,
    throttler: MinIntervalThrottler<MonotonicClock>,
    retry: RetryPolicy,
    observer: Arc<dyn BojObserver>,
    closed: AtomicBool,
}

impl SyncTransport {
    pub fn new(config: &Config, retry: RetryPolicy, observer: Arc<dyn BojObserver>) -> Result<Self, BojApiError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.transport.timeout_connect)
            .timeout(config.transport.timeout_read)
            .gzip(true)
            .build()
            .map_err(|err| network_error(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            user_agent: config.user_agent.clone(),
            client,
            throttler: MinIntervalThrottler::new(config.throttling.min_wait_interval, MonotonicClock::default()),
            retry,
            observer,
            closed: AtomicBool::new(false),
        })
    }

    /// Idempotent. Further `request` calls after closing fail with
    /// `BojApiError::ClientClosed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn request(&self, endpoint: &'static str, params: &WireParams) -> Result<Page, BojApiError> {
        if self.is_closed() {
            return Err(BojApiError::ClientClosed);
        }

        let url = build_url(&self.base_url, endpoint);
        let started_at = Instant::now();
        let mut attempt = 0usize;

        loop {
            if self.is_closed() {
                return Err(BojApiError::ClientClosed);
            }

            self.observer.emit(BojEvent::RequestStart { operation: endpoint, attempt });
            self.throttler.wait();

            let outcome = self
                .client
                .get(&url)
                .query(&as_query_pairs(params))
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .send()
                .map_err(|err| network_error(err.to_string()))
                .and_then(|response| {
                    let http_status = response.status().as_u16();
                    let body_text =
                        response.text().map_err(|err| network_error(err.to_string()))?;
                    decode_body(&body_text, http_status)
                });

            match outcome {
                Ok(page) => {
                    self.observer.emit(BojEvent::RequestSucceeded {
                        operation: endpoint,
                        attempts: attempt + 1,
                        duration: started_at.elapsed(),
                    });
                    return Ok(page);
                }
                Err(err) => {
                    let retryable = matches!(err, BojApiError::Transport { .. })
                        || BojApiError::is_retryable_api_status(err.status());
                    if !retryable || !self.retry.can_retry(attempt, started_at.elapsed()) {
                        return Err(err);
                    }
                    let delay = self.retry.backoff_delay(attempt);
                    self.observer.emit(BojEvent::RequestRetry {
                        operation: endpoint,
                        attempt,
                        delay,
                        reason: err.to_string(),
                    });
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for SyncTransport {
    fn default() -> Self {
        let config = Config::builder("https://example.test").build().expect("default config is valid");
        Self::new(&config, RetryPolicy::builder().build(), Arc::new(NoopObserver)).expect("default transport builds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn closing_rejects_further_requests() {
        let config = Config::builder("https://example.test").build().unwrap();
        let transport = SyncTransport::new(&config, RetryPolicy::builder().build(), Arc::new(NoopObserver)).unwrap();
        transport.close();
        transport.close(); // idempotent
        let err = transport.request("getDataCode", &vec![]).unwrap_err();
        assert!(err.is_client_closed());
    }

    #[test]
    fn build_url_used_for_requests_has_no_double_slash() {
        assert_eq!(super::build_url("https://example.test/", "getDataCode"), "https://example.test/getDataCode");
    }

    #[test]
    fn transport_can_be_constructed_with_custom_timeouts() {
        let config = Config::builder("https://example.test")
            .timeouts(Duration::from_secs(1), Duration::from_secs(1), Duration::from_secs(1), Duration::from_secs(1))
            .build()
            .unwrap();
        assert!(SyncTransport::new(&config, RetryPolicy::builder().build(), Arc::new(NoopObserver)).is_ok());
    }
}
