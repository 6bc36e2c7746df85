use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::clock::MonotonicClock;
use crate::config::Config;
use crate::error::BojApiError;
use crate::params::WireParams;
use crate::retry::RetryPolicy;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::telemetry::{BojEvent, BojObserver, NoopObserver};
use crate::throttle::AsyncMinIntervalThrottler;

use super::{as_query_pairs, build_url, decode_body, network_error, Page};

/// Async HTTP transport backed by `reqwest::Client`.
pub struct AsyncTransport {
    base_url: String,
    user_agent: String,
    client: reqwest::Client,
    throttler: AsyncMinIntervalThrottler<MonotonicClock>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    observer: Arc<dyn BojObserver>,
    closed: AtomicBool,
}

impl AsyncTransport {
    pub fn new(config: &Config, retry: RetryPolicy, observer: Arc<dyn BojObserver>) -> Result<Self, BojApiError> {
        Self::with_sleeper(config, retry, observer, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        config: &Config,
        retry: RetryPolicy,
        observer: Arc<dyn BojObserver>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, BojApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.transport.timeout_connect)
            .timeout(config.transport.timeout_read)
            .gzip(true)
            .build()
            .map_err(|err| network_error(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            user_agent: config.user_agent.clone(),
            client,
            throttler: AsyncMinIntervalThrottler::new(
                config.throttling.min_wait_interval,
                MonotonicClock::default(),
                sleeper.clone(),
            ),
            retry,
            sleeper,
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

    pub async fn request(&self, endpoint: &'static str, params: &WireParams) -> Result<Page, BojApiError> {
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
            self.throttler.wait().await;

            let outcome = async {
                let response = self
                    .client
                    .get(&url)
                    .query(&as_query_pairs(params))
                    .header(reqwest::header::USER_AGENT, &self.user_agent)
                    .send()
                    .await
                    .map_err(|err| network_error(err.to_string()))?;
                let http_status = response.status().as_u16();
                let body_text = response.text().await.map_err(|err| network_error(err.to_string()))?;
                decode_body(&body_text, http_status)
            }
            .await;

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
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for AsyncTransport {
    fn default() -> Self {
        let config = Config::builder("https://example.test").build().expect("default config is valid");
        Self::new(&config, RetryPolicy::builder().build(), Arc::new(NoopObserver)).expect("default transport builds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closing_rejects_further_requests() {
        let config = Config::builder("https://example.test").build().unwrap();
        let transport =
            AsyncTransport::new(&config, RetryPolicy::builder().build(), Arc::new(NoopObserver)).unwrap();
        transport.close();
        transport.close(); // idempotent
        let err = transport.request("getDataCode", &vec![]).await.unwrap_err();
        assert!(err.is_client_closed());
    }
}
