//! Page fetchers: the reqwest client used against real phones and a
//! scriptable mock for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::error::SurveyError;
use super::traits::PageFetcher;
use super::types::Endpoint;

/// Plain-HTTP client for the phones' embedded web servers.
///
/// Phones sit on voice VLANs, so environment proxies are ignored.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, SurveyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| SurveyError::Http(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    fn map_request_error(&self, e: reqwest::Error, address: &str, endpoint: Endpoint) -> SurveyError {
        if e.is_timeout() {
            SurveyError::Timeout {
                endpoint,
                ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_connect() {
            SurveyError::Connect(address.to_string())
        } else {
            SurveyError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, address: &str, endpoint: Endpoint) -> Result<String, SurveyError> {
        let url = format!("http://{}{}", address, endpoint.path());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e, address, endpoint))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SurveyError::HttpStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| self.map_request_error(e, address, endpoint))
    }
}

/// Scripted reply for one (address, endpoint) pair.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Page(String),
    Timeout,
    Refused,
    /// Never answers; only a caller-side timeout ends the call.
    Hang,
}

/// Mock fetcher for testing. Serves canned pages and records calls.
///
/// Pairs with no scripted reply answer HTTP 404. Tracks the number of
/// concurrent calls so tests can check the batch concurrency ceiling.
#[derive(Default)]
pub struct MockPageFetcher {
    replies: HashMap<(String, Endpoint), MockResponse>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: Mutex<Vec<(String, Endpoint)>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, address: &str, endpoint: Endpoint, reply: MockResponse) -> Self {
        self.replies.insert((address.to_string(), endpoint), reply);
        self
    }

    pub fn with_page(self, address: &str, endpoint: Endpoint, body: &str) -> Self {
        self.with_reply(address, endpoint, MockResponse::Page(body.to_string()))
    }

    /// Script the three record pages of one phone.
    pub fn with_phone(self, address: &str, network: &str, port: &str, device: &str) -> Self {
        self.with_page(address, Endpoint::NetworkConfiguration, network)
            .with_page(address, Endpoint::PortInformation, port)
            .with_page(address, Endpoint::DeviceInformation, device)
    }

    /// Every call to `address` is refused.
    pub fn with_refused(mut self, address: &str) -> Self {
        for endpoint in [
            Endpoint::NetworkConfiguration,
            Endpoint::PortInformation,
            Endpoint::DeviceInformation,
            Endpoint::StatusMessages,
            Endpoint::DebugDisplay,
        ] {
            self = self.with_reply(address, endpoint, MockResponse::Refused);
        }
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Endpoint)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, address: &str) -> Vec<Endpoint> {
        self.calls()
            .into_iter()
            .filter(|(a, _)| a == address)
            .map(|(_, e)| e)
            .collect()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, address: &str, endpoint: Endpoint) -> Result<String, SurveyError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((address.to_string(), endpoint));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.replies.get(&(address.to_string(), endpoint)) {
            Some(MockResponse::Page(body)) => Ok(body.clone()),
            Some(MockResponse::Timeout) => Err(SurveyError::Timeout { endpoint, ms: 0 }),
            Some(MockResponse::Refused) => Err(SurveyError::Connect(address.to_string())),
            Some(MockResponse::Hang) => std::future::pending().await,
            None => Err(SurveyError::HttpStatus {
                endpoint,
                status: 404,
            }),
        }
    }
}
