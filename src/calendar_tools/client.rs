//! Blocking HTTP access to holiday and calendar feeds.

use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Default per-call timeout for feed requests.
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches a feed body as text. Implemented over HTTP in production and in
/// memory in tests.
pub trait FeedClient: Send + Sync {
    fn get_text(&self, url: &str) -> ServiceResult<String>;
}

impl<T: FeedClient + ?Sized> FeedClient for Box<T> {
    fn get_text(&self, url: &str) -> ServiceResult<String> {
        (**self).get_text(url)
    }
}

/// `ureq` backed feed client with a fixed timeout and no retry.
pub struct HttpFeedClient {
    agent: ureq::Agent,
}

impl HttpFeedClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for HttpFeedClient {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_TIMEOUT)
    }
}

impl FeedClient for HttpFeedClient {
    fn get_text(&self, url: &str) -> ServiceResult<String> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(ServiceError::ApiError(format!(
                    "{url} returned HTTP {status}"
                )));
            }
            Err(e) => {
                return Err(ServiceError::NetworkError(format!(
                    "failed to fetch {url}: {e}"
                )));
            }
        };

        if response.status() != 200 {
            return Err(ServiceError::ApiError(format!(
                "{url} returned HTTP {}",
                response.status()
            )));
        }

        response
            .into_string()
            .map_err(|e| ServiceError::NetworkError(format!("failed to read {url}: {e}")))
    }
}
