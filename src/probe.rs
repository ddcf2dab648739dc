/// Page fetch: one GET against the watched URL, measuring the decoded
/// body length. Only the length is used; the content is discarded.
use crate::config::PageConfig;
use std::time::Duration;
use tracing::debug;

/// What a single fetch observed about the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Character count of the decoded response body.
    pub size: u64,
}

/// Errors from fetching the watched page.
#[derive(Debug)]
pub enum ProbeError {
    /// Transport-level failure (DNS, connect, timeout, decode).
    Request { source: reqwest::Error },
    /// The server answered with a non-success status.
    Status { status: reqwest::StatusCode },
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Request { source } => write!(f, "page fetch failed: {}", source),
            ProbeError::Status { status } => {
                write!(f, "page fetch returned {}", status)
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Request { source } => Some(source),
            ProbeError::Status { .. } => None,
        }
    }
}

/// Anything that can produce an [`Observation`] of the watched page.
///
/// The runner is generic over this so it can be exercised without a
/// network.
pub trait PageSource {
    fn observe(&self) -> impl std::future::Future<Output = Result<Observation, ProbeError>> + Send;
}

/// HTTP implementation of [`PageSource`].
pub struct PageProbe {
    client: reqwest::Client,
    url: String,
}

impl PageProbe {
    /// Build a probe from page config. The timeout covers the whole
    /// request, not just the connect.
    pub fn new(url: &str, page: &PageConfig) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(page.timeout_secs))
            .user_agent(page.user_agent.clone())
            .build()
            .map_err(|e| ProbeError::Request { source: e })?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl PageSource for PageProbe {
    async fn observe(&self) -> Result<Observation, ProbeError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ProbeError::Request { source: e })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProbeError::Status { status });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ProbeError::Request { source: e })?;

        let size = body.chars().count() as u64;
        debug!(url = %self.url, size, "page fetched");
        Ok(Observation { size })
    }
}
