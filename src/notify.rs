/// Push notification delivery via OneSignal.
///
/// Sends are always best-effort: a failed or rejected send is logged and
/// never aborts the run.
use crate::config::NotifyConfig;
use crate::detect::Outcome;
use serde_json::Value;
use tracing::{info, warn};

/// A detected page change, handed to the notifier.
#[derive(Debug, Clone, Copy)]
pub struct Change {
    pub was: u64,
    pub now: u64,
}

impl Change {
    /// Extract a `Change` from a change outcome, if it is one.
    pub fn from_outcome(outcome: &Outcome) -> Option<Self> {
        match outcome {
            Outcome::Changed { was, now } => Some(Self {
                was: *was,
                now: *now,
            }),
            _ => None,
        }
    }
}

/// Errors from sending a notification.
#[derive(Debug)]
pub enum NotifyError {
    Request { source: reqwest::Error },
    Status { status: reqwest::StatusCode, body: String },
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Request { source } => {
                write!(f, "notification request failed: {}", source)
            }
            NotifyError::Status { status, body } => {
                write!(f, "notification service returned {}: {}", status, body)
            }
        }
    }
}

impl std::error::Error for NotifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NotifyError::Request { source } => Some(source),
            NotifyError::Status { .. } => None,
        }
    }
}

/// Anything that can deliver a change notification.
pub trait Notifier {
    fn send(
        &self,
        change: &Change,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}

/// OneSignal REST API notifier.
pub struct OneSignalNotifier {
    client: reqwest::Client,
    endpoint: String,
    app_id: Option<String>,
    api_key: Option<String>,
    heading: String,
    message: String,
    link: String,
}

impl OneSignalNotifier {
    pub fn new(
        config: &NotifyConfig,
        app_id: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            app_id,
            api_key,
            heading: config.heading.clone(),
            message: config.message.clone(),
            link: config.link.clone(),
        }
    }
}

/// Build the OneSignal request body.
pub fn notification_payload(app_id: &str, heading: &str, message: &str, link: &str) -> Value {
    let mut payload = serde_json::json!({
        "app_id": app_id,
        "headings": { "en": heading },
        "contents": { "en": message },
    });
    if !link.is_empty() {
        payload["url"] = Value::String(link.to_string());
    }
    payload
}

impl Notifier for OneSignalNotifier {
    async fn send(&self, change: &Change) -> Result<(), NotifyError> {
        let (app_id, api_key) = match (&self.app_id, &self.api_key) {
            (Some(id), Some(key)) => (id, key),
            _ => {
                warn!("ONESIGNAL_APP_ID or ONESIGNAL_API_KEY not set, skipping notification");
                return Ok(());
            }
        };

        let payload = notification_payload(app_id, &self.heading, &self.message, &self.link);

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Basic {}", api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Request { source: e })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status, body });
        }

        info!(was = change.was, now = change.now, "notification sent");
        Ok(())
    }
}
