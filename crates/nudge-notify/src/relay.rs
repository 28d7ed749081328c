//! HTTP mail-relay sender.
//!
//! Posts the reminder as JSON to a relay endpoint that owns the actual SMTP
//! conversation. The request is bounded by the configured timeout; a timeout
//! is reported as [`NotifyError::Timeout`] and the scheduler treats it like
//! any other send failure.

use std::time::Duration;

use async_trait::async_trait;
use nudge_core::{config::NotifierConfig, ReminderMessage};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::NotifyError;
use crate::sender::NotificationSender;

/// Wire shape expected by the relay's /send endpoint.
#[derive(Debug, Serialize)]
struct RelayPayload<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

pub struct HttpRelaySender {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpRelaySender {
    pub fn new(config: &NotifierConfig) -> Result<Self, NotifyError> {
        if config.endpoint.is_empty() {
            return Err(NotifyError::Config("relay endpoint is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| NotifyError::Config(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    async fn post(&self, msg: &ReminderMessage) -> Result<(), NotifyError> {
        let payload = RelayPayload {
            to: &msg.destination,
            subject: &msg.subject,
            body: &msg.body,
        };

        let mut req = self.client.post(&self.endpoint).json(&payload);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| NotifyError::ConnectionFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            warn!(%status, task_id = %msg.task_id, "relay rejected reminder");
            return Err(NotifyError::SendFailed(format!(
                "relay returned {status}: {detail}"
            )));
        }

        debug!(task_id = %msg.task_id, to = %msg.destination, "reminder accepted by relay");
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for HttpRelaySender {
    async fn send(&self, msg: &ReminderMessage) -> Result<(), NotifyError> {
        match tokio::time::timeout(self.timeout, self.post(msg)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout {
                ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
