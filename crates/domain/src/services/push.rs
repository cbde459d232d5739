//! Push gateway abstraction.
//!
//! Delivery itself belongs to the messaging platform; the service only needs
//! to hand it a message for a topic or a token and manage topic membership.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;

/// Icon and badge shown by web push clients.
pub const WEB_PUSH_ICON: &str = "/favicon.ico";

/// Errors from the push gateway. The display form is what callers surface
/// verbatim.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PushError {
    #[error("{0}")]
    Rejected(String),

    #[error("Push transport error: {0}")]
    Transport(String),

    #[error("Invalid or unregistered push token")]
    InvalidToken,

    #[error("Push notifications are not enabled")]
    NotEnabled,
}

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushTarget {
    Topic(String),
    Token(String),
}

/// A notification message. Data values are strings on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Adds the web push icon and badge.
    pub fn with_web_push_assets(mut self) -> Self {
        self.icon = Some(WEB_PUSH_ICON.to_string());
        self.badge = Some(WEB_PUSH_ICON.to_string());
        self
    }

    pub fn with_data(mut self, data: BTreeMap<String, String>) -> Self {
        self.data = data;
        self
    }
}

/// Per-token outcome of a multicast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MulticastReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<Result<String, PushError>>,
}

/// Push gateway trait.
#[async_trait::async_trait]
pub trait PushGateway: Send + Sync {
    /// Sends one message, returning the platform's message id.
    async fn send(&self, target: PushTarget, message: &PushMessage) -> Result<String, PushError>;

    /// Sends the same message to every token concurrently. One failure does
    /// not stop the rest; `results` keeps the order of `tokens`.
    async fn send_multicast(&self, tokens: &[String], message: &PushMessage) -> MulticastReport {
        let results = join_all(
            tokens
                .iter()
                .map(|token| self.send(PushTarget::Token(token.clone()), message)),
        )
        .await;

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        MulticastReport {
            success_count,
            failure_count: results.len() - success_count,
            results,
        }
    }

    async fn subscribe_to_topic(&self, tokens: &[String], topic: &str) -> Result<(), PushError>;
}

/// Mock push gateway for development and testing.
///
/// Logs and records messages but doesn't deliver them.
#[derive(Debug, Default)]
pub struct MockPushGateway {
    /// When set, every call fails with `PushError::Rejected(message)`.
    pub simulate_failure: Option<String>,
    sent: Mutex<Vec<(PushTarget, PushMessage)>>,
    subscriptions: Mutex<Vec<(String, String)>>,
}

impl MockPushGateway {
    /// Create a new mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock gateway whose calls fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            simulate_failure: Some(message.into()),
            ..Default::default()
        }
    }

    /// Messages accepted so far.
    pub fn sent(&self) -> Vec<(PushTarget, PushMessage)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// `(token, topic)` pairs subscribed so far.
    pub fn subscriptions(&self) -> Vec<(String, String)> {
        self.subscriptions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PushGateway for MockPushGateway {
    async fn send(&self, target: PushTarget, message: &PushMessage) -> Result<String, PushError> {
        if let Some(reason) = &self.simulate_failure {
            tracing::warn!(push_target = ?target, reason = %reason, "Mock: simulated push failure");
            return Err(PushError::Rejected(reason.clone()));
        }

        tracing::info!(
            push_target = ?target,
            title = %message.title,
            "Mock: would send push notification"
        );

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| PushError::Transport("mock state poisoned".to_string()))?;
        sent.push((target, message.clone()));
        Ok(format!("projects/mock/messages/{}", sent.len()))
    }

    async fn subscribe_to_topic(&self, tokens: &[String], topic: &str) -> Result<(), PushError> {
        if let Some(reason) = &self.simulate_failure {
            return Err(PushError::Rejected(reason.clone()));
        }

        tracing::info!(topic = %topic, tokens = tokens.len(), "Mock: would subscribe to topic");

        let mut subscriptions = self
            .subscriptions
            .lock()
            .map_err(|_| PushError::Transport("mock state poisoned".to_string()))?;
        for token in tokens {
            subscriptions.push((token.clone(), topic.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_gateway_records_messages() {
        let gateway = MockPushGateway::new();
        let id = gateway
            .send(
                PushTarget::Topic("all".to_string()),
                &PushMessage::new("Hello", "World"),
            )
            .await
            .unwrap();
        assert!(id.starts_with("projects/mock/messages/"));
        assert_eq!(gateway.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_gateway_surfaces_reason_verbatim() {
        let gateway = MockPushGateway::failing("quota exceeded");
        let err = gateway
            .send(
                PushTarget::Topic("all".to_string()),
                &PushMessage::new("a", "b"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_multicast_counts_each_token() {
        let gateway = MockPushGateway::new();
        let tokens = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let report = gateway
            .send_multicast(&tokens, &PushMessage::new("t", "b"))
            .await;
        assert_eq!(report.success_count, 3);
        assert_eq!(report.failure_count, 0);

        let failing = MockPushGateway::failing("down");
        let report = failing
            .send_multicast(&tokens, &PushMessage::new("t", "b"))
            .await;
        assert_eq!(report.success_count, 0);
        assert_eq!(report.failure_count, 3);
    }

    /// Holds every send until all tokens have started.
    struct RendezvousGateway {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait::async_trait]
    impl PushGateway for RendezvousGateway {
        async fn send(&self, target: PushTarget, _message: &PushMessage) -> Result<String, PushError> {
            self.barrier.wait().await;
            match target {
                PushTarget::Token(token) if token == "bad" => Err(PushError::InvalidToken),
                PushTarget::Token(token) => Ok(format!("sent/{}", token)),
                PushTarget::Topic(_) => Err(PushError::NotEnabled),
            }
        }

        async fn subscribe_to_topic(&self, _tokens: &[String], _topic: &str) -> Result<(), PushError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_multicast_sends_tokens_concurrently() {
        let tokens = vec!["a".to_string(), "bad".to_string(), "c".to_string()];
        let gateway = RendezvousGateway {
            barrier: tokio::sync::Barrier::new(tokens.len()),
        };

        let report = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            gateway.send_multicast(&tokens, &PushMessage::new("t", "b")),
        )
        .await
        .expect("sends should not wait on each other");

        assert_eq!(report.success_count, 2);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.results[0], Ok("sent/a".to_string()));
        assert_eq!(report.results[1], Err(PushError::InvalidToken));
        assert_eq!(report.results[2], Ok("sent/c".to_string()));
    }

    #[test]
    fn test_web_push_assets() {
        let message = PushMessage::new("t", "b").with_web_push_assets();
        assert_eq!(message.icon.as_deref(), Some("/favicon.ico"));
        assert_eq!(message.badge.as_deref(), Some("/favicon.ico"));
    }
}
