//! Firebase Cloud Messaging (FCM) push gateway.
//!
//! Sends topic and token notifications through the FCM HTTP v1 API and
//! manages topic membership through the Instance ID batch endpoint.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use domain::services::{PushError, PushGateway, PushMessage, PushTarget};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::FcmConfig;

const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const IID_BATCH_ADD_URL: &str = "https://iid.googleapis.com/iid/v1:batchAdd";

/// Push gateway backed by Firebase Cloud Messaging.
pub struct FcmPushGateway {
    client: Client,
    config: FcmConfig,
    credentials: ServiceAccountCredentials,
    token_cache: RwLock<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Google service account credentials structure.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    client_email: String,
    /// Private key in PEM format.
    private_key: String,
    token_uri: String,
}

/// JWT claims for Google OAuth2 service account authentication.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    message: MessagePayload<'a>,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    notification: Notification<'a>,
    #[serde(skip_serializing_if = "no_data")]
    data: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    webpush: Option<WebpushConfig<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    android: Option<AndroidConfig>,
}

#[derive(Debug, Serialize)]
struct Notification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct WebpushConfig<'a> {
    notification: WebpushNotification<'a>,
}

#[derive(Debug, Serialize)]
struct WebpushNotification<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    badge: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct AndroidConfig {
    priority: &'static str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FcmErrorResponse {
    error: FcmErrorDetails,
}

#[derive(Debug, Deserialize)]
struct FcmErrorDetails {
    message: String,
}

#[derive(Debug, Serialize)]
struct BatchAddRequest<'a> {
    to: String,
    registration_tokens: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
struct BatchAddResponse {
    #[serde(default)]
    results: Vec<BatchAddResult>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchAddResult {
    error: Option<String>,
}

/// Error type for FCM setup.
#[derive(Debug, thiserror::Error)]
pub enum FcmError {
    #[error("Failed to parse credentials: {0}")]
    CredentialsError(String),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("FCM is not enabled")]
    NotEnabled,
}

impl FcmPushGateway {
    /// Create a new FCM push gateway.
    ///
    /// # Errors
    /// Returns an error if FCM is disabled or credentials cannot be parsed.
    pub fn new(config: FcmConfig) -> Result<Self, FcmError> {
        if !config.enabled {
            return Err(FcmError::NotEnabled);
        }

        let credentials = Self::load_credentials(&config.credentials)?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            config,
            credentials,
            token_cache: RwLock::new(None),
        })
    }

    /// Load service account credentials from JSON string or file path.
    fn load_credentials(credentials_source: &str) -> Result<ServiceAccountCredentials, FcmError> {
        if credentials_source.trim().starts_with('{') {
            serde_json::from_str(credentials_source)
                .map_err(|e| FcmError::CredentialsError(format!("Invalid JSON: {}", e)))
        } else {
            let content = std::fs::read_to_string(credentials_source).map_err(|e| {
                FcmError::CredentialsError(format!("Failed to read credentials file: {}", e))
            })?;
            serde_json::from_str(&content)
                .map_err(|e| FcmError::CredentialsError(format!("Invalid credentials JSON: {}", e)))
        }
    }

    /// Get a valid OAuth2 access token, refreshing if necessary.
    async fn access_token(&self) -> Result<String, PushError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(token) = cache.as_ref() {
                // 60s buffer before expiry
                if token.expires_at > Instant::now() + Duration::from_secs(60) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let (access_token, expires_at) = self.fetch_access_token().await?;

        *self.token_cache.write().await = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });

        Ok(access_token)
    }

    async fn fetch_access_token(&self) -> Result<(String, Instant), PushError> {
        let now = Utc::now().timestamp();

        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: MESSAGING_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        let encoding_key =
            jsonwebtoken::EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
                .map_err(|e| PushError::Transport(format!("Invalid private key: {}", e)))?;

        let jwt = jsonwebtoken::encode(&header, &claims, &encoding_key)
            .map_err(|e| PushError::Transport(format!("Failed to create JWT: {}", e)))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PushError::Transport(format!(
                "Token exchange failed: {}",
                error_text
            )));
        }

        let token_response: TokenResponse = response.json().await.map_err(transport)?;
        let expires_at = Instant::now() + Duration::from_secs(token_response.expires_in);

        Ok((token_response.access_token, expires_at))
    }

    fn build_message<'a>(&self, target: &'a PushTarget, message: &'a PushMessage) -> FcmMessage<'a> {
        let (topic, token) = match target {
            PushTarget::Topic(topic) => (Some(topic.as_str()), None),
            PushTarget::Token(token) => (None, Some(token.as_str())),
        };

        let webpush = (message.icon.is_some() || message.badge.is_some()).then(|| WebpushConfig {
            notification: WebpushNotification {
                icon: message.icon.as_deref(),
                badge: message.badge.as_deref(),
            },
        });

        FcmMessage {
            message: MessagePayload {
                topic,
                token,
                notification: Notification {
                    title: &message.title,
                    body: &message.body,
                },
                data: &message.data,
                webpush,
                android: self
                    .config
                    .high_priority
                    .then_some(AndroidConfig { priority: "high" }),
            },
        }
    }
}

fn no_data(data: &&BTreeMap<String, String>) -> bool {
    data.is_empty()
}

fn transport(err: reqwest::Error) -> PushError {
    PushError::Transport(err.to_string())
}

/// Extracts FCM's own error message, falling back to the raw body.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<FcmErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait::async_trait]
impl PushGateway for FcmPushGateway {
    async fn send(&self, target: PushTarget, message: &PushMessage) -> Result<String, PushError> {
        let access_token = self.access_token().await?;

        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.config.project_id
        );
        let payload = self.build_message(&target, message);

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 100ms, 200ms, 400ms, etc.
                tokio::time::sleep(Duration::from_millis(100 * (1 << (attempt - 1)))).await;
            }

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&access_token)
                .json(&payload)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(transport(e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let sent: SendResponse = response.json().await.map_err(transport)?;
                tracing::debug!(push_target = ?target, attempt = %attempt, "FCM message sent");
                return Ok(sent.name);
            }

            let error_text = response.text().await.unwrap_or_default();

            if status.is_server_error() {
                last_error = Some(PushError::Rejected(rejection_message(&error_text)));
                continue;
            }

            if matches!(target, PushTarget::Token(_))
                && (status.as_u16() == 404 || status.as_u16() == 400)
                && (error_text.contains("UNREGISTERED") || error_text.contains("INVALID_ARGUMENT"))
            {
                return Err(PushError::InvalidToken);
            }

            return Err(PushError::Rejected(rejection_message(&error_text)));
        }

        Err(last_error.unwrap_or_else(|| PushError::Transport("Unknown error".to_string())))
    }

    async fn subscribe_to_topic(&self, tokens: &[String], topic: &str) -> Result<(), PushError> {
        if tokens.is_empty() {
            return Ok(());
        }

        let access_token = self.access_token().await?;
        let response = self
            .client
            .post(IID_BATCH_ADD_URL)
            .bearer_auth(&access_token)
            .header("access_token_auth", "true")
            .json(&BatchAddRequest {
                to: format!("/topics/{}", topic),
                registration_tokens: tokens,
            })
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected(rejection_message(&error_text)));
        }

        let body: BatchAddResponse = response.json().await.unwrap_or_default();
        let failures: Vec<&str> = body
            .results
            .iter()
            .filter_map(|r| r.error.as_deref())
            .collect();

        if !failures.is_empty() && failures.len() == tokens.len() {
            return Err(PushError::Rejected(failures[0].to_string()));
        }
        for failure in &failures {
            tracing::warn!(topic = %topic, error = %failure, "Token not added to topic");
        }

        tracing::info!(
            topic = %topic,
            tokens = tokens.len(),
            failures = failures.len(),
            "Tokens subscribed to topic"
        );
        Ok(())
    }
}
