//! Remote completion collaborator.
//!
//! The assistant never talks to the model provider directly: it posts
//! `{apiKey, messages}` to a mediating chat endpoint, which answers with the provider's
//! `{choices: [{message: {content}}]}` body on success or `{error}` with a non-success
//! status on failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion transport failed: {0}")]
    Transport(String),
    #[error("completion endpoint returned {status}: {reason}")]
    Remote { status: u16, reason: String },
    #[error("completion response was malformed: {0}")]
    Malformed(String),
    #[error("completion timed out after {0}s")]
    Timeout(u64),
}

impl CompletionError {
    /// Human-readable reason shown to the user in the chat.
    pub fn reason(&self) -> String {
        match self {
            Self::Transport(message) | Self::Malformed(message) => message.clone(),
            Self::Remote { reason, .. } => reason.clone(),
            Self::Timeout(secs) => format!("nessuna risposta entro {secs} secondi"),
        }
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the text of the first choice.
    async fn complete(
        &self,
        api_key: &SecretString,
        messages: &[ChatMessage],
    ) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyRequest<'a> {
    api_key: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ProxyResponse {
    choices: Vec<ProxyChoice>,
}

#[derive(Deserialize)]
struct ProxyChoice {
    message: ProxyMessage,
}

#[derive(Deserialize)]
struct ProxyMessage {
    content: String,
}

const FALLBACK_REMOTE_REASON: &str = "Errore API";

pub struct ProxyCompletionClient {
    client: Client,
    endpoint: String,
}

impl ProxyCompletionClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| CompletionError::Transport(error.to_string()))?;
        Ok(Self { client, endpoint: endpoint.into() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for ProxyCompletionClient {
    async fn complete(
        &self,
        api_key: &SecretString,
        messages: &[ChatMessage],
    ) -> Result<String, CompletionError> {
        let request = ProxyRequest { api_key: api_key.expose_secret(), messages };
        debug!(
            event_name = "llm.proxy.request",
            endpoint = %self.endpoint,
            message_count = messages.len(),
            "sending completion request"
        );

        let response =
            self.client.post(&self.endpoint).json(&request).send().await.map_err(|error| {
                if error.is_timeout() {
                    warn!(event_name = "llm.proxy.timeout", error = %error, "completion timed out");
                } else {
                    warn!(event_name = "llm.proxy.transport", error = %error, "completion request failed");
                }
                CompletionError::Transport(error.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.ok();
            let reason = body.as_ref().and_then(error_reason).unwrap_or_else(|| {
                FALLBACK_REMOTE_REASON.to_string()
            });
            warn!(
                event_name = "llm.proxy.rejected",
                status = status.as_u16(),
                reason = %reason,
                "completion endpoint returned an error"
            );
            return Err(CompletionError::Remote { status: status.as_u16(), reason });
        }

        let body = response
            .json::<ProxyResponse>()
            .await
            .map_err(|error| CompletionError::Malformed(error.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Malformed("response contained no choices".to_string()))
    }
}

/// Accepts `{"error": "..."}` as well as the provider's `{"error": {"message": "..."}}`.
fn error_reason(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    let reason = match error {
        Value::String(reason) => reason.clone(),
        Value::Object(fields) => fields.get("message")?.as_str()?.to_string(),
        _ => return None,
    };
    let reason = reason.trim().to_string();
    (!reason.is_empty()).then_some(reason)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{http::StatusCode, routing::post, Json, Router};
    use secrecy::SecretString;
    use serde_json::{json, Value};

    use super::{error_reason, ChatMessage, CompletionClient, CompletionError, ProxyCompletionClient};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}/api/chat")
    }

    fn key() -> SecretString {
        SecretString::from("gsk-test".to_string())
    }

    #[tokio::test]
    async fn posts_api_key_and_messages_and_returns_first_choice() {
        let captured = Arc::new(Mutex::new(None::<Value>));
        let sink = captured.clone();
        let router = Router::new().route(
            "/api/chat",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    if let Ok(mut slot) = sink.lock() {
                        *slot = Some(body);
                    }
                    Json(json!({
                        "id": "cmpl-1",
                        "choices": [{"message": {"role": "assistant", "content": " ciao "}}]
                    }))
                }
            }),
        );
        let endpoint = serve(router).await;
        let client = ProxyCompletionClient::new(endpoint, Duration::from_secs(5)).expect("client");

        let reply = client
            .complete(&key(), &[ChatMessage::system("sistema"), ChatMessage::user("ciao")])
            .await
            .expect("completion");

        assert_eq!(reply, " ciao ");
        let body = captured.lock().expect("lock").clone().expect("request captured");
        assert_eq!(body["apiKey"], "gsk-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "ciao"}));
    }

    #[tokio::test]
    async fn non_success_status_surfaces_error_reason() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async {
                (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid API Key"})))
            }),
        );
        let endpoint = serve(router).await;
        let client = ProxyCompletionClient::new(endpoint, Duration::from_secs(5)).expect("client");

        let error = client.complete(&key(), &[ChatMessage::user("ciao")]).await.expect_err("401");
        assert_eq!(
            error,
            CompletionError::Remote { status: 401, reason: "Invalid API Key".to_string() }
        );
        assert_eq!(error.reason(), "Invalid API Key");
    }

    #[tokio::test]
    async fn error_without_body_uses_generic_reason() {
        let router = Router::new()
            .route("/api/chat", post(|| async { StatusCode::BAD_GATEWAY }));
        let endpoint = serve(router).await;
        let client = ProxyCompletionClient::new(endpoint, Duration::from_secs(5)).expect("client");

        let error = client.complete(&key(), &[ChatMessage::user("ciao")]).await.expect_err("502");
        assert_eq!(error.reason(), "Errore API");
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let router = Router::new()
            .route("/api/chat", post(|| async { Json(json!({"choices": []})) }));
        let endpoint = serve(router).await;
        let client = ProxyCompletionClient::new(endpoint, Duration::from_secs(5)).expect("client");

        let error = client.complete(&key(), &[ChatMessage::user("ciao")]).await.expect_err("empty");
        assert!(matches!(error, CompletionError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        drop(listener);
        let client =
            ProxyCompletionClient::new(format!("http://{address}/api/chat"), Duration::from_secs(2))
                .expect("client");

        let error = client.complete(&key(), &[ChatMessage::user("ciao")]).await.expect_err("refused");
        assert!(matches!(error, CompletionError::Transport(_)));
    }

    #[test]
    fn extracts_nested_provider_error_message() {
        assert_eq!(
            error_reason(&json!({"error": {"message": "rate limited", "type": "tokens"}})),
            Some("rate limited".to_string())
        );
        assert_eq!(error_reason(&json!({"error": "  "})), None);
        assert_eq!(error_reason(&json!({"detail": "x"})), None);
    }
}
