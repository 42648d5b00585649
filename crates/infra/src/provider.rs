//! Outbound messaging provider (WhatsApp Cloud API).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::ProviderSettings;
use crate::payload::ProviderPayload;

/// Successful send response, e.g.
/// `{"messaging_product":"whatsapp","contacts":[...],"messages":[{"id":"wamid..."}]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub messaging_product: Option<String>,
    #[serde(default)]
    pub contacts: Vec<ProviderContact>,
    #[serde(default)]
    pub messages: Vec<ProviderMessage>,
}

impl ProviderResponse {
    pub fn with_message_id(id: impl Into<String>) -> Self {
        Self {
            messaging_product: Some("whatsapp".to_string()),
            contacts: Vec::new(),
            messages: vec![ProviderMessage {
                id: id.into(),
                message_status: None,
            }],
        }
    }

    /// Id of the first accepted message, if the provider returned one.
    pub fn message_id(&self) -> Option<&str> {
        self.messages.first().map(|m| m.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderContact {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub wa_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub id: String,
    #[serde(default)]
    pub message_status: Option<String>,
}

/// Provider call failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider responded with HTTP {status}")]
    Status {
        status: u16,
        body: Option<JsonValue>,
    },
    #[error("provider request timed out")]
    Timeout,
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("invalid provider response: {0}")]
    Decode(String),
    #[error("{0} not configured")]
    NotConfigured(&'static str),
}

impl ProviderError {
    pub fn status(status: u16, body: Option<JsonValue>) -> Self {
        Self::Status { status, body }
    }

    /// 429, any 5xx, and call-level timeouts may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Timeout => true,
            _ => false,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&JsonValue> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Human-readable reason reported by the provider.
    ///
    /// Graph API errors look like
    /// `{"error":{"message":..,"error_user_msg":..,"error_data":{"details":..}}}`;
    /// the most specific field wins. Plain-text bodies are returned as is.
    pub fn detail(&self) -> Option<String> {
        let body = self.body()?;
        if let Some(text) = body.as_str() {
            return (!text.trim().is_empty()).then(|| text.to_string());
        }

        let error = body.get("error").unwrap_or(body);
        [
            error.pointer("/error_data/details"),
            error.get("error_user_msg"),
            error.get("message"),
        ]
        .into_iter()
        .flatten()
        .filter_map(JsonValue::as_str)
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else if err.is_decode() {
        ProviderError::Decode(err.to_string())
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// The external messaging API as seen by the dispatcher.
#[async_trait::async_trait]
pub trait MessageProvider: Send + Sync {
    /// Whether endpoint and credentials are present. Checked before a job is created.
    fn is_configured(&self) -> bool {
        true
    }

    /// One send attempt; no retries at this level.
    async fn send_template(&self, payload: &ProviderPayload)
    -> Result<ProviderResponse, ProviderError>;

    /// Templates registered for the business account (raw provider JSON).
    async fn list_templates(&self) -> Result<JsonValue, ProviderError> {
        Err(ProviderError::NotConfigured("template listing"))
    }
}

/// `reqwest`-backed WhatsApp Cloud API client.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl WhatsAppClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self { http, settings })
    }

    async fn read_failure(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(text) if text.trim().is_empty() => None,
            Ok(text) => Some(serde_json::from_str(&text).unwrap_or(JsonValue::String(text))),
            Err(_) => None,
        };
        ProviderError::status(status, body)
    }
}

#[async_trait::async_trait]
impl MessageProvider for WhatsAppClient {
    fn is_configured(&self) -> bool {
        self.settings.messages_endpoint().is_some()
    }

    async fn send_template(
        &self,
        payload: &ProviderPayload,
    ) -> Result<ProviderResponse, ProviderError> {
        let (endpoint, token) = self
            .settings
            .messages_endpoint()
            .ok_or(ProviderError::NotConfigured("WhatsApp messages endpoint"))?;

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }

        let parsed: ProviderResponse = response.json().await.map_err(map_reqwest_error)?;
        debug!(to = %payload.to, message_id = ?parsed.message_id(), "provider accepted message");
        Ok(parsed)
    }

    async fn list_templates(&self) -> Result<JsonValue, ProviderError> {
        let url = self
            .settings
            .templates_url()
            .ok_or(ProviderError::NotConfigured("WhatsApp business account"))?;
        let token = self
            .settings
            .access_token
            .as_deref()
            .ok_or(ProviderError::NotConfigured("WhatsApp access token"))?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }
        response.json().await.map_err(map_reqwest_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wabulk_core::{Contact, TemplateRequest};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::payload::PayloadBuilder;

    fn settings_for(server: &MockServer) -> ProviderSettings {
        ProviderSettings {
            endpoint: Some(format!("{}/v21.0/123/messages", server.uri())),
            access_token: Some("secret".to_string()),
            business_base_url: Some(format!("{}/v21.0", server.uri())),
            business_account_id: Some("987".to_string()),
            ..ProviderSettings::default()
        }
    }

    fn payload() -> ProviderPayload {
        PayloadBuilder::new("91").build(
            &TemplateRequest::new("promo"),
            &Contact::new("9876543210"),
            "9876543210",
        )
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::status(429, None).is_transient());
        assert!(ProviderError::status(503, None).is_transient());
        assert!(ProviderError::Timeout.is_transient());
        assert!(!ProviderError::status(400, None).is_transient());
        assert!(!ProviderError::status(401, None).is_transient());
        assert!(!ProviderError::Transport("refused".into()).is_transient());
    }

    #[test]
    fn detail_prefers_most_specific_field() {
        let err = ProviderError::status(
            400,
            Some(json!({"error": {
                "message": "(#131009) Parameter value is not valid",
                "error_data": {"details": "Template name does not exist in the translation"}
            }})),
        );
        assert_eq!(
            err.detail().as_deref(),
            Some("Template name does not exist in the translation")
        );

        let err = ProviderError::status(401, Some(json!({"error": {"message": "bad token"}})));
        assert_eq!(err.detail().as_deref(), Some("bad token"));

        let err = ProviderError::status(502, Some(json!("upstream down")));
        assert_eq!(err.detail().as_deref(), Some("upstream down"));

        assert_eq!(ProviderError::Timeout.detail(), None);
    }

    #[tokio::test]
    async fn sends_with_bearer_token_and_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v21.0/123/messages"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({"to": "919876543210", "type": "template"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messaging_product": "whatsapp",
                "contacts": [{"input": "919876543210", "wa_id": "919876543210"}],
                "messages": [{"id": "wamid.ok"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(settings_for(&server)).unwrap();
        let response = client.send_template(&payload()).await.expect("send ok");
        assert_eq!(response.message_id(), Some("wamid.ok"));
    }

    #[tokio::test]
    async fn error_status_keeps_provider_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": {"message": "Invalid parameter"}})),
            )
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(settings_for(&server)).unwrap();
        let err = client.send_template(&payload()).await.unwrap_err();
        assert_eq!(err.http_status(), Some(400));
        assert_eq!(err.detail().as_deref(), Some("Invalid parameter"));
    }

    #[tokio::test]
    async fn lists_templates_for_business_account() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v21.0/987/message_templates"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": [{"name": "promo"}]})),
            )
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(settings_for(&server)).unwrap();
        let templates = client.list_templates().await.unwrap();
        assert_eq!(templates["data"][0]["name"], "promo");
    }

    #[test]
    fn missing_credentials_means_unconfigured() {
        let client = WhatsAppClient::new(ProviderSettings::default()).unwrap();
        assert!(!client.is_configured());
    }
}
