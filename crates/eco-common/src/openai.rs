//! Minimal OpenAI-compatible chat client used for fact extraction.
//!
//! Transient failures (timeouts, connection errors, 429 and 5xx) are retried with capped
//! exponential backoff; everything else is returned to the caller immediately.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub default_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl OpenAiClientConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let default_timeout = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let max_retries = std::env::var("OPENAI_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(3);

        let initial_backoff = std::env::var("OPENAI_RETRY_INITIAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(200));

        let max_backoff = std::env::var("OPENAI_RETRY_MAX_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(5_000));

        let max_error_body_bytes = std::env::var("OPENAI_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_timeout,
            max_retries,
            initial_backoff,
            max_backoff,
            max_error_body_bytes,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAiClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct OpenAiClient {
    config: OpenAiClientConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, OpenAiClientError> {
        let http = reqwest::Client::builder()
            .user_agent("eco-advisor/fact-extractor")
            .build()?;
        Ok(Self { config, http })
    }

    /// POST `/chat/completions`, retrying transient failures up to `max_retries` times.
    pub async fn chat_completions(
        &self,
        request: ChatCompletionRequest,
        timeout_override: Option<Duration>,
    ) -> Result<ChatCompletionResponse, OpenAiClientError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let timeout = timeout_override.unwrap_or(self.config.default_timeout);

        let mut retries = 0;
        loop {
            let outcome = self.send_once(&url, &request, timeout).await;
            let err = match outcome {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            if retries >= self.config.max_retries || !should_retry(&err) {
                return Err(err);
            }
            let delay =
                backoff_delay(self.config.initial_backoff, self.config.max_backoff, retries);
            retries += 1;
            warn!(
                model = %request.model,
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "chat completion failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(
        &self,
        url: &str,
        request: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<ChatCompletionResponse, OpenAiClientError> {
        let mut builder = self.http.post(url).timeout(timeout).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            let bytes = resp.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
        let body = read_capped_body(resp, self.config.max_error_body_bytes).await;
        Err(upstream_error(status, body))
    }
}

/// Prefer the structured `{"error": {"message": ...}}` envelope; fall back to the raw body.
fn upstream_error(status: StatusCode, body: String) -> OpenAiClientError {
    match serde_json::from_str::<OpenAiErrorEnvelope>(&body) {
        Ok(envelope) => OpenAiClientError::Upstream {
            status,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| "unknown upstream error".to_string()),
        },
        Err(_) => OpenAiClientError::UpstreamBody { status, body },
    }
}

/// Read at most `max_bytes` of an error body; the rest of the stream is never buffered.
pub(crate) async fn read_capped_body(mut resp: reqwest::Response, max_bytes: usize) -> String {
    let mut buf = Vec::new();
    while buf.len() < max_bytes {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(max_bytes - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read upstream error body");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn should_retry(err: &OpenAiClientError) -> bool {
    match err {
        OpenAiClientError::Request(e) => e.is_timeout() || e.is_connect() || e.is_body(),
        OpenAiClientError::Upstream { status, .. }
        | OpenAiClientError::UpstreamBody { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        OpenAiClientError::InvalidJson(_) => false,
    }
}

/// `initial * 2^retry`, capped at `max`, plus up to 25% jitter.
fn backoff_delay(initial: Duration, max: Duration, retry: u32) -> Duration {
    let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
    let capped = initial.saturating_mul(factor).min(max);
    let capped_ms = capped.as_millis() as u64;
    capped + Duration::from_millis(jitter_ms(capped_ms / 4))
}

fn jitter_ms(max_inclusive: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);
    nanos % (max_inclusive + 1)
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorObject,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorObject {
    message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// `{"type": "json_object"}` asks the model for a single JSON object reply.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: Option<String>,
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: Option<ChatCompletionUsage>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if the upstream returned any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: Option<u32>,
    pub message: ChatCompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionMessage {
    pub role: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_config(base_url: String, max_error_body_bytes: usize) -> OpenAiClientConfig {
        OpenAiClientConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            default_timeout: Duration::from_secs(5),
            max_retries: 0,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            max_error_body_bytes,
        }
    }

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "m".to_string(),
            messages: vec![Message::user("hi")],
            temperature: None,
            max_tokens: None,
            response_format: None,
        }
    }

    #[tokio::test]
    async fn test_error_body_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("x".repeat(64 * 1024)))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(format!("{}/v1", server.uri()), 100))
            .expect("client builds");
        let err = client
            .chat_completions(request(), None)
            .await
            .expect_err("upstream rejects");
        match err {
            OpenAiClientError::UpstreamBody { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body.len(), 100);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_error_envelope_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"error":{"message":"invalid api key"}}"#),
            )
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(format!("{}/v1", server.uri()), 8 * 1024))
            .expect("client builds");
        let err = client
            .chat_completions(request(), None)
            .await
            .expect_err("upstream rejects");
        assert!(matches!(
            err,
            OpenAiClientError::Upstream { ref message, .. } if message == "invalid api key"
        ));
    }

    #[test]
    fn test_retry_classification() {
        let throttled = OpenAiClientError::Upstream {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "slow down".to_string(),
        };
        let unavailable = OpenAiClientError::UpstreamBody {
            status: StatusCode::BAD_GATEWAY,
            body: "<html>".to_string(),
        };
        let rejected = OpenAiClientError::Upstream {
            status: StatusCode::BAD_REQUEST,
            message: "bad model".to_string(),
        };
        let garbled = OpenAiClientError::InvalidJson(
            serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        );
        assert!(should_retry(&throttled));
        assert!(should_retry(&unavailable));
        assert!(!should_retry(&rejected));
        assert!(!should_retry(&garbled));
    }

    #[test]
    fn test_backoff_is_capped() {
        let initial = Duration::from_millis(200);
        let max = Duration::from_millis(1_000);
        let first = backoff_delay(initial, max, 0);
        assert!(first >= initial && first <= Duration::from_millis(250));
        let late = backoff_delay(initial, max, 40);
        assert!(late >= max && late <= Duration::from_millis(1_250));
    }

    #[test]
    fn test_response_first_content() {
        let resp: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{}"},"finish_reason":"stop"}],"usage":null}"#,
        )
        .expect("valid response");
        assert_eq!(resp.first_content(), Some("{}"));

        let empty: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[]}"#).expect("valid response");
        assert_eq!(empty.first_content(), None);
    }

    #[test]
    fn test_request_omits_unset_fields() {
        let req = ChatCompletionRequest {
            model: "m".to_string(),
            messages: vec![Message::user("hi")],
            temperature: Some(0.0),
            max_tokens: None,
            response_format: Some(ResponseFormat::json_object()),
        };
        let json = serde_json::to_value(&req).expect("serializes");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert!(json.get("max_tokens").is_none());
    }
}
