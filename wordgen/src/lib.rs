//! Minimal chat-completion client for generating Hat word lists.
//!
//! This crate talks to any OpenAI-compatible `/chat/completions` endpoint
//! (OpenRouter by default) with:
//! - A fixed system prompt describing the word constraints
//! - A structured-output schema forcing `{"words": [...]}` replies
//! - Mapping of provider error payloads to user-facing categories
//! - The client-side post-filter applied to every returned list

pub mod prompts;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "mistralai/devstral-2512:free";

/// Shortest word (in characters) kept by [`normalize_words`].
pub const MIN_WORD_CHARS: usize = 3;
/// Longest word (in characters) kept by [`normalize_words`].
pub const MAX_WORD_CHARS: usize = 25;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur when using the word client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API token not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error (status {status}, code {code}): {message}")]
    Api {
        status: u16,
        code: u16,
        message: String,
        kind: ApiErrorKind,
    },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Empty response from API")]
    EmptyResponse,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Human-readable text suitable for showing to players.
    pub fn user_message(&self) -> String {
        match self {
            Error::NoApiKey => "No API token configured. Add one in the settings.".to_string(),
            Error::Timeout => "The word service took too long to answer. Try again.".to_string(),
            Error::Api { kind, message, .. } => kind.user_message(message),
            Error::EmptyResponse => "The word service returned an empty answer.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Category of a provider error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 401: the credential was rejected.
    InvalidToken,
    /// 403: the key ran out of quota.
    QuotaExceeded,
    /// 429: too many requests.
    RateLimited,
    Other,
}

impl ApiErrorKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            401 => ApiErrorKind::InvalidToken,
            403 => ApiErrorKind::QuotaExceeded,
            429 => ApiErrorKind::RateLimited,
            _ => ApiErrorKind::Other,
        }
    }

    pub fn user_message(&self, message: &str) -> String {
        match self {
            ApiErrorKind::InvalidToken => "Invalid API token. Check the settings.".to_string(),
            ApiErrorKind::QuotaExceeded => {
                "API key limit exceeded. Check the key limits at https://openrouter.ai/settings/keys"
                    .to_string()
            }
            ApiErrorKind::RateLimited => "Too many requests. Try again later.".to_string(),
            ApiErrorKind::Other => format!("API error: {message}"),
        }
    }
}

/// Chat-completion client that produces word lists.
#[derive(Clone)]
pub struct WordClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    token: String,
}

impl WordClient {
    /// Create a new client with the given bearer token and default endpoint.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            client: build_http_client(DEFAULT_REQUEST_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            token: token.into(),
        })
    }

    /// Create a client from `HAT_AI_TOKEN`, `HAT_AI_BASE_URL` and `HAT_AI_MODEL`.
    pub fn from_env() -> Result<Self, Error> {
        let token = std::env::var("HAT_AI_TOKEN").map_err(|_| Error::NoApiKey)?;
        let mut client = Self::new(token)?;
        if let Ok(base_url) = std::env::var("HAT_AI_BASE_URL") {
            client.base_url = base_url;
        }
        if let Ok(model) = std::env::var("HAT_AI_MODEL") {
            client.model = model;
        }
        Ok(client)
    }

    /// Set the full chat-completions URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the request and connect timeouts.
    pub fn with_timeout(mut self, request: Duration, connect: Duration) -> Result<Self, Error> {
        self.client = build_http_client(request, connect)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat-completion request and return the parsed response.
    pub async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, Error> {
        if self.token.trim().is_empty() {
            return Err(Error::NoApiKey);
        }

        let api_request = self.build_api_request(&request);
        let headers = self.build_headers()?;

        tracing::debug!(url = %self.base_url, model = %api_request.model, "sending chat completion");

        let response = self
            .client
            .post(&self.base_url)
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "chat completion answered");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = parse_api_error(status.as_u16(), &body);
            tracing::warn!(%error, "chat completion failed");
            return Err(error);
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Parse(e.to_string())
            }
        })?;

        Ok(api_response.into())
    }

    /// Ask the model for `count` words on `theme`, avoiding `excluded`.
    ///
    /// The returned list is already normalized: trimmed, length-filtered,
    /// de-duplicated and free of excluded words. It may be shorter than
    /// `count` (or empty) if the model under-delivers.
    pub async fn generate_words(
        &self,
        theme: &str,
        count: usize,
        excluded: &HashSet<String>,
    ) -> Result<Vec<String>, Error> {
        let request = word_list_request(theme, count, excluded);
        let response = self.complete(request).await?;
        let content = response.text().ok_or(Error::EmptyResponse)?;
        let words = parse_word_list(content)?;
        let words = normalize_words(words, excluded);
        tracing::debug!(count = words.len(), "generated new words");
        Ok(words)
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|e| Error::Config(format!("Invalid API token: {e}")))?,
        );
        Ok(headers)
    }

    fn build_api_request(&self, request: &ChatRequest) -> ApiRequest {
        ApiRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            response_format: request.response_format.as_ref().map(|f| ApiResponseFormat {
                r#type: "json_schema".to_string(),
                json_schema: ApiJsonSchema {
                    name: f.name.clone(),
                    schema: f.schema.clone(),
                },
            }),
        }
    }
}

fn build_http_client(request: Duration, connect: Duration) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .timeout(request)
        .connect_timeout(connect)
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))
}

fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(e.to_string())
    }
}

/// Build the word-list request: system prompt, user prompt and output schema.
pub fn word_list_request(theme: &str, count: usize, excluded: &HashSet<String>) -> ChatRequest {
    ChatRequest::new(vec![
        Message::system(prompts::SYSTEM_PROMPT),
        Message::user(prompts::build_user_prompt(theme, count, excluded)),
    ])
    .with_response_format(ResponseFormat::json_schema(
        prompts::WORD_LIST_SCHEMA_NAME,
        prompts::word_list_schema(),
    ))
}

/// Turn a non-2xx body into an [`Error::Api`].
///
/// The code from the payload's `error.code` wins; when the body is not a
/// recognizable error envelope the HTTP status is used instead.
pub fn parse_api_error(status: u16, body: &str) -> Error {
    let envelope = serde_json::from_str::<ApiErrorEnvelope>(body).ok();

    let code = envelope
        .as_ref()
        .and_then(|e| e.error.code.as_ref())
        .and_then(|c| match c {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(status);

    let message = envelope
        .map(|e| e.error.message)
        .unwrap_or_else(|| body.trim().to_string());

    Error::Api {
        status,
        code,
        message,
        kind: ApiErrorKind::from_code(code),
    }
}

/// Parse the assistant message content as `{"words": [...]}`.
///
/// Some models wrap structured output in a Markdown code fence; that is
/// tolerated.
pub fn parse_word_list(content: &str) -> Result<Vec<String>, Error> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str::<WordList>(json.trim())
        .map(|list| list.words)
        .map_err(|e| Error::Parse(format!("word list: {e}")))
}

/// Client-side post-filter for generated words.
///
/// Trims whitespace, drops empty and out-of-range entries (3 to 25
/// characters), removes duplicates (case-sensitive, first occurrence wins)
/// and drops anything already in `excluded`.
pub fn normalize_words<I, S>(words: I, excluded: &HashSet<String>) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    words
        .into_iter()
        .filter_map(|w| {
            let word = w.as_ref().trim();
            let len = word.chars().count();
            if !(MIN_WORD_CHARS..=MAX_WORD_CHARS).contains(&len) || excluded.contains(word) {
                return None;
            }
            seen.insert(word.to_string()).then(|| word.to_string())
        })
        .collect()
}

// ============================================================================
// Public types
// ============================================================================

/// A chat-completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            response_format: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// A message in the conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

/// Structured-output constraint attached to a request.
#[derive(Debug, Clone)]
pub struct ResponseFormat {
    pub name: String,
    pub schema: serde_json::Value,
}

impl ResponseFormat {
    pub fn json_schema(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A chat-completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub choices: Vec<String>,
}

impl ChatResponse {
    /// Content of the first choice, if any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ApiResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiResponseFormat {
    r#type: String,
    json_schema: ApiJsonSchema,
}

#[derive(Debug, Serialize)]
struct ApiJsonSchema {
    name: String,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl From<ApiResponse> for ChatResponse {
    fn from(api: ApiResponse) -> Self {
        Self {
            choices: api
                .choices
                .into_iter()
                .map(|c| c.message.content.unwrap_or_default())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WordList {
    words: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_client_creation() {
        let client = WordClient::new("test-token").unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_client_builder() {
        let client = WordClient::new("test-token")
            .unwrap()
            .with_model("openai/gpt-4o-mini")
            .with_base_url("http://localhost:8080/v1/chat/completions");
        assert_eq!(client.model(), "openai/gpt-4o-mini");
        assert_eq!(client.base_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_empty_token_rejected_before_network() {
        let client = WordClient::new("  ").unwrap();
        let err = client
            .complete(ChatRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoApiKey));
    }

    #[test]
    fn test_word_list_request_shape() {
        let client = WordClient::new("t").unwrap();
        let request = word_list_request("kitchen", 12, &set(&["spoon"]));
        let api = client.build_api_request(&request);
        let json = serde_json::to_value(&api).unwrap();

        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("spoon"));
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "word_list");

        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["messages", "model", "response_format"]);
    }

    #[test]
    fn test_response_text_uses_first_choice() {
        let api: ApiResponse = serde_json::from_str(
            r#"{"id":"gen-1","choices":[{"message":{"role":"assistant","content":"{\"words\":[\"cat\"]}"}}]}"#,
        )
        .unwrap();
        let response: ChatResponse = api.into();
        assert_eq!(response.text(), Some("{\"words\":[\"cat\"]}"));
    }

    #[test]
    fn test_response_without_choices_has_no_text() {
        let api: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        let response: ChatResponse = api.into();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_parse_api_error_known_codes() {
        let body = r#"{"error":{"message":"No auth credentials found","code":401}}"#;
        match parse_api_error(401, body) {
            Error::Api { code, kind, .. } => {
                assert_eq!(code, 401);
                assert_eq!(kind, ApiErrorKind::InvalidToken);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let body = r#"{"error":{"message":"Key limit exceeded","code":403}}"#;
        assert!(matches!(
            parse_api_error(403, body),
            Error::Api { kind: ApiErrorKind::QuotaExceeded, .. }
        ));

        let body = r#"{"error":{"message":"Rate limit exceeded","code":429}}"#;
        assert!(matches!(
            parse_api_error(429, body),
            Error::Api { kind: ApiErrorKind::RateLimited, .. }
        ));
    }

    #[test]
    fn test_parse_api_error_unknown_code_is_generic() {
        let body = r#"{"error":{"message":"Provider returned error","code":502}}"#;
        let err = parse_api_error(502, body);
        assert!(matches!(err, Error::Api { kind: ApiErrorKind::Other, .. }));
        assert_eq!(err.user_message(), "API error: Provider returned error");
    }

    #[test]
    fn test_parse_api_error_falls_back_to_status() {
        let err = parse_api_error(429, "<html>slow down</html>");
        match err {
            Error::Api {
                code,
                message,
                kind,
                ..
            } => {
                assert_eq!(code, 429);
                assert_eq!(message, "<html>slow down</html>");
                assert_eq!(kind, ApiErrorKind::RateLimited);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_payload_code_wins_over_status() {
        let body = r#"{"error":{"message":"bad key","code":"401"}}"#;
        assert!(matches!(
            parse_api_error(400, body),
            Error::Api { code: 401, kind: ApiErrorKind::InvalidToken, .. }
        ));
    }

    #[test]
    fn test_parse_word_list() {
        let words = parse_word_list(r#"{"words": ["apple", "pear"]}"#).unwrap();
        assert_eq!(words, vec!["apple", "pear"]);

        let fenced = "```json\n{\"words\": [\"plum\"]}\n```";
        assert_eq!(parse_word_list(fenced).unwrap(), vec!["plum"]);

        assert!(matches!(parse_word_list("apple, pear"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_normalize_words() {
        let too_long = "x".repeat(26);
        let raw = vec![
            "  apple ", "pear", "ox", "", "apple", "Apple", "banana", too_long.as_str(),
        ];
        let words = normalize_words(raw, &set(&["banana"]));
        assert_eq!(words, vec!["apple", "pear", "Apple"]);
    }

    #[test]
    fn test_normalize_counts_characters_not_bytes() {
        // Three Cyrillic letters are six bytes but only three characters.
        let words = normalize_words(["кот", "ёж"], &HashSet::new());
        assert_eq!(words, vec!["кот"]);
    }

    #[test]
    fn test_user_messages() {
        assert!(Error::NoApiKey.user_message().contains("token"));
        let err = Error::Api {
            status: 403,
            code: 403,
            message: "limit".to_string(),
            kind: ApiErrorKind::QuotaExceeded,
        };
        assert!(err.user_message().contains("openrouter.ai/settings/keys"));
    }
}
