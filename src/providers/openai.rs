use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::retry::{
    is_rate_limited, retry_after, wait_with_backoff, RATE_LIMIT_BASE_DELAY, RATE_LIMIT_MAX_RETRIES,
};
use super::{
    get_env, Message, MessageRole, Provider, ProviderFuture, ProviderResponse, ProviderUsage,
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
pub(crate) const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub(crate) const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 4000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for OpenAI-compatible `chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAI {
    label: &'static str,
    key: String,
    model: String,
    base_url: String,
    messages: Vec<Message>,
}

impl OpenAI {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            label: "OpenAI",
            key: key.into(),
            model: OPENAI_DEFAULT_MODEL.to_string(),
            base_url: get_env("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            messages: Vec::new(),
        }
    }

    pub fn deepseek(key: impl Into<String>) -> Self {
        Self {
            label: "DeepSeek",
            key: key.into(),
            model: DEEPSEEK_DEFAULT_MODEL.to_string(),
            base_url: get_env("DEEPSEEK_BASE_URL")
                .unwrap_or_else(|| DEEPSEEK_BASE_URL.to_string()),
            messages: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Provider for OpenAI {
    fn append_system_input(mut self, input: String) -> Self {
        self.messages.push(Message::system(input));
        self
    }

    fn append_user_input(mut self, input: String) -> Self {
        self.messages.push(Message::user(input));
        self
    }

    fn complete(self) -> ProviderFuture {
        Box::pin(async move { call_chat_completions(self).await })
    }
}

async fn call_chat_completions(provider: OpenAI) -> Result<ProviderResponse> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .with_context(|| "failed to build HTTP client")?;
    let url = format!("{}/chat/completions", provider.base_url);

    let messages = provider
        .messages
        .iter()
        .map(|message| match message.role {
            MessageRole::System => json!({"role": "system", "content": message.content}),
            MessageRole::User => json!({"role": "user", "content": message.content}),
        })
        .collect::<Vec<_>>();

    let body = json!({
        "model": provider.model,
        "messages": messages,
        "temperature": TEMPERATURE,
        "max_tokens": MAX_TOKENS
    });

    let mut attempt = 0usize;
    let mut delay = RATE_LIMIT_BASE_DELAY;
    loop {
        attempt += 1;
        let response = client
            .post(&url)
            .bearer_auth(provider.key.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("{} request timed out", provider.label)
                } else {
                    anyhow!("{} request failed: {}", provider.label, err)
                }
            })?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            return extract_chat_response(&text, &provider.model);
        }
        if is_rate_limited(status, &text) && attempt < RATE_LIMIT_MAX_RETRIES {
            delay = wait_with_backoff(provider.label, attempt, delay, retry_after).await;
            continue;
        }
        return Err(anyhow!(
            "{} API error ({}): {}",
            provider.label,
            status,
            extract_openai_error(&text).unwrap_or(text)
        ));
    }
}

fn extract_chat_response(text: &str, fallback_model: &str) -> Result<ProviderResponse> {
    let payload: ChatResponse =
        serde_json::from_str(text).with_context(|| "failed to parse chat completion JSON")?;
    let content = payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow!("no message content returned"))?;
    let model = payload
        .model
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    });
    Ok(ProviderResponse {
        text: content.trim().to_string(),
        model,
        usage,
    })
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ApiError>,
    }

    #[derive(Deserialize)]
    struct ApiError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<serde_json::Value>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let code = error.code.and_then(|code| match code {
        serde_json::Value::String(value) => Some(value),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    });
    Some(format_error_parts(error.message, error.kind, code))
}

fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message {
        if !message.trim().is_empty() {
            parts.push(message);
        }
    }
    if let Some(kind) = kind {
        if !kind.trim().is_empty() {
            parts.push(format!("type: {}", kind));
        }
    }
    if let Some(code) = code {
        if !code.trim().is_empty() {
            parts.push(format!("code: {}", code));
        }
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn chat_response_content_is_trimmed() {
        let payload = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/chat_completion.json"
        ));
        let response = extract_chat_response(payload, "deepseek-chat").unwrap();
        let usage = response.usage.expect("usage");
        assert_snapshot!(
            format!(
                "model={:?}\nprompt={:?} completion={:?} total={:?}\n---\n{}",
                response.model,
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens,
                response.text
            ),
            @r#"
        model=Some("deepseek-chat")
        prompt=Some(58) completion=Some(9) total=Some(67)
        ---
        你好，世界
        第二行
        "#
        );
    }

    #[test]
    fn missing_content_is_an_error() {
        let err = extract_chat_response(r#"{"choices": []}"#, "deepseek-chat").unwrap_err();
        assert!(err.to_string().contains("no message content"));
    }

    #[test]
    fn error_body_is_summarised() {
        let body = r#"{"error": {"message": "Authentication Fails", "type": "authentication_error", "code": "invalid_request_error"}}"#;
        assert_eq!(
            extract_openai_error(body).as_deref(),
            Some("Authentication Fails | type: authentication_error | code: invalid_request_error")
        );
        assert_eq!(
            extract_openai_error(r#"{"error": {"code": 402}}"#).as_deref(),
            Some("code: 402")
        );
        assert!(extract_openai_error("not json").is_none());
    }

    #[test]
    fn deepseek_defaults() {
        let client = OpenAI::deepseek("key").with_model("  ");
        assert_eq!(client.model(), DEEPSEEK_DEFAULT_MODEL);
        let client = client.with_model("deepseek-reasoner");
        assert_eq!(client.model(), "deepseek-reasoner");
    }
}
