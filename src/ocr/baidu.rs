use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::layout::{self, Fragment};

const TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";
const ACCURATE_URL: &str = "https://aip.baidubce.com/rest/2.0/ocr/v1/accurate";

#[derive(Debug, Clone)]
pub struct BaiduCredentials {
    pub api_key: String,
    pub secret_key: String,
}

/// Runs the high-accuracy line recognizer and returns one fragment per line.
pub async fn recognize(credentials: &BaiduCredentials, image_bytes: &[u8]) -> Result<Vec<Fragment>> {
    let client = reqwest::Client::new();
    let token = fetch_access_token(&client, credentials).await?;

    let encoded = BASE64.encode(image_bytes);
    let form = [
        ("image", encoded.as_str()),
        ("recognize_granularity", "big"),
    ];
    let body = client
        .post(ACCURATE_URL)
        .query(&[("access_token", token.as_str())])
        .form(&form)
        .send()
        .await
        .with_context(|| "failed to call Baidu OCR")?
        .text()
        .await
        .with_context(|| "failed to read Baidu OCR response")?;
    parse_words_result(&body)
}

async fn fetch_access_token(
    client: &reqwest::Client,
    credentials: &BaiduCredentials,
) -> Result<String> {
    let body = client
        .post(TOKEN_URL)
        .query(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.api_key.as_str()),
            ("client_secret", credentials.secret_key.as_str()),
        ])
        .send()
        .await
        .with_context(|| "failed to request Baidu OCR access token")?
        .text()
        .await
        .with_context(|| "failed to read Baidu OCR token response")?;
    parse_access_token(&body)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

fn parse_access_token(body: &str) -> Result<String> {
    let parsed: TokenResponse =
        serde_json::from_str(body).with_context(|| "failed to parse Baidu token response")?;
    if let Some(token) = parsed.access_token.filter(|token| !token.is_empty()) {
        return Ok(token);
    }
    Err(anyhow!(
        "failed to obtain Baidu access token: {}",
        parsed
            .error_description
            .or(parsed.error)
            .unwrap_or_else(|| "unknown error".to_string())
    ))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error_code: Option<serde_json::Value>,
    error_msg: Option<String>,
}

pub(crate) fn parse_words_result(body: &str) -> Result<Vec<Fragment>> {
    let value: serde_json::Value =
        serde_json::from_str(body).with_context(|| "failed to parse Baidu OCR response")?;
    if value.get("words_result").is_none() {
        let envelope: ErrorEnvelope = serde_json::from_value(value).unwrap_or(ErrorEnvelope {
            error_code: None,
            error_msg: None,
        });
        let code = envelope
            .error_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        return Err(anyhow!(
            "OCR failed: {} (error code: {})",
            envelope
                .error_msg
                .unwrap_or_else(|| "unknown error".to_string()),
            code
        ));
    }
    let fragments = layout::parse_fragments(body)?;
    debug!(count = fragments.len(), "Baidu OCR returned fragments");
    Ok(fragments)
}
