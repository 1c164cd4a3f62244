use anyhow::{anyhow, Result};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::providers::{Provider, ProviderResponse, ProviderUsage};

const SYSTEM_PROMPT: &str =
    "You are a translation engine for text recognized from document images.";

/// Prefix of the text substituted for a paragraph whose translation failed.
pub const TRANSLATION_FAILED_PREFIX: &str = "translation failed: ";

#[derive(Debug, Clone)]
pub struct Translator<P: Provider + Clone> {
    provider: P,
    lang: String,
}

impl<P: Provider + Clone> Translator<P> {
    pub fn new(provider: P, lang: impl Into<String>) -> Self {
        Self {
            provider,
            lang: lang.into(),
        }
    }

    pub async fn exec(&self, text: &str) -> Result<ProviderResponse> {
        let response = self
            .provider
            .clone()
            .append_system_input(SYSTEM_PROMPT.to_string())
            .append_user_input(render_prompt(text, &self.lang))
            .complete()
            .await?;
        if response.text.is_empty() && !text.trim().is_empty() {
            return Err(anyhow!("empty translation returned"));
        }
        Ok(response)
    }

    pub async fn translate(&self, text: &str) -> Result<String> {
        let response = self.exec(text).await?;
        debug!("{}", format_usage(&response));
        Ok(response.text)
    }

    /// Translates every text with at most `workers` requests in flight.
    ///
    /// Output order matches input order. A failed item is replaced by an
    /// inline error message and never affects the others.
    pub async fn translate_all(&self, texts: &[String], workers: usize) -> Vec<String> {
        let workers = workers.clamp(1, texts.len().max(1));
        info!(count = texts.len(), workers, lang = %self.lang, "translating paragraphs");
        stream::iter(texts.iter().enumerate())
            .map(|(idx, text)| async move {
                match self.translate(text).await {
                    Ok(translated) => translated,
                    Err(err) => {
                        warn!(paragraph = idx, "translation failed: {:#}", err);
                        format!("{}{:#}", TRANSLATION_FAILED_PREFIX, err)
                    }
                }
            })
            .buffered(workers)
            .collect()
            .await
    }
}

fn format_usage(response: &ProviderResponse) -> String {
    let model = response.model.as_deref().unwrap_or("unavailable");
    let Some(usage) = response.usage.as_ref() else {
        return format!("model: {}, tokens: unavailable", model);
    };
    format!("model: {}, {}", model, format_tokens(usage))
}

fn format_tokens(usage: &ProviderUsage) -> String {
    let total = usage.total_tokens.or_else(|| {
        usage
            .prompt_tokens
            .zip(usage.completion_tokens)
            .map(|(prompt, completion)| prompt + completion)
    });
    let mut parts = Vec::new();
    if let Some(prompt) = usage.prompt_tokens {
        parts.push(format!("prompt={}", prompt));
    }
    if let Some(completion) = usage.completion_tokens {
        parts.push(format!("completion={}", completion));
    }
    if let Some(total) = total {
        parts.push(format!("total={}", total));
    }
    if parts.is_empty() {
        "tokens: unavailable".to_string()
    } else {
        format!("tokens: {}", parts.join(" "))
    }
}

pub fn render_prompt(text: &str, lang: &str) -> String {
    format!(
        "Translate the following content accurately into {lang}, strictly preserving the original format:\n\n\
         Text:\n\n{text}\n\n\
         Requirements:\n\
         1. Return only the translation, without any additional explanation (including introductory sentences)\n\
         2. Preserve all line breaks, spaces and punctuation\n"
    )
}
