//! Translation through an OpenAI-compatible chat completions API.

use std::time::Duration;

use repdf::{ContentTransform, Error, Result};
use serde::{Deserialize, Serialize};

/// Default API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for the translation backend.
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Base URL, without the `/chat/completions` suffix
    pub api_base: String,
    /// Bearer token
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl TranslatorConfig {
    /// Settings for the default endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Use another endpoint.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Use another model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Translates text one block at a time, asking the model to keep every line.
pub struct ChatTranslator {
    config: TranslatorConfig,
    client: reqwest::blocking::Client,
}

impl ChatTranslator {
    /// Create a translator.
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Transform(format!("http client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// The active settings.
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    fn request(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::Transform(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| Error::Transform(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Transform(format!("HTTP {}: {}", status, text)));
        }
        parse_reply(&text)
    }
}

impl ContentTransform for ChatTranslator {
    fn transform_text(&self, text: &str, target: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }
        log::debug!("translating {} chars to {}", text.len(), target);
        self.request(&build_prompt(text, target))
    }
}

/// Prompt asking for a line-for-line translation.
pub fn build_prompt(text: &str, target: &str) -> String {
    format!(
        "You are a precise translation engine.\n\
         \n\
         Translate the text below into **{target}**.\n\
         \n\
         ### RULES\n\
         - Keep line breaks exactly the same.\n\
         - Keep spacing identical.\n\
         - Do NOT merge, remove or reorder lines.\n\
         - Translate every line even if small.\n\
         - If a line is empty, return an empty line.\n\
         \n\
         ### TEXT TO TRANSLATE:\n\
         {text}\n\
         \n\
         ### OUTPUT:\n\
         (Return translation ONLY, no explanations)\n"
    )
}

/// Pull the first choice's content out of a chat completion body.
pub fn parse_reply(body: &str) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| Error::Transform(format!("bad response: {}", e)))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| Error::Transform("response has no content".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_text_and_target() {
        let prompt = build_prompt("Total\nAmount", "hi");
        assert!(prompt.contains("into **hi**"));
        assert!(prompt.contains("Total\nAmount\n"));
        assert!(prompt.contains("Keep line breaks"));
    }

    #[test]
    fn test_parse_reply() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "  कुल\nराशि \n"}}]}"#;
        assert_eq!(parse_reply(body).unwrap(), "कुल\nराशि");

        assert!(matches!(parse_reply(r#"{"choices": []}"#), Err(Error::Transform(_))));
        assert!(matches!(parse_reply("oops"), Err(Error::Transform(_))));
    }

    #[test]
    fn test_empty_text_skips_request() {
        let config = TranslatorConfig::new("key").with_api_base("http://127.0.0.1:9");
        let translator = ChatTranslator::new(config).unwrap();
        assert_eq!(translator.transform_text("  \n ", "hi").unwrap(), "");
    }

    #[test]
    fn test_endpoint() {
        let config = TranslatorConfig::new("key").with_api_base("http://localhost:8080/v1/");
        assert_eq!(config.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.model, DEFAULT_MODEL);
    }
}
