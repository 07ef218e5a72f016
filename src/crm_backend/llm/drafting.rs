use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that writes LinkedIn outreach messages.";

/// The outreach template. Placeholders are substituted literally, once each.
pub const PROMPT_TEMPLATE: &str = "Write a short, friendly LinkedIn outreach message to {{name}}, \
     who is a {{role}} at {{company}}. Make it casual and under 500 characters.";

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn render_prompt(name: &str, role: &str, company: &str) -> String {
    PROMPT_TEMPLATE
        .replacen("{{name}}", name, 1)
        .replacen("{{role}}", role, 1)
        .replacen("{{company}}", company, 1)
}

/// Single-completion text generation.
#[async_trait]
pub trait DraftModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, String>;
}

/// OpenAI-compatible chat-completions client. The provider is picked by the
/// MODEL_PROVIDER environment flag; DeepSeek and OpenAI share the wire
/// format so only the base URL differs.
pub struct ChatCompletionModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionModel {
    pub fn from_env() -> Result<Self, String> {
        let base_url = match std::env::var("MODEL_PROVIDER").as_deref() {
            Ok("DeepSeek") => "https://api.deepseek.com",
            _ => "https://api.openai.com/v1",
        };
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let model = std::env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(base_url, &api_key, &model)
    }

    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl DraftModel for ChatCompletionModel {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, String> {
        if self.api_key.is_empty() || self.model.is_empty() {
            return Err("AI API key or model not configured".to_string());
        }

        debug!("Requesting completion from {}", self.base_url);
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": system_prompt
                },
                {
                    "role": "user",
                    "content": user_prompt
                }
            ],
            "stream": false
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err_text = resp.text().await.unwrap_or_default();
            return Err(format!("AI API error ({}): {}", status, err_text));
        }

        let response_json: Value = resp
            .json()
            .await
            .map_err(|e| format!("Failed to parse response JSON: {}", e))?;

        let text = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| format!("Unexpected AI response structure: {:?}", response_json))?;

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_the_template_verbatim() {
        assert_eq!(
            render_prompt("Ana", "CTO", "Acme"),
            "Write a short, friendly LinkedIn outreach message to Ana, who is a CTO at Acme. \
             Make it casual and under 500 characters."
        );
    }

    #[test]
    fn leaves_no_placeholders_behind() {
        let prompt = render_prompt("Jo Ann", "staff engineer", "Initech GmbH");
        assert!(!prompt.contains("{{"));
        assert!(prompt.contains("Jo Ann"));
        assert!(prompt.contains("staff engineer"));
        assert!(prompt.contains("Initech GmbH"));
    }
}
