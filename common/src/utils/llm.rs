use std::sync::OnceLock;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{error::AppError, utils::config::AppConfig};

/// Structured-output request sent to a chat model.
#[derive(Debug, Clone)]
pub struct JsonPrompt<'a> {
    pub name: &'a str,
    pub system: &'a str,
    pub user: String,
    pub schema: Value,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the raw text of the model's JSON answer.
    async fn complete_json(&self, prompt: JsonPrompt<'_>) -> Result<String, AppError>;
}

/// Runs `prompt` and deserializes the answer, tolerating fences or prose around the JSON.
pub async fn complete_structured<T, M>(model: &M, prompt: JsonPrompt<'_>) -> Result<T, AppError>
where
    T: DeserializeOwned,
    M: LanguageModel + ?Sized,
{
    let name = prompt.name.to_string();
    let raw = model.complete_json(prompt).await?;
    let json = extract_json_block(&raw).ok_or_else(|| {
        AppError::LLMParsing(format!("No JSON found in {name} response"))
    })?;
    serde_json::from_str::<T>(json)
        .map_err(|e| AppError::LLMParsing(format!("Failed to parse {name} response: {e}")))
}

/// Gemini chat model reached through its OpenAI-compatible endpoint.
pub struct GeminiModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl GeminiModel {
    pub fn new(client: Client<OpenAIConfig>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &AppConfig, http_client: reqwest::Client) -> Self {
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(&config.gemini_api_key)
                .with_api_base(&config.gemini_base_url),
        )
        .with_http_client(http_client);
        Self::new(client, &config.gemini_model)
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn complete_json(&self, prompt: JsonPrompt<'_>) -> Result<String, AppError> {
        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name: prompt.name.to_string(),
                schema: Some(prompt.schema),
                strict: Some(true),
            },
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessage::from(prompt.system).into(),
                ChatCompletionRequestUserMessage::from(prompt.user).into(),
            ])
            .response_format(response_format)
            .build()?;

        let response = self.client.chat().create(request).await?;
        debug!(model = %self.model, name = prompt.name, "LLM completion received");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::LLMParsing("No content found in LLM response".into()))
    }
}

/// Returns the JSON object or array inside `raw`, skipping markdown fences and surrounding prose.
pub fn extract_json_block(raw: &str) -> Option<&str> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("static regex pattern")
    });

    let candidate = fence
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str())
        .trim();

    let start = candidate.find(['{', '['])?;
    let open = candidate.get(start..)?.chars().next()?;
    let close = if open == '{' { '}' } else { ']' };
    let end = candidate.rfind(close)?;
    if end < start {
        return None;
    }
    candidate.get(start..=end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct CannedModel(&'static str);

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn complete_json(&self, _prompt: JsonPrompt<'_>) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Deserialize, Debug)]
    struct Answer {
        score: u8,
    }

    fn prompt() -> JsonPrompt<'static> {
        JsonPrompt {
            name: "test",
            system: "system",
            user: "user".into(),
            schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn extracts_plain_json() {
        assert_eq!(extract_json_block(r#" {"a":1} "#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn extracts_fenced_json_with_prose() {
        let raw = "Here you go:\n```json\n{\"a\": [1, 2]}\n```\nThanks!";
        assert_eq!(extract_json_block(raw), Some("{\"a\": [1, 2]}"));
    }

    #[test]
    fn extracts_array_and_rejects_non_json() {
        assert_eq!(extract_json_block("result: [\"x\"] done"), Some("[\"x\"]"));
        assert_eq!(extract_json_block("no json here"), None);
    }

    #[tokio::test]
    async fn complete_structured_parses_fenced_answer() {
        let model = CannedModel("```json\n{\"score\": 7}\n```");
        let answer: Answer = complete_structured(&model, prompt()).await.unwrap();
        assert_eq!(answer.score, 7);
    }

    #[tokio::test]
    async fn complete_structured_reports_parse_failures() {
        let model = CannedModel("{\"score\": \"high\"}");
        let result: Result<Answer, _> = complete_structured(&model, prompt()).await;
        assert!(matches!(result, Err(AppError::LLMParsing(_))));
    }
}
