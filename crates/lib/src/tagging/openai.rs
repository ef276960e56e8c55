use crate::errors::TaggingError;
use crate::tagging::{fill_prompt, parse_tags_json, GeneratedTag, TagProvider, TaggingInput};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Default chat-completions endpoint.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    temperature: f32,
    max_tokens: i32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMessage,
}

// --- Provider implementation ---

/// A tag provider backed by an OpenAI-compatible chat completions API.
#[derive(Clone, Debug)]
pub struct OpenAiTagger {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl OpenAiTagger {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: Option<String>,
    ) -> Result<Self, TaggingError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(TaggingError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl TagProvider for OpenAiTagger {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, input: &TaggingInput) -> Result<Vec<GeneratedTag>, TaggingError> {
        let request_body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a content tagging expert. Respond in valid JSON."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: fill_prompt(input),
                },
            ],
            model: self.model.as_deref(),
            temperature: 0.3,
            max_tokens: 500,
            response_format: ResponseFormat {
                r#type: "json_object",
            },
        };

        let mut request_builder = self.client.post(&self.api_url);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let response = request_builder
            .json(&request_body)
            .send()
            .await
            .map_err(TaggingError::Request)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TaggingError::Api(error_text));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(TaggingError::Deserialization)?;

        let content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        let parsed: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| TaggingError::Parse(format!("response was not JSON: {e}")))?;

        Ok(parse_tags_json(&parsed))
    }
}
