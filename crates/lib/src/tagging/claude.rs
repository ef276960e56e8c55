use crate::errors::TaggingError;
use crate::tagging::{fill_prompt, parse_tags_json, GeneratedTag, TagProvider, TaggingInput};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Default Anthropic messages endpoint.
pub const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";

const ANTHROPIC_VERSION: &str = "2023-06-01";

// --- Anthropic-specific request and response structures ---

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: i32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

// --- Provider implementation ---

/// A tag provider backed by the Anthropic messages API.
#[derive(Clone, Debug)]
pub struct ClaudeTagger {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
    model: String,
}

impl ClaudeTagger {
    pub fn new(api_url: String, api_key: String, model: String) -> Result<Self, TaggingError> {
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
impl TagProvider for ClaudeTagger {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn generate(&self, input: &TaggingInput) -> Result<Vec<GeneratedTag>, TaggingError> {
        let request_body = MessagesRequest {
            model: &self.model,
            max_tokens: 500,
            messages: vec![Message {
                role: "user".to_string(),
                content: fill_prompt(input),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(TaggingError::Request)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TaggingError::Api(error_text));
        }

        let messages_response: MessagesResponse = response
            .json()
            .await
            .map_err(TaggingError::Deserialization)?;

        let text = messages_response
            .content
            .iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .ok_or_else(|| TaggingError::Parse("no text block in response".to_string()))?;

        // The model may wrap the JSON in prose; take the outermost braces.
        let json_slice = match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if end > start => &text[start..=end],
            _ => return Err(TaggingError::Parse("no JSON object in response".to_string())),
        };

        let parsed: serde_json::Value = serde_json::from_str(json_slice)
            .map_err(|e| TaggingError::Parse(format!("response was not JSON: {e}")))?;

        Ok(parse_tags_json(&parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn input() -> TaggingInput {
        TaggingInput {
            title: Some("Desk setup tour".to_string()),
            description: None,
            platform: "Instagram".to_string(),
            creator_name: Some("@maker".to_string()),
            url: "https://www.instagram.com/p/xyz/".to_string(),
        }
    }

    #[tokio::test]
    async fn extracts_json_wrapped_in_prose() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "test-key");
            then.status(200).json_body(json!({
                "content": [{"type": "text", "text":
                    "Here are the tags: {\"tags\": [{\"name\": \"workspace\", \"confidence\": 0.8}, {\"name\": \"diy\", \"confidence\": 0.7}]}"
                }]
            }));
        });

        let tagger = ClaudeTagger::new(
            server.url("/v1/messages"),
            "test-key".to_string(),
            "claude-3-haiku-20240307".to_string(),
        )
        .unwrap();

        let tags = tagger.generate(&input()).await.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "workspace");
    }

    #[tokio::test]
    async fn response_without_json_is_a_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200).json_body(json!({
                "content": [{"type": "text", "text": "I could not tag this."}]
            }));
        });

        let tagger = ClaudeTagger::new(
            server.url("/v1/messages"),
            "test-key".to_string(),
            "claude-3-haiku-20240307".to_string(),
        )
        .unwrap();

        let err = tagger.generate(&input()).await.unwrap_err();
        assert!(matches!(err, TaggingError::Parse(_)));
    }
}
