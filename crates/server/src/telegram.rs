//! # Telegram Bot Integration
//!
//! The webhook payload types, the outbound Bot API client, and the reply
//! texts for the save-by-message flow. Replies are best effort; a failed
//! `sendMessage` is logged and never fails the webhook.

use linkstash::save::{codes, SaveOutcome};
use regex::Regex;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use serde_json::json;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// The default Telegram Bot API base.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s]+").expect("URL pattern must compile")
});

// --- Webhook payload types ---

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    pub from: Option<TelegramUser>,
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<TelegramEntity>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Target of a `text_link` entity; plain `url` entities carry the URL in
    /// the message text instead.
    pub url: Option<String>,
}

// --- Reply texts ---

pub const WELCOME_MESSAGE: &str = "Welcome to linkstash!\n\n\
Send me any link and I'll save it with tags for you.\n\
Commands:\n\
/help - how this works\n\
/login - get a login code for the web app";

pub const HELP_MESSAGE: &str = "Send a link from Instagram, YouTube, TikTok, \
Twitter/X, or any website and I'll classify it, pull its metadata, and tag it.\n\
/login gives you a single-use code for signing in on the web.";

pub const NO_URL_MESSAGE: &str =
    "I couldn't find a link in that message. Send me a URL to save it.";

pub const ERROR_MESSAGE: &str = "Something went wrong saving that link. Please try again.";

/// Builds the reply for one save outcome.
pub fn render_save_reply(outcome: &SaveOutcome) -> String {
    if outcome.success {
        let content = outcome.content.as_ref();
        let title = content
            .and_then(|c| c.title.as_deref())
            .unwrap_or("(untitled)");
        let tags = content
            .map(|c| {
                c.tags
                    .iter()
                    .map(|t| format!("#{}", t.name))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        if tags.is_empty() {
            format!("Saved: {title}")
        } else {
            format!("Saved: {title}\n{tags}")
        }
    } else {
        match outcome.code {
            Some(codes::DUPLICATE) => "You already saved that link.".to_string(),
            Some(codes::INVALID_URL) => "That doesn't look like a valid link.".to_string(),
            _ => ERROR_MESSAGE.to_string(),
        }
    }
}

/// Pulls every URL out of a message, entities first (for `text_link`), then
/// the visible text.
pub fn extract_urls(message: &TelegramMessage) -> Vec<String> {
    let mut urls: Vec<String> = message
        .entities
        .iter()
        .filter(|e| e.entity_type == "text_link")
        .filter_map(|e| e.url.clone())
        .collect();

    if let Some(text) = message.text.as_deref() {
        for found in URL_PATTERN.find_iter(text) {
            let url = found.as_str().to_string();
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }

    urls
}

// --- Outbound client ---

/// A minimal Telegram Bot API client for sending replies.
#[derive(Clone, Debug)]
pub struct TelegramClient {
    client: ReqwestClient,
    send_message_url: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str, api_url: Option<&str>) -> anyhow::Result<Self> {
        let client = ReqwestClient::builder().build()?;
        let base = api_url.unwrap_or(TELEGRAM_API_URL).trim_end_matches('/');
        Ok(Self {
            client,
            send_message_url: format!("{base}/bot{bot_token}/sendMessage"),
        })
    }

    /// Sends a text reply to a chat. Failures are logged, not propagated,
    /// because the webhook must acknowledge the update regardless.
    pub async fn send_message(&self, chat_id: i64, text: &str) {
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
        });
        match self.client.post(&self.send_message_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(chat_id, "Telegram reply sent");
            }
            Ok(response) => {
                warn!(chat_id, status = %response.status(), "Telegram reply rejected");
            }
            Err(e) => {
                warn!(chat_id, "Failed to send Telegram reply: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> TelegramMessage {
        TelegramMessage {
            chat: TelegramChat { id: 1 },
            from: None,
            text: Some(text.to_string()),
            entities: Vec::new(),
        }
    }

    #[test]
    fn extracts_urls_from_text() {
        let urls = extract_urls(&message(
            "check this https://youtu.be/abc and http://example.com/a too",
        ));
        assert_eq!(urls, vec!["https://youtu.be/abc", "http://example.com/a"]);
    }

    #[test]
    fn extracts_text_link_entities() {
        let mut msg = message("a hidden link");
        msg.entities.push(TelegramEntity {
            entity_type: "text_link".to_string(),
            url: Some("https://example.com/hidden".to_string()),
        });
        let urls = extract_urls(&msg);
        assert_eq!(urls, vec!["https://example.com/hidden"]);
    }

    #[test]
    fn plain_text_yields_no_urls() {
        assert!(extract_urls(&message("just chatting")).is_empty());
    }
}
