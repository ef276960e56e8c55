//! # Telegram Webhook Handler
//!
//! Processes incoming bot updates: commands (`/start`, `/help`, `/login`)
//! and save-by-message for any URLs in the text. The webhook always
//! acknowledges with a 200 so Telegram does not retry updates that failed
//! application-side; failures surface as reply messages instead.

use super::AppState;
use crate::telegram::{
    extract_urls, render_save_reply, TelegramMessage, TelegramUpdate, HELP_MESSAGE,
    NO_URL_MESSAGE, WELCOME_MESSAGE,
};
use axum::{extract::State, http::StatusCode, Json};
use linkstash::save::SaveRequest;
use linkstash_access::{get_or_create_telegram_user, issue_login_token};
use tracing::{info, warn};

/// The handler for `POST /telegram/webhook`.
pub async fn telegram_webhook_handler(
    State(app_state): State<AppState>,
    Json(update): Json<TelegramUpdate>,
) -> StatusCode {
    let Some(message) = update.message else {
        return StatusCode::OK;
    };
    info!(update_id = update.update_id, "Received Telegram update");

    let reply = build_reply(&app_state, &message).await;
    if let (Some(client), Some(text)) = (&app_state.telegram, reply) {
        client.send_message(message.chat.id, &text).await;
    }

    StatusCode::OK
}

async fn build_reply(app_state: &AppState, message: &TelegramMessage) -> Option<String> {
    let text = message.text.as_deref().unwrap_or("").trim();

    match text.split_whitespace().next() {
        Some("/start") => return Some(WELCOME_MESSAGE.to_string()),
        Some("/help") => return Some(HELP_MESSAGE.to_string()),
        Some("/login") => return Some(login_reply(app_state, message).await),
        _ => {}
    }

    let urls = extract_urls(message);
    if urls.is_empty() {
        return Some(NO_URL_MESSAGE.to_string());
    }

    let from = message.from.as_ref()?;
    let mut replies = Vec::with_capacity(urls.len());
    for url in urls {
        let outcome = app_state
            .orchestrator
            .save(&SaveRequest {
                url,
                user_id: None,
                telegram_user_id: Some(from.id.to_string()),
                telegram_username: from.username.clone(),
                memo: None,
            })
            .await;
        replies.push(render_save_reply(&outcome));
    }
    Some(replies.join("\n\n"))
}

async fn login_reply(app_state: &AppState, message: &TelegramMessage) -> String {
    let Some(from) = message.from.as_ref() else {
        return "I can't log in an anonymous sender.".to_string();
    };

    let user = match get_or_create_telegram_user(
        &app_state.store.db,
        &from.id.to_string(),
        from.username.as_deref(),
    )
    .await
    {
        Ok(user) => user,
        Err(e) => {
            warn!("Failed to resolve Telegram user for login: {e}");
            return "Something went wrong creating your login code.".to_string();
        }
    };

    match issue_login_token(&app_state.store.db, &user.id).await {
        Ok(token) => format!(
            "Your login code (valid for 10 minutes, single use):\n\n{token}\n\n\
             Paste it into the web app to sign in."
        ),
        Err(e) => {
            warn!("Failed to issue login token: {e}");
            "Something went wrong creating your login code.".to_string()
        }
    }
}
