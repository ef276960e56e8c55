//! # Access Crate
//!
//! This crate is the central authority for identity and authentication for
//! the `linkstash` application: Telegram-backed user records, single-use
//! login tokens, and the API sessions they mint.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use turso::{Database, Error as TursoError, Row, params};
use uuid::Uuid;

/// How long a login token handed out by the bot stays redeemable.
pub const LOGIN_TOKEN_TTL_SECS: i64 = 10 * 60;
/// How long an API session lives once created.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Database error: {0}")]
    Database(#[from] TursoError),
    #[error("Failed to create or find user for identifier: {0}")]
    UserPersistenceFailed(String),
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}

/// Represents a user in the system.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    /// The unique, deterministic ID of the user (UUIDv5 from the Telegram id).
    pub id: String,
    /// The Telegram account this user was created from.
    pub telegram_id: String,
    pub telegram_username: Option<String>,
    /// The timestamp when the user was first created.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Row> for User {
    type Error = AccessError;

    fn try_from(row: &Row) -> std::result::Result<Self, Self::Error> {
        let created_at_str: String = row.get(3)?;
        let created_at =
            chrono::NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
                .map_err(|e| {
                    AccessError::DataIntegrity(format!(
                        "Failed to parse date '{created_at_str}': {e}"
                    ))
                })?;

        let telegram_username = match row.get_value(2)? {
            turso::Value::Text(s) => Some(s),
            _ => None,
        };

        Ok(User {
            id: row.get(0)?,
            telegram_id: row.get(1)?,
            telegram_username,
            created_at,
        })
    }
}

/// Generates an unguessable 256-bit token, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Finds a user by their Telegram id, creating them if they don't exist.
///
/// The primary key is a deterministic UUIDv5 of `telegram:{id}`, so repeated
/// calls for the same account always resolve to the same row. A changed
/// Telegram username is written back on the way through.
pub async fn get_or_create_telegram_user(
    db: &Database,
    telegram_id: &str,
    telegram_username: Option<&str>,
) -> Result<User, AccessError> {
    let conn = db.connect()?;
    let identifier = format!("telegram:{telegram_id}");
    let user_id = Uuid::new_v5(&Uuid::NAMESPACE_URL, identifier.as_bytes()).to_string();

    // 1. Try to SELECT the user first for maximum compatibility.
    let mut rows = conn
        .query(
            "SELECT id, telegram_id, telegram_username, created_at FROM users WHERE id = ?",
            params![user_id.clone()],
        )
        .await?;

    if let Some(row) = rows.next().await? {
        let user = User::try_from(&row)?;
        if let Some(username) = telegram_username {
            if user.telegram_username.as_deref() != Some(username) {
                conn.execute(
                    "UPDATE users SET telegram_username = ? WHERE id = ?",
                    params![username, user_id],
                )
                .await?;
                return Ok(User {
                    telegram_username: Some(username.to_string()),
                    ..user
                });
            }
        }
        return Ok(user);
    }

    // 2. User does not exist; insert and re-select to pick up created_at.
    let username_value = match telegram_username {
        Some(name) => turso::Value::Text(name.to_string()),
        None => turso::Value::Null,
    };
    conn.execute(
        "INSERT INTO users (id, telegram_id, telegram_username) VALUES (?, ?, ?)",
        vec![
            turso::Value::Text(user_id.clone()),
            turso::Value::Text(telegram_id.to_string()),
            username_value,
        ],
    )
    .await?;
    debug!(user_id = %user_id, "Created user from Telegram account");

    let mut rows = conn
        .query(
            "SELECT id, telegram_id, telegram_username, created_at FROM users WHERE id = ?",
            params![user_id],
        )
        .await?;

    let row = rows
        .next()
        .await?
        .ok_or_else(|| AccessError::UserPersistenceFailed(identifier))?;

    User::try_from(&row)
}

/// Issues a short-lived, single-use login token for the user. The bot sends
/// this to the user, who redeems it on the web side for a session.
pub async fn issue_login_token(db: &Database, user_id: &str) -> Result<String, AccessError> {
    let conn = db.connect()?;
    let token = generate_token();
    let expires_at = Utc::now().timestamp() + LOGIN_TOKEN_TTL_SECS;

    conn.execute(
        "INSERT INTO login_tokens (token, user_id, kind, expires_at) VALUES (?, ?, 'login', ?)",
        params![token.clone(), user_id, expires_at],
    )
    .await?;
    Ok(token)
}

/// Redeems a login token. Returns the owning user id when the token exists,
/// has not expired, and has not been used before.
///
/// Burning the token happens in the same conditional UPDATE that checks it,
/// so two racing redemptions can never both succeed.
pub async fn verify_login_token(db: &Database, token: &str) -> Result<Option<String>, AccessError> {
    let conn = db.connect()?;
    let now = Utc::now().timestamp();

    let burned = conn
        .execute(
            "UPDATE login_tokens SET used_at = ?
             WHERE token = ? AND kind = 'login' AND used_at IS NULL AND expires_at > ?",
            params![now, token, now],
        )
        .await?;
    if burned == 0 {
        return Ok(None);
    }

    let mut rows = conn
        .query(
            "SELECT user_id FROM login_tokens WHERE token = ?",
            params![token],
        )
        .await?;
    let Some(row) = rows.next().await? else {
        return Ok(None);
    };
    Ok(Some(row.get(0)?))
}

/// Creates a bearer session for the user and returns its token.
pub async fn create_session(db: &Database, user_id: &str) -> Result<String, AccessError> {
    let conn = db.connect()?;
    let token = generate_token();
    let expires_at = Utc::now().timestamp() + SESSION_TTL_SECS;

    conn.execute(
        "INSERT INTO login_tokens (token, user_id, kind, expires_at) VALUES (?, ?, 'session', ?)",
        params![token.clone(), user_id, expires_at],
    )
    .await?;
    Ok(token)
}

/// Resolves a session token to its user, if the session is still live.
pub async fn get_session(db: &Database, token: &str) -> Result<Option<User>, AccessError> {
    let conn = db.connect()?;
    let now = Utc::now().timestamp();

    let mut rows = conn
        .query(
            "SELECT u.id, u.telegram_id, u.telegram_username, u.created_at
             FROM users u
             JOIN login_tokens lt ON lt.user_id = u.id
             WHERE lt.token = ? AND lt.kind = 'session' AND lt.expires_at > ?",
            params![token, now],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(User::try_from(&row)?)),
        None => Ok(None),
    }
}

/// Deletes a session so the token stops working immediately.
pub async fn destroy_session(db: &Database, token: &str) -> Result<(), AccessError> {
    let conn = db.connect()?;
    conn.execute(
        "DELETE FROM login_tokens WHERE token = ? AND kind = 'session'",
        params![token],
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstash::SqliteStore;

    async fn test_db() -> Database {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.initialize_schema().await.unwrap();
        store.db
    }

    #[tokio::test]
    async fn test_get_or_create_telegram_user_flow() {
        let db = test_db().await;

        let user1 = get_or_create_telegram_user(&db, "12345", Some("alice"))
            .await
            .unwrap();
        let expected_id =
            Uuid::new_v5(&Uuid::NAMESPACE_URL, "telegram:12345".as_bytes()).to_string();
        assert_eq!(user1.id, expected_id);
        assert_eq!(user1.telegram_id, "12345");
        assert_eq!(user1.telegram_username.as_deref(), Some("alice"));

        // Second call resolves to the same row.
        let user2 = get_or_create_telegram_user(&db, "12345", Some("alice"))
            .await
            .unwrap();
        assert_eq!(user1.id, user2.id);
        assert_eq!(user1.created_at.timestamp(), user2.created_at.timestamp());

        // A different account gets a different row.
        let user3 = get_or_create_telegram_user(&db, "67890", None)
            .await
            .unwrap();
        assert_ne!(user1.id, user3.id);
        assert_eq!(user3.telegram_username, None);
    }

    #[tokio::test]
    async fn test_username_change_is_written_back() {
        let db = test_db().await;
        get_or_create_telegram_user(&db, "12345", Some("alice"))
            .await
            .unwrap();

        let renamed = get_or_create_telegram_user(&db, "12345", Some("alice_new"))
            .await
            .unwrap();
        assert_eq!(renamed.telegram_username.as_deref(), Some("alice_new"));

        let again = get_or_create_telegram_user(&db, "12345", None).await.unwrap();
        assert_eq!(again.telegram_username.as_deref(), Some("alice_new"));
    }

    #[tokio::test]
    async fn test_login_token_is_single_use() {
        let db = test_db().await;
        let user = get_or_create_telegram_user(&db, "12345", None)
            .await
            .unwrap();

        let token = issue_login_token(&db, &user.id).await.unwrap();
        assert_eq!(token.len(), 64);

        let redeemed = verify_login_token(&db, &token).await.unwrap();
        assert_eq!(redeemed.as_deref(), Some(user.id.as_str()));

        // Second redemption fails.
        let redeemed = verify_login_token(&db, &token).await.unwrap();
        assert_eq!(redeemed, None);
    }

    #[tokio::test]
    async fn test_racing_redemptions_burn_the_token_once() {
        let db = test_db().await;
        let user = get_or_create_telegram_user(&db, "12345", None)
            .await
            .unwrap();
        let token = issue_login_token(&db, &user.id).await.unwrap();

        let (a, b) = tokio::join!(
            verify_login_token(&db, &token),
            verify_login_token(&db, &token)
        );
        let wins = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|r| r.is_some())
            .count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_unknown_login_token_is_rejected() {
        let db = test_db().await;
        let redeemed = verify_login_token(&db, "no-such-token").await.unwrap();
        assert_eq!(redeemed, None);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let db = test_db().await;
        let user = get_or_create_telegram_user(&db, "12345", Some("alice"))
            .await
            .unwrap();

        let session = create_session(&db, &user.id).await.unwrap();
        let resolved = get_session(&db, &session).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.telegram_username.as_deref(), Some("alice"));

        destroy_session(&db, &session).await.unwrap();
        assert!(get_session(&db, &session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
    }
}
