//! # Common Test Utilities
//!
//! This module centralizes the test harness used across the
//! `linkstash-server` integration tests:
//!
//! - `TestApp`: a full application harness that spawns a real server on a
//!   random port, backed by a temporary SQLite database and with all external
//!   services (tag providers, the Telegram Bot API) pointed at an
//!   `httpmock::MockServer`.

// Allow unused code because this is a test utility module, and not all
// functions might be used by every test file that includes it.
#![allow(unused)]

use anyhow::Result;
use httpmock::MockServer;
use linkstash_access::{create_session, get_or_create_telegram_user, User};
use linkstash_server::{
    config, router,
    state::{build_app_state, AppState},
};
use reqwest::Client;
use std::{fs::File, io::Write, net::SocketAddr, path::PathBuf};
use tempfile::{tempdir, NamedTempFile, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub db_path: PathBuf,
    pub app_state: AppState,
    _db_file: NamedTempFile,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server and returns a `TestApp` instance.
    pub async fn spawn() -> Result<Self> {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let mock_server = MockServer::start();
        let db_file = NamedTempFile::new()?;
        let db_path = db_file.path().to_path_buf();

        let config_dir = tempdir()?;
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
db_url: "{}"
telegram:
  bot_token: "test-bot-token"
  api_url: "{}"
metadata:
  facebook_app_id: "test-app-id"
  facebook_app_secret: "test-app-secret"
  instagram_oembed_url: "{}"
tagging:
  providers:
    - provider: "openai"
      api_url: "{}"
      api_key: null
      model_name: "mock-chat-model"
"#,
            db_path.to_str().unwrap(),
            mock_server.base_url(),
            mock_server.url("/instagram_oembed"),
            mock_server.url("/v1/chat/completions"),
        );
        let mut file = File::create(&config_path)?;
        file.write_all(config_content.as_bytes())?;

        let config = config::get_config(Some(config_path.to_str().unwrap()))?;
        let app_state = build_app_state(config).await?;
        let app_state_for_harness = app_state.clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            db_path,
            app_state: app_state_for_harness,
            _db_file: db_file,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Creates (or finds) a user for the Telegram id and opens a session,
    /// returning the user and a bearer token for API calls.
    pub async fn authenticate(&self, telegram_id: &str) -> Result<(User, String)> {
        let user =
            get_or_create_telegram_user(&self.app_state.store.db, telegram_id, Some("tester"))
                .await?;
        let token = create_session(&self.app_state.store.db, &user.id).await?;
        Ok((user, token))
    }

    /// Registers a mock page at `path` serving the given Open Graph title.
    pub fn mock_page(&self, path: &str, title: &str) {
        let body = format!(
            r#"<html><head><meta property="og:title" content="{title}" /></head></html>"#
        );
        self.mock_server.mock(|when, then| {
            when.method(httpmock::Method::GET).path(path.to_string());
            then.status(200).body(body);
        });
    }

    /// Registers the mock tag provider response used by most save tests.
    pub fn mock_tagger(&self, tags: &[&str]) {
        let tag_objects: Vec<serde_json::Value> = tags
            .iter()
            .map(|name| serde_json::json!({"name": name, "confidence": 0.9, "category": "topic"}))
            .collect();
        let content =
            serde_json::to_string(&serde_json::json!({ "tags": tag_objects })).unwrap();
        self.mock_server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/chat/completions");
            then.status(200).json_body(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            }));
        });
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
