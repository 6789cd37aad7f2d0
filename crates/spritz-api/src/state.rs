use std::sync::Arc;

use spritz_db::{Database, is_missing_table};
use tracing::warn;

use crate::error::ApiResult;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub config: ApiConfig,
    pub http: reqwest::Client,
}

impl AppStateInner {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        Self {
            db,
            config,
            http: reqwest::Client::new(),
        }
    }
}

/// Run a blocking store call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
}

/// Like [`with_db`], but a read against a table that does not exist yet
/// yields `T::default()` instead of an error.
pub async fn read_or_empty<F, T>(state: &AppState, what: &str, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Default + Send + 'static,
{
    match with_db(state, f).await {
        Ok(value) => Ok(value),
        Err(e) if is_missing_table(&e) => {
            warn!("{} table missing, returning empty result", what);
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Settings the handlers need. Built once by the binary from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Public URL of the web app, used for OAuth redirects.
    pub app_url: String,
    /// HMAC key for session tokens and OAuth state.
    pub session_secret: String,
    /// Domain line expected in Sign-In With Solana messages.
    pub siws_domain: String,
    pub google: Option<GoogleConfig>,
    pub huddle01: Option<Huddle01Config>,
}

impl ApiConfig {
    pub fn new(app_url: impl Into<String>, session_secret: impl Into<String>) -> Self {
        let app_url = app_url.into().trim_end_matches('/').to_string();
        let siws_domain = reqwest::Url::parse(&app_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "localhost".to_string());
        Self {
            app_url,
            session_secret: session_secret.into(),
            siws_domain,
            google: None,
            huddle01: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
    pub calendar_api: String,
}

impl GoogleConfig {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            calendar_api: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Huddle01Config {
    pub api_key: String,
    pub project_id: String,
    pub api_url: String,
}
