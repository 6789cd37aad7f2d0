use std::path::PathBuf;

use anyhow::{Context, bail};

use spritz_api::{ApiConfig, GoogleConfig, Huddle01Config};

/// Session secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "changeme",
    "secret",
];

const DEFAULT_HUDDLE01_API_URL: &str = "https://api.huddle01.com/api/v2";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub api: ApiConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let session_secret = var("SPRITZ_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("SPRITZ_SESSION_SECRET is unset or still a placeholder");
        }

        let host = var("SPRITZ_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("SPRITZ_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("SPRITZ_PORT must be a port number")?;
        let db_path: PathBuf = var("SPRITZ_DB_PATH").unwrap_or_else(|| "spritz.db".into()).into();
        let app_url = var("SPRITZ_APP_URL").unwrap_or_else(|| "http://localhost:3000".into());

        let mut api = ApiConfig::new(app_url, session_secret);
        if let Some(domain) = var("SPRITZ_SIWS_DOMAIN") {
            api.siws_domain = domain;
        }

        api.google = match (var("GOOGLE_CLIENT_ID"), var("GOOGLE_CLIENT_SECRET")) {
            (Some(id), Some(secret)) => {
                let redirect = var("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|| format!("{}/api/calendar/callback", api.app_url));
                Some(GoogleConfig::new(id, secret, redirect))
            }
            _ => None,
        };

        api.huddle01 = match (var("HUDDLE01_API_KEY"), var("HUDDLE01_PROJECT_ID")) {
            (Some(api_key), Some(project_id)) => Some(Huddle01Config {
                api_key,
                project_id,
                api_url: var("HUDDLE01_API_URL")
                    .unwrap_or_else(|| DEFAULT_HUDDLE01_API_URL.into())
                    .trim_end_matches('/')
                    .to_string(),
            }),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            db_path,
            api,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("SPRITZ_SESSION_SECRET", "dev-secret-change-me")]).is_err());
        assert!(config(&[("SPRITZ_SESSION_SECRET", "   ")]).is_err());
    }

    #[test]
    fn defaults() {
        let cfg = config(&[("SPRITZ_SESSION_SECRET", "s3cr3t-value")]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("spritz.db"));
        assert_eq!(cfg.api.app_url, "http://localhost:3000");
        assert_eq!(cfg.api.siws_domain, "localhost");
        assert!(cfg.api.google.is_none());
        assert!(cfg.api.huddle01.is_none());
    }

    #[test]
    fn providers_need_both_credentials() {
        let cfg = config(&[
            ("SPRITZ_SESSION_SECRET", "s3cr3t-value"),
            ("SPRITZ_APP_URL", "https://app.spritz.chat/"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("HUDDLE01_API_KEY", "key"),
        ])
        .unwrap();

        let google = cfg.api.google.unwrap();
        assert_eq!(google.redirect_uri, "https://app.spritz.chat/api/calendar/callback");
        assert_eq!(cfg.api.siws_domain, "app.spritz.chat");
        assert!(cfg.api.huddle01.is_none());
    }

    #[test]
    fn bad_port() {
        assert!(config(&[("SPRITZ_SESSION_SECRET", "s3cr3t-value"), ("SPRITZ_PORT", "http")]).is_err());
    }
}
