//! Google OAuth and Calendar calls used by the calendar handlers.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::GoogleConfig;

const SCOPES: &str = "https://www.googleapis.com/auth/calendar.readonly \
     https://www.googleapis.com/auth/calendar.freebusy \
     https://www.googleapis.com/auth/userinfo.email";

/// Access tokens this close to expiry are refreshed before use.
pub const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in.map(|secs| now + Duration::seconds(secs))
    }
}

pub fn needs_refresh(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|exp| exp - now <= Duration::seconds(REFRESH_MARGIN_SECS))
}

/// Consent screen URL. Offline access with a forced prompt so Google always
/// returns a refresh token.
pub fn authorization_url(cfg: &GoogleConfig, state: &str) -> Result<String> {
    let url = reqwest::Url::parse_with_params(
        &cfg.auth_url,
        &[
            ("client_id", cfg.client_id.as_str()),
            ("redirect_uri", cfg.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", SCOPES),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )?;
    Ok(url.to_string())
}

pub async fn exchange_code(http: &reqwest::Client, cfg: &GoogleConfig, code: &str) -> Result<TokenResponse> {
    token_request(
        http,
        cfg,
        &[
            ("code", code),
            ("client_id", &cfg.client_id),
            ("client_secret", &cfg.client_secret),
            ("redirect_uri", &cfg.redirect_uri),
            ("grant_type", "authorization_code"),
        ],
    )
    .await
}

pub async fn refresh_access_token(
    http: &reqwest::Client,
    cfg: &GoogleConfig,
    refresh_token: &str,
) -> Result<TokenResponse> {
    token_request(
        http,
        cfg,
        &[
            ("refresh_token", refresh_token),
            ("client_id", &cfg.client_id),
            ("client_secret", &cfg.client_secret),
            ("grant_type", "refresh_token"),
        ],
    )
    .await
}

async fn token_request(
    http: &reqwest::Client,
    cfg: &GoogleConfig,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let resp = http.post(&cfg.token_url).form(form).send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("Token endpoint returned {}: {}", status, body);
    }
    resp.json().await.context("Malformed token response")
}

/// Best effort: a failed revoke is logged and otherwise ignored.
pub async fn revoke(http: &reqwest::Client, cfg: &GoogleConfig, token: &str) {
    match http.post(&cfg.revoke_url).form(&[("token", token)]).send().await {
        Ok(resp) if resp.status().is_success() => debug!("Revoked Google token"),
        Ok(resp) => warn!("Google revoke returned {}", resp.status()),
        Err(e) => warn!("Google revoke failed: {}", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PrimaryCalendar {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// The user's primary calendar. Its id is the account's email address.
pub async fn primary_calendar(
    http: &reqwest::Client,
    cfg: &GoogleConfig,
    access_token: &str,
) -> Result<PrimaryCalendar> {
    let resp = http
        .get(format!("{}/users/me/calendarList/primary", cfg.calendar_api))
        .bearer_auth(access_token)
        .send()
        .await?;
    if !resp.status().is_success() {
        bail!("calendarList returned {}", resp.status());
    }
    Ok(resp.json().await?)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest<'a> {
    time_min: String,
    time_max: String,
    items: [FreeBusyItem<'a>; 1],
}

#[derive(Serialize)]
struct FreeBusyItem<'a> {
    id: &'a str,
}

#[derive(Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: std::collections::HashMap<String, FreeBusyCalendar>,
}

#[derive(Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyInterval>,
}

#[derive(Deserialize)]
struct BusyInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Busy intervals of `calendar_id` between `from` and `to`.
pub async fn free_busy(
    http: &reqwest::Client,
    cfg: &GoogleConfig,
    access_token: &str,
    calendar_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
    let body = FreeBusyRequest {
        time_min: from.to_rfc3339(),
        time_max: to.to_rfc3339(),
        items: [FreeBusyItem { id: calendar_id }],
    };
    let resp = http
        .post(format!("{}/freeBusy", cfg.calendar_api))
        .bearer_auth(access_token)
        .json(&body)
        .send()
        .await?;
    if !resp.status().is_success() {
        bail!("freeBusy returned {}", resp.status());
    }

    let parsed: FreeBusyResponse = resp.json().await?;
    Ok(parsed
        .calendars
        .into_values()
        .flat_map(|c| c.busy)
        .map(|b| (b.start, b.end))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GoogleConfig {
        GoogleConfig::new(
            "client-1".into(),
            "shh".into(),
            "https://app.example/api/calendar/callback".into(),
        )
    }

    #[test]
    fn consent_url_requests_offline_access() {
        let url = authorization_url(&config(), "st@te").unwrap();
        let parsed = reqwest::Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        assert_eq!(params["client_id"], "client-1");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["state"], "st@te");
        assert!(params["scope"].contains("calendar.readonly"));
    }

    #[test]
    fn refresh_margin() {
        let now = Utc::now();
        assert!(needs_refresh(Some(now + Duration::seconds(30)), now));
        assert!(needs_refresh(Some(now - Duration::seconds(5)), now));
        assert!(!needs_refresh(Some(now + Duration::minutes(10)), now));
        assert!(!needs_refresh(None, now));
    }
}
