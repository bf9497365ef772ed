//! Token-based session management against the gear service auth endpoints.
//!
//! `Session` owns the token pair, exchanges credentials for tokens at login,
//! rotates them on refresh, and persists the session to disk so a technician
//! does not have to log in again between app launches. It talks to the auth
//! endpoints with its own plain HTTP client - routing a refresh through the
//! authenticated transport would make the refresh recursive.

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::store::{SessionError, SessionStore};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Token expiry time in minutes.
/// Gear service access tokens are issued for 60 minutes.
const TOKEN_EXPIRY_MINUTES: i64 = 60;

/// Buffer time before expiry to trigger refresh (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Timeout for auth endpoint calls.
const AUTH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: String,
    pub technician_id: i64,
    pub technician_name: String,
    pub department_id: Option<i64>,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        let expiry = self.created_at + chrono::Duration::minutes(TOKEN_EXPIRY_MINUTES);
        Utc::now() > expiry
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        let refresh_at = self.created_at
            + chrono::Duration::minutes(TOKEN_EXPIRY_MINUTES - TOKEN_REFRESH_BUFFER_MINUTES);
        Utc::now() > refresh_at
    }

    pub fn time_until_expiry(&self) -> chrono::Duration {
        let expiry = self.created_at + chrono::Duration::minutes(TOKEN_EXPIRY_MINUTES);
        expiry - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

// Wire shapes for the auth endpoints

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    technician: TechnicianInfo,
}

#[derive(Debug, Deserialize)]
struct TechnicianInfo {
    id: i64,
    name: String,
    #[serde(rename = "departmentId")]
    department_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    // Some deployments rotate the refresh token, some return it unchanged or
    // omit it.
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
}

pub struct Session {
    http: Client,
    auth_base_url: Url,
    cache_dir: PathBuf,
    data: RwLock<Option<SessionData>>,
}

impl Session {
    pub fn new(auth_base_url: &str, cache_dir: PathBuf) -> Result<Self> {
        let mut auth_base_url = Url::parse(auth_base_url).context("Invalid auth base URL")?;
        if !auth_base_url.path().ends_with('/') {
            auth_base_url.set_path(&format!("{}/", auth_base_url.path()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(AUTH_TIMEOUT_SECS))
            .build()
            .context("Failed to build auth HTTP client")?;

        Ok(Self {
            http,
            auth_base_url,
            cache_dir,
            data: RwLock::new(None),
        })
    }

    fn auth_url(&self, path: &str) -> Result<Url> {
        self.auth_base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid auth path: {}", path))
    }

    /// Exchange credentials for a token pair and start a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionData> {
        let url = self.auth_url("auth/login")?;
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .context("Failed to send login request")?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::LoginRejected { status, body }.into());
        }

        let login: LoginResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        let data = SessionData {
            access_token: login.access_token,
            refresh_token: login.refresh_token,
            technician_id: login.technician.id,
            technician_name: login.technician.name,
            department_id: login.technician.department_id,
            username: username.to_string(),
            created_at: Utc::now(),
        };

        *self.data.write().unwrap() = Some(data.clone());
        if let Err(err) = self.save() {
            warn!(error = %err, "Failed to persist session after login");
        }

        Ok(data)
    }

    /// Load a previously persisted session from disk.
    /// Returns true when a non-expired session was restored.
    pub fn load(&self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;

            if !data.is_expired() {
                *self.data.write().unwrap() = Some(data);
                return Ok(true);
            }
            debug!("Persisted session has expired, ignoring it");
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = *self.data.read().unwrap() {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data, both in memory and on disk.
    pub fn clear(&self) -> Result<()> {
        *self.data.write().unwrap() = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Snapshot of the current session, if any.
    pub fn data(&self) -> Option<SessionData> {
        self.data.read().unwrap().clone()
    }

    /// Get the technician ID if a session exists
    pub fn technician_id(&self) -> Option<i64> {
        self.data.read().unwrap().as_ref().map(|d| d.technician_id)
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.data
            .read()
            .unwrap()
            .as_ref()
            .map(|d| !d.is_expired())
            .unwrap_or(false)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[async_trait]
impl SessionStore for Session {
    fn access_token(&self) -> Option<String> {
        self.data
            .read()
            .unwrap()
            .as_ref()
            .map(|d| d.access_token.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        self.data
            .read()
            .unwrap()
            .as_ref()
            .map(|d| d.refresh_token.clone())
    }

    async fn refresh(&self) -> Result<(), SessionError> {
        let refresh_token = self.refresh_token().ok_or(SessionError::NoRefreshToken)?;

        let url = self
            .auth_url("auth/refresh")
            .map_err(|e| SessionError::InvalidEndpoint(e.to_string()))?;
        let body = serde_json::json!({ "refreshToken": refresh_token });

        let response = self.http.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::RefreshRejected { status, body });
        }

        let refreshed: RefreshResponse = response.json().await?;

        {
            let mut guard = self.data.write().unwrap();
            let data = guard.as_mut().ok_or(SessionError::NotAuthenticated)?;
            data.access_token = refreshed.access_token;
            if let Some(new_refresh) = refreshed.refresh_token {
                data.refresh_token = new_refresh;
            }
            data.created_at = Utc::now();
        }

        if let Err(err) = self.save() {
            warn!(error = %err, "Failed to persist refreshed session");
        }
        debug!("Session tokens rotated");
        Ok(())
    }

    async fn logout(&self) -> Result<(), SessionError> {
        // Tell the backend, but never let that stop the local teardown.
        if let Ok(url) = self.auth_url("auth/logout") {
            match self.http.post(url).send().await {
                Ok(_) => debug!("Server-side logout acknowledged"),
                Err(err) => debug!(error = %err, "Server-side logout failed"),
            }
        }

        if let Err(err) = self.clear() {
            warn!(error = %err, "Failed to remove persisted session");
        }
        Ok(())
    }
}
