//! REST client for the hosted backend (auth, rows, storage).

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{AuthChange, Backend, SelectQuery};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::{AuthUser, Session, UserMetadata};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
/// Refresh this many seconds before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 10;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    session_path: Option<PathBuf>,
    auth_tx: broadcast::Sender<AuthChange>,
    // Refresh tokens are single use; concurrent requests must not race to spend one.
    refresh_lock: Mutex<()>,
}

impl HttpBackend {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let session_path = config.session_path();
        let persisted = load_session(&session_path);
        if persisted.is_some() {
            debug!(path = %session_path.display(), "Restored persisted session");
        }
        let (auth_tx, _) = broadcast::channel(16);
        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            session: RwLock::new(persisted),
            session_path: Some(session_path),
            auth_tx,
            refresh_lock: Mutex::new(()),
        })
    }

    fn current_session(&self) -> Option<Session> {
        self.session.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn store_session(&self, session: Option<Session>) {
        if let Some(path) = &self.session_path {
            let result = match &session {
                Some(s) => serde_json::to_string(s)
                    .map_err(std::io::Error::other)
                    .and_then(|data| fs::write(path, data)),
                None if path.exists() => fs::remove_file(path),
                None => Ok(()),
            };
            if let Err(e) = result {
                warn!(path = %path.display(), error = %e, "Could not persist session");
            }
        }
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    fn emit(&self, change: AuthChange) {
        // No receivers is fine; nobody is listening yet.
        let _ = self.auth_tx.send(change);
    }

    /// The stored session, refreshed first when it is at or near expiry.
    ///
    /// A refresh broadcasts `TokenRefreshed`; a failed or impossible refresh
    /// clears the session and broadcasts `SignedOut`.
    async fn valid_session(&self) -> AppResult<Option<Session>> {
        match self.current_session() {
            Some(session) if needs_refresh(&session) => {}
            other => return Ok(other),
        }
        let _guard = self.refresh_lock.lock().await;
        // Another request may have refreshed while we waited.
        let Some(session) = self.current_session() else {
            return Ok(None);
        };
        if !needs_refresh(&session) {
            return Ok(Some(session));
        }
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            info!("Session expired without a refresh token");
            self.store_session(None);
            self.emit(AuthChange::SignedOut);
            return Ok(None);
        };
        match self.refresh(refresh_token).await {
            Ok(fresh) => {
                debug!(user_id = %fresh.user.id, "Access token refreshed");
                self.store_session(Some(fresh.clone()));
                self.emit(AuthChange::TokenRefreshed(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, signing out");
                self.store_session(None);
                self.emit(AuthChange::SignedOut);
                Err(e)
            }
        }
    }

    fn request_with(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    /// Authorized as the current user, or with the anon key when signed out.
    async fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let token = match self.valid_session().await {
            Ok(Some(session)) => session.access_token,
            Ok(None) => self.anon_key.clone(),
            // Already signed out by the failed refresh.
            Err(_) => self.anon_key.clone(),
        };
        self.request_with(method, url, &token)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<Session> {
        let url = format!("{}/auth/v1/token?grant_type=refresh_token", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let token: TokenResponse = ensure_success(resp).await?.json().await?;
        Ok(token.into_session())
    }
}

fn needs_refresh(session: &Session) -> bool {
    session
        .expires_at
        .is_some_and(|at| at <= Utc::now().timestamp() + EXPIRY_MARGIN_SECS)
}

fn load_session(path: &PathBuf) -> Option<Session> {
    let data = fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

async fn ensure_success(resp: Response) -> AppResult<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    Err(error_from_response(resp).await)
}

async fn error_from_response(resp: Response) -> AppError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| if text.is_empty() { format!("HTTP {}", status) } else { text });
    AppError::backend(status, message)
}

/// `Content-Range: 0-9/42` or `*/42` -> 42.
fn parse_content_range(value: Option<&HeaderValue>) -> Option<u64> {
    value?.to_str().ok()?.rsplit('/').next()?.parse().ok()
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_session(&self) -> AppResult<Option<Session>> {
        self.valid_session().await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = ensure_success(resp).await?.json().await?;
        let session = token.into_session();
        info!(user_id = %session.user.id, "Signed in");
        self.store_session(Some(session.clone()));
        self.emit(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: UserMetadata) -> AppResult<Option<Session>> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        let body: Value = ensure_success(resp).await?.json().await?;
        if body.get("access_token").is_none() {
            info!(email, "Sign-up pending email confirmation");
            return Ok(None);
        }
        let session = serde_json::from_value::<TokenResponse>(body)?.into_session();
        self.store_session(Some(session.clone()));
        self.emit(AuthChange::SignedIn(session.clone()));
        Ok(Some(session))
    }

    async fn sign_out(&self) -> AppResult<()> {
        // Logout revokes the stored token as is.
        if let Some(session) = self.current_session() {
            let url = format!("{}/auth/v1/logout", self.base_url);
            let resp = self.request_with(Method::POST, &url, &session.access_token).send().await?;
            ensure_success(resp).await?;
        }
        self.store_session(None);
        self.emit(AuthChange::SignedOut);
        Ok(())
    }

    fn subscribe_auth_changes(&self) -> broadcast::Receiver<AuthChange> {
        self.auth_tx.subscribe()
    }

    async fn select(&self, query: &SelectQuery) -> AppResult<Vec<Value>> {
        let url = self.rest_url(&query.table);
        debug!(table = %query.table, params = ?query.to_params(), "select");
        let mut req = self.request(Method::GET, &url).await.query(&query.to_params());
        if query.single {
            req = req.header(ACCEPT, SINGLE_OBJECT);
        }
        let resp = req.send().await?;
        if query.single && resp.status() == StatusCode::NOT_ACCEPTABLE {
            return Err(AppError::NotFound(format!("{} row", query.table)));
        }
        let body: Value = ensure_success(resp).await?.json().await?;
        Ok(match body {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            row => vec![row],
        })
    }

    async fn count(&self, query: &SelectQuery) -> AppResult<u64> {
        let url = self.rest_url(&query.table);
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query.filter_params());
        let resp = self
            .request(Method::HEAD, &url)
            .await
            .query(&params)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(parse_content_range(resp.headers().get("content-range")).unwrap_or(0))
    }

    async fn insert(&self, table: &str, row: Value, returning: &str) -> AppResult<Value> {
        let url = self.rest_url(table);
        let select: String = returning.chars().filter(|c| !c.is_whitespace()).collect();
        let resp = self
            .request(Method::POST, &url)
            .await
            .query(&[("select", select)])
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&row)
            .send()
            .await?;
        Ok(ensure_success(resp).await?.json().await?)
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> AppResult<()> {
        let url = self.rest_url(table);
        let resp = self
            .request(Method::POST, &url)
            .await
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row)
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn update(&self, table: &str, id: Uuid, patch: Value) -> AppResult<Value> {
        let url = self.rest_url(table);
        let resp = self
            .request(Method::PATCH, &url)
            .await
            .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())])
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&patch)
            .send()
            .await?;
        Ok(ensure_success(resp).await?.json().await?)
    }

    async fn delete(&self, query: &SelectQuery) -> AppResult<()> {
        let url = self.rest_url(&query.table);
        let resp = self
            .request(Method::DELETE, &url)
            .await
            .query(&query.filter_params())
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let resp = self
            .request(Method::POST, &url)
            .await
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range(Some(&HeaderValue::from_static("0-9/42"))), Some(42));
        assert_eq!(parse_content_range(Some(&HeaderValue::from_static("*/0"))), Some(0));
        assert_eq!(parse_content_range(Some(&HeaderValue::from_static("*/*"))), None);
        assert_eq!(parse_content_range(None), None);
    }

    #[test]
    fn token_response_computes_expiry() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "t",
            "refresh_token": "r",
            "expires_in": 3600,
            "user": { "id": Uuid::nil(), "email": "a@b.c" }
        }))
        .unwrap();
        let session = token.into_session();
        let at = session.expires_at.unwrap();
        assert!(at > Utc::now().timestamp() + 3000);
        assert_eq!(session.user.email.as_deref(), Some("a@b.c"));
    }
}
