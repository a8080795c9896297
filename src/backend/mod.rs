//! The hosted backend the client talks to: auth, rows and file storage.

pub mod http;
pub mod memory;
pub mod query;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::AppResult;
use crate::model::{Session, UserMetadata};

pub use http::HttpBackend;
pub use memory::MemoryBackend;
pub use query::{Filter, Order, SelectQuery};

/// Session transitions pushed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthChange {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

impl AuthChange {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthChange::SignedIn(s) | AuthChange::TokenRefreshed(s) => Some(s),
            AuthChange::SignedOut => None,
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    // --- auth ---
    async fn get_session(&self) -> AppResult<Option<Session>>;
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session>;
    /// `None` when the account still needs email confirmation.
    async fn sign_up(&self, email: &str, password: &str, metadata: UserMetadata) -> AppResult<Option<Session>>;
    async fn sign_out(&self) -> AppResult<()>;
    fn subscribe_auth_changes(&self) -> broadcast::Receiver<AuthChange>;

    // --- rows ---
    async fn select(&self, query: &SelectQuery) -> AppResult<Vec<Value>>;
    /// Count-only query; columns, order and window are ignored.
    async fn count(&self, query: &SelectQuery) -> AppResult<u64>;
    /// Inserts one row and returns it shaped by `returning`.
    async fn insert(&self, table: &str, row: Value, returning: &str) -> AppResult<Value>;
    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> AppResult<()>;
    async fn update(&self, table: &str, id: Uuid, patch: Value) -> AppResult<Value>;
    /// Deletes every row matching the query's filters.
    async fn delete(&self, query: &SelectQuery) -> AppResult<()>;

    // --- storage ---
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()>;
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
