//! In-process backend: tables, accounts and storage held in memory.
//!
//! Speaks the same `Backend` contract as the REST client, including the
//! embedded relations this client asks for (`user:users(..)`, `likes(..)`,
//! `comments(count)`) and the uniqueness of like/follow pairs. Used by the
//! offline demo mode and by the tests, which can also inspect the call log
//! and inject one-shot failures.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::{AuthChange, Backend, Filter, SelectQuery};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::{AuthUser, Session, UserMetadata};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Value>>,
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    objects: HashMap<String, StoredObject>,
    calls: Vec<String>,
    failures: HashMap<String, String>,
}

impl MemoryState {
    /// Logs the call and fires a pending injected failure for it, if any.
    fn record(&mut self, op: String) -> AppResult<()> {
        let injected = self.failures.remove(&op);
        self.calls.push(op);
        match injected {
            Some(message) => Err(AppError::backend(500, message)),
            None => Ok(()),
        }
    }

    fn rows(&self, table: &str) -> &[Value] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub struct MemoryBackend {
    base_url: String,
    state: Mutex<MemoryState>,
    auth_tx: broadcast::Sender<AuthChange>,
}

impl MemoryBackend {
    pub fn new(config: Arc<Config>) -> Self {
        let base_url = if config.backend_url.is_empty() {
            "memory://local".to_string()
        } else {
            config.backend_url.trim_end_matches('/').to_string()
        };
        let (auth_tx, _) = broadcast::channel(16);
        Self { base_url, state: Mutex::new(MemoryState::default()), auth_tx }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers an account; the `users` row appears on first sign-in.
    pub fn add_account(&self, email: &str, password: &str, metadata: UserMetadata) -> AuthUser {
        let user = AuthUser { id: Uuid::new_v4(), email: Some(email.to_string()), user_metadata: metadata };
        let mut state = self.lock();
        state.accounts.insert(
            email.to_lowercase(),
            Account { password: password.to_string(), user: user.clone() },
        );
        user
    }

    /// Inserts a row directly, filling `id` and `created_at` when absent.
    pub fn seed_row(&self, table: &str, row: Value) -> Value {
        let row = with_defaults(row);
        self.lock().tables.entry(table.to_string()).or_default().push(row.clone());
        row
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().rows(table).to_vec()
    }

    /// Sets the ambient session without emitting a change.
    pub fn set_session(&self, session: Option<Session>) {
        self.lock().session = session;
    }

    /// Simulates a session change driven from outside this client.
    pub fn push_auth_change(&self, change: AuthChange) {
        self.lock().session = change.session().cloned();
        let _ = self.auth_tx.send(change);
    }

    pub fn session_for(user: &AuthUser) -> Session {
        Session {
            access_token: format!("mem-{}", Uuid::new_v4()),
            refresh_token: None,
            expires_at: Some((Utc::now() + Duration::hours(1)).timestamp()),
            user: user.clone(),
        }
    }

    /// Makes the next call of `op` (e.g. `"insert:posts"`) fail with `message`.
    pub fn fail_next(&self, op: &str, message: &str) {
        self.lock().failures.insert(op.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.as_str() == op).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.lock().objects.get(path).cloned()
    }

    /// A small populated world for the offline mode.
    pub fn demo(config: Arc<Config>) -> Self {
        let backend = Self::new(config);
        let people = [
            ("demo@socialspace.dev", "Ana", "Lima"),
            ("kai@socialspace.dev", "Kai", "Moreau"),
            ("rin@socialspace.dev", "Rin", "Okafor"),
        ];
        let mut ids = Vec::new();
        for (email, first, last) in people {
            let meta = UserMetadata { first_name: Some(first.into()), last_name: Some(last.into()), avatar_url: None };
            let user = backend.add_account(email, "password", meta);
            backend.seed_row(
                "users",
                json!({
                    "id": user.id,
                    "email": email,
                    "first_name": first,
                    "last_name": last,
                    "bio": format!("Hi, I'm {}.", first),
                }),
            );
            ids.push(user.id);
        }
        let now = Utc::now();
        let captions = ["Morning light over the harbour", "", "Trail run, 12km", "New desk setup"];
        let mut posts = Vec::new();
        for (i, caption) in captions.iter().enumerate() {
            let author = ids[(i + 1) % ids.len()];
            let post = backend.seed_row(
                "posts",
                json!({
                    "user_id": author,
                    "image_url": format!("https://picsum.photos/seed/socialspace{}/600/600", i),
                    "caption": if caption.is_empty() { Value::Null } else { json!(caption) },
                    "created_at": timestamp(now - Duration::hours(3 * i as i64 + 1)),
                }),
            );
            posts.push(post["id"].clone());
        }
        backend.seed_row("likes", json!({ "post_id": posts[0], "user_id": ids[2] }));
        backend.seed_row("likes", json!({ "post_id": posts[0], "user_id": ids[0] }));
        backend.seed_row("comments", json!({ "post_id": posts[0], "user_id": ids[2], "body": "Stunning!" }));
        backend.seed_row("follows", json!({ "follower_id": ids[0], "following_id": ids[1] }));
        backend.seed_row(
            "stories",
            json!({
                "user_id": ids[1],
                "media_url": "https://picsum.photos/seed/story/400/700",
                "expires_at": timestamp(now + Duration::hours(20)),
            }),
        );
        backend.clear_calls();
        backend
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn with_defaults(row: Value) -> Value {
    let mut obj = match row {
        Value::Object(map) => map,
        other => return other,
    };
    obj.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
    obj.entry("created_at").or_insert_with(|| json!(timestamp(Utc::now())));
    Value::Object(obj)
}

fn value_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "null".to_string(),
        Some(other) => other.to_string(),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    if let (Ok(x), Ok(y)) = (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
        return x.cmp(&y);
    }
    if let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    a.cmp(b)
}

fn matches(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(col, val) => value_text(row.get(col)) == *val,
        Filter::Gte(col, val) => compare_text(&value_text(row.get(col)), val) != Ordering::Less,
        Filter::OrIlike(cols, needle) => {
            let needle = needle.to_lowercase();
            cols.iter().any(|c| match row.get(c) {
                Some(Value::String(s)) => s.to_lowercase().contains(&needle),
                _ => false,
            })
        }
    }
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches(row, f))
}

#[derive(Debug, Clone, PartialEq)]
enum ColumnSpec {
    All,
    Column(String),
    Embed { alias: String, table: String, columns: String },
}

/// Splits a select list on top-level commas.
fn parse_columns(columns: &str) -> Vec<ColumnSpec> {
    let compact: String = columns.chars().filter(|c| !c.is_whitespace()).collect();
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in compact.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
        .into_iter()
        .filter(|i| !i.is_empty())
        .map(|item| {
            if item == "*" {
                return ColumnSpec::All;
            }
            match (item.find('('), item.rfind(')')) {
                (Some(open), Some(close)) if close > open => {
                    let head = &item[..open];
                    let inner = item[open + 1..close].to_string();
                    let (alias, table) = match head.split_once(':') {
                        Some((alias, table)) => (alias.to_string(), table.to_string()),
                        None => (head.to_string(), head.to_string()),
                    };
                    ColumnSpec::Embed { alias, table, columns: inner }
                }
                _ => ColumnSpec::Column(item),
            }
        })
        .collect()
}

fn singular(table: &str) -> &str {
    table.strip_suffix('s').unwrap_or(table)
}

fn project(state: &MemoryState, table: &str, row: &Value, columns: &str) -> Value {
    let mut out = Map::new();
    for spec in parse_columns(columns) {
        match spec {
            ColumnSpec::All => {
                if let Value::Object(obj) = row {
                    out.extend(obj.clone());
                }
            }
            ColumnSpec::Column(col) => {
                out.insert(col.clone(), row.get(&col).cloned().unwrap_or(Value::Null));
            }
            ColumnSpec::Embed { alias, table: child, columns } => {
                let embedded = embed(state, table, row, &child, &columns);
                out.insert(alias, embedded);
            }
        }
    }
    Value::Object(out)
}

/// Many-to-one when the parent holds `<child>_id`, otherwise one-to-many.
fn embed(state: &MemoryState, parent_table: &str, parent: &Value, child: &str, columns: &str) -> Value {
    let fk = format!("{}_id", singular(child));
    if let Some(target) = parent.get(&fk) {
        let target = value_text(Some(target));
        return state
            .rows(child)
            .iter()
            .find(|r| value_text(r.get("id")) == target)
            .map(|r| project(state, child, r, columns))
            .unwrap_or(Value::Null);
    }
    let back_ref = format!("{}_id", singular(parent_table));
    let parent_id = value_text(parent.get("id"));
    let children: Vec<&Value> = state
        .rows(child)
        .iter()
        .filter(|r| value_text(r.get(&back_ref)) == parent_id)
        .collect();
    if columns == "count" {
        return json!([{ "count": children.len() }]);
    }
    Value::Array(children.into_iter().map(|r| project(state, child, r, columns)).collect())
}

fn unique_key(table: &str) -> Option<&'static [&'static str]> {
    match table {
        "likes" => Some(&["post_id", "user_id"]),
        "follows" => Some(&["follower_id", "following_id"]),
        _ => None,
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_session(&self) -> AppResult<Option<Session>> {
        let mut state = self.lock();
        state.record("auth:get_session".into())?;
        Ok(state.session.clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        let session = {
            let mut state = self.lock();
            state.record("auth:sign_in".into())?;
            let account = state
                .accounts
                .get(&email.to_lowercase())
                .filter(|a| a.password == password)
                .ok_or_else(|| AppError::backend(400, "Invalid login credentials"))?;
            let session = Self::session_for(&account.user);
            state.session = Some(session.clone());
            session
        };
        let _ = self.auth_tx.send(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: UserMetadata) -> AppResult<Option<Session>> {
        {
            let mut state = self.lock();
            state.record("auth:sign_up".into())?;
            if state.accounts.contains_key(&email.to_lowercase()) {
                return Err(AppError::backend(422, "User already registered"));
            }
            if password.len() < 6 {
                return Err(AppError::backend(422, "Password should be at least 6 characters"));
            }
        }
        let user = self.add_account(email, password, metadata);
        let session = Self::session_for(&user);
        self.lock().session = Some(session.clone());
        let _ = self.auth_tx.send(AuthChange::SignedIn(session.clone()));
        Ok(Some(session))
    }

    async fn sign_out(&self) -> AppResult<()> {
        {
            let mut state = self.lock();
            state.record("auth:sign_out".into())?;
            state.session = None;
        }
        let _ = self.auth_tx.send(AuthChange::SignedOut);
        Ok(())
    }

    fn subscribe_auth_changes(&self) -> broadcast::Receiver<AuthChange> {
        self.auth_tx.subscribe()
    }

    async fn select(&self, query: &SelectQuery) -> AppResult<Vec<Value>> {
        let mut state = self.lock();
        state.record(format!("select:{}", query.table))?;
        let mut rows: Vec<&Value> = state
            .rows(&query.table)
            .iter()
            .filter(|r| matches_all(r, &query.filters))
            .collect();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_text(&value_text(a.get(&order.column)), &value_text(b.get(&order.column)));
                if order.ascending { ord } else { ord.reverse() }
            });
        }
        let (offset, limit) = query.window();
        let out: Vec<Value> = rows
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|r| project(&state, &query.table, r, &query.columns))
            .collect();
        if query.single && out.len() != 1 {
            return Err(AppError::NotFound(format!("{} row", query.table)));
        }
        debug!(table = %query.table, rows = out.len(), "memory select");
        Ok(out)
    }

    async fn count(&self, query: &SelectQuery) -> AppResult<u64> {
        let mut state = self.lock();
        state.record(format!("count:{}", query.table))?;
        Ok(state.rows(&query.table).iter().filter(|r| matches_all(r, &query.filters)).count() as u64)
    }

    async fn insert(&self, table: &str, row: Value, returning: &str) -> AppResult<Value> {
        let mut state = self.lock();
        state.record(format!("insert:{}", table))?;
        if !row.is_object() {
            return Err(AppError::backend(400, "Row must be a JSON object"));
        }
        let row = with_defaults(row);
        if let Some(key) = unique_key(table) {
            let duplicate = state
                .rows(table)
                .iter()
                .any(|r| key.iter().all(|k| value_text(r.get(*k)) == value_text(row.get(*k))));
            if duplicate {
                return Err(AppError::backend(409, "duplicate key value violates unique constraint"));
            }
        }
        state.tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(project(&state, table, &row, returning))
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> AppResult<()> {
        let mut state = self.lock();
        state.record(format!("upsert:{}", table))?;
        let Value::Object(patch) = row else {
            return Err(AppError::backend(400, "Row must be a JSON object"));
        };
        let key = value_text(patch.get(on_conflict));
        let rows = state.tables.entry(table.to_string()).or_default();
        match rows.iter_mut().find(|r| value_text(r.get(on_conflict)) == key) {
            Some(Value::Object(existing)) => existing.extend(patch),
            _ => rows.push(with_defaults(Value::Object(patch))),
        }
        Ok(())
    }

    async fn update(&self, table: &str, id: Uuid, patch: Value) -> AppResult<Value> {
        let mut state = self.lock();
        state.record(format!("update:{}", table))?;
        let Value::Object(patch) = patch else {
            return Err(AppError::backend(400, "Patch must be a JSON object"));
        };
        let id = id.to_string();
        let rows = state.tables.entry(table.to_string()).or_default();
        match rows.iter_mut().find(|r| value_text(r.get("id")) == id) {
            Some(Value::Object(existing)) => {
                existing.extend(patch);
                Ok(Value::Object(existing.clone()))
            }
            _ => Err(AppError::NotFound(format!("{} row", table))),
        }
    }

    async fn delete(&self, query: &SelectQuery) -> AppResult<()> {
        let mut state = self.lock();
        state.record(format!("delete:{}", query.table))?;
        if let Some(rows) = state.tables.get_mut(&query.table) {
            rows.retain(|r| !matches_all(r, &query.filters));
        }
        Ok(())
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        let mut state = self.lock();
        state.record(format!("upload:{}", bucket))?;
        if state.objects.contains_key(path) {
            return Err(AppError::backend(409, "The resource already exists"));
        }
        state
            .objects
            .insert(path.to_string(), StoredObject { bytes, content_type: content_type.to_string() });
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
    fn parses_nested_select_list() {
        let specs = parse_columns("*, user:users(id, email), likes(user_id), comments(count)");
        assert_eq!(specs[0], ColumnSpec::All);
        assert_eq!(
            specs[1],
            ColumnSpec::Embed { alias: "user".into(), table: "users".into(), columns: "id,email".into() }
        );
        assert_eq!(
            specs[3],
            ColumnSpec::Embed { alias: "comments".into(), table: "comments".into(), columns: "count".into() }
        );
    }

    #[tokio::test]
    async fn embeds_author_likes_and_comment_count() {
        let backend = MemoryBackend::new(Arc::new(Config::default()));
        let author = Uuid::new_v4();
        backend.seed_row("users", json!({ "id": author, "email": "a@b.c" }));
        let post = backend.seed_row("posts", json!({ "user_id": author, "image_url": "x" }));
        backend.seed_row("likes", json!({ "post_id": post["id"], "user_id": Uuid::new_v4() }));
        backend.seed_row("comments", json!({ "post_id": post["id"] }));
        backend.seed_row("comments", json!({ "post_id": post["id"] }));

        let q = SelectQuery::table("posts").select("*, user:users(id, email), likes(user_id), comments(count)");
        let rows = backend.select(&q).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user"]["email"], "a@b.c");
        assert_eq!(rows[0]["likes"].as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["comments"][0]["count"], 2);
    }

    #[tokio::test]
    async fn like_pairs_are_unique() {
        let backend = MemoryBackend::new(Arc::new(Config::default()));
        let row = json!({ "post_id": Uuid::nil(), "user_id": Uuid::nil() });
        backend.insert("likes", row.clone(), "*").await.unwrap();
        let err = backend.insert("likes", row, "*").await.unwrap_err();
        assert!(matches!(err, AppError::Backend { status: 409, .. }));
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let backend = MemoryBackend::new(Arc::new(Config::default()));
        backend.fail_next("select:users", "boom");
        assert!(backend.select(&SelectQuery::table("users")).await.is_err());
        assert!(backend.select(&SelectQuery::table("users")).await.is_ok());
        assert_eq!(backend.call_count("select:users"), 2);
    }

    #[tokio::test]
    async fn gte_filters_timestamps() {
        let backend = MemoryBackend::new(Arc::new(Config::default()));
        let now = Utc::now();
        backend.seed_row("stories", json!({ "expires_at": timestamp(now - Duration::hours(1)) }));
        backend.seed_row("stories", json!({ "expires_at": timestamp(now + Duration::hours(1)) }));
        let q = SelectQuery::table("stories").gte("expires_at", now.to_rfc3339());
        assert_eq!(backend.select(&q).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_merges_on_conflict_column() {
        let backend = MemoryBackend::new(Arc::new(Config::default()));
        let id = Uuid::new_v4();
        backend.upsert("users", json!({ "id": id, "email": "old@x.y" }), "id").await.unwrap();
        backend.upsert("users", json!({ "id": id, "email": "new@x.y" }), "id").await.unwrap();
        let rows = backend.rows("users");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["email"], "new@x.y");
    }

    #[test]
    fn demo_world_is_populated() {
        let backend = MemoryBackend::demo(Arc::new(Config::default()));
        assert_eq!(backend.rows("users").len(), 3);
        assert_eq!(backend.rows("posts").len(), 4);
        assert!(backend.calls().is_empty());
    }
}
