use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use socialspace::backend::{AuthChange, Backend, HttpBackend, MemoryBackend};
use socialspace::config::{Config, LazyBackend};
use socialspace::model::{AuthUser, Session, UserMetadata};
use socialspace::services::{AuthBroadcaster, AuthSnapshot};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    config: Arc<Config>,
    memory: Arc<MemoryBackend>,
    auth: Arc<AuthBroadcaster>,
    seen: Arc<Mutex<Vec<AuthSnapshot>>>,
}

fn harness() -> Harness {
    let config = Arc::new(Config::default());
    let memory = Arc::new(MemoryBackend::new(config.clone()));
    let backend: Arc<dyn Backend> = memory.clone();
    let lazy = Arc::new(LazyBackend::with_backend(config.clone(), backend));
    let auth = Arc::new(AuthBroadcaster::new(lazy, config.clone()));
    Harness { config, memory, auth, seen: Arc::new(Mutex::new(Vec::new())) }
}

impl Harness {
    fn record(&self) -> socialspace::services::Subscription {
        let seen = self.seen.clone();
        self.auth.subscribe(move |s| seen.lock().unwrap().push(s.clone()))
    }

    fn seen(&self) -> Vec<AuthSnapshot> {
        self.seen.lock().unwrap().clone()
    }
}

/// Polls until `check` holds; the listener applies changes on its own task.
async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

fn meta(first: &str) -> UserMetadata {
    UserMetadata { first_name: Some(first.into()), last_name: None, avatar_url: None }
}

#[tokio::test]
async fn subscriber_is_called_immediately_with_current_state() {
    let h = harness();
    let _sub = h.record();
    assert_eq!(h.seen(), vec![AuthSnapshot { user: None, loading: true }]);
}

#[tokio::test]
async fn initialize_without_session_ends_signed_out() {
    let h = harness();
    let _sub = h.record();
    h.auth.initialize().await;

    let last = h.seen().last().cloned().unwrap();
    assert_eq!(last, AuthSnapshot { user: None, loading: false });
    assert!(!h.auth.is_authenticated());
    assert_eq!(h.memory.call_count("upsert:users"), 0);
}

#[tokio::test]
async fn initialize_with_session_upserts_user_with_fallback_avatar() {
    let h = harness();
    let user = h.memory.add_account("ana@example.com", "secret1", meta("Ana"));
    h.memory.set_session(Some(MemoryBackend::session_for(&user)));

    let _sub = h.record();
    h.auth.initialize().await;

    assert_eq!(h.auth.current_user().map(|u| u.id), Some(user.id));
    assert!(!h.auth.is_loading());
    assert_eq!(h.memory.call_count("upsert:users"), 1);
    let rows = h.memory.rows("users");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["first_name"], "Ana");
    assert_eq!(rows[0]["profile_image_url"], h.config.fallback_avatar(user.id).as_str());

    let seen = h.seen();
    assert!(seen.first().unwrap().loading);
    assert_eq!(seen.last().unwrap().user.as_ref().map(|u| u.id), Some(user.id));
}

#[tokio::test]
async fn sign_in_and_out_are_broadcast() {
    let h = harness();
    let user = h.memory.add_account("ana@example.com", "secret1", meta("Ana"));
    let _sub = h.record();
    h.auth.initialize().await;

    h.auth.sign_in("ana@example.com", "secret1").await.unwrap();
    eventually(|| h.auth.is_authenticated()).await;
    eventually(|| h.memory.call_count("upsert:users") == 1).await;
    assert_eq!(h.seen().last().unwrap().user.as_ref().map(|u| u.id), Some(user.id));

    h.auth.sign_out().await.unwrap();
    assert!(!h.auth.is_authenticated());
    assert_eq!(h.seen().last().unwrap().user, None);
}

#[tokio::test]
async fn failed_sign_in_returns_message_and_stays_signed_out() {
    let h = harness();
    h.memory.add_account("ana@example.com", "secret1", meta("Ana"));
    h.auth.initialize().await;

    let failure = h.auth.sign_in("ana@example.com", "nope").await.unwrap_err();
    assert_eq!(failure.message, "Invalid login credentials");
    assert!(!h.auth.is_authenticated());
}

#[tokio::test]
async fn duplicate_sign_up_fails_with_message() {
    let h = harness();
    h.memory.add_account("ana@example.com", "secret1", meta("Ana"));
    let failure = h.auth.sign_up("ana@example.com", "secret1", meta("Ana")).await.unwrap_err();
    assert_eq!(failure.message, "User already registered");
}

#[tokio::test]
async fn unsubscribed_callbacks_are_not_called() {
    let h = harness();
    let sub = h.record();
    let kept = Arc::new(Mutex::new(0usize));
    let counter = kept.clone();
    let _other = h.auth.subscribe(move |_| *counter.lock().unwrap() += 1);

    sub.unsubscribe();
    h.auth.initialize().await;

    assert_eq!(h.seen().len(), 1);
    // immediate call + loading + loaded
    assert_eq!(*kept.lock().unwrap(), 3);
}

#[tokio::test]
async fn external_session_changes_reach_subscribers() {
    let h = harness();
    let user = h.memory.add_account("kai@example.com", "secret1", meta("Kai"));
    let _sub = h.record();
    h.auth.initialize().await;

    h.memory.push_auth_change(AuthChange::SignedIn(MemoryBackend::session_for(&user)));
    eventually(|| h.auth.current_user().map(|u| u.id) == Some(user.id)).await;

    h.memory.push_auth_change(AuthChange::SignedOut);
    eventually(|| !h.auth.is_authenticated()).await;
}

#[tokio::test]
async fn upsert_failure_does_not_block_sign_in() {
    let h = harness();
    let user = h.memory.add_account("ana@example.com", "secret1", meta("Ana"));
    h.memory.set_session(Some(MemoryBackend::session_for(&user)));
    h.memory.fail_next("upsert:users", "permission denied");

    h.auth.initialize().await;
    assert_eq!(h.auth.current_user().map(|u| u.id), Some(user.id));
    assert!(h.memory.rows("users").is_empty());
}

#[tokio::test]
async fn session_lookup_failure_leaves_client_signed_out() {
    let h = harness();
    h.memory.fail_next("auth:get_session", "boom");
    h.auth.initialize().await;
    assert_eq!(h.auth.snapshot(), AuthSnapshot { user: None, loading: false });
}

#[tokio::test]
async fn unconfigured_backend_is_swallowed() {
    // Empty URL and key: the lazy handle refuses to build.
    let config = Arc::new(Config { backend_url: String::new(), anon_key: String::new(), ..Config::default() });
    let auth = Arc::new(AuthBroadcaster::new(Arc::new(LazyBackend::new(config.clone())), config));
    auth.initialize().await;
    assert_eq!(auth.snapshot(), AuthSnapshot { user: None, loading: false });
    assert!(auth.sign_in("a@b.co", "secret1").await.is_err());
    assert_eq!(auth.token().await, None);
}

#[tokio::test]
async fn startup_refresh_of_saved_session_upserts_once() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let user = AuthUser { id: Uuid::new_v4(), email: Some("ana@example.com".into()), user_metadata: meta("Ana") };
    let saved = Session { access_token: "stale".into(), refresh_token: Some("refresh".into()), expires_at: Some(1), user: user.clone() };
    std::fs::write(dir.path().join("session.json"), serde_json::to_string(&saved).unwrap()).unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "refresh_token": "next",
            "expires_in": 3600,
            "user": user,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let config = Arc::new(Config {
        backend_url: server.uri(),
        anon_key: "anon-key".into(),
        session_file: Some(dir.path().join("session.json")),
        ..Config::default()
    });
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config).unwrap());
    let auth = Arc::new(AuthBroadcaster::new(Arc::new(LazyBackend::with_backend(config.clone(), backend)), config));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = auth.subscribe(move |s| sink.lock().unwrap().push(s.clone()));

    auth.initialize().await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(auth.current_user().map(|u| u.id), Some(user.id));
    // immediate call + loading + loaded, nothing mirrored from the startup refresh
    assert_eq!(seen.lock().unwrap().len(), 3);
    server.verify().await;
}
