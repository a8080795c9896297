use serde_json::json;
use socialspace::backend::{AuthChange, Backend, HttpBackend, SelectQuery};
use socialspace::config::Config;
use socialspace::error::AppError;
use socialspace::model::{AuthUser, Session, UserMetadata};
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "anon-key";

fn config(server: &MockServer, dir: &TempDir) -> Config {
    Config {
        backend_url: format!("{}/", server.uri()),
        anon_key: KEY.to_string(),
        session_file: Some(dir.path().join("session.json")),
        ..Config::default()
    }
}

fn token_body(user_id: Uuid) -> serde_json::Value {
    token_body_with("user-token", 3600, user_id)
}

fn token_body_with(access_token: &str, expires_in: i64, user_id: Uuid) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "refresh_token": "refresh",
        "expires_in": expires_in,
        "user": { "id": user_id, "email": "ana@example.com", "user_metadata": { "first_name": "Ana" } }
    })
}

#[tokio::test]
async fn sign_in_stores_session_and_authorizes_later_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let user_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", KEY))
        .and(body_json(json!({ "email": "ana@example.com", "password": "secret1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(user_id)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    let mut changes = backend.subscribe_auth_changes();

    let session = backend.sign_in_with_password("ana@example.com", "secret1").await.unwrap();
    assert_eq!(session.user.id, user_id);
    assert_eq!(session.user.user_metadata.first_name.as_deref(), Some("Ana"));
    assert!(matches!(changes.try_recv(), Ok(AuthChange::SignedIn(_))));

    assert_eq!(backend.get_session().await.unwrap().map(|s| s.access_token), Some("user-token".to_string()));
    backend.select(&SelectQuery::table("posts")).await.unwrap();

    // A fresh client picks the persisted session up.
    let restored = HttpBackend::new(&config(&server, &dir)).unwrap();
    assert_eq!(restored.get_session().await.unwrap().map(|s| s.user.id), Some(user_id));
}

#[tokio::test]
async fn auth_errors_carry_the_backend_message() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
        )
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    let err = backend.sign_in_with_password("ana@example.com", "wrong").await.unwrap_err();
    match err {
        AppError::Backend { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.get_session().await.unwrap(), None);
}

#[tokio::test]
async fn sign_up_awaiting_confirmation_has_no_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_json(json!({
            "email": "new@example.com",
            "password": "secret1",
            "data": { "first_name": "New", "last_name": null, "avatar_url": null }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": Uuid::new_v4(), "email": "new@example.com" })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    let metadata = UserMetadata { first_name: Some("New".into()), last_name: None, avatar_url: None };
    assert_eq!(backend.sign_up("new@example.com", "secret1", metadata).await.unwrap(), None);
}

#[tokio::test]
async fn select_renders_query_parameters() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let user_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(header("apikey", KEY))
        .and(header("authorization", format!("Bearer {}", KEY).as_str()))
        .and(query_param("select", "*,user:users(id,email)"))
        .and(query_param("user_id", format!("eq.{}", user_id).as_str()))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }, { "id": 2 }])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    let query = SelectQuery::table("posts")
        .select("*, user:users(id, email)")
        .eq("user_id", user_id)
        .order("created_at", false)
        .limit(10);
    assert_eq!(backend.select(&query).await.unwrap().len(), 2);
}

#[tokio::test]
async fn single_select_without_a_row_is_not_found() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(header("accept", "application/vnd.pgrst.object+json"))
        .respond_with(ResponseTemplate::new(406).set_body_json(json!({ "message": "JSON object requested, multiple (or no) rows returned" })))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    let err = backend.select(&SelectQuery::table("users").eq("id", Uuid::new_v4()).single()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn count_reads_content_range() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/follows"))
        .and(header("prefer", "count=exact"))
        .and(query_param("following_id", "eq.abc"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-range", "*/7"))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    assert_eq!(backend.count(&SelectQuery::table("follows").eq("following_id", "abc")).await.unwrap(), 7);
}

#[tokio::test]
async fn insert_and_upsert_set_preferences() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/rest/v1/likes"))
        .and(header("prefer", "return=representation"))
        .and(query_param("select", "post_id,user_id"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "post_id": "p", "user_id": "u" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(query_param("on_conflict", "id"))
        .and(header("prefer", "resolution=merge-duplicates,return=minimal"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    let row = backend
        .insert("likes", json!({ "post_id": "p", "user_id": "u" }), "post_id, user_id")
        .await
        .unwrap();
    assert_eq!(row["post_id"], "p");
    backend.upsert("users", json!({ "id": "u" }), "id").await.unwrap();
}

#[tokio::test]
async fn conflicting_insert_surfaces_status() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/rest/v1/follows"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "message": "duplicate key value violates unique constraint" })))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    let err = backend.insert("follows", json!({}), "*").await.unwrap_err();
    assert!(matches!(err, AppError::Backend { status: 409, .. }));
}

#[tokio::test]
async fn upload_goes_to_the_bucket_path() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/posts/uploads/1-abc.png"))
        .and(header("content-type", "image/png"))
        .and(header("x-upsert", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "posts/uploads/1-abc.png" })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    backend.upload("posts", "uploads/1-abc.png", vec![1, 2, 3], "image/png").await.unwrap();
    assert_eq!(
        backend.public_url("posts", "uploads/1-abc.png"),
        format!("{}/storage/v1/object/public/posts/uploads/1-abc.png", server.uri())
    );
}

#[tokio::test]
async fn sign_out_without_session_skips_the_network() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("POST")).and(path("/auth/v1/logout")).respond_with(ResponseTemplate::new(204)).expect(0).mount(&server).await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    let mut changes = backend.subscribe_auth_changes();
    backend.sign_out().await.unwrap();
    assert!(matches!(changes.try_recv(), Ok(AuthChange::SignedOut)));
}

/// A saved session whose access token expired long ago.
fn save_expired_session(dir: &TempDir, user_id: Uuid) {
    let session = Session {
        access_token: "stale".into(),
        refresh_token: Some("refresh".into()),
        expires_at: Some(1),
        user: AuthUser { id: user_id, email: Some("ana@example.com".into()), user_metadata: UserMetadata::default() },
    };
    std::fs::write(dir.path().join("session.json"), serde_json::to_string(&session).unwrap()).unwrap();
}

async fn mount_refresh(server: &MockServer, response: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "refresh" })))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn expired_saved_session_is_refreshed_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let user_id = Uuid::new_v4();
    save_expired_session(&dir, user_id);
    mount_refresh(&server, ResponseTemplate::new(200).set_body_json(token_body_with("fresh", 3600, user_id)), 1).await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    let mut changes = backend.subscribe_auth_changes();

    let session = backend.get_session().await.unwrap().unwrap();
    assert_eq!(session.access_token, "fresh");
    match changes.try_recv() {
        Ok(AuthChange::TokenRefreshed(s)) => assert_eq!(s.access_token, "fresh"),
        other => panic!("unexpected change: {other:?}"),
    }

    // Still valid: no second refresh.
    assert_eq!(backend.get_session().await.unwrap().map(|s| s.access_token), Some("fresh".to_string()));
    let restored = HttpBackend::new(&config(&server, &dir)).unwrap();
    assert_eq!(restored.get_session().await.unwrap().map(|s| s.access_token), Some("fresh".to_string()));
}

#[tokio::test]
async fn failed_refresh_clears_session_and_signs_out() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    save_expired_session(&dir, Uuid::new_v4());
    mount_refresh(
        &server,
        ResponseTemplate::new(400).set_body_json(json!({ "error_description": "Invalid Refresh Token" })),
        1,
    )
    .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    let mut changes = backend.subscribe_auth_changes();

    let err = backend.get_session().await.unwrap_err();
    assert!(matches!(err, AppError::Backend { status: 400, .. }));
    assert!(matches!(changes.try_recv(), Ok(AuthChange::SignedOut)));
    assert_eq!(backend.get_session().await.unwrap(), None);
    assert!(!dir.path().join("session.json").exists());
}

#[tokio::test]
async fn requests_after_expiry_carry_the_refreshed_token() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let user_id = Uuid::new_v4();

    // Signed in with a token that is already inside the refresh margin.
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body_with("old", 1, user_id)))
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200).set_body_json(token_body_with("new", 3600, user_id)), 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "JWT expired" })))
        .expect(0)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    backend.sign_in_with_password("ana@example.com", "secret1").await.unwrap();

    // Concurrent requests share one refresh.
    let query = SelectQuery::table("posts");
    let (a, b) = tokio::join!(backend.select(&query), backend.select(&query));
    a.unwrap();
    b.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn sign_out_revokes_the_stored_token_without_refreshing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    save_expired_session(&dir, Uuid::new_v4());
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config(&server, &dir)).unwrap();
    backend.sign_out().await.unwrap();
    assert_eq!(backend.get_session().await.unwrap(), None);
}
