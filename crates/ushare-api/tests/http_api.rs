//! Router tests over the in-memory store and a temporary blob area.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use ushare_api::{build_router, AppState};
use ushare_core::services::{AuthService, FileService, GroupService};
use ushare_infrastructure::{FsBlobArea, MemoryStore};
use ushare_security::JwtService;
use ushare_shared::config::AppConfig;

const BOUNDARY: &str = "ushare-test-boundary";

struct TestApp {
    _root: TempDir,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let root = TempDir::new().unwrap();
        let config = AppConfig::from_toml_str(&format!(
            r#"
            [jwt]
            secret = "api-test-secret"

            [storage]
            root = "{}"
            "#,
            root.path().join("blobs").display()
        ))
        .unwrap();

        let blobs = Arc::new(FsBlobArea::new(&config.storage.root));
        blobs.ensure_root().await.unwrap();
        let store = Arc::new(MemoryStore::new());
        let jwt = Arc::new(JwtService::new(
            &config.jwt.secret,
            config.jwt.issuer.clone(),
            config.jwt.expiry_hours,
        ));

        let state = AppState {
            auth: Arc::new(AuthService::new(
                store.clone(),
                jwt.clone(),
                config.policy.user_deletion,
            )),
            groups: Arc::new(GroupService::new(store.clone(), blobs.clone())),
            files: Arc::new(FileService::new(store, blobs)),
            jwt,
            config: Arc::new(config),
        };

        Self {
            _root: root,
            router: build_router(state),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn register_and_login(&self, username: &str) -> String {
        let credentials = json!({ "username": username, "password": "password-1!" });
        let (status, _) = self
            .json(Method::POST, "/v1/public/user/registration", None, credentials.clone())
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .json(Method::POST, "/v1/public/user/login", None, credentials)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn upload(&self, token: &str, group: &str, filename: &str, content: &[u8]) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/v1/protected/group/file/upload?group_name={group}"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}

#[tokio::test]
async fn healthcheck_uses_envelope() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/v1/public/healthcheck")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn registration_rules_and_conflicts() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/v1/public/user/registration",
            None,
            json!({ "username": "alice_owner", "password": "password-only" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"]["message"],
        "Password should contain at least one number"
    );

    let (status, _) = app
        .json(
            Method::POST,
            "/v1/public/user/registration",
            None,
            json!({ "username": "1alice", "password": "password-1!" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.register_and_login("alice_owner").await;
    let (status, body) = app
        .json(
            Method::POST,
            "/v1/public/user/registration",
            None,
            json!({ "username": "alice_owner", "password": "password-1!" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn bad_login_is_unauthorized() {
    let app = TestApp::new().await;
    app.register_and_login("alice_owner").await;

    let (status, _) = app
        .json(
            Method::POST,
            "/v1/public/user/login",
            None,
            json!({ "username": "alice_owner", "password": "password-2!" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_check_the_bearer_token() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/v1/protected/groups")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.0, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/v1/protected/groups")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.0, StatusCode::BAD_REQUEST);

    assert_eq!(
        app.get("/v1/protected/groups", "not.a.jwt").await.0,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn group_and_file_flow() {
    let app = TestApp::new().await;
    let alice = app.register_and_login("alice_owner").await;
    let bob = app.register_and_login("bob_member").await;
    let carol = app.register_and_login("carol_member").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/v1/protected/group/creation",
            Some(&alice),
            json!({ "group_name": "team-x-files" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "team-x-files");

    let (status, _) = app
        .json(
            Method::POST,
            "/v1/protected/group/invitation",
            Some(&alice),
            json!({ "group_name": "team-x-files", "username": "bob_member" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.upload(&bob, "team-x-files", "notes.txt", b"hello").await;
    assert_eq!(status, StatusCode::CREATED);
    let file_id = body["data"]["file_id"].as_i64().unwrap();

    // Download returns the raw bytes and the original name.
    let request = Request::builder()
        .uri(format!(
            "/v1/protected/group/file/download?group_name=team-x-files&file_id={file_id}"
        ))
        .header(header::AUTHORIZATION, format!("Bearer {alice}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"notes.txt\"; filename*=UTF-8''notes.txt"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hello");

    let (status, body) = app
        .get("/v1/protected/group/files?group_name=team-x-files", &bob)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["file_name"], "notes.txt");

    let (status, _) = app
        .get(
            &format!("/v1/protected/group/file?group_name=team-x-files&file_id={file_id}"),
            &carol,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .get("/v1/protected/group/users?group_name=team-x-files", &alice)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Only the owner may deactivate.
    let (status, _) = app
        .json(
            Method::DELETE,
            "/v1/protected/group/deletion",
            Some(&bob),
            json!({ "group_name": "team-x-files" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .json(
            Method::DELETE,
            "/v1/protected/group/deletion",
            Some(&alice),
            json!({ "group_name": "team-x-files" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(
            Method::POST,
            "/v1/protected/group/invitation",
            Some(&alice),
            json!({ "group_name": "team-x-files", "username": "carol_member" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get("/v1/protected/groups", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = app.get("/v1/protected/users", &carol).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn membership_revocation_and_file_deletion() {
    let app = TestApp::new().await;
    let alice = app.register_and_login("alice_owner").await;
    let bob = app.register_and_login("bob_member").await;

    app.json(
        Method::POST,
        "/v1/protected/group/creation",
        Some(&alice),
        json!({ "group_name": "team-x-files" }),
    )
    .await;
    app.json(
        Method::POST,
        "/v1/protected/group/invitation",
        Some(&alice),
        json!({ "group_name": "team-x-files", "username": "bob_member" }),
    )
    .await;

    let (_, body) = app.upload(&bob, "team-x-files", "notes.txt", b"hello").await;
    let file_id = body["data"]["file_id"].as_i64().unwrap();

    let (status, _) = app
        .json(
            Method::DELETE,
            "/v1/protected/group/file/deletion",
            Some(&alice),
            json!({ "group_name": "team-x-files", "file_id": file_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(
            Method::DELETE,
            "/v1/protected/group/membership/revocation",
            Some(&alice),
            json!({ "group_name": "team-x-files", "username": "alice_owner" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .json(
            Method::DELETE,
            "/v1/protected/group/membership/revocation",
            Some(&bob),
            json!({ "group_name": "team-x-files", "username": "bob_member" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.upload(&bob, "team-x-files", "late.txt", b"late").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_own_account() {
    let app = TestApp::new().await;
    let alice = app.register_and_login("alice_owner").await;

    let (status, _) = app
        .json(Method::DELETE, "/v1/protected/group/user/deletion", Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(Method::DELETE, "/v1/protected/group/user/deletion", Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
