#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Builds the real router, gate and middleware over the in-process
//! backends, so no PostgreSQL or Redis is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

use agora_kernel::cache::CacheLayer;
use agora_kernel::config_storage::StaticConfig;
use agora_kernel::models::{ForumUser, NewForumUser, Role, UserStatus};
use agora_kernel::permissions::RoleCapabilities;
use agora_kernel::session::SESSION_HOST_USER_ID;
use agora_kernel::users::MemoryUserStore;
use agora_kernel::{AppState, Gate};

/// Header standing in for the host application's login.
pub const HOST_USER_HEADER: &str = "x-host-user";

/// Module version the test gate runs with.
pub const MODULE_VERSION: &str = "1.5";

/// Router plus handles on its in-process stores.
pub struct TestApp {
    pub router: Router,
    pub config: StaticConfig,
    pub users: MemoryUserStore,
}

/// Response with its body parsed as JSON (null for empty bodies).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
    pub text: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// `name=value` pair of the session cookie, if one was set.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(String::from)
    }

    /// Kinds of the notices rendered on the page.
    pub fn notice_kinds(&self) -> Vec<String> {
        self.body["notices"]
            .as_array()
            .map(|notices| {
                notices
                    .iter()
                    .map(|n| n["kind"].as_str().unwrap().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Writes the host user id from [`HOST_USER_HEADER`] into the session, as
/// the host application would on login.
async fn host_login(session: Session, request: Request<Body>, next: Next) -> Response {
    let host_id = request
        .headers()
        .get(HOST_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());
    if let Some(id) = host_id {
        session.insert(SESSION_HOST_USER_ID, id).await.unwrap();
    }
    next.run(request).await
}

impl TestApp {
    pub fn new(settings: &[(&str, &str)]) -> Self {
        let config: StaticConfig = settings.iter().copied().collect();
        let users = MemoryUserStore::new();
        let cache = CacheLayer::local();

        let gate = Gate::new(
            Arc::new(config.clone()),
            Arc::new(users.clone()),
            Arc::new(RoleCapabilities),
        )
        .with_cache(Arc::new(cache.clone()))
        .with_module_version(MODULE_VERSION);
        let state = AppState::from_parts(gate, Arc::new(config.clone()), cache);

        let router = agora_kernel::app(state)
            .layer(axum::middleware::from_fn(host_login))
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false));

        Self {
            router,
            config,
            users,
        }
    }

    /// Seed a forum user linked to `host_id`.
    pub fn seed(&self, host_id: i64, role: Role, status: UserStatus, email: Option<&str>) -> ForumUser {
        let mut user = NewForumUser::inherited(host_id, "UTC").into_user();
        user.role = role;
        user.status = status;
        user.email = email.map(String::from);
        self.users.insert(user.clone());
        user
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    /// GET `path` as the given host user, optionally reusing a session.
    pub async fn get(&self, path: &str, host_user: Option<i64>, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().uri(path);
        if let Some(id) = host_user {
            builder = builder.header(HOST_USER_HEADER, id.to_string());
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POST a JSON body as the given host user.
    pub async fn post_json(&self, path: &str, host_user: Option<i64>, body: serde_json::Value) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(id) = host_user {
            builder = builder.header(HOST_USER_HEADER, id.to_string());
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }
}
