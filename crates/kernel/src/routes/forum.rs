//! Forum pages.
//!
//! Pages render as JSON documents carrying the notices queued for the
//! visitor; rendering a page drains them from the session.

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use tower_sessions::Session;
use tracing::warn;
use uuid::Uuid;

use crate::cache::tags;
use crate::config_storage::{ConfigProvider, keys};
use crate::error::AppResult;
use crate::gate::ResponseFormatter;
use crate::middleware::CurrentUser;
use crate::models::{ForumUser, Role, UserStatus};
use crate::notice::{Notice, SessionNotices};
use crate::state::AppState;
use crate::users::UserStore;

/// A rendered page.
#[derive(Debug, Serialize)]
pub struct Page {
    pub title: String,
    pub notices: Vec<Notice>,
    pub user: Option<UserSummary>,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// Public view of the current user.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub status: UserStatus,
}

impl From<&ForumUser> for UserSummary {
    fn from(user: &ForumUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            status: user.status,
        }
    }
}

/// Build a page, draining the visitor's notices.
pub async fn render(
    session: Session,
    title: impl Into<String>,
    user: &CurrentUser,
    formatter: &ResponseFormatter,
    body: Option<serde_json::Value>,
) -> Page {
    let notices = match SessionNotices::new(session).take().await {
        Ok(notices) => notices,
        Err(e) => {
            warn!(error = %e, "failed to drain notices");
            Vec::new()
        }
    };

    Page {
        title: title.into(),
        notices,
        user: user.0.as_ref().map(UserSummary::from),
        timezone: formatter.timezone.clone(),
        body,
    }
}

async fn index(
    State(state): State<AppState>,
    session: Session,
    Extension(user): Extension<CurrentUser>,
    Extension(formatter): Extension<ResponseFormatter>,
) -> AppResult<Json<Page>> {
    let name = state
        .gate()
        .config()
        .get(keys::NAME)
        .await?
        .unwrap_or_default();
    let body = serde_json::json!({ "members": member_count(&state).await? });
    Ok(Json(
        render(session, name, &user, &formatter, Some(body)).await,
    ))
}

const MEMBER_COUNT_KEY: &str = "forum:members:count";

/// Member count, cached until an account is activated.
async fn member_count(state: &AppState) -> AppResult<u64> {
    if let Some(count) = state.cache().get(MEMBER_COUNT_KEY).await
        && let Ok(count) = count.parse()
    {
        return Ok(count);
    }

    let count = state.gate().users().count().await?;
    state
        .cache()
        .set(
            MEMBER_COUNT_KEY,
            &count.to_string(),
            0,
            &[tags::MEMBERS_COUNT],
        )
        .await;
    Ok(count)
}

async fn maintenance(
    session: Session,
    Extension(user): Extension<CurrentUser>,
    Extension(formatter): Extension<ResponseFormatter>,
) -> Json<Page> {
    let body = serde_json::json!({
        "message": "The forum is currently undergoing maintenance. Please come back later."
    });
    Json(render(session, "Maintenance", &user, &formatter, Some(body)).await)
}

async fn ban(
    session: Session,
    Extension(user): Extension<CurrentUser>,
    Extension(formatter): Extension<ResponseFormatter>,
) -> Json<Page> {
    let body = serde_json::json!({ "message": "Your account has been banned." });
    Json(render(session, "Banned", &user, &formatter, Some(body)).await)
}

async fn profile(
    session: Session,
    Extension(user): Extension<CurrentUser>,
    Extension(formatter): Extension<ResponseFormatter>,
) -> Json<Page> {
    Json(render(session, "Profile", &user, &formatter, None).await)
}

async fn profile_details(
    session: Session,
    Extension(user): Extension<CurrentUser>,
    Extension(formatter): Extension<ResponseFormatter>,
) -> Json<Page> {
    let body = user.0.as_ref().map(|u| {
        serde_json::json!({
            "email": u.email,
            "timezone": u.timezone,
        })
    });
    Json(render(session, "Account Details", &user, &formatter, body).await)
}

async fn level_up(
    State(state): State<AppState>,
    session: Session,
    Extension(user): Extension<CurrentUser>,
    Extension(formatter): Extension<ResponseFormatter>,
) -> AppResult<Json<Page>> {
    let database = state.gate().config().schema_version().await?;
    let body = serde_json::json!({
        "module_version": state.gate().module_version().to_string(),
        "database_version": database,
    });
    Ok(Json(
        render(session, "Upgrade", &user, &formatter, Some(body)).await,
    ))
}

/// Create the forum page router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/maintenance", get(maintenance))
        .route("/ban", get(ban))
        .route("/profile", get(profile))
        .route("/profile/details", get(profile_details))
        .route("/install/level-up", get(level_up))
}
