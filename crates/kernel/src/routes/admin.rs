//! Admin settings.
//!
//! Administrators read the forum settings and switch maintenance mode.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use super::forum::{Page, render};
use crate::config_storage::{ConfigStore, keys};
use crate::error::{AppError, AppResult};
use crate::gate::ResponseFormatter;
use crate::middleware::CurrentUser;
use crate::permissions::{Capabilities, Capability};
use crate::state::AppState;

/// Settings update. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateSettings {
    pub maintenance_mode: Option<bool>,
    pub name: Option<String>,
}

async fn require_admin(state: &AppState, user: &CurrentUser) -> AppResult<()> {
    if state
        .gate()
        .capabilities()
        .has(user.0.as_ref(), Capability::Administrator)
        .await?
    {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

async fn settings_body(state: &AppState) -> AppResult<serde_json::Value> {
    let stored: BTreeMap<String, String> = state.settings().all().await?.into_iter().collect();
    Ok(serde_json::json!({ "settings": stored }))
}

async fn show_settings(
    State(state): State<AppState>,
    session: Session,
    Extension(user): Extension<CurrentUser>,
    Extension(formatter): Extension<ResponseFormatter>,
) -> AppResult<Json<Page>> {
    require_admin(&state, &user).await?;
    let body = settings_body(&state).await?;
    Ok(Json(
        render(session, "Settings", &user, &formatter, Some(body)).await,
    ))
}

async fn update_settings(
    State(state): State<AppState>,
    session: Session,
    Extension(user): Extension<CurrentUser>,
    Extension(formatter): Extension<ResponseFormatter>,
    Json(update): Json<UpdateSettings>,
) -> AppResult<Json<Page>> {
    require_admin(&state, &user).await?;

    if let Some(on) = update.maintenance_mode {
        state
            .settings()
            .set(keys::MAINTENANCE_MODE, if on { "1" } else { "0" })
            .await?;
        info!(maintenance_mode = on, "maintenance mode changed");
    }
    if let Some(name) = update.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("forum name cannot be empty".into()));
        }
        state.settings().set(keys::NAME, name).await?;
    }

    let body = settings_body(&state).await?;
    Ok(Json(
        render(session, "Settings", &user, &formatter, Some(body)).await,
    ))
}

/// Create the admin router.
pub fn router() -> Router<AppState> {
    Router::new().route("/admin/settings", get(show_settings).post(update_settings))
}
