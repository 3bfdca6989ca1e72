//! Request gate middleware.
//!
//! Runs the [`Gate`](crate::gate::Gate) in front of every forum page and
//! turns its verdict into a redirect, a server error, or a pass-through.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::debug;

use crate::error::AppError;
use crate::gate::{GateRequest, Verdict};
use crate::models::ForumUser;
use crate::notice::SessionNotices;
use crate::routes::action_id_for;
use crate::session::session_identity;
use crate::state::AppState;

/// The forum user resolved by the gate, `None` for guests.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<ForumUser>);

/// Paths served without running the gate.
fn is_exempt(path: &str) -> bool {
    path == "/health" || path.starts_with("/static/")
}

/// Middleware running the request gate.
///
/// On pass-through, [`CurrentUser`] and the
/// [`ResponseFormatter`](crate::gate::ResponseFormatter) are added to the
/// request extensions.
pub async fn forum_gate(
    State(state): State<AppState>,
    session: Session,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_exempt(&path) {
        return next.run(request).await;
    }

    let gate = state.gate();
    let identity = session_identity(&session, gate.user_source()).await;
    let notices = SessionNotices::new(session);

    let outcome = match gate
        .run(GateRequest {
            identity,
            action_id: action_id_for(&path),
            notices: &notices,
        })
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return AppError::from(e).into_response(),
    };

    if let Verdict::Redirect(route) = outcome.verdict {
        debug!(path = %path, target = route.path(), "request redirected by gate");
        return Redirect::to(route.path()).into_response();
    }

    request.extensions_mut().insert(CurrentUser(outcome.user));
    request.extensions_mut().insert(outcome.formatter);

    next.run(request).await
}
