//! Session management using Redis.
//!
//! The host application signs visitors in by writing its own user id under
//! [`SESSION_HOST_USER_ID`] into the shared session store. When the forum
//! owns its identities, the forum user id is stored under
//! [`SESSION_USER_ID`] instead.

use anyhow::{Context, Result};
use fred::prelude::*;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_redis_store::RedisStore;
use tracing::warn;
use uuid::Uuid;

use crate::users::{Identity, UserSource};

/// Default session expiry (24 hours).
pub const DEFAULT_SESSION_EXPIRY_HOURS: i64 = 24;

/// Session key for the host-application user id.
pub const SESSION_HOST_USER_ID: &str = "host_user_id";

/// Session key for the forum user id.
pub const SESSION_USER_ID: &str = "user_id";

/// Create the session layer using Redis as the backend.
pub async fn create_session_layer(
    redis_url: &str,
    same_site: SameSite,
) -> Result<SessionManagerLayer<RedisStore<Pool>>> {
    let config = Config::from_url(redis_url).context("failed to parse Redis URL")?;

    let pool = Builder::from_config(config)
        .build_pool(1)
        .context("failed to create Redis pool")?;

    pool.init()
        .await
        .context("failed to connect to Redis for sessions")?;

    let store = RedisStore::new(pool);

    let session_layer = SessionManagerLayer::new(store)
        .with_secure(true)
        .with_http_only(true)
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            DEFAULT_SESSION_EXPIRY_HOURS,
        )));

    Ok(session_layer)
}

/// Read the visitor's identity from the session.
///
/// Unreadable sessions are treated as guests.
pub async fn session_identity(session: &Session, source: UserSource) -> Identity {
    let identity = match source {
        UserSource::Inherit => session
            .get::<i64>(SESSION_HOST_USER_ID)
            .await
            .map(|id| id.map(Identity::Host)),
        UserSource::Own => session
            .get::<Uuid>(SESSION_USER_ID)
            .await
            .map(|id| id.map(Identity::Member)),
    };

    match identity {
        Ok(identity) => identity.unwrap_or(Identity::Guest),
        Err(e) => {
            warn!(error = %e, "failed to read identity from session");
            Identity::Guest
        }
    }
}
