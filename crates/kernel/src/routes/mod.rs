//! HTTP route handlers.

pub mod admin;
pub mod forum;
pub mod health;

use serde::Serialize;

/// Pages the gate and notices refer to by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Index,
    Maintenance,
    Settings,
    Profile,
    ProfileDetails,
    Ban,
    LevelUp,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Index => "/",
            Route::Maintenance => "/maintenance",
            Route::Settings => "/admin/settings",
            Route::Profile => "/profile",
            Route::ProfileDetails => "/profile/details",
            Route::Ban => "/ban",
            Route::LevelUp => "/install/level-up",
        }
    }

    /// Action id of the page: the last segment of its path.
    pub fn action_id(self) -> &'static str {
        match self {
            Route::Index => "index",
            Route::Maintenance => "maintenance",
            Route::Settings => "settings",
            Route::Profile => "profile",
            Route::ProfileDetails => "details",
            Route::Ban => "ban",
            Route::LevelUp => "level-up",
        }
    }
}

impl Route {
    const ALL: [Route; 7] = [
        Route::Index,
        Route::Maintenance,
        Route::Settings,
        Route::Profile,
        Route::ProfileDetails,
        Route::Ban,
        Route::LevelUp,
    ];

    /// The named route serving `path`, ignoring trailing slashes.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|route| route.path() == path)
    }
}

/// Action id for a request path.
///
/// Named routes map to their action id. Any other path is its own action
/// id, so it never matches a named page's.
pub fn action_id_for(path: &str) -> &str {
    Route::from_path(path).map_or(path, |route| route.action_id())
}
