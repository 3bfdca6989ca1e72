//! Database models.

pub mod site_config;
pub mod user;

pub use site_config::SiteConfig;
pub use user::{ForumUser, NewForumUser, Role, UserStatus, ValidationError};
