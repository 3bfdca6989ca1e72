//! HTTP middleware components.

pub mod gate;

pub use gate::{CurrentUser, forum_gate};
