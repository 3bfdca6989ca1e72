//! Forum user model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Registered,
    Banned,
    Active,
}

impl UserStatus {
    pub fn as_i16(self) -> i16 {
        match self {
            UserStatus::Registered => 1,
            UserStatus::Banned => 9,
            UserStatus::Active => 10,
        }
    }
}

impl TryFrom<i16> for UserStatus {
    type Error = UnknownValue;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(UserStatus::Registered),
            9 => Ok(UserStatus::Banned),
            10 => Ok(UserStatus::Active),
            other => Err(UnknownValue("status", other)),
        }
    }
}

/// Forum role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_i16(self) -> i16 {
        match self {
            Role::Member => 1,
            Role::Moderator => 9,
            Role::Admin => 10,
        }
    }
}

impl TryFrom<i16> for Role {
    type Error = UnknownValue;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Role::Member),
            9 => Ok(Role::Moderator),
            10 => Ok(Role::Admin),
            other => Err(UnknownValue("role", other)),
        }
    }
}

/// A stored status or role code with no matching variant.
#[derive(Debug, Error)]
#[error("unknown {0} value {1}")]
pub struct UnknownValue(&'static str, i16);

/// Forum user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ForumUser {
    pub id: Uuid,
    /// Host-application user this account was derived from.
    pub inherited_id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    #[sqlx(try_from = "i16")]
    pub status: UserStatus,
    #[sqlx(try_from = "i16")]
    pub role: Role,
    pub timezone: Option<String>,
    pub created: DateTime<Utc>,
}

impl ForumUser {
    pub fn is_banned(&self) -> bool {
        self.status == UserStatus::Banned
    }

    /// True when no e-mail address is stored.
    pub fn lacks_email(&self) -> bool {
        self.email.as_deref().is_none_or(str::is_empty)
    }

    /// The user's timezone, if one is set.
    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref().filter(|tz| !tz.is_empty())
    }
}

/// Input for creating a forum user.
///
/// Username and e-mail are optional: accounts derived from the host
/// application are completed by their owner later.
#[derive(Debug, Clone)]
pub struct NewForumUser {
    pub inherited_id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub status: UserStatus,
    pub role: Role,
    pub timezone: String,
}

/// Why a [`NewForumUser`] was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("timezone is required")]
    MissingTimezone,
    #[error("{0} is required")]
    MissingField(&'static str),
}

impl NewForumUser {
    /// A baseline member account linked to a host-application user.
    pub fn inherited(host_id: i64, timezone: impl Into<String>) -> Self {
        Self {
            inherited_id: Some(host_id),
            username: None,
            email: None,
            status: UserStatus::Active,
            role: Role::Member,
            timezone: timezone.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timezone.trim().is_empty() {
            return Err(ValidationError::MissingTimezone);
        }
        if self.inherited_id.is_none() {
            return Err(ValidationError::MissingField("inherited_id"));
        }
        Ok(())
    }

    /// Materialise the record with a fresh id.
    pub fn into_user(self) -> ForumUser {
        ForumUser {
            id: Uuid::now_v7(),
            inherited_id: self.inherited_id,
            username: self.username,
            email: self.email,
            status: self.status,
            role: self.role,
            timezone: Some(self.timezone),
            created: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn inherited_user_is_active_member() {
        let new = NewForumUser::inherited(42, "UTC");
        assert_eq!(new.validate(), Ok(()));

        let user = new.into_user();
        assert_eq!(user.inherited_id, Some(42));
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.role, Role::Member);
        assert_eq!(user.timezone(), Some("UTC"));
        assert!(user.lacks_email());
    }

    #[test]
    fn inherited_user_requires_timezone() {
        let new = NewForumUser::inherited(42, " ");
        assert_eq!(new.validate(), Err(ValidationError::MissingTimezone));
    }

    #[test]
    fn inherited_user_requires_host_id() {
        let mut new = NewForumUser::inherited(7, "UTC");
        new.inherited_id = None;
        assert_eq!(
            new.validate(),
            Err(ValidationError::MissingField("inherited_id"))
        );
    }

    #[test]
    fn status_and_role_codes_round_trip() {
        for status in [UserStatus::Registered, UserStatus::Banned, UserStatus::Active] {
            assert_eq!(UserStatus::try_from(status.as_i16()).unwrap(), status);
        }
        assert_eq!(Role::try_from(10).unwrap(), Role::Admin);
        assert!(Role::try_from(3).is_err());
    }

    #[test]
    fn empty_email_counts_as_missing() {
        let mut user = NewForumUser::inherited(1, "UTC").into_user();
        user.email = Some(String::new());
        assert!(user.lacks_email());
        user.email = Some("ada@example.org".into());
        assert!(!user.lacks_email());
    }
}
