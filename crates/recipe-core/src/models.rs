use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

/// Input for the user manager's `create_user`.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password: Option<String>,
    pub name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewUser {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Partial update of a user; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.password.is_none()
    }
}

/// Public view of a user. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AuthToken {
    pub key: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A row scoped to a single owning user.
pub trait OwnedResource:
    for<'r> FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin + 'static
{
    const TABLE: &'static str;
    const LABEL: &'static str;

    fn id(&self) -> i64;
    fn name(&self) -> &str;
    fn user_id(&self) -> i64;

    fn item(&self) -> OwnedItem {
        OwnedItem {
            id: self.id(),
            name: self.name().to_string(),
        }
    }
}

/// Wire form of a tag or ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedItem {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
}

impl OwnedResource for Tag {
    const TABLE: &'static str = "tags";
    const LABEL: &'static str = "tag";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn user_id(&self) -> i64 {
        self.user_id
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
}

impl OwnedResource for Ingredient {
    const TABLE: &'static str = "ingredients";
    const LABEL: &'static str = "ingredient";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn user_id(&self) -> i64 {
        self.user_id
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_natural_keys() {
        let tag = Tag {
            id: 1,
            name: "Vegan".into(),
            user_id: 7,
        };
        let ingredient = Ingredient {
            id: 2,
            name: "Cucumber".into(),
            user_id: 7,
        };
        assert_eq!(tag.to_string(), "Vegan");
        assert_eq!(ingredient.to_string(), "Cucumber");
        assert_eq!(tag.item(), OwnedItem { id: 1, name: "Vegan".into() });
    }

    #[test]
    fn profile_serialization_omits_password() {
        let user = User {
            id: 1,
            email: "test@example.com".into(),
            name: "Test name".into(),
            password_hash: "$argon2id$secret".into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: Utc::now(),
        };
        let json = serde_json::to_value(user.profile()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"email": "test@example.com", "name": "Test name"})
        );
        assert_eq!(user.to_string(), "test@example.com");
    }
}
