use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::Record;

/// Access tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Editor => "EDITOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}` (expected user, editor or admin)")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "EDITOR" => Ok(Role::Editor),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never the secret itself
    pub role: Role,
    pub email_verified: Option<OffsetDateTime>, // None = unverified
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Creation field set.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub email_verified: Option<OffsetDateTime>,
}

/// Update field set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub role: Option<Role>,
    /// Stamp `email_verified` unless it is already set.
    pub mark_verified: bool,
}

impl Record for User {
    type Key = String;
    type Draft = NewUser;
    type Patch = UserPatch;

    const KIND: &'static str = "user";

    fn key(&self) -> &String {
        &self.email
    }

    fn from_draft(draft: NewUser, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: draft.email,
            name: draft.name,
            password_hash: draft.password_hash,
            role: draft.role,
            email_verified: draft.email_verified,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: &UserPatch, now: OffsetDateTime) {
        if let Some(name) = &patch.name {
            self.name = Some(name.clone());
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if patch.mark_verified && self.email_verified.is_none() {
            self.email_verified = Some(now);
        }
        self.updated_at = now;
    }
}

/// Public part of the user returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub verified: bool,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            verified: u.email_verified.is_some(),
        }
    }
}
