//! User data models and API request/response types.
//!
//! This module defines:
//! - `Role`: the three access levels
//! - `User`: database entity
//! - Request bodies for sign-up, token exchange and user management
//! - `UserResponse`: the public representation

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access level of a user.
///
/// Stored as lowercase text in the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("\"{other}\" is not a valid role.")),
        }
    }
}

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. The confirmation code itself is never stored,
/// only its SHA-256 hash and the moment it was issued.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,

    /// One of `user`, `moderator`, `admin` (CHECK constraint)
    pub role: String,

    /// Superusers have admin rights whatever their role says
    pub is_superuser: bool,

    pub confirmation_code_hash: Option<String>,
    pub confirmation_code_issued_at: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Parsed role; the CHECK constraint keeps unknown values out of the table.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::User)
    }
}

/// Column list matching [`User`], for `SELECT` and `RETURNING` clauses.
pub const USER_COLUMNS: &str = "id, username, email, first_name, last_name, bio, role, \
     is_superuser, confirmation_code_hash, confirmation_code_issued_at, date_joined";

/// Request body for `POST /api/v1/auth/signup`.
///
/// Fields are optional at the serde level so missing ones are reported as
/// validation errors rather than deserialization failures.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: Option<String>,
    pub username: Option<String>,
}

/// Response body for a successful sign-up.
#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub email: String,
    pub username: String,
}

/// Request body for `POST /api/v1/auth/token`.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: Option<String>,
    pub confirmation_code: Option<String>,
}

/// Response body carrying a freshly issued access token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Request body for `POST /api/v1/users` (admin only).
///
/// # JSON Example
///
/// ```json
/// {
///   "username": "critic",
///   "email": "critic@example.com",
///   "first_name": "Ann",
///   "role": "moderator"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
    pub role: Option<String>,
}

/// Partial update body for `PATCH /api/v1/users/{username}` and `/users/me`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
}

/// Query parameters for `GET /api/v1/users`.
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    #[serde(default, deserialize_with = "crate::pagination::deserialize_page")]
    pub page: Option<i64>,
}

/// Public representation of a user.
///
/// # JSON Example
///
/// ```json
/// {
///   "username": "critic",
///   "email": "critic@example.com",
///   "first_name": "Ann",
///   "last_name": "",
///   "bio": "",
///   "role": "moderator"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let role = user.role();
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role,
        }
    }
}
