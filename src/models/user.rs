//! User and authority models
//!
//! Users are read-only here: they are seeded by migrations and referenced
//! by blogs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub activated: bool,
    pub lang_key: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Names of the authorities granted to this user, sorted
    pub authorities: Vec<String>,
}

impl User {
    /// Check whether the user holds the given authority
    pub fn has_authority(&self, name: &str) -> bool {
        self.authorities.iter().any(|a| a == name)
    }
}

/// A role such as `ROLE_ADMIN`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Authority {
    pub name: String,
}
