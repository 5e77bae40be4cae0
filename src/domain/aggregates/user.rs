//! User and Role records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_ROLE: &str = "Reader";
pub const SEED_ROLES: [&str; 2] = ["Reader", "Writer"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        Self {
            id: Uuid::now_v7(), username: username.into(), email: email.into(), password_hash,
            roles: vec![DEFAULT_ROLE.to_string()], created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role { pub id: Uuid, pub name: String }

impl Role {
    pub fn new(name: impl Into<String>) -> Self { Self { id: Uuid::now_v7(), name: name.into() } }
}
