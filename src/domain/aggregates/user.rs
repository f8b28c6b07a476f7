//! User Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::value_objects::Role;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn register(username: &str, email: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::now_v7(), username: username.trim().to_string(), email: email.trim().to_lowercase(),
            password_hash, role: Role::Customer, created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}
