use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::User;
use crate::auth::role::Role;

/// Request body for account creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub login: String,
    pub email: String,
    pub password: String,
    pub secret_word: String,
}

/// Admin-only creation: same fields plus the role to assign.
#[derive(Debug, Deserialize)]
pub struct CreatePrivilegedRequest {
    #[serde(flatten)]
    pub user: CreateUserRequest,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub id: i64,
    pub find_vision: bool,
    pub add_friend: bool,
}

#[derive(Debug, Deserialize)]
pub struct FindQuery {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct FriendQuery {
    pub friend_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct BanQuery {
    pub banned_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PageFilter {
    pub page_id: i64,
    pub page_size: i64,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page_id: i64,
    pub page_size: i64,
    pub total_records: i64,
    pub total_count: i64,
    pub records: Vec<PublicUser>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub role: Role,
    pub find_vision: bool,
    pub add_friend: bool,
    pub friends: Vec<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            login: u.login,
            email: u.email,
            role: u.role,
            find_vision: u.find_vision,
            add_friend: u.add_friend,
            friends: u.friends,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
