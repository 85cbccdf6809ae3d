use sqlx::FromRow;
use time::OffsetDateTime;

use crate::auth::role::Role;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub password_hash: String,    // argon2, never leaves the service
    pub secret_word_hash: String, // argon2, never leaves the service
    #[sqlx(try_from = "i16")]
    pub role: Role,
    pub find_vision: bool,
    pub add_friend: bool,
    pub friends: Vec<i64>,
    pub created_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

/// Values needed to insert a user; the store fills in the rest.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub secret_word_hash: String,
    pub role: Role,
}

/// `user_id` has blocked `banned_user_id`.
#[derive(Debug, Clone, FromRow)]
pub struct BannedRelation {
    pub id: i64,
    pub user_id: i64,
    pub banned_user_id: i64,
    pub created_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}
