use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::jwt::IssuedToken;

/// Request body for sign-in.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub login: String,
    pub password: String,
}

/// Returned after sign-in or refresh.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expire: OffsetDateTime,
}

impl From<IssuedToken> for TokenResponse {
    fn from(t: IssuedToken) -> Self {
        Self {
            token: t.token,
            expire: t.expire,
        }
    }
}
