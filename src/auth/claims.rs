use serde::{Deserialize, Serialize};

use super::role::Role;

/// JWT payload used for authentication.
///
/// Every field is required; a token missing any of them, or carrying an
/// unknown role, fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,      // user ID
    pub role: Role,    // privilege tier at issue time
    pub iat: i64,      // issued at (unix timestamp)
    pub orig_iat: i64, // first issue of this session, refresh horizon anchor
    pub exp: i64,      // expires at (unix timestamp)
    pub iss: String,   // issuer
    pub aud: String,   // audience
}

/// The authenticated caller, as trusted from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
}

impl From<&Claims> for Caller {
    fn from(c: &Claims) -> Self {
        Self {
            id: c.sub,
            role: c.role,
        }
    }
}
