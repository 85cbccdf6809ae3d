use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query},
    http::{header, request::Parts},
};
use serde::Deserialize;
use tracing::warn;

use super::{
    claims::Caller,
    jwt::{JwtKeys, TokenError},
};
use crate::error::AppError;

const TOKEN_COOKIE: &str = "jwt";

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Raw session token pulled from the request, not yet verified.
///
/// Looked up in the `Authorization: Bearer` header, then the `token` query
/// parameter, then the `jwt` cookie.
pub struct SessionToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        {
            let token = auth
                .strip_prefix("Bearer ")
                .or_else(|| auth.strip_prefix("bearer "))
                .ok_or_else(|| AppError::Authentication("invalid auth scheme".into()))?;
            return Ok(SessionToken(token.trim().to_string()));
        }

        if let Some(token) = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token)
            .filter(|t| !t.is_empty())
        {
            return Ok(SessionToken(token));
        }

        if let Some(token) = cookie_value(parts, TOKEN_COOKIE) {
            return Ok(SessionToken(token));
        }

        Err(AppError::Authentication("missing session token".into()))
    }
}

fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v.to_string())
}

/// Extracts and validates the session token, yielding the caller.
pub struct AuthUser(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = SessionToken::from_request_parts(parts, state).await?;
        let keys = JwtKeys::from_ref(state);

        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "rejected session token");
            match e {
                TokenError::Signing(e) => AppError::Internal(anyhow::Error::new(e)),
                other => AppError::Authentication(other.to_string()),
            }
        })?;

        Ok(AuthUser(Caller::from(&claims)))
    }
}
