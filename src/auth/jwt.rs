use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::{Caller, Claims};
use crate::{config::JwtConfig, state::AppState};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token is past its refresh window")]
    RefreshExpired,
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// A freshly signed token and the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expire: OffsetDateTime,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
            refresh_ttl: Duration::from_secs((cfg.refresh_ttl_minutes.max(0) as u64) * 60),
        }
    }

    pub fn issue(&self, caller: Caller) -> Result<IssuedToken, TokenError> {
        let now = OffsetDateTime::now_utc();
        self.sign(caller, now, now.unix_timestamp())
    }

    fn sign(
        &self,
        caller: Caller,
        now: OffsetDateTime,
        orig_iat: i64,
    ) -> Result<IssuedToken, TokenError> {
        let expire = now + TimeDuration::seconds(self.access_ttl.as_secs() as i64);
        let claims = Claims {
            sub: caller.id,
            role: caller.role,
            iat: now.unix_timestamp(),
            orig_iat,
            exp: expire.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token =
            encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)?;
        debug!(user_id = claims.sub, role = ?claims.role, "jwt signed");
        Ok(IssuedToken { token, expire })
    }

    fn validation(&self, check_exp: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = check_exp;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }

    fn decode(&self, token: &str, check_exp: bool) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation(check_exp))
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                // a token for another issuer/audience was not signed for us
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;
        Ok(data.claims)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.decode(token, true)?;
        debug!(user_id = claims.sub, role = ?claims.role, "jwt verified");
        Ok(claims)
    }

    /// Re-sign a token whose session is still inside the refresh window.
    ///
    /// The old token may already be expired; its signature must still hold.
    pub fn refresh(&self, token: &str) -> Result<IssuedToken, TokenError> {
        self.refresh_at(token, OffsetDateTime::now_utc())
    }

    fn refresh_at(&self, token: &str, now: OffsetDateTime) -> Result<IssuedToken, TokenError> {
        let claims = self.decode(token, false)?;
        let horizon = claims.orig_iat + self.refresh_ttl.as_secs() as i64;
        if now.unix_timestamp() > horizon {
            return Err(TokenError::RefreshExpired);
        }
        self.sign(Caller::from(&claims), now, claims.orig_iat)
    }
}
