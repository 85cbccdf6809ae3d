use tracing::{info, warn};

use super::{
    claims::Caller,
    dto::SignInRequest,
    jwt::{IssuedToken, JwtKeys, TokenError},
    password::{verify_password, verify_without_account},
};
use crate::{error::AppError, users::repo::UserStore};

const BAD_CREDENTIALS: &str = "invalid login or password";

fn token_error(e: TokenError) -> AppError {
    match e {
        TokenError::Signing(e) => AppError::Internal(anyhow::Error::new(e)),
        other => AppError::Authentication(other.to_string()),
    }
}

/// Check credentials against the active account and issue a session token.
///
/// An unknown login and a wrong password produce the same error, and both
/// pay for one argon2 verification.
pub async fn sign_in(
    store: &dyn UserStore,
    keys: &JwtKeys,
    req: SignInRequest,
) -> Result<IssuedToken, AppError> {
    let login = req.login.trim();
    if login.is_empty() || req.password.is_empty() {
        verify_without_account(&req.password);
        return Err(AppError::Authentication(BAD_CREDENTIALS.into()));
    }

    let mut tx = store.begin().await?;
    let user = tx.find_active_by_login(login).await?;
    tx.commit().await?;

    let Some(user) = user else {
        verify_without_account(&req.password);
        warn!(login = %login, "sign-in for unknown login");
        return Err(AppError::Authentication(BAD_CREDENTIALS.into()));
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = user.id, "sign-in with wrong password");
        return Err(AppError::Authentication(BAD_CREDENTIALS.into()));
    }

    let issued = keys
        .issue(Caller {
            id: user.id,
            role: user.role,
        })
        .map_err(token_error)?;
    info!(user_id = user.id, role = ?user.role, "user signed in");
    Ok(issued)
}

pub fn refresh(keys: &JwtKeys, token: &str) -> Result<IssuedToken, AppError> {
    keys.refresh(token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        token_error(e)
    })
}
