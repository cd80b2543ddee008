//! Staff account service

use piaget_common::{LOGIN_FAILED_MESSAGE, PiagetError, validation};
use piaget_persistence::UserPersistence;

use crate::model::{BCRYPT_COST, LoginResult, SessionUser};
use crate::service::auth;

/// E-mail addresses are compared trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a staff account with a bcrypt-hashed password
pub async fn create_user<P: UserPersistence + ?Sized>(
    persistence: &P,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let email = normalize_email(email);

    validation::validate_email(&email)
        .map_err(|_| PiagetError::IllegalArgument(format!("invalid e-mail '{}'", email)))?;
    validation::validate_password(password).map_err(|e| {
        PiagetError::IllegalArgument(format!("invalid password: {}", e.code))
    })?;

    if persistence.user_find_by_email(&email).await?.is_some() {
        return Err(PiagetError::IllegalArgument(format!("user '{}' already exist!", email)).into());
    }

    let password_hash = bcrypt::hash(password, BCRYPT_COST)?;
    persistence.user_create(&email, &password_hash, true).await?;

    tracing::info!(email = %email, "Staff account created");
    Ok(())
}

/// Create the first staff account. Refused once any account exists.
pub async fn init_admin<P: UserPersistence + ?Sized>(
    persistence: &P,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    if persistence.user_count().await? > 0 {
        return Err(PiagetError::AlreadyInitialized(
            "staff account already initialized".to_string(),
        )
        .into());
    }

    create_user(persistence, email, password).await
}

/// Verify credentials and issue an access token
pub async fn sign_in<P: UserPersistence + ?Sized>(
    persistence: &P,
    email: &str,
    password: &str,
    secret_key: &str,
    expire_seconds: i64,
) -> anyhow::Result<LoginResult> {
    let email = normalize_email(email);

    let user = match persistence.user_find_by_email(&email).await? {
        Some(user) if user.enabled => user,
        _ => {
            tracing::warn!(email = %email, "Sign-in refused: unknown or disabled account");
            return Err(PiagetError::AuthError(LOGIN_FAILED_MESSAGE.to_string()).into());
        }
    };

    if !bcrypt::verify(password, &user.password).unwrap_or(false) {
        tracing::warn!(email = %email, "Sign-in refused: wrong password");
        return Err(PiagetError::AuthError(LOGIN_FAILED_MESSAGE.to_string()).into());
    }

    let access_token = auth::encode_jwt_token(&email, secret_key, expire_seconds)?;

    tracing::info!(email = %email, "Staff signed in");

    Ok(LoginResult {
        access_token,
        token_ttl: expire_seconds,
        email,
    })
}

/// Resolve the staff member behind a token, if the token is still valid
pub fn current_session(token: &str, secret_key: &str) -> Option<SessionUser> {
    if token.is_empty() || auth::is_revoked(token) {
        return None;
    }

    auth::decode_jwt_token_cached(token, secret_key)
        .ok()
        .map(|data| SessionUser {
            email: data.claims.sub,
        })
}

/// End the session behind a token
pub fn sign_out(token: &str) {
    auth::revoke_token(token);
    tracing::info!("Staff signed out");
}
