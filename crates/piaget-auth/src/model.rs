//! Authentication models
//!
//! This file defines data structures for staff sessions and JWT tokens

use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};

// Auth configuration keys
pub const TOKEN_SECRET_KEY: &str = "piaget.auth.token.secret.key";
pub const DEFAULT_TOKEN_SECRET_KEY: &str = "";
pub const TOKEN_EXPIRE_SECONDS: &str = "piaget.auth.token.expire.seconds";
pub const DEFAULT_TOKEN_EXPIRE_SECONDS: i64 = 18000;
/// How long a signed-out token stays on the revocation list; also the
/// longest token lifetime that may be configured.
pub const MAX_TOKEN_EXPIRE_SECONDS: i64 = 7 * 24 * 3600;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const TOKEN_PREFIX: &str = "Bearer ";
pub const ACCESS_TOKEN_PARAM: &str = "accessToken";
pub const BCRYPT_COST: u32 = 10;

/// JWT payload for staff authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtPayload {
    pub sub: String,
    pub exp: i64,
}

/// Signed-in staff member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub email: String,
}

/// Result of a successful sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub access_token: String,
    pub token_ttl: i64,
    pub email: String,
}

/// Auth context passed through request extensions
#[derive(Debug, Default, Clone)]
pub struct AuthContext {
    pub email: String,
    pub token: Option<String>,
    pub jwt_error: Option<jsonwebtoken::errors::Error>,
    pub token_provided: bool,
    pub revoked: bool,
}

impl AuthContext {
    pub fn is_authenticated(&self) -> bool {
        self.token_provided && !self.revoked && self.jwt_error.is_none() && !self.email.is_empty()
    }

    pub fn session_user(&self) -> Option<SessionUser> {
        if self.is_authenticated() {
            Some(SessionUser {
                email: self.email.clone(),
            })
        } else {
            None
        }
    }

    pub fn jwt_error_string(&self) -> String {
        if self.revoked {
            return "token revoked!".to_string();
        }
        if let Some(e) = &self.jwt_error {
            match e.kind() {
                ErrorKind::ExpiredSignature => "token expired!".to_string(),
                _ => e.to_string(),
            }
        } else {
            String::default()
        }
    }
}
