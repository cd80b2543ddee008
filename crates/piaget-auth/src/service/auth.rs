//! JWT token service

use std::sync::LazyLock;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use moka::sync::Cache;

use crate::model::{JwtPayload, MAX_TOKEN_EXPIRE_SECONDS};

/// Cached token data containing the full payload
#[derive(Clone)]
struct CachedTokenData {
    claims: JwtPayload,
}

/// JWT Token cache to avoid repeated validation of the same token
static TOKEN_CACHE: LazyLock<Cache<String, CachedTokenData>> = LazyLock::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(300)) // 5 minutes TTL
        .build()
});

/// Tokens ended by sign-out. Entries live as long as the longest token we issue.
static REVOKED_TOKENS: LazyLock<Cache<String, ()>> = LazyLock::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(MAX_TOKEN_EXPIRE_SECONDS as u64))
        .build()
});

/// Decode and validate JWT token with caching
pub fn decode_jwt_token_cached(
    token: &str,
    secret_key: &str,
) -> jsonwebtoken::errors::Result<jsonwebtoken::TokenData<JwtPayload>> {
    // Check cache first - use token directly for lookup
    if let Some(cached) = TOKEN_CACHE.get(token) {
        let now = chrono::Utc::now().timestamp();
        if cached.claims.exp > now {
            return Ok(jsonwebtoken::TokenData {
                header: Header::new(Algorithm::HS256),
                claims: cached.claims,
            });
        }
        // Token expired in cache, invalidate it
        TOKEN_CACHE.invalidate(token);
    }

    let result = decode_jwt_token(token, secret_key)?;

    TOKEN_CACHE.insert(
        token.to_string(),
        CachedTokenData {
            claims: result.claims.clone(),
        },
    );

    Ok(result)
}

/// Decode and validate JWT token without caching
pub fn decode_jwt_token(
    token: &str,
    secret_key: &str,
) -> jsonwebtoken::errors::Result<jsonwebtoken::TokenData<JwtPayload>> {
    let decoding_key = DecodingKey::from_base64_secret(secret_key)?;
    decode::<JwtPayload>(token, &decoding_key, &Validation::new(Algorithm::HS256))
}

/// Encode a JWT token
pub fn encode_jwt_token(
    sub: &str,
    secret_key: &str,
    expire_seconds: i64,
) -> jsonwebtoken::errors::Result<String> {
    let exp = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::seconds(expire_seconds))
        .unwrap_or_else(chrono::Utc::now)
        .timestamp();

    let payload = JwtPayload {
        sub: sub.to_string(),
        exp,
    };

    let encoding_key = EncodingKey::from_base64_secret(secret_key)?;
    encode(&Header::new(Algorithm::HS256), &payload, &encoding_key)
}

/// Mark a token as signed out
pub fn revoke_token(token: &str) {
    TOKEN_CACHE.invalidate(token);
    REVOKED_TOKENS.insert(token.to_string(), ());
}

pub fn is_revoked(token: &str) -> bool {
    REVOKED_TOKENS.contains_key(token)
}
