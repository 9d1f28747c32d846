//! Passwords, JWTs and the logged-in user extractor.

use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::Payload,
    http::header::AUTHORIZATION,
    web, FromRequest, HttpRequest,
};
use chrono::{Duration, Utc};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use log::{debug, warn};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::AppError,
    models::{Role, User},
    state::AppState,
};

pub const TOKEN_COOKIE: &str = "jwt";
const LOGGED_OUT: &str = "loggedout";
const RESET_TOKEN_MINUTES: i64 = 10;

pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("bcrypt: {e}")))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?;
    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            warn!("[AUTH] Stored password hash rejected: {e}");
            Ok(false)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expires_in: Duration,
}

impl TokenService {
    pub fn new(secret: &str, expires_in_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expires_in: Duration::days(expires_in_days),
        }
    }

    pub fn issue(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.expires_in).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            })
    }
}

/// Bearer header first, then the session cookie.
pub fn token_from_request(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        req.cookie(TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty() && value != LOGGED_OUT)
    })
}

/// The logged-in, active user behind the request's token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = token_from_request(req);

        Box::pin(async move {
            let state =
                state.ok_or_else(|| AppError::Internal("application state missing".into()))?;
            let token = token.ok_or_else(|| {
                AppError::unauthorized("You are not logged in. Please login to have access")
            })?;

            let claims = state.tokens.verify(&token)?;
            let (user, credentials) = state
                .db
                .get_user_with_credentials(&claims.sub)
                .await?
                .filter(|(user, _)| user.active)
                .ok_or_else(|| {
                    AppError::unauthorized("The user belonging to this token does no longer exist.")
                })?;

            if credentials.changed_after(claims.iat) {
                return Err(AppError::unauthorized(
                    "User recently changed password. Please login again.",
                ));
            }

            debug!("[AUTH] Authenticated {}", user.id);
            Ok(AuthUser(user))
        })
    }
}

pub fn require_role(user: &User, roles: &[Role]) -> Result<(), AppError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Plain token for the reset link, and the SHA-256 hex digest that is stored.
pub struct ResetToken {
    pub token: String,
    pub hash: String,
    pub expires_at: chrono::DateTime<Utc>,
}

pub fn new_reset_token() -> ResetToken {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    ResetToken {
        hash: hash_reset_token(&token),
        token,
        expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES),
    }
}

pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn session_cookie(token: &str, days: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(days))
        .finish()
}

/// Overwrites the session cookie with a short-lived placeholder.
pub fn logout_cookie() -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, LOGGED_OUT)
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(10))
        .finish()
}
