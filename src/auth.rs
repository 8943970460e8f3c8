//! Access/refresh token issuance and verification.
//!
//! Both token kinds carry the same claims and are HS256 JWTs signed with
//! their own secret. They travel to the client in the response body and as
//! the `accessToken` / `refreshToken` cookies, and come back through those
//! cookies.

use std::convert::Infallible;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use rocket::http::{Cookie, CookieJar, Status};
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use serde_derive::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{error, warn};

use crate::config::Config;
use crate::types::ApiError;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn cookie_name(self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_COOKIE,
            TokenKind::Refresh => REFRESH_COOKIE,
        }
    }

    pub fn lifetime(self) -> Duration {
        match self {
            TokenKind::Access => Duration::minutes(15),
            TokenKind::Refresh => Duration::days(21),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the user the token was issued to.
    pub sub: String,
    /// Expiration as a unix timestamp.
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, AuthError> {
        self.sub.parse().map_err(|_| AuthError::Malformed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    BadSignature,
    Malformed,
    Expired,
    Signing,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> ApiError {
        match err {
            AuthError::Missing => ApiError::Unauthorized("token is missing".to_string()),
            AuthError::BadSignature => {
                ApiError::Unauthorized("token signature is invalid".to_string())
            }
            AuthError::Expired => ApiError::Unauthorized("token has expired".to_string()),
            AuthError::Malformed => ApiError::BadRequest("token is malformed".to_string()),
            AuthError::Signing => ApiError::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// The two signing secrets, one per token kind.
#[derive(Clone)]
pub struct TokenSecrets {
    access: String,
    refresh: String,
}

impl TokenSecrets {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        TokenSecrets {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    fn key(&self, kind: TokenKind) -> Result<Hmac<Sha256>, AuthError> {
        let secret = match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        };
        Hmac::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::Signing)
    }

    pub fn issue(&self, kind: TokenKind, subject: &str) -> Result<String, AuthError> {
        self.issue_expiring(kind, subject, Utc::now() + kind.lifetime())
    }

    pub fn issue_expiring(
        &self,
        kind: TokenKind,
        subject: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: expires_at.timestamp(),
        };
        claims.sign_with_key(&self.key(kind)?).map_err(|e| {
            error!(error = %e, "failed to sign token");
            AuthError::Signing
        })
    }

    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue(TokenKind::Access, subject)?,
            refresh_token: self.issue(TokenKind::Refresh, subject)?,
        })
    }

    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, AuthError> {
        let claims: Claims = token
            .verify_with_key(&self.key(kind)?)
            .map_err(|e| match e {
                jwt::Error::InvalidSignature
                | jwt::Error::RustCryptoMac(_)
                | jwt::Error::AlgorithmMismatch(..) => AuthError::BadSignature,
                _ => AuthError::Malformed,
            })?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

/// Sets both token cookies, each living as long as its token.
pub fn set_cookies(cookies: &CookieJar<'_>, pair: &TokenPair) {
    let tokens = [
        (TokenKind::Access, &pair.access_token),
        (TokenKind::Refresh, &pair.refresh_token),
    ];
    for (kind, token) in tokens {
        let max_age = rocket::time::Duration::seconds(kind.lifetime().num_seconds());
        let cookie = Cookie::build((kind.cookie_name(), token.clone()))
            .path("/")
            .http_only(true)
            .max_age(max_age)
            .build();
        cookies.add(cookie);
    }
}

/// Strict check: the cookie for `kind` must be present and hold a valid,
/// unexpired token signed with the matching secret.
pub fn authorize(
    cookies: &CookieJar<'_>,
    kind: TokenKind,
    secrets: &TokenSecrets,
) -> Result<Claims, AuthError> {
    let cookie = cookies.get(kind.cookie_name()).ok_or(AuthError::Missing)?;
    secrets.verify(kind, cookie.value())
}

/// Silent check for endpoints where signing in is optional.
pub fn identify(cookies: &CookieJar<'_>, secrets: &TokenSecrets) -> Identity {
    match authorize(cookies, TokenKind::Access, secrets) {
        Ok(claims) => Identity::Authenticated(claims),
        Err(_) => Identity::Anonymous,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(Claims),
    Anonymous,
}

impl Identity {
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Identity::Authenticated(claims) => claims.user_id().ok(),
            Identity::Anonymous => None,
        }
    }
}

/// Claims of a verified access token.
#[derive(Debug)]
pub struct AccessToken(pub Claims);

/// Claims of a verified refresh token.
#[derive(Debug)]
pub struct RefreshToken(pub Claims);

pub type Access = Result<AccessToken, ApiError>;
pub type Refresh = Result<RefreshToken, ApiError>;

impl AccessToken {
    pub fn user_id(&self) -> Result<i32, ApiError> {
        self.0.user_id().map_err(ApiError::from)
    }
}

fn guard(req: &Request<'_>, kind: TokenKind) -> request::Outcome<Claims, ApiError> {
    let config = match req.rocket().state::<Config>() {
        Some(config) => config,
        None => return Outcome::Error((Status::InternalServerError, ApiError::Internal)),
    };
    match authorize(req.cookies(), kind, &config.secrets) {
        Ok(claims) => Outcome::Success(claims),
        Err(e) => {
            warn!(reason = ?e, cookie = kind.cookie_name(), path = %req.uri(), "rejected token");
            let error = ApiError::from(e);
            Outcome::Error((error.status(), error))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AccessToken {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        guard(req, TokenKind::Access).map(AccessToken)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RefreshToken {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        guard(req, TokenKind::Refresh).map(RefreshToken)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Identity {
    type Error = Infallible;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.rocket().state::<Config>() {
            Some(config) => Outcome::Success(identify(req.cookies(), &config.secrets)),
            None => Outcome::Success(Identity::Anonymous),
        }
    }
}
