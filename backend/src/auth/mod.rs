//! # Authentication Module
//!
//! Password hashing, session tokens and the [`AuthUser`] extractor that
//! handlers take as an argument to require a signed-in caller.
//!
//! ## Request Flow
//!
//! ```text
//! Authorization: Bearer <jwt>
//!              ↓
//! AuthUser::from_request()
//!              ↓
//! TokenIssuer::verify()  ── invalid/expired ──> 401 UNAUTHORIZED
//!              ↓
//! handler(user: AuthUser, ...)
//! ```

pub mod jwt;
pub mod password;

use std::sync::Arc;

use actix_web::dev::Payload;
use actix_web::error::InternalError;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use futures::future::{ready, Ready};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::db::Role;
use crate::models::ApiResponse;
use crate::services::ServiceError;
use crate::AppState;

pub use jwt::{Claims, TokenIssuer};

/// Authentication failures.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Failed to hash password: {0}")]
    Hashing(String),
}

/// The authenticated caller, taken from a verified session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        Ok(Self {
            id: claims.user_id()?,
            email: claims.email.clone(),
            role: claims.role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Admin role required".to_string()))
        }
    }
}

/// Pull the token out of an `Authorization: Bearer ...` header.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn unauthorized(err: AuthError) -> actix_web::Error {
    let response =
        HttpResponse::Unauthorized().json(ApiResponse::<()>::error("UNAUTHORIZED", &err.to_string()));
    InternalError::from_response(err, response).into()
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, actix_web::Error> {
    let state = req
        .app_data::<web::Data<Arc<AppState>>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("application state missing"))?;

    let token = bearer_token(req).ok_or_else(|| unauthorized(AuthError::MissingToken))?;

    let claims = state.tokens.verify(token).map_err(|e| {
        debug!("Rejected token on {}: {}", req.path(), e);
        unauthorized(e)
    })?;

    AuthUser::from_claims(&claims).map_err(unauthorized)
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
