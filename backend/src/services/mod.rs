//! # Services Module
//!
//! This module contains the business logic of the LifeVault backend.
//! Each service handles a specific domain and talks to storage only
//! through [`Store`](crate::store::Store).
//!
//! ## Services Overview
//!
//! | Service | Responsibility |
//! |---------|---------------|
//! | `AuthService` | Registration, login, profiles, admin bootstrap |
//! | `AssetManager` | Assets and trading accounts of an owner |
//! | `NomineeManager` | Nominees and allocation percentages |
//! | `VaultRequestManager` | Claims raised by nominees, admin review |
//! | `DocumentValidator` | Scoring of supporting documents |
//! | `DashboardService` | Aggregated statistics |
//!
//! ## Service Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SERVICES LAYER                            │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                 VaultRequestManager                       │   │
//! │  │  • submit()   • attach_document()  • cancel()             │   │
//! │  │  • approve()  • reject()           • unlocked_assets()    │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                              │                                   │
//! │         ┌────────────────────┼────────────────────┐             │
//! │         ▼                    ▼                    ▼             │
//! │  ┌────────────┐      ┌────────────┐       ┌────────────┐       │
//! │  │  Document  │      │   Store    │       │ WsRegistry │       │
//! │  │ Validator  │      │            │       │            │       │
//! │  │            │      │ memory /   │       │ push events│       │
//! │  │ hash/score │      │ postgres   │       │            │       │
//! │  └────────────┘      └────────────┘       └────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Errors
//!
//! Every service returns [`ServiceError`]; the API layer turns each
//! variant into an HTTP status and an error code.

pub mod assets;
pub mod auth;
pub mod dashboard;
pub mod document_validator;
pub mod nominees;
pub mod vault_requests;

use std::str::FromStr;

use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::db::UnknownVariant;
use crate::store::StoreError;

pub use assets::AssetManager;
pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use document_validator::{DocumentInput, DocumentValidator, ValidationReport};
pub use nominees::NomineeManager;
pub use vault_requests::VaultRequestManager;

/// Errors returned by the services.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Caller is not signed in or gave bad credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is signed in but may not do this.
    #[error("{0}")]
    Forbidden(String),

    /// Record does not exist or is not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule would be broken.
    #[error("{0}")]
    Conflict(String),

    /// The record's status does not allow the operation.
    #[error("{0}")]
    InvalidState(String),

    /// Approval needs supporting documents that are missing.
    #[error("{0}")]
    DocumentsRequired(String),

    /// Storage or another internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Error code sent in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Unauthorized(_) => "UNAUTHORIZED",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::InvalidState(_) => "INVALID_STATE",
            ServiceError::DocumentsRequired(_) => "DOCUMENTS_REQUIRED",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(what) => ServiceError::Conflict(conflict_message(&what)),
            StoreError::Database(db) => {
                error!("Storage failure: {}", db);
                ServiceError::Internal("Storage failure".to_string())
            }
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::ExpiredToken => {
                ServiceError::Unauthorized(e.to_string())
            }
            AuthError::Signing(_) | AuthError::Hashing(_) => {
                error!("Credential failure: {}", e);
                ServiceError::Internal("Credential processing failed".to_string())
            }
        }
    }
}

/// Turn a storage constraint name into a message fit for clients.
fn conflict_message(constraint: &str) -> String {
    match constraint {
        "users_email_key" => "Email is already registered".to_string(),
        "nominees_owner_email_key" => "A nominee with this email already exists".to_string(),
        "vault_requests_one_pending" => {
            "You already have a pending vault request for this account".to_string()
        }
        other => format!("Conflicting record: {}", other),
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Parse a text choice, naming the accepted values on failure.
pub(crate) fn parse_choice<T>(value: &str, accepted: fn() -> String) -> ServiceResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value.parse().map_err(|e: UnknownVariant| {
        ServiceError::Validation(format!(
            "Invalid {}: '{}' (expected one of: {})",
            e.kind,
            e.value,
            accepted()
        ))
    })
}

/// Trim an optional text field, treating blank as absent.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
