//! # API Request Handlers
//!
//! This module contains the handler functions for each API endpoint.
//! Each handler:
//! 1. Extracts the caller ([`AuthUser`]) and request data
//! 2. Calls the appropriate service
//! 3. Returns a formatted response
//!
//! ## Error Handling
//!
//! Every [`ServiceError`] is returned as JSON with a matching status:
//!
//! ```json
//! {
//!     "success": false,
//!     "data": null,
//!     "error": {
//!         "code": "DOCUMENTS_REQUIRED",
//!         "message": "A verified death certificate is required before approval"
//!     }
//! }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `VALIDATION_ERROR` | 400 |
//! | `UNAUTHORIZED` | 401 |
//! | `FORBIDDEN` | 403 |
//! | `NOT_FOUND` | 404 |
//! | `CONFLICT`, `INVALID_STATE` | 409 |
//! | `DOCUMENTS_REQUIRED` | 422 |
//! | `INTERNAL_ERROR` | 500 |

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{
    ApiResponse, AttachDocumentRequest, CreateAssetRequest, CreateNomineeRequest,
    CreateTradingAccountRequest, HealthResponse, LoginRequest, RegisterRequest, ReviewRequest,
    SubmitVaultRequest, UpdateAssetRequest, UpdateNomineeRequest, UpdateTradingAccountRequest,
    VaultRequestQuery,
};
use crate::services::{ServiceError, ServiceResult};
use crate::utils::truncate_string;
use crate::AppState;

/// HTTP status for a service error.
pub fn status_for(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Conflict(_) | ServiceError::InvalidState(_) => StatusCode::CONFLICT,
        ServiceError::DocumentsRequired(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Envelope for a service error.
pub fn error_response(e: &ServiceError) -> HttpResponse {
    let status = status_for(e);
    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected ({}): {}", e.code(), truncate_string(&e.to_string(), 160));
    }
    HttpResponse::build(status).json(ApiResponse::<()>::error(e.code(), &e.to_string()))
}

/// Wrap a service result with `status` on success.
fn respond<T: Serialize>(result: ServiceResult<T>, status: StatusCode) -> HttpResponse {
    match result {
        Ok(data) => HttpResponse::build(status).json(ApiResponse::success(data)),
        Err(e) => error_response(&e),
    }
}

fn ok<T: Serialize>(result: ServiceResult<T>) -> HttpResponse {
    respond(result, StatusCode::OK)
}

fn created<T: Serialize>(result: ServiceResult<T>) -> HttpResponse {
    respond(result, StatusCode::CREATED)
}

// ==========================================
// INFO & HEALTH
// ==========================================

/// API information endpoint (root).
///
/// ## Endpoint
///
/// `GET /`
pub async fn api_info() -> HttpResponse {
    let info = json!({
        "name": "LifeVault API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Digital inheritance vault: assets, nominees and vault requests",
        "endpoints": {
            "health": "GET /health",
            "auth": ["POST /api/auth/register", "POST /api/auth/login", "GET /api/auth/me"],
            "assets": ["GET|POST /api/assets", "GET|PUT|DELETE /api/assets/{id}"],
            "nominees": ["GET|POST /api/nominees", "GET|PUT|DELETE /api/nominees/{id}", "GET /api/nominations"],
            "tradingAccounts": ["GET|POST /api/trading-accounts", "GET|PUT|DELETE /api/trading-accounts/{id}"],
            "vaultRequests": [
                "GET|POST /api/vault-requests",
                "GET /api/vault-requests/{id}",
                "POST /api/vault-requests/{id}/documents",
                "POST /api/vault-requests/{id}/cancel",
                "GET /api/vault-requests/{id}/assets"
            ],
            "dashboard": "GET /api/dashboard/stats",
            "admin": [
                "GET /api/admin/stats",
                "GET /api/admin/users",
                "POST /api/admin/vault-requests/{id}/approve",
                "POST /api/admin/vault-requests/{id}/reject"
            ],
            "websocket": "GET /ws?token=<jwt>"
        }
    });

    HttpResponse::Ok().json(ApiResponse::success(info))
}

/// Health check endpoint.
///
/// ## Endpoint
///
/// `GET /health`
///
/// ## Response
///
/// ```json
/// {
///     "success": true,
///     "data": {
///         "status": "healthy",
///         "storage": "postgres",
///         "storageOk": true,
///         "version": "0.1.0",
///         "timestamp": "2024-03-05T12:00:00Z"
///     }
/// }
/// ```
pub async fn health_check(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let storage_ok = state.store.ping().await;

    let response = HealthResponse {
        status: if storage_ok { "healthy" } else { "unhealthy" }.to_string(),
        storage: state.store.backend_name().to_string(),
        storage_ok,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    };

    let status_code = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    HttpResponse::build(status_code).json(ApiResponse::success(response))
}

// ==========================================
// AUTH
// ==========================================

/// `POST /api/auth/register`
///
/// ```bash
/// curl -X POST http://127.0.0.1:5000/api/auth/register \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Asha Kulkarni", "email": "asha@example.com", "password": "s3cure-passphrase"}'
/// ```
pub async fn register(
    state: web::Data<Arc<AppState>>,
    body: web::Json<RegisterRequest>,
) -> HttpResponse {
    created(state.auth.register(body.into_inner()).await)
}

/// `POST /api/auth/login`
pub async fn login(state: web::Data<Arc<AppState>>, body: web::Json<LoginRequest>) -> HttpResponse {
    ok(state.auth.login(body.into_inner()).await)
}

/// `GET /api/auth/me`
pub async fn me(state: web::Data<Arc<AppState>>, user: AuthUser) -> HttpResponse {
    ok(state.auth.profile(user.id).await)
}

// ==========================================
// ASSETS
// ==========================================

pub async fn list_assets(state: web::Data<Arc<AppState>>, user: AuthUser) -> HttpResponse {
    ok(state.assets.list_assets(user.id).await)
}

/// `POST /api/assets`
///
/// ```bash
/// curl -X POST http://127.0.0.1:5000/api/assets \
///   -H "Authorization: Bearer $TOKEN" \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Salary account", "category": "bank_account",
///        "institution": "State Bank of India", "currentValue": 25000000}'
/// ```
pub async fn create_asset(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    body: web::Json<CreateAssetRequest>,
) -> HttpResponse {
    created(state.assets.create_asset(user.id, body.into_inner()).await)
}

pub async fn get_asset(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    ok(state.assets.get_asset(user.id, path.into_inner()).await)
}

pub async fn update_asset(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateAssetRequest>,
) -> HttpResponse {
    ok(state
        .assets
        .update_asset(user.id, path.into_inner(), body.into_inner())
        .await)
}

pub async fn delete_asset(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    ok(state.assets.delete_asset(user.id, path.into_inner()).await)
}

// ==========================================
// TRADING ACCOUNTS
// ==========================================

pub async fn list_trading_accounts(state: web::Data<Arc<AppState>>, user: AuthUser) -> HttpResponse {
    ok(state.assets.list_trading_accounts(user.id).await)
}

pub async fn create_trading_account(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    body: web::Json<CreateTradingAccountRequest>,
) -> HttpResponse {
    created(
        state
            .assets
            .create_trading_account(user.id, body.into_inner())
            .await,
    )
}

pub async fn get_trading_account(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    ok(state
        .assets
        .get_trading_account(user.id, path.into_inner())
        .await)
}

pub async fn update_trading_account(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateTradingAccountRequest>,
) -> HttpResponse {
    ok(state
        .assets
        .update_trading_account(user.id, path.into_inner(), body.into_inner())
        .await)
}

pub async fn delete_trading_account(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    ok(state
        .assets
        .delete_trading_account(user.id, path.into_inner())
        .await)
}

// ==========================================
// NOMINEES
// ==========================================

pub async fn list_nominees(state: web::Data<Arc<AppState>>, user: AuthUser) -> HttpResponse {
    ok(state.nominees.list_nominees(user.id).await)
}

/// `POST /api/nominees`
///
/// Fails with `VALIDATION_ERROR` when the new share would take the
/// owner's total allocation past 100%.
pub async fn create_nominee(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    body: web::Json<CreateNomineeRequest>,
) -> HttpResponse {
    created(state.nominees.create_nominee(user.id, body.into_inner()).await)
}

pub async fn get_nominee(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    ok(state.nominees.get_nominee(user.id, path.into_inner()).await)
}

pub async fn update_nominee(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateNomineeRequest>,
) -> HttpResponse {
    ok(state
        .nominees
        .update_nominee(user.id, path.into_inner(), body.into_inner())
        .await)
}

pub async fn delete_nominee(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    ok(state.nominees.delete_nominee(user.id, path.into_inner()).await)
}

/// `GET /api/nominations` - owners that named the caller.
pub async fn list_nominations(state: web::Data<Arc<AppState>>, user: AuthUser) -> HttpResponse {
    ok(state.nominees.nominations_for(&user.email).await)
}

// ==========================================
// VAULT REQUESTS
// ==========================================

/// `GET /api/vault-requests?status=pending`
pub async fn list_vault_requests(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    query: web::Query<VaultRequestQuery>,
) -> HttpResponse {
    ok(state
        .vault_requests
        .list(&user, query.status.as_deref())
        .await)
}

/// `POST /api/vault-requests`
///
/// ```bash
/// curl -X POST http://127.0.0.1:5000/api/vault-requests \
///   -H "Authorization: Bearer $TOKEN" \
///   -H "Content-Type: application/json" \
///   -d '{"ownerEmail": "asha@example.com", "message": "Certificate attached next"}'
/// ```
pub async fn submit_vault_request(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    body: web::Json<SubmitVaultRequest>,
) -> HttpResponse {
    created(state.vault_requests.submit(&user, body.into_inner()).await)
}

pub async fn get_vault_request(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    ok(state.vault_requests.get(&user, path.into_inner()).await)
}

/// `POST /api/vault-requests/{id}/documents`
///
/// `content` is base64. The response carries the validation verdict.
pub async fn attach_document(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<AttachDocumentRequest>,
) -> HttpResponse {
    created(
        state
            .vault_requests
            .attach_document(&user, path.into_inner(), body.into_inner())
            .await,
    )
}

pub async fn cancel_vault_request(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    ok(state.vault_requests.cancel(&user, path.into_inner()).await)
}

/// `GET /api/vault-requests/{id}/assets` - what an approved request unlocks.
pub async fn unlocked_assets(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> HttpResponse {
    ok(state
        .vault_requests
        .unlocked_assets(&user, path.into_inner())
        .await)
}

// ==========================================
// DASHBOARD & ADMIN
// ==========================================

pub async fn dashboard_stats(state: web::Data<Arc<AppState>>, user: AuthUser) -> HttpResponse {
    ok(state.dashboard.owner_stats(user.id).await)
}

pub async fn admin_stats(state: web::Data<Arc<AppState>>, user: AuthUser) -> HttpResponse {
    if let Err(e) = user.require_admin() {
        return error_response(&e);
    }
    ok(state.dashboard.admin_stats().await)
}

pub async fn admin_users(state: web::Data<Arc<AppState>>, user: AuthUser) -> HttpResponse {
    if let Err(e) = user.require_admin() {
        return error_response(&e);
    }
    ok(state.auth.list_users().await)
}

/// `POST /api/admin/vault-requests/{id}/approve`
///
/// Body is optional: `{"notes": "Certificate checked"}`.
pub async fn approve_vault_request(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: Option<web::Json<ReviewRequest>>,
) -> HttpResponse {
    let notes = body.and_then(|b| b.into_inner().notes);
    ok(state
        .vault_requests
        .approve(&user, path.into_inner(), notes)
        .await)
}

/// `POST /api/admin/vault-requests/{id}/reject`
///
/// `notes` is required.
pub async fn reject_vault_request(
    state: web::Data<Arc<AppState>>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: Option<web::Json<ReviewRequest>>,
) -> HttpResponse {
    let notes = body.and_then(|b| b.into_inner().notes);
    ok(state
        .vault_requests
        .reject(&user, path.into_inner(), notes)
        .await)
}
