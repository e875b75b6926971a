//! # API Route Configuration
//!
//! This module sets up all the HTTP routes for the API.

use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};

use super::handlers;
use crate::models::ApiResponse;

/// Maximum accepted JSON body. Documents travel base64-encoded, so this
/// sits comfortably above the default document limit.
pub const JSON_LIMIT_BYTES: usize = 8 * 1024 * 1024;

fn bad_request(err: impl std::fmt::Display + std::fmt::Debug + 'static) -> actix_web::Error {
    let response = HttpResponse::BadRequest()
        .json(ApiResponse::<()>::error("VALIDATION_ERROR", &err.to_string()));
    InternalError::from_response(err, response).into()
}

/// Malformed JSON bodies answer with the standard envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| bad_request(err))
}

/// Unparseable ids (e.g. `/api/assets/not-a-uuid`) answer with the envelope.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| bad_request(err))
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| bad_request(err))
}

/// Configure all API routes.
///
/// This function is called from main.rs to set up
/// all the endpoint routes.
///
/// ## Route Structure
///
/// ```text
/// /
/// ├── /health                         GET
/// └── /api
///     ├── /auth
///     │   ├── /register               POST
///     │   ├── /login                  POST
///     │   └── /me                     GET
///     ├── /assets                     GET, POST
///     │   └── /{id}                   GET, PUT, DELETE
///     ├── /trading-accounts           GET, POST
///     │   └── /{id}                   GET, PUT, DELETE
///     ├── /nominees                   GET, POST
///     │   └── /{id}                   GET, PUT, DELETE
///     ├── /nominations                GET
///     ├── /vault-requests             GET, POST
///     │   └── /{id}                   GET
///     │       ├── /documents          POST
///     │       ├── /cancel             POST
///     │       └── /assets             GET
///     ├── /dashboard/stats            GET
///     └── /admin
///         ├── /stats                  GET
///         ├── /users                  GET
///         └── /vault-requests/{id}
///             ├── /approve            POST
///             └── /reject             POST
/// ```
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .app_data(query_config())
        // Root endpoint - API information
        .route("/", web::get().to(handlers::api_info))
        // Health check endpoint
        .route("/health", web::get().to(handlers::health_check))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(handlers::register))
                        .route("/login", web::post().to(handlers::login))
                        .route("/me", web::get().to(handlers::me)),
                )
                .service(
                    web::resource("/assets")
                        .route(web::get().to(handlers::list_assets))
                        .route(web::post().to(handlers::create_asset)),
                )
                .service(
                    web::resource("/assets/{id}")
                        .route(web::get().to(handlers::get_asset))
                        .route(web::put().to(handlers::update_asset))
                        .route(web::delete().to(handlers::delete_asset)),
                )
                .service(
                    web::resource("/trading-accounts")
                        .route(web::get().to(handlers::list_trading_accounts))
                        .route(web::post().to(handlers::create_trading_account)),
                )
                .service(
                    web::resource("/trading-accounts/{id}")
                        .route(web::get().to(handlers::get_trading_account))
                        .route(web::put().to(handlers::update_trading_account))
                        .route(web::delete().to(handlers::delete_trading_account)),
                )
                .service(
                    web::resource("/nominees")
                        .route(web::get().to(handlers::list_nominees))
                        .route(web::post().to(handlers::create_nominee)),
                )
                .service(
                    web::resource("/nominees/{id}")
                        .route(web::get().to(handlers::get_nominee))
                        .route(web::put().to(handlers::update_nominee))
                        .route(web::delete().to(handlers::delete_nominee)),
                )
                .route("/nominations", web::get().to(handlers::list_nominations))
                .service(
                    web::resource("/vault-requests")
                        .route(web::get().to(handlers::list_vault_requests))
                        .route(web::post().to(handlers::submit_vault_request)),
                )
                .route(
                    "/vault-requests/{id}",
                    web::get().to(handlers::get_vault_request),
                )
                .route(
                    "/vault-requests/{id}/documents",
                    web::post().to(handlers::attach_document),
                )
                .route(
                    "/vault-requests/{id}/cancel",
                    web::post().to(handlers::cancel_vault_request),
                )
                .route(
                    "/vault-requests/{id}/assets",
                    web::get().to(handlers::unlocked_assets),
                )
                .route("/dashboard/stats", web::get().to(handlers::dashboard_stats))
                .service(
                    web::scope("/admin")
                        .route("/stats", web::get().to(handlers::admin_stats))
                        .route("/users", web::get().to(handlers::admin_users))
                        .route(
                            "/vault-requests/{id}/approve",
                            web::post().to(handlers::approve_vault_request),
                        )
                        .route(
                            "/vault-requests/{id}/reject",
                            web::post().to(handlers::reject_vault_request),
                        ),
                ),
        );
}
