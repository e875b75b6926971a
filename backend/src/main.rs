//! # LifeVault Backend Service
//!
//! This is the main entry point for the LifeVault backend, a digital
//! inheritance vault. It provides:
//!
//! - REST API for owners (assets, trading accounts, nominees)
//! - Vault requests raised by nominees and reviewed by admins
//! - Document validation for supporting evidence
//! - WebSocket notifications for request submissions and decisions
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        BACKEND SERVICE                           │
//! │                                                                  │
//! │  ┌─────────────────────────────┐  ┌─────────────────────────┐   │
//! │  │  REST API (Actix)           │  │  WebSocket              │   │
//! │  │  /api/auth  /api/assets     │  │  /ws?token=             │   │
//! │  │  /api/nominees  /api/admin  │  │                         │   │
//! │  │  /api/vault-requests        │  │                         │   │
//! │  └─────────────────────────────┘  └─────────────────────────┘   │
//! │         │                                     │                  │
//! │  ┌──────┴─────────────────────────────────────┴──────────────┐  │
//! │  │                    SERVICE LAYER                           │  │
//! │  │  AuthService  AssetManager  NomineeManager                 │  │
//! │  │  VaultRequestManager  DocumentValidator  DashboardService  │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                          │                                       │
//! │                   ┌──────┴──────┐                                │
//! │                   │    Store    │                                │
//! │                   └──────┬──────┘                                │
//! │              ┌───────────┴───────────┐                           │
//! │       ┌──────┴──────┐         ┌──────┴──────┐                    │
//! │       │   Memory    │         │ PostgreSQL  │                    │
//! │       └─────────────┘         └─────────────┘                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! 1. Copy `.env.example` to `.env` and configure
//! 2. For PostgreSQL, set `STORAGE_BACKEND=postgres` and `DATABASE_URL`;
//!    the schema is applied at startup
//! 3. Start the server: `cargo run`
//!
//! ## Environment Variables
//!
//! See `.env.example` for all configuration.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware, web, App, HttpServer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod db;
mod models;
mod services;
mod store;
mod utils;
mod websocket;

use auth::TokenIssuer;
use config::{AppConfig, StorageBackend};
use db::Database;
use services::{
    AssetManager, AuthService, DashboardService, DocumentValidator, NomineeManager,
    VaultRequestManager,
};
use store::Store;
use websocket::WsRegistry;

/// Application state shared across all handlers.
///
/// Every service is cheap to clone and shares the same [`Store`].
pub struct AppState {
    /// Active storage engine
    pub store: Store,

    /// Application configuration
    pub config: AppConfig,

    /// Signs and verifies session tokens
    pub tokens: TokenIssuer,

    pub auth: AuthService,
    pub assets: AssetManager,
    pub nominees: NomineeManager,
    pub vault_requests: VaultRequestManager,
    pub dashboard: DashboardService,

    /// WebSocket connection registry for real-time updates
    pub ws_registry: WsRegistry,
}

impl AppState {
    /// Wire every service to `store`.
    pub fn new(store: Store, config: AppConfig) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_expiry_hours);
        let ws_registry = WsRegistry::new();
        let validator = DocumentValidator::new(
            store.clone(),
            config.document_max_bytes,
            config.document_min_score,
        );

        Self {
            auth: AuthService::new(store.clone(), tokens.clone()),
            assets: AssetManager::new(store.clone()),
            nominees: NomineeManager::new(store.clone()),
            vault_requests: VaultRequestManager::new(
                store.clone(),
                validator,
                ws_registry.clone(),
                config.require_verified_documents,
            ),
            dashboard: DashboardService::new(store.clone()),
            store,
            config,
            tokens,
            ws_registry,
        }
    }
}

/// Open the configured storage engine, applying the schema for PostgreSQL.
async fn open_store(config: &AppConfig) -> Result<Store, db::DatabaseError> {
    match config.storage_backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Ok(Store::memory())
        }
        StorageBackend::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                db::DatabaseError::ConfigError("DATABASE_URL is not set".to_string())
            })?;
            let db = Database::connect(url).await?;
            info!("Database connected");

            db.run_migrations(&config.migrations_path).await?;
            info!("Database migrations complete");
            Ok(Store::Postgres(db))
        }
    }
}

/// Main entry point for the backend service.
///
/// This function:
/// 1. Loads configuration from environment
/// 2. Initializes logging
/// 3. Opens the storage engine
/// 4. Creates the bootstrap admin
/// 5. Launches the HTTP server
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // =========================================
    // STEP 1: Load Configuration
    // =========================================
    dotenvy::dotenv().ok(); // It's okay if .env doesn't exist

    let config = AppConfig::from_env().expect("Failed to load configuration");

    // =========================================
    // STEP 2: Initialize Logging
    // =========================================
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();

    info!("Starting LifeVault backend");
    info!("   Storage: {}", config.storage_backend);
    info!("   CORS origin: {}", config.cors_origin);
    if config.uses_demo_secret() {
        warn!("JWT_SECRET is not set; using the built-in demo secret");
    }

    // =========================================
    // STEP 3: Open Storage
    // =========================================
    let store = open_store(&config)
        .await
        .expect("Failed to open storage");

    // =========================================
    // STEP 4: Create Application State
    // =========================================
    let app_state = Arc::new(AppState::new(store, config.clone()));
    info!("Services initialized");

    // =========================================
    // STEP 5: Bootstrap Admin
    // =========================================
    match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => {
            match app_state.auth.bootstrap_admin(email, password).await {
                Ok(true) => info!("Bootstrap admin {} created", email),
                Ok(false) => info!("Bootstrap admin {} already present", email),
                Err(e) => error!("Failed to bootstrap admin {}: {}", email, e),
            }
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!("Set both ADMIN_EMAIL and ADMIN_PASSWORD to bootstrap an admin");
        }
        (None, None) => {}
    }

    // =========================================
    // STEP 6: Start HTTP Server
    // =========================================
    let server_host = config.server_host.clone();
    let server_port = config.server_port;
    let cors_origin = config.cors_origin.clone();

    info!("Starting HTTP server on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            // Attach shared application state
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            // Add logging middleware
            .wrap(middleware::Logger::default())
            // Configure API routes
            .configure(api::configure_routes)
            // Configure WebSocket routes
            .configure(websocket::configure_routes)
    })
    .bind(format!("{}:{}", server_host, server_port))?
    .run()
    .await
}
