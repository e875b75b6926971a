//! # REST API Module
//!
//! This module defines all HTTP endpoints for the LifeVault API.
//!
//! ## Endpoint Overview
//!
//! | Method | Path | Caller |
//! |--------|------|--------|
//! | POST | `/api/auth/register`, `/api/auth/login` | anyone |
//! | GET | `/api/auth/me` | signed in |
//! | GET, POST, PUT, DELETE | `/api/assets[/{id}]` | owner |
//! | GET, POST, PUT, DELETE | `/api/trading-accounts[/{id}]` | owner |
//! | GET, POST, PUT, DELETE | `/api/nominees[/{id}]` | owner |
//! | GET | `/api/nominations` | nominee |
//! | GET, POST | `/api/vault-requests` | signed in |
//! | GET | `/api/vault-requests/{id}` | requester or admin |
//! | POST | `/api/vault-requests/{id}/documents`, `/cancel` | requester |
//! | GET | `/api/vault-requests/{id}/assets` | requester, once approved |
//! | GET | `/api/dashboard/stats` | signed in |
//! | GET | `/api/admin/stats`, `/api/admin/users` | admin |
//! | POST | `/api/admin/vault-requests/{id}/approve`, `/reject` | admin |
//! | GET | `/health` | anyone |
//!
//! Signed-in endpoints take `Authorization: Bearer <token>`.
//!
//! ## Request/Response Format
//!
//! All requests and responses use JSON:
//!
//! ```json
//! // Success response
//! {
//!     "success": true,
//!     "data": { ... }
//! }
//!
//! // Error response
//! {
//!     "success": false,
//!     "error": {
//!         "code": "ERROR_CODE",
//!         "message": "Human readable message"
//!     }
//! }
//! ```

pub mod handlers;
pub mod routes;

pub use routes::configure_routes;

#[cfg(test)]
mod tests;
