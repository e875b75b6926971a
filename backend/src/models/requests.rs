//! # API Request Models
//!
//! Structures for incoming API request bodies.
//! Each struct represents the expected JSON body for an endpoint.
//!
//! Enumerated fields (`category`, `accountType`, `kind`, ...) arrive as
//! plain strings and are parsed by the services, so an unknown value is
//! reported as a `VALIDATION_ERROR` naming the accepted values.

use serde::{Deserialize, Serialize};

/// Request to create an account.
///
/// ## Example JSON
///
/// ```json
/// {
///     "name": "Asha Kulkarni",
///     "email": "asha@example.com",
///     "password": "s3cure-passphrase",
///     "role": "user"
/// }
/// ```
///
/// `role` is `user` (default) or `nominee`. Admins are bootstrapped from
/// configuration, never self-registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub phone: Option<String>,
}

/// Request to sign in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request to register an asset.
///
/// ## Example JSON
///
/// ```json
/// {
///     "name": "Salary account",
///     "category": "bank_account",
///     "institution": "State Bank of India",
///     "accountNumber": "123456789012",
///     "currentValue": 25000000,
///     "currency": "INR"
/// }
/// ```
///
/// `currentValue` is in minor units (1 INR = 100), so the example above
/// is 250,000.00 INR.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    pub name: String,
    pub category: String,
    pub institution: String,
    pub account_number: Option<String>,
    pub current_value: i64,
    pub currency: Option<String>,
    pub notes: Option<String>,
}

/// Partial update of an asset. Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub institution: Option<String>,
    pub account_number: Option<String>,
    pub current_value: Option<i64>,
    pub currency: Option<String>,
    pub notes: Option<String>,
}

/// Request to name a nominee.
///
/// ## Example JSON
///
/// ```json
/// {
///     "name": "Ravi Kulkarni",
///     "email": "ravi@example.com",
///     "relationship": "spouse",
///     "allocationPercentage": 60
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNomineeRequest {
    pub name: String,
    pub email: String,
    pub relationship: String,
    pub phone: Option<String>,
    pub allocation_percentage: f64,
}

/// Partial update of a nominee.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNomineeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub relationship: Option<String>,
    pub phone: Option<String>,
    pub allocation_percentage: Option<f64>,
}

/// Request to register a trading account.
///
/// `accountType` is one of `equity`, `commodity`, `derivatives`,
/// `currency`; `status` defaults to `active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTradingAccountRequest {
    pub broker: String,
    pub account_number: String,
    pub client_id: Option<String>,
    pub account_type: String,
    pub current_value: i64,
    pub currency: Option<String>,
    pub status: Option<String>,
}

/// Partial update of a trading account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTradingAccountRequest {
    pub broker: Option<String>,
    pub account_number: Option<String>,
    pub client_id: Option<String>,
    pub account_type: Option<String>,
    pub current_value: Option<i64>,
    pub currency: Option<String>,
    pub status: Option<String>,
}

/// Request raised by a nominee to claim an owner's assets.
///
/// ## Example JSON
///
/// ```json
/// {
///     "ownerEmail": "asha@example.com",
///     "message": "Asha passed away on 2 March; certificate attached next."
/// }
/// ```
///
/// `relationship` defaults to the one the owner recorded for the nominee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVaultRequest {
    pub owner_email: String,
    pub relationship: Option<String>,
    pub message: Option<String>,
}

/// Supporting document for a vault request.
///
/// `content` is the document's extracted text (or raw bytes), base64
/// encoded with the standard alphabet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachDocumentRequest {
    pub kind: String,
    pub file_name: String,
    pub content: String,
}

/// Admin decision on a vault request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub notes: Option<String>,
}

/// Query parameters for listing vault requests.
///
/// ## Example URL
///
/// ```text
/// GET /api/vault-requests?status=pending
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRequestQuery {
    pub status: Option<String>,
}

/// Query parameters for the WebSocket upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsQuery {
    pub token: String,
}
