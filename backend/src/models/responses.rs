//! # API Response Models
//!
//! Structures for outgoing API response bodies.
//! All responses are wrapped in a standard format.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    AssetCategory, AssetRecord, DocumentKind, DocumentRecord, DocumentVerdict, NomineeRecord, Role,
    TradingAccountRecord, TradingAccountStatus, TradingAccountType, UserRecord, VaultRequestRecord,
    VaultRequestStatus,
};
use crate::utils::{format_amount, mask_account_number};

/// Currency used when summing values across records.
pub const DEFAULT_CURRENCY: &str = "INR";

/// Standard API response wrapper.
///
/// All API responses follow this format:
///
/// ## Success Response
///
/// ```json
/// {
///     "success": true,
///     "data": { ... },
///     "error": null
/// }
/// ```
///
/// ## Error Response
///
/// ```json
/// {
///     "success": false,
///     "data": null,
///     "error": {
///         "code": "NOT_FOUND",
///         "message": "Asset not found"
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the request was successful.
    pub success: bool,

    /// Response data (null on error).
    pub data: Option<T>,

    /// Error information (null on success).
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// API error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Error code (e.g., "VALIDATION_ERROR").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

// ==========================================
// AUTH
// ==========================================

/// Public view of a user. Never includes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserProfile {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
            role: u.role,
            phone: u.phone.clone(),
            created_at: u.created_at,
        }
    }
}

/// Returned by register and login.
///
/// ```json
/// {
///     "token": "eyJhbGciOi...",
///     "tokenType": "Bearer",
///     "expiresIn": 86400,
///     "user": { "id": "...", "email": "asha@example.com", "role": "user", ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub user: UserProfile,
}

// ==========================================
// ASSETS
// ==========================================

/// Asset as returned to its owner. The account number is masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    pub id: Uuid,
    pub name: String,
    pub category: AssetCategory,
    pub institution: String,
    pub account_number: Option<String>,
    pub current_value: i64,
    /// Human-readable value, e.g. "250,000.00 INR".
    pub formatted_value: String,
    pub currency: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AssetRecord> for AssetResponse {
    fn from(a: &AssetRecord) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            category: a.category,
            institution: a.institution.clone(),
            account_number: a.account_number.as_deref().map(mask_account_number),
            current_value: a.current_value,
            formatted_value: format_amount(a.current_value, &a.currency),
            currency: a.currency.clone(),
            notes: a.notes.clone(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Trading account as returned to its owner. The account number is masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingAccountResponse {
    pub id: Uuid,
    pub broker: String,
    pub account_number: String,
    pub client_id: Option<String>,
    pub account_type: TradingAccountType,
    pub current_value: i64,
    pub formatted_value: String,
    pub currency: String,
    pub status: TradingAccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&TradingAccountRecord> for TradingAccountResponse {
    fn from(t: &TradingAccountRecord) -> Self {
        Self {
            id: t.id,
            broker: t.broker.clone(),
            account_number: mask_account_number(&t.account_number),
            client_id: t.client_id.clone(),
            account_type: t.account_type,
            current_value: t.current_value,
            formatted_value: format_amount(t.current_value, &t.currency),
            currency: t.currency.clone(),
            status: t.status,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

// ==========================================
// NOMINEES
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineeResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub relationship: String,
    pub phone: Option<String>,
    pub allocation_percentage: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&NomineeRecord> for NomineeResponse {
    fn from(n: &NomineeRecord) -> Self {
        Self {
            id: n.id,
            name: n.name.clone(),
            email: n.email.clone(),
            relationship: n.relationship.clone(),
            phone: n.phone.clone(),
            allocation_percentage: n.allocation_percentage,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}

/// An owner who named the caller as nominee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NominationResponse {
    pub nominee_id: Uuid,
    pub owner_name: String,
    pub owner_email: String,
    pub relationship: String,
    pub allocation_percentage: f64,
}

/// Nominee list plus how much of the estate is still unassigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineeListResponse {
    pub nominees: Vec<NomineeResponse>,
    pub allocated_percentage: f64,
    pub unallocated_percentage: f64,
}

// ==========================================
// VAULT REQUESTS
// ==========================================

/// Stored outcome of document validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub file_name: String,
    pub sha256: String,
    pub size_bytes: i64,
    pub score: f64,
    pub verdict: DocumentVerdict,
    pub flags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&DocumentRecord> for DocumentResponse {
    fn from(d: &DocumentRecord) -> Self {
        Self {
            id: d.id,
            kind: d.kind,
            file_name: d.file_name.clone(),
            sha256: d.sha256.clone(),
            size_bytes: d.size_bytes,
            score: d.score,
            verdict: d.verdict,
            flags: d.flags.clone(),
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRequestResponse {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub nominee_id: Uuid,
    pub relationship: String,
    pub message: Option<String>,
    pub status: VaultRequestStatus,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub documents: Vec<DocumentResponse>,
}

impl VaultRequestResponse {
    pub fn new(r: &VaultRequestRecord, documents: &[DocumentRecord]) -> Self {
        Self {
            id: r.id,
            requester_id: r.requester_id,
            owner_id: r.owner_id,
            nominee_id: r.nominee_id,
            relationship: r.relationship.clone(),
            message: r.message.clone(),
            status: r.status,
            admin_notes: r.admin_notes.clone(),
            reviewed_by: r.reviewed_by,
            reviewed_at: r.reviewed_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
            documents: documents.iter().map(DocumentResponse::from).collect(),
        }
    }
}

/// An asset together with the nominee's share of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAsset {
    pub asset: AssetResponse,
    pub entitled_value: i64,
    pub formatted_entitled_value: String,
}

/// A trading account together with the nominee's share of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedTradingAccount {
    pub account: TradingAccountResponse,
    pub entitled_value: i64,
    pub formatted_entitled_value: String,
}

/// What an approved vault request unlocks for its nominee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAssetsResponse {
    pub vault_request_id: Uuid,
    pub owner_name: String,
    pub allocation_percentage: f64,
    pub assets: Vec<UnlockedAsset>,
    pub trading_accounts: Vec<UnlockedTradingAccount>,
    pub total_value: i64,
    pub entitled_total: i64,
    pub formatted_entitled_total: String,
}

// ==========================================
// DASHBOARD
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category: AssetCategory,
    pub count: i64,
    pub total_value: i64,
    /// Share of the owner's total asset value, 0 - 100.
    pub share_percentage: f64,
}

/// Returned by `GET /api/dashboard/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerStatsResponse {
    pub asset_count: i64,
    pub total_asset_value: i64,
    pub formatted_total_value: String,
    pub assets_by_category: Vec<CategoryBreakdown>,
    pub trading_account_count: i64,
    pub trading_account_value: i64,
    pub nominee_count: i64,
    pub allocated_percentage: f64,
    pub unallocated_percentage: f64,
    /// Vault requests raised against this owner, by status.
    pub vault_requests: BTreeMap<String, i64>,
}

/// Returned by `GET /api/admin/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsResponse {
    pub total_users: i64,
    pub users_by_role: BTreeMap<String, i64>,
    pub total_assets: i64,
    pub total_asset_value: i64,
    pub formatted_total_value: String,
    pub vault_requests_by_status: BTreeMap<String, i64>,
    pub pending_vault_requests: i64,
}

// ==========================================
// MISC
// ==========================================

/// Returned by delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub id: Uuid,
    pub deleted: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status: "healthy" or "unhealthy".
    pub status: String,

    /// Active storage engine ("memory" or "postgres").
    pub storage: String,

    /// Whether the storage engine answered.
    pub storage_ok: bool,

    /// Service version.
    pub version: String,

    /// Current timestamp.
    pub timestamp: DateTime<Utc>,
}
