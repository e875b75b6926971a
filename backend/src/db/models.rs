//! # Database Models
//!
//! This module defines the data structures that map to database tables.
//! Each struct represents a row in a table.
//!
//! ## Table Overview
//!
//! | Table | Description |
//! |-------|-------------|
//! | `users` | Account holders, nominees and admins |
//! | `assets` | Financial holdings registered by an owner |
//! | `nominees` | People named by an owner, with allocation percentages |
//! | `trading_accounts` | Broker accounts registered by an owner |
//! | `vault_requests` | Claims raised by nominees, reviewed by admins |
//! | `vault_documents` | Supporting documents and their validation result |
//!
//! ## Relationship Diagram
//!
//! ```text
//! ┌─────────────┐       ┌──────────────────┐
//! │   users     │──────<│     assets       │
//! │             │       │ owner_id (FK)    │
//! │ id (PK)     │       └──────────────────┘
//! │ email       │       ┌──────────────────┐
//! │ role        │──────<│    nominees      │
//! └─────────────┘       │ owner_id (FK)    │
//!        │              └──────────────────┘
//!        │                       │
//!        ▼                       ▼
//! ┌──────────────────┐   ┌──────────────────┐
//! │ vault_requests   │──<│ vault_documents  │
//! │ requester_id(FK) │   │ sha256           │
//! │ owner_id (FK)    │   │ verdict          │
//! └──────────────────┘   └──────────────────┘
//! ```
//!
//! Enumerations are stored as snake_case text columns and parsed back
//! with `FromStr`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when a text column holds an unknown enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a text-backed enum with `as_str`, `Display`, `FromStr` and
/// the list of accepted values.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident: $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every accepted value, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// The text stored in the database and sent over the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }

            /// Accepted values joined for error messages.
            pub fn accepted() -> String {
                [ $( $text ),+ ].join(", ")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $( $text => Ok($name::$variant), )+
                    other => Err(UnknownVariant {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Account role.
    Role: "role" {
        /// Registers assets and names nominees.
        User => "user",
        /// Claims assets through vault requests.
        Nominee => "nominee",
        /// Reviews vault requests.
        Admin => "admin",
    }
}

text_enum! {
    /// Kind of financial holding.
    AssetCategory: "asset category" {
        BankAccount => "bank_account",
        InsurancePolicy => "insurance_policy",
        TradingAccount => "trading_account",
        FixedDeposit => "fixed_deposit",
        MutualFund => "mutual_fund",
        RealEstate => "real_estate",
        Other => "other",
    }
}

text_enum! {
    /// Segment a trading account trades in.
    TradingAccountType: "trading account type" {
        Equity => "equity",
        Commodity => "commodity",
        Derivatives => "derivatives",
        Currency => "currency",
    }
}

text_enum! {
    /// Whether a trading account is still open.
    TradingAccountStatus: "trading account status" {
        Active => "active",
        Closed => "closed",
    }
}

text_enum! {
    /// Lifecycle of a vault request.
    ///
    /// ```text
    ///            ┌──> approved   (admin)
    /// pending ───┼──> rejected   (admin)
    ///            └──> cancelled  (requester)
    /// ```
    VaultRequestStatus: "vault request status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

impl VaultRequestStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: VaultRequestStatus) -> bool {
        matches!(
            (self, next),
            (
                VaultRequestStatus::Pending,
                VaultRequestStatus::Approved
                    | VaultRequestStatus::Rejected
                    | VaultRequestStatus::Cancelled
            )
        )
    }
}

text_enum! {
    /// What a supporting document claims to be.
    DocumentKind: "document kind" {
        DeathCertificate => "death_certificate",
        IdentityProof => "identity_proof",
        RelationshipProof => "relationship_proof",
        Other => "other",
    }
}

text_enum! {
    /// Outcome of document validation.
    DocumentVerdict: "document verdict" {
        /// Keyword score reached the threshold with no red flags.
        Verified => "verified",
        /// Not enough evidence either way; a human has to look.
        NeedsReview => "needs_review",
        /// Red-flag wording or a name mismatch was found.
        Suspicious => "suspicious",
        /// The same file is already attached to another request.
        Duplicate => "duplicate",
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,

    /// Lower-cased email, unique across users.
    pub email: String,

    pub name: String,

    /// Argon2 PHC string.
    pub password_hash: String,

    pub role: Role,

    pub phone: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A financial holding owned by a user.
///
/// `current_value` is in minor currency units (1 INR = 100).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub category: AssetCategory,
    pub institution: String,

    /// Stored in full, masked whenever it leaves the service.
    pub account_number: Option<String>,

    pub current_value: i64,

    /// ISO 4217 code.
    pub currency: String,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person named by an owner to inherit a share of their assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NomineeRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,

    /// Lower-cased. Links the nominee to a registered account at claim time.
    pub email: String,

    pub relationship: String,
    pub phone: Option<String>,

    /// Share of the owner's assets, `0 < pct <= 100`.
    pub allocation_percentage: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A broker account owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingAccountRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub broker: String,
    pub account_number: String,
    pub client_id: Option<String>,
    pub account_type: TradingAccountType,
    pub current_value: i64,
    pub currency: String,
    pub status: TradingAccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A nominee's claim on an owner's assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRequestRecord {
    pub id: Uuid,

    /// Account that raised the request.
    pub requester_id: Uuid,

    /// Account whose assets are claimed.
    pub owner_id: Uuid,

    /// Nominee entry on the owner's side that matched the requester.
    pub nominee_id: Uuid,

    pub relationship: String,
    pub message: Option<String>,
    pub status: VaultRequestStatus,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A supporting document attached to a vault request.
///
/// Only the fingerprint and validation outcome are kept, not the content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub vault_request_id: Uuid,
    pub kind: DocumentKind,
    pub file_name: String,

    /// Lower-case hex SHA-256 of the decoded content.
    pub sha256: String,

    pub size_bytes: i64,

    /// Keyword score in `0.0..=1.0`.
    pub score: f64,

    pub verdict: DocumentVerdict,
    pub flags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Asset count and value for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: AssetCategory,
    pub count: i64,
    pub total_value: i64,
}

/// Row count grouped by an enum column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally<K> {
    pub key: K,
    pub count: i64,
}

/// Filter for listing vault requests. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct VaultRequestFilter {
    pub requester_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub status: Option<VaultRequestStatus>,
}

impl VaultRequestFilter {
    /// Whether `record` passes this filter.
    pub fn matches(&self, record: &VaultRequestRecord) -> bool {
        self.requester_id.map_or(true, |id| record.requester_id == id)
            && self.owner_id.map_or(true, |id| record.owner_id == id)
            && self.status.map_or(true, |s| record.status == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_enum_round_trip_values() {
        assert_eq!(AssetCategory::InsurancePolicy.as_str(), "insurance_policy");
        assert_eq!(
            "insurance_policy".parse::<AssetCategory>().unwrap(),
            AssetCategory::InsurancePolicy
        );
        let err = "crypto".parse::<AssetCategory>().unwrap_err();
        assert_eq!(err.kind, "asset category");
        assert_eq!(err.value, "crypto");
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&DocumentVerdict::NeedsReview).unwrap();
        assert_eq!(json, "\"needs_review\"");
    }

    #[test]
    fn test_vault_request_transitions() {
        use VaultRequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }
}
