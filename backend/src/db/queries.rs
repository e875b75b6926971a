//! # Database Queries
//!
//! This module contains all the SQL queries for interacting with the database.
//! Each function performs a specific database operation.
//!
//! ## Query Organization
//!
//! Queries are grouped by the table they operate on:
//! - `*_user*` - Users table
//! - `*_asset*` - Assets table
//! - `*_nominee*` / `*_nominations*` - Nominees table
//! - `*_trading_account*` - Trading accounts table
//! - `*_vault_request*` - Vault requests table
//! - `*_document*` - Vault documents table
//!
//! Owner-scoped statements always carry `owner_id` in their `WHERE`
//! clause, so a caller can never reach another owner's rows by id.
//!
//! ## Error Handling
//!
//! All queries return `Result<T, DatabaseError>`. Lookups return
//! `Ok(None)` for missing rows; updates and deletes return whether a row
//! was affected.

use deadpool_postgres::{Client, Pool};
use tokio_postgres::Row;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::*;
use super::DatabaseError;

// ============================================
// HELPER FUNCTIONS
// ============================================

async fn client(pool: &Pool) -> Result<Client, DatabaseError> {
    pool.get()
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))
}

fn row_to_user(row: &Row) -> Result<UserRecord, DatabaseError> {
    Ok(UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        role: row.get::<_, String>("role").parse()?,
        phone: row.get("phone"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_asset(row: &Row) -> Result<AssetRecord, DatabaseError> {
    Ok(AssetRecord {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        category: row.get::<_, String>("category").parse()?,
        institution: row.get("institution"),
        account_number: row.get("account_number"),
        current_value: row.get("current_value"),
        currency: row.get("currency"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_nominee(row: &Row) -> Result<NomineeRecord, DatabaseError> {
    Ok(NomineeRecord {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        email: row.get("email"),
        relationship: row.get("relationship"),
        phone: row.get("phone"),
        allocation_percentage: row.get("allocation_percentage"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_trading_account(row: &Row) -> Result<TradingAccountRecord, DatabaseError> {
    Ok(TradingAccountRecord {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        broker: row.get("broker"),
        account_number: row.get("account_number"),
        client_id: row.get("client_id"),
        account_type: row.get::<_, String>("account_type").parse()?,
        current_value: row.get("current_value"),
        currency: row.get("currency"),
        status: row.get::<_, String>("status").parse()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_vault_request(row: &Row) -> Result<VaultRequestRecord, DatabaseError> {
    Ok(VaultRequestRecord {
        id: row.get("id"),
        requester_id: row.get("requester_id"),
        owner_id: row.get("owner_id"),
        nominee_id: row.get("nominee_id"),
        relationship: row.get("relationship"),
        message: row.get("message"),
        status: row.get::<_, String>("status").parse()?,
        admin_notes: row.get("admin_notes"),
        reviewed_by: row.get("reviewed_by"),
        reviewed_at: row.get("reviewed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_document(row: &Row) -> Result<DocumentRecord, DatabaseError> {
    Ok(DocumentRecord {
        id: row.get("id"),
        vault_request_id: row.get("vault_request_id"),
        kind: row.get::<_, String>("kind").parse()?,
        file_name: row.get("file_name"),
        sha256: row.get("sha256"),
        size_bytes: row.get("size_bytes"),
        score: row.get("score"),
        verdict: row.get::<_, String>("verdict").parse()?,
        flags: row.get("flags"),
        created_at: row.get("created_at"),
    })
}

fn collect<T>(
    rows: Vec<Row>,
    map: fn(&Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    rows.iter().map(map).collect()
}

const USER_COLUMNS: &str = "id, email, name, password_hash, role, phone, created_at, updated_at";

const ASSET_COLUMNS: &str = "id, owner_id, name, category, institution, account_number, \
     current_value, currency, notes, created_at, updated_at";

const NOMINEE_COLUMNS: &str = "id, owner_id, name, email, relationship, phone, \
     allocation_percentage, created_at, updated_at";

const TRADING_ACCOUNT_COLUMNS: &str = "id, owner_id, broker, account_number, client_id, \
     account_type, current_value, currency, status, created_at, updated_at";

const VAULT_REQUEST_COLUMNS: &str = "id, requester_id, owner_id, nominee_id, relationship, \
     message, status, admin_notes, reviewed_by, reviewed_at, created_at, updated_at";

const DOCUMENT_COLUMNS: &str = "id, vault_request_id, kind, file_name, sha256, size_bytes, \
     score, verdict, flags, created_at";

// ============================================
// USER QUERIES
// ============================================

/// Insert a new user. A taken email surfaces as `UniqueViolation`.
pub async fn insert_user(pool: &Pool, user: &UserRecord) -> Result<(), DatabaseError> {
    debug!("Inserting user: {}", user.email);

    let client = client(pool).await?;
    client
        .execute(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
            &[
                &user.id,
                &user.email,
                &user.name,
                &user.password_hash,
                &user.role.as_str(),
                &user.phone,
                &user.created_at,
                &user.updated_at,
            ],
        )
        .await?;

    info!("User created: {} ({})", user.id, user.role);
    Ok(())
}

/// Find a user by email, ignoring case.
pub async fn find_user_by_email(
    pool: &Pool,
    email: &str,
) -> Result<Option<UserRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
    let row = client.query_opt(sql.as_str(), &[&email]).await?;
    row.as_ref().map(row_to_user).transpose()
}

/// Find a user by id.
pub async fn find_user_by_id(pool: &Pool, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row = client.query_opt(sql.as_str(), &[&id]).await?;
    row.as_ref().map(row_to_user).transpose()
}

/// All users, newest first.
pub async fn list_users(pool: &Pool) -> Result<Vec<UserRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
    let rows = client.query(sql.as_str(), &[]).await?;
    collect(rows, row_to_user)
}

/// Number of users per role.
pub async fn count_users_by_role(pool: &Pool) -> Result<Vec<Tally<Role>>, DatabaseError> {
    let client = client(pool).await?;
    let rows = client
        .query(
            "SELECT role, COUNT(*) AS count FROM users GROUP BY role ORDER BY role",
            &[],
        )
        .await?;

    rows.iter()
        .map(|row| -> Result<Tally<Role>, DatabaseError> {
            Ok(Tally {
                key: row.get::<_, String>("role").parse()?,
                count: row.get("count"),
            })
        })
        .collect()
}

// ============================================
// ASSET QUERIES
// ============================================

/// Insert a new asset.
pub async fn insert_asset(pool: &Pool, asset: &AssetRecord) -> Result<(), DatabaseError> {
    debug!("Inserting asset {} for owner {}", asset.id, asset.owner_id);

    let client = client(pool).await?;
    client
        .execute(
            r#"
            INSERT INTO assets (
                id, owner_id, name, category, institution, account_number,
                current_value, currency, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
            &[
                &asset.id,
                &asset.owner_id,
                &asset.name,
                &asset.category.as_str(),
                &asset.institution,
                &asset.account_number,
                &asset.current_value,
                &asset.currency,
                &asset.notes,
                &asset.created_at,
                &asset.updated_at,
            ],
        )
        .await?;

    Ok(())
}

/// An owner's assets, newest first.
pub async fn list_assets(pool: &Pool, owner_id: Uuid) -> Result<Vec<AssetRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!(
        "SELECT {ASSET_COLUMNS} FROM assets WHERE owner_id = $1 ORDER BY created_at DESC"
    );
    let rows = client.query(sql.as_str(), &[&owner_id]).await?;
    collect(rows, row_to_asset)
}

/// One of an owner's assets.
pub async fn find_asset(
    pool: &Pool,
    owner_id: Uuid,
    id: Uuid,
) -> Result<Option<AssetRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1 AND owner_id = $2");
    let row = client.query_opt(sql.as_str(), &[&id, &owner_id]).await?;
    row.as_ref().map(row_to_asset).transpose()
}

/// Overwrite the mutable columns of an asset.
pub async fn update_asset(pool: &Pool, asset: &AssetRecord) -> Result<bool, DatabaseError> {
    let client = client(pool).await?;
    let affected = client
        .execute(
            r#"
            UPDATE assets
            SET name = $3, category = $4, institution = $5, account_number = $6,
                current_value = $7, currency = $8, notes = $9, updated_at = $10
            WHERE id = $1 AND owner_id = $2
            "#,
            &[
                &asset.id,
                &asset.owner_id,
                &asset.name,
                &asset.category.as_str(),
                &asset.institution,
                &asset.account_number,
                &asset.current_value,
                &asset.currency,
                &asset.notes,
                &asset.updated_at,
            ],
        )
        .await?;

    Ok(affected > 0)
}

/// Delete one of an owner's assets.
pub async fn delete_asset(pool: &Pool, owner_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
    let client = client(pool).await?;
    let affected = client
        .execute(
            "DELETE FROM assets WHERE id = $1 AND owner_id = $2",
            &[&id, &owner_id],
        )
        .await?;
    Ok(affected > 0)
}

/// Asset count and value per category, for one owner or everyone.
pub async fn asset_totals(
    pool: &Pool,
    owner_id: Option<Uuid>,
) -> Result<Vec<CategoryTotal>, DatabaseError> {
    let client = client(pool).await?;
    let rows = client
        .query(
            r#"
            SELECT
                category,
                COUNT(*) AS count,
                LEAST(COALESCE(SUM(current_value), 0), 9223372036854775807)::BIGINT AS total_value
            FROM assets
            WHERE ($1::UUID IS NULL OR owner_id = $1)
            GROUP BY category
            ORDER BY category
            "#,
            &[&owner_id],
        )
        .await?;

    rows.iter()
        .map(|row| -> Result<CategoryTotal, DatabaseError> {
            Ok(CategoryTotal {
                category: row.get::<_, String>("category").parse()?,
                count: row.get("count"),
                total_value: row.get("total_value"),
            })
        })
        .collect()
}

// ============================================
// NOMINEE QUERIES
// ============================================

/// Insert a nominee. The same email twice for one owner is a `UniqueViolation`.
pub async fn insert_nominee(pool: &Pool, nominee: &NomineeRecord) -> Result<(), DatabaseError> {
    debug!("Inserting nominee {} for owner {}", nominee.id, nominee.owner_id);

    let client = client(pool).await?;
    client
        .execute(
            r#"
            INSERT INTO nominees (
                id, owner_id, name, email, relationship, phone,
                allocation_percentage, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
            &[
                &nominee.id,
                &nominee.owner_id,
                &nominee.name,
                &nominee.email,
                &nominee.relationship,
                &nominee.phone,
                &nominee.allocation_percentage,
                &nominee.created_at,
                &nominee.updated_at,
            ],
        )
        .await?;

    Ok(())
}

/// An owner's nominees, oldest first.
pub async fn list_nominees(
    pool: &Pool,
    owner_id: Uuid,
) -> Result<Vec<NomineeRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!(
        "SELECT {NOMINEE_COLUMNS} FROM nominees WHERE owner_id = $1 ORDER BY created_at ASC"
    );
    let rows = client.query(sql.as_str(), &[&owner_id]).await?;
    collect(rows, row_to_nominee)
}

/// One of an owner's nominees.
pub async fn find_nominee(
    pool: &Pool,
    owner_id: Uuid,
    id: Uuid,
) -> Result<Option<NomineeRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!("SELECT {NOMINEE_COLUMNS} FROM nominees WHERE id = $1 AND owner_id = $2");
    let row = client.query_opt(sql.as_str(), &[&id, &owner_id]).await?;
    row.as_ref().map(row_to_nominee).transpose()
}

/// Overwrite the mutable columns of a nominee.
pub async fn update_nominee(pool: &Pool, nominee: &NomineeRecord) -> Result<bool, DatabaseError> {
    let client = client(pool).await?;
    let affected = client
        .execute(
            r#"
            UPDATE nominees
            SET name = $3, email = $4, relationship = $5, phone = $6,
                allocation_percentage = $7, updated_at = $8
            WHERE id = $1 AND owner_id = $2
            "#,
            &[
                &nominee.id,
                &nominee.owner_id,
                &nominee.name,
                &nominee.email,
                &nominee.relationship,
                &nominee.phone,
                &nominee.allocation_percentage,
                &nominee.updated_at,
            ],
        )
        .await?;

    Ok(affected > 0)
}

/// Delete one of an owner's nominees.
pub async fn delete_nominee(pool: &Pool, owner_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
    let client = client(pool).await?;
    let affected = client
        .execute(
            "DELETE FROM nominees WHERE id = $1 AND owner_id = $2",
            &[&id, &owner_id],
        )
        .await?;
    Ok(affected > 0)
}

/// Every nominee entry, across owners, that names `email`.
pub async fn find_nominations_by_email(
    pool: &Pool,
    email: &str,
) -> Result<Vec<NomineeRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!(
        "SELECT {NOMINEE_COLUMNS} FROM nominees WHERE LOWER(email) = LOWER($1) ORDER BY created_at ASC"
    );
    let rows = client.query(sql.as_str(), &[&email]).await?;
    collect(rows, row_to_nominee)
}

// ============================================
// TRADING ACCOUNT QUERIES
// ============================================

/// Insert a trading account.
pub async fn insert_trading_account(
    pool: &Pool,
    account: &TradingAccountRecord,
) -> Result<(), DatabaseError> {
    let client = client(pool).await?;
    client
        .execute(
            r#"
            INSERT INTO trading_accounts (
                id, owner_id, broker, account_number, client_id, account_type,
                current_value, currency, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
            &[
                &account.id,
                &account.owner_id,
                &account.broker,
                &account.account_number,
                &account.client_id,
                &account.account_type.as_str(),
                &account.current_value,
                &account.currency,
                &account.status.as_str(),
                &account.created_at,
                &account.updated_at,
            ],
        )
        .await?;

    Ok(())
}

/// An owner's trading accounts, newest first.
pub async fn list_trading_accounts(
    pool: &Pool,
    owner_id: Uuid,
) -> Result<Vec<TradingAccountRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!(
        "SELECT {TRADING_ACCOUNT_COLUMNS} FROM trading_accounts WHERE owner_id = $1 ORDER BY created_at DESC"
    );
    let rows = client.query(sql.as_str(), &[&owner_id]).await?;
    collect(rows, row_to_trading_account)
}

/// One of an owner's trading accounts.
pub async fn find_trading_account(
    pool: &Pool,
    owner_id: Uuid,
    id: Uuid,
) -> Result<Option<TradingAccountRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!(
        "SELECT {TRADING_ACCOUNT_COLUMNS} FROM trading_accounts WHERE id = $1 AND owner_id = $2"
    );
    let row = client.query_opt(sql.as_str(), &[&id, &owner_id]).await?;
    row.as_ref().map(row_to_trading_account).transpose()
}

/// Overwrite the mutable columns of a trading account.
pub async fn update_trading_account(
    pool: &Pool,
    account: &TradingAccountRecord,
) -> Result<bool, DatabaseError> {
    let client = client(pool).await?;
    let affected = client
        .execute(
            r#"
            UPDATE trading_accounts
            SET broker = $3, account_number = $4, client_id = $5, account_type = $6,
                current_value = $7, currency = $8, status = $9, updated_at = $10
            WHERE id = $1 AND owner_id = $2
            "#,
            &[
                &account.id,
                &account.owner_id,
                &account.broker,
                &account.account_number,
                &account.client_id,
                &account.account_type.as_str(),
                &account.current_value,
                &account.currency,
                &account.status.as_str(),
                &account.updated_at,
            ],
        )
        .await?;

    Ok(affected > 0)
}

/// Delete one of an owner's trading accounts.
pub async fn delete_trading_account(
    pool: &Pool,
    owner_id: Uuid,
    id: Uuid,
) -> Result<bool, DatabaseError> {
    let client = client(pool).await?;
    let affected = client
        .execute(
            "DELETE FROM trading_accounts WHERE id = $1 AND owner_id = $2",
            &[&id, &owner_id],
        )
        .await?;
    Ok(affected > 0)
}

// ============================================
// VAULT REQUEST QUERIES
// ============================================

/// Insert a vault request.
pub async fn insert_vault_request(
    pool: &Pool,
    request: &VaultRequestRecord,
) -> Result<(), DatabaseError> {
    let client = client(pool).await?;
    client
        .execute(
            r#"
            INSERT INTO vault_requests (
                id, requester_id, owner_id, nominee_id, relationship, message,
                status, admin_notes, reviewed_by, reviewed_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
            &[
                &request.id,
                &request.requester_id,
                &request.owner_id,
                &request.nominee_id,
                &request.relationship,
                &request.message,
                &request.status.as_str(),
                &request.admin_notes,
                &request.reviewed_by,
                &request.reviewed_at,
                &request.created_at,
                &request.updated_at,
            ],
        )
        .await?;

    info!("Vault request created: {}", request.id);
    Ok(())
}

/// Find a vault request by id.
pub async fn find_vault_request(
    pool: &Pool,
    id: Uuid,
) -> Result<Option<VaultRequestRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!("SELECT {VAULT_REQUEST_COLUMNS} FROM vault_requests WHERE id = $1");
    let row = client.query_opt(sql.as_str(), &[&id]).await?;
    row.as_ref().map(row_to_vault_request).transpose()
}

/// Vault requests matching `filter`, newest first.
pub async fn list_vault_requests(
    pool: &Pool,
    filter: &VaultRequestFilter,
) -> Result<Vec<VaultRequestRecord>, DatabaseError> {
    let client = client(pool).await?;
    let status = filter.status.map(|s| s.as_str());
    let sql = format!(
        r#"
        SELECT {VAULT_REQUEST_COLUMNS}
        FROM vault_requests
        WHERE ($1::UUID IS NULL OR requester_id = $1)
          AND ($2::UUID IS NULL OR owner_id = $2)
          AND ($3::TEXT IS NULL OR status = $3)
        ORDER BY created_at DESC
        "#
    );
    let rows = client
        .query(
            sql.as_str(),
            &[&filter.requester_id, &filter.owner_id, &status],
        )
        .await?;
    collect(rows, row_to_vault_request)
}

/// Write `updated` only if the stored status still equals `expected`.
///
/// Returns `false` when another writer changed the status first.
pub async fn transition_vault_request(
    pool: &Pool,
    updated: &VaultRequestRecord,
    expected: VaultRequestStatus,
) -> Result<bool, DatabaseError> {
    let client = client(pool).await?;
    let affected = client
        .execute(
            r#"
            UPDATE vault_requests
            SET status = $2, admin_notes = $3, reviewed_by = $4,
                reviewed_at = $5, updated_at = $6
            WHERE id = $1 AND status = $7
            "#,
            &[
                &updated.id,
                &updated.status.as_str(),
                &updated.admin_notes,
                &updated.reviewed_by,
                &updated.reviewed_at,
                &updated.updated_at,
                &expected.as_str(),
            ],
        )
        .await?;

    if affected > 0 {
        info!(
            "Vault request {} moved {} -> {}",
            updated.id, expected, updated.status
        );
    }
    Ok(affected > 0)
}

/// Number of vault requests per status, for one owner or everyone.
pub async fn count_vault_requests_by_status(
    pool: &Pool,
    owner_id: Option<Uuid>,
) -> Result<Vec<Tally<VaultRequestStatus>>, DatabaseError> {
    let client = client(pool).await?;
    let rows = client
        .query(
            r#"
            SELECT status, COUNT(*) AS count
            FROM vault_requests
            WHERE ($1::UUID IS NULL OR owner_id = $1)
            GROUP BY status
            ORDER BY status
            "#,
            &[&owner_id],
        )
        .await?;

    rows.iter()
        .map(|row| -> Result<Tally<VaultRequestStatus>, DatabaseError> {
            Ok(Tally {
                key: row.get::<_, String>("status").parse()?,
                count: row.get("count"),
            })
        })
        .collect()
}

// ============================================
// DOCUMENT QUERIES
// ============================================

/// Insert a validated document.
pub async fn insert_document(pool: &Pool, doc: &DocumentRecord) -> Result<(), DatabaseError> {
    let client = client(pool).await?;
    client
        .execute(
            r#"
            INSERT INTO vault_documents (
                id, vault_request_id, kind, file_name, sha256, size_bytes,
                score, verdict, flags, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
            &[
                &doc.id,
                &doc.vault_request_id,
                &doc.kind.as_str(),
                &doc.file_name,
                &doc.sha256,
                &doc.size_bytes,
                &doc.score,
                &doc.verdict.as_str(),
                &doc.flags,
                &doc.created_at,
            ],
        )
        .await?;

    Ok(())
}

/// Every stored document with the given fingerprint.
pub async fn find_documents_by_hash(
    pool: &Pool,
    sha256: &str,
) -> Result<Vec<DocumentRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM vault_documents WHERE sha256 = $1");
    let rows = client.query(sql.as_str(), &[&sha256]).await?;
    collect(rows, row_to_document)
}

/// Documents attached to a vault request, oldest first.
pub async fn list_documents(
    pool: &Pool,
    vault_request_id: Uuid,
) -> Result<Vec<DocumentRecord>, DatabaseError> {
    let client = client(pool).await?;
    let sql = format!(
        "SELECT {DOCUMENT_COLUMNS} FROM vault_documents WHERE vault_request_id = $1 ORDER BY created_at ASC"
    );
    let rows = client.query(sql.as_str(), &[&vault_request_id]).await?;
    collect(rows, row_to_document)
}
