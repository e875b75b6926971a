//! # Store Module
//!
//! One entry point for persistence, whichever engine is configured.
//!
//! ```text
//!                 ┌──────────────┐
//!   services ───> │    Store     │
//!                 └──────┬───────┘
//!            ┌───────────┴───────────┐
//!            ▼                       ▼
//!   ┌─────────────────┐     ┌─────────────────┐
//!   │  MemoryStore    │     │    Database     │
//!   │  (RwLock maps)  │     │ (deadpool + pg) │
//!   └─────────────────┘     └─────────────────┘
//! ```
//!
//! Both engines honour the same contract:
//!
//! - owner-scoped lookups, updates and deletes never reach another
//!   owner's rows
//! - emails are unique per user and per (owner, nominee), ignoring case;
//!   a clash is reported as [`StoreError::Conflict`]
//! - [`Store::transition_vault_request`] is a compare-and-set on status

pub mod memory;

use thiserror::Error;
use uuid::Uuid;

use crate::db::queries;
use crate::db::{
    AssetRecord, CategoryTotal, Database, DatabaseError, DocumentRecord, NomineeRecord, Role,
    Tally, TradingAccountRecord, UserRecord, VaultRequestFilter, VaultRequestRecord,
    VaultRequestStatus,
};

pub use memory::MemoryStore;

/// Errors returned by either storage engine.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness rule rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The PostgreSQL engine failed.
    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for StoreError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::UniqueViolation(what) => StoreError::Conflict(what),
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The configured storage engine.
#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Postgres(Database),
}

impl Store {
    /// Fresh, empty in-memory store.
    pub fn memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    /// Short name of the active engine, for logs and health output.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Postgres(_) => "postgres",
        }
    }

    /// Whether the engine can serve queries.
    pub async fn ping(&self) -> bool {
        match self {
            Store::Memory(_) => true,
            Store::Postgres(db) => db.ping().await,
        }
    }

    // ==========================================
    // USERS
    // ==========================================

    pub async fn insert_user(&self, user: &UserRecord) -> StoreResult<()> {
        match self {
            Store::Memory(m) => m.insert_user(user).await,
            Store::Postgres(db) => Ok(queries::insert_user(db.pool(), user).await?),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        match self {
            Store::Memory(m) => Ok(m.find_user_by_email(email).await),
            Store::Postgres(db) => Ok(queries::find_user_by_email(db.pool(), email).await?),
        }
    }

    pub async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        match self {
            Store::Memory(m) => Ok(m.find_user_by_id(id).await),
            Store::Postgres(db) => Ok(queries::find_user_by_id(db.pool(), id).await?),
        }
    }

    pub async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        match self {
            Store::Memory(m) => Ok(m.list_users().await),
            Store::Postgres(db) => Ok(queries::list_users(db.pool()).await?),
        }
    }

    pub async fn count_users_by_role(&self) -> StoreResult<Vec<Tally<Role>>> {
        match self {
            Store::Memory(m) => Ok(m.count_users_by_role().await),
            Store::Postgres(db) => Ok(queries::count_users_by_role(db.pool()).await?),
        }
    }

    // ==========================================
    // ASSETS
    // ==========================================

    pub async fn insert_asset(&self, asset: &AssetRecord) -> StoreResult<()> {
        match self {
            Store::Memory(m) => m.insert_asset(asset).await,
            Store::Postgres(db) => Ok(queries::insert_asset(db.pool(), asset).await?),
        }
    }

    pub async fn list_assets(&self, owner_id: Uuid) -> StoreResult<Vec<AssetRecord>> {
        match self {
            Store::Memory(m) => Ok(m.list_assets(owner_id).await),
            Store::Postgres(db) => Ok(queries::list_assets(db.pool(), owner_id).await?),
        }
    }

    pub async fn find_asset(&self, owner_id: Uuid, id: Uuid) -> StoreResult<Option<AssetRecord>> {
        match self {
            Store::Memory(m) => Ok(m.find_asset(owner_id, id).await),
            Store::Postgres(db) => Ok(queries::find_asset(db.pool(), owner_id, id).await?),
        }
    }

    pub async fn update_asset(&self, asset: &AssetRecord) -> StoreResult<bool> {
        match self {
            Store::Memory(m) => Ok(m.update_asset(asset).await),
            Store::Postgres(db) => Ok(queries::update_asset(db.pool(), asset).await?),
        }
    }

    pub async fn delete_asset(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        match self {
            Store::Memory(m) => Ok(m.delete_asset(owner_id, id).await),
            Store::Postgres(db) => Ok(queries::delete_asset(db.pool(), owner_id, id).await?),
        }
    }

    pub async fn asset_totals(&self, owner_id: Option<Uuid>) -> StoreResult<Vec<CategoryTotal>> {
        match self {
            Store::Memory(m) => Ok(m.asset_totals(owner_id).await),
            Store::Postgres(db) => Ok(queries::asset_totals(db.pool(), owner_id).await?),
        }
    }

    // ==========================================
    // NOMINEES
    // ==========================================

    pub async fn insert_nominee(&self, nominee: &NomineeRecord) -> StoreResult<()> {
        match self {
            Store::Memory(m) => m.insert_nominee(nominee).await,
            Store::Postgres(db) => Ok(queries::insert_nominee(db.pool(), nominee).await?),
        }
    }

    pub async fn list_nominees(&self, owner_id: Uuid) -> StoreResult<Vec<NomineeRecord>> {
        match self {
            Store::Memory(m) => Ok(m.list_nominees(owner_id).await),
            Store::Postgres(db) => Ok(queries::list_nominees(db.pool(), owner_id).await?),
        }
    }

    pub async fn find_nominee(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<NomineeRecord>> {
        match self {
            Store::Memory(m) => Ok(m.find_nominee(owner_id, id).await),
            Store::Postgres(db) => Ok(queries::find_nominee(db.pool(), owner_id, id).await?),
        }
    }

    pub async fn update_nominee(&self, nominee: &NomineeRecord) -> StoreResult<bool> {
        match self {
            Store::Memory(m) => m.update_nominee(nominee).await,
            Store::Postgres(db) => Ok(queries::update_nominee(db.pool(), nominee).await?),
        }
    }

    pub async fn delete_nominee(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        match self {
            Store::Memory(m) => Ok(m.delete_nominee(owner_id, id).await),
            Store::Postgres(db) => Ok(queries::delete_nominee(db.pool(), owner_id, id).await?),
        }
    }

    pub async fn find_nominations_by_email(&self, email: &str) -> StoreResult<Vec<NomineeRecord>> {
        match self {
            Store::Memory(m) => Ok(m.find_nominations_by_email(email).await),
            Store::Postgres(db) => Ok(queries::find_nominations_by_email(db.pool(), email).await?),
        }
    }

    // ==========================================
    // TRADING ACCOUNTS
    // ==========================================

    pub async fn insert_trading_account(&self, account: &TradingAccountRecord) -> StoreResult<()> {
        match self {
            Store::Memory(m) => m.insert_trading_account(account).await,
            Store::Postgres(db) => Ok(queries::insert_trading_account(db.pool(), account).await?),
        }
    }

    pub async fn list_trading_accounts(
        &self,
        owner_id: Uuid,
    ) -> StoreResult<Vec<TradingAccountRecord>> {
        match self {
            Store::Memory(m) => Ok(m.list_trading_accounts(owner_id).await),
            Store::Postgres(db) => Ok(queries::list_trading_accounts(db.pool(), owner_id).await?),
        }
    }

    pub async fn find_trading_account(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<TradingAccountRecord>> {
        match self {
            Store::Memory(m) => Ok(m.find_trading_account(owner_id, id).await),
            Store::Postgres(db) => {
                Ok(queries::find_trading_account(db.pool(), owner_id, id).await?)
            }
        }
    }

    pub async fn update_trading_account(&self, account: &TradingAccountRecord) -> StoreResult<bool> {
        match self {
            Store::Memory(m) => Ok(m.update_trading_account(account).await),
            Store::Postgres(db) => Ok(queries::update_trading_account(db.pool(), account).await?),
        }
    }

    pub async fn delete_trading_account(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        match self {
            Store::Memory(m) => Ok(m.delete_trading_account(owner_id, id).await),
            Store::Postgres(db) => {
                Ok(queries::delete_trading_account(db.pool(), owner_id, id).await?)
            }
        }
    }

    // ==========================================
    // VAULT REQUESTS
    // ==========================================

    pub async fn insert_vault_request(&self, request: &VaultRequestRecord) -> StoreResult<()> {
        match self {
            Store::Memory(m) => m.insert_vault_request(request).await,
            Store::Postgres(db) => Ok(queries::insert_vault_request(db.pool(), request).await?),
        }
    }

    pub async fn find_vault_request(&self, id: Uuid) -> StoreResult<Option<VaultRequestRecord>> {
        match self {
            Store::Memory(m) => Ok(m.find_vault_request(id).await),
            Store::Postgres(db) => Ok(queries::find_vault_request(db.pool(), id).await?),
        }
    }

    pub async fn list_vault_requests(
        &self,
        filter: &VaultRequestFilter,
    ) -> StoreResult<Vec<VaultRequestRecord>> {
        match self {
            Store::Memory(m) => Ok(m.list_vault_requests(filter).await),
            Store::Postgres(db) => Ok(queries::list_vault_requests(db.pool(), filter).await?),
        }
    }

    /// Persist `updated` only if the stored status is still `expected`.
    pub async fn transition_vault_request(
        &self,
        updated: &VaultRequestRecord,
        expected: VaultRequestStatus,
    ) -> StoreResult<bool> {
        match self {
            Store::Memory(m) => Ok(m.transition_vault_request(updated, expected).await),
            Store::Postgres(db) => {
                Ok(queries::transition_vault_request(db.pool(), updated, expected).await?)
            }
        }
    }

    pub async fn count_vault_requests_by_status(
        &self,
        owner_id: Option<Uuid>,
    ) -> StoreResult<Vec<Tally<VaultRequestStatus>>> {
        match self {
            Store::Memory(m) => Ok(m.count_vault_requests_by_status(owner_id).await),
            Store::Postgres(db) => {
                Ok(queries::count_vault_requests_by_status(db.pool(), owner_id).await?)
            }
        }
    }

    // ==========================================
    // DOCUMENTS
    // ==========================================

    pub async fn insert_document(&self, doc: &DocumentRecord) -> StoreResult<()> {
        match self {
            Store::Memory(m) => m.insert_document(doc).await,
            Store::Postgres(db) => Ok(queries::insert_document(db.pool(), doc).await?),
        }
    }

    pub async fn find_documents_by_hash(&self, sha256: &str) -> StoreResult<Vec<DocumentRecord>> {
        match self {
            Store::Memory(m) => Ok(m.find_documents_by_hash(sha256).await),
            Store::Postgres(db) => Ok(queries::find_documents_by_hash(db.pool(), sha256).await?),
        }
    }

    pub async fn list_documents(&self, vault_request_id: Uuid) -> StoreResult<Vec<DocumentRecord>> {
        match self {
            Store::Memory(m) => Ok(m.list_documents(vault_request_id).await),
            Store::Postgres(db) => Ok(queries::list_documents(db.pool(), vault_request_id).await?),
        }
    }
}
