//! In-memory storage engine.
//!
//! Backs the demo server and the test suite. All tables live behind a
//! single `tokio::sync::RwLock`, so every operation is atomic with respect
//! to the others, including the vault-request compare-and-set.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult};
use crate::db::{
    AssetCategory, AssetRecord, CategoryTotal, DocumentRecord, NomineeRecord, Role, Tally,
    TradingAccountRecord, UserRecord, VaultRequestFilter, VaultRequestRecord, VaultRequestStatus,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    assets: HashMap<Uuid, AssetRecord>,
    nominees: HashMap<Uuid, NomineeRecord>,
    trading_accounts: HashMap<Uuid, TradingAccountRecord>,
    vault_requests: HashMap<Uuid, VaultRequestRecord>,
    documents: HashMap<Uuid, DocumentRecord>,
}

/// Process-local store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

fn same_email(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================
    // USERS
    // ==========================================

    pub async fn insert_user(&self, user: &UserRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| same_email(&u.email, &user.email)) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    pub async fn find_user_by_email(&self, email: &str) -> Option<UserRecord> {
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|u| same_email(&u.email, email))
            .cloned()
    }

    pub async fn find_user_by_id(&self, id: Uuid) -> Option<UserRecord> {
        self.tables.read().await.users.get(&id).cloned()
    }

    pub async fn list_users(&self) -> Vec<UserRecord> {
        let tables = self.tables.read().await;
        let mut users: Vec<_> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users
    }

    pub async fn count_users_by_role(&self) -> Vec<Tally<Role>> {
        let tables = self.tables.read().await;
        let mut counts: BTreeMap<&'static str, (Role, i64)> = BTreeMap::new();
        for user in tables.users.values() {
            counts.entry(user.role.as_str()).or_insert((user.role, 0)).1 += 1;
        }
        counts
            .into_values()
            .map(|(key, count)| Tally { key, count })
            .collect()
    }

    // ==========================================
    // ASSETS
    // ==========================================

    pub async fn insert_asset(&self, asset: &AssetRecord) -> StoreResult<()> {
        self.tables.write().await.assets.insert(asset.id, asset.clone());
        Ok(())
    }

    pub async fn list_assets(&self, owner_id: Uuid) -> Vec<AssetRecord> {
        let tables = self.tables.read().await;
        let mut assets: Vec<_> = tables
            .assets
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        assets
    }

    pub async fn find_asset(&self, owner_id: Uuid, id: Uuid) -> Option<AssetRecord> {
        let tables = self.tables.read().await;
        tables
            .assets
            .get(&id)
            .filter(|a| a.owner_id == owner_id)
            .cloned()
    }

    pub async fn update_asset(&self, asset: &AssetRecord) -> bool {
        let mut tables = self.tables.write().await;
        match tables.assets.get_mut(&asset.id) {
            Some(existing) if existing.owner_id == asset.owner_id => {
                *existing = asset.clone();
                true
            }
            _ => false,
        }
    }

    pub async fn delete_asset(&self, owner_id: Uuid, id: Uuid) -> bool {
        let mut tables = self.tables.write().await;
        let owned = tables
            .assets
            .get(&id)
            .map_or(false, |a| a.owner_id == owner_id);
        owned && tables.assets.remove(&id).is_some()
    }

    pub async fn asset_totals(&self, owner_id: Option<Uuid>) -> Vec<CategoryTotal> {
        let tables = self.tables.read().await;
        let mut totals: BTreeMap<&'static str, CategoryTotal> = BTreeMap::new();
        for asset in tables
            .assets
            .values()
            .filter(|a| owner_id.map_or(true, |id| a.owner_id == id))
        {
            let entry = totals
                .entry(asset.category.as_str())
                .or_insert_with(|| empty_total(asset.category));
            entry.count += 1;
            entry.total_value = entry.total_value.saturating_add(asset.current_value);
        }
        totals.into_values().collect()
    }

    // ==========================================
    // NOMINEES
    // ==========================================

    pub async fn insert_nominee(&self, nominee: &NomineeRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .nominees
            .values()
            .any(|n| n.owner_id == nominee.owner_id && same_email(&n.email, &nominee.email))
        {
            return Err(StoreError::Conflict("nominees_owner_email_key".to_string()));
        }
        tables.nominees.insert(nominee.id, nominee.clone());
        Ok(())
    }

    pub async fn list_nominees(&self, owner_id: Uuid) -> Vec<NomineeRecord> {
        let tables = self.tables.read().await;
        let mut nominees: Vec<_> = tables
            .nominees
            .values()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect();
        nominees.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        nominees
    }

    pub async fn find_nominee(&self, owner_id: Uuid, id: Uuid) -> Option<NomineeRecord> {
        let tables = self.tables.read().await;
        tables
            .nominees
            .get(&id)
            .filter(|n| n.owner_id == owner_id)
            .cloned()
    }

    pub async fn update_nominee(&self, nominee: &NomineeRecord) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.nominees.values().any(|n| {
            n.id != nominee.id
                && n.owner_id == nominee.owner_id
                && same_email(&n.email, &nominee.email)
        }) {
            return Err(StoreError::Conflict("nominees_owner_email_key".to_string()));
        }
        match tables.nominees.get_mut(&nominee.id) {
            Some(existing) if existing.owner_id == nominee.owner_id => {
                *existing = nominee.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn delete_nominee(&self, owner_id: Uuid, id: Uuid) -> bool {
        let mut tables = self.tables.write().await;
        let owned = tables
            .nominees
            .get(&id)
            .map_or(false, |n| n.owner_id == owner_id);
        owned && tables.nominees.remove(&id).is_some()
    }

    pub async fn find_nominations_by_email(&self, email: &str) -> Vec<NomineeRecord> {
        let tables = self.tables.read().await;
        let mut found: Vec<_> = tables
            .nominees
            .values()
            .filter(|n| same_email(&n.email, email))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        found
    }

    // ==========================================
    // TRADING ACCOUNTS
    // ==========================================

    pub async fn insert_trading_account(&self, account: &TradingAccountRecord) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .trading_accounts
            .insert(account.id, account.clone());
        Ok(())
    }

    pub async fn list_trading_accounts(&self, owner_id: Uuid) -> Vec<TradingAccountRecord> {
        let tables = self.tables.read().await;
        let mut accounts: Vec<_> = tables
            .trading_accounts
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        accounts
    }

    pub async fn find_trading_account(&self, owner_id: Uuid, id: Uuid) -> Option<TradingAccountRecord> {
        let tables = self.tables.read().await;
        tables
            .trading_accounts
            .get(&id)
            .filter(|a| a.owner_id == owner_id)
            .cloned()
    }

    pub async fn update_trading_account(&self, account: &TradingAccountRecord) -> bool {
        let mut tables = self.tables.write().await;
        match tables.trading_accounts.get_mut(&account.id) {
            Some(existing) if existing.owner_id == account.owner_id => {
                *existing = account.clone();
                true
            }
            _ => false,
        }
    }

    pub async fn delete_trading_account(&self, owner_id: Uuid, id: Uuid) -> bool {
        let mut tables = self.tables.write().await;
        let owned = tables
            .trading_accounts
            .get(&id)
            .map_or(false, |a| a.owner_id == owner_id);
        owned && tables.trading_accounts.remove(&id).is_some()
    }

    // ==========================================
    // VAULT REQUESTS
    // ==========================================

    pub async fn insert_vault_request(&self, request: &VaultRequestRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if request.status == VaultRequestStatus::Pending
            && tables.vault_requests.values().any(|r| {
                r.status == VaultRequestStatus::Pending
                    && r.requester_id == request.requester_id
                    && r.owner_id == request.owner_id
            })
        {
            return Err(StoreError::Conflict("vault_requests_one_pending".to_string()));
        }
        tables.vault_requests.insert(request.id, request.clone());
        Ok(())
    }

    pub async fn find_vault_request(&self, id: Uuid) -> Option<VaultRequestRecord> {
        self.tables.read().await.vault_requests.get(&id).cloned()
    }

    pub async fn list_vault_requests(&self, filter: &VaultRequestFilter) -> Vec<VaultRequestRecord> {
        let tables = self.tables.read().await;
        let mut requests: Vec<_> = tables
            .vault_requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }

    pub async fn transition_vault_request(
        &self,
        updated: &VaultRequestRecord,
        expected: VaultRequestStatus,
    ) -> bool {
        let mut tables = self.tables.write().await;
        match tables.vault_requests.get_mut(&updated.id) {
            Some(existing) if existing.status == expected => {
                existing.status = updated.status;
                existing.admin_notes = updated.admin_notes.clone();
                existing.reviewed_by = updated.reviewed_by;
                existing.reviewed_at = updated.reviewed_at;
                existing.updated_at = updated.updated_at;
                true
            }
            _ => false,
        }
    }

    pub async fn count_vault_requests_by_status(
        &self,
        owner_id: Option<Uuid>,
    ) -> Vec<Tally<VaultRequestStatus>> {
        let tables = self.tables.read().await;
        let mut counts: BTreeMap<&'static str, (VaultRequestStatus, i64)> = BTreeMap::new();
        for request in tables
            .vault_requests
            .values()
            .filter(|r| owner_id.map_or(true, |id| r.owner_id == id))
        {
            counts
                .entry(request.status.as_str())
                .or_insert((request.status, 0))
                .1 += 1;
        }
        counts
            .into_values()
            .map(|(key, count)| Tally { key, count })
            .collect()
    }

    // ==========================================
    // DOCUMENTS
    // ==========================================

    pub async fn insert_document(&self, doc: &DocumentRecord) -> StoreResult<()> {
        self.tables.write().await.documents.insert(doc.id, doc.clone());
        Ok(())
    }

    pub async fn find_documents_by_hash(&self, sha256: &str) -> Vec<DocumentRecord> {
        let tables = self.tables.read().await;
        tables
            .documents
            .values()
            .filter(|d| d.sha256 == sha256)
            .cloned()
            .collect()
    }

    pub async fn list_documents(&self, vault_request_id: Uuid) -> Vec<DocumentRecord> {
        let tables = self.tables.read().await;
        let mut docs: Vec<_> = tables
            .documents
            .values()
            .filter(|d| d.vault_request_id == vault_request_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        docs
    }
}

fn empty_total(category: AssetCategory) -> CategoryTotal {
    CategoryTotal {
        category,
        count: 0,
        total_value: 0,
    }
}
