//! # Vault Request Manager Service
//!
//! A vault request is a nominee's claim on an owner's assets, usually
//! raised after the owner's death. An admin reviews the supporting
//! documents and approves or rejects it; once approved, the nominee can
//! see the owner's assets and their share of each.
//!
//! ## Lifecycle
//!
//! ```text
//!                 submit()
//!                    │
//!                    ▼
//!               ┌─────────┐  attach_document()
//!               │ pending │◄──────────────┐
//!               └────┬────┘───────────────┘
//!        ┌───────────┼────────────┐
//!  approve()      reject()     cancel()
//!   (admin)       (admin)    (requester)
//!        ▼           ▼            ▼
//!   ┌────────┐  ┌────────┐  ┌───────────┐
//!   │approved│  │rejected│  │ cancelled │
//!   └────────┘  └────────┘  └───────────┘
//!        │
//!        ▼
//!  unlocked_assets()
//! ```
//!
//! Status changes are compare-and-set against `pending`, so when two
//! admins decide the same request at once exactly one of them wins and
//! the other gets `INVALID_STATE`.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::document_validator::{DocumentInput, DocumentValidator};
use super::{optional_text, parse_choice, ServiceError, ServiceResult};
use crate::auth::AuthUser;
use crate::db::{
    DocumentKind, DocumentRecord, DocumentVerdict, Role, VaultRequestFilter, VaultRequestRecord,
    VaultRequestStatus,
};
use crate::models::{
    AssetResponse, AttachDocumentRequest, DocumentResponse, SubmitVaultRequest,
    TradingAccountResponse, UnlockedAsset, UnlockedAssetsResponse, UnlockedTradingAccount,
    VaultRequestResponse, DEFAULT_CURRENCY,
};
use crate::store::Store;
use crate::utils::{
    format_amount, normalize_email, require_text, share_of, total_amount, validate_email,
};
use crate::websocket::{VaultRequestEvent, WsEventType, WsRegistry};

const NOT_A_NOMINEE: &str = "You are not a nominee of this account";

fn request_not_found() -> ServiceError {
    ServiceError::NotFound("Vault request not found".to_string())
}

#[derive(Clone)]
pub struct VaultRequestManager {
    store: Store,
    validator: DocumentValidator,
    ws: WsRegistry,
    /// Approval needs a verified death certificate.
    require_verified: bool,
}

impl VaultRequestManager {
    pub fn new(
        store: Store,
        validator: DocumentValidator,
        ws: WsRegistry,
        require_verified: bool,
    ) -> Self {
        Self {
            store,
            validator,
            ws,
            require_verified,
        }
    }

    /// Raise a claim on the assets of the owner registered as `ownerEmail`.
    ///
    /// ## Returns
    ///
    /// * `Ok(VaultRequestResponse)` - The new request, `pending`
    /// * `Err(ServiceError::Forbidden)` - Caller is not one of the owner's nominees
    /// * `Err(ServiceError::Conflict)` - Caller already has a pending request for this owner
    pub async fn submit(
        &self,
        requester: &AuthUser,
        request: SubmitVaultRequest,
    ) -> ServiceResult<VaultRequestResponse> {
        if requester.role == Role::Admin {
            return Err(ServiceError::Forbidden(
                "Admins cannot raise vault requests".to_string(),
            ));
        }
        validate_email(&request.owner_email).map_err(ServiceError::Validation)?;
        let owner_email = normalize_email(&request.owner_email);

        let owner = self
            .store
            .find_user_by_email(&owner_email)
            .await?
            .filter(|owner| owner.id != requester.id)
            .ok_or_else(|| ServiceError::Forbidden(NOT_A_NOMINEE.to_string()))?;

        let nominee = self
            .store
            .list_nominees(owner.id)
            .await?
            .into_iter()
            .find(|n| n.email.eq_ignore_ascii_case(&requester.email))
            .ok_or_else(|| {
                warn!("{} claimed {} without being a nominee", requester.email, owner.email);
                ServiceError::Forbidden(NOT_A_NOMINEE.to_string())
            })?;

        let pending = self
            .store
            .list_vault_requests(&VaultRequestFilter {
                requester_id: Some(requester.id),
                owner_id: Some(owner.id),
                status: Some(VaultRequestStatus::Pending),
            })
            .await?;
        if !pending.is_empty() {
            return Err(ServiceError::Conflict(
                "You already have a pending vault request for this account".to_string(),
            ));
        }

        let relationship = optional_text(request.relationship).unwrap_or(nominee.relationship);
        let now = Utc::now();
        let record = VaultRequestRecord {
            id: Uuid::new_v4(),
            requester_id: requester.id,
            owner_id: owner.id,
            nominee_id: nominee.id,
            relationship,
            message: optional_text(request.message),
            status: VaultRequestStatus::Pending,
            admin_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_vault_request(&record).await?;
        info!(
            "Vault request {} submitted by {} for owner {}",
            record.id, requester.id, owner.id
        );

        if let Err(e) = self
            .ws
            .send_to_admins(WsEventType::VaultRequestSubmitted, VaultRequestEvent::from(&record))
            .await
        {
            warn!("Failed to notify admins of {}: {}", record.id, e);
        }

        Ok(VaultRequestResponse::new(&record, &[]))
    }

    /// One request with its documents. Visible to its requester and admins.
    pub async fn get(&self, caller: &AuthUser, id: Uuid) -> ServiceResult<VaultRequestResponse> {
        let record = self.load_visible(caller, id).await?;
        let documents = self.store.list_documents(id).await?;
        Ok(VaultRequestResponse::new(&record, &documents))
    }

    /// Requests visible to `caller`, newest first.
    ///
    /// Admins see every request; everyone else sees the ones they raised.
    pub async fn list(
        &self,
        caller: &AuthUser,
        status: Option<&str>,
    ) -> ServiceResult<Vec<VaultRequestResponse>> {
        let status = match status {
            Some(text) => Some(parse_choice::<VaultRequestStatus>(
                text,
                VaultRequestStatus::accepted,
            )?),
            None => None,
        };

        let filter = VaultRequestFilter {
            requester_id: if caller.is_admin() { None } else { Some(caller.id) },
            owner_id: None,
            status,
        };
        let records = self.store.list_vault_requests(&filter).await?;
        debug!("Listed {} vault requests for {}", records.len(), caller.id);

        let mut out = Vec::with_capacity(records.len());
        for record in &records {
            let documents = self.store.list_documents(record.id).await?;
            out.push(VaultRequestResponse::new(record, &documents));
        }
        Ok(out)
    }

    /// Validate a supporting document and attach the outcome to a pending request.
    pub async fn attach_document(
        &self,
        caller: &AuthUser,
        id: Uuid,
        request: AttachDocumentRequest,
    ) -> ServiceResult<DocumentResponse> {
        let record = self.load_own(caller, id).await?;
        if record.status != VaultRequestStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "Documents can only be attached while pending; request is {}",
                record.status
            )));
        }

        let kind = parse_choice::<DocumentKind>(&request.kind, DocumentKind::accepted)?;
        let file_name =
            require_text("fileName", &request.file_name).map_err(ServiceError::Validation)?;

        let owner_name = self
            .store
            .find_user_by_id(record.owner_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_default();
        let nominee_name = self
            .store
            .find_user_by_id(record.requester_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_default();

        let report = self
            .validator
            .validate(&DocumentInput {
                kind,
                file_name: &file_name,
                content_base64: &request.content,
                owner_name: &owner_name,
                nominee_name: &nominee_name,
                vault_request_id: id,
            })
            .await?;

        let document = DocumentRecord {
            id: Uuid::new_v4(),
            vault_request_id: id,
            kind,
            file_name,
            sha256: report.sha256,
            size_bytes: report.size_bytes,
            score: report.score,
            verdict: report.verdict,
            flags: report.flags,
            created_at: Utc::now(),
        };
        self.store.insert_document(&document).await?;
        info!(
            "Attached {} document {} to vault request {} ({})",
            document.kind, document.id, id, document.verdict
        );

        Ok(DocumentResponse::from(&document))
    }

    /// Approve a pending request.
    ///
    /// ## Returns
    ///
    /// * `Err(ServiceError::Forbidden)` - Caller is not an admin
    /// * `Err(ServiceError::DocumentsRequired)` - No verified death certificate
    ///   is attached and verified documents are required
    /// * `Err(ServiceError::InvalidState)` - Request is no longer pending
    pub async fn approve(
        &self,
        admin: &AuthUser,
        id: Uuid,
        notes: Option<String>,
    ) -> ServiceResult<VaultRequestResponse> {
        admin.require_admin()?;
        let record = self.load(id).await?;
        ensure_transition(&record, VaultRequestStatus::Approved)?;

        let documents = self.store.list_documents(id).await?;
        if self.require_verified && !has_verified_death_certificate(&documents) {
            warn!("Refused approval of {}: no verified death certificate", id);
            return Err(ServiceError::DocumentsRequired(
                "A verified death certificate is required before approval".to_string(),
            ));
        }

        self.decide(
            record,
            VaultRequestStatus::Approved,
            Some(admin.id),
            optional_text(notes),
            &documents,
        )
        .await
    }

    /// Reject a pending request. A reason is required.
    pub async fn reject(
        &self,
        admin: &AuthUser,
        id: Uuid,
        notes: Option<String>,
    ) -> ServiceResult<VaultRequestResponse> {
        admin.require_admin()?;
        let notes = optional_text(notes).ok_or_else(|| {
            ServiceError::Validation("notes are required when rejecting".to_string())
        })?;

        let record = self.load(id).await?;
        ensure_transition(&record, VaultRequestStatus::Rejected)?;
        let documents = self.store.list_documents(id).await?;

        self.decide(
            record,
            VaultRequestStatus::Rejected,
            Some(admin.id),
            Some(notes),
            &documents,
        )
        .await
    }

    /// Withdraw a pending request. Only its requester may do this.
    pub async fn cancel(&self, caller: &AuthUser, id: Uuid) -> ServiceResult<VaultRequestResponse> {
        let record = self.load_own(caller, id).await?;
        ensure_transition(&record, VaultRequestStatus::Cancelled)?;
        let documents = self.store.list_documents(id).await?;

        self.decide(record, VaultRequestStatus::Cancelled, None, None, &documents)
            .await
    }

    /// Assets an approved request unlocks, with the nominee's share of each.
    pub async fn unlocked_assets(
        &self,
        caller: &AuthUser,
        id: Uuid,
    ) -> ServiceResult<UnlockedAssetsResponse> {
        let record = self.load_own(caller, id).await?;
        if record.status != VaultRequestStatus::Approved {
            return Err(ServiceError::InvalidState(format!(
                "Assets are unlocked only for approved requests; request is {}",
                record.status
            )));
        }

        let nominee = self
            .store
            .find_nominee(record.owner_id, record.nominee_id)
            .await?
            .filter(|n| n.email.eq_ignore_ascii_case(&caller.email))
            .ok_or_else(|| {
                warn!("Nominee entry behind {} no longer names {}", id, caller.email);
                ServiceError::NotFound("Nominee entry no longer exists".to_string())
            })?;
        let pct = nominee.allocation_percentage;

        let owner_name = self
            .store
            .find_user_by_id(record.owner_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_default();

        let assets: Vec<UnlockedAsset> = self
            .store
            .list_assets(record.owner_id)
            .await?
            .iter()
            .map(|a| {
                let entitled = share_of(a.current_value, pct);
                UnlockedAsset {
                    asset: AssetResponse::from(a),
                    entitled_value: entitled,
                    formatted_entitled_value: format_amount(entitled, &a.currency),
                }
            })
            .collect();

        let trading_accounts: Vec<UnlockedTradingAccount> = self
            .store
            .list_trading_accounts(record.owner_id)
            .await?
            .iter()
            .map(|t| {
                let entitled = share_of(t.current_value, pct);
                UnlockedTradingAccount {
                    account: TradingAccountResponse::from(t),
                    entitled_value: entitled,
                    formatted_entitled_value: format_amount(entitled, &t.currency),
                }
            })
            .collect();

        let total_value = total_amount(
            assets
                .iter()
                .map(|a| a.asset.current_value)
                .chain(trading_accounts.iter().map(|t| t.account.current_value)),
        );
        let entitled_total = total_amount(
            assets
                .iter()
                .map(|a| a.entitled_value)
                .chain(trading_accounts.iter().map(|t| t.entitled_value)),
        );

        info!("Nominee {} viewed assets unlocked by {}", caller.id, id);

        Ok(UnlockedAssetsResponse {
            vault_request_id: id,
            owner_name,
            allocation_percentage: pct,
            assets,
            trading_accounts,
            total_value,
            entitled_total,
            formatted_entitled_total: format_amount(entitled_total, DEFAULT_CURRENCY),
        })
    }

    // ==========================================
    // HELPERS
    // ==========================================

    async fn load(&self, id: Uuid) -> ServiceResult<VaultRequestRecord> {
        self.store
            .find_vault_request(id)
            .await?
            .ok_or_else(request_not_found)
    }

    /// Load a request the caller may see; others get `NOT_FOUND`.
    async fn load_visible(&self, caller: &AuthUser, id: Uuid) -> ServiceResult<VaultRequestRecord> {
        let record = self.load(id).await?;
        if caller.is_admin() || record.requester_id == caller.id {
            Ok(record)
        } else {
            Err(request_not_found())
        }
    }

    /// Load a request the caller raised.
    async fn load_own(&self, caller: &AuthUser, id: Uuid) -> ServiceResult<VaultRequestRecord> {
        let record = self.load_visible(caller, id).await?;
        if record.requester_id != caller.id {
            return Err(ServiceError::Forbidden(
                "Only the requester can do this".to_string(),
            ));
        }
        Ok(record)
    }

    /// Compare-and-set `record` from `pending` to `next`, then notify the requester.
    async fn decide(
        &self,
        mut record: VaultRequestRecord,
        next: VaultRequestStatus,
        reviewer: Option<Uuid>,
        notes: Option<String>,
        documents: &[DocumentRecord],
    ) -> ServiceResult<VaultRequestResponse> {
        let expected = record.status;
        let now = Utc::now();

        record.status = next;
        record.updated_at = now;
        if reviewer.is_some() {
            record.reviewed_by = reviewer;
            record.reviewed_at = Some(now);
            record.admin_notes = notes;
        }

        if !self.store.transition_vault_request(&record, expected).await? {
            warn!("Lost race deciding vault request {} ({})", record.id, next);
            return Err(ServiceError::InvalidState(
                "Vault request was already decided".to_string(),
            ));
        }
        info!("Vault request {} is now {}", record.id, next);

        if let Err(e) = self
            .ws
            .send_to_user(
                record.requester_id,
                WsEventType::VaultRequestUpdated,
                VaultRequestEvent::from(&record),
            )
            .await
        {
            warn!("Failed to notify requester of {}: {}", record.id, e);
        }

        Ok(VaultRequestResponse::new(&record, documents))
    }
}

fn ensure_transition(record: &VaultRequestRecord, next: VaultRequestStatus) -> ServiceResult<()> {
    if record.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(ServiceError::InvalidState(format!(
            "Cannot move vault request from {} to {}",
            record.status, next
        )))
    }
}

fn has_verified_death_certificate(documents: &[DocumentRecord]) -> bool {
    documents.iter().any(|d| {
        d.kind == DocumentKind::DeathCertificate && d.verdict == DocumentVerdict::Verified
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AssetCategory, AssetRecord, NomineeRecord, UserRecord};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    const CERTIFICATE: &str = "DEATH CERTIFICATE\n\
        Registration No: 2024/1187\n\
        Name of deceased: Asha Kulkarni\n\
        Date of death: 02-03-2024\n\
        Place of death: Pune\n\
        Cause of death: Cardiac arrest";

    struct Fixture {
        store: Store,
        ws: WsRegistry,
        manager: VaultRequestManager,
        owner: AuthUser,
        nominee: AuthUser,
        admin: AuthUser,
        stranger: AuthUser,
    }

    async fn user(store: &Store, name: &str, email: &str, role: Role) -> AuthUser {
        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: String::new(),
            role,
            phone: None,
            created_at: now,
            updated_at: now,
        };
        store.insert_user(&record).await.unwrap();
        AuthUser {
            id: record.id,
            email: record.email,
            role,
        }
    }

    async fn fixture(require_verified: bool) -> Fixture {
        let store = Store::memory();
        let ws = WsRegistry::new();
        let validator = DocumentValidator::new(store.clone(), 64 * 1024, 0.6);
        let manager = VaultRequestManager::new(store.clone(), validator, ws.clone(), require_verified);

        let owner = user(&store, "Asha Kulkarni", "asha@example.com", Role::User).await;
        let nominee = user(&store, "Ravi Kulkarni", "ravi@example.com", Role::Nominee).await;
        let admin = user(&store, "Administrator", "admin@example.com", Role::Admin).await;
        let stranger = user(&store, "Kiran Rao", "kiran@example.com", Role::Nominee).await;

        let now = Utc::now();
        store
            .insert_nominee(&NomineeRecord {
                id: Uuid::new_v4(),
                owner_id: owner.id,
                name: "Ravi Kulkarni".to_string(),
                email: "ravi@example.com".to_string(),
                relationship: "spouse".to_string(),
                phone: None,
                allocation_percentage: 25.0,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        store
            .insert_asset(&AssetRecord {
                id: Uuid::new_v4(),
                owner_id: owner.id,
                name: "Salary account".to_string(),
                category: AssetCategory::BankAccount,
                institution: "State Bank of India".to_string(),
                account_number: Some("123456789012".to_string()),
                current_value: 1_000_001,
                currency: "INR".to_string(),
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        Fixture {
            store,
            ws,
            manager,
            owner,
            nominee,
            admin,
            stranger,
        }
    }

    fn submit_request() -> SubmitVaultRequest {
        SubmitVaultRequest {
            owner_email: "ASHA@example.com".to_string(),
            relationship: None,
            message: Some("Certificate attached".to_string()),
        }
    }

    fn certificate() -> AttachDocumentRequest {
        AttachDocumentRequest {
            kind: "death_certificate".to_string(),
            file_name: "death-certificate.txt".to_string(),
            content: STANDARD.encode(CERTIFICATE),
        }
    }

    #[actix_rt::test]
    async fn test_full_approval_flow() {
        let f = fixture(true).await;
        let mut admin_rx = f.ws.register(crate::websocket::ADMIN_CHANNEL).await;
        let mut nominee_rx = f.ws.register(&f.nominee.id.to_string()).await;

        let request = f.manager.submit(&f.nominee, submit_request()).await.unwrap();
        assert_eq!(request.status, VaultRequestStatus::Pending);
        assert_eq!(request.relationship, "spouse");
        assert_eq!(request.owner_id, f.owner.id);

        let event: serde_json::Value =
            serde_json::from_str(&admin_rx.recv().await.unwrap()).unwrap();
        assert_eq!(event["event"], "vault_request_submitted");

        let doc = f
            .manager
            .attach_document(&f.nominee, request.id, certificate())
            .await
            .unwrap();
        assert_eq!(doc.verdict, DocumentVerdict::Verified);

        let approved = f
            .manager
            .approve(&f.admin, request.id, Some("Checked".to_string()))
            .await
            .unwrap();
        assert_eq!(approved.status, VaultRequestStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(f.admin.id));
        assert_eq!(approved.documents.len(), 1);

        let event: serde_json::Value =
            serde_json::from_str(&nominee_rx.recv().await.unwrap()).unwrap();
        assert_eq!(event["event"], "vault_request_updated");
        assert_eq!(event["data"]["status"], "approved");

        let unlocked = f.manager.unlocked_assets(&f.nominee, request.id).await.unwrap();
        assert_eq!(unlocked.owner_name, "Asha Kulkarni");
        assert_eq!(unlocked.assets.len(), 1);
        assert_eq!(unlocked.assets[0].entitled_value, 250_000);
        assert_eq!(unlocked.total_value, 1_000_001);
        assert_eq!(unlocked.entitled_total, 250_000);
    }

    #[actix_rt::test]
    async fn test_unlocked_assets_follow_the_nominee_entry() {
        let f = fixture(false).await;
        let request = f.manager.submit(&f.nominee, submit_request()).await.unwrap();
        f.manager.approve(&f.admin, request.id, None).await.unwrap();
        assert!(f.manager.unlocked_assets(&f.nominee, request.id).await.is_ok());

        let mut entry = f.store.list_nominees(f.owner.id).await.unwrap().remove(0);
        entry.email = "meera@example.com".to_string();
        assert!(f.store.update_nominee(&entry).await.unwrap());

        let err = f
            .manager
            .unlocked_assets(&f.nominee, request.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[actix_rt::test]
    async fn test_only_nominees_can_submit() {
        let f = fixture(true).await;
        let err = f.manager.submit(&f.stranger, submit_request()).await.unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        let mut unknown_owner = submit_request();
        unknown_owner.owner_email = "nobody@example.com".to_string();
        let err = f.manager.submit(&f.nominee, unknown_owner).await.unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[actix_rt::test]
    async fn test_one_pending_request_per_owner() {
        let f = fixture(true).await;
        let first = f.manager.submit(&f.nominee, submit_request()).await.unwrap();
        let err = f.manager.submit(&f.nominee, submit_request()).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");

        f.manager.cancel(&f.nominee, first.id).await.unwrap();
        f.manager.submit(&f.nominee, submit_request()).await.unwrap();
    }

    #[actix_rt::test]
    async fn test_approval_requires_verified_certificate() {
        let f = fixture(true).await;
        let request = f.manager.submit(&f.nominee, submit_request()).await.unwrap();

        let err = f.manager.approve(&f.admin, request.id, None).await.unwrap_err();
        assert_eq!(err.code(), "DOCUMENTS_REQUIRED");

        let relaxed = fixture(false).await;
        let request = relaxed.manager.submit(&relaxed.nominee, submit_request()).await.unwrap();
        let approved = relaxed.manager.approve(&relaxed.admin, request.id, None).await.unwrap();
        assert_eq!(approved.status, VaultRequestStatus::Approved);
    }

    #[actix_rt::test]
    async fn test_terminal_states_are_final() {
        let f = fixture(false).await;
        let request = f.manager.submit(&f.nominee, submit_request()).await.unwrap();

        let rejected = f
            .manager
            .reject(&f.admin, request.id, Some("Certificate unreadable".to_string()))
            .await
            .unwrap();
        assert_eq!(rejected.status, VaultRequestStatus::Rejected);
        assert_eq!(rejected.admin_notes.as_deref(), Some("Certificate unreadable"));

        let err = f.manager.approve(&f.admin, request.id, None).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        let err = f.manager.cancel(&f.nominee, request.id).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        let err = f
            .manager
            .attach_document(&f.nominee, request.id, certificate())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        let err = f.manager.unlocked_assets(&f.nominee, request.id).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[actix_rt::test]
    async fn test_reject_needs_notes_and_admin() {
        let f = fixture(false).await;
        let request = f.manager.submit(&f.nominee, submit_request()).await.unwrap();

        let err = f.manager.reject(&f.admin, request.id, Some("  ".to_string())).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = f
            .manager
            .reject(&f.nominee, request.id, Some("no".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[actix_rt::test]
    async fn test_visibility() {
        let f = fixture(false).await;
        let request = f.manager.submit(&f.nominee, submit_request()).await.unwrap();

        assert!(f.manager.get(&f.nominee, request.id).await.is_ok());
        assert!(f.manager.get(&f.admin, request.id).await.is_ok());
        assert_eq!(
            f.manager.get(&f.stranger, request.id).await.unwrap_err().code(),
            "NOT_FOUND"
        );
        assert_eq!(
            f.manager.cancel(&f.admin, request.id).await.unwrap_err().code(),
            "FORBIDDEN"
        );

        assert_eq!(f.manager.list(&f.admin, None).await.unwrap().len(), 1);
        assert_eq!(f.manager.list(&f.nominee, Some("pending")).await.unwrap().len(), 1);
        assert!(f.manager.list(&f.stranger, None).await.unwrap().is_empty());
        assert_eq!(
            f.manager.list(&f.admin, Some("open")).await.unwrap_err().code(),
            "VALIDATION_ERROR"
        );
    }

    #[actix_rt::test]
    async fn test_concurrent_decisions_have_one_winner() {
        let f = fixture(false).await;
        let request = f.manager.submit(&f.nominee, submit_request()).await.unwrap();

        let (a, b) = tokio::join!(
            f.manager.approve(&f.admin, request.id, None),
            f.manager.reject(&f.admin, request.id, Some("duplicate claim".to_string())),
        );
        assert!(a.is_ok() != b.is_ok());
        let loser = if a.is_ok() { b } else { a };
        assert_eq!(loser.unwrap_err().code(), "INVALID_STATE");

        let stored = f.store.find_vault_request(request.id).await.unwrap().unwrap();
        assert_ne!(stored.status, VaultRequestStatus::Pending);
        assert_eq!(stored.owner_id, f.owner.id);
    }
}
