//! # Asset Manager Service
//!
//! CRUD for an owner's assets and trading accounts.
//!
//! Every lookup is scoped to the calling owner: asking for somebody
//! else's record yields `NOT_FOUND`, the same as asking for a record that
//! does not exist. Account numbers are stored in full and masked in every
//! response.
//!
//! Values are integer minor units (1 INR = 100) and may not be negative.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{optional_text, parse_choice, ServiceError, ServiceResult};
use crate::db::{
    AssetCategory, AssetRecord, TradingAccountRecord, TradingAccountStatus, TradingAccountType,
};
use crate::models::{
    AssetResponse, CreateAssetRequest, CreateTradingAccountRequest, DeletedResponse,
    TradingAccountResponse, UpdateAssetRequest, UpdateTradingAccountRequest, DEFAULT_CURRENCY,
};
use crate::store::Store;
use crate::utils::{normalize_currency, require_text, MAX_AMOUNT};

fn check_value(value: i64) -> ServiceResult<i64> {
    if value < 0 {
        Err(ServiceError::Validation(
            "currentValue must not be negative".to_string(),
        ))
    } else if value > MAX_AMOUNT {
        Err(ServiceError::Validation(format!(
            "currentValue must not exceed {}",
            MAX_AMOUNT
        )))
    } else {
        Ok(value)
    }
}

fn currency_or_default(currency: Option<&str>) -> ServiceResult<String> {
    match currency {
        Some(code) => normalize_currency(code).map_err(ServiceError::Validation),
        None => Ok(DEFAULT_CURRENCY.to_string()),
    }
}

fn asset_not_found() -> ServiceError {
    ServiceError::NotFound("Asset not found".to_string())
}

fn account_not_found() -> ServiceError {
    ServiceError::NotFound("Trading account not found".to_string())
}

#[derive(Clone)]
pub struct AssetManager {
    store: Store,
}

impl AssetManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    // ==========================================
    // ASSETS
    // ==========================================

    /// Assets of `owner_id`, newest first.
    pub async fn list_assets(&self, owner_id: Uuid) -> ServiceResult<Vec<AssetResponse>> {
        let assets = self.store.list_assets(owner_id).await?;
        debug!("Listed {} assets for {}", assets.len(), owner_id);
        Ok(assets.iter().map(AssetResponse::from).collect())
    }

    pub async fn get_asset(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<AssetResponse> {
        self.store
            .find_asset(owner_id, id)
            .await?
            .map(|a| AssetResponse::from(&a))
            .ok_or_else(asset_not_found)
    }

    /// Register an asset.
    ///
    /// ## Returns
    ///
    /// * `Ok(AssetResponse)` - The stored asset, account number masked
    /// * `Err(ServiceError::Validation)` - Blank name/institution, unknown
    ///   category, negative value or bad currency code
    pub async fn create_asset(
        &self,
        owner_id: Uuid,
        request: CreateAssetRequest,
    ) -> ServiceResult<AssetResponse> {
        let name = require_text("name", &request.name).map_err(ServiceError::Validation)?;
        let institution =
            require_text("institution", &request.institution).map_err(ServiceError::Validation)?;
        let category = parse_choice::<AssetCategory>(&request.category, AssetCategory::accepted)?;
        let current_value = check_value(request.current_value)?;
        let currency = currency_or_default(request.currency.as_deref())?;

        let now = Utc::now();
        let asset = AssetRecord {
            id: Uuid::new_v4(),
            owner_id,
            name,
            category,
            institution,
            account_number: optional_text(request.account_number),
            current_value,
            currency,
            notes: optional_text(request.notes),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_asset(&asset).await?;
        info!("Owner {} added {} asset {}", owner_id, asset.category, asset.id);
        Ok(AssetResponse::from(&asset))
    }

    /// Apply the fields present in `request`; absent fields keep their value.
    pub async fn update_asset(
        &self,
        owner_id: Uuid,
        id: Uuid,
        request: UpdateAssetRequest,
    ) -> ServiceResult<AssetResponse> {
        let mut asset = self
            .store
            .find_asset(owner_id, id)
            .await?
            .ok_or_else(asset_not_found)?;

        if let Some(name) = request.name {
            asset.name = require_text("name", &name).map_err(ServiceError::Validation)?;
        }
        if let Some(institution) = request.institution {
            asset.institution =
                require_text("institution", &institution).map_err(ServiceError::Validation)?;
        }
        if let Some(category) = request.category {
            asset.category = parse_choice(&category, AssetCategory::accepted)?;
        }
        if let Some(value) = request.current_value {
            asset.current_value = check_value(value)?;
        }
        if let Some(currency) = request.currency {
            asset.currency = normalize_currency(&currency).map_err(ServiceError::Validation)?;
        }
        if request.account_number.is_some() {
            asset.account_number = optional_text(request.account_number);
        }
        if request.notes.is_some() {
            asset.notes = optional_text(request.notes);
        }
        asset.updated_at = Utc::now();

        if !self.store.update_asset(&asset).await? {
            return Err(asset_not_found());
        }
        info!("Owner {} updated asset {}", owner_id, id);
        Ok(AssetResponse::from(&asset))
    }

    pub async fn delete_asset(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<DeletedResponse> {
        if !self.store.delete_asset(owner_id, id).await? {
            return Err(asset_not_found());
        }
        info!("Owner {} deleted asset {}", owner_id, id);
        Ok(DeletedResponse { id, deleted: true })
    }

    // ==========================================
    // TRADING ACCOUNTS
    // ==========================================

    pub async fn list_trading_accounts(
        &self,
        owner_id: Uuid,
    ) -> ServiceResult<Vec<TradingAccountResponse>> {
        let accounts = self.store.list_trading_accounts(owner_id).await?;
        debug!("Listed {} trading accounts for {}", accounts.len(), owner_id);
        Ok(accounts.iter().map(TradingAccountResponse::from).collect())
    }

    pub async fn get_trading_account(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> ServiceResult<TradingAccountResponse> {
        self.store
            .find_trading_account(owner_id, id)
            .await?
            .map(|t| TradingAccountResponse::from(&t))
            .ok_or_else(account_not_found)
    }

    pub async fn create_trading_account(
        &self,
        owner_id: Uuid,
        request: CreateTradingAccountRequest,
    ) -> ServiceResult<TradingAccountResponse> {
        let broker = require_text("broker", &request.broker).map_err(ServiceError::Validation)?;
        let account_number = require_text("accountNumber", &request.account_number)
            .map_err(ServiceError::Validation)?;
        let account_type =
            parse_choice::<TradingAccountType>(&request.account_type, TradingAccountType::accepted)?;
        let status = match request.status.as_deref() {
            Some(text) => parse_choice(text, TradingAccountStatus::accepted)?,
            None => TradingAccountStatus::Active,
        };
        let current_value = check_value(request.current_value)?;
        let currency = currency_or_default(request.currency.as_deref())?;

        let now = Utc::now();
        let account = TradingAccountRecord {
            id: Uuid::new_v4(),
            owner_id,
            broker,
            account_number,
            client_id: optional_text(request.client_id),
            account_type,
            current_value,
            currency,
            status,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_trading_account(&account).await?;
        info!("Owner {} added trading account {} at {}", owner_id, account.id, account.broker);
        Ok(TradingAccountResponse::from(&account))
    }

    pub async fn update_trading_account(
        &self,
        owner_id: Uuid,
        id: Uuid,
        request: UpdateTradingAccountRequest,
    ) -> ServiceResult<TradingAccountResponse> {
        let mut account = self
            .store
            .find_trading_account(owner_id, id)
            .await?
            .ok_or_else(account_not_found)?;

        if let Some(broker) = request.broker {
            account.broker = require_text("broker", &broker).map_err(ServiceError::Validation)?;
        }
        if let Some(number) = request.account_number {
            account.account_number =
                require_text("accountNumber", &number).map_err(ServiceError::Validation)?;
        }
        if request.client_id.is_some() {
            account.client_id = optional_text(request.client_id);
        }
        if let Some(kind) = request.account_type {
            account.account_type = parse_choice(&kind, TradingAccountType::accepted)?;
        }
        if let Some(value) = request.current_value {
            account.current_value = check_value(value)?;
        }
        if let Some(currency) = request.currency {
            account.currency = normalize_currency(&currency).map_err(ServiceError::Validation)?;
        }
        if let Some(status) = request.status {
            account.status = parse_choice(&status, TradingAccountStatus::accepted)?;
        }
        account.updated_at = Utc::now();

        if !self.store.update_trading_account(&account).await? {
            return Err(account_not_found());
        }
        info!("Owner {} updated trading account {}", owner_id, id);
        Ok(TradingAccountResponse::from(&account))
    }

    pub async fn delete_trading_account(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> ServiceResult<DeletedResponse> {
        if !self.store.delete_trading_account(owner_id, id).await? {
            return Err(account_not_found());
        }
        info!("Owner {} deleted trading account {}", owner_id, id);
        Ok(DeletedResponse { id, deleted: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset_request() -> CreateAssetRequest {
        CreateAssetRequest {
            name: "Salary account".to_string(),
            category: "bank_account".to_string(),
            institution: "State Bank of India".to_string(),
            account_number: Some("123456789012".to_string()),
            current_value: 25_000_000,
            currency: None,
            notes: None,
        }
    }

    fn trading_request() -> CreateTradingAccountRequest {
        CreateTradingAccountRequest {
            broker: "Zerodha".to_string(),
            account_number: "ZR00123456".to_string(),
            client_id: Some("AB1234".to_string()),
            account_type: "equity".to_string(),
            current_value: 1_000_000,
            currency: Some("inr".to_string()),
            status: None,
        }
    }

    #[actix_rt::test]
    async fn test_value_above_limit_is_rejected() {
        let mgr = AssetManager::new(Store::memory());
        let owner = Uuid::new_v4();

        let mut request = asset_request();
        request.current_value = i64::MAX;
        let err = mgr.create_asset(owner, request).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let mut request = asset_request();
        request.current_value = MAX_AMOUNT;
        let asset = mgr.create_asset(owner, request).await.unwrap();

        let err = mgr
            .update_asset(
                owner,
                asset.id,
                UpdateAssetRequest {
                    name: None,
                    category: None,
                    institution: None,
                    account_number: None,
                    current_value: Some(MAX_AMOUNT + 1),
                    currency: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let mut request = trading_request();
        request.current_value = i64::MAX;
        let err = mgr.create_trading_account(owner, request).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[actix_rt::test]
    async fn test_create_asset_masks_and_defaults() {
        let mgr = AssetManager::new(Store::memory());
        let owner = Uuid::new_v4();

        let asset = mgr.create_asset(owner, asset_request()).await.unwrap();
        assert_eq!(asset.account_number.as_deref(), Some("XXXXXXXX9012"));
        assert_eq!(asset.currency, "INR");
        assert_eq!(asset.formatted_value, "250,000.00 INR");
        assert_eq!(asset.category, AssetCategory::BankAccount);
    }

    #[actix_rt::test]
    async fn test_create_asset_validation() {
        let mgr = AssetManager::new(Store::memory());
        let owner = Uuid::new_v4();

        let mut negative = asset_request();
        negative.current_value = -1;
        assert_eq!(
            mgr.create_asset(owner, negative).await.unwrap_err().code(),
            "VALIDATION_ERROR"
        );

        let mut bad_category = asset_request();
        bad_category.category = "crypto".to_string();
        assert_eq!(
            mgr.create_asset(owner, bad_category).await.unwrap_err().code(),
            "VALIDATION_ERROR"
        );

        let mut blank = asset_request();
        blank.institution = " ".to_string();
        assert_eq!(
            mgr.create_asset(owner, blank).await.unwrap_err().code(),
            "VALIDATION_ERROR"
        );

        let mut currency = asset_request();
        currency.currency = Some("RUPEE".to_string());
        assert_eq!(
            mgr.create_asset(owner, currency).await.unwrap_err().code(),
            "VALIDATION_ERROR"
        );
    }

    #[actix_rt::test]
    async fn test_assets_are_owner_scoped() {
        let mgr = AssetManager::new(Store::memory());
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let asset = mgr.create_asset(owner, asset_request()).await.unwrap();

        assert_eq!(mgr.get_asset(stranger, asset.id).await.unwrap_err().code(), "NOT_FOUND");
        assert_eq!(
            mgr.update_asset(stranger, asset.id, UpdateAssetRequest::default())
                .await
                .unwrap_err()
                .code(),
            "NOT_FOUND"
        );
        assert_eq!(mgr.delete_asset(stranger, asset.id).await.unwrap_err().code(), "NOT_FOUND");
        assert!(mgr.list_assets(stranger).await.unwrap().is_empty());
        assert_eq!(mgr.list_assets(owner).await.unwrap().len(), 1);
    }

    #[actix_rt::test]
    async fn test_partial_update_keeps_other_fields() {
        let mgr = AssetManager::new(Store::memory());
        let owner = Uuid::new_v4();
        let asset = mgr.create_asset(owner, asset_request()).await.unwrap();

        let updated = mgr
            .update_asset(
                owner,
                asset.id,
                UpdateAssetRequest {
                    current_value: Some(30_000_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.current_value, 30_000_000);
        assert_eq!(updated.name, "Salary account");
        assert_eq!(updated.account_number.as_deref(), Some("XXXXXXXX9012"));

        let deleted = mgr.delete_asset(owner, asset.id).await.unwrap();
        assert!(deleted.deleted);
        assert_eq!(mgr.get_asset(owner, asset.id).await.unwrap_err().code(), "NOT_FOUND");
    }

    #[actix_rt::test]
    async fn test_trading_account_lifecycle() {
        let mgr = AssetManager::new(Store::memory());
        let owner = Uuid::new_v4();

        let account = mgr.create_trading_account(owner, trading_request()).await.unwrap();
        assert_eq!(account.account_number, "XXXXXX3456");
        assert_eq!(account.status, TradingAccountStatus::Active);
        assert_eq!(account.currency, "INR");

        let closed = mgr
            .update_trading_account(
                owner,
                account.id,
                UpdateTradingAccountRequest {
                    status: Some("closed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(closed.status, TradingAccountStatus::Closed);
        assert_eq!(closed.broker, "Zerodha");

        let mut bad = trading_request();
        bad.account_type = "crypto".to_string();
        assert_eq!(
            mgr.create_trading_account(owner, bad).await.unwrap_err().code(),
            "VALIDATION_ERROR"
        );

        assert_eq!(
            mgr.get_trading_account(Uuid::new_v4(), account.id).await.unwrap_err().code(),
            "NOT_FOUND"
        );
        mgr.delete_trading_account(owner, account.id).await.unwrap();
        assert!(mgr.list_trading_accounts(owner).await.unwrap().is_empty());
    }
}
