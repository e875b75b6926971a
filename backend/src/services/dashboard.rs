//! # Dashboard Service
//!
//! Read-only aggregates for the owner dashboard and the admin console.
//!
//! Totals add values across currencies as if they were one; every record
//! created through the API defaults to INR.

use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use super::ServiceResult;
use crate::db::{Role, Tally, VaultRequestStatus};
use crate::models::{
    AdminStatsResponse, CategoryBreakdown, OwnerStatsResponse, DEFAULT_CURRENCY,
};
use crate::store::Store;
use crate::utils::{format_amount, total_amount};

/// Counts keyed by every variant, zero when absent from `tallies`.
fn counts_by<K: Copy + PartialEq>(
    all: &[K],
    tallies: &[Tally<K>],
    name: fn(&K) -> &'static str,
) -> BTreeMap<String, i64> {
    all.iter()
        .map(|k| {
            let count = tallies
                .iter()
                .find(|t| t.key == *k)
                .map_or(0, |t| t.count);
            (name(k).to_string(), count)
        })
        .collect()
}

#[derive(Clone)]
pub struct DashboardService {
    store: Store,
}

impl DashboardService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Summary of one owner's estate.
    pub async fn owner_stats(&self, owner_id: Uuid) -> ServiceResult<OwnerStatsResponse> {
        let totals = self.store.asset_totals(Some(owner_id)).await?;
        let accounts = self.store.list_trading_accounts(owner_id).await?;
        let nominees = self.store.list_nominees(owner_id).await?;
        let requests = self
            .store
            .count_vault_requests_by_status(Some(owner_id))
            .await?;

        let asset_count: i64 = totals.iter().map(|t| t.count).sum();
        let total_asset_value = total_amount(totals.iter().map(|t| t.total_value));

        let assets_by_category = totals
            .iter()
            .map(|t| CategoryBreakdown {
                category: t.category,
                count: t.count,
                total_value: t.total_value,
                share_percentage: if total_asset_value > 0 {
                    t.total_value as f64 * 100.0 / total_asset_value as f64
                } else {
                    0.0
                },
            })
            .collect();

        let allocated: f64 = nominees.iter().map(|n| n.allocation_percentage).sum();
        debug!("Computed dashboard for {}", owner_id);

        Ok(OwnerStatsResponse {
            asset_count,
            total_asset_value,
            formatted_total_value: format_amount(total_asset_value, DEFAULT_CURRENCY),
            assets_by_category,
            trading_account_count: accounts.len() as i64,
            trading_account_value: total_amount(accounts.iter().map(|a| a.current_value)),
            nominee_count: nominees.len() as i64,
            allocated_percentage: allocated,
            unallocated_percentage: (100.0 - allocated).max(0.0),
            vault_requests: counts_by(VaultRequestStatus::ALL, &requests, VaultRequestStatus::as_str),
        })
    }

    /// Platform-wide figures for admins.
    pub async fn admin_stats(&self) -> ServiceResult<AdminStatsResponse> {
        let users = self.store.count_users_by_role().await?;
        let totals = self.store.asset_totals(None).await?;
        let requests = self.store.count_vault_requests_by_status(None).await?;

        let total_asset_value = total_amount(totals.iter().map(|t| t.total_value));
        let vault_requests_by_status =
            counts_by(VaultRequestStatus::ALL, &requests, VaultRequestStatus::as_str);
        let pending_vault_requests = vault_requests_by_status
            .get(VaultRequestStatus::Pending.as_str())
            .copied()
            .unwrap_or(0);

        Ok(AdminStatsResponse {
            total_users: users.iter().map(|t| t.count).sum(),
            users_by_role: counts_by(Role::ALL, &users, Role::as_str),
            total_assets: totals.iter().map(|t| t.count).sum(),
            total_asset_value,
            formatted_total_value: format_amount(total_asset_value, DEFAULT_CURRENCY),
            vault_requests_by_status,
            pending_vault_requests,
        })
    }
}
