//! # Nominee Manager Service
//!
//! Maintains the people an owner names to inherit their assets, and the
//! share each of them receives.
//!
//! ## Allocation Rules
//!
//! ```text
//! each nominee:   0 < allocationPercentage <= 100
//! per owner:      Σ allocationPercentage   <= 100
//! ```
//!
//! On update the nominee's own current share is left out of the sum, so
//! lowering or keeping a share always passes.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{optional_text, ServiceError, ServiceResult};
use crate::db::NomineeRecord;
use crate::models::{
    CreateNomineeRequest, DeletedResponse, NominationResponse, NomineeListResponse,
    NomineeResponse, UpdateNomineeRequest,
};
use crate::store::Store;
use crate::utils::{normalize_email, require_text, validate_email};

/// Tolerance for floating point sums of percentages.
const PCT_EPSILON: f64 = 1e-9;

fn check_percentage(pct: f64) -> ServiceResult<f64> {
    if pct.is_finite() && pct > 0.0 && pct <= 100.0 {
        Ok(pct)
    } else {
        Err(ServiceError::Validation(
            "allocationPercentage must be greater than 0 and at most 100".to_string(),
        ))
    }
}

/// Sum of the allocations in `nominees`, skipping `exclude`.
fn allocated(nominees: &[NomineeRecord], exclude: Option<Uuid>) -> f64 {
    nominees
        .iter()
        .filter(|n| Some(n.id) != exclude)
        .map(|n| n.allocation_percentage)
        .sum()
}

fn nominee_not_found() -> ServiceError {
    ServiceError::NotFound("Nominee not found".to_string())
}

#[derive(Clone)]
pub struct NomineeManager {
    store: Store,
}

impl NomineeManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Nominees of `owner_id` with the allocated and free share.
    pub async fn list_nominees(&self, owner_id: Uuid) -> ServiceResult<NomineeListResponse> {
        let nominees = self.store.list_nominees(owner_id).await?;
        let allocated_percentage = allocated(&nominees, None);
        debug!("Listed {} nominees for {}", nominees.len(), owner_id);

        Ok(NomineeListResponse {
            nominees: nominees.iter().map(NomineeResponse::from).collect(),
            allocated_percentage,
            unallocated_percentage: (100.0 - allocated_percentage).max(0.0),
        })
    }

    pub async fn get_nominee(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<NomineeResponse> {
        self.store
            .find_nominee(owner_id, id)
            .await?
            .map(|n| NomineeResponse::from(&n))
            .ok_or_else(nominee_not_found)
    }

    /// Name a nominee.
    ///
    /// ## Returns
    ///
    /// * `Err(ServiceError::Validation)` - Bad fields, self-nomination, or
    ///   the allocation would push the owner's total past 100
    /// * `Err(ServiceError::Conflict)` - The owner already named this email
    pub async fn create_nominee(
        &self,
        owner_id: Uuid,
        request: CreateNomineeRequest,
    ) -> ServiceResult<NomineeResponse> {
        let name = require_text("name", &request.name).map_err(ServiceError::Validation)?;
        let relationship =
            require_text("relationship", &request.relationship).map_err(ServiceError::Validation)?;
        validate_email(&request.email).map_err(ServiceError::Validation)?;
        let email = normalize_email(&request.email);
        let pct = check_percentage(request.allocation_percentage)?;

        self.reject_self_nomination(owner_id, &email).await?;

        let existing = self.store.list_nominees(owner_id).await?;
        if existing.iter().any(|n| n.email == email) {
            return Err(ServiceError::Conflict(
                "A nominee with this email already exists".to_string(),
            ));
        }
        check_total(allocated(&existing, None), pct)?;

        let now = Utc::now();
        let nominee = NomineeRecord {
            id: Uuid::new_v4(),
            owner_id,
            name,
            email,
            relationship,
            phone: optional_text(request.phone),
            allocation_percentage: pct,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_nominee(&nominee).await?;
        info!(
            "Owner {} named nominee {} at {}%",
            owner_id, nominee.id, nominee.allocation_percentage
        );
        Ok(NomineeResponse::from(&nominee))
    }

    pub async fn update_nominee(
        &self,
        owner_id: Uuid,
        id: Uuid,
        request: UpdateNomineeRequest,
    ) -> ServiceResult<NomineeResponse> {
        let existing = self.store.list_nominees(owner_id).await?;
        let mut nominee = existing
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(nominee_not_found)?;

        if let Some(name) = request.name {
            nominee.name = require_text("name", &name).map_err(ServiceError::Validation)?;
        }
        if let Some(relationship) = request.relationship {
            nominee.relationship =
                require_text("relationship", &relationship).map_err(ServiceError::Validation)?;
        }
        if request.phone.is_some() {
            nominee.phone = optional_text(request.phone);
        }
        if let Some(email) = request.email {
            validate_email(&email).map_err(ServiceError::Validation)?;
            let email = normalize_email(&email);
            if email != nominee.email {
                self.reject_self_nomination(owner_id, &email).await?;
                if existing.iter().any(|n| n.id != id && n.email == email) {
                    return Err(ServiceError::Conflict(
                        "A nominee with this email already exists".to_string(),
                    ));
                }
            }
            nominee.email = email;
        }
        if let Some(pct) = request.allocation_percentage {
            let pct = check_percentage(pct)?;
            check_total(allocated(&existing, Some(id)), pct)?;
            nominee.allocation_percentage = pct;
        }
        nominee.updated_at = Utc::now();

        if !self.store.update_nominee(&nominee).await? {
            return Err(nominee_not_found());
        }
        info!("Owner {} updated nominee {}", owner_id, id);
        Ok(NomineeResponse::from(&nominee))
    }

    pub async fn delete_nominee(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<DeletedResponse> {
        if !self.store.delete_nominee(owner_id, id).await? {
            return Err(nominee_not_found());
        }
        info!("Owner {} removed nominee {}", owner_id, id);
        Ok(DeletedResponse { id, deleted: true })
    }

    /// Owners that named `email` as a nominee.
    pub async fn nominations_for(&self, email: &str) -> ServiceResult<Vec<NominationResponse>> {
        let email = normalize_email(email);
        let nominations = self.store.find_nominations_by_email(&email).await?;

        let mut out = Vec::with_capacity(nominations.len());
        for nomination in nominations {
            match self.store.find_user_by_id(nomination.owner_id).await? {
                Some(owner) => out.push(NominationResponse {
                    nominee_id: nomination.id,
                    owner_name: owner.name,
                    owner_email: owner.email,
                    relationship: nomination.relationship,
                    allocation_percentage: nomination.allocation_percentage,
                }),
                None => warn!(
                    "Nominee {} points at missing owner {}",
                    nomination.id, nomination.owner_id
                ),
            }
        }
        Ok(out)
    }

    async fn reject_self_nomination(&self, owner_id: Uuid, email: &str) -> ServiceResult<()> {
        let is_self = self
            .store
            .find_user_by_id(owner_id)
            .await?
            .map_or(false, |owner| owner.email.eq_ignore_ascii_case(email));
        if is_self {
            return Err(ServiceError::Validation(
                "You cannot nominate yourself".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_total(others: f64, pct: f64) -> ServiceResult<()> {
    if others + pct > 100.0 + PCT_EPSILON {
        return Err(ServiceError::Validation(format!(
            "Total allocation would be {:.2}%; only {:.2}% is unallocated",
            others + pct,
            (100.0 - others).max(0.0)
        )));
    }
    Ok(())
}
