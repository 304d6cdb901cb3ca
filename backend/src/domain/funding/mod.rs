//! Lender funding relationships.
//!
//! A lender draws capital from wholesale funders through
//! [`LenderWholesaleFunder`] links and from the funders' individual pools
//! through [`LenderFunderPool`] links. A pool link may only be active while
//! the lender's link to the pool's owning wholesale funder is active; see
//! [`activation`] for the rules and the deactivation cascade.

pub mod activation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    FunderPoolId, LenderFunderPoolId, LenderId, LenderWholesaleFunderId, WholesaleFunderId,
};

pub use activation::{
    ActivationBlockedError, CascadeOutcome, WholesaleFunderToggle, can_activate,
    cascade_invariant_holds, ensure_can_activate,
};

/// Upstream capital provider, referenced by id and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WholesaleFunder {
    #[schema(value_type = String, format = Uuid)]
    pub id: WholesaleFunderId,
    pub name: String,
}

/// A tranche of capital owned by a wholesale funder.
///
/// Amounts are in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunderPool {
    #[schema(value_type = String, format = Uuid)]
    pub id: FunderPoolId,
    pub name: String,
    pub wholesale_funder: WholesaleFunder,
    pub total_amount: i64,
    pub allocated_amount: i64,
}

impl FunderPool {
    /// Capital not yet committed, never negative.
    #[must_use]
    pub fn available_amount(&self) -> i64 {
        self.total_amount
            .saturating_sub(self.allocated_amount)
            .max(0)
    }
}

/// Link between a lender and a wholesale funder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LenderWholesaleFunder {
    #[schema(value_type = String, format = Uuid)]
    pub id: LenderWholesaleFunderId,
    #[schema(value_type = String, format = Uuid)]
    pub lender_id: LenderId,
    pub wholesale_funder: WholesaleFunder,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Link between a lender and one funder pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LenderFunderPool {
    #[schema(value_type = String, format = Uuid)]
    pub id: LenderFunderPoolId,
    #[schema(value_type = String, format = Uuid)]
    pub lender_id: LenderId,
    pub funder_pool: FunderPool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LenderFunderPool {
    /// Wholesale funder owning this link's pool.
    #[must_use]
    pub fn wholesale_funder(&self) -> &WholesaleFunder {
        &self.funder_pool.wholesale_funder
    }

    /// Whether `parent` is the sibling link this pool link depends on.
    #[must_use]
    pub fn is_child_of(&self, parent: &LenderWholesaleFunder) -> bool {
        self.lender_id == parent.lender_id && self.wholesale_funder().id == parent.wholesale_funder.id
    }
}

/// A lender's complete funding picture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LenderFundingRelationships {
    pub wholesale_funders: Vec<LenderWholesaleFunder>,
    pub funder_pools: Vec<LenderFunderPool>,
}
