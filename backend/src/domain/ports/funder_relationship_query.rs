//! Driving port for funding relationship reads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::funding::LenderFundingRelationships;
use crate::domain::{Error, FunderPoolId, LenderId};

/// Whether a pool link could be switched on right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivationCheck {
    pub can_activate: bool,
    /// Remediation message when activation is blocked.
    pub reason: Option<String>,
}

/// Driving port for reading funding relationships.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FunderRelationshipQuery: Send + Sync {
    /// Evaluate the activation guard for a pool link without changing it.
    async fn can_activate_funder_pool(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<ActivationCheck, Error>;

    /// Every relationship held by a lender.
    async fn list_relationships(
        &self,
        lender_id: LenderId,
    ) -> Result<LenderFundingRelationships, Error>;
}
