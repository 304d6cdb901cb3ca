//! Driving port for placing lender clauses into contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::contracts::ContractClauseUsage;
use crate::domain::{ContractClauseUsageId, Error, LenderClauseId, MortgageContractId, UserId};

/// Request to place a clause at a template position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddLenderClauseRequest {
    #[schema(value_type = String, format = Uuid)]
    pub lender_clause_id: LenderClauseId,
    /// Position marker such as `before_signatures`.
    pub section_identifier: String,
}

/// Driving port for contract clause writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractClauseCommand: Send + Sync {
    /// Snapshot the clause into the position, retiring whatever was there.
    async fn add_lender_clause(
        &self,
        contract_id: MortgageContractId,
        request: AddLenderClauseRequest,
        actor: UserId,
    ) -> Result<ContractClauseUsage, Error>;

    /// Retire the clause at the position.
    async fn remove_lender_clause(
        &self,
        contract_id: MortgageContractId,
        section_identifier: String,
        actor: UserId,
    ) -> Result<ContractClauseUsage, Error>;

    /// Put a retired usage back, retiring whatever now occupies its position.
    async fn reactivate_usage(
        &self,
        contract_id: MortgageContractId,
        usage_id: ContractClauseUsageId,
        actor: UserId,
    ) -> Result<ContractClauseUsage, Error>;
}
