//! Driving port for contract clause reads and historical reconstruction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::clauses::{ClausePosition, Substitutions};
use crate::domain::contracts::{ContractClauseUsage, ContractSnapshot, RenderedContract};
use crate::domain::{Error, MortgageContractId};

/// Driving port for contract clause reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractClauseQuery: Send + Sync {
    /// Template positions in display order.
    async fn list_positions(&self) -> Result<Vec<ClausePosition>, Error>;

    /// Every usage of a contract, active or retired.
    async fn list_usages(
        &self,
        contract_id: MortgageContractId,
    ) -> Result<Vec<ContractClauseUsage>, Error>;

    /// The contract's clause snapshots as they stood at `at`.
    async fn contract_at_time(
        &self,
        contract_id: MortgageContractId,
        at: DateTime<Utc>,
    ) -> Result<ContractSnapshot, Error>;

    /// [`Self::contract_at_time`] rendered to HTML with `values` substituted.
    async fn rendered_contract_at_time(
        &self,
        contract_id: MortgageContractId,
        at: DateTime<Utc>,
        values: Substitutions,
    ) -> Result<RenderedContract, Error>;
}
