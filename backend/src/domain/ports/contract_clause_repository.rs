//! Port for mortgage contracts and their clause usages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::contracts::{ContractClauseUsage, MortgageContract};
use crate::domain::{ClausePositionId, ContractClauseUsageId, MortgageContractId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by contract clause adapters.
    pub enum ContractClauseRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "contract clause repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "contract clause repository query failed: {message}",
        /// Another active usage occupies the position.
        Conflict { message: String } =>
            "contract clause usage conflict: {message}",
    }
}

/// Port for contract lookups and usage writes.
///
/// Usage rows are never deleted. The replace operations retire whatever
/// usage is active at the position before writing, in one transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractClauseRepository: Send + Sync {
    /// Find a contract by id.
    async fn find_contract(
        &self,
        id: MortgageContractId,
    ) -> Result<Option<MortgageContract>, ContractClauseRepositoryError>;

    /// Find a usage by id.
    async fn find_usage(
        &self,
        id: ContractClauseUsageId,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError>;

    /// The usage currently active at a position, if any.
    async fn find_active_usage(
        &self,
        contract_id: MortgageContractId,
        position_id: ClausePositionId,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError>;

    /// Every usage of a contract, active or retired, oldest first.
    async fn list_usages(
        &self,
        contract_id: MortgageContractId,
    ) -> Result<Vec<ContractClauseUsage>, ContractClauseRepositoryError>;

    /// Retire the active usage at `usage`'s position, then insert `usage`.
    /// Returns the retired usage.
    async fn insert_replacing_active(
        &self,
        usage: &ContractClauseUsage,
        retired_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError>;

    /// Persist a retirement made on the entity. Only updates a row that is
    /// still active; returns whether it did.
    async fn mark_removed(
        &self,
        usage: &ContractClauseUsage,
    ) -> Result<bool, ContractClauseRepositoryError>;

    /// Retire any other active usage at the position, then persist the
    /// reactivated `usage`. Returns the retired usage.
    async fn reactivate_replacing_active(
        &self,
        usage: &ContractClauseUsage,
        retired_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError>;
}
