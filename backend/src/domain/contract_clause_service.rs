//! Contract clause domain service.
//!
//! Places lender clauses into contract positions, retires and reactivates
//! them, and reconstructs a contract's clauses at a point in time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::info;

use crate::domain::clauses::{ClausePosition, LenderClause, Substitutions};
use crate::domain::contracts::{
    ContractClauseUsage, ContractSnapshot, MortgageContract, RenderedContract,
};
use crate::domain::ports::{
    AddLenderClauseRequest, ClausePositionRepository, ClausePositionRepositoryError,
    ContractClauseCommand, ContractClauseQuery, ContractClauseRepository,
    ContractClauseRepositoryError, LenderClauseRepository, LenderClauseRepositoryError,
};
use crate::domain::{
    ContractClauseUsageId, Error, LenderClauseId, MortgageContractId, UserId,
};

fn map_contract_error(error: ContractClauseRepositoryError) -> Error {
    match error {
        ContractClauseRepositoryError::Connection { message } => Error::service_unavailable(
            format!("contract clause repository unavailable: {message}"),
        ),
        ContractClauseRepositoryError::Query { message } => {
            Error::internal(format!("contract clause repository error: {message}"))
        }
        ContractClauseRepositoryError::Conflict { message } => Error::conflict(message),
    }
}

fn map_clause_error(error: LenderClauseRepositoryError) -> Error {
    match error {
        LenderClauseRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("lender clause repository unavailable: {message}"))
        }
        LenderClauseRepositoryError::Query { message }
        | LenderClauseRepositoryError::MissingReference { message }
        | LenderClauseRepositoryError::Conflict { message } => {
            Error::internal(format!("lender clause repository error: {message}"))
        }
    }
}

fn map_position_error(error: ClausePositionRepositoryError) -> Error {
    match error {
        ClausePositionRepositoryError::Connection { message } => Error::service_unavailable(
            format!("clause position repository unavailable: {message}"),
        ),
        ClausePositionRepositoryError::Query { message } => {
            Error::internal(format!("clause position repository error: {message}"))
        }
    }
}

/// Contract clause service implementing the command and query ports.
#[derive(Clone)]
pub struct ContractClauseService<C, L, P> {
    contracts: Arc<C>,
    clauses: Arc<L>,
    positions: Arc<P>,
    clock: Arc<dyn Clock>,
}

impl<C, L, P> ContractClauseService<C, L, P> {
    /// Create a service over the contract, clause and position repositories.
    pub fn new(
        contracts: Arc<C>,
        clauses: Arc<L>,
        positions: Arc<P>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            contracts,
            clauses,
            positions,
            clock,
        }
    }
}

impl<C, L, P> ContractClauseService<C, L, P>
where
    C: ContractClauseRepository,
    L: LenderClauseRepository,
    P: ClausePositionRepository,
{
    async fn require_contract(&self, id: MortgageContractId) -> Result<MortgageContract, Error> {
        self.contracts
            .find_contract(id)
            .await
            .map_err(map_contract_error)?
            .ok_or_else(|| Error::not_found(format!("mortgage contract {id} not found")))
    }

    async fn require_position(&self, section_identifier: &str) -> Result<ClausePosition, Error> {
        self.positions
            .find_by_section(section_identifier)
            .await
            .map_err(map_position_error)?
            .ok_or_else(|| {
                Error::not_found(format!("clause position '{section_identifier}' not found"))
            })
    }

    async fn require_clause(&self, id: LenderClauseId) -> Result<LenderClause, Error> {
        self.clauses
            .find_by_id(id)
            .await
            .map_err(map_clause_error)?
            .ok_or_else(|| Error::not_found(format!("lender clause {id} not found")))
    }

    async fn snapshot(
        &self,
        contract_id: MortgageContractId,
        at: DateTime<Utc>,
    ) -> Result<ContractSnapshot, Error> {
        self.require_contract(contract_id).await?;
        let usages = self
            .contracts
            .list_usages(contract_id)
            .await
            .map_err(map_contract_error)?;
        let positions = self.positions.list().await.map_err(map_position_error)?;
        Ok(ContractSnapshot::reconstruct(
            contract_id,
            at,
            &usages,
            &positions,
        ))
    }
}

#[async_trait]
impl<C, L, P> ContractClauseCommand for ContractClauseService<C, L, P>
where
    C: ContractClauseRepository,
    L: LenderClauseRepository,
    P: ClausePositionRepository,
{
    async fn add_lender_clause(
        &self,
        contract_id: MortgageContractId,
        request: AddLenderClauseRequest,
        actor: UserId,
    ) -> Result<ContractClauseUsage, Error> {
        let contract = self.require_contract(contract_id).await?;
        let position = self.require_position(&request.section_identifier).await?;
        let clause = self.require_clause(request.lender_clause_id).await?;
        let now = self.clock.utc();

        let usage = ContractClauseUsage::capture(&contract, &clause, &position, actor, now)?;
        let retired = self
            .contracts
            .insert_replacing_active(&usage, actor, now)
            .await
            .map_err(map_contract_error)?;

        info!(
            contract_id = %contract_id,
            position = %position.section_identifier,
            usage_id = %usage.id(),
            clause_version = usage.clause_version_at_usage(),
            replaced_usage = ?retired.as_ref().map(ContractClauseUsage::id),
            actor = %actor,
            "lender clause added to contract"
        );
        Ok(usage)
    }

    async fn remove_lender_clause(
        &self,
        contract_id: MortgageContractId,
        section_identifier: String,
        actor: UserId,
    ) -> Result<ContractClauseUsage, Error> {
        self.require_contract(contract_id).await?;
        let position = self.require_position(&section_identifier).await?;
        let not_found = || {
            Error::not_found(format!(
                "no lender clause at position '{section_identifier}' of contract {contract_id}"
            ))
        };

        let mut usage = self
            .contracts
            .find_active_usage(contract_id, position.id)
            .await
            .map_err(map_contract_error)?
            .ok_or_else(&not_found)?;
        usage.retire(actor, self.clock.utc());

        let removed = self
            .contracts
            .mark_removed(&usage)
            .await
            .map_err(map_contract_error)?;
        if !removed {
            return Err(not_found());
        }

        info!(
            contract_id = %contract_id,
            position = %section_identifier,
            usage_id = %usage.id(),
            actor = %actor,
            "lender clause removed from contract"
        );
        Ok(usage)
    }

    async fn reactivate_usage(
        &self,
        contract_id: MortgageContractId,
        usage_id: ContractClauseUsageId,
        actor: UserId,
    ) -> Result<ContractClauseUsage, Error> {
        let mut usage = self
            .contracts
            .find_usage(usage_id)
            .await
            .map_err(map_contract_error)?
            .filter(|usage| usage.mortgage_contract_id() == contract_id)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "clause usage {usage_id} not found on contract {contract_id}"
                ))
            })?;

        if !usage.reactivate() {
            return Ok(usage);
        }
        let retired = self
            .contracts
            .reactivate_replacing_active(&usage, actor, self.clock.utc())
            .await
            .map_err(map_contract_error)?;

        info!(
            contract_id = %contract_id,
            usage_id = %usage_id,
            replaced_usage = ?retired.as_ref().map(ContractClauseUsage::id),
            actor = %actor,
            "contract clause usage reactivated"
        );
        Ok(usage)
    }
}

#[async_trait]
impl<C, L, P> ContractClauseQuery for ContractClauseService<C, L, P>
where
    C: ContractClauseRepository,
    L: LenderClauseRepository,
    P: ClausePositionRepository,
{
    async fn list_positions(&self) -> Result<Vec<ClausePosition>, Error> {
        self.positions.list().await.map_err(map_position_error)
    }

    async fn list_usages(
        &self,
        contract_id: MortgageContractId,
    ) -> Result<Vec<ContractClauseUsage>, Error> {
        self.require_contract(contract_id).await?;
        self.contracts
            .list_usages(contract_id)
            .await
            .map_err(map_contract_error)
    }

    async fn contract_at_time(
        &self,
        contract_id: MortgageContractId,
        at: DateTime<Utc>,
    ) -> Result<ContractSnapshot, Error> {
        self.snapshot(contract_id, at).await
    }

    async fn rendered_contract_at_time(
        &self,
        contract_id: MortgageContractId,
        at: DateTime<Utc>,
        values: Substitutions,
    ) -> Result<RenderedContract, Error> {
        Ok(self.snapshot(contract_id, at).await?.rendered(&values))
    }
}

#[cfg(test)]
#[path = "contract_clause_service_tests.rs"]
mod tests;
