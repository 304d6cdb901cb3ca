//! Mortgage contracts and the lender clauses placed into them.
//!
//! Adding a clause to a contract captures a [`ContractClauseUsage`]: an
//! immutable snapshot of the clause content together with the contract and
//! clause versions at that moment. Later edits to the clause never change a
//! captured snapshot, so the contract can be reconstructed as it stood at any
//! point in time (see [`reconstruction`]).

pub mod reconstruction;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::clauses::{ClausePosition, LenderClause};
use crate::domain::{
    ClausePositionId, ContractClauseUsageId, Error, LenderClauseId, LenderId,
    MortgageContractId, UserId,
};

pub use reconstruction::{ContractClauseAtTime, ContractSnapshot, RenderedContract, RenderedContractClause};

/// The parts of a mortgage contract clause usage depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MortgageContract {
    #[schema(value_type = String, format = Uuid)]
    pub id: MortgageContractId,
    #[schema(value_type = String, format = Uuid)]
    pub lender_id: LenderId,
    pub reference: String,
    /// Contract revision, starting at 1.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reasons a clause cannot be placed into a contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClauseUsageError {
    #[error("clause '{title}' belongs to a different lender than contract '{reference}'")]
    ForeignLender { title: String, reference: String },
    #[error("clause '{title}' must be active before it can be added to a contract")]
    ClauseNotActive { title: String },
}

impl From<ClauseUsageError> for Error {
    fn from(value: ClauseUsageError) -> Self {
        Error::invalid_request(value.to_string())
    }
}

/// Every stored field of a usage, used to rehydrate from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractClauseUsageRecord {
    pub id: ContractClauseUsageId,
    pub mortgage_contract_id: MortgageContractId,
    pub lender_clause_id: LenderClauseId,
    pub clause_position_id: ClausePositionId,
    pub clause_content_snapshot: String,
    pub contract_version_at_usage: u32,
    pub clause_version_at_usage: u32,
    pub active: bool,
    pub added_by: UserId,
    pub added_at: DateTime<Utc>,
    pub removed_by: Option<UserId>,
    pub removed_at: Option<DateTime<Utc>>,
}

/// A lender clause placed at one position of one contract.
///
/// ## Invariants
/// - The content snapshot and captured versions never change.
/// - `removed_at` and `removed_by` are set exactly when the usage was
///   retired and not reactivated since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractClauseUsage {
    #[schema(value_type = String, format = Uuid)]
    id: ContractClauseUsageId,
    #[schema(value_type = String, format = Uuid)]
    mortgage_contract_id: MortgageContractId,
    #[schema(value_type = String, format = Uuid)]
    lender_clause_id: LenderClauseId,
    #[schema(value_type = String, format = Uuid)]
    clause_position_id: ClausePositionId,
    clause_content_snapshot: String,
    contract_version_at_usage: u32,
    clause_version_at_usage: u32,
    active: bool,
    #[schema(value_type = String, format = Uuid)]
    added_by: UserId,
    added_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = Uuid)]
    removed_by: Option<UserId>,
    removed_at: Option<DateTime<Utc>>,
}

impl From<ContractClauseUsageRecord> for ContractClauseUsage {
    fn from(record: ContractClauseUsageRecord) -> Self {
        Self {
            id: record.id,
            mortgage_contract_id: record.mortgage_contract_id,
            lender_clause_id: record.lender_clause_id,
            clause_position_id: record.clause_position_id,
            clause_content_snapshot: record.clause_content_snapshot,
            contract_version_at_usage: record.contract_version_at_usage,
            clause_version_at_usage: record.clause_version_at_usage,
            active: record.active,
            added_by: record.added_by,
            added_at: record.added_at,
            removed_by: record.removed_by,
            removed_at: record.removed_at,
        }
    }
}

impl ContractClauseUsage {
    /// Snapshot `clause` into `position` of `contract`.
    ///
    /// # Errors
    ///
    /// Fails when the clause belongs to another lender or is not active.
    pub fn capture(
        contract: &MortgageContract,
        clause: &LenderClause,
        position: &ClausePosition,
        added_by: UserId,
        added_at: DateTime<Utc>,
    ) -> Result<Self, ClauseUsageError> {
        if clause.lender_id() != contract.lender_id {
            return Err(ClauseUsageError::ForeignLender {
                title: clause.title().to_owned(),
                reference: contract.reference.clone(),
            });
        }
        if !clause.is_active() {
            return Err(ClauseUsageError::ClauseNotActive {
                title: clause.title().to_owned(),
            });
        }

        Ok(Self {
            id: ContractClauseUsageId::random(),
            mortgage_contract_id: contract.id,
            lender_clause_id: clause.id(),
            clause_position_id: position.id,
            clause_content_snapshot: clause.content().to_owned(),
            contract_version_at_usage: contract.version,
            clause_version_at_usage: clause.version(),
            active: true,
            added_by,
            added_at,
            removed_by: None,
            removed_at: None,
        })
    }

    pub fn id(&self) -> ContractClauseUsageId {
        self.id
    }

    pub fn mortgage_contract_id(&self) -> MortgageContractId {
        self.mortgage_contract_id
    }

    pub fn lender_clause_id(&self) -> LenderClauseId {
        self.lender_clause_id
    }

    pub fn clause_position_id(&self) -> ClausePositionId {
        self.clause_position_id
    }

    /// Clause markup as it was when the usage was captured.
    pub fn clause_content_snapshot(&self) -> &str {
        &self.clause_content_snapshot
    }

    pub fn contract_version_at_usage(&self) -> u32 {
        self.contract_version_at_usage
    }

    pub fn clause_version_at_usage(&self) -> u32 {
        self.clause_version_at_usage
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn added_by(&self) -> UserId {
        self.added_by
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    pub fn removed_by(&self) -> Option<UserId> {
        self.removed_by
    }

    pub fn removed_at(&self) -> Option<DateTime<Utc>> {
        self.removed_at
    }

    /// Take the usage out of the contract. Retiring an inactive usage
    /// changes nothing and returns `false`.
    pub fn retire(&mut self, removed_by: UserId, removed_at: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.removed_by = Some(removed_by);
        self.removed_at = Some(removed_at);
        true
    }

    /// Put a retired usage back into the contract. The original `added_at`
    /// and `added_by` are kept. Reactivating an active usage returns `false`.
    pub fn reactivate(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.removed_by = None;
        self.removed_at = None;
        true
    }

    /// Whether the usage was part of the contract at `at`.
    #[must_use]
    pub fn was_active_at(&self, at: DateTime<Utc>) -> bool {
        self.added_at <= at && self.removed_at.is_none_or(|removed| removed > at)
    }
}
