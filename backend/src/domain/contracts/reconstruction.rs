//! Point-in-time reconstruction of a contract's lender clauses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ContractClauseUsage;
use crate::domain::clauses::{ClausePosition, Substitutions, render_clause};
use crate::domain::{ClausePositionId, ContractClauseUsageId, LenderClauseId, MortgageContractId};

/// One clause as it stood in the contract at the requested time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractClauseAtTime {
    pub position: ClausePosition,
    #[schema(value_type = String, format = Uuid)]
    pub usage_id: ContractClauseUsageId,
    #[schema(value_type = String, format = Uuid)]
    pub lender_clause_id: LenderClauseId,
    pub clause_version: u32,
    pub content: String,
    pub added_at: DateTime<Utc>,
}

/// A contract's lender clauses at a point in time, in template order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractSnapshot {
    #[schema(value_type = String, format = Uuid)]
    pub contract_id: MortgageContractId,
    pub as_of: DateTime<Utc>,
    pub clauses: Vec<ContractClauseAtTime>,
}

/// Rendered HTML for one clause of a [`RenderedContract`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderedContractClause {
    pub section_identifier: String,
    pub position_name: String,
    pub html: String,
}

/// A [`ContractSnapshot`] rendered through the markup pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderedContract {
    #[schema(value_type = String, format = Uuid)]
    pub contract_id: MortgageContractId,
    pub as_of: DateTime<Utc>,
    pub clauses: Vec<RenderedContractClause>,
}

impl ContractSnapshot {
    /// Select the usages active at `as_of` and order them by position.
    ///
    /// Storage allows one active usage per position, so at most one usage
    /// should match each position. If historical rows overlap, the most
    /// recently added one wins. Usages whose position is not in `positions`
    /// are skipped.
    #[must_use]
    pub fn reconstruct(
        contract_id: MortgageContractId,
        as_of: DateTime<Utc>,
        usages: &[ContractClauseUsage],
        positions: &[ClausePosition],
    ) -> Self {
        let by_id: BTreeMap<ClausePositionId, &ClausePosition> =
            positions.iter().map(|position| (position.id, position)).collect();

        let mut latest: BTreeMap<ClausePositionId, &ContractClauseUsage> = BTreeMap::new();
        for usage in usages
            .iter()
            .filter(|usage| usage.mortgage_contract_id() == contract_id)
            .filter(|usage| usage.was_active_at(as_of))
        {
            latest
                .entry(usage.clause_position_id())
                .and_modify(|current| {
                    if usage.added_at() > current.added_at() {
                        *current = usage;
                    }
                })
                .or_insert(usage);
        }

        let mut clauses: Vec<ContractClauseAtTime> = latest
            .into_iter()
            .filter_map(|(position_id, usage)| {
                by_id.get(&position_id).map(|position| ContractClauseAtTime {
                    position: (*position).clone(),
                    usage_id: usage.id(),
                    lender_clause_id: usage.lender_clause_id(),
                    clause_version: usage.clause_version_at_usage(),
                    content: usage.clause_content_snapshot().to_owned(),
                    added_at: usage.added_at(),
                })
            })
            .collect();
        clauses.sort_by(|a, b| {
            a.position
                .display_order
                .cmp(&b.position.display_order)
                .then_with(|| a.position.section_identifier.cmp(&b.position.section_identifier))
        });

        Self {
            contract_id,
            as_of,
            clauses,
        }
    }

    /// Render every snapshot with `values` substituted.
    #[must_use]
    pub fn rendered(&self, values: &Substitutions) -> RenderedContract {
        RenderedContract {
            contract_id: self.contract_id,
            as_of: self.as_of,
            clauses: self
                .clauses
                .iter()
                .map(|clause| RenderedContractClause {
                    section_identifier: clause.position.section_identifier.clone(),
                    position_name: clause.position.name.clone(),
                    html: render_clause(&clause.content, values),
                })
                .collect(),
        }
    }
}
