//! Driving port for lender clause reads and rendering.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::clauses::{AuditLine, LenderClause, Substitutions};
use crate::domain::{Error, LenderClauseId, LenderId};

/// HTML produced from clause markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMarkup {
    pub html: String,
    /// Placeholder names found in the source markup.
    pub placeholders: Vec<String>,
}

/// Driving port for clause reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LenderClauseQuery: Send + Sync {
    /// Fetch one clause.
    async fn get_clause(&self, id: LenderClauseId) -> Result<LenderClause, Error>;

    /// A lender's clauses, newest version first.
    async fn list_clauses(&self, lender_id: LenderId) -> Result<Vec<LenderClause>, Error>;

    /// Audit trail for a clause, oldest first.
    async fn clause_history(&self, id: LenderClauseId) -> Result<Vec<AuditLine>, Error>;

    /// Render a stored clause with caller-supplied values.
    async fn render_clause(
        &self,
        id: LenderClauseId,
        values: Substitutions,
    ) -> Result<RenderedMarkup, Error>;

    /// Render a stored clause with sample values.
    async fn preview_clause(&self, id: LenderClauseId) -> Result<RenderedMarkup, Error>;

    /// Render unsaved markup with sample values.
    async fn preview_markup(&self, content: String) -> Result<RenderedMarkup, Error>;
}
