//! Port for lender clause persistence and its audit trail.

use async_trait::async_trait;

use crate::domain::clauses::{
    LenderClause, LenderClauseVersion, NewLenderClause, NewLenderClauseVersion,
};
use crate::domain::{LenderClauseId, LenderId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by lender clause adapters.
    pub enum LenderClauseRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "lender clause repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "lender clause repository query failed: {message}",
        /// The owning lender or the clause itself does not exist.
        MissingReference { message: String } =>
            "lender clause reference missing: {message}",
        /// The stored clause changed after it was loaded.
        Conflict { message: String } =>
            "lender clause write conflict: {message}",
    }
}

/// Port for storing clauses. Entries are only ever appended.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LenderClauseRepository: Send + Sync {
    /// Insert a clause with the next version number for its lender and its
    /// `created` audit entry, atomically.
    async fn create(
        &self,
        clause: &NewLenderClause,
    ) -> Result<LenderClause, LenderClauseRepositoryError>;

    /// Persist the clause's current state and append `entry`, atomically.
    ///
    /// `loaded` is the state the change was computed from. The write is
    /// rejected with [`LenderClauseRepositoryError::Conflict`] when the stored
    /// row no longer matches it.
    async fn save(
        &self,
        loaded: &LenderClause,
        clause: &LenderClause,
        entry: &NewLenderClauseVersion,
    ) -> Result<(), LenderClauseRepositoryError>;

    /// Find a clause by id.
    async fn find_by_id(
        &self,
        id: LenderClauseId,
    ) -> Result<Option<LenderClause>, LenderClauseRepositoryError>;

    /// A lender's clauses, newest version first.
    async fn list_for_lender(
        &self,
        lender_id: LenderId,
    ) -> Result<Vec<LenderClause>, LenderClauseRepositoryError>;

    /// A clause's audit entries, oldest first.
    async fn list_versions(
        &self,
        id: LenderClauseId,
    ) -> Result<Vec<LenderClauseVersion>, LenderClauseRepositoryError>;
}
