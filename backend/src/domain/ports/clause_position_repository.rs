//! Port for clause position reference data.

use async_trait::async_trait;

use crate::domain::ClausePositionId;
use crate::domain::clauses::{ClausePosition, ClausePositionSeed};

use super::define_port_error;

define_port_error! {
    /// Errors raised by clause position adapters.
    pub enum ClausePositionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "clause position repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "clause position repository query failed: {message}",
    }
}

/// Port for reading and seeding clause positions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClausePositionRepository: Send + Sync {
    /// All positions ordered by `display_order`.
    async fn list(&self) -> Result<Vec<ClausePosition>, ClausePositionRepositoryError>;

    /// Find a position by id.
    async fn find_by_id(
        &self,
        id: ClausePositionId,
    ) -> Result<Option<ClausePosition>, ClausePositionRepositoryError>;

    /// Find a position by its template marker.
    async fn find_by_section(
        &self,
        section_identifier: &str,
    ) -> Result<Option<ClausePosition>, ClausePositionRepositoryError>;

    /// Insert any seeds whose `section_identifier` is not stored yet.
    /// Returns the number of rows inserted.
    async fn seed(
        &self,
        seeds: &[ClausePositionSeed],
    ) -> Result<usize, ClausePositionRepositoryError>;
}
