//! Port for lender funding relationship persistence.
//!
//! Every state change that must stay consistent with a sibling row is a
//! single repository call so adapters can run it in one transaction: the
//! deactivation cascade, the guarded pool activation, and the cascade delete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::funding::{
    CascadeOutcome, LenderFunderPool, LenderFundingRelationships, LenderWholesaleFunder,
};
use crate::domain::{FunderPoolId, LenderId, WholesaleFunderId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by funding relationship adapters.
    pub enum FunderRelationshipRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "funder relationship repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "funder relationship repository query failed: {message}",
        /// The relationship already exists.
        Duplicate { message: String } =>
            "funder relationship already exists: {message}",
        /// A referenced lender, funder, pool or parent link does not exist.
        MissingReference { message: String } =>
            "funder relationship reference missing: {message}",
    }
}

/// Outcome of a guarded pool activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolActivation {
    /// The pool link is now active.
    Activated(LenderFunderPool),
    /// The parent link was inactive; the pool link is unchanged.
    Blocked(LenderFunderPool),
}

/// Port for reading and mutating lender funding relationships.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FunderRelationshipRepository: Send + Sync {
    /// Find the lender's link to a wholesale funder.
    async fn find_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<Option<LenderWholesaleFunder>, FunderRelationshipRepositoryError>;

    /// Find the lender's link to a funder pool.
    async fn find_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<Option<LenderFunderPool>, FunderRelationshipRepositoryError>;

    /// Every relationship held by the lender, ordered by funder then pool name.
    async fn list_for_lender(
        &self,
        lender_id: LenderId,
    ) -> Result<LenderFundingRelationships, FunderRelationshipRepositoryError>;

    /// Link a lender to a wholesale funder.
    async fn create_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<LenderWholesaleFunder, FunderRelationshipRepositoryError>;

    /// Link a lender to a pool. The new link is active exactly when the
    /// parent wholesale funder link is active.
    ///
    /// Fails with `MissingReference` when the pool or the parent link does
    /// not exist.
    async fn create_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        at: DateTime<Utc>,
    ) -> Result<LenderFunderPool, FunderRelationshipRepositoryError>;

    /// Switch a wholesale funder link on. Child pool links are untouched.
    async fn activate_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        at: DateTime<Utc>,
    ) -> Result<Option<LenderWholesaleFunder>, FunderRelationshipRepositoryError>;

    /// Switch a wholesale funder link off and, atomically, every active pool
    /// link beneath it.
    async fn deactivate_wholesale_funder_link_cascade(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        at: DateTime<Utc>,
    ) -> Result<Option<CascadeOutcome>, FunderRelationshipRepositoryError>;

    /// Switch a pool link on if, and only if, its parent link is active when
    /// the update runs.
    async fn activate_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        at: DateTime<Utc>,
    ) -> Result<Option<PoolActivation>, FunderRelationshipRepositoryError>;

    /// Switch a pool link off.
    async fn deactivate_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        at: DateTime<Utc>,
    ) -> Result<Option<LenderFunderPool>, FunderRelationshipRepositoryError>;

    /// Remove a wholesale funder link together with the lender's links to
    /// the funder's pools. Returns the number of pool links removed, or
    /// `None` when the link did not exist.
    async fn delete_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<Option<usize>, FunderRelationshipRepositoryError>;

    /// Remove a pool link. Returns whether a row was removed.
    async fn delete_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<bool, FunderRelationshipRepositoryError>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn missing_reference_names_the_reference() {
        let err = FunderRelationshipRepositoryError::missing_reference("parent link");
        assert_eq!(
            err.to_string(),
            "funder relationship reference missing: parent link"
        );
    }
}
