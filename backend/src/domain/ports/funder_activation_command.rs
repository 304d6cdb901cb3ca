//! Driving port for funding relationship mutations.

use async_trait::async_trait;

use crate::domain::funding::{
    CascadeOutcome, LenderFunderPool, LenderWholesaleFunder, WholesaleFunderToggle,
};
use crate::domain::{Error, FunderPoolId, LenderId, WholesaleFunderId};

/// Driving port for linking funders and switching relationships on and off.
///
/// Switching a wholesale funder link off always cascades to its pool links;
/// switching a pool link on fails with
/// [`crate::domain::ErrorCode::ActivationBlocked`] while its parent is off.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FunderActivationCommand: Send + Sync {
    /// Link a lender to a wholesale funder.
    async fn link_wholesale_funder(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        active: bool,
    ) -> Result<LenderWholesaleFunder, Error>;

    /// Link a lender to a pool of an already linked wholesale funder.
    async fn attach_funder_pool(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<LenderFunderPool, Error>;

    /// Flip a wholesale funder link.
    async fn toggle_wholesale_funder(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<WholesaleFunderToggle, Error>;

    /// Set a wholesale funder link's state. `false` runs the cascade.
    async fn set_wholesale_funder_active(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        active: bool,
    ) -> Result<WholesaleFunderToggle, Error>;

    /// Switch a wholesale funder link and its pool links off.
    async fn deactivate_and_cascade(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<CascadeOutcome, Error>;

    /// Flip a pool link.
    async fn toggle_funder_pool(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<LenderFunderPool, Error>;

    /// Set a pool link's state.
    async fn set_funder_pool_active(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        active: bool,
    ) -> Result<LenderFunderPool, Error>;

    /// Remove a wholesale funder link and the pool links beneath it.
    /// Returns the number of pool links removed.
    async fn unlink_wholesale_funder(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<usize, Error>;

    /// Remove a pool link.
    async fn detach_funder_pool(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<(), Error>;
}
