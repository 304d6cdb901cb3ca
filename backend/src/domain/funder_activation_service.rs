//! Funding relationship domain service.
//!
//! Implements the activation cascade driving ports on top of
//! [`FunderRelationshipRepository`]. The pure activation rules live in
//! [`crate::domain::funding::activation`]; this service sequences repository
//! calls and turns their outcomes into domain errors.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::funding::{
    ActivationBlockedError, CascadeOutcome, LenderFunderPool, LenderFundingRelationships,
    LenderWholesaleFunder, WholesaleFunderToggle, can_activate,
};
use crate::domain::ports::{
    ActivationCheck, FunderActivationCommand, FunderRelationshipQuery,
    FunderRelationshipRepository, FunderRelationshipRepositoryError, PoolActivation,
};
use crate::domain::{Error, FunderPoolId, LenderId, WholesaleFunderId};

fn map_repository_error(error: FunderRelationshipRepositoryError) -> Error {
    match error {
        FunderRelationshipRepositoryError::Connection { message } => Error::service_unavailable(
            format!("funder relationship repository unavailable: {message}"),
        ),
        FunderRelationshipRepositoryError::Query { message } => {
            Error::internal(format!("funder relationship repository error: {message}"))
        }
        FunderRelationshipRepositoryError::Duplicate { message } => {
            Error::conflict(format!("relationship already exists: {message}"))
        }
        FunderRelationshipRepositoryError::MissingReference { message } => {
            Error::not_found(message)
        }
    }
}

fn wholesale_funder_not_found(lender_id: LenderId, wholesale_funder_id: WholesaleFunderId) -> Error {
    Error::not_found(format!(
        "lender {lender_id} has no relationship with wholesale funder {wholesale_funder_id}"
    ))
}

fn funder_pool_not_found(lender_id: LenderId, funder_pool_id: FunderPoolId) -> Error {
    Error::not_found(format!(
        "lender {lender_id} has no relationship with funder pool {funder_pool_id}"
    ))
}

/// Funding relationship service implementing the command and query ports.
#[derive(Clone)]
pub struct FunderActivationService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> FunderActivationService<R> {
    /// Create a service over `repo`, stamping changes with `clock`.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

impl<R> FunderActivationService<R>
where
    R: FunderRelationshipRepository,
{
    async fn require_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<LenderWholesaleFunder, Error> {
        self.repo
            .find_wholesale_funder_link(lender_id, wholesale_funder_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| wholesale_funder_not_found(lender_id, wholesale_funder_id))
    }

    async fn require_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<LenderFunderPool, Error> {
        self.repo
            .find_funder_pool_link(lender_id, funder_pool_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| funder_pool_not_found(lender_id, funder_pool_id))
    }

    async fn activate_wholesale_funder(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<LenderWholesaleFunder, Error> {
        let link = self
            .repo
            .activate_wholesale_funder_link(lender_id, wholesale_funder_id, self.clock.utc())
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| wholesale_funder_not_found(lender_id, wholesale_funder_id))?;
        info!(
            lender_id = %lender_id,
            wholesale_funder = %link.wholesale_funder.name,
            "wholesale funder relationship activated"
        );
        Ok(link)
    }

    async fn activate_funder_pool(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<LenderFunderPool, Error> {
        let outcome = self
            .repo
            .activate_funder_pool_link(lender_id, funder_pool_id, self.clock.utc())
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| funder_pool_not_found(lender_id, funder_pool_id))?;

        match outcome {
            PoolActivation::Activated(link) => {
                info!(
                    lender_id = %lender_id,
                    funder_pool = %link.funder_pool.name,
                    "funder pool relationship activated"
                );
                Ok(link)
            }
            PoolActivation::Blocked(link) => {
                let blocked = ActivationBlockedError::for_pool(&link);
                warn!(
                    lender_id = %lender_id,
                    funder_pool = %blocked.funder_pool_name,
                    wholesale_funder = %blocked.wholesale_funder_name,
                    "funder pool activation blocked by inactive wholesale funder"
                );
                Err(blocked.into())
            }
        }
    }

    async fn deactivate_funder_pool(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<LenderFunderPool, Error> {
        let link = self
            .repo
            .deactivate_funder_pool_link(lender_id, funder_pool_id, self.clock.utc())
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| funder_pool_not_found(lender_id, funder_pool_id))?;
        info!(
            lender_id = %lender_id,
            funder_pool = %link.funder_pool.name,
            "funder pool relationship deactivated"
        );
        Ok(link)
    }
}

#[async_trait]
impl<R> FunderActivationCommand for FunderActivationService<R>
where
    R: FunderRelationshipRepository,
{
    async fn link_wholesale_funder(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        active: bool,
    ) -> Result<LenderWholesaleFunder, Error> {
        let link = self
            .repo
            .create_wholesale_funder_link(lender_id, wholesale_funder_id, active, self.clock.utc())
            .await
            .map_err(map_repository_error)?;
        info!(
            lender_id = %lender_id,
            wholesale_funder = %link.wholesale_funder.name,
            active,
            "wholesale funder linked"
        );
        Ok(link)
    }

    async fn attach_funder_pool(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<LenderFunderPool, Error> {
        let link = self
            .repo
            .create_funder_pool_link(lender_id, funder_pool_id, self.clock.utc())
            .await
            .map_err(map_repository_error)?;
        info!(
            lender_id = %lender_id,
            funder_pool = %link.funder_pool.name,
            active = link.active,
            "funder pool attached"
        );
        Ok(link)
    }

    async fn toggle_wholesale_funder(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<WholesaleFunderToggle, Error> {
        let current = self
            .require_wholesale_funder_link(lender_id, wholesale_funder_id)
            .await?;
        self.set_wholesale_funder_active(lender_id, wholesale_funder_id, !current.active)
            .await
    }

    async fn set_wholesale_funder_active(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        active: bool,
    ) -> Result<WholesaleFunderToggle, Error> {
        if active {
            self.activate_wholesale_funder(lender_id, wholesale_funder_id)
                .await
                .map(WholesaleFunderToggle::Activated)
        } else {
            self.deactivate_and_cascade(lender_id, wholesale_funder_id)
                .await
                .map(WholesaleFunderToggle::Deactivated)
        }
    }

    async fn deactivate_and_cascade(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<CascadeOutcome, Error> {
        let outcome = self
            .repo
            .deactivate_wholesale_funder_link_cascade(
                lender_id,
                wholesale_funder_id,
                self.clock.utc(),
            )
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| wholesale_funder_not_found(lender_id, wholesale_funder_id))?;
        info!(
            lender_id = %lender_id,
            wholesale_funder = %outcome.wholesale_funder.wholesale_funder.name,
            deactivated_pools = outcome.deactivated_count(),
            "wholesale funder relationship deactivated with cascade"
        );
        Ok(outcome)
    }

    async fn toggle_funder_pool(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<LenderFunderPool, Error> {
        let current = self.require_funder_pool_link(lender_id, funder_pool_id).await?;
        self.set_funder_pool_active(lender_id, funder_pool_id, !current.active)
            .await
    }

    async fn set_funder_pool_active(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        active: bool,
    ) -> Result<LenderFunderPool, Error> {
        if active {
            self.activate_funder_pool(lender_id, funder_pool_id).await
        } else {
            self.deactivate_funder_pool(lender_id, funder_pool_id).await
        }
    }

    async fn unlink_wholesale_funder(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<usize, Error> {
        let removed = self
            .repo
            .delete_wholesale_funder_link(lender_id, wholesale_funder_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| wholesale_funder_not_found(lender_id, wholesale_funder_id))?;
        info!(
            lender_id = %lender_id,
            wholesale_funder_id = %wholesale_funder_id,
            removed_pools = removed,
            "wholesale funder unlinked"
        );
        Ok(removed)
    }

    async fn detach_funder_pool(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<(), Error> {
        let removed = self
            .repo
            .delete_funder_pool_link(lender_id, funder_pool_id)
            .await
            .map_err(map_repository_error)?;
        if !removed {
            return Err(funder_pool_not_found(lender_id, funder_pool_id));
        }
        info!(lender_id = %lender_id, funder_pool_id = %funder_pool_id, "funder pool detached");
        Ok(())
    }
}

#[async_trait]
impl<R> FunderRelationshipQuery for FunderActivationService<R>
where
    R: FunderRelationshipRepository,
{
    async fn can_activate_funder_pool(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<ActivationCheck, Error> {
        let pool = self.require_funder_pool_link(lender_id, funder_pool_id).await?;
        let parent = self
            .repo
            .find_wholesale_funder_link(lender_id, pool.wholesale_funder().id)
            .await
            .map_err(map_repository_error)?;

        if can_activate(&pool, parent.as_ref()) {
            Ok(ActivationCheck {
                can_activate: true,
                reason: None,
            })
        } else {
            Ok(ActivationCheck {
                can_activate: false,
                reason: Some(ActivationBlockedError::for_pool(&pool).to_string()),
            })
        }
    }

    async fn list_relationships(
        &self,
        lender_id: LenderId,
    ) -> Result<LenderFundingRelationships, Error> {
        self.repo
            .list_for_lender(lender_id)
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "funder_activation_service_tests.rs"]
mod tests;
