//! Activation rules for funding relationships.
//!
//! Each relationship row is either active or inactive. A wholesale funder
//! link may always change state; switching it off deactivates every active
//! pool link beneath it. A pool link may only switch on while its parent
//! wholesale funder link is active. Reactivating a parent never switches its
//! children back on.

use serde_json::json;

use super::{LenderFunderPool, LenderWholesaleFunder};
use crate::domain::{Error, FunderPoolId, WholesaleFunderId};

/// Raised when a pool link is activated while its parent link is inactive.
///
/// The caller recovers by activating the named wholesale funder first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "cannot activate funder pool '{funder_pool_name}': the wholesale funder \
     '{wholesale_funder_name}' is not active for this lender. Activate \
     '{wholesale_funder_name}' first."
)]
pub struct ActivationBlockedError {
    pub wholesale_funder_id: WholesaleFunderId,
    pub wholesale_funder_name: String,
    pub funder_pool_id: FunderPoolId,
    pub funder_pool_name: String,
}

impl ActivationBlockedError {
    /// Build the error for `pool`, naming its owning wholesale funder.
    #[must_use]
    pub fn for_pool(pool: &LenderFunderPool) -> Self {
        Self {
            wholesale_funder_id: pool.wholesale_funder().id,
            wholesale_funder_name: pool.wholesale_funder().name.clone(),
            funder_pool_id: pool.funder_pool.id,
            funder_pool_name: pool.funder_pool.name.clone(),
        }
    }
}

impl From<ActivationBlockedError> for Error {
    fn from(value: ActivationBlockedError) -> Self {
        Error::activation_blocked(value.to_string()).with_details(json!({
            "wholesaleFunderId": value.wholesale_funder_id,
            "wholesaleFunderName": value.wholesale_funder_name,
            "funderPoolId": value.funder_pool_id,
            "funderPoolName": value.funder_pool_name,
        }))
    }
}

/// Whether `pool` may become active given its parent link.
///
/// A missing parent, a parent for a different lender or funder, or an
/// inactive parent all block activation.
#[must_use]
pub fn can_activate(pool: &LenderFunderPool, parent: Option<&LenderWholesaleFunder>) -> bool {
    parent.is_some_and(|parent| parent.active && pool.is_child_of(parent))
}

/// [`can_activate`] as a `Result` carrying the remediation message.
///
/// # Errors
///
/// Returns [`ActivationBlockedError`] when the parent link is not active.
pub fn ensure_can_activate(
    pool: &LenderFunderPool,
    parent: Option<&LenderWholesaleFunder>,
) -> Result<(), ActivationBlockedError> {
    if can_activate(pool, parent) {
        Ok(())
    } else {
        Err(ActivationBlockedError::for_pool(pool))
    }
}

/// Result of deactivating a wholesale funder link and its pool links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub wholesale_funder: LenderWholesaleFunder,
    pub deactivated_pools: Vec<LenderFunderPool>,
}

impl CascadeOutcome {
    /// Number of pool links switched off by the cascade.
    #[must_use]
    pub fn deactivated_count(&self) -> usize {
        self.deactivated_pools.len()
    }

    /// Operator-facing description of the cascade.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use futureproof_backend::domain::funding::{
    ///     CascadeOutcome, LenderWholesaleFunder, WholesaleFunder,
    /// };
    /// use futureproof_backend::domain::{LenderId, LenderWholesaleFunderId, WholesaleFunderId};
    ///
    /// let outcome = CascadeOutcome {
    ///     wholesale_funder: LenderWholesaleFunder {
    ///         id: LenderWholesaleFunderId::random(),
    ///         lender_id: LenderId::random(),
    ///         wholesale_funder: WholesaleFunder {
    ///             id: WholesaleFunderId::random(),
    ///             name: "Northwind Capital".to_owned(),
    ///         },
    ///         active: false,
    ///         created_at: Utc::now(),
    ///         updated_at: Utc::now(),
    ///     },
    ///     deactivated_pools: Vec::new(),
    /// };
    /// assert_eq!(outcome.summary(), "Wholesale funder 'Northwind Capital' deactivated.");
    /// ```
    #[must_use]
    pub fn summary(&self) -> String {
        let name = &self.wholesale_funder.wholesale_funder.name;
        match self.deactivated_count() {
            0 => format!("Wholesale funder '{name}' deactivated."),
            1 => format!(
                "Wholesale funder '{name}' deactivated. 1 funder pool relationship was also deactivated."
            ),
            count => format!(
                "Wholesale funder '{name}' deactivated. {count} funder pool relationships were also deactivated."
            ),
        }
    }
}

/// Result of toggling a wholesale funder link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WholesaleFunderToggle {
    /// The link switched on. Child pool links are untouched.
    Activated(LenderWholesaleFunder),
    /// The link switched off, cascading to its pool links.
    Deactivated(CascadeOutcome),
}

impl WholesaleFunderToggle {
    /// The wholesale funder link after the toggle.
    #[must_use]
    pub fn relationship(&self) -> &LenderWholesaleFunder {
        match self {
            Self::Activated(link) => link,
            Self::Deactivated(outcome) => &outcome.wholesale_funder,
        }
    }

    /// Operator-facing description of the toggle.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Activated(link) => format!(
                "Wholesale funder '{}' activated.",
                link.wholesale_funder.name
            ),
            Self::Deactivated(outcome) => outcome.summary(),
        }
    }
}

/// Check the cascade invariant over a set of links: every active pool link
/// has an active parent among `parents`.
#[must_use]
pub fn cascade_invariant_holds(
    parents: &[LenderWholesaleFunder],
    pools: &[LenderFunderPool],
) -> bool {
    pools.iter().filter(|pool| pool.active).all(|pool| {
        parents
            .iter()
            .any(|parent| parent.active && pool.is_child_of(parent))
    })
}
