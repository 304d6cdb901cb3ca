//! Strongly typed identifiers for lending records.
//!
//! Every identifier wraps a UUID so a lender id can never be passed where a
//! funder pool id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// Identifier of a lender.
    LenderId
);
define_id!(
    /// Identifier of a wholesale funder.
    WholesaleFunderId
);
define_id!(
    /// Identifier of a funder pool.
    FunderPoolId
);
define_id!(
    /// Identifier of a lender/wholesale funder relationship row.
    LenderWholesaleFunderId
);
define_id!(
    /// Identifier of a lender/funder pool relationship row.
    LenderFunderPoolId
);
define_id!(
    /// Identifier of a lender clause.
    LenderClauseId
);
define_id!(
    /// Identifier of a lender clause audit entry.
    LenderClauseVersionId
);
define_id!(
    /// Identifier of a clause insertion point.
    ClausePositionId
);
define_id!(
    /// Identifier of a mortgage contract.
    MortgageContractId
);
define_id!(
    /// Identifier of a clause usage within a contract.
    ContractClauseUsageId
);
define_id!(
    /// Identifier of an administrative user acting on records.
    UserId
);
