//! Named insertion points in the mortgage contract template.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ClausePositionId;

/// A fixed slot in the contract template that can hold one lender clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClausePosition {
    #[schema(value_type = String, format = Uuid)]
    pub id: ClausePositionId,
    /// Unique template marker, e.g. `before_signatures`.
    pub section_identifier: String,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
}

/// Static definition used to seed [`ClausePosition`] rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClausePositionSeed {
    pub section_identifier: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub display_order: i32,
}

/// Positions every deployment starts with.
pub const DEFAULT_CLAUSE_POSITIONS: [ClausePositionSeed; 4] = [
    ClausePositionSeed {
        section_identifier: "after_section_3",
        name: "After Section 3",
        description: "Lender terms following the loan details section",
        display_order: 10,
    },
    ClausePositionSeed {
        section_identifier: "after_section_5",
        name: "After Section 5",
        description: "Lender terms following the repayment section",
        display_order: 20,
    },
    ClausePositionSeed {
        section_identifier: "after_section_7",
        name: "After Section 7",
        description: "Lender terms following the default and enforcement section",
        display_order: 30,
    },
    ClausePositionSeed {
        section_identifier: "before_signatures",
        name: "Before Signatures",
        description: "Final lender terms immediately before the signature block",
        display_order: 40,
    },
];

impl ClausePositionSeed {
    /// Materialise the seed with a fresh identifier.
    #[must_use]
    pub fn to_position(&self) -> ClausePosition {
        ClausePosition {
            id: ClausePositionId::random(),
            section_identifier: self.section_identifier.to_owned(),
            name: self.name.to_owned(),
            description: Some(self.description.to_owned()),
            display_order: self.display_order,
        }
    }
}
