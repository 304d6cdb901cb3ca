//! Append-only audit trail for lender clauses.
//!
//! [`AuditEntry`] is the uniform read contract for version history: any
//! versioned record exposes a description, the fields it changed and the user
//! who made the change, so history views never inspect concrete types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{LenderClauseId, LenderClauseVersionId, UserId};

/// One persisted field whose value changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl FieldChange {
    /// Record a change from `before` to `after`.
    pub fn new(
        field: impl Into<String>,
        before: Option<impl Into<String>>,
        after: Option<impl Into<String>>,
    ) -> Self {
        Self {
            field: field.into(),
            before: before.map(Into::into),
            after: after.map(Into::into),
        }
    }

    /// Change of a boolean flag.
    pub fn flag(field: impl Into<String>, before: bool, after: bool) -> Self {
        Self::new(field, Some(before.to_string()), Some(after.to_string()))
    }
}

/// Uniform read contract for version history entries.
pub trait AuditEntry {
    /// Short human-readable summary such as "Published clause".
    fn action_description(&self) -> String;

    /// Fields changed by this entry.
    fn changed_fields(&self) -> &[FieldChange];

    /// User who made the change.
    fn actor(&self) -> UserId;

    /// When the change was recorded.
    fn recorded_at(&self) -> DateTime<Utc>;
}

/// Kind of lender clause audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VersionAction {
    Created,
    Updated,
}

impl VersionAction {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

impl fmt::Display for VersionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown action string read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown clause version action: {0}")]
pub struct UnknownVersionAction(pub String);

impl FromStr for VersionAction {
    type Err = UnknownVersionAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            other => Err(UnknownVersionAction(other.to_owned())),
        }
    }
}

/// Audit entry about to be appended for a clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLenderClauseVersion {
    pub lender_clause_id: LenderClauseId,
    pub user_id: UserId,
    pub action: VersionAction,
    pub changes: Vec<FieldChange>,
    pub recorded_at: DateTime<Utc>,
}

impl NewLenderClauseVersion {
    /// Entry recording that a clause was updated.
    #[must_use]
    pub fn updated(
        lender_clause_id: LenderClauseId,
        user_id: UserId,
        changes: Vec<FieldChange>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            lender_clause_id,
            user_id,
            action: VersionAction::Updated,
            changes,
            recorded_at,
        }
    }

    /// Assign the storage identifier.
    #[must_use]
    pub fn into_version(self, id: LenderClauseVersionId) -> LenderClauseVersion {
        LenderClauseVersion {
            id,
            lender_clause_id: self.lender_clause_id,
            user_id: self.user_id,
            action: self.action,
            changes: self.changes,
            recorded_at: self.recorded_at,
        }
    }
}

/// Persisted audit entry for a lender clause. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LenderClauseVersion {
    pub id: LenderClauseVersionId,
    pub lender_clause_id: LenderClauseId,
    pub user_id: UserId,
    pub action: VersionAction,
    pub changes: Vec<FieldChange>,
    pub recorded_at: DateTime<Utc>,
}

fn flag_became(changes: &[FieldChange], field: &str, value: bool) -> bool {
    let expected = value.to_string();
    changes
        .iter()
        .any(|change| change.field == field && change.after.as_deref() == Some(expected.as_str()))
}

impl AuditEntry for LenderClauseVersion {
    fn action_description(&self) -> String {
        match self.action {
            VersionAction::Created => "Created clause".to_owned(),
            VersionAction::Updated if self.changes.is_empty() => "Updated clause".to_owned(),
            VersionAction::Updated => {
                if flag_became(&self.changes, "is_draft", false) {
                    return "Published clause".to_owned();
                }
                if self.changes.iter().all(|change| change.field == "is_active") {
                    return if flag_became(&self.changes, "is_active", true) {
                        "Activated clause".to_owned()
                    } else {
                        "Deactivated clause".to_owned()
                    };
                }
                let fields: Vec<&str> = self
                    .changes
                    .iter()
                    .map(|change| change.field.as_str())
                    .collect();
                format!("Updated {}", fields.join(", "))
            }
        }
    }

    fn changed_fields(&self) -> &[FieldChange] {
        &self.changes
    }

    fn actor(&self) -> UserId {
        self.user_id
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Serializable projection of any [`AuditEntry`] for history views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLine {
    pub description: String,
    #[schema(value_type = String, format = Uuid)]
    pub actor: UserId,
    pub recorded_at: DateTime<Utc>,
    pub changes: Vec<FieldChange>,
}

impl AuditLine {
    /// Project an entry through the [`AuditEntry`] contract.
    pub fn from_entry(entry: &dyn AuditEntry) -> Self {
        Self {
            description: entry.action_description(),
            actor: entry.actor(),
            recorded_at: entry.recorded_at(),
            changes: entry.changed_fields().to_vec(),
        }
    }
}
