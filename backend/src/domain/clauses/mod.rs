//! Lender-authored contract clauses.
//!
//! A clause starts as a draft, is published, and may then be activated.
//! Versions are allocated per lender and every persisted change appends a
//! [`LenderClauseVersion`] audit entry. Content is written in a small markup
//! language (see [`markup`]) and rendered to HTML with `{{placeholder}}`
//! substitution (see [`placeholders`]).

pub mod audit;
pub mod markup;
pub mod placeholders;
pub mod position;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Error, FieldError, LenderClauseId, LenderId, UserId};

pub use audit::{
    AuditEntry, AuditLine, FieldChange, LenderClauseVersion, NewLenderClauseVersion,
    VersionAction,
};
pub use markup::{escape_html, render_markup};
pub use placeholders::{
    Substitutions, placeholder_names, preview_substitutions, substitute_placeholders,
};
pub use position::{ClausePosition, ClausePositionSeed, DEFAULT_CLAUSE_POSITIONS};

/// Maximum clause title length in characters.
pub const TITLE_MAX: usize = 255;

/// Render clause markup and substitute placeholders.
#[must_use]
pub fn render_clause(content: &str, values: &Substitutions) -> String {
    substitute_placeholders(&render_markup(content), values)
}

fn validate_title(title: &str, errors: &mut Vec<FieldError>) {
    if title.trim().is_empty() {
        errors.push(FieldError::new("title", "must not be empty"));
    } else if title.chars().count() > TITLE_MAX {
        errors.push(FieldError::new(
            "title",
            format!("must be at most {TITLE_MAX} characters"),
        ));
    }
}

fn validate_content(content: &str, errors: &mut Vec<FieldError>) {
    if content.trim().is_empty() {
        errors.push(FieldError::new("content", "must not be empty"));
    }
}

fn normalise_description(description: Option<String>) -> Option<String> {
    description.filter(|text| !text.trim().is_empty())
}

/// Caller-supplied fields for a new clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LenderClauseInput {
    pub lender_id: LenderId,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
}

/// Validated clause awaiting version allocation by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLenderClause {
    pub id: LenderClauseId,
    pub lender_id: LenderId,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl NewLenderClause {
    /// Validate `input` into a new draft.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::domain::ErrorCode::InvalidRequest`] error listing
    /// every invalid field.
    pub fn new(
        input: LenderClauseInput,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let mut errors = Vec::new();
        validate_title(&input.title, &mut errors);
        validate_content(&input.content, &mut errors);
        if !errors.is_empty() {
            return Err(Error::validation(errors));
        }

        Ok(Self {
            id: LenderClauseId::random(),
            lender_id: input.lender_id,
            title: input.title.trim().to_owned(),
            content: input.content,
            description: normalise_description(input.description),
            created_by,
            created_at,
        })
    }

    /// The `created` audit entry written alongside the clause.
    #[must_use]
    pub fn creation_entry(&self) -> NewLenderClauseVersion {
        let mut changes = vec![
            FieldChange::new("title", None::<String>, Some(self.title.clone())),
            FieldChange::new("content", None::<String>, Some(self.content.clone())),
        ];
        if let Some(description) = &self.description {
            changes.push(FieldChange::new(
                "description",
                None::<String>,
                Some(description.clone()),
            ));
        }
        NewLenderClauseVersion {
            lender_clause_id: self.id,
            user_id: self.created_by,
            action: VersionAction::Created,
            changes,
            recorded_at: self.created_at,
        }
    }

    /// Complete the clause with the version the repository allocated.
    #[must_use]
    pub fn into_clause(self, version: u32) -> LenderClause {
        LenderClause {
            id: self.id,
            lender_id: self.lender_id,
            title: self.title,
            content: self.content,
            description: self.description,
            version,
            is_draft: true,
            is_active: false,
            last_updated: self.created_at,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Partial update of a clause's editable fields.
///
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LenderClauseUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<Option<String>>,
}

/// Invalid lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClauseStateError {
    /// Drafts cannot be activated.
    #[error("clause '{title}' must be published before it can be activated")]
    NotPublished { title: String },
}

impl From<ClauseStateError> for Error {
    fn from(value: ClauseStateError) -> Self {
        Error::invalid_request(value.to_string())
    }
}

/// Every stored field of a clause, used to rehydrate from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LenderClauseRecord {
    pub id: LenderClauseId,
    pub lender_id: LenderId,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub version: u32,
    pub is_draft: bool,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A versioned block of legal text owned by a lender.
///
/// ## Invariants
/// - An active clause is never a draft.
/// - `version` is unique within the lender and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LenderClause {
    #[schema(value_type = String, format = Uuid)]
    id: LenderClauseId,
    #[schema(value_type = String, format = Uuid)]
    lender_id: LenderId,
    title: String,
    content: String,
    description: Option<String>,
    version: u32,
    is_draft: bool,
    is_active: bool,
    last_updated: DateTime<Utc>,
    #[schema(value_type = String, format = Uuid)]
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LenderClauseRecord> for LenderClause {
    fn from(record: LenderClauseRecord) -> Self {
        Self {
            id: record.id,
            lender_id: record.lender_id,
            title: record.title,
            content: record.content,
            description: record.description,
            version: record.version,
            is_draft: record.is_draft,
            is_active: record.is_active && !record.is_draft,
            last_updated: record.last_updated,
            created_by: record.created_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl LenderClause {
    pub fn id(&self) -> LenderClauseId {
        self.id
    }

    pub fn lender_id(&self) -> LenderId {
        self.lender_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Raw markup.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_draft(&self) -> bool {
        self.is_draft
    }

    pub fn is_published(&self) -> bool {
        !self.is_draft
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Last time title, content or description changed.
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply `update`, returning the fields that actually changed.
    ///
    /// An empty result means nothing needs saving.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a supplied field is invalid; the
    /// clause is left unchanged.
    pub fn apply_update(
        &mut self,
        update: LenderClauseUpdate,
        at: DateTime<Utc>,
    ) -> Result<Vec<FieldChange>, Error> {
        let mut errors = Vec::new();
        if let Some(title) = &update.title {
            validate_title(title, &mut errors);
        }
        if let Some(content) = &update.content {
            validate_content(content, &mut errors);
        }
        if !errors.is_empty() {
            return Err(Error::validation(errors));
        }

        let mut changes = Vec::new();
        if let Some(title) = update.title.map(|title| title.trim().to_owned()) {
            if title != self.title {
                changes.push(FieldChange::new(
                    "title",
                    Some(self.title.clone()),
                    Some(title.clone()),
                ));
                self.title = title;
            }
        }
        if let Some(content) = update.content {
            if content != self.content {
                changes.push(FieldChange::new(
                    "content",
                    Some(self.content.clone()),
                    Some(content.clone()),
                ));
                self.content = content;
            }
        }
        if let Some(description) = update.description.map(normalise_description) {
            if description != self.description {
                changes.push(FieldChange::new(
                    "description",
                    self.description.clone(),
                    description.clone(),
                ));
                self.description = description;
            }
        }

        if !changes.is_empty() {
            self.last_updated = at;
            self.updated_at = at;
        }
        Ok(changes)
    }

    /// Mark the clause as published. Publishing twice changes nothing.
    pub fn publish(&mut self, at: DateTime<Utc>) -> Vec<FieldChange> {
        if !self.is_draft {
            return Vec::new();
        }
        self.is_draft = false;
        self.updated_at = at;
        vec![FieldChange::flag("is_draft", true, false)]
    }

    /// Activate a published clause. Activating an active clause changes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ClauseStateError::NotPublished`] for drafts.
    pub fn activate(&mut self, at: DateTime<Utc>) -> Result<Vec<FieldChange>, ClauseStateError> {
        if self.is_draft {
            return Err(ClauseStateError::NotPublished {
                title: self.title.clone(),
            });
        }
        if self.is_active {
            return Ok(Vec::new());
        }
        self.is_active = true;
        self.updated_at = at;
        Ok(vec![FieldChange::flag("is_active", false, true)])
    }

    /// Deactivate the clause. Deactivating an inactive clause changes nothing.
    pub fn deactivate(&mut self, at: DateTime<Utc>) -> Vec<FieldChange> {
        if !self.is_active {
            return Vec::new();
        }
        self.is_active = false;
        self.updated_at = at;
        vec![FieldChange::flag("is_active", true, false)]
    }

    /// Content rendered to HTML with `values` substituted.
    #[must_use]
    pub fn rendered_content(&self, values: &Substitutions) -> String {
        render_clause(&self.content, values)
    }

    /// Content rendered with fixed sample values.
    #[must_use]
    pub fn rendered_preview_content(&self) -> String {
        self.rendered_content(&preview_substitutions())
    }

    /// Placeholder names the content expects.
    #[must_use]
    pub fn placeholders(&self) -> BTreeSet<String> {
        placeholder_names(&self.content)
    }
}

#[cfg(test)]
mod tests;
