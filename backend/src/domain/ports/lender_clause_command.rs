//! Driving port for lender clause mutations.
//!
//! Every mutation is attributed to the acting user, who is recorded on the
//! clause's audit trail.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::clauses::{LenderClause, LenderClauseInput, LenderClauseUpdate};
use crate::domain::{Error, LenderClauseId, LenderId, UserId};

/// Request to create a draft clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLenderClauseRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateLenderClauseRequest {
    /// Attach the owning lender.
    #[must_use]
    pub fn for_lender(self, lender_id: LenderId) -> LenderClauseInput {
        LenderClauseInput {
            lender_id,
            title: self.title,
            content: self.content,
            description: self.description,
        }
    }
}

/// Partial update. Absent fields are left alone; an explicit
/// `"description": null` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLenderClauseRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

impl From<UpdateLenderClauseRequest> for LenderClauseUpdate {
    fn from(value: UpdateLenderClauseRequest) -> Self {
        Self {
            title: value.title,
            content: value.content,
            description: value.description,
        }
    }
}

mod double_option {
    //! Distinguishes an absent field from an explicit `null`.

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Option<String>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

/// Driving port for clause writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LenderClauseCommand: Send + Sync {
    /// Create a draft clause with the lender's next version number.
    async fn create_clause(
        &self,
        lender_id: LenderId,
        request: CreateLenderClauseRequest,
        actor: UserId,
    ) -> Result<LenderClause, Error>;

    /// Edit title, content or description. Unchanged values write nothing.
    async fn update_clause(
        &self,
        id: LenderClauseId,
        request: UpdateLenderClauseRequest,
        actor: UserId,
    ) -> Result<LenderClause, Error>;

    /// Publish a draft. Publishing a published clause is a no-op.
    async fn publish_clause(&self, id: LenderClauseId, actor: UserId)
    -> Result<LenderClause, Error>;

    /// Activate a published clause.
    async fn activate_clause(
        &self,
        id: LenderClauseId,
        actor: UserId,
    ) -> Result<LenderClause, Error>;

    /// Deactivate a clause.
    async fn deactivate_clause(
        &self,
        id: LenderClauseId,
        actor: UserId,
    ) -> Result<LenderClause, Error>;
}
