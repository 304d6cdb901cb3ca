//! Lender clause domain service.
//!
//! Sequences clause lifecycle transitions and their audit entries. Each
//! transition that changes persisted fields writes exactly one `updated`
//! entry; transitions that change nothing write nothing.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;

use crate::domain::clauses::{
    AuditLine, FieldChange, LenderClause, NewLenderClause, NewLenderClauseVersion,
    Substitutions, placeholder_names, preview_substitutions, render_clause,
};
use crate::domain::ports::{
    CreateLenderClauseRequest, LenderClauseCommand, LenderClauseQuery, LenderClauseRepository,
    LenderClauseRepositoryError, RenderedMarkup, UpdateLenderClauseRequest,
};
use crate::domain::{Error, LenderClauseId, LenderId, UserId};

fn map_repository_error(error: LenderClauseRepositoryError) -> Error {
    match error {
        LenderClauseRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("lender clause repository unavailable: {message}"))
        }
        LenderClauseRepositoryError::Query { message } => {
            Error::internal(format!("lender clause repository error: {message}"))
        }
        LenderClauseRepositoryError::MissingReference { message } => Error::not_found(message),
        LenderClauseRepositoryError::Conflict { message } => Error::conflict(format!(
            "lender clause was changed by another request: {message}"
        )),
    }
}

fn rendered(content: &str, values: &Substitutions) -> RenderedMarkup {
    RenderedMarkup {
        html: render_clause(content, values),
        placeholders: placeholder_names(content).into_iter().collect(),
    }
}

/// Lender clause service implementing the command and query ports.
#[derive(Clone)]
pub struct LenderClauseService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> LenderClauseService<R> {
    /// Create a service over `repo`, stamping changes with `clock`.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

impl<R> LenderClauseService<R>
where
    R: LenderClauseRepository,
{
    async fn load(&self, id: LenderClauseId) -> Result<LenderClause, Error> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("lender clause {id} not found")))
    }

    async fn persist(
        &self,
        loaded: &LenderClause,
        clause: &LenderClause,
        changes: Vec<FieldChange>,
        actor: UserId,
    ) -> Result<(), Error> {
        let entry =
            NewLenderClauseVersion::updated(clause.id(), actor, changes, self.clock.utc());
        self.repo
            .save(loaded, clause, &entry)
            .await
            .map_err(map_repository_error)
    }
}

#[async_trait]
impl<R> LenderClauseCommand for LenderClauseService<R>
where
    R: LenderClauseRepository,
{
    async fn create_clause(
        &self,
        lender_id: LenderId,
        request: CreateLenderClauseRequest,
        actor: UserId,
    ) -> Result<LenderClause, Error> {
        let new_clause =
            NewLenderClause::new(request.for_lender(lender_id), actor, self.clock.utc())?;
        let clause = self
            .repo
            .create(&new_clause)
            .await
            .map_err(map_repository_error)?;
        info!(
            clause_id = %clause.id(),
            lender_id = %lender_id,
            version = clause.version(),
            actor = %actor,
            "lender clause created"
        );
        Ok(clause)
    }

    async fn update_clause(
        &self,
        id: LenderClauseId,
        request: UpdateLenderClauseRequest,
        actor: UserId,
    ) -> Result<LenderClause, Error> {
        let loaded = self.load(id).await?;
        let mut clause = loaded.clone();
        let changes = clause.apply_update(request.into(), self.clock.utc())?;
        if changes.is_empty() {
            return Ok(clause);
        }
        let fields = changes.len();
        self.persist(&loaded, &clause, changes, actor).await?;
        info!(clause_id = %id, fields, actor = %actor, "lender clause updated");
        Ok(clause)
    }

    async fn publish_clause(
        &self,
        id: LenderClauseId,
        actor: UserId,
    ) -> Result<LenderClause, Error> {
        let loaded = self.load(id).await?;
        let mut clause = loaded.clone();
        let changes = clause.publish(self.clock.utc());
        if changes.is_empty() {
            return Ok(clause);
        }
        self.persist(&loaded, &clause, changes, actor).await?;
        info!(clause_id = %id, actor = %actor, "lender clause published");
        Ok(clause)
    }

    async fn activate_clause(
        &self,
        id: LenderClauseId,
        actor: UserId,
    ) -> Result<LenderClause, Error> {
        let loaded = self.load(id).await?;
        let mut clause = loaded.clone();
        let changes = clause.activate(self.clock.utc())?;
        if changes.is_empty() {
            return Ok(clause);
        }
        self.persist(&loaded, &clause, changes, actor).await?;
        info!(clause_id = %id, actor = %actor, "lender clause activated");
        Ok(clause)
    }

    async fn deactivate_clause(
        &self,
        id: LenderClauseId,
        actor: UserId,
    ) -> Result<LenderClause, Error> {
        let loaded = self.load(id).await?;
        let mut clause = loaded.clone();
        let changes = clause.deactivate(self.clock.utc());
        if changes.is_empty() {
            return Ok(clause);
        }
        self.persist(&loaded, &clause, changes, actor).await?;
        info!(clause_id = %id, actor = %actor, "lender clause deactivated");
        Ok(clause)
    }
}

#[async_trait]
impl<R> LenderClauseQuery for LenderClauseService<R>
where
    R: LenderClauseRepository,
{
    async fn get_clause(&self, id: LenderClauseId) -> Result<LenderClause, Error> {
        self.load(id).await
    }

    async fn list_clauses(&self, lender_id: LenderId) -> Result<Vec<LenderClause>, Error> {
        self.repo
            .list_for_lender(lender_id)
            .await
            .map_err(map_repository_error)
    }

    async fn clause_history(&self, id: LenderClauseId) -> Result<Vec<AuditLine>, Error> {
        // Distinguish an unknown clause from one with an empty trail.
        self.load(id).await?;
        let versions = self
            .repo
            .list_versions(id)
            .await
            .map_err(map_repository_error)?;
        Ok(versions
            .iter()
            .map(|version| AuditLine::from_entry(version))
            .collect())
    }

    async fn render_clause(
        &self,
        id: LenderClauseId,
        values: Substitutions,
    ) -> Result<RenderedMarkup, Error> {
        let clause = self.load(id).await?;
        Ok(rendered(clause.content(), &values))
    }

    async fn preview_clause(&self, id: LenderClauseId) -> Result<RenderedMarkup, Error> {
        let clause = self.load(id).await?;
        Ok(rendered(clause.content(), &preview_substitutions()))
    }

    async fn preview_markup(&self, content: String) -> Result<RenderedMarkup, Error> {
        Ok(rendered(&content, &preview_substitutions()))
    }
}

#[cfg(test)]
#[path = "lender_clause_service_tests.rs"]
mod tests;
