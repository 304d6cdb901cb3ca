//! PostgreSQL-backed `LenderClauseRepository` implementation.
//!
//! Clause creation locks the owning lender row before reading the highest
//! existing version, so concurrent creations under one lender allocate
//! consecutive versions. The `(lender_id, version)` unique constraint backs
//! this up. Every clause write appends its audit row in the same transaction.
//! Saves lock the clause row and refuse to overwrite a row that no longer
//! matches the state the change was computed from.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::clauses::{
    FieldChange, LenderClause, LenderClauseRecord, LenderClauseVersion, NewLenderClause,
    NewLenderClauseVersion, VersionAction,
};
use crate::domain::ports::{LenderClauseRepository, LenderClauseRepositoryError};
use crate::domain::{LenderClauseId, LenderClauseVersionId, LenderId, UserId};

use super::diesel_error_mapping::{
    DieselFailure, TxError, classify_diesel_error, map_pool_error_into, storable_version,
    stored_version,
};
use super::models::{LenderClauseChangeset, LenderClauseRow, LenderClauseVersionRow};
use super::pool::{DbPool, PoolError};
use super::schema::{lender_clause_versions, lender_clauses, lenders};

/// Diesel-backed implementation of the lender clause repository port.
#[derive(Clone)]
pub struct DieselLenderClauseRepository {
    pool: DbPool,
}

impl DieselLenderClauseRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> LenderClauseRepositoryError {
    map_pool_error_into(error, LenderClauseRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> LenderClauseRepositoryError {
    match classify_diesel_error(error) {
        DieselFailure::Connection(message) => LenderClauseRepositoryError::connection(message),
        DieselFailure::ForeignKeyViolation(constraint) => {
            LenderClauseRepositoryError::missing_reference(format!("violates {constraint}"))
        }
        DieselFailure::UniqueViolation(constraint) => {
            LenderClauseRepositoryError::query(format!("violates {constraint}"))
        }
        DieselFailure::Query(message) => LenderClauseRepositoryError::query(message),
    }
}

fn map_tx_error(error: TxError<LenderClauseRepositoryError>) -> LenderClauseRepositoryError {
    error.into_port(map_diesel_error)
}

fn row_to_clause(row: LenderClauseRow) -> Result<LenderClause, LenderClauseRepositoryError> {
    let version = stored_version(row.version, "lender_clauses.version")
        .map_err(LenderClauseRepositoryError::query)?;
    Ok(LenderClause::from(LenderClauseRecord {
        id: LenderClauseId::from_uuid(row.id),
        lender_id: LenderId::from_uuid(row.lender_id),
        title: row.title,
        content: row.content,
        description: row.description,
        version,
        is_draft: row.is_draft,
        is_active: row.is_active,
        last_updated: row.last_updated,
        created_by: UserId::from_uuid(row.created_by),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn clause_to_row(clause: &LenderClause) -> Result<LenderClauseRow, LenderClauseRepositoryError> {
    let version = storable_version(clause.version(), "lender_clauses.version")
        .map_err(LenderClauseRepositoryError::query)?;
    Ok(LenderClauseRow {
        id: *clause.id().as_uuid(),
        lender_id: *clause.lender_id().as_uuid(),
        title: clause.title().to_owned(),
        content: clause.content().to_owned(),
        description: clause.description().map(str::to_owned),
        version,
        is_draft: clause.is_draft(),
        is_active: clause.is_active(),
        last_updated: clause.last_updated(),
        created_by: *clause.created_by().as_uuid(),
        created_at: clause.created_at(),
        updated_at: clause.updated_at(),
    })
}

fn entry_to_row(
    entry: &NewLenderClauseVersion,
) -> Result<LenderClauseVersionRow, LenderClauseRepositoryError> {
    let changes = serde_json::to_value(&entry.changes)
        .map_err(|err| LenderClauseRepositoryError::query(format!("serialise changes: {err}")))?;
    Ok(LenderClauseVersionRow {
        id: Uuid::new_v4(),
        lender_clause_id: *entry.lender_clause_id.as_uuid(),
        user_id: *entry.user_id.as_uuid(),
        action: entry.action.as_str().to_owned(),
        changes,
        recorded_at: entry.recorded_at,
    })
}

fn row_to_version(
    row: LenderClauseVersionRow,
) -> Result<LenderClauseVersion, LenderClauseRepositoryError> {
    let action = row
        .action
        .parse::<VersionAction>()
        .map_err(|err| LenderClauseRepositoryError::query(err.to_string()))?;
    let changes: Vec<FieldChange> = serde_json::from_value(row.changes)
        .map_err(|err| LenderClauseRepositoryError::query(format!("decode changes: {err}")))?;
    Ok(LenderClauseVersion {
        id: LenderClauseVersionId::from_uuid(row.id),
        lender_clause_id: LenderClauseId::from_uuid(row.lender_clause_id),
        user_id: UserId::from_uuid(row.user_id),
        action,
        changes,
        recorded_at: row.recorded_at,
    })
}

#[async_trait]
impl LenderClauseRepository for DieselLenderClauseRepository {
    async fn create(
        &self,
        clause: &NewLenderClause,
    ) -> Result<LenderClause, LenderClauseRepositoryError> {
        let lender = *clause.lender_id.as_uuid();
        let entry_row = entry_to_row(&clause.creation_entry())?;
        let draft = clause.clone();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let created = conn
            .transaction(|conn| {
                async move {
                    let locked = lenders::table
                        .find(lender)
                        .select(lenders::id)
                        .for_update()
                        .first::<Uuid>(conn)
                        .await
                        .optional()?;
                    if locked.is_none() {
                        return Err(TxError::Rejected(
                            LenderClauseRepositoryError::missing_reference(format!(
                                "lender {lender}"
                            )),
                        ));
                    }

                    let highest: Option<i32> = lender_clauses::table
                        .filter(lender_clauses::lender_id.eq(lender))
                        .select(diesel::dsl::max(lender_clauses::version))
                        .first(conn)
                        .await?;
                    let next = highest.unwrap_or(0).checked_add(1).ok_or_else(|| {
                        TxError::Rejected(LenderClauseRepositoryError::query(
                            "lender clause version overflow",
                        ))
                    })?;
                    let version = stored_version(next, "lender_clauses.version").map_err(
                        |message| TxError::Rejected(LenderClauseRepositoryError::query(message)),
                    )?;

                    let created = draft.into_clause(version);
                    let row = clause_to_row(&created).map_err(TxError::Rejected)?;
                    diesel::insert_into(lender_clauses::table)
                        .values(&row)
                        .execute(conn)
                        .await?;
                    diesel::insert_into(lender_clause_versions::table)
                        .values(&entry_row)
                        .execute(conn)
                        .await?;
                    Ok(created)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error)?;

        debug!(clause_id = %created.id(), version = created.version(), "lender clause stored");
        Ok(created)
    }

    async fn save(
        &self,
        loaded: &LenderClause,
        clause: &LenderClause,
        entry: &NewLenderClauseVersion,
    ) -> Result<(), LenderClauseRepositoryError> {
        let id = *clause.id().as_uuid();
        let expected = loaded.clone();
        let changeset = LenderClauseChangeset {
            title: clause.title(),
            content: clause.content(),
            description: clause.description(),
            is_draft: clause.is_draft(),
            is_active: clause.is_active(),
            last_updated: clause.last_updated(),
            updated_at: clause.updated_at(),
        };
        let entry_row = entry_to_row(entry)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let locked = lender_clauses::table
                    .find(id)
                    .select(LenderClauseRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;
                let Some(stored) = locked else {
                    return Err(TxError::Rejected(
                        LenderClauseRepositoryError::missing_reference(format!(
                            "lender clause {id}"
                        )),
                    ));
                };
                if row_to_clause(stored).map_err(TxError::Rejected)? != expected {
                    return Err(TxError::Rejected(LenderClauseRepositoryError::conflict(
                        format!("lender clause {id} changed since it was loaded"),
                    )));
                }

                diesel::update(lender_clauses::table.find(id))
                    .set(&changeset)
                    .execute(conn)
                    .await?;
                diesel::insert_into(lender_clause_versions::table)
                    .values(&entry_row)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_tx_error)
    }

    async fn find_by_id(
        &self,
        id: LenderClauseId,
    ) -> Result<Option<LenderClause>, LenderClauseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = lender_clauses::table
            .find(*id.as_uuid())
            .select(LenderClauseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_clause).transpose()
    }

    async fn list_for_lender(
        &self,
        lender_id: LenderId,
    ) -> Result<Vec<LenderClause>, LenderClauseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<LenderClauseRow> = lender_clauses::table
            .filter(lender_clauses::lender_id.eq(*lender_id.as_uuid()))
            .order(lender_clauses::version.desc())
            .select(LenderClauseRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_clause).collect()
    }

    async fn list_versions(
        &self,
        id: LenderClauseId,
    ) -> Result<Vec<LenderClauseVersion>, LenderClauseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<LenderClauseVersionRow> = lender_clause_versions::table
            .filter(lender_clause_versions::lender_clause_id.eq(*id.as_uuid()))
            .order((
                lender_clause_versions::recorded_at.asc(),
                lender_clause_versions::action.asc(),
            ))
            .select(LenderClauseVersionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_version).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    use super::*;
    use crate::domain::clauses::LenderClauseInput;

    fn new_clause() -> NewLenderClause {
        NewLenderClause::new(
            LenderClauseInput {
                lender_id: LenderId::random(),
                title: "Early repayment".to_owned(),
                content: "Pay {{amount}}.".to_owned(),
                description: None,
            },
            UserId::random(),
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).single().expect("valid timestamp"),
        )
        .expect("valid clause")
    }

    #[rstest]
    fn clause_rows_round_trip_through_the_record() {
        let clause = new_clause().into_clause(3);
        let row = clause_to_row(&clause).expect("storable");
        assert_eq!(row.version, 3);
        assert_eq!(row_to_clause(row).expect("readable"), clause);
    }

    #[rstest]
    fn version_rows_keep_changes_and_action() {
        let entry = new_clause().creation_entry();
        let row = entry_to_row(&entry).expect("storable");
        assert_eq!(row.action, "created");

        let version = row_to_version(row).expect("readable");
        assert_eq!(version.changes, entry.changes);
        assert_eq!(version.action, VersionAction::Created);
    }

    #[rstest]
    fn unknown_actions_are_query_errors() {
        let mut row = entry_to_row(&new_clause().creation_entry()).expect("storable");
        row.action = "deleted".to_owned();
        let err = row_to_version(row).expect_err("unknown action");
        assert!(matches!(err, LenderClauseRepositoryError::Query { .. }));
    }

    #[rstest]
    fn negative_stored_versions_are_rejected() {
        let mut row = clause_to_row(&new_clause().into_clause(1)).expect("storable");
        row.version = -4;
        assert!(row_to_clause(row).is_err());
    }
}
