//! PostgreSQL-backed `ClausePositionRepository` implementation.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::RunQueryDsl;

use crate::domain::ClausePositionId;
use crate::domain::clauses::{ClausePosition, ClausePositionSeed};
use crate::domain::ports::{ClausePositionRepository, ClausePositionRepositoryError};

use super::diesel_error_mapping::{DieselFailure, classify_diesel_error, map_pool_error_into};
use super::models::{ClausePositionRow, NewClausePositionRow};
use super::pool::{DbPool, PoolError};
use super::schema::clause_positions;

/// Diesel-backed implementation of the clause position repository port.
#[derive(Clone)]
pub struct DieselClausePositionRepository {
    pool: DbPool,
}

impl DieselClausePositionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ClausePositionRepositoryError {
    map_pool_error_into(error, ClausePositionRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> ClausePositionRepositoryError {
    match classify_diesel_error(error) {
        DieselFailure::Connection(message) => ClausePositionRepositoryError::connection(message),
        DieselFailure::UniqueViolation(message)
        | DieselFailure::ForeignKeyViolation(message)
        | DieselFailure::Query(message) => ClausePositionRepositoryError::query(message),
    }
}

fn row_to_position(row: ClausePositionRow) -> ClausePosition {
    ClausePosition {
        id: ClausePositionId::from_uuid(row.id),
        section_identifier: row.section_identifier,
        name: row.name,
        description: row.description,
        display_order: row.display_order,
    }
}

#[async_trait]
impl ClausePositionRepository for DieselClausePositionRepository {
    async fn list(&self) -> Result<Vec<ClausePosition>, ClausePositionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ClausePositionRow> = clause_positions::table
            .order((
                clause_positions::display_order.asc(),
                clause_positions::section_identifier.asc(),
            ))
            .select(ClausePositionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_position).collect())
    }

    async fn find_by_id(
        &self,
        id: ClausePositionId,
    ) -> Result<Option<ClausePosition>, ClausePositionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = clause_positions::table
            .find(*id.as_uuid())
            .select(ClausePositionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_position))
    }

    async fn find_by_section(
        &self,
        section_identifier: &str,
    ) -> Result<Option<ClausePosition>, ClausePositionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = clause_positions::table
            .filter(clause_positions::section_identifier.eq(section_identifier))
            .select(ClausePositionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_position))
    }

    async fn seed(
        &self,
        seeds: &[ClausePositionSeed],
    ) -> Result<usize, ClausePositionRepositoryError> {
        if seeds.is_empty() {
            return Ok(0);
        }
        let rows: Vec<NewClausePositionRow<'_>> = seeds
            .iter()
            .map(|seed| NewClausePositionRow {
                id: uuid::Uuid::new_v4(),
                section_identifier: seed.section_identifier,
                name: seed.name,
                description: Some(seed.description),
                display_order: seed.display_order,
            })
            .collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(clause_positions::table)
            .values(&rows)
            .on_conflict(clause_positions::section_identifier)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)
    }
}
