//! PostgreSQL-backed `ContractClauseRepository` implementation.
//!
//! Replacing or reactivating a usage locks the contract row first, then
//! retires the current active usage at the position before writing the new
//! one. The partial unique index on active usages rejects any interleaving
//! that slips past the lock; such a rejection surfaces as `Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::contracts::{ContractClauseUsage, ContractClauseUsageRecord, MortgageContract};
use crate::domain::ports::{ContractClauseRepository, ContractClauseRepositoryError};
use crate::domain::{
    ClausePositionId, ContractClauseUsageId, LenderClauseId, LenderId, MortgageContractId, UserId,
};

use super::diesel_error_mapping::{
    DieselFailure, TxError, classify_diesel_error, map_pool_error_into, storable_version,
    stored_version,
};
use super::models::{ContractClauseUsageRow, MortgageContractRow, UsageStateChangeset};
use super::pool::{DbPool, PoolError};
use super::schema::{contract_clause_usages, mortgage_contracts};

/// Diesel-backed implementation of the contract clause repository port.
#[derive(Clone)]
pub struct DieselContractClauseRepository {
    pool: DbPool,
}

impl DieselContractClauseRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ContractClauseRepositoryError {
    map_pool_error_into(error, ContractClauseRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> ContractClauseRepositoryError {
    match classify_diesel_error(error) {
        DieselFailure::Connection(message) => ContractClauseRepositoryError::connection(message),
        DieselFailure::UniqueViolation(constraint) => {
            ContractClauseRepositoryError::conflict(format!("violates {constraint}"))
        }
        DieselFailure::ForeignKeyViolation(message) | DieselFailure::Query(message) => {
            ContractClauseRepositoryError::query(message)
        }
    }
}

fn map_tx_error(error: TxError<ContractClauseRepositoryError>) -> ContractClauseRepositoryError {
    error.into_port(map_diesel_error)
}

fn row_to_contract(
    row: MortgageContractRow,
) -> Result<MortgageContract, ContractClauseRepositoryError> {
    Ok(MortgageContract {
        id: MortgageContractId::from_uuid(row.id),
        lender_id: LenderId::from_uuid(row.lender_id),
        reference: row.reference,
        version: stored_version(row.version, "mortgage_contracts.version")
            .map_err(ContractClauseRepositoryError::query)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_usage(
    row: ContractClauseUsageRow,
) -> Result<ContractClauseUsage, ContractClauseRepositoryError> {
    let contract_version_at_usage = stored_version(
        row.contract_version_at_usage,
        "contract_clause_usages.contract_version_at_usage",
    )
    .map_err(ContractClauseRepositoryError::query)?;
    let clause_version_at_usage = stored_version(
        row.clause_version_at_usage,
        "contract_clause_usages.clause_version_at_usage",
    )
    .map_err(ContractClauseRepositoryError::query)?;
    Ok(ContractClauseUsage::from(ContractClauseUsageRecord {
        id: ContractClauseUsageId::from_uuid(row.id),
        mortgage_contract_id: MortgageContractId::from_uuid(row.mortgage_contract_id),
        lender_clause_id: LenderClauseId::from_uuid(row.lender_clause_id),
        clause_position_id: ClausePositionId::from_uuid(row.clause_position_id),
        clause_content_snapshot: row.clause_content_snapshot,
        contract_version_at_usage,
        clause_version_at_usage,
        active: row.active,
        added_by: UserId::from_uuid(row.added_by),
        added_at: row.added_at,
        removed_by: row.removed_by.map(UserId::from_uuid),
        removed_at: row.removed_at,
    }))
}

fn usage_to_row(
    usage: &ContractClauseUsage,
) -> Result<ContractClauseUsageRow, ContractClauseRepositoryError> {
    Ok(ContractClauseUsageRow {
        id: *usage.id().as_uuid(),
        mortgage_contract_id: *usage.mortgage_contract_id().as_uuid(),
        lender_clause_id: *usage.lender_clause_id().as_uuid(),
        clause_position_id: *usage.clause_position_id().as_uuid(),
        clause_content_snapshot: usage.clause_content_snapshot().to_owned(),
        contract_version_at_usage: storable_version(
            usage.contract_version_at_usage(),
            "contract_clause_usages.contract_version_at_usage",
        )
        .map_err(ContractClauseRepositoryError::query)?,
        clause_version_at_usage: storable_version(
            usage.clause_version_at_usage(),
            "contract_clause_usages.clause_version_at_usage",
        )
        .map_err(ContractClauseRepositoryError::query)?,
        active: usage.is_active(),
        added_by: *usage.added_by().as_uuid(),
        added_at: usage.added_at(),
        removed_by: usage.removed_by().map(|user| *user.as_uuid()),
        removed_at: usage.removed_at(),
    })
}

fn state_of(usage: &ContractClauseUsage) -> UsageStateChangeset {
    UsageStateChangeset {
        active: usage.is_active(),
        removed_by: usage.removed_by().map(|user| *user.as_uuid()),
        removed_at: usage.removed_at(),
    }
}

async fn lock_contract(conn: &mut AsyncPgConnection, contract_id: Uuid) -> QueryResult<()> {
    mortgage_contracts::table
        .find(contract_id)
        .select(mortgage_contracts::id)
        .for_update()
        .first::<Uuid>(conn)
        .await
        .map(|_| ())
}

/// Retire the active usage at a position, skipping `except`.
async fn retire_active(
    conn: &mut AsyncPgConnection,
    contract_id: Uuid,
    position_id: Uuid,
    except: Uuid,
    retired_by: Uuid,
    at: DateTime<Utc>,
) -> QueryResult<Option<ContractClauseUsageRow>> {
    diesel::update(
        contract_clause_usages::table
            .filter(contract_clause_usages::mortgage_contract_id.eq(contract_id))
            .filter(contract_clause_usages::clause_position_id.eq(position_id))
            .filter(contract_clause_usages::active.eq(true))
            .filter(contract_clause_usages::id.ne(except)),
    )
    .set(UsageStateChangeset {
        active: false,
        removed_by: Some(retired_by),
        removed_at: Some(at),
    })
    .returning(ContractClauseUsageRow::as_returning())
    .get_result(conn)
    .await
    .optional()
}

#[async_trait]
impl ContractClauseRepository for DieselContractClauseRepository {
    async fn find_contract(
        &self,
        id: MortgageContractId,
    ) -> Result<Option<MortgageContract>, ContractClauseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = mortgage_contracts::table
            .find(*id.as_uuid())
            .select(MortgageContractRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_contract).transpose()
    }

    async fn find_usage(
        &self,
        id: ContractClauseUsageId,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = contract_clause_usages::table
            .find(*id.as_uuid())
            .select(ContractClauseUsageRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_usage).transpose()
    }

    async fn find_active_usage(
        &self,
        contract_id: MortgageContractId,
        position_id: ClausePositionId,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = contract_clause_usages::table
            .filter(contract_clause_usages::mortgage_contract_id.eq(*contract_id.as_uuid()))
            .filter(contract_clause_usages::clause_position_id.eq(*position_id.as_uuid()))
            .filter(contract_clause_usages::active.eq(true))
            .select(ContractClauseUsageRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_usage).transpose()
    }

    async fn list_usages(
        &self,
        contract_id: MortgageContractId,
    ) -> Result<Vec<ContractClauseUsage>, ContractClauseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ContractClauseUsageRow> = contract_clause_usages::table
            .filter(contract_clause_usages::mortgage_contract_id.eq(*contract_id.as_uuid()))
            .order((
                contract_clause_usages::added_at.asc(),
                contract_clause_usages::id.asc(),
            ))
            .select(ContractClauseUsageRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_usage).collect()
    }

    async fn insert_replacing_active(
        &self,
        usage: &ContractClauseUsage,
        retired_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError> {
        let row = usage_to_row(usage)?;
        let retired_by = *retired_by.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let retired = conn
            .transaction(|conn| {
                async move {
                    lock_contract(conn, row.mortgage_contract_id).await?;
                    let retired = retire_active(
                        conn,
                        row.mortgage_contract_id,
                        row.clause_position_id,
                        row.id,
                        retired_by,
                        at,
                    )
                    .await?;
                    diesel::insert_into(contract_clause_usages::table)
                        .values(&row)
                        .execute(conn)
                        .await?;
                    Ok(retired)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        retired.map(row_to_usage).transpose()
    }

    async fn mark_removed(
        &self,
        usage: &ContractClauseUsage,
    ) -> Result<bool, ContractClauseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            contract_clause_usages::table
                .filter(contract_clause_usages::id.eq(*usage.id().as_uuid()))
                .filter(contract_clause_usages::active.eq(true)),
        )
        .set(state_of(usage))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn reactivate_replacing_active(
        &self,
        usage: &ContractClauseUsage,
        retired_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError> {
        let id = *usage.id().as_uuid();
        let contract_id = *usage.mortgage_contract_id().as_uuid();
        let position_id = *usage.clause_position_id().as_uuid();
        let state = state_of(usage);
        let retired_by = *retired_by.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let retired = conn
            .transaction(|conn| {
                async move {
                    lock_contract(conn, contract_id).await?;
                    let retired =
                        retire_active(conn, contract_id, position_id, id, retired_by, at).await?;
                    let updated = diesel::update(contract_clause_usages::table.find(id))
                        .set(&state)
                        .execute(conn)
                        .await?;
                    if updated == 0 {
                        return Err(TxError::Rejected(ContractClauseRepositoryError::query(
                            format!("usage {id} does not exist"),
                        )));
                    }
                    Ok(retired)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error)?;
        retired.map(row_to_usage).transpose()
    }
}
