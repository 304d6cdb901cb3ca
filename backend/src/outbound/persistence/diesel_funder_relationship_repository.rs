//! PostgreSQL-backed `FunderRelationshipRepository` implementation.
//!
//! Writes that must stay consistent with a sibling row run inside one
//! transaction. Pool activation and pool link creation lock the parent
//! wholesale funder link (`SELECT ... FOR UPDATE`) so a concurrent cascade
//! cannot interleave between the parent check and the child write. The
//! cascade itself updates the parent first, which takes the same row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::info;
use uuid::Uuid;

use crate::domain::funding::{
    CascadeOutcome, FunderPool, LenderFunderPool, LenderFundingRelationships,
    LenderWholesaleFunder, WholesaleFunder,
};
use crate::domain::ports::{
    FunderRelationshipRepository, FunderRelationshipRepositoryError, PoolActivation,
};
use crate::domain::{FunderPoolId, LenderId, WholesaleFunderId};

use super::diesel_error_mapping::{
    DieselFailure, TxError, classify_diesel_error, map_pool_error_into,
};
use super::models::{
    FunderPoolRow, LenderFunderPoolRow, LenderWholesaleFunderRow, WholesaleFunderRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{funder_pools, lender_funder_pools, lender_wholesale_funders, wholesale_funders};

type WholesaleFunderLinkRows = (LenderWholesaleFunderRow, WholesaleFunderRow);
type FunderPoolLinkRows = (LenderFunderPoolRow, FunderPoolRow, WholesaleFunderRow);

/// Diesel-backed implementation of the funding relationship port.
#[derive(Clone)]
pub struct DieselFunderRelationshipRepository {
    pool: DbPool,
}

impl DieselFunderRelationshipRepository {
    /// Create a new repository with the given connection pool.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use futureproof_backend::outbound::persistence::{
    ///     DbPool, DieselFunderRelationshipRepository, PoolConfig,
    /// };
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let pool = DbPool::new(PoolConfig::new("postgres://localhost/futureproof")).await?;
    /// let repository = DieselFunderRelationshipRepository::new(pool);
    /// # let _ = repository;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> FunderRelationshipRepositoryError {
    map_pool_error_into(error, FunderRelationshipRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> FunderRelationshipRepositoryError {
    match classify_diesel_error(error) {
        DieselFailure::Connection(message) => {
            FunderRelationshipRepositoryError::connection(message)
        }
        DieselFailure::UniqueViolation(constraint) => {
            FunderRelationshipRepositoryError::duplicate(format!("violates {constraint}"))
        }
        DieselFailure::ForeignKeyViolation(constraint) => {
            FunderRelationshipRepositoryError::missing_reference(format!("violates {constraint}"))
        }
        DieselFailure::Query(message) => FunderRelationshipRepositoryError::query(message),
    }
}

fn map_tx_error(error: TxError<FunderRelationshipRepositoryError>) -> FunderRelationshipRepositoryError {
    error.into_port(map_diesel_error)
}

fn to_wholesale_funder(row: WholesaleFunderRow) -> WholesaleFunder {
    WholesaleFunder {
        id: WholesaleFunderId::from_uuid(row.id),
        name: row.name,
    }
}

fn to_wholesale_funder_link((link, funder): WholesaleFunderLinkRows) -> LenderWholesaleFunder {
    LenderWholesaleFunder {
        id: link.id.into(),
        lender_id: LenderId::from_uuid(link.lender_id),
        wholesale_funder: to_wholesale_funder(funder),
        active: link.active,
        created_at: link.created_at,
        updated_at: link.updated_at,
    }
}

fn to_funder_pool_link((link, pool, funder): FunderPoolLinkRows) -> LenderFunderPool {
    LenderFunderPool {
        id: link.id.into(),
        lender_id: LenderId::from_uuid(link.lender_id),
        funder_pool: FunderPool {
            id: FunderPoolId::from_uuid(pool.id),
            name: pool.name,
            wholesale_funder: to_wholesale_funder(funder),
            total_amount: pool.total_amount,
            allocated_amount: pool.allocated_amount,
        },
        active: link.active,
        created_at: link.created_at,
        updated_at: link.updated_at,
    }
}

async fn load_wholesale_funder_link(
    conn: &mut AsyncPgConnection,
    lender_id: Uuid,
    wholesale_funder_id: Uuid,
) -> QueryResult<Option<LenderWholesaleFunder>> {
    let rows = lender_wholesale_funders::table
        .inner_join(wholesale_funders::table)
        .filter(lender_wholesale_funders::lender_id.eq(lender_id))
        .filter(lender_wholesale_funders::wholesale_funder_id.eq(wholesale_funder_id))
        .select((
            LenderWholesaleFunderRow::as_select(),
            WholesaleFunderRow::as_select(),
        ))
        .first::<WholesaleFunderLinkRows>(conn)
        .await
        .optional()?;
    Ok(rows.map(to_wholesale_funder_link))
}

async fn load_funder_pool_links(
    conn: &mut AsyncPgConnection,
    lender_id: Uuid,
    link_ids: Option<&[Uuid]>,
) -> QueryResult<Vec<LenderFunderPool>> {
    let mut query = lender_funder_pools::table
        .inner_join(funder_pools::table.inner_join(wholesale_funders::table))
        .filter(lender_funder_pools::lender_id.eq(lender_id))
        .select((
            LenderFunderPoolRow::as_select(),
            FunderPoolRow::as_select(),
            WholesaleFunderRow::as_select(),
        ))
        .order((wholesale_funders::name.asc(), funder_pools::name.asc()))
        .into_boxed();
    if let Some(ids) = link_ids {
        query = query.filter(lender_funder_pools::id.eq_any(ids.to_vec()));
    }
    let rows: Vec<FunderPoolLinkRows> = query.load(conn).await?;
    Ok(rows.into_iter().map(to_funder_pool_link).collect())
}

async fn load_funder_pool_link(
    conn: &mut AsyncPgConnection,
    lender_id: Uuid,
    funder_pool_id: Uuid,
) -> QueryResult<Option<LenderFunderPool>> {
    let rows = lender_funder_pools::table
        .inner_join(funder_pools::table.inner_join(wholesale_funders::table))
        .filter(lender_funder_pools::lender_id.eq(lender_id))
        .filter(lender_funder_pools::funder_pool_id.eq(funder_pool_id))
        .select((
            LenderFunderPoolRow::as_select(),
            FunderPoolRow::as_select(),
            WholesaleFunderRow::as_select(),
        ))
        .first::<FunderPoolLinkRows>(conn)
        .await
        .optional()?;
    Ok(rows.map(to_funder_pool_link))
}

/// Lock the parent link and return its `active` flag.
async fn lock_parent_link(
    conn: &mut AsyncPgConnection,
    lender_id: Uuid,
    wholesale_funder_id: Uuid,
) -> QueryResult<Option<bool>> {
    lender_wholesale_funders::table
        .filter(lender_wholesale_funders::lender_id.eq(lender_id))
        .filter(lender_wholesale_funders::wholesale_funder_id.eq(wholesale_funder_id))
        .select(lender_wholesale_funders::active)
        .for_update()
        .first::<bool>(conn)
        .await
        .optional()
}

#[async_trait]
impl FunderRelationshipRepository for DieselFunderRelationshipRepository {
    async fn find_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<Option<LenderWholesaleFunder>, FunderRelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_wholesale_funder_link(
            &mut conn,
            *lender_id.as_uuid(),
            *wholesale_funder_id.as_uuid(),
        )
        .await
        .map_err(map_diesel_error)
    }

    async fn find_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<Option<LenderFunderPool>, FunderRelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_funder_pool_link(&mut conn, *lender_id.as_uuid(), *funder_pool_id.as_uuid())
            .await
            .map_err(map_diesel_error)
    }

    async fn list_for_lender(
        &self,
        lender_id: LenderId,
    ) -> Result<LenderFundingRelationships, FunderRelationshipRepositoryError> {
        let lender = *lender_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // One transaction so both lists observe the same snapshot.
        conn.transaction(|conn| {
            async move {
                let parents: Vec<WholesaleFunderLinkRows> = lender_wholesale_funders::table
                    .inner_join(wholesale_funders::table)
                    .filter(lender_wholesale_funders::lender_id.eq(lender))
                    .select((
                        LenderWholesaleFunderRow::as_select(),
                        WholesaleFunderRow::as_select(),
                    ))
                    .order(wholesale_funders::name.asc())
                    .load(conn)
                    .await?;
                let funder_pools = load_funder_pool_links(conn, lender, None).await?;

                Ok(LenderFundingRelationships {
                    wholesale_funders: parents.into_iter().map(to_wholesale_funder_link).collect(),
                    funder_pools,
                })
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn create_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<LenderWholesaleFunder, FunderRelationshipRepositoryError> {
        let row = LenderWholesaleFunderRow {
            id: Uuid::new_v4(),
            lender_id: *lender_id.as_uuid(),
            wholesale_funder_id: *wholesale_funder_id.as_uuid(),
            active,
            created_at: at,
            updated_at: at,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                diesel::insert_into(lender_wholesale_funders::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                let funder: WholesaleFunderRow = wholesale_funders::table
                    .find(row.wholesale_funder_id)
                    .select(WholesaleFunderRow::as_select())
                    .first(conn)
                    .await?;
                Ok(to_wholesale_funder_link((row, funder)))
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn create_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        at: DateTime<Utc>,
    ) -> Result<LenderFunderPool, FunderRelationshipRepositoryError> {
        let lender = *lender_id.as_uuid();
        let pool_id = *funder_pool_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let pool: FunderPoolRow = funder_pools::table
                    .find(pool_id)
                    .select(FunderPoolRow::as_select())
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| {
                        TxError::Rejected(FunderRelationshipRepositoryError::missing_reference(
                            format!("funder pool {pool_id}"),
                        ))
                    })?;
                let parent_active = lock_parent_link(conn, lender, pool.wholesale_funder_id)
                    .await?
                    .ok_or_else(|| {
                        TxError::Rejected(FunderRelationshipRepositoryError::missing_reference(
                            format!(
                                "lender {lender} is not linked to wholesale funder {}",
                                pool.wholesale_funder_id
                            ),
                        ))
                    })?;

                let row = LenderFunderPoolRow {
                    id: Uuid::new_v4(),
                    lender_id: lender,
                    funder_pool_id: pool_id,
                    active: parent_active,
                    created_at: at,
                    updated_at: at,
                };
                diesel::insert_into(lender_funder_pools::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                let funder: WholesaleFunderRow = wholesale_funders::table
                    .find(pool.wholesale_funder_id)
                    .select(WholesaleFunderRow::as_select())
                    .first(conn)
                    .await?;
                Ok::<_, TxError<FunderRelationshipRepositoryError>>(to_funder_pool_link((
                    row, pool, funder,
                )))
            }
            .scope_boxed()
        })
        .await
        .map_err(map_tx_error)
    }

    async fn activate_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        at: DateTime<Utc>,
    ) -> Result<Option<LenderWholesaleFunder>, FunderRelationshipRepositoryError> {
        let lender = *lender_id.as_uuid();
        let funder = *wholesale_funder_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                diesel::update(
                    lender_wholesale_funders::table
                        .filter(lender_wholesale_funders::lender_id.eq(lender))
                        .filter(lender_wholesale_funders::wholesale_funder_id.eq(funder)),
                )
                .set((
                    lender_wholesale_funders::active.eq(true),
                    lender_wholesale_funders::updated_at.eq(at),
                ))
                .execute(conn)
                .await?;
                load_wholesale_funder_link(conn, lender, funder).await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn deactivate_wholesale_funder_link_cascade(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        at: DateTime<Utc>,
    ) -> Result<Option<CascadeOutcome>, FunderRelationshipRepositoryError> {
        let lender = *lender_id.as_uuid();
        let funder = *wholesale_funder_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let outcome = conn
            .transaction(|conn| {
                async move {
                    let updated = diesel::update(
                        lender_wholesale_funders::table
                            .filter(lender_wholesale_funders::lender_id.eq(lender))
                            .filter(lender_wholesale_funders::wholesale_funder_id.eq(funder)),
                    )
                    .set((
                        lender_wholesale_funders::active.eq(false),
                        lender_wholesale_funders::updated_at.eq(at),
                    ))
                    .execute(conn)
                    .await?;
                    if updated == 0 {
                        return Ok(None);
                    }

                    let funder_pool_ids = funder_pools::table
                        .filter(funder_pools::wholesale_funder_id.eq(funder))
                        .select(funder_pools::id);
                    let deactivated: Vec<Uuid> = diesel::update(
                        lender_funder_pools::table
                            .filter(lender_funder_pools::lender_id.eq(lender))
                            .filter(lender_funder_pools::active.eq(true))
                            .filter(lender_funder_pools::funder_pool_id.eq_any(funder_pool_ids)),
                    )
                    .set((
                        lender_funder_pools::active.eq(false),
                        lender_funder_pools::updated_at.eq(at),
                    ))
                    .returning(lender_funder_pools::id)
                    .get_results(conn)
                    .await?;

                    let Some(parent) = load_wholesale_funder_link(conn, lender, funder).await?
                    else {
                        return Err(DieselError::NotFound);
                    };
                    let deactivated_pools = if deactivated.is_empty() {
                        Vec::new()
                    } else {
                        load_funder_pool_links(conn, lender, Some(&deactivated)).await?
                    };
                    Ok(Some(CascadeOutcome {
                        wholesale_funder: parent,
                        deactivated_pools,
                    }))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        if let Some(outcome) = &outcome {
            info!(
                lender_id = %lender_id,
                wholesale_funder_id = %wholesale_funder_id,
                deactivated = outcome.deactivated_count(),
                "cascade committed"
            );
        }
        Ok(outcome)
    }

    async fn activate_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        at: DateTime<Utc>,
    ) -> Result<Option<PoolActivation>, FunderRelationshipRepositoryError> {
        let lender = *lender_id.as_uuid();
        let pool = *funder_pool_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let Some(link) = load_funder_pool_link(conn, lender, pool).await? else {
                    return Ok(None);
                };
                let parent_active =
                    lock_parent_link(conn, lender, *link.wholesale_funder().id.as_uuid()).await?;
                if parent_active != Some(true) {
                    return Ok(Some(PoolActivation::Blocked(link)));
                }

                diesel::update(lender_funder_pools::table.find(*link.id.as_uuid()))
                    .set((
                        lender_funder_pools::active.eq(true),
                        lender_funder_pools::updated_at.eq(at),
                    ))
                    .execute(conn)
                    .await?;
                Ok(Some(PoolActivation::Activated(LenderFunderPool {
                    active: true,
                    updated_at: at,
                    ..link
                })))
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn deactivate_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        at: DateTime<Utc>,
    ) -> Result<Option<LenderFunderPool>, FunderRelationshipRepositoryError> {
        let lender = *lender_id.as_uuid();
        let pool = *funder_pool_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                diesel::update(
                    lender_funder_pools::table
                        .filter(lender_funder_pools::lender_id.eq(lender))
                        .filter(lender_funder_pools::funder_pool_id.eq(pool)),
                )
                .set((
                    lender_funder_pools::active.eq(false),
                    lender_funder_pools::updated_at.eq(at),
                ))
                .execute(conn)
                .await?;
                load_funder_pool_link(conn, lender, pool).await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn delete_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<Option<usize>, FunderRelationshipRepositoryError> {
        let lender = *lender_id.as_uuid();
        let funder = *wholesale_funder_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                if lock_parent_link(conn, lender, funder).await?.is_none() {
                    return Ok(None);
                }
                let funder_pool_ids = funder_pools::table
                    .filter(funder_pools::wholesale_funder_id.eq(funder))
                    .select(funder_pools::id);
                let removed_pools = diesel::delete(
                    lender_funder_pools::table
                        .filter(lender_funder_pools::lender_id.eq(lender))
                        .filter(lender_funder_pools::funder_pool_id.eq_any(funder_pool_ids)),
                )
                .execute(conn)
                .await?;
                diesel::delete(
                    lender_wholesale_funders::table
                        .filter(lender_wholesale_funders::lender_id.eq(lender))
                        .filter(lender_wholesale_funders::wholesale_funder_id.eq(funder)),
                )
                .execute(conn)
                .await?;
                Ok(Some(removed_pools))
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn delete_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<bool, FunderRelationshipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(
            lender_funder_pools::table
                .filter(lender_funder_pools::lender_id.eq(*lender_id.as_uuid()))
                .filter(lender_funder_pools::funder_pool_id.eq(*funder_pool_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(removed > 0)
    }
}
