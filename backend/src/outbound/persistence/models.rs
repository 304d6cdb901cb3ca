//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types live in the
//! repository modules that read them.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    clause_positions, contract_clause_usages, funder_pools, lender_clause_versions,
    lender_clauses, lender_funder_pools, lender_wholesale_funders, mortgage_contracts,
    wholesale_funders,
};

// ---------------------------------------------------------------------------
// Funding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = wholesale_funders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct WholesaleFunderRow {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = funder_pools)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FunderPoolRow {
    pub id: Uuid,
    pub wholesale_funder_id: Uuid,
    pub name: String,
    pub total_amount: i64,
    pub allocated_amount: i64,
}

/// Row struct for the lender/wholesale funder relationship.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = lender_wholesale_funders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LenderWholesaleFunderRow {
    pub id: Uuid,
    pub lender_id: Uuid,
    pub wholesale_funder_id: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for the lender/funder pool relationship.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = lender_funder_pools)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LenderFunderPoolRow {
    pub id: Uuid,
    pub lender_id: Uuid,
    pub funder_pool_id: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Clauses
// ---------------------------------------------------------------------------

/// Row struct for reading and inserting lender clauses.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = lender_clauses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LenderClauseRow {
    pub id: Uuid,
    pub lender_id: Uuid,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub version: i32,
    pub is_draft: bool,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset for the mutable columns of a clause.
///
/// `description` is written even when `None` so a cleared description is
/// persisted as NULL.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = lender_clauses)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct LenderClauseChangeset<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub description: Option<&'a str>,
    pub is_draft: bool,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = lender_clause_versions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LenderClauseVersionRow {
    pub id: Uuid,
    pub lender_clause_id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub changes: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = clause_positions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ClausePositionRow {
    pub id: Uuid,
    pub section_identifier: String,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = clause_positions)]
pub(crate) struct NewClausePositionRow<'a> {
    pub id: Uuid,
    pub section_identifier: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub display_order: i32,
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = mortgage_contracts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MortgageContractRow {
    pub id: Uuid,
    pub lender_id: Uuid,
    pub reference: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading and inserting clause usages.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = contract_clause_usages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ContractClauseUsageRow {
    pub id: Uuid,
    pub mortgage_contract_id: Uuid,
    pub lender_clause_id: Uuid,
    pub clause_position_id: Uuid,
    pub clause_content_snapshot: String,
    pub contract_version_at_usage: i32,
    pub clause_version_at_usage: i32,
    pub active: bool,
    pub added_by: Uuid,
    pub added_at: DateTime<Utc>,
    pub removed_by: Option<Uuid>,
    pub removed_at: Option<DateTime<Utc>>,
}

/// Changeset for retiring or reactivating a usage.
///
/// Snapshot columns are not part of the changeset and so are never
/// rewritten after insertion.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = contract_clause_usages)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UsageStateChangeset {
    pub active: bool,
    pub removed_by: Option<Uuid>,
    pub removed_at: Option<DateTime<Utc>>,
}
