//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the lending repository ports backed by
//! PostgreSQL through `diesel-async` and a `bb8` connection pool.
//!
//! - Repositories only translate between Diesel rows and domain types; the
//!   lending rules live in the domain.
//! - Row structs (`models.rs`) and table definitions (`schema.rs`) stay
//!   private to this module.
//! - Multi-row state changes (the activation cascade, guarded pool
//!   activation, clause version allocation, usage replacement) each run in
//!   one transaction.
//!
//! # Example
//!
//! ```ignore
//! use futureproof_backend::outbound::persistence::{
//!     DbPool, DieselFunderRelationshipRepository, PoolConfig,
//! };
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/futureproof")).await?;
//! let funding = DieselFunderRelationshipRepository::new(pool);
//! ```

mod diesel_clause_position_repository;
mod diesel_contract_clause_repository;
mod diesel_error_mapping;
mod diesel_funder_relationship_repository;
mod diesel_lender_clause_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_clause_position_repository::DieselClausePositionRepository;
pub use diesel_contract_clause_repository::DieselContractClauseRepository;
pub use diesel_funder_relationship_repository::DieselFunderRelationshipRepository;
pub use diesel_lender_clause_repository::DieselLenderClauseRepository;
pub use migrations::{
    MIGRATIONS, MigrationError, run_pending_migrations, run_pending_migrations_blocking,
};
pub use pool::{DbPool, PoolConfig, PoolError};
