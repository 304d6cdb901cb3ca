//! Shared helpers for the embedded PostgreSQL adapter suites.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! the cluster bootstrap and template database helpers live here and each
//! Diesel suite pulls them in with `mod support;`.

pub mod cluster_skip;
pub mod embedded_postgres;
pub mod pg_embed;

pub use cluster_skip::handle_cluster_setup_failure;
pub use embedded_postgres::{connect_pool, provision_template_database};

/// Render a `postgres` error with its SQLSTATE and detail.
///
/// `postgres::Error`'s `Display` collapses server errors to `db error`,
/// which hides what went wrong in CI logs.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    summary
}
