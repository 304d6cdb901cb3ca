//! HTTP inbound adapter exposing the admin REST endpoints.

use actix_web::web;

pub mod acting_user;
pub mod clauses;
pub mod contracts;
pub mod error;
pub mod funding;
pub mod health;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub(crate) mod validation;

pub use error::ApiResult;

/// Register every admin handler. Mount under `/api/v1/admin`.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use futureproof_backend::inbound::http::configure_admin;
///
/// let _app = App::new().service(web::scope("/api/v1/admin").configure(configure_admin));
/// ```
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(funding::list_funding)
        .service(funding::toggle_wholesale_funder)
        .service(funding::toggle_funder_pool)
        .service(funding::can_activate_funder_pool)
        .service(clauses::list_clauses)
        .service(clauses::create_clause)
        .service(clauses::preview_markup)
        .service(clauses::get_clause)
        .service(clauses::update_clause)
        .service(clauses::publish_clause)
        .service(clauses::activate_clause)
        .service(clauses::deactivate_clause)
        .service(clauses::preview_clause)
        .service(clauses::render_clause)
        .service(clauses::clause_history)
        .service(contracts::list_positions)
        .service(contracts::list_usages)
        .service(contracts::add_clause)
        .service(contracts::contract_at_time)
        .service(contracts::render_contract_at_time)
        .service(contracts::remove_clause)
        .service(contracts::reactivate_usage);
}
