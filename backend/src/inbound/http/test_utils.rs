//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use chrono::{DateTime, TimeZone, Utc};
use mockable::Clock;

use crate::Trace;
use crate::domain::{ContractClauseService, FunderActivationService, LenderClauseService};
use crate::test_support::{InMemoryLendingStore, MutableClock};

use super::configure_admin;
use super::state::{HttpState, HttpStatePorts};

/// A fixed instant tests can reason about.
pub fn test_epoch() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).single() {
        Some(at) => at,
        None => panic!("valid test epoch"),
    }
}

/// Wire the real services over an in-memory store.
pub fn in_memory_state(store: &Arc<InMemoryLendingStore>, clock: Arc<MutableClock>) -> HttpState {
    let clock: Arc<dyn Clock> = clock;
    let funding = Arc::new(FunderActivationService::new(store.clone(), clock.clone()));
    let clauses = Arc::new(LenderClauseService::new(store.clone(), clock.clone()));
    let contracts = Arc::new(ContractClauseService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        clock,
    ));
    HttpState::new(HttpStatePorts {
        funding: funding.clone(),
        funding_query: funding,
        clauses: clauses.clone(),
        clauses_query: clauses,
        contracts: contracts.clone(),
        contracts_query: contracts,
    })
}

/// The admin scope wrapped in the trace middleware.
pub fn admin_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(Trace)
        .app_data(web::Data::new(state))
        .service(web::scope("/api/v1/admin").configure(configure_admin))
}
