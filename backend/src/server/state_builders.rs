//! Wire the Diesel repositories into the domain services.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use futureproof_backend::domain::{
    ContractClauseService, FunderActivationService, LenderClauseService,
};
use futureproof_backend::inbound::http::state::{HttpState, HttpStatePorts};
use futureproof_backend::outbound::persistence::{
    DbPool, DieselClausePositionRepository, DieselContractClauseRepository,
    DieselFunderRelationshipRepository, DieselLenderClauseRepository,
};

/// Build the handler state over a shared connection pool.
pub(crate) fn build_http_state(pool: &DbPool) -> HttpState {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let funder_links = Arc::new(DieselFunderRelationshipRepository::new(pool.clone()));
    let clauses_repo = Arc::new(DieselLenderClauseRepository::new(pool.clone()));
    let contracts_repo = Arc::new(DieselContractClauseRepository::new(pool.clone()));
    let positions_repo = Arc::new(DieselClausePositionRepository::new(pool.clone()));

    let funding = Arc::new(FunderActivationService::new(funder_links, clock.clone()));
    let clauses = Arc::new(LenderClauseService::new(clauses_repo.clone(), clock.clone()));
    let contracts = Arc::new(ContractClauseService::new(
        contracts_repo,
        clauses_repo,
        positions_repo,
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
