//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they depend only
//! on driving ports and stay testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    ContractClauseCommand, ContractClauseQuery, FunderActivationCommand, FunderRelationshipQuery,
    LenderClauseCommand, LenderClauseQuery,
};

/// Parameter object bundling the port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub funding: Arc<dyn FunderActivationCommand>,
    pub funding_query: Arc<dyn FunderRelationshipQuery>,
    pub clauses: Arc<dyn LenderClauseCommand>,
    pub clauses_query: Arc<dyn LenderClauseQuery>,
    pub contracts: Arc<dyn ContractClauseCommand>,
    pub contracts_query: Arc<dyn ContractClauseQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub funding: Arc<dyn FunderActivationCommand>,
    pub funding_query: Arc<dyn FunderRelationshipQuery>,
    pub clauses: Arc<dyn LenderClauseCommand>,
    pub clauses_query: Arc<dyn LenderClauseQuery>,
    pub contracts: Arc<dyn ContractClauseCommand>,
    pub contracts_query: Arc<dyn ContractClauseQuery>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from a ports bundle.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use futureproof_backend::domain::{
    ///     ContractClauseService, FunderActivationService, LenderClauseService,
    /// };
    /// use futureproof_backend::inbound::http::state::{HttpState, HttpStatePorts};
    /// use futureproof_backend::test_support::InMemoryLendingStore;
    ///
    /// let store = Arc::new(InMemoryLendingStore::default());
    /// let clock = Arc::new(mockable::DefaultClock);
    /// let funding = Arc::new(FunderActivationService::new(store.clone(), clock.clone()));
    /// let clauses = Arc::new(LenderClauseService::new(store.clone(), clock.clone()));
    /// let contracts = Arc::new(ContractClauseService::new(
    ///     store.clone(),
    ///     store.clone(),
    ///     store,
    ///     clock,
    /// ));
    /// let state = HttpState::new(HttpStatePorts {
    ///     funding: funding.clone(),
    ///     funding_query: funding,
    ///     clauses: clauses.clone(),
    ///     clauses_query: clauses,
    ///     contracts: contracts.clone(),
    ///     contracts_query: contracts,
    /// });
    /// let _clauses = state.clauses_query.clone();
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            funding,
            funding_query,
            clauses,
            clauses_query,
            contracts,
            contracts_query,
        } = ports;
        Self {
            funding,
            funding_query,
            clauses,
            clauses_query,
            contracts,
            contracts_query,
        }
    }
}
