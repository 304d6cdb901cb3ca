//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`) are implemented by persistence adapters and
//! return `define_port_error!` enums. Driving ports (`*Command`, `*Query`)
//! are implemented by domain services and return [`crate::domain::Error`].

mod macros;
pub(crate) use macros::define_port_error;

mod clause_position_repository;
mod contract_clause_command;
mod contract_clause_query;
mod contract_clause_repository;
mod funder_activation_command;
mod funder_relationship_query;
mod funder_relationship_repository;
mod lender_clause_command;
mod lender_clause_query;
mod lender_clause_repository;

#[cfg(test)]
pub use clause_position_repository::MockClausePositionRepository;
pub use clause_position_repository::{ClausePositionRepository, ClausePositionRepositoryError};
#[cfg(test)]
pub use contract_clause_command::MockContractClauseCommand;
pub use contract_clause_command::{AddLenderClauseRequest, ContractClauseCommand};
#[cfg(test)]
pub use contract_clause_query::MockContractClauseQuery;
pub use contract_clause_query::ContractClauseQuery;
#[cfg(test)]
pub use contract_clause_repository::MockContractClauseRepository;
pub use contract_clause_repository::{ContractClauseRepository, ContractClauseRepositoryError};
#[cfg(test)]
pub use funder_activation_command::MockFunderActivationCommand;
pub use funder_activation_command::FunderActivationCommand;
#[cfg(test)]
pub use funder_relationship_query::MockFunderRelationshipQuery;
pub use funder_relationship_query::{ActivationCheck, FunderRelationshipQuery};
#[cfg(test)]
pub use funder_relationship_repository::MockFunderRelationshipRepository;
pub use funder_relationship_repository::{
    FunderRelationshipRepository, FunderRelationshipRepositoryError, PoolActivation,
};
#[cfg(test)]
pub use lender_clause_command::MockLenderClauseCommand;
pub use lender_clause_command::{
    CreateLenderClauseRequest, LenderClauseCommand, UpdateLenderClauseRequest,
};
#[cfg(test)]
pub use lender_clause_query::MockLenderClauseQuery;
pub use lender_clause_query::{LenderClauseQuery, RenderedMarkup};
#[cfg(test)]
pub use lender_clause_repository::MockLenderClauseRepository;
pub use lender_clause_repository::{LenderClauseRepository, LenderClauseRepositoryError};
