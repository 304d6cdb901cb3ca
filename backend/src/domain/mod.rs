//! Domain primitives, rules and services.
//!
//! Purpose: define the lending entities shared by the HTTP and persistence
//! layers, the pure rules that govern them, and the services that implement
//! the driving ports on top of the driven ports.
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and stable identifier.
//! - `funding`: wholesale funder and funder pool relationships with the
//!   activation cascade rules.
//! - `clauses`: lender clauses, their audit trail, markup rendering and
//!   placeholder substitution.
//! - `contracts`: clause usages in mortgage contracts and point-in-time
//!   reconstruction.
//! - `ports`: driving and driven port traits.

pub mod clauses;
pub mod contracts;
pub mod error;
pub mod funding;
pub mod ids;
pub mod ports;
pub mod trace_id;

mod contract_clause_service;
mod funder_activation_service;
mod lender_clause_service;

pub use self::contract_clause_service::ContractClauseService;
pub use self::error::{Error, ErrorCode, ErrorValidationError, FieldError};
pub use self::funder_activation_service::FunderActivationService;
pub use self::ids::{
    ClausePositionId, ContractClauseUsageId, FunderPoolId, LenderClauseId,
    LenderClauseVersionId, LenderFunderPoolId, LenderId, LenderWholesaleFunderId,
    MortgageContractId, UserId, WholesaleFunderId,
};
pub use self::lender_clause_service::LenderClauseService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use futureproof_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::not_found("no such clause"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
