//! Futureproof lending admin core.
//!
//! Funder activation with cascading deactivation, versioned lender clauses
//! with an audit trail, and point-in-time reconstruction of the clauses in a
//! mortgage contract.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
