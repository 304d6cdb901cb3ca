//! OpenAPI documentation for the admin API.
//!
//! Registers every admin handler and the domain types they exchange. The
//! document is exported with `cargo run --bin openapi-dump` for tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::clauses::{AuditLine, ClausePosition, FieldChange, LenderClause};
use crate::domain::contracts::{
    ContractClauseAtTime, ContractClauseUsage, ContractSnapshot, RenderedContract,
    RenderedContractClause,
};
use crate::domain::funding::{
    FunderPool, LenderFunderPool, LenderFundingRelationships, LenderWholesaleFunder,
    WholesaleFunder,
};
use crate::domain::ports::{
    ActivationCheck, AddLenderClauseRequest, CreateLenderClauseRequest, RenderedMarkup,
    UpdateLenderClauseRequest,
};
use crate::domain::{Error, ErrorCode, FieldError};
use crate::inbound::http::acting_user::ACTING_USER_HEADER;
use crate::inbound::http::clauses::{PreviewMarkupRequest, RenderClauseRequest};
use crate::inbound::http::contracts::RenderContractRequest;
use crate::inbound::http::funding::{FunderPoolToggleResponse, WholesaleFunderToggleResponse};

/// Describe the acting-user header as an API key scheme.
struct ActingUserAddon;

impl Modify for ActingUserAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "ActingUser",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                ACTING_USER_HEADER,
                "UUID of the administrator performing the change.",
            ))),
        );
    }
}

/// OpenAPI document for the admin API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&ActingUserAddon),
    info(
        title = "Futureproof lending admin API",
        description = "Funder activation, lender clause management and contract clause history."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::funding::list_funding,
        crate::inbound::http::funding::toggle_wholesale_funder,
        crate::inbound::http::funding::toggle_funder_pool,
        crate::inbound::http::funding::can_activate_funder_pool,
        crate::inbound::http::clauses::list_clauses,
        crate::inbound::http::clauses::create_clause,
        crate::inbound::http::clauses::preview_markup,
        crate::inbound::http::clauses::get_clause,
        crate::inbound::http::clauses::update_clause,
        crate::inbound::http::clauses::publish_clause,
        crate::inbound::http::clauses::activate_clause,
        crate::inbound::http::clauses::deactivate_clause,
        crate::inbound::http::clauses::preview_clause,
        crate::inbound::http::clauses::render_clause,
        crate::inbound::http::clauses::clause_history,
        crate::inbound::http::contracts::list_positions,
        crate::inbound::http::contracts::list_usages,
        crate::inbound::http::contracts::add_clause,
        crate::inbound::http::contracts::remove_clause,
        crate::inbound::http::contracts::reactivate_usage,
        crate::inbound::http::contracts::contract_at_time,
        crate::inbound::http::contracts::render_contract_at_time,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        FieldError,
        WholesaleFunder,
        FunderPool,
        LenderWholesaleFunder,
        LenderFunderPool,
        LenderFundingRelationships,
        ActivationCheck,
        WholesaleFunderToggleResponse,
        FunderPoolToggleResponse,
        LenderClause,
        FieldChange,
        AuditLine,
        CreateLenderClauseRequest,
        UpdateLenderClauseRequest,
        PreviewMarkupRequest,
        RenderClauseRequest,
        RenderedMarkup,
        ClausePosition,
        ContractClauseUsage,
        AddLenderClauseRequest,
        ContractClauseAtTime,
        ContractSnapshot,
        RenderContractRequest,
        RenderedContractClause,
        RenderedContract,
    )),
    tags(
        (name = "funding", description = "Wholesale funder and funder pool activation"),
        (name = "clauses", description = "Lender clause lifecycle, rendering and history"),
        (name = "contracts", description = "Clause placement in mortgage contracts"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
