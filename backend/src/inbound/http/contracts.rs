//! Contract clause handlers.
//!
//! ```text
//! GET    /api/v1/admin/clause-positions
//! GET    /api/v1/admin/contracts/{contractId}/usages
//! POST   /api/v1/admin/contracts/{contractId}/clauses
//! GET    /api/v1/admin/contracts/{contractId}/clauses?at=<rfc3339>
//! POST   /api/v1/admin/contracts/{contractId}/clauses/render
//! DELETE /api/v1/admin/contracts/{contractId}/clauses/{sectionIdentifier}
//! POST   /api/v1/admin/contracts/{contractId}/usages/{usageId}/reactivate
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::clauses::{ClausePosition, Substitutions};
use crate::domain::contracts::{ContractClauseUsage, ContractSnapshot, RenderedContract};
use crate::domain::ports::AddLenderClauseRequest;
use crate::domain::{ContractClauseUsageId, Error, MortgageContractId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::acting_user::ActingUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, missing_field_error, parse_id, parse_rfc3339_timestamp,
};

const CONTRACT_ID: FieldName = FieldName::new("contractId");
const USAGE_ID: FieldName = FieldName::new("usageId");
const AT: FieldName = FieldName::new("at");

/// Point in time for historical reads.
#[derive(Debug, Clone, Deserialize)]
pub struct AtQuery {
    pub at: Option<String>,
}

/// Point in time and placeholder values for a rendered historical read.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderContractRequest {
    #[schema(format = "date-time")]
    pub at: String,
    #[serde(default)]
    pub values: Substitutions,
}

fn contract_id(raw: &str) -> Result<MortgageContractId, Error> {
    parse_id(raw, CONTRACT_ID)
}

/// Template positions lender clauses can occupy, in document order.
#[utoipa::path(
    get,
    path = "/api/v1/admin/clause-positions",
    responses(
        (status = 200, description = "Clause positions", body = [ClausePosition]),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["contracts"],
    operation_id = "listClausePositions"
)]
#[get("/clause-positions")]
pub async fn list_positions(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<Vec<ClausePosition>>> {
    let positions = state.contracts_query.list_positions().await?;
    Ok(web::Json(positions))
}

/// Every usage a contract has had, removed ones included.
#[utoipa::path(
    get,
    path = "/api/v1/admin/contracts/{contractId}/usages",
    params(("contractId" = String, Path, format = Uuid, description = "Contract identifier")),
    responses(
        (status = 200, description = "Clause usages", body = [ContractClauseUsage]),
        (status = 404, description = "Contract not found", body = Error)
    ),
    tags = ["contracts"],
    operation_id = "listContractClauseUsages"
)]
#[get("/contracts/{contract_id}/usages")]
pub async fn list_usages(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<ContractClauseUsage>>> {
    let usages = state.contracts_query.list_usages(contract_id(&path)?).await?;
    Ok(web::Json(usages))
}

/// Place an active lender clause at a position, replacing the current one.
#[utoipa::path(
    post,
    path = "/api/v1/admin/contracts/{contractId}/clauses",
    params(
        ("contractId" = String, Path, format = Uuid, description = "Contract identifier"),
        ("X-Acting-User" = String, Header, format = Uuid, description = "User performing the change")
    ),
    request_body = AddLenderClauseRequest,
    responses(
        (status = 201, description = "Clause placed", body = ContractClauseUsage),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Contract, clause or position not found", body = Error),
        (status = 409, description = "Concurrent placement at the same position", body = Error)
    ),
    tags = ["contracts"],
    operation_id = "addContractClause"
)]
#[post("/contracts/{contract_id}/clauses")]
pub async fn add_clause(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    actor: ActingUser,
    payload: web::Json<AddLenderClauseRequest>,
) -> ApiResult<HttpResponse> {
    let usage = state
        .contracts
        .add_lender_clause(contract_id(&path)?, payload.into_inner(), actor.user_id())
        .await?;
    Ok(HttpResponse::Created().json(usage))
}

/// Remove the clause at a position. The usage is kept as history.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/contracts/{contractId}/clauses/{sectionIdentifier}",
    params(
        ("contractId" = String, Path, format = Uuid, description = "Contract identifier"),
        ("sectionIdentifier" = String, Path, description = "Clause position, e.g. after_section_3"),
        ("X-Acting-User" = String, Header, format = Uuid, description = "User performing the change")
    ),
    responses(
        (status = 200, description = "Clause removed", body = ContractClauseUsage),
        (status = 404, description = "Nothing active at that position", body = Error)
    ),
    tags = ["contracts"],
    operation_id = "removeContractClause"
)]
#[delete("/contracts/{contract_id}/clauses/{section_identifier}")]
pub async fn remove_clause(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    actor: ActingUser,
) -> ApiResult<web::Json<ContractClauseUsage>> {
    let (raw_contract, section_identifier) = path.into_inner();
    let usage = state
        .contracts
        .remove_lender_clause(contract_id(&raw_contract)?, section_identifier, actor.user_id())
        .await?;
    Ok(web::Json(usage))
}

/// Bring a removed usage back, retiring whatever occupies its position.
#[utoipa::path(
    post,
    path = "/api/v1/admin/contracts/{contractId}/usages/{usageId}/reactivate",
    params(
        ("contractId" = String, Path, format = Uuid, description = "Contract identifier"),
        ("usageId" = String, Path, format = Uuid, description = "Usage identifier"),
        ("X-Acting-User" = String, Header, format = Uuid, description = "User performing the change")
    ),
    responses(
        (status = 200, description = "Usage active", body = ContractClauseUsage),
        (status = 404, description = "Usage not found on this contract", body = Error),
        (status = 409, description = "Concurrent placement at the same position", body = Error)
    ),
    tags = ["contracts"],
    operation_id = "reactivateContractClauseUsage"
)]
#[post("/contracts/{contract_id}/usages/{usage_id}/reactivate")]
pub async fn reactivate_usage(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    actor: ActingUser,
) -> ApiResult<web::Json<ContractClauseUsage>> {
    let contract = contract_id(&path.0)?;
    let usage_id: ContractClauseUsageId = parse_id(&path.1, USAGE_ID)?;
    let usage = state
        .contracts
        .reactivate_usage(contract, usage_id, actor.user_id())
        .await?;
    Ok(web::Json(usage))
}

/// The contract's lender clauses as they stood at `at`.
#[utoipa::path(
    get,
    path = "/api/v1/admin/contracts/{contractId}/clauses",
    params(
        ("contractId" = String, Path, format = Uuid, description = "Contract identifier"),
        ("at" = String, Query, format = DateTime, description = "RFC 3339 instant to reconstruct")
    ),
    responses(
        (status = 200, description = "Historical snapshot", body = ContractSnapshot),
        (status = 400, description = "Missing or malformed timestamp", body = Error),
        (status = 404, description = "Contract not found", body = Error)
    ),
    tags = ["contracts"],
    operation_id = "contractClausesAtTime"
)]
#[get("/contracts/{contract_id}/clauses")]
pub async fn contract_at_time(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<AtQuery>,
) -> ApiResult<web::Json<ContractSnapshot>> {
    let contract = contract_id(&path)?;
    let raw_at = query.at.as_deref().ok_or_else(|| missing_field_error(AT))?;
    let at = parse_rfc3339_timestamp(raw_at, AT)?;
    let snapshot = state.contracts_query.contract_at_time(contract, at).await?;
    Ok(web::Json(snapshot))
}

/// The historical snapshot rendered to HTML with placeholder values.
#[utoipa::path(
    post,
    path = "/api/v1/admin/contracts/{contractId}/clauses/render",
    params(("contractId" = String, Path, format = Uuid, description = "Contract identifier")),
    request_body = RenderContractRequest,
    responses(
        (status = 200, description = "Rendered snapshot", body = RenderedContract),
        (status = 400, description = "Malformed timestamp", body = Error),
        (status = 404, description = "Contract not found", body = Error)
    ),
    tags = ["contracts"],
    operation_id = "renderContractClausesAtTime"
)]
#[post("/contracts/{contract_id}/clauses/render")]
pub async fn render_contract_at_time(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<RenderContractRequest>,
) -> ApiResult<web::Json<RenderedContract>> {
    let contract = contract_id(&path)?;
    let RenderContractRequest { at, values } = payload.into_inner();
    let at = parse_rfc3339_timestamp(&at, AT)?;
    let rendered = state
        .contracts_query
        .rendered_contract_at_time(contract, at, values)
        .await?;
    Ok(web::Json(rendered))
}

#[cfg(test)]
#[path = "contracts_tests.rs"]
mod tests;
