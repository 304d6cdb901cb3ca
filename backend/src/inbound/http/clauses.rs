//! Lender clause handlers.
//!
//! ```text
//! GET   /api/v1/admin/lenders/{lenderId}/clauses
//! POST  /api/v1/admin/lenders/{lenderId}/clauses
//! POST  /api/v1/admin/clauses/preview
//! GET   /api/v1/admin/clauses/{clauseId}
//! PATCH /api/v1/admin/clauses/{clauseId}
//! POST  /api/v1/admin/clauses/{clauseId}/publish
//! POST  /api/v1/admin/clauses/{clauseId}/activate
//! POST  /api/v1/admin/clauses/{clauseId}/deactivate
//! GET   /api/v1/admin/clauses/{clauseId}/preview
//! POST  /api/v1/admin/clauses/{clauseId}/render
//! GET   /api/v1/admin/clauses/{clauseId}/history
//! ```
//!
//! Mutations require the `X-Acting-User` header; the named user lands on the
//! clause's audit trail.

use actix_web::{HttpResponse, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::clauses::{AuditLine, LenderClause, Substitutions};
use crate::domain::ports::{CreateLenderClauseRequest, RenderedMarkup, UpdateLenderClauseRequest};
use crate::domain::{Error, LenderClauseId, LenderId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::acting_user::ActingUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

const LENDER_ID: FieldName = FieldName::new("lenderId");
const CLAUSE_ID: FieldName = FieldName::new("clauseId");

/// Markup to preview before it is saved.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewMarkupRequest {
    pub content: String,
}

/// Placeholder values for rendering a stored clause.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderClauseRequest {
    #[serde(default)]
    pub values: Substitutions,
}

fn clause_id(raw: &str) -> Result<LenderClauseId, Error> {
    parse_id(raw, CLAUSE_ID)
}

/// List a lender's clauses, newest version first.
#[utoipa::path(
    get,
    path = "/api/v1/admin/lenders/{lenderId}/clauses",
    params(("lenderId" = String, Path, format = Uuid, description = "Lender identifier")),
    responses(
        (status = 200, description = "Lender clauses", body = [LenderClause]),
        (status = 400, description = "Invalid request", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "listLenderClauses"
)]
#[get("/lenders/{lender_id}/clauses")]
pub async fn list_clauses(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<LenderClause>>> {
    let lender_id: LenderId = parse_id(&path, LENDER_ID)?;
    let clauses = state.clauses_query.list_clauses(lender_id).await?;
    Ok(web::Json(clauses))
}

/// Create a draft clause with the lender's next version number.
#[utoipa::path(
    post,
    path = "/api/v1/admin/lenders/{lenderId}/clauses",
    params(
        ("lenderId" = String, Path, format = Uuid, description = "Lender identifier"),
        ("X-Acting-User" = String, Header, format = Uuid, description = "User performing the change")
    ),
    request_body = CreateLenderClauseRequest,
    responses(
        (status = 201, description = "Clause created", body = LenderClause),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Lender not found", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "createLenderClause"
)]
#[post("/lenders/{lender_id}/clauses")]
pub async fn create_clause(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    actor: ActingUser,
    payload: web::Json<CreateLenderClauseRequest>,
) -> ApiResult<HttpResponse> {
    let lender_id: LenderId = parse_id(&path, LENDER_ID)?;
    let clause = state
        .clauses
        .create_clause(lender_id, payload.into_inner(), actor.user_id())
        .await?;
    Ok(HttpResponse::Created().json(clause))
}

/// Render arbitrary markup with placeholders left in place.
#[utoipa::path(
    post,
    path = "/api/v1/admin/clauses/preview",
    request_body = PreviewMarkupRequest,
    responses(
        (status = 200, description = "Rendered preview", body = RenderedMarkup),
        (status = 400, description = "Invalid request", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "previewMarkup"
)]
#[post("/clauses/preview")]
pub async fn preview_markup(
    state: web::Data<HttpState>,
    payload: web::Json<PreviewMarkupRequest>,
) -> ApiResult<web::Json<RenderedMarkup>> {
    let rendered = state
        .clauses_query
        .preview_markup(payload.into_inner().content)
        .await?;
    Ok(web::Json(rendered))
}

/// Fetch one clause.
#[utoipa::path(
    get,
    path = "/api/v1/admin/clauses/{clauseId}",
    params(("clauseId" = String, Path, format = Uuid, description = "Clause identifier")),
    responses(
        (status = 200, description = "Lender clause", body = LenderClause),
        (status = 404, description = "Clause not found", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "getLenderClause"
)]
#[get("/clauses/{clause_id}")]
pub async fn get_clause(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<LenderClause>> {
    let clause = state.clauses_query.get_clause(clause_id(&path)?).await?;
    Ok(web::Json(clause))
}

/// Edit a clause's title, content or description.
#[utoipa::path(
    patch,
    path = "/api/v1/admin/clauses/{clauseId}",
    params(
        ("clauseId" = String, Path, format = Uuid, description = "Clause identifier"),
        ("X-Acting-User" = String, Header, format = Uuid, description = "User performing the change")
    ),
    request_body = UpdateLenderClauseRequest,
    responses(
        (status = 200, description = "Clause updated", body = LenderClause),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Clause not found", body = Error),
        (status = 409, description = "Clause changed concurrently", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "updateLenderClause"
)]
#[patch("/clauses/{clause_id}")]
pub async fn update_clause(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    actor: ActingUser,
    payload: web::Json<UpdateLenderClauseRequest>,
) -> ApiResult<web::Json<LenderClause>> {
    let clause = state
        .clauses
        .update_clause(clause_id(&path)?, payload.into_inner(), actor.user_id())
        .await?;
    Ok(web::Json(clause))
}

/// Move a draft clause to published.
#[utoipa::path(
    post,
    path = "/api/v1/admin/clauses/{clauseId}/publish",
    params(
        ("clauseId" = String, Path, format = Uuid, description = "Clause identifier"),
        ("X-Acting-User" = String, Header, format = Uuid, description = "User performing the change")
    ),
    responses(
        (status = 200, description = "Clause published", body = LenderClause),
        (status = 404, description = "Clause not found", body = Error),
        (status = 409, description = "Clause changed concurrently", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "publishLenderClause"
)]
#[post("/clauses/{clause_id}/publish")]
pub async fn publish_clause(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    actor: ActingUser,
) -> ApiResult<web::Json<LenderClause>> {
    let clause = state
        .clauses
        .publish_clause(clause_id(&path)?, actor.user_id())
        .await?;
    Ok(web::Json(clause))
}

/// Make a published clause available to contracts.
#[utoipa::path(
    post,
    path = "/api/v1/admin/clauses/{clauseId}/activate",
    params(
        ("clauseId" = String, Path, format = Uuid, description = "Clause identifier"),
        ("X-Acting-User" = String, Header, format = Uuid, description = "User performing the change")
    ),
    responses(
        (status = 200, description = "Clause active", body = LenderClause),
        (status = 400, description = "Clause is still a draft", body = Error),
        (status = 404, description = "Clause not found", body = Error),
        (status = 409, description = "Clause changed concurrently", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "activateLenderClause"
)]
#[post("/clauses/{clause_id}/activate")]
pub async fn activate_clause(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    actor: ActingUser,
) -> ApiResult<web::Json<LenderClause>> {
    let clause = state
        .clauses
        .activate_clause(clause_id(&path)?, actor.user_id())
        .await?;
    Ok(web::Json(clause))
}

/// Withdraw a clause from new contracts.
#[utoipa::path(
    post,
    path = "/api/v1/admin/clauses/{clauseId}/deactivate",
    params(
        ("clauseId" = String, Path, format = Uuid, description = "Clause identifier"),
        ("X-Acting-User" = String, Header, format = Uuid, description = "User performing the change")
    ),
    responses(
        (status = 200, description = "Clause inactive", body = LenderClause),
        (status = 404, description = "Clause not found", body = Error),
        (status = 409, description = "Clause changed concurrently", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "deactivateLenderClause"
)]
#[post("/clauses/{clause_id}/deactivate")]
pub async fn deactivate_clause(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    actor: ActingUser,
) -> ApiResult<web::Json<LenderClause>> {
    let clause = state
        .clauses
        .deactivate_clause(clause_id(&path)?, actor.user_id())
        .await?;
    Ok(web::Json(clause))
}

/// Render a stored clause with its placeholders left in place.
#[utoipa::path(
    get,
    path = "/api/v1/admin/clauses/{clauseId}/preview",
    params(("clauseId" = String, Path, format = Uuid, description = "Clause identifier")),
    responses(
        (status = 200, description = "Rendered preview", body = RenderedMarkup),
        (status = 404, description = "Clause not found", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "previewLenderClause"
)]
#[get("/clauses/{clause_id}/preview")]
pub async fn preview_clause(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<RenderedMarkup>> {
    let rendered = state.clauses_query.preview_clause(clause_id(&path)?).await?;
    Ok(web::Json(rendered))
}

/// Render a stored clause with placeholder values substituted.
#[utoipa::path(
    post,
    path = "/api/v1/admin/clauses/{clauseId}/render",
    params(("clauseId" = String, Path, format = Uuid, description = "Clause identifier")),
    request_body = RenderClauseRequest,
    responses(
        (status = 200, description = "Rendered clause", body = RenderedMarkup),
        (status = 404, description = "Clause not found", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "renderLenderClause"
)]
#[post("/clauses/{clause_id}/render")]
pub async fn render_clause(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<RenderClauseRequest>,
) -> ApiResult<web::Json<RenderedMarkup>> {
    let rendered = state
        .clauses_query
        .render_clause(clause_id(&path)?, payload.into_inner().values)
        .await?;
    Ok(web::Json(rendered))
}

/// A clause's audit trail, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/admin/clauses/{clauseId}/history",
    params(("clauseId" = String, Path, format = Uuid, description = "Clause identifier")),
    responses(
        (status = 200, description = "Audit trail", body = [AuditLine]),
        (status = 404, description = "Clause not found", body = Error)
    ),
    tags = ["clauses"],
    operation_id = "lenderClauseHistory"
)]
#[get("/clauses/{clause_id}/history")]
pub async fn clause_history(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<AuditLine>>> {
    let history = state.clauses_query.clause_history(clause_id(&path)?).await?;
    Ok(web::Json(history))
}

#[cfg(test)]
#[path = "clauses_tests.rs"]
mod tests;
