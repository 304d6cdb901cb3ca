//! Lender funding relationship handlers.
//!
//! ```text
//! GET  /api/v1/admin/lenders/{lenderId}/funding
//! POST /api/v1/admin/lenders/{lenderId}/wholesale-funders/{wholesaleFunderId}/toggle
//! POST /api/v1/admin/lenders/{lenderId}/funder-pools/{funderPoolId}/toggle
//! GET  /api/v1/admin/lenders/{lenderId}/funder-pools/{funderPoolId}/can-activate
//! ```

use actix_web::{get, post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::funding::{
    LenderFunderPool, LenderFundingRelationships, LenderWholesaleFunder, WholesaleFunderToggle,
};
use crate::domain::ports::ActivationCheck;
use crate::domain::{Error, FunderPoolId, LenderId, WholesaleFunderId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

const LENDER_ID: FieldName = FieldName::new("lenderId");
const WHOLESALE_FUNDER_ID: FieldName = FieldName::new("wholesaleFunderId");
const FUNDER_POOL_ID: FieldName = FieldName::new("funderPoolId");

/// Outcome of toggling a wholesale funder link.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WholesaleFunderToggleResponse {
    pub relationship: LenderWholesaleFunder,
    /// Pool links switched off by the cascade; empty on activation.
    pub deactivated_pools: Vec<LenderFunderPool>,
    pub message: String,
}

impl From<WholesaleFunderToggle> for WholesaleFunderToggleResponse {
    fn from(toggle: WholesaleFunderToggle) -> Self {
        let message = toggle.summary();
        match toggle {
            WholesaleFunderToggle::Activated(relationship) => Self {
                relationship,
                deactivated_pools: Vec::new(),
                message,
            },
            WholesaleFunderToggle::Deactivated(outcome) => Self {
                relationship: outcome.wholesale_funder,
                deactivated_pools: outcome.deactivated_pools,
                message,
            },
        }
    }
}

/// Outcome of toggling a funder pool link.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunderPoolToggleResponse {
    pub relationship: LenderFunderPool,
    pub message: String,
}

impl From<LenderFunderPool> for FunderPoolToggleResponse {
    fn from(relationship: LenderFunderPool) -> Self {
        let state = if relationship.active {
            "activated"
        } else {
            "deactivated"
        };
        let message = format!("Funder pool '{}' {state}.", relationship.funder_pool.name);
        Self {
            relationship,
            message,
        }
    }
}

fn lender_and<T: std::str::FromStr>(
    path: &(String, String),
    second: FieldName,
) -> Result<(LenderId, T), Error> {
    Ok((parse_id(&path.0, LENDER_ID)?, parse_id(&path.1, second)?))
}

/// List a lender's wholesale funder and funder pool links.
#[utoipa::path(
    get,
    path = "/api/v1/admin/lenders/{lenderId}/funding",
    params(("lenderId" = String, Path, format = Uuid, description = "Lender identifier")),
    responses(
        (status = 200, description = "Funding relationships", body = LenderFundingRelationships),
        (status = 400, description = "Invalid request", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["funding"],
    operation_id = "listFundingRelationships"
)]
#[get("/lenders/{lender_id}/funding")]
pub async fn list_funding(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<LenderFundingRelationships>> {
    let lender_id: LenderId = parse_id(&path, LENDER_ID)?;
    let relationships = state.funding_query.list_relationships(lender_id).await?;
    Ok(web::Json(relationships))
}

/// Flip a wholesale funder link. Deactivation cascades to its pool links.
#[utoipa::path(
    post,
    path = "/api/v1/admin/lenders/{lenderId}/wholesale-funders/{wholesaleFunderId}/toggle",
    params(
        ("lenderId" = String, Path, format = Uuid, description = "Lender identifier"),
        ("wholesaleFunderId" = String, Path, format = Uuid, description = "Wholesale funder identifier")
    ),
    responses(
        (status = 200, description = "Link toggled", body = WholesaleFunderToggleResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Link not found", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["funding"],
    operation_id = "toggleWholesaleFunder"
)]
#[post("/lenders/{lender_id}/wholesale-funders/{wholesale_funder_id}/toggle")]
pub async fn toggle_wholesale_funder(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<WholesaleFunderToggleResponse>> {
    let (lender_id, wholesale_funder_id): (LenderId, WholesaleFunderId) =
        lender_and(&path, WHOLESALE_FUNDER_ID)?;
    let toggle = state
        .funding
        .toggle_wholesale_funder(lender_id, wholesale_funder_id)
        .await?;
    Ok(web::Json(toggle.into()))
}

/// Flip a funder pool link. Activation is refused while the parent is off.
#[utoipa::path(
    post,
    path = "/api/v1/admin/lenders/{lenderId}/funder-pools/{funderPoolId}/toggle",
    params(
        ("lenderId" = String, Path, format = Uuid, description = "Lender identifier"),
        ("funderPoolId" = String, Path, format = Uuid, description = "Funder pool identifier")
    ),
    responses(
        (status = 200, description = "Link toggled", body = FunderPoolToggleResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Link not found", body = Error),
        (status = 422, description = "Parent wholesale funder is inactive", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["funding"],
    operation_id = "toggleFunderPool"
)]
#[post("/lenders/{lender_id}/funder-pools/{funder_pool_id}/toggle")]
pub async fn toggle_funder_pool(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<FunderPoolToggleResponse>> {
    let (lender_id, funder_pool_id): (LenderId, FunderPoolId) =
        lender_and(&path, FUNDER_POOL_ID)?;
    let relationship = state
        .funding
        .toggle_funder_pool(lender_id, funder_pool_id)
        .await?;
    Ok(web::Json(relationship.into()))
}

/// Report whether a funder pool link could be activated right now.
#[utoipa::path(
    get,
    path = "/api/v1/admin/lenders/{lenderId}/funder-pools/{funderPoolId}/can-activate",
    params(
        ("lenderId" = String, Path, format = Uuid, description = "Lender identifier"),
        ("funderPoolId" = String, Path, format = Uuid, description = "Funder pool identifier")
    ),
    responses(
        (status = 200, description = "Activation check", body = ActivationCheck),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Link not found", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["funding"],
    operation_id = "canActivateFunderPool"
)]
#[get("/lenders/{lender_id}/funder-pools/{funder_pool_id}/can-activate")]
pub async fn can_activate_funder_pool(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<ActivationCheck>> {
    let (lender_id, funder_pool_id): (LenderId, FunderPoolId) =
        lender_and(&path, FUNDER_POOL_ID)?;
    let check = state
        .funding_query
        .can_activate_funder_pool(lender_id, funder_pool_id)
        .await?;
    Ok(web::Json(check))
}

#[cfg(test)]
#[path = "funding_tests.rs"]
mod tests;
