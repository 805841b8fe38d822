use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use gymdesk_core::SaleId;

use crate::app::routes::common::require;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{BranchContext, PrincipalContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(record_sale))
        .route("/:id", get(get_sale))
}

pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(branch): Extension<BranchContext>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::RecordSaleRequest>,
) -> axum::response::Response {
    if let Err(resp) = require(&principal, "sales.create") {
        return resp;
    }

    let draft = match body.into_draft() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .ledger
        .record_sale(draft, Some(principal.user_id()), branch.branch_id())
        .await
    {
        Ok(sale) => (
            StatusCode::CREATED,
            Json(dto::SaleCreatedResponse {
                id: sale.id,
                message: "sale recorded",
            }),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(branch): Extension<BranchContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require(&principal, "sales.read") {
        return resp;
    }
    let sale_id: SaleId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.get_sale(sale_id, branch.branch_id()).await {
        Ok(sale) => (StatusCode::OK, Json(dto::SaleResponse::from(sale))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
