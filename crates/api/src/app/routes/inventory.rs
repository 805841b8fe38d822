use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::routes::common::{parse_item_id, require};
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{BranchContext, PrincipalContext};

pub fn router() -> Router {
    Router::new()
        .route("/transactions", post(record_transaction))
        .route("/bulk-transactions", post(record_bulk_transaction))
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).delete(remove_item))
        .route("/items/:id/transactions", get(list_transactions))
        .route("/items/:id/reconciliation", get(reconcile))
}

pub async fn record_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(branch): Extension<BranchContext>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::RecordTransactionRequest>,
) -> axum::response::Response {
    if let Err(resp) = require(&principal, "inventory.transactions.create") {
        return resp;
    }

    let cmd = match body.into_command(principal.user_id(), branch.branch_id()) {
        Ok(cmd) => cmd,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.record_transaction(cmd).await {
        Ok(t) => (StatusCode::CREATED, Json(dto::TransactionResponse::from(t))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn record_bulk_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(branch): Extension<BranchContext>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::BulkTransactionRequest>,
) -> axum::response::Response {
    if let Err(resp) = require(&principal, "inventory.transactions.create") {
        return resp;
    }

    let cmd = match body.into_command(principal.user_id(), branch.branch_id()) {
        Ok(cmd) => cmd,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.record_bulk_transaction(cmd).await {
        Ok(written) => (
            StatusCode::CREATED,
            Json(dto::BulkTransactionResponse {
                success: true,
                transactions: written.into_iter().map(Into::into).collect(),
            }),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(branch): Extension<BranchContext>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::CreateItemRequest>,
) -> axum::response::Response {
    if let Err(resp) = require(&principal, "inventory.items.create") {
        return resp;
    }

    let new_item = match body.into_new_item() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .ledger
        .add_item(new_item, Some(principal.user_id()), branch.branch_id())
        .await
    {
        Ok(item) => (StatusCode::CREATED, Json(dto::ItemResponse::from(item))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(branch): Extension<BranchContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require(&principal, "inventory.items.read") {
        return resp;
    }

    match services.ledger.list_items(branch.branch_id()).await {
        Ok(items) => {
            let body: Vec<dto::ItemResponse> = items.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(branch): Extension<BranchContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require(&principal, "inventory.items.read") {
        return resp;
    }
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger.get_item(item_id, branch.branch_id()).await {
        Ok(item) => (StatusCode::OK, Json(dto::ItemResponse::from(item))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(branch): Extension<BranchContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require(&principal, "inventory.items.delete") {
        return resp;
    }
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger.remove_item(item_id, branch.branch_id()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(branch): Extension<BranchContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require(&principal, "inventory.transactions.read") {
        return resp;
    }
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger.list_transactions(item_id, branch.branch_id()).await {
        Ok(history) => {
            let body: Vec<dto::TransactionResponse> = history.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn reconcile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(branch): Extension<BranchContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require(&principal, "inventory.items.read") {
        return resp;
    }
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger.reconcile(item_id, branch.branch_id()).await {
        Ok(report) => {
            (StatusCode::OK, Json(dto::ReconciliationResponse::from(report))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}
