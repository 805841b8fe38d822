use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gymdesk_auth::AuthzError;
use gymdesk_core::DomainError;
use gymdesk_infra::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Domain(e) => domain_error_to_response(e),
        LedgerError::Store(msg) => {
            tracing::error!(error = %msg, "ledger store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        DomainError::InsufficientStock {
            item_id,
            available,
            requested,
        } => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": err.to_string(),
                "itemId": item_id.to_string(),
                "available": available,
                "requested": requested,
            })),
        )
            .into_response(),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized"),
    }
}

/// Malformed or mistyped bodies are client input errors; a missing JSON
/// content type keeps its 415.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    match rejection {
        JsonRejection::MissingJsonContentType(e) => {
            json_error(StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type", e.body_text())
        }
        other => json_error(StatusCode::BAD_REQUEST, "validation_error", other.body_text()),
    }
}

pub fn forbidden(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
