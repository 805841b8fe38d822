use axum::response::Response;

use gymdesk_auth::Permission;
use gymdesk_core::ItemId;

use crate::app::errors;
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

/// Guard a handler with a single permission; the error is a ready 403 response.
pub fn require(principal: &PrincipalContext, permission: &'static str) -> Result<(), Response> {
    authorize_request(principal, &[Permission::new(permission)]).map_err(errors::forbidden)
}

pub fn parse_item_id(raw: &str) -> Result<ItemId, Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}
