//! API-side authorization guard.
//!
//! Handlers call this before touching the ledger, so domain and infra crates
//! stay auth-agnostic.

use gymdesk_auth::{AuthzError, Permission, authorize};

use crate::context::PrincipalContext;

/// Require every listed permission for the current caller.
pub fn authorize_request(
    principal: &PrincipalContext,
    required: &[Permission],
) -> Result<(), AuthzError> {
    for perm in required {
        authorize(principal.principal(), perm)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gymdesk_auth::{JwtClaims, Principal, Role};
    use gymdesk_core::UserId;

    fn principal(role: &'static str) -> PrincipalContext {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: UserId::new(),
            branch_id: None,
            roles: vec![Role::new(role)],
            issued_at: now,
            expires_at: now,
        };
        PrincipalContext::new(Principal::from_claims(&claims))
    }

    #[test]
    fn cashier_may_sell_but_not_adjust() {
        let cashier = principal("cashier");
        assert!(authorize_request(&cashier, &[Permission::new("sales.create")]).is_ok());
        assert!(
            authorize_request(&cashier, &[Permission::new("inventory.transactions.create")]).is_err()
        );
    }

    #[test]
    fn admin_passes_everything() {
        let admin = principal("admin");
        assert!(authorize_request(
            &admin,
            &[
                Permission::new("inventory.items.delete"),
                Permission::new("sales.read"),
            ]
        )
        .is_ok());
    }

    #[test]
    fn unknown_role_gets_nothing() {
        let guest = principal("guest");
        assert!(guest.permissions().is_empty());
        assert!(authorize_request(&guest, &[Permission::new("inventory.items.read")]).is_err());
    }
}
