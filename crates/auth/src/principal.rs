use gymdesk_core::{BranchId, UserId};

use crate::{JwtClaims, Permission, Role, permissions_for_roles};

/// A fully resolved caller for authorization decisions.
///
/// `branch_id` is the scope threaded into every ledger call; `None` means the
/// caller is company-wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub branch_id: Option<BranchId>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            branch_id: claims.branch_id,
            roles: claims.roles.clone(),
            permissions: permissions_for_roles(&claims.roles),
        }
    }
}
