use gymdesk_auth::{Permission, Principal, Role};
use gymdesk_core::{BranchId, UserId};

/// Branch scope for a request.
///
/// Derived once from the token and passed explicitly to every ledger call.
/// `None` means the caller is company-wide.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BranchContext {
    branch_id: Option<BranchId>,
}

impl BranchContext {
    pub fn new(branch_id: Option<BranchId>) -> Self {
        Self { branch_id }
    }

    pub fn branch_id(&self) -> Option<BranchId> {
        self.branch_id
    }
}

/// Principal context for a request (authenticated user, roles and granted permissions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.principal.roles
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.principal.permissions
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
