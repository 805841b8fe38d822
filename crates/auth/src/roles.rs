use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier used for RBAC.
///
/// Roles are opaque strings carried in the token; [`permissions_for_roles`] is
/// the static policy that turns them into permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

const MANAGER: &[&str] = &[
    "inventory.items.create",
    "inventory.items.read",
    "inventory.items.delete",
    "inventory.transactions.create",
    "inventory.transactions.read",
    "sales.create",
    "sales.read",
];

const CASHIER: &[&str] = &["inventory.items.read", "sales.create", "sales.read"];

/// Role → permission policy.
///
/// `admin` grants the wildcard; unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut granted: Vec<Permission> = Vec::new();
    for role in roles {
        let names: &[&'static str] = match role.as_str() {
            "admin" => &["*"],
            "manager" => MANAGER,
            "cashier" => CASHIER,
            _ => &[],
        };
        for name in names {
            let perm = Permission::new(*name);
            if !granted.contains(&perm) {
                granted.push(perm);
            }
        }
    }
    granted
}
