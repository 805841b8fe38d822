use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A capability checked by the HTTP handlers before they touch the ledger.
///
/// gymdesk uses dotted names per resource and action:
/// `inventory.items.{create,read,delete}`, `inventory.transactions.{create,read}`
/// and `sales.{create,read}`. `"*"` grants everything and is only handed out
/// to `admin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
