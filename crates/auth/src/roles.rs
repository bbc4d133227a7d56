use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use masjedi_core::UserRole;

/// A realm role as issued by the identity provider.
///
/// Kept as an opaque string so tokens carrying roles this service does not
/// know (e.g. `offline_access`) still decode.
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

    /// The application role this realm role maps to, matched case-insensitively.
    pub fn user_role(&self) -> Option<UserRole> {
        self.0.parse().ok()
    }
}

impl From<UserRole> for Role {
    fn from(role: UserRole) -> Self {
        Self::new(role.as_str())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
