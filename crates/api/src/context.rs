use masjedi_auth::Principal;
use masjedi_core::UserRole;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware; every protected handler can extract it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Identity-provider subject (`sub`).
    pub fn subject(&self) -> &str {
        &self.principal.subject
    }

    /// `preferred_username`, which links the token to a local user row.
    pub fn username(&self) -> Option<&str> {
        self.principal.username.as_deref()
    }

    pub fn roles(&self) -> &[UserRole] {
        &self.principal.roles
    }

    pub fn is_admin(&self) -> bool {
        self.principal.is_admin()
    }

    pub fn is_staff(&self) -> bool {
        self.principal.is_staff()
    }
}
