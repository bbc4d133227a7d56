use masjedi_core::UserRole;

use crate::JwtClaims;

/// The authenticated caller as seen by authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub username: Option<String>,
    pub roles: Vec<UserRole>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, username: Option<String>, roles: Vec<UserRole>) -> Self {
        Self {
            subject: subject.into(),
            username,
            roles,
        }
    }

    /// Build from verified claims; realm roles unknown to the application are dropped.
    pub fn from_claims(claims: &JwtClaims) -> Self {
        let mut roles: Vec<UserRole> = claims
            .realm_access
            .roles
            .iter()
            .filter_map(|r| r.user_role())
            .collect();
        roles.sort_by_key(|r| r.as_str());
        roles.dedup();
        Self::new(claims.sub.clone(), claims.preferred_username.clone(), roles)
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    /// ADMIN or TEACHER.
    pub fn is_staff(&self) -> bool {
        self.has_any_role(&[UserRole::Admin, UserRole::Teacher])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RealmAccess, Role};

    #[test]
    fn from_claims_keeps_only_application_roles() {
        let claims = JwtClaims {
            sub: "kc-1".into(),
            preferred_username: Some("t1".into()),
            realm_access: RealmAccess {
                roles: vec![Role::new("teacher"), Role::new("offline_access"), Role::new("TEACHER")],
            },
            iat: 0,
            exp: 1,
            iss: None,
        };
        let principal = Principal::from_claims(&claims);
        assert_eq!(principal.roles, vec![UserRole::Teacher]);
        assert!(principal.is_staff());
        assert!(!principal.is_admin());
    }
}
