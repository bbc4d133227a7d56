use thiserror::Error;

use masjedi_core::UserRole;

use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: requires one of roles [{0}]")]
    MissingRole(String),

    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl AuthzError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

/// Allow the principal through if it holds at least one of `allowed`.
///
/// Pure policy check: no IO, no panics.
pub fn require_any_role(principal: &Principal, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if principal.has_any_role(allowed) {
        return Ok(());
    }
    let names: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
    Err(AuthzError::MissingRole(names.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn principal(roles: Vec<UserRole>) -> Principal {
        Principal::new("kc", Some("u".into()), roles)
    }

    #[test]
    fn admin_passes_admin_guard() {
        assert!(require_any_role(&principal(vec![UserRole::Admin]), &[UserRole::Admin]).is_ok());
    }

    #[test]
    fn student_is_denied_staff_guard() {
        let err = require_any_role(
            &principal(vec![UserRole::Student]),
            &[UserRole::Admin, UserRole::Teacher],
        )
        .unwrap_err();
        assert_eq!(err, AuthzError::MissingRole("ADMIN, TEACHER".into()));
    }

    #[test]
    fn principal_without_roles_is_denied() {
        assert!(require_any_role(&principal(vec![]), &UserRole::ALL).is_err());
    }

    proptest! {
        #[test]
        fn guard_agrees_with_membership(held in proptest::sample::subsequence(UserRole::ALL.to_vec(), 0..=3),
                                        wanted in proptest::sample::subsequence(UserRole::ALL.to_vec(), 1..=3)) {
            let p = principal(held.clone());
            let expected = wanted.iter().any(|r| held.contains(r));
            prop_assert_eq!(require_any_role(&p, &wanted).is_ok(), expected);
        }
    }
}
