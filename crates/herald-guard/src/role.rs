//! Authorization tiers and their resolution.

use crate::identity::OwnerVerifier;
use std::fmt;
use std::sync::Arc;

/// Authorization tier. Ordered `User < Operator < Owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    User,
    Operator,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Operator => "operator",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps an actor to a role. Roles are never stored; every call recomputes
/// from the owner record and the current admin set.
#[derive(Clone)]
pub struct RoleResolver {
    verifier: Arc<OwnerVerifier>,
}

impl RoleResolver {
    pub fn new(verifier: Arc<OwnerVerifier>) -> Self {
        Self { verifier }
    }

    /// Owner wins over admin-set membership; admins are operators; everyone
    /// else is a user.
    pub fn resolve(&self, actor_id: &str, admins: &[String]) -> Role {
        if self.verifier.is_owner(actor_id) {
            return Role::Owner;
        }
        let actor = actor_id.trim();
        if admins.iter().any(|admin| admin.trim() == actor) {
            Role::Operator
        } else {
            Role::User
        }
    }

    pub fn verifier(&self) -> &Arc<OwnerVerifier> {
        &self.verifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const OWNER: &str = "61578706761898";

    fn resolver(tag: &str) -> (RoleResolver, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "__herald_role_test_{}_{tag}__",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("owner.lock");
        let verifier = OwnerVerifier::open(OWNER, "secret", &path).unwrap();
        (RoleResolver::new(Arc::new(verifier)), path)
    }

    #[test]
    fn test_role_order() {
        assert!(Role::User < Role::Operator);
        assert!(Role::Operator < Role::Owner);
        assert_eq!(Role::Operator.to_string(), "operator");
    }

    #[test]
    fn test_strangers_are_users() {
        let (resolver, _) = resolver("strangers");
        let admins = vec!["100000000001".to_string()];
        for actor in ["100000000002", "555555", "61578706761899", ""] {
            assert_eq!(resolver.resolve(actor, &admins), Role::User, "{actor}");
        }
    }

    #[test]
    fn test_admin_membership_is_normalized() {
        let (resolver, _) = resolver("normalized");
        let admins = vec![" 100000000001 ".to_string()];
        assert_eq!(resolver.resolve("100000000001", &admins), Role::Operator);
    }

    #[test]
    fn test_owner_wins_over_admin_set() {
        let (resolver, _) = resolver("owner_wins");
        let admins = vec![OWNER.to_string()];
        assert_eq!(resolver.resolve(OWNER, &admins), Role::Owner);
        assert_eq!(resolver.resolve(OWNER, &[]), Role::Owner);
    }

    #[test]
    fn test_admin_keeps_operator_when_owner_record_tampered() {
        let (resolver, path) = resolver("tampered");
        std::fs::write(&path, r#"{"owner_id":"x","integrity_hash":"00","created_at":"2024-01-01T00:00:00Z"}"#)
            .unwrap();
        let admins = vec![OWNER.to_string(), "100000000001".to_string()];
        // Owner spoof fails the record check but admin membership still holds.
        assert_eq!(resolver.resolve(OWNER, &admins), Role::Operator);
        assert_eq!(resolver.resolve("100000000001", &admins), Role::Operator);
    }
}
