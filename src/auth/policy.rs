//! Role-based authorization decisions.
//!
//! [`authorize`] is pure: it looks only at the caller's token claims and the
//! target id. When the answer depends on whether the target has banned the
//! caller it returns [`Decision::RequiresBanCheck`] and leaves the store
//! lookup to the caller.

use super::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
    List,
    AddFriend,
    /// Account creation with an explicit role through the admin endpoint.
    CreateWithRole(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
    /// Allowed only if the target has not banned the caller.
    RequiresBanCheck,
}

#[cfg(test)]
impl Decision {
    pub fn is_allow(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decide whether `caller_id` holding `role` may perform `action` on
/// `target_id`. Anything not explicitly allowed is denied.
pub fn authorize(role: Role, caller_id: i64, action: Action, target_id: i64) -> Decision {
    let own = caller_id == target_id;
    match action {
        Action::Read | Action::Delete if role.is_privileged() => Decision::Allow,
        Action::Read if own => Decision::Allow,
        Action::Read => Decision::RequiresBanCheck,
        Action::Delete if own => Decision::Allow,
        Action::Delete => Decision::Deny("not your record"),
        Action::Update if role == Role::Root => Decision::Allow,
        Action::Update if role == Role::User && own => Decision::Allow,
        Action::Update => Decision::Deny("insufficient rights to update this record"),
        Action::List if role.is_privileged() => Decision::Allow,
        Action::List => Decision::Deny("insufficient rights"),
        Action::AddFriend if own => Decision::Deny("cannot add yourself as a friend"),
        Action::AddFriend => Decision::RequiresBanCheck,
        Action::CreateWithRole(wanted) if role.is_privileged() && role.at_least(wanted) => {
            Decision::Allow
        }
        Action::CreateWithRole(_) => Decision::Deny("insufficient rights to assign this role"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Role; 3] = [Role::Root, Role::Admin, Role::User];

    #[test]
    fn privileged_read_delete_list_anything() {
        for role in [Role::Root, Role::Admin] {
            for target in [1, 2, 99] {
                assert_eq!(authorize(role, 1, Action::Read, target), Decision::Allow);
                assert_eq!(authorize(role, 1, Action::Delete, target), Decision::Allow);
                assert_eq!(authorize(role, 1, Action::List, target), Decision::Allow);
            }
        }
    }

    #[test]
    fn user_deletes_only_self() {
        assert_eq!(authorize(Role::User, 5, Action::Delete, 5), Decision::Allow);
        assert_eq!(
            authorize(Role::User, 5, Action::Delete, 6),
            Decision::Deny("not your record")
        );
    }

    #[test]
    fn user_reading_someone_else_needs_ban_check() {
        assert_eq!(authorize(Role::User, 5, Action::Read, 5), Decision::Allow);
        assert_eq!(
            authorize(Role::User, 5, Action::Read, 6),
            Decision::RequiresBanCheck
        );
    }

    #[test]
    fn update_rules() {
        assert!(authorize(Role::Root, 1, Action::Update, 9).is_allow());
        assert!(authorize(Role::Root, 1, Action::Update, 1).is_allow());
        assert!(authorize(Role::User, 9, Action::Update, 9).is_allow());
        assert!(!authorize(Role::User, 9, Action::Update, 8).is_allow());
        assert!(!authorize(Role::Admin, 2, Action::Update, 9).is_allow());
        assert!(!authorize(Role::Admin, 2, Action::Update, 2).is_allow());
    }

    #[test]
    fn list_is_privileged_only() {
        assert!(!authorize(Role::User, 3, Action::List, 3).is_allow());
    }

    #[test]
    fn add_friend_always_checks_bans() {
        for role in ROLES {
            assert_eq!(
                authorize(role, 1, Action::AddFriend, 2),
                Decision::RequiresBanCheck
            );
            assert!(matches!(
                authorize(role, 1, Action::AddFriend, 1),
                Decision::Deny(_)
            ));
        }
    }

    #[test]
    fn role_assignment_never_escalates() {
        for wanted in ROLES {
            assert!(authorize(Role::Root, 1, Action::CreateWithRole(wanted), 0).is_allow());
            assert!(!authorize(Role::User, 1, Action::CreateWithRole(wanted), 0).is_allow());
        }
        assert!(authorize(Role::Admin, 2, Action::CreateWithRole(Role::Admin), 0).is_allow());
        assert!(authorize(Role::Admin, 2, Action::CreateWithRole(Role::User), 0).is_allow());
        assert!(!authorize(Role::Admin, 2, Action::CreateWithRole(Role::Root), 0).is_allow());
    }
}
