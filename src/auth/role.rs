use serde::{Deserialize, Serialize};

/// Privilege tier of an account.
///
/// The discriminants are what gets stored and put into tokens. A *lower*
/// value means *more* privilege. Roles are not ordered; compare them with
/// [`Role::at_least`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum Role {
    Root = 1,
    Admin = 2,
    User = 3,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role value {0}")]
pub struct RoleError(pub i16);

impl Role {
    /// True when `self` has the privileges of `other` or more.
    pub fn at_least(self, other: Role) -> bool {
        (self as i16) <= (other as i16)
    }

    /// Root and Admin.
    pub fn is_privileged(self) -> bool {
        self.at_least(Role::Admin)
    }
}

impl TryFrom<i16> for Role {
    type Error = RoleError;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Role::Root),
            2 => Ok(Role::Admin),
            3 => Ok(Role::User),
            other => Err(RoleError(other)),
        }
    }
}

impl From<Role> for i16 {
    fn from(r: Role) -> Self {
        r as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_decreases_as_value_grows() {
        assert!(Role::Root.at_least(Role::Admin));
        assert!(Role::Admin.at_least(Role::Admin));
        assert!(!Role::User.at_least(Role::Admin));
        assert!(Role::User.at_least(Role::User));
        assert!(!Role::Admin.at_least(Role::Root));

        assert!(Role::Root.is_privileged());
        assert!(Role::Admin.is_privileged());
        assert!(!Role::User.is_privileged());
    }

    #[test]
    fn at_least_follows_tiers_not_raw_values() {
        let tiers = [Role::Root, Role::Admin, Role::User];
        for (i, a) in tiers.iter().enumerate() {
            for (j, b) in tiers.iter().enumerate() {
                assert_eq!(a.at_least(*b), i <= j, "{a:?} vs {b:?}");
            }
        }
        assert!(i16::from(Role::User) > i16::from(Role::Root));
    }

    #[test]
    fn serializes_as_number() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "2");
        let r: Role = serde_json::from_str("3").unwrap();
        assert_eq!(r, Role::User);
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(serde_json::from_str::<Role>("0").is_err());
        assert!(serde_json::from_str::<Role>("4").is_err());
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
        assert!(Role::try_from(7).is_err());
    }
}
