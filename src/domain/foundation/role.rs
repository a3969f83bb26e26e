//! Platform roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to an authenticated account.
///
/// Counselors additionally join the shared counselor broadcast group on the
/// booked channel so they receive new-booking notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    Counselor,
    InstitutionAdmin,
    PlatformAdmin,
}

impl Role {
    /// Whether this role receives counselor broadcasts.
    pub fn is_counselor(&self) -> bool {
        matches!(self, Role::Counselor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Student => "Student",
            Role::Counselor => "Counselor",
            Role::InstitutionAdmin => "InstitutionAdmin",
            Role::PlatformAdmin => "PlatformAdmin",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_counselors_join_the_counselor_group() {
        assert!(Role::Counselor.is_counselor());
        assert!(!Role::Student.is_counselor());
        assert!(!Role::InstitutionAdmin.is_counselor());
        assert!(!Role::PlatformAdmin.is_counselor());
    }
}
