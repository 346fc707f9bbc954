//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all identifiers in the licensing stack. These
//! prevent accidental identifier confusion — you cannot pass a `TaskId`
//! where a `RequestId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

id_newtype!(
    /// Unique identifier for a license request (any of the four variants).
    RequestId,
    "request"
);

id_newtype!(
    /// Unique identifier for a user account (applicant or DEDE staff).
    UserId,
    "user"
);

id_newtype!(
    /// Unique identifier for a task assignment.
    TaskId,
    "task"
);

id_newtype!(
    /// Unique identifier for a deadline reminder.
    ReminderId,
    "reminder"
);

id_newtype!(
    /// Unique identifier for a notification record.
    NotificationId,
    "notification"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_carries_namespace_prefix() {
        let id = TaskId::new();
        assert!(id.to_string().starts_with("task:"));
    }

    #[test]
    fn serde_round_trip_is_transparent_uuid() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
