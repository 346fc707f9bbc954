//! # Actor — Who Caused a Transition
//!
//! A tagged union replacing the "nullable changed_by" convention: an
//! automatic transition driven by the overdue sweep is `Actor::System`,
//! a first-class value rather than a null user id.

use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// The initiator of a workflow action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Actor {
    /// A human user, identified by account id.
    Staff(UserId),
    /// The system itself (overdue sweep, scheduled delivery).
    System,
}

impl Actor {
    /// The user id, if this is a human actor.
    ///
    /// The legacy nullable view of `changed_by`, where `None` means
    /// "automatic".
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Staff(id) => Some(*id),
            Self::System => None,
        }
    }

    /// Whether this is the system actor.
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Staff(id) => write!(f, "{id}"),
            Self::System => f.write_str("system"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_actor_has_no_user_id() {
        assert_eq!(Actor::System.user_id(), None);
        assert!(Actor::System.is_system());
    }

    #[test]
    fn staff_actor_exposes_user_id() {
        let id = UserId::new();
        assert_eq!(Actor::Staff(id).user_id(), Some(id));
        assert!(!Actor::Staff(id).is_system());
    }
}
