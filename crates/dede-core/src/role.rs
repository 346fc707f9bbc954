//! # Role Primitives
//!
//! The closed set of roles that participate in the licensing approval
//! process. Roles gate workflow transitions — every non-automatic edge
//! in the transition table names exactly one required role.

use serde::{Deserialize, Serialize};

/// A role held by a user of the licensing system.
///
/// The set is closed: the transition table, notification fan-out, and
/// authorization checks all match exhaustively over these six values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// An applicant — owns license requests and submits them.
    User,
    /// Front-office administrator — accepts, rejects, and forwards
    /// incoming requests.
    Admin,
    /// DEDE section head — assigns inspectors and signs final approvals.
    DedeHead,
    /// DEDE staff member — performs site inspections and document work.
    DedeStaff,
    /// DEDE consultant — reviews audit reports.
    DedeConsult,
    /// External auditor — read-only access, holds no transition edges.
    Auditor,
}

impl Role {
    /// All roles, in a fixed order. Useful for exhaustive table tests
    /// and for role-directory seeding.
    pub const ALL: [Role; 6] = [
        Role::User,
        Role::Admin,
        Role::DedeHead,
        Role::DedeStaff,
        Role::DedeConsult,
        Role::Auditor,
    ];

    /// Return the canonical snake_case string for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::DedeHead => "dede_head",
            Self::DedeStaff => "dede_staff",
            Self::DedeConsult => "dede_consult",
            Self::Auditor => "auditor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
