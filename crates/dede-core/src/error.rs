//! # Error Types — Workflow Error Hierarchy
//!
//! The engine-level error taxonomy. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - `InvalidTransition` and `NotFound` are client errors: the caller
//!   asked for something the workflow does not permit or that does not
//!   exist.
//! - `Persistence` is a server error: the record store failed. It is
//!   surfaced to the caller and never retried by the engine.
//! - Secondary side-effect failures (audit append, task creation,
//!   notification dispatch after the primary write) are *not* part of
//!   this taxonomy — they are logged and swallowed, because the status
//!   change is authoritative once persisted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::RequestId;

/// Top-level error type for workflow operations.
///
/// State names are carried as their canonical snake_case strings so this
/// crate stays at the leaf of the dependency DAG — the status enum itself
/// lives one layer up.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The requested transition is not a legal edge for the acting role,
    /// or the persisted status no longer matches the expected one.
    #[error("invalid transition {from} -> {to} for role {role}")]
    InvalidTransition {
        /// Status the caller believed the request was in.
        from: String,
        /// Attempted target status.
        to: String,
        /// Acting role, or "system" for automatic transitions.
        role: String,
    },

    /// No record exists for the given identifier.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The record family, e.g. "license_request" or "task_assignment".
        entity: &'static str,
        /// The identifier that missed.
        id: String,
    },

    /// The record store failed. Not retried by the engine.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl WorkflowError {
    /// Shorthand for a `NotFound` over any displayable id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// A per-item failure collected during a sweep pass.
///
/// Sweeps are loop-and-log: one failing item is recorded here and the
/// pass continues with the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepError {
    /// The request the failure relates to, when known.
    pub request_id: Option<RequestId>,
    /// Human-readable failure description.
    pub message: String,
}

impl SweepError {
    /// Record a failure tied to a specific request.
    pub fn for_request(request_id: RequestId, message: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SweepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.request_id {
            Some(id) => write!(f, "{id}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_names_both_states() {
        let err = WorkflowError::InvalidTransition {
            from: "draft".into(),
            to: "approved".into(),
            role: "user".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("draft"));
        assert!(msg.contains("approved"));
        assert!(msg.contains("user"));
    }

    #[test]
    fn not_found_shorthand() {
        let id = RequestId::new();
        let err = WorkflowError::not_found("license_request", id);
        assert!(err.to_string().contains("license_request"));
    }
}
