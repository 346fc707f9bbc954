//! # Flow Log — Append-Only Audit Trail
//!
//! Every status change writes exactly one entry here. Entries are never
//! updated or deleted; dashboards read the trail for history, and the
//! overdue sweep consults it before forcing an automatic transition so
//! a request is never driven to `overdue` twice.

use std::sync::Arc;

use dede_core::{Actor, LicenseType, RequestId, Timestamp};
use dede_workflow::RequestStatus;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One recorded status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowLogEntry {
    /// The request whose status changed.
    pub request_id: RequestId,
    /// Variant family of the request.
    pub license_type: LicenseType,
    /// Status before the change. `None` marks the first event of a
    /// request's history.
    pub previous_status: Option<RequestStatus>,
    /// Status after the change.
    pub new_status: RequestStatus,
    /// Who drove the change — a staff actor or the system.
    pub changed_by: Actor,
    /// Transition comment or reason.
    pub reason: String,
    /// When the entry was written.
    pub created_at: Timestamp,
}

/// The append-only flow log.
///
/// Cloneable handle over a shared entry list. The public surface has no
/// update or delete — append and read only.
#[derive(Debug, Clone, Default)]
pub struct FlowLog {
    entries: Arc<RwLock<Vec<FlowLogEntry>>>,
}

impl FlowLog {
    /// Create an empty flow log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry.
    pub fn append(&self, entry: FlowLogEntry) {
        tracing::debug!(
            request_id = %entry.request_id,
            from = ?entry.previous_status,
            to = %entry.new_status,
            actor = %entry.changed_by,
            "flow log append"
        );
        self.entries.write().push(entry);
    }

    /// All entries for one request, in append order.
    pub fn entries_for(&self, request_id: RequestId) -> Vec<FlowLogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect()
    }

    /// Whether the request already has an entry landing on `status`.
    ///
    /// The sweep's idempotency check: an `overdue` entry means the
    /// automatic transition already ran.
    pub fn has_entry_to(&self, request_id: RequestId, status: RequestStatus) -> bool {
        self.entries
            .read()
            .iter()
            .any(|e| e.request_id == request_id && e.new_status == status)
    }

    /// Total number of entries across all requests.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(request_id: RequestId, to: RequestStatus) -> FlowLogEntry {
        FlowLogEntry {
            request_id,
            license_type: LicenseType::New,
            previous_status: None,
            new_status: to,
            changed_by: Actor::System,
            reason: "test".into(),
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn entries_are_scoped_per_request() {
        let log = FlowLog::new();
        let a = RequestId::new();
        let b = RequestId::new();
        log.append(entry(a, RequestStatus::NewRequest));
        log.append(entry(b, RequestStatus::Accepted));
        log.append(entry(a, RequestStatus::Accepted));

        assert_eq!(log.entries_for(a).len(), 2);
        assert_eq!(log.entries_for(b).len(), 1);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn has_entry_to_finds_only_landed_statuses() {
        let log = FlowLog::new();
        let id = RequestId::new();
        log.append(entry(id, RequestStatus::Overdue));

        assert!(log.has_entry_to(id, RequestStatus::Overdue));
        assert!(!log.has_entry_to(id, RequestStatus::Approved));
        assert!(!log.has_entry_to(RequestId::new(), RequestStatus::Overdue));
    }
}
