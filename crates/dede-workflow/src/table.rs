//! # Transition Table
//!
//! The immutable graph of legal status transitions. Each edge names the
//! role allowed to drive it; edges with no role are reserved for the
//! overdue sweep. Per-status metadata (progress percentage, default
//! deadline, description) lives here too.
//!
//! The table is pure data plus lookup functions. It is constructed from
//! a `'static` edge list, so a [`TransitionTable`] is `Copy` and can be
//! handed to every service without synchronization.

use dede_core::{Role, Timestamp};
use serde::{Deserialize, Serialize};

use crate::status::RequestStatus;

// ─── Deadline Types ─────────────────────────────────────────────────

/// Which tracked deadline a reminder watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineType {
    /// Site-inspection appointment must take place by the deadline.
    Appointment,
    /// Revised documents must be returned by the deadline.
    DocumentReview,
    /// An inspection task must be completed by the deadline.
    Inspection,
}

impl DeadlineType {
    /// Return the canonical snake_case string for this deadline type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Appointment => "appointment",
            Self::DocumentReview => "document_review",
            Self::Inspection => "inspection",
        }
    }
}

impl std::fmt::Display for DeadlineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Transition Edges ───────────────────────────────────────────────

/// One legal move in the approval graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEdge {
    /// Status the request must currently be in.
    pub from: RequestStatus,
    /// Status the request moves to.
    pub to: RequestStatus,
    /// Role allowed to drive this edge. `None` marks an automatic edge,
    /// usable only by the sweep.
    pub required_role: Option<Role>,
    /// Short action name, e.g. `"assign_inspector"`.
    pub action: &'static str,
    /// Human-readable description for dashboards.
    pub description: &'static str,
}

impl TransitionEdge {
    /// Whether this edge requires no actor (sweep-only).
    pub fn is_auto(&self) -> bool {
        self.required_role.is_none()
    }

    /// Whether the given role may drive this edge.
    ///
    /// Automatic edges match any caller — they carry no role gate of
    /// their own; the sweep is the only code path that uses them.
    pub fn permits(&self, role: Role) -> bool {
        match self.required_role {
            None => true,
            Some(required) => required == role,
        }
    }
}

/// The fixed edge list of the DEDE approval process.
///
/// One graph for all four license variants; the variant tag rides on the
/// request record, not on the edges.
const EDGES: &[TransitionEdge] = &[
    edge(
        RequestStatus::Draft,
        RequestStatus::NewRequest,
        Some(Role::User),
        "submit",
        "Applicant submits the request for review",
    ),
    edge(
        RequestStatus::NewRequest,
        RequestStatus::Accepted,
        Some(Role::Admin),
        "accept",
        "Front office accepts the request",
    ),
    edge(
        RequestStatus::NewRequest,
        RequestStatus::Rejected,
        Some(Role::Admin),
        "reject",
        "Front office rejects the request",
    ),
    edge(
        RequestStatus::NewRequest,
        RequestStatus::Returned,
        Some(Role::Admin),
        "return_for_revision",
        "Front office returns the request for revision",
    ),
    edge(
        RequestStatus::Returned,
        RequestStatus::NewRequest,
        Some(Role::User),
        "resubmit",
        "Applicant resubmits a returned request",
    ),
    edge(
        RequestStatus::Rejected,
        RequestStatus::NewRequest,
        Some(Role::User),
        "resubmit",
        "Applicant resubmits a rejected request",
    ),
    edge(
        RequestStatus::Accepted,
        RequestStatus::Forwarded,
        Some(Role::Admin),
        "forward",
        "Front office forwards the request to the DEDE section head",
    ),
    edge(
        RequestStatus::Forwarded,
        RequestStatus::Assigned,
        Some(Role::DedeHead),
        "assign_inspector",
        "Section head assigns an inspector",
    ),
    edge(
        RequestStatus::Assigned,
        RequestStatus::Appointment,
        Some(Role::DedeStaff),
        "schedule_appointment",
        "Inspector schedules the site-inspection appointment",
    ),
    edge(
        RequestStatus::Appointment,
        RequestStatus::Inspecting,
        Some(Role::DedeStaff),
        "start_inspection",
        "Inspector starts the site inspection",
    ),
    edge(
        RequestStatus::Inspecting,
        RequestStatus::InspectionDone,
        Some(Role::DedeStaff),
        "finish_inspection",
        "Inspector finishes the site inspection",
    ),
    edge(
        RequestStatus::InspectionDone,
        RequestStatus::DocumentEdit,
        Some(Role::DedeConsult),
        "request_revision",
        "Consultant returns the audit report for document revision",
    ),
    edge(
        RequestStatus::InspectionDone,
        RequestStatus::ReportApproved,
        Some(Role::DedeConsult),
        "approve_report",
        "Consultant approves the audit report",
    ),
    edge(
        RequestStatus::DocumentEdit,
        RequestStatus::ReportApproved,
        Some(Role::DedeConsult),
        "approve_report",
        "Consultant approves the revised audit report",
    ),
    edge(
        RequestStatus::ReportApproved,
        RequestStatus::Approved,
        Some(Role::DedeHead),
        "final_approve",
        "Section head grants the license",
    ),
    edge(
        RequestStatus::ReportApproved,
        RequestStatus::RejectedFinal,
        Some(Role::DedeHead),
        "final_reject",
        "Section head denies the license",
    ),
    // Automatic edges, driven only by the overdue sweep.
    edge(
        RequestStatus::Assigned,
        RequestStatus::Overdue,
        None,
        "auto_overdue",
        "Deadline elapsed while awaiting an appointment",
    ),
    edge(
        RequestStatus::Appointment,
        RequestStatus::Overdue,
        None,
        "auto_overdue",
        "Appointment deadline elapsed",
    ),
    edge(
        RequestStatus::Inspecting,
        RequestStatus::Overdue,
        None,
        "auto_overdue",
        "Inspection deadline elapsed",
    ),
    edge(
        RequestStatus::InspectionDone,
        RequestStatus::Overdue,
        None,
        "auto_overdue",
        "Report-review deadline elapsed",
    ),
    edge(
        RequestStatus::DocumentEdit,
        RequestStatus::Overdue,
        None,
        "auto_overdue",
        "Document-revision deadline elapsed",
    ),
];

const fn edge(
    from: RequestStatus,
    to: RequestStatus,
    required_role: Option<Role>,
    action: &'static str,
    description: &'static str,
) -> TransitionEdge {
    TransitionEdge {
        from,
        to,
        required_role,
        action,
        description,
    }
}

// ─── Transition Table ───────────────────────────────────────────────

/// Handle over the immutable transition graph.
///
/// Zero-sized in practice — it wraps a `'static` edge slice — so it is
/// `Copy` and injected into services by value. There is deliberately no
/// way to construct a table with a different edge set: the process graph
/// is fixed, not configurable.
#[derive(Debug, Clone, Copy)]
pub struct TransitionTable {
    edges: &'static [TransitionEdge],
}

impl TransitionTable {
    /// The standard DEDE approval graph.
    pub const fn standard() -> Self {
        Self { edges: EDGES }
    }

    /// Every edge in the graph.
    pub fn edges(&self) -> &'static [TransitionEdge] {
        self.edges
    }

    /// Edges out of `status` that `role` may drive, automatic edges
    /// included.
    pub fn valid_transitions(&self, status: RequestStatus, role: Role) -> Vec<&TransitionEdge> {
        self.edges
            .iter()
            .filter(|e| e.from == status && e.permits(role))
            .collect()
    }

    /// Whether `role` may move a request from `from` to `to`.
    pub fn can_transition(&self, from: RequestStatus, to: RequestStatus, role: Role) -> bool {
        self.edge(from, to).is_some_and(|e| e.permits(role))
    }

    /// Whether the sweep may move a request from `from` to `to` without
    /// an actor. Only automatic edges match.
    pub fn can_auto_transition(&self, from: RequestStatus, to: RequestStatus) -> bool {
        self.edge(from, to).is_some_and(TransitionEdge::is_auto)
    }

    /// The edge `(from, to)`, if the graph contains it.
    pub fn edge(&self, from: RequestStatus, to: RequestStatus) -> Option<&TransitionEdge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    /// The deadline a request entering `status` at `from` receives.
    ///
    /// Deadlines are derived solely from the status — never supplied by
    /// the caller: 14 days for document revision, 7 days to hold the
    /// scheduled appointment, nothing for every other status.
    pub fn default_deadline(&self, status: RequestStatus, from: Timestamp) -> Option<Timestamp> {
        match status {
            RequestStatus::DocumentEdit => Some(from.plus_days(14)),
            RequestStatus::Appointment => Some(from.plus_days(7)),
            _ => None,
        }
    }

    /// The tracked deadline type for a status, if entering it starts a
    /// reminder.
    pub fn tracked_deadline(&self, status: RequestStatus) -> Option<DeadlineType> {
        match status {
            RequestStatus::Appointment => Some(DeadlineType::Appointment),
            RequestStatus::DocumentEdit => Some(DeadlineType::DocumentReview),
            _ => None,
        }
    }

    /// Fixed progress percentage for dashboards, 0..=100.
    ///
    /// Non-decreasing along the happy path; every rejection or overdue
    /// status reads 0.
    pub fn progress(&self, status: RequestStatus) -> u8 {
        match status {
            RequestStatus::Draft => 0,
            RequestStatus::Returned => 5,
            RequestStatus::NewRequest => 10,
            RequestStatus::Accepted => 20,
            RequestStatus::Forwarded => 30,
            RequestStatus::Assigned => 40,
            RequestStatus::Appointment => 50,
            RequestStatus::Inspecting => 60,
            RequestStatus::InspectionDone => 70,
            RequestStatus::DocumentEdit => 80,
            RequestStatus::ReportApproved => 90,
            RequestStatus::Approved => 100,
            RequestStatus::Rejected | RequestStatus::RejectedFinal | RequestStatus::Overdue => 0,
        }
    }

    /// Whether `status` is terminal. Delegates to the status enum so the
    /// two definitions cannot drift.
    pub fn is_terminal(&self, status: RequestStatus) -> bool {
        status.is_terminal()
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TABLE: TransitionTable = TransitionTable::standard();

    /// The canonical happy path from submission to grant.
    const HAPPY_PATH: [RequestStatus; 11] = [
        RequestStatus::Draft,
        RequestStatus::NewRequest,
        RequestStatus::Accepted,
        RequestStatus::Forwarded,
        RequestStatus::Assigned,
        RequestStatus::Appointment,
        RequestStatus::Inspecting,
        RequestStatus::InspectionDone,
        RequestStatus::DocumentEdit,
        RequestStatus::ReportApproved,
        RequestStatus::Approved,
    ];

    #[test]
    fn every_edge_permits_exactly_its_role() {
        for edge in TABLE.edges() {
            for role in Role::ALL {
                let expected = edge.is_auto() || edge.required_role == Some(role);
                assert_eq!(
                    TABLE.can_transition(edge.from, edge.to, role),
                    expected,
                    "edge {} -> {} with role {}",
                    edge.from,
                    edge.to,
                    role
                );
            }
        }
    }

    #[test]
    fn absent_pairs_are_rejected_for_all_roles() {
        for from in RequestStatus::ALL {
            for to in RequestStatus::ALL {
                if TABLE.edge(from, to).is_some() {
                    continue;
                }
                for role in Role::ALL {
                    assert!(
                        !TABLE.can_transition(from, to, role),
                        "phantom edge {from} -> {to} for {role}"
                    );
                }
                assert!(!TABLE.can_auto_transition(from, to));
            }
        }
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_edges() {
        for status in RequestStatus::ALL {
            if status.is_terminal() {
                assert!(
                    TABLE.edges().iter().all(|e| e.from != status),
                    "terminal status {status} has an outgoing edge"
                );
            }
        }
    }

    #[test]
    fn auto_edges_all_target_overdue() {
        for edge in TABLE.edges().iter().filter(|e| e.is_auto()) {
            assert_eq!(edge.to, RequestStatus::Overdue);
            assert_eq!(edge.action, "auto_overdue");
            assert!(TABLE.can_auto_transition(edge.from, edge.to));
        }
    }

    #[test]
    fn auditor_holds_no_edges() {
        for status in RequestStatus::ALL {
            let auditor_edges: Vec<_> = TABLE
                .valid_transitions(status, Role::Auditor)
                .into_iter()
                .filter(|e| !e.is_auto())
                .collect();
            assert!(auditor_edges.is_empty(), "auditor can act from {status}");
        }
    }

    #[test]
    fn happy_path_is_walkable() {
        for pair in HAPPY_PATH.windows(2) {
            let edge = TABLE
                .edge(pair[0], pair[1])
                .unwrap_or_else(|| panic!("missing edge {} -> {}", pair[0], pair[1]));
            assert!(!edge.is_auto());
        }
    }

    #[test]
    fn progress_is_non_decreasing_along_happy_path() {
        let mut last = 0;
        for status in HAPPY_PATH {
            let p = TABLE.progress(status);
            assert!(p >= last, "progress dropped at {status}");
            last = p;
        }
        assert_eq!(TABLE.progress(RequestStatus::Approved), 100);
    }

    #[test]
    fn rejection_and_overdue_statuses_read_zero_progress() {
        for status in [
            RequestStatus::Rejected,
            RequestStatus::RejectedFinal,
            RequestStatus::Overdue,
        ] {
            assert_eq!(TABLE.progress(status), 0);
        }
    }

    #[test]
    fn default_deadlines_match_the_fixed_offsets() {
        let t = Timestamp::parse("2026-02-01T08:00:00Z").unwrap();
        assert_eq!(
            TABLE.default_deadline(RequestStatus::DocumentEdit, t),
            Some(t.plus_days(14))
        );
        assert_eq!(
            TABLE.default_deadline(RequestStatus::Appointment, t),
            Some(t.plus_days(7))
        );
        for status in RequestStatus::ALL {
            if !matches!(
                status,
                RequestStatus::DocumentEdit | RequestStatus::Appointment
            ) {
                assert_eq!(TABLE.default_deadline(status, t), None);
            }
        }
    }

    #[test]
    fn tracked_deadlines_cover_exactly_the_deadline_bearing_statuses() {
        for status in RequestStatus::ALL {
            let t = Timestamp::now();
            assert_eq!(
                TABLE.tracked_deadline(status).is_some(),
                TABLE.default_deadline(status, t).is_some(),
                "tracked/deadline mismatch at {status}"
            );
        }
        assert_eq!(
            TABLE.tracked_deadline(RequestStatus::Appointment),
            Some(DeadlineType::Appointment)
        );
        assert_eq!(
            TABLE.tracked_deadline(RequestStatus::DocumentEdit),
            Some(DeadlineType::DocumentReview)
        );
    }

    #[test]
    fn valid_transitions_for_admin_at_new_request() {
        let edges = TABLE.valid_transitions(RequestStatus::NewRequest, Role::Admin);
        let targets: Vec<_> = edges.iter().map(|e| e.to).collect();
        assert_eq!(
            targets,
            vec![
                RequestStatus::Accepted,
                RequestStatus::Rejected,
                RequestStatus::Returned,
            ]
        );
    }

    fn any_status() -> impl Strategy<Value = RequestStatus> {
        proptest::sample::select(RequestStatus::ALL.to_vec())
    }

    fn any_role() -> impl Strategy<Value = Role> {
        proptest::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn can_transition_agrees_with_edge_lookup(
            from in any_status(),
            to in any_status(),
            role in any_role(),
        ) {
            let allowed = TABLE.can_transition(from, to, role);
            match TABLE.edge(from, to) {
                Some(edge) => prop_assert_eq!(allowed, edge.permits(role)),
                None => prop_assert!(!allowed),
            }
        }

        #[test]
        fn progress_is_bounded(status in any_status()) {
            prop_assert!(TABLE.progress(status) <= 100);
        }
    }
}
