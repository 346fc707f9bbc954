//! # Request Status
//!
//! The closed set of statuses a license request moves through, from
//! draft submission to final approval. Three statuses are terminal;
//! everything else has at least one outgoing edge in the transition
//! table.

use serde::{Deserialize, Serialize};

/// The lifecycle status of a license request.
///
/// ```text
/// draft ──▶ new_request ──▶ accepted ──▶ forwarded ──▶ assigned
///              │  ▲                                       │
///              │  └── returned / rejected (resubmit)      ▼
///              │                                     appointment
///              ▼                                          │
///        (admin review)                                   ▼
///                                                    inspecting ──▶ inspection_done
///                                                                        │
///                                              report_approved ◀── document_edit
///                                                     │
///                                       approved ◀────┴────▶ rejected_final
/// ```
///
/// Any deadline-bearing status can additionally fall to `overdue`
/// (terminal) through the automatic sweep edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Request under construction by the applicant; not yet submitted.
    Draft,
    /// Submitted and awaiting front-office review.
    NewRequest,
    /// Accepted by the front office.
    Accepted,
    /// Rejected by the front office; the applicant may resubmit.
    Rejected,
    /// Inspector assigned by the section head.
    Assigned,
    /// Site-inspection appointment scheduled.
    Appointment,
    /// Site inspection in progress.
    Inspecting,
    /// Site inspection finished; audit report drafted.
    InspectionDone,
    /// Audit report returned for document revision.
    DocumentEdit,
    /// A deadline elapsed without action (terminal).
    Overdue,
    /// Audit report approved by the consultant.
    ReportApproved,
    /// License granted (terminal).
    Approved,
    /// License denied at final review (terminal).
    RejectedFinal,
    /// Returned to the applicant for revision before acceptance.
    Returned,
    /// Forwarded to the DEDE section head for assignment.
    Forwarded,
}

impl RequestStatus {
    /// All statuses, in declaration order. Used by exhaustive table
    /// tests and by the property tests over `(status, role)` pairs.
    pub const ALL: [RequestStatus; 15] = [
        Self::Draft,
        Self::NewRequest,
        Self::Accepted,
        Self::Rejected,
        Self::Assigned,
        Self::Appointment,
        Self::Inspecting,
        Self::InspectionDone,
        Self::DocumentEdit,
        Self::Overdue,
        Self::ReportApproved,
        Self::Approved,
        Self::RejectedFinal,
        Self::Returned,
        Self::Forwarded,
    ];

    /// Whether this status is terminal (no outgoing edges).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::RejectedFinal | Self::Overdue)
    }

    /// Return the canonical snake_case string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::NewRequest => "new_request",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Assigned => "assigned",
            Self::Appointment => "appointment",
            Self::Inspecting => "inspecting",
            Self::InspectionDone => "inspection_done",
            Self::DocumentEdit => "document_edit",
            Self::Overdue => "overdue",
            Self::ReportApproved => "report_approved",
            Self::Approved => "approved",
            Self::RejectedFinal => "rejected_final",
            Self::Returned => "returned",
            Self::Forwarded => "forwarded",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_three_terminal_statuses() {
        let terminal: Vec<_> = RequestStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                &RequestStatus::Overdue,
                &RequestStatus::Approved,
                &RequestStatus::RejectedFinal,
            ]
        );
    }

    #[test]
    fn wire_form_is_snake_case() {
        let json = serde_json::to_string(&RequestStatus::InspectionDone).unwrap();
        assert_eq!(json, "\"inspection_done\"");
        let back: RequestStatus = serde_json::from_str("\"report_approved\"").unwrap();
        assert_eq!(back, RequestStatus::ReportApproved);
    }

    #[test]
    fn as_str_values_are_unique() {
        let names: std::collections::HashSet<_> =
            RequestStatus::ALL.iter().map(RequestStatus::as_str).collect();
        assert_eq!(names.len(), RequestStatus::ALL.len());
    }
}
