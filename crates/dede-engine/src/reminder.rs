//! # Deadline Reminders
//!
//! A reminder row tracks one business deadline on one request and
//! remembers which warnings have already gone out. The three sent-flags
//! are monotonic — once set they are never cleared — which guarantees
//! at-most-once delivery per threshold, however often the sweep runs.

use dede_core::{LicenseType, ReminderId, RequestId, Timestamp, UserId};
use dede_workflow::DeadlineType;
use serde::{Deserialize, Serialize};

use crate::store::Store;

/// Lifecycle of a reminder row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    /// The deadline is being watched.
    Active,
    /// The deadline ran out; the overdue path has fired. Final.
    Expired,
    /// The watched status was left before the deadline. Final.
    Cancelled,
}

/// A tracked deadline on a license request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineReminder {
    /// Unique reminder identifier.
    pub id: ReminderId,
    /// The request whose deadline is watched.
    pub request_id: RequestId,
    /// Variant family of the request.
    pub license_type: LicenseType,
    /// Which deadline this row watches.
    pub deadline_type: DeadlineType,
    /// The deadline itself.
    pub deadline_date: Timestamp,
    /// Whether the 3-day warning went out. Monotonic.
    pub reminder_sent_3d: bool,
    /// Whether the 1-day warning went out. Monotonic.
    pub reminder_sent_1d: bool,
    /// Whether the overdue notification went out. Monotonic.
    pub reminder_sent_overdue: bool,
    /// Row lifecycle status.
    pub status: ReminderStatus,
    /// Who should receive the warnings, when a specific person owns the
    /// deadline; otherwise warnings go to the request owner.
    pub assigned_to: Option<UserId>,
    /// When the row was created.
    pub created_at: Timestamp,
}

impl DeadlineReminder {
    /// Create an active reminder with no warnings sent.
    pub fn new(
        request_id: RequestId,
        license_type: LicenseType,
        deadline_type: DeadlineType,
        deadline_date: Timestamp,
        assigned_to: Option<UserId>,
    ) -> Self {
        Self {
            id: ReminderId::new(),
            request_id,
            license_type,
            deadline_type,
            deadline_date,
            reminder_sent_3d: false,
            reminder_sent_1d: false,
            reminder_sent_overdue: false,
            status: ReminderStatus::Active,
            assigned_to,
            created_at: Timestamp::now(),
        }
    }
}

/// The reminder table with the lookups the transition service and the
/// sweep need.
#[derive(Debug, Clone, Default)]
pub struct ReminderStore {
    inner: Store<ReminderId, DeadlineReminder>,
}

impl ReminderStore {
    /// Create an empty reminder store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reminder row.
    pub fn insert(&self, reminder: DeadlineReminder) {
        self.inner.insert(reminder.id, reminder);
    }

    /// Fetch one reminder.
    pub fn get(&self, id: ReminderId) -> Option<DeadlineReminder> {
        self.inner.get(&id)
    }

    /// Update a reminder in place.
    pub fn update(
        &self,
        id: ReminderId,
        f: impl FnOnce(&mut DeadlineReminder),
    ) -> Option<DeadlineReminder> {
        self.inner.update(&id, f)
    }

    /// All active reminders, sweep input.
    pub fn active(&self) -> Vec<DeadlineReminder> {
        self.inner
            .list()
            .into_iter()
            .filter(|r| r.status == ReminderStatus::Active)
            .collect()
    }

    /// Cancel every active reminder on a request. Called when a
    /// transition replaces or removes the tracked deadline. Returns the
    /// number cancelled.
    pub fn cancel_active_for(&self, request_id: RequestId) -> usize {
        let ids: Vec<ReminderId> = self
            .active()
            .into_iter()
            .filter(|r| r.request_id == request_id)
            .map(|r| r.id)
            .collect();
        for id in &ids {
            self.inner.update(id, |r| r.status = ReminderStatus::Cancelled);
        }
        ids.len()
    }

    /// All reminders for one request, newest first.
    pub fn for_request(&self, request_id: RequestId) -> Vec<DeadlineReminder> {
        let mut rows: Vec<_> = self
            .inner
            .list()
            .into_iter()
            .filter(|r| r.request_id == request_id)
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder(request_id: RequestId, deadline: Timestamp) -> DeadlineReminder {
        DeadlineReminder::new(
            request_id,
            LicenseType::Renewal,
            DeadlineType::Appointment,
            deadline,
            None,
        )
    }

    #[test]
    fn new_reminder_is_active_with_clear_flags() {
        let r = reminder(RequestId::new(), Timestamp::now());
        assert_eq!(r.status, ReminderStatus::Active);
        assert!(!r.reminder_sent_3d && !r.reminder_sent_1d && !r.reminder_sent_overdue);
    }

    #[test]
    fn cancel_active_for_touches_only_that_request() {
        let store = ReminderStore::new();
        let a = RequestId::new();
        let b = RequestId::new();
        store.insert(reminder(a, Timestamp::now()));
        store.insert(reminder(b, Timestamp::now()));

        assert_eq!(store.cancel_active_for(a), 1);
        assert_eq!(store.active().len(), 1);
        assert_eq!(store.active()[0].request_id, b);
        // Cancelled rows are never resurrected: a second cancel is a no-op.
        assert_eq!(store.cancel_active_for(a), 0);
    }
}
