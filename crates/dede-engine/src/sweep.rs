//! # Deadline Service — Overdue Sweep
//!
//! The periodic batch process enforcing business deadlines. Each pass
//! walks the active reminders and the open tasks, emits 3-day / 1-day /
//! overdue warnings, and drives the automatic `overdue` transition on
//! requests whose deadline has elapsed.
//!
//! Per-item processing is sequential but independent: one failing item
//! is recorded in the report and skipped, and the pass always completes
//! (loop-and-log, not fail-fast).

use dede_core::{LicenseType, RequestId, Role, SweepError, Timestamp, WorkflowError};
use dede_workflow::{RequestStatus, TransitionTable};
use serde::{Deserialize, Serialize};

use crate::audit::FlowLog;
use crate::notify::{NotificationDraft, NotificationKind, NotificationPriority, NotificationService};
use crate::reminder::{DeadlineReminder, ReminderStatus, ReminderStore};
use crate::request::RequestStore;
use crate::tasks::TaskAssignmentService;
use crate::transition::{TransitionCommand, WorkflowTransitionService};

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    /// When the pass started.
    pub started_at: Timestamp,
    /// Number of items acted upon (warnings sent, tasks or requests
    /// forced overdue).
    pub processed: usize,
    /// Per-item failures. The pass completed despite them.
    pub errors: Vec<SweepError>,
}

impl SweepReport {
    fn new(started_at: Timestamp) -> Self {
        Self {
            started_at,
            processed: 0,
            errors: Vec::new(),
        }
    }
}

/// Scans deadlines and enforces the automatic overdue policy.
#[derive(Clone)]
pub struct DeadlineService {
    table: TransitionTable,
    requests: RequestStore,
    reminders: ReminderStore,
    tasks: TaskAssignmentService,
    flow_log: FlowLog,
    transitions: WorkflowTransitionService,
    notifications: NotificationService,
}

impl DeadlineService {
    /// Wire the deadline service over the shared stores and the
    /// transition service it drives.
    pub fn new(
        table: TransitionTable,
        requests: RequestStore,
        reminders: ReminderStore,
        tasks: TaskAssignmentService,
        flow_log: FlowLog,
        transitions: WorkflowTransitionService,
        notifications: NotificationService,
    ) -> Self {
        Self {
            table,
            requests,
            reminders,
            tasks,
            flow_log,
            transitions,
            notifications,
        }
    }

    /// Run one sweep pass at `now`.
    pub fn run_overdue_sweep(&self, now: Timestamp) -> SweepReport {
        let mut report = SweepReport::new(now);

        for reminder in self.reminders.active() {
            match self.process_reminder(&reminder, now) {
                Ok(true) => report.processed += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(
                        request_id = %reminder.request_id,
                        reminder = %reminder.id,
                        error = %err,
                        "sweep: reminder processing failed; continuing"
                    );
                    report
                        .errors
                        .push(SweepError::for_request(reminder.request_id, err.to_string()));
                }
            }
        }

        for task in self.tasks.open_tasks_past_deadline(now) {
            let outcome = self
                .tasks
                .mark_overdue(task.id)
                .and_then(|_| self.force_overdue(task.license_type, task.request_id));
            match outcome {
                Ok(()) => report.processed += 1,
                Err(err) => {
                    tracing::warn!(
                        request_id = %task.request_id,
                        task = %task.id,
                        error = %err,
                        "sweep: task processing failed; continuing"
                    );
                    report
                        .errors
                        .push(SweepError::for_request(task.request_id, err.to_string()));
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            errors = report.errors.len(),
            "overdue sweep pass complete"
        );
        report
    }

    /// Handle one active reminder. Returns whether anything was done.
    fn process_reminder(
        &self,
        reminder: &DeadlineReminder,
        now: Timestamp,
    ) -> Result<bool, WorkflowError> {
        if reminder.deadline_date < now {
            self.expire_reminder(reminder)?;
            return Ok(true);
        }

        let lead_secs = reminder.deadline_date.seconds_since(&now);
        if lead_secs <= 86_400 {
            if reminder.reminder_sent_1d {
                return Ok(false);
            }
            self.send_warning(reminder, "1 day");
            // A reminder first observed inside the 1-day window suppresses
            // the broader 3-day warning; both flags stay monotonic.
            self.reminders.update(reminder.id, |r| {
                r.reminder_sent_1d = true;
                r.reminder_sent_3d = true;
            });
            return Ok(true);
        }
        if lead_secs <= 3 * 86_400 && !reminder.reminder_sent_3d {
            self.send_warning(reminder, "3 days");
            self.reminders.update(reminder.id, |r| r.reminder_sent_3d = true);
            return Ok(true);
        }
        Ok(false)
    }

    /// Overdue path: notify once, force the automatic transition, and
    /// retire the reminder.
    fn expire_reminder(&self, reminder: &DeadlineReminder) -> Result<(), WorkflowError> {
        let request = self
            .requests
            .get(reminder.license_type, reminder.request_id)
            .ok_or_else(|| WorkflowError::not_found("license_request", reminder.request_id))?;

        if !reminder.reminder_sent_overdue {
            let draft = NotificationDraft::new(
                NotificationKind::Overdue,
                "Deadline passed",
                format!(
                    "The {} deadline for license request {} has passed",
                    reminder.deadline_type, reminder.request_id
                ),
            )
            .entity("license_request", reminder.request_id)
            .priority(NotificationPriority::Urgent);
            self.notifications.notify_user(request.owner, draft.clone());
            self.notifications.notify_role(Role::Admin, draft);
            self.reminders
                .update(reminder.id, |r| r.reminder_sent_overdue = true);
        }

        self.force_overdue(reminder.license_type, reminder.request_id)?;
        self.reminders
            .update(reminder.id, |r| r.status = ReminderStatus::Expired);
        Ok(())
    }

    /// Drive the auto-overdue transition on a request, if it still sits
    /// in a deadline-bearing status. Already-overdue requests (per the
    /// flow log) and requests that moved on are skipped silently — the
    /// sweep must be idempotent across passes.
    fn force_overdue(
        &self,
        license_type: LicenseType,
        request_id: RequestId,
    ) -> Result<(), WorkflowError> {
        if self.flow_log.has_entry_to(request_id, RequestStatus::Overdue) {
            return Ok(());
        }
        let request = self
            .requests
            .get(license_type, request_id)
            .ok_or_else(|| WorkflowError::not_found("license_request", request_id))?;
        if !self
            .table
            .can_auto_transition(request.status, RequestStatus::Overdue)
        {
            tracing::debug!(
                request_id = %request_id,
                status = %request.status,
                "sweep: request left the deadline-bearing status; nothing to enforce"
            );
            return Ok(());
        }

        let cmd = TransitionCommand::by_system(
            request_id,
            license_type,
            request.status,
            RequestStatus::Overdue,
            "deadline elapsed",
        );
        match self.transitions.apply_transition(cmd) {
            Ok(_) => Ok(()),
            // Lost a race with a live transition between the read above
            // and the guarded write — the request moved on, which is fine.
            Err(WorkflowError::InvalidTransition { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn send_warning(&self, reminder: &DeadlineReminder, window: &str) {
        let request_owner = self
            .requests
            .get(reminder.license_type, reminder.request_id)
            .map(|r| r.owner);
        let Some(target) = reminder.assigned_to.or(request_owner) else {
            tracing::warn!(reminder = %reminder.id, "no recipient for deadline warning");
            return;
        };
        self.notifications.notify_user(
            target,
            NotificationDraft::new(
                NotificationKind::Reminder,
                format!("Deadline in {window}"),
                format!(
                    "The {} deadline for license request {} falls due in {window}",
                    reminder.deadline_type, reminder.request_id
                ),
            )
            .entity("license_request", reminder.request_id)
            .priority(NotificationPriority::High),
        );
    }
}
