//! # Workflow Transition Service
//!
//! The one place a request's status changes. A transition request is
//! validated against the table, applied to the stored record under a
//! single write lock (the stale-read guard), and then followed by its
//! side effects: one flow-log entry, an inspection task on assignment, a
//! deadline reminder when the new status carries a tracked deadline, and
//! a notification to the next actor.
//!
//! ## Consistency Policy
//!
//! The primary write is authoritative. Side effects run after it as one
//! isolated step; a failure there is logged with the request id and
//! neither rolls the status back nor fails the call. A future store
//! could upgrade that step to a transactional outbox without changing
//! the public contract.

use dede_core::{Actor, LicenseType, RequestId, Role, Timestamp, UserId, WorkflowError};
use dede_workflow::{RequestStatus, TransitionTable};

use crate::audit::{FlowLog, FlowLogEntry};
use crate::notify::{NotificationDraft, NotificationKind, NotificationPriority, NotificationService};
use crate::reminder::{DeadlineReminder, ReminderStore};
use crate::request::{LicenseRequest, RequestStore};
use crate::tasks::{AssignTask, TaskAssignmentService, TaskPriority, TaskType};

/// A request to move one license request along one edge of the graph.
#[derive(Debug, Clone)]
pub struct TransitionCommand {
    /// The request to move.
    pub request_id: RequestId,
    /// Variant family of the request.
    pub license_type: LicenseType,
    /// Status the caller believes the request is in.
    pub from: RequestStatus,
    /// Target status.
    pub to: RequestStatus,
    /// Who is driving the transition.
    pub actor: Actor,
    /// Role the actor acts under. `None` only for the system actor.
    pub actor_role: Option<Role>,
    /// Comment recorded on the request and in the flow log.
    pub comment: String,
    /// Appointment date, honored only on transitions into `appointment`.
    pub appointment_date: Option<Timestamp>,
    /// Inspector to assign, honored only on transitions into `assigned`.
    pub inspector: Option<UserId>,
}

impl TransitionCommand {
    /// A human-driven transition.
    pub fn by_staff(
        request_id: RequestId,
        license_type: LicenseType,
        from: RequestStatus,
        to: RequestStatus,
        actor: UserId,
        role: Role,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            license_type,
            from,
            to,
            actor: Actor::Staff(actor),
            actor_role: Some(role),
            comment: comment.into(),
            appointment_date: None,
            inspector: None,
        }
    }

    /// A sweep-driven automatic transition.
    pub fn by_system(
        request_id: RequestId,
        license_type: LicenseType,
        from: RequestStatus,
        to: RequestStatus,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            license_type,
            from,
            to,
            actor: Actor::System,
            actor_role: None,
            comment: comment.into(),
            appointment_date: None,
            inspector: None,
        }
    }

    /// Attach an appointment date.
    pub fn with_appointment(mut self, date: Timestamp) -> Self {
        self.appointment_date = Some(date);
        self
    }

    /// Attach the inspector to assign.
    pub fn with_inspector(mut self, inspector: UserId) -> Self {
        self.inspector = Some(inspector);
        self
    }
}

/// Applies transitions with their full side-effect fan-out.
#[derive(Clone)]
pub struct WorkflowTransitionService {
    table: TransitionTable,
    requests: RequestStore,
    flow_log: FlowLog,
    tasks: TaskAssignmentService,
    reminders: ReminderStore,
    notifications: NotificationService,
}

impl WorkflowTransitionService {
    /// Wire a transition service over shared stores and collaborators.
    pub fn new(
        table: TransitionTable,
        requests: RequestStore,
        flow_log: FlowLog,
        tasks: TaskAssignmentService,
        reminders: ReminderStore,
        notifications: NotificationService,
    ) -> Self {
        Self {
            table,
            requests,
            flow_log,
            tasks,
            reminders,
            notifications,
        }
    }

    /// The transition table this service validates against.
    pub fn table(&self) -> TransitionTable {
        self.table
    }

    /// Apply one transition.
    ///
    /// Fails with `InvalidTransition` when the edge does not exist for
    /// the acting role or when the persisted status no longer equals
    /// `cmd.from` (two racers on the same request: exactly one wins).
    /// Fails with `NotFound` when no record exists under the given
    /// variant tag and id. Side-effect failures after the primary write
    /// are logged, never surfaced.
    pub fn apply_transition(&self, cmd: TransitionCommand) -> Result<LicenseRequest, WorkflowError> {
        let permitted = match (cmd.actor, cmd.actor_role) {
            (Actor::System, _) => self.table.can_auto_transition(cmd.from, cmd.to),
            (Actor::Staff(_), Some(role)) => self.table.can_transition(cmd.from, cmd.to, role),
            (Actor::Staff(_), None) => false,
        };
        if !permitted {
            return Err(self.invalid(&cmd));
        }

        let now = Timestamp::now();
        let updated = self
            .requests
            .try_update(cmd.license_type, cmd.request_id, |req| {
                // Stale-read guard, evaluated under the write lock.
                if req.status != cmd.from {
                    return Err(self.invalid(&cmd));
                }
                self.mutate(req, &cmd, now);
                Ok(req.clone())
            })
            .ok_or_else(|| WorkflowError::not_found("license_request", cmd.request_id))??;

        // The status change is authoritative from here on.
        self.run_side_effects(&updated, &cmd, now);
        Ok(updated)
    }

    /// In-place record mutation for an accepted transition.
    fn mutate(&self, req: &mut LicenseRequest, cmd: &TransitionCommand, now: Timestamp) {
        req.status = cmd.to;
        req.notes = Some(cmd.comment.clone());
        req.deadline = self.table.default_deadline(cmd.to, now);
        req.updated_at = now;

        match cmd.to {
            RequestStatus::Assigned => {
                req.inspector = cmd.inspector;
                req.assigned_by = cmd.actor.user_id();
                req.assigned_at = Some(now);
            }
            RequestStatus::Appointment => {
                if let Some(date) = cmd.appointment_date {
                    req.appointment_date = Some(date);
                }
            }
            RequestStatus::Inspecting => {
                req.inspection_date = Some(now);
            }
            RequestStatus::Rejected | RequestStatus::RejectedFinal => {
                req.rejection_reason = Some(cmd.comment.clone());
            }
            _ => {}
        }
        if cmd.to.is_terminal() {
            req.completion_date = Some(now);
        }
    }

    /// Side effects after the primary write: flow log, task creation,
    /// reminder bookkeeping, notification dispatch. Logged on failure,
    /// never rolled back.
    fn run_side_effects(&self, req: &LicenseRequest, cmd: &TransitionCommand, now: Timestamp) {
        self.flow_log.append(FlowLogEntry {
            request_id: req.id,
            license_type: req.license_type,
            previous_status: Some(cmd.from),
            new_status: cmd.to,
            changed_by: cmd.actor,
            reason: cmd.comment.clone(),
            created_at: now,
        });

        if cmd.to == RequestStatus::Assigned {
            match (req.inspector, cmd.actor.user_id()) {
                (Some(inspector), Some(assigner)) => {
                    self.tasks.assign_task(AssignTask {
                        request_id: req.id,
                        license_type: req.license_type,
                        assigned_to: inspector,
                        assigned_by: assigner,
                        assigned_role: Role::DedeStaff,
                        task_type: TaskType::Inspection,
                        priority: TaskPriority::Normal,
                        deadline: req.deadline,
                    });
                }
                _ => {
                    tracing::warn!(
                        request_id = %req.id,
                        "assignment transition without inspector or assigner; no task created"
                    );
                }
            }
        }

        // Replace any previous reminder when the tracked deadline changes.
        self.reminders.cancel_active_for(req.id);
        if let (Some(deadline_type), Some(deadline)) =
            (self.table.tracked_deadline(cmd.to), req.deadline)
        {
            let watcher = match deadline_type {
                dede_workflow::DeadlineType::Appointment => req.inspector,
                _ => Some(req.owner),
            };
            self.reminders.insert(DeadlineReminder::new(
                req.id,
                req.license_type,
                deadline_type,
                deadline,
                watcher,
            ));
        }

        self.dispatch_notification(req, cmd);
    }

    /// Route the transition notification to the next actor.
    fn dispatch_notification(&self, req: &LicenseRequest, cmd: &TransitionCommand) {
        let draft = NotificationDraft::new(
            NotificationKind::StatusChange,
            format!("Request {}", cmd.to),
            format!(
                "License request moved from {} to {}",
                cmd.from, cmd.to
            ),
        )
        .entity("license_request", req.id)
        .action_url(format!("/requests/{}/{}", req.license_type, req.id.as_uuid()));

        match cmd.to {
            RequestStatus::NewRequest | RequestStatus::Accepted => {
                self.notifications.notify_role(Role::Admin, draft);
            }
            RequestStatus::Forwarded => {
                self.notifications
                    .notify_role(Role::DedeHead, draft.priority(NotificationPriority::High));
            }
            RequestStatus::Assigned | RequestStatus::Appointment => {
                if let Some(inspector) = req.inspector {
                    self.notifications
                        .notify_user(inspector, draft.priority(NotificationPriority::High));
                } else {
                    tracing::warn!(request_id = %req.id, "no inspector to notify");
                }
            }
            RequestStatus::DocumentEdit => {
                self.notifications.notify_role(Role::DedeStaff, draft);
            }
            RequestStatus::Approved
            | RequestStatus::Rejected
            | RequestStatus::RejectedFinal
            | RequestStatus::Returned
            | RequestStatus::Overdue => {
                self.notifications.notify_user(req.owner, draft);
            }
            // Remaining statuses carry no notification of their own.
            _ => {}
        }
    }

    fn invalid(&self, cmd: &TransitionCommand) -> WorkflowError {
        WorkflowError::InvalidTransition {
            from: cmd.from.to_string(),
            to: cmd.to.to_string(),
            role: cmd
                .actor_role
                .map(|r| r.to_string())
                .unwrap_or_else(|| "system".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{InMemoryRoleDirectory, Recipient};
    use crate::request::LicensePayload;
    use crate::reminder::ReminderStatus;
    use crate::tasks::TaskStatus;
    use std::sync::Arc;

    struct Fixture {
        service: WorkflowTransitionService,
        directory: Arc<InMemoryRoleDirectory>,
        owner: UserId,
        request: LicenseRequest,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryRoleDirectory::new());
        let notifications = NotificationService::new(directory.clone());
        let requests = RequestStore::new();
        let service = WorkflowTransitionService::new(
            TransitionTable::standard(),
            requests.clone(),
            FlowLog::new(),
            TaskAssignmentService::new(notifications.clone()),
            ReminderStore::new(),
            notifications,
        );

        let owner = UserId::new();
        let request = LicenseRequest::draft(
            owner,
            LicensePayload::Renewal {
                license_no: "DEDE-2019-0042".into(),
                expires_at: Timestamp::now().plus_days(30),
            },
        );
        requests.insert(request.clone());
        Fixture {
            service,
            directory,
            owner,
            request,
        }
    }

    impl Fixture {
        fn step(&mut self, to: RequestStatus, actor: UserId, role: Role) -> LicenseRequest {
            let cmd = TransitionCommand::by_staff(
                self.request.id,
                self.request.license_type,
                self.request.status,
                to,
                actor,
                role,
                format!("step to {to}"),
            );
            let updated = self.service.apply_transition(cmd).unwrap();
            self.request = updated.clone();
            updated
        }

        /// Walk the request to `forwarded`, ready for assignment.
        fn advance_to_forwarded(&mut self, admin: UserId) {
            self.step(RequestStatus::NewRequest, self.owner, Role::User);
            self.step(RequestStatus::Accepted, admin, Role::Admin);
            self.step(RequestStatus::Forwarded, admin, Role::Admin);
        }
    }

    #[test]
    fn role_mismatch_is_rejected_without_touching_the_record() {
        let fx = fixture();
        let cmd = TransitionCommand::by_staff(
            fx.request.id,
            fx.request.license_type,
            RequestStatus::Draft,
            RequestStatus::NewRequest,
            UserId::new(),
            Role::Admin, // submit requires `user`
            "not my edge",
        );
        assert!(matches!(
            fx.service.apply_transition(cmd),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        let stored = fx
            .service
            .requests
            .get(fx.request.license_type, fx.request.id)
            .unwrap();
        assert_eq!(stored.status, RequestStatus::Draft);
        assert!(fx.service.flow_log.is_empty());
    }

    #[test]
    fn stale_from_is_a_no_op_on_the_stored_record() {
        let mut fx = fixture();
        fx.step(RequestStatus::NewRequest, fx.owner, Role::User);

        // A second submit with the stale `draft` precondition.
        let cmd = TransitionCommand::by_staff(
            fx.request.id,
            fx.request.license_type,
            RequestStatus::Draft,
            RequestStatus::NewRequest,
            fx.owner,
            Role::User,
            "stale",
        );
        assert!(matches!(
            fx.service.apply_transition(cmd),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        let stored = fx
            .service
            .requests
            .get(fx.request.license_type, fx.request.id)
            .unwrap();
        assert_eq!(stored.status, RequestStatus::NewRequest);
        assert_eq!(stored.notes.as_deref(), Some("step to new_request"));
    }

    #[test]
    fn unknown_request_is_not_found() {
        let fx = fixture();
        let cmd = TransitionCommand::by_staff(
            RequestId::new(),
            LicenseType::Renewal,
            RequestStatus::Draft,
            RequestStatus::NewRequest,
            fx.owner,
            Role::User,
            "ghost",
        );
        assert!(matches!(
            fx.service.apply_transition(cmd),
            Err(WorkflowError::NotFound { .. })
        ));
    }

    #[test]
    fn every_transition_appends_exactly_one_flow_log_entry() {
        let mut fx = fixture();
        let admin = UserId::new();
        fx.step(RequestStatus::NewRequest, fx.owner, Role::User);
        fx.step(RequestStatus::Accepted, admin, Role::Admin);

        let entries = fx.service.flow_log.entries_for(fx.request.id);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].previous_status, Some(RequestStatus::Draft));
        assert_eq!(entries[0].new_status, RequestStatus::NewRequest);
        assert_eq!(entries[1].previous_status, Some(RequestStatus::NewRequest));
        assert_eq!(entries[1].new_status, RequestStatus::Accepted);
        assert_eq!(entries[1].changed_by, Actor::Staff(admin));
    }

    #[test]
    fn assignment_creates_one_pending_task_and_notifies_the_inspector() {
        let mut fx = fixture();
        let admin = UserId::new();
        let head = UserId::new();
        let inspector = UserId::new();
        fx.advance_to_forwarded(admin);

        let cmd = TransitionCommand::by_staff(
            fx.request.id,
            fx.request.license_type,
            RequestStatus::Forwarded,
            RequestStatus::Assigned,
            head,
            Role::DedeHead,
            "assigning",
        )
        .with_inspector(inspector);
        let updated = fx.service.apply_transition(cmd).unwrap();

        assert_eq!(updated.inspector, Some(inspector));
        assert_eq!(updated.assigned_by, Some(head));
        assert!(updated.assigned_at.is_some());

        let tasks = fx.service.tasks.tasks_for_request(fx.request.id);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert_eq!(tasks[0].assigned_to, inspector);

        // Task-assignment notice plus the transition notice, both to the
        // inspector.
        assert_eq!(fx.service.notifications.unread_count(inspector), 2);
    }

    #[test]
    fn appointment_sets_deadline_and_reminder() {
        let mut fx = fixture();
        let admin = UserId::new();
        let head = UserId::new();
        let inspector = UserId::new();
        fx.advance_to_forwarded(admin);

        let assign = TransitionCommand::by_staff(
            fx.request.id,
            fx.request.license_type,
            RequestStatus::Forwarded,
            RequestStatus::Assigned,
            head,
            Role::DedeHead,
            "assigning",
        )
        .with_inspector(inspector);
        fx.request = fx.service.apply_transition(assign).unwrap();

        let visit = Timestamp::now().plus_days(3);
        let cmd = TransitionCommand::by_staff(
            fx.request.id,
            fx.request.license_type,
            RequestStatus::Assigned,
            RequestStatus::Appointment,
            inspector,
            Role::DedeStaff,
            "scheduled",
        )
        .with_appointment(visit);
        let updated = fx.service.apply_transition(cmd).unwrap();

        assert_eq!(updated.appointment_date, Some(visit));
        let deadline = updated.deadline.unwrap();
        assert_eq!(deadline.seconds_since(&updated.updated_at), 7 * 86_400);

        let reminders = fx.service.reminders.for_request(fx.request.id);
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].status, ReminderStatus::Active);
        assert_eq!(reminders[0].deadline_date, deadline);
        assert_eq!(reminders[0].assigned_to, Some(inspector));
    }

    #[test]
    fn document_edit_notifies_staff_role_and_tracks_fourteen_days() {
        let mut fx = fixture();
        let admin = UserId::new();
        let head = UserId::new();
        let inspector = UserId::new();
        let consult = UserId::new();
        let staffer = UserId::new();
        fx.directory.grant(staffer, Role::DedeStaff);
        fx.advance_to_forwarded(admin);

        let assign = TransitionCommand::by_staff(
            fx.request.id,
            fx.request.license_type,
            RequestStatus::Forwarded,
            RequestStatus::Assigned,
            head,
            Role::DedeHead,
            "assigning",
        )
        .with_inspector(inspector);
        fx.request = fx.service.apply_transition(assign).unwrap();
        fx.step(RequestStatus::Appointment, inspector, Role::DedeStaff);
        fx.step(RequestStatus::Inspecting, inspector, Role::DedeStaff);
        fx.step(RequestStatus::InspectionDone, inspector, Role::DedeStaff);
        let updated = fx.step(RequestStatus::DocumentEdit, consult, Role::DedeConsult);

        let deadline = updated.deadline.unwrap();
        assert_eq!(deadline.seconds_since(&updated.updated_at), 14 * 86_400);

        // The appointment reminder was replaced by the document one.
        let reminders = fx.service.reminders.for_request(fx.request.id);
        let active: Vec<_> = reminders
            .iter()
            .filter(|r| r.status == ReminderStatus::Active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].assigned_to, Some(fx.owner));

        let staff_unread = fx.service.notifications.unread_for(staffer);
        assert!(staff_unread
            .iter()
            .any(|n| n.recipient == Recipient::Role(Role::DedeStaff)));
    }

    #[test]
    fn final_statuses_notify_the_owner_and_stamp_completion() {
        let mut fx = fixture();
        let admin = UserId::new();
        fx.step(RequestStatus::NewRequest, fx.owner, Role::User);
        let updated = fx.step(RequestStatus::Rejected, admin, Role::Admin);

        assert_eq!(updated.rejection_reason.as_deref(), Some("step to rejected"));
        assert!(fx
            .service
            .notifications
            .unread_for(fx.owner)
            .iter()
            .any(|n| n.recipient == Recipient::User(fx.owner)));
        // `rejected` is resubmittable, not terminal.
        assert!(updated.completion_date.is_none());
    }

    #[test]
    fn concurrent_transitions_with_the_same_from_yield_one_winner() {
        let mut fx = fixture();
        fx.step(RequestStatus::NewRequest, fx.owner, Role::User);
        let admin_a = UserId::new();
        let admin_b = UserId::new();

        let make = |admin: UserId, to: RequestStatus| {
            TransitionCommand::by_staff(
                fx.request.id,
                fx.request.license_type,
                RequestStatus::NewRequest,
                to,
                admin,
                Role::Admin,
                "racing",
            )
        };

        let service = fx.service.clone();
        let cmd_a = make(admin_a, RequestStatus::Accepted);
        let cmd_b = make(admin_b, RequestStatus::Rejected);
        let mut outcomes = Vec::new();
        std::thread::scope(|s| {
            let h1 = {
                let service = service.clone();
                s.spawn(move || service.apply_transition(cmd_a))
            };
            let h2 = s.spawn(move || service.apply_transition(cmd_b));
            outcomes.push(h1.join().unwrap());
            outcomes.push(h2.join().unwrap());
        });

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(WorkflowError::InvalidTransition { .. })
        )));
        // Exactly one flow-log entry past the submit.
        assert_eq!(fx.service.flow_log.entries_for(fx.request.id).len(), 2);
    }

    #[test]
    fn system_actor_may_use_only_auto_edges() {
        let mut fx = fixture();
        fx.step(RequestStatus::NewRequest, fx.owner, Role::User);

        // No auto edge out of new_request.
        let cmd = TransitionCommand::by_system(
            fx.request.id,
            fx.request.license_type,
            RequestStatus::NewRequest,
            RequestStatus::Accepted,
            "sweep overreach",
        );
        assert!(fx.service.apply_transition(cmd).is_err());
    }
}
