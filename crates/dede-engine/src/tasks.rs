//! # Task Assignments
//!
//! Work items handed to inspectors, reviewers, and consultants. A task's
//! lifecycle is independent of, but loosely consistent with, its parent
//! request: the transition service creates inspection tasks as a side
//! effect of assignment, and the overdue sweep forces open tasks past
//! their deadline to `overdue`.

use dede_core::{LicenseType, RequestId, Role, TaskId, Timestamp, UserId, WorkflowError};
use serde::{Deserialize, Serialize};

use crate::notify::{NotificationDraft, NotificationKind, NotificationPriority, NotificationService};
use crate::store::Store;

// -- Task Model ---------------------------------------------------------------

/// Lifecycle status of a task.
///
/// ```text
/// pending ──▶ in_progress ──▶ completed | cancelled
///    │             │
///    └─────────────┴──▶ overdue   (sweep only)
/// ```
///
/// There is no edge back to `pending` once a task has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Overdue,
}

impl TaskStatus {
    /// Whether the task still awaits work (and is therefore subject to
    /// the deadline sweep).
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// Return the canonical snake_case string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Document review of the request itself.
    Review,
    /// On-site inspection.
    Inspection,
    /// Review of the inspection audit report.
    ReportReview,
    /// Final approval decision.
    Approval,
}

/// Priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Urgent,
}

/// A unit of work handed to a specific staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    /// Unique task identifier.
    pub id: TaskId,
    /// The request this task belongs to.
    pub request_id: RequestId,
    /// Variant family of the parent request.
    pub license_type: LicenseType,
    /// Current owner of the task.
    pub assigned_to: UserId,
    /// Who handed the task out.
    pub assigned_by: UserId,
    /// Role the owner acts under for this task.
    pub assigned_role: Role,
    /// Kind of work.
    pub task_type: TaskType,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: TaskPriority,
    /// Business deadline for the work, if any.
    pub deadline: Option<Timestamp>,
    /// When the task was completed.
    pub completed_at: Option<Timestamp>,
    /// Completion notes.
    pub notes: Option<String>,
    /// When the task was created.
    pub created_at: Timestamp,
}

/// Parameters for creating a task.
#[derive(Debug, Clone)]
pub struct AssignTask {
    pub request_id: RequestId,
    pub license_type: LicenseType,
    pub assigned_to: UserId,
    pub assigned_by: UserId,
    pub assigned_role: Role,
    pub task_type: TaskType,
    pub priority: TaskPriority,
    pub deadline: Option<Timestamp>,
}

// -- Task Assignment Service --------------------------------------------------

/// Lifecycle management for task assignments.
#[derive(Clone)]
pub struct TaskAssignmentService {
    store: Store<TaskId, TaskAssignment>,
    notifications: NotificationService,
}

impl TaskAssignmentService {
    /// Create a service over an empty task table.
    pub fn new(notifications: NotificationService) -> Self {
        Self {
            store: Store::new(),
            notifications,
        }
    }

    /// Create a pending task and notify the assignee.
    pub fn assign_task(&self, params: AssignTask) -> TaskAssignment {
        let task = TaskAssignment {
            id: TaskId::new(),
            request_id: params.request_id,
            license_type: params.license_type,
            assigned_to: params.assigned_to,
            assigned_by: params.assigned_by,
            assigned_role: params.assigned_role,
            task_type: params.task_type,
            status: TaskStatus::Pending,
            priority: params.priority,
            deadline: params.deadline,
            completed_at: None,
            notes: None,
            created_at: Timestamp::now(),
        };
        self.store.insert(task.id, task.clone());
        tracing::info!(task = %task.id, request = %task.request_id, assignee = %task.assigned_to, "task assigned");

        self.notifications.notify_user(
            task.assigned_to,
            NotificationDraft::new(
                NotificationKind::ActionRequired,
                "New task assigned",
                format!("You have been assigned a {:?} task", task.task_type),
            )
            .entity("task_assignment", task.id)
            .priority(NotificationPriority::High),
        );
        task
    }

    /// Begin work on a pending task.
    pub fn start_task(&self, id: TaskId) -> Result<TaskAssignment, WorkflowError> {
        self.step(id, TaskStatus::Pending, TaskStatus::InProgress, |_| {})
    }

    /// Finish an in-progress task: records the notes and completion time,
    /// and notifies the original assigner.
    pub fn complete_task(&self, id: TaskId, notes: impl Into<String>) -> Result<TaskAssignment, WorkflowError> {
        let notes = notes.into();
        let task = self.step(id, TaskStatus::InProgress, TaskStatus::Completed, |t| {
            t.completed_at = Some(Timestamp::now());
            t.notes = Some(notes.clone());
        })?;

        self.notifications.notify_user(
            task.assigned_by,
            NotificationDraft::new(
                NotificationKind::StatusChange,
                "Task completed",
                format!("Task for request {} was completed", task.request_id),
            )
            .entity("task_assignment", task.id),
        );
        Ok(task)
    }

    /// Cancel an in-progress task.
    pub fn cancel_task(&self, id: TaskId) -> Result<TaskAssignment, WorkflowError> {
        self.step(id, TaskStatus::InProgress, TaskStatus::Cancelled, |_| {})
    }

    /// Move an open task to a new owner. Both the old and the new
    /// assignee are notified.
    pub fn reassign_task(
        &self,
        id: TaskId,
        new_assignee: UserId,
        reassigned_by: UserId,
    ) -> Result<TaskAssignment, WorkflowError> {
        let mut prior_assignee = None;
        let result = self
            .store
            .try_update(&id, |t| {
                if !t.status.is_open() {
                    return Err(invalid_task_move(t.status, t.status));
                }
                prior_assignee = Some(t.assigned_to);
                t.assigned_to = new_assignee;
                t.assigned_by = reassigned_by;
                Ok(t.clone())
            })
            .ok_or_else(|| WorkflowError::not_found("task_assignment", id))?;
        let updated = result?;

        let handover = NotificationDraft::new(
            NotificationKind::Info,
            "Task reassigned",
            format!("Task for request {} changed hands", updated.request_id),
        )
        .entity("task_assignment", updated.id);
        if let Some(prior) = prior_assignee {
            self.notifications.notify_user(prior, handover.clone());
        }
        self.notifications.notify_user(
            new_assignee,
            handover.priority(NotificationPriority::High),
        );
        Ok(updated)
    }

    /// Force an open task to `overdue` and notify the assignee.
    ///
    /// Sweep-only: no public caller drives this edge.
    pub(crate) fn mark_overdue(&self, id: TaskId) -> Result<TaskAssignment, WorkflowError> {
        let result = self
            .store
            .try_update(&id, |t| {
                if !t.status.is_open() {
                    return Err(invalid_task_move(t.status, TaskStatus::Overdue));
                }
                t.status = TaskStatus::Overdue;
                Ok(t.clone())
            })
            .ok_or_else(|| WorkflowError::not_found("task_assignment", id))?;
        let task = result?;

        self.notifications.notify_user(
            task.assigned_to,
            NotificationDraft::new(
                NotificationKind::Overdue,
                "Task overdue",
                format!("Task for request {} passed its deadline", task.request_id),
            )
            .entity("task_assignment", task.id)
            .priority(NotificationPriority::Urgent),
        );
        Ok(task)
    }

    /// Fetch one task.
    pub fn get(&self, id: TaskId) -> Option<TaskAssignment> {
        self.store.get(&id)
    }

    /// All tasks belonging to one request.
    pub fn tasks_for_request(&self, request_id: RequestId) -> Vec<TaskAssignment> {
        let mut tasks: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|t| t.request_id == request_id)
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// All tasks currently owned by one user.
    pub fn tasks_for_user(&self, user: UserId) -> Vec<TaskAssignment> {
        let mut tasks: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|t| t.assigned_to == user)
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// Open tasks whose deadline precedes `now`. Sweep input.
    pub(crate) fn open_tasks_past_deadline(&self, now: Timestamp) -> Vec<TaskAssignment> {
        self.store
            .list()
            .into_iter()
            .filter(|t| t.status.is_open() && t.deadline.is_some_and(|d| d < now))
            .collect()
    }

    /// Drive one status edge under the store's write lock.
    fn step(
        &self,
        id: TaskId,
        expected: TaskStatus,
        to: TaskStatus,
        mutate: impl FnOnce(&mut TaskAssignment),
    ) -> Result<TaskAssignment, WorkflowError> {
        let result = self
            .store
            .try_update(&id, |t| {
                if t.status != expected {
                    return Err(invalid_task_move(t.status, to));
                }
                t.status = to;
                mutate(t);
                Ok(t.clone())
            })
            .ok_or_else(|| WorkflowError::not_found("task_assignment", id))?;
        result
    }
}

fn invalid_task_move(from: TaskStatus, to: TaskStatus) -> WorkflowError {
    WorkflowError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
        role: "task".into(),
    }
}
