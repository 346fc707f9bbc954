//! # Engine Facade
//!
//! Wires the stores and services into one handle. The excluded HTTP
//! layer (and the demo CLI) talks to the engine through this type; tests
//! use it to get a fully-wired engine in one call.

use std::sync::Arc;

use dede_workflow::TransitionTable;

use crate::audit::FlowLog;
use crate::notify::{NotificationService, RoleDirectory};
use crate::reminder::ReminderStore;
use crate::request::RequestStore;
use crate::sweep::DeadlineService;
use crate::tasks::TaskAssignmentService;
use crate::transition::WorkflowTransitionService;

/// A fully-wired workflow engine over in-memory stores.
///
/// Cloneable; clones share the same underlying stores.
#[derive(Clone)]
pub struct Engine {
    table: TransitionTable,
    requests: RequestStore,
    flow_log: FlowLog,
    reminders: ReminderStore,
    tasks: TaskAssignmentService,
    transitions: WorkflowTransitionService,
    deadlines: DeadlineService,
    notifications: NotificationService,
}

impl Engine {
    /// Build an engine with the standard transition table and the given
    /// role directory.
    pub fn new(directory: Arc<dyn RoleDirectory>) -> Self {
        let table = TransitionTable::standard();
        let requests = RequestStore::new();
        let flow_log = FlowLog::new();
        let reminders = ReminderStore::new();
        let notifications = NotificationService::new(directory);
        let tasks = TaskAssignmentService::new(notifications.clone());
        let transitions = WorkflowTransitionService::new(
            table,
            requests.clone(),
            flow_log.clone(),
            tasks.clone(),
            reminders.clone(),
            notifications.clone(),
        );
        let deadlines = DeadlineService::new(
            table,
            requests.clone(),
            reminders.clone(),
            tasks.clone(),
            flow_log.clone(),
            transitions.clone(),
            notifications.clone(),
        );
        Self {
            table,
            requests,
            flow_log,
            reminders,
            tasks,
            transitions,
            deadlines,
            notifications,
        }
    }

    /// The transition table.
    pub fn table(&self) -> TransitionTable {
        self.table
    }

    /// The license-request repository.
    pub fn requests(&self) -> &RequestStore {
        &self.requests
    }

    /// The append-only flow log.
    pub fn flow_log(&self) -> &FlowLog {
        &self.flow_log
    }

    /// The deadline-reminder table.
    pub fn reminders(&self) -> &ReminderStore {
        &self.reminders
    }

    /// Task-assignment lifecycle operations.
    pub fn tasks(&self) -> &TaskAssignmentService {
        &self.tasks
    }

    /// The transition service.
    pub fn transitions(&self) -> &WorkflowTransitionService {
        &self.transitions
    }

    /// The deadline service / overdue sweep.
    pub fn deadlines(&self) -> &DeadlineService {
        &self.deadlines
    }

    /// Notification delivery and queries.
    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }
}
