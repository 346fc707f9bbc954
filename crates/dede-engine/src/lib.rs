//! # dede-engine — Workflow Orchestration for DEDE Licensing
//!
//! The orchestration engine behind the energy-production permit process:
//! role-gated transitions with their side-effect fan-out, task
//! assignments, deadline reminders with automatic overdue enforcement,
//! durable-first notification delivery with live push, and the
//! append-only flow log.
//!
//! ## Services
//!
//! - [`WorkflowTransitionService`] — validates a transition against the
//!   table from `dede-workflow`, applies it atomically to the stored
//!   record, and fans out the side effects (flow log, task, reminder,
//!   notification).
//! - [`TaskAssignmentService`] — lifecycle of work items handed to
//!   inspectors and reviewers.
//! - [`DeadlineService`] — the overdue sweep: warnings at fixed
//!   look-ahead windows, forced auto-overdue transitions, loop-and-log
//!   error policy.
//! - [`NotificationService`] — per-user, per-role, and broadcast
//!   delivery; durable record first, best-effort live push second.
//! - [`SweepScheduler`] — tokio interval tasks driving the two periodic
//!   processes.
//!
//! ## Consistency Model
//!
//! One persisted record per request is the unit of consistency. The
//! transition service's precondition check runs under the store's write
//! lock, so two transitions racing on the same request resolve to one
//! winner and one `InvalidTransition`. Side effects after the primary
//! write are eventual: failures are logged, never rolled back.
//!
//! Persistence itself is out of scope — the in-memory stores present the
//! repository surface a transactional record store would.

pub mod audit;
pub mod engine;
pub mod notify;
pub mod reminder;
pub mod request;
pub mod scheduler;
pub mod store;
pub mod sweep;
pub mod tasks;
pub mod transition;

// -- Re-exports ---------------------------------------------------------------

pub use audit::{FlowLog, FlowLogEntry};
pub use engine::Engine;
pub use notify::{
    ConnectionId, ConnectionRegistry, InMemoryRoleDirectory, Notification, NotificationDraft,
    NotificationKind, NotificationPriority, NotificationService, Recipient, RoleDirectory,
};
pub use reminder::{DeadlineReminder, ReminderStatus, ReminderStore};
pub use request::{LicensePayload, LicenseRequest, RequestStore};
pub use scheduler::{SchedulerHandles, SweepConfig, SweepScheduler};
pub use store::Store;
pub use sweep::{DeadlineService, SweepReport};
pub use tasks::{
    AssignTask, TaskAssignment, TaskAssignmentService, TaskPriority, TaskStatus, TaskType,
};
pub use transition::{TransitionCommand, WorkflowTransitionService};
