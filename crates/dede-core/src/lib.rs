//! # dede-core — Foundational Types for the DEDE Licensing Stack
//!
//! This crate is the bedrock of the licensing workflow engine. It defines
//! the primitives every other crate in the workspace depends on; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain identifiers.** `RequestId`, `UserId`,
//!    `TaskId`, `ReminderId`, `NotificationId` — all UUID newtypes. You
//!    cannot pass a task id where a request id is expected.
//!
//! 2. **Closed role set.** `Role` is an exhaustive enum over the six roles
//!    the approval process knows about. No bare strings for roles.
//!
//! 3. **Explicit system actor.** `Actor::System` replaces the nullable
//!    "changed_by" convention — an automatic transition is a first-class
//!    value, not a null.
//!
//! 4. **UTC-only timestamps.** `Timestamp` enforces UTC with seconds
//!    precision, so deadline arithmetic and serialized records are
//!    deterministic across hosts.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dede-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod actor;
pub mod error;
pub mod identity;
pub mod license_type;
pub mod role;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use actor::Actor;
pub use error::{SweepError, WorkflowError};
pub use identity::{NotificationId, ReminderId, RequestId, TaskId, UserId};
pub use license_type::LicenseType;
pub use role::Role;
pub use temporal::Timestamp;
