//! # dede-cli — Licensing Workflow Operator CLI
//!
//! Small operator surface over the workflow engine. Useful for kicking
//! the tires locally and for manually triggering a sweep pass against a
//! seeded engine.
//!
//! ## Subcommands
//!
//! - `demo` — seed an in-memory engine and walk a request through the
//!   full approval path, printing the flow log and progress.
//! - `sweep` — seed an overdue scenario and run one sweep pass, printing
//!   the report.
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to `dede-engine` — no workflow logic here.

pub mod demo;
pub mod sweep;
