//! # dede-workflow — The Licensing Status Machine
//!
//! The pure state-machine layer of the licensing stack. Defines the
//! request status enum and the immutable transition table that encodes
//! which `(status, status)` moves are legal, which role each move
//! requires, and the deadline and progress metadata attached to each
//! status.
//!
//! ## Design
//!
//! The table is a fixed, hard-coded graph for one specific approval
//! process — not a rule language. It is statically constructed, holds no
//! mutable state, and performs no I/O, so every contract in this crate
//! is exhaustively table-testable.
//!
//! The orchestration services in `dede-engine` receive a
//! [`TransitionTable`] by value (it is a zero-cost handle over static
//! data); there is no global singleton to mutate.

pub mod status;
pub mod table;

// ─── Re-exports ─────────────────────────────────────────────────────

pub use status::RequestStatus;
pub use table::{DeadlineType, TransitionEdge, TransitionTable};
