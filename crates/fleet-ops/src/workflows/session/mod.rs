//! Per-request workflow sessions.
//!
//! A session walks `Pending → Processing → Resolved` and nothing else. The
//! state machine itself is synchronous and side-effect free; the
//! [`ProgressTicker`] drives the processing counter on a timer and hands the
//! resolution back to whoever owns the session.

mod machine;
mod ticker;

pub use machine::{
    Resolution, SessionError, SessionId, SessionPhase, TickOutcome, WorkflowKind, WorkflowSession,
    WorkflowSubject,
};
pub use ticker::{ProgressDriver, ProgressTicker};
