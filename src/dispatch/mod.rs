//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch(request_key, deadline, perform)
//!     → selector snapshot (read once per call)
//!     → select(request_key, attempt) → perform(node)
//!     → success: return
//!     → hard timeout: return the error
//!     → other error: attempt + 1, next node, until every node was tried
//!     → outcome reported to the health monitor (optional)
//! ```
//!
//! # Design Decisions
//! - One snapshot per request: membership changes never reshuffle a
//!   rotation that is already in progress
//! - Deadlines are cooperative and checked before every attempt
//! - No backoff between attempts: the next attempt goes to a different node

pub mod dispatcher;

pub use dispatcher::{Dispatcher, ErrorSink};
