//! CLI command implementations.

pub mod queue;
pub mod watch;
