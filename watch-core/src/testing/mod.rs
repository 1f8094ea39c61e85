//! In-memory feeds, resolvers and reapers for exercising the engine.
//!
//! Patterned on a mock transport: shared `Arc<Mutex<..>>` state so a clone
//! handed to a watcher can still be scripted and inspected by the test.

mod reaper;
mod resolver;
mod source;

pub use reaper::RecordingReaper;
pub use resolver::StaticResolver;
pub use source::{BroadcastSource, ScriptedSource};
