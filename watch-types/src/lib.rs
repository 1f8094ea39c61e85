//! # watch-types
//!
//! Data model shared by the navy convoy watcher crates.
//!
//! - [`RawEvent`], [`ContainerEvent`], [`MutationEvent`] - What the two feeds deliver
//! - [`ResolvedIdentity`] - Name and environment looked up for a container id
//! - [`ConvoyRequest`] - Documents pushed onto the orchestrator queue
//! - [`seconds`], [`millis`] - Plain duration constructors for expectation windows
//! - [`WatchError`], [`FailureReport`] - Error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod events;
mod identity;
mod request;
mod time;

pub use error::{FailureReport, WatchError};
pub use events::{parent_key, ContainerEvent, MutationEvent, RawEvent, SourceKind};
pub use identity::{ResolvedIdentity, UNKNOWN_NAME};
pub use request::{ConvoyRequest, RequestKind, CONVOY_QUEUE};
pub use time::{millis, seconds};
