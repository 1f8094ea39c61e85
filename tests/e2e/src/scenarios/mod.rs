//! Convoy scenarios, one module per orchestrator behaviour.
//!
//! - `launch_manifest` - Desired state written, container started
//! - `dependencies` - Dependents wait for, then follow, their dependencies
//! - `linked_apps` - Linked apps are created with proxy host variables
//! - `recovering_container` - Vanished containers come back, pre-tasks don't
//! - `terminate_convoy` - Destroy removes state and containers

pub mod dependencies;
pub mod launch_manifest;
pub mod linked_apps;
pub mod recovering_container;
pub mod terminate_convoy;
