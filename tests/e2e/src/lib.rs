//! # navy-e2e
//!
//! Live end-to-end scenarios for the navy orchestrator.
//!
//! Every scenario starts a suite (two watchers that only exist to know what
//! to clean up), runs one test case against a freshly named convoy, verifies
//! its expectations and removes whatever the run created.
//!
//! All scenarios are `#[ignore]`d: they need a container runtime, etcd and a
//! running orchestrator. Run them with
//!
//! ```bash
//! ETCD_PORT_4001_TCP_ADDR=172.17.0.3 cargo test -p navy-e2e -- --ignored
//! ```
//!
//! Scenarios take turns: a suite's teardown reaps everything it saw, so
//! [`harness::scenario`] holds a process-wide slot for the whole run.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod harness;

pub mod scenarios;
