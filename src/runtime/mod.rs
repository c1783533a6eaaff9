//! # Runtime
//!
//! Host-side plumbing around the reconciler.
//!
//! - `pass`: one trigger handled against the state file
//! - `watch_loop`: serialized trigger queue fed by a resync timer and a state file poller

pub mod pass;
pub mod watch_loop;

pub use pass::{get_ingress_data, handle_trigger, run_pass};
pub use watch_loop::{run_watch_loop, spawn_shutdown_signal};
