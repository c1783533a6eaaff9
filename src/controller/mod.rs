//! # Controller
//!
//! Core controller modules for the Cloudflare Configurator.
//!
//! - `dns`: cluster DNS fallback for the resolver hint
//! - `reconciler`: snapshot, planning, and execution of a reconciliation pass

pub mod dns;
pub mod reconciler;
