//! Cloudflare Configurator Library
//!
//! Keeps a Cloudflare tunnel token and the public tunnel URL in sync with the
//! two relations that consume them: `cloudflared-route` (token, handed over as
//! a secret reference, plus a resolver hint) and `ingress` (published URL).
//!
//! ## Quick Start
//!
//! ```rust
//! use cloudflare_configurator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod relation;
pub mod runtime;
pub mod server;
