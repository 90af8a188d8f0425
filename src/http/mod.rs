//! HTTP subsystem: the server shell that drives the routing core.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → request.rs (request id)
//!     → server.rs (build RequestContext, locator snapshot, find)
//!     → matched: rewrite URI to route target, forward via client
//!     → no match: 404 (a normal outcome, not a fault)
//! ```
//!
//! # Design Decisions
//! - One locator snapshot per request; reloads never affect an in-flight
//!   lookup
//! - The forwarding client is configured from pass-through pool settings
//!   the routing core does not interpret

pub mod request;
pub mod server;

pub use server::GatewayServer;
