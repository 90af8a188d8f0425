//! Lightweight API Gateway Library
//!
//! The routing core lives in [`routing`]: declarative route definitions
//! made of named predicates are compiled through an extensible factory
//! registry into an immutable, priority-ordered route locator, matched
//! per request with first-match-wins semantics and swapped as a whole on
//! configuration reload. Everything else is the operational shell around
//! it.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use routing::{
    PredicateRegistry, RequestContext, RouteDefinition, RouteLocator, RouteLocatorFactory,
};
