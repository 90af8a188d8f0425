//! Routing engine.
//!
//! # Data Flow
//! ```text
//! Route Definitions (from configuration)
//!     → registry.rs (resolve predicate kinds to factories)
//!     → locator.rs (compile, validate, sort by order)
//!     → RouteLocator (immutable snapshot, swapped as a whole on reload)
//!
//! Per request:
//!     Request parts
//!     → context.rs (immutable RequestContext)
//!     → locator.find() (evaluate predicates in priority order)
//!     → Return: matched Route or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime (thread-safe without locks)
//! - No regex in the path hot path (segment globs only); value patterns
//!   are anchored regexes compiled at configuration time
//! - Deterministic: same input always matches same route
//! - First match wins, ordered by `order` ascending, ties by definition order
//! - Reload builds a brand-new locator and swaps the snapshot atomically

pub mod context;
pub mod locator;
pub mod pattern;
pub mod predicate;
pub mod registry;
pub mod route;

pub use context::RequestContext;
pub use locator::{CompileError, RouteLocator, RouteLocatorFactory, SharedRouteLocator};
pub use pattern::PathPattern;
pub use predicate::{AndPredicate, Predicate, PredicateDefinition, PredicateError};
pub use registry::{PredicateFactory, PredicateRegistry};
pub use route::{Route, RouteDefinition};
