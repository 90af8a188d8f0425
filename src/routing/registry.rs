//! Predicate factory registry.
//!
//! # Responsibilities
//! - Map a matcher-kind name to a factory producing compiled predicates
//! - Ship the built-in kinds; accept new ones via `register`
//!
//! # Design Decisions
//! - Populated at startup, then handed to the locator factory and never
//!   mutated while requests are served; a plain HashMap is sufficient
//! - Kind names resolve case-sensitively
//! - An unresolved kind is reported by the compiling call, not swallowed

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::routing::predicate::{
    CookiePredicate, HeaderPredicate, HostPredicate, MethodPredicate, PathPredicate, Predicate,
    PredicateError, QueryPredicate,
};

/// Turns parsed argument tokens into a compiled predicate.
pub type PredicateFactory =
    Arc<dyn Fn(&[String]) -> Result<Box<dyn Predicate>, PredicateError> + Send + Sync>;

/// Registry of predicate kinds, open for extension at startup.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    factories: HashMap<String, PredicateFactory>,
}

impl PredicateRegistry {
    /// An empty registry with no kinds at all.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry holding the built-in kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("Path", |args| {
            Ok(Box::new(PathPredicate::new(args)?) as Box<dyn Predicate>)
        });
        registry.register("Method", |args| {
            Ok(Box::new(MethodPredicate::new(args)?) as Box<dyn Predicate>)
        });
        registry.register("Header", |args| {
            Ok(Box::new(HeaderPredicate::new(args)?) as Box<dyn Predicate>)
        });
        registry.register("Query", |args| {
            Ok(Box::new(QueryPredicate::new(args)?) as Box<dyn Predicate>)
        });
        registry.register("Cookie", |args| {
            Ok(Box::new(CookiePredicate::new(args)?) as Box<dyn Predicate>)
        });
        registry.register("Host", |args| {
            Ok(Box::new(HostPredicate::new(args)?) as Box<dyn Predicate>)
        });
        registry
    }

    /// Register a factory for a kind. Later registrations under the same
    /// name replace earlier ones.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&[String]) -> Result<Box<dyn Predicate>, PredicateError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Look up the factory for a kind.
    pub fn resolve(&self, kind: &str) -> Option<&PredicateFactory> {
        self.factories.get(kind)
    }

    /// The registered kind names, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.kinds().collect();
        kinds.sort_unstable();
        f.debug_struct("PredicateRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
