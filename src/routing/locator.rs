//! Route compilation and lookup.
//!
//! # Responsibilities
//! - Compile route definitions into an immutable, priority-ordered table
//! - Validate ids, predicate kinds, and target URIs (all-or-nothing)
//! - Per-request first-match lookup
//! - Atomic snapshot swap for configuration reload
//!
//! # Design Decisions
//! - A locator is either fully built or the call fails; no partial table
//!   is ever published
//! - `find` is a pure read of immutable state; concurrent callers need
//!   no locking and in-flight lookups keep their snapshot across a swap
//! - First match wins; `order` is the only tie-break mechanism and equal
//!   orders keep definition order (stable sort)

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::uri::{Authority, Scheme};
use thiserror::Error;
use url::Url;

use crate::routing::context::RequestContext;
use crate::routing::predicate::{AndPredicate, Predicate, PredicateError};
use crate::routing::registry::PredicateRegistry;
use crate::routing::route::{Route, RouteDefinition};

/// Errors raised while compiling a set of route definitions.
///
/// All of these are configuration-time faults: the operator fixes the
/// definitions and triggers a new compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("route id must not be empty")]
    EmptyRouteId,
    #[error("duplicate route id '{0}'")]
    DuplicateRouteId(String),
    #[error("route '{route_id}': predicate name must not be empty")]
    EmptyPredicateName { route_id: String },
    #[error("route '{route_id}': unknown predicate kind '{kind}'")]
    UnknownPredicateKind { route_id: String, kind: String },
    #[error("route '{route_id}': {kind} predicate: {source}")]
    InvalidPredicate {
        route_id: String,
        kind: String,
        #[source]
        source: PredicateError,
    },
    #[error("route '{route_id}': invalid target URI '{uri}': {reason}")]
    InvalidTargetUri {
        route_id: String,
        uri: String,
        reason: String,
    },
}

/// Compiles route definitions into locators, resolving predicate kinds
/// through its registry.
///
/// The registry is frozen in here before any route is served; runtime
/// registration is unsupported.
#[derive(Debug)]
pub struct RouteLocatorFactory {
    registry: PredicateRegistry,
}

impl RouteLocatorFactory {
    pub fn new(registry: PredicateRegistry) -> Self {
        Self { registry }
    }

    /// A factory over the built-in predicate kinds.
    pub fn with_builtins() -> Self {
        Self::new(PredicateRegistry::with_builtins())
    }

    pub fn registry(&self) -> &PredicateRegistry {
        &self.registry
    }

    /// Compile all definitions or fail with the first offending route.
    pub fn build(&self, definitions: &[RouteDefinition]) -> Result<RouteLocator, CompileError> {
        let mut seen = HashSet::with_capacity(definitions.len());
        let mut routes = Vec::with_capacity(definitions.len());

        for definition in definitions {
            if definition.id.trim().is_empty() {
                return Err(CompileError::EmptyRouteId);
            }
            if !seen.insert(definition.id.clone()) {
                return Err(CompileError::DuplicateRouteId(definition.id.clone()));
            }
            routes.push(self.compile(definition)?);
        }

        // Stable sort: equal orders keep definition order.
        routes.sort_by_key(Route::order);

        Ok(RouteLocator {
            routes: routes.into_iter().map(Arc::new).collect(),
        })
    }

    fn compile(&self, definition: &RouteDefinition) -> Result<Route, CompileError> {
        let mut compiled: Vec<Box<dyn Predicate>> = Vec::with_capacity(definition.predicates.len());

        for predicate in &definition.predicates {
            if predicate.name.trim().is_empty() {
                return Err(CompileError::EmptyPredicateName {
                    route_id: definition.id.clone(),
                });
            }
            let factory = self.registry.resolve(&predicate.name).ok_or_else(|| {
                CompileError::UnknownPredicateKind {
                    route_id: definition.id.clone(),
                    kind: predicate.name.clone(),
                }
            })?;
            let built =
                factory(predicate.parsed_args()).map_err(|source| CompileError::InvalidPredicate {
                    route_id: definition.id.clone(),
                    kind: predicate.name.clone(),
                    source,
                })?;
            compiled.push(built);
        }

        let (target, scheme, authority) = parse_target(&definition.id, &definition.target_uri)?;

        Ok(Route::new(
            definition.id.clone(),
            target,
            scheme,
            authority,
            definition.order,
            AndPredicate::new(compiled),
        ))
    }
}

/// Parse and validate a target URI, pre-computing the parts needed to
/// rewrite forwarded requests.
fn parse_target(route_id: &str, raw: &str) -> Result<(Url, Scheme, Authority), CompileError> {
    let invalid = |reason: String| CompileError::InvalidTargetUri {
        route_id: route_id.to_string(),
        uri: raw.to_string(),
        reason,
    };

    let target = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if target.scheme() != "http" && target.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", target.scheme())));
    }
    let host = target.host_str().ok_or_else(|| invalid("missing host".to_string()))?;

    let scheme = Scheme::try_from(target.scheme()).map_err(|e| invalid(e.to_string()))?;
    let authority = match target.port() {
        Some(port) => Authority::from_str(&format!("{host}:{port}")),
        None => Authority::from_str(host),
    }
    .map_err(|e| invalid(e.to_string()))?;

    Ok((target, scheme, authority))
}

/// Immutable, priority-ordered collection of compiled routes.
#[derive(Debug)]
pub struct RouteLocator {
    routes: Vec<Arc<Route>>,
}

impl RouteLocator {
    /// First route whose composite predicate accepts the request,
    /// evaluating in ascending `order`. `None` is the normal no-route
    /// outcome, not a fault.
    pub fn find(&self, ctx: &RequestContext) -> Option<Arc<Route>> {
        self.routes.iter().find(|route| route.matches(ctx)).cloned()
    }

    /// Compiled routes in evaluation order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Atomically replaceable route-table handle.
///
/// Readers take a full snapshot; a reload builds a new locator and stores
/// it whole. In-flight lookups keep the snapshot they started with.
#[derive(Debug)]
pub struct SharedRouteLocator {
    current: ArcSwap<RouteLocator>,
}

impl SharedRouteLocator {
    pub fn new(locator: RouteLocator) -> Self {
        Self {
            current: ArcSwap::from_pointee(locator),
        }
    }

    /// The locator currently in effect.
    pub fn snapshot(&self) -> Arc<RouteLocator> {
        self.current.load_full()
    }

    /// Publish a replacement locator.
    pub fn replace(&self, locator: RouteLocator) {
        self.current.store(Arc::new(locator));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::predicate::PredicateDefinition;
    use axum::http::{Method, Request};

    fn ctx(method: Method, uri: &str) -> RequestContext {
        let (parts, _) = Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        RequestContext::from_parts(&parts)
    }

    fn def(id: &str, order: i32, predicates: &[(&str, &str)]) -> RouteDefinition {
        RouteDefinition {
            id: id.to_string(),
            predicates: predicates
                .iter()
                .map(|(name, args)| PredicateDefinition::new(*name, *args).unwrap())
                .collect(),
            target_uri: "http://127.0.0.1:9000".to_string(),
            order,
        }
    }

    #[test]
    fn test_first_match_by_order() {
        let factory = RouteLocatorFactory::with_builtins();
        // Definition order deliberately reversed relative to priority.
        let locator = factory
            .build(&[
                def("r2", 1, &[("Path", "/a")]),
                def("r1", 0, &[("Path", "/a")]),
            ])
            .unwrap();

        let matched = locator.find(&ctx(Method::GET, "/a")).unwrap();
        assert_eq!(matched.id(), "r1");
    }

    #[test]
    fn test_equal_orders_keep_definition_order() {
        let factory = RouteLocatorFactory::with_builtins();
        let locator = factory
            .build(&[
                def("first", 0, &[("Path", "/a")]),
                def("second", 0, &[("Path", "/a")]),
            ])
            .unwrap();

        let matched = locator.find(&ctx(Method::GET, "/a")).unwrap();
        assert_eq!(matched.id(), "first");
        let ids: Vec<&str> = locator.routes().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_no_match_is_none() {
        let factory = RouteLocatorFactory::with_builtins();
        let locator = factory.build(&[def("api", 0, &[("Path", "/api/**")])]).unwrap();
        assert!(locator.find(&ctx(Method::GET, "/other")).is_none());
    }

    #[test]
    fn test_empty_predicate_list_matches_everything() {
        let factory = RouteLocatorFactory::with_builtins();
        let locator = factory.build(&[def("catch-all", 100, &[])]).unwrap();
        assert!(locator.find(&ctx(Method::GET, "/")).is_some());
        assert!(locator.find(&ctx(Method::DELETE, "/deep/path?q=1")).is_some());
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let factory = RouteLocatorFactory::with_builtins();
        let locator = factory
            .build(&[def(
                "api-writes",
                0,
                &[("Path", "/api/**"), ("Method", "POST,PUT")],
            )])
            .unwrap();

        assert!(locator.find(&ctx(Method::POST, "/api/users")).is_some());
        assert!(locator.find(&ctx(Method::GET, "/api/users")).is_none());
        assert!(locator.find(&ctx(Method::POST, "/other")).is_none());
    }

    #[test]
    fn test_duplicate_id_fails_compilation() {
        let factory = RouteLocatorFactory::with_builtins();
        let result = factory.build(&[
            def("api", 0, &[("Path", "/a")]),
            def("api", 1, &[("Path", "/b")]),
        ]);
        assert!(matches!(result, Err(CompileError::DuplicateRouteId(id)) if id == "api"));
    }

    #[test]
    fn test_empty_id_fails_compilation() {
        let factory = RouteLocatorFactory::with_builtins();
        let result = factory.build(&[def("  ", 0, &[])]);
        assert!(matches!(result, Err(CompileError::EmptyRouteId)));
    }

    #[test]
    fn test_unknown_kind_fails_and_names_the_kind() {
        let factory = RouteLocatorFactory::with_builtins();
        let result = factory.build(&[def("api", 0, &[("Weight", "1")])]);
        match result {
            Err(CompileError::UnknownPredicateKind { route_id, kind }) => {
                assert_eq!(route_id, "api");
                assert_eq!(kind, "Weight");
            }
            other => panic!("expected UnknownPredicateKind, got {other:?}"),
        }
    }

    #[test]
    fn test_factory_rejection_carries_route_and_kind() {
        let factory = RouteLocatorFactory::with_builtins();
        let result = factory.build(&[def("api", 0, &[("Method", "FETCH")])]);
        match result {
            Err(CompileError::InvalidPredicate { route_id, kind, .. }) => {
                assert_eq!(route_id, "api");
                assert_eq!(kind, "Method");
            }
            other => panic!("expected InvalidPredicate, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_target_uri_fails_compilation() {
        let factory = RouteLocatorFactory::with_builtins();

        let mut bad_scheme = def("api", 0, &[]);
        bad_scheme.target_uri = "ftp://backend:21".to_string();
        assert!(matches!(
            factory.build(&[bad_scheme]),
            Err(CompileError::InvalidTargetUri { .. })
        ));

        let mut not_a_uri = def("api", 0, &[]);
        not_a_uri.target_uri = "not a uri".to_string();
        assert!(matches!(
            factory.build(&[not_a_uri]),
            Err(CompileError::InvalidTargetUri { .. })
        ));
    }

    #[test]
    fn test_custom_kind_extends_matching_without_core_changes() {
        use crate::routing::predicate::{Predicate, PredicateError};

        #[derive(Debug)]
        struct PathLongerThan(usize);
        impl Predicate for PathLongerThan {
            fn matches(&self, ctx: &RequestContext) -> bool {
                ctx.path().len() > self.0
            }
        }

        let mut registry = PredicateRegistry::with_builtins();
        registry.register("PathLongerThan", |args| {
            let limit = args
                .first()
                .and_then(|a| a.parse().ok())
                .ok_or(PredicateError::ArgumentCount {
                    kind: "PathLongerThan",
                    expected: "one numeric",
                    got: args.len(),
                })?;
            Ok(Box::new(PathLongerThan(limit)) as Box<dyn Predicate>)
        });

        let factory = RouteLocatorFactory::new(registry);
        let locator = factory
            .build(&[def("long", 0, &[("PathLongerThan", "10")])])
            .unwrap();

        assert!(locator.find(&ctx(Method::GET, "/quite/long/path")).is_some());
        assert!(locator.find(&ctx(Method::GET, "/short")).is_none());
    }

    #[test]
    fn test_snapshot_isolation_across_replace() {
        let factory = RouteLocatorFactory::with_builtins();
        let shared = SharedRouteLocator::new(
            factory.build(&[def("old", 0, &[("Path", "/old")])]).unwrap(),
        );

        // A lookup in progress holds this snapshot.
        let in_flight = shared.snapshot();

        shared.replace(factory.build(&[def("new", 0, &[("Path", "/new")])]).unwrap());

        // The old snapshot is unaffected by the swap.
        assert_eq!(in_flight.find(&ctx(Method::GET, "/old")).unwrap().id(), "old");
        assert!(in_flight.find(&ctx(Method::GET, "/new")).is_none());

        // New lookups see only the replacement.
        let current = shared.snapshot();
        assert_eq!(current.find(&ctx(Method::GET, "/new")).unwrap().id(), "new");
        assert!(current.find(&ctx(Method::GET, "/old")).is_none());
    }

    #[test]
    fn test_concurrent_lookups_are_consistent() {
        let factory = RouteLocatorFactory::with_builtins();
        let locator = Arc::new(
            factory
                .build(&[
                    def("api", 0, &[("Path", "/api/**")]),
                    def("health", -1, &[("Path", "/health")]),
                    def("catch-all", 100, &[]),
                ])
                .unwrap(),
        );

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locator = Arc::clone(&locator);
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    assert_eq!(
                        locator.find(&ctx(Method::GET, "/api/users")).unwrap().id(),
                        "api"
                    );
                    assert_eq!(
                        locator.find(&ctx(Method::GET, "/health")).unwrap().id(),
                        "health"
                    );
                    assert_eq!(
                        locator.find(&ctx(Method::GET, "/misc")).unwrap().id(),
                        "catch-all"
                    );
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
