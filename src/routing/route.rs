//! Route model: the declarative definition and its compiled form.

use axum::http::uri::{Authority, Scheme};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::routing::context::RequestContext;
use crate::routing::predicate::{AndPredicate, Predicate, PredicateDefinition};

/// Declarative route supplied by configuration.
///
/// Immutable once handed to the locator factory. An empty predicate list
/// means the route matches every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Stable identifier, unique within one locator.
    pub id: String,

    /// Conditions combined with AND semantics.
    #[serde(default)]
    pub predicates: Vec<PredicateDefinition>,

    /// Absolute http/https URI of the backend this route forwards to.
    pub target_uri: String,

    /// Priority; lower value wins. Ties keep definition order.
    #[serde(default)]
    pub order: i32,
}

/// Compiled route.
///
/// Immutable after construction; one instance is evaluated by any number
/// of concurrent requests.
#[derive(Debug)]
pub struct Route {
    id: String,
    target: Url,
    scheme: Scheme,
    authority: Authority,
    order: i32,
    predicate: AndPredicate,
}

impl Route {
    pub(crate) fn new(
        id: String,
        target: Url,
        scheme: Scheme,
        authority: Authority,
        order: i32,
        predicate: AndPredicate,
    ) -> Self {
        Self {
            id,
            target,
            scheme,
            authority,
            order,
            predicate,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Target scheme, pre-parsed for request rewriting.
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Target authority, pre-parsed for request rewriting.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    /// Evaluate the composite predicate against a request.
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        self.predicate.matches(ctx)
    }
}
