//! Predicate model.
//!
//! # Responsibilities
//! - Declarative predicate definitions (kind name + raw argument string)
//! - The `Predicate` trait: a pure request → bool condition
//! - Built-in matcher kinds (Path, Method, Header, Query, Cookie, Host)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Predicates are stateless and reentrant; evaluation never errors —
//!   a missing header/query parameter/cookie is a false outcome
//! - Argument problems surface at construction time, before any route
//!   is published
//! - Value patterns are anchored regexes: they must match the whole value

use std::fmt;
use std::sync::OnceLock;

use axum::http::Method;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::context::RequestContext;
use crate::routing::pattern::PathPattern;

/// Errors raised while turning a definition into a compiled predicate.
///
/// These are configuration-time errors; per-request evaluation never fails.
#[derive(Debug, Error)]
pub enum PredicateError {
    #[error("predicate name must not be empty")]
    EmptyName,
    #[error("{kind} predicate expects {expected} argument(s), got {got}")]
    ArgumentCount {
        kind: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("'{0}' is not a standard HTTP method")]
    InvalidMethod(String),
    #[error("invalid value pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Declarative description of one matching condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredicateDefinition {
    /// Matcher kind, resolved through the predicate registry.
    pub name: String,

    /// Raw comma-separated arguments.
    #[serde(default)]
    pub args: String,

    #[serde(skip)]
    parsed: OnceLock<Vec<String>>,
}

impl PredicateDefinition {
    /// Create a definition, rejecting an empty kind name.
    pub fn new(name: impl Into<String>, args: impl Into<String>) -> Result<Self, PredicateError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PredicateError::EmptyName);
        }
        Ok(Self {
            name,
            args: args.into(),
            parsed: OnceLock::new(),
        })
    }

    /// Argument tokens: comma-split, trimmed, empty tokens dropped, order
    /// preserved. Computed once and memoized; a pure function of `args`.
    pub fn parsed_args(&self) -> &[String] {
        self.parsed.get_or_init(|| {
            self.args
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(String::from)
                .collect()
        })
    }
}

/// A compiled matching condition.
///
/// Implementations hold no mutable state and may be evaluated concurrently
/// by any number of in-flight requests.
pub trait Predicate: Send + Sync + fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, ctx: &RequestContext) -> bool;
}

/// Matches the request path against one or more glob patterns.
#[derive(Debug)]
pub struct PathPredicate {
    patterns: Vec<PathPattern>,
}

impl PathPredicate {
    pub fn new(args: &[String]) -> Result<Self, PredicateError> {
        if args.is_empty() {
            return Err(PredicateError::ArgumentCount {
                kind: "Path",
                expected: "one or more",
                got: 0,
            });
        }
        Ok(Self {
            patterns: args.iter().map(|p| PathPattern::parse(p)).collect(),
        })
    }
}

impl Predicate for PathPredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        self.patterns.iter().any(|p| p.matches(ctx.path()))
    }
}

/// Matches the request method against one or more verbs, case-insensitive.
#[derive(Debug)]
pub struct MethodPredicate {
    methods: Vec<Method>,
}

impl MethodPredicate {
    pub fn new(args: &[String]) -> Result<Self, PredicateError> {
        if args.is_empty() {
            return Err(PredicateError::ArgumentCount {
                kind: "Method",
                expected: "one or more",
                got: 0,
            });
        }
        let methods = args
            .iter()
            .map(|token| parse_method(token))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { methods })
    }
}

impl Predicate for MethodPredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        self.methods.iter().any(|m| m == ctx.method())
    }
}

/// Only the standard verbs are accepted; anything else is a config error.
fn parse_method(token: &str) -> Result<Method, PredicateError> {
    match token.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "HEAD" => Ok(Method::HEAD),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        "CONNECT" => Ok(Method::CONNECT),
        "OPTIONS" => Ok(Method::OPTIONS),
        "TRACE" => Ok(Method::TRACE),
        "PATCH" => Ok(Method::PATCH),
        _ => Err(PredicateError::InvalidMethod(token.to_string())),
    }
}

/// Matches when the named header is present and, if a pattern was given,
/// any of its values matches it.
#[derive(Debug)]
pub struct HeaderPredicate {
    name: String,
    value: Option<Regex>,
}

impl HeaderPredicate {
    pub fn new(args: &[String]) -> Result<Self, PredicateError> {
        match args {
            [name] => Ok(Self {
                name: name.clone(),
                value: None,
            }),
            [name, pattern] => Ok(Self {
                name: name.clone(),
                value: Some(compile_value_pattern(pattern)?),
            }),
            _ => Err(PredicateError::ArgumentCount {
                kind: "Header",
                expected: "one or two",
                got: args.len(),
            }),
        }
    }
}

impl Predicate for HeaderPredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        match &self.value {
            None => ctx.header(&self.name).is_some(),
            Some(pattern) => ctx.header_all(&self.name).any(|v| pattern.is_match(v)),
        }
    }
}

/// Matches when the named query parameter is present and, if a pattern was
/// given, its first value matches it.
#[derive(Debug)]
pub struct QueryPredicate {
    name: String,
    value: Option<Regex>,
}

impl QueryPredicate {
    pub fn new(args: &[String]) -> Result<Self, PredicateError> {
        match args {
            [name] => Ok(Self {
                name: name.clone(),
                value: None,
            }),
            [name, pattern] => Ok(Self {
                name: name.clone(),
                value: Some(compile_value_pattern(pattern)?),
            }),
            _ => Err(PredicateError::ArgumentCount {
                kind: "Query",
                expected: "one or two",
                got: args.len(),
            }),
        }
    }
}

impl Predicate for QueryPredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        match (ctx.query(&self.name), &self.value) {
            (Some(_), None) => true,
            (Some(value), Some(pattern)) => pattern.is_match(value),
            (None, _) => false,
        }
    }
}

/// Matches when any cookie with the given name has a value matching the
/// pattern. Multiple cookies may legally share a name.
#[derive(Debug)]
pub struct CookiePredicate {
    name: String,
    value: Regex,
}

impl CookiePredicate {
    pub fn new(args: &[String]) -> Result<Self, PredicateError> {
        match args {
            [name, pattern] => Ok(Self {
                name: name.clone(),
                value: compile_value_pattern(pattern)?,
            }),
            _ => Err(PredicateError::ArgumentCount {
                kind: "Cookie",
                expected: "two",
                got: args.len(),
            }),
        }
    }
}

impl Predicate for CookiePredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        ctx.cookies(&self.name).any(|v| self.value.is_match(v))
    }
}

/// Matches the request host against one or more names, case-insensitive.
#[derive(Debug)]
pub struct HostPredicate {
    hosts: Vec<String>,
}

impl HostPredicate {
    pub fn new(args: &[String]) -> Result<Self, PredicateError> {
        if args.is_empty() {
            return Err(PredicateError::ArgumentCount {
                kind: "Host",
                expected: "one or more",
                got: 0,
            });
        }
        Ok(Self {
            hosts: args.iter().map(|h| h.to_lowercase()).collect(),
        })
    }
}

impl Predicate for HostPredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        self.hosts
            .iter()
            .any(|h| ctx.host().eq_ignore_ascii_case(h))
    }
}

/// Combines predicates with AND semantics. An empty set matches everything.
#[derive(Debug)]
pub struct AndPredicate {
    predicates: Vec<Box<dyn Predicate>>,
}

impl AndPredicate {
    pub fn new(predicates: Vec<Box<dyn Predicate>>) -> Self {
        Self { predicates }
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl Predicate for AndPredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        self.predicates.iter().all(|p| p.matches(ctx))
    }
}

/// Patterns must match the entire value, not a substring of it.
fn compile_value_pattern(pattern: &str) -> Result<Regex, PredicateError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| PredicateError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
