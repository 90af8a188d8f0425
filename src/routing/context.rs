//! Per-request view of the incoming request.
//!
//! # Responsibilities
//! - Snapshot the routing-relevant parts of a request (host, path, method,
//!   headers, query parameters, cookies)
//! - Case-insensitive header lookup, single and multi-value
//! - First-value query lookup
//! - Multi-value cookie lookup (duplicate cookie names are legal)
//!
//! # Design Decisions
//! - Built once by the HTTP layer, never mutated afterwards
//! - Query string and cookies parsed eagerly so predicates never re-parse
//! - Non-UTF-8 header values are absent from string lookups, not an error

use axum::http::header::{COOKIE, HOST};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method};

/// Immutable snapshot of an inbound request, consumed by predicates.
#[derive(Debug, Clone)]
pub struct RequestContext {
    host: String,
    path: String,
    method: Method,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
}

impl RequestContext {
    /// Build a context from request parts.
    ///
    /// The host comes from the `Host` header, falling back to the URI
    /// authority for HTTP/2-style requests.
    pub fn from_parts(parts: &Parts) -> Self {
        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or_default()
            .to_string();

        let query = parts
            .uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self {
            host,
            path: parts.uri.path().to_string(),
            method: parts.method.clone(),
            headers: parts.headers.clone(),
            query,
            cookies: parse_cookies(&parts.headers),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// First value of the named header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of the named header, case-insensitive.
    pub fn header_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }

    /// First value of the named query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Values of every cookie sharing the given name.
    pub fn cookies<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.cookies
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Collect name/value pairs from every `Cookie` header on the request.
fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    let mut cookies = Vec::new();
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                cookies.push((name.trim().to_string(), value.trim().to_string()));
            }
        }
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn context(request: Request<()>) -> RequestContext {
        let (parts, _) = request.into_parts();
        RequestContext::from_parts(&parts)
    }

    #[test]
    fn test_host_from_header() {
        let ctx = context(
            Request::builder()
                .uri("/api")
                .header("Host", "api.example.com")
                .body(())
                .unwrap(),
        );
        assert_eq!(ctx.host(), "api.example.com");
    }

    #[test]
    fn test_host_falls_back_to_authority() {
        let ctx = context(
            Request::builder()
                .uri("http://backend.local:8080/api")
                .body(())
                .unwrap(),
        );
        assert_eq!(ctx.host(), "backend.local:8080");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let ctx = context(
            Request::builder()
                .uri("/")
                .header("X-Env", "prod")
                .body(())
                .unwrap(),
        );
        assert_eq!(ctx.header("x-env"), Some("prod"));
        assert_eq!(ctx.header("X-ENV"), Some("prod"));
        assert_eq!(ctx.header("x-missing"), None);
    }

    #[test]
    fn test_header_all_returns_every_value() {
        let ctx = context(
            Request::builder()
                .uri("/")
                .header("Accept", "text/html")
                .header("Accept", "application/json")
                .body(())
                .unwrap(),
        );
        let values: Vec<&str> = ctx.header_all("accept").collect();
        assert_eq!(values, vec!["text/html", "application/json"]);
    }

    #[test]
    fn test_query_returns_first_value() {
        let ctx = context(
            Request::builder()
                .uri("/search?q=first&q=second&page=2")
                .body(())
                .unwrap(),
        );
        assert_eq!(ctx.query("q"), Some("first"));
        assert_eq!(ctx.query("page"), Some("2"));
        assert_eq!(ctx.query("missing"), None);
    }

    #[test]
    fn test_query_decodes_percent_encoding() {
        let ctx = context(Request::builder().uri("/?name=a%20b").body(()).unwrap());
        assert_eq!(ctx.query("name"), Some("a b"));
    }

    #[test]
    fn test_cookies_with_duplicate_names() {
        let ctx = context(
            Request::builder()
                .uri("/")
                .header("Cookie", "session=abc; theme=dark")
                .header("Cookie", "session=def")
                .body(())
                .unwrap(),
        );
        let sessions: Vec<&str> = ctx.cookies("session").collect();
        assert_eq!(sessions, vec!["abc", "def"]);
        let themes: Vec<&str> = ctx.cookies("theme").collect();
        assert_eq!(themes, vec!["dark"]);
        assert_eq!(ctx.cookies("missing").count(), 0);
    }

    #[test]
    fn test_path_and_method() {
        let ctx = context(
            Request::builder()
                .method(Method::POST)
                .uri("/api/users?limit=10")
                .body(())
                .unwrap(),
        );
        assert_eq!(ctx.path(), "/api/users");
        assert_eq!(ctx.method(), &Method::POST);
    }
}
