//! Stack model: routes, middleware and routers composed into a tree.
//!
//! # Responsibilities
//! - Represent the three node kinds as one closed enum
//! - Provide the registration surface (`get`, `post`, `nest`, ...)
//! - Validate path patterns at registration time
//!
//! # Design Decisions
//! - Built once at startup, read-only afterwards; shared through `Arc`
//!   without locking
//! - Route-level middleware is appended to the owning router's sequence,
//!   right before the route itself
//! - Registration panics on an invalid pattern: it is a programming error

use std::sync::Arc;

use crate::http::error::HandlerResult;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::routing::path::validate_path;

/// A middleware or route handler.
pub type Handler = Arc<dyn Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync>;

/// A route leaf: method + pattern + handler.
#[derive(Clone)]
pub struct Route {
    pub method: String,
    pub path: String,
    pub handler: Handler,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// A middleware leaf. Runs for every request that reaches it during resolution.
#[derive(Clone)]
pub struct Middleware {
    pub handler: Handler,
}

impl Middleware {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// One element of the composition tree.
#[derive(Debug, Clone)]
pub enum StackNode {
    Route(Route),
    Middleware(Middleware),
    Router(Router),
}

/// An ordered sequence of nodes mounted under a path prefix.
///
/// The root router (prefix `/`) plays the role of the server's own stack.
#[derive(Debug, Clone)]
pub struct Router {
    prefix: String,
    stack: Vec<StackNode>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            prefix: "/".to_string(),
            stack: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn stack(&self) -> &[StackNode] {
        &self.stack
    }

    /// Append a middleware to this router's sequence.
    pub fn middleware<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.layer(Middleware::new(handler))
    }

    /// Append an already-built (possibly shared) middleware.
    pub fn layer(mut self, middleware: Middleware) -> Self {
        self.stack.push(StackNode::Middleware(middleware));
        self
    }

    /// Mount `router` under `prefix`.
    ///
    /// # Panics
    ///
    /// Panics if `prefix` is not a valid path pattern.
    pub fn nest(mut self, prefix: &str, mut router: Router) -> Self {
        if let Err(e) = validate_path(prefix) {
            panic!("invalid router prefix: {e}");
        }
        router.prefix = prefix.to_string();
        self.stack.push(StackNode::Router(router));
        self
    }

    /// Register a route for `method`.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid path pattern.
    pub fn route<F>(self, method: &str, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route_with(method, path, handler, Vec::new())
    }

    /// Register a route preceded by route-level middleware.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid path pattern.
    pub fn route_with<F, I>(mut self, method: &str, path: &str, handler: F, middleware: I) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
        I: IntoIterator<Item = Middleware>,
    {
        if let Err(e) = validate_path(path) {
            panic!("invalid route path: {e}");
        }
        self.stack
            .extend(middleware.into_iter().map(StackNode::Middleware));
        self.stack.push(StackNode::Route(Route {
            method: method.to_string(),
            path: path.to_string(),
            handler: Arc::new(handler),
        }));
        self
    }

    pub fn get<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route("GET", path, handler)
    }

    pub fn post<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route("POST", path, handler)
    }

    pub fn put<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route("PUT", path, handler)
    }

    pub fn patch<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route("PATCH", path, handler)
    }

    pub fn delete<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route("DELETE", path, handler)
    }

    pub fn get_with<F, I>(self, path: &str, handler: F, middleware: I) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
        I: IntoIterator<Item = Middleware>,
    {
        self.route_with("GET", path, handler, middleware)
    }

    pub fn post_with<F, I>(self, path: &str, handler: F, middleware: I) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
        I: IntoIterator<Item = Middleware>,
    {
        self.route_with("POST", path, handler, middleware)
    }

    pub fn put_with<F, I>(self, path: &str, handler: F, middleware: I) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
        I: IntoIterator<Item = Middleware>,
    {
        self.route_with("PUT", path, handler, middleware)
    }

    pub fn patch_with<F, I>(self, path: &str, handler: F, middleware: I) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
        I: IntoIterator<Item = Middleware>,
    {
        self.route_with("PATCH", path, handler, middleware)
    }

    pub fn delete_with<F, I>(self, path: &str, handler: F, middleware: I) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
        I: IntoIterator<Item = Middleware>,
    {
        self.route_with("DELETE", path, handler, middleware)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_: &mut Request, _: &mut Response) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn registration_appends_in_order() {
        let router = Router::new()
            .middleware(ok)
            .get("/a", ok)
            .post_with("/b", ok, [Middleware::new(ok)])
            .nest("/api", Router::new().delete("/c", ok));

        let kinds: Vec<_> = router
            .stack()
            .iter()
            .map(|node| match node {
                StackNode::Route(r) => format!("{} {}", r.method, r.path),
                StackNode::Middleware(_) => "mw".to_string(),
                StackNode::Router(r) => format!("router {}", r.prefix()),
            })
            .collect();

        assert_eq!(kinds, ["mw", "GET /a", "mw", "POST /b", "router /api"]);
        assert_eq!(router.prefix(), "/");
    }

    #[test]
    fn every_method_accepts_route_middleware() {
        let router = Router::new()
            .get_with("/r", ok, [Middleware::new(ok)])
            .put_with("/r", ok, [Middleware::new(ok)])
            .patch_with("/r", ok, [Middleware::new(ok), Middleware::new(ok)])
            .delete_with("/r", ok, Vec::new());

        let kinds: Vec<_> = router
            .stack()
            .iter()
            .map(|node| match node {
                StackNode::Route(r) => r.method.clone(),
                StackNode::Middleware(_) => "mw".to_string(),
                StackNode::Router(_) => "router".to_string(),
            })
            .collect();

        assert_eq!(kinds, ["mw", "GET", "mw", "PUT", "mw", "mw", "PATCH", "DELETE"]);
    }

    #[test]
    #[should_panic(expected = "must start with /")]
    fn relative_route_path_panics() {
        let _ = Router::new().get("users", ok);
    }

    #[test]
    #[should_panic(expected = "path traversal")]
    fn traversal_prefix_panics() {
        let _ = Router::new().nest("/static/..", Router::new());
    }
}
