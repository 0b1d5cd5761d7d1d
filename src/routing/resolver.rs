//! Resolution: request → ordered execution list.
//!
//! Depth-first over the stack tree, first match wins. Every middleware
//! encountered before the match is collected in encounter order, and the
//! matching route is appended last. Once a match is found anywhere, no
//! further nodes are visited.

use crate::http::request::{PathParams, Request};
use crate::routing::path::{join, segments};
use crate::routing::stack::{Middleware, Route, Router, StackNode};

/// One entry of the execution list.
#[derive(Debug, Clone, Copy)]
pub enum Step<'a> {
    Middleware(&'a Middleware),
    Route(&'a Route),
}

struct Walk<'a, 'r> {
    method: &'r str,
    path: &'r str,
    chain: Vec<Step<'a>>,
    matched: Option<PathParams>,
}

/// Resolve `req` against the tree rooted at `root`.
///
/// On success the request's path parameters are populated and the execution
/// list is returned; `None` means no route matched.
pub fn resolve<'a>(root: &'a Router, req: &mut Request) -> Option<Vec<Step<'a>>> {
    let mut walk = Walk {
        method: &req.method,
        path: &req.path,
        chain: Vec::new(),
        matched: None,
    };
    visit_router(root, "", &mut walk);

    let Walk { chain, matched, .. } = walk;
    let params = matched?;
    req.params = params;
    Some(chain)
}

fn visit_router<'a>(router: &'a Router, parent: &str, walk: &mut Walk<'a, '_>) {
    let prefix = join(parent, router.prefix());
    for node in router.stack() {
        if walk.matched.is_some() {
            return;
        }
        match node {
            StackNode::Middleware(middleware) => walk.chain.push(Step::Middleware(middleware)),
            StackNode::Route(route) => {
                if let Some(params) = match_route(route, &prefix, walk.method, walk.path) {
                    walk.chain.push(Step::Route(route));
                    walk.matched = Some(params);
                }
            }
            StackNode::Router(child) => visit_router(child, &prefix, walk),
        }
    }
}

/// Match a single route. `None` is an ordinary non-match.
fn match_route(route: &Route, prefix: &str, method: &str, path: &str) -> Option<PathParams> {
    if route.method != method {
        return None;
    }

    let full = join(prefix, &route.path);
    let pattern: Vec<&str> = segments(&full).collect();
    let actual: Vec<&str> = segments(path).collect();
    if pattern.len() != actual.len() {
        return None;
    }

    let mut params = PathParams::new();
    for (expected, got) in pattern.iter().zip(&actual) {
        match expected.strip_prefix(':') {
            Some(name) => params.insert(name, *got),
            None if expected == got => {}
            None => return None,
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::{HandlerError, HandlerResult};
    use crate::http::response::Response;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn mark(log: &Log, name: &'static str) -> impl Fn(&mut Request, &mut Response) -> HandlerResult {
        let log = log.clone();
        move |_, _| {
            log.lock().unwrap().push(name);
            Ok(())
        }
    }

    fn run(chain: &[Step<'_>], req: &mut Request) -> Result<(), HandlerError> {
        let mut res = Response::new();
        for step in chain {
            match step {
                Step::Middleware(m) => (m.handler)(req, &mut res)?,
                Step::Route(r) => (r.handler)(req, &mut res)?,
            }
        }
        Ok(())
    }

    fn route_path(chain: &[Step<'_>]) -> Option<String> {
        chain.iter().find_map(|step| match step {
            Step::Route(r) => Some(format!("{} {}", r.method, r.path)),
            Step::Middleware(_) => None,
        })
    }

    #[test]
    fn binds_path_parameters_in_order() {
        let log = Log::default();
        let root = Router::new()
            .get("/a/:id/b", mark(&log, "ab"))
            .get("/users/:user/posts/:post", mark(&log, "post"));

        let mut req = Request::new("GET", "/a/1/b");
        let chain = resolve(&root, &mut req).unwrap();
        assert_eq!(route_path(&chain).as_deref(), Some("GET /a/:id/b"));
        assert_eq!(req.param("id"), Some("1"));

        let mut req = Request::new("GET", "/users/ada/posts/42");
        let chain = resolve(&root, &mut req).unwrap();
        run(&chain, &mut req).unwrap();
        assert_eq!(req.param("user"), Some("ada"));
        assert_eq!(req.param("post"), Some("42"));
        assert_eq!(*log.lock().unwrap(), ["post"]);
    }

    #[test]
    fn slashes_are_insignificant() {
        let root = Router::new().nest("/api/", Router::new().get("/items/", |_, _| Ok(())));
        for path in ["/api/items", "//api//items/", "api/items"] {
            let mut req = Request::new("GET", path);
            assert!(resolve(&root, &mut req).is_some(), "{path}");
        }
    }

    #[test]
    fn method_and_literals_are_case_sensitive() {
        let root = Router::new().get("/Items", |_, _| Ok(()));
        assert!(resolve(&root, &mut Request::new("get", "/Items")).is_none());
        assert!(resolve(&root, &mut Request::new("GET", "/items")).is_none());
        assert!(resolve(&root, &mut Request::new("POST", "/Items")).is_none());
        assert!(resolve(&root, &mut Request::new("GET", "/Items")).is_some());
    }

    #[test]
    fn segment_count_must_match() {
        let root = Router::new().get("/files/:name", |_, _| Ok(()));
        assert!(resolve(&root, &mut Request::new("GET", "/files")).is_none());
        assert!(resolve(&root, &mut Request::new("GET", "/files/a/b")).is_none());
    }

    #[test]
    fn no_match_leaves_params_untouched() {
        let root = Router::new().get("/x/:id", |_, _| Ok(()));
        let mut req = Request::new("GET", "/y/1");
        assert!(resolve(&root, &mut req).is_none());
        assert!(req.params.is_empty());
    }

    #[test]
    fn middleware_before_match_runs_in_declaration_order() {
        let log = Log::default();
        let api = Router::new()
            .middleware(mark(&log, "api"))
            .get("/users/:id", mark(&log, "route"))
            .middleware(mark(&log, "after"));
        let root = Router::new()
            .middleware(mark(&log, "root"))
            .nest("/api", api)
            .middleware(mark(&log, "tail"));

        let mut req = Request::new("GET", "/api/users/7");
        let chain = resolve(&root, &mut req).unwrap();
        assert_eq!(chain.len(), 3);
        run(&chain, &mut req).unwrap();
        assert_eq!(*log.lock().unwrap(), ["root", "api", "route"]);
    }

    #[test]
    fn first_match_wins() {
        let log = Log::default();
        let root = Router::new()
            .get("/dup", mark(&log, "first"))
            .nest("/", Router::new().get("/dup", mark(&log, "second")));

        let mut req = Request::new("GET", "/dup");
        let chain = resolve(&root, &mut req).unwrap();
        run(&chain, &mut req).unwrap();
        assert_eq!(*log.lock().unwrap(), ["first"]);
    }

    #[test]
    fn middleware_from_a_missed_subtree_is_kept() {
        let log = Log::default();
        let admin = Router::new()
            .middleware(mark(&log, "admin-guard"))
            .get("/panel", mark(&log, "panel"));
        let root = Router::new()
            .nest("/admin", admin)
            .get("/public", mark(&log, "public"));

        let mut req = Request::new("GET", "/public");
        let chain = resolve(&root, &mut req).unwrap();
        run(&chain, &mut req).unwrap();
        assert_eq!(*log.lock().unwrap(), ["admin-guard", "public"]);
    }

    #[test]
    fn route_level_middleware_precedes_route() {
        let log = Log::default();
        let root = Router::new()
            .get_with("/a", mark(&log, "a"), [Middleware::new(mark(&log, "guard"))])
            .get("/b", mark(&log, "b"));

        let mut req = Request::new("GET", "/b");
        let chain = resolve(&root, &mut req).unwrap();
        run(&chain, &mut req).unwrap();
        assert_eq!(*log.lock().unwrap(), ["guard", "b"]);
    }

    #[test]
    fn root_route_matches_bare_slash() {
        let root = Router::new().get("/", |_, _| Ok(()));
        assert!(resolve(&root, &mut Request::new("GET", "/")).is_some());
        assert!(resolve(&root, &mut Request::new("GET", "")).is_some());
    }
}
