//! Request model.
//!
//! # Responsibilities
//! - Hold everything the wire parser extracts (method, path, headers, query)
//! - Carry path parameters once the resolver has matched a route
//! - Carry the body once it has been materialized for the route handler
//! - Provide a typed, single-set extension store for collaborators
//!
//! # Design Decisions
//! - Header names are lower-cased on ingestion, lookups fold the key too
//! - `body` stays `None` until the route is about to run, so middleware
//!   never observes it

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::net::SocketAddr;

use thiserror::Error;

/// Query parameters. Repeated keys accumulate in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, Vec<String>>);

impl QueryParams {
    /// Parse a raw query string (`a=1&b&a=2`).
    ///
    /// Pairs split on the first `=`; a missing `=` yields an empty value.
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();
        if query.is_empty() {
            return params;
        }

        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.append(key, value);
        }
        params
    }

    pub fn append(&mut self, key: &str, value: &str) {
        self.0
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// Every value recorded for `key`, in arrival order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Named path segments bound by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Returned when a collaborator tries to set an extension twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request extension `{0}` is already set")]
pub struct ExtensionError(pub &'static str);

/// Request-scoped data attached by collaborators, keyed by type.
///
/// Each type can be set at most once per request.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `value`. Fails if a value of the same type is already present.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Result<(), ExtensionError> {
        let key = TypeId::of::<T>();
        if self.map.contains_key(&key) {
            return Err(ExtensionError(std::any::type_name::<T>()));
        }
        self.map.insert(key, Box::new(value));
        Ok(())
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

/// A parsed HTTP request.
#[derive(Debug, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub query: QueryParams,
    pub params: PathParams,
    /// Materialized right before the route handler runs.
    pub body: Option<Vec<u8>>,
    pub peer_addr: Option<SocketAddr>,
    extensions: Extensions,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Header lookup; the name is case-folded before the lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Body bytes, empty when nothing has been materialized.
    pub fn body(&self) -> &[u8] {
        self.body.as_deref().unwrap_or(&[])
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}
