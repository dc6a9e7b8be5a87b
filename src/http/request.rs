//! Call requests
//!
//! A [`CallRequest`] describes exactly one provider call. Builder methods
//! consume the request and return a new one, so a request that has been
//! handed to the executor is never changed behind its back.

use crate::error::Result;
use crate::types::{Method, Scheme};
use url::Url;

/// Ordered query parameters with unique keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter; an existing key keeps its position and gets the new value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Remove a parameter, returning its value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(pos).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.set(k, v);
        }
        params
    }
}

/// One provider call: endpoint, query, method, body and per-call headers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallRequest {
    /// Network location, optionally with a port (`api.example.com:8443`)
    pub host: String,
    /// URL path, with or without a leading slash
    pub path: String,
    /// Query parameters in the order they were set
    pub query: QueryParams,
    /// Call method
    pub method: Method,
    /// Body sent with POST/PUT
    pub body: Option<String>,
    /// Headers applied to this call only, on top of the session defaults
    pub header_overrides: Vec<(String, String)>,
}

impl CallRequest {
    /// Create a GET request for `host` and `path`
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            query: QueryParams::new(),
            method: Method::GET,
            body: None,
            header_overrides: Vec::new(),
        }
    }

    /// Set a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.set(key, value);
        self
    }

    /// Set a query parameter when a value is present
    #[must_use]
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Set the call method
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the body string
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a header for this call only
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_overrides.push((key.into(), value.into()));
        self
    }

    /// Build the full URL with the query URL-encoded in order
    pub fn url(&self, scheme: Scheme) -> Result<Url> {
        let path = self.path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{scheme}://{}/{path}", self.host))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}
