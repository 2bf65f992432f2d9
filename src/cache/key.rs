//! Cache key composition.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Identity of a cached response: the URL plus a canonical serialization of
/// every option that changes what the server returns.
///
/// A bare `GET` with no headers, query or body is keyed by its URL alone, so
/// `CacheKey::from("/users/1")` names the same entry a plain request for
/// `/users/1` writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compose a key from request parts.
    ///
    /// Options are collected into a sorted map before serializing, so header
    /// or query insertion order never produces two keys for one request.
    /// Bodies are reduced to a SHA-256 fingerprint.
    pub fn compose(
        url: &str,
        method: &str,
        headers: &BTreeMap<String, String>,
        query: &BTreeMap<String, String>,
        body: Option<&Value>,
    ) -> Self {
        let method = method.to_ascii_uppercase();
        if method == "GET" && headers.is_empty() && query.is_empty() && body.is_none() {
            return Self::new(url);
        }

        let mut parts: BTreeMap<&str, Value> = BTreeMap::new();
        parts.insert("method", Value::String(method));
        if !headers.is_empty() {
            let lowered: BTreeMap<String, &String> = headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect();
            parts.insert("headers", serde_json::json!(lowered));
        }
        if !query.is_empty() {
            parts.insert("query", serde_json::json!(query));
        }
        if let Some(body) = body {
            parts.insert("body", Value::String(fingerprint(body)));
        }
        let canonical = serde_json::to_string(&parts).unwrap_or_default();
        Self(format!("{}|{}", url, canonical))
    }

    /// The URL part of the key.
    pub fn url(&self) -> &str {
        self.0.split_once('|').map(|(u, _)| u).unwrap_or(&self.0)
    }

    /// Prefix match on a path boundary: `"/users"` matches `/users`,
    /// `/users/1`, `/users?page=2` and `/users|...`, but not `/usernames`.
    /// An empty prefix matches every key.
    pub fn starts_with(&self, prefix: &str) -> bool {
        const BOUNDARY: &[char] = &['/', '?', '|'];
        match self.0.strip_prefix(prefix) {
            Some(rest) => {
                prefix.is_empty()
                    || rest.is_empty()
                    || prefix.ends_with(BOUNDARY)
                    || rest.starts_with(BOUNDARY)
            }
            None => false,
        }
    }
}

fn fingerprint(body: &Value) -> String {
    // serde_json::Value maps are BTreeMaps unless preserve_order is enabled,
    // so this serialization is already canonical.
    let canonical = serde_json::to_string(body).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&CacheKey> for CacheKey {
    fn from(k: &CacheKey) -> Self {
        k.clone()
    }
}
