//! Shared value types for the request pipeline.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! HTTP-level values (verbs, headers, responses) that flow between the
//! pipeline and a [`crate::Transport`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the response header marking a precognition-aware endpoint.
pub const PRECOGNITION_HEADER: &str = "Precognition";

/// Name of the request header enumerating the fields to validate.
pub const VALIDATE_ONLY_HEADER: &str = "Precognition-Validate-Only";

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// HTTP verb of a precognitive request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    /// Returns the lowercase verb, as used in default fingerprints.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Patch => "patch",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "patch" => Ok(Method::Patch),
            "put" => Ok(Method::Put),
            "delete" => Ok(Method::Delete),
            other => Err(format!("unsupported method '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Ordered header list with case-insensitive names.
///
/// Names keep the casing they were inserted with; lookups and replacement
/// ignore ASCII case, as HTTP requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Creates an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing any entry whose name matches
    /// case-insensitively.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .0
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.0.push((name, value)),
        }
    }

    /// Returns the value of `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` if a header named `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A response returned by a [`crate::Transport`], successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Numeric HTTP status.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Decoded body. `Value::Null` for an empty body.
    pub data: Value,
}

impl Response {
    /// Returns `true` if the response carries `precognition: true`.
    ///
    /// The header name is matched case-insensitively; the value must be the
    /// literal string `"true"`.
    pub fn is_precognitive(&self) -> bool {
        self.headers.get(PRECOGNITION_HEADER) == Some("true")
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The value a pipeline pass resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    /// The transport's response, passed through untouched.
    Response(Response),
    /// A value produced by a status handler or `on_after` hook.
    Value(Value),
}

impl Outcome {
    /// Returns the response if this outcome is a pass-through.
    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Outcome::Response(response) => Some(response),
            Outcome::Value(_) => None,
        }
    }

    /// Returns the handler-produced value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Outcome::Value(value) => Some(value),
            Outcome::Response(_) => None,
        }
    }
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Outcome::Response(response)
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_with(headers: &[(&str, &str)]) -> Response {
        Response {
            status: 204,
            headers: headers.iter().copied().collect(),
            data: Value::Null,
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers: Headers = [("Content-Type", "application/json")].into_iter().collect();
        assert_eq!(headers.get("content-type"), Some("application/json"));
    }

    #[test]
    fn header_insert_replaces_case_insensitively() {
        let mut headers = Headers::new();
        headers.insert("precognition", "false");
        headers.insert("Precognition", "true");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.iter().next(), Some(("Precognition", "true")));
    }

    #[test]
    fn precognition_marker_requires_literal_true() {
        assert!(response_with(&[("precognition", "true")]).is_precognitive());
        assert!(response_with(&[("PRECOGNITION", "true")]).is_precognitive());
        assert!(!response_with(&[("precognition", "TRUE")]).is_precognitive());
        assert!(!response_with(&[("precognition", "1")]).is_precognitive());
        assert!(!response_with(&[]).is_precognitive());
    }

    #[test]
    fn method_parses_any_case() {
        assert_eq!("PATCH".parse::<Method>(), Ok(Method::Patch));
        assert!("options".parse::<Method>().is_err());
    }

    #[test]
    fn outcome_accessors() {
        let outcome = Outcome::from(json!("expected return"));
        assert_eq!(outcome.as_value(), Some(&json!("expected return")));
        assert!(outcome.as_response().is_none());
    }
}
