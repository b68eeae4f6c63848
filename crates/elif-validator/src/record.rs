//! Request data locations that validation chains read from

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// A named part of an incoming request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Cookies,
    Headers,
    Params,
    Query,
}

impl Location {
    /// Every location, in the order `check()` searches them
    pub const ALL: [Location; 5] = [
        Location::Body,
        Location::Cookies,
        Location::Headers,
        Location::Params,
        Location::Query,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Body => "body",
            Location::Cookies => "cookies",
            Location::Headers => "headers",
            Location::Params => "params",
            Location::Query => "query",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The data a set of chains is executed against.
///
/// Every location is a JSON value; an HTTP adapter fills them from the
/// parsed request. Header names are stored lower-cased so that header
/// locators match case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    body: Value,
    cookies: Value,
    headers: Value,
    params: Value,
    query: Value,
}

impl Record {
    /// Create a record with every location empty
    pub fn new() -> Self {
        Self {
            body: Value::Object(Map::new()),
            cookies: Value::Object(Map::new()),
            headers: Value::Object(Map::new()),
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
        }
    }

    /// Build a record the way a request adapter would: a parsed body plus
    /// string maps for the remaining locations
    pub fn from_parts(
        body: Value,
        query: HashMap<String, String>,
        params: HashMap<String, String>,
        headers: HashMap<String, String>,
        cookies: HashMap<String, String>,
    ) -> Self {
        Self::new()
            .with_body(body)
            .with_query(string_map(query))
            .with_params(string_map(params))
            .with_headers(string_map(headers))
            .with_cookies(string_map(cookies))
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_cookies(mut self, cookies: Value) -> Self {
        self.cookies = cookies;
        self
    }

    /// Set the headers; top-level names are lower-cased
    pub fn with_headers(mut self, headers: Value) -> Self {
        self.headers = match headers {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(name, value)| (name.to_ascii_lowercase(), value))
                    .collect(),
            ),
            other => other,
        };
        self
    }

    /// Add a single header (for adapter/middleware use)
    pub fn insert_header(&mut self, name: impl AsRef<str>, value: impl Into<Value>) {
        if !self.headers.is_object() {
            self.headers = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.headers {
            map.insert(name.as_ref().to_ascii_lowercase(), value.into());
        }
    }

    /// Get the data stored for a location
    pub fn get(&self, location: Location) -> &Value {
        match location {
            Location::Body => &self.body,
            Location::Cookies => &self.cookies,
            Location::Headers => &self.headers,
            Location::Params => &self.params,
            Location::Query => &self.query,
        }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn query(&self) -> &Value {
        &self.query
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn headers(&self) -> &Value {
        &self.headers
    }

    pub fn cookies(&self) -> &Value {
        &self.cookies
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

fn string_map(map: HashMap<String, String>) -> Value {
    Value::Object(
        map.into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headers_are_lowercased() {
        let mut record = Record::new().with_headers(json!({ "X-Request-Id": "abc" }));
        record.insert_header("Content-Type", "application/json");

        assert_eq!(record.headers()["x-request-id"], json!("abc"));
        assert_eq!(record.headers()["content-type"], json!("application/json"));
    }

    #[test]
    fn test_from_parts() {
        let mut query = HashMap::new();
        query.insert("page".to_string(), "2".to_string());

        let record = Record::from_parts(
            json!({ "name": "John" }),
            query,
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
        );

        assert_eq!(record.get(Location::Body)["name"], json!("John"));
        assert_eq!(record.get(Location::Query)["page"], json!("2"));
        assert_eq!(record.get(Location::Params), &json!({}));
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::Headers.to_string(), "headers");
        assert_eq!(serde_json::to_value(Location::Query).unwrap(), json!("query"));
    }
}
