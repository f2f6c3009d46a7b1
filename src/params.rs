//! Route parameters and query strings
//!
//! [`RouteParams`] holds the named segments a route pattern captured (`:slug`),
//! [`QueryParams`] holds the decoded query string of the parsed URL.

use std::collections::HashMap;

/// Route parameters extracted from path segments
///
/// # Example
///
/// ```
/// use pjax_navigator::RouteParams;
///
/// // Pattern: /measurement/:id
/// // URL:     http://example.com/measurement/42
/// let mut params = RouteParams::new();
/// params.insert("id".to_string(), "42".to_string());
///
/// assert_eq!(params.get("id"), Some(&"42".to_string()));
/// assert_eq!(params.get_as::<u32>("id"), Some(42));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Get a parameter and parse it as a specific type
    ///
    /// Returns `None` if the parameter doesn't exist or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.params.get(key)?.parse().ok()
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.params.insert(key, value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }
}

impl From<HashMap<String, String>> for RouteParams {
    fn from(params: HashMap<String, String>) -> Self {
        Self::from_map(params)
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query parameters parsed from a URL query string
///
/// Keeps every value of repeated keys, in order of appearance.
///
/// # Example
///
/// ```
/// use pjax_navigator::QueryParams;
///
/// let query = QueryParams::from_query_string("page=1&tag=rust&tag=wasm");
///
/// assert_eq!(query.get_as::<i32>("page"), Some(1));
/// assert_eq!(query.get_all("tag").unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: HashMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string
    ///
    /// A leading `?` is tolerated. Keys without `=` map to an empty value.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params: HashMap<String, Vec<String>> = HashMap::new();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        Self { params }
    }

    /// First value for a key
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)?.first()
    }

    pub fn get_all(&self, key: &str) -> Option<&Vec<String>> {
        self.params.get(key)
    }

    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Append a value; existing values for the key are kept
    pub fn insert(&mut self, key: String, value: String) {
        self.params.entry(key).or_default().push(value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Serialize back into a query string (keys in sorted order)
    pub fn to_query_string(&self) -> String {
        let mut keys: Vec<&String> = self.params.keys().collect();
        keys.sort();

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for key in keys {
            for value in &self.params[key] {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
