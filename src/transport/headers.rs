//! Session header extraction.
//!
//! HTTP allows a header to appear more than once. Headers are modeled as a
//! map from lower-cased name to either a single value or the ordered list of
//! values seen on the wire; extraction always takes the first occurrence.

// ============================================================================
// Imports
// ============================================================================

use axum::http::HeaderMap;
use rustc_hash::FxHashMap;

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the session ID on requests and responses.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

// ============================================================================
// Types
// ============================================================================

/// Value of one header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderField {
    /// Header appeared once.
    Single(String),
    /// Header appeared several times, in wire order.
    Multiple(Vec<String>),
}

/// Headers keyed by lower-cased name.
pub type Headers = FxHashMap<String, HeaderField>;

// ============================================================================
// Functions
// ============================================================================

/// Folds an [`HeaderMap`] into [`Headers`].
///
/// Values that are not visible ASCII are skipped.
#[must_use]
pub fn collect_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::default();

    for name in map.keys() {
        let mut values: Vec<String> = map
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        let field = match values.len() {
            0 => continue,
            1 => HeaderField::Single(values.remove(0)),
            _ => HeaderField::Multiple(values),
        };

        headers.insert(name.as_str().to_ascii_lowercase(), field);
    }

    headers
}

/// Returns the first value of header `name`, if present.
#[must_use]
pub fn extract_session_id(headers: &Headers, name: &str) -> Option<String> {
    match headers.get(&name.to_ascii_lowercase())? {
        HeaderField::Single(value) => Some(value.clone()),
        HeaderField::Multiple(values) => values.first().cloned(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::HeaderValue;

    #[test]
    fn test_scalar_value() {
        let mut headers = Headers::default();
        headers.insert(
            SESSION_ID_HEADER.to_string(),
            HeaderField::Single("abc".into()),
        );
        assert_eq!(
            extract_session_id(&headers, SESSION_ID_HEADER),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_sequence_takes_first() {
        let mut headers = Headers::default();
        headers.insert(
            SESSION_ID_HEADER.to_string(),
            HeaderField::Multiple(vec!["abc".into(), "def".into()]),
        );
        assert_eq!(
            extract_session_id(&headers, SESSION_ID_HEADER),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_missing_header() {
        let headers = Headers::default();
        assert_eq!(extract_session_id(&headers, SESSION_ID_HEADER), None);
    }

    #[test]
    fn test_empty_sequence() {
        let mut headers = Headers::default();
        headers.insert(SESSION_ID_HEADER.to_string(), HeaderField::Multiple(vec![]));
        assert_eq!(extract_session_id(&headers, SESSION_ID_HEADER), None);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut headers = Headers::default();
        headers.insert(
            SESSION_ID_HEADER.to_string(),
            HeaderField::Single("abc".into()),
        );
        assert!(extract_session_id(&headers, "Mcp-Session-Id").is_some());
    }

    #[test]
    fn test_collect_folds_repeated_headers() {
        let mut map = HeaderMap::new();
        map.append(SESSION_ID_HEADER, HeaderValue::from_static("first"));
        map.append(SESSION_ID_HEADER, HeaderValue::from_static("second"));
        map.insert("accept", HeaderValue::from_static("application/json"));

        let headers = collect_headers(&map);
        assert_eq!(
            headers.get(SESSION_ID_HEADER),
            Some(&HeaderField::Multiple(vec![
                "first".to_string(),
                "second".to_string()
            ]))
        );
        assert_eq!(
            headers.get("accept"),
            Some(&HeaderField::Single("application/json".to_string()))
        );
        assert_eq!(
            extract_session_id(&headers, SESSION_ID_HEADER),
            Some("first".to_string())
        );
    }
}
