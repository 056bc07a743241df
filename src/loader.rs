//! JSON document loading from various sources.
//!
//! Handles loading schemas and instances from files, strings, and HTTP URLs.

use std::path::Path;

use serde_json::Value;

use crate::error::RetrieveError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `RetrieveError::FileNotFound` if the file doesn't exist,
/// or `RetrieveError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, RetrieveError> {
    if !path.exists() {
        return Err(RetrieveError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| RetrieveError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_document_str(&content)
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `RetrieveError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, RetrieveError> {
    serde_json::from_str(content).map_err(|source| RetrieveError::InvalidJson { source })
}

/// Load a JSON document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `RetrieveError::NetworkError` if the request fails or the server
/// answers with an error status, or if the body isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, RetrieveError> {
    let network = |source: reqwest::Error| RetrieveError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    let response = client.get(url).send().map_err(network)?;

    // Check for HTTP errors before parsing
    let response = response.error_for_status().map_err(network)?;

    response.json().map_err(network)
}

/// Load from a file path or, when `source` looks like a URL, over HTTP.
pub fn load_document_auto(source: &str) -> Result<Value, RetrieveError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            return load_document_url(source);
        }
        #[cfg(not(feature = "remote"))]
        {
            return Err(RetrieveError::UnsupportedUri {
                uri: source.to_string(),
            });
        }
    }
    load_document(Path::new(source))
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Navigate a JSON Pointer fragment (e.g., "#/definitions/foo" or "#/items/0").
///
/// An empty fragment (`""` or `"#"`) addresses the document itself.
/// Returns `None` when the pointer leads nowhere.
pub fn navigate_fragment<'a>(document: &'a Value, fragment: &str) -> Option<&'a Value> {
    let pointer = fragment.trim_start_matches('#');
    if pointer.is_empty() || pointer == "/" {
        return Some(document);
    }
    if !pointer.starts_with('/') {
        return None;
    }
    // Value::pointer handles ~0/~1 unescaping and array indices
    document.pointer(pointer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_document_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"type": "string"}}"#).unwrap();

        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc, json!({"type": "string"}));
    }

    #[test]
    fn load_document_missing_file() {
        let err = load_document(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(matches!(err, RetrieveError::FileNotFound { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn load_document_invalid_json() {
        let err = load_document_str("{not json").unwrap_err();
        assert!(matches!(err, RetrieveError::InvalidJson { .. }));
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("http://example.com/schema.json"));
        assert!(is_url("https://example.com/schema.json"));
        assert!(!is_url("schema.json"));
        assert!(!is_url("file:///tmp/schema.json"));
    }

    #[test]
    fn navigate_fragment_paths() {
        let doc = json!({
            "definitions": {"a/b": {"type": "integer"}, "list": [{"type": "null"}]}
        });
        assert_eq!(navigate_fragment(&doc, "#"), Some(&doc));
        assert_eq!(navigate_fragment(&doc, ""), Some(&doc));
        assert_eq!(
            navigate_fragment(&doc, "#/definitions/a~1b"),
            Some(&json!({"type": "integer"}))
        );
        assert_eq!(
            navigate_fragment(&doc, "#/definitions/list/0"),
            Some(&json!({"type": "null"}))
        );
        assert_eq!(navigate_fragment(&doc, "#/definitions/missing"), None);
        assert_eq!(navigate_fragment(&doc, "#definitions"), None);
    }
}
