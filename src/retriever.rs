//! The retrieval collaborator: fetches schema documents by URI.
//!
//! The evaluator only ever asks for whole documents (URI without fragment);
//! fragment navigation happens in [`crate::reference`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::RetrieveError;
use crate::loader;

/// Fetches a schema document. Implementations must be shareable across
/// threads, since compiled plans and options are.
pub trait UriRetriever: Send + Sync {
    fn retrieve(&self, uri: &str) -> Result<Arc<Value>, RetrieveError>;
}

impl<R: UriRetriever + ?Sized> UriRetriever for Arc<R> {
    fn retrieve(&self, uri: &str) -> Result<Arc<Value>, RetrieveError> {
        (**self).retrieve(uri)
    }
}

/// The retriever used when none is configured: file and HTTP(S) sources
/// behind a per-retriever document cache.
pub fn default_retriever() -> Arc<dyn UriRetriever> {
    Arc::new(CachingRetriever::new(SourceRetriever))
}

/// Reads `file://` URIs and plain filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRetriever;

impl FileRetriever {
    fn path_for(uri: &str) -> Result<PathBuf, RetrieveError> {
        if uri.starts_with("file:") {
            let url = Url::parse(uri).map_err(|_| RetrieveError::UnsupportedUri {
                uri: uri.to_string(),
            })?;
            return url.to_file_path().map_err(|_| RetrieveError::UnsupportedUri {
                uri: uri.to_string(),
            });
        }
        Ok(PathBuf::from(uri))
    }
}

impl UriRetriever for FileRetriever {
    fn retrieve(&self, uri: &str) -> Result<Arc<Value>, RetrieveError> {
        let path = Self::path_for(uri)?;
        loader::load_document(&path).map(Arc::new)
    }
}

/// Fetches `http://` and `https://` URIs with a blocking client.
#[cfg(feature = "remote")]
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRetriever;

#[cfg(feature = "remote")]
impl UriRetriever for HttpRetriever {
    fn retrieve(&self, uri: &str) -> Result<Arc<Value>, RetrieveError> {
        loader::load_document_url(uri).map(Arc::new)
    }
}

/// Dispatches on the URI scheme: HTTP(S) over the network (with the `remote`
/// feature), `file:` and scheme-less references from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRetriever;

impl UriRetriever for SourceRetriever {
    fn retrieve(&self, uri: &str) -> Result<Arc<Value>, RetrieveError> {
        if loader::is_url(uri) {
            #[cfg(feature = "remote")]
            {
                return HttpRetriever.retrieve(uri);
            }
            #[cfg(not(feature = "remote"))]
            {
                return Err(RetrieveError::UnsupportedUri {
                    uri: uri.to_string(),
                });
            }
        }
        match Url::parse(uri) {
            Ok(url) if url.scheme() != "file" && !is_drive_letter(url.scheme()) => {
                Err(RetrieveError::UnsupportedUri {
                    uri: uri.to_string(),
                })
            }
            _ => FileRetriever.retrieve(uri),
        }
    }
}

// `C:\schemas\a.json` parses as a URL with scheme "c".
fn is_drive_letter(scheme: &str) -> bool {
    scheme.len() == 1
}

/// Serves documents registered up front. Useful for tests and for
/// embedding applications that bundle their schemas.
#[derive(Debug, Clone, Default)]
pub struct MemoryRetriever {
    documents: HashMap<String, Arc<Value>>,
}

impl MemoryRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `document` under `uri` (any trailing `#` is ignored).
    pub fn insert(&mut self, uri: impl Into<String>, document: Value) {
        let uri = uri.into();
        let key = uri.trim_end_matches('#').to_string();
        self.documents.insert(key, Arc::new(document));
    }

    pub fn with_document(mut self, uri: impl Into<String>, document: Value) -> Self {
        self.insert(uri, document);
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl UriRetriever for MemoryRetriever {
    fn retrieve(&self, uri: &str) -> Result<Arc<Value>, RetrieveError> {
        self.documents
            .get(uri.trim_end_matches('#'))
            .cloned()
            .ok_or_else(|| RetrieveError::NotFound {
                uri: uri.to_string(),
            })
    }
}

/// Wraps another retriever so that every document URI is fetched at most
/// once. Failures are not cached.
pub struct CachingRetriever<R> {
    inner: R,
    documents: Mutex<HashMap<String, Arc<Value>>>,
}

impl<R: UriRetriever> CachingRetriever<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Number of documents fetched so far.
    pub fn cached(&self) -> usize {
        self.documents.lock().len()
    }
}

impl<R: UriRetriever> UriRetriever for CachingRetriever<R> {
    fn retrieve(&self, uri: &str) -> Result<Arc<Value>, RetrieveError> {
        if let Some(document) = self.documents.lock().get(uri) {
            return Ok(Arc::clone(document));
        }
        // Fetch outside the lock; a concurrent duplicate fetch keeps the first insert.
        debug!(uri, "fetching schema document");
        let document = self.inner.retrieve(uri)?;
        let mut documents = self.documents.lock();
        Ok(Arc::clone(
            documents.entry(uri.to_string()).or_insert(document),
        ))
    }
}

impl<R> std::fmt::Debug for CachingRetriever<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingRetriever")
            .field("cached", &self.documents.lock().len())
            .finish_non_exhaustive()
    }
}

/// Base URI for a document loaded from `path`, for use as the initial
/// resolution scope of relative references.
pub fn file_base_uri(path: &Path) -> Option<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    Url::from_file_path(absolute).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingRetriever {
        calls: AtomicUsize,
    }

    impl UriRetriever for CountingRetriever {
        fn retrieve(&self, uri: &str) -> Result<Arc<Value>, RetrieveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if uri == "mem://missing" {
                return Err(RetrieveError::NotFound { uri: uri.into() });
            }
            Ok(Arc::new(json!({"id": uri})))
        }
    }

    #[test]
    fn memory_retriever_ignores_trailing_hash() {
        let retriever = MemoryRetriever::new().with_document("mem://a#", json!({"type": "null"}));
        assert_eq!(*retriever.retrieve("mem://a").unwrap(), json!({"type": "null"}));
        assert_eq!(*retriever.retrieve("mem://a#").unwrap(), json!({"type": "null"}));
        assert!(matches!(
            retriever.retrieve("mem://b"),
            Err(RetrieveError::NotFound { .. })
        ));
    }

    #[test]
    fn caching_retriever_fetches_once() {
        let retriever = CachingRetriever::new(CountingRetriever {
            calls: AtomicUsize::new(0),
        });
        let first = retriever.retrieve("mem://a").unwrap();
        let second = retriever.retrieve("mem://a").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(retriever.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(retriever.cached(), 1);
    }

    #[test]
    fn caching_retriever_does_not_cache_failures() {
        let retriever = CachingRetriever::new(CountingRetriever {
            calls: AtomicUsize::new(0),
        });
        assert!(retriever.retrieve("mem://missing").is_err());
        assert!(retriever.retrieve("mem://missing").is_err());
        assert_eq!(retriever.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(retriever.cached(), 0);
    }

    #[test]
    fn source_retriever_reads_file_uris_and_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, r#"{"type": "boolean"}"#).unwrap();

        let by_path = SourceRetriever.retrieve(path.to_str().unwrap()).unwrap();
        assert_eq!(*by_path, json!({"type": "boolean"}));

        let url = Url::from_file_path(&path).unwrap();
        let by_url = SourceRetriever.retrieve(url.as_str()).unwrap();
        assert_eq!(*by_url, json!({"type": "boolean"}));
    }

    #[test]
    fn source_retriever_rejects_unknown_schemes() {
        let err = SourceRetriever.retrieve("urn:example:schema").unwrap_err();
        assert!(matches!(err, RetrieveError::UnsupportedUri { .. }));
    }

    #[test]
    fn file_base_uri_is_absolute() {
        let base = file_base_uri(Path::new("schemas/root.json")).unwrap();
        assert_eq!(base.scheme(), "file");
        assert!(base.path().ends_with("/schemas/root.json"));
    }
}
