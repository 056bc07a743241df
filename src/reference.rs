//! `$ref` and string `extends` resolution.
//!
//! Every schema object carrying a string `id` establishes a new resolution
//! base for its subtree. Fragment-only references (`#`, `#/a/b`) point into
//! the document currently being walked; anything else is joined onto the
//! base, fetched whole through the [`UriRetriever`](crate::UriRetriever) and
//! navigated by its fragment.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;
use url::{ParseError, Url};

use crate::error::ConfigError;
use crate::loader::navigate_fragment;
use crate::types::CheckOptions;

/// The document a schema node belongs to and the base its relative
/// references resolve against.
#[derive(Debug, Clone)]
pub(crate) struct Scope<'s> {
    pub root: &'s Value,
    pub base: Option<Arc<Url>>,
}

impl<'s> Scope<'s> {
    pub fn new(root: &'s Value, base: Option<Arc<Url>>) -> Self {
        Self { root, base }
    }

    /// Scope for the contents of `schema`: its `id`, if any, becomes the base.
    pub fn enter(&self, schema: &Map<String, Value>) -> Result<Scope<'s>, ConfigError> {
        let id = match schema.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => return Ok(self.clone()),
        };
        let joined = match &self.base {
            Some(base) => base.join(id),
            None => Url::parse(id),
        };
        match joined {
            Ok(url) => Ok(Scope {
                root: self.root,
                base: Some(Arc::new(url)),
            }),
            // A relative id with nothing to resolve it against changes nothing.
            Err(ParseError::RelativeUrlWithoutBase) => Ok(self.clone()),
            Err(e) => Err(ConfigError::InvalidUri {
                uri: id.clone(),
                message: e.to_string(),
            }),
        }
    }
}

/// Where a reference leads.
#[derive(Debug)]
pub(crate) enum Target<'s> {
    /// A node of the current document.
    Local(&'s Value),
    /// A fetched document, the fragment to follow in it, and its base.
    Remote {
        document: Arc<Value>,
        fragment: String,
        base: Option<Arc<Url>>,
        /// Identity of the fetched document, for plan cache keys.
        location: String,
    },
}

/// Resolve `uri` as seen from `scope`.
pub(crate) fn resolve<'s>(
    uri: &str,
    scope: &Scope<'s>,
    options: &CheckOptions,
) -> Result<Target<'s>, ConfigError> {
    if uri.starts_with('#') {
        debug!(uri, "resolving local reference");
        return navigate_fragment(scope.root, uri)
            .map(Target::Local)
            .ok_or_else(|| ConfigError::UnresolvableReference {
                uri: uri.to_string(),
                message: "fragment not found in the current document".to_string(),
            });
    }

    let (location, fragment, base) = split_reference(uri, scope.base.as_deref())?;
    debug!(uri, document = %location, "resolving reference");
    let document = options
        .retriever
        .retrieve(&location)
        .map_err(|e| ConfigError::UnresolvableReference {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;

    if navigate_fragment(&document, &fragment).is_none() {
        return Err(ConfigError::UnresolvableReference {
            uri: uri.to_string(),
            message: format!("fragment \"{}\" not found in {}", fragment, location),
        });
    }

    Ok(Target::Remote {
        document,
        fragment,
        base,
        location,
    })
}

/// Split into (document location, `#fragment`, new base).
fn split_reference(
    uri: &str,
    base: Option<&Url>,
) -> Result<(String, String, Option<Arc<Url>>), ConfigError> {
    let parsed = match base {
        Some(base) => base.join(uri),
        None => Url::parse(uri),
    };
    match parsed {
        Ok(mut url) => {
            let fragment = format!("#{}", url.fragment().unwrap_or(""));
            url.set_fragment(None);
            Ok((url.as_str().to_string(), fragment, Some(Arc::new(url))))
        }
        Err(ParseError::RelativeUrlWithoutBase) => {
            let (location, fragment) = match uri.find('#') {
                Some(idx) => (&uri[..idx], &uri[idx..]),
                None => (uri, "#"),
            };
            Ok((location.to_string(), fragment.to_string(), None))
        }
        Err(e) => Err(ConfigError::InvalidUri {
            uri: uri.to_string(),
            message: e.to_string(),
        }),
    }
}
