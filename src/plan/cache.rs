//! The content-addressed plan cache and the compiled plan handle.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use super::compiler::Compiler;
use super::node::PlanCell;
use crate::context::ValidationContext;
use crate::error::{ConfigError, ErrorSet};
use crate::instance::{Instance, Segment};
use crate::types::CheckOptions;

type PlanStore = Mutex<HashMap<String, Arc<PlanCell>>>;

/// Memo of compiled plans, one per distinct schema content key.
///
/// Compilation holds the lock from start to finish, so concurrent requests
/// for the same schema are serialized and at most one plan is ever installed
/// per key. Checking a finished plan takes no lock.
///
/// The key covers schema text and resolution scope but not the retriever:
/// callers that resolve the same URIs to different documents should use
/// their own `PlanCache`.
#[derive(Debug, Clone, Default)]
pub struct PlanCache {
    store: Arc<PlanStore>,
}

static GLOBAL: OnceLock<PlanCache> = OnceLock::new();

impl PlanCache {
    /// An empty cache, independent of the process-wide one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by [`compile`](crate::compile).
    pub fn global() -> &'static PlanCache {
        GLOBAL.get_or_init(PlanCache::new)
    }

    /// Compile `schema`, reusing every plan already in this cache.
    ///
    /// # Errors
    ///
    /// Only `ConfigError::DepthExceeded` (the schema nests deeper than
    /// `options.max_depth`). Other schema faults are kept in the plan and
    /// reported by [`CompiledPlan::check`] when reached.
    ///
    /// When the retriever fails to supply a referenced document, the
    /// returned plan still reports that failure, but none of its plans are
    /// installed: the next compile fetches again.
    ///
    /// # Locking
    ///
    /// The cache lock is held while referenced documents are fetched, so a
    /// slow retriever delays every other compile on this cache. A retriever
    /// must never compile through the same cache; the lock is not reentrant.
    pub fn compile(&self, schema: &Value, options: &CheckOptions) -> Result<CompiledPlan, ConfigError> {
        let mut store = self.store.lock();
        let mut compiler = Compiler::new(options, &store);
        let root = compiler.compile_root(schema)?;
        let fetch_failed = compiler.fetch_failed();
        let fresh = compiler.into_fresh();

        if fetch_failed {
            debug!(root = root.key(), plans = fresh.len(), "reference retrieval failed, plans kept private");
            return Ok(CompiledPlan {
                root,
                store: Arc::new(Mutex::new(fresh)),
                options: options.clone(),
            });
        }

        if !fresh.is_empty() {
            let added = fresh.len();
            store.extend(fresh);
            debug!(root = root.key(), added, plans = store.len(), "installed plans");
        }

        Ok(CompiledPlan {
            root,
            store: Arc::clone(&self.store),
            options: options.clone(),
        })
    }

    /// Number of distinct plans held.
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A schema compiled into a reusable plan.
///
/// Produces exactly the errors [`check_with`](crate::check_with) would for
/// the same schema and options. Cheap to clone and safe to share between
/// threads; every check gets its own error set.
#[derive(Clone)]
pub struct CompiledPlan {
    root: Arc<PlanCell>,
    // Keeps targets of weak back edges alive.
    store: Arc<PlanStore>,
    options: CheckOptions,
}

impl CompiledPlan {
    /// Check `instance` against the compiled schema.
    pub fn check(&self, instance: &Value) -> Result<ErrorSet, ConfigError> {
        let mut ctx = ValidationContext::new(&self.options);
        self.root
            .run(&mut ctx, Instance::from(instance), "", Segment::None)?;
        Ok(ctx.errors)
    }

    /// Content key of the root plan (hex SHA-256).
    pub fn key(&self) -> &str {
        self.root.key()
    }

    /// True when both handles run the very same plan object.
    pub fn same_plan(&self, other: &CompiledPlan) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }
}

impl std::fmt::Debug for CompiledPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledPlan")
            .field("key", &self.root.key())
            .field("plans", &self.store.lock().len())
            .field("options", &self.options)
            .finish()
    }
}
