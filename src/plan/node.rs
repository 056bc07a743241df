//! Compiled plan nodes.

use std::sync::{Arc, OnceLock, Weak};

use crate::constraints::{Keywords, Subschema};
use crate::context::ValidationContext;
use crate::error::ConfigError;
use crate::instance::{increment_path, Instance, Segment};

/// One compiled schema node, identified by its content key.
///
/// The node is filled in once compilation of its subtree finishes; until
/// then only back-references from inside that subtree point at it.
pub(crate) struct PlanCell {
    key: String,
    node: OnceLock<PlanNode>,
}

impl PlanCell {
    pub fn new(key: String) -> Self {
        Self {
            key,
            node: OnceLock::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Install the finished node. Returns false if one was already set.
    pub fn finish(&self, node: PlanNode) -> bool {
        self.node.set(node).is_ok()
    }

    pub fn run(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        path: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError> {
        ctx.enter(path)?;
        let result = match self.node.get() {
            Some(node) => node.execute(ctx, instance, path, segment),
            None => Err(ConfigError::IncompletePlan {
                key: self.key.clone(),
            }),
        };
        ctx.leave();
        result
    }
}

impl std::fmt::Debug for PlanCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCell")
            .field("key", &self.key)
            .field("finished", &self.node.get().is_some())
            .finish()
    }
}

/// Edge to a child plan.
///
/// Edges to finished plans are strong, so plans form a DAG. An edge to a plan
/// still being compiled (a cycle through `$ref`) is weak; the cache store
/// keeps its target alive.
#[derive(Debug, Clone)]
pub(crate) enum PlanLink {
    Owned(Arc<PlanCell>),
    Back { key: String, cell: Weak<PlanCell> },
}

impl PlanLink {
    pub fn run(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        path: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError> {
        match self {
            PlanLink::Owned(cell) => cell.run(ctx, instance, path, segment),
            PlanLink::Back { key, cell } => match cell.upgrade() {
                Some(cell) => cell.run(ctx, instance, path, segment),
                None => Err(ConfigError::IncompletePlan { key: key.clone() }),
            },
        }
    }
}

impl Subschema for PlanLink {
    fn check(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        parent: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError> {
        let path = increment_path(parent, segment);
        self.run(ctx, instance, &path, segment)
    }
}

/// What a compiled node does when reached.
#[derive(Debug)]
pub(crate) enum PlanNode {
    /// `null` or `true` in schema position.
    Accept,
    /// A schema position held a value of this kind.
    NotAnObject(&'static str),
    /// A failure found while compiling, raised when the node is reached.
    Fatal(ConfigError),
    /// `$ref` or string `extends`: continue at the target, same path.
    Reference(PlanLink),
    Keywords(Box<Keywords<PlanLink>>),
}

impl PlanNode {
    fn execute(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        path: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError> {
        match self {
            PlanNode::Accept => Ok(()),
            PlanNode::NotAnObject(actual) => Err(ConfigError::NotAnObject {
                path: path.to_string(),
                actual: actual.to_string(),
            }),
            PlanNode::Fatal(error) => Err(error.clone()),
            PlanNode::Reference(target) => target.run(ctx, instance, path, segment),
            PlanNode::Keywords(keywords) => keywords.evaluate(ctx, instance, path, segment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckOptions;

    #[test]
    fn unfinished_cell_reports_incomplete_plan() {
        let options = CheckOptions::new();
        let mut ctx = ValidationContext::new(&options);
        let cell = PlanCell::new("abc".into());
        let err = cell
            .run(&mut ctx, Instance::Null, "", Segment::None)
            .unwrap_err();
        assert_eq!(err, ConfigError::IncompletePlan { key: "abc".into() });
    }

    #[test]
    fn dangling_back_link_reports_incomplete_plan() {
        let options = CheckOptions::new();
        let mut ctx = ValidationContext::new(&options);
        let link = {
            let cell = Arc::new(PlanCell::new("gone".into()));
            PlanLink::Back {
                key: "gone".into(),
                cell: Arc::downgrade(&cell),
            }
        };
        let err = link.check(&mut ctx, Instance::Null, "", Segment::None).unwrap_err();
        assert_eq!(err, ConfigError::IncompletePlan { key: "gone".into() });
    }

    #[test]
    fn finish_installs_once() {
        let cell = PlanCell::new("k".into());
        assert!(cell.finish(PlanNode::Accept));
        assert!(!cell.finish(PlanNode::Accept));
    }

    #[test]
    fn not_an_object_carries_runtime_path() {
        let options = CheckOptions::new();
        let mut ctx = ValidationContext::new(&options);
        let cell = Arc::new(PlanCell::new("k".into()));
        cell.finish(PlanNode::NotAnObject("string"));
        let err = PlanLink::Owned(cell)
            .check(&mut ctx, Instance::Null, "a", Segment::Index(1))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotAnObject {
                path: "a[1]".into(),
                actual: "string".into()
            }
        );
    }
}
