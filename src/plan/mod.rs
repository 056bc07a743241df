//! The compiled backend.
//!
//! A schema is compiled once into a graph of immutable plan nodes that embed
//! every keyword decision and literal bound. Plans are memoized by content
//! key in a [`PlanCache`], so a subschema that occurs many times (within one
//! document, across documents, or through several `$ref` paths) is compiled
//! exactly once. Running a plan yields the same [`ErrorSet`](crate::ErrorSet)
//! as interpreting the schema.

mod cache;
mod compiler;
mod node;

pub use cache::{CompiledPlan, PlanCache};
