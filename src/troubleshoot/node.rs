//! Node abstractions for the diagnosis graph
//!
//! The graph is implicit: every node holds `Arc` references to its possible
//! successors, wired once at composition time (see `graph.rs`). Nodes are
//! immutable, stateless singletons; all run-scoped mutation goes through the
//! [`DiagnosisContext`] so one node instance can diagnose many services
//! concurrently.

use super::types::DiagnosisContext;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The polymorphic unit of the graph: asked "what is next?" for a context,
/// and able to describe itself for tracing.
#[async_trait]
pub trait Node: Send + Sync {
    /// Returns the successor to visit, or `None` if this node is terminal
    /// for this context. Fatal diagnosis errors propagate as `Err`.
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>>;

    /// Static, human-readable statement of what this node checks
    fn describe(&self) -> &'static str;

    /// Every successor this node can route to, for graph inspection.
    /// Terminal nodes return an empty list.
    fn successors(&self) -> Vec<Arc<dyn Node>> {
        Vec::new()
    }
}

/// A node that reduces to a boolean decision with two fixed successors.
///
/// `decide` must be idempotent and free of side effects on the node itself;
/// any finding it needs to pass forward goes into the context attributes.
#[async_trait]
pub trait Condition: Send + Sync {
    async fn decide(&self, context: &mut DiagnosisContext) -> Result<bool>;

    fn on_success(&self) -> Option<Arc<dyn Node>>;

    fn on_failure(&self) -> Option<Arc<dyn Node>>;

    fn describe(&self) -> &'static str;
}

#[async_trait]
impl<C: Condition> Node for C {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        // A fatal error from decide propagates without consulting either branch.
        let outcome = self.decide(context).await?;
        if context.trace {
            tracing::debug!(node = self.describe(), outcome, "condition evaluated");
        }
        Ok(if outcome {
            self.on_success()
        } else {
            self.on_failure()
        })
    }

    fn describe(&self) -> &'static str {
        Condition::describe(self)
    }

    fn successors(&self) -> Vec<Arc<dyn Node>> {
        self.on_success()
            .into_iter()
            .chain(self.on_failure())
            .collect()
    }
}
