//! Diagnosis driver
//!
//! Starts at an entry node and repeatedly asks "what is next?" until no
//! successor remains, then hands back the reports accumulated in the
//! context. The engine performs no I/O itself; all resource access happened
//! when the snapshot was built, except for collaborator calls a node makes.

use super::node::Node;
use super::types::{DiagnosisContext, DiagnosisReport};
use crate::error::{Result, StevedoreError};
use std::sync::Arc;
use std::time::Instant;

/// Upper bound on hops per run. The authored graph is at most ~10 deep;
/// exceeding this means the graph is miswired, not that the service is sick.
pub const MAX_HOPS: usize = 16;

/// Drives a single diagnosis run over the node graph
#[derive(Debug, Clone, Default)]
pub struct DiagnosisEngine {
    deadline: Option<Instant>,
}

impl DiagnosisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort traversal (between hops) once this instant passes
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Walk the graph from `entry`, mutating `context` as nodes record
    /// findings, and return the accumulated reports in creation order.
    /// An empty list is a valid result: no fault found.
    pub async fn diagnose(
        &self,
        entry: Arc<dyn Node>,
        context: &mut DiagnosisContext,
    ) -> Result<Vec<DiagnosisReport>> {
        let mut current = Some(entry);
        let mut hops = 0usize;

        while let Some(node) = current {
            if hops >= MAX_HOPS {
                return Err(StevedoreError::TraversalLimit { hops });
            }
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(StevedoreError::DeadlineExceeded(format!(
                        "visiting node '{}'",
                        node.describe()
                    )));
                }
            }
            if context.trace {
                tracing::debug!(node = node.describe(), hops, "visiting diagnosis node");
            }
            current = node.next(context).await?;
            hops += 1;
        }

        Ok(context.reports().to_vec())
    }
}
