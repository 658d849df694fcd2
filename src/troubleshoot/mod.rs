//! Deployment troubleshooting
//!
//! Given a snapshot of cluster resources for an unhealthy service, walks a
//! directed graph of condition/action nodes to determine a root cause and a
//! recommended fix. The snapshot is read-only for the run; findings travel
//! through the context's attribute bag, and the engine returns the reports
//! accumulated along the path.

pub mod actions;
pub mod builder;
pub mod conditions;
pub mod engine;
pub mod graph;
pub mod inspect;
pub mod messages;
pub mod node;
pub mod report;
pub mod status;
pub mod types;

pub use engine::{DiagnosisEngine, MAX_HOPS};
pub use graph::DiagnosisGraph;
pub use node::{Condition, Node};
pub use types::{
    AttributeKey, AttributeValue, DiagnosisContext, DiagnosisReport, ResourceKind,
    ResourceObject, ResourceSnapshot, ServiceIdentity,
};
