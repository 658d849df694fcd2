//! Core data model for the diagnosis engine
//!
//! A diagnosis run operates over a [`DiagnosisContext`]: the identity of the
//! service being diagnosed, a read-only per-kind [`ResourceSnapshot`] map
//! assembled before the run starts, a typed attribute bag that nodes use to
//! hand findings to each other, and the accumulated report list.

use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::core::v1::{Event, PersistentVolumeClaim, Pod};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single diagnosis finding: what went wrong and what to do about it.
/// Immutable once created; the final list preserves creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub reason: String,
    pub recommended_fix: String,
}

impl DiagnosisReport {
    pub fn new(reason: impl Into<String>, recommended_fix: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            recommended_fix: recommended_fix.into(),
        }
    }
}

impl fmt::Display for DiagnosisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.recommended_fix.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{}. {}", self.reason, self.recommended_fix)
        }
    }
}

/// Identity of the service under diagnosis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub app_name: String,
    pub service_name: String,
    pub namespace: String,
}

impl ServiceIdentity {
    pub fn new(
        app_name: impl Into<String>,
        service_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            service_name: service_name.into(),
            namespace: namespace.into(),
        }
    }
}

/// Category of cluster object a snapshot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Pod,
    PersistentVolumeClaim,
    Deployment,
    ReplicaSet,
    StatefulSet,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::StatefulSet => "StatefulSet",
        };
        write!(f, "{kind}")
    }
}

/// A typed cluster object carried in a snapshot
#[derive(Debug, Clone)]
pub enum ResourceObject {
    Pod(Pod),
    Pvc(PersistentVolumeClaim),
    Deployment(Deployment),
    ReplicaSet(ReplicaSet),
    StatefulSet(StatefulSet),
}

impl ResourceObject {
    pub fn as_pod(&self) -> Option<&Pod> {
        match self {
            ResourceObject::Pod(pod) => Some(pod),
            _ => None,
        }
    }

    pub fn as_pvc(&self) -> Option<&PersistentVolumeClaim> {
        match self {
            ResourceObject::Pvc(pvc) => Some(pvc),
            _ => None,
        }
    }

    /// Name from the object's metadata, if set
    pub fn name(&self) -> Option<&str> {
        match self {
            ResourceObject::Pod(o) => o.metadata.name.as_deref(),
            ResourceObject::Pvc(o) => o.metadata.name.as_deref(),
            ResourceObject::Deployment(o) => o.metadata.name.as_deref(),
            ResourceObject::ReplicaSet(o) => o.metadata.name.as_deref(),
            ResourceObject::StatefulSet(o) => o.metadata.name.as_deref(),
        }
    }
}

/// Per-kind cluster data assembled before a diagnosis run starts.
///
/// `valid = false` means the collaborator failed to fetch this kind cleanly;
/// predicates must treat the kind as unknown rather than empty/healthy.
#[derive(Debug, Clone, Default)]
pub struct ResourceSnapshot {
    pub resources: Vec<ResourceObject>,
    pub events: Vec<Event>,
    pub valid: bool,
}

impl ResourceSnapshot {
    pub fn new(resources: Vec<ResourceObject>, events: Vec<Event>) -> Self {
        Self {
            resources,
            events,
            valid: true,
        }
    }

    /// A snapshot for a kind the collaborator could not fetch
    pub fn invalid() -> Self {
        Self {
            resources: Vec::new(),
            events: Vec::new(),
            valid: false,
        }
    }

    pub fn pods(&self) -> impl Iterator<Item = &Pod> {
        self.resources.iter().filter_map(ResourceObject::as_pod)
    }

    pub fn pvcs(&self) -> impl Iterator<Item = &PersistentVolumeClaim> {
        self.resources.iter().filter_map(ResourceObject::as_pvc)
    }

    /// Events whose involved object is the named resource
    pub fn events_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events
            .iter()
            .filter(move |e| e.involved_object.name.as_deref() == Some(name))
    }
}

/// Keys of the attribute bag nodes use to pass findings forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKey {
    FailedPod,
    UnreadyPod,
    ObservedPodStatus,
    RestartsObserved,
    UnhealthyPodEvent,
    FailedParentEvent,
}

/// Values the attribute bag can hold; closed set, no downcasting
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Pod(Pod),
    Event(Event),
    Status(String),
    Flag(bool),
}

/// The mutable, per-run state of a diagnosis.
///
/// The snapshot map is read-only for the lifetime of the run; only the
/// attribute bag and report list are mutated as traversal proceeds.
#[derive(Debug, Clone)]
pub struct DiagnosisContext {
    pub service: ServiceIdentity,
    snapshots: BTreeMap<ResourceKind, ResourceSnapshot>,
    attributes: BTreeMap<AttributeKey, AttributeValue>,
    reports: Vec<DiagnosisReport>,
    pub trace: bool,
}

impl DiagnosisContext {
    pub fn new(
        service: ServiceIdentity,
        snapshots: BTreeMap<ResourceKind, ResourceSnapshot>,
    ) -> Self {
        Self {
            service,
            snapshots,
            attributes: BTreeMap::new(),
            reports: Vec::new(),
            trace: false,
        }
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Snapshot for a kind, if the collaborator supplied one
    pub fn snapshot(&self, kind: ResourceKind) -> Option<&ResourceSnapshot> {
        self.snapshots.get(&kind)
    }

    /// Whether a kind was fetched cleanly. Absent means unknown.
    pub fn snapshot_valid(&self, kind: ResourceKind) -> bool {
        self.snapshots.get(&kind).map(|s| s.valid).unwrap_or(false)
    }

    pub fn add_attribute(&mut self, key: AttributeKey, value: AttributeValue) {
        self.attributes.insert(key, value);
    }

    pub fn attribute(&self, key: AttributeKey) -> Option<&AttributeValue> {
        self.attributes.get(&key)
    }

    /// Typed accessor for pod-valued attributes
    pub fn pod_attribute(&self, key: AttributeKey) -> Option<&Pod> {
        match self.attributes.get(&key) {
            Some(AttributeValue::Pod(pod)) => Some(pod),
            _ => None,
        }
    }

    /// Typed accessor for event-valued attributes
    pub fn event_attribute(&self, key: AttributeKey) -> Option<&Event> {
        match self.attributes.get(&key) {
            Some(AttributeValue::Event(event)) => Some(event),
            _ => None,
        }
    }

    /// Typed accessor for flag attributes; absent reads as false
    pub fn flag_attribute(&self, key: AttributeKey) -> bool {
        matches!(self.attributes.get(&key), Some(AttributeValue::Flag(true)))
    }

    pub fn add_report(&mut self, report: DiagnosisReport) {
        self.reports.push(report);
    }

    pub fn reports(&self) -> &[DiagnosisReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<DiagnosisReport> {
        self.reports
    }
}
