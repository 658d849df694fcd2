//! Condition nodes of the diagnosis graph
//!
//! Each node answers one question about the snapshot and routes to a fixed
//! successor per outcome. Predicates that depend on a snapshot marked
//! invalid treat the signal as unavailable and answer `false` rather than
//! asserting a finding; the only fatal path is a Pod snapshot that is valid
//! and empty, which means the service is not deployed at all.

use super::inspect::{image_has_cmd, CommandRunner};
use super::messages;
use super::node::{Condition, Node};
use super::status::{self, PodStatus};
use super::types::{AttributeKey, AttributeValue, DiagnosisContext, ResourceKind};
use crate::error::{Result, StevedoreError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, Pod};
use regex::Regex;
use std::sync::Arc;

const UNHEALTHY_REASON: &str = "Unhealthy";
const FAILED_SCHEDULING_REASON: &str = "FailedScheduling";
const FAILED_CREATE_REASON: &str = "FailedCreate";
const INSUFFICIENT_MEMORY_PATTERN: &str =
    r"(?i)\d+/\d+ nodes are available.*insufficient memory";

/// What the Pod snapshot holds for this run
enum PodLookup {
    /// Snapshot absent or marked invalid: signal unavailable
    Unknown,
    /// Snapshot fetched cleanly and empty: nothing is deployed
    Empty,
    Found(Vec<Pod>),
}

fn lookup_pods(context: &DiagnosisContext) -> PodLookup {
    match context.snapshot(ResourceKind::Pod) {
        None => PodLookup::Unknown,
        Some(snapshot) if !snapshot.valid => PodLookup::Unknown,
        Some(snapshot) => {
            let pods: Vec<Pod> = snapshot.pods().cloned().collect();
            if pods.is_empty() {
                PodLookup::Empty
            } else {
                PodLookup::Found(pods)
            }
        }
    }
}

/// Record the not-deployed finding and produce the fatal error
fn service_not_deployed(context: &mut DiagnosisContext) -> StevedoreError {
    let service = context.service.service_name.clone();
    context.add_report(messages::service_not_deployed(&service));
    StevedoreError::ServiceNotDeployed(service)
}

/// Events belonging to the failed pod recorded earlier on the path, or to
/// all pods when no specific pod was singled out.
fn relevant_pod_events(context: &DiagnosisContext) -> Vec<Event> {
    let Some(snapshot) = context.snapshot(ResourceKind::Pod) else {
        return Vec::new();
    };
    if let Some(pod) = context.pod_attribute(AttributeKey::FailedPod) {
        if let Some(name) = pod.metadata.name.as_deref() {
            return snapshot.events_for(name).cloned().collect();
        }
    }
    snapshot.events.clone()
}

/// Entry node: aggregates container status across all pods and routes to
/// the node registered for the first failed status it encounters.
pub struct PodStatusCondition {
    pub(super) image_pull: Arc<dyn Node>,
    pub(super) crash_loop: Arc<dyn Node>,
    pub(super) pending: Arc<dyn Node>,
    pub(super) running: Arc<dyn Node>,
    pub(super) crashing: Arc<dyn Node>,
    pub(super) terminating: Arc<dyn Node>,
    pub(super) no_pods: Arc<dyn Node>,
    pub(super) fallback: Arc<dyn Node>,
}

#[async_trait]
impl Node for PodStatusCondition {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        let pods = match lookup_pods(context) {
            PodLookup::Unknown => {
                tracing::debug!(
                    service = %context.service.service_name,
                    "pod snapshot unavailable, cannot aggregate status"
                );
                return Ok(Some(self.fallback.clone()));
            }
            PodLookup::Empty => return Ok(Some(self.no_pods.clone())),
            PodLookup::Found(pods) => pods,
        };

        let mut effective = PodStatus::Unknown;
        for pod in &pods {
            let Some(aggregated) = status::current_status_of(pod) else {
                continue;
            };
            effective = PodStatus::from_reason(&aggregated);
            // First pod observed in a failed state decides the route.
            if effective.is_failed() {
                if context.trace {
                    tracing::debug!(
                        pod = pod.metadata.name.as_deref().unwrap_or("unknown"),
                        status = effective.as_str(),
                        "observed failed pod"
                    );
                }
                context.add_attribute(
                    AttributeKey::ObservedPodStatus,
                    AttributeValue::Status(aggregated),
                );
                context.add_attribute(AttributeKey::FailedPod, AttributeValue::Pod(pod.clone()));
                break;
            }
        }

        Ok(Some(match effective {
            PodStatus::ImagePullBackOff | PodStatus::ErrImagePull => self.image_pull.clone(),
            PodStatus::CrashLoopBackOff => self.crash_loop.clone(),
            PodStatus::Pending => self.pending.clone(),
            PodStatus::Running | PodStatus::Error => self.running.clone(),
            PodStatus::OomKilled | PodStatus::Completed => self.crashing.clone(),
            PodStatus::Terminating => self.terminating.clone(),
            PodStatus::RunContainerError | PodStatus::Unknown => self.fallback.clone(),
        }))
    }

    fn describe(&self) -> &'static str {
        "Checks aggregated pod status and continues the workflow based on it"
    }

    fn successors(&self) -> Vec<Arc<dyn Node>> {
        vec![
            self.image_pull.clone(),
            self.crash_loop.clone(),
            self.pending.clone(),
            self.running.clone(),
            self.crashing.clone(),
            self.terminating.clone(),
            self.no_pods.clone(),
            self.fallback.clone(),
        ]
    }
}

/// Are the pods of the service failing readiness? True means "not ready".
pub struct ArePodsReady {
    pub(super) not_ready: Arc<dyn Node>,
}

#[async_trait]
impl Condition for ArePodsReady {
    async fn decide(&self, context: &mut DiagnosisContext) -> Result<bool> {
        let pods = match lookup_pods(context) {
            PodLookup::Unknown => return Ok(false),
            PodLookup::Empty => return Err(service_not_deployed(context)),
            PodLookup::Found(pods) => pods,
        };

        for pod in pods {
            if !status::has_condition(&pod, "Ready") {
                context.add_attribute(AttributeKey::UnreadyPod, AttributeValue::Pod(pod));
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn on_success(&self) -> Option<Arc<dyn Node>> {
        Some(self.not_ready.clone())
    }

    fn on_failure(&self) -> Option<Arc<dyn Node>> {
        None
    }

    fn describe(&self) -> &'static str {
        "Are all pods ready?"
    }
}

/// Is any pod unscheduled or explicitly unschedulable?
pub struct PodScheduleCondition {
    pub(super) unschedulable: Arc<dyn Node>,
}

#[async_trait]
impl Condition for PodScheduleCondition {
    async fn decide(&self, context: &mut DiagnosisContext) -> Result<bool> {
        let pods = match lookup_pods(context) {
            PodLookup::Unknown => return Ok(false),
            PodLookup::Empty => return Err(service_not_deployed(context)),
            PodLookup::Found(pods) => pods,
        };

        Ok(pods.iter().any(|pod| {
            !status::has_condition(pod, "PodScheduled") || is_unschedulable(pod)
        }))
    }

    fn on_success(&self) -> Option<Arc<dyn Node>> {
        Some(self.unschedulable.clone())
    }

    fn on_failure(&self) -> Option<Arc<dyn Node>> {
        None
    }

    fn describe(&self) -> &'static str {
        "Are all pods scheduled?"
    }
}

fn is_unschedulable(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .map(|conditions| {
            conditions.iter().any(|c| {
                c.type_ == "PodScheduled"
                    && c.status == "False"
                    && c.reason.as_deref() == Some("Unschedulable")
            })
        })
        .unwrap_or(false)
}

/// Has any container of any relevant pod restarted?
pub struct MultipleContainerRestartsCondition {
    pub(super) crashing: Arc<dyn Node>,
    pub(super) readiness: Arc<dyn Node>,
}

#[async_trait]
impl Condition for MultipleContainerRestartsCondition {
    async fn decide(&self, context: &mut DiagnosisContext) -> Result<bool> {
        let pods = match lookup_pods(context) {
            PodLookup::Unknown => return Ok(false),
            PodLookup::Empty => return Err(service_not_deployed(context)),
            PodLookup::Found(pods) => pods,
        };

        for pod in pods {
            if status::has_restarts(&pod) {
                context.add_attribute(AttributeKey::FailedPod, AttributeValue::Pod(pod));
                context
                    .add_attribute(AttributeKey::RestartsObserved, AttributeValue::Flag(true));
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn on_success(&self) -> Option<Arc<dyn Node>> {
        Some(self.crashing.clone())
    }

    fn on_failure(&self) -> Option<Arc<dyn Node>> {
        Some(self.readiness.clone())
    }

    fn describe(&self) -> &'static str {
        "Multiple container restarts?"
    }
}

/// Did the failed pod's last container state end in an OOM kill or a clean
/// exit? Either way the application itself is crashing.
pub struct IsApplicationCrashing {
    pub(super) fix_crashing: Arc<dyn Node>,
    pub(super) readiness: Arc<dyn Node>,
}

#[async_trait]
impl Condition for IsApplicationCrashing {
    async fn decide(&self, context: &mut DiagnosisContext) -> Result<bool> {
        let pod = context
            .pod_attribute(AttributeKey::FailedPod)
            .or_else(|| context.pod_attribute(AttributeKey::UnreadyPod));
        let Some(pod) = pod else {
            tracing::debug!("no failed pod recorded, cannot check for crashes");
            return Ok(false);
        };

        Ok(matches!(
            status::last_state_of(pod).as_deref(),
            Some("OOMKilled") | Some("Completed")
        ))
    }

    fn on_success(&self) -> Option<Arc<dyn Node>> {
        Some(self.fix_crashing.clone())
    }

    fn on_failure(&self) -> Option<Arc<dyn Node>> {
        Some(self.readiness.clone())
    }

    fn describe(&self) -> &'static str {
        "Is the application crashing?"
    }
}

/// Router: is the pod failing its readiness/liveness probes? Routes to the
/// health-check fix on an `Unhealthy` event; otherwise falls back on the
/// restart signal recorded earlier on the path.
pub struct IsPodsReadinessFailing {
    pub(super) fix_health_check: Arc<dyn Node>,
    pub(super) fix_crashing: Arc<dyn Node>,
    pub(super) try_later: Arc<dyn Node>,
}

#[async_trait]
impl Node for IsPodsReadinessFailing {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        let unready = context
            .pod_attribute(AttributeKey::UnreadyPod)
            .or_else(|| context.pod_attribute(AttributeKey::FailedPod))
            .and_then(|pod| pod.metadata.name.clone());

        let events: Vec<Event> = match (context.snapshot(ResourceKind::Pod), unready) {
            (Some(snapshot), Some(name)) if snapshot.valid => {
                snapshot.events_for(&name).cloned().collect()
            }
            (Some(snapshot), None) if snapshot.valid => snapshot.events.clone(),
            _ => Vec::new(),
        };

        if events.is_empty() {
            tracing::debug!("no events found when checking pod readiness");
            context.add_report(messages::cannot_find_events());
            return Ok(None);
        }

        let unhealthy = events
            .iter()
            .find(|event| event.reason.as_deref() == Some(UNHEALTHY_REASON));
        if let Some(event) = unhealthy {
            context.add_attribute(
                AttributeKey::UnhealthyPodEvent,
                AttributeValue::Event(event.clone()),
            );
            return Ok(Some(self.fix_health_check.clone()));
        }

        Ok(Some(
            if context.flag_attribute(AttributeKey::RestartsObserved) {
                self.fix_crashing.clone()
            } else {
                self.try_later.clone()
            },
        ))
    }

    fn describe(&self) -> &'static str {
        "Readiness failing?"
    }

    fn successors(&self) -> Vec<Arc<dyn Node>> {
        vec![
            self.fix_health_check.clone(),
            self.fix_crashing.clone(),
            self.try_later.clone(),
        ]
    }
}

/// Did scheduling fail for lack of cluster memory?
pub struct IsClusterFull {
    pub(super) cluster_full: Arc<dyn Node>,
    pub(super) pending_pvc: Arc<dyn Node>,
    insufficient_memory: Regex,
}

impl IsClusterFull {
    pub(super) fn new(cluster_full: Arc<dyn Node>, pending_pvc: Arc<dyn Node>) -> Self {
        Self {
            cluster_full,
            pending_pvc,
            insufficient_memory: Regex::new(INSUFFICIENT_MEMORY_PATTERN)
                .unwrap_or_else(|e| unreachable!("static pattern must compile: {e}")),
        }
    }
}

#[async_trait]
impl Condition for IsClusterFull {
    async fn decide(&self, context: &mut DiagnosisContext) -> Result<bool> {
        if !context.snapshot_valid(ResourceKind::Pod) {
            return Ok(false);
        }
        let events = relevant_pod_events(context);
        if events.is_empty() {
            context.add_report(messages::cannot_find_events());
            return Ok(false);
        }

        Ok(events.iter().any(|event| {
            event.reason.as_deref() == Some(FAILED_SCHEDULING_REASON)
                && event
                    .message
                    .as_deref()
                    .map(|m| self.insufficient_memory.is_match(m))
                    .unwrap_or(false)
        }))
    }

    fn on_success(&self) -> Option<Arc<dyn Node>> {
        Some(self.cluster_full.clone())
    }

    fn on_failure(&self) -> Option<Arc<dyn Node>> {
        Some(self.pending_pvc.clone())
    }

    fn describe(&self) -> &'static str {
        "Is the cluster full?"
    }
}

/// Is any PersistentVolumeClaim the failed pod mounts stuck in Pending?
pub struct AnyPendingPvcCondition {
    pub(super) pending_pvc: Arc<dyn Node>,
    pub(super) contact_admin: Arc<dyn Node>,
}

#[async_trait]
impl Condition for AnyPendingPvcCondition {
    async fn decide(&self, context: &mut DiagnosisContext) -> Result<bool> {
        let Some(snapshot) = context.snapshot(ResourceKind::PersistentVolumeClaim) else {
            tracing::debug!(
                service = %context.service.service_name,
                "no PVCs found for service"
            );
            return Ok(false);
        };
        if !snapshot.valid {
            return Ok(false);
        }

        // Narrow to the claims the failed pod actually mounts when one was
        // recorded; otherwise consider every claim of the service.
        let claim_filter: Option<Vec<String>> = context
            .pod_attribute(AttributeKey::FailedPod)
            .map(pod_claim_names);

        Ok(snapshot.pvcs().any(|pvc| {
            if let (Some(names), Some(pvc_name)) = (&claim_filter, pvc.metadata.name.as_deref()) {
                if !names.iter().any(|n| n == pvc_name) {
                    return false;
                }
            }
            pvc.status
                .as_ref()
                .and_then(|s| s.phase.as_deref())
                .map(|phase| phase == "Pending")
                .unwrap_or(false)
        }))
    }

    fn on_success(&self) -> Option<Arc<dyn Node>> {
        Some(self.pending_pvc.clone())
    }

    fn on_failure(&self) -> Option<Arc<dyn Node>> {
        Some(self.contact_admin.clone())
    }

    fn describe(&self) -> &'static str {
        "Are there any pending PVCs?"
    }
}

fn pod_claim_names(pod: &Pod) -> Vec<String> {
    pod.spec
        .as_ref()
        .and_then(|s| s.volumes.as_ref())
        .map(|volumes| {
            volumes
                .iter()
                .filter_map(|v| {
                    v.persistent_volume_claim
                        .as_ref()
                        .map(|c| c.claim_name.clone())
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Does the container have neither start commands in its spec nor a CMD
/// baked into its image? Inspecting the image shells out to the container
/// runtime through the injected runner; an inconclusive inspection answers
/// `false`.
pub struct MissingCmdOrStartCommandsCondition {
    pub(super) cmd_missing: Arc<dyn Node>,
    pub(super) restarts: Arc<dyn Node>,
    pub(super) runner: Arc<dyn CommandRunner>,
}

#[async_trait]
impl Condition for MissingCmdOrStartCommandsCondition {
    async fn decide(&self, context: &mut DiagnosisContext) -> Result<bool> {
        let pod = match context.pod_attribute(AttributeKey::FailedPod) {
            Some(pod) => pod.clone(),
            None => match lookup_pods(context) {
                PodLookup::Found(pods) => pods.into_iter().next().unwrap_or_default(),
                _ => return Ok(false),
            },
        };

        let Some(container) = pod
            .spec
            .as_ref()
            .and_then(|s| s.containers.first())
        else {
            return Ok(false);
        };

        let has_start_commands = container
            .command
            .as_ref()
            .map(|c| !c.is_empty())
            .unwrap_or(false)
            || container.args.as_ref().map(|a| !a.is_empty()).unwrap_or(false);
        if has_start_commands {
            return Ok(false);
        }

        let Some(image) = container.image.as_deref() else {
            return Ok(false);
        };

        match image_has_cmd(self.runner.as_ref(), image).await {
            Some(has_cmd) => Ok(!has_cmd),
            None => Ok(false),
        }
    }

    fn on_success(&self) -> Option<Arc<dyn Node>> {
        Some(self.cmd_missing.clone())
    }

    fn on_failure(&self) -> Option<Arc<dyn Node>> {
        Some(self.restarts.clone())
    }

    fn describe(&self) -> &'static str {
        "Is either a Dockerfile CMD or startCommands defined?"
    }
}

/// Router: resolves the pod's owning controller and inspects its state.
/// No resolvable parent means the service was never deployed; a parent with
/// zero replicas, a FailedCreate event or no events each route differently.
pub struct ParentStatusCondition {
    pub(super) not_deployed: Arc<dyn Node>,
    pub(super) zero_replicas: Arc<dyn Node>,
    pub(super) parent_failure: Arc<dyn Node>,
    pub(super) try_later: Arc<dyn Node>,
}

#[async_trait]
impl Node for ParentStatusCondition {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        let Some(kind) = resolve_pod_parent(context) else {
            return Ok(Some(self.not_deployed.clone()));
        };
        if context.trace {
            tracing::debug!(parent = %kind, "resolved pod parent");
        }

        // Only one parent resource should exist for the current revision.
        let (replicas, events) = match context.snapshot(kind) {
            Some(snapshot) if snapshot.valid && !snapshot.resources.is_empty() => (
                parent_replicas(&snapshot.resources[0]),
                snapshot.events.clone(),
            ),
            _ => return Ok(Some(self.not_deployed.clone())),
        };

        if replicas == Some(0) {
            return Ok(Some(self.zero_replicas.clone()));
        }

        if events.is_empty() {
            tracing::debug!(parent = %kind, "no parent events found");
            context.add_report(messages::cannot_find_events());
            return Ok(None);
        }

        let failed_create = events
            .iter()
            .filter(|e| e.reason.as_deref() == Some(FAILED_CREATE_REASON))
            .next_back()
            .cloned();
        match failed_create {
            Some(event) => {
                context.add_attribute(
                    AttributeKey::FailedParentEvent,
                    AttributeValue::Event(event),
                );
                Ok(Some(self.parent_failure.clone()))
            }
            None => Ok(Some(self.try_later.clone())),
        }
    }

    fn describe(&self) -> &'static str {
        "Checks pod parent status and processes its events"
    }

    fn successors(&self) -> Vec<Arc<dyn Node>> {
        vec![
            self.not_deployed.clone(),
            self.zero_replicas.clone(),
            self.parent_failure.clone(),
            self.try_later.clone(),
        ]
    }
}

/// The controller kind owning the service's pods, if one is present in the
/// snapshot map.
fn resolve_pod_parent(context: &DiagnosisContext) -> Option<ResourceKind> {
    [
        ResourceKind::StatefulSet,
        ResourceKind::Deployment,
        ResourceKind::ReplicaSet,
    ]
    .into_iter()
    .find(|kind| {
        context
            .snapshot(*kind)
            .map(|s| s.valid && !s.resources.is_empty())
            .unwrap_or(false)
    })
}

fn parent_replicas(resource: &super::types::ResourceObject) -> Option<i32> {
    use super::types::ResourceObject;
    match resource {
        ResourceObject::Deployment(d) => d.spec.as_ref().and_then(|s| s.replicas),
        ResourceObject::ReplicaSet(r) => r.spec.as_ref().and_then(|s| s.replicas),
        ResourceObject::StatefulSet(s) => s.spec.as_ref().and_then(|s| s.replicas),
        _ => None,
    }
}
