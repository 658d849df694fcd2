//! Action nodes of the diagnosis graph
//!
//! Actions are terminal: they append one finding to the context and return
//! no successor. When an action needs data resolved earlier on the path
//! (the failed pod, a parent event) and that attribute is absent, it
//! degrades to a generic finding rather than failing the run.

use super::messages;
use super::node::Node;
use super::status;
use super::types::{AttributeKey, DiagnosisContext, ResourceKind};
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;

const PROVISIONING_FAILED_REASON: &str = "ProvisioningFailed";

/// The service has no pods and no owning controller in the cluster
pub struct ServiceNotDeployedAction;

#[async_trait]
impl Node for ServiceNotDeployedAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        let service = context.service.service_name.clone();
        context.add_report(messages::service_not_deployed(&service));
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Service is not deployed"
    }
}

/// The owning controller exists but is scaled to zero
pub struct ServiceWithZeroReplicasAction;

#[async_trait]
impl Node for ServiceWithZeroReplicasAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        let service = context.service.service_name.clone();
        context.add_report(messages::service_with_zero_replicas(&service));
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Service is deployed with zero replicas"
    }
}

/// Diagnostic of last resort: nothing in the snapshot pins down a cause
pub struct DefaultAction;

#[async_trait]
impl Node for DefaultAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        context.add_report(messages::cannot_infer_error());
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Cannot infer a root cause"
    }
}

/// Image pull is failing: bad image reference or bad registry credentials
pub struct ImagePullBackOffAction;

#[async_trait]
impl Node for ImagePullBackOffAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        let service = context.service.service_name.clone();
        let credential_failure = failed_pod_event_messages(context).iter().any(|message| {
            message.contains("unauthorized") || message.contains("pull access denied")
        });

        let report = if credential_failure {
            messages::invalid_registry_credentials(&service)
        } else {
            messages::fix_image_name(&service)
        };
        context.add_report(report);
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Fix the image name or registry credentials"
    }
}

fn failed_pod_event_messages(context: &DiagnosisContext) -> Vec<String> {
    let Some(snapshot) = context.snapshot(ResourceKind::Pod) else {
        return Vec::new();
    };
    let events: Vec<&k8s_openapi::api::core::v1::Event> =
        match context.pod_attribute(AttributeKey::FailedPod) {
            Some(pod) => match pod.metadata.name.as_deref() {
                Some(name) => snapshot.events_for(name).collect(),
                None => snapshot.events.iter().collect(),
            },
            None => snapshot.events.iter().collect(),
        };
    events
        .into_iter()
        .filter_map(|e| e.message.clone())
        .collect()
}

/// The application itself is crashing: tell OOM kills and clean exits apart
/// from generic crashes using the failed pod's last container state.
pub struct FixCrashingApplication;

#[async_trait]
impl Node for FixCrashingApplication {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        let service = context.service.service_name.clone();
        let last_state = context
            .pod_attribute(AttributeKey::FailedPod)
            .or_else(|| context.pod_attribute(AttributeKey::UnreadyPod))
            .and_then(status::last_state_of);

        let report = match last_state.as_deref() {
            Some("OOMKilled") => messages::not_enough_memory(&service),
            Some("Completed") => messages::invalid_start_commands(),
            _ => messages::application_crash(),
        };
        context.add_report(report);
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Fix your crashing application"
    }
}

/// Readiness/liveness probes are failing
pub struct FixHealthCheckAction;

#[async_trait]
impl Node for FixHealthCheckAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        let mut report = messages::health_check_failure();
        if let Some(event) = context.event_attribute(AttributeKey::UnhealthyPodEvent) {
            if let Some(message) = event.message.as_deref() {
                report.reason = format!("{}: {message}", report.reason);
            }
        }
        context.add_report(report);
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Fix the health check of the service"
    }
}

/// The cluster has no capacity left for new pods
pub struct ClusterFullAction;

#[async_trait]
impl Node for ClusterFullAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        context.add_report(messages::cluster_full());
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Cluster is full"
    }
}

/// A PersistentVolumeClaim is stuck Pending; look at provisioning events to
/// say why when they are available.
pub struct PendingPvcAction {
    storage_class_not_found: Regex,
}

impl PendingPvcAction {
    pub(super) fn new() -> Self {
        Self {
            storage_class_not_found: Regex::new(r#"storageclass[\w\.\s"]*not found"#)
                .unwrap_or_else(|e| unreachable!("static pattern must compile: {e}")),
        }
    }
}

#[async_trait]
impl Node for PendingPvcAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        let service = context.service.service_name.clone();
        let provisioning_failed = context
            .snapshot(ResourceKind::PersistentVolumeClaim)
            .map(|snapshot| {
                snapshot.events.iter().any(|event| {
                    event.reason.as_deref() == Some(PROVISIONING_FAILED_REASON)
                        && event
                            .message
                            .as_deref()
                            .map(|m| self.storage_class_not_found.is_match(m))
                            .unwrap_or(false)
                })
            })
            .unwrap_or(false);

        let report = if provisioning_failed {
            messages::invalid_storage_class(&service)
        } else {
            messages::pending_pvc(&service)
        };
        context.add_report(report);
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Fix volume provisioning for the service"
    }
}

/// Nothing left to check on our side
pub struct ContactClusterAdministratorAction;

#[async_trait]
impl Node for ContactClusterAdministratorAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        context.add_report(messages::contact_cluster_administrator());
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Contact your cluster administrator"
    }
}

/// The image has no CMD and the spec has no start commands
pub struct DockerfileCmdMissingAction;

#[async_trait]
impl Node for DockerfileCmdMissingAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        context.add_report(messages::dockerfile_cmd_missing());
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Add a CMD to the Dockerfile or startCommands to the spec"
    }
}

/// Deployment is simply not finished yet
pub struct TryAfterSometimeAction;

#[async_trait]
impl Node for TryAfterSometimeAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        context.add_report(messages::try_after_sometime());
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Try again after some time"
    }
}

/// Pods cannot be placed on any node
pub struct UnschedulablePodAction;

#[async_trait]
impl Node for UnschedulablePodAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        context.add_report(messages::pod_unschedulable());
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Pods are unschedulable"
    }
}

/// The owning controller failed to create pods; classify the failure event
pub struct ParentFailureAction {
    invalid_volume_name: Vec<Regex>,
    multiple_default_storage_classes: Regex,
    invalid_resource_name: Regex,
}

impl ParentFailureAction {
    pub(super) fn new() -> Self {
        let compile = |pattern: &str| {
            Regex::new(pattern).unwrap_or_else(|e| unreachable!("static pattern must compile: {e}"))
        };
        Self {
            invalid_volume_name: vec![
                compile(r"spec\.volumes\[\d+\]\.name"),
                compile(r"metadata\.name: Invalid value"),
            ],
            multiple_default_storage_classes: compile("default StorageClasses were found"),
            invalid_resource_name: compile(r"metadata\.labels: Invalid value"),
        }
    }
}

#[async_trait]
impl Node for ParentFailureAction {
    async fn next(&self, context: &mut DiagnosisContext) -> Result<Option<Arc<dyn Node>>> {
        let Some(event) = context
            .event_attribute(AttributeKey::FailedParentEvent)
            .cloned()
        else {
            tracing::debug!("no parent failure event recorded");
            context.add_report(messages::cannot_infer_error());
            return Ok(None);
        };
        let message = event.message.as_deref().unwrap_or("");

        let report = if self
            .invalid_volume_name
            .iter()
            .any(|p| p.is_match(message))
        {
            messages::invalid_volume_name()
        } else if self.multiple_default_storage_classes.is_match(message) {
            messages::multiple_default_storage_classes()
        } else if self.invalid_resource_name.is_match(message) {
            let involved = &event.involved_object;
            let resource = format!(
                "{} {}",
                involved.kind.as_deref().unwrap_or("Resource"),
                involved.name.as_deref().unwrap_or("unknown")
            );
            messages::invalid_resource_name(&resource)
        } else {
            messages::cannot_infer_error()
        };
        context.add_report(report);
        Ok(None)
    }

    fn describe(&self) -> &'static str {
        "Kubernetes controller failed to create pods"
    }
}
