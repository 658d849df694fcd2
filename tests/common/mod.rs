// Common test utilities and helpers
#![allow(dead_code)]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Container, ContainerState, ContainerStateRunning, ContainerStateTerminated,
    ContainerStateWaiting, ContainerStatus, Event, ObjectReference, PersistentVolumeClaim,
    PersistentVolumeClaimStatus, PersistentVolumeClaimVolumeSource, Pod, PodCondition, PodSpec,
    PodStatus, Volume,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use stevedore::error::Result;
use stevedore::troubleshoot::inspect::{CommandOutput, CommandRunner};
use stevedore::troubleshoot::{
    DiagnosisContext, ResourceKind, ResourceObject, ResourceSnapshot, ServiceIdentity,
};

pub const APP: &str = "shop";
pub const SERVICE: &str = "cart";
pub const NAMESPACE: &str = "dev";

/// Create a healthy running pod: scheduled, ready, no restarts
pub fn ready_pod(name: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "main".to_string(),
                image: Some("registry.local/shop/cart:1.0".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            conditions: Some(vec![
                pod_condition("PodScheduled", "True"),
                pod_condition("Ready", "True"),
            ]),
            container_statuses: Some(vec![running_container_status(0)]),
            ..Default::default()
        }),
    }
}

pub fn pod_condition(type_: &str, status: &str) -> PodCondition {
    PodCondition {
        type_: type_.to_string(),
        status: status.to_string(),
        ..Default::default()
    }
}

pub fn running_container_status(restart_count: i32) -> ContainerStatus {
    ContainerStatus {
        name: "main".to_string(),
        ready: true,
        restart_count,
        state: Some(ContainerState {
            running: Some(ContainerStateRunning::default()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A pod that is not ready, has restarted and whose last container state
/// terminated with the given reason
pub fn crashing_pod(name: &str, restart_count: i32, last_terminated_reason: &str) -> Pod {
    let mut pod = ready_pod(name);
    let status = pod.status.as_mut().unwrap();
    status.conditions = Some(vec![
        pod_condition("PodScheduled", "True"),
        pod_condition("Ready", "False"),
    ]);
    status.container_statuses = Some(vec![ContainerStatus {
        name: "main".to_string(),
        ready: false,
        restart_count,
        state: Some(ContainerState {
            running: Some(ContainerStateRunning::default()),
            ..Default::default()
        }),
        last_state: Some(ContainerState {
            terminated: Some(ContainerStateTerminated {
                reason: Some(last_terminated_reason.to_string()),
                exit_code: 137,
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }]);
    pod
}

/// A pod whose container is waiting with the given reason
/// (e.g. CrashLoopBackOff, ImagePullBackOff)
pub fn waiting_pod(name: &str, waiting_reason: &str) -> Pod {
    let mut pod = ready_pod(name);
    let status = pod.status.as_mut().unwrap();
    status.conditions = Some(vec![
        pod_condition("PodScheduled", "True"),
        pod_condition("Ready", "False"),
    ]);
    status.container_statuses = Some(vec![ContainerStatus {
        name: "main".to_string(),
        ready: false,
        restart_count: 0,
        state: Some(ContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: Some(waiting_reason.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }]);
    pod
}

/// A pod stuck Pending that mounts the given claim
pub fn pending_pod(name: &str, claim_name: &str) -> Pod {
    let mut pod = ready_pod(name);
    pod.spec.as_mut().unwrap().volumes = Some(vec![Volume {
        name: "data".to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim_name.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }]);
    let status = pod.status.as_mut().unwrap();
    status.phase = Some("Pending".to_string());
    status.conditions = Some(vec![pod_condition("PodScheduled", "False")]);
    status.container_statuses = None;
    pod
}

pub fn event(involved_pod: &str, reason: &str, message: &str) -> Event {
    Event {
        metadata: ObjectMeta {
            name: Some(format!("{involved_pod}.evt")),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        involved_object: ObjectReference {
            kind: Some("Pod".to_string()),
            name: Some(involved_pod.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        type_: Some("Warning".to_string()),
        ..Default::default()
    }
}

pub fn pvc(name: &str, phase: &str) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: None,
        status: Some(PersistentVolumeClaimStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
    }
}

pub fn pod_snapshot(pods: Vec<Pod>, events: Vec<Event>) -> ResourceSnapshot {
    ResourceSnapshot::new(pods.into_iter().map(ResourceObject::Pod).collect(), events)
}

pub fn pvc_snapshot(pvcs: Vec<PersistentVolumeClaim>, events: Vec<Event>) -> ResourceSnapshot {
    ResourceSnapshot::new(pvcs.into_iter().map(ResourceObject::Pvc).collect(), events)
}

/// Context with only a pod snapshot
pub fn context_with_pods(pods: Vec<Pod>, events: Vec<Event>) -> DiagnosisContext {
    let mut snapshots = BTreeMap::new();
    snapshots.insert(ResourceKind::Pod, pod_snapshot(pods, events));
    context_with(snapshots)
}

pub fn context_with(
    snapshots: BTreeMap<ResourceKind, ResourceSnapshot>,
) -> DiagnosisContext {
    DiagnosisContext::new(ServiceIdentity::new(APP, SERVICE, NAMESPACE), snapshots)
}

/// Canned [`CommandRunner`] for the CMD-inspection checks
pub struct FakeRunner {
    /// Output for `docker version`
    pub version: CommandOutput,
    /// Output for `docker image inspect`
    pub inspect: CommandOutput,
}

impl FakeRunner {
    /// Runtime available; image inspect returns the given CMD JSON
    pub fn with_cmd_json(cmd_json: &str) -> Self {
        Self {
            version: CommandOutput {
                exit_code: 0,
                stdout: "27.0.1\n".to_string(),
            },
            inspect: CommandOutput {
                exit_code: 0,
                stdout: format!("{cmd_json}\n"),
            },
        }
    }

    /// Runtime not installed at all
    pub fn unavailable() -> Self {
        Self {
            version: CommandOutput {
                exit_code: 127,
                stdout: String::new(),
            },
            inspect: CommandOutput {
                exit_code: 127,
                stdout: String::new(),
            },
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, _program: &str, args: &[&str]) -> Result<CommandOutput> {
        if args.first() == Some(&"version") {
            Ok(CommandOutput {
                exit_code: self.version.exit_code,
                stdout: self.version.stdout.clone(),
            })
        } else {
            Ok(CommandOutput {
                exit_code: self.inspect.exit_code,
                stdout: self.inspect.stdout.clone(),
            })
        }
    }
}
