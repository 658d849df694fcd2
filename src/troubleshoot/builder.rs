//! Diagnosis context builder
//!
//! Assembles the per-kind [`ResourceSnapshot`] map for a service before a
//! diagnosis run starts: lists the service's pods, claims and owning
//! controllers by label selector, attaches the events involving each of
//! them, and filters pods down to the current deployment revision so the
//! engine never reasons about superseded rollouts. A kind that cannot be
//! fetched cleanly is recorded with `valid = false` instead of aborting.

use super::types::{
    DiagnosisContext, ResourceKind, ResourceObject, ResourceSnapshot, ServiceIdentity,
};
use crate::error::Result;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::core::v1::{Event, PersistentVolumeClaim, Pod};
use kube::api::ListParams;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Debug;

const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";
const POD_TEMPLATE_HASH_LABEL: &str = "pod-template-hash";

/// Build a [`DiagnosisContext`] from live cluster data
pub async fn build_context(
    client: &Client,
    service: ServiceIdentity,
    trace: bool,
) -> Result<DiagnosisContext> {
    let selector = label_selector(&service);
    let namespace = service.namespace.clone();

    let mut snapshots = BTreeMap::new();
    snapshots.insert(
        ResourceKind::Pod,
        fetch_kind::<Pod>(client, &namespace, &selector, ResourceObject::Pod).await,
    );
    snapshots.insert(
        ResourceKind::PersistentVolumeClaim,
        fetch_kind::<PersistentVolumeClaim>(client, &namespace, &selector, ResourceObject::Pvc)
            .await,
    );
    snapshots.insert(
        ResourceKind::Deployment,
        fetch_kind::<Deployment>(client, &namespace, &selector, ResourceObject::Deployment).await,
    );
    snapshots.insert(
        ResourceKind::ReplicaSet,
        fetch_kind::<ReplicaSet>(client, &namespace, &selector, ResourceObject::ReplicaSet).await,
    );
    snapshots.insert(
        ResourceKind::StatefulSet,
        fetch_kind::<StatefulSet>(client, &namespace, &selector, ResourceObject::StatefulSet)
            .await,
    );

    filter_to_current_revision(&mut snapshots);

    Ok(DiagnosisContext::new(service, snapshots).with_trace(trace))
}

/// Label selector the manifest generator stamps onto every resource of a
/// service.
fn label_selector(service: &ServiceIdentity) -> String {
    format!(
        "app={},service={}",
        service.app_name, service.service_name
    )
}

/// List one kind plus the events involving each listed object. Any fetch
/// error degrades the snapshot to invalid.
async fn fetch_kind<K>(
    client: &Client,
    namespace: &str,
    selector: &str,
    wrap: fn(K) -> ResourceObject,
) -> ResourceSnapshot
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + Clone
        + DeserializeOwned
        + Debug,
    K::DynamicType: Default,
{
    let api: Api<K> = Api::namespaced(client.clone(), namespace);
    let params = ListParams::default().labels(selector);
    let resources = match api.list(&params).await {
        Ok(list) => list.items,
        Err(err) => {
            tracing::debug!(namespace, selector, error = %err, "failed to list resources");
            return ResourceSnapshot::invalid();
        }
    };

    let mut events = Vec::new();
    let event_api: Api<Event> = Api::namespaced(client.clone(), namespace);
    for resource in &resources {
        let Some(name) = resource.meta().name.as_deref() else {
            continue;
        };
        let field_selector = format!(
            "involvedObject.name={name},involvedObject.namespace={namespace}"
        );
        match event_api
            .list(&ListParams::default().fields(&field_selector))
            .await
        {
            Ok(list) => events.extend(list.items),
            Err(err) => {
                tracing::debug!(name, error = %err, "failed to list events for resource");
            }
        }
    }

    ResourceSnapshot::new(resources.into_iter().map(wrap).collect(), events)
}

/// Keep only pods belonging to the current deployment revision.
///
/// StatefulSet-owned pods are always current: a rolling update deletes and
/// recreates failing pods in place. For deployments, resolve the revision
/// annotation to its ReplicaSet and keep pods carrying that pod-template
/// hash. When the owning ReplicaSet cannot be resolved the Pod snapshot is
/// marked invalid rather than leaking pods from a superseded rollout.
fn filter_to_current_revision(snapshots: &mut BTreeMap<ResourceKind, ResourceSnapshot>) {
    let statefulset_present = snapshots
        .get(&ResourceKind::StatefulSet)
        .map(|s| s.valid && !s.resources.is_empty())
        .unwrap_or(false);
    if statefulset_present {
        return;
    }

    let deployments: Vec<Deployment> = match snapshots.get(&ResourceKind::Deployment) {
        Some(s) if s.valid && !s.resources.is_empty() => s
            .resources
            .iter()
            .filter_map(|r| match r {
                ResourceObject::Deployment(d) => Some(d.clone()),
                _ => None,
            })
            .collect(),
        _ => return,
    };

    let replica_sets: Vec<ReplicaSet> = snapshots
        .get(&ResourceKind::ReplicaSet)
        .map(|s| {
            s.resources
                .iter()
                .filter_map(|r| match r {
                    ResourceObject::ReplicaSet(rs) => Some(rs.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let mut current_hashes = Vec::new();
    let mut unresolved = false;
    for deployment in &deployments {
        match current_pod_template_hash(deployment, &replica_sets) {
            Some(hash) => current_hashes.push(hash),
            None => unresolved = true,
        }
    }

    let Some(pod_snapshot) = snapshots.get_mut(&ResourceKind::Pod) else {
        return;
    };
    if unresolved {
        tracing::debug!("current revision unresolved, treating pod snapshot as unknown");
        *pod_snapshot = ResourceSnapshot::invalid();
        return;
    }

    pod_snapshot.resources.retain(|r| {
        r.as_pod()
            .and_then(|pod| pod.metadata.labels.as_ref())
            .and_then(|labels| labels.get(POD_TEMPLATE_HASH_LABEL))
            .map(|hash| current_hashes.iter().any(|h| h == hash))
            .unwrap_or(false)
    });
    let current_names: Vec<String> = pod_snapshot
        .resources
        .iter()
        .filter_map(|r| r.name().map(String::from))
        .collect();
    pod_snapshot.events.retain(|event| {
        event
            .involved_object
            .name
            .as_deref()
            .map(|name| current_names.iter().any(|n| n == name))
            .unwrap_or(false)
    });
}

/// The pod-template hash of the ReplicaSet matching the deployment's
/// current revision annotation.
fn current_pod_template_hash(
    deployment: &Deployment,
    replica_sets: &[ReplicaSet],
) -> Option<String> {
    let revision = deployment
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(REVISION_ANNOTATION))?;

    replica_sets
        .iter()
        .find(|rs| {
            rs.metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(REVISION_ANNOTATION))
                == Some(revision)
        })
        .and_then(|rs| {
            rs.metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(POD_TEMPLATE_HASH_LABEL))
                .cloned()
        })
}
