//! Behavioral tests of the rule catalog: fail-safe defaults on missing or
//! invalid snapshots, attribute-driven routing, and the parent-status paths.

mod common;

use common::*;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;
use stevedore::troubleshoot::{
    DiagnosisEngine, DiagnosisGraph, ResourceKind, ResourceObject, ResourceSnapshot,
};

fn graph() -> DiagnosisGraph {
    DiagnosisGraph::new(Arc::new(FakeRunner::unavailable()))
}

fn deployment(replicas: i32) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some("cart".to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn statefulset(replicas: i32) -> StatefulSet {
    StatefulSet {
        metadata: ObjectMeta {
            name: Some("cart".to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            replicas: Some(replicas),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ============================================================================
// Fail-safe on missing/invalid data
// ============================================================================

#[tokio::test]
async fn test_missing_pod_snapshot_falls_back_to_generic_finding() {
    let mut ctx = context_with(BTreeMap::new());
    let reports = DiagnosisEngine::new()
        .diagnose(graph().entry(), &mut ctx)
        .await
        .unwrap();

    // No positive finding may be asserted; only the generic fallback.
    assert_eq!(reports.len(), 1);
    assert!(reports[0].reason.contains("Cannot determine"));
}

#[tokio::test]
async fn test_invalid_pvc_snapshot_never_asserts_pending_storage() {
    let mut snapshots = BTreeMap::new();
    snapshots.insert(
        ResourceKind::Pod,
        pod_snapshot(
            vec![pending_pod("cart-1", "cart-data")],
            vec![event("cart-1", "FailedScheduling", "0/3 nodes are available")],
        ),
    );
    snapshots.insert(
        ResourceKind::PersistentVolumeClaim,
        ResourceSnapshot::invalid(),
    );
    let mut ctx = context_with(snapshots);

    let reports = DiagnosisEngine::new()
        .diagnose(graph().entry(), &mut ctx)
        .await
        .unwrap();

    assert!(reports.iter().all(|r| !r.reason.contains("PersistentVolumeClaim")));
    // Ends at the administrator action instead.
    assert!(reports
        .iter()
        .any(|r| r.reason.contains("cluster administrator")));
}

#[tokio::test]
async fn test_pending_pod_without_events_records_missing_events() {
    let mut ctx = context_with_pods(vec![pending_pod("cart-1", "cart-data")], vec![]);
    let reports = DiagnosisEngine::new()
        .diagnose(graph().entry(), &mut ctx)
        .await
        .unwrap();

    assert!(reports
        .iter()
        .any(|r| r.reason.contains("events for this deployment are gone")));
}

#[tokio::test]
async fn test_inconclusive_image_inspection_does_not_blame_dockerfile() {
    // Runtime unavailable: the CMD check must answer false and fall through
    // to the restart check instead of asserting a missing CMD.
    let mut ctx = context_with_pods(vec![waiting_pod("cart-1", "CrashLoopBackOff")], vec![]);
    let reports = DiagnosisEngine::new()
        .diagnose(graph().entry(), &mut ctx)
        .await
        .unwrap();

    assert!(reports.iter().all(|r| !r.reason.contains("ENTRYPOINT")));
}

#[tokio::test]
async fn test_start_commands_in_spec_skip_image_inspection() {
    let mut pod = waiting_pod("cart-1", "CrashLoopBackOff");
    pod.spec.as_mut().unwrap().containers[0].command =
        Some(vec!["/bin/serve".to_string()]);
    // Even a runner claiming the CMD is missing must not be consulted.
    let graph = DiagnosisGraph::new(Arc::new(FakeRunner::with_cmd_json("null")));
    let mut ctx = context_with_pods(vec![pod], vec![]);

    let reports = DiagnosisEngine::new()
        .diagnose(graph.entry(), &mut ctx)
        .await
        .unwrap();

    assert!(reports.iter().all(|r| !r.reason.contains("ENTRYPOINT")));
}

#[tokio::test]
async fn test_image_with_baked_in_cmd_routes_to_restart_check() {
    let graph = DiagnosisGraph::new(Arc::new(FakeRunner::with_cmd_json(
        r#"["nginx","-g","daemon off;"]"#,
    )));
    let mut ctx = context_with_pods(vec![waiting_pod("cart-1", "CrashLoopBackOff")], vec![]);

    let reports = DiagnosisEngine::new()
        .diagnose(graph.entry(), &mut ctx)
        .await
        .unwrap();

    assert!(reports.iter().all(|r| !r.reason.contains("ENTRYPOINT")));
}

// ============================================================================
// Readiness branch routing on the restart attribute
// ============================================================================

#[tokio::test]
async fn test_not_ready_without_restarts_or_events_suggests_waiting() {
    // Unready pod, no restarts, events exist but none Unhealthy.
    let noise = event("cart-1", "Pulled", "Successfully pulled image");
    let mut ctx = context_with_pods(vec![crashing_pod("cart-1", 0, "Error")], vec![noise]);

    let reports = DiagnosisEngine::new()
        .diagnose(graph().pods_ready(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(reports[0].reason.contains("still in progress"));
}

#[tokio::test]
async fn test_restarts_without_unhealthy_events_reports_crash() {
    let noise = event("cart-1", "Pulled", "Successfully pulled image");
    let mut ctx = context_with_pods(vec![crashing_pod("cart-1", 4, "Error")], vec![noise]);

    let reports = DiagnosisEngine::new()
        .diagnose(graph().pods_ready(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(reports[0].reason.contains("crashing"));
}

// ============================================================================
// Parent status paths
// ============================================================================

#[tokio::test]
async fn test_no_pods_and_no_parent_reports_not_deployed() {
    // Empty but valid pod snapshot routes the status entry to the parent
    // check, which finds no controller either.
    let mut ctx = context_with_pods(vec![], vec![]);
    let reports = DiagnosisEngine::new()
        .diagnose(graph().entry(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(reports[0].reason.contains("No service"));
}

#[tokio::test]
async fn test_zero_replica_parent_is_reported() {
    let mut snapshots = BTreeMap::new();
    snapshots.insert(ResourceKind::Pod, pod_snapshot(vec![], vec![]));
    snapshots.insert(
        ResourceKind::Deployment,
        ResourceSnapshot::new(
            vec![ResourceObject::Deployment(deployment(0))],
            vec![],
        ),
    );
    let mut ctx = context_with(snapshots);

    let reports = DiagnosisEngine::new()
        .diagnose(graph().entry(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(reports[0].reason.contains("0 replicas"));
}

#[tokio::test]
async fn test_statefulset_parent_takes_precedence_over_deployment() {
    let mut snapshots = BTreeMap::new();
    snapshots.insert(ResourceKind::Pod, pod_snapshot(vec![], vec![]));
    snapshots.insert(
        ResourceKind::StatefulSet,
        ResourceSnapshot::new(vec![ResourceObject::StatefulSet(statefulset(0))], vec![]),
    );
    snapshots.insert(
        ResourceKind::Deployment,
        ResourceSnapshot::new(vec![ResourceObject::Deployment(deployment(2))], vec![]),
    );
    let mut ctx = context_with(snapshots);

    let reports = DiagnosisEngine::new()
        .diagnose(graph().entry(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(reports[0].reason.contains("0 replicas"));
}

#[tokio::test]
async fn test_failed_create_event_classifies_invalid_volume_name() {
    let mut failed_create = event(
        "cart",
        "FailedCreate",
        "Pod \"cart-1\" is invalid: spec.volumes[0].name: Invalid value: \"Data_Volume\"",
    );
    failed_create.involved_object.kind = Some("ReplicaSet".to_string());

    let mut snapshots = BTreeMap::new();
    snapshots.insert(ResourceKind::Pod, pod_snapshot(vec![], vec![]));
    snapshots.insert(
        ResourceKind::Deployment,
        ResourceSnapshot::new(
            vec![ResourceObject::Deployment(deployment(2))],
            vec![failed_create],
        ),
    );
    let mut ctx = context_with(snapshots);

    let reports = DiagnosisEngine::new()
        .diagnose(graph().entry(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(reports[0].reason.contains("Volume name"));
}

#[tokio::test]
async fn test_parent_with_benign_events_suggests_waiting() {
    let benign = event("cart", "ScalingReplicaSet", "Scaled up replica set");
    let mut snapshots = BTreeMap::new();
    snapshots.insert(ResourceKind::Pod, pod_snapshot(vec![], vec![]));
    snapshots.insert(
        ResourceKind::Deployment,
        ResourceSnapshot::new(vec![ResourceObject::Deployment(deployment(2))], vec![benign]),
    );
    let mut ctx = context_with(snapshots);

    let reports = DiagnosisEngine::new()
        .diagnose(graph().entry(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(reports[0].reason.contains("still in progress"));
}

#[tokio::test]
async fn test_parent_without_events_records_missing_events() {
    let mut snapshots = BTreeMap::new();
    snapshots.insert(ResourceKind::Pod, pod_snapshot(vec![], vec![]));
    snapshots.insert(
        ResourceKind::Deployment,
        ResourceSnapshot::new(vec![ResourceObject::Deployment(deployment(2))], vec![]),
    );
    let mut ctx = context_with(snapshots);

    let reports = DiagnosisEngine::new()
        .diagnose(graph().entry(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(reports[0].reason.contains("events for this deployment are gone"));
}
