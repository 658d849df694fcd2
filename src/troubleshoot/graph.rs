//! Diagnosis graph composition
//!
//! Every concrete node is constructed here with its successors already
//! resolved, so the full graph exists before the first run and its
//! acyclicity is asserted once by a bounded walk instead of being
//! discovered as an infinite loop at runtime.

use super::actions::{
    ClusterFullAction, ContactClusterAdministratorAction, DefaultAction,
    DockerfileCmdMissingAction, FixCrashingApplication, FixHealthCheckAction,
    ImagePullBackOffAction, ParentFailureAction, PendingPvcAction, ServiceNotDeployedAction,
    ServiceWithZeroReplicasAction, TryAfterSometimeAction, UnschedulablePodAction,
};
use super::conditions::{
    AnyPendingPvcCondition, ArePodsReady, IsApplicationCrashing, IsClusterFull,
    IsPodsReadinessFailing, MissingCmdOrStartCommandsCondition,
    MultipleContainerRestartsCondition, ParentStatusCondition, PodScheduleCondition,
    PodStatusCondition,
};
use super::inspect::CommandRunner;
use super::node::Node;
use std::collections::HashSet;
use std::sync::Arc;

/// The fully wired, immutable diagnosis graph. One instance serves any
/// number of concurrent runs.
pub struct DiagnosisGraph {
    entry: Arc<dyn Node>,
    pod_schedule: Arc<dyn Node>,
    pods_ready: Arc<dyn Node>,
}

impl DiagnosisGraph {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        // Terminal actions first.
        let not_deployed: Arc<dyn Node> = Arc::new(ServiceNotDeployedAction);
        let zero_replicas: Arc<dyn Node> = Arc::new(ServiceWithZeroReplicasAction);
        let fallback: Arc<dyn Node> = Arc::new(DefaultAction);
        let image_pull: Arc<dyn Node> = Arc::new(ImagePullBackOffAction);
        let fix_crashing: Arc<dyn Node> = Arc::new(FixCrashingApplication);
        let fix_health_check: Arc<dyn Node> = Arc::new(FixHealthCheckAction);
        let cluster_full: Arc<dyn Node> = Arc::new(ClusterFullAction);
        let pending_pvc: Arc<dyn Node> = Arc::new(PendingPvcAction::new());
        let contact_admin: Arc<dyn Node> = Arc::new(ContactClusterAdministratorAction);
        let cmd_missing: Arc<dyn Node> = Arc::new(DockerfileCmdMissingAction);
        let try_later: Arc<dyn Node> = Arc::new(TryAfterSometimeAction);
        let unschedulable: Arc<dyn Node> = Arc::new(UnschedulablePodAction);
        let parent_failure: Arc<dyn Node> = Arc::new(ParentFailureAction::new());

        // Conditions, deepest first so successors exist when wired.
        let parent_status: Arc<dyn Node> = Arc::new(ParentStatusCondition {
            not_deployed: not_deployed.clone(),
            zero_replicas,
            parent_failure,
            try_later: try_later.clone(),
        });
        let readiness_failing: Arc<dyn Node> = Arc::new(IsPodsReadinessFailing {
            fix_health_check,
            fix_crashing: fix_crashing.clone(),
            try_later,
        });
        let app_crashing: Arc<dyn Node> = Arc::new(IsApplicationCrashing {
            fix_crashing: fix_crashing.clone(),
            readiness: readiness_failing.clone(),
        });
        let restarts: Arc<dyn Node> = Arc::new(MultipleContainerRestartsCondition {
            crashing: app_crashing,
            readiness: readiness_failing,
        });
        let pods_ready: Arc<dyn Node> = Arc::new(ArePodsReady {
            not_ready: restarts.clone(),
        });
        let pending_pvc_check: Arc<dyn Node> = Arc::new(AnyPendingPvcCondition {
            pending_pvc,
            contact_admin,
        });
        let cluster_full_check: Arc<dyn Node> =
            Arc::new(IsClusterFull::new(cluster_full, pending_pvc_check));
        let missing_cmd: Arc<dyn Node> = Arc::new(MissingCmdOrStartCommandsCondition {
            cmd_missing,
            restarts,
            runner,
        });
        let pod_schedule: Arc<dyn Node> = Arc::new(PodScheduleCondition { unschedulable });

        let entry: Arc<dyn Node> = Arc::new(PodStatusCondition {
            image_pull,
            crash_loop: missing_cmd,
            pending: cluster_full_check,
            running: pods_ready.clone(),
            crashing: fix_crashing,
            terminating: parent_status.clone(),
            no_pods: parent_status,
            fallback,
        });

        assert_acyclic(&entry);
        assert_acyclic(&pod_schedule);

        Self {
            entry,
            pod_schedule,
            pods_ready,
        }
    }

    /// The entry node for a full diagnosis run
    pub fn entry(&self) -> Arc<dyn Node> {
        self.entry.clone()
    }

    /// Alternative entry that only checks pod scheduling
    pub fn pod_schedule(&self) -> Arc<dyn Node> {
        self.pod_schedule.clone()
    }

    /// Alternative entry that starts at the readiness check
    pub fn pods_ready(&self) -> Arc<dyn Node> {
        self.pods_ready.clone()
    }
}

/// Walk the wired graph and panic on a back edge. A cycle here is a
/// programming error in the composition above, not a runtime condition.
fn assert_acyclic(entry: &Arc<dyn Node>) {
    let mut on_path = HashSet::new();
    walk(entry, &mut on_path);
}

fn walk(node: &Arc<dyn Node>, on_path: &mut HashSet<*const ()>) {
    let id = Arc::as_ptr(node) as *const ();
    assert!(
        on_path.insert(id),
        "diagnosis graph contains a cycle through '{}'",
        node.describe()
    );
    for successor in node.successors() {
        walk(&successor, on_path);
    }
    on_path.remove(&id);
}
