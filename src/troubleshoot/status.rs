//! Pod status aggregation
//!
//! Kubernetes reports pod health across several places: init container
//! states, container waiting/terminated reasons, the deletion timestamp and
//! the pod phase. The helpers here collapse those into one effective status
//! string, and [`PodStatus`] maps the well-known strings onto the closed set
//! of statuses the diagnosis graph routes on.

use k8s_openapi::api::core::v1::{ContainerStatus, Pod};

/// Closed set of aggregated pod statuses the graph dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodStatus {
    ImagePullBackOff,
    ErrImagePull,
    CrashLoopBackOff,
    Pending,
    OomKilled,
    Running,
    Error,
    Completed,
    Terminating,
    RunContainerError,
    Unknown,
}

impl PodStatus {
    /// Map a raw status/reason string onto the closed set. Anything not
    /// recognized lands on `Unknown`, which routes to the generic action.
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "ImagePullBackOff" => PodStatus::ImagePullBackOff,
            "ErrImagePull" => PodStatus::ErrImagePull,
            "CrashLoopBackOff" => PodStatus::CrashLoopBackOff,
            "Pending" => PodStatus::Pending,
            "OOMKilled" => PodStatus::OomKilled,
            "Running" => PodStatus::Running,
            "Error" => PodStatus::Error,
            "Completed" => PodStatus::Completed,
            "Terminating" => PodStatus::Terminating,
            "RunContainerError" => PodStatus::RunContainerError,
            _ => PodStatus::Unknown,
        }
    }

    /// Whether this status represents a failed pod
    pub fn is_failed(&self) -> bool {
        !matches!(self, PodStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PodStatus::ImagePullBackOff => "ImagePullBackOff",
            PodStatus::ErrImagePull => "ErrImagePull",
            PodStatus::CrashLoopBackOff => "CrashLoopBackOff",
            PodStatus::Pending => "Pending",
            PodStatus::OomKilled => "OOMKilled",
            PodStatus::Running => "Running",
            PodStatus::Error => "Error",
            PodStatus::Completed => "Completed",
            PodStatus::Terminating => "Terminating",
            PodStatus::RunContainerError => "RunContainerError",
            PodStatus::Unknown => "Unknown",
        }
    }
}

/// Effective status of a pod right now: init container waiting reasons win,
/// then a pending deletion, then container waiting/terminated reasons, then
/// the pod phase.
pub fn current_status_of(pod: &Pod) -> Option<String> {
    let status = pod.status.as_ref()?;

    if let Some(reason) = init_container_waiting_reason(status.init_container_statuses.as_deref())
    {
        return Some(reason);
    }
    if pod.metadata.deletion_timestamp.is_some() {
        return Some("Terminating".to_string());
    }
    container_status_reason(status.container_statuses.as_deref(), false)
        .or_else(|| status.phase.clone())
}

/// Like [`current_status_of`], but for a non-ready container prefers the
/// reason of its last terminated/waiting state. Used to tell an OOM kill or
/// a clean exit apart from a generic crash.
pub fn last_state_of(pod: &Pod) -> Option<String> {
    let status = pod.status.as_ref()?;

    if let Some(reason) = init_container_waiting_reason(status.init_container_statuses.as_deref())
    {
        return Some(reason);
    }
    if pod.metadata.deletion_timestamp.is_some() {
        return Some("Terminating".to_string());
    }
    container_status_reason(status.container_statuses.as_deref(), true)
        .or_else(|| status.phase.clone())
}

/// Whether the pod carries the given condition type with status "True"
pub fn has_condition(pod: &Pod, condition_type: &str) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == condition_type && c.status == "True")
        })
        .unwrap_or(false)
}

/// Whether any container in the pod has restarted
pub fn has_restarts(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map(|statuses| statuses.iter().any(|c| c.restart_count > 0))
        .unwrap_or(false)
}

fn container_status_reason(
    statuses: Option<&[ContainerStatus]>,
    with_last_state: bool,
) -> Option<String> {
    let statuses = statuses?;
    for each in statuses {
        if with_last_state && !each.ready {
            if let Some(last) = &each.last_state {
                if let Some(terminated) = &last.terminated {
                    return terminated.reason.clone();
                }
                if let Some(waiting) = &last.waiting {
                    return waiting.reason.clone();
                }
            }
        }
        if let Some(state) = &each.state {
            if state.running.is_none() {
                if let Some(terminated) = &state.terminated {
                    return terminated.reason.clone();
                }
                if let Some(waiting) = &state.waiting {
                    return waiting.reason.clone();
                }
            }
        }
    }
    None
}

fn init_container_waiting_reason(statuses: Option<&[ContainerStatus]>) -> Option<String> {
    let statuses = statuses?;
    for each in statuses {
        let Some(state) = &each.state else { continue };
        if state.terminated.is_some() && each.ready {
            continue;
        }
        if let Some(waiting) = &state.waiting {
            return waiting.reason.clone();
        }
    }
    None
}
