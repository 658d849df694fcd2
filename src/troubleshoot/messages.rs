//! User-facing diagnosis messages
//!
//! Every finding the engine can emit is built here so the wording lives in
//! one place. Action nodes call these constructors instead of formatting
//! strings inline.

use super::types::DiagnosisReport;

pub fn service_not_deployed(service: &str) -> DiagnosisReport {
    DiagnosisReport::new(
        format!("No service \"{service}\" found in this cluster"),
        "Ensure you are querying for the correct service name in the correct namespace and cluster",
    )
}

pub fn service_with_zero_replicas(service: &str) -> DiagnosisReport {
    DiagnosisReport::new(
        format!("Service \"{service}\" is deployed in the cluster with 0 replicas"),
        "Scale the service up to at least one replica",
    )
}

pub fn cannot_infer_error() -> DiagnosisReport {
    DiagnosisReport::new(
        "Cannot determine the cause of failure from the existing state of the deployment",
        "Try redeploying or contact your cluster administrator",
    )
}

pub fn contact_cluster_administrator() -> DiagnosisReport {
    DiagnosisReport::new("Please contact your cluster administrator", "")
}

pub fn cannot_find_events() -> DiagnosisReport {
    DiagnosisReport::new(
        "Cannot determine the cause of failure since recent events for this deployment are gone",
        "Try redeploying to troubleshoot",
    )
}

pub fn not_enough_memory(service: &str) -> DiagnosisReport {
    DiagnosisReport::new(
        format!("Out of memory errors. Not enough memory to run \"{service}\""),
        "Increase the memory limits in the service spec and redeploy",
    )
}

pub fn invalid_start_commands() -> DiagnosisReport {
    DiagnosisReport::new(
        "Service container exited abruptly",
        "Possible incorrect startCommands in the service spec or CMD in the Dockerfile",
    )
}

pub fn application_crash() -> DiagnosisReport {
    DiagnosisReport::new(
        "Service observed to be crashing",
        "Verify the startCommands in the service spec or CMD in the Dockerfile",
    )
}

pub fn health_check_failure() -> DiagnosisReport {
    DiagnosisReport::new(
        "Health check specified for the service failed repeatedly",
        "Verify the health check port and path in the service spec",
    )
}

pub fn cluster_full() -> DiagnosisReport {
    DiagnosisReport::new(
        "Cannot accommodate new services as the cluster is full",
        "Contact your cluster administrator to add capacity or deploy to a different cluster",
    )
}

pub fn fix_image_name(service: &str) -> DiagnosisReport {
    DiagnosisReport::new(
        "Invalid image name or tag provided",
        format!("Recheck the image name and tag in the \"{service}\" service spec"),
    )
}

pub fn invalid_registry_credentials(service: &str) -> DiagnosisReport {
    DiagnosisReport::new(
        format!("Invalid target registry credentials for \"{service}\""),
        "Verify the registry credentials configured for the deployment",
    )
}

pub fn dockerfile_cmd_missing() -> DiagnosisReport {
    DiagnosisReport::new(
        "Service observed to be crashing. Possible errors in ENTRYPOINT/CMD in the Dockerfile or missing ENTRYPOINT",
        "Add a CMD or ENTRYPOINT to the Dockerfile, or startCommands to the service spec",
    )
}

pub fn pod_unschedulable() -> DiagnosisReport {
    DiagnosisReport::new(
        "Pods of the service cannot be scheduled onto any cluster node",
        "Check node capacity, taints and resource requests, or contact your cluster administrator",
    )
}

pub fn pending_pvc(service: &str) -> DiagnosisReport {
    DiagnosisReport::new(
        format!("Volumes for service \"{service}\" are stuck provisioning, a PersistentVolumeClaim is Pending"),
        "Check that the storage class exists and its provisioner is healthy",
    )
}

pub fn no_storage_class_found() -> DiagnosisReport {
    DiagnosisReport::new(
        "Cannot provision new volumes, no storage class configured in your cluster",
        "Please contact your cluster administrator",
    )
}

pub fn invalid_storage_class(service: &str) -> DiagnosisReport {
    DiagnosisReport::new(
        format!("Incorrect storage class for volumes in the \"{service}\" service spec"),
        "Provide a storage class that exists in the cluster",
    )
}

pub fn invalid_volume_name() -> DiagnosisReport {
    DiagnosisReport::new(
        "Volume name provided in the service spec is invalid",
        "Volume names must be at most 63 characters of lowercase alphanumerics and '-'",
    )
}

pub fn multiple_default_storage_classes() -> DiagnosisReport {
    DiagnosisReport::new(
        "Volume creation failed. More than one default storage class is configured on the cluster",
        "Provide a storage class name in the service spec or have a single default configured",
    )
}

pub fn invalid_resource_name(resource: &str) -> DiagnosisReport {
    DiagnosisReport::new(
        format!("{resource} available in the cluster has an invalid name"),
        "Fix the resource name and redeploy",
    )
}

pub fn try_after_sometime() -> DiagnosisReport {
    DiagnosisReport::new(
        "Deployment is still in progress, the service is not yet ready",
        "Try querying again after some time",
    )
}
