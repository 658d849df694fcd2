//! stevedore - deploy containerized services to Kubernetes and diagnose why they fail

pub mod cli;
pub mod client;
pub mod commands;
pub mod error;
pub mod troubleshoot;
