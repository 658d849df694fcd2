//! Troubleshoot command implementation

use crate::cli::{OutputFormat, TroubleshootArgs};
use crate::client::create_client;
use crate::error::{Result, StevedoreError};
use crate::troubleshoot::inspect::ProcessRunner;
use crate::troubleshoot::{builder, report, DiagnosisEngine, DiagnosisGraph, ServiceIdentity};
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Execute the troubleshoot command
pub async fn run_troubleshoot(
    context: Option<&str>,
    namespace: Option<&str>,
    args: &TroubleshootArgs,
    output: OutputFormat,
) -> Result<()> {
    let client = create_client(context).await?;
    let namespace = namespace.unwrap_or("default");
    let service = ServiceIdentity::new(&args.app, &args.service, namespace);

    let diagnosis_context = builder::build_context(&client, service, args.trace).await?;

    let graph = DiagnosisGraph::new(Arc::new(ProcessRunner::default()));
    let engine =
        DiagnosisEngine::new().with_deadline(Instant::now() + Duration::from_secs(args.timeout));

    let mut diagnosis_context = diagnosis_context;
    let reports = match engine.diagnose(graph.entry(), &mut diagnosis_context).await {
        Ok(reports) => reports,
        Err(StevedoreError::ServiceNotDeployed(service)) => {
            eprintln!(
                "{} service '{}' is not deployed; check the deployment status",
                "error:".red().bold(),
                service
            );
            return Err(StevedoreError::ServiceNotDeployed(service));
        }
        Err(err) => return Err(err),
    };

    match output {
        OutputFormat::Json => println!("{}", report::format_json(&reports, true)?),
        OutputFormat::Yaml => println!("{}", report::format_yaml(&reports)?),
        OutputFormat::Text => {
            if reports.is_empty() {
                println!("{}", report::format_text(&reports).green());
            } else {
                println!("{}", report::format_text(&reports));
            }
        }
    }
    Ok(())
}
