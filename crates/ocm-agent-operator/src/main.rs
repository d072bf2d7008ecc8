//! OcmAgent operator - keeps every OcmAgent fenced in by its NetworkPolicies

use std::sync::Arc;

use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use tokio_util::sync::CancellationToken;

use ocm_agent_common::crd::OcmAgent;
use ocm_agent_common::telemetry::init_logging;
use ocm_agent_operator::{run, Context, ControllerConfig};

/// Controller converging the NetworkPolicies of OcmAgent resources
#[derive(Parser, Debug)]
#[command(name = "ocm-agent-operator", version, about, long_about = None)]
struct Cli {
    /// Print the OcmAgent CRD manifest and exit
    #[arg(long)]
    crd: bool,

    #[command(flatten)]
    config: ControllerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    Controller,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&OcmAgent::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    init_logging(cli.config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.config).await,
    }
}

async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    let client = config
        .client()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let ctx = Arc::new(Context::new(
        client.clone(),
        config.requeue(),
        config.error_requeue(),
        shutdown,
    ));

    tracing::info!(
        requeue_secs = config.requeue_secs,
        error_requeue_secs = config.error_requeue_secs,
        "OcmAgent operator starting"
    );
    run(client, ctx).await;
    Ok(())
}

/// Cancel in-flight passes once SIGINT or SIGTERM arrives
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut term =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(term) => term,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    shutdown.cancel();
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    tracing::info!("Shutdown signal received, cancelling in-flight reconciles");
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_is_the_default_mode() {
        let cli = Cli::try_parse_from(["ocm-agent-operator"]).unwrap();
        assert!(!cli.crd);
        assert!(cli.command.is_none());
    }

    #[test]
    fn crd_flag_is_recognised() {
        let cli = Cli::try_parse_from(["ocm-agent-operator", "--crd"]).unwrap();
        assert!(cli.crd);
    }

    #[test]
    fn crd_manifest_serializes() {
        let yaml = serde_yaml::to_string(&OcmAgent::crd()).unwrap();
        assert!(yaml.contains("ocmagents.ocmagent.managed.openshift.io"));
        assert!(yaml.contains("kind: CustomResourceDefinition"));
    }
}
