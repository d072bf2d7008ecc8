//! Controller configuration from flags and environment

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use ocm_agent_common::telemetry::LogFormat;
use ocm_agent_common::Error;

/// Default connection timeout for the kube client
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for the kube client
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime settings of the controller
#[derive(Args, Debug, Clone)]
pub struct ControllerConfig {
    /// Path to a kubeconfig; in-cluster or default config when unset
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Seconds between periodic re-checks of a converged OcmAgent
    #[arg(long, env = "OCM_AGENT_REQUEUE_SECS", default_value_t = 300)]
    pub requeue_secs: u64,

    /// Seconds before retrying an OcmAgent whose pass failed
    #[arg(long, env = "OCM_AGENT_ERROR_REQUEUE_SECS", default_value_t = 30)]
    pub error_requeue_secs: u64,

    /// Log output format: json or text
    #[arg(long, env = "OCM_AGENT_LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,
}

impl ControllerConfig {
    /// Interval for healthy requeues
    pub fn requeue(&self) -> Duration {
        Duration::from_secs(self.requeue_secs)
    }

    /// Interval for requeues after an error
    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }

    /// Build a kube client with bounded connect and read timeouts
    pub async fn client(&self) -> Result<Client, Error> {
        let mut config = match &self.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    Error::store("client", format!("failed to read kubeconfig: {}", e))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| {
                        Error::store("client", format!("failed to load kubeconfig: {}", e))
                    })?
            }
            None => Config::infer().await.map_err(|e| {
                Error::store("client", format!("failed to infer config: {}", e))
            })?,
        };
        config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
        config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

        Ok(Client::try_from(config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        config: ControllerConfig,
    }

    #[test]
    fn defaults() {
        let h = Harness::try_parse_from(["test"]).unwrap();
        assert_eq!(h.config.requeue(), Duration::from_secs(300));
        assert_eq!(h.config.error_requeue(), Duration::from_secs(30));
        assert_eq!(h.config.log_format, LogFormat::Json);
    }

    #[test]
    fn flags_override_defaults() {
        let h = Harness::try_parse_from([
            "test",
            "--requeue-secs",
            "60",
            "--error-requeue-secs",
            "5",
            "--log-format",
            "text",
            "--kubeconfig",
            "/tmp/kubeconfig",
        ])
        .unwrap();
        assert_eq!(h.config.requeue(), Duration::from_secs(60));
        assert_eq!(h.config.error_requeue(), Duration::from_secs(5));
        assert_eq!(h.config.log_format, LogFormat::Text);
        assert_eq!(h.config.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Harness::try_parse_from(["test", "--log-format", "xml"]).is_err());
    }
}
