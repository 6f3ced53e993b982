//! Remote host bootstrap
//!
//! Streams a local setup script to an established session. There is no
//! retry at this layer: retry belongs to connection establishment, and a
//! script failure is assumed non-transient and fatal to the deployment.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::info;

use crate::errors::DeployError;
use crate::remote::shell::{ScriptDelivery, ShellSession};

/// Uploads and executes the local setup script against a remote session.
pub struct RemoteBootstrapper {
    script_path: PathBuf,
}

impl RemoteBootstrapper {
    pub fn new(script_path: impl Into<PathBuf>) -> Self {
        Self {
            script_path: script_path.into(),
        }
    }

    /// Read the script once and run it in real-time delivery mode, so an
    /// operator can observe long-running provisioning live through the
    /// observer channel.
    pub async fn bootstrap<S: ShellSession>(
        &self,
        session: &mut S,
        observer: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), DeployError> {
        let script = tokio::fs::read(&self.script_path).await?;
        info!(
            "Running bootstrap script {} ({} bytes)",
            self.script_path.display(),
            script.len()
        );

        let outcome = session
            .run_script(&script, ScriptDelivery::Streaming(observer))
            .await?;

        if outcome.exit_code != 0 {
            return Err(DeployError::ScriptExecution {
                exit_code: outcome.exit_code,
            });
        }

        info!("Bootstrap script completed");
        Ok(())
    }
}
