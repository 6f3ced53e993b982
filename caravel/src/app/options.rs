//! Deployment configuration options
//!
//! Everything the original target environment pinned as fixed
//! identifiers lives here explicitly, passed to the orchestrator at
//! construction.

use std::path::PathBuf;

use crate::container::engine::DEFAULT_RUNTIME_PORT;
use crate::provision::provisioner::ProvisionSettings;
use crate::remote::client::RetryOptions;
use crate::remote::shell::ShellIdentity;

/// Main deployment options
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Machine image launched for every instance
    pub image_id: String,

    /// Key-pair identity installed on the instance
    pub key_pair_name: String,

    /// Login user on the deployment target (a provider-specific default)
    pub login_user: String,

    /// Path to the private key matching `key_pair_name`
    pub key_path: PathBuf,

    /// Remote shell port
    pub remote_port: u16,

    /// Container runtime port on the instance
    pub runtime_port: u16,

    /// Local bootstrap script streamed to the instance
    pub bootstrap_script: PathBuf,

    /// Instance readiness polling bounds
    pub provision: ProvisionSettings,

    /// Remote shell connection retry policy
    pub connect: RetryOptions,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            image_id: "ami-0c101f26f147fa7fd".to_string(),
            key_pair_name: "cloudservers".to_string(),
            login_user: "ec2-user".to_string(),
            key_path: PathBuf::from("cloudservers.pem"),
            remote_port: 22,
            runtime_port: DEFAULT_RUNTIME_PORT,
            bootstrap_script: PathBuf::from("scripts/bootstrap.sh"),
            provision: ProvisionSettings::default(),
            connect: RetryOptions::default(),
        }
    }
}

impl DeployOptions {
    /// The shell identity used against every instance of this deployment
    pub fn shell_identity(&self) -> ShellIdentity {
        ShellIdentity {
            user: self.login_user.clone(),
            key_path: self.key_path.clone(),
            port: self.remote_port,
        }
    }
}
