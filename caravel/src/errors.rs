//! Error types for the caravel agent

use std::time::Duration;

use thiserror::Error;

use crate::container::runtime::RuntimeError;
use crate::remote::shell::ShellError;

/// Main error type for a deployment run
#[derive(Error, Debug)]
pub enum DeployError {
    /// The instance never reported a healthy status within the wait budget.
    /// Carries the instance id so the caller can still terminate it.
    #[error("instance {instance_id:?} did not become ready within {timeout:?}")]
    ProvisioningTimeout {
        instance_id: Option<String>,
        timeout: Duration,
    },

    #[error("remote access exhausted after {attempts} attempts: {source}")]
    RemoteAccessExhausted {
        attempts: u32,
        #[source]
        source: ShellError,
    },

    #[error("bootstrap script exited with status {exit_code}")]
    ScriptExecution { exit_code: u32 },

    #[error("a container already exists on this host: {id}")]
    ContainerConflict { id: String },

    #[error("no container present on this host")]
    ContainerAbsent,

    #[error("more than one container present on this host ({count})")]
    AmbiguousState { count: usize },

    #[error("container runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("remote session lost: {0}")]
    SessionLost(String),

    #[error("cloud control plane error: {0}")]
    Cloud(String),

    #[error("invalid deployment state transition: {0}")]
    InvalidTransition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ShellError> for DeployError {
    fn from(err: ShellError) -> Self {
        DeployError::SessionLost(err.to_string())
    }
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Internal(err.to_string())
    }
}
