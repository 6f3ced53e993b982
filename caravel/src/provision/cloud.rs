//! Cloud control plane seam
//!
//! The raw SDK calls live behind this trait; the provisioner only knows
//! about launch, status, describe and terminate.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::instance::{ComputeInstance, InstanceHealth, LaunchTemplate};

/// Control plane errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("create-instance request failed: {0}")]
    Create(String),

    #[error("instance {0} not found")]
    NotFound(String),

    #[error("control plane request failed: {0}")]
    Request(String),
}

/// Raw operations against the cloud control plane.
///
/// Implementations bind a provider SDK; tests use in-memory fakes. Every
/// operation maps 1:1 to a billable control-plane request.
#[async_trait]
pub trait CloudCompute: Send + Sync {
    /// Submit a create-instance request and return the new instance id.
    async fn run_instance(&self, template: &LaunchTemplate) -> Result<String, CloudError>;

    /// Current status-check health of an instance.
    async fn instance_status(&self, id: &str) -> Result<InstanceHealth, CloudError>;

    /// Full instance details (addresses, launch time, state).
    async fn describe_instance(&self, id: &str) -> Result<ComputeInstance, CloudError>;

    /// Request termination. Returns without waiting for teardown.
    async fn terminate_instance(&self, id: &str) -> Result<(), CloudError>;
}
