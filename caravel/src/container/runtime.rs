//! Container runtime seam
//!
//! Raw operations against one remote container-runtime endpoint. The
//! HTTP implementation lives in `container::engine`; tests use in-memory
//! fakes. All mutating operations on a host go through one runtime value
//! and are serialized by ownership.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::models::container::ContainerSpec;

/// Errors from the runtime endpoint
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("container runtime request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("container runtime returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("image pull failed: {0}")]
    Pull(String),

    #[error("unexpected runtime response: {0}")]
    Decode(String),
}

/// One entry from a container listing
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Runtime state string, e.g. "created" or "running"
    pub state: String,
}

/// Full details of one container, with its configuration reconstituted
/// as a `ContainerSpec` so it can be recreated.
#[derive(Debug, Clone)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    pub running: bool,
    pub spec: ContainerSpec,
}

/// One event from an image pull's progress stream
#[derive(Debug, Clone, Default)]
pub struct PullProgress {
    pub status: Option<String>,
    pub progress: Option<String>,
    /// Terminal error reported inside the stream
    pub error: Option<String>,
}

/// Raw operations against the container runtime endpoint.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List all containers on the host, including stopped ones.
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError>;

    /// Inspect one container.
    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError>;

    /// Create a container from the spec. Returns the new container id;
    /// the container is not started.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    /// Start a created container.
    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Force-remove a container. Bound volumes are retained; they are
    /// long-lived deployment state that outlives container churn.
    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Trigger an image pull and return its progress-event stream.
    async fn pull_image(
        &self,
        image: &str,
    ) -> Result<BoxStream<'static, Result<PullProgress, RuntimeError>>, RuntimeError>;

    /// Stream merged stdout/stderr log bytes. Infinite while `follow`.
    async fn container_logs(
        &self,
        id: &str,
        follow: bool,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, RuntimeError>>, RuntimeError>;
}

/// Produces a runtime client for a host once its address is known.
#[async_trait]
pub trait RuntimeConnector: Send + Sync {
    type Runtime: ContainerRuntime + 'static;

    async fn connect(&self, host: &str) -> Result<Self::Runtime, RuntimeError>;
}
