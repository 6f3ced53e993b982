//! Finite state machine for a deployment run

use serde::{Deserialize, Serialize};

/// Deployment state.
///
/// One forward path with a single rollback branch: `Terminated` is the
/// explicit-stop exit from log streaming, `Failed` the rollback exit
/// from any stage at or after instance launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// Initial state, nothing provisioned
    Pending,

    /// Create-instance request submitted, polling readiness
    InstanceLaunching,

    /// Instance passed its status checks
    InstanceReady,

    /// Retrying the remote shell connection
    Connecting,

    /// Remote session established
    Connected,

    /// Bootstrap script running
    Bootstrapping,

    /// Bootstrap script exited 0
    Bootstrapped,

    /// Workload image downloading
    PullingImage,

    /// Container created, not yet started
    ContainerCreating,

    /// Container running
    ContainerRunning,

    /// Mirroring the container log stream, waiting for the stop signal
    LogStreaming,

    /// Explicitly stopped; workload left running
    Terminated,

    /// Rolled back after a fatal error
    Failed,
}

impl DeploymentState {
    /// Terminal states accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Terminated | DeploymentState::Failed)
    }
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Submit the create-instance request
    Launch,

    /// Instance reported healthy
    Ready,

    /// Begin the connection retry loop
    Connect,

    /// Remote session established
    Connected,

    /// Begin the bootstrap script
    Bootstrap,

    /// Bootstrap script exited 0
    Bootstrapped,

    /// Begin the image pull
    PullImage,

    /// Image pulled, container created
    ImagePulled,

    /// Container started
    Started,

    /// Begin mirroring the log stream
    StreamLogs,

    /// External stop signal received
    Stop,

    /// Fatal error at or after instance launch
    Fail(String),
}

/// Deployment FSM
#[derive(Debug, Clone)]
pub struct DeploymentFsm {
    state: DeploymentState,
    error: Option<String>,
}

impl DeploymentFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: DeploymentState::Pending,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeploymentEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (DeploymentState::Pending, DeploymentEvent::Launch) => {
                DeploymentState::InstanceLaunching
            }

            (DeploymentState::InstanceLaunching, DeploymentEvent::Ready) => {
                DeploymentState::InstanceReady
            }

            (DeploymentState::InstanceReady, DeploymentEvent::Connect) => {
                DeploymentState::Connecting
            }

            (DeploymentState::Connecting, DeploymentEvent::Connected) => {
                DeploymentState::Connected
            }

            (DeploymentState::Connected, DeploymentEvent::Bootstrap) => {
                DeploymentState::Bootstrapping
            }

            (DeploymentState::Bootstrapping, DeploymentEvent::Bootstrapped) => {
                DeploymentState::Bootstrapped
            }

            (DeploymentState::Bootstrapped, DeploymentEvent::PullImage) => {
                DeploymentState::PullingImage
            }

            (DeploymentState::PullingImage, DeploymentEvent::ImagePulled) => {
                DeploymentState::ContainerCreating
            }

            (DeploymentState::ContainerCreating, DeploymentEvent::Started) => {
                DeploymentState::ContainerRunning
            }

            (DeploymentState::ContainerRunning, DeploymentEvent::StreamLogs) => {
                DeploymentState::LogStreaming
            }

            (DeploymentState::LogStreaming, DeploymentEvent::Stop) => DeploymentState::Terminated,

            // Rollback branch: any non-terminal state at or after launch
            (state, DeploymentEvent::Fail(err))
                if !state.is_terminal() && *state != DeploymentState::Pending =>
            {
                self.error = Some(err.clone());
                DeploymentState::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for DeploymentFsm {
    fn default() -> Self {
        Self::new()
    }
}
