//! Deployment orchestration

pub mod fsm;
pub mod orchestrator;

pub use fsm::{DeploymentEvent, DeploymentFsm, DeploymentState};
pub use orchestrator::{DeploymentOrchestrator, DeploymentReport};
