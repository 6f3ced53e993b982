//! Container runtime access and workload management

pub mod engine;
pub mod runtime;
pub mod service;

pub use engine::{DockerConnector, DockerEngine};
pub use runtime::{ContainerDetails, ContainerRuntime, ContainerSummary, PullProgress, RuntimeConnector, RuntimeError};
pub use service::{ContainerService, SingletonLookup};
