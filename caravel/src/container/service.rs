//! Container service
//!
//! Capability layer over the raw runtime. Enforces the singleton
//! invariant: at most one managed container may exist on a host, and it
//! is always addressed as "the one container on this host", never by
//! caller-supplied id from outside the run.

use std::collections::BTreeMap;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, info};

use crate::container::runtime::{ContainerRuntime, RuntimeError};
use crate::errors::DeployError;
use crate::models::container::{ContainerInstance, ContainerSpec, ContainerState};

/// Outcome of a singleton lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingletonLookup {
    /// No container on the host
    Absent,

    /// Exactly one container on the host
    Present(ContainerInstance),
}

/// Manages the single workload container on one host.
pub struct ContainerService<R> {
    runtime: R,
}

impl<R: ContainerRuntime> ContainerService<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    /// The one container on this host, if any. More than one is
    /// `AmbiguousState`: another actor has touched the host and the
    /// singleton assumption no longer holds.
    pub async fn get_singleton(&self) -> Result<SingletonLookup, DeployError> {
        let mut containers = self.runtime.list_containers().await?;
        match containers.len() {
            0 => Ok(SingletonLookup::Absent),
            1 => {
                let entry = containers.remove(0);
                let state = if entry.state == "running" {
                    ContainerState::Running
                } else {
                    ContainerState::Created
                };
                Ok(SingletonLookup::Present(ContainerInstance {
                    id: entry.id,
                    name: entry.name,
                    state,
                }))
            }
            count => Err(DeployError::AmbiguousState { count }),
        }
    }

    /// Pull an image, consuming the progress-event stream until
    /// completion. Progress is observational; only a terminal error event
    /// or a transport failure fails the pull.
    pub async fn pull_image(&self, image: &str) -> Result<(), DeployError> {
        info!("Pulling image {}", image);
        let mut progress = self.runtime.pull_image(image).await?;
        while let Some(event) = progress.next().await {
            let event = event?;
            if let Some(error) = event.error {
                return Err(DeployError::Runtime(RuntimeError::Pull(error)));
            }
            if let Some(status) = event.status {
                debug!("Pull progress: {}", status);
            }
        }
        info!("Image {} pulled", image);
        Ok(())
    }

    /// Create the workload container: refuse if any container already
    /// exists on the host, pull the image, then create (not started).
    pub async fn create(&self, spec: &ContainerSpec) -> Result<ContainerInstance, DeployError> {
        if let SingletonLookup::Present(existing) = self.get_singleton().await? {
            return Err(DeployError::ContainerConflict { id: existing.id });
        }

        self.pull_image(&spec.image).await?;

        let id = self.runtime.create_container(spec).await?;
        let details = self.runtime.inspect_container(&id).await?;
        info!("Created container {} ({})", details.name, id);
        Ok(ContainerInstance {
            id,
            name: details.name,
            state: ContainerState::Created,
        })
    }

    /// Start a created container.
    pub async fn start(&self, id: &str) -> Result<(), DeployError> {
        self.runtime.start_container(id).await?;
        info!("Started container {}", id);
        Ok(())
    }

    /// Replace the container environment by remove-then-recreate; the
    /// runtime cannot mutate a container's environment in place.
    ///
    /// Existing entries are preserved unless `new_env` supplies the same
    /// key, in which case the new value wins. The container id changes;
    /// bound volumes do not. If the old container was running, the
    /// replacement is started again.
    pub async fn update_environment(
        &self,
        new_env: &BTreeMap<String, String>,
    ) -> Result<ContainerInstance, DeployError> {
        let current = match self.get_singleton().await? {
            SingletonLookup::Present(current) => current,
            SingletonLookup::Absent => return Err(DeployError::ContainerAbsent),
        };

        let details = self.runtime.inspect_container(&current.id).await?;
        let was_running = details.running;
        let mut spec = details.spec;
        spec.env = merge_env(&spec.env, new_env);

        info!(
            "Recreating container {} with updated environment",
            current.id
        );
        self.remove(&current.id).await?;
        let mut replacement = self.create(&spec).await?;
        if was_running {
            self.start(&replacement.id).await?;
            replacement.state = ContainerState::Running;
        }
        Ok(replacement)
    }

    /// Force-remove a container. Bound volumes are retained.
    pub async fn remove(&self, id: &str) -> Result<(), DeployError> {
        self.runtime.remove_container(id).await?;
        info!("Removed container {}", id);
        Ok(())
    }

    /// Stream merged stdout/stderr bytes. Infinite while `follow`; the
    /// caller stops the stream by dropping it.
    pub async fn stream_logs(
        &self,
        id: &str,
        follow: bool,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, RuntimeError>>, DeployError> {
        let stream = self.runtime.container_logs(id, follow).await?;
        Ok(stream)
    }
}

/// Merge `new_env` over `existing`: new values win on key collision,
/// everything else is preserved. Mapping semantics, order unspecified.
pub fn merge_env(
    existing: &BTreeMap<String, String>,
    new_env: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = existing.clone();
    for (key, value) in new_env {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
