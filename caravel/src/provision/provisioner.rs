//! Instance provisioner
//!
//! Launches one instance, polls its readiness on a bounded jittered
//! interval, and terminates it on request. Every instance id returned by
//! `launch` must eventually be passed to `terminate` unless the instance
//! is meant to outlive the run.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::errors::DeployError;
use crate::models::instance::{ComputeInstance, InstanceHealth, LaunchTemplate};
use crate::models::plan::DeploymentPlan;
use crate::provision::cloud::{CloudCompute, CloudError};
use crate::utils::{default_sleep, SleepFn};

/// Readiness polling bounds
#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    /// Minimum delay between status polls
    pub min_delay: Duration,

    /// Maximum delay between status polls
    pub max_delay: Duration,

    /// Total wait budget before giving up on readiness
    pub timeout: Duration,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(15),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Creates, polls readiness of, and terminates a compute instance.
pub struct InstanceProvisioner {
    cloud: Arc<dyn CloudCompute>,
    image_id: String,
    key_pair_name: String,
    settings: ProvisionSettings,
    sleep: SleepFn,
}

impl InstanceProvisioner {
    pub fn new(
        cloud: Arc<dyn CloudCompute>,
        image_id: impl Into<String>,
        key_pair_name: impl Into<String>,
        settings: ProvisionSettings,
    ) -> Self {
        Self {
            cloud,
            image_id: image_id.into(),
            key_pair_name: key_pair_name.into(),
            settings,
            sleep: default_sleep(),
        }
    }

    /// Replace the sleep function (tests)
    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = sleep;
        self
    }

    /// Launch one instance for the plan and wait until it is ready.
    ///
    /// The wait budget is accounted as the sum of slept delays, so the
    /// loop terminates deterministically under an injected sleep. On
    /// timeout the error carries the instance id; the instance exists and
    /// is billable until terminated.
    pub async fn launch(&self, plan: &DeploymentPlan) -> Result<ComputeInstance, DeployError> {
        let template = LaunchTemplate::new(
            self.image_id.clone(),
            plan.instance_type.clone(),
            self.key_pair_name.clone(),
        );

        info!(
            "Launching instance (image {}, type {})",
            template.image_id, template.instance_type
        );
        let id = self
            .cloud
            .run_instance(&template)
            .await
            .map_err(|e| DeployError::Cloud(e.to_string()))?;
        info!("Created instance {}", id);

        self.wait_until_ready(&id).await?;

        // Addresses are only assigned once the instance runs; re-fetch the
        // full details before handing the instance to later stages.
        let instance = self
            .cloud
            .describe_instance(&id)
            .await
            .map_err(|e| DeployError::Cloud(e.to_string()))?;
        info!(
            "Instance {} ready (public {:?}, private {:?})",
            instance.id, instance.public_address, instance.private_address
        );
        Ok(instance)
    }

    async fn wait_until_ready(&self, id: &str) -> Result<(), DeployError> {
        let mut waited = Duration::ZERO;
        let mut ceiling = self.settings.min_delay;

        loop {
            match self.cloud.instance_status(id).await {
                Ok(InstanceHealth::Ok) => return Ok(()),
                Ok(InstanceHealth::Initializing) => {
                    debug!("Instance {} still initializing", id);
                }
                Ok(InstanceHealth::Unhealthy) => {
                    warn!("Instance {} reports unhealthy status checks", id);
                }
                Err(CloudError::NotFound(_)) => {
                    // The control plane can lag behind its own create call.
                    debug!("Instance {} not visible yet", id);
                }
                Err(e) => return Err(DeployError::Cloud(e.to_string())),
            }

            if waited >= self.settings.timeout {
                return Err(DeployError::ProvisioningTimeout {
                    instance_id: Some(id.to_string()),
                    timeout: self.settings.timeout,
                });
            }

            let delay = jittered(self.settings.min_delay, ceiling);
            debug!("Waiting {:?} before next status poll", delay);
            (self.sleep)(delay).await;
            waited += delay;
            ceiling = (ceiling * 2).min(self.settings.max_delay);
        }
    }

    /// Request termination of an instance. Idempotent: terminating an
    /// instance that never became ready, or that is already gone, is
    /// success.
    pub async fn terminate(&self, id: &str) -> Result<(), DeployError> {
        info!("Terminating instance {}", id);
        match self.cloud.terminate_instance(id).await {
            Ok(()) | Err(CloudError::NotFound(_)) => Ok(()),
            Err(e) => Err(DeployError::Cloud(e.to_string())),
        }
    }
}

/// A random delay between `min` and the current backoff ceiling.
fn jittered(min: Duration, ceiling: Duration) -> Duration {
    if ceiling <= min {
        return min;
    }
    let millis = rand::thread_rng().gen_range(min.as_millis() as u64..=ceiling.as_millis() as u64);
    Duration::from_millis(millis)
}
