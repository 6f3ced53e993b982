//! Compute instance models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a compute instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Pending,
    Running,
    Terminated,
}

/// Readiness reported by the control plane's status checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceHealth {
    /// Status checks have not passed yet
    Initializing,

    /// The instance is reachable and healthy
    Ok,

    /// The control plane reports the instance as impaired
    Unhealthy,
}

/// A cloud-provisioned virtual machine.
///
/// Addresses are optional because a pending instance has none assigned
/// yet; `InstanceProvisioner::launch` only returns instances whose public
/// address is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeInstance {
    /// Control-plane instance id; the join key used by all later stages
    pub id: String,

    /// Instance type, e.g. "t3.small"
    pub instance_type: String,

    /// Publicly routable address
    pub public_address: Option<String>,

    /// Address inside the provider network
    pub private_address: Option<String>,

    /// When the instance was launched
    pub launch_time: DateTime<Utc>,

    /// Current lifecycle state
    pub state: InstanceState,
}

/// Parameters of a create-instance request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTemplate {
    /// Machine image id
    pub image_id: String,

    /// Instance type from the selected plan
    pub instance_type: String,

    /// Key-pair identity installed on the instance
    pub key_pair_name: String,

    /// Always 1; exactly one instance per deployment
    pub min_count: u32,

    /// Always 1; exactly one instance per deployment
    pub max_count: u32,
}

impl LaunchTemplate {
    pub fn new(
        image_id: impl Into<String>,
        instance_type: impl Into<String>,
        key_pair_name: impl Into<String>,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            instance_type: instance_type.into(),
            key_pair_name: key_pair_name.into(),
            min_count: 1,
            max_count: 1,
        }
    }
}
