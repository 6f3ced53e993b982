//! Container models and wire conversions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the managed container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Created,
    Running,
    Removed,
}

/// The single managed container on a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInstance {
    /// Runtime-assigned container id
    pub id: String,

    /// Runtime-assigned container name
    pub name: String,

    /// Current lifecycle state
    pub state: ContainerState,
}

/// A volume bound into the container: a named volume or host path mapped
/// to a container path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeBinding {
    /// Named volume or host path
    pub source: String,

    /// Mount point inside the container
    pub target: String,
}

impl VolumeBinding {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// The runtime's `source:target` bind string
    pub fn to_bind_string(&self) -> String {
        format!("{}:{}", self.source, self.target)
    }

    /// Parse a `source:target` bind string
    pub fn from_bind_string(bind: &str) -> Option<Self> {
        let (source, target) = bind.split_once(':')?;
        Some(Self::new(source, target))
    }
}

/// Desired configuration for the single managed container.
///
/// Environment is a mapping (keys unique, order unspecified); volume
/// bindings keep their declared order; port keys are `"<port>/<proto>"`,
/// e.g. `"25565/tcp"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Image reference, e.g. "itzg/minecraft-server"
    pub image: String,

    /// Environment variables
    pub env: BTreeMap<String, String>,

    /// Volume bindings in declaration order
    pub volume_bindings: Vec<VolumeBinding>,

    /// Container port/proto to host port
    pub port_bindings: BTreeMap<String, u16>,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Environment in the runtime's `KEY=VALUE` list form
    pub fn env_list(&self) -> Vec<String> {
        self.env
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }

    /// Parse a `KEY=VALUE` list back into a mapping. Entries without `=`
    /// are dropped; a later duplicate key wins.
    pub fn env_from_list(list: &[String]) -> BTreeMap<String, String> {
        list.iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    /// Volume bindings in the runtime's bind-string list form
    pub fn bind_list(&self) -> Vec<String> {
        self.volume_bindings
            .iter()
            .map(VolumeBinding::to_bind_string)
            .collect()
    }
}
