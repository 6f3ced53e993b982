//! Deployment plan models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named sizing tier selected before a run. Immutable for the run's
/// duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Tier name, e.g. "small"
    pub name: String,

    /// Cloud instance type, e.g. "t3.small"
    pub instance_type: String,

    /// Initial memory allocation for the workload, e.g. "1G"
    pub init_memory: String,

    /// Maximum memory allocation for the workload, e.g. "1G"
    pub max_memory: String,
}

impl DeploymentPlan {
    pub fn new(
        name: impl Into<String>,
        instance_type: impl Into<String>,
        init_memory: impl Into<String>,
        max_memory: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instance_type: instance_type.into(),
            init_memory: init_memory.into(),
            max_memory: max_memory.into(),
        }
    }

    /// Smallest tier
    pub fn small() -> Self {
        Self::new("small", "t3.small", "1G", "1G")
    }

    /// Mid tier
    pub fn medium() -> Self {
        Self::new("medium", "t3.medium", "2G", "2G")
    }

    /// Large tier
    pub fn large() -> Self {
        Self::new("large", "t3.large", "4G", "4G")
    }

    /// Memory sizing as workload environment entries, for merging into a
    /// container spec by the caller.
    pub fn memory_env(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("INIT_MEMORY".to_string(), self.init_memory.clone()),
            ("MAX_MEMORY".to_string(), self.max_memory.clone()),
        ])
    }
}
