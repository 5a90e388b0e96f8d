//! Engine-neutral container-set description.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::Serialize;

/// Normalized environment: machine name → container config, in declaration
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentModel {
    pub machines: IndexMap<String, ContainerConfig>,
}

impl EnvironmentModel {
    #[must_use]
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ContainerConfig> {
        self.machines.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ContainerConfig> {
        self.machines.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContainerConfig)> {
        self.machines.iter()
    }

    pub fn machine_names(&self) -> impl Iterator<Item = &str> {
        self.machines.keys().map(String::as_str)
    }
}

/// Everything the engine needs to create one container.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildContext>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    /// `port[/proto]` entries.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub expose: BTreeSet<String>,
    /// Subset of `expose` mapped to host ports.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub ports: BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes_from: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<u64>,
}

/// Where to build the image from when no image reference is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile_content: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

/// Strip a compose link alias: `db:database` → `db`.
#[must_use]
pub fn link_target(link: &str) -> &str {
    link.split_once(':').map_or(link, |(name, _)| name)
}
