// lib/crates/workbay-common/src/environment.rs

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// User-authored workspace environment.
///
/// `machines` carries per-machine metadata (agents, servers, attributes).
/// For `dockerfile` and `image` recipes its single key is the machine name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredEnvironment {
    pub recipe: Recipe,
    #[serde(default)]
    pub machines: IndexMap<String, MachineConfig>,
}

/// Environment recipe, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Recipe {
    /// Multi-service compose-style definition.
    Compose {
        #[serde(default)]
        services: IndexMap<String, ServiceSpec>,
    },
    /// Single Dockerfile, inline or by location.
    Dockerfile {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        location: Option<String>,
    },
    /// Single pre-built image reference.
    Image { image: String },
}

impl Recipe {
    /// Stable discriminant string, identical to the serialized `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Recipe::Compose { .. } => "compose",
            Recipe::Dockerfile { .. } => "dockerfile",
            Recipe::Image { .. } => "image",
        }
    }
}

/// Per-machine declarations that are not part of the recipe itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub servers: IndexMap<String, ServerConfig>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Named network endpoint of a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `"8080"` or `"8080/udp"`.
    pub port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ServerConfig {
    /// Attribute that keeps a server off the published port list.
    pub const INTERNAL_ATTRIBUTE: &'static str = "internal";

    /// Returns `true` when the server is marked `internal=true`.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.attributes
            .get(Self::INTERNAL_ATTRIBUTE)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// One compose service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub command: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub entrypoint: Vec<String>,
    #[serde(default, deserialize_with = "map_or_list")]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub expose: Vec<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub volumes_from: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<u64>,
}

/// Compose `build` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_content: Option<String>,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

impl BuildSpec {
    /// A build section must point at something buildable.
    #[must_use]
    pub fn has_source(&self) -> bool {
        self.context.as_deref().is_some_and(|c| !c.is_empty())
            || self.dockerfile_content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

/// Compose accepts `command: "npm start"` as well as a list.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(s) => s.split_whitespace().map(str::to_owned).collect(),
        StringOrList::Many(v) => v,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MapOrList {
    Map(IndexMap<String, String>),
    List(Vec<String>),
}

/// Compose accepts `environment` as a map or as `KEY=VALUE` lines.
fn map_or_list<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(m) => m,
        MapOrList::List(lines) => lines
            .into_iter()
            .map(|line| match line.split_once('=') {
                Some((k, v)) => (k.to_owned(), v.to_owned()),
                None => (line, String::new()),
            })
            .collect(),
    })
}
