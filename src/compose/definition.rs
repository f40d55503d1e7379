use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Parsed compose document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeDefinition {
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,

    #[serde(default, deserialize_with = "nullable_services")]
    pub services: BTreeMap<String, ServiceDefinition>,

    /// `networks`, `volumes`, `x-*` extensions and anything else.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// One entry of the `services` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ComposeDefinition {
    /// Declared service names, sorted.
    pub fn service_names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    pub fn declares(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }
}

/// `version: 3.8` and `version: "3.8"` are both accepted by compose.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "version must be a string or a number, got {:?}",
            other
        ))),
    }
}

/// `services:` with no body is null in YAML; treat it as "no services",
/// and treat a null service body as an empty one.
fn nullable_services<'de, D>(deserializer: D) -> Result<BTreeMap<String, ServiceDefinition>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<ServiceDefinition>>> =
        Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, service)| (name, service.unwrap_or_default()))
        .collect())
}
