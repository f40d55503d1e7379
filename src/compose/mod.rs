//! Compose definition parsing and validation.
//!
//! A service's definition is a compose-style YAML document. The engine only
//! needs a handful of facts from it (which services it declares, and that it
//! is well formed), so the model here is deliberately shallow: known keys are
//! typed, everything else is carried through as raw YAML.

mod definition;
mod validation;

pub use definition::{ComposeDefinition, ServiceDefinition};
pub use validation::{validate_definition, DefinitionIssue};

use crate::error::{Error, Result};

/// Anything that turns definition text into a [`ComposeDefinition`].
pub trait DefinitionParser: Send + Sync {
    /// Parse without semantic checks. A document that declares no services
    /// parses successfully; use [`DefinitionParser::parse_valid`] when
    /// accepting new definitions.
    fn parse(&self, text: &str) -> Result<ComposeDefinition>;

    /// Parse and require a definition that can actually be run.
    fn parse_valid(&self, text: &str) -> Result<ComposeDefinition> {
        let definition = self.parse(text)?;
        let issues = validate_definition(&definition);
        if issues.is_empty() {
            Ok(definition)
        } else {
            let joined = issues
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            Err(Error::InvalidDefinition(joined))
        }
    }
}

/// [`DefinitionParser`] for compose YAML, backed by `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDefinitionParser;

impl YamlDefinitionParser {
    pub fn new() -> Self {
        Self
    }
}

impl DefinitionParser for YamlDefinitionParser {
    fn parse(&self, text: &str) -> Result<ComposeDefinition> {
        if text.trim().is_empty() {
            return Err(Error::InvalidDefinition("definition is empty".to_string()));
        }
        let value: serde_yaml::Value = serde_yaml::from_str(text)
            .map_err(|e| Error::InvalidDefinition(format!("not valid YAML: {}", e)))?;
        if !value.is_mapping() {
            return Err(Error::InvalidDefinition(
                "top level must be a mapping".to_string(),
            ));
        }
        serde_yaml::from_value(value)
            .map_err(|e| Error::InvalidDefinition(format!("unexpected structure: {}", e)))
    }
}
