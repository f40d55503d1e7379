use super::ComposeDefinition;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A reason a parsed definition cannot be run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionIssue {
    NoServices,
    MissingImageOrBuild { service: String },
    InvalidServiceName { service: String },
    DuplicateContainerName { container: String },
}

impl fmt::Display for DefinitionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionIssue::NoServices => write!(f, "no services declared"),
            DefinitionIssue::MissingImageOrBuild { service } => {
                write!(f, "service '{}' needs an 'image' or a 'build' key", service)
            }
            DefinitionIssue::InvalidServiceName { service } => write!(
                f,
                "service name '{}' may only contain letters, digits, '.', '_' and '-'",
                service
            ),
            DefinitionIssue::DuplicateContainerName { container } => {
                write!(f, "container_name '{}' is used more than once", container)
            }
        }
    }
}

static COMPOSE_SERVICE_NAME: OnceLock<Regex> = OnceLock::new();

fn compose_service_name_regex() -> &'static Regex {
    COMPOSE_SERVICE_NAME.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("static regex pattern is valid")
    })
}

/// Semantic checks for a definition that is about to be registered.
pub fn validate_definition(definition: &ComposeDefinition) -> Vec<DefinitionIssue> {
    let mut issues = Vec::new();

    if definition.services.is_empty() {
        issues.push(DefinitionIssue::NoServices);
        return issues;
    }

    let mut container_names = std::collections::HashSet::new();
    for (name, service) in &definition.services {
        if !compose_service_name_regex().is_match(name) {
            issues.push(DefinitionIssue::InvalidServiceName {
                service: name.clone(),
            });
        }
        if service.image.is_none() && service.build.is_none() {
            issues.push(DefinitionIssue::MissingImageOrBuild {
                service: name.clone(),
            });
        }
        if let Some(container) = &service.container_name {
            if !container_names.insert(container.clone()) {
                issues.push(DefinitionIssue::DuplicateContainerName {
                    container: container.clone(),
                });
            }
        }
    }

    issues
}
