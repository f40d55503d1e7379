//! Status reconciliation: declared records merged with observed containers.

mod inspector;
mod status;

pub use inspector::RuntimeInspector;
pub use status::{RealStatus, StatusKind};

use crate::compose::DefinitionParser;
use crate::docker::{ComposeProject, DockerError};
use crate::error::{Error, Result};
use crate::layout::{locate_definition, DefinitionLookup};
use crate::state::ServiceRecord;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::debug;

/// Resolve the compose project for a record, or explain why it cannot be.
pub fn project_for(record: &ServiceRecord) -> Result<ComposeProject> {
    match locate_definition(&record.path) {
        DefinitionLookup::Found { file, .. } => Ok(ComposeProject::new(&record.name, file)),
        other => Err(Error::Unmanageable {
            name: record.name.clone(),
            reason: other.problem().unwrap_or_default(),
        }),
    }
}

/// Computes [`RealStatus`] for records. Never fails; failures become statuses.
#[derive(Clone)]
pub struct StatusReconciler {
    inspector: RuntimeInspector,
    parser: Arc<dyn DefinitionParser>,
    max_concurrency: usize,
}

impl StatusReconciler {
    pub fn new(
        inspector: RuntimeInspector,
        parser: Arc<dyn DefinitionParser>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            inspector,
            parser,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn reconcile(&self, record: &ServiceRecord) -> RealStatus {
        let (file, text) = match locate_definition(&record.path) {
            DefinitionLookup::Found { file, text } => (file, text),
            DefinitionLookup::Unreadable { file, reason } => {
                return RealStatus::error(format!(
                    "definition file {} is unreadable: {}",
                    file.display(),
                    reason
                ))
            }
            missing => return RealStatus::not_found(missing.problem().unwrap_or_default()),
        };

        let definition = match self.parser.parse(&text) {
            Ok(definition) => definition,
            Err(e) => return RealStatus::error(e.to_string()),
        };

        let project = ComposeProject::new(&record.name, file);
        match self.inspector.inspect(&project).await {
            Ok(containers) => {
                RealStatus::from_observations(definition.service_names(), containers)
            }
            Err(e @ DockerError::Timeout { .. }) => {
                debug!("Inspection of '{}' timed out", record.name);
                RealStatus::unknown(e.to_string())
            }
            Err(e) => RealStatus::error(e.to_string()),
        }
    }

    /// Reconcile many records concurrently. Output order matches input order.
    pub async fn reconcile_all(
        &self,
        records: Vec<ServiceRecord>,
    ) -> Vec<(ServiceRecord, RealStatus)> {
        stream::iter(records)
            .map(|record| async move {
                let status = self.reconcile(&record).await;
                (record, status)
            })
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}
