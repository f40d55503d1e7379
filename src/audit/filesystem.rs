use super::types::{
    percentage, ConsistentService, FilesystemSummary, FilesystemValidation, FixAction,
    InconsistentService, OrphanedFolder, SuggestedFix,
};
use crate::compose::DefinitionParser;
use crate::layout::{locate_definition, validate_service_name, DefinitionLookup, ServicesLayout};
use crate::state::ServiceRecord;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Compare records with the services root.
pub(super) fn audit(
    layout: &ServicesLayout,
    parser: &dyn DefinitionParser,
    records: &[ServiceRecord],
) -> FilesystemValidation {
    let mut consistent = Vec::new();
    let mut inconsistent = Vec::new();
    let mut fixes = Vec::new();

    for record in records {
        match check_record(parser, &record.path) {
            Ok(()) => consistent.push(ConsistentService {
                service: record.name.clone(),
                path: record.path.clone(),
            }),
            Err((issue, fix)) => {
                fixes.push(SuggestedFix::new(fix, &record.name, &issue));
                inconsistent.push(InconsistentService {
                    service: record.name.clone(),
                    path: record.path.clone(),
                    issue,
                });
            }
        }
    }

    let known_names: HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
    let known_paths: HashSet<&Path> = records.iter().map(|r| r.path.as_path()).collect();

    let folders = layout.scan().unwrap_or_else(|e| {
        warn!("Skipping orphan detection: {}", e);
        Vec::new()
    });

    let mut orphaned_folders = Vec::new();
    for folder in folders {
        let path = layout.service_dir(&folder);
        if known_names.contains(folder.as_str()) || known_paths.contains(path.as_path()) {
            continue;
        }
        fixes.push(orphan_fix(parser, &folder, &path));
        orphaned_folders.push(OrphanedFolder {
            folder,
            path,
            issue: "folder has no registry record".to_string(),
        });
    }

    let total = records.len() + orphaned_folders.len();
    FilesystemValidation {
        total,
        summary: FilesystemSummary {
            consistent_count: consistent.len(),
            inconsistent_count: inconsistent.len(),
            orphaned_count: orphaned_folders.len(),
            consistency_percentage: percentage(consistent.len(), total),
        },
        consistent,
        inconsistent,
        orphaned_folders,
        suggested_fixes: fixes,
    }
}

/// `Err((issue, fix))` when the record's directory does not hold a usable definition.
fn check_record(parser: &dyn DefinitionParser, path: &Path) -> Result<(), (String, FixAction)> {
    match locate_definition(path) {
        DefinitionLookup::Found { text, .. } => parser
            .parse(&text)
            .map(|_| ())
            .map_err(|e| (format!("definition does not parse: {}", e), FixAction::Skip)),
        DefinitionLookup::MissingDirectory => Err((
            format!("directory {} does not exist", path.display()),
            FixAction::RemoveRecord,
        )),
        other => Err((other.problem().unwrap_or_default(), FixAction::Skip)),
    }
}

fn orphan_fix(parser: &dyn DefinitionParser, folder: &str, path: &Path) -> SuggestedFix {
    if let Err(e) = validate_service_name(folder) {
        return SuggestedFix::new(FixAction::Skip, folder, e.to_string());
    }
    match locate_definition(path) {
        DefinitionLookup::Found { text, .. } => match parser.parse_valid(&text) {
            Ok(_) => SuggestedFix::new(
                FixAction::RegisterOrphan,
                folder,
                "folder holds a valid definition but is not registered",
            ),
            Err(e) => SuggestedFix::new(FixAction::Skip, folder, e.to_string()),
        },
        other => SuggestedFix::new(FixAction::Skip, folder, other.problem().unwrap_or_default()),
    }
}
