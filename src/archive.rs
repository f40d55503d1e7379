//! Safe extraction of uploaded service archives.
//!
//! Archives are ZIP files holding a compose definition plus whatever it
//! references (build contexts, config files). Entries are only ever written
//! below the destination directory; absolute paths, `..` components and
//! symlinks are rejected outright.

use crate::error::{Error, Result};
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Upper bounds applied while unpacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLimits {
    pub max_entries: usize,
    /// Total uncompressed bytes across all files.
    pub max_total_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_total_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Summary of an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extracted {
    pub files: usize,
    pub bytes: u64,
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidArchive(msg.into())
}

/// Whether an entry is packaging noise rather than content.
fn is_noise(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(s) => s == "__MACOSX" || s == ".DS_Store",
        _ => false,
    })
}

/// Single directory every entry lives under, if there is one.
///
/// Archives made by zipping a folder wrap everything in that folder; it is
/// stripped so the definition ends up at the top of the service directory.
fn common_prefix(paths: &[(PathBuf, bool)]) -> Option<PathBuf> {
    let mut prefix: Option<&std::ffi::OsStr> = None;
    for (path, is_dir) in paths {
        let mut components = path.components();
        let first = match components.next() {
            Some(Component::Normal(first)) => first,
            _ => return None,
        };
        // A file sitting at the top level means there is no wrapper folder.
        if components.next().is_none() && !is_dir {
            return None;
        }
        match prefix {
            None => prefix = Some(first),
            Some(p) if p == first => {}
            Some(_) => return None,
        }
    }
    prefix.map(PathBuf::from)
}

/// Unpack `bytes` into `dest`, which must not exist yet.
///
/// On error `dest` may be partially populated; the caller owns cleanup.
pub fn extract_archive(bytes: &[u8], dest: &Path, limits: &ArchiveLimits) -> Result<Extracted> {
    let mut archive = zip::ZipArchive::new(io::Cursor::new(bytes))
        .map_err(|e| invalid(format!("not a readable ZIP archive: {}", e)))?;

    if archive.len() == 0 {
        return Err(invalid("archive is empty"));
    }
    if archive.len() > limits.max_entries {
        return Err(invalid(format!(
            "archive has {} entries (limit {})",
            archive.len(),
            limits.max_entries
        )));
    }

    // First pass: validate names and work out the wrapper folder.
    let mut entries: Vec<(usize, PathBuf, bool)> = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| invalid(format!("corrupt entry #{}: {}", index, e)))?;
        let raw_name = entry.name().to_string();
        let relative = entry
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| invalid(format!("entry '{}' escapes the archive root", raw_name)))?;
        if entry
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
        {
            return Err(invalid(format!("entry '{}' is a symlink", raw_name)));
        }
        if is_noise(&relative) || relative.as_os_str().is_empty() {
            continue;
        }
        entries.push((index, relative, entry.is_dir()));
    }

    if entries.is_empty() {
        return Err(invalid("archive contains no files"));
    }

    let names: Vec<(PathBuf, bool)> = entries.iter().map(|(_, p, d)| (p.clone(), *d)).collect();
    let prefix = common_prefix(&names);

    fs::create_dir_all(dest)?;

    let mut extracted = Extracted { files: 0, bytes: 0 };
    for (index, relative, is_dir) in entries {
        let relative = match &prefix {
            Some(prefix) => match relative.strip_prefix(prefix) {
                Ok(stripped) if !stripped.as_os_str().is_empty() => stripped.to_path_buf(),
                _ => continue,
            },
            None => relative,
        };
        let target = dest.join(&relative);

        if is_dir {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut entry = archive
            .by_index(index)
            .map_err(|e| invalid(format!("corrupt entry #{}: {}", index, e)))?;
        let remaining = limits.max_total_bytes - extracted.bytes;
        let mut out = fs::File::create(&target)?;
        // Read one byte past the budget so an overrun is detectable.
        let written = io::copy(&mut (&mut entry).take(remaining + 1), &mut out)
            .map_err(|e| invalid(format!("failed to inflate '{}': {}", relative.display(), e)))?;
        if written > remaining {
            return Err(invalid(format!(
                "archive expands beyond {} bytes",
                limits.max_total_bytes
            )));
        }
        extracted.bytes += written;
        extracted.files += 1;
    }

    debug!(
        "Extracted {} files ({} bytes) into {}",
        extracted.files,
        extracted.bytes,
        dest.display()
    );
    Ok(extracted)
}
