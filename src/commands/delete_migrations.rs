use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

const MIGRATIONS_DIR: &str = "migrations";

#[derive(Debug, Default)]
pub struct DeleteReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, std::io::Error)>,
}

/// Remove every directory named `migrations` below `root`.
///
/// Best effort: failures are logged and collected, the walk carries on.
/// Matched directories are never descended into.
pub fn delete_migration_dirs(root: &Path) -> DeleteReport {
    let mut report = DeleteReport::default();
    walk(root, &mut report);
    report
}

fn walk(dir: &Path, report: &mut DeleteReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "Cannot read directory");
            return;
        }
    };

    for entry in entries.flatten() {
        // Symlinks are not followed
        let is_dir = entry.file_type().is_ok_and(|ty| ty.is_dir());
        if !is_dir {
            continue;
        }

        let path = entry.path();
        if entry.file_name() == MIGRATIONS_DIR {
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "Deleted");
                    report.removed.push(path);
                }
                Err(err) => {
                    error!(path = %path.display(), error = %err, "Failed to delete");
                    report.failed.push((path, err));
                }
            }
        } else {
            walk(&path, report);
        }
    }
}
