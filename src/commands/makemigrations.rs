use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::CommandError;
use crate::config::AppsConfig;
use crate::models::schema::find_app;

const MIGRATIONS_DIR: &str = "migrations";

/// App label of a dotted app path
pub fn refactor_app(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// App labels for every configured app path, in order
pub fn refactor_command(apps: &[String]) -> Vec<String> {
    apps.iter().map(|app| refactor_app(app).to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Created { app: String, path: PathBuf },
    NoChanges { app: String },
    /// The app's migration could not be written; other apps still run
    Failed { app: String, error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeMigrationsReport {
    pub apps: Vec<String>,
    pub outcomes: Vec<MigrationOutcome>,
    /// Set instead of writing anything when an app label is unknown
    pub error: Option<String>,
}

impl MakeMigrationsReport {
    /// Human-readable output, one entry per line
    pub fn lines(&self) -> Vec<String> {
        if let Some(error) = &self.error {
            return vec![error.clone()];
        }

        let mut lines = vec![format!("Apps: {}", self.apps.join(", "))];
        for outcome in &self.outcomes {
            match outcome {
                MigrationOutcome::Created { app, path } => {
                    lines.push(format!("Migrations for '{app}':"));
                    lines.push(format!("  {}", path.display()));
                }
                MigrationOutcome::NoChanges { app } => {
                    lines.push(format!("No changes detected in app '{app}'"));
                }
                MigrationOutcome::Failed { app, error } => {
                    lines.push(format!("Error creating migrations for '{app}': {error}"));
                }
            }
        }
        lines
    }
}

/// Write schema migrations for exactly the configured apps.
///
/// Only an empty app list is an error. Unknown labels are reported in
/// [`MakeMigrationsReport::error`] and nothing is written; write failures
/// become [`MigrationOutcome::Failed`] for that app.
pub fn make_migrations(config: &AppsConfig) -> Result<MakeMigrationsReport, CommandError> {
    if config.custom_apps.is_empty() {
        return Err(CommandError::NoCustomApps);
    }

    let labels = refactor_command(&config.custom_apps);
    let mut report = MakeMigrationsReport {
        apps: labels.clone(),
        ..Default::default()
    };

    if let Some(unknown) = labels.iter().find(|label| find_app(label).is_none()) {
        report.error = Some(format!("App '{unknown}' could not be found."));
        return Ok(report);
    }

    for (path, label) in config.custom_apps.iter().zip(labels) {
        let Some(sql) = find_app(&label).and_then(|app| app.migration_sql()) else {
            report.outcomes.push(MigrationOutcome::NoChanges { app: label });
            continue;
        };

        let dir = app_dir(&config.migrations_root, path).join(MIGRATIONS_DIR);
        let outcome = match write_migration(&dir, &label, &sql) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(app = %label, error = %err, "Migration not written");
                MigrationOutcome::Failed {
                    app: label,
                    error: err.to_string(),
                }
            }
        };
        report.outcomes.push(outcome);
    }

    Ok(report)
}

fn app_dir(root: &Path, app_path: &str) -> PathBuf {
    app_path.split('.').fold(root.to_path_buf(), |dir, part| dir.join(part))
}

fn write_migration(dir: &Path, label: &str, sql: &str) -> Result<MigrationOutcome, CommandError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| CommandError::Io { path, source }
    };

    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let existing = existing_migrations(dir)?;

    if let Some((_, newest)) = existing.last() {
        let current = fs::read_to_string(newest).map_err(io_err(newest))?;
        if current == sql {
            debug!(app = label, path = %newest.display(), "Schema unchanged");
            return Ok(MigrationOutcome::NoChanges {
                app: label.to_string(),
            });
        }
    }

    let number = existing.last().map_or(1, |(number, _)| number + 1);
    let name = if existing.is_empty() { "initial" } else { "auto" };
    let path = dir.join(format!("{number:04}_{name}.sql"));
    fs::write(&path, sql).map_err(io_err(&path))?;
    info!(app = label, path = %path.display(), "Migration written");

    Ok(MigrationOutcome::Created {
        app: label.to_string(),
        path,
    })
}

/// Numbered `.sql` files in `dir`, oldest first
fn existing_migrations(dir: &Path) -> Result<Vec<(u32, PathBuf)>, CommandError> {
    let entries = fs::read_dir(dir).map_err(|source| CommandError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut migrations: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "sql"))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let number = stem.split('_').next()?.parse().ok()?;
            Some((number, path))
        })
        .collect();
    migrations.sort();
    Ok(migrations)
}
