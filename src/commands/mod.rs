//! Management commands run from the CLI

mod createsuperuser;
mod delete_migrations;
mod makemigrations;

pub use createsuperuser::create_superuser;
pub use delete_migrations::{delete_migration_dirs, DeleteReport};
pub use makemigrations::{
    make_migrations, refactor_app, refactor_command, MakeMigrationsReport, MigrationOutcome,
};

use thiserror::Error;

use crate::models::ModelError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no custom apps configured; set apps.custom_apps")]
    NoCustomApps,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
