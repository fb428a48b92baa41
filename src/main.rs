use clap::Parser;
use tracing::{info, warn};

use weepstay::cli::{Cli, Commands};
use weepstay::commands;
use weepstay::config::Config;
use weepstay::observability::init_tracing;
use weepstay::store::RecordStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    init_tracing(&config.telemetry);

    match cli.command {
        Commands::Server(args) => {
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            weepstay::api::run(config).await?;
        }
        Commands::Makemigrations => {
            let report = commands::make_migrations(&config.apps)?;
            for line in report.lines() {
                println!("{line}");
            }
        }
        Commands::DeleteMigrations(args) => {
            let report = commands::delete_migration_dirs(&args.root);
            info!(
                removed = report.removed.len(),
                failed = report.failed.len(),
                "Migration directories processed"
            );
            for (path, err) in &report.failed {
                warn!(path = %path.display(), error = %err, "Not deleted");
            }
        }
        Commands::Createsuperuser(args) => {
            let store = RecordStore::open(&config.server.data_path)?;
            let user = commands::create_superuser(&store, &args.email, &args.password, args.username)?;
            println!("Superuser created: {}", user["email"]);
        }
    }

    Ok(())
}
