use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use placement_filter::{
    api,
    client::{EligibilityApi, PortalClient, DEFAULT_SERVER_URL},
    config::Config,
    criteria::CriteriaField,
    db,
    portal::Portal,
    report,
    store::{self, MemoryStore, StudentStore},
};

#[derive(Parser)]
#[command(name = "placement-filter")]
#[command(about = "Filter students by placement eligibility criteria", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the student retrieval API
    Serve {
        /// Serve the built-in seed data from memory instead of Postgres
        #[arg(long)]
        in_memory: bool,
    },
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import students from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the first students in the collection
    List {
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server: String,
    },
    /// Filter eligible students and optionally export them
    Filter {
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server: String,
        #[arg(long)]
        min_tenth: Option<String>,
        #[arg(long)]
        min_twelfth: Option<String>,
        #[arg(long)]
        min_ug: Option<String>,
        #[arg(long)]
        max_backlogs: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        /// Directory to write eligible_students_<date>.csv into
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { in_memory } => {
            let config = Config::load()?;
            let students: Arc<dyn StudentStore> = if in_memory {
                Arc::new(MemoryStore::new("memory", db::seed_students()?))
            } else {
                Arc::new(store::connect_with_fallback(&config).await?)
            };
            api::serve(students, &config).await?;
        }
        Commands::InitDb => {
            let config = Config::load()?;
            let pg = store::connect_with_fallback(&config).await?;
            db::init_db(pg.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let config = Config::load()?;
            let pg = store::connect_with_fallback(&config).await?;
            let written = db::seed(pg.pool()).await?;
            println!("Seed data written ({written} students).");
        }
        Commands::Import { csv } => {
            let config = Config::load()?;
            let pg = store::connect_with_fallback(&config).await?;
            let inserted = db::import_csv(pg.pool(), &csv).await?;
            println!("Imported {inserted} students from {}.", csv.display());
        }
        Commands::List { server } => {
            let client = PortalClient::new(server);
            let response = client
                .list_all()
                .await
                .context("failed to fetch students")?;
            print!("{}", report::build_list(&response));
        }
        Commands::Filter {
            server,
            min_tenth,
            min_twelfth,
            min_ug,
            max_backlogs,
            gender,
            export,
        } => {
            let client = PortalClient::new(server);
            let mut portal = Portal::new();

            let overrides = [
                (CriteriaField::MinTenthPercentage, min_tenth),
                (CriteriaField::MinTwelfthPercentage, min_twelfth),
                (CriteriaField::MinUgPercentage, min_ug),
                (CriteriaField::MaxBacklogs, max_backlogs),
                (CriteriaField::Gender, gender),
            ];
            for (field, value) in overrides {
                if let Some(value) = value {
                    portal.set_filter(field, json!(value));
                }
            }

            portal.submit(&client).await;
            print!("{}", report::build_portal_view(&portal));

            if let Some(error) = portal.error() {
                anyhow::bail!("{error}");
            }

            if let Some(dir) = export {
                let path = portal
                    .export_to_dir(&dir, Utc::now().date_naive())
                    .context("failed to export CSV")?;
                println!();
                println!("Exported {} students to {}.", portal.students().len(), path.display());
            }
        }
    }

    Ok(())
}
