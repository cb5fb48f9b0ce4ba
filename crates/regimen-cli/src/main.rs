mod catalog_cmds;
mod config;
mod intake_cmds;
mod plan_cmds;
mod serve_cmd;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use regimen_db::pool;
use regimen_db::store::{MemoryStore, PgStore, Store};

use config::RegimenConfig;

#[derive(Parser)]
#[command(name = "regimen", about = "Personal training program generator")]
pub struct Cli {
    /// Database URL (overrides REGIMEN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Exercise library TOML (overrides REGIMEN_CATALOG_PATH env var)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a regimen config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/regimen")]
        db_url: String,
        /// Command line of a content-suggestion provider
        #[arg(long)]
        suggester: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the regimen database (requires config file or env vars)
    DbInit,
    /// Intake submission
    Intake {
        #[command(subcommand)]
        command: IntakeCommands,
    },
    /// Plan generation and approval
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Exercise library inspection
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Keep intakes and plans in memory instead of PostgreSQL
        #[arg(long)]
        in_memory: bool,
    },
}

#[derive(Subcommand)]
pub enum IntakeCommands {
    /// Store intake answers from a JSON file
    Submit {
        /// Path to the answers JSON file ("-" for stdin)
        file: String,
        /// Client reference to attach to the intake
        #[arg(long)]
        client_ref: Option<String>,
    },
    /// Normalize answers and preview the plan without storing anything
    Check {
        /// Path to the answers JSON file ("-" for stdin)
        file: String,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Generate the plan for a stored intake
    Generate {
        /// Intake ID
        intake_id: String,
        /// Create a new plan version even if one exists
        #[arg(long)]
        regenerate: bool,
    },
    /// Show plan details (or list all plans)
    Show {
        /// Plan ID to show (omit to list all)
        plan_id: Option<String>,
    },
    /// Re-run validation on a stored plan
    Validate {
        /// Plan ID to validate
        plan_id: String,
    },
    /// Record the trainer's decision on a draft plan
    Approve {
        /// Plan ID to approve
        plan_id: String,
        /// Identity of the approving trainer
        #[arg(long)]
        trainer: String,
        /// Record a decline instead (the plan stays in draft)
        #[arg(long)]
        decline: bool,
    },
    /// Confirm delivery of an approved plan
    Sent {
        /// Plan ID that was delivered
        plan_id: String,
        /// Delivery channel (email, pdf, ...)
        #[arg(long, default_value = "email")]
        channel: String,
    },
    /// Export a plan's structure as JSON
    Export {
        /// Plan ID to export
        plan_id: String,
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List exercises in the configured library
    List {
        /// Only show exercises for this movement pattern
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Validate an exercise library file
    Check {
        /// Path to the library TOML
        path: PathBuf,
    },
}

/// Execute the `regimen init` command: write config file.
fn cmd_init(db_url: &str, suggester: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        generation: config::GenerationSection {
            suggester_command: suggester.clone(),
            ..Default::default()
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    if let Some(cmd) = &suggester {
        println!("  generation.suggester_command = {cmd}");
    }
    println!();
    println!("Next: run `regimen db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `regimen db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &RegimenConfig) -> anyhow::Result<()> {
    println!("Initializing regimen database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let result = async {
        pool::run_migrations(&db_pool).await?;
        pool::table_counts(&db_pool).await
    }
    .await;
    db_pool.close().await;

    let counts = result?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }
    println!("regimen db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let resolve =
        || RegimenConfig::resolve(cli.database_url.as_deref(), cli.catalog.as_deref());

    match cli.command {
        Commands::Init {
            ref db_url,
            ref suggester,
            force,
        } => {
            cmd_init(db_url, suggester.clone(), force)?;
        }
        Commands::DbInit => {
            cmd_db_init(&resolve()?).await?;
        }
        Commands::Intake {
            command: IntakeCommands::Check { ref file },
        } => {
            // Previews never touch the database.
            let generator = resolve()?.build_generator(Arc::new(MemoryStore::new()))?;
            intake_cmds::cmd_check(&generator, file).await?;
        }
        Commands::Intake {
            command:
                IntakeCommands::Submit {
                    ref file,
                    ref client_ref,
                },
        } => {
            let resolved = resolve()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let store = PgStore::new(db_pool.clone());
            let result = intake_cmds::cmd_submit(&store, file, client_ref.as_deref()).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { ref command } => {
            let resolved = resolve()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let store: Arc<dyn Store> = Arc::new(PgStore::new(db_pool.clone()));
            let result = match resolved.build_generator(store) {
                Ok(generator) => plan_cmds::run_plan_command(command, &generator).await,
                Err(e) => Err(e),
            };
            db_pool.close().await;
            result?;
        }
        Commands::Catalog { ref command } => {
            catalog_cmds::run_catalog_command(command, &resolve()?)?;
        }
        Commands::Serve {
            ref bind,
            port,
            in_memory,
        } => {
            let resolved = resolve()?;
            if in_memory {
                let generator = resolved.build_generator(Arc::new(MemoryStore::new()))?;
                serve_cmd::run_serve(Arc::new(generator), bind, port).await?;
            } else {
                let db_pool = pool::create_pool(&resolved.db_config).await?;
                let store: Arc<dyn Store> = Arc::new(PgStore::new(db_pool.clone()));
                let result = match resolved.build_generator(store) {
                    Ok(generator) => serve_cmd::run_serve(Arc::new(generator), bind, port).await,
                    Err(e) => Err(e),
                };
                db_pool.close().await;
                result?;
            }
        }
    }

    Ok(())
}
