//! business-symptoms CLI - import, query and serve business/symptom links

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use business_symptoms::business::NamePolicy;
use business_symptoms::config::{self, ServiceConfig};
use business_symptoms::importer::{COLUMNS, Importer};
use business_symptoms::query::{QueryEngine, SymptomFilter};
use business_symptoms::storage::SqliteStore;
use business_symptoms::ui::{self, Icons};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "business-symptoms")]
#[command(version)]
#[command(about = "Business/symptom association service - CSV import, filtered queries, HTTP API")]
#[command(long_about = r#"
Keeps a mapping of businesses to symptoms, each link carrying a diagnostic flag.

CSV files must have the header:
  Business ID,Business Name,Symptom Code,Symptom Name,Symptom Diagnostic

Example usage:
  business-symptoms import --file business_symptom_data.csv
  business-symptoms query --business-id 1001 --diagnostic true
  business-symptoms serve --port 8013
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Import a CSV file of business/symptom rows
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// What to do with names of existing businesses/symptoms (overwrite, keep_existing)
        #[arg(long)]
        name_policy: Option<String>,
    },

    /// List business/symptom links
    Query {
        /// Only links for this business
        #[arg(short, long)]
        business_id: Option<i64>,

        /// Only links with this diagnostic flag (true/false)
        #[arg(long)]
        diagnostic: Option<String>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show row counts and schema version
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn resolve_config(cli_config: Option<&std::path::Path>, database: Option<PathBuf>) -> anyhow::Result<ServiceConfig> {
    let mut config = config::load_config(cli_config)?.unwrap_or_default();
    if let Some(database) = database {
        config.database = Some(database.display().to_string());
    }
    Ok(config)
}

fn open_store(config: &ServiceConfig) -> anyhow::Result<SqliteStore> {
    let path = config.database_path();
    config::ensure_db_dir(&path)?;
    Ok(SqliteStore::open_with_timeout(&path, config.busy_timeout())?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port, database } => {
            let mut config = resolve_config(config_path, database)?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config::ensure_db_dir(&config.database_path())?;

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(business_symptoms::server::start_server(&config))?;
        }

        Commands::Import { file, database, name_policy } => {
            let mut config = resolve_config(config_path, database)?;
            if let Some(policy) = name_policy {
                config.name_policy = policy.parse::<NamePolicy>()?;
            }

            let mut store = open_store(&config)?;
            ui::header(&format!("Importing {}", file.display()));
            ui::info("Database", &config.database_path().display().to_string());
            ui::info("Name policy", config.name_policy.as_str());

            let result = Importer::new(&mut store)
                .with_name_policy(config.name_policy)
                .import_file(&file);

            match result {
                Ok(summary) => {
                    ui::section("Import Summary");
                    ui::summary_row("Rows processed:", &summary.rows_processed.to_string());
                    ui::summary_row("Businesses:", &summary.businesses.to_string());
                    ui::summary_row("Symptoms:", &summary.symptoms.to_string());
                    ui::summary_row("Links inserted:", &summary.inserted.to_string());
                    ui::summary_row("Links updated:", &summary.updated.to_string());
                    println!();
                    ui::success("Import complete");
                }
                Err(e) => {
                    ui::error(&format!("Import failed, nothing was written: {}", e));
                    if matches!(e, business_symptoms::Error::MissingColumn(_)) {
                        ui::warn(&format!("Expected columns: {}", COLUMNS.join(", ")));
                    }
                    return Err(e.into());
                }
            }
        }

        Commands::Query { business_id, diagnostic, database, format } => {
            let config = resolve_config(config_path, database)?;
            let store = open_store(&config)?;

            let mut filter = SymptomFilter::from_params(None, diagnostic.as_deref())?;
            filter.business_id = business_id;

            let records = QueryEngine::new(&store).business_symptoms(&filter)?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("{} No business symptoms found.", Icons::EMPTY);
            } else {
                println!("{} {} business symptom(s)", Icons::SEARCH, records.len());
                println!("{}", ui::records_table(&records, ui::flag));
            }
        }

        Commands::Stats { database } => {
            let config = resolve_config(config_path, database)?;
            let store = open_store(&config)?;
            let stats = store.stats()?;

            println!("{} Statistics ({:?})", Icons::STATS, config.database_path());
            println!("{}", ui::stats_table(&stats));
        }

        Commands::Init { force } => {
            let path = config_path
                .map(std::path::Path::to_path_buf)
                .unwrap_or_else(config::default_config_path);
            let defaults = ServiceConfig {
                database: Some(config::default_database_path().display().to_string()),
                ..Default::default()
            };
            config::write_config(&path, &defaults, force)?;
            println!("{} Wrote {}", Icons::FILE, path.display());
        }
    }

    Ok(())
}
