use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use invoice_vault::{
    config::{config_home, Config},
    crypto::Key,
    error::AppError,
    search::{parse_query_date, DateFormat, InvoiceQuery, QueryEngine, SearchIndexManager},
    store::{DocumentLookup, EncryptedDocumentStore},
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "invoice-vault")]
#[command(about = "Encrypted invoice store with full-text search", version, long_about = None)]
struct Cli {
    /// Config file, defaults to ~/.invoice-vault/config.toml
    #[arg(long, env = "INVOICE_VAULT_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config home, the workspace and an empty index
    Init,

    /// Rebuild the search index from the encrypted workspace
    Index,

    /// Search invoices
    Search {
        /// Words to look for in item descriptions
        #[arg(value_name = "TEXT")]
        text: Vec<String>,

        #[arg(short, long)]
        customer: Option<String>,

        /// First issue date, YYYY-MM-DD
        #[arg(short = 'f', long = "from")]
        date_from: Option<String>,

        /// Last issue date, YYYY-MM-DD
        #[arg(short = 't', long = "to")]
        date_to: Option<String>,

        /// Only the last N months, overrides --from and --to
        #[arg(short, long, default_value = "0")]
        months: u32,

        /// Minimum total
        #[arg(short = 'g', long = "amount-ge")]
        amount_ge: Option<f64>,

        /// Maximum total
        #[arg(short = 'l', long = "amount-le")]
        amount_le: Option<f64>,
    },

    /// Encrypt a plain descriptor into the workspace and index it
    Seal {
        #[arg(value_name = "DESCRIPTOR")]
        descriptor: PathBuf,
    },

    /// Decrypt an invoice back to a plain descriptor
    Restore {
        #[arg(value_name = "NUMBER")]
        number: String,

        /// Output path, defaults to <workspace>/<NUMBER>.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match cli.config {
        Some(ref path) => Config::load_from(Some(path.as_path())),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    // Initialize tracing
    let json = config.observability.json_logs;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("invoice_vault={}", config.observability.log_level).into()),
        )
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .init();

    if let Err(e) = run(cli.command, &config) {
        tracing::debug!(code = e.error_code(), "Command failed");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run(command: Commands, config: &Config) -> Result<(), AppError> {
    let store = EncryptedDocumentStore::new(&config.workspace);

    match command {
        Commands::Init => {
            let home = config_home();
            std::fs::create_dir_all(&home)?;
            std::fs::create_dir_all(&config.workspace)?;

            let config_file = home.join("config.toml");
            if !config_file.exists() {
                std::fs::write(&config_file, toml::to_string_pretty(config)?)?;
                println!("Wrote {}", config_file.display());
            }

            SearchIndexManager::new(config.search_config())?.ensure_exists()?;
            println!("Workspace ready at {}", config.workspace.display());
        }

        Commands::Index => {
            let key = prompt_key()?;
            let manager = SearchIndexManager::new(config.search_config())?;
            let report = manager.rebuild(&store, &key, None)?;
            println!(
                "Indexed {} invoices in {:.2?}{}",
                report.documents,
                report.elapsed,
                if report.skipped > 0 {
                    format!(" ({} skipped, see log)", report.skipped)
                } else {
                    String::new()
                }
            );
        }

        Commands::Search {
            text,
            customer,
            date_from,
            date_to,
            months,
            amount_ge,
            amount_le,
        } => {
            let date_from = date_from.as_deref().map(parse_query_date).transpose()?;
            let date_to = date_to.as_deref().map(parse_query_date).transpose()?;

            let mut query = InvoiceQuery::new()
                .with_amount_range(amount_ge, amount_le)
                .with_date_range(date_from, date_to)
                .last_months(months, Local::now().date_naive());
            if !text.is_empty() {
                query = query.with_text(text.join(" "));
            }
            if let Some(customer) = customer {
                query = query.with_customer(customer);
            }

            let engine = QueryEngine::new(config.search_config())?;
            let response = engine.search(&query)?;

            let format = DateFormat::new(config.date_input_format.clone());
            println!("{:<12} {:<12} {:>12}  CUSTOMER", "NUMBER", "DATE", "AMOUNT");
            for hit in &response.entries {
                println!(
                    "{:<12} {:<12} {:>12.2}  {}",
                    hit.number,
                    format.format(hit.date.date_naive()),
                    hit.amount,
                    hit.customer
                );
            }
            println!(
                "\n{} of {} matches ({}), total {:.2}, took {:.2?}",
                response.entries.len(),
                response.total_hits,
                query.describe(),
                response.total_amount,
                response.elapsed
            );
        }

        Commands::Seal { descriptor } => {
            let mut invoice = store.read_plain(&descriptor)?;
            if invoice.settings.date_format.trim().is_empty() {
                invoice.settings.date_format = config.date_input_format.clone();
            }

            let key = prompt_key()?;
            let manager = SearchIndexManager::new(config.search_config())?;
            let report = manager.seal(&store, &key, &invoice)?;
            println!("Sealed {}", report.path.display());
            if !report.indexed {
                println!("Not indexed, run `invoice-vault index` to build the index");
            }
        }

        Commands::Restore { number, output } => {
            let key = prompt_key()?;
            let invoice = match store.open(&number, &key)? {
                DocumentLookup::Found(invoice) => invoice,
                DocumentLookup::NotFound(path) => {
                    return Err(AppError::NotFound(format!(
                        "invoice {} ({})",
                        number,
                        path.display()
                    )));
                }
            };

            let output = output.unwrap_or_else(|| store.plain_path_for(&number));
            store.write_plain(&output, &invoice)?;
            println!("Restored {}", output.display());
        }
    }

    Ok(())
}

fn prompt_key() -> Result<Key, AppError> {
    let passphrase = rpassword::prompt_password("Password: ")?;
    Ok(Key::derive(&passphrase)?)
}
