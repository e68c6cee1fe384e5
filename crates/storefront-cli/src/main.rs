//! Storefront CLI - a terminal front-end for the storefront backend.
//!
//! Signs in against the REST API, browses the product catalog and manages
//! products and categories for admin accounts.

mod app;
mod output;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_core::{ApiError, Config};

use app::App;

/// Log file name prefix inside `--log-dir`
const LOG_FILE_PREFIX: &str = "storefront.log";

#[derive(Debug, Parser)]
#[command(name = "storefront", version, about = "Storefront catalog and admin client")]
struct Cli {
    /// Backend base URL, overriding config and STOREFRONT_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Keep the session in memory only, leaving stored credentials untouched
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    #[command(subcommand)]
    Profile(ProfileCommand),
    #[command(subcommand)]
    Products(ProductsCommand),
    #[command(subcommand)]
    Categories(CategoriesCommand),
    /// Products and categories side by side
    Overview,
    /// Check where a navigation to PATH would end up
    Route { path: String },
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Fetch the profile from the backend
    Show,
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProductsCommand {
    List(ListArgs),
    Show { id: String },
    Search { text: String },
    ByCategory {
        id: String,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Create(ProductArgs),
    Update {
        id: String,
        #[command(flatten)]
        fields: ProductArgs,
    },
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    #[arg(long)]
    pub in_stock: bool,
    #[arg(long)]
    pub featured: bool,
    #[arg(long)]
    pub sort_by: Option<String>,
    /// asc or desc
    #[arg(long)]
    pub sort_order: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProductArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub price: Option<f64>,
    #[arg(long)]
    pub stock: Option<i64>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub featured: Option<bool>,
    #[arg(long)]
    pub active: Option<bool>,
    /// Image file sent as a multipart upload
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum CategoriesCommand {
    List {
        /// Only active categories
        #[arg(long)]
        active: bool,
    },
    Show { id: String },
    Create(CategoryArgs),
    Update {
        id: String,
        #[command(flatten)]
        fields: CategoryArgs,
    },
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct CategoryArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub active: Option<bool>,
    #[arg(long)]
    pub image: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_ref());
    info!("Storefront CLI starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    debug!(api = %config.api_base_url, "Loaded config");

    let mut app = App::new(config, cli.ephemeral)?;
    let result = app.run(cli.command).await;
    app.report_session_events();
    result
}

/// API failures print their normalized JSON; everything else a plain message.
fn report(error: &anyhow::Error) {
    match error.downcast_ref::<ApiError>() {
        Some(api_error) => match serde_json::to_string_pretty(&api_error.to_failure()) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("Error: {}", api_error),
        },
        None => eprintln!("Error: {:#}", error),
    }
}
