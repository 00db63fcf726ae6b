// skumap CLI - map marketplace SKUs to master SKUs and reconcile inventory

mod exit_codes;
mod inputs;
mod inventory;
mod mapping;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "skumap")]
#[command(about = "Map marketplace SKUs to master SKUs and reconcile inventory")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Auto-map every SKU seen in the sales files and write the mapping file
    #[command(after_help = "\
Examples:
  skumap map --catalog master.csv --sales amazon.csv --sales shopify.csv
  skumap map --catalog master.csv --sales amazon.csv --mappings sku_mappings.csv
  skumap map --catalog master.csv --sales amazon.csv --config skumap.toml --json")]
    Map {
        /// Master catalog CSV (MSKU, Quantity, Fulfillment Center)
        #[arg(long)]
        catalog: PathBuf,

        /// Sales CSV export (repeatable)
        #[arg(long, required = true)]
        sales: Vec<PathBuf>,

        /// Existing mapping file; its rows are kept and never re-matched
        #[arg(long)]
        mappings: Option<PathBuf>,

        /// Where to write the mapping file (default: --mappings, else sku_mappings.csv)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config TOML
        #[arg(long, env = "SKUMAP_CONFIG")]
        config: Option<PathBuf>,

        /// Print the match outcome as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Manually map a SKU to an MSKU, replacing any existing mapping
    #[command(after_help = "\
Examples:
  skumap assign --catalog master.csv --mappings sku_mappings.csv GLD APPLE_GOLD")]
    Assign {
        /// Master catalog CSV
        #[arg(long)]
        catalog: PathBuf,

        /// Mapping file to update (created if missing)
        #[arg(long)]
        mappings: PathBuf,

        /// Local (marketplace) SKU
        sku: String,

        /// Master SKU; must exist in the catalog
        msku: String,

        /// Config TOML
        #[arg(long, env = "SKUMAP_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Apply sales to the catalog and write the updated inventory
    #[command(after_help = "\
Examples:
  skumap reconcile --catalog master.csv --sales amazon.csv --mappings sku_mappings.csv --output inventory.csv
  skumap reconcile --catalog master.csv --sales amazon.csv --mappings sku_mappings.csv \\
      --output inventory.csv --ledger applied.json --json")]
    Reconcile {
        /// Master catalog CSV
        #[arg(long)]
        catalog: PathBuf,

        /// Sales CSV export (repeatable)
        #[arg(long, required = true)]
        sales: Vec<PathBuf>,

        /// Mapping file produced by `skumap map`
        #[arg(long)]
        mappings: PathBuf,

        /// Where to write the updated inventory CSV
        #[arg(long)]
        output: PathBuf,

        /// Applied-batch ledger (JSON); settled batches are skipped, excluded rows are retried
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Config TOML
        #[arg(long, env = "SKUMAP_CONFIG")]
        config: Option<PathBuf>,

        /// Print the reconciliation result as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate a config file without running anything
    #[command(after_help = "\
Examples:
  skumap validate skumap.toml")]
    Validate {
        /// Path to the config TOML
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Map { catalog, sales, mappings, output, config, json } => {
            mapping::cmd_map(catalog, sales, mappings, output, config, json)
        }
        Commands::Assign { catalog, mappings, sku, msku, config } => {
            mapping::cmd_assign(catalog, mappings, sku, msku, config)
        }
        Commands::Reconcile { catalog, sales, mappings, output, ledger, config, json } => {
            inventory::cmd_reconcile(catalog, sales, mappings, output, ledger, config, json)
        }
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = inputs::load_config(Some(&config_path))?;
    let centers = if config.catalog.fulfillment_centers.is_empty() {
        "any fulfillment center".to_string()
    } else {
        format!("fulfillment centers {}", config.catalog.fulfillment_centers.join(", "))
    };
    eprintln!(
        "valid: {} threshold {}, {}",
        config.matcher.metric, config.matcher.threshold, centers,
    );
    Ok(())
}
