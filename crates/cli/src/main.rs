//! Spice Market CLI - browse the catalog and manage the cart.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog (seeds an empty catalog first)
//! sm-cli products
//!
//! # Show one product
//! sm-cli product 3
//!
//! # Show the cart with totals
//! sm-cli cart
//!
//! # Set a cart quantity (0 removes the line)
//! sm-cli set-quantity 3 2
//!
//! # Add to or take from a cart quantity (clamped at 0)
//! sm-cli adjust 3 -1
//!
//! # Run the end-to-end walkthrough against an in-process gateway
//! sm-cli demo
//! ```
//!
//! Every command except `demo` talks to the gateway at `GATEWAY_URL`, or to
//! an in-process gateway with `--memory`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use spice_market_core::ProductId;
use spice_market_storefront::config::StorefrontConfig;
use spice_market_storefront::gateway::{Gateway, HttpGateway, InMemoryGateway};
use spice_market_storefront::seed::SeedCatalog;
use spice_market_storefront::{AppError, StorefrontClient, telemetry};

mod commands;

#[derive(Parser)]
#[command(name = "sm-cli")]
#[command(author, version, about = "Spice Market storefront CLI")]
struct Cli {
    /// Use an in-process gateway instead of `GATEWAY_URL`
    #[arg(long, global = true)]
    memory: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the catalog, seeding it first if empty
    Products,
    /// Show a single product
    Product {
        /// Product id
        id: ProductId,
    },
    /// Show cart line items and totals
    Cart,
    /// Set the quantity of a product in the cart
    SetQuantity {
        /// Product id
        id: ProductId,
        /// New quantity (0 removes the line)
        quantity: u64,
    },
    /// Change a cart quantity by a signed amount, stopping at 0
    Adjust {
        /// Product id
        id: ProductId,
        /// Amount to add (negative to remove)
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Seed the catalog if it is empty
    Seed,
    /// Walk through seeding, cart updates and checkout in memory
    Demo,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(telemetry::DEFAULT_LOG_FILTER, cli.json);
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(telemetry::DEFAULT_LOG_FILTER, cli.json);

    if let Err(e) = run(cli, &config).await {
        e.capture();
        tracing::error!("Command failed: {}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), AppError> {
    if matches!(cli.command, Commands::Demo) {
        return commands::demo::run().await;
    }

    let catalog = match &config.seed_catalog_path {
        Some(path) => SeedCatalog::from_file(path).await?,
        None => SeedCatalog::default(),
    };

    if cli.memory {
        let client = StorefrontClient::with_seed_catalog(InMemoryGateway::new(), catalog);
        dispatch(&client, cli.command).await
    } else {
        let gateway = HttpGateway::new(config.require_gateway()?)?;
        let client = StorefrontClient::with_seed_catalog(gateway, catalog);
        dispatch(&client, cli.command).await
    }
}

async fn dispatch<G: Gateway>(
    client: &StorefrontClient<G>,
    command: Commands,
) -> Result<(), AppError> {
    match command {
        Commands::Products => commands::catalog::list(client).await,
        Commands::Product { id } => commands::catalog::show(client, id).await,
        Commands::Cart => commands::cart::show(client).await,
        Commands::SetQuantity { id, quantity } => {
            commands::cart::set_quantity(client, id, quantity).await
        }
        Commands::Adjust { id, delta } => commands::cart::adjust(client, id, delta).await,
        Commands::Seed => commands::catalog::seed(client).await,
        Commands::Demo => commands::demo::run().await,
    }
}
