//! Soko CLI - Browse the catalog, manage a cart, and check out from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # List products in a category
//! soko products --category phones
//!
//! # Add product 1 to the cart, then set the first line to 3 units
//! soko cart add 1
//! soko cart update 1 3
//!
//! # Log in and check out
//! soko login -u wanjiku -p secret
//! soko checkout --name Wanjiku --email wanjiku@example.com --phone 0712345678
//! ```
//!
//! # Commands
//!
//! - `products` - List the catalog
//! - `cart` - Show or change the cart
//! - `checkout` - Place an order for the whole cart
//! - `login` / `register` / `logout` - Account management
//!
//! The cart and login token are stored under `--data-dir` (default `.soko`),
//! so several terminals share one cart.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

mod commands;

use commands::Context;

/// Log filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "soko_cli=info,soko_storefront=warn";

#[derive(Parser)]
#[command(name = "soko")]
#[command(author, version, about = "Soko shop client")]
struct Cli {
    /// Directory holding the cart and login token
    #[arg(long, env = "SOKO_DATA_DIR", default_value = ".soko", global = true)]
    data_dir: PathBuf,

    /// Shop backend base URL
    #[arg(long, env = "SOKO_API_URL", global = true)]
    api_url: Option<Url>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only products whose name or description contains this text
        #[arg(short, long, default_value = "")]
        search: String,

        /// Only products in this category (`all` for every category)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Place an order for the whole cart
    Checkout {
        /// Buyer name (defaults to the logged-in profile)
        #[arg(long)]
        name: Option<String>,

        /// Buyer email (defaults to the logged-in profile)
        #[arg(long)]
        email: Option<String>,

        /// Kenyan mobile number for the M-Pesa request
        #[arg(long)]
        phone: Option<String>,
    },
    /// Log in to the shop
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create a shop account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Forget the stored login
    Logout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart (default)
    Show,
    /// Add one unit of a product
    Add {
        /// Product id
        product_id: String,
    },
    /// Set the quantity of a line
    Update {
        /// Line key or 1-based position
        line: String,

        /// New quantity; below 1 is ignored
        #[arg(allow_negative_numbers = true)]
        quantity: i64,

        /// Fail if the cart changed since this version
        #[arg(long)]
        if_version: Option<u64>,
    },
    /// Remove a line
    Remove {
        /// Line key or 1-based position
        line: String,

        /// Fail if the cart changed since this version
        #[arg(long)]
        if_version: Option<u64>,
    },
    /// Empty the cart
    Clear,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(log_filter(rust_log.as_deref()))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::new(cli.data_dir, cli.api_url);

    match cli.command {
        Commands::Products { search, category } => {
            commands::products::list(&ctx, search, category).await?;
        }
        Commands::Cart { action } => match action.unwrap_or(CartAction::Show) {
            CartAction::Show => commands::cart::show(&ctx).await?,
            CartAction::Add { product_id } => commands::cart::add(&ctx, &product_id).await?,
            CartAction::Update {
                line,
                quantity,
                if_version,
            } => commands::cart::update(&ctx, &line, quantity, if_version).await?,
            CartAction::Remove { line, if_version } => {
                commands::cart::remove(&ctx, &line, if_version).await?;
            }
            CartAction::Clear => commands::cart::clear(&ctx).await?,
        },
        Commands::Checkout { name, email, phone } => {
            commands::checkout::submit(&ctx, name, email, phone).await?;
        }
        Commands::Login { username, password } => {
            commands::account::login(&ctx, username, password).await?;
        }
        Commands::Register {
            username,
            email,
            password,
        } => commands::account::register(&ctx, username, email, password).await?,
        Commands::Logout => commands::account::logout(&ctx).await?,
    }
    Ok(())
}
