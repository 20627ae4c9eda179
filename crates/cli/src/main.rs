//! Traft CLI - shop the Traft storefront from a terminal.
//!
//! State lives in `TRAFT_DATA_DIR` (default `.traft`), so each invocation
//! picks up where the last one left off, including a checkout interrupted
//! while paying in a UPI app.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! traft catalog home
//! traft catalog product 66f0c1
//!
//! # Fill the cart
//! traft cart add 66f0c1 --size M
//! traft cart list
//!
//! # Check out
//! traft checkout quote --mode cod
//! traft checkout pay --mode cod --name "Anu Joseph" --phone 9876543210 \
//!     --address "12 MG Road" --district Ernakulam --state Kerala --pincode 682001
//! traft checkout submit --txn 412345678901
//! ```
//!
//! # Commands
//!
//! - `cart` - Add, list, update and remove cart items
//! - `checkout` - Quote, pay, enter the transaction ID and place the order
//! - `catalog` - Banners, products and categories from the content API

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use traft_core::PaymentMode;
use traft_storefront::config::StorefrontConfig;

mod commands;

#[derive(Parser)]
#[command(name = "traft")]
#[command(author, version, about = "Traft storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Check out the cart
    Checkout {
        #[command(subcommand)]
        action: CheckoutAction,
    },
    /// Browse the catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add one unit of a product
    Add {
        /// Product ID
        product_id: String,

        /// Size, if the product comes in sizes
        #[arg(short, long)]
        size: Option<String>,

        /// Color, if the product comes in colors
        #[arg(short, long)]
        color: Option<String>,
    },
    /// List cart items with totals
    List,
    /// Set a line's quantity (0 removes it)
    Qty {
        /// Line number from `cart list`
        line: usize,

        /// New quantity
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Line number from `cart list`
        line: usize,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CheckoutAction {
    /// Show totals for a payment mode
    Quote {
        /// Payment mode (`online` or `cod`)
        #[arg(short, long, default_value = "online")]
        mode: PaymentMode,
    },
    /// Enter shipping details and get the payment link
    Pay(PayArgs),
    /// Record the UPI transaction ID
    Txn {
        /// Transaction ID / UTR shown by the payment app
        reference: String,
    },
    /// Place the order
    Submit {
        /// Transaction ID, if not already recorded with `checkout txn`
        #[arg(long)]
        txn: Option<String>,
    },
    /// Show where the checkout stands
    Status,
    /// Discard the checkout (the cart is kept)
    Abandon,
}

/// Shipping details; omitted fields keep the values from an earlier `pay`.
#[derive(Args)]
struct PayArgs {
    /// Payment mode (`online` or `cod`)
    #[arg(short, long)]
    mode: Option<PaymentMode>,

    /// Full name
    #[arg(long)]
    name: Option<String>,

    /// Mobile number
    #[arg(long)]
    phone: Option<String>,

    /// Alternate mobile number
    #[arg(long)]
    alt_phone: Option<String>,

    /// Instagram handle
    #[arg(long)]
    instagram: Option<String>,

    /// Street address
    #[arg(long)]
    address: Option<String>,

    /// District
    #[arg(long)]
    district: Option<String>,

    /// State
    #[arg(long)]
    state: Option<String>,

    /// 6-digit pincode
    #[arg(long)]
    pincode: Option<String>,

    /// Landmark
    #[arg(long)]
    landmark: Option<String>,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Active banners
    Banners,
    /// Featured products
    Home,
    /// A page of products
    Products {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
    /// One product's details
    Product {
        /// Product ID
        id: String,
    },
    /// Product categories
    Categories,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "traft_storefront=info,traft=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(cli, config).await {
        e.report();
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> traft_storefront::error::Result<()> {
    let ctx = commands::Context::new(config)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Add {
                product_id,
                size,
                color,
            } => commands::cart::add(&ctx, &product_id, size.as_deref(), color.as_deref()).await?,
            CartAction::List => commands::cart::list(&ctx)?,
            CartAction::Qty { line, quantity } => commands::cart::set_quantity(&ctx, line, quantity)?,
            CartAction::Remove { line } => commands::cart::remove(&ctx, line)?,
            CartAction::Clear => commands::cart::clear(&ctx)?,
        },
        Commands::Checkout { action } => match action {
            CheckoutAction::Quote { mode } => commands::checkout::quote(&ctx, mode)?,
            CheckoutAction::Pay(args) => commands::checkout::pay(&ctx, args.mode, args.into())?,
            CheckoutAction::Txn { reference } => commands::checkout::set_txn(&ctx, &reference)?,
            CheckoutAction::Submit { txn } => commands::checkout::submit(&ctx, txn.as_deref()).await?,
            CheckoutAction::Status => commands::checkout::status(&ctx)?,
            CheckoutAction::Abandon => commands::checkout::abandon(&ctx)?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::Banners => commands::catalog::banners(&ctx).await?,
            CatalogAction::Home => commands::catalog::home(&ctx).await?,
            CatalogAction::Products { page, limit } => {
                commands::catalog::products(&ctx, page, limit).await?;
            }
            CatalogAction::Product { id } => commands::catalog::product(&ctx, &id).await?,
            CatalogAction::Categories => commands::catalog::categories(&ctx).await?,
        },
    }
    Ok(())
}

impl From<PayArgs> for commands::checkout::FormPatch {
    fn from(args: PayArgs) -> Self {
        Self {
            customer_name: args.name,
            phone_number: args.phone,
            alternate_phone: args.alt_phone,
            instagram_id: args.instagram,
            address: args.address,
            district: args.district,
            state: args.state,
            pincode: args.pincode,
            landmark: args.landmark,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pay() {
        let cli = Cli::try_parse_from([
            "traft", "checkout", "pay", "--mode", "cod", "--name", "Anu", "--pincode", "682001",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        let Commands::Checkout {
            action: CheckoutAction::Pay(args),
        } = cli.command
        else {
            panic!("expected checkout pay");
        };
        assert_eq!(args.mode, Some(PaymentMode::Cod));
        assert_eq!(args.name.as_deref(), Some("Anu"));
        assert!(args.phone.is_none());
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["traft", "checkout", "quote", "--mode", "card"]).is_err());
    }
}
