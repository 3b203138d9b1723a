use std::path::PathBuf;

use cartsync::{
    resolve_scan, ConfigError, FileStore, ScanError, Services, ServicesBuilder, StorageError,
    SyncConfig, SyncError,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shared::cart::CartEntry;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Sync(#[from] SyncError),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Scan(#[from] ScanError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "cartsync", about = "Inspect and repair the local cart and wishlist")]
struct Cli {
    #[arg(long, env = "CARTSYNC_API_URL")]
    api_url: Option<String>,

    /// JSON file holding the local cart, wishlist and token
    #[arg(long, env = "CARTSYNC_STORE_PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store the bearer token used for API calls
    Login { token: String },
    Logout,
    Wishlist(WishlistCommand),
    Cart(CartCommand),
    /// Resolve a scanned QR payload to a product page
    Scan { payload: String },
}

#[derive(Args, Debug)]
struct WishlistCommand {
    #[command(subcommand)]
    command: WishlistSubcommand,
}

#[derive(Subcommand, Debug)]
enum WishlistSubcommand {
    List,
    Add { post_id: String },
    Remove { post_id: String },
}

#[derive(Args, Debug)]
struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Subcommand, Debug)]
enum CartSubcommand {
    List {
        /// Show the local cache without contacting the API
        #[arg(long)]
        local: bool,
    },
    Add {
        post_id: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    Set {
        post_id: String,
        quantity: u32,
    },
    Remove {
        post_id: String,
    },
    /// Empty the remote and local cart
    Clear,
    /// Push the local cart to the API
    Sync,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Outcome<'a> {
    action: &'a str,
    post_id: &'a str,
    ok: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartListing {
    items: Vec<CartEntry>,
    total_quantity: u64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = SyncConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    debug!("Using store {} and API {}", config.store_path.display(), config.api_url);

    let store = FileStore::open(&config.store_path)?;
    let services = ServicesBuilder::new().store(store).config(config).build()?;

    match cli.command {
        Command::Login { token } => {
            services.session().set_token(&token)?;
            print_json(&serde_json::json!({ "authenticated": services.session().is_authenticated() }))
        }
        Command::Logout => {
            services.session().clear()?;
            print_json(&serde_json::json!({ "authenticated": false }))
        }
        Command::Wishlist(wishlist) => run_wishlist(&services, wishlist.command).await,
        Command::Cart(cart) => run_cart(&services, cart.command).await,
        Command::Scan { payload } => print_json(&resolve_scan(&payload)?),
    }
}

async fn run_wishlist(services: &Services, command: WishlistSubcommand) -> Result<(), CliError> {
    let wishlist = services.wishlist();
    match command {
        WishlistSubcommand::List => print_json(&wishlist.fetch_all().await?),
        WishlistSubcommand::Add { post_id } => {
            let ok = wishlist.add(&post_id).await?;
            print_json(&Outcome {
                action: "add",
                post_id: &post_id,
                ok,
            })
        }
        WishlistSubcommand::Remove { post_id } => {
            let ok = wishlist.remove(&post_id).await?;
            print_json(&Outcome {
                action: "remove",
                post_id: &post_id,
                ok,
            })
        }
    }
}

async fn run_cart(services: &Services, command: CartSubcommand) -> Result<(), CliError> {
    let cart = services.cart();
    match command {
        CartSubcommand::List { local } => {
            let items = if local {
                cart.local_entries()
            } else {
                cart.fetch_all().await?
            };
            print_json(&CartListing {
                total_quantity: total_quantity(&items),
                items,
            })
        }
        CartSubcommand::Add { post_id, quantity } => {
            let ok = cart.add(&post_id, quantity).await?;
            print_json(&Outcome {
                action: "add",
                post_id: &post_id,
                ok,
            })
        }
        CartSubcommand::Set { post_id, quantity } => {
            let ok = cart.set_quantity(&post_id, quantity).await?;
            print_json(&Outcome {
                action: "set",
                post_id: &post_id,
                ok,
            })
        }
        CartSubcommand::Remove { post_id } => {
            let ok = cart.remove(&post_id).await?;
            print_json(&Outcome {
                action: "remove",
                post_id: &post_id,
                ok,
            })
        }
        CartSubcommand::Clear => print_json(&cart.clear().await?),
        CartSubcommand::Sync => print_json(&cart.sync().await?),
    }
}

fn total_quantity(items: &[CartEntry]) -> u64 {
    items.iter().map(|e| u64::from(e.quantity)).sum()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_quantity_does_not_overflow() {
        let items = [CartEntry::new("x", u32::MAX), CartEntry::new("y", 2)];
        assert_eq!(total_quantity(&items), u64::from(u32::MAX) + 2);
        assert_eq!(total_quantity(&[]), 0);
    }
}
