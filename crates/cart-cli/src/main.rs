//! cart
//!
//! Command-line cart backed by a JSON file, checked out through a
//! `create-checkout-session` endpoint (see `cart-server`).

mod prompt;

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cart_checkout::{
    AutoConfirm, CheckoutConfig, CheckoutError, CheckoutOrchestrator, Confirmation, DEFAULT_ENDPOINT,
    HttpSessionClient, Settlement,
};
use cart_core::{BillingInterval, CartStore, FileKeyValueStore, LineItem, LineItemInput, checked_total};

use crate::prompt::StdinConfirmation;

#[derive(Debug, Parser)]
#[command(name = "cart", version)]
#[command(about = "Manage a local cart and check it out")]
struct Args {
    /// Directory holding the saved cart
    #[arg(long, env = "CART_DATA_DIR", default_value = ".cart")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add one unit of an item (repeat to increase quantity)
    Add(AddArgs),

    /// Remove an item
    Remove { id: String },

    /// Set an item's quantity; 0 or less removes it
    Set {
        id: String,
        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },

    /// Show the cart
    List,

    /// Empty the cart
    Clear,

    /// Check out the cart
    Checkout(CheckoutArgs),
}

#[derive(Debug, clap::Args)]
struct AddArgs {
    id: String,
    name: String,
    price: Decimal,

    #[arg(long, default_value = "")]
    category: String,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    image: Option<String>,

    /// Bill as a subscription: month or year
    #[arg(long)]
    recurring: Option<BillingInterval>,
}

#[derive(Debug, clap::Args)]
struct CheckoutArgs {
    /// Skip the mixed-cart confirmation
    #[arg(long)]
    yes: bool,

    #[arg(long, env = "CART_CHECKOUT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Give up on the endpoint after this many seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    #[arg(long)]
    success_url: Option<String>,

    #[arg(long)]
    cancel_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let backend = FileKeyValueStore::open(&args.data_dir)
        .with_context(|| format!("opening cart directory {}", args.data_dir.display()))?;
    let store = Arc::new(CartStore::new(Arc::new(backend)));

    match args.command {
        Command::Add(add) => {
            let id = add.id.clone();
            store.add(line_item_input(add)).context("adding item")?;
            let quantity = store.get(&id).map_or(0, |item| item.quantity);
            println!("{id}: quantity {quantity}, cart total {}", store.total());
        }
        Command::Remove { id } => {
            store.remove(&id).context("saving cart")?;
            print!("{}", render_cart(&store.items()));
        }
        Command::Set { id, quantity } => {
            store.set_quantity(&id, quantity).context("updating quantity")?;
            print!("{}", render_cart(&store.items()));
        }
        Command::List => print!("{}", render_cart(&store.items())),
        Command::Clear => {
            store.clear().context("saving cart")?;
            println!("Cart cleared.");
        }
        Command::Checkout(checkout) => run_checkout(store, checkout).await?,
    }

    Ok(())
}

fn line_item_input(add: AddArgs) -> LineItemInput {
    let mut input = LineItemInput::new(add.id, add.name, add.price).with_category(add.category);
    if let Some(description) = add.description {
        input = input.with_description(description);
    }
    if let Some(image) = add.image {
        input = input.with_image(image);
    }
    if let Some(interval) = add.recurring {
        input = input.recurring(interval);
    }
    input
}

async fn run_checkout(store: Arc<CartStore>, args: CheckoutArgs) -> Result<()> {
    let client = HttpSessionClient::with_timeout(args.endpoint, Duration::from_secs(args.timeout_secs))?;

    let confirmation: Arc<dyn Confirmation> = if args.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(StdinConfirmation)
    };

    let mut config = CheckoutConfig::default();
    if let Some(url) = args.success_url {
        config = config.success_url(url);
    }
    if let Some(url) = args.cancel_url {
        config = config.cancel_url(url);
    }

    let orchestrator = CheckoutOrchestrator::new(store, Arc::new(client), confirmation).with_config(config);

    match orchestrator.initiate_checkout().await {
        Ok(outcome) => {
            println!("Open to pay ({}): {}", outcome.mode, outcome.redirect_url);
            if let Settlement::Partial { pending } = outcome.settlement {
                println!(
                    "{} subscription(s) still in cart: {}. Run checkout again to subscribe.",
                    pending.len(),
                    pending.join(", ")
                );
            }
            Ok(())
        }
        Err(CheckoutError::EmptyCart) => {
            println!("Cart is empty.");
            Ok(())
        }
        Err(CheckoutError::Declined) => {
            println!("Checkout cancelled; cart unchanged.");
            Ok(())
        }
        Err(CheckoutError::Persistence {
            settled_ids,
            redirect_url,
            source,
        }) => {
            println!("Open to pay: {redirect_url}");
            bail!(
                "cart could not be saved ({source}); these items may still be listed: {}",
                settled_ids.join(", ")
            )
        }
        Err(e) => Err(e).context("checkout failed"),
    }
}

fn render_cart(items: &[LineItem]) -> String {
    if items.is_empty() {
        return "Cart is empty.\n".into();
    }

    let mut out = String::new();
    for item in items {
        let billing = item
            .billing
            .effective_interval()
            .map_or_else(|| "one-time".to_string(), |interval| format!("per {interval}"));
        let _ = writeln!(
            out,
            "{:<16} {:<28} {:>4} x {:>10} = {:>10}  {billing}",
            item.id,
            item.name,
            item.quantity,
            item.unit_price,
            item.subtotal()
        );
    }

    let count: u64 = items.iter().map(|item| u64::from(item.quantity)).sum();
    let total = checked_total(items).unwrap_or(Decimal::MAX);
    let _ = writeln!(out, "{count} item(s), total {total}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_add_args_parse() {
        let args = Args::try_parse_from([
            "cart", "add", "retainer", "Advisory retainer", "30", "--recurring", "year", "--image", "",
        ])
        .unwrap();

        let Command::Add(add) = args.command else {
            panic!("expected add");
        };
        let input = line_item_input(add);
        assert_eq!(input.unit_price, dec!(30));
        assert_eq!(input.billing.effective_interval(), Some(BillingInterval::Year));
        assert_eq!(input.image.as_deref(), Some(""));
    }

    #[test]
    fn test_set_accepts_negative() {
        let args = Args::try_parse_from(["cart", "set", "a", "-1"]).unwrap();
        assert!(matches!(args.command, Command::Set { quantity: -1, .. }));
    }

    #[test]
    fn test_render_cart() {
        let mut a = LineItem::from_input(LineItemInput::new("a", "Audit", dec!(10)));
        a.quantity = 2;
        let b = LineItem::from_input(LineItemInput::new("b", "Retainer", dec!(30)).recurring(BillingInterval::Year));

        let out = render_cart(&[a, b]);
        assert!(out.contains("one-time"));
        assert!(out.contains("per year"));
        assert!(out.ends_with("3 item(s), total 50\n"));
        assert_eq!(render_cart(&[]), "Cart is empty.\n");
    }
}
