//! Wonder CLI - drive the storefront state from a terminal.
//!
//! Every invocation is one execution context attached to the JSON-file
//! store at `WONDER_STORE_PATH`. Several invocations (or a `watch` running
//! alongside) share the store the way browser tabs share local storage.
//!
//! # Usage
//!
//! ```bash
//! # Chat as the current customer, then answer as staff
//! wonder chat send "Do you ship to Cebu?"
//! wonder chat list
//! wonder chat send --as admin --conversation guest-1700000000000-k3j9x2m1q "We do"
//!
//! # Orders
//! wonder orders place --name "Jane" --mobile 0917 --address "1 Main St" \
//!     --transaction TX-1 --item 42:1:19.99:Cable
//! wonder orders transition 1 processing
//!
//! # Featured products
//! wonder featured add 42
//! wonder featured move 42 top
//!
//! # Follow changes as staff
//! wonder watch
//! ```
//!
//! # Commands
//!
//! - `chat` - Send, list, read conversations
//! - `notify` - List and acknowledge notifications
//! - `orders` - Place orders and move them through their lifecycle
//! - `featured` - Maintain featured-product order
//! - `reset` - Password-reset requests
//! - `user` - Sign in, sign out, show identity
//! - `watch` - Follow the store and log view refreshes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wonder_core::{
    Channel, ConversationId, Email, NotificationId, OrderId, OrderStatus, ProductId,
    ResetRequestId, Sender, UserId,
};
use wonder_state::models::OrderItem;
use wonder_state::{AppContext, LogFormat, Position, StateConfig, Viewer};

mod commands;

use commands::orders::PlaceArgs;

#[derive(Parser)]
#[command(name = "wonder")]
#[command(author, version, about = "Wonder storefront state tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat between customers and staff
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
    /// Admin and client notifications
    Notify {
        #[command(subcommand)]
        action: NotifyAction,
    },
    /// Orders and their status
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Featured product ordering
    Featured {
        #[command(subcommand)]
        action: FeaturedAction,
    },
    /// Password-reset requests
    Reset {
        #[command(subcommand)]
        action: ResetAction,
    },
    /// Customer identity for this profile
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Follow the store and log refreshed views
    Watch {
        /// Watch a customer's view instead of the staff view
        #[arg(long)]
        client: Option<ConversationId>,

        /// Conversations to keep a staff chat window open for
        #[arg(long = "open")]
        open: Vec<ConversationId>,
    },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Send a message
    Send {
        /// Message text
        text: String,

        /// Who is sending (`client` or `admin`)
        #[arg(long = "as", default_value = "client")]
        sender: Sender,

        /// Conversation to write into (required for admin)
        #[arg(short, long)]
        conversation: Option<ConversationId>,

        /// Display name for a client message
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List conversations, most recent first
    List {
        /// Whose unread counts to show
        #[arg(long = "as", default_value = "admin")]
        viewer: Sender,
    },
    /// Show one conversation
    Thread { conversation: ConversationId },
    /// Mark a conversation read
    Read {
        conversation: ConversationId,

        /// Who has read it
        #[arg(long = "as", default_value = "admin")]
        reader: Sender,
    },
}

#[derive(Subcommand)]
enum NotifyAction {
    /// List a channel, newest first
    List {
        #[arg(default_value = "admin")]
        channel: Channel,

        /// Only unread notifications
        #[arg(short, long)]
        unread: bool,
    },
    /// Mark one notification read, or all with no id
    Read {
        channel: Channel,
        id: Option<NotificationId>,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Place an order at checkout
    Place {
        /// Cart line as `PRODUCT_ID:QUANTITY:PRICE:NAME` (repeatable)
        #[arg(short, long = "item", required = true, value_parser = commands::orders::parse_item)]
        items: Vec<OrderItem>,

        #[arg(long)]
        name: String,

        #[arg(long)]
        mobile: String,

        #[arg(long)]
        email: Option<Email>,

        #[arg(long)]
        address: String,

        #[arg(long)]
        transaction: String,

        #[arg(long, default_value = "0")]
        tax: Decimal,
    },
    /// List orders, newest first
    List {
        /// Filter by customer name or mobile
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Move an order to another status
    Transition {
        id: OrderId,
        status: OrderStatus,

        /// Recorded in the log
        #[arg(long, default_value = "cli")]
        actor: String,
    },
    /// Replace an order's notes
    Notes { id: OrderId, notes: String },
    /// Delete an order
    Delete { id: OrderId },
}

#[derive(Subcommand)]
enum FeaturedAction {
    /// Show featured products in order
    List,
    /// Feature a product at the bottom
    Add { product: ProductId },
    /// Stop featuring a product
    Remove { product: ProductId },
    /// Put a product at a 1-based position
    Set {
        product: ProductId,
        #[arg(allow_negative_numbers = true)]
        order: i64,
    },
    /// Move a product to `top`, `bottom` or `middle`
    Move { product: ProductId, position: Position },
}

#[derive(Subcommand)]
enum ResetAction {
    /// Request a reset for the signed-in customer
    Submit,
    /// Mark a request handled
    Resolve { id: ResetRequestId },
    /// Show pending requests
    List,
}

#[derive(Subcommand)]
enum UserAction {
    /// Show the identity in effect
    Whoami,
    /// Sign a customer in
    SignIn {
        #[arg(long)]
        id: UserId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Email,
    },
    /// Sign the customer out
    SignOut,
    /// Move a legacy guest thread onto the current identity
    Adopt { legacy: ConversationId },
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wonder=info,wonder_state=info".into());

    let is_json = format == LogFormat::Json;
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(|| tracing_subscriber::fmt::layer().with_target(false));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StateConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Text);
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StateConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = AppContext::from_config(config.clone());
    match cli.command {
        Commands::Chat { action } => match action {
            ChatAction::Send {
                text,
                sender,
                conversation,
                name,
            } => commands::chat::send(&ctx, sender, conversation, name, &text)?,
            ChatAction::List { viewer } => commands::chat::list(&ctx, viewer)?,
            ChatAction::Thread { conversation } => commands::chat::thread(&ctx, &conversation)?,
            ChatAction::Read {
                conversation,
                reader,
            } => commands::chat::read(&ctx, &conversation, reader)?,
        },
        Commands::Notify { action } => match action {
            NotifyAction::List { channel, unread } => commands::notify::list(&ctx, channel, unread)?,
            NotifyAction::Read { channel, id } => commands::notify::read(&ctx, channel, id)?,
        },
        Commands::Orders { action } => match action {
            OrderAction::Place {
                items,
                name,
                mobile,
                email,
                address,
                transaction,
                tax,
            } => commands::orders::place(
                &ctx,
                PlaceArgs {
                    items,
                    name,
                    mobile,
                    email,
                    address,
                    transaction,
                    tax,
                },
            )?,
            OrderAction::List { search } => commands::orders::list(&ctx, search.as_deref())?,
            OrderAction::Transition { id, status, actor } => {
                commands::orders::transition(&ctx, id, status, &actor)?;
            }
            OrderAction::Notes { id, notes } => commands::orders::notes(&ctx, id, &notes)?,
            OrderAction::Delete { id } => commands::orders::delete(&ctx, id)?,
        },
        Commands::Featured { action } => match action {
            FeaturedAction::List => commands::featured::list(&ctx)?,
            FeaturedAction::Add { product } => commands::featured::add(&ctx, product)?,
            FeaturedAction::Remove { product } => commands::featured::remove(&ctx, product)?,
            FeaturedAction::Set { product, order } => commands::featured::set(&ctx, product, order)?,
            FeaturedAction::Move { product, position } => {
                commands::featured::move_to(&ctx, product, position)?;
            }
        },
        Commands::Reset { action } => match action {
            ResetAction::Submit => commands::reset::submit(&ctx)?,
            ResetAction::Resolve { id } => commands::reset::resolve(&ctx, id)?,
            ResetAction::List => commands::reset::list(&ctx)?,
        },
        Commands::User { action } => match action {
            UserAction::Whoami => commands::user::whoami(&ctx)?,
            UserAction::SignIn { id, name, email } => {
                commands::user::sign_in(&ctx, id, name, email)?;
            }
            UserAction::SignOut => commands::user::sign_out(&ctx)?,
            UserAction::Adopt { legacy } => commands::user::adopt(&ctx, &legacy)?,
        },
        Commands::Watch { client, open } => {
            let viewer = client.map_or(Viewer::Admin, Viewer::Client);
            commands::watch::run(config, viewer, &open).await?;
        }
    }
    Ok(())
}
