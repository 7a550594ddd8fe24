//! Bazaar CLI - operator and shopper tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! bazaar migrate
//!
//! # Create an admin user, or promote an existing one
//! bazaar admin create -e admin@example.com -n "Admin" -p 's3cret!' \
//!     --phone 555-0100 --address "1 Main St" --dob 1990-01-01 --answer football
//! bazaar admin promote -e buyer@example.com
//!
//! # Load categories and products from YAML
//! bazaar seed catalog.yaml
//!
//! # Shop against a running server
//! bazaar shop --server http://127.0.0.1:8080 products --page 1
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations (`DATABASE_URL`)
//! - `admin create` / `admin promote` - Manage admin users
//! - `seed` - Seed the catalog from a YAML file
//! - `shop` - Register, log in, browse, keep a cart and check out

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use bazaar_client::api::Registration;
use bazaar_client::{ApiClient, Session};
use bazaar_core::ProductId;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

use commands::admin::NewAdmin;
use commands::shop::ShopAction;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed categories and products from a YAML file
    Seed {
        /// Path to the seed file
        file: PathBuf,
    },
    /// Shopper commands against a running server
    Shop {
        /// Server base URL
        #[arg(long, env = "BAZAAR_URL", default_value = "http://127.0.0.1:8080")]
        server: String,

        /// Directory holding the persisted session
        #[arg(long, default_value = ".bazaar")]
        session_dir: PathBuf,

        #[command(subcommand)]
        command: ShopCommand,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        address: String,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: NaiveDate,

        /// Security answer used for password resets
        #[arg(long)]
        answer: String,
    },
    /// Give an existing user the admin role
    Promote {
        /// Email of the user to promote
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum ShopCommand {
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        address: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: NaiveDate,
        /// Security answer used for password resets
        #[arg(long)]
        answer: String,
    },
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List products, six per page, newest first
    Products {
        #[arg(long, default_value_t = 1)]
        page: i64,
    },
    /// Search product names and descriptions
    Search { keyword: String },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
    /// Pay for the cart and place an order
    Checkout {
        /// Payment method nonce from the gateway
        #[arg(long)]
        nonce: String,
    },
    /// List your orders
    Orders,
}

#[derive(Subcommand)]
enum CartCommand {
    /// Add a product by slug
    Add { slug: String },
    /// Remove one line for a product ID
    Remove { id: i32 },
    /// Show cart contents and total
    Show,
    /// Empty the cart
    Clear,
}

impl From<ShopCommand> for ShopAction {
    fn from(command: ShopCommand) -> Self {
        match command {
            ShopCommand::Register {
                name,
                email,
                password,
                phone,
                address,
                dob,
                answer,
            } => Self::Register(Registration {
                name,
                email,
                password,
                phone,
                address,
                dob,
                answer,
            }),
            ShopCommand::Login { email, password } => Self::Login { email, password },
            ShopCommand::Logout => Self::Logout,
            ShopCommand::Whoami => Self::WhoAmI,
            ShopCommand::Products { page } => Self::Products { page },
            ShopCommand::Search { keyword } => Self::Search { keyword },
            ShopCommand::Cart { action } => match action {
                CartCommand::Add { slug } => Self::CartAdd { slug },
                CartCommand::Remove { id } => Self::CartRemove {
                    id: ProductId::new(id),
                },
                CartCommand::Show => Self::CartShow,
                CartCommand::Clear => Self::CartClear,
            },
            ShopCommand::Checkout { nonce } => Self::Checkout { nonce },
            ShopCommand::Orders => Self::Orders,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
                phone,
                address,
                dob,
                answer,
            } => {
                commands::admin::create_user(NewAdmin {
                    email,
                    name,
                    password,
                    phone,
                    address,
                    dob,
                    answer,
                })
                .await?;
            }
            AdminAction::Promote { email } => {
                commands::admin::promote(&email).await?;
            }
        },
        Commands::Seed { file } => {
            commands::seed::catalog(&file).await?;
        }
        Commands::Shop {
            server,
            session_dir,
            command,
        } => {
            let api = ApiClient::new(&server)?;
            let mut session = Session::open_dir(session_dir);
            commands::shop::run(api, &mut session, command.into()).await?;
        }
    }
    Ok(())
}
