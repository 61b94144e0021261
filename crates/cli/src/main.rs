//! Territory manager CLI - migrations, maintenance and account tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! terr-cli migrate
//!
//! # Remove expired sessions and password reset tokens
//! terr-cli sweep
//!
//! # Create an account
//! terr-cli create-user -e someone@example.com -p 'long passphrase' --verified
//! ```
//!
//! # Environment Variables
//!
//! - `TERRITORY_DATABASE_URL` - `MySQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "terr-cli")]
#[command(author, version, about = "Territory manager CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Delete expired sessions and password reset tokens
    Sweep,
    /// Create an account
    CreateUser {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (8 to 256 characters)
        #[arg(short, long)]
        password: String,

        /// Mark the email address as already confirmed
        #[arg(long)]
        verified: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), commands::CommandError> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Sweep => commands::sweep::run(&pool).await?,
        Commands::CreateUser {
            email,
            password,
            verified,
        } => {
            commands::user::create(&pool, &email, &password, verified).await?;
        }
    }
    Ok(())
}
