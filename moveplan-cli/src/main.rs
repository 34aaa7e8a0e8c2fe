//! Moveplan CLI - plan your move in the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod auth;
mod commands;
mod output;

use commands::auth::AuthCommands;
use commands::budget::BudgetCommands;
use commands::expense::ExpenseCommands;
use commands::inventory::InventoryCommands;
use commands::logs::LogsCommands;
use commands::move_cmd::MoveCommands;
use commands::task::TaskCommands;
use commands::timeline::TimelineCommands;

/// Moveplan - plan your move in the terminal
#[derive(Parser)]
#[command(name = "mp", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of the active move
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Track expenses
    Expense {
        #[command(subcommand)]
        command: ExpenseCommands,
    },

    /// Manage timeline events
    Timeline {
        #[command(subcommand)]
        command: TimelineCommands,
    },

    /// Manage household inventory
    Inventory {
        #[command(subcommand)]
        command: InventoryCommands,
    },

    /// Show or set the budget
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },

    /// Show or set addresses and moving day
    Move {
        #[command(subcommand)]
        command: MoveCommands,
    },

    /// Sign up, sign in and sign out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Retry moving guest data into your account
    Migrate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: LogsCommands,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MOVEPLAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => commands::status::run(json).await,
        Commands::Task { command } => commands::task::run(command).await,
        Commands::Expense { command } => commands::expense::run(command).await,
        Commands::Timeline { command } => commands::timeline::run(command).await,
        Commands::Inventory { command } => commands::inventory::run(command).await,
        Commands::Budget { command } => commands::budget::run(command).await,
        Commands::Move { command } => commands::move_cmd::run(command).await,
        Commands::Auth { command } => commands::auth::run(command).await,
        Commands::Migrate { json } => commands::migrate::run(json).await,
        Commands::Logs { command } => commands::logs::run(command),
    }
}
