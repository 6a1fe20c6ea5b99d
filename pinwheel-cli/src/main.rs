//! Pin Wheel CLI - the GRIT rewards portal in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{auto, draw, duplicates, enter, link, logs, merge, setup, status};

/// Pin Wheel - daily GRIT prize draw and account tooling
#[derive(Parser)]
#[command(name = "pw", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current draw window and entry count
    Status {
        /// Wallet address or account id to check participation for
        identifier: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Spend GRIT on an entry in today's draw
    Enter {
        /// Wallet address or account id
        identifier: String,
        /// Treat the identifier as a wallet address
        #[arg(long, conflicts_with = "account")]
        wallet: bool,
        /// Treat the identifier as an account id
        #[arg(long)]
        account: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run or inspect the daily draw
    Draw {
        #[command(subcommand)]
        command: DrawCommands,
    },

    /// Manage auto-entry
    Auto {
        #[command(subcommand)]
        command: AutoCommands,
    },

    /// Link a credential (wallet, email, discord) to a user
    Link {
        /// Local user id (UUID)
        user_id: String,
        /// Credential kind: wallet, email, or discord
        kind: String,
        /// The credential identifier
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List users sharing one ledger account
    Duplicates {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge a duplicate user into another
    Merge {
        /// User to keep (UUID); omit with --all
        keep_id: Option<String>,
        /// User to delete (UUID); omit with --all
        delete_id: Option<String>,
        /// Auto-merge every duplicate group by ranking
        #[arg(long)]
        all: bool,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Principal to authorize the merge as
        #[arg(long = "as")]
        principal: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configure the ledger endpoint and portal settings
    Setup {
        /// Base URL of the gritd points ledger
        #[arg(long)]
        ledger_url: Option<String>,
        /// API key for the ledger
        #[arg(long)]
        api_key: Option<String>,
        /// Chat webhook for winner announcements
        #[arg(long)]
        webhook_url: Option<String>,
        /// GRIT cost of one entry
        #[arg(long)]
        entry_cost: Option<i64>,
        /// Admin principals (repeatable); replaces the existing list
        #[arg(long = "admin")]
        admins: Vec<String>,
    },

    /// Show recent events from the log
    Logs {
        /// Only show events with errors
        #[arg(long)]
        errors: bool,
        /// Maximum entries to show
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DrawCommands {
    /// Run the draw for a window (defaults to the current one)
    Run {
        /// Window date (YYYY-MM-DD)
        #[arg(long)]
        window: Option<String>,
        /// Principal to authorize the draw as
        #[arg(long = "as")]
        principal: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recorded results
    Show {
        /// Window date (YYYY-MM-DD); all windows if omitted
        #[arg(long)]
        window: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a window's prize as shipped
    Ship {
        /// Window date (YYYY-MM-DD)
        window: String,
    },
}

#[derive(Subcommand)]
enum AutoCommands {
    /// Opt an account into the daily auto-entry batch
    On {
        /// Wallet address or account id
        identifier: String,
    },
    /// Opt an account out
    Off {
        /// Wallet address or account id
        identifier: String,
    },
    /// Run the batch for every opted-in account (scheduler entry point)
    Run {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { identifier, json } => status::run(identifier, json),
        Commands::Enter { identifier, wallet, account, json } => {
            enter::run(&identifier, wallet, account, json)
        }
        Commands::Draw { command } => match command {
            DrawCommands::Run { window, principal, json } => draw::run(window, principal, json),
            DrawCommands::Show { window, json } => draw::show(window, json),
            DrawCommands::Ship { window } => draw::ship(&window),
        },
        Commands::Auto { command } => match command {
            AutoCommands::On { identifier } => auto::set(&identifier, true),
            AutoCommands::Off { identifier } => auto::set(&identifier, false),
            AutoCommands::Run { json } => auto::run(json),
        },
        Commands::Link { user_id, kind, value, json } => link::run(&user_id, &kind, &value, json),
        Commands::Duplicates { json } => duplicates::run(json),
        Commands::Merge { keep_id, delete_id, all, force, principal, json } => {
            if all {
                merge::run_all(force, principal, json)
            } else {
                match (keep_id, delete_id) {
                    (Some(keep), Some(delete)) => merge::run(&keep, &delete, force, principal, json),
                    _ => anyhow::bail!("Provide <KEEP_ID> <DELETE_ID>, or use --all"),
                }
            }
        }
        Commands::Setup { ledger_url, api_key, webhook_url, entry_cost, admins } => {
            setup::run(ledger_url, api_key, webhook_url, entry_cost, admins)
        }
        Commands::Logs { errors, limit, json } => logs::run(errors, limit, json),
    }
}
