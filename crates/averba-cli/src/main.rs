//! averba - payroll margin authorization client
//!
//! Terminal front end for the margin authorization flow: requests a
//! confirmation code, polls the partner gateway until the subject answers,
//! and prints the released margin data.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// averba - payroll margin authorization client
#[derive(Parser, Debug)]
#[command(name = "averba")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Partner gateway base URL
    #[arg(long, default_value = "https://averbadigital.example.com/api")]
    base_url: String,

    /// Bearer token for the partner gateway (falls back to AVERBA_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full consultation: send a code, poll, print the margin
    Consult {
        /// Subject CPF (formatted or bare digits)
        cpf: String,

        /// Phone number to receive the confirmation code
        phone: String,

        /// Delivery channel: s (SMS) or w (WhatsApp)
        #[arg(short, long, default_value = "s", value_parser = ["s", "w"])]
        channel: String,

        /// Application user identifier for linkage bookkeeping
        #[arg(long, default_value = "cli")]
        user_id: String,

        /// Name shown in the out-of-band message
        #[arg(long)]
        display_name: Option<String>,

        /// Automatic status check ceiling
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Seconds between automatic status checks
        #[arg(long)]
        check_interval: Option<u64>,

        /// Skip the one-CPF-per-user linkage pre-flight
        #[arg(long)]
        no_linkage_enforcement: bool,
    },

    /// Probe the current authorization status once, without polling
    Check {
        /// Subject CPF (formatted or bare digits)
        cpf: String,

        /// Phone number the code was sent to
        phone: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let token = commands::resolve_token(cli.token)?;

    match cli.command {
        Commands::Consult {
            cpf,
            phone,
            channel,
            user_id,
            display_name,
            max_attempts,
            check_interval,
            no_linkage_enforcement,
        } => commands::consult::run(&commands::consult::ConsultArgs {
            base_url: cli.base_url,
            token,
            cpf,
            phone,
            channel,
            user_id,
            display_name,
            max_attempts,
            check_interval,
            enforce_linkage: !no_linkage_enforcement,
        }),
        Commands::Check { cpf, phone } => {
            commands::check::run(&cli.base_url, token, &cpf, &phone)
        },
    }
}
