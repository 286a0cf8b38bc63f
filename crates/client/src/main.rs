//! CLI for sealed-bid auction sessions.
//!
//! Every invocation loads a local ledger snapshot, executes one call as the
//! given identity, and writes the snapshot back only if the call committed.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auction_client::{load_config, load_ledger, save_ledger, BidBuilder, Identity, SessionClient};
use auction_module::SessionModule;
use auction_types::{AssetKind, BidSide};

#[derive(Parser)]
#[command(name = "auction-cli")]
#[command(about = "CLI for sealed-bid double auction sessions")]
struct Cli {
    /// Ledger snapshot file
    #[arg(long, default_value = "ledger.json")]
    state: PathBuf,

    /// Genesis config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset kind: session or transaction
    #[arg(long, default_value = "session")]
    kind: AssetKind,

    /// Calling principal
    #[arg(long)]
    principal: String,

    /// Calling principal's organization
    #[arg(long)]
    org: String,

    /// Organization of the peer executing the call (defaults to --org)
    #[arg(long)]
    peer_org: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new session administered by the caller
    CreateSession {
        #[arg(long)]
        session_id: String,
    },

    /// Store a new private bid and print its submission id
    Bid {
        #[arg(long)]
        session_id: String,

        /// buy or sell
        #[arg(long)]
        side: BidSide,

        #[arg(long)]
        volume: u64,

        /// Store the bid without a blinding salt
        #[arg(long)]
        unsalted: bool,
    },

    /// Record the digest of a stored bid in the session
    Submit {
        #[arg(long)]
        session_id: String,

        #[arg(long)]
        submission_id: String,
    },

    /// Close bidding (admin)
    Close {
        #[arg(long)]
        session_id: String,
    },

    /// Reveal a stored bid
    Reveal {
        #[arg(long)]
        session_id: String,

        #[arg(long)]
        submission_id: String,
    },

    /// Settle and end the session (admin)
    End {
        #[arg(long)]
        session_id: String,
    },

    /// Print the public session record
    QuerySession {
        #[arg(long)]
        session_id: String,
    },

    /// Print one of the caller's own stored bids
    QueryBid {
        #[arg(long)]
        session_id: String,

        #[arg(long)]
        submission_id: String,
    },

    /// Print the caller's principal id
    Whoami,

    /// Print per-side settlement totals
    Summary {
        #[arg(long)]
        session_id: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("auction_cli=info,auction_module=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let module = SessionModule::new(cli.kind, config)?;
    let mut ledger = load_ledger(&cli.state)?;
    let mut rng = OsRng;

    let mut identity = Identity::new(cli.principal, cli.org);
    if let Some(peer) = cli.peer_org {
        identity = identity.with_peer(peer);
    }
    let mut client = SessionClient::new(&module, &mut ledger, identity);

    let mutated = match cli.command {
        Commands::CreateSession { session_id } => {
            client.create_session(&session_id, &mut rng)?;
            println!("Session {} created", session_id);
            true
        }

        Commands::Bid {
            session_id,
            side,
            volume,
            unsalted,
        } => {
            let mut builder = BidBuilder::new(
                side,
                client.identity().organization.clone(),
                client.identity().principal.clone(),
            )
            .volume(volume);
            if unsalted {
                builder = builder.unsalted();
            }
            let (submission_id, _) = client.bid_with(&session_id, builder, &mut rng)?;
            info!(session_id = %session_id, %side, volume, "Bid stored");
            println!("Submission ID: {}", submission_id);
            true
        }

        Commands::Submit {
            session_id,
            submission_id,
        } => {
            client.submit(&session_id, &submission_id, &mut rng)?;
            println!("Bid {} submitted to session {}", submission_id, session_id);
            true
        }

        Commands::Close { session_id } => {
            client.close(&session_id, &mut rng)?;
            println!("Session {} closed", session_id);
            true
        }

        Commands::Reveal {
            session_id,
            submission_id,
        } => {
            client.reveal(&session_id, &submission_id, &mut rng)?;
            println!("Bid {} revealed", submission_id);
            true
        }

        Commands::End { session_id } => {
            let output = client.end(&session_id, &mut rng)?;
            print_json(&output)?;
            true
        }

        Commands::QuerySession { session_id } => {
            print_json(&client.query_session(&session_id)?)?;
            false
        }

        Commands::QueryBid {
            session_id,
            submission_id,
        } => {
            print_json(&client.query_bid(&session_id, &submission_id)?)?;
            false
        }

        Commands::Whoami => {
            println!("{}", client.whoami());
            false
        }

        Commands::Summary { session_id } => {
            print_json(&client.summary(&session_id)?)?;
            false
        }
    };

    if mutated {
        save_ledger(&cli.state, &ledger)?;
    }
    Ok(())
}
