//! Hey There - command line entry point
//!
//! Runs one skill turn per invocation: the platform event is read as JSON and
//! the response is written to stdout.

use clap::{Parser, Subcommand};
use hey_there_rs::config::{mask_number, Config};
use hey_there_rs::directory::Directory;
use hey_there_rs::dispatch::{compose_body, NotificationDispatcher, TextbeltTransport};
use hey_there_rs::{Result, SkillHandler};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Hey There - send a spoken message by SMS
#[derive(Parser)]
#[command(name = "hey-there")]
#[command(about = "Voice skill handler that relays messages to preconfigured recipients")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one platform event and print the response
    Handle {
        /// Read the event from a file instead of stdin
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,
    },

    /// Show which number a recipient name resolves to
    Resolve {
        /// Recipient name as it would be spoken
        name: String,
    },

    /// Send a message directly, without a conversation
    Send {
        /// Recipient name
        #[arg(long)]
        to: String,

        /// Sender name appended to the message
        #[arg(long)]
        from: String,

        /// Message text
        message: String,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Missing .env is fine, the environment may already be set
    let _ = dotenvy::dotenv();

    // Initialize logging (stderr, stdout carries the response)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;

    match cli.command {
        Commands::Handle { file } => cmd_handle(&config, file.as_deref()).await,
        Commands::Resolve { name } => cmd_resolve(&config, &name),
        Commands::Send { to, from, message } => cmd_send(&config, &to, &from, &message).await,
        Commands::Config => cmd_config(&config),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_handle(config: &Config, file: Option<&Path>) -> Result<()> {
    let raw = read_event(file)?;

    let transport = Arc::new(TextbeltTransport::new(config)?);
    let handler = SkillHandler::new(config, transport.clone());

    let outcome = handler.handle_json(&raw);

    // The response never waits on delivery; only the process exit does
    if let Ok(Some(response)) = &outcome {
        println!("{}", response.to_json()?);
    }
    transport.drain().await;

    match outcome {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("Invocation failed: {}", e);
            Err(e)
        }
    }
}

fn cmd_resolve(config: &Config, name: &str) -> Result<()> {
    let directory = Directory::from_config(config);
    let address = directory.resolve(name)?;
    println!("{} -> {}", name, address);
    Ok(())
}

async fn cmd_send(config: &Config, to: &str, from: &str, message: &str) -> Result<()> {
    let transport = Arc::new(TextbeltTransport::new(config)?);
    let dispatcher = NotificationDispatcher::new(Directory::from_config(config), transport.clone());

    let address = dispatcher.directory().resolve(to)?.clone();
    let ack = dispatcher.send(&address, &compose_body(message, from))?;
    info!(?ack, "Send issued, waiting for relay");

    transport.drain().await;
    println!("Sent to {} ({})", to, mask_number(address.as_str()));
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("Application ID: {}", config.expected_application_id);
    println!("Relay URL:      {}", config.relay_url);
    println!("Send timeout:   {}s", config.send_timeout.as_secs());
    for entry in Directory::from_config(config).entries() {
        println!("Recipient {:<5} {}", entry.family, mask_number(entry.address.as_str()));
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn read_event(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_handle() {
        let cli = Cli::try_parse_from(["hey-there", "handle", "-f", "event.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Handle { file: Some(ref f) } if f == Path::new("event.json")
        ));
    }

    #[test]
    fn test_cli_parses_send() {
        let cli = Cli::try_parse_from([
            "hey-there", "send", "--to", "Mom", "--from", "Alex", "Running late",
        ])
        .unwrap();
        match cli.command {
            Commands::Send { to, from, message } => {
                assert_eq!(to, "Mom");
                assert_eq!(from, "Alex");
                assert_eq!(message, "Running late");
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_read_event_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(read_event(Some(&path)).unwrap(), "{}");
    }

    #[test]
    fn test_read_event_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = read_event(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, hey_there_rs::Error::Io(_)));
    }
}
