//! bookdesk - command line front end for the booking portal client.
//!
//! Stores the portal credential, reports session state and walks the
//! client-side router the same way the portal UI does.

use std::io;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bookdesk_core::auth::{decode_claims, LoginStatus};
use bookdesk_core::router::Navigation;
use bookdesk_core::storage::StorageKind;
use bookdesk_core::{ApiClient, Config, Router, SessionContext, TokenStore};

#[derive(Parser)]
#[command(name = "bookdesk", version, about = "Booking portal session client")]
struct Cli {
    /// Backend base address (overrides config and BOOKDESK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Keep the credential in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an issued token and check it
    Login {
        #[arg(long)]
        token: String,
    },
    /// Remove the stored token
    Logout,
    /// Show login and admin state
    Status,
    /// Show the stored token's expiry
    Token,
    /// Navigate to a path through the route guard
    Go { path: String },
    /// List the route table
    Routes,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

struct Portal {
    tokens: TokenStore,
    router: Arc<Router>,
    session: SessionContext,
}

fn open_portal(cli: &Cli) -> Result<Portal> {
    let mut config = Config::load()?;
    if let Some(ref url) = cli.api_url {
        config.api_base_url = url.clone();
    }
    if cli.ephemeral {
        config.storage = StorageKind::Memory;
    }

    let tokens = TokenStore::new(config.open_storage()?);
    let api = ApiClient::from_config(&config, tokens.clone())?;
    let router = Arc::new(Router::with_defaults(tokens.clone()));
    let session = SessionContext::new(tokens.clone(), api, router.clone());

    Ok(Portal {
        tokens,
        router,
        session,
    })
}

fn describe_login(status: &LoginStatus) -> String {
    match status {
        LoginStatus::Anonymous => "not logged in".to_string(),
        LoginStatus::Malformed => "not logged in (stored token was malformed and has been removed)".to_string(),
        LoginStatus::Expired => "not logged in (token expired and has been removed)".to_string(),
        LoginStatus::Active { expires_at: Some(at) } => format!("logged in until {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        LoginStatus::Active { expires_at: None } => "logged in".to_string(),
    }
}

fn describe_navigation(nav: &Navigation) -> String {
    match nav {
        Navigation::Allowed(m) => format!("{} ({})", m.path, m.route.name),
        Navigation::Redirected { from, to } => format!("{} -> {} (redirected)", from, to.path),
        Navigation::Blocked { from, to } => format!("{} blocked (redirect to {} rejected)", from, to),
        Navigation::NotFound(path) => format!("{}: no such page", path),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();
    let portal = open_portal(&cli)?;

    match cli.command {
        Command::Login { ref token } => {
            let status = portal.session.login_with_token(token)?;
            println!("{}", describe_login(&status));
        }
        Command::Logout => {
            portal.session.logout();
            println!("logged out");
        }
        Command::Status => {
            let status = portal.session.check_login();
            println!("{}", describe_login(&status));
            if status.is_logged_in() {
                match portal.session.check_admin().await {
                    Ok(true) => println!("admin: yes"),
                    Ok(false) => println!("admin: no"),
                    Err(e) => println!("admin: unknown ({})", e),
                }
            }
        }
        Command::Token => match portal.tokens.get_token() {
            None => println!("no token stored"),
            Some(token) => match decode_claims(&token) {
                Ok(claims) => {
                    let now = Utc::now().timestamp();
                    let state = if claims.is_expired_at(now) { "expired" } else { "valid" };
                    match claims.expires_at() {
                        Some(at) => println!("token {}, expires {}", state, at.format("%Y-%m-%d %H:%M:%S UTC")),
                        None => println!("token {}, exp {}", state, claims.exp),
                    }
                }
                Err(e) => println!("token stored but unreadable: {}", e),
            },
        },
        Command::Go { ref path } => {
            let nav = portal.router.push(path);
            println!("{}", describe_navigation(&nav));
        }
        Command::Routes => {
            for route in portal.router.routes() {
                let lock = if route.requires_auth { "  [login required]" } else { "" };
                println!("{:<8} {}{}", route.name, route.pattern, lock);
            }
        }
    }

    info!("bookdesk done");
    Ok(())
}
