mod commands;
mod config;
mod error;

use clap::{Parser, Subcommand};
use lynx_access::{
    FileStore, IdentityProvider, KeyValueStore, MemoryProvider, Role, SessionOrchestrator,
    provide_auth,
};
use lynx_gotrue::GoTrueProvider;
use rootcause::prelude::Report;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{OfflineAccount, PortalConfig};
use crate::error::PortalError;

#[derive(Parser)]
#[command(name = "lynx-portal")]
#[command(about = "Sign in to the lynx portal and inspect role-based navigation", long_about = None)]
struct Cli {
    /// Use an in-memory identity provider even if one is configured.
    /// Only the account from LYNX__OFFLINE__* can sign in, and sign-ups are
    /// forgotten when the command exits.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current session and active role
    Status,
    /// Sign in with email and password
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Register a new account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and forget the active role
    SignOut,
    /// List the roles available to the signed-in user
    Roles,
    /// Switch the active role
    SwitchRole {
        /// Role name, e.g. carrier_admin
        role: Role,
    },
    /// Print the navigation menu
    Menu {
        /// Role to build the menu for; defaults to the active role
        #[arg(long)]
        role: Option<Role>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            tracing::debug!(error = ?report, "command failed");
            eprintln!("error: {}", report.current_context());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Report<PortalError>> {
    let config = PortalConfig::from_env().map_err(|e| PortalError::Configuration {
        details: e.to_string(),
    })?;
    tracing::debug!(data_dir = %config.data_dir.display(), "loaded configuration");

    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::in_dir(&config.data_dir));
    let provider: Arc<dyn IdentityProvider> = match &config.gotrue {
        Some(gotrue) if !cli.offline => Arc::new(
            GoTrueProvider::new(gotrue.clone(), Arc::clone(&storage)).map_err(|report| {
                PortalError::Provider {
                    details: report.to_string(),
                }
            })?,
        ),
        _ => {
            tracing::warn!("no identity service configured, using an in-memory provider");
            Arc::new(offline_provider(config.offline.as_ref()))
        }
    };

    let auth = SessionOrchestrator::new(provider, storage, config.access);
    auth.start();
    let result = provide_auth(auth.clone(), commands::execute(cli.command)).await;
    auth.stop();
    result
}

fn offline_provider(account: Option<&OfflineAccount>) -> MemoryProvider {
    let provider = MemoryProvider::new();
    if let Some(account) = account {
        provider.register_account(&account.email, &account.password, account.roles());
        tracing::debug!(email = %account.email, "seeded offline account");
    }
    provider
}
