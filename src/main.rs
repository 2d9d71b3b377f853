use clap::{Parser, Subcommand};

mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod state;
mod users;

use crate::auth::{
    repo::PgUserRepo,
    services::{ensure_admin, BootstrapOutcome},
};
use crate::config::AppConfig;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "stocksml")]
#[command(about = "Stocks API authentication and user management service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Create or promote the administrator account, then exit
    ProvisionAdmin {
        #[arg(long, env = "ADMIN_USERNAME")]
        username: String,

        #[arg(long, env = "ADMIN_EMAIL", default_value = "")]
        email: String,

        #[arg(long, env = "ADMIN_PASSWORD", default_value = "", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = AppConfig::from_env()?;
            tracing::debug!(?config, "configuration loaded");
            let host = config.host.clone();
            let port = config.port;
            let state = AppState::init(config).await?;
            app::serve(app::build_app(state), &host, port).await
        }
        Command::ProvisionAdmin {
            username,
            email,
            password,
        } => {
            let pool = db::connect(&config::database_url_from_env()?).await?;
            db::run_migrations(&pool).await?;
            let repo = PgUserRepo::new(pool);
            let (outcome, user) = ensure_admin(&repo, &username, &email, &password).await?;
            match outcome {
                BootstrapOutcome::Created => {
                    tracing::info!(user_id = %user.id, username = %user.username, "admin created")
                }
                BootstrapOutcome::Promoted => {
                    tracing::info!(user_id = %user.id, username = %user.username, "user promoted to admin")
                }
                BootstrapOutcome::AlreadyAdmin => {
                    tracing::info!(username = %user.username, "admin already provisioned")
                }
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "stocksml=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}
