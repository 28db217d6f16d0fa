//! Workspace Gateway
//!
//! HTTP gateway for sending mail over SMTP and reaching Gmail, Google Calendar
//! and Google OAuth.

use anyhow::Context;
use clap::{Parser, Subcommand};

use workspace_gateway::config::Config;
use workspace_gateway::google::auth::OAuthClient;
use workspace_gateway::http::server;
use workspace_gateway::mail::sender::MailSender;

/// Workspace Gateway
#[derive(Parser)]
#[command(name = "workspace-gateway")]
#[command(author, version, about = "HTTP gateway for SMTP mail, Gmail, Calendar and Google OAuth")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind, overrides HOST
        #[arg(long)]
        host: Option<String>,

        /// Port to bind, overrides PORT
        #[arg(long)]
        port: Option<u16>,
    },

    /// Authorize with Google and store the tokens
    Auth {
        /// Authorization code obtained out of band
        #[arg(long)]
        code: Option<String>,

        /// Comma-separated scopes to request
        #[arg(long, value_delimiter = ',')]
        scopes: Vec<String>,

        /// Print the consent URL without opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Check that the SMTP server accepts a connection
    TestSmtp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            server::serve(config).await?;
        }
        Commands::Auth {
            code,
            scopes,
            no_browser,
        } => {
            let oauth = OAuthClient::new(config.google.clone()).await?;
            let tokens = oauth
                .authenticate_interactive(&scopes, code, !no_browser)
                .await?;

            eprintln!("Authentication completed successfully!");
            eprintln!("Tokens saved to {}", config.google.token_path.display());
            if let Some(refresh_token) = tokens.refresh_token {
                eprintln!("Refresh token: {}", refresh_token);
            }
        }
        Commands::TestSmtp => {
            config.log_summary();
            let sender = MailSender::new(&config.smtp)?;
            sender.test_connection().await?;
            eprintln!("SMTP connection test successful");
        }
    }

    Ok(())
}
