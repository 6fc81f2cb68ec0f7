//! chatrelay - forwards chat-completion requests to Azure OpenAI.
//!
//! A thin relay that authenticates outbound calls with Azure AD bearer
//! tokens, optionally streams completions back as server-sent events, and
//! keeps an ephemeral in-process store of conversation records.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatrelay::config::Config;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "Chat-completion relay for Azure OpenAI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Override the listening port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate environment configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatrelay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let mut config = Config::from_env()?;
            if let Some(port) = port {
                config.port = port;
            }

            tracing::info!(
                endpoint = %config.endpoint,
                api_version = %config.api_version,
                deployment = ?config.deployment,
                "Loaded configuration"
            );

            chatrelay::relay::run_server(config).await
        }

        Commands::Check => {
            let config = Config::from_env()?;
            println!("Configuration OK");
            println!("  endpoint:    {}", config.endpoint);
            println!("  api version: {}", config.api_version);
            println!(
                "  deployment:  {}",
                config
                    .deployment
                    .as_deref()
                    .unwrap_or("(none - requests must name a model)")
            );
            println!("  port:        {}", config.port);
            Ok(())
        }
    }
}
