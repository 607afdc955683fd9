use anyhow::Context;
use bookstore_app::books::ENDPOINTS;
use bookstore_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Bookstore service command line
#[derive(Debug, Parser)]
#[command(name = "bookstore", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Check that the configured document store answers a ping
    Ping,
    /// Print the resolved configuration with credentials masked
    Config,
    /// Print the HTTP endpoint catalog
    Routes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            bookstore_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookstore CLI starting server");
            bookstore_app::app::serve(&settings).await
        }
        Command::Ping => {
            bookstore_telemetry::init(&settings.telemetry)?;
            bookstore_app::app::probe_store(&settings.database).await?;
            tracing::info!(database = %settings.database.name, "document store is reachable");
            Ok(())
        }
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings.redacted())
                .context("failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
        Command::Routes => {
            for (route, description) in ENDPOINTS {
                println!("{route:<32} {description}");
            }
            println!("{:<32} {}", "GET /api", "API documentation");
            Ok(())
        }
    }
}
