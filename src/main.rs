//! procassist - Doctor procedures assistant
//!
#![doc = "procassist - Doctor procedures assistant"]
#![doc = "Main entry point for the procassist CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use procassist::cli::{Cli, Commands};
use procassist::commands;
use procassist::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat => {
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Add {
            doctor,
            code,
            name,
            cost,
        } => {
            tracing::info!("Adding procedure {} for {}", code, doctor);
            commands::procedures::add_procedure(&config, &doctor, &code, &name, &cost).await?;
            Ok(())
        }
        Commands::Quote { code, doctor, json } => {
            tracing::info!("Requesting quote for {}", code);
            commands::procedures::get_quote(&config, &code, doctor.as_deref(), json).await?;
            Ok(())
        }
        Commands::History {
            doctor,
            limit,
            start,
            end,
            json,
        } => {
            tracing::info!("Requesting history for {}", doctor);
            commands::procedures::show_history(
                &config,
                &doctor,
                limit,
                start.as_deref(),
                end.as_deref(),
                json,
            )
            .await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never mix with `--json` output.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "procassist=debug"
    } else {
        "procassist=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
