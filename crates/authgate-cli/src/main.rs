//! authgate - Main entry point

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use authgate_cli::{build_manager, execute, Cli, ShellConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authgate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ShellConfig::default_path);
    let (config, created) = ShellConfig::load_or_create(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    }

    let manager = build_manager(&config)?;
    execute(&manager, cli.command, &mut std::io::stdout()).await
}
