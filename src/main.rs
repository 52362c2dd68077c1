//! Bavarian LIDAR fetcher CLI application
//!
//! Command-line interface for building region and tile lists from the
//! Bavarian geoportal's LIDAR open data.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use bavaria_lidar::cli::{
    handle_check_url, handle_init_config, handle_regions, handle_run, handle_tiles, Cli,
    CommandContext, Commands,
};
use bavaria_lidar::config::AppConfig;
use bavaria_lidar::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Missing .env is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);
    info!("Bavaria LIDAR fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let ctx = CommandContext {
        config,
        quiet: cli.global.quiet,
    };

    match cli.command {
        Commands::Run(args) => {
            info!("Executing run command");
            handle_run(args, &ctx).await
        }
        Commands::Regions(args) => {
            info!("Executing regions command");
            handle_regions(args, &ctx).await
        }
        Commands::Tiles(args) => {
            info!("Executing tiles command");
            handle_tiles(args, &ctx).await
        }
        Commands::CheckUrl(args) => {
            info!("Executing check-url command");
            handle_check_url(args, &ctx).await
        }
        Commands::InitConfig(args) => {
            info!("Executing init-config command");
            handle_init_config(args, &ctx).await
        }
    }
}

/// Initialize logging from CLI verbosity, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli.log_directive(&config.logging.level);

    let mut filter = EnvFilter::from_default_env();
    match format!("bavaria_lidar={}", level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring invalid log level {:?}: {}", level, e),
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
