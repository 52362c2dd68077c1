//! Command handlers for the Bavarian LIDAR fetcher CLI
//!
//! This module implements the command handlers that merge CLI arguments with
//! the loaded configuration and drive the application stages.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::app::{
    collect_tile_files, get_bavaria_geoportal_lidar_file_list, load_regions, load_regions_json,
    write_records, ClientConfig, GeoportalClient, Meta4Options, Meta4Stats, OutputFormat,
    PipelineSummary,
};
use crate::cli::{CheckUrlArgs, InitConfigArgs, RegionsArgs, RunArgs, TilesArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Settings shared by all handlers
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Loaded configuration
    pub config: AppConfig,
    /// Suppress spinners and summaries
    pub quiet: bool,
}

impl CommandContext {
    /// HTTP client configuration with an optional timeout override
    pub fn client_config(&self, timeout: Option<u64>) -> ClientConfig {
        let mut client_config = self.config.client_config();
        if let Some(secs) = timeout {
            client_config.request_timeout = Duration::from_secs(secs);
        }
        client_config
    }

    fn spinner(&self, message: String) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["◐", "◓", "◑", "◒"]);
        spinner.set_style(style);
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    fn say(&self, message: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", message.as_ref());
        }
    }
}

/// Handle the run command
///
/// Parses the KML index, writes the region list, then follows every manifest
/// and writes the tile list.
pub async fn handle_run(args: RunArgs, ctx: &CommandContext) -> Result<()> {
    args.validate().map_err(AppError::generic)?;
    let start_time = Instant::now();

    let source = args.source.to_source()?;
    let client = GeoportalClient::with_config(ctx.client_config(args.timeout))?;

    let mut options = ctx.config.pipeline_options();
    options.debug = args.debug;
    if let Some(format) = args.format {
        options.format = format;
    }
    if let Some(path) = args.regions_output {
        options.regions_output = path;
    }
    if let Some(path) = args.tiles_output {
        options.tiles_output = path;
    }
    if let Some(concurrency) = args.concurrency {
        options.fetch_concurrency = concurrency;
    }
    info!(
        "Running pipeline from {} ({} output, {} manifests in flight)",
        source, options.format, options.fetch_concurrency
    );

    let spinner = ctx.spinner(format!("Building tile list from {}...", source));
    let result = get_bavaria_geoportal_lidar_file_list(&source, &client, &options).await;
    spinner.finish_and_clear();
    let summary = result?;

    info!("Pipeline finished in {:?}", start_time.elapsed());
    ctx.say(format_summary(&summary));
    Ok(())
}

/// Handle the regions command
pub async fn handle_regions(args: RegionsArgs, ctx: &CommandContext) -> Result<()> {
    super::args::validate_overrides(args.timeout, None).map_err(AppError::generic)?;

    let source = args.source.to_source()?;
    let client = GeoportalClient::with_config(ctx.client_config(args.timeout))?;
    let output = args
        .output
        .unwrap_or_else(|| ctx.config.output.regions_path.clone());
    let format = args.format.unwrap_or(ctx.config.output.format);

    let spinner = ctx.spinner(format!("Parsing regions from {}...", source));
    let result = load_regions(&source, &client).await;
    spinner.finish_and_clear();
    let regions = result?;

    write_records(&regions, &output, format).await?;
    ctx.say(format!(
        "✅ Wrote {} regions to {}",
        regions.len(),
        output.display()
    ));
    Ok(())
}

/// Handle the tiles command
pub async fn handle_tiles(args: TilesArgs, ctx: &CommandContext) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let regions = load_regions_json(&args.regions_json).await?;
    info!(
        "Loaded {} regions from {}",
        regions.len(),
        args.regions_json.display()
    );

    let client = GeoportalClient::with_config(ctx.client_config(args.timeout))?;
    let options = Meta4Options {
        debug: args.debug,
        concurrency: args
            .concurrency
            .unwrap_or(ctx.config.client.fetch_concurrency),
    };
    let output: PathBuf = args
        .output
        .unwrap_or_else(|| ctx.config.output.tiles_path.clone());
    let format: OutputFormat = args.format.unwrap_or(ctx.config.output.format);

    let spinner = ctx.spinner(format!("Fetching manifests for {} regions...", regions.len()));
    let result = collect_tile_files(&regions, &client, &options).await;
    spinner.finish_and_clear();
    let (files, stats) = result?;

    write_records(&files, &output, format).await?;
    ctx.say(format!(
        "✅ Wrote {} tile files to {}\n{}",
        files.len(),
        output.display(),
        format_stats(&stats)
    ));
    Ok(())
}

/// Handle the check-url command
///
/// Fails when the URL is not reachable so scripts can rely on the exit code.
pub async fn handle_check_url(args: CheckUrlArgs, ctx: &CommandContext) -> Result<()> {
    super::args::validate_overrides(args.timeout, None).map_err(AppError::generic)?;

    let client = GeoportalClient::with_config(ctx.client_config(args.timeout))?;
    if client.url_exists(&args.url).await {
        ctx.say(format!("✅ {} is reachable", args.url));
        Ok(())
    } else {
        Err(AppError::generic(format!("{} is not reachable", args.url)))
    }
}

/// Handle the init-config command
pub async fn handle_init_config(args: InitConfigArgs, ctx: &CommandContext) -> Result<()> {
    let path = args
        .path
        .or_else(AppConfig::default_config_path)
        .ok_or_else(|| {
            AppError::generic("No user configuration directory, pass --path instead")
        })?;

    AppConfig::write_default(&path, args.force).await?;
    ctx.say(format!("✅ Wrote default configuration to {}", path.display()));
    Ok(())
}

fn format_summary(summary: &PipelineSummary) -> String {
    format!(
        "✅ Wrote {} regions to {}\n✅ Wrote {} tile files to {}\n{}",
        summary.region_count,
        summary.regions_output.display(),
        summary.tile_count,
        summary.tiles_output.display(),
        format_stats(&summary.manifest_stats)
    )
}

fn format_stats(stats: &Meta4Stats) -> String {
    format!(
        "   {} manifests parsed, {} regions without manifest, {} duplicates, {} incomplete entries",
        stats.regions_processed,
        stats.regions_skipped,
        stats.duplicates_skipped,
        stats.incomplete_dropped
    )
}
