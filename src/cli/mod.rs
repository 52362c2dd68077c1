//! Command-line interface components
//!
//! This module contains CLI-specific code for the Bavarian LIDAR fetcher:
//! argument parsing and the command handlers.

pub mod args;
pub mod commands;

pub use args::{
    CheckUrlArgs, Cli, Commands, GlobalArgs, InitConfigArgs, RegionsArgs, RunArgs, SourceArgs,
    TilesArgs,
};
pub use commands::{
    handle_check_url, handle_init_config, handle_regions, handle_run, handle_tiles,
    CommandContext,
};
