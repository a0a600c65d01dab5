// cli.rs - Command-line front-end

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::{parse_lead_in, parse_volume, Options};
use crate::logging::LogLevel;

/// punkboot - synchronized retro-BIOS boot sequence playback
#[derive(Parser, Debug, Default)]
#[command(name = "punkboot")]
#[command(version = "0.1.0")]
#[command(about = "Plays the retro BIOS boot sequence in a terminal", long_about = None)]
pub struct Cli {
    /// Master volume (0-100)
    #[arg(short, long, value_name = "VOLUME")]
    pub volume: Option<String>,

    /// Disable all audio output
    #[arg(short, long)]
    pub mute: bool,

    /// Directory containing startup/run/shutdown/work audio assets
    #[arg(short, long, value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Power-on lead-in override in seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub leadin: Option<String>,

    /// Log verbosity (none, error, warn, info, debug)
    #[arg(long, value_name = "LEVEL")]
    pub loglevel: Option<String>,
}

impl Cli {
    /// Merge CLI arguments into the options struct.
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        if let Some(ref vol) = self.volume {
            let int_vol: i32 = vol.parse().context("Invalid volume")?;
            opts.master_volume = parse_volume(int_vol);
        }

        if self.mute {
            opts.muted = true;
        }

        if let Some(ref dir) = self.assets {
            opts.asset_dir = Some(dir.clone());
        }

        if let Some(ref leadin) = self.leadin {
            opts.lead_in = parse_lead_in(leadin)?;
        }

        Ok(opts)
    }

    /// Requested log level; defaults to info.
    pub fn log_level(&self) -> Result<LogLevel> {
        match &self.loglevel {
            Some(level) => LogLevel::parse(level),
            None => Ok(LogLevel::Info),
        }
    }
}
