use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod demo;
mod info;
mod verify;

mod config;
mod profile;

pub use profile::Profile;

/// mergepart - sorted-merge part writer
#[derive(Parser)]
#[command(name = "mergepart")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Writer profile for trading speed against compression.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ProfileArg {
    /// Prioritize speed over compression
    Fast,
    /// Balance between speed and compression
    #[default]
    Balanced,
    /// Maximum compression, slower writes
    MaxCompression,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Fast => Profile::Fast,
            ProfileArg::Balanced => Profile::Balanced,
            ProfileArg::MaxCompression => Profile::MaxCompression,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a deterministic demo part
    Demo {
        /// Output part directory
        #[arg(value_name = "OUTPUT", default_value = "demo_part")]
        output: PathBuf,

        /// Number of rows to generate
        #[arg(short = 'n', long, default_value = "100000")]
        rows: usize,

        /// Writer profile (fast, balanced, max-compression)
        #[arg(short = 'p', long, default_value = "balanced", value_enum)]
        profile: ProfileArg,

        /// Load writer settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Write an unsorted part (no primary index)
        #[arg(long)]
        unsorted: bool,

        // === Advanced tuning flags (hidden from --help) ===
        /// Rows per batch handed to the writer
        #[arg(short = 'b', long, hide = true)]
        batch_size: Option<usize>,

        /// Rows per granule
        #[arg(short = 'g', long, hide = true)]
        granularity: Option<usize>,
    },

    /// Display the columns and checksum manifest of a part
    Info {
        /// Part directory
        #[arg(value_name = "PART")]
        part: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recompute the size and hash of every file in a part's manifest
    Verify {
        /// Part directory
        #[arg(value_name = "PART")]
        part: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Demo {
            output,
            rows,
            profile,
            config,
            unsorted,
            batch_size,
            granularity,
        } => demo::run(demo::DemoOptions {
            output,
            rows,
            profile: Profile::from(profile),
            config_path: config,
            unsorted,
            batch_size,
            granularity,
        }),
        Commands::Info { part, json } => info::run(part, json),
        Commands::Verify { part } => verify::run(part),
    }
}
