//! # mergepart
//!
//! Command-line front end for writing and checking data parts.
//!
//! ## Usage
//!
//! ```bash
//! # Write a demo part
//! mergepart demo demo_part --rows 100000 --granularity 8192
//!
//! # Show its columns and manifest
//! mergepart info demo_part --json
//!
//! # Recompute every checksum
//! mergepart verify demo_part
//! ```

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
