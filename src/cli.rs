use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Filters: nearest, bilinear, bicubic, lanczos (A=2|3)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Spherical video projection probe
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Write log output to a file instead of stderr
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the frame-pack layout and packed raster size of a geometry
    Layout {
        /// Geometry configuration (JSON)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Map sphere sample points into a geometry
    Points {
        /// Geometry configuration (JSON)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Sample point list (count line, then `lon lat` pairs in degrees)
        #[arg(value_name = "POINTS")]
        points: PathBuf,

        /// Print at most N points
        #[arg(short = 'n', long = "limit", value_name = "N")]
        limit: Option<usize>,
    },
}
