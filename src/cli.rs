use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the videos in a folder
    List {
        /// Folder to scan
        #[arg(short, long)]
        folder: PathBuf,
    },

    /// Join videos, in the given order, into one file
    Merge {
        /// Folder containing the videos
        #[arg(short, long)]
        folder: PathBuf,

        /// Output directory (default: <folder>/merged_output)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Video file names, at least two
        #[arg(required = true, num_args = 2..)]
        videos: Vec<String>,
    },

    /// Cut a window out of one video
    Trim {
        /// Folder containing the video
        #[arg(short, long)]
        folder: PathBuf,

        /// Output directory (default: <folder>/trimmed_output)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Start offset in seconds
        #[arg(long)]
        start: Option<f64>,

        /// Length of the window in seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Video file name
        video: String,
    },

    /// Speed up each video by 2x, 4x or 8x
    Speedup {
        /// Folder containing the videos
        #[arg(short, long)]
        folder: PathBuf,

        /// Output directory (default: <folder>/speedup_output)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Speed factor (2, 4 or 8)
        #[arg(short = 'x', long, default_value = "2")]
        factor: i64,

        /// Video file names
        #[arg(required = true)]
        videos: Vec<String>,
    },

    /// Turn each video into a timelapse
    Timelapse {
        /// Folder containing the videos
        #[arg(short, long)]
        folder: PathBuf,

        /// Output directory (default: <folder>/timelapse_output)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Target frame rate (default from config)
        #[arg(long)]
        fps: Option<i64>,

        /// Video file names
        #[arg(required = true)]
        videos: Vec<String>,
    },

    /// Run a JSON request (file path, or "-" for stdin)
    Run {
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Check that ffmpeg is available
    Check,

    /// Write the default configuration to a file
    InitConfig {
        #[arg(short, long, default_value = "clipbatch.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
