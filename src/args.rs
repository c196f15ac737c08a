use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContentType {
    Movie,
    Tv,
}

/// Add metadata and thumbnails to MP4 videos for PSP viewing.
///
/// Anything not given on the command line is asked for interactively.
#[derive(Debug, Parser)]
#[command(name = "psp_tagger", version)]
pub struct Args {
    /// Directory containing the MP4 files
    pub directory: Option<PathBuf>,

    /// Whether the directory holds movies or episodes of one TV show
    #[arg(short = 't', long = "type", value_enum)]
    pub content_type: Option<ContentType>,

    /// TV show name (implies --type tv)
    #[arg(short, long)]
    pub show: Option<String>,

    /// Path to the ffmpeg binary (default: search PATH)
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary, used by --verify (default: search PATH)
    #[arg(long, value_name = "PATH")]
    pub ffprobe: Option<PathBuf>,

    /// Read tags back with ffprobe after writing them
    #[arg(long)]
    pub verify: bool,

    /// More diagnostics on stderr (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Content type from the flags, if they settle it
    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
            .or_else(|| self.show.as_ref().map(|_| ContentType::Tv))
    }

    /// Default log filter when RUST_LOG is not set
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}
