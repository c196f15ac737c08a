use clap::Parser;
use psp_tagger::args::Args;
use psp_tagger::processor::Processor;
use psp_tagger::prompt::{collect_inputs, Prompter};
use psp_tagger::transcoder::FfmpegTranscoder;
use std::io;
use tracing_subscriber::EnvFilter;

/// Conventional exit status for a process stopped by SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

fn main() {
    let args = Args::parse();
    init_logging(&args);

    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!();
        eprintln!("Operation cancelled by user.");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl+C handler");
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(args: &Args) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> anyhow::Result<()> {
    // Checked before any prompt so a missing ffmpeg fails fast
    let transcoder = match FfmpegTranscoder::discover(
        args.ffmpeg.as_deref(),
        args.ffprobe.as_deref(),
        args.verify,
    ) {
        Ok(t) => t,
        Err(e) => {
            if let Some(hint) = e.install_hint() {
                eprintln!("{}", hint);
            }
            return Err(e.into());
        }
    };

    println!("=== PSP Media Metadata Writer ===");
    println!("This tool will add metadata to your MP4 videos for optimal PSP viewing.");
    println!();

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());
    let (directory, content) = collect_inputs(&args, &mut prompter)?;

    let mut processor = Processor::new(transcoder, args.verify);
    processor.run(&directory, &content)?;

    println!();
    println!("Your videos are now ready for PSP viewing!");
    Ok(())
}
