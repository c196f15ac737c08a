use std::fmt;
use std::path::{Path, PathBuf};

/// Pipeline step a video failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    Thumbnail,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Metadata => "metadata",
            Stage::Thumbnail => "thumbnail",
            Stage::Verify => "verify",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct FailedFile {
    pub path: PathBuf,
    pub stage: Stage,
    pub message: String,
}

/// Report a failed step for one video and return the record for the summary
pub fn record_failure(path: &Path, stage: Stage, error: &anyhow::Error) -> FailedFile {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    let action = match stage {
        Stage::Metadata => "add metadata to",
        Stage::Thumbnail => "create PSP thumbnail for",
        Stage::Verify => "verify metadata of",
    };

    let message = format!("{:#}", error);
    eprintln!("✗ Failed to {} {}: {}", action, name, message);
    tracing::warn!(path = %path.display(), %stage, error = %message, "video step failed");

    FailedFile {
        path: path.to_path_buf(),
        stage,
        message,
    }
}

/// Print the failure list shown under the summary
pub fn print_failures(failures: &[FailedFile]) {
    if failures.is_empty() {
        return;
    }

    println!();
    println!("=== FAILED FILES ===");
    for failure in failures {
        println!("[{}] {}", failure.stage, failure.path.display());
        println!("   → {}", failure.message);
    }
}
