use std::fs;
use std::path::{Path, PathBuf};

use crate::cover::{COVER_CANDIDATES, THUMBNAIL_NAME};

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Remove the generated thumbnail and every cover image so the XMB does not
/// list them as stray pictures. Each file is handled on its own; a failed
/// delete is reported and the rest still go.
pub fn cleanup_directory(dir: &Path) -> CleanupReport {
    println!();
    println!("Cleaning up temporary files for PSP compatibility...");

    let mut report = CleanupReport::default();

    for name in std::iter::once(THUMBNAIL_NAME).chain(COVER_CANDIDATES) {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                println!("✓ Removed: {}", name);
                report.removed.push(path);
            }
            Err(e) => {
                eprintln!("✗ Failed to remove {}: {}", name, e);
                tracing::warn!(path = %path.display(), error = %e, "cleanup failed");
                report.failed.push((path, e.to_string()));
            }
        }
    }

    if report.removed.is_empty() {
        println!("✓ No temporary files to clean up");
    } else {
        println!("✓ Cleaned up {} temporary file(s)", report.removed.len());
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_thumbnail_and_covers_only() {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            "thumbnail.jpg",
            "cover.jpg",
            "Cover.png",
            "COVER.gif",
            "a.mp4",
            "a.THM",
            "poster.jpg",
        ];
        for name in files {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let report = cleanup_directory(dir.path());

        assert_eq!(report.removed.len(), 4);
        assert!(report.failed.is_empty());

        let mut left: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["a.THM", "a.mp4", "poster.jpg"]);
    }

    #[test]
    fn test_nothing_to_clean() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), b"x").unwrap();

        let report = cleanup_directory(dir.path());

        assert!(report.removed.is_empty());
        assert!(report.failed.is_empty());
        assert!(dir.path().join("a.mp4").exists());
    }
}
