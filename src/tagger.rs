use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

use crate::filename::{TEMP_PREFIX, VIDEO_EXTENSION};
use crate::metadata::MetadataRecord;
use crate::transcoder::Transcoder;

/// Rewrite a video's container tags without re-encoding.
///
/// The remux goes to a temp file in the same directory, which is then
/// renamed over the original. On any error the temp file is removed and the
/// original is left as it was.
pub fn tag_video<T: Transcoder + ?Sized>(
    transcoder: &T,
    video: &Path,
    record: &MetadataRecord,
) -> Result<()> {
    let dir = video
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", video.display()))?;

    // Deleted on drop unless persisted
    let temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(&format!(".{}", VIDEO_EXTENSION))
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?
        .into_temp_path();

    // Remux into the temp file
    transcoder
        .remux_with_metadata(video, &temp, record)
        .with_context(|| format!("Failed to write metadata for {}", video.display()))?;

    // Keep the original's mode
    let permissions = fs::metadata(video)
        .with_context(|| format!("Failed to read permissions of {}", video.display()))?
        .permissions();
    fs::set_permissions(&temp, permissions)
        .with_context(|| format!("Failed to set permissions on {}", temp.display()))?;

    // Swap it in
    temp.persist(video)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", video.display()))?;

    tracing::debug!(video = %video.display(), tags = record.len(), "tagged");
    Ok(())
}
