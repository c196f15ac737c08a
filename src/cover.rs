use std::path::{Path, PathBuf};

use crate::transcoder::Transcoder;

/// Cover image names checked in order; the first one present wins
#[rustfmt::skip]
pub const COVER_CANDIDATES: [&str; 15] = [
    "cover.jpg", "cover.jpeg", "cover.png", "cover.bmp", "cover.gif",
    "Cover.jpg", "Cover.jpeg", "Cover.png", "Cover.bmp", "Cover.gif",
    "COVER.jpg", "COVER.jpeg", "COVER.png", "COVER.bmp", "COVER.gif",
];

/// Generated once per run and removed by cleanup
pub const THUMBNAIL_NAME: &str = "thumbnail.jpg";

/// PSP thumbnail size
pub const THUMBNAIL_WIDTH: u32 = 160;
pub const THUMBNAIL_HEIGHT: u32 = 120;

/// Find the cover image in a directory
pub fn find_cover(dir: &Path) -> Option<PathBuf> {
    COVER_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Turn the directory's cover into a PSP-sized thumbnail.
///
/// Returns `None` if there is no cover or the transcoder could not convert
/// it. Neither case is fatal: videos are still tagged, just without a
/// sidecar thumbnail.
pub fn generate_thumbnail<T: Transcoder + ?Sized>(transcoder: &T, dir: &Path) -> Option<PathBuf> {
    let Some(cover) = find_cover(dir) else {
        println!("No cover image found");
        return None;
    };

    let cover_name = cover.file_name().unwrap_or_default().to_string_lossy();
    println!("✓ Found cover image: {}", cover_name);

    let thumbnail = dir.join(THUMBNAIL_NAME);
    match transcoder.scale_image(&cover, &thumbnail, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT) {
        Ok(()) if thumbnail.is_file() => {
            println!("✓ Cover image converted to PSP thumbnail");
            Some(thumbnail)
        }
        Ok(()) => {
            eprintln!("✗ Failed to convert cover image: no thumbnail was written");
            None
        }
        Err(e) => {
            tracing::warn!(cover = %cover.display(), error = %e, "thumbnail conversion failed");
            eprintln!("✗ Failed to convert cover image: {}", e);
            None
        }
    }
}
