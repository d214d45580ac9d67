use std::path::Path;

use tracing::info;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Poster must be a JPG, PNG or WebP image.")]
    BadExtension,
    #[error("Poster is too large (max {max_bytes} bytes).")]
    TooLarge { max_bytes: usize },
    #[error("could not store poster: {0}")]
    Io(#[from] std::io::Error),
}

/// Lowercased extension of `file_name` if it is an accepted image type.
pub fn image_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Writes the poster to `<dir>/<slug>-<now>.<ext>` and returns its public
/// path under `/uploads`.
pub async fn store_poster(
    dir: &Path,
    slug: &str,
    file_name: &str,
    bytes: &[u8],
    now: i64,
    max_bytes: usize,
) -> Result<String, UploadError> {
    let ext = image_extension(file_name).ok_or(UploadError::BadExtension)?;
    if bytes.len() > max_bytes {
        return Err(UploadError::TooLarge { max_bytes });
    }

    let stem = if slug.is_empty() { "poster" } else { slug };
    let stored = format!("{stem}-{now}.{ext}");

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&stored), bytes).await?;

    info!(file = %stored, size = bytes.len(), "poster stored");
    Ok(format!("/uploads/{stored}"))
}
