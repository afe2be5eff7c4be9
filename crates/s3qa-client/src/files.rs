//! Test data files.

use std::path::Path;

use rand::RngCore;
use s3qa_core::Result;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const MIB: usize = 1024 * 1024;

/// Write `size_mb` MiB of random bytes to `path`, creating parent
/// directories. An existing file is truncated.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written.
pub async fn create_file(path: &Path, size_mb: u64) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::File::create(path).await?;
    let mut chunk = vec![0u8; MIB];
    for _ in 0..size_mb {
        rand::thread_rng().fill_bytes(&mut chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    debug!(path = %path.display(), size_mb, "Created test file");
    Ok(())
}
