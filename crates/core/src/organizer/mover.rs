//! Moving a file, with a copy fallback across filesystems.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

use super::error::OrganizeError;

const BUFFER_SIZE: usize = 64 * 1024;

/// Attempts to move a file atomically (rename).
///
/// Returns `Ok(false)` when source and destination are on different
/// filesystems.
async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, OrganizeError> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(true),
        // EXDEV is 18 on Linux.
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) => {
            Ok(false)
        }
        Err(e) => Err(OrganizeError::MoveFailed {
            from: source.to_path_buf(),
            to: destination.to_path_buf(),
            error: e,
        }),
    }
}

/// Copies `source` to `destination`, returning the SHA-256 of the bytes
/// written when `hash` is set.
async fn copy_file(
    source: &Path,
    destination: &Path,
    hash: bool,
) -> Result<Option<String>, OrganizeError> {
    let source_file = File::open(source)
        .await
        .map_err(|e| OrganizeError::copy_failed(source, destination, e))?;
    let dest_file = File::create(destination)
        .await
        .map_err(|e| OrganizeError::copy_failed(source, destination, e))?;

    let mut reader = BufReader::with_capacity(BUFFER_SIZE, source_file);
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, dest_file);
    let mut hasher = hash.then(Sha256::new);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .await
            .map_err(|e| OrganizeError::copy_failed(source, destination, e))?;
        if bytes_read == 0 {
            break;
        }
        if let Some(ref mut h) = hasher {
            h.update(&buffer[..bytes_read]);
        }
        writer
            .write_all(&buffer[..bytes_read])
            .await
            .map_err(|e| OrganizeError::copy_failed(source, destination, e))?;
    }

    writer
        .flush()
        .await
        .map_err(|e| OrganizeError::copy_failed(source, destination, e))?;

    Ok(hasher.map(|h| format!("{:x}", h.finalize())))
}

/// SHA-256 of a file's contents.
pub(crate) async fn sha256_file(path: &Path) -> Result<String, OrganizeError> {
    let file = File::open(path).await?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut hasher = Sha256::new();
    loop {
        let bytes_read = reader.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Moves `source` to `destination`, replacing any existing file.
///
/// Tries a rename first. Across filesystems the file is copied, optionally
/// verified by checksum, and the source removed. A failed copy removes the
/// partial destination and leaves the source untouched.
pub(crate) async fn move_file(
    source: &Path,
    destination: &Path,
    verify: bool,
) -> Result<(), OrganizeError> {
    if !fs::try_exists(source).await.unwrap_or(false) {
        return Err(OrganizeError::SourceNotFound {
            path: source.to_path_buf(),
        });
    }

    if try_atomic_move(source, destination).await? {
        return Ok(());
    }

    tracing::debug!(
        from = %source.display(),
        to = %destination.display(),
        "Cross-device move, copying"
    );

    let copied = match copy_file(source, destination, verify).await {
        Ok(checksum) => checksum,
        Err(e) => {
            let _ = fs::remove_file(destination).await;
            return Err(e);
        }
    };

    if let Some(expected) = copied {
        let actual = sha256_file(destination).await?;
        if actual != expected {
            let _ = fs::remove_file(destination).await;
            return Err(OrganizeError::ChecksumMismatch {
                path: destination.to_path_buf(),
                expected,
                actual,
            });
        }
    }

    if let Err(e) = fs::remove_file(source).await {
        tracing::warn!(
            "Failed to remove source file {} after copy: {}",
            source.display(),
            e
        );
    }
    Ok(())
}
