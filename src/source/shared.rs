//! Mutex-serialized access to a seekable file.

use std::io::SeekFrom;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{Mutex, MutexGuard};

use super::error::SourceError;

/// A seekable byte source whose every read and seek happens in a
/// critical section.
///
/// Index builds hold the guard returned by [`SharedSource::lock`] for a
/// whole scan; per-record reads go through [`SharedSource::read_at`],
/// which acquires the lock once per call. No two reads proceed
/// concurrently on the same handle.
#[derive(Debug)]
pub struct SharedSource {
    file: Mutex<File>,
}

impl SharedSource {
    /// Wraps a file for shared access.
    pub fn new(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }

    /// Acquires exclusive access to the underlying file.
    ///
    /// The returned guard keeps every other reader out until dropped.
    pub async fn lock(&self) -> MutexGuard<'_, File> {
        self.file.lock().await
    }

    /// Reads exactly `size` bytes at `offset` under a single lock
    /// acquisition.
    pub async fn read_at(&self, offset: i64, size: i32) -> Result<Bytes, SourceError> {
        let start = u64::try_from(offset)
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
        let len = usize::try_from(size)
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;

        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(start)).await?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}
