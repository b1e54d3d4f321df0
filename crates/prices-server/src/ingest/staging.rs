//! Request-scoped spooling of uploaded archives
//!
//! Uploads are written chunk by chunk to an anonymous temporary file so that
//! neither the ZIP nor the TAR path needs the whole archive in memory. The
//! file has no directory entry; the OS reclaims it as soon as the handle is
//! dropped, whichever way the request ends.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};

use tokio::io::AsyncWriteExt;

/// Open spool an upload is being written into.
pub struct UploadSpool {
    file: tokio::fs::File,
    size: u64,
}

impl UploadSpool {
    pub async fn create() -> io::Result<Self> {
        let file = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(io::Error::other)??;

        Ok(Self {
            file: tokio::fs::File::from_std(file),
            size: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Flush and rewind; the result is ready to be read from the start.
    pub async fn finish(mut self) -> io::Result<StagedUpload> {
        self.file.flush().await?;
        let mut file = self.file.into_std().await;
        file.seek(SeekFrom::Start(0))?;

        tracing::debug!(size = self.size, "Upload staged to temporary file");

        Ok(StagedUpload {
            file,
            size: self.size,
        })
    }
}

/// A fully written upload, positioned at its first byte.
#[derive(Debug)]
pub struct StagedUpload {
    file: File,
    size: u64,
}

impl StagedUpload {
    /// Stage an in-memory archive.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut file = tempfile::tempfile()?;
        file.write_all(bytes)?;
        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            file,
            size: bytes.len() as u64,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn into_file(self) -> File {
        self.file
    }
}
