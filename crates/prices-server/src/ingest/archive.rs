//! Archive extraction for uploaded price files
//!
//! # Supported Formats
//!
//! - **Zip** (`type=zip`, default): random access through the central directory
//! - **Tar** (`type=tar`): read sequentially, stops at the first CSV member
//!
//! Both variants hand the first member whose name ends in `.csv` to the row
//! parser and ignore everything else. An archive without a CSV member is an
//! empty batch, not an error. A container that cannot be decoded is.

use std::fmt;
use std::io::{self, Read, Seek};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use super::parser::{parse_rows, ParsedBatch};

/// Suffix a member name must end with to be picked up (case-sensitive).
pub const CSV_SUFFIX: &str = ".csv";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to read zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to read tar archive: {0}")]
    Tar(#[source] std::io::Error),

    #[error("Failed to read CSV member '{member}': {source}")]
    Member {
        member: String,
        #[source]
        source: std::io::Error,
    },
}

/// Container formats accepted by the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    #[default]
    Zip,
    Tar,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported archive type '{0}'. Use zip or tar")]
pub struct UnsupportedFormat(pub String);

impl FromStr for ArchiveFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar" => Ok(ArchiveFormat::Tar),
            other => Err(UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Zip => write!(f, "zip"),
            ArchiveFormat::Tar => write!(f, "tar"),
        }
    }
}

impl ArchiveFormat {
    /// The extractor that understands this container.
    pub fn extractor(self) -> &'static dyn ArchiveExtractor {
        match self {
            ArchiveFormat::Zip => &ZipExtractor,
            ArchiveFormat::Tar => &TarExtractor,
        }
    }
}

/// Byte source an extractor can read from.
pub trait ArchiveSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> ArchiveSource for T {}

/// Pulls the first CSV member out of one container format and parses it.
pub trait ArchiveExtractor: Send + Sync {
    fn format(&self) -> ArchiveFormat;

    fn extract(&self, source: &mut dyn ArchiveSource) -> Result<ParsedBatch, ExtractError>;
}

fn is_csv_member(name: &str) -> bool {
    name.ends_with(CSV_SUFFIX)
}

fn parse_member<R: Read>(member: String, reader: R) -> Result<ParsedBatch, ExtractError> {
    let batch = parse_rows(reader).map_err(|source| ExtractError::Member {
        member: member.clone(),
        source,
    })?;
    debug!(
        member = %member,
        accepted = batch.records.len(),
        rejected = batch.rejected.len(),
        "Parsed CSV member"
    );
    Ok(batch)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    fn extract(&self, source: &mut dyn ArchiveSource) -> Result<ParsedBatch, ExtractError> {
        let mut archive = zip::ZipArchive::new(source)?;

        for index in 0..archive.len() {
            // Headers only: skipped members are never decrypted or inflated
            let (name, is_dir) = {
                let raw = archive.by_index_raw(index)?;
                (raw.name().to_string(), raw.is_dir())
            };

            if is_dir || !is_csv_member(&name) {
                continue;
            }

            return parse_member(name, archive.by_index(index)?);
        }

        debug!(members = archive.len(), "No CSV member in zip archive");
        Ok(ParsedBatch::empty())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TarExtractor;

impl ArchiveExtractor for TarExtractor {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Tar
    }

    fn extract(&self, source: &mut dyn ArchiveSource) -> Result<ParsedBatch, ExtractError> {
        let mut archive = tar::Archive::new(source);

        for entry in archive.entries().map_err(ExtractError::Tar)? {
            let entry = entry.map_err(ExtractError::Tar)?;
            let name = entry
                .path()
                .map_err(ExtractError::Tar)?
                .to_string_lossy()
                .into_owned();

            if !is_csv_member(&name) {
                continue;
            }

            let expected = entry.size();
            return parse_member(name, SizedMember::new(entry, expected)).map_err(|err| match err {
                ExtractError::Member { source, .. }
                    if source.kind() == io::ErrorKind::UnexpectedEof =>
                {
                    ExtractError::Tar(source)
                },
                other => other,
            });
        }

        debug!("No CSV member in tar archive");
        Ok(ParsedBatch::empty())
    }
}

/// Tar entries end quietly when the archive is cut short; this turns a body
/// shorter than its header's size into `UnexpectedEof`.
struct SizedMember<R> {
    inner: R,
    expected: u64,
    read: u64,
}

impl<R: Read> SizedMember<R> {
    fn new(inner: R, expected: u64) -> Self {
        Self {
            inner,
            expected,
            read: 0,
        }
    }
}

impl<R: Read> Read for SizedMember<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;

        if n == 0 && !buf.is_empty() && self.read < self.expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "tar member truncated: {} of {} bytes present",
                    self.read, self.expected
                ),
            ));
        }

        Ok(n)
    }
}
