//! Upload ingestion pipeline
//!
//! ```text
//! multipart body ──► staging ──► archive (zip | tar) ──► parser ──► ParsedBatch
//! ```
//!
//! - [`staging`]: spools the upload to a temporary file
//! - [`archive`]: finds the first `.csv` member of the container
//! - [`parser`]: validates rows one by one, dropping the bad ones
//!
//! Persisting the batch is the job of [`crate::db::prices`].

pub mod archive;
pub mod parser;
pub mod staging;

pub use archive::{ArchiveExtractor, ArchiveFormat, ExtractError, UnsupportedFormat};
pub use parser::{parse_rows, ParsedBatch, RowRejection, RowValidation};
pub use staging::{StagedUpload, UploadSpool};
