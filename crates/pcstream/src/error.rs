use pcstream_decode::DecodeError;
use thiserror::Error;

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening or loading a point cloud.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("LAZ decompression failed: {0}")]
    Laz(#[from] laz::LasZipError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("byte range {offset}+{length} is outside `{locator}` ({available} bytes)")]
    RangeOutOfBounds {
        locator: String,
        offset: u64,
        length: u64,
        available: usize,
    },

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("unsupported compression `{0}`")]
    UnsupportedCompression(String),

    #[error("invalid hierarchy page: {0}")]
    InvalidHierarchy(String),

    #[error("decode worker failed: {0}")]
    Worker(String),

    #[error(
        "no tiles could be decoded ({failures} failed, \
         {lfs_placeholders} were large-file pointers){}",
        lfs_hint(.lfs_placeholders)
    )]
    NoTilesDecoded {
        failures: usize,
        lfs_placeholders: usize,
    },
}

fn lfs_hint(lfs_placeholders: &usize) -> &'static str {
    if *lfs_placeholders > 0 {
        "; the tiles were probably committed without their LFS content"
    } else {
        ""
    }
}

impl Error {
    /// Whether every tile turned out to be a large-file placeholder.
    #[must_use]
    pub fn is_lfs_placeholder(&self) -> bool {
        matches!(self, Self::NoTilesDecoded { lfs_placeholders, .. } if *lfs_placeholders > 0)
    }
}
