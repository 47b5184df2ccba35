//! Decode point records from hierarchical point-cloud tiles.
//!
//! This crate provides pure synchronous decoding for the two archive
//! families the `pcstream` loader understands: LAS-style fixed records
//! (COPC chunks and EPT `laszip` tiles after decompression) and EPT
//! schema-described binary records. Nothing here performs I/O; the loader
//! owns fetching, decompression and parallelism.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **User-controlled parallelism**: Client decides how to parallelize
//! - **Typed output**: every decoded tile is a set of parallel arrays
//!
//! # Key functions
//!
//! - [`decode_las_records`]: Decode fixed-layout LAS point records
//! - [`decode_schema_records`]: Decode EPT schema-described records
//! - [`ElevationReference::from_z`]: Percentile elevation range of a tile
//! - [`merge_tiles`]: Concatenate decoded tiles into one cloud
//! - [`is_lfs_pointer`]: Detect large-file-storage placeholder blobs

mod bytes;
mod error;

pub mod bounds;
pub mod buffers;
pub mod decimate;
pub mod elevation;
pub mod header;
pub mod key;
pub mod las;
pub mod lfs;
pub mod merge;
pub mod schema;

pub use bounds::{BoundingSphere, Bounds};
pub use buffers::{DecodeOptions, TileBuffers};
pub use decimate::Stride;
pub use elevation::ElevationReference;
pub use error::{DecodeError, DecodeResult};
pub use header::{LasHeader, Vlr, read_vlrs};
pub use key::{KeyDialect, NodeKey};
pub use las::{LasLayout, decode_las_records};
pub use lfs::is_lfs_pointer;
pub use merge::{MergedCloud, merge_tiles};
pub use schema::{Dimension, DimensionType, Field, SchemaLayout, decode_schema_records};

/// Maximum level-of-detail depth a caller may request.
pub const MAX_DEPTH: u8 = 8;

/// Largest decimation stride accepted.
pub const MAX_STRIDE: u32 = 100;

/// Fetched buffers at or below this length are checked for LFS pointers.
pub const LFS_POINTER_LIMIT: usize = 150;
