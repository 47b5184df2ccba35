//! Async streaming loader for hierarchical point clouds.
//!
//! Opens COPC files and EPT directory trees, resolves their octree
//! hierarchy down to a requested depth, then fetches and decodes the
//! selected tiles with a bounded worker pool. Decoded tiles are either
//! streamed to a [`TileSink`] as they finish or merged into a single
//! [`MergedCloud`].
//!
//! ```no_run
//! # async fn demo() -> Result<(), pcstream::Error> {
//! use pcstream::{Client, HttpFetcher, LoadOptions};
//!
//! let client = Client::new(HttpFetcher::new());
//! let dataset = client.open("https://example.com/autzen.copc.laz").await?;
//! let loaded = client.load(&dataset, &LoadOptions::default().with_depth(2)).await?;
//! println!("{} points", loaded.cloud.len());
//! # Ok(())
//! # }
//! ```

mod error;

pub mod cache;
pub mod client;
pub mod copc;
pub mod dataset;
pub mod decompress;
pub mod ept;
pub mod fetch;
pub mod hierarchy;
pub mod options;
pub mod pipeline;
pub mod scheduler;

pub use cache::{Cache, MemoryCache, NoCache};
pub use client::{Client, LoadReport, LoadedCloud, StreamedTile, TileFailure, TileSink};
pub use dataset::{DataType, Dataset, DatasetDialect, RecordLayout};
pub use decompress::{ChunkInfo, Decompress, LazDecompressor};
pub use error::{Error, Result};
pub use fetch::{ByteRange, Fetch, HttpFetcher, MemoryStore};
pub use hierarchy::{
    Hierarchy, HierarchyEntry, PageLoader, PageRef, SelectedTile, TileEntry, resolve,
};
pub use options::LoadOptions;
pub use pipeline::TileOutcome;
pub use scheduler::CancelToken;

pub use pcstream_decode::{
    BoundingSphere, Bounds, ElevationReference, MergedCloud, NodeKey, TileBuffers,
};
