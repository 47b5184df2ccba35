//! Tile-to-buffer pipeline: fetch, LFS check, decompress, decode.

use std::sync::Arc;

use pcstream_decode::{
    DecodeOptions, TileBuffers, decode_las_records, decode_schema_records, is_lfs_pointer,
};

use crate::dataset::{DataType, Dataset, RecordLayout};
use crate::decompress::{ChunkInfo, Decompress};
use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::hierarchy::SelectedTile;

/// What happened to one selected tile.
#[derive(Debug)]
pub enum TileOutcome {
    Decoded(TileBuffers),
    /// Decoded fine but no point survived decimation.
    Empty,
    /// The fetched bytes were a large-file-storage pointer, not tile data.
    LfsPlaceholder,
    Failed(Error),
    /// Never attempted because the load was cancelled.
    Skipped,
}

/// Everything a worker needs to turn a tile into buffers.
pub(crate) struct TileContext<F> {
    pub fetcher: Arc<F>,
    pub decompressor: Arc<dyn Decompress>,
    pub dataset: Arc<Dataset>,
    pub options: DecodeOptions,
}

impl<F> Clone for TileContext<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            decompressor: Arc::clone(&self.decompressor),
            dataset: Arc::clone(&self.dataset),
            options: self.options,
        }
    }
}

impl<F: Fetch> TileContext<F> {
    /// [`TileContext::process`] on its own task, so a panic while fetching
    /// or decoding fails this tile only.
    pub(crate) async fn process_isolated(&self, tile: SelectedTile) -> TileOutcome {
        let context = self.clone();
        match tokio::spawn(async move { context.process(tile).await }).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(key = %tile.key, %error, "tile task panicked");
                TileOutcome::Failed(Error::Worker(error.to_string()))
            }
        }
    }

    pub(crate) async fn process(&self, tile: SelectedTile) -> TileOutcome {
        let (locator, range) = self.dataset.tile_location(&tile.key, &tile.entry);
        let bytes = match self.fetcher.fetch(&locator, range).await {
            Ok(bytes) => bytes,
            Err(error) => return TileOutcome::Failed(error),
        };

        if is_lfs_pointer(&bytes) {
            tracing::warn!(key = %tile.key, %locator, "tile is a large-file-storage pointer");
            return TileOutcome::LfsPlaceholder;
        }

        let decompressor = Arc::clone(&self.decompressor);
        let dataset = Arc::clone(&self.dataset);
        let options = self.options;
        let decoded = tokio::task::spawn_blocking(move || {
            decode_tile(&dataset, decompressor.as_ref(), &options, &tile, &bytes)
        })
        .await;

        match decoded {
            Ok(Ok(buffers)) if buffers.is_empty() => TileOutcome::Empty,
            Ok(Ok(buffers)) => TileOutcome::Decoded(buffers),
            Ok(Err(error)) => TileOutcome::Failed(error),
            Err(error) => TileOutcome::Failed(Error::Worker(error.to_string())),
        }
    }
}

/// Decode fetched tile bytes according to the dataset's storage.
pub fn decode_tile(
    dataset: &Dataset,
    decompressor: &dyn Decompress,
    options: &DecodeOptions,
    tile: &SelectedTile,
    bytes: &[u8],
) -> Result<TileBuffers> {
    let buffers = match (dataset.data_type, &dataset.layout) {
        (DataType::LazChunk, RecordLayout::Las(layout)) => {
            let vlr = dataset.laz_vlr.as_deref().ok_or_else(|| {
                Error::InvalidDataset("compressed dataset without a laszip VLR".into())
            })?;
            let info = ChunkInfo {
                point_format: layout.point_format,
                record_length: layout.record_length,
                point_count: tile.entry.point_count,
            };
            let raw = decompressor.decompress_chunk(bytes, vlr, &info)?;
            decode_las_records(&raw, layout, options, dataset.bounds)?
        }
        (DataType::LazFile, _) => {
            let (layout, raw) = decompressor.decompress_file(bytes)?;
            decode_las_records(&raw, &layout, options, dataset.bounds)?
        }
        (DataType::Binary, RecordLayout::Schema(layout)) => {
            decode_schema_records(bytes, layout, options, dataset.bounds)?
        }
        (DataType::Binary, RecordLayout::Las(_)) => {
            return Err(Error::InvalidDataset("binary tiles need a schema record layout".into()));
        }
        (DataType::LazChunk, RecordLayout::Schema(_)) => {
            return Err(Error::InvalidDataset("LAZ chunks need a LAS record layout".into()));
        }
    };
    Ok(buffers)
}
