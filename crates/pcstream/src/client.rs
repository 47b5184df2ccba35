//! Point-cloud client: open datasets, resolve hierarchies and load tiles.

use std::sync::Arc;

use pcstream_decode::header::LAS14_HEADER_SIZE;
use pcstream_decode::{
    ElevationReference, LasHeader, MergedCloud, NodeKey, TileBuffers, merge_tiles,
};

use crate::cache::{Cache, NoCache, cache_key};
use crate::dataset::{Dataset, DatasetDialect, join, parent};
use crate::decompress::{Decompress, LazDecompressor};
use crate::error::{Error, Result};
use crate::fetch::{ByteRange, Fetch};
use crate::hierarchy::{Hierarchy, HierarchyEntry, PageLoader, PageRef, SelectedTile, resolve};
use crate::options::LoadOptions;
use crate::pipeline::{TileContext, TileOutcome};
use crate::scheduler::{CancelToken, run_pool};
use crate::{copc, ept};

/// Client for COPC and EPT point clouds.
///
/// Generic over the fetch capability and a cache for manifests and
/// hierarchy pages. Tiles are never cached.
pub struct Client<F, C = NoCache> {
    fetcher: Arc<F>,
    cache: C,
    decompressor: Arc<dyn Decompress>,
}

impl<F: Fetch> Client<F, NoCache> {
    /// Create a client without caching.
    #[must_use]
    pub fn new(fetcher: F) -> Self {
        Self::with_cache(fetcher, NoCache)
    }
}

impl<F: Fetch, C: Cache> Client<F, C> {
    /// Create a client with the given metadata cache.
    #[must_use]
    pub fn with_cache(fetcher: F, cache: C) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            cache,
            decompressor: Arc::new(LazDecompressor),
        }
    }

    /// Replace the LAZ decompressor.
    #[must_use]
    pub fn with_decompressor(mut self, decompressor: impl Decompress + 'static) -> Self {
        self.decompressor = Arc::new(decompressor);
        self
    }

    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    #[must_use]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    async fn fetch_cached(&self, locator: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        let key = cache_key(locator, range);
        if let Some(bytes) = self.cache.get(&key) {
            tracing::trace!(%key, "cache hit");
            return Ok(bytes);
        }
        let bytes = self.fetcher.fetch(locator, range).await?;
        self.cache.insert(&key, &bytes);
        Ok(bytes)
    }

    /// Open a dataset.
    ///
    /// Locators ending in `.laz` or `.las` are read as COPC files. Anything
    /// else is an EPT tree: either the `ept.json` manifest itself or the
    /// directory holding it.
    pub async fn open(&self, locator: &str) -> Result<Arc<Dataset>> {
        let lower = locator.to_ascii_lowercase();
        let dataset = if lower.ends_with(".laz") || lower.ends_with(".las") {
            self.open_copc(locator).await?
        } else {
            let (base, manifest) = if lower.ends_with("ept.json") {
                (parent(locator).to_string(), locator.to_string())
            } else {
                (locator.trim_end_matches('/').to_string(), join(locator, "ept.json"))
            };
            let bytes = self.fetch_cached(&manifest, None).await?;
            ept::dataset_from_manifest(&base, &bytes)?
        };

        tracing::info!(
            locator,
            dialect = ?dataset.dialect,
            points = dataset.point_count,
            spacing = dataset.spacing,
            "opened dataset"
        );
        Ok(Arc::new(dataset))
    }

    async fn open_copc(&self, locator: &str) -> Result<Dataset> {
        let head = self
            .fetch_cached(locator, Some(ByteRange::new(0, LAS14_HEADER_SIZE as u64)))
            .await?;
        let header = LasHeader::parse(&head)?;
        // Header and VLRs together end where the point data starts.
        let preamble = u64::from(header.offset_to_point_data);
        let bytes = self.fetch_cached(locator, Some(ByteRange::new(0, preamble))).await?;
        copc::dataset_from_header(locator, &bytes)
    }

    /// Resolve the dataset's hierarchy down to `depth`.
    pub async fn resolve(&self, dataset: &Dataset, depth: u8) -> Result<Hierarchy> {
        let pages = Pages { client: self, dataset };
        resolve(&pages, dataset.hierarchy_root, depth).await
    }

    /// Load tiles, handing each decoded tile to `sink` as soon as it is ready.
    ///
    /// The root tile is loaded before any other and sets the elevation
    /// reference every streamed tile carries. The remaining tiles arrive in
    /// completion order.
    pub async fn stream<S: TileSink>(
        &self,
        dataset: &Arc<Dataset>,
        options: &LoadOptions,
        sink: S,
    ) -> Result<LoadReport> {
        self.stream_with_cancel(dataset, options, sink, &CancelToken::new())
            .await
    }

    /// [`Client::stream`] with a cancellation token.
    ///
    /// A cancelled load still returns its report; tiles never attempted are
    /// counted as skipped.
    pub async fn stream_with_cancel<S: TileSink>(
        &self,
        dataset: &Arc<Dataset>,
        options: &LoadOptions,
        mut sink: S,
        cancel: &CancelToken,
    ) -> Result<LoadReport> {
        let options = options.clone().normalized();
        let hierarchy = self.resolve(dataset, options.depth).await?;
        let mut tiles = hierarchy.select();

        tracing::info!(
            tiles = tiles.len(),
            depth = options.depth,
            stride = options.stride,
            concurrency = options.concurrency,
            "loading tiles"
        );

        let context = TileContext {
            fetcher: Arc::clone(&self.fetcher),
            decompressor: Arc::clone(&self.decompressor),
            dataset: Arc::clone(dataset),
            options: options.decode_options(),
        };
        let mut report = LoadReport::new(tiles.len());
        let fallback = ElevationReference::from_extent(dataset.bounds.min.z, dataset.bounds.max.z);

        let root = tiles.first().filter(|t| t.key.is_root()).copied();
        let elevation = match root {
            Some(root) if !cancel.is_cancelled() => {
                tiles.remove(0);
                let outcome = context.process_isolated(root).await;
                let elevation = match &outcome {
                    TileOutcome::Decoded(buffers) => ElevationReference::from_z(buffers.z_values()),
                    _ => fallback,
                };
                let mut dispatch = Dispatch::new(&mut sink, &mut report, dataset, elevation);
                dispatch.accept(root, outcome);
                elevation
            }
            _ => fallback,
        };

        {
            let mut dispatch = Dispatch::new(&mut sink, &mut report, dataset, elevation);
            let work = move |tile: SelectedTile| {
                let context = context.clone();
                async move { context.process_isolated(tile).await }
            };
            run_pool(tiles, options.concurrency, cancel, work, |tile, outcome| {
                dispatch.accept(tile, outcome.unwrap_or(TileOutcome::Skipped));
            })
            .await;
        }

        tracing::info!(
            decoded = report.decoded,
            empty = report.empty,
            failed = report.failures.len(),
            lfs_placeholders = report.lfs_placeholders,
            skipped = report.skipped,
            points = report.points,
            "load finished"
        );

        if report.decoded == 0 && !cancel.is_cancelled() {
            return Err(Error::NoTilesDecoded {
                failures: report.failures.len(),
                lfs_placeholders: report.lfs_placeholders,
            });
        }
        Ok(report)
    }

    /// Load every selected tile and merge them into one cloud.
    pub async fn load(&self, dataset: &Arc<Dataset>, options: &LoadOptions) -> Result<LoadedCloud> {
        let mut tiles: Vec<TileBuffers> = Vec::new();
        let mut elevation = None;
        let report = self
            .stream(dataset, options, |tile: StreamedTile| {
                if elevation.is_none() {
                    elevation = Some(tile.elevation);
                }
                tiles.push(tile.buffers);
            })
            .await?;

        let cloud = merge_tiles(&tiles).ok_or(Error::NoTilesDecoded {
            failures: report.failures.len(),
            lfs_placeholders: report.lfs_placeholders,
        })?;
        let elevation = elevation.unwrap_or_else(|| {
            ElevationReference::from_extent(dataset.bounds.min.z, dataset.bounds.max.z)
        });

        Ok(LoadedCloud {
            cloud,
            elevation,
            report,
        })
    }
}

/// Receives tiles as they finish loading.
pub trait TileSink {
    fn on_tile(&mut self, tile: StreamedTile);

    /// Called for each tile that failed. Failures are also collected in the
    /// [`LoadReport`].
    fn on_failure(&mut self, failure: &TileFailure) {
        let _ = failure;
    }
}

impl<T: FnMut(StreamedTile)> TileSink for T {
    fn on_tile(&mut self, tile: StreamedTile) {
        self(tile);
    }
}

/// One decoded tile handed to a [`TileSink`].
#[derive(Debug, Clone)]
pub struct StreamedTile {
    pub key: NodeKey,
    pub buffers: TileBuffers,
    /// Number of tiles selected for this load.
    pub total_tiles: usize,
    /// Elevation reference taken from the root tile.
    pub elevation: ElevationReference,
    /// Nominal point spacing at this tile's depth.
    pub spacing: f64,
}

/// A tile that could not be loaded.
#[derive(Debug)]
pub struct TileFailure {
    pub key: NodeKey,
    pub error: Error,
}

/// Summary of a load.
#[derive(Debug)]
pub struct LoadReport {
    /// Tiles chosen from the hierarchy.
    pub selected: usize,
    /// Tiles decoded with at least one point.
    pub decoded: usize,
    /// Tiles that decoded to zero points.
    pub empty: usize,
    /// Tiles whose bytes were large-file-storage pointers.
    pub lfs_placeholders: usize,
    /// Tiles never attempted because the load was cancelled.
    pub skipped: usize,
    /// Points across all decoded tiles.
    pub points: usize,
    pub failures: Vec<TileFailure>,
}

impl LoadReport {
    fn new(selected: usize) -> Self {
        Self {
            selected,
            decoded: 0,
            empty: 0,
            lfs_placeholders: 0,
            skipped: 0,
            points: 0,
            failures: Vec::new(),
        }
    }
}

/// Result of a batch load.
#[derive(Debug)]
pub struct LoadedCloud {
    pub cloud: MergedCloud,
    pub elevation: ElevationReference,
    pub report: LoadReport,
}

/// Routes tile outcomes to the sink and the report.
struct Dispatch<'a, S> {
    sink: &'a mut S,
    report: &'a mut LoadReport,
    dataset: &'a Dataset,
    elevation: ElevationReference,
}

impl<'a, S: TileSink> Dispatch<'a, S> {
    fn new(
        sink: &'a mut S,
        report: &'a mut LoadReport,
        dataset: &'a Dataset,
        elevation: ElevationReference,
    ) -> Self {
        Self {
            sink,
            report,
            dataset,
            elevation,
        }
    }

    fn accept(&mut self, tile: SelectedTile, outcome: TileOutcome) {
        match outcome {
            TileOutcome::Decoded(buffers) => {
                self.report.decoded += 1;
                self.report.points += buffers.len();
                tracing::debug!(key = %tile.key, points = buffers.len(), "tile decoded");
                self.sink.on_tile(StreamedTile {
                    key: tile.key,
                    buffers,
                    total_tiles: self.report.selected,
                    elevation: self.elevation,
                    spacing: self.dataset.spacing / f64::from(1u32 << tile.key.depth.min(31)),
                });
            }
            TileOutcome::Empty => self.report.empty += 1,
            TileOutcome::LfsPlaceholder => self.report.lfs_placeholders += 1,
            TileOutcome::Skipped => self.report.skipped += 1,
            TileOutcome::Failed(error) => {
                tracing::warn!(key = %tile.key, %error, "tile failed");
                let failure = TileFailure { key: tile.key, error };
                self.sink.on_failure(&failure);
                self.report.failures.push(failure);
            }
        }
    }
}

/// Loads hierarchy pages through the client's cache.
struct Pages<'a, F, C> {
    client: &'a Client<F, C>,
    dataset: &'a Dataset,
}

impl<F: Fetch, C: Cache> PageLoader for Pages<'_, F, C> {
    async fn load_page(&self, page: &PageRef) -> Result<Vec<(NodeKey, HierarchyEntry)>> {
        let (locator, range) = self.dataset.page_location(page);
        let bytes = self.client.fetch_cached(&locator, range).await?;
        tracing::debug!(%locator, len = bytes.len(), "hierarchy page loaded");
        match self.dataset.dialect {
            DatasetDialect::Copc => copc::parse_page(&bytes),
            DatasetDialect::EptPdal | DatasetDialect::EptEntwine => {
                ept::parse_page(&bytes, self.dataset.key_dialect())
            }
        }
    }
}
