//! Synthetic datasets served from memory.

#![allow(dead_code)]

use std::io::{Cursor, Seek, SeekFrom};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use laz::{LasZipCompressor, LazItemRecordBuilder, LazVlr};
use pcstream::{ByteRange, ChunkInfo, Decompress, Error, Fetch, MemoryStore, NodeKey, Result};
use pcstream_decode::LasLayout;

pub const BASE: &str = "tree";

pub const LFS_POINTER: &[u8] =
    b"version https://git-lfs.github.com/spec/v1\noid sha256:4d7a\nsize 1024\n";

/// Builds an EPT tree: schema `X Y Z` (f64), `Intensity` (u16),
/// `Classification` (u8), all tiles listed on the root hierarchy page.
pub struct EptFixture {
    data_type: &'static str,
    describe_with: &'static str,
    morton: bool,
    tiles: Vec<(NodeKey, Vec<u8>, i64)>,
    listed_only: Vec<(NodeKey, i64)>,
}

impl EptFixture {
    pub fn new() -> Self {
        Self {
            data_type: "binary",
            describe_with: "schema",
            morton: false,
            tiles: Vec::new(),
            listed_only: Vec::new(),
        }
    }

    /// Describe points with `attributes` and name keys as Morton chains.
    pub fn pdal(mut self) -> Self {
        self.describe_with = "attributes";
        self.morton = true;
        self
    }

    pub fn data_type(mut self, data_type: &'static str) -> Self {
        self.data_type = data_type;
        self
    }

    /// A tile whose points sit at the given heights.
    pub fn tile(mut self, key: NodeKey, z: &[f64]) -> Self {
        let x0 = f64::from(key.depth * 10 + key.x);
        let bytes = z
            .iter()
            .enumerate()
            .flat_map(|(i, &z)| record(x0 + i as f64, f64::from(key.y), z, 65535, 2))
            .collect();
        self.tiles.push((key, bytes, z.len() as i64));
        self
    }

    /// A tile served with arbitrary bytes.
    pub fn raw_tile(mut self, key: NodeKey, bytes: &[u8], count: i64) -> Self {
        self.tiles.push((key, bytes.to_vec(), count));
        self
    }

    /// A hierarchy entry without data behind it.
    pub fn listed(mut self, key: NodeKey, count: i64) -> Self {
        self.listed_only.push((key, count));
        self
    }

    fn name(&self, key: &NodeKey) -> String {
        if self.morton { key.to_chain() } else { key.to_string() }
    }

    pub fn manifest(&self) -> String {
        format!(
            r#"{{
                "bounds": [0, 0, 0, 128, 128, 128],
                "boundsConformance": [0, 0, 0, 100, 100, 100],
                "dataType": "{}",
                "hierarchyType": "json",
                "points": {},
                "span": 64,
                "{}": [
                    {{"name": "X", "type": "float", "size": 8}},
                    {{"name": "Y", "type": "float", "size": 8}},
                    {{"name": "Z", "type": "float", "size": 8}},
                    {{"name": "Intensity", "type": "unsigned", "size": 2}},
                    {{"name": "Classification", "type": "unsigned", "size": 1}}
                ]
            }}"#,
            self.data_type,
            self.tiles.iter().map(|t| t.2).sum::<i64>(),
            self.describe_with,
        )
    }

    pub fn build(self) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert(format!("{BASE}/ept.json"), self.manifest());

        let page = self
            .tiles
            .iter()
            .map(|(key, _, count)| (*key, *count))
            .chain(self.listed_only.iter().copied())
            .map(|(key, count)| format!("\"{}\": {count}", self.name(&key)))
            .collect::<Vec<_>>()
            .join(", ");
        let root_page = format!("{BASE}/ept-hierarchy/{}.json", self.name(&NodeKey::ROOT));
        store.insert(root_page, format!("{{{page}}}"));

        let extension = if self.data_type == "laszip" { "laz" } else { "bin" };
        for (key, bytes, _) in &self.tiles {
            let path = format!("{BASE}/ept-data/{}.{extension}", self.name(key));
            store.insert(path, bytes.clone());
        }
        store
    }
}

/// One schema record.
pub fn record(x: f64, y: f64, z: f64, intensity: u16, class: u8) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(27);
    for v in [x, y, z] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes.extend_from_slice(&intensity.to_le_bytes());
    bytes.push(class);
    bytes
}

pub fn k(depth: u32, x: u32, y: u32, z: u32) -> NodeKey {
    NodeKey::new(depth, x, y, z)
}

/// Root with ten points at heights 0..9 and two depth-1 children of five
/// points each.
pub fn three_tiles() -> EptFixture {
    let root: Vec<f64> = (0..10).map(f64::from).collect();
    EptFixture::new()
        .tile(NodeKey::ROOT, &root)
        .tile(k(1, 0, 0, 0), &[20.0, 21.0, 22.0, 23.0, 24.0])
        .tile(k(1, 1, 0, 0), &[30.0, 31.0, 32.0, 33.0, 34.0])
}

/// Counts concurrent fetches of tile data.
pub struct Counting<F> {
    inner: F,
    delay: Duration,
    active: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
    pub tile_fetches: Arc<AtomicUsize>,
}

impl<F> Counting<F> {
    pub fn new(inner: F, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            active: Arc::default(),
            peak: Arc::default(),
            tile_fetches: Arc::default(),
        }
    }
}

impl<F: Fetch> Fetch for Counting<F> {
    async fn fetch(&self, locator: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        if !locator.contains("ept-data/") {
            return self.inner.fetch(locator, range).await;
        }
        self.tile_fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = self.inner.fetch(locator, range).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Panics when asked for a locator ending in `poisoned`.
pub struct Panicking<F> {
    pub inner: F,
    pub poisoned: String,
}

impl<F: Fetch> Fetch for Panicking<F> {
    async fn fetch(&self, locator: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        assert!(!locator.ends_with(&self.poisoned), "fetcher blew up on {locator}");
        self.inner.fetch(locator, range).await
    }
}

/// Treats COPC chunks as already decompressed records.
pub struct Passthrough;

impl Decompress for Passthrough {
    fn decompress_chunk(
        &self,
        compressed: &[u8],
        _laz_vlr: &[u8],
        info: &ChunkInfo,
    ) -> Result<Vec<u8>> {
        let expected = info.point_count * u64::from(info.record_length);
        assert_eq!(compressed.len() as u64, expected);
        Ok(compressed.to_vec())
    }

    fn decompress_file(&self, _file: &[u8]) -> Result<(LasLayout, Vec<u8>)> {
        Err(Error::UnsupportedCompression("passthrough".into()))
    }
}

/// A point of a synthetic COPC file: raw integer coordinates.
pub type RawPoint = [i32; 3];

pub const COPC_SCALE: f64 = 0.01;
pub const COPC_OFFSET: [f64; 3] = [100.0, 200.0, 0.0];
pub const COPC_SPACING: f64 = 2.5;

/// Records of the given LAS point format: every point has intensity 32768,
/// class 6 and a single return. Color formats get RGB `(65535, 0, 32768)` at
/// byte 30.
pub fn las_records(point_format: u8, record_length: usize, points: &[RawPoint]) -> Vec<u8> {
    points
        .iter()
        .flat_map(|p| {
            let mut rec = vec![0u8; record_length];
            for (axis, v) in p.iter().enumerate() {
                rec[axis * 4..axis * 4 + 4].copy_from_slice(&v.to_le_bytes());
            }
            rec[12..14].copy_from_slice(&32768u16.to_le_bytes());
            if point_format >= 6 {
                rec[14] = 0x11;
                rec[16] = 6;
            } else {
                rec[14] = 0x09;
                rec[15] = 6;
            }
            if record_length >= 36 {
                for (i, v) in [65535u16, 0, 32768].iter().enumerate() {
                    rec[30 + i * 2..32 + i * 2].copy_from_slice(&v.to_le_bytes());
                }
            }
            rec
        })
        .collect()
}

/// A LAS 1.4 public header with [`COPC_SCALE`] and [`COPC_OFFSET`].
fn las_header(
    format_byte: u8,
    record_length: usize,
    points_at: usize,
    vlr_count: u32,
    point_count: u64,
) -> Vec<u8> {
    const HEADER: usize = 375;
    let mut file = vec![0u8; HEADER];
    file[0..4].copy_from_slice(b"LASF");
    file[24] = 1;
    file[25] = 4;
    file[94..96].copy_from_slice(&(HEADER as u16).to_le_bytes());
    file[96..100].copy_from_slice(&(points_at as u32).to_le_bytes());
    file[100..104].copy_from_slice(&vlr_count.to_le_bytes());
    file[104] = format_byte;
    file[105..107].copy_from_slice(&(record_length as u16).to_le_bytes());
    for axis in 0..3 {
        let at = 131 + axis * 8;
        file[at..at + 8].copy_from_slice(&COPC_SCALE.to_le_bytes());
        let at = 155 + axis * 8;
        file[at..at + 8].copy_from_slice(&COPC_OFFSET[axis].to_le_bytes());
    }
    // max x, min x, max y, min y, max z, min z
    for (i, v) in [200.0f64, 100.0, 300.0, 200.0, 50.0, 0.0].iter().enumerate() {
        let at = 179 + i * 8;
        file[at..at + 8].copy_from_slice(&v.to_le_bytes());
    }
    file[247..255].copy_from_slice(&point_count.to_le_bytes());
    file
}

/// The laszip VLR for a point format without extra bytes.
pub fn laz_vlr(point_format: u8) -> LazVlr {
    let items = LazItemRecordBuilder::default_for_point_format_id(point_format, 0).unwrap();
    LazVlr::from_laz_items(items)
}

/// Compress `records` as one COPC-style chunk. Returns the laszip VLR
/// payload and the chunk bytes without the chunk table around them.
pub fn laz_chunk(point_format: u8, records: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let vlr = laz_vlr(point_format);
    let mut payload = Vec::new();
    vlr.write_to(&mut payload).unwrap();

    let mut compressor = LasZipCompressor::new(Cursor::new(Vec::new()), vlr).unwrap();
    compressor.compress_many(records).unwrap();
    compressor.done().unwrap();
    let stream = compressor.into_inner().into_inner();
    // The stream opens with the offset of the trailing chunk table.
    let table_at = u64::from_le_bytes(stream[..8].try_into().unwrap()) as usize;
    (payload, stream[8..table_at].to_vec())
}

/// A complete LAS file holding `records`, LAZ-compressed if `compressed`.
pub fn las_file(
    point_format: u8,
    record_length: usize,
    records: &[u8],
    compressed: bool,
) -> Vec<u8> {
    let count = (records.len() / record_length) as u64;
    if !compressed {
        let mut file = las_header(point_format, record_length, 375, 0, count);
        file.extend_from_slice(records);
        return file;
    }

    let vlr = laz_vlr(point_format);
    let mut payload = Vec::new();
    vlr.write_to(&mut payload).unwrap();
    let points_at = 375 + 54 + payload.len();
    let mut file = las_header(point_format | 0x80, record_length, points_at, 1, count);
    file.extend(vlr_record("laszip encoded", 22204, &payload));

    let mut stream = Cursor::new(file);
    stream.seek(SeekFrom::End(0)).unwrap();
    let mut compressor = LasZipCompressor::new(stream, vlr).unwrap();
    compressor.compress_many(records).unwrap();
    compressor.done().unwrap();
    compressor.into_inner().into_inner()
}

/// Assemble a COPC file in point format 6 (30-byte records).
///
/// `root_page` lists the root and a pointer to `sub_page`, which lists one
/// more tile. Chunks are stored uncompressed, so read them with
/// [`Passthrough`]. Returns the file bytes.
pub fn copc_file(root: &[RawPoint], child: &[RawPoint], deep: &[RawPoint]) -> Vec<u8> {
    const RECORD: usize = 30;
    let info_vlr = 54 + 160;
    let laz_payload = vec![0u8; 34];
    let laz_vlr = 54 + laz_payload.len();
    let points_at = 375 + info_vlr + laz_vlr;

    let chunks = [
        las_records(6, RECORD, root),
        las_records(6, RECORD, child),
        las_records(6, RECORD, deep),
    ];
    let chunk_at: Vec<usize> = chunks
        .iter()
        .scan(points_at, |at, c| {
            let start = *at;
            *at += c.len();
            Some(start)
        })
        .collect();
    let sub_page_at = points_at + chunks.iter().map(Vec::len).sum::<usize>();

    let entry = |key: [i32; 4], offset: usize, size: usize, count: i32| -> Vec<u8> {
        let mut bytes = Vec::with_capacity(32);
        for v in key {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&(offset as u64).to_le_bytes());
        bytes.extend_from_slice(&(size as i32).to_le_bytes());
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes
    };
    let sub_page = entry([1, 1, 1, 1], chunk_at[2], chunks[2].len(), deep.len() as i32);
    let root_page_at = sub_page_at + sub_page.len();
    let mut root_page = entry([0, 0, 0, 0], chunk_at[0], chunks[0].len(), root.len() as i32);
    root_page.extend(entry([1, 0, 0, 0], chunk_at[1], chunks[1].len(), child.len() as i32));
    root_page.extend(entry([1, 1, 1, 1], sub_page_at, sub_page.len(), -1));

    let total = (root.len() + child.len() + deep.len()) as u64;
    let mut file = las_header(6 | 0x80, RECORD, points_at, 2, total);

    let mut info = Vec::with_capacity(160);
    for v in [150.0f64, 250.0, 25.0, 50.0, COPC_SPACING] {
        info.extend_from_slice(&v.to_le_bytes());
    }
    info.extend_from_slice(&(root_page_at as u64).to_le_bytes());
    info.extend_from_slice(&(root_page.len() as u64).to_le_bytes());
    info.resize(160, 0);

    file.extend(vlr_record("copc", 1, &info));
    file.extend(vlr_record("laszip encoded", 22204, &laz_payload));
    assert_eq!(file.len(), points_at);
    for c in &chunks {
        file.extend_from_slice(c);
    }
    file.extend(sub_page);
    file.extend(root_page);
    file
}

fn vlr_record(user: &str, record_id: u16, data: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; 54];
    bytes[2..2 + user.len()].copy_from_slice(user.as_bytes());
    bytes[18..20].copy_from_slice(&record_id.to_le_bytes());
    bytes[20..22].copy_from_slice(&(data.len() as u16).to_le_bytes());
    bytes.extend_from_slice(data);
    bytes
}
