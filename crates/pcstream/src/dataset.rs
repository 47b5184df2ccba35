//! Dataset descriptors.

use pcstream_decode::{Bounds, KeyDialect, LasLayout, NodeKey, SchemaLayout};

use crate::fetch::ByteRange;
use crate::hierarchy::{PageRef, TileEntry};

/// Archive family and key convention, decided once when a dataset is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetDialect {
    /// Single-file COPC container.
    Copc,
    /// EPT tree described by an `attributes` listing; keys are Morton chains.
    EptPdal,
    /// EPT tree described by a `schema` array; keys are `d-x-y-z`.
    EptEntwine,
}

impl DatasetDialect {
    #[must_use]
    pub fn key_dialect(self) -> KeyDialect {
        match self {
            Self::Copc | Self::EptEntwine => KeyDialect::Explicit,
            Self::EptPdal => KeyDialect::MortonChain,
        }
    }

    #[must_use]
    pub fn is_ept(self) -> bool {
        !matches!(self, Self::Copc)
    }
}

/// How tile bytes are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// COPC: an independently decodable LAZ chunk inside the dataset file.
    LazChunk,
    /// EPT `binary`: raw schema-described records.
    Binary,
    /// EPT `laszip`: a complete LAZ file per tile.
    LazFile,
}

impl DataType {
    /// File extension of EPT tiles.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::LazChunk | Self::LazFile => "laz",
        }
    }
}

/// Byte layout of a point record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordLayout {
    Las(LasLayout),
    Schema(SchemaLayout),
}

impl RecordLayout {
    /// Bytes per record.
    #[must_use]
    pub fn stride(&self) -> usize {
        match self {
            Self::Las(layout) => layout.stride(),
            Self::Schema(layout) => layout.stride(),
        }
    }
}

/// Immutable description of an opened dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub dialect: DatasetDialect,
    /// COPC file locator, or the EPT root directory.
    pub locator: String,
    pub layout: RecordLayout,
    pub data_type: DataType,
    pub bounds: Bounds,
    /// Nominal point spacing at the root level.
    pub spacing: f64,
    pub point_count: u64,
    pub hierarchy_root: PageRef,
    /// Raw `laszip encoded` VLR payload for COPC chunks.
    pub laz_vlr: Option<Vec<u8>>,
}

impl Dataset {
    #[must_use]
    pub fn key_dialect(&self) -> KeyDialect {
        self.dialect.key_dialect()
    }

    /// Locator and range of a hierarchy page.
    #[must_use]
    pub fn page_location(&self, page: &PageRef) -> (String, Option<ByteRange>) {
        match page {
            PageRef::Range(range) => (self.locator.clone(), Some(*range)),
            PageRef::Node(key) => {
                let name = self.key_dialect().format(key);
                (join(&self.locator, &format!("ept-hierarchy/{name}.json")), None)
            }
        }
    }

    /// Locator and range of a tile.
    #[must_use]
    pub fn tile_location(&self, key: &NodeKey, tile: &TileEntry) -> (String, Option<ByteRange>) {
        if self.dialect.is_ept() {
            let name = self.key_dialect().format(key);
            let path = format!("ept-data/{name}.{}", self.data_type.extension());
            (join(&self.locator, &path), tile.range)
        } else {
            (self.locator.clone(), tile.range)
        }
    }
}

/// Join a relative path onto a base locator.
#[must_use]
pub fn join(base: &str, path: &str) -> String {
    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{path}", base.trim_end_matches('/'))
    }
}

/// The directory part of a locator, empty when there is none.
#[must_use]
pub fn parent(locator: &str) -> &str {
    locator.rsplit_once('/').map_or("", |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn ept(dialect: DatasetDialect) -> Dataset {
        Dataset {
            dialect,
            locator: "https://host/tree".into(),
            layout: RecordLayout::Las(LasLayout::new(6, 30, DVec3::ONE, DVec3::ZERO).unwrap()),
            data_type: DataType::Binary,
            bounds: Bounds::empty(),
            spacing: 1.0,
            point_count: 0,
            hierarchy_root: PageRef::Node(NodeKey::ROOT),
            laz_vlr: None,
        }
    }

    #[test]
    fn joins_paths() {
        assert_eq!(join("", "ept.json"), "ept.json");
        assert_eq!(join("a/b/", "ept.json"), "a/b/ept.json");
        assert_eq!(parent("https://host/tree/ept.json"), "https://host/tree");
        assert_eq!(parent("ept.json"), "");
    }

    #[test]
    fn ept_locations_follow_key_dialect() {
        let key = NodeKey::new(1, 1, 0, 0);
        let tile = TileEntry { point_count: 1, range: None };

        let entwine = ept(DatasetDialect::EptEntwine);
        assert_eq!(entwine.tile_location(&key, &tile).0, "https://host/tree/ept-data/1-1-0-0.bin");
        assert_eq!(
            entwine.page_location(&PageRef::Node(key)).0,
            "https://host/tree/ept-hierarchy/1-1-0-0.json"
        );

        let pdal = ept(DatasetDialect::EptPdal);
        assert_eq!(pdal.tile_location(&key, &tile).0, "https://host/tree/ept-data/r4.bin");
    }

    #[test]
    fn copc_tiles_are_ranges_of_the_file() {
        let mut copc = ept(DatasetDialect::Copc);
        copc.locator = "a.copc.laz".into();
        let range = ByteRange::new(100, 20);
        let tile = TileEntry { point_count: 4, range: Some(range) };
        assert_eq!(
            copc.tile_location(&NodeKey::ROOT, &tile),
            ("a.copc.laz".to_string(), Some(range))
        );
    }
}
