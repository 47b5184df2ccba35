//! EPT manifest and hierarchy page parsing.

use std::collections::BTreeMap;

use pcstream_decode::{Bounds, Dimension, KeyDialect, NodeKey, SchemaLayout};
use serde::Deserialize;

use crate::dataset::{DataType, Dataset, DatasetDialect, RecordLayout};
use crate::error::{Error, Result};
use crate::hierarchy::{HierarchyEntry, PageRef, TileEntry};

/// Default octree span when the manifest omits it.
const DEFAULT_SPAN: f64 = 128.0;

/// The subset of `ept.json` the loader reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EptManifest {
    pub bounds: [f64; 6],
    #[serde(default)]
    pub bounds_conformance: Option<[f64; 6]>,
    pub data_type: String,
    #[serde(default)]
    pub hierarchy_type: Option<String>,
    #[serde(default)]
    pub points: u64,
    #[serde(default)]
    pub span: Option<f64>,
    #[serde(default)]
    pub schema: Option<Vec<EptDimension>>,
    #[serde(default)]
    pub attributes: Option<Vec<EptDimension>>,
}

/// One schema entry.
#[derive(Debug, Clone, Deserialize)]
pub struct EptDimension {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: usize,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub offset: Option<f64>,
}

impl EptManifest {
    /// Which manifest dialect this is, judged by the field describing points.
    pub fn dialect(&self) -> Result<DatasetDialect> {
        match (&self.schema, &self.attributes) {
            (Some(_), _) => Ok(DatasetDialect::EptEntwine),
            (None, Some(_)) => Ok(DatasetDialect::EptPdal),
            (None, None) => Err(Error::InvalidDataset(
                "manifest has neither `schema` nor `attributes`".into(),
            )),
        }
    }

    fn dimensions(&self) -> &[EptDimension] {
        self.schema
            .as_deref()
            .or(self.attributes.as_deref())
            .unwrap_or_default()
    }

    pub fn data_type(&self) -> Result<DataType> {
        match self.data_type.as_str() {
            "binary" => Ok(DataType::Binary),
            "laszip" => Ok(DataType::LazFile),
            other => Err(Error::UnsupportedCompression(other.to_string())),
        }
    }
}

/// Build a dataset from an `ept.json` body. `base` is the directory holding it.
pub fn dataset_from_manifest(base: &str, bytes: &[u8]) -> Result<Dataset> {
    let manifest: EptManifest = serde_json::from_slice(bytes)?;
    let dialect = manifest.dialect()?;
    let data_type = manifest.data_type()?;

    if let Some(kind) = manifest.hierarchy_type.as_deref()
        && kind != "json"
    {
        return Err(Error::UnsupportedCompression(format!("hierarchy type {kind}")));
    }

    let dimensions = manifest
        .dimensions()
        .iter()
        .map(|d| Dimension::from_ept(&d.name, &d.kind, d.size, d.scale, d.offset))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let layout = SchemaLayout::new(&dimensions)?;

    let cube = Bounds::from_array(manifest.bounds);
    let span = manifest.span.filter(|s| *s > 0.0).unwrap_or(DEFAULT_SPAN);
    let spacing = cube.size().x / span;
    let bounds = Bounds::from_array(manifest.bounds_conformance.unwrap_or(manifest.bounds));

    Ok(Dataset {
        dialect,
        locator: base.trim_end_matches('/').to_string(),
        layout: RecordLayout::Schema(layout),
        data_type,
        bounds,
        spacing,
        point_count: manifest.points,
        hierarchy_root: PageRef::Node(NodeKey::ROOT),
        laz_vlr: None,
    })
}

/// Parse one `ept-hierarchy/<key>.json` page.
pub fn parse_page(bytes: &[u8], dialect: KeyDialect) -> Result<Vec<(NodeKey, HierarchyEntry)>> {
    let page: BTreeMap<String, i64> = serde_json::from_slice(bytes)?;
    page.into_iter()
        .map(|(name, count)| {
            let key = dialect.parse(&name)?;
            let entry = match count {
                -1 => HierarchyEntry::Page(PageRef::Node(key)),
                count => {
                    let point_count = u64::try_from(count).map_err(|_| {
                        Error::InvalidHierarchy(format!("{name} has point count {count}"))
                    })?;
                    HierarchyEntry::Tile(TileEntry { point_count, range: None })
                }
            };
            Ok((key, entry))
        })
        .collect()
}
