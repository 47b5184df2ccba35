//! COPC header and hierarchy parsing.
//!
//! A COPC file is a LAS 1.4 file whose first VLR is the 160-byte `copc`
//! info record. The hierarchy is a set of pages of 32-byte entries:
//!
//! ```text
//! ┌─────────────────────┬────────────┬────────────┬─────────────┐
//! │ key: 4 × i32 d,x,y,z │ offset:u64 │ bytes: i32 │ points: i32 │
//! └─────────────────────┴────────────┴────────────┴─────────────┘
//! ```
//!
//! A point count of `-1` means the entry points at a child page instead of
//! point data.

use glam::DVec3;
use pcstream_decode::{LasHeader, LasLayout, NodeKey, read_vlrs};

use crate::dataset::{DataType, Dataset, DatasetDialect, RecordLayout};
use crate::error::{Error, Result};
use crate::fetch::ByteRange;
use crate::hierarchy::{HierarchyEntry, PageRef, TileEntry};

const INFO_USER_ID: &str = "copc";
const INFO_RECORD_ID: u16 = 1;
const INFO_SIZE: usize = 160;

const LAZ_USER_ID: &str = "laszip encoded";
const LAZ_RECORD_ID: u16 = 22204;

const ENTRY_SIZE: usize = 32;

/// Contents of the `copc` info VLR.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopcInfo {
    pub center: DVec3,
    pub halfsize: f64,
    pub spacing: f64,
    pub root_hierarchy: ByteRange,
}

impl CopcInfo {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let data = data.get(..INFO_SIZE).ok_or_else(|| {
            Error::InvalidDataset(format!("copc info VLR is {} bytes", data.len()))
        })?;
        let f64_at = |i: usize| f64::from_le_bytes(array(&data[i * 8..i * 8 + 8]));
        let u64_at = |i: usize| u64::from_le_bytes(array(&data[i * 8..i * 8 + 8]));

        Ok(Self {
            center: DVec3::new(f64_at(0), f64_at(1), f64_at(2)),
            halfsize: f64_at(3),
            spacing: f64_at(4),
            root_hierarchy: ByteRange::new(u64_at(5), u64_at(6)),
        })
    }
}

/// Build a dataset from the bytes preceding the point data (header + VLRs).
pub fn dataset_from_header(locator: &str, bytes: &[u8]) -> Result<Dataset> {
    let header = LasHeader::parse(bytes)?;
    let vlrs = read_vlrs(bytes, &header)?;

    let info = vlrs
        .iter()
        .find(|vlr| vlr.is(INFO_USER_ID, INFO_RECORD_ID))
        .ok_or_else(|| Error::InvalidDataset(format!("{locator} has no copc info VLR")))?;
    let info = CopcInfo::parse(&info.data)?;

    let laz = vlrs
        .iter()
        .find(|vlr| vlr.is(LAZ_USER_ID, LAZ_RECORD_ID))
        .ok_or_else(|| Error::UnsupportedCompression(format!("{locator} has no laszip VLR")))?;

    let layout = LasLayout::from_header(&header)?;

    Ok(Dataset {
        dialect: DatasetDialect::Copc,
        locator: locator.to_string(),
        layout: RecordLayout::Las(layout),
        data_type: DataType::LazChunk,
        bounds: header.bounds,
        spacing: info.spacing,
        point_count: header.point_count,
        hierarchy_root: PageRef::Range(info.root_hierarchy),
        laz_vlr: Some(laz.data.clone()),
    })
}

/// Parse one hierarchy page.
pub fn parse_page(bytes: &[u8]) -> Result<Vec<(NodeKey, HierarchyEntry)>> {
    if bytes.len() % ENTRY_SIZE != 0 {
        return Err(Error::InvalidHierarchy(format!(
            "page of {} bytes is not a whole number of entries",
            bytes.len()
        )));
    }

    bytes
        .chunks_exact(ENTRY_SIZE)
        .map(|entry| {
            let i32_at = |at: usize| i32::from_le_bytes(array(&entry[at..at + 4]));
            let key = NodeKey::from_signed(i32_at(0), i32_at(4), i32_at(8), i32_at(12))?;
            let offset = u64::from_le_bytes(array(&entry[16..24]));
            let byte_size = i32_at(24);
            let point_count = i32_at(28);

            let length = u64::try_from(byte_size)
                .map_err(|_| Error::InvalidHierarchy(format!("{key} has byte size {byte_size}")))?;
            let range = ByteRange::new(offset, length);
            if range.end().is_none() {
                return Err(Error::InvalidHierarchy(format!("{key} range at {offset} overflows")));
            }
            let entry = match point_count {
                -1 => HierarchyEntry::Page(PageRef::Range(range)),
                count if count >= 0 => HierarchyEntry::Tile(TileEntry {
                    point_count: count as u64,
                    range: Some(range),
                }),
                count => {
                    return Err(Error::InvalidHierarchy(format!("{key} has point count {count}")));
                }
            };
            Ok((key, entry))
        })
        .collect()
}

fn array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn entry(key: [i32; 4], offset: u64, byte_size: i32, point_count: i32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ENTRY_SIZE);
        for v in key {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&offset.to_le_bytes());
        bytes.extend_from_slice(&byte_size.to_le_bytes());
        bytes.extend_from_slice(&point_count.to_le_bytes());
        bytes
    }

    #[test]
    fn parses_tiles_and_pages() {
        let mut page = entry([0, 0, 0, 0], 1000, 200, 50);
        page.extend(entry([1, 1, 0, 1], 5000, 64, -1));
        page.extend(entry([1, 0, 0, 0], 0, 0, 0));

        let entries = parse_page(&page).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0],
            (
                NodeKey::ROOT,
                HierarchyEntry::Tile(TileEntry {
                    point_count: 50,
                    range: Some(ByteRange::new(1000, 200)),
                })
            )
        );
        assert_eq!(
            entries[1],
            (
                NodeKey::new(1, 1, 0, 1),
                HierarchyEntry::Page(PageRef::Range(ByteRange::new(5000, 64)))
            )
        );
    }

    #[test]
    fn rejects_partial_entries() {
        let mut page = entry([0, 0, 0, 0], 0, 10, 1);
        page.pop();
        assert!(matches!(parse_page(&page), Err(Error::InvalidHierarchy(_))));
    }

    #[test]
    fn rejects_negative_keys_and_counts() {
        assert!(parse_page(&entry([0, -1, 0, 0], 0, 10, 1)).is_err());
        assert!(parse_page(&entry([0, 0, 0, 0], 0, 10, -7)).is_err());
    }

    #[test]
    fn rejects_ranges_past_the_address_space() {
        let page = entry([1, 0, 0, 0], u64::MAX, 32, 4);
        assert!(matches!(parse_page(&page), Err(Error::InvalidHierarchy(_))));
        let page = entry([1, 0, 0, 0], u64::MAX - 31, 32, -1);
        assert!(parse_page(&page).is_ok());
    }

    #[test]
    fn parses_info() {
        let mut data = Vec::new();
        for v in [1.0f64, 2.0, 3.0, 50.0, 0.5] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&4096u64.to_le_bytes());
        data.extend_from_slice(&96u64.to_le_bytes());
        data.resize(INFO_SIZE, 0);

        let info = CopcInfo::parse(&data).unwrap();
        assert_eq!(info.center, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(info.spacing, 0.5);
        assert_eq!(info.root_hierarchy, ByteRange::new(4096, 96));
        assert!(CopcInfo::parse(&data[..100]).is_err());
    }
}
