//! LAS public header block and variable length records.
//!
//! The raw structures come from the `las` crate; this module keeps the
//! fields the loader needs and normalizes pre-1.4 headers, whose extended
//! point count and EVLR fields then default to the legacy values.

use std::io::Cursor;

use glam::DVec3;

use crate::bounds::Bounds;
use crate::error::{DecodeError, DecodeResult};

/// Size of a LAS 1.4 public header block.
pub const LAS14_HEADER_SIZE: usize = 375;

/// Parsed LAS public header block.
#[derive(Debug, Clone, PartialEq)]
pub struct LasHeader {
    pub version: (u8, u8),
    pub header_size: u16,
    pub offset_to_point_data: u32,
    pub vlr_count: u32,
    /// Point data format id with the compression bits masked off.
    pub point_format: u8,
    /// Whether bit 7 of the format byte marks the points as LAZ-compressed.
    pub compressed: bool,
    pub record_length: u16,
    pub point_count: u64,
    pub scale: DVec3,
    pub offset: DVec3,
    pub bounds: Bounds,
    pub evlr_start: u64,
    pub evlr_count: u32,
}

impl LasHeader {
    pub fn parse(bytes: &[u8]) -> DecodeResult<Self> {
        if bytes.get(0..4) != Some(b"LASF".as_slice()) {
            return Err(DecodeError::InvalidHeader("missing LASF signature".into()));
        }
        let raw = las::raw::Header::read_from(Cursor::new(bytes)).map_err(invalid)?;

        let point_count = raw.large_file.as_ref().map_or_else(
            || u64::from(raw.number_of_point_records),
            |large| large.number_of_point_records,
        );
        let (evlr_start, evlr_count) = raw
            .evlr
            .as_ref()
            .map_or((0, 0), |evlr| (evlr.start_of_first_evlr, evlr.number_of_evlrs));

        Ok(Self {
            version: (raw.version.major, raw.version.minor),
            header_size: raw.header_size,
            offset_to_point_data: raw.offset_to_point_data,
            vlr_count: raw.number_of_variable_length_records,
            point_format: raw.point_data_record_format & 0x3f,
            compressed: raw.point_data_record_format & 0x80 != 0,
            record_length: raw.point_data_record_length,
            point_count,
            scale: DVec3::new(raw.x_scale_factor, raw.y_scale_factor, raw.z_scale_factor),
            offset: DVec3::new(raw.x_offset, raw.y_offset, raw.z_offset),
            bounds: Bounds::new(
                DVec3::new(raw.min_x, raw.min_y, raw.min_z),
                DVec3::new(raw.max_x, raw.max_y, raw.max_z),
            ),
            evlr_start,
            evlr_count,
        })
    }
}

/// A variable length record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vlr {
    pub user_id: String,
    pub record_id: u16,
    pub data: Vec<u8>,
}

impl Vlr {
    #[must_use]
    pub fn is(&self, user_id: &str, record_id: u16) -> bool {
        self.user_id == user_id && self.record_id == record_id
    }
}

impl From<las::raw::Vlr> for Vlr {
    fn from(raw: las::raw::Vlr) -> Self {
        Self {
            user_id: null_terminated(&raw.user_id),
            record_id: raw.record_id,
            data: raw.data,
        }
    }
}

/// Read the VLRs that follow the header. `bytes` must start at file offset 0.
pub fn read_vlrs(bytes: &[u8], header: &LasHeader) -> DecodeResult<Vec<Vlr>> {
    let mut cursor = Cursor::new(bytes);
    cursor.set_position(u64::from(header.header_size));
    (0..header.vlr_count)
        .map(|_| {
            las::raw::Vlr::read_from(&mut cursor, false)
                .map(Vlr::from)
                .map_err(invalid)
        })
        .collect()
}

fn invalid(error: las::Error) -> DecodeError {
    DecodeError::InvalidHeader(error.to_string())
}

fn null_terminated(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A minimal LAS 1.4 header with one VLR.
    pub(crate) fn sample_header(
        point_format: u8,
        record_length: u16,
        vlr: Option<(&str, u16, &[u8])>,
    ) -> Vec<u8> {
        let mut bytes = vec![0u8; LAS14_HEADER_SIZE];
        bytes[0..4].copy_from_slice(b"LASF");
        bytes[24] = 1;
        bytes[25] = 4;
        bytes[94..96].copy_from_slice(&(LAS14_HEADER_SIZE as u16).to_le_bytes());
        bytes[104] = point_format | 0x80;
        bytes[105..107].copy_from_slice(&record_length.to_le_bytes());
        for (i, v) in [0.01_f64, 0.01, 0.01, 100.0, 200.0, 300.0].iter().enumerate() {
            bytes[131 + i * 8..139 + i * 8].copy_from_slice(&v.to_le_bytes());
        }
        for (i, v) in [10.0_f64, 0.0, 20.0, 1.0, 30.0, 2.0].iter().enumerate() {
            bytes[179 + i * 8..187 + i * 8].copy_from_slice(&v.to_le_bytes());
        }
        bytes[247..255].copy_from_slice(&42u64.to_le_bytes());

        if let Some((user, id, data)) = vlr {
            bytes[100..104].copy_from_slice(&1u32.to_le_bytes());
            let mut record = vec![0u8; 54];
            record[2..2 + user.len()].copy_from_slice(user.as_bytes());
            record[18..20].copy_from_slice(&id.to_le_bytes());
            record[20..22].copy_from_slice(&(data.len() as u16).to_le_bytes());
            bytes.extend_from_slice(&record);
            bytes.extend_from_slice(data);
        }
        let point_offset = bytes.len() as u32;
        bytes[96..100].copy_from_slice(&point_offset.to_le_bytes());
        bytes
    }

    #[test]
    fn parses_header_fields() {
        let bytes = sample_header(7, 36, None);
        let header = LasHeader::parse(&bytes).unwrap();
        assert_eq!(header.version, (1, 4));
        assert_eq!(header.point_format, 7);
        assert!(header.compressed);
        assert_eq!(header.record_length, 36);
        assert_eq!(header.point_count, 42);
        assert_eq!(header.offset, DVec3::new(100.0, 200.0, 300.0));
        assert_eq!(header.bounds.min, DVec3::new(0.0, 1.0, 2.0));
        assert_eq!(header.bounds.max, DVec3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn reads_vlrs() {
        let bytes = sample_header(6, 30, Some(("copc", 1, &[1, 2, 3])));
        let header = LasHeader::parse(&bytes).unwrap();
        let vlrs = read_vlrs(&bytes, &header).unwrap();
        assert_eq!(vlrs.len(), 1);
        assert!(vlrs[0].is("copc", 1));
        assert_eq!(vlrs[0].data, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_bad_signature() {
        assert!(matches!(
            LasHeader::parse(b"NOPE"),
            Err(DecodeError::InvalidHeader(_))
        ));
    }

    #[test]
    fn truncated_vlr_is_an_error() {
        let mut bytes = sample_header(6, 30, Some(("copc", 1, &[1, 2, 3])));
        bytes.truncate(bytes.len() - 2);
        let header = LasHeader::parse(&bytes).unwrap();
        assert!(matches!(
            read_vlrs(&bytes, &header),
            Err(DecodeError::InvalidHeader(_))
        ));
    }

    #[test]
    fn legacy_header_uses_short_point_count() {
        let mut bytes = sample_header(3, 34, None);
        bytes[25] = 2;
        bytes[94..96].copy_from_slice(&227u16.to_le_bytes());
        bytes[96..100].copy_from_slice(&227u32.to_le_bytes());
        bytes[107..111].copy_from_slice(&7u32.to_le_bytes());
        bytes.truncate(227);
        let header = LasHeader::parse(&bytes).unwrap();
        assert_eq!(header.version, (1, 2));
        assert_eq!(header.point_count, 7);
        assert_eq!((header.evlr_start, header.evlr_count), (0, 0));
    }

    #[test]
    fn truncated_header_is_an_error() {
        let bytes = sample_header(6, 30, None);
        assert!(matches!(
            LasHeader::parse(&bytes[..200]),
            Err(DecodeError::InvalidHeader(_))
        ));
    }
}
