//! LAZ decompression adapter.

use std::io::{Cursor, Seek, SeekFrom};

use laz::record::{
    LayeredPointRecordDecompressor, RecordDecompressor, SequentialPointRecordDecompressor,
};
use laz::{LasZipDecompressor, LazVlr};
use pcstream_decode::{LasHeader, LasLayout, read_vlrs};

use crate::error::{Error, Result};

const LAZ_USER_ID: &str = "laszip encoded";
const LAZ_RECORD_ID: u16 = 22204;

/// What a COPC chunk holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub point_format: u8,
    pub record_length: u16,
    pub point_count: u64,
}

impl ChunkInfo {
    fn output_len(&self) -> Result<usize> {
        usize::try_from(self.point_count)
            .ok()
            .and_then(|count| count.checked_mul(usize::from(self.record_length)))
            .ok_or_else(|| {
                Error::InvalidDataset(format!("chunk of {} points is too large", self.point_count))
            })
    }
}

/// Turns compressed tile bytes into raw point records.
///
/// Runs on blocking worker threads.
pub trait Decompress: Send + Sync {
    /// Decompress one independently encoded COPC chunk.
    fn decompress_chunk(
        &self,
        compressed: &[u8],
        laz_vlr: &[u8],
        info: &ChunkInfo,
    ) -> Result<Vec<u8>>;

    /// Decompress a complete LAS/LAZ file, returning its record layout and
    /// raw records.
    fn decompress_file(&self, file: &[u8]) -> Result<(LasLayout, Vec<u8>)>;
}

/// [`Decompress`] backed by the `laz` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazDecompressor;

impl Decompress for LazDecompressor {
    fn decompress_chunk(
        &self,
        compressed: &[u8],
        laz_vlr: &[u8],
        info: &ChunkInfo,
    ) -> Result<Vec<u8>> {
        let vlr = LazVlr::from_buffer(laz_vlr)?;
        let mut out = vec![0u8; info.output_len()?];
        let source = Cursor::new(compressed);

        // Point formats 6+ use the layered encoding.
        if info.point_format >= 6 {
            let mut decompressor = LayeredPointRecordDecompressor::new(source);
            decompressor.set_fields_from(vlr.items())?;
            decompressor.decompress_many(&mut out)?;
        } else {
            let mut decompressor = SequentialPointRecordDecompressor::new(source);
            decompressor.set_fields_from(vlr.items())?;
            decompressor.decompress_many(&mut out)?;
        }
        Ok(out)
    }

    fn decompress_file(&self, file: &[u8]) -> Result<(LasLayout, Vec<u8>)> {
        let header = LasHeader::parse(file)?;
        let layout = LasLayout::from_header(&header)?;
        let start = header.offset_to_point_data as usize;
        let info = ChunkInfo {
            point_format: header.point_format,
            record_length: header.record_length,
            point_count: header.point_count,
        };

        if !header.compressed {
            let records = file.get(start..).ok_or_else(|| {
                Error::InvalidDataset("point data offset is past the end of the file".into())
            })?;
            return Ok((layout, records.to_vec()));
        }

        let vlrs = read_vlrs(file, &header)?;
        let vlr = vlrs
            .iter()
            .find(|vlr| vlr.is(LAZ_USER_ID, LAZ_RECORD_ID))
            .ok_or_else(|| {
                Error::UnsupportedCompression("compressed file without a laszip VLR".into())
            })?;
        let vlr = LazVlr::from_buffer(&vlr.data)?;

        let mut source = Cursor::new(file);
        source.seek(SeekFrom::Start(u64::from(header.offset_to_point_data)))?;
        let mut decompressor = LasZipDecompressor::new(source, vlr)?;
        let mut out = vec![0u8; info.output_len()?];
        decompressor.decompress_many(&mut out)?;
        Ok((layout, out))
    }
}
