use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};

use crate::laszip::chunk_table::ChunkTable;
use crate::laszip::{details, CompressorType, LazVlr};
use crate::record::RecordDecompressor;
use crate::LasZipError;

/// LasZip decompressor that decompresses points.
///
/// Supports **fixed-size**, **variable-size** and unbounded chunks.
///
/// The chunk table is read when the decompressor is created, it is what
/// allows to [`seek`] without decompressing the points that come before.
/// Data without a chunk table can still be decompressed and seeked,
/// as long as the chunk boundaries can be known without it.
///
/// [`seek`]: Self::seek
pub struct LasZipDecompressor<'a, R: Read + Seek + 'a> {
    vlr: LazVlr,
    record_decompressor: Box<dyn RecordDecompressor<R> + Send + 'a>,
    chunk_table: Option<ChunkTable>,
    /// Position of the first chunk
    data_start: u64,
    current_chunk: usize,
    chunk_points_read: u64,
    num_points_in_chunk: u64,
    /// Index of the next point to be decompressed
    current_point: u64,
    /// Number of points the data is declared to have
    point_count: Option<u64>,
}

impl<'a, R: Read + Seek + Send + 'a> LasZipDecompressor<'a, R> {
    /// Creates a new instance from a data source of compressed points
    /// and the LazVlr describing the compressed data.
    ///
    /// The `source` must be positioned at the start of the compressed data.
    pub fn new(mut source: R, vlr: LazVlr) -> crate::Result<Self> {
        let start = source.seek(SeekFrom::Current(0))?;
        let (chunk_table, data_start) = match vlr.compressor() {
            // Everything is in one chunk, there is no table
            CompressorType::PointWise => (None, start),
            _ => {
                let data_start = start + ChunkTable::OFFSET_SIZE as u64;
                match ChunkTable::read_from(&mut source, &vlr) {
                    Ok(chunk_table) => (Some(chunk_table), data_start),
                    // Without table, variable-size chunks can only be delimited
                    // by the point count that layered chunks embed
                    Err(LasZipError::MissingChunkTable)
                        if !vlr.uses_variable_size_chunks()
                            || vlr.compressor() == CompressorType::LayeredChunked =>
                    {
                        warn!("No chunk table found, seeking will decompress from the start");
                        source.seek(SeekFrom::Start(data_start))?;
                        (None, data_start)
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        let record_decompressor = details::record_decompressor_from_vlr(&vlr, source)?;
        Ok(Self {
            vlr,
            record_decompressor,
            chunk_table,
            data_start,
            current_chunk: 0,
            chunk_points_read: 0,
            num_points_in_chunk: u64::MAX,
            current_point: 0,
            point_count: None,
        })
    }

    /// Declares the number of points of the compressed data (as found in the LAS header).
    ///
    /// Reading or seeking past it is then reported as a [`LasZipError::UserIndexError`].
    pub fn with_point_count(mut self, point_count: u64) -> Self {
        self.point_count = Some(point_count);
        self
    }

    /// Decompress the next point and write the uncompressed data to the out buffer.
    ///
    /// - The buffer should have at least enough byte to store the decompressed data
    /// - The data is written in the buffer exactly as it would have been in a LAS File
    ///   in Little Endian order,
    pub fn decompress_one(&mut self, out: &mut [u8]) -> crate::Result<()> {
        if let Some(count) = self.point_count {
            if self.current_point >= count {
                return Err(LasZipError::UserIndexError {
                    index: self.current_point,
                    count,
                });
            }
        }

        if self.chunk_points_read == self.num_points_in_chunk {
            self.current_chunk += 1;
            self.reset_for_new_chunk()?;
        }

        self.record_decompressor.decompress_next(out)?;
        self.chunk_points_read += 1;
        self.current_point += 1;

        if self.chunk_points_read == 1 {
            self.num_points_in_chunk = self.points_in_current_chunk();
        }
        Ok(())
    }

    /// Decompress as many points as the `out` slice can hold
    ///
    /// # Note
    ///
    /// If the `out` slice contains more space than there are points
    /// the function will still try to decompress them and an error will occur
    pub fn decompress_many(&mut self, out: &mut [u8]) -> crate::Result<()> {
        let point_size = self.vlr.items_size() as usize;
        if out.len() % point_size != 0 {
            return Err(LasZipError::BufferLenNotMultipleOfPointSize {
                buffer_len: out.len(),
                point_size,
            });
        }
        for point in out.chunks_exact_mut(point_size) {
            self.decompress_one(point)?;
        }
        Ok(())
    }

    /// Seeks to the point designed by the index,
    /// the next point decompressed will be that one.
    ///
    /// # Important
    ///
    /// Seeking in compressed data has a higher cost than non compressed data
    /// because the stream has to be moved to the start of the chunk
    /// and then we have to decompress points in the chunk until we reach the
    /// one we want.
    pub fn seek(&mut self, point_idx: u64) -> crate::Result<()> {
        if let Some(count) = self.point_count {
            if point_idx >= count {
                return Err(LasZipError::UserIndexError {
                    index: point_idx,
                    count,
                });
            }
        }

        let (chunk_index, chunk_offset, first_point) = match &self.chunk_table {
            Some(chunk_table) => chunk_table.chunk_of_point(point_idx).ok_or_else(|| {
                let count = chunk_table
                    .into_iter()
                    .fold(0u64, |count, entry| count.saturating_add(entry.point_count));
                LasZipError::UserIndexError {
                    index: point_idx,
                    count,
                }
            })?,
            None => (0, 0, 0),
        };
        debug!(
            "seeking to point {} in chunk {} (starts at point {})",
            point_idx, chunk_index, first_point
        );

        let data_start = self.data_start;
        self.get_mut()
            .seek(SeekFrom::Start(data_start + chunk_offset))?;
        self.current_chunk = chunk_index;
        self.current_point = first_point;
        self.reset_for_new_chunk()?;

        let mut tmp_out = vec![0u8; self.record_decompressor.record_size()];
        for _ in first_point..point_idx {
            self.decompress_one(&mut tmp_out)?;
        }
        Ok(())
    }

    /// Returns the vlr used.
    pub fn vlr(&self) -> &LazVlr {
        &self.vlr
    }

    /// Returns the chunk table, if one was found
    pub fn chunk_table(&self) -> Option<&ChunkTable> {
        self.chunk_table.as_ref()
    }

    /// Consumes the decompressor and returns the data source.
    pub fn into_inner(self) -> R {
        self.record_decompressor.box_into_inner()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.record_decompressor.get_mut()
    }

    /// Returns a reference to the data source.
    pub fn get(&self) -> &R {
        self.record_decompressor.get()
    }

    /// Number of points of the chunk being decompressed,
    /// only known once its first point was read.
    fn points_in_current_chunk(&self) -> u64 {
        match (self.record_decompressor.record_count(), &self.chunk_table) {
            (Some(count), _) => count,
            (None, Some(chunk_table)) => chunk_table
                .as_ref()
                .get(self.current_chunk)
                .map_or(u64::MAX, |entry| entry.point_count),
            (None, None) => self.vlr.points_per_chunk().unwrap_or(u64::MAX),
        }
    }

    fn reset_for_new_chunk(&mut self) -> crate::Result<()> {
        if let Some(chunk_table) = &self.chunk_table {
            if self.current_chunk >= chunk_table.len() {
                // all the chunks were read
                return Err(LasZipError::UserIndexError {
                    index: self.current_point,
                    count: self.current_point,
                });
            }
        }
        debug!("starting chunk {}", self.current_chunk);
        self.chunk_points_read = 0;
        self.num_points_in_chunk = u64::MAX;
        details::reset_record_decompressor(&mut *self.record_decompressor, &self.vlr)
    }
}

impl<'a, R: Read + Seek + Send + 'a> super::LazDecompressor for LasZipDecompressor<'a, R> {
    fn decompress_one(&mut self, point: &mut [u8]) -> crate::Result<()> {
        LasZipDecompressor::decompress_one(self, point)
    }

    fn decompress_many(&mut self, points: &mut [u8]) -> crate::Result<()> {
        LasZipDecompressor::decompress_many(self, points)
    }

    fn seek(&mut self, index: u64) -> crate::Result<()> {
        LasZipDecompressor::seek(self, index)
    }
}

/// Decompresses all points from the buffer
///
/// The `compressed_points_data` slice must contain all the laszip data
/// that means:
///   1) The offset to the chunk table (i64)
///   2) the compressed points
///   3) the chunk table (optional)
///
/// This fn will decompress as many points as the `decompressed_points` can hold.
///
/// # Important
///
/// In a LAZ file, the chunk table offset is counted from the start of the
/// LAZ file. Here since we only have the buffer points data, you must make
/// sure the offset is counted since the start of point data.
pub fn decompress_buffer(
    compressed_points_data: &[u8],
    decompressed_points: &mut [u8],
    laz_vlr: LazVlr,
) -> crate::Result<()> {
    let src = std::io::Cursor::new(compressed_points_data);
    let mut decompressor = LasZipDecompressor::new(src, laz_vlr)?;
    decompressor.decompress_many(decompressed_points)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;
    use crate::laszip::{LasZipCompressor, LazItemRecordBuilder, LazItemType, LazVlrBuilder};

    fn compress(vlr: &LazVlr, points: &[u8]) -> Vec<u8> {
        let mut compressor =
            LasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();
        compressor.compress_many(points).unwrap();
        compressor.done().unwrap();
        compressor.into_inner().into_inner()
    }

    fn gps_points(count: usize) -> Vec<u8> {
        (0..count)
            .flat_map(|i| (i as f64 * 0.25).to_le_bytes().to_vec())
            .collect()
    }

    #[test]
    fn test_declared_point_count() {
        let vlr = LazVlrBuilder::from_laz_items(
            LazItemRecordBuilder::new()
                .add_item(LazItemType::GpsTime)
                .build(),
        )
        .with_chunk_size(4)
        .build();
        let points = gps_points(10);
        let data = compress(&vlr, &points);

        let mut decompressor = LasZipDecompressor::new(Cursor::new(data), vlr)
            .unwrap()
            .with_point_count(10);
        assert!(matches!(
            decompressor.seek(10),
            Err(LasZipError::UserIndexError {
                index: 10,
                count: 10
            })
        ));
        decompressor.seek(9).unwrap();
        let mut out = [0u8; 8];
        decompressor.decompress_one(&mut out).unwrap();
        assert_eq!(&out, &points[72..80]);
        assert!(matches!(
            decompressor.decompress_one(&mut out),
            Err(LasZipError::UserIndexError {
                index: 10,
                count: 10
            })
        ));
        // the stream state is unaffected
        decompressor.seek(3).unwrap();
        decompressor.decompress_one(&mut out).unwrap();
        assert_eq!(&out, &points[24..32]);
    }

    #[test]
    fn test_seek_without_chunk_table() {
        let vlr = LazVlrBuilder::from_laz_items(
            LazItemRecordBuilder::new()
                .add_item(LazItemType::GpsTime)
                .build(),
        )
        .with_chunk_size(3)
        .build();
        let points = gps_points(8);
        let mut data = compress(&vlr, &points);
        // forget about the chunk table
        data[..8].copy_from_slice(&(-1i64).to_le_bytes());
        let len = data.len();
        data[len - 8..].copy_from_slice(&(-1i64).to_le_bytes());

        let mut decompressor = LasZipDecompressor::new(Cursor::new(data), vlr).unwrap();
        assert!(decompressor.chunk_table().is_none());
        decompressor.seek(7).unwrap();
        let mut out = [0u8; 8];
        decompressor.decompress_one(&mut out).unwrap();
        assert_eq!(&out, &points[56..]);
    }

    #[test]
    fn test_variable_chunks_need_a_table() {
        let vlr = LazVlrBuilder::from_laz_items(
            LazItemRecordBuilder::new()
                .add_item(LazItemType::Point10)
                .build(),
        )
        .with_variable_chunk_size()
        .build();
        let data = (-1i64).to_le_bytes().to_vec();
        assert!(matches!(
            LasZipDecompressor::new(Cursor::new(data), vlr),
            Err(LasZipError::MissingChunkTable)
        ));
    }

    #[test]
    fn test_reading_after_last_chunk() {
        let vlr = LazVlrBuilder::from_laz_items(
            LazItemRecordBuilder::new()
                .add_item(LazItemType::Byte14(4))
                .build(),
        )
        .with_chunk_size(2)
        .build();
        let points = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let data = compress(&vlr, &points);

        let mut decompressor = LasZipDecompressor::new(Cursor::new(data), vlr).unwrap();
        let mut out = [0u8; 12];
        decompressor.decompress_many(&mut out).unwrap();
        assert_eq!(out, points);
        let mut one = [0u8; 4];
        assert!(matches!(
            decompressor.decompress_one(&mut one),
            Err(LasZipError::UserIndexError { index: 3, count: 3 })
        ));
    }
}
