//! Compression & decompression of chunks using multiple threads.
//!
//! Chunks share no state, each one is handled by its own record (de)compressor.
use std::io::{Cursor, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;
use rayon::prelude::*;

use crate::byteslice::{ChunksIrregular, ChunksIrregularMut};
use crate::laszip::chunk_table::{update_chunk_table_offset, ChunkTable, ChunkTableEntry};
use crate::laszip::details::{record_compressor_from_vlr, record_decompressor_from_vlr};
use crate::laszip::{CompressorType, LazVlr};
use crate::LasZipError;

/// LasZip compressor that compresses using multiple threads
///
/// This supports both **variable-size** and **fixed-size** chunks.
/// The method you need to call in order to compress data depends on which
/// type of *sized* chunks you want to write.
///
/// It's the [`LazVlr`] that controls which type of chunks you want to write.
///
/// You must call [`done`] when you have compressed all the points you wanted.
///
/// # Fixed-Size
///
/// Use [`compress_many`]
///
/// This works by forming complete chunks of points with the points
/// data passed when [`compress_many`] is called. These complete chunks are
/// compressed & written right away and points that are 'leftovers' are kept until
/// the next call to [`compress_many`] or [`done`].
///
/// With an unbounded chunk size all the points are kept until [`done`].
///
/// # Variable-Size
///
/// Use [`compress_chunks`]
///
/// [`compress_many`]: Self::compress_many
/// [`compress_chunks`]: Self::compress_chunks
/// [`done`]: Self::done
pub struct ParLasZipCompressor<W> {
    vlr: LazVlr,
    /// Table of chunks written so far
    chunk_table: ChunkTable,
    /// Position of the offset to the chunk table
    table_offset: Option<u64>,
    /// Points that do not form a complete chunk yet
    rest: Vec<u8>,
    dest: W,
}

impl<W: Write + Seek + Send> ParLasZipCompressor<W> {
    /// Creates a new ParLasZipCompressor
    ///
    /// No i/o operation are performed
    pub fn new(dest: W, vlr: LazVlr) -> crate::Result<Self> {
        check_is_chunked(&vlr)?;
        // fails early on unsupported items
        record_compressor_from_vlr(&vlr, std::io::sink())?;

        let mut rest = Vec::<u8>::new();
        if let Some(num_bytes) = vlr.num_bytes_in_decompressed_chunk() {
            rest.reserve(num_bytes as usize);
        }

        Ok(Self {
            vlr,
            chunk_table: ChunkTable::default(),
            table_offset: None,
            rest,
            dest,
        })
    }

    /// Reserves and prepares the offset to chunk table that will be
    /// updated when [`done`] is called.
    ///
    /// This method will automatically be called on the first point(s) being compressed.
    ///
    /// [`done`]: Self::done
    pub fn reserve_offset_to_chunk_table(&mut self) -> std::io::Result<()> {
        debug_assert!(self.table_offset.is_none());
        self.table_offset = Some(self.dest.seek(SeekFrom::Current(0))?);
        self.dest.write_i64::<LittleEndian>(-1)
    }

    /// Compresses many points using multiple threads.
    ///
    /// # Important
    ///
    /// This **must** be called **only** when writing **fixed-size** or unbounded chunks.
    ///
    /// # Note
    ///
    /// For this function to actually use multiple threads, the `points`
    /// buffer shall hold more points that the vlr's `chunk_size`.
    pub fn compress_many(&mut self, points: &[u8]) -> crate::Result<()> {
        debug_assert!(!self.vlr.uses_variable_size_chunks());
        let point_size = self.vlr.items_size() as usize;
        check_buffer_len(points.len(), point_size)?;
        if self.table_offset.is_none() {
            self.reserve_offset_to_chunk_table()?;
        }

        let chunk_size_in_bytes = match self.vlr.num_bytes_in_decompressed_chunk() {
            Some(num_bytes) => num_bytes as usize,
            None => {
                self.rest.extend_from_slice(points);
                return Ok(());
            }
        };
        debug_assert!(self.rest.len() < chunk_size_in_bytes);
        let mut compressible_buf = points;

        if !self.rest.is_empty() {
            // Try to complete our rest buffer to form a complete chunk
            let missing_bytes = chunk_size_in_bytes - self.rest.len();
            let num_bytes_to_copy = missing_bytes.min(compressible_buf.len());
            self.rest
                .extend_from_slice(&compressible_buf[..num_bytes_to_copy]);

            if self.rest.len() < chunk_size_in_bytes {
                return Ok(());
            }

            let compressed = compress_one_chunk(&self.rest, &self.vlr)?;
            self.dest.write_all(&compressed)?;
            self.chunk_table.push(ChunkTableEntry {
                point_count: (self.rest.len() / point_size) as u64,
                byte_count: compressed.len() as u64,
            });
            self.rest.clear();

            compressible_buf = &compressible_buf[num_bytes_to_copy..]
        }

        // Bytes which do not form a complete chunk go into the rest.
        let num_excess_bytes = compressible_buf.len() % chunk_size_in_bytes;
        let (compressible_buf, excess_bytes) =
            compressible_buf.split_at(compressible_buf.len() - num_excess_bytes);
        self.rest.extend_from_slice(excess_bytes);

        if !compressible_buf.is_empty() {
            let chunk_table = par_compress(&mut self.dest, compressible_buf, &self.vlr)?;
            self.chunk_table.extend(&chunk_table);
        }
        Ok(())
    }

    /// Compresses multiple chunks using multiple threads.
    ///
    /// # Important
    ///
    /// This **must** be called **only** when writing **variable-size** chunks.
    pub fn compress_chunks<Chunks, Item>(&mut self, chunks: Chunks) -> crate::Result<()>
    where
        Item: AsRef<[u8]> + Send,
        Chunks: IntoParallelIterator<Item = Item>,
    {
        debug_assert!(self.vlr.uses_variable_size_chunks());
        debug_assert!(self.rest.is_empty());
        if self.table_offset.is_none() {
            self.reserve_offset_to_chunk_table()?;
        }
        let chunk_table = par_compress_chunks(&mut self.dest, chunks, &self.vlr)?;
        self.chunk_table.extend(&chunk_table);
        Ok(())
    }

    /// Tells the compressor that no more points will be compressed
    ///
    /// - Compresses & writes the rest of the points to form the last chunk
    /// - Writes the chunk table
    /// - update the offset to the chunk_table
    pub fn done(&mut self) -> crate::Result<&ChunkTable> {
        if self.table_offset.is_none() {
            self.reserve_offset_to_chunk_table()?;
        }
        if !self.rest.is_empty() {
            let compressed = compress_one_chunk(&self.rest, &self.vlr)?;
            self.dest.write_all(&compressed)?;
            self.chunk_table.push(ChunkTableEntry {
                point_count: (self.rest.len() as u64) / self.vlr.items_size(),
                byte_count: compressed.len() as u64,
            });
            self.rest.clear();
        }

        let table_offset = self.table_offset.unwrap_or_default();
        update_chunk_table_offset(&mut self.dest, SeekFrom::Start(table_offset))?;
        self.chunk_table.write_to(&mut self.dest, &self.vlr)?;
        Ok(&self.chunk_table)
    }

    pub fn vlr(&self) -> &LazVlr {
        &self.vlr
    }

    pub fn into_inner(self) -> W {
        self.dest
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.dest
    }

    pub fn get(&self) -> &W {
        &self.dest
    }
}

impl<W: Write + Seek + Send> super::LazCompressor for ParLasZipCompressor<W> {
    fn compress_one(&mut self, point: &[u8]) -> crate::Result<()> {
        ParLasZipCompressor::compress_many(self, point)
    }

    fn compress_many(&mut self, points: &[u8]) -> crate::Result<()> {
        ParLasZipCompressor::compress_many(self, points)
    }

    fn reserve_offset_to_chunk_table(&mut self) -> crate::Result<()> {
        ParLasZipCompressor::reserve_offset_to_chunk_table(self)?;
        Ok(())
    }

    fn done(&mut self) -> crate::Result<()> {
        ParLasZipCompressor::done(self)?;
        Ok(())
    }
}

/// Compresses all points in parallel
///
/// Just like [`compress_buffer`] but the compression is done in multiple threads,
/// the data written is the same.
///
/// [`compress_buffer`]: crate::compress_buffer
pub fn par_compress_buffer<W: Write + Seek>(
    dst: &mut W,
    uncompressed_points: &[u8],
    laz_vlr: &LazVlr,
) -> crate::Result<()> {
    check_is_chunked(laz_vlr)?;
    check_buffer_len(uncompressed_points.len(), laz_vlr.items_size() as usize)?;
    let start_pos = dst.seek(SeekFrom::Current(0))?;
    dst.write_i64::<LittleEndian>(-1)?;

    let chunk_table = par_compress(dst, uncompressed_points, laz_vlr)?;

    update_chunk_table_offset(dst, SeekFrom::Start(start_pos))?;
    chunk_table.write_to(dst, laz_vlr)?;
    Ok(())
}

/// Compresses the points contained in `uncompressed_points` writing the result in the `dst`
/// and returns the table of the chunks written
///
/// Neither writes the offset to the chunk table nor the chunk table.
pub fn par_compress<W: Write>(
    dst: &mut W,
    uncompressed_points: &[u8],
    laz_vlr: &LazVlr,
) -> crate::Result<ChunkTable> {
    debug_assert!(!laz_vlr.uses_variable_size_chunks());
    let point_size = laz_vlr.items_size() as usize;
    let chunk_size_in_bytes = laz_vlr
        .num_bytes_in_decompressed_chunk()
        .map_or(uncompressed_points.len(), |num_bytes| num_bytes as usize)
        .max(point_size);

    let all_slices = uncompressed_points.par_chunks(chunk_size_in_bytes);
    par_compress_chunks(dst, all_slices, laz_vlr)
}

fn par_compress_chunks<W, Chunks, Item>(
    dst: &mut W,
    chunks: Chunks,
    laz_vlr: &LazVlr,
) -> crate::Result<ChunkTable>
where
    W: Write,
    Item: AsRef<[u8]> + Send,
    Chunks: IntoParallelIterator<Item = Item>,
{
    let chunks = chunks
        .into_par_iter()
        .map(|data| {
            let slc = data.as_ref();
            compress_one_chunk(slc, laz_vlr).map(|compressed| (slc.len(), compressed))
        })
        .collect::<Vec<crate::Result<(usize, Vec<u8>)>>>();

    let mut chunk_table = ChunkTable::with_capacity(chunks.len());
    let point_size = laz_vlr.items_size() as usize;
    for chunk_result in chunks {
        let (input_size, compressed_data) = chunk_result?;
        chunk_table.push(ChunkTableEntry {
            point_count: (input_size / point_size) as u64,
            byte_count: compressed_data.len() as u64,
        });
        dst.write_all(&compressed_data)?;
    }
    debug!("compressed {} chunks in parallel", chunk_table.len());
    Ok(chunk_table)
}

fn compress_one_chunk(chunk_data: &[u8], vlr: &LazVlr) -> crate::Result<Vec<u8>> {
    check_buffer_len(chunk_data.len(), vlr.items_size() as usize)?;
    let mut output = Vec::<u8>::new();
    {
        let mut compressor = record_compressor_from_vlr(vlr, &mut output)?;
        for point in chunk_data.chunks_exact(vlr.items_size() as usize) {
            compressor.compress_next(point)?;
        }
        compressor.done()?;
    }
    Ok(output)
}

/// Decompresses all points from the buffer using multiple threads
///
/// Just like [`decompress_buffer`], the chunk table must be present in the data.
///
/// [`decompress_buffer`]: crate::decompress_buffer
pub fn par_decompress_buffer(
    compressed_points_data: &[u8],
    decompressed_points: &mut [u8],
    laz_vlr: &LazVlr,
) -> crate::Result<()> {
    check_is_chunked(laz_vlr)?;
    let point_size = laz_vlr.items_size() as usize;
    check_buffer_len(decompressed_points.len(), point_size)?;

    let mut cursor = Cursor::new(compressed_points_data);
    let chunk_table = ChunkTable::read_from(&mut cursor, laz_vlr)?;

    let data_start = ChunkTable::OFFSET_SIZE;
    let data_end = data_start + chunk_table.compressed_size() as usize;
    let compressed_points = compressed_points_data
        .get(data_start..data_end)
        .ok_or(LasZipError::StreamExhausted)?;

    // The point count of the last fixed-size chunk is not known,
    // it gets whatever the output has left
    let mut remaining = decompressed_points.len();
    let output_sizes: Vec<usize> = chunk_table
        .into_iter()
        .map(|entry| {
            let size = (entry.point_count as usize)
                .saturating_mul(point_size)
                .min(remaining);
            remaining -= size;
            size
        })
        .collect();
    if remaining != 0 {
        let num_points = ((decompressed_points.len() - remaining) / point_size) as u64;
        return Err(LasZipError::UserIndexError {
            index: num_points,
            count: num_points,
        });
    }

    par_decompress(
        compressed_points,
        decompressed_points,
        laz_vlr,
        &chunk_table,
        &output_sizes,
    )
}

/// `compressed_points` must contains only the bytes of the chunks
/// (so no offset, no chunk_table)
fn par_decompress(
    compressed_points: &[u8],
    decompressed_points: &mut [u8],
    laz_vlr: &LazVlr,
    chunk_table: &ChunkTable,
    output_sizes: &[usize],
) -> crate::Result<()> {
    let point_size = laz_vlr.items_size() as usize;
    let input_sizes = chunk_table
        .into_iter()
        .map(|entry| entry.byte_count as usize);
    let input_chunks_iter = ChunksIrregular::new(compressed_points, input_sizes);
    let output_chunks_iter =
        ChunksIrregularMut::new(decompressed_points, output_sizes.iter().copied());

    let decompression_jobs: Vec<(&[u8], &mut [u8])> = input_chunks_iter
        .zip(output_chunks_iter)
        .filter(|(_, chunk_out)| !chunk_out.is_empty())
        .collect();
    debug!("decompressing {} chunks in parallel", decompression_jobs.len());
    decompression_jobs
        .into_par_iter()
        .map(|(chunk_in, chunk_out)| {
            let mut decompressor = record_decompressor_from_vlr(laz_vlr, Cursor::new(chunk_in))?;
            for point in chunk_out.chunks_exact_mut(point_size) {
                decompressor.decompress_next(point)?;
            }
            Ok(())
        })
        .collect::<crate::Result<()>>()
}

fn check_is_chunked(vlr: &LazVlr) -> crate::Result<()> {
    match vlr.compressor() {
        CompressorType::PointWise => Err(LasZipError::UnsupportedCompressorType(
            CompressorType::PointWise,
        )),
        _ => Ok(()),
    }
}

fn check_buffer_len(buffer_len: usize, point_size: usize) -> crate::Result<()> {
    if buffer_len % point_size != 0 {
        Err(LasZipError::BufferLenNotMultipleOfPointSize {
            buffer_len,
            point_size,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::laszip::{LasZipCompressor, LazItemRecordBuilder, LazItemType, LazVlrBuilder};

    fn vlr_with_chunk_size(chunk_size: u32) -> LazVlr {
        LazVlrBuilder::from_laz_items(
            LazItemRecordBuilder::new()
                .add_item(LazItemType::Point10)
                .add_item(LazItemType::GpsTime)
                .build(),
        )
        .with_chunk_size(chunk_size)
        .build()
    }

    fn points(count: usize) -> Vec<u8> {
        (0..count * 28).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_table_offset_one_point() {
        let vlr = vlr_with_chunk_size(50);
        let point = vec![0u8; vlr.items_size() as usize];
        let mut compressor = ParLasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr).unwrap();
        assert_eq!(compressor.table_offset, None);
        compressor.compress_many(&point).unwrap();
        assert_eq!(compressor.table_offset, Some(0));
        assert_eq!(compressor.rest.len(), 28);
    }

    #[test]
    fn test_same_output_as_sequential() {
        for &chunk_size in &[1u32, 17, LazVlr::UNBOUNDED_CHUNK_SIZE] {
            let vlr = vlr_with_chunk_size(chunk_size);
            let points = points(100);

            let mut sequential = Cursor::new(Vec::<u8>::new());
            crate::laszip::compress_buffer(&mut sequential, &points, vlr.clone()).unwrap();

            let mut parallel = Cursor::new(Vec::<u8>::new());
            par_compress_buffer(&mut parallel, &points, &vlr).unwrap();
            assert_eq!(sequential.get_ref(), parallel.get_ref());

            let mut decompressed = vec![0u8; points.len()];
            par_decompress_buffer(parallel.get_ref(), &mut decompressed, &vlr).unwrap();
            assert_eq!(decompressed, points);
        }
    }

    #[test]
    fn test_compress_many_with_rest() {
        let vlr = vlr_with_chunk_size(10);
        let points = points(35);

        let mut compressor =
            ParLasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();
        compressor.compress_many(&points[..28 * 4]).unwrap();
        compressor.compress_many(&points[28 * 4..28 * 23]).unwrap();
        compressor.compress_many(&points[28 * 23..]).unwrap();
        let counts: Vec<u64> = compressor
            .done()
            .unwrap()
            .into_iter()
            .map(|e| e.point_count)
            .collect();
        assert_eq!(counts, vec![10, 10, 10, 5]);

        let mut expected = Cursor::new(Vec::<u8>::new());
        crate::laszip::compress_buffer(&mut expected, &points, vlr).unwrap();
        assert_eq!(compressor.get().get_ref(), expected.get_ref());
    }

    #[test]
    fn test_variable_size_chunks() {
        let vlr = vlr_with_chunk_size(LazVlr::VARIABLE_CHUNK_SIZE);
        let points = points(30);
        let chunks = vec![&points[..28 * 3], &points[28 * 3..28 * 20], &points[28 * 20..]];

        let mut compressor =
            ParLasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();
        compressor.compress_chunks(chunks.clone()).unwrap();
        compressor.done().unwrap();
        let parallel = compressor.into_inner().into_inner();

        let mut sequential = LasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();
        sequential.compress_chunks(chunks).unwrap();
        sequential.done().unwrap();
        assert_eq!(sequential.into_inner().into_inner(), parallel);

        let mut decompressed = vec![0u8; points.len()];
        par_decompress_buffer(&parallel, &mut decompressed, &vlr).unwrap();
        assert_eq!(decompressed, points);
    }

    #[test]
    fn test_output_larger_than_data() {
        let vlr = vlr_with_chunk_size(LazVlr::VARIABLE_CHUNK_SIZE);
        let points = points(4);
        let mut compressor =
            ParLasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();
        compressor.compress_chunks(vec![&points[..]]).unwrap();
        compressor.done().unwrap();
        let data = compressor.into_inner().into_inner();

        let mut decompressed = vec![0u8; 28 * 5];
        assert!(matches!(
            par_decompress_buffer(&data, &mut decompressed, &vlr),
            Err(LasZipError::UserIndexError { index: 4, count: 4 })
        ));
    }
}
