use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, trace};

use crate::laszip::chunk_table::{self, ChunkTable, ChunkTableEntry};
use crate::laszip::{details, CompressorType, LazItem, LazVlr};
use crate::record::RecordCompressor;
use crate::LasZipError;

/// Struct that handles the compression of the points into the given destination
///
/// This supports **fixed-size**, **variable-size** chunks, as well as
/// a single unbounded chunk. It's the [`LazVlr`] that controls which one is written.
///
/// # Fixed-Size & Unbounded
///
/// - Use [`compress_one`] and/or [`compress_many`].
/// - The compressor will take care of managing the chunking.
/// - Use [`done`] when you have compressed all the points you wanted.
///
/// # Variable-Size
///
/// - Use [`compress_one`] and/or [`compress_many`] to compress points.
/// - Use [`finish_current_chunk`] to close a chunk.
/// - Use [`done`] when you have compressed all the points you wanted.
///
/// Or
///
/// - Use [`compress_chunks`] to compress chunks.
/// - Use [`done`] when you have compressed all the points you wanted.
///
/// [`compress_one`]: Self::compress_one
/// [`compress_many`]: Self::compress_many
/// [`compress_chunks`]: Self::compress_chunks
/// [`finish_current_chunk`]: Self::finish_current_chunk
/// [`done`]: Self::done
pub struct LasZipCompressor<'a, W: Write + Send + 'a> {
    vlr: LazVlr,
    record_compressor: Box<dyn RecordCompressor<W> + Send + 'a>,
    /// Position of the offset to the chunk table,
    /// `None` until the first point (or a manual reservation)
    start_pos: Option<u64>,
    /// Table of chunks written so far
    chunk_table: ChunkTable,
    /// Entry for the chunk we are currently compressing
    current_chunk_entry: ChunkTableEntry,
    /// Position where the current chunk started
    chunk_start_pos: u64,
}

impl<'a, W: Write + Seek + Send + 'a> LasZipCompressor<'a, W> {
    /// Creates a compressor using the provided vlr.
    ///
    /// Fails with [`LasZipError::VersionMismatch`] if one of the items
    /// has a compression version that is not implemented.
    pub fn new(output: W, vlr: LazVlr) -> crate::Result<Self> {
        let record_compressor = details::record_compressor_from_vlr(&vlr, output)?;
        Ok(Self {
            vlr,
            record_compressor,
            start_pos: None,
            chunk_table: ChunkTable::default(),
            current_chunk_entry: ChunkTableEntry::default(),
            chunk_start_pos: 0,
        })
    }

    /// Creates a new LasZipCompressor using the items provided,
    /// with the default chunk size.
    pub fn from_laz_items(output: W, items: Vec<LazItem>) -> crate::Result<Self> {
        let vlr = LazVlr::from_laz_items(items);
        Self::new(output, vlr)
    }

    /// Compress the point and write the compressed data to the destination given when
    /// the compressor was constructed
    ///
    /// The data in the buffer is expected to be exactly
    /// as it would have been in a LAS File, that is:
    ///
    /// - The fields/dimensions are in the same order as in a LAS point record
    /// - The data in the buffer is in Little Endian order
    pub fn compress_one(&mut self, input: &[u8]) -> crate::Result<()> {
        if self.start_pos.is_none() {
            self.reserve_offset_to_chunk_table()?;
        }

        if let Some(points_per_chunk) = self.vlr.points_per_chunk() {
            if self.current_chunk_entry.point_count == points_per_chunk {
                self.finish_current_chunk_impl()?;
            }
        }

        self.record_compressor.compress_next(input)?;
        self.current_chunk_entry.point_count += 1;
        Ok(())
    }

    /// Compress all the points contained in the `input` slice
    pub fn compress_many(&mut self, input: &[u8]) -> crate::Result<()> {
        let point_size = self.vlr.items_size() as usize;
        if input.len() % point_size != 0 {
            return Err(LasZipError::BufferLenNotMultipleOfPointSize {
                buffer_len: input.len(),
                point_size,
            });
        }
        for point in input.chunks_exact(point_size) {
            self.compress_one(point)?;
        }
        Ok(())
    }

    /// Compresses multiple chunks, each item of `chunks` holding the points of one chunk
    ///
    /// # Important
    ///
    /// This **must** be called **only** when writing **variable-size** chunks.
    pub fn compress_chunks<Chunks, Item>(&mut self, chunks: Chunks) -> crate::Result<()>
    where
        Item: AsRef<[u8]>,
        Chunks: IntoIterator<Item = Item>,
    {
        debug_assert!(self.vlr.uses_variable_size_chunks());
        for chunk in chunks {
            self.compress_many(chunk.as_ref())?;
            self.finish_current_chunk_impl()?;
        }
        Ok(())
    }

    /// Must be called when you have compressed all your points.
    ///
    /// Closes the last chunk, writes the chunk table and
    /// patches the offset to it.
    ///
    /// Returns the table of the chunks written.
    pub fn done(&mut self) -> crate::Result<&ChunkTable> {
        if self.start_pos.is_none() {
            self.reserve_offset_to_chunk_table()?;
        }

        if self.vlr.compressor() == CompressorType::PointWise {
            // single chunk, the table is not part of the data
            if self.current_chunk_entry.point_count > 0 {
                self.record_compressor.done()?;
                self.update_chunk_table()?;
            }
            return Ok(&self.chunk_table);
        }

        self.finish_current_chunk_impl()?;
        let start_pos = self.start_pos.unwrap_or_default();
        let stream = self.record_compressor.get_mut();
        chunk_table::update_chunk_table_offset(stream, SeekFrom::Start(start_pos))?;
        self.chunk_table.write_to(stream, &self.vlr)?;
        Ok(&self.chunk_table)
    }

    /// Finishes the current chunk.
    ///
    /// All points compressed with the previous calls to [`compress_one`] and [`compress_many`]
    /// will form one chunk. And the subsequent calls to [`compress_one`] and [`compress_many`]
    /// will form a new chunk. Finishing a chunk without points does nothing.
    ///
    /// # Important
    ///
    /// Only call this when writing **variable-size** chunks.
    ///
    /// [`compress_one`]: Self::compress_one
    /// [`compress_many`]: Self::compress_many
    pub fn finish_current_chunk(&mut self) -> crate::Result<()> {
        debug_assert!(
            self.vlr.uses_variable_size_chunks(),
            "finish_current_chunk called on a compressor which is not in variable-size chunks mode"
        );
        self.finish_current_chunk_impl()
    }

    /// Reserves and prepares the offset to chunk table that will be
    /// updated when [`done`] is called.
    ///
    /// This method will automatically be called on the first point being compressed,
    /// but for some scenarios, manually calling this might be useful.
    ///
    /// [`done`]: Self::done
    pub fn reserve_offset_to_chunk_table(&mut self) -> std::io::Result<()> {
        debug_assert!(self.start_pos.is_none());
        let stream = self.record_compressor.get_mut();
        let start_pos = stream.seek(SeekFrom::Current(0))?;
        if self.vlr.compressor() != CompressorType::PointWise {
            stream.write_i64::<LittleEndian>(-1)?;
        }
        self.chunk_start_pos = stream.seek(SeekFrom::Current(0))?;
        self.start_pos = Some(start_pos);
        Ok(())
    }

    /// Returns the vlr used by this compressor
    pub fn vlr(&self) -> &LazVlr {
        &self.vlr
    }

    /// Returns the chunks written so far
    pub fn chunk_table(&self) -> &ChunkTable {
        &self.chunk_table
    }

    pub fn into_inner(self) -> W {
        self.record_compressor.box_into_inner()
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.record_compressor.get_mut()
    }

    pub fn get(&self) -> &W {
        self.record_compressor.get()
    }

    #[inline]
    fn update_chunk_table(&mut self) -> std::io::Result<()> {
        let current_pos = self
            .record_compressor
            .get_mut()
            .seek(SeekFrom::Current(0))?;
        self.current_chunk_entry.byte_count = current_pos - self.chunk_start_pos;
        self.chunk_start_pos = current_pos;
        self.chunk_table.push(self.current_chunk_entry);
        debug!(
            "chunk {} closed: {} points in {} bytes",
            self.chunk_table.len() - 1,
            self.current_chunk_entry.point_count,
            self.current_chunk_entry.byte_count
        );
        Ok(())
    }

    #[inline]
    fn finish_current_chunk_impl(&mut self) -> crate::Result<()> {
        if self.current_chunk_entry.point_count == 0 {
            trace!("no point in the current chunk, nothing to finish");
            return Ok(());
        }
        self.record_compressor.done()?;
        self.update_chunk_table()?;
        details::reset_record_compressor(&mut *self.record_compressor, &self.vlr)?;
        self.current_chunk_entry = ChunkTableEntry::default();
        Ok(())
    }
}

impl<'a, W: Write + Seek + Send + 'a> super::LazCompressor for LasZipCompressor<'a, W> {
    fn compress_one(&mut self, point: &[u8]) -> crate::Result<()> {
        LasZipCompressor::compress_one(self, point)
    }

    fn compress_many(&mut self, points: &[u8]) -> crate::Result<()> {
        LasZipCompressor::compress_many(self, points)
    }

    fn reserve_offset_to_chunk_table(&mut self) -> crate::Result<()> {
        LasZipCompressor::reserve_offset_to_chunk_table(self)?;
        Ok(())
    }

    fn done(&mut self) -> crate::Result<()> {
        LasZipCompressor::done(self)?;
        Ok(())
    }
}

/// Compresses all points
///
/// The data written will be a standard LAZ file data
/// that means its organized like this:
///  1) offset to the chunk_table (i64)
///  2) the points data compressed
///  3) the chunk table
///
/// `dst`: Where the compressed data will be written
///
/// `uncompressed_points`: byte slice of the uncompressed points to be compressed
pub fn compress_buffer<W: Write + Seek + Send>(
    dst: &mut W,
    uncompressed_points: &[u8],
    laz_vlr: LazVlr,
) -> crate::Result<()> {
    let mut compressor = LasZipCompressor::new(dst, laz_vlr)?;
    compressor.compress_many(uncompressed_points)?;
    compressor.done()?;
    Ok(())
}
