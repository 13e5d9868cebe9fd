//! The chunk table: where each chunk starts and how many points it holds.
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::Index;
use std::slice::SliceIndex;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace};

use crate::compressors::IntegerCompressorBuilder;
use crate::decoders::ArithmeticDecoder;
use crate::decompressors::IntegerDecompressorBuilder;
use crate::encoders::ArithmeticEncoder;
use crate::laszip::LazVlr;
use crate::LasZipError;

const POINT_COUNT_CONTEXT: u32 = 0;
const BYTE_COUNT_CONTEXT: u32 = 1;

/// Describes one compressed chunk
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ChunkTableEntry {
    /// Number of points in the chunk
    pub point_count: u64,
    /// Number of bytes of the compressed chunk
    pub byte_count: u64,
}

/// Entries of all the chunks of a compressed point stream, in order.
///
/// Only variable-size chunks store the point count of each chunk,
/// for fixed-size chunks the count read back is the chunk size of the vlr
/// (`u64::MAX` when the whole stream is a single chunk), the last chunk
/// may hold fewer points.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct ChunkTable(Vec<ChunkTableEntry>);

impl ChunkTable {
    /// Size in bytes of the offset to the chunk table.
    ///
    /// These bytes are the very first ones of the compressed data.
    pub const OFFSET_SIZE: usize = std::mem::size_of::<i64>();

    /// Reads the chunk table from the source
    ///
    /// The source position **must** be at the start of the compressed data,
    /// that is on the offset to the chunk table.
    ///
    /// On success the source is left positioned on the first chunk.
    pub fn read_from<R: Read + Seek>(mut src: R, vlr: &LazVlr) -> crate::Result<Self> {
        let (data_start, chunk_table_start) =
            Self::read_offset(&mut src)?.ok_or(LasZipError::MissingChunkTable)?;
        src.seek(SeekFrom::Start(chunk_table_start))?;
        let contains_point_count = vlr.uses_variable_size_chunks();
        let mut chunk_table = Self::read(&mut src, contains_point_count)?;
        src.seek(SeekFrom::Start(data_start + Self::OFFSET_SIZE as u64))?;

        if !contains_point_count {
            let point_count = vlr.points_per_chunk().unwrap_or(u64::MAX);
            for entry in &mut chunk_table.0 {
                entry.point_count = point_count;
            }
        }
        debug!(
            "read chunk table of {} chunks at offset {}",
            chunk_table.len(),
            chunk_table_start
        );
        Ok(chunk_table)
    }

    /// Writes the chunk table to the `dst`.
    pub fn write_to<W: Write>(&self, mut dst: W, vlr: &LazVlr) -> std::io::Result<()> {
        debug!("writing chunk table of {} chunks", self.len());
        self.write(&mut dst, vlr.uses_variable_size_chunks())
    }

    /// Reads the offset to the chunk table.
    ///
    /// Returns the position of the start of the compressed data and the
    /// position of the chunk table.
    ///
    /// A writer that could not seek back leaves the offset unpatched (`-1`) and
    /// appends a copy of it after the chunk table, that copy is used as a fallback.
    fn read_offset<R: Read + Seek>(src: &mut R) -> std::io::Result<Option<(u64, u64)>> {
        let current_pos = src.seek(SeekFrom::Current(0))?;

        let mut offset_to_chunk_table = src.read_i64::<LittleEndian>()?;
        if offset_to_chunk_table <= current_pos as i64 {
            src.seek(SeekFrom::End(-(Self::OFFSET_SIZE as i64)))?;
            offset_to_chunk_table = src.read_i64::<LittleEndian>()?;
            trace!("trailing offset to chunk table: {}", offset_to_chunk_table);

            if offset_to_chunk_table <= current_pos as i64 {
                return Ok(None);
            }
        }

        Ok(Some((current_pos, offset_to_chunk_table as u64)))
    }

    /// Reads the entries, `src` must be positioned at the start of the chunk table.
    ///
    /// The `src` is left at the end of the chunk table.
    pub fn read<R: Read>(mut src: &mut R, contains_point_count: bool) -> std::io::Result<Self> {
        let _version = src.read_u32::<LittleEndian>()?;
        let number_of_chunks = src.read_u32::<LittleEndian>()?;

        let mut decompressor = IntegerDecompressorBuilder::new()
            .bits(32)
            .contexts(2)
            .build();
        let mut decoder = ArithmeticDecoder::new(&mut src);
        decoder.read_init_bytes()?;

        let mut chunk_table = ChunkTable::with_capacity(number_of_chunks as usize);
        let mut previous_entry = ChunkTableEntry::default();
        for _ in 0..number_of_chunks {
            let mut current_entry = ChunkTableEntry::default();
            if contains_point_count {
                current_entry.point_count = u64::from(decompressor.decompress(
                    &mut decoder,
                    previous_entry.point_count as i32,
                    POINT_COUNT_CONTEXT,
                )? as u32);
            }
            current_entry.byte_count = u64::from(decompressor.decompress(
                &mut decoder,
                previous_entry.byte_count as i32,
                BYTE_COUNT_CONTEXT,
            )? as u32);

            chunk_table.push(current_entry);
            previous_entry = current_entry;
        }
        Ok(chunk_table)
    }

    fn write<W: Write>(&self, mut dst: &mut W, write_point_count: bool) -> std::io::Result<()> {
        dst.write_u32::<LittleEndian>(0)?;
        dst.write_u32::<LittleEndian>(self.len() as u32)?;

        let mut encoder = ArithmeticEncoder::new(&mut dst);
        let mut compressor = IntegerCompressorBuilder::new()
            .bits(32)
            .contexts(2)
            .build();

        let mut previous_entry = ChunkTableEntry::default();
        for current_entry in &self.0 {
            if write_point_count {
                compressor.compress(
                    &mut encoder,
                    previous_entry.point_count as i32,
                    current_entry.point_count as i32,
                    POINT_COUNT_CONTEXT,
                )?;
            }
            compressor.compress(
                &mut encoder,
                previous_entry.byte_count as i32,
                current_entry.byte_count as i32,
                BYTE_COUNT_CONTEXT,
            )?;
            previous_entry = *current_entry;
        }
        encoder.done()?;
        Ok(())
    }

    /// Returns the index of the chunk containing the point at `point_index`,
    /// the byte offset of that chunk relative to the first chunk and
    /// the index of the first point of that chunk.
    ///
    /// Returns `None` if the point is after the last chunk.
    pub fn chunk_of_point(&self, point_index: u64) -> Option<(usize, u64, u64)> {
        let mut first_point = 0u64;
        let mut offset = 0u64;
        for (i, entry) in self.0.iter().enumerate() {
            if point_index - first_point < entry.point_count {
                return Some((i, offset, first_point));
            }
            first_point = first_point.saturating_add(entry.point_count);
            offset += entry.byte_count;
        }
        None
    }

    /// Absolute position of the start of each chunk,
    /// given the position of the first one.
    pub fn chunk_starts(&self, first_chunk_pos: u64) -> Vec<u64> {
        self.0
            .iter()
            .scan(first_chunk_pos, |pos, entry| {
                let start = *pos;
                *pos += entry.byte_count;
                Some(start)
            })
            .collect()
    }

    /// Sum of the bytes of all chunks
    pub fn compressed_size(&self) -> u64 {
        self.0.iter().map(|entry| entry.byte_count).sum()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, entry: ChunkTableEntry) {
        self.0.push(entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extend(&mut self, other: &ChunkTable) {
        self.0.extend(&other.0)
    }
}

impl AsRef<[ChunkTableEntry]> for ChunkTable {
    fn as_ref(&self) -> &[ChunkTableEntry] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a ChunkTable {
    type Item = &'a ChunkTableEntry;
    type IntoIter = std::slice::Iter<'a, ChunkTableEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<I> Index<I> for ChunkTable
where
    I: SliceIndex<[ChunkTableEntry]>,
{
    type Output = <I as SliceIndex<[ChunkTableEntry]>>::Output;

    fn index(&self, index: I) -> &Self::Output {
        &self.0[index]
    }
}

/// Writes the current position of `dst` (which must be the start of the chunk table)
/// as the offset to the chunk table located at `offset_pos`.
///
/// The position of the destination is left untouched.
pub(super) fn update_chunk_table_offset<W: Write + Seek>(
    dst: &mut W,
    offset_pos: SeekFrom,
) -> std::io::Result<()> {
    let start_of_chunk_table_pos = dst.seek(SeekFrom::Current(0))?;
    dst.seek(offset_pos)?;
    dst.write_i64::<LittleEndian>(start_of_chunk_table_pos as i64)?;
    dst.seek(SeekFrom::Start(start_of_chunk_table_pos))?;
    Ok(())
}
