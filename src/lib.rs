//! Lossless compression of LAS point records, compatible with LASzip.
//!
//! [`LasZipCompressor`] and [`LasZipDecompressor`] are the two types
//! that user wishing to compress and / or decompress LAZ data should use.
//! What is compressed (the items of a point, their compression version and
//! the chunking) is described by the [`LazVlr`].
//!
//! # LasZipCompressor Examples
//!
//! ```
//! use laz_codec::{LasZipError, LasZipCompressor, LazItemType, LazItemRecordBuilder};
//!
//! # fn main() -> Result<(), LasZipError> {
//! // Here we use a Cursor but a std::fs::File will work just fine
//! let mut compressed_output = std::io::Cursor::new(vec![]);
//!
//! // LazItem may have multiple versions of the compression algorithm
//! // the builder selects a default one
//! let items = LazItemRecordBuilder::new()
//!             .add_item(LazItemType::Point10)
//!             .add_item(LazItemType::RGB12)
//!             .build();
//! let mut compressor = LasZipCompressor::from_laz_items(&mut compressed_output, items)?;
//!
//! let point = vec![0u8; 26];
//! compressor.compress_one(&point)?;
//! compressor.done()?; // don't forget to call done when you are...done compressing
//!
//! # Ok(())
//! # }
//! ```
//!
//! LasZipCompressors can also be constructed from a LazVlr if you need to change the chunk size
//! ```
//! use laz_codec::{LasZipError, LasZipCompressor, LazItemRecordBuilder, LazVlrBuilder};
//!
//! # fn main() -> Result<(), LasZipError> {
//! let mut compressed_output = std::io::Cursor::new(vec![]);
//! let items = LazItemRecordBuilder::default_for_point_format_id(7, 0)?;
//! let vlr = LazVlrBuilder::new()
//!           .with_laz_items(items)
//!           .with_chunk_size(5_000)
//!           .build();
//!
//! let mut compressor = LasZipCompressor::new(&mut compressed_output, vlr)?;
//!
//! let point = vec![0u8; 36];
//! compressor.compress_one(&point)?;
//! compressor.done()?;
//! # Ok(())
//! # }
//! ```
//!
//! # LasZipDecompressor Examples
//!
//! To create a [`LasZipDecompressor`] you need the same [`LazVlr`] that was used to compress,
//! in a LAZ file it is stored in the record_data of the LasZip VLR.
//!
//! ```
//! use laz_codec::{LasZipError, LazVlr, LasZipCompressor, LasZipDecompressor, LazItemRecordBuilder};
//! use std::io::Cursor;
//!
//! # fn main() -> Result<(), LasZipError> {
//! let vlr = LazVlr::from_laz_items(LazItemRecordBuilder::default_for_point_format_id(1, 0)?);
//! let points: Vec<u8> = (0..28 * 3).map(|i| i as u8).collect();
//!
//! let mut compressor = LasZipCompressor::new(Cursor::new(vec![]), vlr.clone())?;
//! compressor.compress_many(&points)?;
//! compressor.done()?;
//! let mut compressed = compressor.into_inner();
//! compressed.set_position(0);
//!
//! let mut decompressor = LasZipDecompressor::new(compressed, vlr)?.with_point_count(3);
//! let mut point = vec![0u8; 28];
//! decompressor.seek(2)?;
//! decompressor.decompress_one(&mut point)?;
//! assert_eq!(&point[..], &points[56..]);
//! # Ok(())
//! # }
//! ```
//!
//! # Parallelism
//!
//! This crates has an optional feature 'parallel'.
//! When using this feature, additional `par_` functions are exposed.
//!
//! - [`par_compress_buffer`]
//! - [`par_decompress_buffer`]
//!
//! [`par_compress_buffer`]: laszip/fn.par_compress_buffer.html
//! [`par_decompress_buffer`]: laszip/fn.par_decompress_buffer.html

pub(crate) mod compressors;
pub(crate) mod decoders;
pub(crate) mod decompressors;
pub(crate) mod encoders;
pub(crate) mod models;

#[cfg(feature = "parallel")]
mod byteslice;
pub mod errors;
pub mod las;
pub mod laszip;
pub mod packers;
pub mod record;

pub use errors::LasZipError;
pub use laszip::{compress_buffer, decompress_buffer};
#[cfg(feature = "parallel")]
pub use laszip::{par_compress_buffer, par_decompress_buffer, ParLasZipCompressor};
pub use laszip::{
    ChunkTable, ChunkTableEntry, CompressorType, LasZipCompressor, LasZipDecompressor,
    LazCompressor, LazDecompressor, LazItem, LazItemRecordBuilder, LazItemType, LazVlr,
    LazVlrBuilder,
};

pub type Result<T> = std::result::Result<T, LasZipError>;
