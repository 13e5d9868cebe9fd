//! Definitions of error related things.
//!
//! The arithmetic coding layer and the item codecs work with [`std::io::Result`],
//! a corrupted stream is reported there as an [`std::io::Error`] of kind
//! [`InvalidData`](std::io::ErrorKind::InvalidData) that wraps a [`CorruptedStream`].
//! Converting into [`LasZipError`] recovers the precise kind.

use crate::laszip::{CompressorType, LazItemType};
use std::fmt;
use std::io::ErrorKind;

/// Errors of this crate
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LasZipError {
    /// The byte source ran out in the middle of a decoding operation
    ///
    /// This usually means the data is truncated or that the chunk size
    /// given does not match the one used to compress.
    #[error("The compressed stream ended before all the expected data could be decoded")]
    StreamExhausted,
    /// A decoded value fell outside of the bounds the codec was configured with
    #[error("Compressed data is corrupted (while decoding {attribute})")]
    StreamCorruption { attribute: &'static str },
    /// The item and version combination is not implemented
    #[error("Item {item_type:?} with compression version: {version} is not supported")]
    VersionMismatch { item_type: LazItemType, version: u16 },
    /// The index of the point requested is out of the declared point count
    #[error("Point index {index} is out of bounds (point count is {count})")]
    UserIndexError { index: u64, count: u64 },
    /// The Laz item it not known
    #[error("Item with type code: {0} is unknown")]
    UnknownLazItem(u16),
    /// The type of compressor used is not known
    #[error("Compressor type {0} is not valid")]
    UnknownCompressorType(u16),
    /// The type of compressor exists but it is not supported
    #[error("Compressor type {0:?} is not supported")]
    UnsupportedCompressorType(CompressorType),
    /// A point record needs at least one item
    #[error("The list of LazItem is empty")]
    EmptyItemList,
    /// The point format id is not supported
    #[error("Point format {0} is not supported")]
    UnsupportedPointFormat(u8),
    #[error("The len of the buffer ({buffer_len}) is not a multiple of the point size {point_size}")]
    BufferLenNotMultipleOfPointSize {
        buffer_len: usize,
        point_size: usize,
    },
    /// The chunk table could not be found in the file
    /// and it is required for the operation.
    #[error("The chunk table could not be found")]
    MissingChunkTable,
    /// Wrapper around and io error from the std lib
    #[error("IoError: {0}")]
    IoError(std::io::Error),
}

impl From<std::io::Error> for LasZipError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::UnexpectedEof => LasZipError::StreamExhausted,
            ErrorKind::InvalidData => {
                let attribute = e
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<CorruptedStream>())
                    .map(|corrupted| corrupted.attribute);
                match attribute {
                    Some(attribute) => LasZipError::StreamCorruption { attribute },
                    None => LasZipError::IoError(e),
                }
            }
            _ => LasZipError::IoError(e),
        }
    }
}

/// Payload of the io errors raised by decoders when a decoded
/// value cannot possibly come from a valid stream.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CorruptedStream {
    pub attribute: &'static str,
}

impl fmt::Display for CorruptedStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "corrupted data while decoding {}", self.attribute)
    }
}

impl std::error::Error for CorruptedStream {}

/// Creates the io error reported when decoding `attribute` produced an impossible value.
pub(crate) fn corrupted(attribute: &'static str) -> std::io::Error {
    std::io::Error::new(ErrorKind::InvalidData, CorruptedStream { attribute })
}
