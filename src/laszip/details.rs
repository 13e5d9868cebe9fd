use std::io::{Read, Write};

use crate::laszip::{CompressorType, LazVlr};
use crate::record::{
    LayeredPointRecordCompressor, LayeredPointRecordDecompressor, RawPointRecordCompressor,
    RawPointRecordDecompressor, RecordCompressor, RecordDecompressor,
    SequentialPointRecordCompressor, SequentialPointRecordDecompressor,
};
use crate::LasZipError;

pub(super) fn record_decompressor_from_vlr<'a, R: Read + Send + 'a>(
    vlr: &LazVlr,
    input: R,
) -> crate::Result<Box<dyn RecordDecompressor<R> + Send + 'a>> {
    let first_item = vlr.items().first().ok_or(LasZipError::EmptyItemList)?;

    let mut decompressor = match (vlr.compressor(), first_item.version) {
        (CompressorType::None, _) => Box::new(RawPointRecordDecompressor::new(input))
            as Box<dyn RecordDecompressor<R> + Send + 'a>,
        (_, 1) | (_, 2) => Box::new(SequentialPointRecordDecompressor::new(input))
            as Box<dyn RecordDecompressor<R> + Send + 'a>,
        (_, 3) | (_, 4) => Box::new(LayeredPointRecordDecompressor::new(input))
            as Box<dyn RecordDecompressor<R> + Send + 'a>,
        (_, version) => {
            return Err(LasZipError::VersionMismatch {
                item_type: first_item.item_type,
                version,
            });
        }
    };

    decompressor.set_fields_from(vlr.items())?;
    Ok(decompressor)
}

pub(super) fn record_compressor_from_vlr<'a, W: Write + Send + 'a>(
    vlr: &LazVlr,
    output: W,
) -> crate::Result<Box<dyn RecordCompressor<W> + Send + 'a>> {
    let first_item = vlr.items().first().ok_or(LasZipError::EmptyItemList)?;

    let mut compressor = match (vlr.compressor(), first_item.version) {
        (CompressorType::None, _) => Box::new(RawPointRecordCompressor::new(output))
            as Box<dyn RecordCompressor<W> + Send + 'a>,
        (_, 1) | (_, 2) => Box::new(SequentialPointRecordCompressor::new(output))
            as Box<dyn RecordCompressor<W> + Send + 'a>,
        (_, 3) | (_, 4) => Box::new(LayeredPointRecordCompressor::new(output))
            as Box<dyn RecordCompressor<W> + Send + 'a>,
        (_, version) => {
            return Err(LasZipError::VersionMismatch {
                item_type: first_item.item_type,
                version,
            });
        }
    };
    compressor.set_fields_from(vlr.items())?;
    Ok(compressor)
}

/// Resets the record decompressor so that it can start reading a new chunk
pub(super) fn reset_record_decompressor<R, D: RecordDecompressor<R> + ?Sized>(
    decompressor: &mut D,
    vlr: &LazVlr,
) -> crate::Result<()> {
    decompressor.reset();
    decompressor.set_fields_from(vlr.items())
}

/// Resets the record compressor so that it can start writing a new chunk
pub(super) fn reset_record_compressor<W, C: RecordCompressor<W> + ?Sized>(
    compressor: &mut C,
    vlr: &LazVlr,
) -> crate::Result<()> {
    compressor.reset();
    compressor.set_fields_from(vlr.items())
}
