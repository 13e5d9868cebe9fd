//! Module with the important struct that people wishing
//! to compress or decompress LAZ data can use
//!
//! It defines the LasZipCompressor & LasZipDecompressor
//! as well as the LasZip Vlr data and how to build it
pub use chunk_table::{ChunkTable, ChunkTableEntry};
pub use compression::{compress_buffer, LasZipCompressor};
pub use decompression::{decompress_buffer, LasZipDecompressor};
#[cfg(feature = "parallel")]
pub use parallel::{par_compress, par_compress_buffer, par_decompress_buffer, ParLasZipCompressor};
pub use vlr::{CompressorType, LazItem, LazItemRecordBuilder, LazItemType, LazVlr, LazVlrBuilder};

mod chunk_table;
mod compression;
mod decompression;
mod details;
#[cfg(feature = "parallel")]
mod parallel;
mod vlr;

/// Common interface of the point decompressors
pub trait LazDecompressor {
    fn decompress_one(&mut self, point: &mut [u8]) -> crate::Result<()>;

    fn decompress_many(&mut self, points: &mut [u8]) -> crate::Result<()>;

    fn seek(&mut self, index: u64) -> crate::Result<()>;
}

/// Common interface of the sequential & parallel point compressors
pub trait LazCompressor {
    fn compress_one(&mut self, point: &[u8]) -> crate::Result<()>;

    fn compress_many(&mut self, points: &[u8]) -> crate::Result<()>;

    fn reserve_offset_to_chunk_table(&mut self) -> crate::Result<()>;

    fn done(&mut self) -> crate::Result<()>;
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    fn compress_with<C: LazCompressor>(mut compressor: C, points: &[u8], reserve: bool) -> C {
        if reserve {
            compressor.reserve_offset_to_chunk_table().unwrap();
        }
        compressor.compress_many(points).unwrap();
        compressor.done().unwrap();
        compressor
    }

    fn point10_vlr() -> LazVlr {
        LazVlr::from_laz_items(
            LazItemRecordBuilder::new()
                .add_item(LazItemType::Point10)
                .build(),
        )
    }

    #[test]
    fn test_manual_reserve() {
        let vlr = point10_vlr();
        let point = vec![0u8; vlr.items_size() as usize];
        let new_compressor =
            || LasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();

        let data1 = compress_with(new_compressor(), &point, false)
            .into_inner()
            .into_inner();
        let data2 = compress_with(new_compressor(), &point, true)
            .into_inner()
            .into_inner();
        assert_eq!(data1, data2);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_manual_reserve_par() {
        let vlr = point10_vlr();
        let point = vec![0u8; vlr.items_size() as usize];
        let new_compressor =
            || ParLasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();

        let data1 = compress_with(new_compressor(), &point, false)
            .into_inner()
            .into_inner();
        let data2 = compress_with(new_compressor(), &point, true)
            .into_inner()
            .into_inner();
        assert_eq!(data1, data2);
    }

    #[test]
    fn test_decompress_through_trait() {
        let vlr = point10_vlr();
        let points: Vec<u8> = (0..200u8).collect();
        let mut data = Cursor::new(Vec::<u8>::new());
        compress_buffer(&mut data, &points, vlr.clone()).unwrap();
        data.set_position(0);

        let mut decompressor: Box<dyn LazDecompressor> =
            Box::new(LasZipDecompressor::new(data, vlr).unwrap());
        let mut out = vec![0u8; 20];
        decompressor.seek(4).unwrap();
        decompressor.decompress_one(&mut out).unwrap();
        assert_eq!(&out[..], &points[80..100]);
        let mut rest = vec![0u8; 100];
        decompressor.decompress_many(&mut rest).unwrap();
        assert_eq!(&rest[..], &points[100..]);
    }
}
