#![cfg(feature = "parallel")]
mod common;

use std::io::Cursor;

use laz_codec::{
    decompress_buffer, par_compress_buffer, par_decompress_buffer, LazItemRecordBuilder, LazVlr,
    LazVlrBuilder, ParLasZipCompressor,
};

use common::{compress, PointGenerator};

#[test]
fn test_parallel_round_trip_all_formats() {
    common::init_logger();
    for point_format_id in 0..=10 {
        let items = LazItemRecordBuilder::default_for_point_format_id(point_format_id, 2).unwrap();
        let points = PointGenerator::new(items.clone(), 61).points(900);
        let vlr = LazVlrBuilder::from_laz_items(items)
            .with_chunk_size(128)
            .build();

        let mut compressed = Cursor::new(Vec::<u8>::new());
        par_compress_buffer(&mut compressed, &points, &vlr).unwrap();
        let compressed = compressed.into_inner();
        assert_eq!(compressed, compress(&vlr, &points));

        let mut sequentially = vec![0u8; points.len()];
        decompress_buffer(&compressed, &mut sequentially, vlr.clone()).unwrap();
        let mut in_parallel = vec![0u8; points.len()];
        par_decompress_buffer(&compressed, &mut in_parallel, &vlr).unwrap();
        assert_eq!(sequentially, points);
        assert_eq!(in_parallel, points);
    }
}

#[test]
fn test_parallel_compressor_in_several_calls() {
    let items = LazItemRecordBuilder::default_for_point_format_id(8, 0).unwrap();
    let mut generator = PointGenerator::new(items.clone(), 67);
    let point_size = generator.point_size();
    let points = generator.points(1_000);
    let vlr = LazVlrBuilder::from_laz_items(items)
        .with_chunk_size(300)
        .build();

    let mut compressor = ParLasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();
    for part in points.chunks(170 * point_size) {
        compressor.compress_many(part).unwrap();
    }
    let counts: Vec<u64> = compressor
        .done()
        .unwrap()
        .into_iter()
        .map(|entry| entry.point_count)
        .collect();
    assert_eq!(counts, vec![300, 300, 300, 100]);
    let compressed = compressor.into_inner().into_inner();
    assert_eq!(compressed, compress(&vlr, &points));

    let mut out = vec![0u8; points.len()];
    par_decompress_buffer(&compressed, &mut out, &vlr).unwrap();
    assert_eq!(out, points);
}

#[test]
fn test_parallel_decompression_of_a_prefix() {
    let items = LazItemRecordBuilder::default_for_point_format_id(1, 0).unwrap();
    let points = PointGenerator::new(items.clone(), 71).points(100);
    let vlr = LazVlrBuilder::from_laz_items(items)
        .with_chunk_size(LazVlr::UNBOUNDED_CHUNK_SIZE)
        .build();
    let compressed = compress(&vlr, &points);

    let mut out = vec![0u8; 40 * 28];
    par_decompress_buffer(&compressed, &mut out, &vlr).unwrap();
    assert_eq!(&out[..], &points[..40 * 28]);
}
