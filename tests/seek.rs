mod common;

use std::io::Cursor;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use laz_codec::{LasZipDecompressor, LasZipError, LazItemRecordBuilder, LazVlr, LazVlrBuilder};

use common::{compress, init_logger, PointGenerator};

fn check_random_seeks(vlr: &LazVlr, points: &[u8], point_size: usize, seed: u64) {
    let count = (points.len() / point_size) as u64;
    let compressed = compress(vlr, points);
    let mut decompressor = LasZipDecompressor::new(Cursor::new(compressed), vlr.clone())
        .unwrap()
        .with_point_count(count);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut point = vec![0u8; point_size];
    for _ in 0..40 {
        let index = rng.random_range(0..count);
        decompressor.seek(index).unwrap();
        decompressor.decompress_one(&mut point).unwrap();
        let start = index as usize * point_size;
        assert_eq!(&point[..], &points[start..start + point_size], "point {}", index);

        // reading keeps going from there
        if index + 1 < count {
            decompressor.decompress_one(&mut point).unwrap();
            assert_eq!(&point[..], &points[start + point_size..start + 2 * point_size]);
        }
    }
}

#[test]
fn test_seek_fixed_size_chunks() {
    init_logger();
    for &point_format_id in &[0u8, 3, 5, 6, 8, 10] {
        let items = LazItemRecordBuilder::default_for_point_format_id(point_format_id, 2).unwrap();
        let mut generator = PointGenerator::new(items.clone(), 31);
        let point_size = generator.point_size();
        let points = generator.points(700);

        for &chunk_size in &[1u32, 50, 333, LazVlr::UNBOUNDED_CHUNK_SIZE] {
            let vlr = LazVlrBuilder::from_laz_items(items.clone())
                .with_chunk_size(chunk_size)
                .build();
            check_random_seeks(&vlr, &points, point_size, u64::from(chunk_size));
        }
    }
}

#[test]
fn test_seek_variable_size_chunks() {
    for &point_format_id in &[1u8, 7] {
        let items = LazItemRecordBuilder::default_for_point_format_id(point_format_id, 0).unwrap();
        let mut generator = PointGenerator::new(items.clone(), 37);
        let point_size = generator.point_size();
        let chunk_sizes = [10usize, 1, 120, 33, 2, 90];
        let chunks: Vec<Vec<u8>> = chunk_sizes.iter().map(|n| generator.points(*n)).collect();
        let points = chunks.concat();

        let vlr = LazVlrBuilder::from_laz_items(items)
            .with_variable_chunk_size()
            .build();
        let mut compressor =
            laz_codec::LasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();
        compressor.compress_chunks(&chunks).unwrap();
        compressor.done().unwrap();
        let compressed = compressor.into_inner().into_inner();

        let mut decompressor = LasZipDecompressor::new(Cursor::new(compressed), vlr).unwrap();
        let mut point = vec![0u8; point_size];
        let mut first_of_chunk = 0;
        for size in &chunk_sizes {
            // the first and last point of each chunk
            for &index in &[first_of_chunk, first_of_chunk + size - 1] {
                decompressor.seek(index as u64).unwrap();
                decompressor.decompress_one(&mut point).unwrap();
                assert_eq!(
                    &point[..],
                    &points[index * point_size..(index + 1) * point_size]
                );
            }
            first_of_chunk += size;
        }

        let total = chunk_sizes.iter().sum::<usize>() as u64;
        match decompressor.seek(total) {
            Err(LasZipError::UserIndexError { index, count }) => {
                assert_eq!(index, total);
                assert_eq!(count, total);
            }
            other => panic!("expected an index error, got {:?}", other.err()),
        }
    }
}

#[test]
fn test_seek_then_read_everything() {
    let items = LazItemRecordBuilder::default_for_point_format_id(9, 0).unwrap();
    let mut generator = PointGenerator::new(items.clone(), 41);
    let point_size = generator.point_size();
    let points = generator.points(250);
    let vlr = LazVlrBuilder::from_laz_items(items)
        .with_chunk_size(60)
        .build();
    let compressed = compress(&vlr, &points);

    let mut decompressor = LasZipDecompressor::new(Cursor::new(compressed), vlr).unwrap();
    decompressor.seek(130).unwrap();
    decompressor.seek(0).unwrap();
    let mut out = vec![0u8; points.len()];
    decompressor.decompress_many(&mut out).unwrap();
    assert_eq!(out, points);
    assert_eq!(point_size, 59);
}

#[test]
fn test_seek_beyond_declared_count() {
    let items = LazItemRecordBuilder::default_for_point_format_id(0, 0).unwrap();
    let points = PointGenerator::new(items.clone(), 43).points(30);
    let vlr = LazVlr::from_laz_items(items);
    let compressed = compress(&vlr, &points);

    let mut decompressor = LasZipDecompressor::new(Cursor::new(compressed), vlr)
        .unwrap()
        .with_point_count(30);
    assert!(matches!(
        decompressor.seek(30),
        Err(LasZipError::UserIndexError {
            index: 30,
            count: 30
        })
    ));
    assert!(matches!(
        decompressor.seek(u64::MAX),
        Err(LasZipError::UserIndexError { .. })
    ));
    decompressor.seek(29).unwrap();
    let mut point = [0u8; 20];
    decompressor.decompress_one(&mut point).unwrap();
    assert_eq!(&point[..], &points[29 * 20..]);
}
