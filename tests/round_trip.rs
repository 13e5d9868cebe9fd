mod common;

use std::io::Cursor;

use laz_codec::las::point10::Point10;
use laz_codec::packers::Packable;
use laz_codec::{
    CompressorType, LasZipCompressor, LasZipDecompressor, LazItemRecordBuilder, LazItemType,
    LazVlr, LazVlrBuilder,
};

use common::{compress, decompress, first_mismatch, init_logger, PointGenerator};

const NUM_POINTS: usize = 1_200;

fn check_round_trip(point_format_id: u8, num_extra_bytes: u16, version: Option<u16>) {
    let mut items = LazItemRecordBuilder::new();
    items
        .add_items_of_point_format(point_format_id, num_extra_bytes)
        .unwrap();
    if let Some(version) = version {
        items.with_version(version);
    }
    let items = items.build();

    let mut generator = PointGenerator::new(items.clone(), u64::from(point_format_id));
    let point_size = generator.point_size();
    let points = generator.points(NUM_POINTS);

    for &chunk_size in &[1u32, 2, 17, 1_000, LazVlr::UNBOUNDED_CHUNK_SIZE] {
        let vlr = LazVlrBuilder::from_laz_items(items.clone())
            .with_chunk_size(chunk_size)
            .build();
        let compressed = compress(&vlr, &points);
        let decompressed = decompress(&vlr, &compressed, NUM_POINTS, point_size);
        assert_eq!(
            first_mismatch(&points, &decompressed, point_size),
            None,
            "point format {} with {} extra bytes, version {:?}, chunk size {}",
            point_format_id,
            num_extra_bytes,
            version,
            chunk_size
        );
    }
}

#[test]
fn test_round_trip_default_versions() {
    init_logger();
    for point_format_id in 0..=10 {
        check_round_trip(point_format_id, 0, None);
        check_round_trip(point_format_id, 5, None);
    }
}

#[test]
fn test_round_trip_version_1() {
    init_logger();
    for point_format_id in 0..=5 {
        check_round_trip(point_format_id, 3, Some(1));
    }
}

#[test]
fn test_round_trip_version_4() {
    init_logger();
    for point_format_id in 6..=10 {
        check_round_trip(point_format_id, 3, Some(4));
    }
}

#[test]
fn test_points_compress_smaller() {
    let items = LazItemRecordBuilder::default_for_point_format_id(3, 0).unwrap();
    let points = PointGenerator::new(items.clone(), 3).points(NUM_POINTS);
    let compressed = compress(&LazVlr::from_laz_items(items), &points);
    assert!(compressed.len() < points.len() / 2);
}

#[test]
fn test_compression_is_deterministic() {
    for &point_format_id in &[1u8, 8] {
        let items = LazItemRecordBuilder::default_for_point_format_id(point_format_id, 2).unwrap();
        let points = PointGenerator::new(items.clone(), 7).points(500);
        let vlr = LazVlrBuilder::from_laz_items(items)
            .with_chunk_size(100)
            .build();
        assert_eq!(compress(&vlr, &points), compress(&vlr, &points));
    }
}

#[test]
fn test_single_point() {
    for point_format_id in 0..=10 {
        let items = LazItemRecordBuilder::default_for_point_format_id(point_format_id, 1).unwrap();
        let mut generator = PointGenerator::new(items.clone(), 11);
        let point_size = generator.point_size();
        let point = generator.points(1);
        let vlr = LazVlr::from_laz_items(items);

        let compressed = compress(&vlr, &point);
        assert_eq!(decompress(&vlr, &compressed, 1, point_size), point);
    }
}

#[test]
fn test_two_points_of_a_scaled_cloud() {
    // Two points at (10, 20, 1) and (50, 60, 2) with a scale of 0.01
    let first = Point10 {
        x: 1_000,
        y: 2_000,
        z: 100,
        return_number: 1,
        number_of_returns_of_given_pulse: 1,
        ..Default::default()
    };
    let second = Point10 {
        x: 5_000,
        y: 6_000,
        z: 200,
        ..first
    };
    let mut points = vec![0u8; 40];
    first.pack_into(&mut points[..20]);
    second.pack_into(&mut points[20..]);

    for &version in &[1u16, 2] {
        let vlr = LazVlr::from_laz_items(
            LazItemRecordBuilder::new()
                .add_item(LazItemType::Point10)
                .with_version(version)
                .build(),
        );
        let compressed = compress(&vlr, &points);
        let decompressed = decompress(&vlr, &compressed, 2, 20);
        assert_eq!(Point10::unpack_from(&decompressed[..20]), first);
        assert_eq!(Point10::unpack_from(&decompressed[20..]), second);
    }
}

#[test]
fn test_extreme_gps_time_jumps() {
    let times = [
        0.0f64,
        1.0e-9,
        4.0e9,
        -4.0e9,
        f64::MAX,
        f64::MIN_POSITIVE,
        -0.0,
        1.5,
        1.5,
        1.500_000_1,
        f64::INFINITY,
        f64::NAN,
        12.0,
    ];
    let mut points = Vec::new();
    for _ in 0..20 {
        for time in &times {
            points.extend_from_slice(&time.to_le_bytes());
        }
    }
    let count = points.len() / 8;

    for items in vec![
        LazItemRecordBuilder::default_for_point_format_id(1, 0).unwrap(),
        LazItemRecordBuilder::default_for_point_format_id(6, 0).unwrap(),
        LazItemRecordBuilder::new()
            .add_item(LazItemType::GpsTime)
            .with_version(1)
            .build(),
    ] {
        let mut generator = PointGenerator::new(items.clone(), 5);
        let point_size = generator.point_size();
        let mut records = generator.points(count);
        // the gps time is always the last 8 bytes of these records
        for (record, time) in records
            .chunks_exact_mut(point_size)
            .zip(points.chunks_exact(8))
        {
            record[point_size - 8..].copy_from_slice(time);
        }

        let vlr = LazVlrBuilder::from_laz_items(items)
            .with_chunk_size(50)
            .build();
        let compressed = compress(&vlr, &records);
        let decompressed = decompress(&vlr, &compressed, count, point_size);
        assert_eq!(first_mismatch(&records, &decompressed, point_size), None);
    }
}

#[test]
fn test_chunks_are_independent() {
    let items = LazItemRecordBuilder::default_for_point_format_id(7, 0).unwrap();
    let points = PointGenerator::new(items.clone(), 21).points(300);
    let point_size = 36;

    let vlr = LazVlrBuilder::from_laz_items(items)
        .with_chunk_size(100)
        .build();
    let compressed = compress(&vlr, &points);

    // the last chunk alone decompresses like the last 100 points did
    let last = compress(&vlr, &points[200 * point_size..]);
    let mut decompressor = LasZipDecompressor::new(Cursor::new(&compressed), vlr.clone()).unwrap();
    let table = decompressor.chunk_table().unwrap().clone();
    assert_eq!(table.len(), 3);
    decompressor.seek(200).unwrap();
    let mut tail = vec![0u8; 100 * point_size];
    decompressor.decompress_many(&mut tail).unwrap();
    assert_eq!(&tail[..], &points[200 * point_size..]);
    assert_eq!(decompress(&vlr, &last, 100, point_size), tail);

    let starts = table.chunk_starts(8);
    let chunk_bytes = &compressed[starts[2] as usize..(starts[2] + table[2].byte_count) as usize];
    let last_chunk_bytes = &last[8..8 + table[2].byte_count as usize];
    assert_eq!(chunk_bytes, last_chunk_bytes);
}

#[test]
fn test_variable_size_chunks() {
    init_logger();
    for &point_format_id in &[3u8, 7, 10] {
        let items = LazItemRecordBuilder::default_for_point_format_id(point_format_id, 0).unwrap();
        let mut generator = PointGenerator::new(items.clone(), 13);
        let point_size = generator.point_size();
        let chunk_sizes = [1usize, 2, 3, 40, 5, 6, 5, 4, 3, 2, 1];
        let chunks: Vec<Vec<u8>> = chunk_sizes
            .iter()
            .map(|size| generator.points(*size))
            .collect();

        let vlr = LazVlrBuilder::from_laz_items(items)
            .with_variable_chunk_size()
            .build();
        let mut compressor =
            LasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();
        compressor.compress_chunks(&chunks).unwrap();
        let table = compressor.done().unwrap();
        let point_counts: Vec<usize> = table.into_iter().map(|e| e.point_count as usize).collect();
        assert_eq!(point_counts, chunk_sizes);
        let compressed = compressor.into_inner().into_inner();

        let mut decompressor = LasZipDecompressor::new(Cursor::new(compressed), vlr).unwrap();
        for chunk in &chunks {
            let mut out = vec![0u8; chunk.len()];
            decompressor.decompress_many(&mut out).unwrap();
            assert_eq!(&out, chunk);
        }
        let mut one = vec![0u8; point_size];
        assert!(decompressor.decompress_one(&mut one).is_err());
    }
}

#[test]
fn test_pointwise_compressor_has_no_chunk_table() {
    let items = LazItemRecordBuilder::default_for_point_format_id(1, 0).unwrap();
    let points = PointGenerator::new(items.clone(), 17).points(400);
    let vlr = LazVlrBuilder::from_laz_items(items)
        .with_compressor(CompressorType::PointWise)
        .build();

    let compressed = compress(&vlr, &points);
    let mut decompressor = LasZipDecompressor::new(Cursor::new(compressed), vlr).unwrap();
    assert!(decompressor.chunk_table().is_none());
    let mut out = vec![0u8; points.len()];
    decompressor.decompress_many(&mut out).unwrap();
    assert_eq!(out, points);
}

#[test]
fn test_uncompressed_records() {
    let items = LazItemRecordBuilder::default_for_point_format_id(2, 0).unwrap();
    let points = PointGenerator::new(items.clone(), 19).points(50);
    let vlr = LazVlrBuilder::from_laz_items(items)
        .with_compressor(CompressorType::None)
        .with_chunk_size(20)
        .build();

    let compressed = compress(&vlr, &points);
    // the records are stored as is, after the offset to the chunk table
    assert_eq!(&compressed[8..8 + points.len()], &points[..]);
    assert_eq!(decompress(&vlr, &compressed, 50, 26), points);
}

#[test]
fn test_trailing_chunk_table_offset() {
    let items = LazItemRecordBuilder::default_for_point_format_id(1, 0).unwrap();
    let points = PointGenerator::new(items.clone(), 23).points(100);
    let vlr = LazVlrBuilder::from_laz_items(items)
        .with_chunk_size(30)
        .build();

    let mut compressed = compress(&vlr, &points);
    let offset = compressed[..8].to_vec();
    // as left by a writer that could not seek back
    compressed[..8].copy_from_slice(&(-1i64).to_le_bytes());
    compressed.extend_from_slice(&offset);

    let mut decompressor = LasZipDecompressor::new(Cursor::new(compressed), vlr).unwrap();
    assert_eq!(decompressor.chunk_table().map(|t| t.len()), Some(4));
    decompressor.seek(95).unwrap();
    let mut out = vec![0u8; 5 * 28];
    decompressor.decompress_many(&mut out).unwrap();
    assert_eq!(&out[..], &points[95 * 28..]);
}

#[test]
fn test_single_point_stream_layout() {
    // (point format, layer sizes after the raw point, bytes of the coders)
    let layouts: [(u8, Vec<u8>, Vec<u8>); 2] = [
        // one arithmetic coder, flushed after the raw point
        (3, vec![], vec![1, 0, 0, 0]),
        // point count, 9 point layers where only xy & z are written, the color layer
        (
            7,
            [1u32, 4, 4, 0, 0, 0, 0, 0, 0, 0, 0]
                .iter()
                .flat_map(|size| size.to_le_bytes().to_vec())
                .collect(),
            vec![1, 0, 0, 0, 1, 0, 0, 0],
        ),
    ];

    for (point_format_id, layer_sizes, coders) in &layouts {
        let items = LazItemRecordBuilder::default_for_point_format_id(*point_format_id, 0).unwrap();
        let mut generator = PointGenerator::new(items.clone(), 13);
        let point_size = generator.point_size();
        let point = generator.points(1);
        let vlr = LazVlr::from_laz_items(items);

        let mut compressor = LasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr).unwrap();
        compressor.compress_many(&point).unwrap();
        let entries: Vec<(u64, u64)> = compressor
            .done()
            .unwrap()
            .into_iter()
            .map(|entry| (entry.point_count, entry.byte_count))
            .collect();
        let compressed = compressor.into_inner().into_inner();

        let chunk_len = point_size + layer_sizes.len() + coders.len();
        assert_eq!(entries, vec![(1, chunk_len as u64)]);

        let mut expected = ((8 + chunk_len) as i64).to_le_bytes().to_vec();
        expected.extend_from_slice(&point);
        expected.extend_from_slice(layer_sizes);
        expected.extend_from_slice(coders);
        // chunk table version & number of chunks
        expected.extend_from_slice(&[0, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(&compressed[..expected.len()], &expected[..]);
    }
}
