mod common;

use std::io::Cursor;

use laz_codec::{
    CompressorType, LasZipCompressor, LasZipDecompressor, LasZipError, LazItem,
    LazItemRecordBuilder, LazItemType, LazVlr, LazVlrBuilder,
};

use common::{compress, PointGenerator};

fn pointwise_vlr(point_format_id: u8) -> LazVlr {
    LazVlrBuilder::from_laz_items(
        LazItemRecordBuilder::default_for_point_format_id(point_format_id, 0).unwrap(),
    )
    .with_compressor(CompressorType::PointWise)
    .build()
}

#[test]
fn test_truncated_stream_is_exhausted() {
    let vlr = pointwise_vlr(1);
    let points = PointGenerator::new(vlr.items().to_vec(), 51).points(200);
    let compressed = compress(&vlr, &points);
    let truncated = &compressed[..compressed.len() / 2];

    let mut decompressor = LasZipDecompressor::new(Cursor::new(truncated), vlr).unwrap();
    let mut out = vec![0u8; points.len()];
    assert!(matches!(
        decompressor.decompress_many(&mut out),
        Err(LasZipError::StreamExhausted)
    ));
}

#[test]
fn test_truncated_layered_chunk_is_exhausted() {
    let items = LazItemRecordBuilder::default_for_point_format_id(7, 0).unwrap();
    let points = PointGenerator::new(items.clone(), 53).points(100);
    let vlr = LazVlr::from_laz_items(items);
    let compressed = compress(&vlr, &points);

    // keep the offset to a table that is no longer there
    let data_len = compressed.len() / 2;
    let mut truncated = compressed[..data_len].to_vec();
    truncated[..8].copy_from_slice(&(data_len as i64 + 100).to_le_bytes());
    assert!(matches!(
        LasZipDecompressor::new(Cursor::new(truncated), vlr),
        Err(LasZipError::StreamExhausted)
    ));
}

#[test]
fn test_corrupted_stream_never_panics() {
    let vlr = pointwise_vlr(3);
    let points = PointGenerator::new(vlr.items().to_vec(), 57).points(300);
    let compressed = compress(&vlr, &points);

    let mut detected = 0;
    for position in (40..compressed.len() - 40).step_by(97) {
        let mut corrupted = compressed.clone();
        corrupted[position] ^= 0x5A;

        let mut decompressor =
            LasZipDecompressor::new(Cursor::new(corrupted), vlr.clone()).unwrap();
        let mut out = vec![0u8; points.len()];
        match decompressor.decompress_many(&mut out) {
            Err(LasZipError::StreamCorruption { .. }) | Err(LasZipError::StreamExhausted) => {
                detected += 1
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(()) if out != points => detected += 1,
            Ok(()) => {}
        }
    }
    assert!(detected > 0);
}

#[test]
fn test_version_mismatch() {
    let mismatched = [
        LazItem::new(LazItemType::Point10, 3),
        LazItem::new(LazItemType::Point14, 2),
        LazItem::new(LazItemType::RGB12, 4),
        LazItem::new(LazItemType::GpsTime, 5),
    ];
    for item in &mismatched {
        let vlr = LazVlr::from_laz_items(vec![*item]);
        match LasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()) {
            Err(LasZipError::VersionMismatch { item_type, version }) => {
                assert_eq!(item_type, item.item_type());
                assert_eq!(version, item.version());
            }
            other => panic!("expected a version mismatch, got {:?}", other.err()),
        }

        // no chunk table, the items are checked before any point is read
        let data = (-1i64).to_le_bytes().to_vec();
        match LasZipDecompressor::new(Cursor::new(data), vlr) {
            Err(LasZipError::VersionMismatch { item_type, version }) => {
                assert_eq!(item_type, item.item_type());
                assert_eq!(version, item.version());
            }
            other => panic!("expected a version mismatch, got {:?}", other.err()),
        }
    }
}

#[test]
fn test_items_of_different_versions() {
    // v2 items are sequential, v3 items layered, they cannot be mixed
    let items = vec![
        LazItem::new(LazItemType::Point14, 3),
        LazItem::new(LazItemType::RGB14, 2),
    ];
    let vlr = LazVlr::from_laz_items(items);
    assert!(matches!(
        LasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr),
        Err(LasZipError::VersionMismatch {
            item_type: LazItemType::RGB14,
            version: 2
        })
    ));
}

#[test]
fn test_unsupported_point_format() {
    assert!(matches!(
        LazItemRecordBuilder::default_for_point_format_id(11, 0),
        Err(LasZipError::UnsupportedPointFormat(11))
    ));
}

#[test]
fn test_buffer_not_multiple_of_point_size() {
    let vlr = LazVlr::from_laz_items(
        LazItemRecordBuilder::default_for_point_format_id(0, 0).unwrap(),
    );
    let mut compressor = LasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr).unwrap();
    assert!(matches!(
        compressor.compress_many(&[0u8; 30]),
        Err(LasZipError::BufferLenNotMultipleOfPointSize {
            buffer_len: 30,
            point_size: 20
        })
    ));
}

#[test]
fn test_unknown_vlr_contents() {
    let vlr = LazVlr::from_laz_items(
        LazItemRecordBuilder::default_for_point_format_id(1, 0).unwrap(),
    );
    let mut record_data = Vec::new();
    vlr.write_to(&mut record_data).unwrap();
    assert_eq!(LazVlr::from_buffer(&record_data).unwrap().items(), vlr.items());

    let mut bad_compressor = record_data.clone();
    bad_compressor[0] = 7;
    assert!(matches!(
        LazVlr::from_buffer(&bad_compressor),
        Err(LasZipError::UnknownCompressorType(7))
    ));
}
