//! Record (de)compressors: they orchestrate the field codecs of a point
//! for the duration of one chunk.
//!
//! There are three layouts for the data of a chunk:
//!
//! - *sequential* (item versions 1 & 2): the first point raw, then one arithmetic
//!   coded stream where the fields of each point follow each other.
//! - *layered* (item versions 3 & 4): the first point raw, the number of points,
//!   the size of each layer, then the layers. Each field splits its data in one or
//!   more layers, each coded with its own arithmetic coder.
//! - *raw*: points are stored uncompressed.
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::decoders::ArithmeticDecoder;
use crate::encoders::ArithmeticEncoder;
use crate::las;
use crate::laszip::{LazItem, LazItemType};
use crate::LasZipError;

/***************************************************************************************************
                    Decompression Related Traits
***************************************************************************************************/

/// Decompressor of one field of a point, for sequential chunks
pub trait FieldDecompressor<R: Read> {
    fn size_of_field(&self) -> usize;

    fn decompress_first(&mut self, src: &mut R, first_point: &mut [u8]) -> std::io::Result<()>;

    fn decompress_with(
        &mut self,
        decoder: &mut ArithmeticDecoder<R>,
        buf: &mut [u8],
    ) -> std::io::Result<()>;
}

/// Decompressor of one field of a point, for layered chunks
///
/// The `context` is the scanner channel of the current point, it is selected
/// by the point field and shared by all the fields of a record.
pub trait LayeredFieldDecompressor<R: Read> {
    fn size_of_field(&self) -> usize;

    fn init_first_point(
        &mut self,
        src: &mut R,
        first_point: &mut [u8],
        context: &mut usize,
    ) -> std::io::Result<()>;

    fn decompress_field_with(
        &mut self,
        current_point: &mut [u8],
        context: &mut usize,
    ) -> std::io::Result<()>;

    fn read_layers_sizes(&mut self, src: &mut R) -> std::io::Result<()>;

    fn read_layers(&mut self, src: &mut R) -> std::io::Result<()>;
}

pub trait RecordDecompressor<R> {
    /// Creates the field decompressors for the items.
    ///
    /// Fails with [`LasZipError::VersionMismatch`] if one of the item
    /// is not supported by this layout.
    fn set_fields_from(&mut self, laz_items: &[LazItem]) -> crate::Result<()>;

    fn record_size(&self) -> usize;

    /// Number of points in the current chunk, if the layout stores it
    fn record_count(&self) -> Option<u64>;

    fn decompress_next(&mut self, out: &mut [u8]) -> std::io::Result<()>;

    /// Prepares for a new chunk, the fields must be set again.
    fn reset(&mut self);

    fn get_mut(&mut self) -> &mut R;

    fn get(&self) -> &R;

    fn box_into_inner(self: Box<Self>) -> R;
}

/***************************************************************************************************
                    Record Decompressors implementations
***************************************************************************************************/

/// The Points data is organized as follow:
///
/// 1) 1 Raw Point (as per ASPRS LAS definition)
/// 2) n compressed Points
pub struct SequentialPointRecordDecompressor<'a, R: Read> {
    field_decompressors: Vec<Box<dyn FieldDecompressor<R> + Send + 'a>>,
    decoder: ArithmeticDecoder<R>,
    is_first_decompression: bool,
    record_size: usize,
}

impl<'a, R: Read> SequentialPointRecordDecompressor<'a, R> {
    pub fn new(input: R) -> Self {
        Self {
            field_decompressors: vec![],
            decoder: ArithmeticDecoder::new(input),
            is_first_decompression: true,
            record_size: 0,
        }
    }

    pub fn add_field_decompressor<T: FieldDecompressor<R> + Send + 'a>(&mut self, field: T) {
        self.record_size += field.size_of_field();
        self.field_decompressors.push(Box::new(field));
    }

    pub fn decompress(&mut self, out: &mut [u8]) -> std::io::Result<()> {
        let mut field_start = 0;
        if self.is_first_decompression {
            for field in &mut self.field_decompressors {
                let field_end = field_start + field.size_of_field();
                field.decompress_first(self.decoder.get_mut(), &mut out[field_start..field_end])?;
                field_start = field_end;
            }
            // the decoder needs to be told that it should read the
            // init bytes after the first record has been read
            self.decoder.read_init_bytes()?;
            self.is_first_decompression = false;
        } else {
            for field in &mut self.field_decompressors {
                let field_end = field_start + field.size_of_field();
                field.decompress_with(&mut self.decoder, &mut out[field_start..field_end])?;
                field_start = field_end;
            }
        }
        Ok(())
    }
}

impl<'a, R: Read + Send + 'a> RecordDecompressor<R> for SequentialPointRecordDecompressor<'a, R> {
    fn set_fields_from(&mut self, laz_items: &[LazItem]) -> crate::Result<()> {
        use las::{extra_bytes, gps, point10, rgb, wavepacket};
        for item in laz_items {
            match (item.item_type, item.version) {
                (LazItemType::Byte(count), 1) | (LazItemType::Byte(count), 2) => self
                    .add_field_decompressor(extra_bytes::v1::LasExtraByteDecompressor::new(
                        usize::from(count),
                    )),
                (LazItemType::Point10, 1) => {
                    self.add_field_decompressor(point10::v1::LasPoint10Decompressor::default())
                }
                (LazItemType::Point10, 2) => {
                    self.add_field_decompressor(point10::v2::LasPoint10Decompressor::default())
                }
                (LazItemType::GpsTime, 1) => {
                    self.add_field_decompressor(gps::v1::LasGpsTimeDecompressor::default())
                }
                (LazItemType::GpsTime, 2) => {
                    self.add_field_decompressor(gps::v2::LasGpsTimeDecompressor::default())
                }
                (LazItemType::RGB12, 1) => {
                    self.add_field_decompressor(rgb::v1::LasRGBDecompressor::default())
                }
                (LazItemType::RGB12, 2) => {
                    self.add_field_decompressor(rgb::v2::LasRGBDecompressor::default())
                }
                (LazItemType::WavePacket13, 1) | (LazItemType::WavePacket13, 2) => self
                    .add_field_decompressor(wavepacket::v1::LasWavepacketDecompressor::default()),
                (item_type, version) => {
                    return Err(LasZipError::VersionMismatch { item_type, version })
                }
            }
        }
        Ok(())
    }

    fn record_size(&self) -> usize {
        self.record_size
    }

    fn record_count(&self) -> Option<u64> {
        None
    }

    fn decompress_next(&mut self, out: &mut [u8]) -> std::io::Result<()> {
        self.decompress(out)
    }

    fn reset(&mut self) {
        self.decoder.reset();
        self.is_first_decompression = true;
        self.field_decompressors.clear();
        self.record_size = 0;
    }

    fn get_mut(&mut self) -> &mut R {
        self.decoder.get_mut()
    }

    fn get(&self) -> &R {
        self.decoder.get_ref()
    }

    fn box_into_inner(self: Box<Self>) -> R {
        self.decoder.into_inner()
    }
}

/// The Points data is organized in layers as follow:
///
/// 1) 1 Raw Point (as per ASPRS LAS definition)
/// 2) Number of points in the chunk (u32)
/// 3) Number of bytes for each layer of the chunk (u32 each)
/// 4) Data of the layers
pub struct LayeredPointRecordDecompressor<'a, R: Read> {
    field_decompressors: Vec<Box<dyn LayeredFieldDecompressor<R> + Send + 'a>>,
    input: R,
    is_first_decompression: bool,
    record_size: usize,
    record_count: Option<u64>,
    context: usize,
}

impl<'a, R: Read> LayeredPointRecordDecompressor<'a, R> {
    pub fn new(input: R) -> Self {
        Self {
            field_decompressors: vec![],
            input,
            is_first_decompression: true,
            record_size: 0,
            record_count: None,
            context: 0,
        }
    }

    pub fn add_field_decompressor<T: LayeredFieldDecompressor<R> + Send + 'a>(
        &mut self,
        field: T,
    ) {
        self.record_size += field.size_of_field();
        self.field_decompressors.push(Box::new(field));
    }

    pub fn decompress(&mut self, out: &mut [u8]) -> std::io::Result<()> {
        let mut field_start = 0;
        if self.is_first_decompression {
            for field in &mut self.field_decompressors {
                let field_end = field_start + field.size_of_field();
                field.init_first_point(
                    &mut self.input,
                    &mut out[field_start..field_end],
                    &mut self.context,
                )?;
                field_start = field_end;
            }

            let count = self.input.read_u32::<LittleEndian>()?;
            self.record_count = Some(u64::from(count));
            for field in &mut self.field_decompressors {
                field.read_layers_sizes(&mut self.input)?;
            }
            for field in &mut self.field_decompressors {
                field.read_layers(&mut self.input)?;
            }
            self.is_first_decompression = false;
        } else {
            for field in &mut self.field_decompressors {
                let field_end = field_start + field.size_of_field();
                field.decompress_field_with(&mut out[field_start..field_end], &mut self.context)?;
                field_start = field_end;
            }
        }
        Ok(())
    }
}

impl<'a, R: Read + Send + 'a> RecordDecompressor<R> for LayeredPointRecordDecompressor<'a, R> {
    fn set_fields_from(&mut self, laz_items: &[LazItem]) -> crate::Result<()> {
        use las::{extra_bytes, nir, point14, rgb, wavepacket};
        for item in laz_items {
            match (item.item_type, item.version) {
                (LazItemType::Point14, 3) => {
                    self.add_field_decompressor(point14::v3::LasPoint14Decompressor::default())
                }
                (LazItemType::Point14, 4) => {
                    self.add_field_decompressor(point14::v4::LasPoint14Decompressor::default())
                }
                (LazItemType::RGB14, 3) => {
                    self.add_field_decompressor(rgb::v3::LasRGBDecompressor::default())
                }
                (LazItemType::RGB14, 4) => {
                    self.add_field_decompressor(rgb::v4::LasRGBDecompressor::default())
                }
                (LazItemType::RGBNIR14, 3) => {
                    self.add_field_decompressor(rgb::v3::LasRGBDecompressor::default());
                    self.add_field_decompressor(nir::v3::LasNIRDecompressor::default());
                }
                (LazItemType::RGBNIR14, 4) => {
                    self.add_field_decompressor(rgb::v4::LasRGBDecompressor::default());
                    self.add_field_decompressor(nir::v4::LasNIRDecompressor::default());
                }
                (LazItemType::WavePacket14, 3) => self
                    .add_field_decompressor(wavepacket::v3::LasWavepacketDecompressor::default()),
                (LazItemType::WavePacket14, 4) => self
                    .add_field_decompressor(wavepacket::v4::LasWavepacketDecompressor::default()),
                (LazItemType::Byte14(count), 3) => self.add_field_decompressor(
                    extra_bytes::v3::LasExtraByteDecompressor::new(usize::from(count)),
                ),
                (LazItemType::Byte14(count), 4) => self.add_field_decompressor(
                    extra_bytes::v4::LasExtraByteDecompressor::new(usize::from(count)),
                ),
                (item_type, version) => {
                    return Err(LasZipError::VersionMismatch { item_type, version })
                }
            }
        }
        Ok(())
    }

    fn record_size(&self) -> usize {
        self.record_size
    }

    fn record_count(&self) -> Option<u64> {
        self.record_count
    }

    fn decompress_next(&mut self, out: &mut [u8]) -> std::io::Result<()> {
        self.decompress(out)
    }

    fn reset(&mut self) {
        self.is_first_decompression = true;
        self.field_decompressors.clear();
        self.record_size = 0;
        self.record_count = None;
        self.context = 0;
    }

    fn get_mut(&mut self) -> &mut R {
        &mut self.input
    }

    fn get(&self) -> &R {
        &self.input
    }

    fn box_into_inner(self: Box<Self>) -> R {
        self.input
    }
}

/// Points are stored as they are, without compression
pub struct RawPointRecordDecompressor<R: Read> {
    input: R,
    record_size: usize,
}

impl<R: Read> RawPointRecordDecompressor<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            record_size: 0,
        }
    }
}

impl<R: Read> RecordDecompressor<R> for RawPointRecordDecompressor<R> {
    fn set_fields_from(&mut self, laz_items: &[LazItem]) -> crate::Result<()> {
        self.record_size = laz_items.iter().map(|item| usize::from(item.size)).sum();
        Ok(())
    }

    fn record_size(&self) -> usize {
        self.record_size
    }

    fn record_count(&self) -> Option<u64> {
        None
    }

    fn decompress_next(&mut self, out: &mut [u8]) -> std::io::Result<()> {
        self.input.read_exact(&mut out[..self.record_size])
    }

    fn reset(&mut self) {}

    fn get_mut(&mut self) -> &mut R {
        &mut self.input
    }

    fn get(&self) -> &R {
        &self.input
    }

    fn box_into_inner(self: Box<Self>) -> R {
        self.input
    }
}

/***************************************************************************************************
                    Compression related Traits
***************************************************************************************************/

/// Compressor of one field of a point, for sequential chunks
pub trait FieldCompressor<W: Write> {
    fn size_of_field(&self) -> usize;

    fn compress_first(&mut self, dst: &mut W, buf: &[u8]) -> std::io::Result<()>;

    fn compress_with(
        &mut self,
        encoder: &mut ArithmeticEncoder<W>,
        buf: &[u8],
    ) -> std::io::Result<()>;
}

/// Compressor of one field of a point, for layered chunks
pub trait LayeredFieldCompressor<W: Write> {
    fn size_of_field(&self) -> usize;

    fn init_first_point(
        &mut self,
        dst: &mut W,
        first_point: &[u8],
        context: &mut usize,
    ) -> std::io::Result<()>;

    fn compress_field_with(
        &mut self,
        current_point: &[u8],
        context: &mut usize,
    ) -> std::io::Result<()>;

    fn write_layers_sizes(&mut self, dst: &mut W) -> std::io::Result<()>;

    fn write_layers(&mut self, dst: &mut W) -> std::io::Result<()>;
}

pub trait RecordCompressor<W> {
    /// Creates the field compressors for the items.
    ///
    /// Fails with [`LasZipError::VersionMismatch`] if one of the item
    /// is not supported by this layout.
    fn set_fields_from(&mut self, laz_items: &[LazItem]) -> crate::Result<()>;

    fn record_size(&self) -> usize;

    fn compress_next(&mut self, input: &[u8]) -> std::io::Result<()>;

    /// Writes everything that is still pending for the current chunk
    fn done(&mut self) -> std::io::Result<()>;

    /// Prepares for a new chunk, the fields must be set again.
    fn reset(&mut self);

    fn get_mut(&mut self) -> &mut W;

    fn get(&self) -> &W;

    fn box_into_inner(self: Box<Self>) -> W;
}

/***************************************************************************************************
                    Record Compressors implementations
***************************************************************************************************/

pub struct SequentialPointRecordCompressor<'a, W: Write> {
    is_first_compression: bool,
    field_compressors: Vec<Box<dyn FieldCompressor<W> + Send + 'a>>,
    encoder: ArithmeticEncoder<W>,
    record_size: usize,
}

impl<'a, W: Write> SequentialPointRecordCompressor<'a, W> {
    pub fn new(output: W) -> Self {
        Self {
            is_first_compression: true,
            field_compressors: vec![],
            encoder: ArithmeticEncoder::new(output),
            record_size: 0,
        }
    }

    pub fn add_field_compressor<T: FieldCompressor<W> + Send + 'a>(&mut self, field: T) {
        self.record_size += field.size_of_field();
        self.field_compressors.push(Box::new(field));
    }
}

impl<'a, W: Write + Send + 'a> RecordCompressor<W> for SequentialPointRecordCompressor<'a, W> {
    fn set_fields_from(&mut self, laz_items: &[LazItem]) -> crate::Result<()> {
        use las::{extra_bytes, gps, point10, rgb, wavepacket};
        for item in laz_items {
            match (item.item_type, item.version) {
                (LazItemType::Byte(count), 1) | (LazItemType::Byte(count), 2) => self
                    .add_field_compressor(extra_bytes::v1::LasExtraByteCompressor::new(
                        usize::from(count),
                    )),
                (LazItemType::Point10, 1) => {
                    self.add_field_compressor(point10::v1::LasPoint10Compressor::default())
                }
                (LazItemType::Point10, 2) => {
                    self.add_field_compressor(point10::v2::LasPoint10Compressor::default())
                }
                (LazItemType::GpsTime, 1) => {
                    self.add_field_compressor(gps::v1::LasGpsTimeCompressor::default())
                }
                (LazItemType::GpsTime, 2) => {
                    self.add_field_compressor(gps::v2::LasGpsTimeCompressor::default())
                }
                (LazItemType::RGB12, 1) => {
                    self.add_field_compressor(rgb::v1::LasRGBCompressor::default())
                }
                (LazItemType::RGB12, 2) => {
                    self.add_field_compressor(rgb::v2::LasRGBCompressor::default())
                }
                (LazItemType::WavePacket13, 1) | (LazItemType::WavePacket13, 2) => {
                    self.add_field_compressor(wavepacket::v1::LasWavepacketCompressor::default())
                }
                (item_type, version) => {
                    return Err(LasZipError::VersionMismatch { item_type, version })
                }
            }
        }
        Ok(())
    }

    fn record_size(&self) -> usize {
        self.record_size
    }

    fn compress_next(&mut self, input: &[u8]) -> std::io::Result<()> {
        let mut field_start = 0;
        if self.is_first_compression {
            for field in &mut self.field_compressors {
                let field_end = field_start + field.size_of_field();
                field.compress_first(self.encoder.get_mut(), &input[field_start..field_end])?;
                field_start = field_end;
            }
            self.is_first_compression = false;
        } else {
            for field in &mut self.field_compressors {
                let field_end = field_start + field.size_of_field();
                field.compress_with(&mut self.encoder, &input[field_start..field_end])?;
                field_start = field_end;
            }
        }
        Ok(())
    }

    fn done(&mut self) -> std::io::Result<()> {
        self.encoder.done()
    }

    fn reset(&mut self) {
        self.is_first_compression = true;
        self.encoder.reset();
        self.field_compressors.clear();
        self.record_size = 0;
    }

    fn get_mut(&mut self) -> &mut W {
        self.encoder.get_mut()
    }

    fn get(&self) -> &W {
        self.encoder.get_ref()
    }

    fn box_into_inner(self: Box<Self>) -> W {
        self.encoder.into_inner()
    }
}

pub struct LayeredPointRecordCompressor<'a, W: Write> {
    field_compressors: Vec<Box<dyn LayeredFieldCompressor<W> + Send + 'a>>,
    point_count: u32,
    record_size: usize,
    context: usize,
    dst: W,
}

impl<'a, W: Write> LayeredPointRecordCompressor<'a, W> {
    pub fn new(dst: W) -> Self {
        Self {
            field_compressors: vec![],
            point_count: 0,
            record_size: 0,
            context: 0,
            dst,
        }
    }

    pub fn add_field_compressor<T: LayeredFieldCompressor<W> + Send + 'a>(&mut self, field: T) {
        self.record_size += field.size_of_field();
        self.field_compressors.push(Box::new(field));
    }
}

impl<'a, W: Write + Send + 'a> RecordCompressor<W> for LayeredPointRecordCompressor<'a, W> {
    fn set_fields_from(&mut self, laz_items: &[LazItem]) -> crate::Result<()> {
        use las::{extra_bytes, nir, point14, rgb, wavepacket};
        for item in laz_items {
            match (item.item_type, item.version) {
                (LazItemType::Point14, 3) => {
                    self.add_field_compressor(point14::v3::LasPoint14Compressor::default())
                }
                (LazItemType::Point14, 4) => {
                    self.add_field_compressor(point14::v4::LasPoint14Compressor::default())
                }
                (LazItemType::RGB14, 3) => {
                    self.add_field_compressor(rgb::v3::LasRGBCompressor::default())
                }
                (LazItemType::RGB14, 4) => {
                    self.add_field_compressor(rgb::v4::LasRGBCompressor::default())
                }
                (LazItemType::RGBNIR14, 3) => {
                    self.add_field_compressor(rgb::v3::LasRGBCompressor::default());
                    self.add_field_compressor(nir::v3::LasNIRCompressor::default());
                }
                (LazItemType::RGBNIR14, 4) => {
                    self.add_field_compressor(rgb::v4::LasRGBCompressor::default());
                    self.add_field_compressor(nir::v4::LasNIRCompressor::default());
                }
                (LazItemType::WavePacket14, 3) => {
                    self.add_field_compressor(wavepacket::v3::LasWavepacketCompressor::default())
                }
                (LazItemType::WavePacket14, 4) => {
                    self.add_field_compressor(wavepacket::v4::LasWavepacketCompressor::default())
                }
                (LazItemType::Byte14(count), 3) => self.add_field_compressor(
                    extra_bytes::v3::LasExtraByteCompressor::new(usize::from(count)),
                ),
                (LazItemType::Byte14(count), 4) => self.add_field_compressor(
                    extra_bytes::v4::LasExtraByteCompressor::new(usize::from(count)),
                ),
                (item_type, version) => {
                    return Err(LasZipError::VersionMismatch { item_type, version })
                }
            }
        }
        Ok(())
    }

    fn record_size(&self) -> usize {
        self.record_size
    }

    fn compress_next(&mut self, point: &[u8]) -> std::io::Result<()> {
        let mut field_start = 0;
        if self.point_count == 0 {
            for field in &mut self.field_compressors {
                let field_end = field_start + field.size_of_field();
                field.init_first_point(
                    &mut self.dst,
                    &point[field_start..field_end],
                    &mut self.context,
                )?;
                field_start = field_end;
            }
        } else {
            for field in &mut self.field_compressors {
                let field_end = field_start + field.size_of_field();
                field.compress_field_with(&point[field_start..field_end], &mut self.context)?;
                field_start = field_end;
            }
        }
        self.point_count += 1;
        Ok(())
    }

    fn done(&mut self) -> std::io::Result<()> {
        if self.point_count > 0 {
            self.dst.write_u32::<LittleEndian>(self.point_count)?;
            for field in &mut self.field_compressors {
                field.write_layers_sizes(&mut self.dst)?;
            }
            for field in &mut self.field_compressors {
                field.write_layers(&mut self.dst)?;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.point_count = 0;
        self.record_size = 0;
        self.context = 0;
        self.field_compressors.clear();
    }

    fn get_mut(&mut self) -> &mut W {
        &mut self.dst
    }

    fn get(&self) -> &W {
        &self.dst
    }

    fn box_into_inner(self: Box<Self>) -> W {
        self.dst
    }
}

/// Writes points as they are
pub struct RawPointRecordCompressor<W: Write> {
    dst: W,
    record_size: usize,
}

impl<W: Write> RawPointRecordCompressor<W> {
    pub fn new(dst: W) -> Self {
        Self {
            dst,
            record_size: 0,
        }
    }
}

impl<W: Write> RecordCompressor<W> for RawPointRecordCompressor<W> {
    fn set_fields_from(&mut self, laz_items: &[LazItem]) -> crate::Result<()> {
        self.record_size = laz_items.iter().map(|item| usize::from(item.size)).sum();
        Ok(())
    }

    fn record_size(&self) -> usize {
        self.record_size
    }

    fn compress_next(&mut self, input: &[u8]) -> std::io::Result<()> {
        self.dst.write_all(&input[..self.record_size])
    }

    fn done(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn reset(&mut self) {}

    fn get_mut(&mut self) -> &mut W {
        &mut self.dst
    }

    fn get(&self) -> &W {
        &self.dst
    }

    fn box_into_inner(self: Box<Self>) -> W {
        self.dst
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;
    use crate::laszip::LazItemRecordBuilder;

    #[test]
    fn test_done_on_empty_sequential_record() {
        let mut compressor = SequentialPointRecordCompressor::new(Cursor::new(Vec::<u8>::new()));
        compressor.done().unwrap();
        let data = Box::new(compressor).box_into_inner().into_inner();
        assert_eq!(&data, &[1u8, 0u8, 0u8, 0u8]);
    }

    #[test]
    fn test_first_point_is_written_raw() {
        let items = LazItemRecordBuilder::new()
            .add_item(LazItemType::Byte(4))
            .build();
        let mut compressor = SequentialPointRecordCompressor::new(Cursor::new(Vec::<u8>::new()));
        compressor.set_fields_from(&items).unwrap();
        compressor.compress_next(&[17u8, 42u8, 35u8, 1u8]).unwrap();
        compressor.done().unwrap();

        let data = Box::new(compressor).box_into_inner().into_inner();
        assert_eq!(&data, &[17u8, 42u8, 35u8, 1u8, 1u8, 0u8, 0u8, 0u8]);
    }

    #[test]
    fn test_layered_rejects_sequential_items() {
        let items = LazItemRecordBuilder::new()
            .add_item(LazItemType::Point10)
            .build();
        let mut compressor = LayeredPointRecordCompressor::new(Cursor::new(Vec::<u8>::new()));
        let result = compressor.set_fields_from(&items);
        assert!(matches!(
            result,
            Err(LasZipError::VersionMismatch {
                item_type: LazItemType::Point10,
                version: 2
            })
        ));

        let mut decompressor = LayeredPointRecordDecompressor::new(Cursor::new(Vec::<u8>::new()));
        assert!(decompressor.set_fields_from(&items).is_err());
    }

    #[test]
    fn test_sequential_rejects_unknown_version() {
        let items = vec![LazItem::new(LazItemType::GpsTime, 3)];
        let mut decompressor =
            SequentialPointRecordDecompressor::new(Cursor::new(Vec::<u8>::new()));
        let result = decompressor.set_fields_from(&items);
        assert!(matches!(
            result,
            Err(LasZipError::VersionMismatch {
                item_type: LazItemType::GpsTime,
                version: 3
            })
        ));
    }

    #[test]
    fn test_raw_record_passthrough() {
        let items = LazItemRecordBuilder::new()
            .add_item(LazItemType::Point10)
            .add_item(LazItemType::GpsTime)
            .build();
        let points: Vec<u8> = (0..280).map(|i| (i % 251) as u8).collect();

        let mut compressor = RawPointRecordCompressor::new(Cursor::new(Vec::<u8>::new()));
        compressor.set_fields_from(&items).unwrap();
        assert_eq!(compressor.record_size(), 28);
        for point in points.chunks_exact(28) {
            compressor.compress_next(point).unwrap();
        }
        compressor.done().unwrap();
        let data = Box::new(compressor).box_into_inner().into_inner();
        assert_eq!(data, points);

        let mut decompressor = RawPointRecordDecompressor::new(Cursor::new(data));
        decompressor.set_fields_from(&items).unwrap();
        let mut out = vec![0u8; 28];
        decompressor.decompress_next(&mut out).unwrap();
        assert_eq!(&out[..], &points[..28]);
    }
}
