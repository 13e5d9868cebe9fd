//! The LasZip VLR: what is compressed, with which versions, and how it is chunked.
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::las::gps::GpsTime;
use crate::las::point10::Point10;
use crate::las::point14::Point14;
use crate::las::rgb::RGB;
use crate::las::wavepacket::LasWavepacket;
use crate::LasZipError;

const NIR_SIZE: u16 = std::mem::size_of::<u16>() as u16;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Version {
    major: u8,
    minor: u8,
    revision: u16,
}

impl Version {
    fn read_from<R: Read>(src: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            major: src.read_u8()?,
            minor: src.read_u8()?,
            revision: src.read_u16::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, dst: &mut W) -> std::io::Result<()> {
        dst.write_u8(self.major)?;
        dst.write_u8(self.minor)?;
        dst.write_u16::<LittleEndian>(self.revision)?;
        Ok(())
    }
}

impl Default for Version {
    fn default() -> Self {
        Self {
            major: 2,
            minor: 2,
            revision: 0,
        }
    }
}

/// The different type of data / fields found in the definition of LAS points
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LazItemType {
    /// ExtraBytes for LAS versions <= 1.3 & point format <= 5
    Byte(u16),
    /// The 20 bytes common to the point formats 0 to 5
    Point10,
    /// GpsTime for LAS versions <= 1.3 & point format <= 5
    GpsTime,
    /// RGB for LAS versions <= 1.3 & point format <= 5
    RGB12,
    /// Wave packet descriptor of the point formats 4 & 5
    WavePacket13,
    /// The 30 bytes common to the point formats 6 to 10
    Point14,
    /// RGB for LAS versions >= 1.4
    RGB14,
    /// RGB + Nir for LAS versions >= 1.4
    RGBNIR14,
    /// Wave packet descriptor of the point formats 9 & 10
    WavePacket14,
    /// ExtraBytes for LAS versions >= 1.4
    Byte14(u16),
}

impl LazItemType {
    /// Size in bytes of the item in an uncompressed point
    pub fn size(&self) -> u16 {
        match self {
            LazItemType::Byte(size) | LazItemType::Byte14(size) => *size,
            LazItemType::Point10 => Point10::SIZE as u16,
            LazItemType::GpsTime => GpsTime::SIZE as u16,
            LazItemType::RGB12 | LazItemType::RGB14 => RGB::SIZE as u16,
            LazItemType::WavePacket13 | LazItemType::WavePacket14 => LasWavepacket::SIZE as u16,
            LazItemType::Point14 => Point14::SIZE as u16,
            LazItemType::RGBNIR14 => RGB::SIZE as u16 + NIR_SIZE,
        }
    }

    /// The compression version used when none is asked for
    fn default_version(&self) -> u16 {
        match self {
            LazItemType::Byte(_)
            | LazItemType::Point10
            | LazItemType::GpsTime
            | LazItemType::RGB12
            | LazItemType::WavePacket13 => 2,
            LazItemType::Point14
            | LazItemType::RGB14
            | LazItemType::RGBNIR14
            | LazItemType::WavePacket14
            | LazItemType::Byte14(_) => 3,
        }
    }

    fn from_code(code: u16, size: u16) -> crate::Result<Self> {
        match code {
            0 => Ok(LazItemType::Byte(size)),
            6 => Ok(LazItemType::Point10),
            7 => Ok(LazItemType::GpsTime),
            8 => Ok(LazItemType::RGB12),
            9 => Ok(LazItemType::WavePacket13),
            10 => Ok(LazItemType::Point14),
            11 => Ok(LazItemType::RGB14),
            12 => Ok(LazItemType::RGBNIR14),
            13 => Ok(LazItemType::WavePacket14),
            14 => Ok(LazItemType::Byte14(size)),
            _ => Err(LasZipError::UnknownLazItem(code)),
        }
    }
}

impl From<LazItemType> for u16 {
    fn from(t: LazItemType) -> Self {
        match t {
            LazItemType::Byte(_) => 0,
            LazItemType::Point10 => 6,
            LazItemType::GpsTime => 7,
            LazItemType::RGB12 => 8,
            LazItemType::WavePacket13 => 9,
            LazItemType::Point14 => 10,
            LazItemType::RGB14 => 11,
            LazItemType::RGBNIR14 => 12,
            LazItemType::WavePacket14 => 13,
            LazItemType::Byte14(_) => 14,
        }
    }
}

/// Struct stored as part of the laszip's vlr record_data
///
/// This gives information about the dimension compressed
/// and the version used for the compression.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LazItem {
    // coded on a u16
    pub(crate) item_type: LazItemType,
    pub(crate) size: u16,
    pub(crate) version: u16,
}

impl LazItem {
    pub fn new(item_type: LazItemType, version: u16) -> Self {
        let size = item_type.size();
        Self {
            item_type,
            size,
            version,
        }
    }

    pub fn item_type(&self) -> LazItemType {
        self.item_type
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    fn read_from<R: Read>(src: &mut R) -> crate::Result<Self> {
        let code = src.read_u16::<LittleEndian>()?;
        let size = src.read_u16::<LittleEndian>()?;
        let item_type = LazItemType::from_code(code, size)?;
        Ok(Self {
            item_type,
            size,
            version: src.read_u16::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, dst: &mut W) -> std::io::Result<()> {
        dst.write_u16::<LittleEndian>(self.item_type.into())?;
        dst.write_u16::<LittleEndian>(self.size)?;
        dst.write_u16::<LittleEndian>(self.version)?;
        Ok(())
    }
}

/// Builds the list of [`LazItem`] of a point record.
///
/// Items get the version LASzip writes by default (2 for the items of the
/// point formats 0 to 5, 3 for the others) unless [`with_version`] is used.
///
/// [`with_version`]: Self::with_version
#[derive(Debug, Default, Clone)]
pub struct LazItemRecordBuilder {
    items: Vec<LazItemType>,
    version: Option<u16>,
}

impl LazItemRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The items of a LAS point format with their default versions,
    /// `num_extra_bytes` adds a trailing extra bytes item when not 0.
    pub fn default_for_point_format_id(
        point_format_id: u8,
        num_extra_bytes: u16,
    ) -> crate::Result<Vec<LazItem>> {
        let mut builder = Self::new();
        builder.add_items_of_point_format(point_format_id, num_extra_bytes)?;
        Ok(builder.build())
    }

    pub fn add_item(&mut self, item_type: LazItemType) -> &mut Self {
        self.items.push(item_type);
        self
    }

    /// Adds the items of a LAS point format.
    pub fn add_items_of_point_format(
        &mut self,
        point_format_id: u8,
        num_extra_bytes: u16,
    ) -> crate::Result<&mut Self> {
        use LazItemType::*;
        let items: &[LazItemType] = match point_format_id {
            0 => &[Point10],
            1 => &[Point10, GpsTime],
            2 => &[Point10, RGB12],
            3 => &[Point10, GpsTime, RGB12],
            4 => &[Point10, GpsTime, WavePacket13],
            5 => &[Point10, GpsTime, RGB12, WavePacket13],
            6 => &[Point14],
            7 => &[Point14, RGB14],
            8 => &[Point14, RGBNIR14],
            9 => &[Point14, WavePacket14],
            10 => &[Point14, RGBNIR14, WavePacket14],
            _ => return Err(LasZipError::UnsupportedPointFormat(point_format_id)),
        };
        self.items.extend_from_slice(items);
        if num_extra_bytes != 0 {
            if point_format_id <= 5 {
                self.items.push(Byte(num_extra_bytes));
            } else {
                self.items.push(Byte14(num_extra_bytes));
            }
        }
        Ok(self)
    }

    /// Forces the compression version of all the items
    pub fn with_version(&mut self, version: u16) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn build(&self) -> Vec<LazItem> {
        self.items
            .iter()
            .map(|item_type| {
                let version = self.version.unwrap_or_else(|| item_type.default_version());
                LazItem::new(*item_type, version)
            })
            .collect()
    }
}

fn read_laz_items_from<R: Read>(src: &mut R) -> crate::Result<Vec<LazItem>> {
    let num_items = src.read_u16::<LittleEndian>()?;
    let mut items = Vec::<LazItem>::with_capacity(num_items as usize);
    for _ in 0..num_items {
        items.push(LazItem::read_from(src)?)
    }
    Ok(items)
}

fn write_laz_items_to<W: Write>(laz_items: &[LazItem], dst: &mut W) -> std::io::Result<()> {
    dst.write_u16::<LittleEndian>(laz_items.len() as u16)?;
    for item in laz_items {
        item.write_to(dst)?;
    }
    Ok(())
}

/// The possibilities for how the compressed data is organized.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompressorType {
    /// Points are stored uncompressed
    None = 0,
    /// No chunks, or rather only 1 chunk with all the points,
    /// and no chunk table
    PointWise = 1,
    /// Compress points into chunks with chunk_size points in each chunks
    PointWiseChunked = 2,
    /// Compress points into chunk, but also separate the different point dimension / fields
    /// into layers. This CompressorType is only use for point 6,7,8,9,10
    LayeredChunked = 3,
}

impl CompressorType {
    fn from_u16(t: u16) -> Option<Self> {
        match t {
            0 => Some(CompressorType::None),
            1 => Some(CompressorType::PointWise),
            2 => Some(CompressorType::PointWiseChunked),
            3 => Some(CompressorType::LayeredChunked),
            _ => None,
        }
    }

    fn for_items(items: &[LazItem]) -> Self {
        match items.first().map(|item| item.version) {
            Some(3) | Some(4) => CompressorType::LayeredChunked,
            _ => CompressorType::PointWiseChunked,
        }
    }
}

impl Default for CompressorType {
    fn default() -> Self {
        CompressorType::PointWiseChunked
    }
}

/// The data stored in the record_data of the Laszip Vlr
///
/// This vlr contains information needed to compress or decompress
/// LAZ/LAS data. Such as the points per chunk, the fields & version
/// of the compression/decompression algorithm.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LazVlr {
    // coded on u16
    pub(crate) compressor: CompressorType,
    // 0 means ArithmeticCoder, its the only choice
    coder: u16,

    version: Version,
    options: u32,
    /// Number of points per chunk
    chunk_size: u32,

    // -1 if unused
    number_of_special_evlrs: i64,
    // -1 if unused
    offset_to_special_evlrs: i64,

    items: Vec<LazItem>,
}

impl LazVlr {
    /// The user id of the LasZip VLR header.
    pub const USER_ID: &'static str = "laszip encoded";
    /// The record id of the LasZip VLR header.
    pub const RECORD_ID: u16 = 22204;
    /// The description of the LasZip VLR header.
    pub const DESCRIPTION: &'static str = "http://laszip.org";
    /// Number of points per chunk when nothing else is asked.
    pub const DEFAULT_CHUNK_SIZE: u32 = 50_000;
    /// All the points go in one single chunk.
    pub const UNBOUNDED_CHUNK_SIZE: u32 = 0;
    /// Sentinel value to indicate that chunks have a variable size.
    pub const VARIABLE_CHUNK_SIZE: u32 = u32::MAX;

    pub fn from_laz_items(items: Vec<LazItem>) -> Self {
        Self {
            compressor: CompressorType::for_items(&items),
            items,
            ..Default::default()
        }
    }

    /// Tries to read the Vlr information from the record_data buffer
    pub fn from_buffer(record_data: &[u8]) -> crate::Result<Self> {
        let mut cursor = std::io::Cursor::new(record_data);
        Self::read_from(&mut cursor)
    }

    /// Tries to read the Vlr information from the record_data source
    pub fn read_from<R: Read>(src: &mut R) -> crate::Result<Self> {
        let compressor_type = src.read_u16::<LittleEndian>()?;
        let compressor = CompressorType::from_u16(compressor_type)
            .ok_or(LasZipError::UnknownCompressorType(compressor_type))?;

        Ok(Self {
            compressor,
            coder: src.read_u16::<LittleEndian>()?,
            version: Version::read_from(src)?,
            options: src.read_u32::<LittleEndian>()?,
            chunk_size: src.read_u32::<LittleEndian>()?,
            number_of_special_evlrs: src.read_i64::<LittleEndian>()?,
            offset_to_special_evlrs: src.read_i64::<LittleEndian>()?,
            items: read_laz_items_from(src)?,
        })
    }

    /// Writes the Vlr to the source, this only write the 'record_data' the
    /// header should be written before-hand
    pub fn write_to<W: Write>(&self, dst: &mut W) -> std::io::Result<()> {
        dst.write_u16::<LittleEndian>(self.compressor as u16)?;
        dst.write_u16::<LittleEndian>(self.coder)?;
        self.version.write_to(dst)?;
        dst.write_u32::<LittleEndian>(self.options)?;
        dst.write_u32::<LittleEndian>(self.chunk_size)?;
        dst.write_i64::<LittleEndian>(self.number_of_special_evlrs)?;
        dst.write_i64::<LittleEndian>(self.offset_to_special_evlrs)?;
        write_laz_items_to(&self.items, dst)?;
        Ok(())
    }

    pub fn compressor(&self) -> CompressorType {
        self.compressor
    }

    pub fn uses_variable_size_chunks(&self) -> bool {
        self.chunk_size == Self::VARIABLE_CHUNK_SIZE
    }

    /// Returns the chunk size, that is, the number of points
    /// in each chunk.
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// The number of points after which a chunk is closed,
    /// `None` when only the user closes chunks (or never does).
    pub fn points_per_chunk(&self) -> Option<u64> {
        match (self.compressor, self.chunk_size) {
            (CompressorType::PointWise, _) => None,
            (_, Self::UNBOUNDED_CHUNK_SIZE) | (_, Self::VARIABLE_CHUNK_SIZE) => None,
            (_, chunk_size) => Some(u64::from(chunk_size)),
        }
    }

    /// Returns the items compressed by this VLR
    pub fn items(&self) -> &[LazItem] {
        &self.items
    }

    /// Returns the sum of the size of the laz_items, which should correspond to the
    /// expected size of points (uncompressed).
    pub fn items_size(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.size)).sum()
    }

    /// Number of bytes of a complete decompressed chunk, when chunks have a fixed size
    #[cfg(feature = "parallel")]
    pub(crate) fn num_bytes_in_decompressed_chunk(&self) -> Option<u64> {
        self.points_per_chunk()
            .map(|points| points * self.items_size())
    }
}

impl Default for LazVlr {
    fn default() -> Self {
        Self {
            compressor: Default::default(),
            coder: 0,
            version: Version::default(),
            options: 0,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            number_of_special_evlrs: -1,
            offset_to_special_evlrs: -1,
            items: vec![],
        }
    }
}

/// Builder struct to personalize the LazVlr
#[derive(Debug, Default)]
pub struct LazVlrBuilder {
    laz_vlr: LazVlr,
}

impl LazVlrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_laz_items(laz_items: Vec<LazItem>) -> Self {
        Self {
            laz_vlr: LazVlr::from_laz_items(laz_items),
        }
    }

    /// Sets the items, the compressor type is deduced from their version
    pub fn with_laz_items(mut self, laz_items: Vec<LazItem>) -> Self {
        self.laz_vlr.compressor = CompressorType::for_items(&laz_items);
        self.laz_vlr.items = laz_items;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.laz_vlr.chunk_size = chunk_size;
        self
    }

    pub fn with_variable_chunk_size(self) -> Self {
        self.with_chunk_size(LazVlr::VARIABLE_CHUNK_SIZE)
    }

    /// Overrides the compressor type deduced from the items
    pub fn with_compressor(mut self, compressor: CompressorType) -> Self {
        self.laz_vlr.compressor = compressor;
        self
    }

    pub fn build(self) -> LazVlr {
        self.laz_vlr
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_create_laz_items() {
        let items = LazItemRecordBuilder::new()
            .add_item(LazItemType::Point10)
            .add_item(LazItemType::GpsTime)
            .build();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], LazItem::new(LazItemType::Point10, 2));
        assert_eq!(items[1].size(), 8);
    }

    #[test]
    fn test_default_items_of_point_formats() {
        let items = LazItemRecordBuilder::default_for_point_format_id(3, 5).unwrap();
        let types: Vec<LazItemType> = items.iter().map(LazItem::item_type).collect();
        assert_eq!(
            types,
            vec![
                LazItemType::Point10,
                LazItemType::GpsTime,
                LazItemType::RGB12,
                LazItemType::Byte(5)
            ]
        );
        assert_eq!(items.iter().map(|i| i.size()).sum::<u16>(), 39);

        let items = LazItemRecordBuilder::default_for_point_format_id(10, 0).unwrap();
        assert!(items.iter().all(|item| item.version() == 3));
        assert_eq!(items.iter().map(|i| i.size()).sum::<u16>(), 30 + 8 + 29);

        assert!(matches!(
            LazItemRecordBuilder::default_for_point_format_id(11, 0),
            Err(LasZipError::UnsupportedPointFormat(11))
        ));
    }

    #[test]
    fn test_vlr_read_write() {
        let items = LazItemRecordBuilder::new()
            .add_item(LazItemType::Point14)
            .add_item(LazItemType::RGBNIR14)
            .add_item(LazItemType::Byte14(3))
            .with_version(4)
            .build();
        let vlr = LazVlrBuilder::from_laz_items(items)
            .with_chunk_size(1234)
            .build();
        assert_eq!(vlr.compressor(), CompressorType::LayeredChunked);
        assert_eq!(vlr.items_size(), 30 + 8 + 3);

        let mut data = Vec::<u8>::new();
        vlr.write_to(&mut data).unwrap();
        // fixed part with the item count & 3 items of 6 bytes
        assert_eq!(data.len(), 34 + 3 * 6);
        assert_eq!(u16::from_le_bytes([data[32], data[33]]), 3);
        assert_eq!(LazVlr::from_buffer(&data).unwrap(), vlr);
    }

    #[test]
    fn test_unknown_item_and_compressor() {
        let mut data = Vec::<u8>::new();
        LazVlr::default().write_to(&mut data).unwrap();
        data[0] = 7;
        assert!(matches!(
            LazVlr::from_buffer(&data),
            Err(LasZipError::UnknownCompressorType(7))
        ));

        let vlr = LazVlrBuilder::from_laz_items(vec![LazItem::new(LazItemType::Point10, 2)])
            .build();
        let mut data = Vec::<u8>::new();
        vlr.write_to(&mut data).unwrap();
        // the type code of the single item
        data[34] = 42;
        assert!(matches!(
            LazVlr::from_buffer(&data),
            Err(LasZipError::UnknownLazItem(42))
        ));
    }

    #[test]
    fn test_points_per_chunk() {
        let vlr = LazVlrBuilder::new().with_chunk_size(10).build();
        assert_eq!(vlr.points_per_chunk(), Some(10));
        let vlr = LazVlrBuilder::new()
            .with_chunk_size(LazVlr::UNBOUNDED_CHUNK_SIZE)
            .build();
        assert_eq!(vlr.points_per_chunk(), None);
        let vlr = LazVlrBuilder::new().with_variable_chunk_size().build();
        assert!(vlr.uses_variable_size_chunks());
        assert_eq!(vlr.points_per_chunk(), None);
    }
}
