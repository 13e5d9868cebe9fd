//! Per-attribute codecs of LAS point records.
//!
//! Each module holds the definition of the attribute (when it has one)
//! and its compressors / decompressors, grouped by compression version.
#[macro_use]
mod utils;

pub mod extra_bytes;
pub mod gps;
pub mod nir;
pub mod point10;
pub mod point14;
pub mod rgb;
pub mod wavepacket;

pub mod v1 {
    pub use crate::las::extra_bytes::v1::{LasExtraByteCompressor, LasExtraByteDecompressor};
    pub use crate::las::gps::v1::{LasGpsTimeCompressor, LasGpsTimeDecompressor};
    pub use crate::las::point10::v1::{LasPoint10Compressor, LasPoint10Decompressor};
    pub use crate::las::rgb::v1::{LasRGBCompressor, LasRGBDecompressor};
    pub use crate::las::wavepacket::v1::{LasWavepacketCompressor, LasWavepacketDecompressor};
}

pub mod v2 {
    pub use crate::las::gps::v2::{LasGpsTimeCompressor, LasGpsTimeDecompressor};
    pub use crate::las::point10::v2::{LasPoint10Compressor, LasPoint10Decompressor};
    pub use crate::las::rgb::v2::{LasRGBCompressor, LasRGBDecompressor};
}

pub mod v3 {
    pub use crate::las::extra_bytes::v3::{LasExtraByteCompressor, LasExtraByteDecompressor};
    pub use crate::las::nir::v3::{LasNIRCompressor, LasNIRDecompressor};
    pub use crate::las::point14::v3::{LasPoint14Compressor, LasPoint14Decompressor};
    pub use crate::las::rgb::v3::{LasRGBCompressor, LasRGBDecompressor};
    pub use crate::las::wavepacket::v3::{LasWavepacketCompressor, LasWavepacketDecompressor};
}

pub mod v4 {
    pub use crate::las::extra_bytes::v4::{LasExtraByteCompressor, LasExtraByteDecompressor};
    pub use crate::las::nir::v4::{LasNIRCompressor, LasNIRDecompressor};
    pub use crate::las::point14::v4::{LasPoint14Compressor, LasPoint14Decompressor};
    pub use crate::las::rgb::v4::{LasRGBCompressor, LasRGBDecompressor};
    pub use crate::las::wavepacket::v4::{LasWavepacketCompressor, LasWavepacketDecompressor};
}
