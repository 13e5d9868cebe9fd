use crate::packers::Packable;

/// ASPRS definition of wavepacket data.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct LasWavepacket {
    pub descriptor_index: u8,
    // offset in bytes to waveform data
    pub offset: u64,
    // in bytes
    pub size: u32,
    pub return_point: f32,
    pub dx: f32,
    pub dy: f32,
    pub dz: f32,
}

impl LasWavepacket {
    pub const SIZE: usize = 29;
}

impl Packable for LasWavepacket {
    fn unpack_from(input: &[u8]) -> Self {
        Self {
            descriptor_index: input[0],
            offset: u64::unpack_from(&input[1..9]),
            size: u32::unpack_from(&input[9..13]),
            return_point: f32::unpack_from(&input[13..17]),
            dx: f32::unpack_from(&input[17..21]),
            dy: f32::unpack_from(&input[21..25]),
            dz: f32::unpack_from(&input[25..29]),
        }
    }

    fn pack_into(&self, output: &mut [u8]) {
        output[0] = self.descriptor_index;
        u64::pack_into(&self.offset, &mut output[1..9]);
        u32::pack_into(&self.size, &mut output[9..13]);
        f32::pack_into(&self.return_point, &mut output[13..17]);
        f32::pack_into(&self.dx, &mut output[17..21]);
        f32::pack_into(&self.dy, &mut output[21..25]);
        f32::pack_into(&self.dz, &mut output[25..29]);
    }
}

/// Floats are compressed as their bit pattern
#[inline]
fn float_bits(value: f32) -> i32 {
    value.to_bits() as i32
}

#[inline]
fn float_from_bits(bits: i32) -> f32 {
    f32::from_bits(bits as u32)
}

pub mod v1 {
    //! The offset is coded with a symbol telling if it is the same,
    //! directly follows the last packet or needs a difference,
    //! the other fields are predicted from the last packet.
    use super::{float_bits, float_from_bits, LasWavepacket};
    use crate::compressors::{IntegerCompressor, IntegerCompressorBuilder};
    use crate::decoders::ArithmeticDecoder;
    use crate::decompressors::{IntegerDecompressor, IntegerDecompressorBuilder};
    use crate::encoders::ArithmeticEncoder;
    use crate::las::utils::read_and_unpack;
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::packers::Packable;
    use crate::record::{FieldCompressor, FieldDecompressor};
    use std::io::{Read, Write};

    const DX_CONTEXT: u32 = 0;
    const DY_CONTEXT: u32 = 1;
    const DZ_CONTEXT: u32 = 2;

    const OFFSET_UNCHANGED: u32 = 0;
    const OFFSET_AFTER_LAST_PACKET: u32 = 1;
    const OFFSET_DIFF_32: u32 = 2;
    const OFFSET_RAW: u32 = 3;

    struct Models {
        packet_index: ArithmeticModel,
        offset_diff: [ArithmeticModel; 4],
    }

    impl Models {
        fn new() -> Self {
            Self {
                packet_index: ArithmeticModelBuilder::new(256).build(),
                offset_diff: [
                    ArithmeticModelBuilder::new(4).build(),
                    ArithmeticModelBuilder::new(4).build(),
                    ArithmeticModelBuilder::new(4).build(),
                    ArithmeticModelBuilder::new(4).build(),
                ],
            }
        }
    }

    pub struct LasWavepacketDecompressor {
        last_wavepacket: LasWavepacket,

        last_offset_diff: i32,
        last_sym_offset_diff: u32,

        models: Models,

        idc_offset_diff: IntegerDecompressor,
        idc_packet_size: IntegerDecompressor,
        idc_return_point: IntegerDecompressor,
        idc_xyz: IntegerDecompressor,
    }

    impl LasWavepacketDecompressor {
        pub(crate) fn from_last(last_wavepacket: LasWavepacket) -> Self {
            Self {
                last_wavepacket,
                last_offset_diff: 0,
                last_sym_offset_diff: 0,
                models: Models::new(),
                idc_offset_diff: IntegerDecompressorBuilder::new().bits(32).build(),
                idc_packet_size: IntegerDecompressorBuilder::new().bits(32).build(),
                idc_return_point: IntegerDecompressorBuilder::new().bits(32).build(),
                // 3 contexts as this is used to decompress dx, dy, dz
                idc_xyz: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(3)
                    .build(),
            }
        }

        pub(crate) fn last(&self) -> &LasWavepacket {
            &self.last_wavepacket
        }

        /// Sets the packet the next one is predicted from, returns the previous one.
        pub(crate) fn replace_last(&mut self, last_wavepacket: LasWavepacket) -> LasWavepacket {
            std::mem::replace(&mut self.last_wavepacket, last_wavepacket)
        }
    }

    impl Default for LasWavepacketDecompressor {
        fn default() -> Self {
            Self::from_last(LasWavepacket::default())
        }
    }

    impl<R> FieldDecompressor<R> for LasWavepacketDecompressor
    where
        R: Read,
    {
        fn size_of_field(&self) -> usize {
            LasWavepacket::SIZE
        }

        fn decompress_first(&mut self, src: &mut R, first_point: &mut [u8]) -> std::io::Result<()> {
            self.last_wavepacket = read_and_unpack(src, first_point)?;
            Ok(())
        }

        fn decompress_with(
            &mut self,
            decoder: &mut ArithmeticDecoder<R>,
            buf: &mut [u8],
        ) -> std::io::Result<()> {
            let last = self.last_wavepacket;
            let mut current_wavepacket = LasWavepacket::default();

            current_wavepacket.descriptor_index =
                decoder.decode_symbol(&mut self.models.packet_index)? as u8;

            self.last_sym_offset_diff = decoder.decode_symbol(
                &mut self.models.offset_diff[self.last_sym_offset_diff as usize],
            )?;

            current_wavepacket.offset = match self.last_sym_offset_diff {
                OFFSET_UNCHANGED => last.offset,
                OFFSET_AFTER_LAST_PACKET => last.offset.wrapping_add(u64::from(last.size)),
                OFFSET_DIFF_32 => {
                    self.last_offset_diff =
                        self.idc_offset_diff
                            .decompress(decoder, self.last_offset_diff, 0)?;
                    last.offset
                        .wrapping_add(i64::from(self.last_offset_diff) as u64)
                }
                _ => decoder.read_int_64()?,
            };

            current_wavepacket.size =
                self.idc_packet_size
                    .decompress(decoder, last.size as i32, 0)? as u32;

            current_wavepacket.return_point = float_from_bits(self.idc_return_point.decompress(
                decoder,
                float_bits(last.return_point),
                0,
            )?);
            current_wavepacket.dx = float_from_bits(self.idc_xyz.decompress(
                decoder,
                float_bits(last.dx),
                DX_CONTEXT,
            )?);
            current_wavepacket.dy = float_from_bits(self.idc_xyz.decompress(
                decoder,
                float_bits(last.dy),
                DY_CONTEXT,
            )?);
            current_wavepacket.dz = float_from_bits(self.idc_xyz.decompress(
                decoder,
                float_bits(last.dz),
                DZ_CONTEXT,
            )?);

            current_wavepacket.pack_into(buf);
            self.last_wavepacket = current_wavepacket;
            Ok(())
        }
    }

    pub struct LasWavepacketCompressor {
        last_wavepacket: LasWavepacket,

        last_offset_diff: i32,
        last_sym_offset_diff: u32,

        models: Models,

        ic_offset_diff: IntegerCompressor,
        ic_packet_size: IntegerCompressor,
        ic_return_point: IntegerCompressor,
        ic_xyz: IntegerCompressor,
    }

    impl LasWavepacketCompressor {
        pub(crate) fn from_last(last_wavepacket: LasWavepacket) -> Self {
            Self {
                last_wavepacket,
                last_offset_diff: 0,
                last_sym_offset_diff: 0,
                models: Models::new(),
                ic_offset_diff: IntegerCompressorBuilder::new().bits(32).build(),
                ic_packet_size: IntegerCompressorBuilder::new().bits(32).build(),
                ic_return_point: IntegerCompressorBuilder::new().bits(32).build(),
                // 3 contexts as this is used to compress dx, dy, dz
                ic_xyz: IntegerCompressorBuilder::new().bits(32).contexts(3).build(),
            }
        }

        pub(crate) fn last(&self) -> &LasWavepacket {
            &self.last_wavepacket
        }

        /// Sets the packet the next one is predicted from, returns the previous one.
        pub(crate) fn replace_last(&mut self, last_wavepacket: LasWavepacket) -> LasWavepacket {
            std::mem::replace(&mut self.last_wavepacket, last_wavepacket)
        }
    }

    impl Default for LasWavepacketCompressor {
        fn default() -> Self {
            Self::from_last(LasWavepacket::default())
        }
    }

    impl<W> FieldCompressor<W> for LasWavepacketCompressor
    where
        W: Write,
    {
        fn size_of_field(&self) -> usize {
            LasWavepacket::SIZE
        }

        fn compress_first(&mut self, dst: &mut W, buf: &[u8]) -> std::io::Result<()> {
            self.last_wavepacket = LasWavepacket::unpack_from(buf);
            dst.write_all(buf)
        }

        fn compress_with(
            &mut self,
            encoder: &mut ArithmeticEncoder<W>,
            buf: &[u8],
        ) -> std::io::Result<()> {
            let current_item = LasWavepacket::unpack_from(buf);
            let last = self.last_wavepacket;
            encoder.encode_symbol(
                &mut self.models.packet_index,
                u32::from(current_item.descriptor_index),
            )?;

            let offset_diff_64 = current_item.offset.wrapping_sub(last.offset) as i64;
            let offset_diff_32 = offset_diff_64 as i32;

            let sym_offset_diff = if offset_diff_64 != i64::from(offset_diff_32) {
                OFFSET_RAW
            } else if offset_diff_32 == 0 {
                OFFSET_UNCHANGED
            } else if offset_diff_64 == i64::from(last.size) {
                OFFSET_AFTER_LAST_PACKET
            } else {
                OFFSET_DIFF_32
            };

            encoder.encode_symbol(
                &mut self.models.offset_diff[self.last_sym_offset_diff as usize],
                sym_offset_diff,
            )?;
            self.last_sym_offset_diff = sym_offset_diff;

            if sym_offset_diff == OFFSET_DIFF_32 {
                self.ic_offset_diff
                    .compress(encoder, self.last_offset_diff, offset_diff_32, 0)?;
                self.last_offset_diff = offset_diff_32;
            } else if sym_offset_diff == OFFSET_RAW {
                encoder.write_int64(current_item.offset)?;
            }

            self.ic_packet_size
                .compress(encoder, last.size as i32, current_item.size as i32, 0)?;
            self.ic_return_point.compress(
                encoder,
                float_bits(last.return_point),
                float_bits(current_item.return_point),
                0,
            )?;
            self.ic_xyz.compress(
                encoder,
                float_bits(last.dx),
                float_bits(current_item.dx),
                DX_CONTEXT,
            )?;
            self.ic_xyz.compress(
                encoder,
                float_bits(last.dy),
                float_bits(current_item.dy),
                DY_CONTEXT,
            )?;
            self.ic_xyz.compress(
                encoder,
                float_bits(last.dz),
                float_bits(current_item.dz),
                DZ_CONTEXT,
            )?;

            self.last_wavepacket = current_item;
            Ok(())
        }
    }
}

pub mod v3 {
    //! Same coding as the version 1, with one state per scanner channel
    //! and the wavepackets of a chunk stored in their own layer.
    use std::io::{Cursor, Read, Write};

    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

    use super::{v1, LasWavepacket};
    use crate::decoders::ArithmeticDecoder;
    use crate::encoders::ArithmeticEncoder;
    use crate::las::utils::{
        copy_bytes_into_decoder, copy_encoder_content_to, finish_layer, ChannelContexts,
    };
    use crate::packers::Packable;
    use crate::record::{
        FieldCompressor, FieldDecompressor, LayeredFieldCompressor, LayeredFieldDecompressor,
    };

    pub struct LasWavepacketDecompressor {
        decoder: ArithmeticDecoder<Cursor<Vec<u8>>>,
        changed_wavepacket: bool,
        layer_size: u32,
        contexts: ChannelContexts<v1::LasWavepacketDecompressor>,
    }

    impl Default for LasWavepacketDecompressor {
        fn default() -> Self {
            Self {
                decoder: ArithmeticDecoder::new(Cursor::new(Vec::<u8>::new())),
                changed_wavepacket: false,
                layer_size: 0,
                contexts: ChannelContexts::default(),
            }
        }
    }

    impl<R: Read> LayeredFieldDecompressor<R> for LasWavepacketDecompressor {
        fn size_of_field(&self) -> usize {
            LasWavepacket::SIZE
        }

        fn init_first_point(
            &mut self,
            src: &mut R,
            first_point: &mut [u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            src.read_exact(first_point)?;
            let first = LasWavepacket::unpack_from(first_point);
            self.contexts
                .init(v1::LasWavepacketDecompressor::from_last(first), *context);
            Ok(())
        }

        fn decompress_field_with(
            &mut self,
            current_point: &mut [u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            let (the_context, previous) = self.contexts.switch_keeping_last(*context, |previous| {
                v1::LasWavepacketDecompressor::from_last(*previous.last())
            })?;
            let own_last = previous
                .as_ref()
                .map(|previous| the_context.replace_last(*previous.last()));
            if self.changed_wavepacket {
                the_context.decompress_with(&mut self.decoder, current_point)?;
            } else {
                the_context.last().pack_into(current_point);
            }
            if let (Some(previous), Some(own_last)) = (previous, own_last) {
                previous.replace_last(the_context.replace_last(own_last));
            }
            Ok(())
        }

        fn read_layers_sizes(&mut self, src: &mut R) -> std::io::Result<()> {
            self.layer_size = src.read_u32::<LittleEndian>()?;
            Ok(())
        }

        fn read_layers(&mut self, src: &mut R) -> std::io::Result<()> {
            self.changed_wavepacket =
                copy_bytes_into_decoder(self.layer_size as usize, &mut self.decoder, src)?;
            Ok(())
        }
    }

    pub struct LasWavepacketCompressor {
        encoder: ArithmeticEncoder<Cursor<Vec<u8>>>,
        wavepacket_has_changed: bool,
        contexts: ChannelContexts<v1::LasWavepacketCompressor>,
    }

    impl Default for LasWavepacketCompressor {
        fn default() -> Self {
            Self {
                encoder: ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new())),
                wavepacket_has_changed: false,
                contexts: ChannelContexts::default(),
            }
        }
    }

    impl<W: Write> LayeredFieldCompressor<W> for LasWavepacketCompressor {
        fn size_of_field(&self) -> usize {
            LasWavepacket::SIZE
        }

        fn init_first_point(
            &mut self,
            dst: &mut W,
            first_point: &[u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            dst.write_all(first_point)?;
            let first = LasWavepacket::unpack_from(first_point);
            self.contexts
                .init(v1::LasWavepacketCompressor::from_last(first), *context);
            Ok(())
        }

        fn compress_field_with(
            &mut self,
            current_point: &[u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            let (the_context, previous) = self.contexts.switch_keeping_last(*context, |previous| {
                v1::LasWavepacketCompressor::from_last(*previous.last())
            })?;
            let own_last = previous
                .as_ref()
                .map(|previous| the_context.replace_last(*previous.last()));
            if *the_context.last() != LasWavepacket::unpack_from(current_point) {
                self.wavepacket_has_changed = true;
            }
            the_context.compress_with(&mut self.encoder, current_point)?;
            if let (Some(previous), Some(own_last)) = (previous, own_last) {
                previous.replace_last(the_context.replace_last(own_last));
            }
            Ok(())
        }

        fn write_layers_sizes(&mut self, dst: &mut W) -> std::io::Result<()> {
            let size = finish_layer(&mut self.encoder, self.wavepacket_has_changed)?;
            dst.write_u32::<LittleEndian>(size)
        }

        fn write_layers(&mut self, dst: &mut W) -> std::io::Result<()> {
            copy_encoder_content_to(&mut self.encoder, dst)
        }
    }
}

pub mod v4 {
    use super::v3;

    layered_v4_codecs!(LasWavepacketCompressor, LasWavepacketDecompressor);

    impl Default for LasWavepacketCompressor {
        fn default() -> Self {
            Self::from(v3::LasWavepacketCompressor::default())
        }
    }

    impl Default for LasWavepacketDecompressor {
        fn default() -> Self {
            Self::from(v3::LasWavepacketDecompressor::default())
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;
    use crate::decoders::ArithmeticDecoder;
    use crate::encoders::ArithmeticEncoder;
    use crate::record::{
        FieldCompressor, FieldDecompressor, LayeredFieldCompressor, LayeredFieldDecompressor,
    };

    fn packets() -> Vec<LasWavepacket> {
        let mut packets = vec![LasWavepacket {
            descriptor_index: 1,
            offset: 1000,
            size: 256,
            return_point: 12.5,
            dx: -0.25,
            dy: 0.5,
            dz: 1.0,
        }];
        let mut next = packets[0];
        // directly after the last packet
        next.offset = 1256;
        packets.push(next);
        // same offset
        packets.push(next);
        // small difference
        next.offset = 900;
        next.size = 128;
        packets.push(next);
        // huge difference
        next.offset = 1 << 40;
        next.descriptor_index = 3;
        next.return_point = f32::MAX;
        packets.push(next);
        next.offset = 0;
        next.dz = f32::NAN;
        packets.push(next);
        packets
    }

    #[test]
    fn test_v1_offsets_round_trip() {
        let packets = packets();
        let mut buf = [0u8; LasWavepacket::SIZE];

        let mut compressor = v1::LasWavepacketCompressor::default();
        let mut dst = Cursor::new(Vec::<u8>::new());
        packets[0].pack_into(&mut buf);
        compressor.compress_first(&mut dst, &buf).unwrap();
        let mut encoder = ArithmeticEncoder::new(dst);
        for packet in &packets[1..] {
            packet.pack_into(&mut buf);
            compressor.compress_with(&mut encoder, &buf).unwrap();
        }
        encoder.done().unwrap();

        let mut decompressor = v1::LasWavepacketDecompressor::default();
        let mut src = Cursor::new(encoder.into_inner().into_inner());
        decompressor.decompress_first(&mut src, &mut buf).unwrap();
        let mut decoder = ArithmeticDecoder::new(src);
        decoder.read_init_bytes().unwrap();
        for packet in &packets[1..] {
            let mut expected = [0u8; LasWavepacket::SIZE];
            packet.pack_into(&mut expected);
            decompressor.decompress_with(&mut decoder, &mut buf).unwrap();
            // compare bytes, NaN != NaN
            assert_eq!(buf, expected);
        }
    }

    #[test]
    fn test_v3_round_trip_coming_back_to_used_channels() {
        let packets = packets();
        let channels = [0usize, 1, 0, 0, 2, 1, 1];
        let mut buf = [0u8; LasWavepacket::SIZE];

        let mut compressor = v3::LasWavepacketCompressor::default();
        let mut dst = Cursor::new(Vec::<u8>::new());
        let mut context = channels[0];
        packets[0].pack_into(&mut buf);
        compressor
            .init_first_point(&mut dst, &buf, &mut context)
            .unwrap();
        for (packet, channel) in packets.iter().zip(&channels).skip(1) {
            context = *channel;
            packet.pack_into(&mut buf);
            LayeredFieldCompressor::<Cursor<Vec<u8>>>::compress_field_with(
                &mut compressor,
                &buf,
                &mut context,
            )
            .unwrap();
        }
        compressor.write_layers_sizes(&mut dst).unwrap();
        compressor.write_layers(&mut dst).unwrap();

        let mut decompressor = v3::LasWavepacketDecompressor::default();
        let mut src = Cursor::new(dst.into_inner());
        let mut context = channels[0];
        decompressor
            .init_first_point(&mut src, &mut buf, &mut context)
            .unwrap();
        decompressor.read_layers_sizes(&mut src).unwrap();
        decompressor.read_layers(&mut src).unwrap();
        for (packet, channel) in packets.iter().zip(&channels).skip(1) {
            context = *channel;
            LayeredFieldDecompressor::<Cursor<Vec<u8>>>::decompress_field_with(
                &mut decompressor,
                &mut buf,
                &mut context,
            )
            .unwrap();
            let mut expected = [0u8; LasWavepacket::SIZE];
            packet.pack_into(&mut expected);
            assert_eq!(buf, expected);
        }
    }
}
