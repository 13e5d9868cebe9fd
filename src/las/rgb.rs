/*
===============================================================================

  PROGRAMMERS:

    martin.isenburg@rapidlasso.com  -  http://rapidlasso.com
    uday.karan@gmail.com - Hobu, Inc.

  COPYRIGHT:

    (c) 2007-2014, martin isenburg, rapidlasso - tools to catch reality
    (c) 2014, Uday Verma, Hobu, Inc.
    (c) 2019, Thomas Montaigu

    This is free software; you can redistribute and/or modify it under the
    terms of the GNU Lesser General Licence as published by the Free Software
    Foundation. See the COPYING file for more information.

    This software is distributed WITHOUT ANY WARRANTY and without even the
    implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.

  CHANGE HISTORY:
    6 June 2019: Translated to Rust
===============================================================================
*/

//! Module with the definition of a RGB struct and implementations of
//! Compressors and Decompressors

use crate::las::utils::{lower_byte_changed, upper_byte_changed};
use crate::packers::Packable;

/// Struct representing a RGB component of a point, in compliance with
/// the ASPRS LAS format
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct RGB {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl RGB {
    pub const SIZE: usize = 6;

    fn is_gray(&self) -> bool {
        self.red == self.green && self.red == self.blue
    }
}

impl Packable for RGB {
    fn unpack_from(input: &[u8]) -> Self {
        Self {
            red: u16::unpack_from(&input[0..2]),
            green: u16::unpack_from(&input[2..4]),
            blue: u16::unpack_from(&input[4..6]),
        }
    }

    fn pack_into(&self, output: &mut [u8]) {
        u16::pack_into(&self.red, &mut output[0..2]);
        u16::pack_into(&self.green, &mut output[2..4]);
        u16::pack_into(&self.blue, &mut output[4..6]);
    }
}

/// Which bytes of the color components changed.
///
/// The bit 6 is only used by the version 2 and later, it tells if the
/// color is not a gray level (i.e the components are not all equal).
struct ColorDiff(u8);

impl ColorDiff {
    fn from_points(current: &RGB, last: &RGB) -> Self {
        Self(
            (lower_byte_changed(last.red, current.red) as u8)
                | (upper_byte_changed(last.red, current.red) as u8) << 1
                | (lower_byte_changed(last.green, current.green) as u8) << 2
                | (upper_byte_changed(last.green, current.green) as u8) << 3
                | (lower_byte_changed(last.blue, current.blue) as u8) << 4
                | (upper_byte_changed(last.blue, current.blue) as u8) << 5,
        )
    }

    fn with_color_flag(self, current: &RGB) -> Self {
        Self(self.0 | (!current.is_gray() as u8) << 6)
    }

    fn lower_red_byte_changed(&self) -> bool {
        is_nth_bit_set!(self.0, 0)
    }

    fn upper_red_byte_changed(&self) -> bool {
        is_nth_bit_set!(self.0, 1)
    }

    fn lower_green_byte_changed(&self) -> bool {
        is_nth_bit_set!(self.0, 2)
    }

    fn upper_green_byte_changed(&self) -> bool {
        is_nth_bit_set!(self.0, 3)
    }

    fn lower_blue_byte_changed(&self) -> bool {
        is_nth_bit_set!(self.0, 4)
    }

    fn upper_blue_byte_changed(&self) -> bool {
        is_nth_bit_set!(self.0, 5)
    }

    fn is_colored(&self) -> bool {
        is_nth_bit_set!(self.0, 6)
    }
}

pub mod v1 {
    //! Contains the implementation for the Version 1 of the RGB Compression / Decompression
    //!
    //! The algorithm is pretty simple:
    //!
    //! - Each bytes of each color components are encoded separately with their own context.
    //! - A byte is compressed only if it has changed
    //! - A u8 symbol is first encoded with the information on which byte changed or not
    use std::io::{Read, Write};

    use crate::compressors::{IntegerCompressor, IntegerCompressorBuilder};
    use crate::decoders::ArithmeticDecoder;
    use crate::decompressors::{IntegerDecompressor, IntegerDecompressorBuilder};
    use crate::encoders::ArithmeticEncoder;
    use crate::las::utils::{lower_byte, read_and_unpack, upper_byte};
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::packers::Packable;
    use crate::record::{FieldCompressor, FieldDecompressor};

    use super::{ColorDiff, RGB};

    const LOWER_RED_BYTE_CONTEXT: u32 = 0;
    const UPPER_RED_BYTE_CONTEXT: u32 = 1;
    const LOWER_GREEN_BYTE_CONTEXT: u32 = 2;
    const UPPER_GREEN_BYTE_CONTEXT: u32 = 3;
    const LOWER_BLUE_BYTE_CONTEXT: u32 = 4;
    const UPPER_BLUE_BYTE_CONTEXT: u32 = 5;

    pub struct LasRGBDecompressor {
        last: RGB,
        byte_used_model: ArithmeticModel,
        decompressor: IntegerDecompressor,
    }

    impl Default for LasRGBDecompressor {
        fn default() -> Self {
            Self {
                last: Default::default(),
                byte_used_model: ArithmeticModelBuilder::new(64).build(),
                decompressor: IntegerDecompressorBuilder::new()
                    .bits(8) // 8 bits, because we encode byte by byte
                    .contexts(6) // there are 6 bytes in a RGB component
                    .build(),
            }
        }
    }

    impl LasRGBDecompressor {
        fn decompress_byte<R: Read>(
            &mut self,
            decoder: &mut ArithmeticDecoder<R>,
            context: u32,
            last_byte_value: u8,
        ) -> std::io::Result<u16> {
            let value = self
                .decompressor
                .decompress(decoder, i32::from(last_byte_value), context)?;
            Ok(u16::from(value as u8))
        }

        fn decompress_component<R: Read>(
            &mut self,
            decoder: &mut ArithmeticDecoder<R>,
            last: u16,
            lower_context: Option<u32>,
            upper_context: Option<u32>,
        ) -> std::io::Result<u16> {
            let lower = match lower_context {
                Some(context) => self.decompress_byte(decoder, context, lower_byte(last))?,
                None => last & 0x00FF,
            };
            let upper = match upper_context {
                Some(context) => self.decompress_byte(decoder, context, upper_byte(last))? << 8,
                None => last & 0xFF00,
            };
            Ok(upper | lower)
        }
    }

    impl<R: Read> FieldDecompressor<R> for LasRGBDecompressor {
        fn size_of_field(&self) -> usize {
            RGB::SIZE
        }

        fn decompress_first(&mut self, src: &mut R, first_point: &mut [u8]) -> std::io::Result<()> {
            self.last = read_and_unpack::<_, RGB>(src, first_point)?;
            Ok(())
        }

        fn decompress_with(
            &mut self,
            decoder: &mut ArithmeticDecoder<R>,
            buf: &mut [u8],
        ) -> std::io::Result<()> {
            let color_diff = ColorDiff(decoder.decode_symbol(&mut self.byte_used_model)? as u8);

            self.last.red = self.decompress_component(
                decoder,
                self.last.red,
                Some(LOWER_RED_BYTE_CONTEXT).filter(|_| color_diff.lower_red_byte_changed()),
                Some(UPPER_RED_BYTE_CONTEXT).filter(|_| color_diff.upper_red_byte_changed()),
            )?;
            self.last.green = self.decompress_component(
                decoder,
                self.last.green,
                Some(LOWER_GREEN_BYTE_CONTEXT).filter(|_| color_diff.lower_green_byte_changed()),
                Some(UPPER_GREEN_BYTE_CONTEXT).filter(|_| color_diff.upper_green_byte_changed()),
            )?;
            self.last.blue = self.decompress_component(
                decoder,
                self.last.blue,
                Some(LOWER_BLUE_BYTE_CONTEXT).filter(|_| color_diff.lower_blue_byte_changed()),
                Some(UPPER_BLUE_BYTE_CONTEXT).filter(|_| color_diff.upper_blue_byte_changed()),
            )?;
            self.last.pack_into(buf);
            Ok(())
        }
    }

    pub struct LasRGBCompressor {
        last: RGB,
        byte_used_model: ArithmeticModel,
        compressor: IntegerCompressor,
    }

    impl Default for LasRGBCompressor {
        fn default() -> Self {
            Self {
                last: Default::default(),
                byte_used_model: ArithmeticModelBuilder::new(64).build(),
                compressor: IntegerCompressorBuilder::new().bits(8).contexts(6).build(),
            }
        }
    }

    impl LasRGBCompressor {
        fn compress_byte<W: Write>(
            &mut self,
            encoder: &mut ArithmeticEncoder<W>,
            context: u32,
            last_byte_value: u8,
            byte_value: u8,
        ) -> std::io::Result<()> {
            self.compressor.compress(
                encoder,
                i32::from(last_byte_value),
                i32::from(byte_value),
                context,
            )
        }
    }

    impl<W: Write> FieldCompressor<W> for LasRGBCompressor {
        fn size_of_field(&self) -> usize {
            RGB::SIZE
        }

        fn compress_first(&mut self, dst: &mut W, buf: &[u8]) -> std::io::Result<()> {
            self.last = RGB::unpack_from(buf);
            dst.write_all(buf)
        }

        fn compress_with(
            &mut self,
            encoder: &mut ArithmeticEncoder<W>,
            buf: &[u8],
        ) -> std::io::Result<()> {
            let current = RGB::unpack_from(buf);
            let last = self.last;
            let color_diff = ColorDiff::from_points(&current, &last);
            encoder.encode_symbol(&mut self.byte_used_model, u32::from(color_diff.0))?;

            if color_diff.lower_red_byte_changed() {
                self.compress_byte(
                    encoder,
                    LOWER_RED_BYTE_CONTEXT,
                    lower_byte(last.red),
                    lower_byte(current.red),
                )?;
            }

            if color_diff.upper_red_byte_changed() {
                self.compress_byte(
                    encoder,
                    UPPER_RED_BYTE_CONTEXT,
                    upper_byte(last.red),
                    upper_byte(current.red),
                )?;
            }

            if color_diff.lower_green_byte_changed() {
                self.compress_byte(
                    encoder,
                    LOWER_GREEN_BYTE_CONTEXT,
                    lower_byte(last.green),
                    lower_byte(current.green),
                )?;
            }

            if color_diff.upper_green_byte_changed() {
                self.compress_byte(
                    encoder,
                    UPPER_GREEN_BYTE_CONTEXT,
                    upper_byte(last.green),
                    upper_byte(current.green),
                )?;
            }

            if color_diff.lower_blue_byte_changed() {
                self.compress_byte(
                    encoder,
                    LOWER_BLUE_BYTE_CONTEXT,
                    lower_byte(last.blue),
                    lower_byte(current.blue),
                )?;
            }

            if color_diff.upper_blue_byte_changed() {
                self.compress_byte(
                    encoder,
                    UPPER_BLUE_BYTE_CONTEXT,
                    upper_byte(last.blue),
                    upper_byte(current.blue),
                )?;
            }
            self.last = current;
            Ok(())
        }
    }
}

pub mod v2 {
    //! Contains the implementation for the Version 2 of the RGB Compression / Decompression
    //!
    //! The red component is coded as the difference with the last red,
    //! the green and blue ones are predicted from how much the red changed.
    use std::io::{Read, Write};

    use crate::decoders::ArithmeticDecoder;
    use crate::encoders::ArithmeticEncoder;
    use crate::las::utils::{lower_byte, read_and_unpack, u8_clamp, upper_byte};
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::packers::Packable;
    use crate::record::{FieldCompressor, FieldDecompressor};

    use super::{ColorDiff, RGB};

    pub(crate) struct RGBModels {
        byte_used: ArithmeticModel,
        lower_red_byte: ArithmeticModel,
        upper_red_byte: ArithmeticModel,
        lower_green_byte: ArithmeticModel,
        upper_green_byte: ArithmeticModel,
        lower_blue_byte: ArithmeticModel,
        upper_blue_byte: ArithmeticModel,
    }

    impl Default for RGBModels {
        fn default() -> Self {
            Self {
                byte_used: ArithmeticModelBuilder::new(128).build(),
                lower_red_byte: ArithmeticModelBuilder::new(256).build(),
                upper_red_byte: ArithmeticModelBuilder::new(256).build(),
                lower_green_byte: ArithmeticModelBuilder::new(256).build(),
                upper_green_byte: ArithmeticModelBuilder::new(256).build(),
                lower_blue_byte: ArithmeticModelBuilder::new(256).build(),
                upper_blue_byte: ArithmeticModelBuilder::new(256).build(),
            }
        }
    }

    /// Difference of two bytes, as the symbol sent to the byte models
    #[inline]
    fn byte_corrector(value: u8, prediction: u8) -> u32 {
        u32::from(value.wrapping_sub(prediction))
    }

    pub(crate) fn compress_rgb_using<W: Write>(
        encoder: &mut ArithmeticEncoder<W>,
        models: &mut RGBModels,
        current: &RGB,
        last: &RGB,
    ) -> std::io::Result<()> {
        let mut diff_l = 0i32;
        let mut diff_h = 0i32;

        let color_diff = ColorDiff::from_points(current, last).with_color_flag(current);
        encoder.encode_symbol(&mut models.byte_used, u32::from(color_diff.0))?;

        if color_diff.lower_red_byte_changed() {
            diff_l = i32::from(lower_byte(current.red)) - i32::from(lower_byte(last.red));
            encoder.encode_symbol(
                &mut models.lower_red_byte,
                byte_corrector(lower_byte(current.red), lower_byte(last.red)),
            )?;
        }

        if color_diff.upper_red_byte_changed() {
            diff_h = i32::from(upper_byte(current.red)) - i32::from(upper_byte(last.red));
            encoder.encode_symbol(
                &mut models.upper_red_byte,
                byte_corrector(upper_byte(current.red), upper_byte(last.red)),
            )?;
        }

        if color_diff.is_colored() {
            if color_diff.lower_green_byte_changed() {
                let prediction = u8_clamp(diff_l + i32::from(lower_byte(last.green)));
                encoder.encode_symbol(
                    &mut models.lower_green_byte,
                    byte_corrector(lower_byte(current.green), prediction),
                )?;
            }

            if color_diff.lower_blue_byte_changed() {
                diff_l = (diff_l + i32::from(lower_byte(current.green))
                    - i32::from(lower_byte(last.green)))
                    / 2;
                let prediction = u8_clamp(diff_l + i32::from(lower_byte(last.blue)));
                encoder.encode_symbol(
                    &mut models.lower_blue_byte,
                    byte_corrector(lower_byte(current.blue), prediction),
                )?;
            }

            if color_diff.upper_green_byte_changed() {
                let prediction = u8_clamp(diff_h + i32::from(upper_byte(last.green)));
                encoder.encode_symbol(
                    &mut models.upper_green_byte,
                    byte_corrector(upper_byte(current.green), prediction),
                )?;
            }

            if color_diff.upper_blue_byte_changed() {
                diff_h = (diff_h + i32::from(upper_byte(current.green))
                    - i32::from(upper_byte(last.green)))
                    / 2;
                let prediction = u8_clamp(diff_h + i32::from(upper_byte(last.blue)));
                encoder.encode_symbol(
                    &mut models.upper_blue_byte,
                    byte_corrector(upper_byte(current.blue), prediction),
                )?;
            }
        }
        Ok(())
    }

    pub(crate) fn decompress_rgb_using<R: Read>(
        decoder: &mut ArithmeticDecoder<R>,
        models: &mut RGBModels,
        last: &RGB,
    ) -> std::io::Result<RGB> {
        let color_diff = ColorDiff(decoder.decode_symbol(&mut models.byte_used)? as u8);
        let mut this_val = RGB::default();

        if color_diff.lower_red_byte_changed() {
            let corr = decoder.decode_symbol(&mut models.lower_red_byte)? as u8;
            this_val.red = u16::from(corr.wrapping_add(lower_byte(last.red)));
        } else {
            this_val.red = last.red & 0x00FF;
        }

        if color_diff.upper_red_byte_changed() {
            let corr = decoder.decode_symbol(&mut models.upper_red_byte)? as u8;
            this_val.red |= u16::from(corr.wrapping_add(upper_byte(last.red))) << 8;
        } else {
            this_val.red |= last.red & 0xFF00;
        }

        if color_diff.is_colored() {
            let mut diff = i32::from(lower_byte(this_val.red)) - i32::from(lower_byte(last.red));

            if color_diff.lower_green_byte_changed() {
                let corr = decoder.decode_symbol(&mut models.lower_green_byte)? as u8;
                let prediction = u8_clamp(diff + i32::from(lower_byte(last.green)));
                this_val.green = u16::from(corr.wrapping_add(prediction));
            } else {
                this_val.green = last.green & 0x00FF;
            }

            if color_diff.lower_blue_byte_changed() {
                let corr = decoder.decode_symbol(&mut models.lower_blue_byte)? as u8;
                diff = (diff + i32::from(lower_byte(this_val.green))
                    - i32::from(lower_byte(last.green)))
                    / 2;
                let prediction = u8_clamp(diff + i32::from(lower_byte(last.blue)));
                this_val.blue = u16::from(corr.wrapping_add(prediction));
            } else {
                this_val.blue = last.blue & 0x00FF;
            }

            diff = i32::from(upper_byte(this_val.red)) - i32::from(upper_byte(last.red));
            if color_diff.upper_green_byte_changed() {
                let corr = decoder.decode_symbol(&mut models.upper_green_byte)? as u8;
                let prediction = u8_clamp(diff + i32::from(upper_byte(last.green)));
                this_val.green |= u16::from(corr.wrapping_add(prediction)) << 8;
            } else {
                this_val.green |= last.green & 0xFF00;
            }

            if color_diff.upper_blue_byte_changed() {
                let corr = decoder.decode_symbol(&mut models.upper_blue_byte)? as u8;
                diff = (diff + i32::from(upper_byte(this_val.green))
                    - i32::from(upper_byte(last.green)))
                    / 2;
                let prediction = u8_clamp(diff + i32::from(upper_byte(last.blue)));
                this_val.blue |= u16::from(corr.wrapping_add(prediction)) << 8;
            } else {
                this_val.blue |= last.blue & 0xFF00;
            }
        } else {
            this_val.green = this_val.red;
            this_val.blue = this_val.red;
        }
        Ok(this_val)
    }

    #[derive(Default)]
    pub struct LasRGBCompressor {
        last: RGB,
        models: RGBModels,
    }

    impl<W: Write> FieldCompressor<W> for LasRGBCompressor {
        fn size_of_field(&self) -> usize {
            RGB::SIZE
        }

        fn compress_first(&mut self, dst: &mut W, buf: &[u8]) -> std::io::Result<()> {
            self.last = RGB::unpack_from(buf);
            dst.write_all(buf)
        }

        fn compress_with(
            &mut self,
            encoder: &mut ArithmeticEncoder<W>,
            buf: &[u8],
        ) -> std::io::Result<()> {
            let current_point = RGB::unpack_from(buf);
            compress_rgb_using(encoder, &mut self.models, &current_point, &self.last)?;
            self.last = current_point;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct LasRGBDecompressor {
        last: RGB,
        models: RGBModels,
    }

    impl<R: Read> FieldDecompressor<R> for LasRGBDecompressor {
        fn size_of_field(&self) -> usize {
            RGB::SIZE
        }

        fn decompress_first(&mut self, src: &mut R, first_point: &mut [u8]) -> std::io::Result<()> {
            self.last = read_and_unpack::<_, RGB>(src, first_point)?;
            Ok(())
        }

        fn decompress_with(
            &mut self,
            decoder: &mut ArithmeticDecoder<R>,
            buf: &mut [u8],
        ) -> std::io::Result<()> {
            let this_val = decompress_rgb_using(decoder, &mut self.models, &self.last)?;
            self.last = this_val;
            this_val.pack_into(buf);
            Ok(())
        }
    }
}

pub mod v3 {
    //! Contains the implementation for the Version 3 of the RGB Compression / Decompression
    //!
    //! The version 3 of the compression / decompression algorithm
    //! is the same as the version 2, but with the support for the contexts system,
    //! the colors of a chunk are stored in their own layer.
    use std::io::{Cursor, Read, Write};

    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

    use crate::decoders::ArithmeticDecoder;
    use crate::encoders::ArithmeticEncoder;
    use crate::las::utils::{
        copy_bytes_into_decoder, copy_encoder_content_to, finish_layer, ChannelContexts,
    };
    use crate::packers::Packable;
    use crate::record::{LayeredFieldCompressor, LayeredFieldDecompressor};

    use super::v2::{compress_rgb_using, decompress_rgb_using, RGBModels};
    use super::RGB;

    /// The models and last color of one of the 4 scanner channels
    struct RGBContext {
        models: RGBModels,
        last: RGB,
    }

    impl RGBContext {
        fn new(last: RGB) -> Self {
            Self {
                models: RGBModels::default(),
                last,
            }
        }
    }

    pub struct LasRGBDecompressor {
        decoder: ArithmeticDecoder<Cursor<Vec<u8>>>,
        changed_rgb: bool,
        layer_size: u32,
        contexts: ChannelContexts<RGBContext>,
    }

    impl Default for LasRGBDecompressor {
        fn default() -> Self {
            Self {
                decoder: ArithmeticDecoder::new(Cursor::new(Vec::<u8>::new())),
                changed_rgb: false,
                layer_size: 0,
                contexts: ChannelContexts::default(),
            }
        }
    }

    impl<R: Read> LayeredFieldDecompressor<R> for LasRGBDecompressor {
        fn size_of_field(&self) -> usize {
            RGB::SIZE
        }

        fn init_first_point(
            &mut self,
            src: &mut R,
            first_point: &mut [u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            src.read_exact(first_point)?;
            self.contexts
                .init(RGBContext::new(RGB::unpack_from(first_point)), *context);
            Ok(())
        }

        fn decompress_field_with(
            &mut self,
            current_point: &mut [u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            let (rgb_context, previous) = self
                .contexts
                .switch_keeping_last(*context, |previous| RGBContext::new(previous.last))?;
            let last = match previous {
                Some(previous) => &mut previous.last,
                None => &mut rgb_context.last,
            };
            if self.changed_rgb {
                let rgb = decompress_rgb_using(&mut self.decoder, &mut rgb_context.models, last)?;
                *last = rgb;
            }
            last.pack_into(current_point);
            Ok(())
        }

        fn read_layers_sizes(&mut self, src: &mut R) -> std::io::Result<()> {
            self.layer_size = src.read_u32::<LittleEndian>()?;
            Ok(())
        }

        fn read_layers(&mut self, src: &mut R) -> std::io::Result<()> {
            self.changed_rgb =
                copy_bytes_into_decoder(self.layer_size as usize, &mut self.decoder, src)?;
            Ok(())
        }
    }

    pub struct LasRGBCompressor {
        encoder: ArithmeticEncoder<Cursor<Vec<u8>>>,
        rgb_has_changed: bool,
        contexts: ChannelContexts<RGBContext>,
    }

    impl Default for LasRGBCompressor {
        fn default() -> Self {
            Self {
                encoder: ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new())),
                rgb_has_changed: false,
                contexts: ChannelContexts::default(),
            }
        }
    }

    impl<W: Write> LayeredFieldCompressor<W> for LasRGBCompressor {
        fn size_of_field(&self) -> usize {
            RGB::SIZE
        }

        fn init_first_point(
            &mut self,
            dst: &mut W,
            first_point: &[u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            dst.write_all(first_point)?;
            self.contexts
                .init(RGBContext::new(RGB::unpack_from(first_point)), *context);
            Ok(())
        }

        fn compress_field_with(
            &mut self,
            current_point: &[u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            let current = RGB::unpack_from(current_point);
            let (rgb_context, previous) = self
                .contexts
                .switch_keeping_last(*context, |previous| RGBContext::new(previous.last))?;
            let last = match previous {
                Some(previous) => &mut previous.last,
                None => &mut rgb_context.last,
            };
            if *last != current {
                self.rgb_has_changed = true;
            }
            compress_rgb_using(&mut self.encoder, &mut rgb_context.models, &current, last)?;
            *last = current;
            Ok(())
        }

        fn write_layers_sizes(&mut self, dst: &mut W) -> std::io::Result<()> {
            let size = finish_layer(&mut self.encoder, self.rgb_has_changed)?;
            dst.write_u32::<LittleEndian>(size)
        }

        fn write_layers(&mut self, dst: &mut W) -> std::io::Result<()> {
            copy_encoder_content_to(&mut self.encoder, dst)
        }
    }
}

pub mod v4 {
    //! The version 4 codes the colors exactly like the version 3.
    use super::v3;

    layered_v4_codecs!(LasRGBCompressor, LasRGBDecompressor);

    impl Default for LasRGBCompressor {
        fn default() -> Self {
            Self::from(v3::LasRGBCompressor::default())
        }
    }

    impl Default for LasRGBDecompressor {
        fn default() -> Self {
            Self::from(v3::LasRGBDecompressor::default())
        }
    }
}
