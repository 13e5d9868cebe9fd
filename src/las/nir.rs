//! Compressors and decompressors of the near infrared channel of the point format 8 & 10.

pub mod v3 {
    use std::io::{Cursor, Read, Write};

    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

    use crate::decoders::ArithmeticDecoder;
    use crate::encoders::ArithmeticEncoder;
    use crate::las::utils::{
        copy_bytes_into_decoder, copy_encoder_content_to, finish_layer, lower_byte,
        lower_byte_changed, upper_byte, upper_byte_changed, ChannelContexts,
    };
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::packers::Packable;
    use crate::record::{LayeredFieldCompressor, LayeredFieldDecompressor};

    const NIR_SIZE: usize = 2;

    struct NirContext {
        last_nir: u16,
        bytes_used_model: ArithmeticModel,
        lower_byte_diff_model: ArithmeticModel,
        upper_byte_diff_model: ArithmeticModel,
    }

    impl NirContext {
        fn new(last_nir: u16) -> Self {
            Self {
                last_nir,
                bytes_used_model: ArithmeticModelBuilder::new(4).build(),
                lower_byte_diff_model: ArithmeticModelBuilder::new(256).build(),
                upper_byte_diff_model: ArithmeticModelBuilder::new(256).build(),
            }
        }
    }

    pub struct LasNIRDecompressor {
        decoder: ArithmeticDecoder<Cursor<Vec<u8>>>,
        changed_nir: bool,
        layer_size: u32,
        contexts: ChannelContexts<NirContext>,
    }

    impl Default for LasNIRDecompressor {
        fn default() -> Self {
            Self {
                decoder: ArithmeticDecoder::new(Cursor::new(Vec::<u8>::new())),
                changed_nir: false,
                layer_size: 0,
                contexts: ChannelContexts::default(),
            }
        }
    }

    impl<R: Read> LayeredFieldDecompressor<R> for LasNIRDecompressor {
        fn size_of_field(&self) -> usize {
            NIR_SIZE
        }

        fn init_first_point(
            &mut self,
            src: &mut R,
            first_point: &mut [u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            src.read_exact(first_point)?;
            self.contexts
                .init(NirContext::new(u16::unpack_from(first_point)), *context);
            Ok(())
        }

        fn decompress_field_with(
            &mut self,
            current_point: &mut [u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            let (the_context, previous) = self
                .contexts
                .switch_keeping_last(*context, |previous| NirContext::new(previous.last_nir))?;
            let last_nir = match previous {
                Some(previous) => &mut previous.last_nir,
                None => &mut the_context.last_nir,
            };

            if self.changed_nir {
                let last = *last_nir;
                let sym = self
                    .decoder
                    .decode_symbol(&mut the_context.bytes_used_model)?;

                let lower = if is_nth_bit_set!(sym, 0) {
                    let corr = self
                        .decoder
                        .decode_symbol(&mut the_context.lower_byte_diff_model)?
                        as u8;
                    corr.wrapping_add(lower_byte(last))
                } else {
                    lower_byte(last)
                };

                let upper = if is_nth_bit_set!(sym, 1) {
                    let corr = self
                        .decoder
                        .decode_symbol(&mut the_context.upper_byte_diff_model)?
                        as u8;
                    corr.wrapping_add(upper_byte(last))
                } else {
                    upper_byte(last)
                };
                *last_nir = u16::from(upper) << 8 | u16::from(lower);
            }

            last_nir.pack_into(current_point);
            Ok(())
        }

        fn read_layers_sizes(&mut self, src: &mut R) -> std::io::Result<()> {
            self.layer_size = src.read_u32::<LittleEndian>()?;
            Ok(())
        }

        fn read_layers(&mut self, src: &mut R) -> std::io::Result<()> {
            self.changed_nir =
                copy_bytes_into_decoder(self.layer_size as usize, &mut self.decoder, src)?;
            Ok(())
        }
    }

    pub struct LasNIRCompressor {
        encoder: ArithmeticEncoder<Cursor<Vec<u8>>>,
        nir_has_changed: bool,
        contexts: ChannelContexts<NirContext>,
    }

    impl Default for LasNIRCompressor {
        fn default() -> Self {
            Self {
                encoder: ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new())),
                nir_has_changed: false,
                contexts: ChannelContexts::default(),
            }
        }
    }

    impl<W: Write> LayeredFieldCompressor<W> for LasNIRCompressor {
        fn size_of_field(&self) -> usize {
            NIR_SIZE
        }

        fn init_first_point(
            &mut self,
            dst: &mut W,
            first_point: &[u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            dst.write_all(first_point)?;
            self.contexts
                .init(NirContext::new(u16::unpack_from(first_point)), *context);
            Ok(())
        }

        fn compress_field_with(
            &mut self,
            current_point: &[u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            let nir = u16::unpack_from(current_point);
            let (the_context, previous) = self
                .contexts
                .switch_keeping_last(*context, |previous| NirContext::new(previous.last_nir))?;
            let last_nir = match previous {
                Some(previous) => &mut previous.last_nir,
                None => &mut the_context.last_nir,
            };
            let last = *last_nir;

            let sym = (lower_byte_changed(last, nir) as u32)
                | (upper_byte_changed(last, nir) as u32) << 1;
            self.encoder
                .encode_symbol(&mut the_context.bytes_used_model, sym)?;

            if is_nth_bit_set!(sym, 0) {
                let diff = lower_byte(nir).wrapping_sub(lower_byte(last));
                self.encoder
                    .encode_symbol(&mut the_context.lower_byte_diff_model, u32::from(diff))?;
            }

            if is_nth_bit_set!(sym, 1) {
                let diff = upper_byte(nir).wrapping_sub(upper_byte(last));
                self.encoder
                    .encode_symbol(&mut the_context.upper_byte_diff_model, u32::from(diff))?;
            }

            if sym != 0 {
                self.nir_has_changed = true;
            }
            *last_nir = nir;
            Ok(())
        }

        fn write_layers_sizes(&mut self, dst: &mut W) -> std::io::Result<()> {
            let size = finish_layer(&mut self.encoder, self.nir_has_changed)?;
            dst.write_u32::<LittleEndian>(size)
        }

        fn write_layers(&mut self, dst: &mut W) -> std::io::Result<()> {
            copy_encoder_content_to(&mut self.encoder, dst)
        }
    }
}

pub mod v4 {
    use super::v3;

    layered_v4_codecs!(LasNIRCompressor, LasNIRDecompressor);

    impl Default for LasNIRCompressor {
        fn default() -> Self {
            Self::from(v3::LasNIRCompressor::default())
        }
    }

    impl Default for LasNIRDecompressor {
        fn default() -> Self {
            Self::from(v3::LasNIRDecompressor::default())
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::v3::{LasNIRCompressor, LasNIRDecompressor};
    use crate::record::{LayeredFieldCompressor, LayeredFieldDecompressor};

    fn compress(values: &[u16], contexts: &[usize]) -> Vec<u8> {
        let mut compressor = LasNIRCompressor::default();
        let mut dst = Cursor::new(Vec::<u8>::new());
        let mut context = contexts[0];
        compressor
            .init_first_point(&mut dst, &values[0].to_le_bytes(), &mut context)
            .unwrap();
        for (value, ctx) in values.iter().zip(contexts).skip(1) {
            let mut context = *ctx;
            LayeredFieldCompressor::<Cursor<Vec<u8>>>::compress_field_with(
                &mut compressor,
                &value.to_le_bytes(),
                &mut context,
            )
            .unwrap();
        }
        compressor.write_layers_sizes(&mut dst).unwrap();
        compressor.write_layers(&mut dst).unwrap();
        dst.into_inner()
    }

    fn decompress(data: Vec<u8>, contexts: &[usize]) -> Vec<u16> {
        let mut decompressor = LasNIRDecompressor::default();
        let mut src = Cursor::new(data);
        let mut buf = [0u8; 2];
        let mut context = contexts[0];
        decompressor
            .init_first_point(&mut src, &mut buf, &mut context)
            .unwrap();
        let mut values = vec![u16::from_le_bytes(buf)];
        decompressor.read_layers_sizes(&mut src).unwrap();
        decompressor.read_layers(&mut src).unwrap();
        for ctx in &contexts[1..] {
            let mut context = *ctx;
            LayeredFieldDecompressor::<Cursor<Vec<u8>>>::decompress_field_with(
                &mut decompressor,
                &mut buf,
                &mut context,
            )
            .unwrap();
            values.push(u16::from_le_bytes(buf));
        }
        values
    }

    #[test]
    fn test_nir_round_trip_with_channel_switches() {
        let values = [1000u16, 1001, 65535, 0, 256, 256, 255, 4096];
        let contexts = [0usize, 0, 1, 1, 3, 0, 3, 2];
        let data = compress(&values, &contexts);
        assert_eq!(decompress(data, &contexts), values.to_vec());
    }

    #[test]
    fn test_unchanged_nir_has_empty_layer() {
        let values = [77u16; 5];
        let contexts = [0usize, 1, 2, 3, 0];
        let data = compress(&values, &contexts);
        // first point then a zero layer size
        assert_eq!(data, vec![77, 0, 0, 0, 0, 0]);
        assert_eq!(decompress(data, &contexts), values.to_vec());
    }
}
