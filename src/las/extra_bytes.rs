/*
===============================================================================

  PROGRAMMERS:

    martin.isenburg@rapidlasso.com  -  http://rapidlasso.com
    uday.karan@gmail.com - Hobu, Inc.
    andrew.bell.ia@gmail.com - Hobu Inc.

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
//! Defines the different version of compressors and decompressors for ExtraBytes contained in points

pub mod v1 {
    //! The Algorithm is simple:
    //! encode the difference between byte for each extra bytes
    //!
    //! The version 2 is the same implementation.
    use std::io::{Read, Write};

    use crate::decoders::ArithmeticDecoder;
    use crate::encoders::ArithmeticEncoder;
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::record::{FieldCompressor, FieldDecompressor};

    pub struct LasExtraByteCompressor {
        last_bytes: Vec<u8>,
        models: Vec<ArithmeticModel>,
    }

    impl LasExtraByteCompressor {
        pub fn new(count: usize) -> Self {
            Self {
                last_bytes: vec![0u8; count],
                models: (0..count)
                    .map(|_i| ArithmeticModelBuilder::new(256).build())
                    .collect(),
            }
        }
    }

    impl<W: Write> FieldCompressor<W> for LasExtraByteCompressor {
        fn size_of_field(&self) -> usize {
            self.last_bytes.len()
        }

        fn compress_first(&mut self, dst: &mut W, buf: &[u8]) -> std::io::Result<()> {
            self.last_bytes.copy_from_slice(buf);
            dst.write_all(buf)
        }

        fn compress_with(
            &mut self,
            encoder: &mut ArithmeticEncoder<W>,
            buf: &[u8],
        ) -> std::io::Result<()> {
            let iter = buf.iter().zip(self.last_bytes.iter_mut());
            for ((current, last), model) in iter.zip(self.models.iter_mut()) {
                let diff = current.wrapping_sub(*last);
                encoder.encode_symbol(model, u32::from(diff))?;
                *last = *current;
            }
            Ok(())
        }
    }

    pub struct LasExtraByteDecompressor {
        last_bytes: Vec<u8>,
        models: Vec<ArithmeticModel>,
    }

    impl LasExtraByteDecompressor {
        pub fn new(count: usize) -> Self {
            Self {
                last_bytes: vec![0u8; count],
                models: (0..count)
                    .map(|_i| ArithmeticModelBuilder::new(256).build())
                    .collect(),
            }
        }
    }

    impl<R: Read> FieldDecompressor<R> for LasExtraByteDecompressor {
        fn size_of_field(&self) -> usize {
            self.last_bytes.len()
        }

        fn decompress_first(&mut self, src: &mut R, first_point: &mut [u8]) -> std::io::Result<()> {
            src.read_exact(first_point)?;
            self.last_bytes.copy_from_slice(first_point);
            Ok(())
        }

        fn decompress_with(
            &mut self,
            decoder: &mut ArithmeticDecoder<R>,
            buf: &mut [u8],
        ) -> std::io::Result<()> {
            for (last, model) in self.last_bytes.iter_mut().zip(self.models.iter_mut()) {
                let diff = decoder.decode_symbol(model)? as u8;
                *last = last.wrapping_add(diff);
            }
            buf.copy_from_slice(&self.last_bytes);
            Ok(())
        }
    }
}

pub mod v3 {
    //! The algorithm is similar to v1 (& v2), the changes are
    //! that compressor / decompressor uses contexts (4)
    //! and each byte of the extra bytes is encoded in its own layer
    //! with its own encoder
    use std::io::{Cursor, Read, Write};

    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

    use crate::decoders::ArithmeticDecoder;
    use crate::encoders::ArithmeticEncoder;
    use crate::las::utils::{
        copy_bytes_into_decoder, copy_encoder_content_to, finish_layer, ChannelContexts,
    };
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::record::{LayeredFieldCompressor, LayeredFieldDecompressor};

    struct ExtraBytesContext {
        last_bytes: Vec<u8>,
        models: Vec<ArithmeticModel>,
    }

    impl ExtraBytesContext {
        fn new(last_bytes: &[u8]) -> Self {
            Self {
                last_bytes: last_bytes.to_vec(),
                models: last_bytes
                    .iter()
                    .map(|_| ArithmeticModelBuilder::new(256).build())
                    .collect(),
            }
        }
    }

    pub struct LasExtraByteDecompressor {
        // Each extra bytes has is own layer, thus its own decoder
        decoders: Vec<ArithmeticDecoder<Cursor<Vec<u8>>>>,
        layers_sizes: Vec<u32>,
        has_byte_changed: Vec<bool>,
        contexts: ChannelContexts<ExtraBytesContext>,
    }

    impl LasExtraByteDecompressor {
        pub fn new(count: usize) -> Self {
            Self {
                decoders: (0..count)
                    .map(|_i| ArithmeticDecoder::new(Cursor::new(Vec::<u8>::new())))
                    .collect(),
                layers_sizes: vec![0; count],
                has_byte_changed: vec![false; count],
                contexts: ChannelContexts::default(),
            }
        }
    }

    impl<R: Read> LayeredFieldDecompressor<R> for LasExtraByteDecompressor {
        fn size_of_field(&self) -> usize {
            self.decoders.len()
        }

        fn init_first_point(
            &mut self,
            src: &mut R,
            first_point: &mut [u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            src.read_exact(first_point)?;
            self.contexts
                .init(ExtraBytesContext::new(first_point), *context);
            Ok(())
        }

        fn decompress_field_with(
            &mut self,
            current_point: &mut [u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            let (the_context, previous) = self
                .contexts
                .switch_keeping_last(*context, |previous| {
                    ExtraBytesContext::new(&previous.last_bytes)
                })?;
            let last_bytes = match previous {
                Some(previous) => &mut previous.last_bytes,
                None => &mut the_context.last_bytes,
            };

            for i in 0..self.decoders.len() {
                if self.has_byte_changed[i] {
                    let diff = self.decoders[i].decode_symbol(&mut the_context.models[i])? as u8;
                    last_bytes[i] = last_bytes[i].wrapping_add(diff);
                }
            }
            current_point.copy_from_slice(last_bytes);
            Ok(())
        }

        fn read_layers_sizes(&mut self, src: &mut R) -> std::io::Result<()> {
            for layer_size in &mut self.layers_sizes {
                *layer_size = src.read_u32::<LittleEndian>()?;
            }
            Ok(())
        }

        fn read_layers(&mut self, src: &mut R) -> std::io::Result<()> {
            let layers = self.decoders.iter_mut().zip(&self.layers_sizes);
            for ((decoder, size), changed) in layers.zip(self.has_byte_changed.iter_mut()) {
                *changed = copy_bytes_into_decoder(*size as usize, decoder, src)?;
            }
            Ok(())
        }
    }

    pub struct LasExtraByteCompressor {
        // Each extra bytes has is own layer, thus its own encoder
        encoders: Vec<ArithmeticEncoder<Cursor<Vec<u8>>>>,
        has_byte_changed: Vec<bool>,
        contexts: ChannelContexts<ExtraBytesContext>,
    }

    impl LasExtraByteCompressor {
        pub fn new(count: usize) -> Self {
            Self {
                encoders: (0..count)
                    .map(|_i| ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new())))
                    .collect(),
                has_byte_changed: vec![false; count],
                contexts: ChannelContexts::default(),
            }
        }
    }

    impl<W: Write> LayeredFieldCompressor<W> for LasExtraByteCompressor {
        fn size_of_field(&self) -> usize {
            self.encoders.len()
        }

        fn init_first_point(
            &mut self,
            dst: &mut W,
            first_point: &[u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            dst.write_all(first_point)?;
            self.contexts
                .init(ExtraBytesContext::new(first_point), *context);
            Ok(())
        }

        fn compress_field_with(
            &mut self,
            current_point: &[u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            let (the_context, previous) = self
                .contexts
                .switch_keeping_last(*context, |previous| {
                    ExtraBytesContext::new(&previous.last_bytes)
                })?;
            let last_bytes = match previous {
                Some(previous) => &mut previous.last_bytes,
                None => &mut the_context.last_bytes,
            };

            for (i, encoder) in self.encoders.iter_mut().enumerate() {
                let diff = current_point[i].wrapping_sub(last_bytes[i]);
                encoder.encode_symbol(&mut the_context.models[i], u32::from(diff))?;
                if diff != 0 {
                    self.has_byte_changed[i] = true;
                    last_bytes[i] = current_point[i];
                }
            }
            Ok(())
        }

        fn write_layers_sizes(&mut self, dst: &mut W) -> std::io::Result<()> {
            for (encoder, changed) in self.encoders.iter_mut().zip(&self.has_byte_changed) {
                let size = finish_layer(encoder, *changed)?;
                dst.write_u32::<LittleEndian>(size)?;
            }
            Ok(())
        }

        fn write_layers(&mut self, dst: &mut W) -> std::io::Result<()> {
            for encoder in &mut self.encoders {
                copy_encoder_content_to(encoder, dst)?;
            }
            Ok(())
        }
    }
}

pub mod v4 {
    use super::v3;

    layered_v4_codecs!(LasExtraByteCompressor, LasExtraByteDecompressor);

    impl LasExtraByteCompressor {
        pub fn new(count: usize) -> Self {
            Self::from(v3::LasExtraByteCompressor::new(count))
        }
    }

    impl LasExtraByteDecompressor {
        pub fn new(count: usize) -> Self {
            Self::from(v3::LasExtraByteDecompressor::new(count))
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use crate::decoders::ArithmeticDecoder;
    use crate::encoders::ArithmeticEncoder;
    use crate::record::{
        FieldCompressor, FieldDecompressor, LayeredFieldCompressor, LayeredFieldDecompressor,
    };

    const POINTS: [[u8; 3]; 5] = [
        [0, 255, 10],
        [255, 0, 10],
        [1, 1, 10],
        [128, 200, 10],
        [127, 201, 10],
    ];

    #[test]
    fn test_v1_wrapping_differences() {
        let mut dst = Cursor::new(Vec::<u8>::new());
        let mut compressor = super::v1::LasExtraByteCompressor::new(3);
        compressor.compress_first(&mut dst, &POINTS[0]).unwrap();
        let mut encoder = ArithmeticEncoder::new(dst);
        for point in &POINTS[1..] {
            compressor.compress_with(&mut encoder, point).unwrap();
        }
        encoder.done().unwrap();

        let mut decompressor = super::v1::LasExtraByteDecompressor::new(3);
        let mut src = Cursor::new(encoder.into_inner().into_inner());
        let mut buf = [0u8; 3];
        decompressor.decompress_first(&mut src, &mut buf).unwrap();
        assert_eq!(buf, POINTS[0]);
        let mut decoder = ArithmeticDecoder::new(src);
        decoder.read_init_bytes().unwrap();
        for point in &POINTS[1..] {
            decompressor.decompress_with(&mut decoder, &mut buf).unwrap();
            assert_eq!(&buf, point);
        }
    }

    #[test]
    fn test_v3_layers() {
        let contexts = [2usize, 2, 0, 2, 1];
        let mut dst = Cursor::new(Vec::<u8>::new());
        let mut compressor = super::v3::LasExtraByteCompressor::new(3);
        let mut context = contexts[0];
        compressor
            .init_first_point(&mut dst, &POINTS[0], &mut context)
            .unwrap();
        for (point, ctx) in POINTS.iter().zip(&contexts).skip(1) {
            let mut context = *ctx;
            LayeredFieldCompressor::<Cursor<Vec<u8>>>::compress_field_with(
                &mut compressor,
                point,
                &mut context,
            )
            .unwrap();
        }
        compressor.write_layers_sizes(&mut dst).unwrap();
        compressor.write_layers(&mut dst).unwrap();
        let data = dst.into_inner();
        // the last byte never changes, its layer is empty
        assert_eq!(&data[11..15], &[0, 0, 0, 0]);

        let mut decompressor = super::v3::LasExtraByteDecompressor::new(3);
        let mut src = Cursor::new(data);
        let mut buf = [0u8; 3];
        let mut context = contexts[0];
        decompressor
            .init_first_point(&mut src, &mut buf, &mut context)
            .unwrap();
        decompressor.read_layers_sizes(&mut src).unwrap();
        decompressor.read_layers(&mut src).unwrap();
        for (point, ctx) in POINTS.iter().zip(&contexts).skip(1) {
            let mut context = *ctx;
            LayeredFieldDecompressor::<Cursor<Vec<u8>>>::decompress_field_with(
                &mut decompressor,
                &mut buf,
                &mut context,
            )
            .unwrap();
            assert_eq!(&buf, point);
        }
    }
}
