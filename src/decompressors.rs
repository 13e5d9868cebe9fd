/*
===============================================================================

  CONTENTS:
    Integer compressor

  PROGRAMMERS:

    martin.isenburg@rapidlasso.com  -  http://rapidlasso.com
    uday.karan@gmail.com - Hobu, Inc.

  COPYRIGHT:

    (c) 2007-2014, martin isenburg, rapidlasso - tools to catch reality
    (c) 2014, Uday Verma, Hobu, Inc.
    (c) 2019, Thomas Montaigu

    This is free software; you can redistribute and/or modify it under the
    terms of the Apache Public License 2.0 published by the Apache Software
    Foundation. See the COPYING file for more information.

    This software is distributed WITHOUT ANY WARRANTY and without even the
    implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.

  CHANGE HISTORY:
    6 June 2019: Translated to Rust

===============================================================================
*/


use std::io::Read;

use crate::compressors::{
    CorrectorRange, DEFAULT_BITS, DEFAULT_BITS_HIGH, DEFAULT_CONTEXTS, DEFAULT_RANGE,
};
use crate::decoders::ArithmeticDecoder;
use crate::errors::corrupted;
use crate::models::{ArithmeticBitModel, ArithmeticModel};

/// Counterpart of the [`IntegerCompressor`](crate::compressors::IntegerCompressor)
#[derive(Debug, Clone)]
pub struct IntegerDecompressor {
    k: u32,
    bits_high: u32,
    corr: CorrectorRange,

    m_bits: Vec<ArithmeticModel>,
    m_corrector_0: ArithmeticBitModel,
    m_corrector: Vec<ArithmeticModel>,
}

impl IntegerDecompressor {
    pub fn new(bits: u32, contexts: u32, bits_high: u32, range: u32) -> Self {
        let corr = CorrectorRange::new(bits, range);
        Self {
            k: 0,
            bits_high,
            corr,
            m_bits: corr.bits_models(contexts, false),
            m_corrector_0: ArithmeticBitModel::new(),
            m_corrector: corr.corrector_models(bits_high, false),
        }
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    /// Decompresses the value that was compressed with `pred` as prediction.
    ///
    /// A `context` out of the configured contexts can only come from a corrupted stream.
    pub fn decompress<T: Read>(
        &mut self,
        decoder: &mut ArithmeticDecoder<T>,
        pred: i32,
        context: u32,
    ) -> std::io::Result<i32> {
        if context as usize >= self.m_bits.len() {
            return Err(corrupted("integer context"));
        }
        let corr = self.read_corrector(decoder, context as usize)?;
        let mut real = pred.wrapping_add(corr);
        if real < 0 {
            real = real.wrapping_add(self.corr.range as i32);
        } else if self.corr.range != 0 && real as u32 >= self.corr.range {
            real = real.wrapping_sub(self.corr.range as i32);
        }
        Ok(real)
    }

    fn read_corrector<T: Read>(
        &mut self,
        decoder: &mut ArithmeticDecoder<T>,
        context: usize,
    ) -> std::io::Result<i32> {
        // decode within which interval the corrector is falling
        self.k = decoder.decode_symbol(&mut self.m_bits[context])?;

        if self.k == 0 {
            // then c is 0 or 1
            return Ok(decoder.decode_bit(&mut self.m_corrector_0)? as i32);
        }
        if self.k >= 32 {
            return Ok(self.corr.min);
        }

        // decode the exact location of the corrector within the interval
        let m_corrector = &mut self.m_corrector[(self.k - 1) as usize];
        let c = if self.k <= self.bits_high {
            // for small k we can do this in one step
            decoder.decode_symbol(m_corrector)?
        } else {
            // for larger k we need to do this in two steps
            let k1 = self.k - self.bits_high;
            let high = decoder.decode_symbol(m_corrector)?;
            let low = decoder.read_bits(k1)?;
            (high << k1) | low
        } as i32;

        // translate c back into its correct interval
        if c >= (1u32 << (self.k - 1)) as i32 {
            // [ 2^(k-1) + 1  ...  2^k ] by adding 1
            Ok(c.wrapping_add(1))
        } else {
            // [ - (2^k - 1)  ...  - (2^(k-1)) ] by subtracting (2^k - 1)
            Ok(c.wrapping_sub(((1u32 << self.k) - 1) as i32))
        }
    }
}

pub struct IntegerDecompressorBuilder {
    bits: u32,
    contexts: u32,
}

impl IntegerDecompressorBuilder {
    pub fn new() -> Self {
        Self {
            bits: DEFAULT_BITS,
            contexts: DEFAULT_CONTEXTS,
        }
    }

    pub fn bits(&mut self, bits: u32) -> &mut Self {
        self.bits = bits;
        self
    }

    pub fn contexts(&mut self, contexts: u32) -> &mut Self {
        self.contexts = contexts;
        self
    }

    pub fn build(&self) -> IntegerDecompressor {
        IntegerDecompressor::new(self.bits, self.contexts, DEFAULT_BITS_HIGH, DEFAULT_RANGE)
    }
}

impl Default for IntegerDecompressorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compressors::{IntegerCompressor, IntegerCompressorBuilder};
    use crate::encoders::ArithmeticEncoder;
    use crate::errors::LasZipError;
    use std::io::Cursor;

    #[test]
    fn test_out_of_range_context_is_corruption() {
        let mut decoder = ArithmeticDecoder::new(Cursor::new(vec![0u8; 16]));
        decoder.read_init_bytes().unwrap();
        let mut idc = IntegerDecompressorBuilder::new().contexts(2).build();
        let err = idc.decompress(&mut decoder, 0, 2).unwrap_err();
        assert!(matches!(
            LasZipError::from(err),
            LasZipError::StreamCorruption { .. }
        ));
    }

    #[test]
    fn test_range_configuration() {
        let values = [(10i32, 90i32), (90, 10), (0, 99), (50, 50)];
        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        let mut ic = IntegerCompressor::new(DEFAULT_BITS, 1, DEFAULT_BITS_HIGH, 100);
        for (pred, real) in &values {
            ic.compress(&mut encoder, *pred, *real, 0).unwrap();
        }
        encoder.done().unwrap();

        let mut decoder = ArithmeticDecoder::new(Cursor::new(encoder.into_inner().into_inner()));
        decoder.read_init_bytes().unwrap();
        let mut idc = IntegerDecompressor::new(DEFAULT_BITS, 1, DEFAULT_BITS_HIGH, 100);
        for (pred, real) in &values {
            assert_eq!(idc.decompress(&mut decoder, *pred, 0).unwrap(), *real);
        }
    }

    #[test]
    fn test_fresh_compressors_code_the_same_bytes() {
        let values: Vec<i32> = (0..500).map(|i| i * 13 - 2000).collect();
        let encode = |mut ic: IntegerCompressor| {
            let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
            for v in &values {
                ic.compress(&mut encoder, 0, *v, 0).unwrap();
            }
            encoder.done().unwrap();
            encoder.into_inner().into_inner()
        };
        let first = encode(IntegerCompressorBuilder::new().bits(32).build());
        let second = encode(IntegerCompressorBuilder::new().bits(32).build());
        assert_eq!(first, second);

        let mut idc = IntegerDecompressorBuilder::new().bits(32).build();
        let mut decoder = ArithmeticDecoder::new(Cursor::new(first));
        decoder.read_init_bytes().unwrap();
        for v in &values {
            assert_eq!(idc.decompress(&mut decoder, 0, 0).unwrap(), *v);
        }
    }
}
