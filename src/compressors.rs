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


//! Compression of integers as corrections of a prediction.
//!
//! The difference between the real value and its prediction (the corrector)
//! is coded in two steps: first the number of bits `k` needed to represent it
//! (with one model per context), then its exact position in the interval
//! `[-(2^k - 1), 2^k]`.

use std::io::Write;

use crate::encoders::ArithmeticEncoder;
use crate::models::{ArithmeticBitModel, ArithmeticModel, ArithmeticModelBuilder};

pub const DEFAULT_BITS: u32 = 16;
pub const DEFAULT_CONTEXTS: u32 = 1;
pub const DEFAULT_BITS_HIGH: u32 = 8;
pub const DEFAULT_RANGE: u32 = 0;

/// Corrector interval derived from the `bits` & `range` configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct CorrectorRange {
    pub(crate) bits: u32,
    pub(crate) range: u32,
    pub(crate) min: i32,
    pub(crate) max: i32,
}

impl CorrectorRange {
    pub(crate) fn new(bits: u32, mut range: u32) -> Self {
        if range != 0 {
            // the corrector's significant bits and range
            let corr_range = range;
            let mut corr_bits = 0u32;
            while range != 0 {
                range >>= 1;
                corr_bits += 1;
            }
            if corr_range == (1u32 << (corr_bits - 1)) {
                corr_bits -= 1;
            }
            Self::centered(corr_bits, corr_range)
        } else if bits >= 1 && bits < 32 {
            Self::centered(bits, 1u32 << bits)
        } else {
            Self {
                bits: 32,
                range: 0,
                min: i32::MIN,
                max: i32::MAX,
            }
        }
    }

    // the corrector must fall into [min, max]
    fn centered(bits: u32, range: u32) -> Self {
        let min = -((range / 2) as i32);
        Self {
            bits,
            range,
            min,
            max: min.wrapping_add((range - 1) as i32),
        }
    }

    /// The models used to code the `k` of each context
    pub(crate) fn bits_models(&self, contexts: u32, compress: bool) -> Vec<ArithmeticModel> {
        (0..contexts)
            .map(|_| {
                ArithmeticModelBuilder::new(self.bits + 1)
                    .compressing(compress)
                    .build()
            })
            .collect()
    }

    /// The models used to code the corrector for each `k` in `1..=bits`
    pub(crate) fn corrector_models(&self, bits_high: u32, compress: bool) -> Vec<ArithmeticModel> {
        (1..=self.bits)
            .map(|i| {
                ArithmeticModelBuilder::new(1u32 << i.min(bits_high))
                    .compressing(compress)
                    .build()
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct IntegerCompressor {
    k: u32,
    bits_high: u32,
    corr: CorrectorRange,

    m_bits: Vec<ArithmeticModel>,
    m_corrector_0: ArithmeticBitModel,
    m_corrector: Vec<ArithmeticModel>,
}

impl IntegerCompressor {
    pub fn new(bits: u32, contexts: u32, bits_high: u32, range: u32) -> Self {
        let corr = CorrectorRange::new(bits, range);
        Self {
            k: 0,
            bits_high,
            corr,
            m_bits: corr.bits_models(contexts, true),
            m_corrector_0: ArithmeticBitModel::new(),
            m_corrector: corr.corrector_models(bits_high, true),
        }
    }

    /// Number of bits of the last corrector compressed.
    ///
    /// Callers use it to select the context of correlated values.
    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn compress<T: Write>(
        &mut self,
        encoder: &mut ArithmeticEncoder<T>,
        pred: i32,
        real: i32,
        context: u32,
    ) -> std::io::Result<()> {
        // the corrector will be within the interval [ - (corr_range - 1)  ...  + (corr_range - 1) ]
        let mut corr = real.wrapping_sub(pred);
        // we fold the corrector into the interval [ corr_min  ...  corr_max ]
        if corr < self.corr.min {
            corr = corr.wrapping_add(self.corr.range as i32);
        } else if corr > self.corr.max {
            corr = corr.wrapping_sub(self.corr.range as i32);
        }
        self.write_corrector(encoder, corr, context as usize)
    }

    fn write_corrector<T: Write>(
        &mut self,
        encoder: &mut ArithmeticEncoder<T>,
        mut c: i32,
        context: usize,
    ) -> std::io::Result<()> {
        // find the tightest interval [ - (2^k - 1)  ...  + (2^k) ] that contains c
        // by checking the absolute value of c (adjusted for the case that c is 2^k)
        let c1 = if c <= 0 {
            c.wrapping_neg() as u32
        } else {
            (c - 1) as u32
        };
        self.k = 32 - c1.leading_zeros();

        // the number k is between 0 and corr_bits and describes the interval the corrector falls into
        encoder.encode_symbol(&mut self.m_bits[context], self.k)?;

        if self.k == 0 {
            // then c is 0 or 1
            debug_assert!(c == 0 || c == 1);
            return encoder.encode_bit(&mut self.m_corrector_0, c as u32);
        }
        if self.k == 32 {
            // only possible for 32 bits correctors, c is corr_min and nothing else is needed
            return Ok(());
        }

        // translate the corrector c into the k-bit interval [ 0 ... 2^k - 1 ]
        if c >= 0 {
            // into [ 2^(k-1) ...  + 2^k - 1 ] by subtracting 1
            c -= 1;
        } else {
            // into [ 0 ...  + 2^(k-1) - 1 ] by adding (2^k - 1)
            c = c.wrapping_add(((1u32 << self.k) - 1) as i32);
        }

        let m_corrector = &mut self.m_corrector[(self.k - 1) as usize];
        if self.k <= self.bits_high {
            // for small k we code the interval in one step
            encoder.encode_symbol(m_corrector, c as u32)
        } else {
            // for larger k we need to code the interval in two steps
            let k1 = self.k - self.bits_high;
            // the lowest k1 bits
            let low = (c as u32) & ((1u32 << k1) - 1);
            // the highest bits_high bits, through a context table
            encoder.encode_symbol(m_corrector, (c as u32) >> k1)?;
            // the lower bits are stored raw
            encoder.write_bits(k1, low)
        }
    }
}

pub struct IntegerCompressorBuilder {
    bits: u32,
    contexts: u32,
}

impl IntegerCompressorBuilder {
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

    pub fn build(&self) -> IntegerCompressor {
        IntegerCompressor::new(self.bits, self.contexts, DEFAULT_BITS_HIGH, DEFAULT_RANGE)
    }
}

impl Default for IntegerCompressorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
