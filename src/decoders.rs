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

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
//                                                                           -
//                       ****************************                        -
//                        ARITHMETIC CODING EXAMPLES                         -
//                       ****************************                        -
//                                                                           -
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
//                                                                           -
// Fast arithmetic coding implementation                                     -
// -> 32-bit variables, 32-bit product, periodic updates, table decoding     -
//                                                                           -
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
//                                                                           -
// Version 1.00  -  April 25, 2004                                           -
//                                                                           -
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
//                                                                           -
//                                  WARNING                                  -
//                                 =========                                 -
//                                                                           -
// The only purpose of this program is to demonstrate the basic principles   -
// of arithmetic coding. The original version of this code can be found in   -
// Digital Signal Compression: Principles and Practice                       -
// (Cambridge University Press, 2011, ISBN: 9780511984655)                   -
//                                                                           -
// Copyright (c) 2019 by Amir Said (said@ieee.org) &                         -
//                       William A. Pearlman (pearlw@ecse.rpi.edu)           -
//                                                                           -
// Redistribution and use in source and binary forms, with or without        -
// modification, are permitted provided that the following conditions are    -
// met:                                                                      -
//                                                                           -
// 1. Redistributions of source code must retain the above copyright notice, -
// this list of conditions and the following disclaimer.                     -
//                                                                           -
// 2. Redistributions in binary form must reproduce the above copyright      -
// notice, this list of conditions and the following disclaimer in the       -
// documentation and/or other materials provided with the distribution.      -
//                                                                           -
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS       -
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED -
// TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A           -
// PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER -
// OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,  -
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,       -
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR        -
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF    -
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING      -
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS        -
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.              -
//                                                                           -
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
//                                                                           -
// A description of the arithmetic coding method used here is available in   -
//                                                                           -
// Lossless Compression Handbook, ed. K. Sayood                              -
// Chapter 5: Arithmetic Coding (A. Said), pp. 101-152, Academic Press, 2003 -
//                                                                           -
// A. Said, Introduction to Arithetic Coding Theory and Practice             -
// HP Labs report HPL-2004-76  -  http://www.hpl.hp.com/techreports/         -
//                                                                           -
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -


//! The arithmetic decoder.

use byteorder::ReadBytesExt;
use std::io::Read;

use crate::errors::corrupted;
use crate::models::{ArithmeticBitModel, ArithmeticModel, BM_LENGTH_SHIFT, DM_LENGTH_SHIFT};

/// Maximum AC interval length
pub const AC_MAX_LENGTH: u32 = 0xFFFF_FFFF;
/// Threshold for renormalization
pub const AC_MIN_LENGTH: u32 = 0x0100_0000;

const CORRUPTED_ATTRIBUTE: &str = "arithmetic decoder";

pub struct ArithmeticDecoder<T: Read> {
    in_stream: T,
    value: u32,
    length: u32,
}

impl<T: Read> ArithmeticDecoder<T> {
    pub fn new(in_stream: T) -> Self {
        Self {
            in_stream,
            value: 0,
            length: AC_MAX_LENGTH,
        }
    }

    pub fn reset(&mut self) {
        self.value = 0;
        self.length = AC_MAX_LENGTH;
    }

    /// Primes the decoder with the first 4 bytes of the sequence.
    ///
    /// Must be called before decoding anything, and again after a [`reset`](Self::reset).
    pub fn read_init_bytes(&mut self) -> std::io::Result<()> {
        let mut v = [0u8; 4];
        self.in_stream.read_exact(&mut v)?;
        self.value = u32::from_be_bytes(v);
        // no encoder can produce a value outside of the initial interval
        if self.value >= self.length {
            return Err(corrupted(CORRUPTED_ATTRIBUTE));
        }
        Ok(())
    }

    pub fn decode_bit(&mut self, model: &mut ArithmeticBitModel) -> std::io::Result<u32> {
        // product l x p0
        let x = model.bit_0_prob * (self.length >> BM_LENGTH_SHIFT);
        let sym = self.value >= x;

        if !sym {
            self.length = x;
            model.bit_0_count += 1;
        } else {
            self.value -= x;
            self.length -= x;
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_dec_interval()?;
        }

        model.bits_until_update -= 1;
        if model.bits_until_update == 0 {
            model.update();
        }
        Ok(sym as u32)
    }

    pub fn decode_symbol(&mut self, model: &mut ArithmeticModel) -> std::io::Result<u32> {
        let mut sym;
        let mut x;
        let mut y = self.length;

        if !model.decoder_table.is_empty() {
            // use table look-up for faster decoding
            self.length >>= DM_LENGTH_SHIFT;
            let dv = self.value / self.length;
            let t = (dv >> model.table_shift) as usize;
            if t + 1 >= model.decoder_table.len() {
                return Err(corrupted(CORRUPTED_ATTRIBUTE));
            }

            // initial decision based on table look-up
            sym = model.decoder_table[t];
            let mut n = model.decoder_table[t + 1] + 1;

            // finish with bisection search
            while n > sym + 1 {
                let k = (sym + n) >> 1;
                if model.distribution[k as usize] > dv {
                    n = k;
                } else {
                    sym = k;
                }
            }
            // compute products
            x = model.distribution[sym as usize] * self.length;
            if sym != model.last_symbol {
                y = model.distribution[sym as usize + 1] * self.length;
            }
        } else {
            x = 0;
            sym = 0;
            self.length >>= DM_LENGTH_SHIFT;
            let mut n = model.symbols;
            let mut k = n >> 1;

            // bisection search
            loop {
                let z = self.length * model.distribution[k as usize];
                if z > self.value {
                    n = k;
                    // value is smaller
                    y = z;
                } else {
                    sym = k;
                    // value is larger or equal
                    x = z;
                }
                k = (sym + n) >> 1;
                if k == sym {
                    break;
                }
            }
        }

        // update interval
        self.value -= x;
        self.length = y - x;
        if self.length < AC_MIN_LENGTH {
            self.renorm_dec_interval()?;
        }

        model.symbol_count[sym as usize] += 1;
        model.symbols_until_update -= 1;
        if model.symbols_until_update == 0 {
            model.update();
        }
        Ok(sym)
    }

    /// Decodes a bit without modelling
    pub fn read_bit(&mut self) -> std::io::Result<u32> {
        self.read_direct(1)
    }

    /// Decodes `bits` bits without modelling, `bits` must be in `1..=32`
    pub fn read_bits(&mut self, bits: u32) -> std::io::Result<u32> {
        debug_assert!(bits > 0 && bits <= 32);
        if bits > 19 {
            let lower = u32::from(self.read_short()?);
            let upper = self.read_direct(bits - 16)?;
            Ok(upper << 16 | lower)
        } else {
            self.read_direct(bits)
        }
    }

    pub fn read_byte(&mut self) -> std::io::Result<u8> {
        self.read_direct(8).map(|sym| sym as u8)
    }

    pub fn read_short(&mut self) -> std::io::Result<u16> {
        self.read_direct(16).map(|sym| sym as u16)
    }

    pub fn read_int(&mut self) -> std::io::Result<u32> {
        let lower_int = self.read_short()?;
        let upper_int = self.read_short()?;
        Ok(u32::from(upper_int) << 16 | u32::from(lower_int))
    }

    pub fn read_int_64(&mut self) -> std::io::Result<u64> {
        let lower_int = u64::from(self.read_int()?);
        let upper_int = u64::from(self.read_int()?);
        Ok((upper_int << 32) | lower_int)
    }

    pub fn get_ref(&self) -> &T {
        &self.in_stream
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.in_stream
    }

    pub fn into_inner(self) -> T {
        self.in_stream
    }

    fn read_direct(&mut self, bits: u32) -> std::io::Result<u32> {
        // decode symbol, change length
        self.length >>= bits;
        let sym = self.value / self.length;
        if bits < 32 && sym >= (1u32 << bits) {
            return Err(corrupted(CORRUPTED_ATTRIBUTE));
        }
        // update interval
        self.value -= self.length * sym;
        if self.length < AC_MIN_LENGTH {
            self.renorm_dec_interval()?;
        }
        Ok(sym)
    }

    fn renorm_dec_interval(&mut self) -> std::io::Result<()> {
        loop {
            self.value = (self.value << 8) | u32::from(self.in_stream.read_u8()?);
            self.length <<= 8;
            if self.length >= AC_MIN_LENGTH {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::LasZipError;
    use std::io::Cursor;

    #[test]
    fn test_init_value_outside_interval_is_corruption() {
        let mut decoder = ArithmeticDecoder::new(Cursor::new(vec![0xFFu8; 8]));
        let err = LasZipError::from(decoder.read_init_bytes().unwrap_err());
        assert!(matches!(
            err,
            LasZipError::StreamCorruption {
                attribute: "arithmetic decoder"
            }
        ));
    }

    #[test]
    fn test_missing_bytes_is_exhaustion() {
        let mut decoder = ArithmeticDecoder::new(Cursor::new(vec![0u8; 2]));
        let err = LasZipError::from(decoder.read_init_bytes().unwrap_err());
        assert!(matches!(err, LasZipError::StreamExhausted));

        let mut decoder = ArithmeticDecoder::new(Cursor::new(vec![0u8; 4]));
        decoder.read_init_bytes().unwrap();
        let err = LasZipError::from(decoder.read_int().unwrap_err());
        assert!(matches!(err, LasZipError::StreamExhausted));
    }

    #[test]
    fn test_large_model_round_trip() {
        use crate::encoders::ArithmeticEncoder;
        use crate::models::ArithmeticModelBuilder;

        let symbols: Vec<u32> = (0..5000u32).map(|i| (i * i) % 2048).collect();
        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        let mut model = ArithmeticModelBuilder::new(2048).compressing(true).build();
        for sym in &symbols {
            encoder.encode_symbol(&mut model, *sym).unwrap();
        }
        encoder.done().unwrap();

        let mut decoder = ArithmeticDecoder::new(Cursor::new(encoder.into_inner().into_inner()));
        decoder.read_init_bytes().unwrap();
        let mut model = ArithmeticModelBuilder::new(2048).build();
        for sym in &symbols {
            assert_eq!(decoder.decode_symbol(&mut model).unwrap(), *sym);
        }
    }
}
