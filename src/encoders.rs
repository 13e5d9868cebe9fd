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

//! The arithmetic encoder.
//!
//! Encoded bytes go through a circular buffer made of two halves,
//! a half is only handed to the output stream once the encoder moved
//! to the other one, so that carries can still be propagated into it.

use std::io::Write;

use crate::decoders::{AC_MAX_LENGTH, AC_MIN_LENGTH};
use crate::models::{ArithmeticBitModel, ArithmeticModel, BM_LENGTH_SHIFT, DM_LENGTH_SHIFT};

const AC_BUFFER_SIZE: usize = 1024;

pub struct ArithmeticEncoder<T: Write> {
    out_buffer: Vec<u8>,
    // index of the next byte to be written in the buffer
    out_byte: usize,
    // index where the currently filled half ends
    end_byte: usize,

    base: u32,
    length: u32,

    out_stream: T,
}

impl<T: Write> ArithmeticEncoder<T> {
    pub fn new(out_stream: T) -> Self {
        Self {
            out_buffer: vec![0u8; 2 * AC_BUFFER_SIZE],
            out_byte: 0,
            end_byte: 2 * AC_BUFFER_SIZE,
            base: 0,
            length: AC_MAX_LENGTH,
            out_stream,
        }
    }

    /// Resets the interval and the buffer so the encoder can start
    /// a new independent sequence (e.g. a new chunk).
    ///
    /// Bytes of the previous sequence that were not flushed with [`done`](Self::done) are lost.
    pub fn reset(&mut self) {
        self.base = 0;
        self.length = AC_MAX_LENGTH;
        self.out_buffer.iter_mut().for_each(|b| *b = 0);
        self.out_byte = 0;
        self.end_byte = 2 * AC_BUFFER_SIZE;
    }

    /// Finishes the sequence: writes every pending byte to the output stream,
    /// followed by two or three zero bytes.
    pub fn done(&mut self) -> std::io::Result<()> {
        // done encoding: set final data bytes
        let init_base = self.base;
        let another_byte = if self.length > 2 * AC_MIN_LENGTH {
            // base offset
            self.base = self.base.wrapping_add(AC_MIN_LENGTH);
            // set new length for 1 more byte
            self.length = AC_MIN_LENGTH >> 1;
            true
        } else {
            // base offset
            self.base = self.base.wrapping_add(AC_MIN_LENGTH >> 1);
            // set new length for 2 more bytes
            self.length = AC_MIN_LENGTH >> 9;
            false
        };

        if init_base > self.base {
            self.propagate_carry();
        }
        self.renorm_enc_interval()?;

        if self.end_byte != 2 * AC_BUFFER_SIZE {
            // the second half was not yet written
            debug_assert!(self.out_byte < AC_BUFFER_SIZE);
            self.out_stream
                .write_all(&self.out_buffer[AC_BUFFER_SIZE..2 * AC_BUFFER_SIZE])?;
        }

        if self.out_byte != 0 {
            self.out_stream.write_all(&self.out_buffer[..self.out_byte])?;
        }

        self.out_stream.write_all(&[0u8, 0u8])?;
        if another_byte {
            self.out_stream.write_all(&[0u8])?;
        }
        Ok(())
    }

    pub fn encode_bit(&mut self, model: &mut ArithmeticBitModel, sym: u32) -> std::io::Result<()> {
        debug_assert!(sym <= 1);
        // product l x p0
        let x = model.bit_0_prob * (self.length >> BM_LENGTH_SHIFT);

        // update interval
        if sym == 0 {
            self.length = x;
            model.bit_0_count += 1;
        } else {
            let init_base = self.base;
            self.base = self.base.wrapping_add(x);
            self.length -= x;
            if init_base > self.base {
                self.propagate_carry();
            }
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_enc_interval()?;
        }

        model.bits_until_update -= 1;
        if model.bits_until_update == 0 {
            model.update();
        }
        Ok(())
    }

    pub fn encode_symbol(&mut self, model: &mut ArithmeticModel, sym: u32) -> std::io::Result<()> {
        debug_assert!(sym <= model.last_symbol);
        let init_base = self.base;

        // compute products
        if sym == model.last_symbol {
            let x = model.distribution[sym as usize] * (self.length >> DM_LENGTH_SHIFT);
            self.base = self.base.wrapping_add(x);
            // no product needed
            self.length -= x;
        } else {
            self.length >>= DM_LENGTH_SHIFT;
            let x = model.distribution[sym as usize] * self.length;
            self.base = self.base.wrapping_add(x);
            self.length = model.distribution[sym as usize + 1] * self.length - x;
        }

        if init_base > self.base {
            self.propagate_carry();
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_enc_interval()?;
        }

        model.symbol_count[sym as usize] += 1;
        model.symbols_until_update -= 1;
        if model.symbols_until_update == 0 {
            model.update();
        }
        Ok(())
    }

    /// Encodes a bit without modelling
    pub fn write_bit(&mut self, sym: u32) -> std::io::Result<()> {
        debug_assert!(sym <= 1);
        self.write_direct(1, sym)
    }

    /// Encodes the `bits` low bits of `sym` without modelling
    pub fn write_bits(&mut self, mut bits: u32, mut sym: u32) -> std::io::Result<()> {
        debug_assert!(bits > 0 && bits <= 32);
        debug_assert!(bits == 32 || sym < (1u32 << bits));

        if bits > 19 {
            self.write_short((sym & u32::from(u16::MAX)) as u16)?;
            sym >>= 16;
            bits -= 16;
        }
        self.write_direct(bits, sym)
    }

    pub fn write_byte(&mut self, sym: u8) -> std::io::Result<()> {
        self.write_direct(8, u32::from(sym))
    }

    pub fn write_short(&mut self, sym: u16) -> std::io::Result<()> {
        self.write_direct(16, u32::from(sym))
    }

    pub fn write_int(&mut self, sym: u32) -> std::io::Result<()> {
        // lower 16 bits
        self.write_short((sym & 0xFFFF) as u16)?;
        // upper 16 bits
        self.write_short((sym >> 16) as u16)
    }

    pub fn write_int64(&mut self, sym: u64) -> std::io::Result<()> {
        // lower 32 bits
        self.write_int((sym & 0xFFFF_FFFF) as u32)?;
        // upper 32 bits
        self.write_int((sym >> 32) as u32)
    }

    pub fn get_ref(&self) -> &T {
        &self.out_stream
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.out_stream
    }

    pub fn into_inner(self) -> T {
        self.out_stream
    }

    // `bits` must be at most 19 so that the new length is not zero.
    fn write_direct(&mut self, bits: u32, sym: u32) -> std::io::Result<()> {
        let init_base = self.base;
        // new interval base and length
        self.length >>= bits;
        self.base = self.base.wrapping_add(sym * self.length);

        // overflow = carry
        if init_base > self.base {
            self.propagate_carry();
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_enc_interval()?;
        }
        Ok(())
    }

    fn propagate_carry(&mut self) {
        let last = 2 * AC_BUFFER_SIZE - 1;
        let mut b = if self.out_byte == 0 {
            last
        } else {
            self.out_byte - 1
        };
        while self.out_buffer[b] == 0xFF {
            self.out_buffer[b] = 0;
            b = if b == 0 { last } else { b - 1 };
        }
        self.out_buffer[b] += 1;
    }

    fn renorm_enc_interval(&mut self) -> std::io::Result<()> {
        loop {
            debug_assert!(self.out_byte < self.end_byte);
            self.out_buffer[self.out_byte] = (self.base >> 24) as u8;
            self.out_byte += 1;
            if self.out_byte == self.end_byte {
                self.manage_out_buffer()?;
            }
            self.base <<= 8;
            // length multiplied by 256
            self.length <<= 8;
            if self.length >= AC_MIN_LENGTH {
                break;
            }
        }
        Ok(())
    }

    fn manage_out_buffer(&mut self) -> std::io::Result<()> {
        if self.out_byte == 2 * AC_BUFFER_SIZE {
            self.out_byte = 0;
        }
        // the half we move into is the one that gets flushed
        let start = self.out_byte;
        self.out_stream
            .write_all(&self.out_buffer[start..start + AC_BUFFER_SIZE])?;
        self.end_byte = start + AC_BUFFER_SIZE;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decoders::ArithmeticDecoder;
    use crate::models::ArithmeticModelBuilder;
    use std::io::Cursor;

    #[test]
    fn test_done_on_empty_stream() {
        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        encoder.done().unwrap();
        assert_eq!(encoder.into_inner().into_inner(), vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_raw_values_round_trip() {
        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        encoder.write_bit(1).unwrap();
        encoder.write_bits(5, 17).unwrap();
        encoder.write_bits(32, 0xDEAD_BEEF).unwrap();
        encoder.write_byte(0xAB).unwrap();
        encoder.write_short(0xCAFE).unwrap();
        encoder.write_int(123_456_789).unwrap();
        encoder.write_int64(u64::MAX - 5).unwrap();
        encoder.done().unwrap();

        let mut decoder = ArithmeticDecoder::new(Cursor::new(encoder.into_inner().into_inner()));
        decoder.read_init_bytes().unwrap();
        assert_eq!(decoder.read_bit().unwrap(), 1);
        assert_eq!(decoder.read_bits(5).unwrap(), 17);
        assert_eq!(decoder.read_bits(32).unwrap(), 0xDEAD_BEEF);
        assert_eq!(decoder.read_byte().unwrap(), 0xAB);
        assert_eq!(decoder.read_short().unwrap(), 0xCAFE);
        assert_eq!(decoder.read_int().unwrap(), 123_456_789);
        assert_eq!(decoder.read_int_64().unwrap(), u64::MAX - 5);
    }

    #[test]
    fn test_modelled_symbols_round_trip_across_buffer_halves() {
        // enough data to wrap around the circular buffer several times
        let symbols: Vec<u32> = (0..20_000u32).map(|i| (i * 7 + i / 3) % 256).collect();
        let bits: Vec<u32> = (0..20_000u32).map(|i| (i % 3 == 0) as u32).collect();

        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        let mut model = ArithmeticModelBuilder::new(256).compressing(true).build();
        let mut bit_model = ArithmeticBitModel::new();
        for (sym, bit) in symbols.iter().zip(&bits) {
            encoder.encode_symbol(&mut model, *sym).unwrap();
            encoder.encode_bit(&mut bit_model, *bit).unwrap();
        }
        encoder.done().unwrap();
        let data = encoder.into_inner().into_inner();
        assert!(data.len() > 4 * AC_BUFFER_SIZE);

        let mut decoder = ArithmeticDecoder::new(Cursor::new(data));
        decoder.read_init_bytes().unwrap();
        let mut model = ArithmeticModelBuilder::new(256).build();
        let mut bit_model = ArithmeticBitModel::new();
        for (sym, bit) in symbols.iter().zip(&bits) {
            assert_eq!(decoder.decode_symbol(&mut model).unwrap(), *sym);
            assert_eq!(decoder.decode_bit(&mut bit_model).unwrap(), *bit);
        }
    }

    #[test]
    fn test_reset_allows_new_sequence() {
        let mut encoder = ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new()));
        encoder.write_int(42).unwrap();
        encoder.reset();
        encoder.done().unwrap();
        assert_eq!(encoder.get_ref().get_ref(), &vec![1, 0, 0, 0]);
    }
}
