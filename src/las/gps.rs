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

//! Defines the different version of compressors and decompressors for the GpsTime

use std::io::{Read, Write};

use crate::compressors::IntegerCompressor;
use crate::decoders::ArithmeticDecoder;
use crate::decompressors::IntegerDecompressor;
use crate::encoders::ArithmeticEncoder;
use crate::las::utils::i32_quantize;
use crate::models::ArithmeticModel;
use crate::packers::Packable;

pub(crate) const LASZIP_GPS_TIME_MULTI: i32 = 500;
pub(crate) const LASZIP_GPS_TIME_MULTI_MINUS: i32 = -10;
pub(crate) const LASZIP_GPS_TIME_MULTI_UNCHANGED: i32 =
    LASZIP_GPS_TIME_MULTI - LASZIP_GPS_TIME_MULTI_MINUS + 1;
pub(crate) const LASZIP_GPS_TIME_MULTI_CODE_FULL: i32 =
    LASZIP_GPS_TIME_MULTI - LASZIP_GPS_TIME_MULTI_MINUS + 2;

pub(crate) const LASZIP_GPS_TIME_MULTI_TOTAL: i32 =
    LASZIP_GPS_TIME_MULTI - LASZIP_GPS_TIME_MULTI_MINUS + 6;

/// Struct to store GpsTime
///
/// As the value (an f64 in LAS files) needs to be reinterpreted
/// (not simply converted with 'as') to i64
/// during compression / decompression this struct provides a convenient wrapper
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct GpsTime {
    pub value: i64,
}

impl GpsTime {
    pub const SIZE: usize = 8;
}

impl From<f64> for GpsTime {
    fn from(v: f64) -> Self {
        Self {
            value: v.to_bits() as i64,
        }
    }
}

impl From<i64> for GpsTime {
    fn from(v: i64) -> Self {
        Self { value: v }
    }
}

impl From<GpsTime> for i64 {
    fn from(gps: GpsTime) -> Self {
        gps.value
    }
}

impl From<GpsTime> for f64 {
    fn from(gps: GpsTime) -> Self {
        f64::from_bits(gps.value as u64)
    }
}

impl Packable for GpsTime {
    fn unpack_from(input: &[u8]) -> Self {
        Self {
            value: i64::unpack_from(input),
        }
    }

    fn pack_into(&self, output: &mut [u8]) {
        self.value.pack_into(output)
    }
}

/// Difference between two gps times as raw integers,
/// if it can be represented with 32 bits.
#[inline]
fn diff_within_32_bits(current: i64, last: i64) -> Option<i32> {
    let diff_64 = current.wrapping_sub(last);
    let diff_32 = diff_64 as i32;
    if diff_64 == i64::from(diff_32) {
        Some(diff_32)
    } else {
        None
    }
}

/// The 4 interleaved sequences of gps times the predictor can switch between.
///
/// Used by the version 2 gps time codec and by the point 14 codec.
#[derive(Copy, Clone, Debug)]
pub(crate) struct GpsTimeSequences {
    pub(crate) last: usize,
    next: usize,
    last_gps_times: [i64; 4],
    last_gps_time_diffs: [i32; 4],
    multi_extreme_counters: [i32; 4],
}

impl GpsTimeSequences {
    pub(crate) fn new(first_gps_time: i64) -> Self {
        Self {
            last: 0,
            next: 0,
            last_gps_times: [first_gps_time, 0, 0, 0],
            last_gps_time_diffs: [0i32; 4],
            multi_extreme_counters: [0i32; 4],
        }
    }

    #[inline]
    pub(crate) fn last_gps_time(&self) -> i64 {
        self.last_gps_times[self.last]
    }

    #[inline]
    pub(crate) fn last_diff_is_zero(&self) -> bool {
        self.last_gps_time_diffs[self.last] == 0
    }

    #[inline]
    pub(crate) fn diff_to_last(&self, gps_time: i64) -> Option<i32> {
        diff_within_32_bits(gps_time, self.last_gps_time())
    }

    /// Returns by how much `last` has to move to reach a sequence
    /// whose last gps time is close enough to `gps_time`.
    pub(crate) fn find_close_sequence(&self, gps_time: i64) -> Option<usize> {
        (1..4).find(|i| {
            diff_within_32_bits(gps_time, self.last_gps_times[(self.last + i) & 3]).is_some()
        })
    }

    #[inline]
    pub(crate) fn switch_by(&mut self, offset: usize) {
        self.last = (self.last + offset) & 3;
    }

    #[inline]
    pub(crate) fn set_last_gps_time(&mut self, gps_time: i64) {
        self.last_gps_times[self.last] = gps_time;
    }

    fn count_extreme_multi(&mut self, diff: i32) {
        self.multi_extreme_counters[self.last] += 1;
        if self.multi_extreme_counters[self.last] > 3 {
            self.last_gps_time_diffs[self.last] = diff;
            self.multi_extreme_counters[self.last] = 0;
        }
    }

    /// The sequence had no difference yet, `diff` becomes its difference.
    pub(crate) fn compress_first_diff<W: Write>(
        &mut self,
        encoder: &mut ArithmeticEncoder<W>,
        ic_gps_time: &mut IntegerCompressor,
        diff: i32,
    ) -> std::io::Result<()> {
        ic_gps_time.compress(encoder, 0, diff, 0)?;
        self.last_gps_time_diffs[self.last] = diff;
        self.multi_extreme_counters[self.last] = 0;
        Ok(())
    }

    pub(crate) fn decompress_first_diff<R: Read>(
        &mut self,
        decoder: &mut ArithmeticDecoder<R>,
        ic_gps_time: &mut IntegerDecompressor,
    ) -> std::io::Result<()> {
        let diff = ic_gps_time.decompress(decoder, 0, 0)?;
        self.last_gps_time_diffs[self.last] = diff;
        self.multi_extreme_counters[self.last] = 0;
        self.last_gps_times[self.last] = self.last_gps_time().wrapping_add(i64::from(diff));
        Ok(())
    }

    /// Encodes the multiplier between `diff` & the last difference
    /// and then the residual of the prediction.
    pub(crate) fn compress_multi<W: Write>(
        &mut self,
        encoder: &mut ArithmeticEncoder<W>,
        multi_model: &mut ArithmeticModel,
        ic_gps_time: &mut IntegerCompressor,
        diff: i32,
    ) -> std::io::Result<()> {
        let last_diff = self.last_gps_time_diffs[self.last];
        let multi = i32_quantize(diff as f32 / last_diff as f32);

        if multi == 1 {
            encoder.encode_symbol(multi_model, 1)?;
            ic_gps_time.compress(encoder, last_diff, diff, 1)?;
            self.multi_extreme_counters[self.last] = 0;
        } else if multi > 0 {
            if multi < LASZIP_GPS_TIME_MULTI {
                encoder.encode_symbol(multi_model, multi as u32)?;
                let context = if multi < 10 { 2 } else { 3 };
                ic_gps_time.compress(encoder, multi.wrapping_mul(last_diff), diff, context)?;
            } else {
                encoder.encode_symbol(multi_model, LASZIP_GPS_TIME_MULTI as u32)?;
                ic_gps_time.compress(
                    encoder,
                    LASZIP_GPS_TIME_MULTI.wrapping_mul(last_diff),
                    diff,
                    4,
                )?;
                self.count_extreme_multi(diff);
            }
        } else if multi < 0 {
            if multi > LASZIP_GPS_TIME_MULTI_MINUS {
                encoder.encode_symbol(multi_model, (LASZIP_GPS_TIME_MULTI - multi) as u32)?;
                ic_gps_time.compress(encoder, multi.wrapping_mul(last_diff), diff, 5)?;
            } else {
                encoder.encode_symbol(
                    multi_model,
                    (LASZIP_GPS_TIME_MULTI - LASZIP_GPS_TIME_MULTI_MINUS) as u32,
                )?;
                ic_gps_time.compress(
                    encoder,
                    LASZIP_GPS_TIME_MULTI_MINUS.wrapping_mul(last_diff),
                    diff,
                    6,
                )?;
                self.count_extreme_multi(diff);
            }
        } else {
            encoder.encode_symbol(multi_model, 0)?;
            ic_gps_time.compress(encoder, 0, diff, 7)?;
            self.count_extreme_multi(diff);
        }
        Ok(())
    }

    /// Decodes the residual for a `multi` symbol that is below the unchanged symbol
    /// and updates the last gps time.
    pub(crate) fn decompress_multi<R: Read>(
        &mut self,
        decoder: &mut ArithmeticDecoder<R>,
        ic_gps_time: &mut IntegerDecompressor,
        multi: i32,
    ) -> std::io::Result<()> {
        let last_diff = self.last_gps_time_diffs[self.last];
        let diff = if multi == 1 {
            let diff = ic_gps_time.decompress(decoder, last_diff, 1)?;
            self.multi_extreme_counters[self.last] = 0;
            diff
        } else if multi == 0 {
            let diff = ic_gps_time.decompress(decoder, 0, 7)?;
            self.count_extreme_multi(diff);
            diff
        } else if multi < LASZIP_GPS_TIME_MULTI {
            let context = if multi < 10 { 2 } else { 3 };
            ic_gps_time.decompress(decoder, multi.wrapping_mul(last_diff), context)?
        } else if multi == LASZIP_GPS_TIME_MULTI {
            let diff = ic_gps_time.decompress(
                decoder,
                LASZIP_GPS_TIME_MULTI.wrapping_mul(last_diff),
                4,
            )?;
            self.count_extreme_multi(diff);
            diff
        } else {
            let multi = LASZIP_GPS_TIME_MULTI - multi;
            if multi > LASZIP_GPS_TIME_MULTI_MINUS {
                ic_gps_time.decompress(decoder, multi.wrapping_mul(last_diff), 5)?
            } else {
                let diff = ic_gps_time.decompress(
                    decoder,
                    LASZIP_GPS_TIME_MULTI_MINUS.wrapping_mul(last_diff),
                    6,
                )?;
                self.count_extreme_multi(diff);
                diff
            }
        };
        self.last_gps_times[self.last] = self.last_gps_time().wrapping_add(i64::from(diff));
        Ok(())
    }

    /// Starts a new sequence with a gps time too far from all the known sequences:
    /// the upper 32 bits are predicted, the lower ones are written raw.
    pub(crate) fn compress_full<W: Write>(
        &mut self,
        encoder: &mut ArithmeticEncoder<W>,
        ic_gps_time: &mut IntegerCompressor,
        gps_time: i64,
    ) -> std::io::Result<()> {
        ic_gps_time.compress(
            encoder,
            (self.last_gps_time() >> 32) as i32,
            (gps_time >> 32) as i32,
            8,
        )?;
        encoder.write_int(gps_time as u32)?;
        self.next = (self.next + 1) & 3;
        self.last = self.next;
        self.last_gps_time_diffs[self.last] = 0;
        self.multi_extreme_counters[self.last] = 0;
        self.last_gps_times[self.last] = gps_time;
        Ok(())
    }

    pub(crate) fn decompress_full<R: Read>(
        &mut self,
        decoder: &mut ArithmeticDecoder<R>,
        ic_gps_time: &mut IntegerDecompressor,
    ) -> std::io::Result<()> {
        self.next = (self.next + 1) & 3;
        let upper = ic_gps_time.decompress(decoder, (self.last_gps_time() >> 32) as i32, 8)?;
        let lower = decoder.read_int()?;
        self.last_gps_times[self.next] = i64::from(upper) << 32 | i64::from(lower);
        self.last = self.next;
        self.last_gps_time_diffs[self.last] = 0;
        self.multi_extreme_counters[self.last] = 0;
        Ok(())
    }
}

pub mod v1 {
    use std::io::{Read, Write};

    use num_traits::clamp;

    use crate::compressors::{IntegerCompressor, IntegerCompressorBuilder};
    use crate::decoders::ArithmeticDecoder;
    use crate::decompressors::{IntegerDecompressor, IntegerDecompressorBuilder};
    use crate::encoders::ArithmeticEncoder;
    use crate::las::utils::read_and_unpack;
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::packers::Packable;
    use crate::record::{FieldCompressor, FieldDecompressor};

    use super::{diff_within_32_bits, GpsTime};

    const LASZIP_GPS_TIME_MULTI_MAX: u32 = 512;
    const MULTI_UNCHANGED: u32 = LASZIP_GPS_TIME_MULTI_MAX - 1;
    const MULTI_RAW: u32 = LASZIP_GPS_TIME_MULTI_MAX - 2;
    const MULTI_EXTREME: u32 = LASZIP_GPS_TIME_MULTI_MAX - 3;

    #[inline]
    fn multi_context(multi: u32) -> u32 {
        if multi < 10 {
            3
        } else if multi < 50 {
            4
        } else {
            5
        }
    }

    struct Common {
        last_gps: i64,
        gps_time_multi_model: ArithmeticModel,
        gps_time_0_diff_model: ArithmeticModel,
        multi_extreme_counter: i32,
        last_gps_time_diff: i32,
    }

    impl Common {
        fn new() -> Self {
            Self {
                last_gps: 0,
                gps_time_multi_model: ArithmeticModelBuilder::new(LASZIP_GPS_TIME_MULTI_MAX)
                    .build(),
                gps_time_0_diff_model: ArithmeticModelBuilder::new(3).build(),
                multi_extreme_counter: 0,
                last_gps_time_diff: 0,
            }
        }

        fn count_extreme_multi(&mut self, diff: i32) {
            self.multi_extreme_counter += 1;
            if self.multi_extreme_counter > 3 {
                self.last_gps_time_diff = diff;
                self.multi_extreme_counter = 0;
            }
        }
    }

    pub struct LasGpsTimeCompressor {
        common: Common,
        ic_gps_time: IntegerCompressor,
    }

    impl Default for LasGpsTimeCompressor {
        fn default() -> Self {
            Self {
                common: Common::new(),
                ic_gps_time: IntegerCompressorBuilder::new().bits(32).contexts(6).build(),
            }
        }
    }

    impl<W: Write> FieldCompressor<W> for LasGpsTimeCompressor {
        fn size_of_field(&self) -> usize {
            GpsTime::SIZE
        }

        fn compress_first(&mut self, dst: &mut W, buf: &[u8]) -> std::io::Result<()> {
            self.common.last_gps = GpsTime::unpack_from(buf).into();
            dst.write_all(buf)
        }

        fn compress_with(
            &mut self,
            encoder: &mut ArithmeticEncoder<W>,
            buf: &[u8],
        ) -> std::io::Result<()> {
            let common = &mut self.common;
            let current_value = i64::from(GpsTime::unpack_from(buf));

            if common.last_gps_time_diff == 0 {
                if current_value == common.last_gps {
                    encoder.encode_symbol(&mut common.gps_time_0_diff_model, 0)?;
                } else if let Some(diff) = diff_within_32_bits(current_value, common.last_gps) {
                    encoder.encode_symbol(&mut common.gps_time_0_diff_model, 1)?;
                    self.ic_gps_time.compress(encoder, 0, diff, 0)?;
                    common.last_gps_time_diff = diff;
                } else {
                    // the difference is huge
                    encoder.encode_symbol(&mut common.gps_time_0_diff_model, 2)?;
                    encoder.write_int64(current_value as u64)?;
                }
            } else if current_value == common.last_gps {
                encoder.encode_symbol(&mut common.gps_time_multi_model, MULTI_UNCHANGED)?;
            } else if let Some(diff) = diff_within_32_bits(current_value, common.last_gps) {
                // compute multiplier between current and last integer difference
                let multi = ((diff as f32 / common.last_gps_time_diff as f32) + 0.5f32) as i32;
                let multi = clamp(multi, 0, MULTI_EXTREME as i32) as u32;
                encoder.encode_symbol(&mut common.gps_time_multi_model, multi)?;

                let last_diff = common.last_gps_time_diff;
                if multi == 1 {
                    self.ic_gps_time.compress(encoder, last_diff, diff, 1)?;
                    common.last_gps_time_diff = diff;
                    common.multi_extreme_counter = 0;
                } else if multi == 0 {
                    self.ic_gps_time.compress(encoder, last_diff / 4, diff, 2)?;
                    common.count_extreme_multi(diff);
                } else {
                    self.ic_gps_time.compress(
                        encoder,
                        last_diff.wrapping_mul(multi as i32),
                        diff,
                        multi_context(multi),
                    )?;
                    if multi == MULTI_EXTREME {
                        common.count_extreme_multi(diff);
                    }
                }
            } else {
                encoder.encode_symbol(&mut common.gps_time_multi_model, MULTI_RAW)?;
                encoder.write_int64(current_value as u64)?;
            }
            common.last_gps = current_value;
            Ok(())
        }
    }

    pub struct LasGpsTimeDecompressor {
        common: Common,
        ic_gps_time: IntegerDecompressor,
    }

    impl Default for LasGpsTimeDecompressor {
        fn default() -> Self {
            Self {
                common: Common::new(),
                ic_gps_time: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(6)
                    .build(),
            }
        }
    }

    impl<R: Read> FieldDecompressor<R> for LasGpsTimeDecompressor {
        fn size_of_field(&self) -> usize {
            GpsTime::SIZE
        }

        fn decompress_first(&mut self, src: &mut R, first_point: &mut [u8]) -> std::io::Result<()> {
            self.common.last_gps = i64::from(read_and_unpack::<_, GpsTime>(src, first_point)?);
            Ok(())
        }

        fn decompress_with(
            &mut self,
            decoder: &mut ArithmeticDecoder<R>,
            buf: &mut [u8],
        ) -> std::io::Result<()> {
            let common = &mut self.common;
            if common.last_gps_time_diff == 0 {
                let symbol = decoder.decode_symbol(&mut common.gps_time_0_diff_model)?;
                if symbol == 1 {
                    common.last_gps_time_diff = self.ic_gps_time.decompress(decoder, 0, 0)?;
                    common.last_gps = common
                        .last_gps
                        .wrapping_add(i64::from(common.last_gps_time_diff));
                } else if symbol == 2 {
                    common.last_gps = decoder.read_int_64()? as i64;
                }
            } else {
                let multi = decoder.decode_symbol(&mut common.gps_time_multi_model)?;
                let last_diff = common.last_gps_time_diff;
                if multi < MULTI_RAW {
                    let diff = if multi == 1 {
                        let diff = self.ic_gps_time.decompress(decoder, last_diff, 1)?;
                        common.last_gps_time_diff = diff;
                        common.multi_extreme_counter = 0;
                        diff
                    } else if multi == 0 {
                        let diff = self.ic_gps_time.decompress(decoder, last_diff / 4, 2)?;
                        common.count_extreme_multi(diff);
                        diff
                    } else {
                        let diff = self.ic_gps_time.decompress(
                            decoder,
                            last_diff.wrapping_mul(multi as i32),
                            multi_context(multi),
                        )?;
                        if multi == MULTI_EXTREME {
                            common.count_extreme_multi(diff);
                        }
                        diff
                    };
                    common.last_gps = common.last_gps.wrapping_add(i64::from(diff));
                } else if multi == MULTI_RAW {
                    common.last_gps = decoder.read_int_64()? as i64;
                }
            }
            GpsTime::from(common.last_gps).pack_into(buf);
            Ok(())
        }
    }
}

pub mod v2 {
    //! Version 2 keeps track of 4 sequences of gps times, which helps
    //! with files where the points of several flight lines are interleaved.
    use std::io::{Read, Write};

    use crate::compressors::{IntegerCompressor, IntegerCompressorBuilder};
    use crate::decoders::ArithmeticDecoder;
    use crate::decompressors::{IntegerDecompressor, IntegerDecompressorBuilder};
    use crate::encoders::ArithmeticEncoder;
    use crate::errors::corrupted;
    use crate::las::utils::read_and_unpack;
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::packers::Packable;
    use crate::record::{FieldCompressor, FieldDecompressor};

    use super::{
        GpsTime, GpsTimeSequences, LASZIP_GPS_TIME_MULTI_CODE_FULL, LASZIP_GPS_TIME_MULTI_TOTAL,
        LASZIP_GPS_TIME_MULTI_UNCHANGED,
    };

    // Common parts for both a compressor and decompressor go here
    struct Common {
        gps_time_multi: ArithmeticModel,
        gps_time_0_diff: ArithmeticModel,
        sequences: GpsTimeSequences,
    }

    impl Common {
        fn new() -> Self {
            Self {
                gps_time_multi: ArithmeticModelBuilder::new(LASZIP_GPS_TIME_MULTI_TOTAL as u32)
                    .build(),
                gps_time_0_diff: ArithmeticModelBuilder::new(6).build(),
                sequences: GpsTimeSequences::new(0),
            }
        }
    }

    pub struct LasGpsTimeCompressor {
        ic_gps_time: IntegerCompressor,
        common: Common,
    }

    impl Default for LasGpsTimeCompressor {
        fn default() -> Self {
            Self {
                ic_gps_time: IntegerCompressorBuilder::new().bits(32).contexts(9).build(),
                common: Common::new(),
            }
        }
    }

    impl<W: Write> FieldCompressor<W> for LasGpsTimeCompressor {
        fn size_of_field(&self) -> usize {
            GpsTime::SIZE
        }

        fn compress_first(&mut self, dst: &mut W, buf: &[u8]) -> std::io::Result<()> {
            self.common.sequences = GpsTimeSequences::new(GpsTime::unpack_from(buf).value);
            dst.write_all(buf)
        }

        fn compress_with(
            &mut self,
            encoder: &mut ArithmeticEncoder<W>,
            buf: &[u8],
        ) -> std::io::Result<()> {
            let this_val = GpsTime::unpack_from(buf).value;
            let common = &mut self.common;
            let sequences = &mut common.sequences;

            // at most one switch: the sequence switched to is within 32 bits
            loop {
                if sequences.last_diff_is_zero() {
                    if this_val == sequences.last_gps_time() {
                        encoder.encode_symbol(&mut common.gps_time_0_diff, 0)?;
                    } else if let Some(diff) = sequences.diff_to_last(this_val) {
                        encoder.encode_symbol(&mut common.gps_time_0_diff, 1)?;
                        sequences.compress_first_diff(encoder, &mut self.ic_gps_time, diff)?;
                    } else if let Some(offset) = sequences.find_close_sequence(this_val) {
                        encoder.encode_symbol(&mut common.gps_time_0_diff, (offset + 2) as u32)?;
                        sequences.switch_by(offset);
                        continue;
                    } else {
                        encoder.encode_symbol(&mut common.gps_time_0_diff, 2)?;
                        sequences.compress_full(encoder, &mut self.ic_gps_time, this_val)?;
                    }
                } else if this_val == sequences.last_gps_time() {
                    encoder.encode_symbol(
                        &mut common.gps_time_multi,
                        LASZIP_GPS_TIME_MULTI_UNCHANGED as u32,
                    )?;
                } else if let Some(diff) = sequences.diff_to_last(this_val) {
                    sequences.compress_multi(
                        encoder,
                        &mut common.gps_time_multi,
                        &mut self.ic_gps_time,
                        diff,
                    )?;
                } else if let Some(offset) = sequences.find_close_sequence(this_val) {
                    encoder.encode_symbol(
                        &mut common.gps_time_multi,
                        LASZIP_GPS_TIME_MULTI_CODE_FULL as u32 + offset as u32,
                    )?;
                    sequences.switch_by(offset);
                    continue;
                } else {
                    encoder.encode_symbol(
                        &mut common.gps_time_multi,
                        LASZIP_GPS_TIME_MULTI_CODE_FULL as u32,
                    )?;
                    sequences.compress_full(encoder, &mut self.ic_gps_time, this_val)?;
                }
                break;
            }
            sequences.set_last_gps_time(this_val);
            Ok(())
        }
    }

    pub struct LasGpsTimeDecompressor {
        ic_gps_time: IntegerDecompressor,
        common: Common,
    }

    impl Default for LasGpsTimeDecompressor {
        fn default() -> Self {
            Self {
                ic_gps_time: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(9)
                    .build(),
                common: Common::new(),
            }
        }
    }

    impl<R: Read> FieldDecompressor<R> for LasGpsTimeDecompressor {
        fn size_of_field(&self) -> usize {
            GpsTime::SIZE
        }

        fn decompress_first(&mut self, src: &mut R, first_point: &mut [u8]) -> std::io::Result<()> {
            let first: GpsTime = read_and_unpack(src, first_point)?;
            self.common.sequences = GpsTimeSequences::new(first.value);
            Ok(())
        }

        fn decompress_with(
            &mut self,
            decoder: &mut ArithmeticDecoder<R>,
            buf: &mut [u8],
        ) -> std::io::Result<()> {
            let common = &mut self.common;
            let sequences = &mut common.sequences;
            let mut switched = false;

            loop {
                if sequences.last_diff_is_zero() {
                    let symbol = decoder.decode_symbol(&mut common.gps_time_0_diff)?;
                    match symbol {
                        0 => {}
                        1 => sequences.decompress_first_diff(decoder, &mut self.ic_gps_time)?,
                        2 => sequences.decompress_full(decoder, &mut self.ic_gps_time)?,
                        _ => {
                            if switched {
                                return Err(corrupted("gps time"));
                            }
                            sequences.switch_by(symbol as usize - 2);
                            switched = true;
                            continue;
                        }
                    }
                } else {
                    let multi = decoder.decode_symbol(&mut common.gps_time_multi)? as i32;
                    if multi < LASZIP_GPS_TIME_MULTI_UNCHANGED {
                        sequences.decompress_multi(decoder, &mut self.ic_gps_time, multi)?;
                    } else if multi == LASZIP_GPS_TIME_MULTI_CODE_FULL {
                        sequences.decompress_full(decoder, &mut self.ic_gps_time)?;
                    } else if multi > LASZIP_GPS_TIME_MULTI_CODE_FULL {
                        if switched {
                            return Err(corrupted("gps time"));
                        }
                        sequences.switch_by((multi - LASZIP_GPS_TIME_MULTI_CODE_FULL) as usize);
                        switched = true;
                        continue;
                    }
                }
                break;
            }
            GpsTime::from(sequences.last_gps_time()).pack_into(buf);
            Ok(())
        }
    }
}
