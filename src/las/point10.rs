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

//! Compressors & decompressors of the point record of the LAS point formats 0 to 5.

use crate::packers::Packable;

/// The 20 bytes shared by all the point formats of LAS 1.0 to 1.3
#[derive(Default, Copy, Clone, PartialEq, Debug)]
pub struct Point10 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub intensity: u16,

    // 3 bits
    pub return_number: u8,
    // 3 bits
    pub number_of_returns_of_given_pulse: u8,
    // 1 bit
    pub scan_direction_flag: bool,
    // 1 bit
    pub edge_of_flight_line: bool,

    // 5 bits for classification the rest are bit flags
    pub classification: u8,

    pub scan_angle_rank: i8,
    pub user_data: u8,
    pub point_source_id: u16,
}

impl Point10 {
    pub const SIZE: usize = 20;

    pub fn populate_bit_fields_from(&mut self, byte: u8) {
        self.return_number = byte & 0x7;
        self.number_of_returns_of_given_pulse = (byte >> 3) & 0x7;
        self.scan_direction_flag = ((byte >> 6) & 0x1) != 0;
        self.edge_of_flight_line = ((byte >> 7) & 0x1) != 0;
    }

    pub fn bit_fields_to_byte(&self) -> u8 {
        let a = self.return_number;
        let b = self.number_of_returns_of_given_pulse;
        let c = self.scan_direction_flag as u8;
        let d = self.edge_of_flight_line as u8;

        ((d & 0x1) << 7) | (c & 0x1) << 6 | (b & 0x7) << 3 | (a & 0x7)
    }
}

impl Packable for Point10 {
    fn unpack_from(input: &[u8]) -> Self {
        let mut point = Point10 {
            x: i32::unpack_from(&input[0..4]),
            y: i32::unpack_from(&input[4..8]),
            z: i32::unpack_from(&input[8..12]),
            intensity: u16::unpack_from(&input[12..14]),
            classification: input[15],
            scan_angle_rank: i8::unpack_from(&input[16..17]),
            user_data: input[17],
            point_source_id: u16::unpack_from(&input[18..20]),
            ..Default::default()
        };
        point.populate_bit_fields_from(input[14]);
        point
    }

    fn pack_into(&self, output: &mut [u8]) {
        i32::pack_into(&self.x, &mut output[0..4]);
        i32::pack_into(&self.y, &mut output[4..8]);
        i32::pack_into(&self.z, &mut output[8..12]);
        u16::pack_into(&self.intensity, &mut output[12..14]);
        output[14] = self.bit_fields_to_byte();
        output[15] = self.classification;
        i8::pack_into(&self.scan_angle_rank, &mut output[16..17]);
        output[17] = self.user_data;
        u16::pack_into(&self.point_source_id, &mut output[18..20]);
    }
}

pub mod v1 {
    //! Version 1: x & y are predicted with the median of the 3 last differences,
    //! the other fields are only coded when they changed.
    use std::io::{Read, Write};

    use crate::compressors::{IntegerCompressor, IntegerCompressorBuilder};
    use crate::decoders::ArithmeticDecoder;
    use crate::decompressors::{IntegerDecompressor, IntegerDecompressorBuilder};
    use crate::encoders::ArithmeticEncoder;
    use crate::las::utils::read_and_unpack;
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::packers::Packable;
    use crate::record::{FieldCompressor, FieldDecompressor};

    use super::Point10;

    const INTENSITY_CHANGED: u32 = 1 << 5;
    const BIT_BYTE_CHANGED: u32 = 1 << 4;
    const CLASSIFICATION_CHANGED: u32 = 1 << 3;
    const SCAN_ANGLE_CHANGED: u32 = 1 << 2;
    const USER_DATA_CHANGED: u32 = 1 << 1;
    const POINT_SOURCE_CHANGED: u32 = 1;

    /// find median difference from 3 preceding differences
    fn median_diff(diff_array: &[i32; 3]) -> i32 {
        if diff_array[0] < diff_array[1] {
            if diff_array[1] < diff_array[2] {
                diff_array[1]
            } else if diff_array[0] < diff_array[2] {
                diff_array[2]
            } else {
                diff_array[0]
            }
        } else if diff_array[0] < diff_array[2] {
            diff_array[0]
        } else if diff_array[1] < diff_array[2] {
            diff_array[2]
        } else {
            diff_array[1]
        }
    }

    #[inline]
    fn k_context(k_bits: u32) -> u32 {
        k_bits.min(19)
    }

    /// State shared by the compressor & decompressor
    struct Common {
        last: Point10,
        last_x_diffs: [i32; 3],
        last_y_diffs: [i32; 3],
        last_incr: usize,

        changed_values_model: ArithmeticModel,
        // lazily created, indexed by the last value of the field
        bit_byte_models: Vec<Option<ArithmeticModel>>,
        classification_models: Vec<Option<ArithmeticModel>>,
        user_data_models: Vec<Option<ArithmeticModel>>,
    }

    impl Common {
        fn new() -> Self {
            Self {
                last: Point10::default(),
                last_x_diffs: [0i32; 3],
                last_y_diffs: [0i32; 3],
                last_incr: 0,
                changed_values_model: ArithmeticModelBuilder::new(64).build(),
                bit_byte_models: (0..256).map(|_| None).collect(),
                classification_models: (0..256).map(|_| None).collect(),
                user_data_models: (0..256).map(|_| None).collect(),
            }
        }

        fn record_diffs(&mut self, x_diff: i32, y_diff: i32) {
            self.last_x_diffs[self.last_incr] = x_diff;
            self.last_y_diffs[self.last_incr] = y_diff;
            self.last_incr += 1;
            if self.last_incr > 2 {
                self.last_incr = 0;
            }
        }
    }

    fn byte_model(models: &mut [Option<ArithmeticModel>], last: u8) -> &mut ArithmeticModel {
        models[usize::from(last)].get_or_insert_with(|| ArithmeticModelBuilder::new(256).build())
    }

    pub struct LasPoint10Decompressor {
        common: Common,

        ic_dx: IntegerDecompressor,
        ic_dy: IntegerDecompressor,
        ic_z: IntegerDecompressor,
        ic_intensity: IntegerDecompressor,
        ic_scan_angle_rank: IntegerDecompressor,
        ic_point_source_id: IntegerDecompressor,
    }

    impl Default for LasPoint10Decompressor {
        fn default() -> Self {
            Self {
                common: Common::new(),
                ic_dx: IntegerDecompressorBuilder::new().bits(32).build(),
                ic_dy: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(20)
                    .build(),
                ic_z: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(20)
                    .build(),
                ic_intensity: IntegerDecompressorBuilder::new().bits(16).build(),
                ic_scan_angle_rank: IntegerDecompressorBuilder::new()
                    .bits(8)
                    .contexts(2)
                    .build(),
                ic_point_source_id: IntegerDecompressorBuilder::new().bits(16).build(),
            }
        }
    }

    impl<R: Read> FieldDecompressor<R> for LasPoint10Decompressor {
        fn size_of_field(&self) -> usize {
            Point10::SIZE
        }

        fn decompress_first(&mut self, src: &mut R, first_point: &mut [u8]) -> std::io::Result<()> {
            self.common.last = read_and_unpack(src, first_point)?;
            Ok(())
        }

        fn decompress_with(
            &mut self,
            decoder: &mut ArithmeticDecoder<R>,
            buf: &mut [u8],
        ) -> std::io::Result<()> {
            let common = &mut self.common;
            let median_x = median_diff(&common.last_x_diffs);
            let median_y = median_diff(&common.last_y_diffs);

            let x_diff = self.ic_dx.decompress(decoder, median_x, 0)?;
            common.last.x = common.last.x.wrapping_add(x_diff);
            // we use the number k of bits corrector bits to switch contexts
            let k_bits = self.ic_dx.k();
            let y_diff = self.ic_dy.decompress(decoder, median_y, k_context(k_bits))?;
            common.last.y = common.last.y.wrapping_add(y_diff);
            let k_bits = (k_bits + self.ic_dy.k()) / 2;
            common.last.z = self
                .ic_z
                .decompress(decoder, common.last.z, k_context(k_bits))?;

            let changed_values = decoder.decode_symbol(&mut common.changed_values_model)?;
            if changed_values != 0 {
                if changed_values & INTENSITY_CHANGED != 0 {
                    common.last.intensity =
                        self.ic_intensity
                            .decompress(decoder, i32::from(common.last.intensity), 0)?
                            as u16;
                }

                if changed_values & BIT_BYTE_CHANGED != 0 {
                    let model =
                        byte_model(&mut common.bit_byte_models, common.last.bit_fields_to_byte());
                    let byte = decoder.decode_symbol(model)? as u8;
                    common.last.populate_bit_fields_from(byte);
                }

                if changed_values & CLASSIFICATION_CHANGED != 0 {
                    let model =
                        byte_model(&mut common.classification_models, common.last.classification);
                    common.last.classification = decoder.decode_symbol(model)? as u8;
                }

                if changed_values & SCAN_ANGLE_CHANGED != 0 {
                    common.last.scan_angle_rank = self.ic_scan_angle_rank.decompress(
                        decoder,
                        i32::from(common.last.scan_angle_rank),
                        (k_bits < 3) as u32,
                    )? as i8;
                }

                if changed_values & USER_DATA_CHANGED != 0 {
                    let model = byte_model(&mut common.user_data_models, common.last.user_data);
                    common.last.user_data = decoder.decode_symbol(model)? as u8;
                }

                if changed_values & POINT_SOURCE_CHANGED != 0 {
                    common.last.point_source_id = self.ic_point_source_id.decompress(
                        decoder,
                        i32::from(common.last.point_source_id),
                        0,
                    )? as u16;
                }
            }

            common.record_diffs(x_diff, y_diff);
            common.last.pack_into(buf);
            Ok(())
        }
    }

    pub struct LasPoint10Compressor {
        common: Common,

        ic_dx: IntegerCompressor,
        ic_dy: IntegerCompressor,
        ic_z: IntegerCompressor,
        ic_intensity: IntegerCompressor,
        ic_scan_angle_rank: IntegerCompressor,
        ic_point_source_id: IntegerCompressor,
    }

    impl Default for LasPoint10Compressor {
        fn default() -> Self {
            Self {
                common: Common::new(),
                ic_dx: IntegerCompressorBuilder::new().bits(32).build(),
                ic_dy: IntegerCompressorBuilder::new().bits(32).contexts(20).build(),
                ic_z: IntegerCompressorBuilder::new().bits(32).contexts(20).build(),
                ic_intensity: IntegerCompressorBuilder::new().bits(16).build(),
                ic_scan_angle_rank: IntegerCompressorBuilder::new().bits(8).contexts(2).build(),
                ic_point_source_id: IntegerCompressorBuilder::new().bits(16).build(),
            }
        }
    }

    impl<W: Write> FieldCompressor<W> for LasPoint10Compressor {
        fn size_of_field(&self) -> usize {
            Point10::SIZE
        }

        fn compress_first(&mut self, dst: &mut W, buf: &[u8]) -> std::io::Result<()> {
            self.common.last = Point10::unpack_from(buf);
            dst.write_all(buf)
        }

        fn compress_with(
            &mut self,
            encoder: &mut ArithmeticEncoder<W>,
            buf: &[u8],
        ) -> std::io::Result<()> {
            let common = &mut self.common;
            let current_point = Point10::unpack_from(buf);
            let median_x = median_diff(&common.last_x_diffs);
            let median_y = median_diff(&common.last_y_diffs);

            let x_diff = current_point.x.wrapping_sub(common.last.x);
            let y_diff = current_point.y.wrapping_sub(common.last.y);

            self.ic_dx.compress(encoder, median_x, x_diff, 0)?;
            let k_bits = self.ic_dx.k();
            self.ic_dy
                .compress(encoder, median_y, y_diff, k_context(k_bits))?;
            let k_bits = (k_bits + self.ic_dy.k()) / 2;
            self.ic_z
                .compress(encoder, common.last.z, current_point.z, k_context(k_bits))?;

            let last = &common.last;
            let changed_values = ((last.intensity != current_point.intensity) as u32) << 5
                | ((last.bit_fields_to_byte() != current_point.bit_fields_to_byte()) as u32) << 4
                | ((last.classification != current_point.classification) as u32) << 3
                | ((last.scan_angle_rank != current_point.scan_angle_rank) as u32) << 2
                | ((last.user_data != current_point.user_data) as u32) << 1
                | (last.point_source_id != current_point.point_source_id) as u32;

            encoder.encode_symbol(&mut common.changed_values_model, changed_values)?;

            if changed_values & INTENSITY_CHANGED != 0 {
                self.ic_intensity.compress(
                    encoder,
                    i32::from(common.last.intensity),
                    i32::from(current_point.intensity),
                    0,
                )?;
            }

            if changed_values & BIT_BYTE_CHANGED != 0 {
                let model =
                    byte_model(&mut common.bit_byte_models, common.last.bit_fields_to_byte());
                encoder.encode_symbol(model, u32::from(current_point.bit_fields_to_byte()))?;
            }

            if changed_values & CLASSIFICATION_CHANGED != 0 {
                let model =
                    byte_model(&mut common.classification_models, common.last.classification);
                encoder.encode_symbol(model, u32::from(current_point.classification))?;
            }

            if changed_values & SCAN_ANGLE_CHANGED != 0 {
                self.ic_scan_angle_rank.compress(
                    encoder,
                    i32::from(common.last.scan_angle_rank),
                    i32::from(current_point.scan_angle_rank),
                    (k_bits < 3) as u32,
                )?;
            }

            if changed_values & USER_DATA_CHANGED != 0 {
                let model = byte_model(&mut common.user_data_models, common.last.user_data);
                encoder.encode_symbol(model, u32::from(current_point.user_data))?;
            }

            if changed_values & POINT_SOURCE_CHANGED != 0 {
                self.ic_point_source_id.compress(
                    encoder,
                    i32::from(common.last.point_source_id),
                    i32::from(current_point.point_source_id),
                    0,
                )?;
            }

            common.record_diffs(x_diff, y_diff);
            common.last = current_point;
            Ok(())
        }
    }
}

pub mod v2 {
    //! Version 2: x & y are predicted with a streaming median of 5 differences
    //! per return context, z from the last z of the same return level.
    use std::io::{Read, Write};

    use crate::compressors::{IntegerCompressor, IntegerCompressorBuilder};
    use crate::decoders::ArithmeticDecoder;
    use crate::decompressors::{IntegerDecompressor, IntegerDecompressorBuilder};
    use crate::encoders::ArithmeticEncoder;
    use crate::las::utils::{
        read_and_unpack, u32_zero_bit, StreamingMedian, NUMBER_RETURN_LEVEL, NUMBER_RETURN_MAP,
    };
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::packers::Packable;
    use crate::record::{FieldCompressor, FieldDecompressor};

    use super::Point10;

    /// Compared to version 1, the flag bits of the intensity & bit fields are swapped
    struct Point10ChangedValues(u32);

    impl Point10ChangedValues {
        fn from_points(current: &Point10, last: &Point10, last_intensity: u16) -> Self {
            Self(
                ((last.bit_fields_to_byte() != current.bit_fields_to_byte()) as u32) << 5
                    | ((last_intensity != current.intensity) as u32) << 4
                    | ((last.classification != current.classification) as u32) << 3
                    | ((last.scan_angle_rank != current.scan_angle_rank) as u32) << 2
                    | ((last.user_data != current.user_data) as u32) << 1
                    | (last.point_source_id != current.point_source_id) as u32,
            )
        }

        fn bit_fields_changed(&self) -> bool {
            is_nth_bit_set!(self.0, 5)
        }

        fn intensity_changed(&self) -> bool {
            is_nth_bit_set!(self.0, 4)
        }

        fn classification_changed(&self) -> bool {
            is_nth_bit_set!(self.0, 3)
        }

        fn scan_angle_rank_changed(&self) -> bool {
            is_nth_bit_set!(self.0, 2)
        }

        fn user_data_changed(&self) -> bool {
            is_nth_bit_set!(self.0, 1)
        }

        fn point_source_id_changed(&self) -> bool {
            is_nth_bit_set!(self.0, 0)
        }
    }

    /// Return map (m) & return level (l) of a point
    #[inline]
    fn return_contexts(point: &Point10) -> (usize, usize) {
        let r = usize::from(point.return_number);
        let n = usize::from(point.number_of_returns_of_given_pulse);
        (
            usize::from(NUMBER_RETURN_MAP[n][r]),
            usize::from(NUMBER_RETURN_LEVEL[n][r]),
        )
    }

    #[inline]
    fn y_context(n: u8, k_bits: u32) -> u32 {
        (n == 1) as u32 + if k_bits < 20 { u32_zero_bit(k_bits) } else { 20 }
    }

    #[inline]
    fn z_context(n: u8, k_bits: u32) -> u32 {
        (n == 1) as u32 + if k_bits < 18 { u32_zero_bit(k_bits) } else { 18 }
    }

    // All the things we need to compress a point, group them into structs
    // so we don't have too many names flying around
    struct Common {
        last_point: Point10,
        last_intensity: [u16; 16],

        last_x_diff_median: [StreamingMedian<i32>; 16],
        last_y_diff_median: [StreamingMedian<i32>; 16],

        last_height: [i32; 8],

        changed_values: ArithmeticModel,
        scan_angle_rank: [ArithmeticModel; 2],
        // lazily created, indexed by the last value of the field
        bit_byte: Vec<Option<ArithmeticModel>>,
        classification: Vec<Option<ArithmeticModel>>,
        user_data: Vec<Option<ArithmeticModel>>,
    }

    impl Common {
        fn new() -> Self {
            Self {
                last_point: Point10::default(),
                last_intensity: [0u16; 16],
                last_x_diff_median: [StreamingMedian::new(); 16],
                last_y_diff_median: [StreamingMedian::new(); 16],
                last_height: [0i32; 8],
                changed_values: ArithmeticModelBuilder::new(64).build(),
                scan_angle_rank: [
                    ArithmeticModelBuilder::new(256).build(),
                    ArithmeticModelBuilder::new(256).build(),
                ],
                bit_byte: (0..256).map(|_| None).collect(),
                classification: (0..256).map(|_| None).collect(),
                user_data: (0..256).map(|_| None).collect(),
            }
        }
    }

    fn byte_model(models: &mut [Option<ArithmeticModel>], last: u8) -> &mut ArithmeticModel {
        models[usize::from(last)].get_or_insert_with(|| ArithmeticModelBuilder::new(256).build())
    }

    pub struct LasPoint10Compressor {
        ic_intensity: IntegerCompressor,
        ic_point_source_id: IntegerCompressor,
        ic_dx: IntegerCompressor,
        ic_dy: IntegerCompressor,
        ic_z: IntegerCompressor,

        common: Common,
    }

    impl Default for LasPoint10Compressor {
        fn default() -> Self {
            Self {
                ic_intensity: IntegerCompressorBuilder::new().bits(16).contexts(4).build(),
                ic_point_source_id: IntegerCompressorBuilder::new().bits(16).build(),
                ic_dx: IntegerCompressorBuilder::new().bits(32).contexts(2).build(),
                ic_dy: IntegerCompressorBuilder::new().bits(32).contexts(22).build(),
                ic_z: IntegerCompressorBuilder::new().bits(32).contexts(20).build(),
                common: Common::new(),
            }
        }
    }

    impl<W: Write> FieldCompressor<W> for LasPoint10Compressor {
        fn size_of_field(&self) -> usize {
            Point10::SIZE
        }

        fn compress_first(&mut self, dst: &mut W, buf: &[u8]) -> std::io::Result<()> {
            self.common.last_point = Point10::unpack_from(buf);
            dst.write_all(buf)
        }

        fn compress_with(
            &mut self,
            encoder: &mut ArithmeticEncoder<W>,
            buf: &[u8],
        ) -> std::io::Result<()> {
            let this_val = Point10::unpack_from(buf);
            let common = &mut self.common;
            let n = this_val.number_of_returns_of_given_pulse;
            let (m, l) = return_contexts(&this_val);

            let changed_values = Point10ChangedValues::from_points(
                &this_val,
                &common.last_point,
                common.last_intensity[m],
            );
            // compress which other values have changed
            encoder.encode_symbol(&mut common.changed_values, changed_values.0)?;

            if changed_values.bit_fields_changed() {
                let last_b = common.last_point.bit_fields_to_byte();
                let model = byte_model(&mut common.bit_byte, last_b);
                encoder.encode_symbol(model, u32::from(this_val.bit_fields_to_byte()))?;
            }

            if changed_values.intensity_changed() {
                self.ic_intensity.compress(
                    encoder,
                    i32::from(common.last_intensity[m]),
                    i32::from(this_val.intensity),
                    m.min(3) as u32,
                )?;
                common.last_intensity[m] = this_val.intensity;
            }

            if changed_values.classification_changed() {
                let model = byte_model(
                    &mut common.classification,
                    common.last_point.classification,
                );
                encoder.encode_symbol(model, u32::from(this_val.classification))?;
            }

            if changed_values.scan_angle_rank_changed() {
                // the "as u8" before "as u32" is vital
                let diff = this_val
                    .scan_angle_rank
                    .wrapping_sub(common.last_point.scan_angle_rank);
                encoder.encode_symbol(
                    &mut common.scan_angle_rank[this_val.scan_direction_flag as usize],
                    u32::from(diff as u8),
                )?;
            }

            if changed_values.user_data_changed() {
                let model = byte_model(&mut common.user_data, common.last_point.user_data);
                encoder.encode_symbol(model, u32::from(this_val.user_data))?;
            }

            if changed_values.point_source_id_changed() {
                self.ic_point_source_id.compress(
                    encoder,
                    i32::from(common.last_point.point_source_id),
                    i32::from(this_val.point_source_id),
                    0,
                )?;
            }

            // compress x coordinate
            let median = common.last_x_diff_median[m].get();
            let diff = this_val.x.wrapping_sub(common.last_point.x);
            self.ic_dx.compress(encoder, median, diff, (n == 1) as u32)?;
            common.last_x_diff_median[m].add(diff);

            // compress y coordinate
            let k_bits = self.ic_dx.k();
            let median = common.last_y_diff_median[m].get();
            let diff = this_val.y.wrapping_sub(common.last_point.y);
            self.ic_dy
                .compress(encoder, median, diff, y_context(n, k_bits))?;
            common.last_y_diff_median[m].add(diff);

            // compress z coordinate
            let k_bits = (self.ic_dx.k() + self.ic_dy.k()) / 2;
            self.ic_z.compress(
                encoder,
                common.last_height[l],
                this_val.z,
                z_context(n, k_bits),
            )?;
            common.last_height[l] = this_val.z;

            common.last_point = this_val;
            Ok(())
        }
    }

    pub struct LasPoint10Decompressor {
        ic_intensity: IntegerDecompressor,
        ic_point_source_id: IntegerDecompressor,
        ic_dx: IntegerDecompressor,
        ic_dy: IntegerDecompressor,
        ic_z: IntegerDecompressor,

        common: Common,
    }

    impl Default for LasPoint10Decompressor {
        fn default() -> Self {
            Self {
                ic_intensity: IntegerDecompressorBuilder::new()
                    .bits(16)
                    .contexts(4)
                    .build(),
                ic_point_source_id: IntegerDecompressorBuilder::new().bits(16).build(),
                ic_dx: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(2)
                    .build(),
                ic_dy: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(22)
                    .build(),
                ic_z: IntegerDecompressorBuilder::new()
                    .bits(32)
                    .contexts(20)
                    .build(),
                common: Common::new(),
            }
        }
    }

    impl<R: Read> FieldDecompressor<R> for LasPoint10Decompressor {
        fn size_of_field(&self) -> usize {
            Point10::SIZE
        }

        fn decompress_first(&mut self, src: &mut R, first_point: &mut [u8]) -> std::io::Result<()> {
            self.common.last_point = read_and_unpack(src, first_point)?;
            // the intensity is predicted from `last_intensity`, not from the first point
            self.common.last_point.intensity = 0;
            Ok(())
        }

        fn decompress_with(
            &mut self,
            decoder: &mut ArithmeticDecoder<R>,
            buf: &mut [u8],
        ) -> std::io::Result<()> {
            let common = &mut self.common;
            let changed_values =
                Point10ChangedValues(decoder.decode_symbol(&mut common.changed_values)?);

            if changed_values.bit_fields_changed() {
                let last_b = common.last_point.bit_fields_to_byte();
                let model = byte_model(&mut common.bit_byte, last_b);
                let b = decoder.decode_symbol(model)? as u8;
                common.last_point.populate_bit_fields_from(b);
            }

            let n = common.last_point.number_of_returns_of_given_pulse;
            let (m, l) = return_contexts(&common.last_point);

            if changed_values.intensity_changed() {
                common.last_point.intensity = self.ic_intensity.decompress(
                    decoder,
                    i32::from(common.last_intensity[m]),
                    m.min(3) as u32,
                )? as u16;
                common.last_intensity[m] = common.last_point.intensity;
            } else {
                common.last_point.intensity = common.last_intensity[m];
            }

            if changed_values.classification_changed() {
                let model = byte_model(
                    &mut common.classification,
                    common.last_point.classification,
                );
                common.last_point.classification = decoder.decode_symbol(model)? as u8;
            }

            if changed_values.scan_angle_rank_changed() {
                let val = decoder.decode_symbol(
                    &mut common.scan_angle_rank[common.last_point.scan_direction_flag as usize],
                )? as u8 as i8;
                common.last_point.scan_angle_rank =
                    val.wrapping_add(common.last_point.scan_angle_rank);
            }

            if changed_values.user_data_changed() {
                let model = byte_model(&mut common.user_data, common.last_point.user_data);
                common.last_point.user_data = decoder.decode_symbol(model)? as u8;
            }

            if changed_values.point_source_id_changed() {
                common.last_point.point_source_id = self.ic_point_source_id.decompress(
                    decoder,
                    i32::from(common.last_point.point_source_id),
                    0,
                )? as u16;
            }

            // decompress x
            let median = common.last_x_diff_median[m].get();
            let diff = self.ic_dx.decompress(decoder, median, (n == 1) as u32)?;
            common.last_point.x = common.last_point.x.wrapping_add(diff);
            common.last_x_diff_median[m].add(diff);

            // decompress y
            let median = common.last_y_diff_median[m].get();
            let k_bits = self.ic_dx.k();
            let diff = self
                .ic_dy
                .decompress(decoder, median, y_context(n, k_bits))?;
            common.last_point.y = common.last_point.y.wrapping_add(diff);
            common.last_y_diff_median[m].add(diff);

            // decompress z
            let k_bits = (self.ic_dx.k() + self.ic_dy.k()) / 2;
            common.last_point.z =
                self.ic_z
                    .decompress(decoder, common.last_height[l], z_context(n, k_bits))?;
            common.last_height[l] = common.last_point.z;

            common.last_point.pack_into(buf);
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bit_fields_round_trip() {
        let mut point = Point10::default();
        point.populate_bit_fields_from(0b1101_0011);
        assert_eq!(point.return_number, 3);
        assert_eq!(point.number_of_returns_of_given_pulse, 2);
        assert!(point.scan_direction_flag);
        assert!(point.edge_of_flight_line);
        assert_eq!(point.bit_fields_to_byte(), 0b1101_0011);
    }

    #[test]
    fn test_pack_unpack() {
        let point = Point10 {
            x: -15,
            y: 1 << 20,
            z: 42,
            intensity: 65000,
            return_number: 1,
            number_of_returns_of_given_pulse: 3,
            scan_direction_flag: false,
            edge_of_flight_line: true,
            classification: 2,
            scan_angle_rank: -90,
            user_data: 7,
            point_source_id: 1024,
        };
        let mut buf = [0u8; Point10::SIZE];
        point.pack_into(&mut buf);
        assert_eq!(Point10::unpack_from(&buf), point);
    }
}
