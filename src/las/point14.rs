//! Compressors and decompressors of the point record shared by the point formats 6 to 10.
//!
//! Unlike the point 10 record, these codecs are layered: each group of
//! attributes is coded in its own layer so that a reader only interested
//! in some attributes does not have to decode the others, and so that
//! attributes constant over a chunk cost nothing.
//!
//! Each scanner channel has its own set of models and predictions.

use crate::packers::Packable;

/// The 30 bytes point record of the point formats 6 to 10
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct Point14 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub intensity: u16,
    // 4 bits
    pub return_number: u8,
    // 4 bits
    pub number_of_returns: u8,
    // 4 bits
    pub classification_flags: u8,
    // 2 bits
    pub scanner_channel: u8,
    pub scan_direction_flag: bool,
    pub edge_of_flight_line: bool,
    pub classification: u8,
    pub user_data: u8,
    pub scan_angle: i16,
    pub point_source_id: u16,
    pub gps_time: f64,
}

impl Point14 {
    pub const SIZE: usize = 30;

    #[inline]
    fn bit_fields(&self) -> u8 {
        (self.number_of_returns & 0xF) << 4 | (self.return_number & 0xF)
    }

    #[inline]
    fn flags(&self) -> u8 {
        (self.edge_of_flight_line as u8) << 7
            | (self.scan_direction_flag as u8) << 6
            | (self.scanner_channel & 0x3) << 4
            | (self.classification_flags & 0xF)
    }

    /// The flags without the scanner channel, as they are coded.
    #[inline]
    pub(crate) fn flags_symbol(&self) -> u32 {
        (self.edge_of_flight_line as u32) << 5
            | (self.scan_direction_flag as u32) << 4
            | u32::from(self.classification_flags & 0xF)
    }

    #[inline]
    pub(crate) fn set_flags_symbol(&mut self, symbol: u32) {
        self.classification_flags = (symbol & 0xF) as u8;
        self.scan_direction_flag = is_nth_bit_set!(symbol, 4);
        self.edge_of_flight_line = is_nth_bit_set!(symbol, 5);
    }

    /// The gps time compared & predicted bit for bit.
    #[inline]
    pub(crate) fn gps_time_bits(&self) -> i64 {
        self.gps_time.to_bits() as i64
    }
}

impl Packable for Point14 {
    fn unpack_from(input: &[u8]) -> Self {
        assert!(
            input.len() >= Self::SIZE,
            "Point14::unpack_from expected buffer of {} bytes",
            Self::SIZE
        );
        let bit_fields = input[14];
        let flags = input[15];
        Self {
            x: i32::unpack_from(&input[0..4]),
            y: i32::unpack_from(&input[4..8]),
            z: i32::unpack_from(&input[8..12]),
            intensity: u16::unpack_from(&input[12..14]),
            return_number: bit_fields & 0xF,
            number_of_returns: bit_fields >> 4,
            classification_flags: flags & 0xF,
            scanner_channel: (flags >> 4) & 0x3,
            scan_direction_flag: is_nth_bit_set!(flags, 6),
            edge_of_flight_line: is_nth_bit_set!(flags, 7),
            classification: input[16],
            user_data: input[17],
            scan_angle: i16::unpack_from(&input[18..20]),
            point_source_id: u16::unpack_from(&input[20..22]),
            gps_time: f64::unpack_from(&input[22..30]),
        }
    }

    fn pack_into(&self, output: &mut [u8]) {
        assert!(
            output.len() >= Self::SIZE,
            "Point14::pack_into expected buffer of {} bytes",
            Self::SIZE
        );
        self.x.pack_into(&mut output[0..4]);
        self.y.pack_into(&mut output[4..8]);
        self.z.pack_into(&mut output[8..12]);
        self.intensity.pack_into(&mut output[12..14]);
        output[14] = self.bit_fields();
        output[15] = self.flags();
        output[16] = self.classification;
        output[17] = self.user_data;
        self.scan_angle.pack_into(&mut output[18..20]);
        self.point_source_id.pack_into(&mut output[20..22]);
        self.gps_time.pack_into(&mut output[22..30]);
    }
}

pub mod v3 {
    use std::io::{Cursor, Read, Write};

    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

    use super::Point14;
    use crate::compressors::{IntegerCompressor, IntegerCompressorBuilder};
    use crate::decoders::ArithmeticDecoder;
    use crate::decompressors::{IntegerDecompressor, IntegerDecompressorBuilder};
    use crate::encoders::ArithmeticEncoder;
    use crate::errors::corrupted;
    use crate::las::gps::{GpsTimeSequences, LASZIP_GPS_TIME_MULTI, LASZIP_GPS_TIME_MULTI_MINUS};
    use crate::las::utils::{
        copy_bytes_into_decoder, copy_encoder_content_to, finish_layer, u32_zero_bit,
        ChannelContexts, StreamingMedian, NUMBER_RETURN_LEVEL_8CT, NUMBER_RETURN_MAP_6CTX,
    };
    use crate::models::{ArithmeticModel, ArithmeticModelBuilder};
    use crate::packers::Packable;
    use crate::record::{LayeredFieldCompressor, LayeredFieldDecompressor};

    // Unlike the gps time item, there is no 'unchanged' symbol:
    // the gps time is only coded when it changed.
    const GPS_TIME_MULTI_CODE_FULL: u32 =
        (LASZIP_GPS_TIME_MULTI - LASZIP_GPS_TIME_MULTI_MINUS + 1) as u32;
    const GPS_TIME_MULTI_TOTAL: u32 =
        (LASZIP_GPS_TIME_MULTI - LASZIP_GPS_TIME_MULTI_MINUS + 5) as u32;

    // Symbols of the model used when the last gps time difference is zero
    const GPS_TIME_NO_DIFF_FIRST_DIFF: u32 = 0;
    const GPS_TIME_NO_DIFF_FULL: u32 = 1;
    const GPS_TIME_NO_DIFF_TOTAL: u32 = 5;

    /// The 7 bits telling what changed compared to the last point.
    ///
    /// bit 6: scanner channel, bit 5: point source id, bit 4: gps time,
    /// bit 3: scan angle, bit 2: number of returns, bits 0-1: how the return number changed.
    #[derive(Copy, Clone)]
    struct ChangedValues(u32);

    impl ChangedValues {
        fn from_points(last: &Point14, current: &Point14, channel_changed: bool) -> Self {
            let last_r = last.return_number;
            let r = current.return_number;
            let return_number_diff = if r == last_r {
                0
            } else if r == (last_r + 1) % 16 {
                1
            } else if r == (last_r + 15) % 16 {
                2
            } else {
                3
            };

            Self(
                (channel_changed as u32) << 6
                    | ((last.point_source_id != current.point_source_id) as u32) << 5
                    | ((last.gps_time_bits() != current.gps_time_bits()) as u32) << 4
                    | ((last.scan_angle != current.scan_angle) as u32) << 3
                    | ((last.number_of_returns != current.number_of_returns) as u32) << 2
                    | return_number_diff,
            )
        }

        #[inline]
        fn scanner_channel_changed(self) -> bool {
            is_nth_bit_set!(self.0, 6)
        }

        #[inline]
        fn point_source_changed(self) -> bool {
            is_nth_bit_set!(self.0, 5)
        }

        #[inline]
        fn gps_time_changed(self) -> bool {
            is_nth_bit_set!(self.0, 4)
        }

        #[inline]
        fn scan_angle_changed(self) -> bool {
            is_nth_bit_set!(self.0, 3)
        }

        #[inline]
        fn number_of_returns_changed(self) -> bool {
            is_nth_bit_set!(self.0, 2)
        }

        #[inline]
        fn return_number_diff(self) -> u32 {
            self.0 & 0x3
        }
    }

    /// Contexts derived from the return number & the number of returns.
    struct ReturnContexts {
        m: usize,
        l: usize,
        // complete point return: 0 intermediate, 1 last, 2 first, 3 single
        cpr: u32,
    }

    impl ReturnContexts {
        fn new(n: u8, r: u8) -> Self {
            let (n, r) = (usize::from(n & 0xF), usize::from(r & 0xF));
            Self {
                m: usize::from(NUMBER_RETURN_MAP_6CTX[n][r]),
                l: usize::from(NUMBER_RETURN_LEVEL_8CT[n][r]),
                cpr: (if r == 1 { 2 } else { 0 }) + (if r >= n { 1 } else { 0 }),
            }
        }
    }

    #[inline]
    fn y_context(n: u8, k_bits: u32) -> u32 {
        (n == 1) as u32 + if k_bits < 20 { u32_zero_bit(k_bits) } else { 20 }
    }

    #[inline]
    fn z_context(n: u8, k_bits: u32) -> u32 {
        (n == 1) as u32 + if k_bits < 18 { u32_zero_bit(k_bits) } else { 18 }
    }

    fn lazy_model(
        models: &mut [Option<ArithmeticModel>],
        index: usize,
        symbols: u32,
    ) -> &mut ArithmeticModel {
        models[index].get_or_insert_with(|| ArithmeticModelBuilder::new(symbols).build())
    }

    /// The values a scanner channel predicts the next point from.
    struct Predictions {
        last_point: Point14,
        last_gps_time_changed: bool,
        last_intensities: [u16; 8],
        last_x_diff_median5: [StreamingMedian<i32>; 12],
        last_y_diff_median5: [StreamingMedian<i32>; 12],
        last_z: [i32; 8],
        gps_sequences: GpsTimeSequences,
    }

    impl Predictions {
        fn from_last_point(point: &Point14) -> Self {
            Self {
                last_point: *point,
                last_gps_time_changed: false,
                last_intensities: [point.intensity; 8],
                last_x_diff_median5: [StreamingMedian::new(); 12],
                last_y_diff_median5: [StreamingMedian::new(); 12],
                last_z: [point.z; 8],
                gps_sequences: GpsTimeSequences::new(point.gps_time_bits()),
            }
        }

        /// single (3), first (1), last (2), intermediate (0)
        /// plus whether the gps time changed for the last point
        fn last_point_return_context(&self) -> usize {
            let last = &self.last_point;
            let mut context = (last.return_number == 1) as usize;
            if last.return_number >= last.number_of_returns {
                context += 2;
            }
            if self.last_gps_time_changed {
                context += 4;
            }
            context
        }
    }

    struct Models {
        changed_values: Vec<ArithmeticModel>,
        scanner_channel: ArithmeticModel,
        number_of_returns: Vec<Option<ArithmeticModel>>,
        return_number: Vec<Option<ArithmeticModel>>,
        return_number_gps_same: ArithmeticModel,
        classification: Vec<Option<ArithmeticModel>>,
        flags: Vec<Option<ArithmeticModel>>,
        user_data: Vec<Option<ArithmeticModel>>,
        gps_time_no_diff: ArithmeticModel,
        gps_time_multi: ArithmeticModel,
    }

    impl Models {
        fn new() -> Self {
            Self {
                changed_values: (0..8)
                    .map(|_| ArithmeticModelBuilder::new(128).build())
                    .collect(),
                scanner_channel: ArithmeticModelBuilder::new(3).build(),
                number_of_returns: vec![None; 16],
                return_number: vec![None; 16],
                return_number_gps_same: ArithmeticModelBuilder::new(13).build(),
                classification: vec![None; 64],
                flags: vec![None; 64],
                user_data: vec![None; 64],
                gps_time_no_diff: ArithmeticModelBuilder::new(GPS_TIME_NO_DIFF_TOTAL).build(),
                gps_time_multi: ArithmeticModelBuilder::new(GPS_TIME_MULTI_TOTAL).build(),
            }
        }
    }

    /// The layers of the point record, in the order they are written.
    struct Layers<T> {
        channel_returns_xy: T,
        z: T,
        classification: T,
        flags: T,
        intensity: T,
        scan_angle: T,
        user_data: T,
        point_source: T,
        gps_time: T,
    }

    impl<T> Layers<T> {
        fn new_with<F: FnMut() -> T>(mut create: F) -> Self {
            Self {
                channel_returns_xy: create(),
                z: create(),
                classification: create(),
                flags: create(),
                intensity: create(),
                scan_angle: create(),
                user_data: create(),
                point_source: create(),
                gps_time: create(),
            }
        }

        fn try_for_each<F>(&mut self, mut f: F) -> std::io::Result<()>
        where
            F: FnMut(&mut T) -> std::io::Result<()>,
        {
            f(&mut self.channel_returns_xy)?;
            f(&mut self.z)?;
            f(&mut self.classification)?;
            f(&mut self.flags)?;
            f(&mut self.intensity)?;
            f(&mut self.scan_angle)?;
            f(&mut self.user_data)?;
            f(&mut self.point_source)?;
            f(&mut self.gps_time)
        }
    }

    struct EncoderLayer {
        encoder: ArithmeticEncoder<Cursor<Vec<u8>>>,
        changed: bool,
    }

    impl EncoderLayer {
        fn new() -> Self {
            Self {
                encoder: ArithmeticEncoder::new(Cursor::new(Vec::<u8>::new())),
                changed: false,
            }
        }
    }

    struct DecoderLayer {
        decoder: ArithmeticDecoder<Cursor<Vec<u8>>>,
        size: u32,
        changed: bool,
    }

    impl DecoderLayer {
        fn new() -> Self {
            Self {
                decoder: ArithmeticDecoder::new(Cursor::new(Vec::<u8>::new())),
                size: 0,
                changed: false,
            }
        }
    }

    struct CompressionContext {
        predictions: Predictions,
        models: Models,
        ic_dx: IntegerCompressor,
        ic_dy: IntegerCompressor,
        ic_z: IntegerCompressor,
        ic_intensity: IntegerCompressor,
        ic_scan_angle: IntegerCompressor,
        ic_point_source_id: IntegerCompressor,
        ic_gps_time: IntegerCompressor,
    }

    impl CompressionContext {
        fn from_last_point(point: &Point14) -> Self {
            Self {
                predictions: Predictions::from_last_point(point),
                models: Models::new(),
                ic_dx: IntegerCompressorBuilder::new().bits(32).contexts(2).build(),
                ic_dy: IntegerCompressorBuilder::new().bits(32).contexts(22).build(),
                ic_z: IntegerCompressorBuilder::new().bits(32).contexts(20).build(),
                ic_intensity: IntegerCompressorBuilder::new().bits(16).contexts(4).build(),
                ic_scan_angle: IntegerCompressorBuilder::new().bits(16).contexts(2).build(),
                ic_point_source_id: IntegerCompressorBuilder::new().bits(16).build(),
                ic_gps_time: IntegerCompressorBuilder::new().bits(32).contexts(9).build(),
            }
        }

        /// Codes everything but the changed values & the scanner channel.
        fn compress(
            &mut self,
            layers: &mut Layers<EncoderLayer>,
            current: &Point14,
            changed_values: ChangedValues,
        ) -> std::io::Result<()> {
            let predictions = &mut self.predictions;
            let last = predictions.last_point;
            let gps_time_changed = changed_values.gps_time_changed();
            let n = current.number_of_returns;
            let r = current.return_number;

            let encoder = &mut layers.channel_returns_xy.encoder;
            if changed_values.number_of_returns_changed() {
                let model = lazy_model(
                    &mut self.models.number_of_returns,
                    usize::from(last.number_of_returns),
                    16,
                );
                encoder.encode_symbol(model, u32::from(n))?;
            }

            if changed_values.return_number_diff() == 3 {
                if gps_time_changed {
                    let model = lazy_model(
                        &mut self.models.return_number,
                        usize::from(last.return_number),
                        16,
                    );
                    encoder.encode_symbol(model, u32::from(r))?;
                } else {
                    let sym = (u32::from(r) + 16 - u32::from(last.return_number) - 2) % 16;
                    encoder.encode_symbol(&mut self.models.return_number_gps_same, sym)?;
                }
            }

            let contexts = ReturnContexts::new(n, r);
            let idx = (contexts.m << 1) | gps_time_changed as usize;

            let median = predictions.last_x_diff_median5[idx].get();
            let diff = current.x.wrapping_sub(last.x);
            self.ic_dx
                .compress(encoder, median, diff, (n == 1) as u32)?;
            predictions.last_x_diff_median5[idx].add(diff);

            let k_bits = self.ic_dx.k();
            let median = predictions.last_y_diff_median5[idx].get();
            let diff = current.y.wrapping_sub(last.y);
            self.ic_dy
                .compress(encoder, median, diff, y_context(n, k_bits))?;
            predictions.last_y_diff_median5[idx].add(diff);

            let k_bits = (self.ic_dx.k() + self.ic_dy.k()) / 2;
            self.ic_z.compress(
                &mut layers.z.encoder,
                predictions.last_z[contexts.l],
                current.z,
                z_context(n, k_bits),
            )?;
            predictions.last_z[contexts.l] = current.z;

            let ccc = (((last.classification & 0x1F) << 1) + (contexts.cpr == 3) as u8) as usize;
            layers.classification.encoder.encode_symbol(
                lazy_model(&mut self.models.classification, ccc, 256),
                u32::from(current.classification),
            )?;
            layers.classification.changed |= last.classification != current.classification;

            let last_flags = last.flags_symbol();
            let flags = current.flags_symbol();
            layers.flags.encoder.encode_symbol(
                lazy_model(&mut self.models.flags, last_flags as usize, 64),
                flags,
            )?;
            layers.flags.changed |= last_flags != flags;

            let idx = ((contexts.cpr << 1) | gps_time_changed as u32) as usize;
            let last_intensity = predictions.last_intensities[idx];
            self.ic_intensity.compress(
                &mut layers.intensity.encoder,
                i32::from(last_intensity),
                i32::from(current.intensity),
                contexts.cpr,
            )?;
            layers.intensity.changed |= last_intensity != current.intensity;
            predictions.last_intensities[idx] = current.intensity;

            if changed_values.scan_angle_changed() {
                self.ic_scan_angle.compress(
                    &mut layers.scan_angle.encoder,
                    i32::from(last.scan_angle),
                    i32::from(current.scan_angle),
                    gps_time_changed as u32,
                )?;
                layers.scan_angle.changed = true;
            }

            layers.user_data.encoder.encode_symbol(
                lazy_model(
                    &mut self.models.user_data,
                    usize::from(last.user_data / 4),
                    256,
                ),
                u32::from(current.user_data),
            )?;
            layers.user_data.changed |= last.user_data != current.user_data;

            if changed_values.point_source_changed() {
                self.ic_point_source_id.compress(
                    &mut layers.point_source.encoder,
                    i32::from(last.point_source_id),
                    i32::from(current.point_source_id),
                    0,
                )?;
                layers.point_source.changed = true;
            }

            if gps_time_changed {
                compress_gps_time(
                    &mut layers.gps_time.encoder,
                    &mut predictions.gps_sequences,
                    &mut self.models,
                    &mut self.ic_gps_time,
                    current.gps_time_bits(),
                )?;
                layers.gps_time.changed = true;
            }

            predictions.last_point = *current;
            predictions.last_gps_time_changed = gps_time_changed;
            Ok(())
        }
    }

    fn compress_gps_time<W: Write>(
        encoder: &mut ArithmeticEncoder<W>,
        sequences: &mut GpsTimeSequences,
        models: &mut Models,
        ic_gps_time: &mut IntegerCompressor,
        gps_time: i64,
    ) -> std::io::Result<()> {
        loop {
            if sequences.last_diff_is_zero() {
                if let Some(diff) = sequences.diff_to_last(gps_time) {
                    encoder.encode_symbol(&mut models.gps_time_no_diff, GPS_TIME_NO_DIFF_FIRST_DIFF)?;
                    sequences.compress_first_diff(encoder, ic_gps_time, diff)?;
                } else if let Some(offset) = sequences.find_close_sequence(gps_time) {
                    encoder.encode_symbol(
                        &mut models.gps_time_no_diff,
                        GPS_TIME_NO_DIFF_FULL + offset as u32,
                    )?;
                    sequences.switch_by(offset);
                    continue;
                } else {
                    encoder.encode_symbol(&mut models.gps_time_no_diff, GPS_TIME_NO_DIFF_FULL)?;
                    sequences.compress_full(encoder, ic_gps_time, gps_time)?;
                }
            } else if let Some(diff) = sequences.diff_to_last(gps_time) {
                sequences.compress_multi(encoder, &mut models.gps_time_multi, ic_gps_time, diff)?;
            } else if let Some(offset) = sequences.find_close_sequence(gps_time) {
                encoder.encode_symbol(
                    &mut models.gps_time_multi,
                    GPS_TIME_MULTI_CODE_FULL + offset as u32,
                )?;
                sequences.switch_by(offset);
                continue;
            } else {
                encoder.encode_symbol(&mut models.gps_time_multi, GPS_TIME_MULTI_CODE_FULL)?;
                sequences.compress_full(encoder, ic_gps_time, gps_time)?;
            }
            break;
        }
        sequences.set_last_gps_time(gps_time);
        Ok(())
    }

    fn decompress_gps_time<R: Read>(
        decoder: &mut ArithmeticDecoder<R>,
        sequences: &mut GpsTimeSequences,
        models: &mut Models,
        ic_gps_time: &mut IntegerDecompressor,
    ) -> std::io::Result<i64> {
        let mut switched = false;
        loop {
            if sequences.last_diff_is_zero() {
                let sym = decoder.decode_symbol(&mut models.gps_time_no_diff)?;
                match sym {
                    GPS_TIME_NO_DIFF_FIRST_DIFF => {
                        sequences.decompress_first_diff(decoder, ic_gps_time)?
                    }
                    GPS_TIME_NO_DIFF_FULL => sequences.decompress_full(decoder, ic_gps_time)?,
                    _ => {
                        if switched {
                            return Err(corrupted("gps time"));
                        }
                        sequences.switch_by((sym - GPS_TIME_NO_DIFF_FULL) as usize);
                        switched = true;
                        continue;
                    }
                }
            } else {
                let multi = decoder.decode_symbol(&mut models.gps_time_multi)?;
                if multi < GPS_TIME_MULTI_CODE_FULL {
                    sequences.decompress_multi(decoder, ic_gps_time, multi as i32)?;
                } else if multi == GPS_TIME_MULTI_CODE_FULL {
                    sequences.decompress_full(decoder, ic_gps_time)?;
                } else {
                    if switched {
                        return Err(corrupted("gps time"));
                    }
                    sequences.switch_by((multi - GPS_TIME_MULTI_CODE_FULL) as usize);
                    switched = true;
                    continue;
                }
            }
            break;
        }
        Ok(sequences.last_gps_time())
    }

    pub struct LasPoint14Compressor {
        layers: Layers<EncoderLayer>,
        contexts: ChannelContexts<CompressionContext>,
    }

    impl Default for LasPoint14Compressor {
        fn default() -> Self {
            let mut layers = Layers::new_with(EncoderLayer::new);
            // the layers of the changed values and of z are always written
            layers.channel_returns_xy.changed = true;
            layers.z.changed = true;
            Self {
                layers,
                contexts: ChannelContexts::default(),
            }
        }
    }

    impl<W: Write> LayeredFieldCompressor<W> for LasPoint14Compressor {
        fn size_of_field(&self) -> usize {
            Point14::SIZE
        }

        fn init_first_point(
            &mut self,
            dst: &mut W,
            first_point: &[u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            dst.write_all(first_point)?;
            let point = Point14::unpack_from(first_point);
            *context = usize::from(point.scanner_channel);
            self.contexts
                .init(CompressionContext::from_last_point(&point), *context);
            Ok(())
        }

        fn compress_field_with(
            &mut self,
            current_point: &[u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            let current = Point14::unpack_from(current_point);
            let last_channel = self.contexts.current_index();
            let lpr = self
                .contexts
                .current()?
                .predictions
                .last_point_return_context();

            let channel = usize::from(current.scanner_channel);
            let the_context = self.contexts.switch_to(channel, |previous| {
                CompressionContext::from_last_point(&previous.predictions.last_point)
            })?;
            let changed_values = ChangedValues::from_points(
                &the_context.predictions.last_point,
                &current,
                channel != last_channel,
            );

            // the changed values are coded with the models of the previous channel
            let last_context = self.contexts.get_mut(last_channel)?;
            let encoder = &mut self.layers.channel_returns_xy.encoder;
            encoder.encode_symbol(&mut last_context.models.changed_values[lpr], changed_values.0)?;
            if changed_values.scanner_channel_changed() {
                let diff = (channel + 4 - last_channel - 1) % 4;
                encoder.encode_symbol(&mut last_context.models.scanner_channel, diff as u32)?;
            }

            *context = channel;
            self.contexts
                .current_mut()?
                .compress(&mut self.layers, &current, changed_values)
        }

        fn write_layers_sizes(&mut self, dst: &mut W) -> std::io::Result<()> {
            self.layers.try_for_each(|layer| {
                let size = finish_layer(&mut layer.encoder, layer.changed)?;
                dst.write_u32::<LittleEndian>(size)
            })
        }

        fn write_layers(&mut self, dst: &mut W) -> std::io::Result<()> {
            self.layers
                .try_for_each(|layer| copy_encoder_content_to(&mut layer.encoder, dst))
        }
    }

    struct DecompressionContext {
        predictions: Predictions,
        models: Models,
        id_dx: IntegerDecompressor,
        id_dy: IntegerDecompressor,
        id_z: IntegerDecompressor,
        id_intensity: IntegerDecompressor,
        id_scan_angle: IntegerDecompressor,
        id_point_source_id: IntegerDecompressor,
        id_gps_time: IntegerDecompressor,
    }

    impl DecompressionContext {
        fn from_last_point(point: &Point14) -> Self {
            Self {
                predictions: Predictions::from_last_point(point),
                models: Models::new(),
                id_dx: IntegerDecompressorBuilder::new().bits(32).contexts(2).build(),
                id_dy: IntegerDecompressorBuilder::new().bits(32).contexts(22).build(),
                id_z: IntegerDecompressorBuilder::new().bits(32).contexts(20).build(),
                id_intensity: IntegerDecompressorBuilder::new().bits(16).contexts(4).build(),
                id_scan_angle: IntegerDecompressorBuilder::new().bits(16).contexts(2).build(),
                id_point_source_id: IntegerDecompressorBuilder::new().bits(16).build(),
                id_gps_time: IntegerDecompressorBuilder::new().bits(32).contexts(9).build(),
            }
        }

        fn decompress(
            &mut self,
            layers: &mut Layers<DecoderLayer>,
            changed_values: ChangedValues,
            channel: u8,
        ) -> std::io::Result<Point14> {
            let predictions = &mut self.predictions;
            let last = &mut predictions.last_point;
            let gps_time_changed = changed_values.gps_time_changed();
            last.scanner_channel = channel;

            let decoder = &mut layers.channel_returns_xy.decoder;
            if changed_values.number_of_returns_changed() {
                let model = lazy_model(
                    &mut self.models.number_of_returns,
                    usize::from(last.number_of_returns),
                    16,
                );
                last.number_of_returns = decoder.decode_symbol(model)? as u8;
            }

            let last_r = last.return_number;
            last.return_number = match changed_values.return_number_diff() {
                0 => last_r,
                1 => (last_r + 1) % 16,
                2 => (last_r + 15) % 16,
                _ => {
                    if gps_time_changed {
                        let model =
                            lazy_model(&mut self.models.return_number, usize::from(last_r), 16);
                        decoder.decode_symbol(model)? as u8
                    } else {
                        let sym = decoder.decode_symbol(&mut self.models.return_number_gps_same)?;
                        ((u32::from(last_r) + sym + 2) % 16) as u8
                    }
                }
            };

            let n = last.number_of_returns;
            let contexts = ReturnContexts::new(n, last.return_number);
            let idx = (contexts.m << 1) | gps_time_changed as usize;

            let median = predictions.last_x_diff_median5[idx].get();
            let diff = self
                .id_dx
                .decompress(decoder, median, (n == 1) as u32)?;
            last.x = last.x.wrapping_add(diff);
            predictions.last_x_diff_median5[idx].add(diff);

            let k_bits = self.id_dx.k();
            let median = predictions.last_y_diff_median5[idx].get();
            let diff = self
                .id_dy
                .decompress(decoder, median, y_context(n, k_bits))?;
            last.y = last.y.wrapping_add(diff);
            predictions.last_y_diff_median5[idx].add(diff);

            if layers.z.changed {
                let k_bits = (self.id_dx.k() + self.id_dy.k()) / 2;
                last.z = self.id_z.decompress(
                    &mut layers.z.decoder,
                    predictions.last_z[contexts.l],
                    z_context(n, k_bits),
                )?;
                predictions.last_z[contexts.l] = last.z;
            }

            if layers.classification.changed {
                let ccc =
                    (((last.classification & 0x1F) << 1) + (contexts.cpr == 3) as u8) as usize;
                last.classification = layers
                    .classification
                    .decoder
                    .decode_symbol(lazy_model(&mut self.models.classification, ccc, 256))?
                    as u8;
            }

            if layers.flags.changed {
                let last_flags = last.flags_symbol() as usize;
                let flags = layers
                    .flags
                    .decoder
                    .decode_symbol(lazy_model(&mut self.models.flags, last_flags, 64))?;
                last.set_flags_symbol(flags);
            }

            if layers.intensity.changed {
                let idx = ((contexts.cpr << 1) | gps_time_changed as u32) as usize;
                last.intensity = self.id_intensity.decompress(
                    &mut layers.intensity.decoder,
                    i32::from(predictions.last_intensities[idx]),
                    contexts.cpr,
                )? as u16;
                predictions.last_intensities[idx] = last.intensity;
            }

            if layers.scan_angle.changed && changed_values.scan_angle_changed() {
                last.scan_angle = self.id_scan_angle.decompress(
                    &mut layers.scan_angle.decoder,
                    i32::from(last.scan_angle),
                    gps_time_changed as u32,
                )? as i16;
            }

            if layers.user_data.changed {
                last.user_data = layers.user_data.decoder.decode_symbol(lazy_model(
                    &mut self.models.user_data,
                    usize::from(last.user_data / 4),
                    256,
                ))? as u8;
            }

            if layers.point_source.changed && changed_values.point_source_changed() {
                last.point_source_id = self.id_point_source_id.decompress(
                    &mut layers.point_source.decoder,
                    i32::from(last.point_source_id),
                    0,
                )? as u16;
            }

            if layers.gps_time.changed && gps_time_changed {
                let gps_time = decompress_gps_time(
                    &mut layers.gps_time.decoder,
                    &mut predictions.gps_sequences,
                    &mut self.models,
                    &mut self.id_gps_time,
                )?;
                last.gps_time = f64::from_bits(gps_time as u64);
            }

            predictions.last_gps_time_changed = gps_time_changed;
            Ok(*last)
        }
    }

    pub struct LasPoint14Decompressor {
        layers: Layers<DecoderLayer>,
        contexts: ChannelContexts<DecompressionContext>,
    }

    impl Default for LasPoint14Decompressor {
        fn default() -> Self {
            Self {
                layers: Layers::new_with(DecoderLayer::new),
                contexts: ChannelContexts::default(),
            }
        }
    }

    impl<R: Read> LayeredFieldDecompressor<R> for LasPoint14Decompressor {
        fn size_of_field(&self) -> usize {
            Point14::SIZE
        }

        fn init_first_point(
            &mut self,
            src: &mut R,
            first_point: &mut [u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            src.read_exact(first_point)?;
            let point = Point14::unpack_from(first_point);
            *context = usize::from(point.scanner_channel);
            self.contexts
                .init(DecompressionContext::from_last_point(&point), *context);
            Ok(())
        }

        fn decompress_field_with(
            &mut self,
            current_point: &mut [u8],
            context: &mut usize,
        ) -> std::io::Result<()> {
            let last_channel = self.contexts.current_index();
            let the_context = self.contexts.current_mut()?;
            let lpr = the_context.predictions.last_point_return_context();

            let decoder = &mut self.layers.channel_returns_xy.decoder;
            let changed_values =
                ChangedValues(decoder.decode_symbol(&mut the_context.models.changed_values[lpr])?);
            if changed_values.scanner_channel_changed() {
                let diff = decoder.decode_symbol(&mut the_context.models.scanner_channel)?;
                let channel = (last_channel + diff as usize + 1) % 4;
                self.contexts.switch_to(channel, |previous| {
                    DecompressionContext::from_last_point(&previous.predictions.last_point)
                })?;
            }

            *context = self.contexts.current_index();
            let channel = *context as u8;
            let point = self.contexts.current_mut()?.decompress(
                &mut self.layers,
                changed_values,
                channel,
            )?;
            point.pack_into(current_point);
            Ok(())
        }

        fn read_layers_sizes(&mut self, src: &mut R) -> std::io::Result<()> {
            self.layers.try_for_each(|layer| {
                layer.size = src.read_u32::<LittleEndian>()?;
                Ok(())
            })
        }

        fn read_layers(&mut self, src: &mut R) -> std::io::Result<()> {
            self.layers.try_for_each(|layer| {
                layer.changed = copy_bytes_into_decoder(layer.size as usize, &mut layer.decoder, src)?;
                Ok(())
            })
        }
    }
}

pub mod v4 {
    use super::v3;

    layered_v4_codecs!(LasPoint14Compressor, LasPoint14Decompressor);

    impl Default for LasPoint14Compressor {
        fn default() -> Self {
            Self::from(v3::LasPoint14Compressor::default())
        }
    }

    impl Default for LasPoint14Decompressor {
        fn default() -> Self {
            Self::from(v3::LasPoint14Decompressor::default())
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::v3::{LasPoint14Compressor, LasPoint14Decompressor};
    use super::Point14;
    use crate::packers::Packable;
    use crate::record::{LayeredFieldCompressor, LayeredFieldDecompressor};

    fn compress(points: &[Point14]) -> Vec<u8> {
        let mut compressor = LasPoint14Compressor::default();
        let mut dst = Cursor::new(Vec::<u8>::new());
        let mut buf = [0u8; Point14::SIZE];
        let mut context = 0usize;

        points[0].pack_into(&mut buf);
        compressor
            .init_first_point(&mut dst, &buf, &mut context)
            .unwrap();
        for point in &points[1..] {
            point.pack_into(&mut buf);
            LayeredFieldCompressor::<Cursor<Vec<u8>>>::compress_field_with(
                &mut compressor,
                &buf,
                &mut context,
            )
            .unwrap();
            assert_eq!(context, usize::from(point.scanner_channel));
        }
        compressor.write_layers_sizes(&mut dst).unwrap();
        compressor.write_layers(&mut dst).unwrap();
        dst.into_inner()
    }

    fn decompress(data: Vec<u8>, count: usize) -> Vec<Point14> {
        let mut decompressor = LasPoint14Decompressor::default();
        let mut src = Cursor::new(data);
        let mut buf = [0u8; Point14::SIZE];
        let mut context = 0usize;

        decompressor
            .init_first_point(&mut src, &mut buf, &mut context)
            .unwrap();
        let mut points = vec![Point14::unpack_from(&buf)];
        decompressor.read_layers_sizes(&mut src).unwrap();
        decompressor.read_layers(&mut src).unwrap();
        for _ in 1..count {
            LayeredFieldDecompressor::<Cursor<Vec<u8>>>::decompress_field_with(
                &mut decompressor,
                &mut buf,
                &mut context,
            )
            .unwrap();
            points.push(Point14::unpack_from(&buf));
        }
        points
    }

    fn layer_sizes(data: &[u8]) -> Vec<u32> {
        data[Point14::SIZE..Point14::SIZE + 9 * 4]
            .chunks_exact(4)
            .map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect()
    }

    #[test]
    fn test_point14_pack_unpack() {
        let point = Point14 {
            x: -12,
            y: 1 << 30,
            z: 7,
            intensity: 65535,
            return_number: 3,
            number_of_returns: 15,
            classification_flags: 0b1010,
            scanner_channel: 2,
            scan_direction_flag: true,
            edge_of_flight_line: false,
            classification: 200,
            user_data: 9,
            scan_angle: -30000,
            point_source_id: 4242,
            gps_time: 123456.789,
        };
        let mut buf = [0u8; Point14::SIZE];
        point.pack_into(&mut buf);
        assert_eq!(buf[14], 0xF3);
        assert_eq!(buf[15], 0b0110_1010);
        assert_eq!(Point14::unpack_from(&buf), point);
    }

    #[test]
    fn test_flags_symbol_ignores_scanner_channel() {
        let mut point = Point14 {
            classification_flags: 0x5,
            scanner_channel: 3,
            edge_of_flight_line: true,
            ..Default::default()
        };
        let symbol = point.flags_symbol();
        assert_eq!(symbol, 0b10_0101);

        point.set_flags_symbol(0b01_0010);
        assert_eq!(point.classification_flags, 0x2);
        assert!(point.scan_direction_flag);
        assert!(!point.edge_of_flight_line);
        assert_eq!(point.scanner_channel, 3);
    }

    #[test]
    fn test_point14_round_trip_over_channels_and_returns() {
        let mut points = Vec::new();
        let mut gps_time = 400_000.0f64;
        for i in 0..400i32 {
            let number_of_returns = (i % 5 + 1) as u8;
            let return_number = (i % 7) as u8 % (number_of_returns + 1);
            if i % 3 == 0 {
                gps_time += 0.000_05;
            }
            if i == 250 {
                // far enough for a new gps time sequence
                gps_time += 1.0e9;
            }
            if i == 300 {
                // back to the first sequence
                gps_time -= 1.0e9;
            }
            points.push(Point14 {
                x: i * 13 - 2000,
                y: (i * i) % 977,
                z: 1000 - (i % 17) * 3,
                intensity: (i * 37 % 65536) as u16,
                return_number,
                number_of_returns,
                classification_flags: (i % 16) as u8,
                scanner_channel: ((i / 9) % 4) as u8,
                scan_direction_flag: i % 2 == 0,
                edge_of_flight_line: i % 11 == 0,
                classification: (i % 23) as u8,
                user_data: (i % 250) as u8,
                scan_angle: ((i % 61) * 100 - 3000) as i16,
                point_source_id: (i / 50) as u16,
                gps_time,
            });
        }

        let data = compress(&points);
        assert_eq!(decompress(data, points.len()), points);
    }

    #[test]
    fn test_constant_attributes_have_empty_layers() {
        let points = (0..50)
            .map(|i| Point14 {
                x: i,
                y: -i,
                z: 12,
                intensity: 300,
                return_number: 1,
                number_of_returns: 1,
                classification: 2,
                user_data: 1,
                point_source_id: 7,
                gps_time: 10.5,
                ..Default::default()
            })
            .collect::<Vec<_>>();

        let data = compress(&points);
        let sizes = layer_sizes(&data);
        // z is written even when it never changed
        assert_ne!(sizes[0], 0);
        assert_ne!(sizes[1], 0);
        assert!(sizes[2..].iter().all(|&size| size == 0));
        assert_eq!(
            data.len(),
            Point14::SIZE + 9 * 4 + (sizes[0] + sizes[1]) as usize
        );
        assert_eq!(decompress(data, points.len()), points);
    }

    #[test]
    fn test_single_point_chunk_layout() {
        let point = Point14 {
            x: 1,
            y: 2,
            z: 3,
            return_number: 1,
            number_of_returns: 1,
            gps_time: 1.0,
            ..Default::default()
        };
        let data = compress(&[point]);

        let mut raw = [0u8; Point14::SIZE];
        point.pack_into(&mut raw);
        assert_eq!(&data[..Point14::SIZE], &raw[..]);
        assert_eq!(layer_sizes(&data), vec![4, 4, 0, 0, 0, 0, 0, 0, 0]);
        // the flush of an encoder that coded nothing
        assert_eq!(&data[Point14::SIZE + 9 * 4..], &[1, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(decompress(data, 1), vec![point]);
    }
}
