//! Generation of point records that look like the ones of a real acquisition:
//! points close to each other, pulses with several returns sharing the same
//! gps time, slowly changing colors and the occasional jump.
#![allow(dead_code)]

use std::io::Cursor;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use laz_codec::las::point10::Point10;
use laz_codec::las::point14::Point14;
use laz_codec::las::rgb::RGB;
use laz_codec::las::wavepacket::LasWavepacket;
use laz_codec::packers::Packable;
use laz_codec::{LasZipCompressor, LasZipDecompressor, LazItem, LazItemType, LazVlr};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct PointGenerator {
    rng: StdRng,
    items: Vec<LazItem>,
    point10: Point10,
    point14: Point14,
    gps_time: f64,
    rgb: RGB,
    nir: u16,
    wavepacket: LasWavepacket,
    extra_bytes: Vec<u8>,
}

impl PointGenerator {
    pub fn new(items: Vec<LazItem>, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            items,
            point10: Point10 {
                x: 1_000_000,
                y: 2_000_000,
                z: 30_000,
                ..Default::default()
            },
            point14: Point14 {
                x: -1_000_000,
                y: 5_000_000,
                z: 12_000,
                ..Default::default()
            },
            gps_time: 242_000_000.0,
            rgb: RGB {
                red: 30_000,
                green: 30_500,
                blue: 29_000,
            },
            nir: 12_000,
            wavepacket: LasWavepacket {
                descriptor_index: 1,
                offset: 60_000,
                size: 256,
                return_point: 1.0,
                ..Default::default()
            },
            extra_bytes: Vec::new(),
        }
    }

    pub fn point_size(&self) -> usize {
        self.items.iter().map(|item| item.size() as usize).sum()
    }

    /// Generates `count` consecutive points.
    pub fn points(&mut self, count: usize) -> Vec<u8> {
        let mut points = Vec::with_capacity(count * self.point_size());
        for _ in 0..count {
            self.next_point(&mut points);
        }
        points
    }

    /// Appends the next point to `out`.
    pub fn next_point(&mut self, out: &mut Vec<u8>) {
        let items: Vec<LazItemType> = self.items.iter().map(|item| item.item_type()).collect();
        let new_pulse = self.next_returns(&items);
        for item_type in items {
            match item_type {
                LazItemType::Point10 => self.next_point10(new_pulse, out),
                LazItemType::GpsTime => append(out, &self.gps_time.to_le_bytes()),
                LazItemType::RGB12 | LazItemType::RGB14 => {
                    self.next_rgb();
                    append_packable(out, &self.rgb, RGB::SIZE);
                }
                LazItemType::RGBNIR14 => {
                    self.next_rgb();
                    append_packable(out, &self.rgb, RGB::SIZE);
                    if self.rng.random_bool(0.3) {
                        self.nir = self.nir.wrapping_add(self.rng.random_range(0..600)) % 40_000;
                    }
                    append(out, &self.nir.to_le_bytes());
                }
                LazItemType::WavePacket13 | LazItemType::WavePacket14 => {
                    self.next_wavepacket();
                    append_packable(out, &self.wavepacket, LasWavepacket::SIZE);
                }
                LazItemType::Point14 => self.next_point14(new_pulse, out),
                LazItemType::Byte(n) | LazItemType::Byte14(n) => self.next_extra_bytes(n, out),
            }
        }
    }

    /// Moves to the next return of the pulse or starts a new pulse,
    /// returns true in the latter case.
    fn next_returns(&mut self, items: &[LazItemType]) -> bool {
        let (return_number, number_of_returns, max_returns) =
            if items.contains(&LazItemType::Point14) {
                (
                    &mut self.point14.return_number,
                    &mut self.point14.number_of_returns,
                    15,
                )
            } else {
                (
                    &mut self.point10.return_number,
                    &mut self.point10.number_of_returns_of_given_pulse,
                    7,
                )
            };

        if *return_number < *number_of_returns {
            *return_number += 1;
            return false;
        }
        *number_of_returns = if self.rng.random_bool(0.6) {
            1
        } else {
            self.rng.random_range(2..=max_returns)
        };
        *return_number = 1;

        let roll: f64 = self.rng.random();
        if roll < 0.97 {
            self.gps_time += self.rng.random_range(1e-6..1e-4);
        } else if roll < 0.99 {
            self.gps_time += self.rng.random_range(-1e5..1e5);
        } else {
            self.gps_time = self.rng.random_range(0.0..5e8);
        }
        true
    }

    fn next_point10(&mut self, new_pulse: bool, out: &mut Vec<u8>) {
        let rng = &mut self.rng;
        let p = &mut self.point10;
        p.x = p.x.wrapping_add(rng.random_range(-400..=400));
        p.y = p.y.wrapping_add(rng.random_range(-400..=400));
        p.z = p.z.wrapping_add(rng.random_range(-150..=150));
        p.intensity = if rng.random_bool(0.05) {
            rng.random()
        } else {
            rng.random_range(0..2_000)
        };
        if new_pulse {
            if rng.random_bool(0.01) {
                p.scan_direction_flag = !p.scan_direction_flag;
                p.edge_of_flight_line = rng.random_bool(0.5);
            }
            p.scan_angle_rank = clamped(
                i32::from(p.scan_angle_rank) + rng.random_range(-2..=2),
                -90,
                90,
            ) as i8;
        }
        if rng.random_bool(0.2) {
            let flags = if rng.random_bool(0.1) {
                rng.random_range(1..8u8) << 5
            } else {
                0
            };
            p.classification = flags | [1u8, 2, 3, 5, 6, 9][rng.random_range(0..6)];
        }
        if rng.random_bool(0.02) {
            p.user_data = rng.random();
        }
        if rng.random_bool(0.005) {
            p.point_source_id = rng.random_range(1..20);
        }
        append_packable(out, &*p, 20);
    }

    fn next_point14(&mut self, new_pulse: bool, out: &mut Vec<u8>) {
        let rng = &mut self.rng;
        let p = &mut self.point14;
        if rng.random_bool(0.05) {
            p.scanner_channel = rng.random_range(0..4);
        }
        p.x = p.x.wrapping_add(rng.random_range(-400..=400));
        p.y = p.y.wrapping_add(rng.random_range(-400..=400));
        p.z = p.z.wrapping_add(rng.random_range(-150..=150));
        p.intensity = rng.random_range(0..4_000);
        if new_pulse {
            p.scan_angle = clamped(
                i32::from(p.scan_angle) + rng.random_range(-40..=40),
                -15_000,
                15_000,
            ) as i16;
            if rng.random_bool(0.01) {
                p.scan_direction_flag = !p.scan_direction_flag;
            }
            p.edge_of_flight_line = rng.random_bool(0.01);
        }
        if rng.random_bool(0.2) {
            p.classification = [1u8, 2, 3, 5, 6, 9, 17, 64][rng.random_range(0..8)];
            p.classification_flags = if rng.random_bool(0.1) {
                rng.random_range(0..16)
            } else {
                0
            };
        }
        if rng.random_bool(0.02) {
            p.user_data = rng.random();
        }
        if rng.random_bool(0.005) {
            p.point_source_id = rng.random_range(1..20);
        }
        p.gps_time = self.gps_time;
        append_packable(out, &*p, Point14::SIZE);
    }

    fn next_rgb(&mut self) {
        if self.rng.random_bool(0.5) {
            return;
        }
        if self.rng.random_bool(0.1) {
            let grey = self.rng.random();
            self.rgb = RGB {
                red: grey,
                green: grey,
                blue: grey,
            };
            return;
        }
        let rng = &mut self.rng;
        for channel in [&mut self.rgb.red, &mut self.rgb.green, &mut self.rgb.blue] {
            *channel = clamped(
                i32::from(*channel) + rng.random_range(-700..=700),
                0,
                i32::from(u16::MAX),
            ) as u16;
        }
    }

    fn next_wavepacket(&mut self) {
        let rng = &mut self.rng;
        let wp = &mut self.wavepacket;
        wp.offset += u64::from(wp.size);
        if rng.random_bool(0.1) {
            wp.descriptor_index = rng.random_range(1..4);
            wp.size = [128u32, 256, 512][rng.random_range(0..3)];
        }
        wp.return_point = rng.random_range(0.0..2_000.0);
        wp.dx = rng.random_range(-1e-4..1e-4);
        wp.dy = rng.random_range(-1e-4..1e-4);
        wp.dz = rng.random_range(-1e-3..0.0);
    }

    fn next_extra_bytes(&mut self, count: u16, out: &mut Vec<u8>) {
        let count = count as usize;
        self.extra_bytes.resize(count, 0);
        for (i, byte) in self.extra_bytes.iter_mut().enumerate() {
            // the first bytes barely change, the last ones are noise
            if i == 0 {
                continue;
            }
            if i + 1 == count || self.rng.random_bool(0.1) {
                *byte = self.rng.random();
            }
        }
        append(out, &self.extra_bytes);
    }
}

fn clamped(value: i32, min: i32, max: i32) -> i32 {
    value.max(min).min(max)
}

fn append(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes);
}

fn append_packable<P: Packable>(out: &mut Vec<u8>, value: &P, size: usize) {
    let start = out.len();
    out.resize(start + size, 0);
    value.pack_into(&mut out[start..]);
}

/// Compresses all the `points` in memory.
pub fn compress(vlr: &LazVlr, points: &[u8]) -> Vec<u8> {
    let mut compressor =
        LasZipCompressor::new(Cursor::new(Vec::<u8>::new()), vlr.clone()).unwrap();
    compressor.compress_many(points).unwrap();
    compressor.done().unwrap();
    compressor.into_inner().into_inner()
}

/// Decompresses `count` points of `point_size` bytes.
pub fn decompress(vlr: &LazVlr, data: &[u8], count: usize, point_size: usize) -> Vec<u8> {
    let mut decompressor = LasZipDecompressor::new(Cursor::new(data), vlr.clone()).unwrap();
    let mut points = vec![0u8; count * point_size];
    decompressor.decompress_many(&mut points).unwrap();
    points
}

/// Index of the first point whose bytes differ between `expected` and `actual`.
pub fn first_mismatch(expected: &[u8], actual: &[u8], point_size: usize) -> Option<usize> {
    expected
        .chunks_exact(point_size)
        .zip(actual.chunks_exact(point_size))
        .position(|(e, a)| e != a)
}
