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


//! Reading and writing the little-endian fields of a point record.

use byteorder::{ByteOrder, LittleEndian};

pub trait Packable: Sized {
    /// Reads the value from the first bytes of `input`.
    ///
    /// # Panics
    ///
    /// If `input` is smaller than the packed size.
    fn unpack_from(input: &[u8]) -> Self;

    /// Writes the value into the first bytes of `output`.
    ///
    /// # Panics
    ///
    /// If `output` is smaller than the packed size.
    fn pack_into(&self, output: &mut [u8]);
}

macro_rules! impl_packable_with_byteorder {
    ($($ty:ty => $read:ident, $write:ident);* $(;)?) => {
        $(
            impl Packable for $ty {
                #[inline]
                fn unpack_from(input: &[u8]) -> Self {
                    LittleEndian::$read(input)
                }

                #[inline]
                fn pack_into(&self, output: &mut [u8]) {
                    LittleEndian::$write(output, *self)
                }
            }
        )*
    };
}

impl_packable_with_byteorder! {
    u16 => read_u16, write_u16;
    i16 => read_i16, write_i16;
    u32 => read_u32, write_u32;
    i32 => read_i32, write_i32;
    u64 => read_u64, write_u64;
    i64 => read_i64, write_i64;
    f32 => read_f32, write_f32;
    f64 => read_f64, write_f64;
}

impl Packable for u8 {
    #[inline]
    fn unpack_from(input: &[u8]) -> Self {
        input[0]
    }

    #[inline]
    fn pack_into(&self, output: &mut [u8]) {
        output[0] = *self;
    }
}

impl Packable for i8 {
    #[inline]
    fn unpack_from(input: &[u8]) -> Self {
        input[0] as i8
    }

    #[inline]
    fn pack_into(&self, output: &mut [u8]) {
        output[0] = *self as u8;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_packer() {
        let in_val: i32 = -25;
        let mut buf = [0u8; std::mem::size_of::<i32>()];
        in_val.pack_into(&mut buf);
        assert_eq!(buf, [0xE7, 0xFF, 0xFF, 0xFF]);
        assert_eq!(i32::unpack_from(&buf), in_val);
    }

    #[test]
    fn test_only_the_first_bytes_are_used() {
        let buf = [0x34u8, 0x12, 0xAA, 0xBB];
        assert_eq!(u16::unpack_from(&buf), 0x1234);
        assert_eq!(i8::unpack_from(&buf[2..]), -86);

        let mut out = [0u8; 10];
        1.5f64.pack_into(&mut out[2..]);
        assert_eq!(f64::unpack_from(&out[2..]), 1.5);
        assert_eq!(&out[..2], &[0, 0]);
    }

    #[test]
    #[should_panic]
    fn test_too_small_buffer() {
        u32::unpack_from(&[0u8; 3]);
    }
}
