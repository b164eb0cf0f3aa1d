use super::constants::*;
use smallvec::{Array, SmallVec};

use crate::{
    decimal::Decimal,
    timestamp::{Precision, Timestamp},
    util::u128_to_digits,
};

/// Something bytes can be appended to.
pub trait Serializer {
    /// Add a byte to the output value.
    fn put_u8(&mut self, u: u8);
    /// Add a slice to the output value.
    fn put_slice(&mut self, slice: &[u8]);
}

impl Serializer for Vec<u8> {
    fn put_u8(&mut self, u: u8) { self.push(u) }

    fn put_slice(&mut self, slice: &[u8]) { self.extend_from_slice(slice) }
}

impl<A: Array<Item = u8>> Serializer for SmallVec<A> {
    fn put_u8(&mut self, u: u8) { self.push(u) }

    fn put_slice(&mut self, slice: &[u8]) { self.extend_from_slice(slice) }
}

/// Number of bytes [`SerializerExt::put_var_uint`] emits for `u`.
pub fn var_uint_len(u: u64) -> usize {
    let bits = 64 - u.leading_zeros() as usize;
    if bits == 0 {
        1
    } else {
        (bits + 6) / 7
    }
}

/// Number of bytes [`SerializerExt::put_descriptor`] emits.
pub fn descriptor_len(tid: u8, len: usize) -> usize {
    if uses_var_len(tid, len) {
        1 + var_uint_len(len as u64)
    } else {
        1
    }
}

#[inline]
// A struct of length 1 would read back as an ordered struct.
fn uses_var_len(tid: u8, len: usize) -> bool {
    len >= LN_VAR_LEN as usize || (tid == TID_STRUCT && len == LN_ORDERED_STRUCT as usize)
}

/// Encoders for the binary layout primitives.
pub trait SerializerExt: Serializer {
    /// Add a VarUInt.
    ///
    /// # Arguments
    ///
    /// * `u: u64` - The value to be added.
    fn put_var_uint(&mut self, mut u: u64) {
        let mut buf = [0u8; 10];
        let mut ix = buf.len();
        loop {
            ix -= 1;
            buf[ix] = (u as u8) & VAR_DATA;
            u >>= 7;
            if u == 0 {
                break;
            }
        }
        buf[9] |= VAR_END;
        self.put_slice(&buf[ix..]);
    }

    /// Add a VarInt.
    ///
    /// # Arguments
    ///
    /// * `i: i64` - The value to be added.
    fn put_var_int(&mut self, i: i64) {
        let mut mag = (i as i128).abs() as u64;
        let mut buf = [0u8; 11];
        let mut ix = buf.len();
        loop {
            ix -= 1;
            buf[ix] = (mag as u8) & VAR_DATA;
            mag >>= 7;
            if mag == 0 {
                break;
            }
        }
        if buf[ix] & VAR_INT_SIGN != 0 {
            ix -= 1;
            buf[ix] = 0;
        }
        if i < 0 {
            buf[ix] |= VAR_INT_SIGN;
        }
        buf[10] |= VAR_END;
        self.put_slice(&buf[ix..]);
    }

    /// Add the negative-zero VarInt, which stands for "unknown".
    fn put_var_int_unknown(&mut self) { self.put_u8(VAR_END | VAR_INT_SIGN) }

    /// Add a type descriptor for a value of `len` bytes, with a trailing VarUInt length
    /// when the length doesn't fit in the nibble.
    ///
    /// # Arguments
    ///
    /// * `tid: u8` - The type code.
    /// * `len: usize` - The length of the value that follows.
    fn put_descriptor(&mut self, tid: u8, len: usize) {
        if uses_var_len(tid, len) {
            self.put_u8(make_descriptor(tid, LN_VAR_LEN));
            self.put_var_uint(len as u64);
        } else {
            self.put_u8(make_descriptor(tid, len as u8));
        }
    }

    /// Add a decimal without its descriptor. `0d0` adds nothing.
    ///
    /// # Arguments
    ///
    /// * `d: &Decimal` - The value to be added.
    fn put_decimal_body(&mut self, d: &Decimal) {
        if d.is_canonical_zero() {
            return;
        }
        self.put_var_int(-i64::from(d.scale()));
        let digs = u128_to_digits(d.magnitude());
        match digs.first() {
            None if d.is_negative() => self.put_u8(INT_SIGN),
            None => {}
            Some(first) if first & INT_SIGN != 0 => {
                self.put_u8(if d.is_negative() { INT_SIGN } else { 0 });
                self.put_slice(&digs);
            }
            Some(first) => {
                self.put_u8(if d.is_negative() { first | INT_SIGN } else { *first });
                self.put_slice(&digs[1..]);
            }
        }
    }

    /// Add a timestamp without its descriptor.
    ///
    /// # Arguments
    ///
    /// * `ts: &Timestamp` - The value to be added.
    fn put_timestamp_body(&mut self, ts: &Timestamp) {
        match ts.offset() {
            Some(o) => self.put_var_int(i64::from(o)),
            None => self.put_var_int_unknown(),
        }
        self.put_var_uint(u64::from(ts.year()));
        let p = ts.precision();
        if p >= Precision::Month {
            self.put_var_uint(u64::from(ts.month()));
        }
        if p >= Precision::Day {
            self.put_var_uint(u64::from(ts.day()));
        }
        if p >= Precision::Minute {
            self.put_var_uint(u64::from(ts.hour()));
            self.put_var_uint(u64::from(ts.minute()));
        }
        if p >= Precision::Second {
            self.put_var_uint(u64::from(ts.second()));
        }
        if let Some(f) = ts.fraction() {
            self.put_decimal_body(f);
        }
    }
}

impl<S: Serializer + ?Sized> SerializerExt for S {}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_of(f: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
        let mut out = vec![];
        f(&mut out);
        out
    }

    #[test]
    fn var_uint() {
        assert_eq!(bytes_of(|o| o.put_var_uint(0)), vec![0x80]);
        assert_eq!(bytes_of(|o| o.put_var_uint(127)), vec![0xff]);
        assert_eq!(bytes_of(|o| o.put_var_uint(1899)), vec![0x0e, 0xeb]);
        for u in &[0u64, 127, 128, 1 << 20, u64::from(u32::max_value())] {
            assert_eq!(bytes_of(|o| o.put_var_uint(*u)).len(), var_uint_len(*u));
        }
    }

    #[test]
    fn var_int() {
        assert_eq!(bytes_of(|o| o.put_var_int(0)), vec![0x80]);
        assert_eq!(bytes_of(|o| o.put_var_int(-2)), vec![0xc2]);
        assert_eq!(bytes_of(|o| o.put_var_int(63)), vec![0xbf]);
        assert_eq!(bytes_of(|o| o.put_var_int(64)), vec![0x00, 0xc0]);
        assert_eq!(bytes_of(|o| o.put_var_int(-64)), vec![0x40, 0xc0]);
        assert_eq!(bytes_of(|o| o.put_var_int_unknown()), vec![0xc0]);
    }

    #[test]
    fn descriptors() {
        assert_eq!(bytes_of(|o| o.put_descriptor(TID_STRING, 5)), vec![0x85]);
        assert_eq!(bytes_of(|o| o.put_descriptor(TID_STRING, 14)), vec![0x8e, 0x8e]);
        assert_eq!(bytes_of(|o| o.put_descriptor(TID_STRUCT, 1)), vec![0xde, 0x81]);
        assert_eq!(descriptor_len(TID_LIST, 200), 3);
    }

    #[test]
    fn decimal_bodies() {
        assert!(bytes_of(|o| o.put_decimal_body(&Decimal::zero())).is_empty());
        let d = Decimal::new(-12345, 2).unwrap();
        assert_eq!(bytes_of(|o| o.put_decimal_body(&d)), vec![0xc2, 0xb0, 0x39]);
        let nz = Decimal::negative_zero(0).unwrap();
        assert_eq!(bytes_of(|o| o.put_decimal_body(&nz)), vec![0x80, 0x80]);
        let high = Decimal::new(0x80, 0).unwrap();
        assert_eq!(bytes_of(|o| o.put_decimal_body(&high)), vec![0x80, 0x00, 0x80]);
        let zero_scaled = Decimal::new(0, 3).unwrap();
        assert_eq!(bytes_of(|o| o.put_decimal_body(&zero_scaled)), vec![0xc3]);
    }

    #[test]
    fn timestamp_bodies() {
        let ts = Timestamp::with_month(2007, 2).unwrap();
        assert_eq!(bytes_of(|o| o.put_timestamp_body(&ts)), vec![0xc0, 0x0f, 0xd7, 0x82]);
        let ts = Timestamp::with_minute(2007, 2, 23, 12, 14, Some(-60)).unwrap();
        assert_eq!(
            bytes_of(|o| o.put_timestamp_body(&ts)),
            vec![0xfc, 0x0f, 0xd7, 0x82, 0x97, 0x8c, 0x8e]
        );
    }
}
