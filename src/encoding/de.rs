use super::constants::*;
use bytes::{Buf, IntoBuf};
use std::{
    cmp,
    convert::TryFrom,
    io::{self, Read},
};

use crate::{
    decimal::{Decimal, MAX_MANTISSA_BYTES, MAX_SCALE},
    errors::IonError,
    int::Int,
    timestamp::Timestamp,
    util::digits_to_u64,
};

/// A forward-only source of bytes.
///
/// End of input is reported as `Ok(None)` / `Ok(0)`, never as an error.
pub trait ByteSource {
    /// Reads the next byte, or `None` at end of input.
    fn next_byte(&mut self) -> Result<Option<u8>, IonError>;

    /// Reads up to `out.len()` bytes, returning how many were read. `0` means end of input
    /// (or an empty `out`).
    fn read_some(&mut self, out: &mut [u8]) -> Result<usize, IonError>;

    /// Skips up to `n` bytes, returning how many were skipped.
    fn skip(&mut self, n: usize) -> Result<usize, IonError> {
        let mut scratch = [0u8; 256];
        let mut skipped = 0;
        while skipped < n {
            let want = cmp::min(n - skipped, scratch.len());
            let got = self.read_some(&mut scratch[..want])?;
            if got == 0 {
                break;
            }
            skipped += got;
        }
        Ok(skipped)
    }

    /// Number of bytes consumed so far.
    fn position(&self) -> u64;
}

/// A [`ByteSource`] over an in-memory [`Buf`].
#[derive(Debug)]
pub struct BufSource<B> {
    buf: B,
    pos: u64,
}

impl<B: Buf> BufSource<B> {
    pub fn new(buf: B) -> Self { BufSource { buf, pos: 0 } }

    pub fn into_inner(self) -> B { self.buf }
}

/// Wraps anything convertible into a [`Buf`], e.g. `&[u8]`, `Vec<u8>` or `Bytes`.
pub fn buf_source<T: IntoBuf>(t: T) -> BufSource<T::Buf> { BufSource::new(t.into_buf()) }

impl<B: Buf> ByteSource for BufSource<B> {
    #[inline]
    fn next_byte(&mut self) -> Result<Option<u8>, IonError> {
        if self.buf.has_remaining() {
            self.pos += 1;
            Ok(Some(self.buf.get_u8()))
        } else {
            Ok(None)
        }
    }

    fn read_some(&mut self, out: &mut [u8]) -> Result<usize, IonError> {
        let n = cmp::min(out.len(), self.buf.remaining());
        self.buf.copy_to_slice(&mut out[..n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn skip(&mut self, n: usize) -> Result<usize, IonError> {
        let n = cmp::min(n, self.buf.remaining());
        self.buf.advance(n);
        self.pos += n as u64;
        Ok(n)
    }

    fn position(&self) -> u64 { self.pos }
}

/// A [`ByteSource`] over a blocking [`Read`]. Interrupted reads are retried.
#[derive(Debug)]
pub struct IoSource<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> IoSource<R> {
    pub fn new(inner: R) -> Self { IoSource { inner, pos: 0 } }

    pub fn into_inner(self) -> R { self.inner }
}

impl<R: Read> ByteSource for IoSource<R> {
    fn next_byte(&mut self) -> Result<Option<u8>, IonError> {
        let mut b = [0u8; 1];
        match self.read_some(&mut b)? {
            0 => Ok(None),
            _ => Ok(Some(b[0])),
        }
    }

    fn read_some(&mut self, out: &mut [u8]) -> Result<usize, IonError> {
        loop {
            match self.inner.read(out) {
                Ok(n) => {
                    self.pos += n as u64;
                    return Ok(n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(IonError::from(e)),
            }
        }
    }

    fn position(&self) -> u64 { self.pos }
}

/// Byte-level input as the decoders see it: a source that may be bounded by the length of
/// the enclosing container.
pub trait Deserializer {
    /// Takes one byte, or `None` at the end of input or of the current bound.
    fn take_byte(&mut self) -> Result<Option<u8>, IonError>;

    /// Fills `out` completely.
    fn take_slice(&mut self, out: &mut [u8]) -> Result<(), IonError>;

    /// Takes up to `out.len()` bytes, returning how many were taken.
    fn take_some(&mut self, out: &mut [u8]) -> Result<usize, IonError>;

    /// Skips exactly `n` bytes.
    fn skip_bytes(&mut self, n: usize) -> Result<(), IonError>;

    /// Absolute offset of the next byte.
    fn offset(&self) -> u64;

    fn unexpected_end(&self) -> IonError { IonError::UnexpectedEnd { position: self.offset() } }
}

/// A [`ByteSource`] limited to the `remaining` bytes of the current container; `None`
/// means unlimited.
pub(crate) struct Bounded<'a, S> {
    pub(crate) input: &'a mut S,
    pub(crate) remaining: &'a mut Option<usize>,
}

impl<'a, S: ByteSource> Bounded<'a, S> {
    pub(crate) fn new(input: &'a mut S, remaining: &'a mut Option<usize>) -> Self { Bounded { input, remaining } }

    fn check_bound(&self, n: usize) -> Result<(), IonError> {
        match *self.remaining {
            Some(r) if n > r => bail_format!(
                "{} byte read at offset {} overruns its container by {} bytes",
                n,
                self.offset(),
                n - r
            ),
            _ => Ok(()),
        }
    }

    fn consume(&mut self, n: usize) {
        if let Some(r) = self.remaining.as_mut() {
            *r -= n;
        }
    }
}

impl<'a, S: ByteSource> Deserializer for Bounded<'a, S> {
    #[inline]
    fn take_byte(&mut self) -> Result<Option<u8>, IonError> {
        if *self.remaining == Some(0) {
            return Ok(None);
        }
        let b = self.input.next_byte()?;
        if b.is_some() {
            self.consume(1);
        }
        Ok(b)
    }

    fn take_slice(&mut self, out: &mut [u8]) -> Result<(), IonError> {
        self.check_bound(out.len())?;
        let mut filled = 0;
        while filled < out.len() {
            let n = self.input.read_some(&mut out[filled..])?;
            if n == 0 {
                return Err(self.unexpected_end());
            }
            filled += n;
        }
        self.consume(filled);
        Ok(())
    }

    fn take_some(&mut self, out: &mut [u8]) -> Result<usize, IonError> {
        let want = match *self.remaining {
            Some(r) => cmp::min(r, out.len()),
            None => out.len(),
        };
        let n = self.input.read_some(&mut out[..want])?;
        self.consume(n);
        Ok(n)
    }

    fn skip_bytes(&mut self, n: usize) -> Result<(), IonError> {
        self.check_bound(n)?;
        let skipped = self.input.skip(n)?;
        self.consume(skipped);
        if skipped < n {
            return Err(self.unexpected_end());
        }
        Ok(())
    }

    fn offset(&self) -> u64 { self.input.position() }
}

fn left_in<D: Deserializer + ?Sized>(d: &D, start: u64, len: usize) -> Result<usize, IonError> {
    let used = (d.offset() - start) as usize;
    if used > len {
        bail_format!("field overruns its {} byte value", len)
    }
    Ok(len - used)
}

fn narrow<T: TryFrom<u32>>(v: u32, what: &str) -> Result<T, IonError> {
    T::try_from(v).map_err(|_| IonError::Format(format!("{} {} out of range", what, v)))
}

fn as_format(e: IonError) -> IonError {
    match e {
        IonError::InvalidArgument(m) => IonError::Format(m),
        e => e,
    }
}

/// A decoded type descriptor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Descriptor {
    /// Padding; this many bytes follow and carry nothing.
    Nop(usize),
    /// The first byte of a version marker.
    VersionMarker,
    /// A null of the given type code; `0` is `null.null`.
    Null(u8),
    Bool(bool),
    /// Any other value; `len` bytes of payload follow.
    Value { tid: u8, len: usize, ordered: bool },
}

/// Decoders for the binary layout primitives.
pub trait DeserializerExt: Deserializer {
    /// Reads a type descriptor and, when present, its VarUInt length. `None` at end of
    /// input.
    fn read_descriptor(&mut self) -> Result<Option<Descriptor>, IonError> {
        let byte = match self.take_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        let (tid, nibble) = split_descriptor(byte);
        let desc = match (tid, nibble) {
            (TID_RESERVED, _) => bail_format!("reserved type descriptor {:#04x}", byte),
            (TID_NULL, LN_NULL) => Descriptor::Null(TID_NULL),
            (TID_NULL, LN_VAR_LEN) => Descriptor::Nop(self.read_var_uint()? as usize),
            (TID_NULL, n) => Descriptor::Nop(n as usize),
            (TID_ANNOTATION, LN_NULL) => bail_format!("annotation wrapper cannot be null"),
            (t, LN_NULL) => Descriptor::Null(t),
            (TID_BOOL, LN_BOOL_FALSE) => Descriptor::Bool(false),
            (TID_BOOL, LN_BOOL_TRUE) => Descriptor::Bool(true),
            (TID_BOOL, n) => bail_format!("invalid boolean length nibble {}", n),
            (TID_ANNOTATION, 0) => Descriptor::VersionMarker,
            (t, LN_VAR_LEN) => Descriptor::Value {
                tid: t,
                len: self.read_var_uint()? as usize,
                ordered: false,
            },
            (TID_STRUCT, LN_ORDERED_STRUCT) => Descriptor::Value {
                tid: TID_STRUCT,
                len: self.read_var_uint()? as usize,
                ordered: true,
            },
            (t, n) => Descriptor::Value {
                tid: t,
                len: n as usize,
                ordered: false,
            },
        };
        Ok(Some(desc))
    }

    /// Takes a byte, treating end of input as an error.
    fn need_byte(&mut self) -> Result<u8, IonError> {
        match self.take_byte()? {
            Some(b) => Ok(b),
            None => Err(self.unexpected_end()),
        }
    }

    /// Reads a VarUInt, or `None` if the input ends before its first byte.
    ///
    /// # Errors
    ///
    /// [`IonError::Overflow`] if no terminator appears within 5 bytes or the value does not
    /// fit in a `u32`.
    fn read_var_uint_or_eof(&mut self) -> Result<Option<u32>, IonError> {
        let mut byte = match self.take_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        let mut acc = u64::from(byte & VAR_DATA);
        let mut count = 1;
        while byte & VAR_END == 0 {
            if count == MAX_VAR_LEN {
                bail_overflow!("VarUInt longer than {} bytes", MAX_VAR_LEN)
            }
            byte = self.need_byte()?;
            acc = (acc << 7) | u64::from(byte & VAR_DATA);
            count += 1;
        }
        if acc > u64::from(u32::max_value()) {
            bail_overflow!("VarUInt {} does not fit in 32 bits", acc)
        }
        Ok(Some(acc as u32))
    }

    fn read_var_uint(&mut self) -> Result<u32, IonError> {
        match self.read_var_uint_or_eof()? {
            Some(v) => Ok(v),
            None => Err(self.unexpected_end()),
        }
    }

    /// Reads a VarInt. Negative zero is returned as `None`, meaning "unknown".
    fn read_var_int(&mut self) -> Result<Option<i32>, IonError> {
        let mut byte = self.need_byte()?;
        let negative = byte & VAR_INT_SIGN != 0;
        let mut acc = i64::from(byte & VAR_INT_FIRST_DATA);
        let mut count = 1;
        while byte & VAR_END == 0 {
            if count == MAX_VAR_LEN {
                bail_overflow!("VarInt longer than {} bytes", MAX_VAR_LEN)
            }
            byte = self.need_byte()?;
            acc = (acc << 7) | i64::from(byte & VAR_DATA);
            count += 1;
        }
        if negative {
            if acc == 0 {
                return Ok(None);
            }
            acc = -acc;
        }
        if acc < i64::from(i32::min_value()) || acc > i64::from(i32::max_value()) {
            bail_overflow!("VarInt {} does not fit in 32 bits", acc)
        }
        Ok(Some(acc as i32))
    }

    /// Reads a fixed-width big-endian unsigned integer of up to 8 bytes.
    fn read_uint(&mut self, len: usize) -> Result<u64, IonError> {
        if len > 8 {
            bail_overflow!("{} byte unsigned integer does not fit in 64 bits", len)
        }
        let mut digs = [0u8; 8];
        self.take_slice(&mut digs[..len])?;
        Ok(digits_to_u64(&digs[..len]))
    }

    /// Reads an integer magnitude, the sign coming from the type code.
    fn read_int(&mut self, len: usize, negative: bool) -> Result<Int, IonError> {
        let value = if len <= 8 {
            let mag = self.read_uint(len)?;
            Int::from(if negative {
                -i128::from(mag)
            } else {
                i128::from(mag)
            })
        } else {
            let mut digs = vec![0u8; len];
            self.take_slice(&mut digs)?;
            Int::from_magnitude(negative, &digs)
        };
        if negative && value.is_zero() {
            bail_format!("negative integer with a zero magnitude")
        }
        Ok(value)
    }

    fn read_float(&mut self, len: usize) -> Result<f64, IonError> {
        match len {
            0 => Ok(0.0),
            4 => {
                let mut b = [0u8; 4];
                self.take_slice(&mut b)?;
                Ok(f64::from(f32::from_bits(u32::from_be_bytes(b))))
            }
            8 => {
                let mut b = [0u8; 8];
                self.take_slice(&mut b)?;
                Ok(f64::from_bits(u64::from_be_bytes(b)))
            }
            _ => bail_format!("float length must be 0, 4 or 8, found {}", len),
        }
    }

    /// Reads a decimal occupying exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// [`IonError::Format`] for a positive exponent, [`IonError::Unsupported`] for a scale
    /// or mantissa beyond what [`Decimal`] holds.
    fn read_decimal(&mut self, len: usize) -> Result<Decimal, IonError> {
        if len == 0 {
            return Ok(Decimal::zero());
        }
        let start = self.offset();
        let exponent = self.read_var_int()?.unwrap_or(0);
        let mantissa_len = left_in(self, start, len)?;
        if exponent > 0 {
            bail_format!("decimal exponent {} is positive", exponent)
        }
        let scale = -i64::from(exponent);
        if scale > i64::from(MAX_SCALE) {
            bail_unsupported!("decimal scale {} exceeds {}", scale, MAX_SCALE)
        }
        if mantissa_len > MAX_MANTISSA_BYTES {
            bail_unsupported!(
                "decimal mantissa of {} bytes exceeds {}",
                mantissa_len,
                MAX_MANTISSA_BYTES
            )
        }
        let mut digs = [0u8; MAX_MANTISSA_BYTES];
        let digs = &mut digs[..mantissa_len];
        self.take_slice(digs)?;
        let negative = mantissa_len > 0 && digs[0] & INT_SIGN != 0;
        if negative {
            digs[0] &= !INT_SIGN;
        }
        let magnitude = digs.iter().fold(0u128, |acc, d| (acc << 8) | u128::from(*d));
        Decimal::from_parts(negative, magnitude, scale as u32)
    }

    /// Reads a timestamp occupying exactly `len` bytes. Precision is the last field present.
    fn read_timestamp(&mut self, len: usize) -> Result<Timestamp, IonError> {
        if len == 0 {
            bail_format!("timestamp without a year")
        }
        let start = self.offset();
        let offset = self.read_var_int()?;
        let year = narrow(self.read_var_uint()?, "year")?;
        if left_in(self, start, len)? == 0 {
            return Timestamp::with_year(year).map_err(as_format);
        }
        let month = narrow(self.read_var_uint()?, "month")?;
        if left_in(self, start, len)? == 0 {
            return Timestamp::with_month(year, month).map_err(as_format);
        }
        let day = narrow(self.read_var_uint()?, "day")?;
        if left_in(self, start, len)? == 0 {
            return Timestamp::with_day(year, month, day).map_err(as_format);
        }
        let hour = narrow(self.read_var_uint()?, "hour")?;
        if left_in(self, start, len)? == 0 {
            bail_format!("timestamp hour without minute")
        }
        let minute = narrow(self.read_var_uint()?, "minute")?;
        if left_in(self, start, len)? == 0 {
            return Timestamp::with_minute(year, month, day, hour, minute, offset)
                .map_err(as_format);
        }
        let second = narrow(self.read_var_uint()?, "second")?;
        let rest = left_in(self, start, len)?;
        if rest == 0 {
            return Timestamp::with_second(year, month, day, hour, minute, second, offset)
                .map_err(as_format);
        }
        let fraction = self.read_decimal(rest)?;
        // a zero fraction with no scale adds nothing to the seconds
        if fraction.is_zero() && fraction.scale() == 0 {
            return Timestamp::with_second(year, month, day, hour, minute, second, offset)
                .map_err(as_format);
        }
        Timestamp::with_fraction(year, month, day, hour, minute, second, fraction, offset)
            .map_err(as_format)
    }

    fn read_string(&mut self, len: usize) -> Result<String, IonError> {
        let mut bytes = vec![0u8; len];
        self.take_slice(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| IonError::Format(format!("invalid UTF-8: {}", e)))
    }

    /// Reads a symbol value's ID.
    fn read_symbol_id(&mut self, len: usize) -> Result<u32, IonError> {
        let sid = self.read_uint(len)?;
        if sid > u64::from(u32::max_value()) {
            bail_overflow!("symbol ID {} does not fit in 32 bits", sid)
        }
        Ok(sid as u32)
    }
}

impl<D: Deserializer + ?Sized> DeserializerExt for D {}
