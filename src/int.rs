use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use std::{convert::TryFrom, fmt};

/// `Int`s are either `i64` or `BigInt`s (i.e., big integers).
///
/// Values that fit in an `i64` are always stored as [`Int::I64`], so structural equality is
/// numeric equality.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Hash, Debug)]
pub enum Int {
    I64(i64),
    Big(BigInt),
}

use Int::*;

/// How many bits a decoded integer needs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IntegerSize {
    /// Fits in an `i32`.
    Int,
    /// Fits in an `i64`.
    Long,
    /// Needs arbitrary precision.
    BigInteger,
}

from_fn!(Int, i64, I64);
from_fn!(Int, u64, |u: u64| {
    if u <= i64::max_value() as u64 {
        I64(u as i64)
    } else {
        Big(BigInt::from(u))
    }
});
from_fn!(Int, BigInt, |i: BigInt| {
    i.to_i64().map_or_else(|| Big(i), I64)
});
from_fn!(Int, i128, |i: i128| {
    if i >= i128::from(i64::min_value()) && i <= i128::from(i64::max_value()) {
        I64(i as i64)
    } else {
        Big(BigInt::from(i))
    }
});

from_as!(Int, i32, i64);
from_as!(Int, i16, i64);
from_as!(Int, i8, i64);
from_as!(Int, u32, i64);
from_as!(Int, u16, i64);
from_as!(Int, u8, i64);

impl From<Int> for BigInt {
    fn from(i: Int) -> BigInt {
        match i {
            I64(i) => BigInt::from(i),
            Big(i) => i,
        }
    }
}

impl TryFrom<Int> for i64 {
    type Error = BigInt;

    fn try_from(i: Int) -> Result<Self, BigInt> {
        match i {
            I64(i) => Ok(i),
            Big(i) => Err(i),
        }
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            I64(i) => write!(f, "{}", i),
            Big(i) => write!(f, "{}", i),
        }
    }
}

impl Int {
    /// Builds an integer from a sign and big-endian magnitude digits, as stored on the wire.
    ///
    /// # Arguments
    ///
    /// * `negative: bool` - Whether the value is negative.
    /// * `digs: &[u8]` - Big-endian magnitude; empty means zero.
    pub fn from_magnitude(negative: bool, digs: &[u8]) -> Int {
        let mag = BigUint::from_bytes_be(digs);
        let sign = if mag.is_zero() {
            Sign::NoSign
        } else if negative {
            Sign::Minus
        } else {
            Sign::Plus
        };
        Int::from(BigInt::from_biguint(sign, mag))
    }

    /// Splits `self` into a sign flag and minimal big-endian magnitude digits.
    pub fn to_magnitude(&self) -> (bool, Vec<u8>) {
        match self {
            I64(i) => {
                let mag = (*i as i128).abs() as u64;
                (*i < 0, crate::util::u64_to_digits(mag).to_vec())
            }
            Big(i) => {
                let (sign, digs) = i.to_bytes_be();
                if i.is_zero() {
                    (false, vec![])
                } else {
                    (sign == Sign::Minus, digs)
                }
            }
        }
    }

    /// Produces an `i64` if `self` is an `I64`, otherwise returns `None`.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            I64(i) => Some(*i),
            Big(_) => None,
        }
    }

    /// Produces a `BigInt`.
    pub fn to_bigint(&self) -> BigInt {
        match self {
            I64(i) => BigInt::from(*i),
            Big(i) => i.clone(),
        }
    }

    /// Classifies how wide the value is.
    pub fn size(&self) -> IntegerSize {
        match self {
            I64(i) if *i >= i64::from(i32::min_value()) && *i <= i64::from(i32::max_value()) => {
                IntegerSize::Int
            }
            I64(_) => IntegerSize::Long,
            Big(_) => IntegerSize::BigInteger,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            I64(i) => *i == 0,
            Big(i) => i.is_zero(),
        }
    }
}
