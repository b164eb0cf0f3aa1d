use std::{fmt, str::FromStr};

use crate::errors::IonError;

/// Largest scale (number of fractional digits) a [`Decimal`] can carry.
pub const MAX_SCALE: u32 = 28;
/// Largest encoded mantissa, in bytes, including the sign bit.
pub const MAX_MANTISSA_BYTES: usize = 12;
/// Largest magnitude whose sign-magnitude encoding fits in [`MAX_MANTISSA_BYTES`].
pub const MAX_MAGNITUDE: u128 = (1 << 95) - 1;

/// A fixed-point decimal: `(-1)^negative * magnitude * 10^-scale`.
///
/// Equality is structural, so `1.0` and `1.00` differ and `-0` is distinct from `0`; both
/// survive an encode/decode round trip unchanged.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
pub struct Decimal {
    negative: bool,
    magnitude: u128,
    scale: u32,
}

impl Decimal {
    /// Creates a decimal equal to `mantissa * 10^-scale`.
    ///
    /// # Arguments
    ///
    /// * `mantissa: i128` - The unscaled value.
    /// * `scale: u32` - The number of fractional digits.
    ///
    /// # Errors
    ///
    /// Returns [`IonError::Unsupported`] if the scale exceeds [`MAX_SCALE`] or the magnitude
    /// exceeds [`MAX_MAGNITUDE`].
    ///
    /// # Example
    ///
    /// ```
    /// use ionbin::decimal::Decimal;
    ///
    /// let d = Decimal::new(-12345, 2).unwrap();
    /// assert_eq!(d.to_string(), "-123.45");
    /// ```
    pub fn new(mantissa: i128, scale: u32) -> Result<Decimal, IonError> {
        let magnitude = if mantissa == i128::min_value() {
            1u128 << 127
        } else {
            mantissa.abs() as u128
        };
        Decimal::from_parts(mantissa < 0, magnitude, scale)
    }

    /// Creates a decimal from its sign, magnitude and scale.
    ///
    /// # Errors
    ///
    /// Same as [`Decimal::new`].
    pub fn from_parts(negative: bool, magnitude: u128, scale: u32) -> Result<Decimal, IonError> {
        if scale > MAX_SCALE {
            bail_unsupported!("decimal scale {} exceeds {}", scale, MAX_SCALE)
        }
        if magnitude > MAX_MAGNITUDE {
            bail_unsupported!("decimal mantissa exceeds {} bytes", MAX_MANTISSA_BYTES)
        }
        Ok(Decimal {
            negative,
            magnitude,
            scale,
        })
    }

    /// Negative zero with the given scale.
    pub fn negative_zero(scale: u32) -> Result<Decimal, IonError> { Decimal::from_parts(true, 0, scale) }

    /// `0d0`, the decimal with a zero-length encoding.
    pub fn zero() -> Decimal {
        Decimal {
            negative: false,
            magnitude: 0,
            scale: 0,
        }
    }

    pub fn is_negative(&self) -> bool { self.negative }

    pub fn magnitude(&self) -> u128 { self.magnitude }

    pub fn scale(&self) -> u32 { self.scale }

    /// The signed unscaled value. Negative zero reads as `0`.
    pub fn mantissa(&self) -> i128 {
        if self.negative {
            -(self.magnitude as i128)
        } else {
            self.magnitude as i128
        }
    }

    pub fn is_zero(&self) -> bool { self.magnitude == 0 }

    /// Returns `true` for exactly `0d0`.
    pub fn is_canonical_zero(&self) -> bool { !self.negative && self.magnitude == 0 && self.scale == 0 }

    /// Lossy conversion to `f64`.
    pub fn to_f64(&self) -> f64 {
        let v = self.magnitude as f64 / 10f64.powi(self.scale as i32);
        if self.negative {
            -v
        } else {
            v
        }
    }
}

impl Default for Decimal {
    fn default() -> Self { Decimal::zero() }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let digits = self.magnitude.to_string();
        let scale = self.scale as usize;
        if self.negative {
            write!(f, "-")?;
        }
        if scale == 0 {
            return write!(f, "{}", digits);
        }
        if digits.len() <= scale {
            write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits)
        } else {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{}.{}", int, frac)
        }
    }
}

impl FromStr for Decimal {
    type Err = IonError;

    /// Parses `[-]digits[.digits]`, keeping trailing zeros as scale.
    fn from_str(s: &str) -> Result<Decimal, IonError> {
        let (negative, body) = if s.starts_with('-') {
            (true, &s[1..])
        } else {
            (false, s)
        };
        let (int, frac) = match body.find('.') {
            Some(ix) => (&body[..ix], &body[ix + 1..]),
            None => (body, ""),
        };
        if int.is_empty() || !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            bail_arg!("`{}` is not a decimal literal", s)
        }
        let mut magnitude: u128 = 0;
        for b in int.bytes().chain(frac.bytes()) {
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|m| m.checked_add(u128::from(b - b'0')))
                .ok_or_else(|| IonError::Unsupported(format!("`{}` has too many digits", s)))?;
        }
        Decimal::from_parts(negative, magnitude, frac.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Decimal::new(12345, 2).unwrap().to_string(), "123.45");
        assert_eq!(Decimal::new(5, 3).unwrap().to_string(), "0.005");
        assert_eq!(Decimal::new(-7, 0).unwrap().to_string(), "-7");
        assert_eq!(Decimal::negative_zero(1).unwrap().to_string(), "-0.0");
    }

    #[test]
    fn parse_keeps_scale() {
        let d: Decimal = "-1.500".parse().unwrap();
        assert!(d.is_negative());
        assert_eq!(d.magnitude(), 1500);
        assert_eq!(d.scale(), 3);
        assert_ne!(d, "-1.5".parse().unwrap());
        assert!("1e5".parse::<Decimal>().is_err());
    }

    #[test]
    fn limits() {
        assert!(Decimal::new(1, MAX_SCALE).is_ok());
        assert!(Decimal::new(1, MAX_SCALE + 1).unwrap_err().is_value_limit());
        assert!(Decimal::from_parts(false, MAX_MAGNITUDE, 0).is_ok());
        assert!(Decimal::from_parts(false, MAX_MAGNITUDE + 1, 0).is_err());
        assert!(Decimal::new(i128::min_value(), 0).is_err());
    }

    #[test]
    fn zeros() {
        assert!(Decimal::zero().is_canonical_zero());
        assert!(!Decimal::negative_zero(0).unwrap().is_canonical_zero());
        assert!(!Decimal::new(0, 2).unwrap().is_canonical_zero());
        assert_eq!(Decimal::negative_zero(0).unwrap().mantissa(), 0);
    }
}
