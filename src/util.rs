use smallvec::SmallVec;

/// Converts a `u64` to the smallest possible vec of digits in big-endian order.
///
/// Zero produces no digits, which is how the binary format spells a zero magnitude.
///
/// # Arguments
///
/// * `num: u64` - The integer to be converted.
///
/// # Example
///
/// ```
/// use ionbin::util::u64_to_digits;
///
/// let digs = u64_to_digits(0x01_02);
///
/// assert_eq!(&digs[..], &[1, 2]);
/// assert!(u64_to_digits(0).is_empty());
/// ```
pub fn u64_to_digits(num: u64) -> SmallVec<[u8; 8]> {
    let len = (8 - num.leading_zeros() / 8) as usize;
    let bytes = num.to_be_bytes();
    SmallVec::from_slice(&bytes[8 - len..])
}

/// Converts a `u128` to the smallest possible vec of digits in big-endian order.
///
/// # Arguments
///
/// * `num: u128` - The integer to be converted.
pub fn u128_to_digits(num: u128) -> SmallVec<[u8; 16]> {
    let len = (16 - num.leading_zeros() / 8) as usize;
    let bytes = num.to_be_bytes();
    SmallVec::from_slice(&bytes[16 - len..])
}

/// Folds big-endian digits into a `u64`. Callers guarantee at most 8 digits.
pub(crate) fn digits_to_u64(digs: &[u8]) -> u64 {
    debug_assert!(digs.len() <= 8);
    digs.iter().fold(0, |acc, d| (acc << 8) | u64::from(*d))
}

#[macro_export]
/// Helper macro to make implementing `From` easier.
macro_rules! from_fn {
    ($to:ty, $from:ty, $fn:expr) => {
        impl From<$from> for $to {
            fn from(f: $from) -> $to { $fn(f) }
        }
    };
}

#[macro_export]
/// Helper macro to make implementing `From` easier.
macro_rules! from_as {
    ($to:tt, $from:ty, $as:ty) => {
        impl From<$from> for $to {
            fn from(f: $from) -> $to { $to::from(f as $as) }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_minimal() {
        assert_eq!(&u64_to_digits(0xff)[..], &[0xff]);
        assert_eq!(&u64_to_digits(0x100)[..], &[1, 0]);
        assert_eq!(u64_to_digits(u64::max_value()).len(), 8);
        assert_eq!(&u128_to_digits(1 << 64)[..], &[1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(u128_to_digits(0).is_empty());
    }

    #[test]
    fn digits_fold_back() {
        let n = 0x0012_3456_789a_bcdeu64;
        assert_eq!(digits_to_u64(&u64_to_digits(n)), n);
        assert_eq!(digits_to_u64(&[]), 0);
    }
}
