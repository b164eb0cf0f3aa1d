use failure::Fail;
use std::io;

#[derive(Debug, Fail)]
/// Everything that can go wrong while reading or writing the binary format.
pub enum IonError {
    /// The input is not a well-formed binary stream.
    #[fail(display = "Malformed input: {}", _0)]
    Format(String),
    /// The input ended in the middle of a field.
    #[fail(display = "Unexpected end of input at byte {}", position)]
    UnexpectedEnd {
        /// Byte offset at which the input ran out.
        position: u64,
    },
    /// A value does not fit in the requested numeric type.
    #[fail(display = "Numeric overflow: {}", _0)]
    Overflow(String),
    /// A well-formed value this implementation cannot represent.
    #[fail(display = "Unsupported value: {}", _0)]
    Unsupported(String),
    /// The operation is not legal in the current reader or writer state.
    #[fail(display = "Invalid state: {}", _0)]
    InvalidState(String),
    /// A constructor was given arguments it cannot accept.
    #[fail(display = "Invalid argument: {}", _0)]
    InvalidArgument(String),
    /// The underlying byte source or sink failed.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for IonError {
    fn from(e: io::Error) -> Self { IonError::Io(e) }
}

impl IonError {
    /// Returns `true` for errors caused by a value exceeding a numeric limit, as opposed to
    /// malformed input. The reader stays usable after these.
    pub fn is_value_limit(&self) -> bool {
        match self {
            IonError::Overflow(_) | IonError::Unsupported(_) => true,
            _ => false,
        }
    }
}

#[macro_export]
#[doc(hidden)]
/// Returns early with an [`IonError::Format`].
macro_rules! bail_format {
    ($($arg:tt)*) => {
        return Err($crate::errors::IonError::Format(format!($($arg)*)))
    };
}

#[macro_export]
#[doc(hidden)]
/// Returns early with an [`IonError::InvalidState`].
macro_rules! bail_state {
    ($($arg:tt)*) => {
        return Err($crate::errors::IonError::InvalidState(format!($($arg)*)))
    };
}

#[macro_export]
#[doc(hidden)]
/// Returns early with an [`IonError::InvalidArgument`].
macro_rules! bail_arg {
    ($($arg:tt)*) => {
        return Err($crate::errors::IonError::InvalidArgument(format!($($arg)*)))
    };
}

#[macro_export]
#[doc(hidden)]
/// Returns early with an [`IonError::Overflow`].
macro_rules! bail_overflow {
    ($($arg:tt)*) => {
        return Err($crate::errors::IonError::Overflow(format!($($arg)*)))
    };
}

#[macro_export]
#[doc(hidden)]
/// Returns early with an [`IonError::Unsupported`].
macro_rules! bail_unsupported {
    ($($arg:tt)*) => {
        return Err($crate::errors::IonError::Unsupported(format!($($arg)*)))
    };
}
