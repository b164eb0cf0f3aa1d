//! # Binary layout primitives
//!
//! Encoders ([`SerializerExt`]) and decoders ([`DeserializerExt`]) for the pieces every
//! value is built from: type descriptors, VarUInt/VarInt, fixed-width magnitudes, floats,
//! decimals and timestamps. The reader and writer are written in terms of these.
//!
//! # Example
//!
//! ```
//! use ionbin::encoding::*;
//!
//! let mut out = Vec::new();
//!
//! // a string of 3 bytes
//! out.put_descriptor(0x8, 3);
//! out.put_slice(b"abc");
//!
//! assert_eq!(out, vec![0x83, b'a', b'b', b'c']);
//!
//! // lengths of 14 and up move into a VarUInt
//! let mut long = Vec::new();
//! long.put_descriptor(0x8, 300);
//! assert_eq!(long, vec![0x8e, 0x02, 0xac]);
//! ```

pub mod constants;
pub mod de;
pub mod ser;

pub use constants::VERSION_MARKER;
pub use de::{buf_source, BufSource, ByteSource, Descriptor, Deserializer, DeserializerExt, IoSource};
pub use ser::{descriptor_len, var_uint_len, Serializer, SerializerExt};
