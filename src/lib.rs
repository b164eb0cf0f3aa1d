//! # ionbin
//!
//! A streaming codec for the Ion 1.0 binary format: a self-describing, TLV-style encoding
//! in which text such as field names and annotations is replaced by small integer symbol
//! IDs, resolved through shared and local symbol tables.
//!
//! # Usage
//!
//! Values are written with a [`BinaryWriter`], which interns symbol text as it goes and
//! emits the local symbol table in front of the data when flushed. They are read back with
//! a [`BinaryReader`], a pull cursor that decodes descriptors one at a time and only
//! decodes payloads on request.
//!
//! ```
//! use ionbin::prelude::*;
//!
//! let mut w = BinaryWriter::new();
//! w.add_annotation("point").unwrap();
//! w.step_in(IonType::Struct).unwrap();
//! w.set_field_name("x").unwrap();
//! w.write_int(3).unwrap();
//! w.set_field_name("y").unwrap();
//! w.write_decimal(&"-0.5".parse().unwrap()).unwrap();
//! w.step_out().unwrap();
//!
//! let mut bytes = Vec::new();
//! w.flush_to_vec(&mut bytes).unwrap();
//!
//! let mut r = ReaderBuilder::new()
//!     .process_symbol_tables(true)
//!     .build(buf_source(&bytes[..]));
//!
//! assert_eq!(r.next().unwrap(), Some(IonType::Struct));
//! assert_eq!(r.annotations()[0].text.as_deref(), Some("point"));
//! r.step_in().unwrap();
//! r.next().unwrap();
//! assert_eq!(r.field_name(), Some("x"));
//! assert_eq!(r.int_value().unwrap(), 3);
//! r.next().unwrap();
//! assert_eq!(r.decimal_value().unwrap().to_string(), "-0.5");
//! ```
//!
//! # Symbol tables
//!
//! Every stream starts out with the system symbol table, which defines IDs 1 through 9.
//! A writer can import [`SharedSymbolTable`]s; their symbols are numbered after the system
//! symbols, in import order, and anything else gets a local ID after those. A reader built
//! with [`ReaderBuilder::process_symbol_tables`] follows the local tables declared in the
//! stream, looking imports up in a [`Catalog`].
//!
//! # Wire format
//!
//! This section summarizes the binary layout.
//!
//! ## Version marker
//!
//! A stream begins with the four bytes `E0 01 00 EA`. The marker may reappear at the top
//! level, resetting the symbol table to the system table.
//!
//! ## Descriptors
//!
//! Every value starts with a descriptor byte. The high nibble is the *type code*, the low
//! nibble the *length*.
//!
//! | Code | Type                | Code | Type                |
//! | ---  | ---                 | ---  | ---                 |
//! | `0`  | null / padding      | `8`  | string              |
//! | `1`  | bool                | `9`  | clob                |
//! | `2`  | positive int        | `A`  | blob                |
//! | `3`  | negative int        | `B`  | list                |
//! | `4`  | float               | `C`  | sexp                |
//! | `5`  | decimal             | `D`  | struct              |
//! | `6`  | timestamp           | `E`  | annotation wrapper  |
//! | `7`  | symbol              | `F`  | reserved            |
//!
//! A length nibble of `F` is a typed null, `E` means the length follows as a VarUInt. For
//! bools the nibble is the value. A null type code with any other nibble is padding of that
//! many bytes. A struct with nibble `1` has sorted fields and a VarUInt length.
//!
//! ## Variable-length integers
//!
//! VarUInts carry 7 bits per byte, most significant first; the high bit marks the last
//! byte. VarInts are the same with the second-highest bit of the first byte as a sign.
//!
//! ## Numbers
//!
//! Ints are big-endian magnitudes, the sign coming from the type code. Floats are IEEE 754
//! of 4 or 8 bytes, or 0 bytes for positive zero. Decimals are a VarInt exponent followed
//! by a sign-magnitude mantissa.
//!
//! ## Timestamps
//!
//! A VarInt offset in minutes, then VarUInt year, month, day, hour, minute and second, and a
//! decimal fraction of a second. Trailing fields may be left out; the last one present is
//! the precision.
//!
//! ## Containers
//!
//! Lists and sexps hold values back to back. Structs hold VarUInt field IDs, each followed
//! by a value. An annotation wrapper holds a VarUInt length, that many bytes of VarUInt
//! annotation IDs, then the annotated value.

#![warn(
    deprecated_in_future,
    unsafe_code,
    unused_labels,
    keyword_idents,
    missing_doc_code_examples,
    missing_copy_implementations,
    missing_debug_implementations,
    macro_use_extern_crate,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces
)]
#![allow(clippy::cast_lossless)]

#[macro_use]
pub mod errors;
#[macro_use]
pub mod util;

pub mod buffer;
pub mod catalog;
pub mod decimal;
pub mod encoding;
pub mod int;
pub mod local;
pub mod prelude;
pub mod reader;
pub mod shared;
pub mod symbols;
pub mod timestamp;
pub mod writer;

use encoding::constants::*;
use std::fmt;

pub use catalog::Catalog;
pub use errors::IonError;
pub use reader::{BinaryReader, ReaderBuilder};
pub use shared::SharedSymbolTable;
pub use writer::{BinaryWriter, FlushStatus, WriterBuilder};

/// The types of values.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum IonType {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    Timestamp,
    Symbol,
    String,
    Clob,
    Blob,
    List,
    Sexp,
    Struct,
}

impl IonType {
    /// The type of a descriptor's type code, if it denotes a value.
    pub fn from_type_code(tid: u8) -> Option<IonType> {
        let ty = match tid {
            TID_NULL => IonType::Null,
            TID_BOOL => IonType::Bool,
            TID_POS_INT | TID_NEG_INT => IonType::Int,
            TID_FLOAT => IonType::Float,
            TID_DECIMAL => IonType::Decimal,
            TID_TIMESTAMP => IonType::Timestamp,
            TID_SYMBOL => IonType::Symbol,
            TID_STRING => IonType::String,
            TID_CLOB => IonType::Clob,
            TID_BLOB => IonType::Blob,
            TID_LIST => IonType::List,
            TID_SEXP => IonType::Sexp,
            TID_STRUCT => IonType::Struct,
            _ => return None,
        };
        Some(ty)
    }

    /// The type code used for this type's nulls and, except for ints, its values.
    pub fn type_code(self) -> u8 {
        match self {
            IonType::Null => TID_NULL,
            IonType::Bool => TID_BOOL,
            IonType::Int => TID_POS_INT,
            IonType::Float => TID_FLOAT,
            IonType::Decimal => TID_DECIMAL,
            IonType::Timestamp => TID_TIMESTAMP,
            IonType::Symbol => TID_SYMBOL,
            IonType::String => TID_STRING,
            IonType::Clob => TID_CLOB,
            IonType::Blob => TID_BLOB,
            IonType::List => TID_LIST,
            IonType::Sexp => TID_SEXP,
            IonType::Struct => TID_STRUCT,
        }
    }

    pub fn is_container(self) -> bool {
        match self {
            IonType::List | IonType::Sexp | IonType::Struct => true,
            _ => false,
        }
    }

    pub fn is_lob(self) -> bool { self == IonType::Blob || self == IonType::Clob }
}

impl fmt::Display for IonType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            IonType::Null => "null",
            IonType::Bool => "bool",
            IonType::Int => "int",
            IonType::Float => "float",
            IonType::Decimal => "decimal",
            IonType::Timestamp => "timestamp",
            IonType::Symbol => "symbol",
            IonType::String => "string",
            IonType::Clob => "clob",
            IonType::Blob => "blob",
            IonType::List => "list",
            IonType::Sexp => "sexp",
            IonType::Struct => "struct",
        };
        f.write_str(name)
    }
}
