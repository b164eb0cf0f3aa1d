pub use crate::{
    buffer::PagedBuffer,
    catalog::Catalog,
    decimal::Decimal,
    encoding::{buf_source, ByteSource, IoSource},
    errors::IonError,
    int::{Int, IntegerSize},
    local::LocalSymbolTable,
    reader::{BinaryReader, ReaderBuilder},
    shared::{system_symbol_table, SharedSymbolTable},
    symbols::{SymbolTable, SymbolTableKind, SymbolToken},
    timestamp::{Precision, Timestamp},
    writer::{BinaryWriter, FlushStatus, LocalSymbolTableView, SymbolState, WriterBuilder},
    IonType,
};
pub use bytes::{Bytes, IntoBuf};
pub use num_bigint::BigInt;
pub use std::{convert::TryFrom, str::FromStr};
