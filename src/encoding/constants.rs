/// Type code of `null` and NOP padding.
pub(crate) const TID_NULL: u8 = 0x0;
pub(crate) const TID_BOOL: u8 = 0x1;
pub(crate) const TID_POS_INT: u8 = 0x2;
pub(crate) const TID_NEG_INT: u8 = 0x3;
pub(crate) const TID_FLOAT: u8 = 0x4;
pub(crate) const TID_DECIMAL: u8 = 0x5;
pub(crate) const TID_TIMESTAMP: u8 = 0x6;
pub(crate) const TID_SYMBOL: u8 = 0x7;
pub(crate) const TID_STRING: u8 = 0x8;
pub(crate) const TID_CLOB: u8 = 0x9;
pub(crate) const TID_BLOB: u8 = 0xa;
pub(crate) const TID_LIST: u8 = 0xb;
pub(crate) const TID_SEXP: u8 = 0xc;
pub(crate) const TID_STRUCT: u8 = 0xd;
/// Annotation wrapper, also the first byte of the version marker.
pub(crate) const TID_ANNOTATION: u8 = 0xe;
/// Reserved, never valid.
pub(crate) const TID_RESERVED: u8 = 0xf;

/// 0xf0
pub(crate) const MASK_TYPE: u8 = 0b1111_0000;
/// 0x0f
pub(crate) const MASK_LEN: u8 = 0b0000_1111;

/// Length nibble meaning a VarUInt length follows.
pub(crate) const LN_VAR_LEN: u8 = 0b0000_1110;
/// Length nibble meaning the value is null.
pub(crate) const LN_NULL: u8 = 0b0000_1111;
pub(crate) const LN_BOOL_FALSE: u8 = 0b0000_0000;
pub(crate) const LN_BOOL_TRUE: u8 = 0b0000_0001;
/// Length nibble of a struct whose fields are sorted by symbol ID.
pub(crate) const LN_ORDERED_STRUCT: u8 = 0b0000_0001;

/// 0x80, set on the final byte of a VarUInt/VarInt.
pub(crate) const VAR_END: u8 = 0b1000_0000;
/// 0x7f
pub(crate) const VAR_DATA: u8 = 0b0111_1111;
/// 0x40, sign bit in the first byte of a VarInt.
pub(crate) const VAR_INT_SIGN: u8 = 0b0100_0000;
/// 0x3f
pub(crate) const VAR_INT_FIRST_DATA: u8 = 0b0011_1111;
/// 0x80, sign bit in the first byte of an Int/decimal mantissa.
pub(crate) const INT_SIGN: u8 = 0b1000_0000;

/// Longest VarUInt/VarInt accepted for a 32-bit quantity.
pub(crate) const MAX_VAR_LEN: usize = 5;

/// `E0 01 00 EA`
pub const VERSION_MARKER: [u8; 4] = [0xe0, 0x01, 0x00, 0xea];

/// The empty NOP pad.
pub(crate) const NOP_BYTE: u8 = 0x00;

#[inline]
/// Splits a descriptor byte into type code and length nibble.
pub(crate) fn split_descriptor(byte: u8) -> (u8, u8) { ((byte & MASK_TYPE) >> 4, byte & MASK_LEN) }

#[inline]
pub(crate) fn make_descriptor(tid: u8, nibble: u8) -> u8 { (tid << 4) | (nibble & MASK_LEN) }
