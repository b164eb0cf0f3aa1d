//! # Streaming reader
//!
//! [`BinaryReader`] is a pull-style cursor over a binary stream. [`BinaryReader::next`]
//! advances to the next value at the current depth and reports its type; scalar payloads are
//! decoded only when a getter asks for them, and containers are entered with
//! [`BinaryReader::step_in`].
//!
//! # Example
//!
//! ```
//! use ionbin::prelude::*;
//!
//! // version marker, then {name: "hi"}
//! let bytes = [0xe0, 0x01, 0x00, 0xea, 0xd4, 0x84, 0x82, b'h', b'i'];
//! let mut r = ReaderBuilder::new()
//!     .process_symbol_tables(true)
//!     .build(buf_source(&bytes[..]));
//!
//! assert_eq!(r.next().unwrap(), Some(IonType::Struct));
//! r.step_in().unwrap();
//! assert_eq!(r.next().unwrap(), Some(IonType::String));
//! assert_eq!(r.field_name(), Some("name"));
//! assert_eq!(r.string_value().unwrap(), "hi");
//! assert_eq!(r.next().unwrap(), None);
//! r.step_out().unwrap();
//! assert_eq!(r.next().unwrap(), None);
//! ```

use bytes::{Bytes, IntoBuf};
use log::{debug, trace};
use num_bigint::BigInt;
use smallvec::SmallVec;
use std::{cmp, convert::TryFrom, sync::Arc};

use crate::{
    catalog::Catalog,
    decimal::Decimal,
    encoding::{
        constants::*,
        de::{buf_source, Bounded, BufSource, ByteSource, Descriptor, Deserializer, DeserializerExt},
    },
    errors::IonError,
    int::{Int, IntegerSize},
    local::LocalSymbolTable,
    shared::SharedSymbolTable,
    symbols::*,
    timestamp::Timestamp,
    IonType,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum State {
    /// A struct field name comes next.
    BeforeField,
    /// A type descriptor comes next.
    BeforeTid,
    /// The descriptor was read; the payload is (partly) unread.
    BeforeValue,
    /// The value was consumed or skipped.
    AfterValue,
    /// No more values in the current container.
    Eof,
}

/// Saved context of the container enclosing the one being read.
#[derive(Debug)]
struct Frame {
    /// Stream position right after the inner container.
    resume: u64,
    /// Parent budget once the inner container is consumed.
    budget: Option<usize>,
    parent_in_struct: bool,
}

/// Decoded payload of the current value.
#[derive(Clone, Debug)]
enum Scalar {
    Bool(bool),
    Int(Int),
    Float(f64),
    Decimal(Decimal),
    Timestamp(Timestamp),
    String(String),
    Symbol(u32),
}

/// Configures a [`BinaryReader`].
#[derive(Clone, Debug, Default)]
pub struct ReaderBuilder {
    catalog: Catalog,
    process_symbol_tables: bool,
}

impl ReaderBuilder {
    pub fn new() -> Self { ReaderBuilder::default() }

    /// Shared tables used to resolve the imports of local symbol tables.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// When set, top-level version markers and `$ion_symbol_table` structs are consumed by
    /// the reader and update its symbol table instead of being returned as values.
    pub fn process_symbol_tables(mut self, yes: bool) -> Self {
        self.process_symbol_tables = yes;
        self
    }

    pub fn build<S: ByteSource>(self, input: S) -> BinaryReader<S> {
        BinaryReader {
            input,
            state: State::BeforeTid,
            stack: Vec::new(),
            remaining: None,
            in_struct: false,
            value_type: None,
            value_tid: TID_NULL,
            is_null: false,
            ordered: false,
            field_id: None,
            annotations: SmallVec::new(),
            symbol_table_annotation: false,
            version_marker: false,
            value_offset: 0,
            value_len: 0,
            unread: 0,
            scalar: None,
            symbols: LocalSymbolTable::empty(),
            catalog: self.catalog,
            process_symbol_tables: self.process_symbol_tables,
        }
    }
}

/// A pull reader over a binary stream.
#[derive(Debug)]
pub struct BinaryReader<S> {
    input: S,
    state: State,
    stack: Vec<Frame>,
    // bytes left in the current container; `None` at the top level
    remaining: Option<usize>,
    in_struct: bool,

    value_type: Option<IonType>,
    value_tid: u8,
    is_null: bool,
    ordered: bool,
    field_id: Option<u32>,
    annotations: SmallVec<[u32; 4]>,
    symbol_table_annotation: bool,
    version_marker: bool,
    value_offset: u64,
    value_len: usize,
    unread: usize,
    scalar: Option<Scalar>,

    symbols: LocalSymbolTable,
    catalog: Catalog,
    process_symbol_tables: bool,
}

impl<B: bytes::Buf> BinaryReader<BufSource<B>> {
    /// A raw reader over anything convertible into a [`bytes::Buf`].
    pub fn from_bytes<T: IntoBuf<Buf = B>>(t: T) -> Self { ReaderBuilder::new().build(buf_source(t)) }
}

impl<S: ByteSource> BinaryReader<S> {
    /// A raw reader: version markers and symbol table structs are returned as values.
    pub fn new(input: S) -> Self { ReaderBuilder::new().build(input) }

    fn de(&mut self) -> Bounded<'_, S> { Bounded::new(&mut self.input, &mut self.remaining) }

    fn position(&self) -> u64 { self.input.position() }

    fn consume(&mut self, n: usize) {
        if let Some(r) = self.remaining.as_mut() {
            *r -= n;
        }
    }

    fn clear_cursor(&mut self) {
        self.value_type = None;
        self.value_tid = TID_NULL;
        self.is_null = false;
        self.ordered = false;
        self.field_id = None;
        self.annotations.clear();
        self.symbol_table_annotation = false;
        self.version_marker = false;
        self.value_len = 0;
        self.unread = 0;
        self.scalar = None;
    }

    fn skip_unread(&mut self) -> Result<(), IonError> {
        let n = self.unread;
        self.unread = 0;
        self.de().skip_bytes(n)
    }

    /// Advances to the next value at the current depth.
    ///
    /// Returns `None` at the end of the current container or of the stream.
    pub fn next(&mut self) -> Result<Option<IonType>, IonError> {
        loop {
            let ty = self.next_raw()?;
            if !self.process_symbol_tables || !self.stack.is_empty() {
                return Ok(ty);
            }
            match ty {
                Some(IonType::Symbol) if self.version_marker => {
                    debug!("version marker at {}, resetting symbol table", self.value_offset);
                    self.symbols = LocalSymbolTable::empty();
                }
                Some(IonType::Struct)
                    if !self.is_null && self.annotations.first() == Some(&ION_SYMBOL_TABLE_SID) =>
                {
                    self.load_local_symbol_table()?;
                }
                _ => return Ok(ty),
            }
        }
    }

    fn next_raw(&mut self) -> Result<Option<IonType>, IonError> {
        if self.state == State::BeforeValue {
            self.skip_unread()?;
            self.state = State::AfterValue;
        }
        self.clear_cursor();
        loop {
            match self.state {
                State::Eof => return Ok(None),
                State::BeforeValue => {
                    self.skip_unread()?;
                    self.state = State::AfterValue;
                }
                State::AfterValue => {
                    self.state = if self.in_struct {
                        State::BeforeField
                    } else {
                        State::BeforeTid
                    };
                }
                State::BeforeField => match self.de().read_var_uint_or_eof()? {
                    None => {
                        self.state = State::Eof;
                        return Ok(None);
                    }
                    Some(id) => {
                        self.field_id = Some(id);
                        self.state = State::BeforeTid;
                    }
                },
                State::BeforeTid => {
                    if let Some(ty) = self.read_value_header()? {
                        return Ok(Some(ty));
                    }
                }
            }
        }
    }

    /// Reads one descriptor in `BeforeTid`. `None` means nothing was produced: either padding
    /// was skipped or the container ended (the state tells which).
    fn read_value_header(&mut self) -> Result<Option<IonType>, IonError> {
        self.value_offset = self.position();
        let desc = match self.de().read_descriptor()? {
            Some(d) => d,
            None => {
                if self.field_id.is_some() || self.remaining.map_or(false, |r| r > 0) {
                    return Err(self.de().unexpected_end());
                }
                self.state = State::Eof;
                return Ok(None);
            }
        };
        trace!("descriptor {:?} at {}", desc, self.value_offset);
        match desc {
            Descriptor::Nop(n) => {
                self.de().skip_bytes(n)?;
                self.field_id = None;
                self.state = State::AfterValue;
                Ok(None)
            }
            Descriptor::VersionMarker => {
                if self.in_struct {
                    bail_format!("version marker inside a struct at {}", self.value_offset)
                }
                let mut rest = [0u8; 3];
                self.de().take_slice(&mut rest)?;
                if rest[..] != VERSION_MARKER[1..] {
                    bail_format!("malformed version marker at {}", self.value_offset)
                }
                self.version_marker = true;
                self.set_value(TID_SYMBOL, 0)?;
                self.scalar = Some(Scalar::Symbol(ION_1_0_SID));
                Ok(Some(IonType::Symbol))
            }
            Descriptor::Value {
                tid: TID_ANNOTATION,
                len,
                ..
            } => {
                let wrapper_end = self.position() + len as u64;
                self.load_annotations(len)?;
                self.read_wrapped_value(wrapper_end).map(Some)
            }
            other => self.set_descriptor(other).map(Some),
        }
    }

    fn load_annotations(&mut self, wrapper_len: usize) -> Result<(), IonError> {
        if self.remaining.map_or(false, |r| wrapper_len > r) {
            bail_format!(
                "annotation wrapper of {} bytes overruns its container",
                wrapper_len
            )
        }
        let annot_len = self.de().read_var_uint()? as usize;
        if annot_len == 0 {
            bail_format!("annotation wrapper without annotations")
        }
        let start = self.position();
        while self.position() - start < annot_len as u64 {
            let sid = self.de().read_var_uint()?;
            if sid == ION_SYMBOL_TABLE_SID {
                self.symbol_table_annotation = true;
            }
            self.annotations.push(sid);
        }
        if self.position() - start != annot_len as u64 {
            bail_format!("annotation list overruns its declared {} bytes", annot_len)
        }
        Ok(())
    }

    fn read_wrapped_value(&mut self, wrapper_end: u64) -> Result<IonType, IonError> {
        let desc = match self.de().read_descriptor()? {
            Some(d) => d,
            None => return Err(self.de().unexpected_end()),
        };
        let ty = match desc {
            Descriptor::Nop(_) => bail_format!("annotation wrapper around padding"),
            Descriptor::VersionMarker
            | Descriptor::Value {
                tid: TID_ANNOTATION,
                ..
            } => bail_format!("nested annotation wrapper"),
            other => self.set_descriptor(other)?,
        };
        if self.position() + self.value_len as u64 != wrapper_end {
            bail_format!(
                "annotation wrapper at {} does not match the length of its value",
                self.value_offset
            )
        }
        Ok(ty)
    }

    fn set_value(&mut self, tid: u8, len: usize) -> Result<IonType, IonError> {
        if self.remaining.map_or(false, |r| len > r) {
            bail_format!(
                "value of {} bytes at {} overruns its container",
                len,
                self.value_offset
            )
        }
        let ty = match IonType::from_type_code(tid) {
            Some(t) => t,
            None => bail_format!("type code {:#x} is not a value", tid),
        };
        self.value_type = Some(ty);
        self.value_tid = tid;
        self.value_len = len;
        self.unread = len;
        self.state = State::BeforeValue;
        Ok(ty)
    }

    fn set_descriptor(&mut self, desc: Descriptor) -> Result<IonType, IonError> {
        match desc {
            Descriptor::Null(tid) => {
                let ty = self.set_value(tid, 0)?;
                self.is_null = true;
                Ok(ty)
            }
            Descriptor::Bool(b) => {
                let ty = self.set_value(TID_BOOL, 0)?;
                self.scalar = Some(Scalar::Bool(b));
                Ok(ty)
            }
            Descriptor::Value { tid, len, ordered } => {
                let ty = self.set_value(tid, len)?;
                self.ordered = ordered;
                Ok(ty)
            }
            Descriptor::Nop(_) | Descriptor::VersionMarker => {
                bail_format!("descriptor {:?} does not start a value", desc)
            }
        }
    }

    /// Enters the current list, sexp or struct.
    ///
    /// # Errors
    ///
    /// [`IonError::InvalidState`] if the current value is not a container or is null.
    pub fn step_in(&mut self) -> Result<(), IonError> {
        let ty = match self.value_type {
            Some(t) if t.is_container() && !self.is_null => t,
            Some(t) => bail_state!("cannot step into a {}{}", if self.is_null { "null " } else { "" }, t),
            None => bail_state!("cannot step in without a current value"),
        };
        if self.state != State::BeforeValue || self.unread != self.value_len {
            bail_state!("container was already consumed")
        }
        let len = self.value_len;
        self.stack.push(Frame {
            resume: self.position() + len as u64,
            budget: self.remaining.map(|r| r - len),
            parent_in_struct: self.in_struct,
        });
        self.remaining = Some(len);
        self.in_struct = ty == IonType::Struct;
        self.clear_cursor();
        self.state = if self.in_struct {
            State::BeforeField
        } else {
            State::BeforeTid
        };
        Ok(())
    }

    /// Leaves the current container, skipping whatever is left of it.
    ///
    /// # Errors
    ///
    /// [`IonError::InvalidState`] at the top level, [`IonError::Format`] if the stream is
    /// already past the end of the container.
    pub fn step_out(&mut self) -> Result<(), IonError> {
        let frame = match self.stack.pop() {
            Some(f) => f,
            None => bail_state!("cannot step out of the top level"),
        };
        let pos = self.position();
        if pos > frame.resume {
            bail_format!(
                "read to {} past the end of a container at {}",
                pos,
                frame.resume
            )
        }
        let n = (frame.resume - pos) as usize;
        let mut unbounded = None;
        Bounded::new(&mut self.input, &mut unbounded).skip_bytes(n)?;
        self.remaining = frame.budget;
        self.in_struct = frame.parent_in_struct;
        self.clear_cursor();
        self.state = State::AfterValue;
        Ok(())
    }

    pub fn depth(&self) -> usize { self.stack.len() }

    pub fn is_in_struct(&self) -> bool { self.in_struct }

    pub fn current_type(&self) -> Option<IonType> { self.value_type }

    pub fn is_null(&self) -> bool { self.is_null }

    /// Whether the current value is a struct declared with sorted fields.
    pub fn is_ordered_struct(&self) -> bool { self.ordered }

    /// Stream offset of the current value's first byte, annotations included.
    pub fn value_offset(&self) -> u64 { self.value_offset }

    /// Whether the current value carries the `$ion_symbol_table` annotation.
    pub fn has_symbol_table_annotation(&self) -> bool { self.symbol_table_annotation }

    pub fn field_id(&self) -> Option<u32> { self.field_id }

    /// Text of the current field name, if the symbol table knows it.
    pub fn field_name(&self) -> Option<&str> {
        self.field_id
            .and_then(|sid| self.symbols.find_known_symbol(sid))
    }

    pub fn field_name_symbol(&self) -> Option<SymbolToken> { self.field_id.map(|sid| self.token(sid)) }

    pub fn annotation_ids(&self) -> &[u32] { &self.annotations }

    pub fn annotations(&self) -> Vec<SymbolToken> { self.annotations.iter().map(|sid| self.token(*sid)).collect() }

    fn token(&self, sid: u32) -> SymbolToken {
        SymbolToken::new(
            self.symbols.find_known_symbol(sid).map(str::to_string),
            Some(sid),
        )
    }

    /// The table symbol IDs are currently resolved against.
    pub fn symbol_table(&self) -> &LocalSymbolTable { &self.symbols }

    /// Replaces the table symbol IDs are resolved against.
    pub fn set_symbol_table(&mut self, table: LocalSymbolTable) { self.symbols = table }

    fn expect_type(&self, want: IonType) -> Result<(), IonError> {
        match self.value_type {
            Some(t) if t == want && !self.is_null => Ok(()),
            Some(t) if t == want => bail_state!("current {} value is null", t),
            Some(t) => bail_state!("current value is a {}, not a {}", t, want),
            None => bail_state!("no current value"),
        }
    }

    /// Decodes the rest of the current payload with `f`, bounded to the value's length.
    fn read_payload<T, F>(&mut self, f: F) -> Result<T, IonError>
    where
        F: FnOnce(&mut Bounded<'_, S>, usize) -> Result<T, IonError>,
    {
        let len = self.unread;
        let mut limit = Some(len);
        let result = f(&mut Bounded::new(&mut self.input, &mut limit), len);
        let left = limit.unwrap_or(0);
        self.consume(len - left);
        self.unread = left;
        match result {
            Ok(v) => {
                if left != 0 {
                    bail_format!("{} unread bytes after value at {}", left, self.value_offset)
                }
                self.state = State::AfterValue;
                Ok(v)
            }
            Err(e) => {
                if e.is_value_limit() {
                    debug!("skipping value at {}: {}", self.value_offset, e);
                    self.skip_unread()?;
                    self.state = State::AfterValue;
                }
                Err(e)
            }
        }
    }

    fn load_scalar(&mut self) -> Result<&Scalar, IonError> {
        if self.scalar.is_none() {
            if self.state != State::BeforeValue || self.unread != self.value_len {
                bail_state!("value at {} was already consumed", self.value_offset)
            }
            let tid = self.value_tid;
            let scalar = match self.value_type {
                Some(IonType::Int) => Scalar::Int(self.read_payload(|d, len| d.read_int(len, tid == TID_NEG_INT))?),
                Some(IonType::Float) => Scalar::Float(self.read_payload(|d, len| d.read_float(len))?),
                Some(IonType::Decimal) => Scalar::Decimal(self.read_payload(|d, len| d.read_decimal(len))?),
                Some(IonType::Timestamp) => Scalar::Timestamp(self.read_payload(|d, len| d.read_timestamp(len))?),
                Some(IonType::String) => Scalar::String(self.read_payload(|d, len| d.read_string(len))?),
                Some(IonType::Symbol) => Scalar::Symbol(self.read_payload(|d, len| d.read_symbol_id(len))?),
                Some(t) => bail_state!("{} values have no scalar payload", t),
                None => bail_state!("no current value"),
            };
            self.scalar = Some(scalar);
        }
        match &self.scalar {
            Some(s) => Ok(s),
            None => bail_state!("no current value"),
        }
    }

    pub fn bool_value(&mut self) -> Result<bool, IonError> {
        self.expect_type(IonType::Bool)?;
        match self.load_scalar()? {
            Scalar::Bool(b) => Ok(*b),
            other => bail_state!("{:?} is not a boolean", other),
        }
    }

    /// The current integer, whatever its size.
    pub fn int(&mut self) -> Result<Int, IonError> {
        self.expect_type(IonType::Int)?;
        match self.load_scalar()? {
            Scalar::Int(i) => Ok(i.clone()),
            other => bail_state!("{:?} is not an integer", other),
        }
    }

    /// # Errors
    ///
    /// [`IonError::Overflow`] if the integer does not fit in an `i64`.
    pub fn int_value(&mut self) -> Result<i64, IonError> {
        let i = self.int()?;
        match i.to_i64() {
            Some(v) => Ok(v),
            None => bail_overflow!("integer {} does not fit in 64 bits", i),
        }
    }

    pub fn bigint_value(&mut self) -> Result<BigInt, IonError> { Ok(self.int()?.to_bigint()) }

    pub fn integer_size(&mut self) -> Result<IntegerSize, IonError> { Ok(self.int()?.size()) }

    pub fn float_value(&mut self) -> Result<f64, IonError> {
        self.expect_type(IonType::Float)?;
        match self.load_scalar()? {
            Scalar::Float(f) => Ok(*f),
            other => bail_state!("{:?} is not a float", other),
        }
    }

    pub fn decimal_value(&mut self) -> Result<Decimal, IonError> {
        self.expect_type(IonType::Decimal)?;
        match self.load_scalar()? {
            Scalar::Decimal(d) => Ok(*d),
            other => bail_state!("{:?} is not a decimal", other),
        }
    }

    pub fn timestamp_value(&mut self) -> Result<Timestamp, IonError> {
        self.expect_type(IonType::Timestamp)?;
        match self.load_scalar()? {
            Scalar::Timestamp(ts) => Ok(ts.clone()),
            other => bail_state!("{:?} is not a timestamp", other),
        }
    }

    /// Text of the current string, or of the current symbol.
    ///
    /// # Errors
    ///
    /// [`IonError::InvalidState`] for other types, nulls and symbols whose text is unknown.
    pub fn string_value(&mut self) -> Result<String, IonError> {
        if self.value_type == Some(IonType::Symbol) {
            let token = self.symbol_value()?;
            return match token.text {
                Some(text) => Ok(text),
                None => bail_state!("symbol ${} has no known text", self.symbol_id()?),
            };
        }
        self.expect_type(IonType::String)?;
        match self.load_scalar()? {
            Scalar::String(s) => Ok(s.clone()),
            other => bail_state!("{:?} is not a string", other),
        }
    }

    pub fn symbol_id(&mut self) -> Result<u32, IonError> {
        self.expect_type(IonType::Symbol)?;
        match self.load_scalar()? {
            Scalar::Symbol(sid) => Ok(*sid),
            other => bail_state!("{:?} is not a symbol", other),
        }
    }

    /// The current symbol with its text resolved, when known.
    pub fn symbol_value(&mut self) -> Result<SymbolToken, IonError> {
        let sid = self.symbol_id()?;
        Ok(self.token(sid))
    }

    fn expect_lob(&self) -> Result<(), IonError> {
        match self.value_type {
            Some(IonType::Blob) | Some(IonType::Clob) if !self.is_null => Ok(()),
            Some(t) => bail_state!("current value is a {}{}, not a lob", if self.is_null { "null " } else { "" }, t),
            None => bail_state!("no current value"),
        }
    }

    /// Total length of the current blob or clob.
    pub fn lob_byte_size(&self) -> Result<usize, IonError> {
        self.expect_lob()?;
        Ok(self.value_len)
    }

    /// Reads up to `out.len()` more bytes of the current lob, returning how many were read.
    /// `0` once the lob is exhausted.
    pub fn get_bytes(&mut self, out: &mut [u8]) -> Result<usize, IonError> {
        self.expect_lob()?;
        if self.state != State::BeforeValue {
            return Ok(0);
        }
        let n = cmp::min(out.len(), self.unread);
        self.de().take_slice(&mut out[..n])?;
        self.unread -= n;
        if self.unread == 0 {
            self.state = State::AfterValue;
        }
        Ok(n)
    }

    /// Reads the unread rest of the current lob.
    pub fn lob_bytes(&mut self) -> Result<Bytes, IonError> {
        self.expect_lob()?;
        let mut out = vec![0u8; self.unread];
        let n = self.get_bytes(&mut out)?;
        out.truncate(n);
        Ok(Bytes::from(out))
    }

    /// Reads the current `$ion_symbol_table` struct and makes the table it declares current.
    fn load_local_symbol_table(&mut self) -> Result<(), IonError> {
        self.step_in()?;
        let mut imports = Vec::new();
        let mut symbols = Vec::new();
        let mut append = false;
        while let Some(ty) = self.next_raw()? {
            if self.is_null {
                continue;
            }
            match (self.field_id, ty) {
                (Some(IMPORTS_SID), IonType::Symbol) => append = self.symbol_id()? == ION_SYMBOL_TABLE_SID,
                (Some(IMPORTS_SID), IonType::List) => imports = self.read_imports()?,
                (Some(SYMBOLS_SID), IonType::List) => symbols = self.read_symbol_list()?,
                _ => {}
            }
        }
        self.step_out()?;

        if append {
            let prior = &self.symbols;
            let mut merged: Vec<Option<String>> = prior
                .declared_symbols()
                .map(|s| s.map(str::to_string))
                .collect();
            merged.extend(symbols);
            symbols = merged;
            imports = prior.imported_tables().to_vec();
        }
        let mut table = LocalSymbolTable::with_symbols(imports, symbols).map_err(|e| match e {
            IonError::InvalidArgument(m) => IonError::Format(m),
            e => e,
        })?;
        table.make_read_only();
        debug!(
            "loaded local symbol table: {} imports, max_id {}",
            table.imported_tables().len(),
            table.max_id()
        );
        self.symbols = table;
        Ok(())
    }

    fn read_symbol_list(&mut self) -> Result<Vec<Option<String>>, IonError> {
        let mut symbols = Vec::new();
        self.step_in()?;
        while let Some(ty) = self.next_raw()? {
            if ty == IonType::String && !self.is_null {
                symbols.push(Some(self.string_value()?));
            } else {
                symbols.push(None);
            }
        }
        self.step_out()?;
        Ok(symbols)
    }

    fn read_imports(&mut self) -> Result<Vec<Arc<SharedSymbolTable>>, IonError> {
        let mut tables = Vec::new();
        self.step_in()?;
        while let Some(ty) = self.next_raw()? {
            if ty != IonType::Struct || self.is_null {
                continue;
            }
            if let Some(table) = self.read_import()? {
                tables.push(table);
            }
        }
        self.step_out()?;
        Ok(tables)
    }

    fn read_import(&mut self) -> Result<Option<Arc<SharedSymbolTable>>, IonError> {
        let mut name = None;
        let mut version = 1;
        let mut max_id = None;
        self.step_in()?;
        while let Some(ty) = self.next_raw()? {
            if self.is_null {
                continue;
            }
            match (self.field_id, ty) {
                (Some(NAME_SID), IonType::String) => name = Some(self.string_value()?),
                (Some(VERSION_SID), IonType::Int) => {
                    version = u32::try_from(self.int_value()?)
                        .ok()
                        .filter(|v| *v >= 1)
                        .unwrap_or(1)
                }
                (Some(MAX_ID_SID), IonType::Int) => max_id = u32::try_from(self.int_value()?).ok(),
                _ => {}
            }
        }
        self.step_out()?;

        let name = match name {
            Some(n) if !n.is_empty() && n != ION => n,
            _ => return Ok(None),
        };
        let found = self.catalog.get_table_version(&name, version);
        let table = match (found, max_id) {
            (Some(t), None) if t.version() == version => t,
            (Some(t), Some(m)) if t.version() == version && t.max_id() == m => t,
            (None, None) | (Some(_), None) => bail_format!(
                "import of `{}` version {} has no max_id and is not in the catalog",
                name,
                version
            ),
            (found, Some(m)) => Arc::new(SharedSymbolTable::substitute(
                found.as_deref(),
                &name,
                version,
                m,
            )),
        };
        Ok(Some(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::BinaryWriter;

    fn raw(bytes: &[u8]) -> BinaryReader<BufSource<std::io::Cursor<&[u8]>>> { BinaryReader::from_bytes(bytes) }

    #[test]
    fn version_marker_is_a_symbol_when_raw() {
        let mut r = raw(&[0xe0, 0x01, 0x00, 0xea, 0x11]);
        assert_eq!(r.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(r.symbol_id().unwrap(), ION_1_0_SID);
        assert_eq!(r.string_value().unwrap(), "$ion_1_0");
        assert_eq!(r.next().unwrap(), Some(IonType::Bool));
        assert!(r.bool_value().unwrap());
        assert_eq!(r.next().unwrap(), None);
        assert_eq!(r.next().unwrap(), None);
    }

    #[test]
    fn bad_version_marker() {
        let mut r = raw(&[0xe0, 0x02, 0x00, 0xea]);
        match r.next() {
            Err(IonError::Format(_)) => {}
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn padding_is_skipped() {
        // nop pad of 2, then a struct with a padded field and {name: 1}
        let bytes = [0x02, 0xff, 0xff, 0xd5, 0x80, 0x01, 0xaa, 0x84, 0x20];
        let mut r = raw(&bytes);
        assert_eq!(r.next().unwrap(), Some(IonType::Struct));
        r.step_in().unwrap();
        assert_eq!(r.next().unwrap(), Some(IonType::Int));
        assert_eq!(r.field_id(), Some(NAME_SID));
        assert_eq!(r.int_value().unwrap(), 0);
        assert_eq!(r.next().unwrap(), None);
        r.step_out().unwrap();
        assert_eq!(r.next().unwrap(), None);
    }

    #[test]
    fn annotations_and_nulls() {
        // version::null.string, $ion_symbol_table::{}
        let bytes = [0xe3, 0x81, 0x85, 0x8f, 0xe3, 0x81, 0x83, 0xd0];
        let mut r = raw(&bytes);
        assert_eq!(r.next().unwrap(), Some(IonType::String));
        assert!(r.is_null());
        assert_eq!(r.annotation_ids(), &[VERSION_SID]);
        assert_eq!(r.annotations()[0].text.as_deref(), Some("version"));
        assert!(r.string_value().is_err());
        assert_eq!(r.next().unwrap(), Some(IonType::Struct));
        assert!(r.has_symbol_table_annotation());
        assert_eq!(r.value_offset(), 4);
        assert_eq!(r.next().unwrap(), None);
    }

    #[test]
    fn annotated_padding_is_an_error() {
        let mut r = raw(&[0xe3, 0x81, 0x84, 0x00]);
        match r.next() {
            Err(IonError::Format(_)) => {}
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn unfinished_containers_are_skipped() {
        // [1, [2, 3], 4] 5
        let bytes = [0xb9, 0x21, 0x01, 0xb4, 0x21, 0x02, 0x21, 0x03, 0x21, 0x04, 0x21, 0x05];
        let mut r = raw(&bytes);
        assert_eq!(r.next().unwrap(), Some(IonType::List));
        r.step_in().unwrap();
        assert_eq!(r.next().unwrap(), Some(IonType::Int));
        assert_eq!(r.next().unwrap(), Some(IonType::List));
        r.step_in().unwrap();
        assert_eq!(r.depth(), 2);
        assert_eq!(r.next().unwrap(), Some(IonType::Int));
        r.step_out().unwrap();
        r.step_out().unwrap();
        assert_eq!(r.next().unwrap(), Some(IonType::Int));
        assert_eq!(r.int_value().unwrap(), 5);
        assert!(r.step_out().is_err());
    }

    #[test]
    fn value_longer_than_container() {
        let mut r = raw(&[0xb2, 0x83, b'a', b'b', b'c']);
        r.next().unwrap();
        r.step_in().unwrap();
        match r.next() {
            Err(IonError::Format(_)) => {}
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn truncated_input() {
        let mut r = raw(&[0x84, b'a']);
        assert_eq!(r.next().unwrap(), Some(IonType::String));
        match r.string_value() {
            Err(IonError::UnexpectedEnd { .. }) => {}
            other => panic!("expected unexpected end, got {:?}", other),
        }
        // field name with nothing after it
        let mut r = raw(&[0xd1, 0x81, 0x84]);
        r.next().unwrap();
        r.step_in().unwrap();
        match r.next() {
            Err(IonError::UnexpectedEnd { .. }) => {}
            other => panic!("expected unexpected end, got {:?}", other),
        }
    }

    #[test]
    fn lobs_in_chunks() {
        let mut r = raw(&[0xa5, 1, 2, 3, 4, 5, 0x20]);
        assert_eq!(r.next().unwrap(), Some(IonType::Blob));
        assert_eq!(r.lob_byte_size().unwrap(), 5);
        let mut buf = [0u8; 2];
        assert_eq!(r.get_bytes(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(&r.lob_bytes().unwrap()[..], &[3, 4, 5]);
        assert_eq!(r.get_bytes(&mut buf).unwrap(), 0);
        assert_eq!(r.next().unwrap(), Some(IonType::Int));
    }

    #[test]
    fn oversized_values_leave_siblings_readable() {
        // [1d-29, 7]
        let bytes = [0xb5, 0x52, 0xdd, 0x01, 0x21, 0x07];
        let mut r = raw(&bytes);
        r.next().unwrap();
        r.step_in().unwrap();
        assert_eq!(r.next().unwrap(), Some(IonType::Decimal));
        match r.decimal_value() {
            Err(IonError::Unsupported(_)) => {}
            other => panic!("expected unsupported, got {:?}", other),
        }
        assert_eq!(r.next().unwrap(), Some(IonType::Int));
        assert_eq!(r.int_value().unwrap(), 7);
    }

    #[test]
    fn wrong_getter() {
        let mut r = raw(&[0x21, 0x01]);
        r.next().unwrap();
        match r.float_value() {
            Err(IonError::InvalidState(_)) => {}
            other => panic!("expected invalid state, got {:?}", other),
        }
        assert!(r.step_in().is_err());
        assert_eq!(r.int_value().unwrap(), 1);
        assert_eq!(r.int_value().unwrap(), 1);
    }

    #[test]
    fn processes_local_symbol_tables() {
        let mut w = BinaryWriter::new();
        w.step_in(IonType::Struct).unwrap();
        w.set_field_name("color").unwrap();
        w.write_symbol("red").unwrap();
        w.step_out().unwrap();
        let mut bytes = vec![];
        w.flush_to_vec(&mut bytes).unwrap();

        let mut r = ReaderBuilder::new()
            .process_symbol_tables(true)
            .build(buf_source(&bytes[..]));
        assert_eq!(r.next().unwrap(), Some(IonType::Struct));
        assert!(r.symbol_table().is_read_only());
        assert_eq!(r.symbol_table().max_id(), 11);
        r.step_in().unwrap();
        assert_eq!(r.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(r.field_name(), Some("color"));
        assert_eq!(r.string_value().unwrap(), "red");
        r.step_out().unwrap();
        assert_eq!(r.next().unwrap(), None);
    }

    #[test]
    fn imports_resolve_through_the_catalog() {
        let table = Arc::new(SharedSymbolTable::new("fruit", 1, None, vec!["apple", "pear"]).unwrap());
        let mut w = BinaryWriter::with_imports(vec![table.clone()]).unwrap();
        w.write_symbol("pear").unwrap();
        w.write_symbol("plum").unwrap();
        let mut bytes = vec![];
        w.flush_to_vec(&mut bytes).unwrap();

        let mut catalog = Catalog::new();
        catalog.put_table(table);
        let mut r = ReaderBuilder::new()
            .catalog(catalog)
            .process_symbol_tables(true)
            .build(buf_source(&bytes[..]));
        assert_eq!(r.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(r.symbol_id().unwrap(), 11);
        assert_eq!(r.string_value().unwrap(), "pear");
        assert_eq!(r.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(r.symbol_id().unwrap(), 12);
        assert_eq!(r.string_value().unwrap(), "plum");

        // without the catalog the import is a substitute of unknown symbols
        let mut r = ReaderBuilder::new()
            .process_symbol_tables(true)
            .build(buf_source(&bytes[..]));
        r.next().unwrap();
        assert_eq!(r.symbol_value().unwrap().text, None);
        r.next().unwrap();
        assert_eq!(r.string_value().unwrap(), "plum");
    }

    #[test]
    fn append_form_extends_the_current_table() {
        // $ion_symbol_table::{symbols:["a"]} $ion_symbol_table::{imports:$ion_symbol_table, symbols:["b"]} b
        let bytes = [
            0xe0, 0x01, 0x00, 0xea, //
            0xe7, 0x81, 0x83, 0xd4, 0x87, 0xb2, 0x81, b'a', //
            0xea, 0x81, 0x83, 0xd7, 0x86, 0x71, 0x03, 0x87, 0xb2, 0x81, b'b', //
            0x71, 0x0b,
        ];
        let mut r = ReaderBuilder::new()
            .process_symbol_tables(true)
            .build(buf_source(&bytes[..]));
        assert_eq!(r.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(r.string_value().unwrap(), "b");
        assert_eq!(r.symbol_table().find_known_symbol(10), Some("a"));
    }

    #[test]
    fn end_of_input_at_a_field_name() {
        // a struct claiming five bytes of content, none of which follow
        let mut r = raw(&[0xd5]);
        assert_eq!(r.next().unwrap(), Some(IonType::Struct));
        r.step_in().unwrap();
        assert_eq!(r.next().unwrap(), None);
        match r.step_out() {
            Err(IonError::UnexpectedEnd { .. }) => {}
            other => panic!("expected unexpected end, got {:?}", other),
        }
    }

    // $ion_symbol_table::{imports:[{name:"zz", max_id:<4 bytes>}]} $10
    fn import_with_max_id(max_id: [u8; 4]) -> Vec<u8> {
        let mut bytes = vec![
            0xe0, 0x01, 0x00, 0xea, //
            0xee, 0x90, 0x81, 0x83, 0xdd, 0x86, 0xbb, 0xda, //
            0x84, 0x82, b'z', b'z', 0x88, 0x24,
        ];
        bytes.extend_from_slice(&max_id);
        bytes.extend_from_slice(&[0x71, 0x0a]);
        bytes
    }

    #[test]
    fn large_unknown_import_is_not_materialized() {
        let bytes = import_with_max_id([0x01, 0xc9, 0xc3, 0x80]);
        let mut r = ReaderBuilder::new()
            .process_symbol_tables(true)
            .build(buf_source(&bytes[..]));
        assert_eq!(r.next().unwrap(), Some(IonType::Symbol));
        let token = r.symbol_value().unwrap();
        assert_eq!(token.text, None);
        assert_eq!(token.sid, Some(10));
        assert_eq!(r.symbol_table().max_id(), 30_000_009);
        assert_eq!(r.symbol_table().imported_tables()[0].known_prefix().len(), 0);
    }

    #[test]
    fn import_ids_past_u32_are_rejected() {
        let bytes = import_with_max_id([0xff, 0xff, 0xff, 0xff]);
        let mut r = ReaderBuilder::new()
            .process_symbol_tables(true)
            .build(buf_source(&bytes[..]));
        match r.next() {
            Err(IonError::Format(_)) => {}
            other => panic!("expected a format error, got {:?}", other),
        }
    }
}
