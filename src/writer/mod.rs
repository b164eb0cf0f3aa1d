//! # Binary writer
//!
//! [`BinaryWriter`] turns values with textual symbols into a binary stream. Symbol text is
//! interned as it is written; the local symbol table declaring new symbols is built in a
//! separate buffer and emitted ahead of the data when the writer is flushed.
//!
//! # Example
//!
//! ```
//! use ionbin::prelude::*;
//!
//! let mut w = BinaryWriter::new();
//! w.step_in(IonType::Struct).unwrap();
//! w.set_field_name("name").unwrap();
//! w.write_string("alpha").unwrap();
//! w.step_out().unwrap();
//!
//! let mut out = Vec::new();
//! assert_eq!(w.flush_to_vec(&mut out).unwrap(), FlushStatus::Flushed(12));
//! // version marker, then the struct; `name` is a system symbol so no local table
//! assert_eq!(&out[..4], &[0xe0, 0x01, 0x00, 0xea]);
//! assert_eq!(&out[4..], &[0xd7, 0x84, 0x85, b'a', b'l', b'p', b'h', b'a']);
//! ```

mod raw;

use log::debug;
use num_bigint::BigInt;
use std::{collections::HashMap, io::Write, sync::Arc};

use crate::{
    buffer::{PagedBuffer, DEFAULT_PAGE_SIZE},
    decimal::Decimal,
    encoding::constants::*,
    errors::IonError,
    int::Int,
    local::ImportContext,
    shared::SharedSymbolTable,
    symbols::*,
    timestamp::Timestamp,
    IonType,
};
use raw::RawWriter;

/// Where a writer is in building its local symbol table.
///
/// Moves forward only, and returns to [`SymbolState::SystemSymbols`] on
/// [`BinaryWriter::finish`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum SymbolState {
    /// Only system symbols have been used; no local table has been started.
    SystemSymbols,
    /// The local table and its import list are open, with no local symbols yet.
    LocalSymbolsWithImportsOnly,
    /// The local table's symbol list is open.
    LocalSymbols,
    /// The local table has been closed for this flush.
    LocalSymbolsFlushed,
}

use SymbolState::*;

/// Outcome of a flush.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FlushStatus {
    /// A container is still open; nothing was written.
    NotReady,
    /// This many bytes were written.
    Flushed(usize),
    /// The destination can't hold the output; nothing was written.
    BufferTooSmall {
        /// Bytes the output needs.
        needed: usize,
    },
}

/// Configures a [`BinaryWriter`].
#[derive(Clone, Debug)]
pub struct WriterBuilder {
    imports: Vec<Arc<SharedSymbolTable>>,
    page_size: usize,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        WriterBuilder {
            imports: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl WriterBuilder {
    pub fn new() -> Self { WriterBuilder::default() }

    /// Shared tables whose symbols the writer reuses instead of declaring them locally.
    pub fn imports(mut self, imports: Vec<Arc<SharedSymbolTable>>) -> Self {
        self.imports = imports;
        self
    }

    /// Adds one shared table to the import list.
    pub fn import(mut self, table: Arc<SharedSymbolTable>) -> Self {
        self.imports.push(table);
        self
    }

    /// Page size of the writer's internal buffers.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// # Errors
    ///
    /// [`IonError::InvalidArgument`] if the system table is listed as an import.
    pub fn build(self) -> Result<BinaryWriter, IonError> {
        Ok(BinaryWriter {
            lengths: PagedBuffer::new(self.page_size),
            symbols: RawWriter::new(self.page_size),
            user: RawWriter::new(self.page_size),
            imports: ImportContext::new(self.imports)?,
            locals: HashMap::new(),
            local_names: Vec::new(),
            locals_locked: false,
            symbol_state: SystemSymbols,
        })
    }
}

/// A binary writer that manages its own local symbol table.
#[derive(Debug)]
pub struct BinaryWriter {
    lengths: PagedBuffer,
    symbols: RawWriter,
    user: RawWriter,
    imports: ImportContext,
    locals: HashMap<String, u32>,
    local_names: Vec<String>,
    locals_locked: bool,
    symbol_state: SymbolState,
}

impl Default for BinaryWriter {
    fn default() -> Self { BinaryWriter::new() }
}

fn container_tid(ty: IonType) -> Result<u8, IonError> {
    match ty {
        IonType::List => Ok(TID_LIST),
        IonType::Sexp => Ok(TID_SEXP),
        IonType::Struct => Ok(TID_STRUCT),
        other => bail_state!("cannot step into a {}", other),
    }
}

impl BinaryWriter {
    /// A writer with no imports.
    pub fn new() -> Self {
        BinaryWriter {
            lengths: PagedBuffer::new(DEFAULT_PAGE_SIZE),
            symbols: RawWriter::new(DEFAULT_PAGE_SIZE),
            user: RawWriter::new(DEFAULT_PAGE_SIZE),
            imports: ImportContext::empty(),
            locals: HashMap::new(),
            local_names: Vec::new(),
            locals_locked: false,
            symbol_state: SystemSymbols,
        }
    }

    /// A writer importing `imports`, in order.
    pub fn with_imports(imports: Vec<Arc<SharedSymbolTable>>) -> Result<Self, IonError> {
        WriterBuilder::new().imports(imports).build()
    }

    pub fn builder() -> WriterBuilder { WriterBuilder::new() }

    pub fn symbol_state(&self) -> SymbolState { self.symbol_state }

    pub fn depth(&self) -> usize { self.user.depth() }

    pub fn is_in_struct(&self) -> bool { self.user.is_in_struct() }

    /// A live view of the writer's local symbol table.
    pub fn symbol_table(&mut self) -> LocalSymbolTableView<'_> { LocalSymbolTableView { writer: self } }

    fn start_local_symbol_table(&mut self) -> Result<(), IonError> {
        if self.symbol_state != SystemSymbols {
            return Ok(());
        }
        debug!(
            "opening local symbol table with {} imports",
            self.imports.parents().len()
        );
        self.symbols.write_ivm()?;
        self.symbols.add_annotation(ION_SYMBOL_TABLE_SID);
        self.symbols.step_in(TID_STRUCT)?;
        if self.imports.has_imports() {
            self.symbols.set_field_id(IMPORTS_SID);
            self.symbols.step_in(TID_LIST)?;
            for table in self.imports.parents() {
                self.symbols.step_in(TID_STRUCT)?;
                self.symbols.set_field_id(NAME_SID);
                self.symbols.write_string(table.name().unwrap_or_default())?;
                self.symbols.set_field_id(VERSION_SID);
                self.symbols.write_i64(i64::from(table.version()))?;
                self.symbols.set_field_id(MAX_ID_SID);
                self.symbols.write_i64(i64::from(table.max_id()))?;
                self.symbols.step_out(&mut self.lengths)?;
            }
            self.symbols.step_out(&mut self.lengths)?;
        }
        self.symbol_state = LocalSymbolsWithImportsOnly;
        Ok(())
    }

    fn start_local_symbol_list(&mut self) -> Result<(), IonError> {
        if self.symbol_state == LocalSymbolsWithImportsOnly {
            self.symbols.set_field_id(SYMBOLS_SID);
            self.symbols.step_in(TID_LIST)?;
            self.symbol_state = LocalSymbols;
        }
        Ok(())
    }

    fn find(&self, text: &str) -> Option<u32> {
        self.imports
            .try_get(text)
            .or_else(|| self.locals.get(text).cloned())
    }

    /// Returns the ID of `text`, declaring it in the local symbol table if it is new.
    ///
    /// # Errors
    ///
    /// [`IonError::InvalidState`] if `text` is new and the local table is read-only.
    pub fn intern(&mut self, text: &str) -> Result<SymbolToken, IonError> {
        if let Some(sid) = self.imports.try_get(text) {
            if sid > ION_1_0_MAX_ID {
                // a sealed segment holding only the version marker has no import list
                if self.symbol_state == LocalSymbolsFlushed
                    && self.symbols.closed_len() <= VERSION_MARKER.len()
                {
                    bail_state!(
                        "cannot use imported `{}` after the local symbol table was closed",
                        text
                    )
                }
                self.start_local_symbol_table()?;
            }
            return Ok(SymbolToken::new(Some(text.to_string()), Some(sid)));
        }
        if let Some(sid) = self.locals.get(text) {
            return Ok(SymbolToken::new(Some(text.to_string()), Some(*sid)));
        }
        if self.locals_locked {
            bail_state!("cannot add `{}` to a read-only local symbol table", text)
        }
        if self.symbol_state == LocalSymbolsFlushed {
            bail_state!("cannot add `{}` after the local symbol table was closed", text)
        }
        let sid = match self
            .imports
            .local_sid_start()
            .checked_add(self.local_names.len() as u32)
        {
            Some(sid) => sid,
            None => bail_arg!("no symbol IDs left for `{}`", text),
        };
        self.start_local_symbol_table()?;
        self.start_local_symbol_list()?;
        self.symbols.write_string(text)?;
        self.locals.insert(text.to_string(), sid);
        self.local_names.push(text.to_string());
        Ok(SymbolToken::new(Some(text.to_string()), Some(sid)))
    }

    fn token_sid(&mut self, token: &SymbolToken) -> Result<u32, IonError> {
        match (&token.text, token.sid) {
            (Some(text), _) => {
                let interned = self.intern(text)?;
                interned
                    .sid
                    .ok_or_else(|| IonError::InvalidState(format!("`{}` has no ID", text)))
            }
            (None, Some(sid)) => Ok(sid),
            (None, None) => bail_arg!("symbol token has neither text nor ID"),
        }
    }

    /// Sets the field name of the next value.
    ///
    /// # Errors
    ///
    /// [`IonError::InvalidState`] outside of a struct.
    pub fn set_field_name(&mut self, name: &str) -> Result<(), IonError> {
        if !self.is_in_struct() {
            bail_state!("field name `{}` set outside of a struct", name)
        }
        let sid = self.token_sid(&SymbolToken::from_text(name))?;
        self.user.set_field_id(sid);
        Ok(())
    }

    pub fn set_field_name_symbol(&mut self, name: &SymbolToken) -> Result<(), IonError> {
        if !self.is_in_struct() {
            bail_state!("field name set outside of a struct")
        }
        let sid = self.token_sid(name)?;
        self.user.set_field_id(sid);
        Ok(())
    }

    /// Adds an annotation to the next value.
    pub fn add_annotation(&mut self, text: &str) -> Result<(), IonError> {
        let sid = self.token_sid(&SymbolToken::from_text(text))?;
        self.user.add_annotation(sid);
        Ok(())
    }

    pub fn add_annotation_symbol(&mut self, token: &SymbolToken) -> Result<(), IonError> {
        let sid = self.token_sid(token)?;
        self.user.add_annotation(sid);
        Ok(())
    }

    /// Replaces any pending annotations with `text`.
    pub fn set_annotation(&mut self, text: &str) -> Result<(), IonError> {
        self.user.clear_annotations();
        self.add_annotation(text)
    }

    pub fn clear_annotations(&mut self) { self.user.clear_annotations() }

    /// Opens a list, sexp or struct.
    pub fn step_in(&mut self, ty: IonType) -> Result<(), IonError> {
        let tid = container_tid(ty)?;
        self.user.step_in(tid)
    }

    pub fn step_out(&mut self) -> Result<(), IonError> { self.user.step_out(&mut self.lengths) }

    pub fn write_null(&mut self) -> Result<(), IonError> { self.user.write_null(TID_NULL) }

    pub fn write_typed_null(&mut self, ty: IonType) -> Result<(), IonError> { self.user.write_null(ty.type_code()) }

    pub fn write_bool(&mut self, b: bool) -> Result<(), IonError> { self.user.write_bool(b) }

    pub fn write_int(&mut self, i: i64) -> Result<(), IonError> { self.user.write_i64(i) }

    pub fn write_bigint(&mut self, i: &BigInt) -> Result<(), IonError> { self.user.write_int(&Int::from(i.clone())) }

    pub fn write_float(&mut self, f: f64) -> Result<(), IonError> { self.user.write_f64(f) }

    pub fn write_f32(&mut self, f: f32) -> Result<(), IonError> { self.user.write_f32(f) }

    pub fn write_decimal(&mut self, d: &Decimal) -> Result<(), IonError> { self.user.write_decimal(d) }

    pub fn write_timestamp(&mut self, ts: &Timestamp) -> Result<(), IonError> { self.user.write_timestamp(ts) }

    /// Writes a symbol value, interning its text.
    pub fn write_symbol(&mut self, text: &str) -> Result<(), IonError> {
        let sid = self.token_sid(&SymbolToken::from_text(text))?;
        self.user.write_symbol_id(sid)
    }

    /// Writes a symbol value. Tokens without text are written by ID as-is.
    pub fn write_symbol_token(&mut self, token: &SymbolToken) -> Result<(), IonError> {
        let sid = self.token_sid(token)?;
        self.user.write_symbol_id(sid)
    }

    pub fn write_string(&mut self, s: &str) -> Result<(), IonError> { self.user.write_string(s) }

    pub fn write_blob(&mut self, bytes: &[u8]) -> Result<(), IonError> { self.user.write_lob(TID_BLOB, bytes) }

    pub fn write_clob(&mut self, bytes: &[u8]) -> Result<(), IonError> { self.user.write_lob(TID_CLOB, bytes) }

    /// Closes the symbol table containers so the symbol segment is complete. Returns
    /// `false` while the data is inside a container.
    fn prepare_flush(&mut self) -> Result<bool, IonError> {
        if self.user.depth() != 0 {
            return Ok(false);
        }
        match self.symbol_state {
            SystemSymbols => self.symbols.write_ivm()?,
            LocalSymbolsWithImportsOnly => self.symbols.step_out(&mut self.lengths)?,
            LocalSymbols => {
                self.symbols.step_out(&mut self.lengths)?;
                self.symbols.step_out(&mut self.lengths)?;
            }
            LocalSymbolsFlushed => {}
        }
        self.symbol_state = LocalSymbolsFlushed;
        Ok(true)
    }

    /// Prepares both segments and returns their combined length.
    fn sealed_len(&mut self) -> Result<Option<usize>, IonError> {
        if !self.prepare_flush()? {
            return Ok(None);
        }
        let symbols = self.symbols.prepare_flush()?;
        let user = self.user.prepare_flush()?;
        Ok(Some(symbols + user))
    }

    /// Length a flush would produce now, without sealing anything.
    fn pending_len(&self) -> Option<usize> {
        if self.user.depth() != 0 {
            return None;
        }
        let symbols = match self.symbol_state {
            SystemSymbols => VERSION_MARKER.len(),
            _ => self.symbols.closed_len(),
        };
        Some(symbols + self.user.closed_len())
    }

    fn emit<F>(&mut self, mut f: F) -> Result<(), IonError>
    where
        F: FnMut(&[u8]) -> Result<(), IonError>,
    {
        self.symbols.flush_to(&self.lengths, &mut f)?;
        self.user.flush_to(&self.lengths, &mut f)?;
        self.finish()
    }

    /// Writes the symbol table and the data to `out`, then [`BinaryWriter::finish`]es.
    ///
    /// # Errors
    ///
    /// I/O errors from `out`.
    pub fn flush<W: Write>(&mut self, out: &mut W) -> Result<FlushStatus, IonError> {
        let total = match self.sealed_len()? {
            Some(t) => t,
            None => return Ok(FlushStatus::NotReady),
        };
        self.emit(|s| out.write_all(s).map_err(IonError::from))?;
        debug!("flushed {} bytes", total);
        Ok(FlushStatus::Flushed(total))
    }

    /// Like [`BinaryWriter::flush`], replacing the contents of `out`.
    pub fn flush_to_vec(&mut self, out: &mut Vec<u8>) -> Result<FlushStatus, IonError> {
        let total = match self.sealed_len()? {
            Some(t) => t,
            None => return Ok(FlushStatus::NotReady),
        };
        out.clear();
        out.reserve(total);
        self.emit(|s| {
            out.extend_from_slice(s);
            Ok(())
        })?;
        debug!("flushed {} bytes", total);
        Ok(FlushStatus::Flushed(total))
    }

    /// Like [`BinaryWriter::flush`], into a fixed buffer. When `out` is too small nothing is
    /// written and the writer is left as it was, so writing can go on before the next flush.
    pub fn flush_to_slice(&mut self, out: &mut [u8]) -> Result<FlushStatus, IonError> {
        match self.pending_len() {
            None => return Ok(FlushStatus::NotReady),
            Some(needed) if out.len() < needed => return Ok(FlushStatus::BufferTooSmall { needed }),
            Some(_) => {}
        }
        let total = match self.sealed_len()? {
            Some(t) => t,
            None => return Ok(FlushStatus::NotReady),
        };
        let mut at = 0;
        self.emit(|s| {
            out[at..at + s.len()].copy_from_slice(s);
            at += s.len();
            Ok(())
        })?;
        debug!("flushed {} bytes", total);
        Ok(FlushStatus::Flushed(total))
    }

    /// Discards buffered output and starts a new local symbol table context.
    ///
    /// # Errors
    ///
    /// [`IonError::InvalidState`] inside a container.
    pub fn finish(&mut self) -> Result<(), IonError> {
        if self.user.depth() != 0 {
            bail_state!("cannot finish at depth {}", self.user.depth())
        }
        self.symbols.finish();
        self.user.finish();
        self.lengths.clear();
        self.locals.clear();
        self.local_names.clear();
        self.locals_locked = false;
        self.symbol_state = SystemSymbols;
        Ok(())
    }
}

/// The writer's current local symbol table, seen through the [`SymbolTable`] trait.
///
/// Interning through the view declares symbols in the writer's output.
#[derive(Debug)]
pub struct LocalSymbolTableView<'a> {
    writer: &'a mut BinaryWriter,
}

impl<'a> SymbolTable for LocalSymbolTableView<'a> {
    fn kind(&self) -> SymbolTableKind { SymbolTableKind::Local }

    fn name(&self) -> Option<&str> { None }

    fn version(&self) -> u32 { 0 }

    fn is_read_only(&self) -> bool { self.writer.locals_locked }

    fn make_read_only(&mut self) { self.writer.locals_locked = true }

    fn imported_tables(&self) -> &[Arc<SharedSymbolTable>] { self.writer.imports.parents() }

    fn imported_max_id(&self) -> u32 { self.writer.imports.local_sid_start() - 1 }

    fn max_id(&self) -> u32 { self.imported_max_id() + self.writer.local_names.len() as u32 }

    fn find(&self, text: &str) -> Option<SymbolToken> {
        self.writer
            .find(text)
            .map(|sid| SymbolToken::new(Some(text.to_string()), Some(sid)))
    }

    fn find_known_symbol(&self, sid: u32) -> Option<&str> {
        let start = self.writer.imports.local_sid_start();
        if sid < start {
            self.writer.imports.find_known_symbol(sid)
        } else {
            self.writer
                .local_names
                .get((sid - start) as usize)
                .map(String::as_str)
        }
    }

    fn intern(&mut self, text: &str) -> Result<SymbolToken, IonError> { self.writer.intern(text) }

    fn declared_symbols(&self) -> Box<dyn Iterator<Item = Option<&str>> + '_> {
        Box::new(self.writer.local_names.iter().map(|s| Some(s.as_str())))
    }
}
