//! Local symbol tables and the import arithmetic they share with the writer.

use std::{collections::HashMap, sync::Arc};

use crate::{
    errors::IonError,
    shared::{system_symbol_table, SharedSymbolTable},
    symbols::{SymbolTable, SymbolTableKind, SymbolToken, ION_1_0_MAX_ID},
};

/// The merged view of a list of imported shared tables.
///
/// Imported symbols are numbered in import order starting right after the system symbols;
/// when two imports declare the same text the first one wins.
#[derive(Clone, Debug)]
pub struct ImportContext {
    system: Arc<SharedSymbolTable>,
    parents: Vec<Arc<SharedSymbolTable>>,
    ids: HashMap<String, u32>,
    local_sid_start: u32,
}

impl ImportContext {
    /// # Errors
    ///
    /// The system table is always implicit; listing it is [`IonError::InvalidArgument`], as
    /// is a list of imports whose IDs don't fit in a `u32`.
    pub fn new(parents: Vec<Arc<SharedSymbolTable>>) -> Result<ImportContext, IonError> {
        let mut ids = HashMap::new();
        let mut next = ION_1_0_MAX_ID + 1;
        for table in &parents {
            if table.is_system() {
                bail_arg!("the system symbol table cannot be imported explicitly")
            }
            let end = match next.checked_add(table.max_id()) {
                Some(end) => end,
                None => bail_arg!("imports declare more than {} symbols", u32::max_value()),
            };
            for (ix, text) in table.known_prefix().iter().enumerate() {
                if let Some(t) = text {
                    ids.entry(t.clone()).or_insert(next + ix as u32);
                }
            }
            next = end;
        }
        Ok(ImportContext {
            system: system_symbol_table(),
            parents,
            ids,
            local_sid_start: next,
        })
    }

    /// Context with no imports.
    pub fn empty() -> ImportContext {
        ImportContext {
            system: system_symbol_table(),
            parents: Vec::new(),
            ids: HashMap::new(),
            local_sid_start: ION_1_0_MAX_ID + 1,
        }
    }

    /// Looks `text` up in the system table, then the imports.
    pub fn try_get(&self, text: &str) -> Option<u32> {
        self.system
            .find_symbol(text)
            .or_else(|| self.ids.get(text).cloned())
    }

    /// Resolves a system or imported ID.
    pub fn find_known_symbol(&self, sid: u32) -> Option<&str> {
        if sid <= ION_1_0_MAX_ID {
            return self.system.find_known_symbol(sid);
        }
        let mut base = ION_1_0_MAX_ID;
        for table in &self.parents {
            let max = table.max_id();
            if sid - base <= max {
                return table.find_known_symbol(sid - base);
            }
            base += max;
        }
        None
    }

    /// First ID available to local symbols.
    pub fn local_sid_start(&self) -> u32 { self.local_sid_start }

    pub fn parents(&self) -> &[Arc<SharedSymbolTable>] { &self.parents }

    pub fn has_imports(&self) -> bool { !self.parents.is_empty() }
}

/// A stream's own symbol table: imports plus locally declared symbols.
///
/// Readers build one from each `$ion_symbol_table` struct they process.
#[derive(Clone, Debug)]
pub struct LocalSymbolTable {
    imports: ImportContext,
    names: Vec<Option<String>>,
    ids: HashMap<String, u32>,
    read_only: bool,
}

impl LocalSymbolTable {
    /// An empty, mutable local table on top of `imports`.
    pub fn new(imports: Vec<Arc<SharedSymbolTable>>) -> Result<LocalSymbolTable, IonError> {
        Ok(LocalSymbolTable {
            imports: ImportContext::new(imports)?,
            names: Vec::new(),
            ids: HashMap::new(),
            read_only: false,
        })
    }

    /// A local table that only knows the system symbols.
    pub fn empty() -> LocalSymbolTable {
        LocalSymbolTable {
            imports: ImportContext::empty(),
            names: Vec::new(),
            ids: HashMap::new(),
            read_only: false,
        }
    }

    /// A local table declaring `symbols` in order; `None` entries are gaps.
    pub fn with_symbols<I>(
        imports: Vec<Arc<SharedSymbolTable>>,
        symbols: I,
    ) -> Result<LocalSymbolTable, IonError>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut table = LocalSymbolTable::new(imports)?;
        for text in symbols {
            table.declare(text)?;
        }
        Ok(table)
    }

    // Declared symbols always take a slot, even when the text is already known.
    pub(crate) fn declare(&mut self, text: Option<String>) -> Result<u32, IonError> {
        let sid = match self.imports.local_sid_start().checked_add(self.names.len() as u32) {
            Some(sid) => sid,
            None => bail_arg!("no symbol IDs left for local symbols"),
        };
        if let Some(t) = &text {
            self.ids.entry(t.clone()).or_insert(sid);
        }
        self.names.push(text);
        Ok(sid)
    }

    pub fn import_context(&self) -> &ImportContext { &self.imports }
}

impl SymbolTable for LocalSymbolTable {
    fn kind(&self) -> SymbolTableKind { SymbolTableKind::Local }

    fn name(&self) -> Option<&str> { None }

    fn version(&self) -> u32 { 0 }

    fn is_read_only(&self) -> bool { self.read_only }

    fn make_read_only(&mut self) { self.read_only = true }

    fn imported_tables(&self) -> &[Arc<SharedSymbolTable>] { self.imports.parents() }

    fn imported_max_id(&self) -> u32 { self.imports.local_sid_start() - 1 }

    fn max_id(&self) -> u32 { self.imported_max_id() + self.names.len() as u32 }

    fn find(&self, text: &str) -> Option<SymbolToken> {
        self.imports
            .try_get(text)
            .or_else(|| self.ids.get(text).cloned())
            .map(|sid| SymbolToken::new(Some(text.to_string()), Some(sid)))
    }

    fn find_known_symbol(&self, sid: u32) -> Option<&str> {
        let start = self.imports.local_sid_start();
        if sid < start {
            self.imports.find_known_symbol(sid)
        } else {
            self.names
                .get((sid - start) as usize)
                .and_then(Option::as_deref)
        }
    }

    fn intern(&mut self, text: &str) -> Result<SymbolToken, IonError> {
        if let Some(token) = self.find(text) {
            return Ok(token);
        }
        if self.read_only {
            bail_state!("cannot intern `{}` into a read-only local symbol table", text)
        }
        let sid = self.declare(Some(text.to_string()))?;
        Ok(SymbolToken::new(Some(text.to_string()), Some(sid)))
    }

    fn declared_symbols(&self) -> Box<dyn Iterator<Item = Option<&str>> + '_> {
        Box::new(self.names.iter().map(Option::as_deref))
    }
}
