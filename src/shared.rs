use log::warn;
use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use crate::{
    errors::IonError,
    symbols::{SymbolTable, SymbolTableKind, SymbolToken, ION, ION_1_0, SYSTEM_SYMBOLS},
};

/// A named, versioned, immutable symbol table. The system table is the one named `$ion`.
///
/// Shared tables are built once and handed around as `Arc<SharedSymbolTable>`.
#[derive(Clone, Debug)]
pub struct SharedSymbolTable {
    name: String,
    version: u32,
    names: Vec<Option<String>>,
    ids: HashMap<String, u32>,
    // Exceeds `names.len()` only for substitutes; the IDs past `names` are gaps.
    max_id: u32,
}

static SYSTEM: OnceLock<Arc<SharedSymbolTable>> = OnceLock::new();

/// The process-wide Ion 1.0 system table.
pub fn system_symbol_table() -> Arc<SharedSymbolTable> {
    SYSTEM
        .get_or_init(|| {
            let mut table = SharedSymbolTable::empty(ION, 1);
            for text in SYSTEM_SYMBOLS.iter() {
                table.push(Some(text));
            }
            Arc::new(table)
        })
        .clone()
}

/// The system table for a given version of the format.
///
/// # Errors
///
/// Only version 1 exists; anything else is [`IonError::InvalidArgument`].
pub fn system_table(version: u32) -> Result<Arc<SharedSymbolTable>, IonError> {
    if version != 1 {
        bail_arg!("no system symbol table for version {}", version)
    }
    Ok(system_symbol_table())
}

impl SharedSymbolTable {
    fn empty(name: &str, version: u32) -> Self {
        SharedSymbolTable {
            name: name.to_string(),
            version,
            names: Vec::new(),
            ids: HashMap::new(),
            max_id: 0,
        }
    }

    // First occurrence of a name keeps its ID; later duplicates still occupy a slot.
    fn push(&mut self, text: Option<&str>) {
        let sid = self.names.len() as u32 + 1;
        if let Some(t) = text {
            self.ids.entry(t.to_string()).or_insert(sid);
        }
        self.names.push(text.map(str::to_string));
        self.max_id = sid;
    }

    /// Builds a shared table.
    ///
    /// The prior version's symbols are carried over in order, duplicates included, then each
    /// new symbol the table doesn't already know is appended.
    ///
    /// # Arguments
    ///
    /// * `name: &str` - The table name, must not be empty.
    /// * `version: u32` - Must be at least 1.
    /// * `prior: Option<&dyn SymbolTable>` - The previous version of the table, if any.
    /// * `symbols` - New symbol texts.
    ///
    /// # Errors
    ///
    /// [`IonError::InvalidArgument`] for an empty name or a zero version.
    ///
    /// # Example
    ///
    /// ```
    /// use ionbin::{shared::SharedSymbolTable, symbols::SymbolTable};
    ///
    /// let v1 = SharedSymbolTable::new("colors", 1, None, vec!["red", "green"]).unwrap();
    /// let v2 = SharedSymbolTable::new("colors", 2, Some(&v1), vec!["green", "blue"]).unwrap();
    ///
    /// assert_eq!(v2.max_id(), 3);
    /// assert_eq!(v2.find_symbol("blue"), Some(3));
    /// ```
    pub fn new<I, S>(
        name: &str,
        version: u32,
        prior: Option<&dyn SymbolTable>,
        symbols: I,
    ) -> Result<SharedSymbolTable, IonError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if name.is_empty() {
            bail_arg!("shared symbol table name must not be empty")
        }
        if version < 1 {
            bail_arg!("shared symbol table version must be at least 1")
        }
        let mut table = SharedSymbolTable::empty(name, version);
        if let Some(prior) = prior {
            for text in prior.declared_symbols() {
                table.push(text);
            }
        }
        for text in symbols {
            let text = text.as_ref();
            if !table.ids.contains_key(text) {
                table.push(Some(text));
            }
        }
        Ok(table)
    }

    /// Stands in for an import that could not be found, or was found with a different
    /// `max_id`. Symbols `original` declares up to `max_id` are kept, the rest are gaps that
    /// take no memory.
    pub fn substitute(
        original: Option<&SharedSymbolTable>,
        name: &str,
        version: u32,
        max_id: u32,
    ) -> SharedSymbolTable {
        warn!(
            "substituting import {} version {} with max_id {}",
            name, version, max_id
        );
        let mut table = SharedSymbolTable::empty(name, version);
        if let Some(o) = original {
            for text in o.names.iter().take(max_id as usize) {
                table.push(text.as_deref());
            }
        }
        table.max_id = max_id;
        table
    }

    /// The declared slots backed by names; IDs after these up to `max_id` are gaps.
    pub(crate) fn known_prefix(&self) -> &[Option<String>] { &self.names }

    pub fn is_system(&self) -> bool { self.name == ION }

    /// `$ion_1_0` for the system table, `None` otherwise.
    pub fn ion_version_id(&self) -> Option<&'static str> {
        if self.is_system() {
            Some(ION_1_0)
        } else {
            None
        }
    }
}

impl SymbolTable for SharedSymbolTable {
    fn kind(&self) -> SymbolTableKind {
        if self.is_system() {
            SymbolTableKind::System
        } else {
            SymbolTableKind::Shared
        }
    }

    fn name(&self) -> Option<&str> { Some(&self.name) }

    fn version(&self) -> u32 { self.version }

    fn is_read_only(&self) -> bool { true }

    fn make_read_only(&mut self) {}

    fn imported_tables(&self) -> &[Arc<SharedSymbolTable>] { &[] }

    fn imported_max_id(&self) -> u32 { 0 }

    fn max_id(&self) -> u32 { self.max_id }

    fn find(&self, text: &str) -> Option<SymbolToken> {
        self.ids
            .get(text)
            .map(|sid| SymbolToken::new(Some(text.to_string()), Some(*sid)))
    }

    fn find_symbol(&self, text: &str) -> Option<u32> { self.ids.get(text).cloned() }

    fn find_known_symbol(&self, sid: u32) -> Option<&str> {
        if sid == 0 {
            return None;
        }
        self.names.get(sid as usize - 1).and_then(Option::as_deref)
    }

    fn intern(&mut self, text: &str) -> Result<SymbolToken, IonError> {
        match self.find(text) {
            Some(token) => Ok(token),
            None => bail_state!("cannot intern `{}` into read-only table {}", text, self.name),
        }
    }

    fn declared_symbols(&self) -> Box<dyn Iterator<Item = Option<&str>> + '_> {
        let gaps = (self.max_id as usize).saturating_sub(self.names.len());
        Box::new(
            self.names
                .iter()
                .map(Option::as_deref)
                .chain(std::iter::repeat(None).take(gaps)),
        )
    }
}
