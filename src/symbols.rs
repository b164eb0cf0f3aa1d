//! Symbol tokens, the symbol table capability and the system symbols every stream starts
//! with.

use std::sync::Arc;

use crate::{errors::IonError, shared::SharedSymbolTable};

/// `$ion`, the name of the system symbol table.
pub const ION: &str = "$ion";
/// `$ion_1_0`, the symbol a version marker decodes to.
pub const ION_1_0: &str = "$ion_1_0";
pub const ION_SYMBOL_TABLE: &str = "$ion_symbol_table";
pub const NAME: &str = "name";
pub const VERSION: &str = "version";
pub const IMPORTS: &str = "imports";
pub const SYMBOLS: &str = "symbols";
pub const MAX_ID: &str = "max_id";
pub const ION_SHARED_SYMBOL_TABLE: &str = "$ion_shared_symbol_table";

pub const ION_SID: u32 = 1;
pub const ION_1_0_SID: u32 = 2;
pub const ION_SYMBOL_TABLE_SID: u32 = 3;
pub const NAME_SID: u32 = 4;
pub const VERSION_SID: u32 = 5;
pub const IMPORTS_SID: u32 = 6;
pub const SYMBOLS_SID: u32 = 7;
pub const MAX_ID_SID: u32 = 8;
pub const ION_SHARED_SYMBOL_TABLE_SID: u32 = 9;

/// Highest symbol ID of the Ion 1.0 system table.
pub const ION_1_0_MAX_ID: u32 = 9;

/// The system symbols in ID order, starting at ID 1.
pub const SYSTEM_SYMBOLS: [&str; 9] = [
    ION,
    ION_1_0,
    ION_SYMBOL_TABLE,
    NAME,
    VERSION,
    IMPORTS,
    SYMBOLS,
    MAX_ID,
    ION_SHARED_SYMBOL_TABLE,
];

/// A symbol as seen by a reader or writer: its text, its ID, or both.
///
/// A missing `sid` means the text has not been interned yet; missing `text` means the ID
/// could not be resolved.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct SymbolToken {
    pub text: Option<String>,
    pub sid: Option<u32>,
}

impl SymbolToken {
    pub fn new(text: Option<String>, sid: Option<u32>) -> Self { SymbolToken { text, sid } }

    /// A token known only by its text.
    pub fn from_text(text: &str) -> Self { SymbolToken::new(Some(text.to_string()), None) }

    /// A token known only by its ID.
    pub fn from_sid(sid: u32) -> Self { SymbolToken::new(None, Some(sid)) }

    /// Compares two tokens after filling in whatever each one lacks from `table`.
    ///
    /// # Arguments
    ///
    /// * `other: &SymbolToken` - The token to compare against.
    /// * `table: &dyn SymbolTable` - Table used to resolve texts and IDs.
    pub fn matches_in(&self, other: &SymbolToken, table: &dyn SymbolTable) -> bool {
        if self == other {
            return true;
        }
        let text = |t: &SymbolToken| -> Option<String> {
            t.text
                .clone()
                .or_else(|| t.sid.and_then(|s| table.find_known_symbol(s)).map(str::to_string))
        };
        let sid = |t: &SymbolToken| t.sid.or_else(|| t.text.as_ref().and_then(|s| table.find_symbol(s)));
        match (text(self), text(other)) {
            (Some(a), Some(b)) => a == b,
            _ => sid(self).is_some() && sid(self) == sid(other),
        }
    }
}

/// What role a table plays.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SymbolTableKind {
    /// The bootstrap table named `$ion`.
    System,
    /// A named, versioned, immutable table that streams import.
    Shared,
    /// A per-stream table built on top of imports.
    Local,
}

/// Bidirectional mapping between symbol text and symbol IDs.
///
/// IDs are 1-based and contiguous; a table's `max_id` counts its own symbols plus those of
/// everything it imports.
pub trait SymbolTable {
    fn kind(&self) -> SymbolTableKind;

    /// Table name; `None` for local tables.
    fn name(&self) -> Option<&str>;

    /// Table version; `0` for local tables.
    fn version(&self) -> u32;

    fn is_read_only(&self) -> bool;

    /// Locks the table against further interning.
    fn make_read_only(&mut self);

    /// The shared tables this one imports, in order.
    fn imported_tables(&self) -> &[Arc<SharedSymbolTable>];

    /// Highest ID covered by the system table and the imports.
    fn imported_max_id(&self) -> u32;

    fn max_id(&self) -> u32;

    /// Looks up `text`, returning its token if the table knows it.
    fn find(&self, text: &str) -> Option<SymbolToken>;

    /// Looks up the ID of `text`.
    fn find_symbol(&self, text: &str) -> Option<u32> { self.find(text).and_then(|t| t.sid) }

    /// Resolves an ID to text. Returns `None` for `0`, for IDs beyond `max_id` and for
    /// declared gaps.
    fn find_known_symbol(&self, sid: u32) -> Option<&str>;

    /// Returns the token for `text`, assigning a new ID if the table is mutable.
    ///
    /// # Errors
    ///
    /// Returns [`IonError::InvalidState`] if `text` is unknown and the table is read-only.
    fn intern(&mut self, text: &str) -> Result<SymbolToken, IonError>;

    /// The symbols this table declares itself, in ID order. Gaps are `None`.
    fn declared_symbols(&self) -> Box<dyn Iterator<Item = Option<&str>> + '_>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::system_symbol_table;

    #[test]
    fn system_ids_line_up() {
        for (ix, text) in SYSTEM_SYMBOLS.iter().enumerate() {
            assert_eq!(system_symbol_table().find_symbol(text), Some(ix as u32 + 1));
        }
        assert_eq!(SYSTEM_SYMBOLS.len() as u32, ION_1_0_MAX_ID);
    }

    #[test]
    fn tokens_match_through_table() {
        let sys = system_symbol_table();
        let by_text = SymbolToken::from_text(NAME);
        let by_sid = SymbolToken::from_sid(NAME_SID);
        assert_ne!(by_text, by_sid);
        assert!(by_text.matches_in(&by_sid, &*sys));
        assert!(!by_text.matches_in(&SymbolToken::from_sid(VERSION_SID), &*sys));
        assert!(SymbolToken::from_sid(40).matches_in(&SymbolToken::from_sid(40), &*sys));
    }
}
