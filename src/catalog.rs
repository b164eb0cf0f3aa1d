use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::{shared::SharedSymbolTable, symbols::SymbolTable};

/// Shared symbol tables a reader may resolve imports against, keyed by name and version.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, BTreeMap<u32, Arc<SharedSymbolTable>>>,
}

impl Catalog {
    pub fn new() -> Self { Catalog::default() }

    /// Adds a table, replacing any table with the same name and version.
    pub fn put_table(&mut self, table: Arc<SharedSymbolTable>) {
        let name = table.name().unwrap_or_default().to_string();
        self.tables
            .entry(name)
            .or_insert_with(BTreeMap::new)
            .insert(table.version(), table);
    }

    /// The highest version of the named table.
    pub fn get_table(&self, name: &str) -> Option<Arc<SharedSymbolTable>> {
        self.tables
            .get(name)
            .and_then(|versions| versions.values().next_back())
            .cloned()
    }

    /// The exact version if present, otherwise the highest version available.
    pub fn get_table_version(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>> {
        let versions = self.tables.get(name)?;
        versions
            .get(&version)
            .or_else(|| versions.values().next_back())
            .cloned()
    }

    pub fn is_empty(&self) -> bool { self.tables.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_match() {
        let mut cat = Catalog::new();
        for v in 1..4 {
            cat.put_table(Arc::new(
                SharedSymbolTable::new("t", v, None, vec!["a"]).unwrap(),
            ));
        }
        assert_eq!(cat.get_table("t").unwrap().version(), 3);
        assert_eq!(cat.get_table_version("t", 2).unwrap().version(), 2);
        assert_eq!(cat.get_table_version("t", 9).unwrap().version(), 3);
        assert!(cat.get_table("nope").is_none());
    }
}
