//! Interned grammar symbols.
//!
//! Symbol names are interned to small integer ids in first-seen order. The
//! table keeps two parallel structures: a vector indexed by id (for
//! deterministic iteration and emission) and a hash index from name to id
//! (for lookup).

use std::collections::HashMap;
use std::fmt;

/// A symbol id. Reserved ids occupy the low range; user symbols are
/// interned from [`FIRST_USER_ID`] upward.
pub type SymbolId = usize;

/// Id of the `$accept` pseudo-nonterminal.
pub const ACCEPT: SymbolId = 0;
/// Id of the `$end` end-of-input marker.
pub const END: SymbolId = 1;
/// Id of the reserved `error` terminal used by panic-mode recovery.
pub const ERROR: SymbolId = 2;
/// First id handed out to user symbols.
pub const FIRST_USER_ID: SymbolId = 3;

/// Whether a symbol is a leaf or has productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
}

/// The interned symbol table of a grammar.
///
/// # Examples
/// ```
/// use lalr_gen::symbol::{SymbolTable, SymbolKind, FIRST_USER_ID};
///
/// let mut table = SymbolTable::new();
/// let id = table.intern("expr");
/// assert_eq!(id, FIRST_USER_ID);
/// table.mark_nonterminal(id);
/// assert_eq!(table.kind(id), SymbolKind::Nonterminal);
/// assert_eq!(table.lookup("expr"), Some(id));
/// ```
#[derive(Debug, Clone)]
pub struct SymbolTable {
    names: Vec<String>,
    kinds: Vec<SymbolKind>,
    index: HashMap<String, SymbolId>,
}

impl SymbolTable {
    /// Creates a table holding only the reserved symbols.
    pub fn new() -> Self {
        let mut table = Self {
            names: Vec::new(),
            kinds: Vec::new(),
            index: HashMap::new(),
        };

        // Reserved set: ids 0..3 are fixed by convention.
        table.push("$accept", SymbolKind::Nonterminal);
        table.push("$end", SymbolKind::Terminal);
        table.push("error", SymbolKind::Terminal);
        table
    }

    fn push(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        let id = self.names.len();
        self.names.push(name.to_string());
        self.kinds.push(kind);
        self.index.insert(name.to_string(), id);
        id
    }

    /// Interns a symbol name, returning its id.
    ///
    /// New names are classified as terminals until a production for them is
    /// seen; see [`SymbolTable::mark_nonterminal`].
    pub fn intern(&mut self, name: &str) -> SymbolId {
        match self.index.get(name) {
            Some(&id) => id,
            None => self.push(name, SymbolKind::Terminal),
        }
    }

    /// Reclassifies a symbol as a nonterminal.
    pub fn mark_nonterminal(&mut self, id: SymbolId) {
        self.kinds[id] = SymbolKind::Nonterminal;
    }

    /// Looks up a symbol id by name.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.index.get(name).copied()
    }

    /// Returns the name of a symbol.
    pub fn name(&self, id: SymbolId) -> &str {
        &self.names[id]
    }

    /// Returns the kind of a symbol.
    pub fn kind(&self, id: SymbolId) -> SymbolKind {
        self.kinds[id]
    }

    #[inline]
    pub fn is_terminal(&self, id: SymbolId) -> bool {
        self.kinds[id] == SymbolKind::Terminal
    }

    #[inline]
    pub fn is_nonterminal(&self, id: SymbolId) -> bool {
        self.kinds[id] == SymbolKind::Nonterminal
    }

    /// Number of interned symbols, reserved set included.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All symbol ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        0..self.names.len()
    }

    /// Terminal ids in insertion order.
    pub fn terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.ids().filter(|&id| self.is_terminal(id))
    }

    /// Nonterminal ids in insertion order.
    pub fn nonterminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.ids().filter(|&id| self.is_nonterminal(id))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.ids() {
            writeln!(f, "{} {}", id, self.names[id])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_symbols() {
        let table = SymbolTable::new();
        assert_eq!(table.lookup("$accept"), Some(ACCEPT));
        assert_eq!(table.lookup("$end"), Some(END));
        assert_eq!(table.lookup("error"), Some(ERROR));
        assert!(table.is_nonterminal(ACCEPT));
        assert!(table.is_terminal(END));
        assert!(table.is_terminal(ERROR));
    }

    #[test]
    fn test_intern_first_seen_order() {
        let mut table = SymbolTable::new();
        let e = table.intern("E");
        let plus = table.intern("+");
        assert_eq!(e, FIRST_USER_ID);
        assert_eq!(plus, FIRST_USER_ID + 1);
        // Interning again returns the same id.
        assert_eq!(table.intern("E"), e);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_mark_nonterminal() {
        let mut table = SymbolTable::new();
        let e = table.intern("E");
        assert!(table.is_terminal(e));
        table.mark_nonterminal(e);
        assert!(table.is_nonterminal(e));
    }
}
