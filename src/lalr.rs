//! LR(0) item sets, the canonical collection, and LALR(1) lookaheads.
//!
//! States are LR(0) closures identified by the sorted list of their item
//! keys `(production, dot)` — lookaheads never participate in identity,
//! which is what merges canonical-LR states into the LALR automaton.
//! Lookaheads are assigned afterwards from the FOLLOW sets.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use indexmap::IndexMap;

use crate::grammar::Grammar;
use crate::symbol::{self, SymbolId};

/// An LR(0) item with merged LALR(1) lookaheads.
///
/// Two items are considered the same item iff they share production and dot;
/// lookahead sets are merged rather than distinguishing items.
#[derive(Debug, Clone)]
pub struct Item {
    pub production: usize,
    pub dot: usize,
    pub lookaheads: BTreeSet<SymbolId>,
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.production == other.production && self.dot == other.dot
    }
}

impl Eq for Item {}

impl std::hash::Hash for Item {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.production.hash(state);
        self.dot.hash(state);
    }
}

impl Item {
    pub fn new(production: usize, dot: usize) -> Self {
        Self {
            production,
            dot,
            lookaheads: BTreeSet::new(),
        }
    }

    /// The symbol after the dot, or `None` for a reduction item.
    pub fn next_symbol(&self, grammar: &Grammar) -> Option<SymbolId> {
        grammar.production(self.production).rhs.get(self.dot).copied()
    }

    pub fn is_reduction(&self, grammar: &Grammar) -> bool {
        self.dot >= grammar.production(self.production).rhs.len()
    }

    /// The LR(0) identity key.
    pub fn key(&self) -> (usize, usize) {
        (self.production, self.dot)
    }
}

/// A state of the automaton: an LR(0) closure plus its transition map and
/// reduction bookkeeping.
#[derive(Debug, Clone)]
pub struct State {
    pub id: usize,
    pub items: Vec<Item>,
    /// Outgoing transitions, in the deterministic order they were found.
    pub transitions: IndexMap<SymbolId, usize>,
    /// Indices into `items` of the reduction items.
    pub reductions: Vec<usize>,
    pub has_shifts: bool,
    pub has_conflicts: bool,
    /// Reverse edges: which states reach this one on which symbol.
    pub predecessors: HashMap<SymbolId, Vec<usize>>,
    identity: Vec<(usize, usize)>,
}

impl State {
    fn new(id: usize, items: Vec<Item>, grammar: &Grammar) -> Self {
        let mut reductions = Vec::new();
        let mut has_shifts = false;
        for (i, item) in items.iter().enumerate() {
            match item.next_symbol(grammar) {
                Some(sym) if grammar.symbols().is_terminal(sym) => has_shifts = true,
                Some(_) => {}
                None => reductions.push(i),
            }
        }
        let has_conflicts =
            reductions.len() > 1 || (!reductions.is_empty() && has_shifts);

        let mut identity: Vec<(usize, usize)> = items.iter().map(Item::key).collect();
        identity.sort_unstable();

        Self {
            id,
            items,
            transitions: IndexMap::new(),
            reductions,
            has_shifts,
            has_conflicts,
            predecessors: HashMap::new(),
            identity,
        }
    }

    /// The canonical identity: the sorted LR(0) item keys. Memoized at
    /// construction because the collection queries it repeatedly.
    pub fn identity(&self) -> &[(usize, usize)] {
        &self.identity
    }

    /// The reduction items of this state.
    pub fn reduction_items(&self) -> impl Iterator<Item = &Item> {
        self.reductions.iter().map(|&i| &self.items[i])
    }
}

/// Expands an item set to its closure.
///
/// Each nonterminal appearing after a dot is expanded exactly once per
/// closure; expanding it adds `[X → ·γ]` for every production of X.
pub fn closure(grammar: &Grammar, kernel: Vec<Item>) -> Vec<Item> {
    let mut items = kernel;
    let mut seen: HashSet<(usize, usize)> = items.iter().map(Item::key).collect();
    let mut expanded: HashSet<SymbolId> = HashSet::new();

    let mut i = 0;
    while i < items.len() {
        if let Some(sym) = items[i].next_symbol(grammar) {
            if grammar.symbols().is_nonterminal(sym) && expanded.insert(sym) {
                for &production in &grammar.nonterminal(sym).productions {
                    if seen.insert((production, 0)) {
                        items.push(Item::new(production, 0));
                    }
                }
            }
        }
        i += 1;
    }
    items
}

/// The kernel of `goto(state, symbol)`: every item with the dot before
/// `symbol`, advanced by one.
fn goto_kernel(grammar: &Grammar, state: &State, symbol: SymbolId) -> Vec<Item> {
    state
        .items
        .iter()
        .filter(|item| item.next_symbol(grammar) == Some(symbol))
        .map(|item| Item::new(item.production, item.dot + 1))
        .collect()
}

/// Builds the canonical collection of LR(0) item sets.
///
/// Worklist construction from the closure of `{[$accept → ·S $end]}`. A
/// goto target whose identity already exists is merged: the transition is
/// recorded and the source state is appended to the target's predecessor
/// list for that symbol.
pub fn build_states(grammar: &Grammar) -> Vec<State> {
    let mut start_item = Item::new(0, 0);
    start_item.lookaheads.insert(symbol::END);
    let start_items = closure(grammar, vec![start_item]);

    let mut states = vec![State::new(0, start_items, grammar)];
    let mut index: HashMap<Vec<(usize, usize)>, usize> = HashMap::new();
    index.insert(states[0].identity.clone(), 0);

    let mut queue: VecDeque<usize> = VecDeque::new();
    queue.push_back(0);

    while let Some(source) = queue.pop_front() {
        // Symbols after a dot, in item order, each once.
        let mut next_symbols: Vec<SymbolId> = Vec::new();
        for item in &states[source].items {
            if let Some(sym) = item.next_symbol(grammar) {
                if !next_symbols.contains(&sym) {
                    next_symbols.push(sym);
                }
            }
        }

        for sym in next_symbols {
            let kernel = goto_kernel(grammar, &states[source], sym);
            if kernel.is_empty() {
                continue;
            }
            let closed = closure(grammar, kernel);
            let mut identity: Vec<(usize, usize)> = closed.iter().map(Item::key).collect();
            identity.sort_unstable();

            let target = match index.get(&identity) {
                Some(&existing) => existing,
                None => {
                    let id = states.len();
                    states.push(State::new(id, closed, grammar));
                    index.insert(identity, id);
                    queue.push_back(id);
                    id
                }
            };
            states[source].transitions.insert(sym, target);
            states[target]
                .predecessors
                .entry(sym)
                .or_default()
                .push(source);
        }
    }

    states
}

/// Assigns LALR(1) lookaheads to every reduction item.
///
/// This is the FOLLOW-set approximation: each reduction item `[A → α·]`
/// receives `FOLLOW(A)` wholesale rather than per-channel lookaheads.
pub fn assign_lookaheads(states: &mut [State], grammar: &Grammar) {
    for state in states {
        for &i in &state.reductions {
            let lhs = grammar.production(state.items[i].production).lhs;
            state.items[i].lookaheads = grammar.nonterminal(lhs).follow.clone();
        }
    }
}
