//! The generator: a grammar specification in, parse tables out.
//!
//! `Generator::new` runs the whole pipeline synchronously — load and
//! augment, fixed-point sets, canonical collection, lookaheads, table —
//! and owns every result. Generation is purely computational and
//! deterministic: equal inputs produce identical state numbering, tables
//! and resolution logs.

use crate::error::Result;
use crate::first_follow;
use crate::grammar::Grammar;
use crate::lalr::{self, State};
use crate::parser::Parser;
use crate::spec::{GrammarSpec, Options};
use crate::table::{self, ParseTable, Resolution};

/// A parser generator run: the grammar plus everything computed from it.
#[derive(Debug, Clone)]
pub struct Generator {
    grammar: Grammar,
    states: Vec<State>,
    table: ParseTable,
    resolutions: Vec<Resolution>,
    conflicts: usize,
    options: Options,
}

impl Generator {
    /// Builds the LALR(1) automaton and parse table for a specification.
    pub fn new(spec: &GrammarSpec) -> Result<Self> {
        let mut grammar = Grammar::from_spec(spec)?;
        first_follow::compute_sets(&mut grammar);

        let mut states = lalr::build_states(&grammar);
        lalr::assign_lookaheads(&mut states, &grammar);

        let build = table::build_table(&grammar, &states, &spec.options);

        Ok(Self {
            grammar,
            states,
            table: build.table,
            resolutions: build.resolutions,
            conflicts: build.conflicts,
            options: spec.options.clone(),
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    /// The per-cell conflict audit log.
    pub fn resolutions(&self) -> &[Resolution] {
        &self.resolutions
    }

    /// Number of conflicts resolved by default.
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The validated module name for emission.
    pub fn module_name(&self) -> &str {
        self.options.module_name()
    }

    /// Constructs the runtime parser directly from the in-memory tables.
    pub fn create_parser(&self) -> Parser {
        let symbols = self.grammar.symbols();
        Parser {
            symbol_map: symbols
                .ids()
                .map(|id| (symbols.name(id).to_string(), id))
                .collect(),
            terminal_names: symbols
                .terminals()
                .map(|id| (id, symbols.name(id).to_string()))
                .collect(),
            production_table: self.grammar.production_table(),
            table: self.table.clone(),
        }
    }
}
