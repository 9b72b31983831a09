//! Grammar loading and normalization.
//!
//! This module turns a [`GrammarSpec`] into the immutable [`Grammar`] the
//! rest of the pipeline works on: symbols interned to ids, productions
//! numbered, operator precedence levels assigned, semantic actions rewritten,
//! and the grammar augmented with the synthetic accept production.

use std::collections::BTreeSet;
use std::str::FromStr;

use indexmap::IndexMap;
use log::warn;

use crate::actions::{self, ActionGroups};
use crate::error::{Error, Result};
use crate::spec::GrammarSpec;
use crate::symbol::{self, SymbolId, SymbolTable, FIRST_USER_ID};

/// A production rule `A → X₁ X₂ … Xₙ`.
///
/// Productions are immutable after grammar loading. Id 0 is reserved for the
/// accept production; user productions are numbered from 1 in declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub id: usize,
    pub lhs: SymbolId,
    pub rhs: Vec<SymbolId>,
    /// Operator precedence level; 0 means unspecified.
    pub precedence: usize,
    /// Rewritten semantic action body, if any.
    pub action: Option<String>,
}

/// Per-nonterminal data filled in by the fixed-point computations.
#[derive(Debug, Clone, Default)]
pub struct Nonterminal {
    /// Ids of the productions with this nonterminal on the left.
    pub productions: Vec<usize>,
    pub nullable: bool,
    pub first: BTreeSet<SymbolId>,
    pub follow: BTreeSet<SymbolId>,
}

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    NonAssoc,
}

impl FromStr for Assoc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(Assoc::Left),
            "right" => Ok(Assoc::Right),
            "nonassoc" => Ok(Assoc::NonAssoc),
            other => Err(Error::InvalidAssociativity(other.to_string())),
        }
    }
}

/// Precedence and associativity of one operator terminal.
///
/// Higher level binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorEntry {
    pub precedence: usize,
    pub assoc: Assoc,
}

/// A normalized, augmented grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) symbols: SymbolTable,
    /// All productions, indexed by id; `[0]` is `$accept → S $end`.
    pub(crate) productions: Vec<Production>,
    pub(crate) nonterminals: IndexMap<SymbolId, Nonterminal>,
    /// Operator table keyed by terminal name.
    pub(crate) operators: IndexMap<String, OperatorEntry>,
    pub(crate) start: SymbolId,
    pub(crate) action_groups: ActionGroups,
    pub(crate) parse_params: Vec<String>,
    pub(crate) action_include: Option<String>,
    pub(crate) module_include: Option<String>,
}

impl Grammar {
    /// Normalizes and augments a grammar specification.
    pub fn from_spec(spec: &GrammarSpec) -> Result<Self> {
        if spec.bnf.is_empty() {
            return Err(Error::EmptyGrammar);
        }

        let operators = process_operators(spec)?;
        let mut symbols = SymbolTable::new();
        let mut nonterminals: IndexMap<SymbolId, Nonterminal> = IndexMap::new();
        let mut action_groups = ActionGroups::new();
        let mut productions: Vec<Production> = Vec::new();
        let mut next_id = 1;

        for (lhs_name, rule) in &spec.bnf {
            let lhs = symbols.intern(lhs_name);
            symbols.mark_nonterminal(lhs);
            nonterminals.entry(lhs).or_default();

            for alt in rule.alternatives() {
                let (raw_rhs, action, prec) = alt.parts();
                let (rhs_names, name_map) = actions::process_rhs(&raw_rhs);
                let rhs: Vec<SymbolId> =
                    rhs_names.iter().map(|name| symbols.intern(name)).collect();

                let action = action.map(|body| {
                    let body = actions::rewrite(body, rhs.len(), &name_map);
                    action_groups.add(&body, next_id);
                    body
                });

                let precedence = match prec {
                    Some(op) => match operators.get(op) {
                        Some(entry) => entry.precedence,
                        None => {
                            warn!("prec declares unknown operator `{}`", op);
                            0
                        }
                    },
                    None => 0,
                };

                productions.push(Production {
                    id: next_id,
                    lhs,
                    rhs,
                    precedence,
                    action,
                });
                nonterminals[&lhs].productions.push(next_id);
                next_id += 1;
            }
        }

        // Inherited precedence needs the final terminal classification, so
        // it runs after the whole bnf map is processed.
        for production in &mut productions {
            if production.precedence == 0 {
                for &sym in production.rhs.iter().rev() {
                    if symbols.is_terminal(sym) {
                        if let Some(entry) = operators.get(symbols.name(sym)) {
                            production.precedence = entry.precedence;
                            break;
                        }
                    }
                }
            }
        }

        if let Some(tokens) = &spec.tokens {
            let declared = tokens.names().len();
            let discovered = symbols
                .terminals()
                .filter(|&id| id >= FIRST_USER_ID)
                .count();
            if declared != discovered {
                warn!(
                    "Declared {} tokens but the grammar uses {} terminals",
                    declared, discovered
                );
            }
        }

        let start = match &spec.start {
            Some(name) => match symbols.lookup(name) {
                Some(id) if symbols.is_nonterminal(id) => id,
                _ => return Err(Error::UnknownStartSymbol(name.clone())),
            },
            // Default start symbol is the lhs of the first rule.
            None => *nonterminals.keys().next().ok_or(Error::EmptyGrammar)?,
        };

        // Augment: $accept → S $end, production id 0.
        productions.insert(
            0,
            Production {
                id: 0,
                lhs: symbol::ACCEPT,
                rhs: vec![start, symbol::END],
                precedence: 0,
                action: None,
            },
        );
        nonterminals.insert(
            symbol::ACCEPT,
            Nonterminal {
                productions: vec![0],
                ..Nonterminal::default()
            },
        );
        nonterminals[&start].follow.insert(symbol::END);

        Ok(Self {
            symbols,
            productions,
            nonterminals,
            operators,
            start,
            action_groups,
            parse_params: spec.parse_params.clone().unwrap_or_default(),
            action_include: spec.action_include.clone(),
            module_include: spec.module_include.clone(),
        })
    }

    /// The interned symbol table.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// All productions, accept production first.
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: usize) -> &Production {
        &self.productions[id]
    }

    /// Data for a nonterminal symbol.
    pub fn nonterminal(&self, id: SymbolId) -> &Nonterminal {
        &self.nonterminals[&id]
    }

    /// Nonterminals in insertion order.
    pub fn nonterminals(&self) -> impl Iterator<Item = (SymbolId, &Nonterminal)> {
        self.nonterminals.iter().map(|(&id, nt)| (id, nt))
    }

    pub fn operators(&self) -> &IndexMap<String, OperatorEntry> {
        &self.operators
    }

    /// The operator entry of a terminal, if it has one.
    pub fn operator_of(&self, id: SymbolId) -> Option<&OperatorEntry> {
        self.operators.get(self.symbols.name(id))
    }

    pub fn start_symbol(&self) -> SymbolId {
        self.start
    }

    /// The `(lhs, rhs length)` pairs exposed to the runtime, indexed by
    /// production id.
    pub fn production_table(&self) -> Vec<(SymbolId, usize)> {
        self.productions
            .iter()
            .map(|p| (p.lhs, p.rhs.len()))
            .collect()
    }

    pub fn action_groups(&self) -> &ActionGroups {
        &self.action_groups
    }

    pub fn parse_params(&self) -> &[String] {
        &self.parse_params
    }

    pub fn action_include(&self) -> Option<&str> {
        self.action_include.as_deref()
    }

    pub fn module_include(&self) -> Option<&str> {
        self.module_include.as_deref()
    }

    /// Renders a production as `A → X Y Z` for diagnostics.
    pub fn describe_production(&self, id: usize) -> String {
        let production = &self.productions[id];
        let rhs = if production.rhs.is_empty() {
            "ε".to_string()
        } else {
            production
                .rhs
                .iter()
                .map(|&sym| self.symbols.name(sym))
                .collect::<Vec<_>>()
                .join(" ")
        };
        format!("{} → {}", self.symbols.name(production.lhs), rhs)
    }
}

fn process_operators(spec: &GrammarSpec) -> Result<IndexMap<String, OperatorEntry>> {
    let mut operators = IndexMap::new();
    // Declarations are ordered lowest level first; levels start at 1 so 0
    // can mean "no precedence".
    for (level, decl) in spec.operators.iter().enumerate() {
        if decl.len() < 2 {
            return Err(Error::InvalidOperatorDecl);
        }
        let assoc = decl[0].parse::<Assoc>()?;
        for name in &decl[1..] {
            operators.insert(
                name.clone(),
                OperatorEntry {
                    precedence: level + 1,
                    assoc,
                },
            );
        }
    }
    Ok(operators)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arithmetic_spec() -> GrammarSpec {
        serde_json::from_str(
            r#"{
                "bnf": {
                    "E": ["E + E", "E * E", "( E )", "id"]
                },
                "operators": [["left", "+"], ["left", "*"]]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_load_and_augment() {
        let grammar = Grammar::from_spec(&arithmetic_spec()).unwrap();

        // Four user productions plus the accept production.
        assert_eq!(grammar.productions().len(), 5);
        let accept = grammar.production(0);
        assert_eq!(accept.lhs, symbol::ACCEPT);
        assert_eq!(accept.rhs[1], symbol::END);
        assert_eq!(accept.rhs[0], grammar.start_symbol());

        // FOLLOW(S) is seeded with $end at augmentation time.
        assert!(grammar
            .nonterminal(grammar.start_symbol())
            .follow
            .contains(&symbol::END));
    }

    #[test]
    fn test_inherited_precedence() {
        let grammar = Grammar::from_spec(&arithmetic_spec()).unwrap();

        // E → E + E inherits the precedence of `+`, E → E * E of `*`.
        assert_eq!(grammar.production(1).precedence, 1);
        assert_eq!(grammar.production(2).precedence, 2);
        // E → ( E ) has no operator terminal.
        assert_eq!(grammar.production(3).precedence, 0);
    }

    #[test]
    fn test_explicit_prec_wins() {
        let spec: GrammarSpec = serde_json::from_str(
            r#"{
                "bnf": {
                    "E": [["E - E", {"prec": "*"}], "id"]
                },
                "operators": [["left", "-"], ["left", "*"]]
            }"#,
        )
        .unwrap();
        let grammar = Grammar::from_spec(&spec).unwrap();
        assert_eq!(grammar.production(1).precedence, 2);
    }

    #[test]
    fn test_empty_grammar_is_fatal() {
        let spec = GrammarSpec::default();
        assert!(matches!(
            Grammar::from_spec(&spec),
            Err(Error::EmptyGrammar)
        ));
    }

    #[test]
    fn test_unknown_start_is_fatal() {
        let mut spec = arithmetic_spec();
        spec.start = Some("id".to_string());
        assert!(matches!(
            Grammar::from_spec(&spec),
            Err(Error::UnknownStartSymbol(_))
        ));
    }
}
