//! Nullable, FIRST and FOLLOW set computation.
//!
//! Three successive fixed-point passes over the productions, in the style of
//! Aho et al., "Compilers: Principles, Techniques, and Tools" (2nd Edition),
//! section 4.4. Each pass terminates when a full sweep adds nothing.

use std::collections::BTreeSet;

use crate::grammar::Grammar;
use crate::symbol::SymbolId;

/// Runs the nullable, FIRST and FOLLOW passes in order.
pub fn compute_sets(grammar: &mut Grammar) {
    compute_nullable(grammar);
    compute_first(grammar);
    compute_follow(grammar);
}

/// Marks every nonterminal that can derive the empty string.
///
/// A production is nullable iff every rhs symbol is nullable; the empty rhs
/// is nullable by definition. Terminals are never nullable.
pub fn compute_nullable(grammar: &mut Grammar) {
    let mut changed = true;
    while changed {
        changed = false;

        for i in 0..grammar.productions.len() {
            let lhs = grammar.productions[i].lhs;
            if grammar.nonterminals[&lhs].nullable {
                continue;
            }
            if sequence_nullable(grammar, &grammar.productions[i].rhs) {
                grammar.nonterminals[&lhs].nullable = true;
                changed = true;
            }
        }
    }
}

/// Checks whether every symbol of a sequence is nullable.
pub fn sequence_nullable(grammar: &Grammar, symbols: &[SymbolId]) -> bool {
    symbols.iter().all(|&sym| {
        grammar.symbols.is_nonterminal(sym) && grammar.nonterminals[&sym].nullable
    })
}

/// Computes the FIRST set of every nonterminal.
///
/// `FIRST(terminal) = {terminal}`; `FIRST(A)` is the union of `FIRST(α)`
/// over A's productions. The loop tracks set sizes and runs while any set
/// grew during a pass.
pub fn compute_first(grammar: &mut Grammar) {
    let mut changed = true;
    while changed {
        changed = false;

        for i in 0..grammar.productions.len() {
            let lhs = grammar.productions[i].lhs;
            let firsts = first_of_sequence(grammar, &grammar.productions[i].rhs);

            let nonterminal = &mut grammar.nonterminals[&lhs];
            let before = nonterminal.first.len();
            nonterminal.first.extend(firsts);
            if nonterminal.first.len() > before {
                changed = true;
            }
        }
    }
}

/// FIRST of a symbol sequence: FIRST(X₁), then FIRST(X₂) while X₁ is
/// nullable, and so on through the nullable prefix.
pub fn first_of_sequence(grammar: &Grammar, symbols: &[SymbolId]) -> BTreeSet<SymbolId> {
    let mut result = BTreeSet::new();
    for &sym in symbols {
        if grammar.symbols.is_terminal(sym) {
            result.insert(sym);
            break;
        }
        let nonterminal = &grammar.nonterminals[&sym];
        result.extend(nonterminal.first.iter().copied());
        if !nonterminal.nullable {
            break;
        }
    }
    result
}

/// Computes the FOLLOW set of every nonterminal.
///
/// For each production `A → X₁…Xₙ` and nonterminal `Xᵢ`:
/// `FOLLOW(Xᵢ) ⊇ FIRST(Xᵢ₊₁…Xₙ)`, and when that suffix is nullable
/// (including `i = n`) also `FOLLOW(Xᵢ) ⊇ FOLLOW(A)`. The `$end` seed on
/// the start symbol comes from augmentation.
pub fn compute_follow(grammar: &mut Grammar) {
    let mut changed = true;
    while changed {
        changed = false;

        for i in 0..grammar.productions.len() {
            let production = grammar.productions[i].clone();

            for (pos, &sym) in production.rhs.iter().enumerate() {
                if !grammar.symbols.is_nonterminal(sym) {
                    continue;
                }

                let beta = &production.rhs[pos + 1..];
                let mut additions = first_of_sequence(grammar, beta);
                if sequence_nullable(grammar, beta) {
                    additions.extend(grammar.nonterminals[&production.lhs].follow.iter().copied());
                }

                let nonterminal = &mut grammar.nonterminals[&sym];
                let before = nonterminal.follow.len();
                nonterminal.follow.extend(additions);
                if nonterminal.follow.len() > before {
                    changed = true;
                }
            }
        }
    }
}
