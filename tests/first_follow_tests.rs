//! Unit tests for the nullable / FIRST / FOLLOW fixed points

mod common;

use common::spec;
use lalr_gen::first_follow::{
    compute_first, compute_follow, compute_nullable, compute_sets, first_of_sequence,
};
use lalr_gen::grammar::Grammar;
use lalr_gen::symbol::{SymbolId, END};

fn sym(grammar: &Grammar, name: &str) -> SymbolId {
    grammar.symbols().lookup(name).expect("symbol should exist")
}

/// `A → B C`, `B → b | ε`, `C → c`.
fn nullable_grammar() -> Grammar {
    let mut grammar = Grammar::from_spec(&spec(
        r#"{"bnf": {"A": ["B C"], "B": ["b", ""], "C": ["c"]}}"#,
    ))
    .unwrap();
    compute_sets(&mut grammar);
    grammar
}

#[test]
fn test_nullable() {
    let grammar = nullable_grammar();
    assert!(grammar.nonterminal(sym(&grammar, "B")).nullable);
    assert!(!grammar.nonterminal(sym(&grammar, "A")).nullable);
    assert!(!grammar.nonterminal(sym(&grammar, "C")).nullable);
}

#[test]
fn test_first_sets() {
    let grammar = nullable_grammar();
    let first_a = &grammar.nonterminal(sym(&grammar, "A")).first;

    // B is nullable, so FIRST(A) reaches through to FIRST(C).
    assert!(first_a.contains(&sym(&grammar, "b")));
    assert!(first_a.contains(&sym(&grammar, "c")));
    assert_eq!(first_a.len(), 2);
}

#[test]
fn test_follow_sets() {
    let grammar = nullable_grammar();

    let follow_b = &grammar.nonterminal(sym(&grammar, "B")).follow;
    assert!(follow_b.contains(&sym(&grammar, "c")));
    assert_eq!(follow_b.len(), 1);

    // The start symbol is seeded with $end by augmentation.
    let follow_a = &grammar.nonterminal(sym(&grammar, "A")).follow;
    assert!(follow_a.contains(&END));
}

#[test]
fn test_follow_through_nullable_suffix() {
    // In S → a B C, a nullable C exposes FOLLOW(S) to B.
    let mut grammar = Grammar::from_spec(&spec(
        r#"{"bnf": {"S": ["a B C"], "B": ["b"], "C": ["c", ""]}}"#,
    ))
    .unwrap();
    compute_sets(&mut grammar);

    let follow_b = &grammar.nonterminal(sym(&grammar, "B")).follow;
    assert!(follow_b.contains(&sym(&grammar, "c")));
    assert!(follow_b.contains(&END));
}

#[test]
fn test_first_of_sequence() {
    let grammar = nullable_grammar();

    let first = first_of_sequence(&grammar, &[sym(&grammar, "B"), sym(&grammar, "C")]);
    assert!(first.contains(&sym(&grammar, "b")));
    assert!(first.contains(&sym(&grammar, "c")));

    // A terminal stops the scan immediately.
    let first = first_of_sequence(&grammar, &[sym(&grammar, "c"), sym(&grammar, "B")]);
    assert_eq!(first.len(), 1);
    assert!(first.contains(&sym(&grammar, "c")));
}

#[test]
fn test_first_of_production_subset_of_lhs() {
    let mut grammar = Grammar::from_spec(&spec(
        r#"{"bnf": {"E": ["E + T", "T"], "T": ["( E )", "id"]}}"#,
    ))
    .unwrap();
    compute_sets(&mut grammar);

    for production in grammar.productions() {
        let first_rhs = first_of_sequence(&grammar, &production.rhs);
        let lhs = grammar.nonterminal(production.lhs);
        assert!(
            first_rhs.is_subset(&lhs.first),
            "FIRST(α) ⊄ FIRST(A) for {}",
            grammar.describe_production(production.id)
        );
    }
}

#[test]
fn test_fixed_point_is_idempotent() {
    let mut grammar = nullable_grammar();

    let snapshot: Vec<_> = grammar
        .nonterminals()
        .map(|(id, nt)| (id, nt.nullable, nt.first.clone(), nt.follow.clone()))
        .collect();

    // A second invocation of each pass must change nothing.
    compute_nullable(&mut grammar);
    compute_first(&mut grammar);
    compute_follow(&mut grammar);

    let again: Vec<_> = grammar
        .nonterminals()
        .map(|(id, nt)| (id, nt.nullable, nt.first.clone(), nt.follow.clone()))
        .collect();
    assert_eq!(snapshot, again);
}
