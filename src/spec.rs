//! Structured grammar input.
//!
//! A [`GrammarSpec`] is the pre-parsed description of a grammar: the `bnf`
//! rule map, optional token and operator declarations, a start symbol, and
//! generator options. Specs can be built directly as Rust values or
//! deserialized from JSON; the alternative forms mirror the flexible shapes
//! of the original grammar format (`"rhs"`, `[rhs, action]`, `[rhs, {prec}]`,
//! `[rhs, action, {prec}]`).

use indexmap::IndexMap;
use serde::Deserialize;

/// A complete grammar description handed to the generator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GrammarSpec {
    /// Map from nonterminal name to its alternatives, in declaration order.
    pub bnf: IndexMap<String, RuleSpec>,
    /// Optional declared terminal list.
    pub tokens: Option<TokensSpec>,
    /// Operator precedence declarations, lowest level first. Each entry is
    /// `[assoc, sym, sym, ...]` with assoc one of `left`, `right`, `nonassoc`.
    pub operators: Vec<Vec<String>>,
    /// Explicit start symbol; defaults to the lhs of the first rule.
    #[serde(alias = "startSymbol")]
    pub start: Option<String>,
    /// Extra parameter names threaded into the action dispatcher.
    #[serde(alias = "parseParams")]
    pub parse_params: Option<Vec<String>>,
    /// Opaque preamble for the action dispatcher.
    #[serde(alias = "actionInclude")]
    pub action_include: Option<String>,
    /// Opaque preamble for the emitted module.
    #[serde(alias = "moduleInclude")]
    pub module_include: Option<String>,
    /// Generator options.
    pub options: Options,
}

/// The alternatives of one nonterminal: a single rhs string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    Single(String),
    Many(Vec<AltSpec>),
}

impl RuleSpec {
    /// Normalizes to a list of alternatives. A single rhs string may carry
    /// several alternatives separated by `|`.
    pub fn alternatives(&self) -> Vec<AltSpec> {
        match self {
            RuleSpec::Single(s) => s
                .split('|')
                .map(|alt| AltSpec::Rhs(RhsSpec::Text(alt.trim().to_string())))
                .collect(),
            RuleSpec::Many(alts) => alts.clone(),
        }
    }
}

/// One alternative of a rule.
///
/// Variant order matters for untagged deserialization: a two-element array
/// whose second element is a string is rhs-plus-action, matching the
/// original format.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AltSpec {
    WithActionPrec(RhsSpec, String, PrecSpec),
    WithAction(RhsSpec, String),
    WithPrec(RhsSpec, PrecSpec),
    Rhs(RhsSpec),
}

impl AltSpec {
    /// Splits the alternative into `(rhs symbols, action, prec)`.
    pub fn parts(&self) -> (Vec<String>, Option<&str>, Option<&str>) {
        match self {
            AltSpec::WithActionPrec(rhs, action, prec) => {
                (rhs.symbols(), Some(action.as_str()), Some(prec.prec.as_str()))
            }
            AltSpec::WithAction(rhs, action) => (rhs.symbols(), Some(action.as_str()), None),
            AltSpec::WithPrec(rhs, prec) => (rhs.symbols(), None, Some(prec.prec.as_str())),
            AltSpec::Rhs(rhs) => (rhs.symbols(), None, None),
        }
    }
}

/// A right-hand side: whitespace-delimited string or explicit symbol list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RhsSpec {
    Text(String),
    List(Vec<String>),
}

impl RhsSpec {
    pub fn symbols(&self) -> Vec<String> {
        match self {
            RhsSpec::Text(s) => s.split_whitespace().map(str::to_string).collect(),
            RhsSpec::List(syms) => syms.clone(),
        }
    }
}

/// Explicit `{prec: op}` annotation on an alternative.
#[derive(Debug, Clone, Deserialize)]
pub struct PrecSpec {
    pub prec: String,
}

/// Declared terminals: a whitespace-delimited string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TokensSpec {
    Text(String),
    List(Vec<String>),
}

impl TokensSpec {
    pub fn names(&self) -> Vec<String> {
        match self {
            TokensSpec::Text(s) => s.split_whitespace().map(str::to_string).collect(),
            TokensSpec::List(names) => names.clone(),
        }
    }
}

/// Generator options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Name for the emitted module; invalid identifiers fall back to
    /// `"parser"`.
    #[serde(alias = "moduleName")]
    pub module_name: Option<String>,
    /// Retain both actions of an unresolved conflict in the table instead of
    /// picking one.
    #[serde(alias = "noDefaultResolve")]
    pub no_default_resolve: bool,
    /// Restrict reduce actions in conflict-free states to the item's
    /// FOLLOW set rather than filling the row for every terminal.
    #[serde(alias = "onDemandLookahead")]
    pub on_demand_lookahead: bool,
}

impl Options {
    /// The validated module name.
    pub fn module_name(&self) -> &str {
        match &self.module_name {
            Some(name) if is_identifier(name) => name,
            _ => "parser",
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_rule_splits_on_pipe() {
        let rule = RuleSpec::Single("E + E | id".to_string());
        let alts = rule.alternatives();
        assert_eq!(alts.len(), 2);
        assert_eq!(alts[0].parts().0, vec!["E", "+", "E"]);
        assert_eq!(alts[1].parts().0, vec!["id"]);
    }

    #[test]
    fn test_alt_parts() {
        let alt = AltSpec::WithActionPrec(
            RhsSpec::Text("E - E".to_string()),
            "$$ = $1 - $3".to_string(),
            PrecSpec { prec: "-".to_string() },
        );
        let (rhs, action, prec) = alt.parts();
        assert_eq!(rhs, vec!["E", "-", "E"]);
        assert_eq!(action, Some("$$ = $1 - $3"));
        assert_eq!(prec, Some("-"));
    }

    #[test]
    fn test_module_name_fallback() {
        let mut options = Options::default();
        assert_eq!(options.module_name(), "parser");
        options.module_name = Some("9bad".to_string());
        assert_eq!(options.module_name(), "parser");
        options.module_name = Some("calc_parser".to_string());
        assert_eq!(options.module_name(), "calc_parser");
    }
}
