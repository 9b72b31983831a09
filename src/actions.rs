//! Semantic-action rewriting.
//!
//! Action bodies are opaque user code. The generator never executes them; it
//! rewrites their stack references into a positional dialect and groups
//! identical bodies so an emitted dispatcher needs one arm per distinct body.
//!
//! The rewritten dialect: `$$` becomes `yyval.value`, `@$` becomes
//! `yyval.location`, and `$k` / `@k` become `vstack[vtop+o]` /
//! `lstack[ltop+o]` with offset `o = k - |rhs|` relative to the top of the
//! stacks at reduce time. `YYACCEPT` and `YYABORT` become `return true` and
//! `return false` in the dispatcher context.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref ALIAS_RE: Regex = Regex::new(r"\[([a-zA-Z][a-zA-Z0-9_-]*)\]$").unwrap();
    static ref NAMED_VALUE_RE: Regex = Regex::new(r"\$([a-zA-Z][a-zA-Z0-9_]*)").unwrap();
    static ref NAMED_LOC_RE: Regex = Regex::new(r"@([a-zA-Z][a-zA-Z0-9_]*)").unwrap();
    static ref RESULT_RE: Regex = Regex::new(r"\$\$").unwrap();
    static ref RESULT_LOC_RE: Regex = Regex::new(r"@(\$|0\b)").unwrap();
    static ref VALUE_RE: Regex = Regex::new(r"\$(-?\d+)").unwrap();
    static ref LOC_RE: Regex = Regex::new(r"@(-?\d+)").unwrap();
}

/// Name-to-position bindings collected from one right-hand side.
pub type NameMap = IndexMap<String, usize>;

/// Strips `Sym[alias]` annotations from a raw rhs and records name
/// bindings for the action body.
///
/// Every position is bound under its alias when present, otherwise under
/// the symbol name itself. A repeated name stays bound to its first
/// occurrence and later occurrences are reachable as `name2`, `name3`, ...;
/// the first also gets the explicit `name1` spelling.
pub fn process_rhs(raw: &[String]) -> (Vec<String>, NameMap) {
    let mut rhs = Vec::with_capacity(raw.len());
    let mut names = NameMap::new();
    let mut counts: IndexMap<String, usize> = IndexMap::new();

    for (i, entry) in raw.iter().enumerate() {
        let position = i + 1;
        let (symbol, bound) = match ALIAS_RE.captures(entry) {
            Some(caps) => {
                let annotation = caps.get(0).unwrap();
                let alias = caps.get(1).unwrap().as_str().to_string();
                (entry[..annotation.start()].to_string(), alias)
            }
            None => (entry.clone(), entry.clone()),
        };

        match counts.get_mut(&bound) {
            Some(count) => {
                *count += 1;
                names.insert(format!("{}{}", bound, count), position);
            }
            None => {
                names.insert(bound.clone(), position);
                names.insert(format!("{}1", bound), position);
                counts.insert(bound, 1);
            }
        }
        rhs.push(symbol);
    }

    (rhs, names)
}

/// Rewrites one action body against a rhs of length `rhs_len`.
pub fn rewrite(action: &str, rhs_len: usize, names: &NameMap) -> String {
    // Named references first so the positional pass sees plain `$k`.
    let action = NAMED_VALUE_RE.replace_all(action, |caps: &Captures| {
        let name = caps.get(1).unwrap().as_str();
        match names.get(name) {
            Some(position) => format!("${}", position),
            None => caps.get(0).unwrap().as_str().to_string(),
        }
    });
    let action = NAMED_LOC_RE.replace_all(&action, |caps: &Captures| {
        let name = caps.get(1).unwrap().as_str();
        match names.get(name) {
            Some(position) => format!("@{}", position),
            None => caps.get(0).unwrap().as_str().to_string(),
        }
    });

    let action = RESULT_RE.replace_all(&action, "yyval.value");
    let action = RESULT_LOC_RE.replace_all(&action, "yyval.location");

    let action = VALUE_RE.replace_all(&action, |caps: &Captures| {
        let k: i64 = caps.get(1).unwrap().as_str().parse().unwrap();
        slot_reference("vstack", "vtop", k - rhs_len as i64)
    });
    let action = LOC_RE.replace_all(&action, |caps: &Captures| {
        let k: i64 = caps.get(1).unwrap().as_str().parse().unwrap();
        slot_reference("lstack", "ltop", k - rhs_len as i64)
    });

    action
        .replace("YYACCEPT", "return true")
        .replace("YYABORT", "return false")
}

fn slot_reference(stack: &str, top: &str, offset: i64) -> String {
    if offset == 0 {
        format!("{}[{}]", stack, top)
    } else {
        format!("{}[{}{:+}]", stack, top, offset)
    }
}

/// Distinct action bodies and the productions sharing each of them.
#[derive(Debug, Clone, Default)]
pub struct ActionGroups {
    groups: IndexMap<String, Vec<usize>>,
}

impl ActionGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a production under its rewritten body.
    pub fn add(&mut self, body: &str, production: usize) {
        self.groups
            .entry(body.to_string())
            .or_default()
            .push(production);
    }

    /// Distinct bodies with their production ids, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.groups
            .iter()
            .map(|(body, ids)| (body.as_str(), ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_for(raw: &[&str]) -> (Vec<String>, NameMap) {
        let raw: Vec<String> = raw.iter().map(|s| s.to_string()).collect();
        process_rhs(&raw)
    }

    #[test]
    fn test_alias_stripping() {
        let (rhs, names) = names_for(&["E[left]", "+", "E[right]"]);
        assert_eq!(rhs, vec!["E", "+", "E"]);
        assert_eq!(names.get("left"), Some(&1));
        assert_eq!(names.get("right"), Some(&3));
    }

    #[test]
    fn test_repeated_names() {
        let (_, names) = names_for(&["E", "+", "E"]);
        assert_eq!(names.get("E"), Some(&1));
        assert_eq!(names.get("E1"), Some(&1));
        assert_eq!(names.get("E2"), Some(&3));
    }

    #[test]
    fn test_positional_rewrite() {
        let (_, names) = names_for(&["E", "+", "E"]);
        let body = rewrite("$$ = $1 + $3;", 3, &names);
        assert_eq!(body, "yyval.value = vstack[vtop-2] + vstack[vtop];");
    }

    #[test]
    fn test_named_rewrite() {
        let (_, names) = names_for(&["E[lhs]", "+", "E[rhs]"]);
        let body = rewrite("$$ = $lhs + $rhs; @$ = @lhs;", 3, &names);
        assert_eq!(
            body,
            "yyval.value = vstack[vtop-2] + vstack[vtop]; yyval.location = lstack[ltop-2];"
        );
    }

    #[test]
    fn test_control_directives() {
        let (_, names) = names_for(&["x"]);
        assert_eq!(rewrite("YYACCEPT", 1, &names), "return true");
        assert_eq!(rewrite("YYABORT", 1, &names), "return false");
    }

    #[test]
    fn test_action_grouping() {
        let mut groups = ActionGroups::new();
        groups.add("yyval.value = vstack[vtop]", 1);
        groups.add("yyval.value = vstack[vtop]", 3);
        groups.add("return true", 2);
        assert_eq!(groups.len(), 2);
        let collected: Vec<_> = groups.iter().collect();
        assert_eq!(collected[0].1, &[1, 3]);
        assert_eq!(collected[1].1, &[2]);
    }
}
