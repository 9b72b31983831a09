//! Table-driven runtime parser.
//!
//! A [`Parser`] holds only the runtime-relevant subset of what the generator
//! computed: the symbol maps, the `(lhs, rhs length)` production table, the
//! action/goto rows and the default-action map. The constant tables are
//! read-only and safely shareable; all per-parse state (the interleaved
//! symbol/state stack and the parallel value and location stacks) is created
//! fresh inside [`Parser::parse`].
//!
//! Tokens come from an external [`Lexer`]; semantic values are produced by a
//! [`SemanticActions`] implementor dispatched on production id.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::trace;

use crate::error::{Error, Result};
use crate::symbol::{self, SymbolId};
use crate::table::{Action, ParseTable};

/// Sentinel id for tokens the lexer produced but the grammar never declared.
const UNKNOWN_TOKEN: SymbolId = usize::MAX;

/// A source span as tracked by the lexer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub first_line: usize,
    pub first_column: usize,
    pub last_line: usize,
    pub last_column: usize,
    /// Byte range, when the lexer tracks ranges.
    pub range: Option<(usize, usize)>,
}

impl Location {
    /// Merges a reduced range: start coordinates from the oldest frame,
    /// end coordinates from the newest.
    pub fn span(first: &Location, last: &Location) -> Location {
        Location {
            first_line: first.first_line,
            first_column: first.first_column,
            last_line: last.last_line,
            last_column: last.last_column,
            range: match (first.range, last.range) {
                (Some((start, _)), Some((_, end))) => Some((start, end)),
                _ => None,
            },
        }
    }
}

/// A token as returned by the lexer: an interned id or a symbol name that
/// the parser maps through its symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Id(SymbolId),
    Name(String),
}

impl From<&str> for Token {
    fn from(name: &str) -> Self {
        Token::Name(name.to_string())
    }
}

/// The lexer contract of the runtime.
///
/// The parser owns the lexer for the duration of one `parse` call and
/// drives it through `set_input`/`lex`. A `None` from [`Lexer::lex`]
/// signals end of input and is substituted with `$end`.
pub trait Lexer {
    fn set_input(&mut self, input: &str);
    fn lex(&mut self) -> Option<Token>;
    /// Text of the most recently matched token.
    fn yytext(&self) -> &str;
    fn yyleng(&self) -> usize {
        self.yytext().len()
    }
    fn yylineno(&self) -> usize;
    fn yylloc(&self) -> Location;
    /// Optional rendering of the current position for diagnostics.
    fn show_position(&self) -> Option<String> {
        None
    }
}

/// One value-stack element.
///
/// Shifted terminals carry their lexeme; reductions carry whatever the
/// semantic action produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<V> {
    Empty,
    Text(String),
    Value(V),
}

impl<V> Slot<V> {
    pub fn text(&self) -> Option<&str> {
        match self {
            Slot::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&V> {
        match self {
            Slot::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<V> {
        match self {
            Slot::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Slot::Empty
    }
}

/// What a semantic action tells the parser to do next.
///
/// `Return` ends the parse immediately with a value (the `YYACCEPT`
/// rewrite); `Abort` abandons it (`YYABORT`).
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult<V> {
    Continue,
    Return(V),
    Abort,
}

/// The reduce-time view handed to a semantic action.
///
/// `value` and `location` are the `$$` and `@$` result slots; the `$k`/`@k`
/// stack references of rewritten action bodies correspond to [`slot`],
/// [`take`] and [`location_of`] with the same 1-based `k`.
///
/// [`slot`]: ReduceContext::slot
/// [`take`]: ReduceContext::take
/// [`location_of`]: ReduceContext::location_of
pub struct ReduceContext<'a, V> {
    /// The `$$` slot; replaces the reduced frames on the value stack. When
    /// the action leaves it empty, it defaults to `$1`.
    pub value: Slot<V>,
    /// The `@$` slot, pre-merged over the reduced range.
    pub location: Location,
    pub yytext: &'a str,
    pub yyleng: usize,
    pub yylineno: usize,
    len: usize,
    vstack: &'a mut Vec<Slot<V>>,
    lstack: &'a Vec<Location>,
}

impl<'a, V> ReduceContext<'a, V> {
    /// Length of the reduced right-hand side.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn index(&self, k: usize) -> usize {
        self.vstack.len() - self.len + k - 1
    }

    /// The `$k` slot, `k` 1-based within the rhs.
    pub fn slot(&self, k: usize) -> &Slot<V> {
        &self.vstack[self.index(k)]
    }

    /// Takes the `$k` slot out of the stack, leaving it empty.
    pub fn take(&mut self, k: usize) -> Slot<V> {
        let index = self.index(k);
        std::mem::take(&mut self.vstack[index])
    }

    /// The `@k` location.
    pub fn location_of(&self, k: usize) -> Location {
        self.lstack[self.index(k)]
    }
}

/// Dispatcher for semantic actions, indexed by production id.
pub trait SemanticActions {
    type Value;

    fn perform(
        &mut self,
        production: usize,
        ctx: &mut ReduceContext<'_, Self::Value>,
    ) -> ActionResult<Self::Value>;
}

/// Recognizer-style actions: every reduction is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActions;

impl SemanticActions for NoopActions {
    type Value = ();

    fn perform(&mut self, _: usize, _: &mut ReduceContext<'_, ()>) -> ActionResult<()> {
        ActionResult::Continue
    }
}

/// Outcome of a successful parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<V> {
    /// A semantic action ended the parse with a value.
    Value(V),
    /// The accept action fired without an early return.
    Accepted,
}

/// Structured payload of a parse error.
#[derive(Debug, Clone, Default)]
pub struct ParseErrorDetail {
    pub message: String,
    pub text: String,
    /// Terminal name of the offending token, when known.
    pub token: Option<String>,
    pub line: usize,
    pub loc: Location,
    /// Display names of the terminals the state had actions for.
    pub expected: Vec<String>,
    pub recoverable: bool,
}

impl ParseErrorDetail {
    fn internal(message: String) -> Self {
        Self {
            message,
            ..Self::default()
        }
    }
}

impl fmt::Display for ParseErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The table-driven parser produced by a generator.
#[derive(Debug, Clone)]
pub struct Parser {
    pub(crate) symbol_map: HashMap<String, SymbolId>,
    pub(crate) terminal_names: BTreeMap<SymbolId, String>,
    /// `(lhs, rhs length)` per production id.
    pub(crate) production_table: Vec<(SymbolId, usize)>,
    pub(crate) table: ParseTable,
}

impl Parser {
    /// Parses `input`, driving the lexer and dispatching semantic actions.
    pub fn parse<L, A>(
        &self,
        input: &str,
        lexer: &mut L,
        actions: &mut A,
    ) -> Result<Parsed<A::Value>>
    where
        L: Lexer,
        A: SemanticActions,
    {
        // Interleaved (symbol, state) stack seeded with state 0; the value
        // and location stacks stay in lockstep, one frame per pair.
        let mut stack: Vec<usize> = vec![0];
        let mut vstack: Vec<Slot<A::Value>> = vec![Slot::Empty];
        let mut lstack: Vec<Location> = vec![Location::default()];

        let mut symbol: Option<SymbolId> = None;
        let mut recovering = 0usize;

        let mut yytext = String::new();
        let mut yyleng = 0usize;
        let mut yylineno = 0usize;
        let mut yylloc = Location::default();

        lexer.set_input(input);

        loop {
            let state = stack.last().copied().unwrap_or(0);

            // Default actions fire without consulting the lookahead, which
            // also skips a lex call per reduction chain.
            let action = if let Some(action) = self.table.default_action(state) {
                action
            } else {
                let sym = match symbol {
                    Some(sym) => sym,
                    None => {
                        let sym = self.next_token(lexer);
                        yytext = lexer.yytext().to_string();
                        yyleng = lexer.yyleng();
                        yylineno = lexer.yylineno();
                        yylloc = lexer.yylloc();
                        symbol = Some(sym);
                        sym
                    }
                };

                match self.table.actions(state, sym) {
                    Some([action]) => *action,
                    Some(cell) if cell.len() > 1 => {
                        return Err(Error::AmbiguousCell {
                            state,
                            symbol: self.display_token(sym),
                        });
                    }
                    _ => {
                        if recovering > 0 {
                            // Mid-recovery: swallow tokens until one fits.
                            if sym == symbol::END {
                                return Err(Error::Parse(self.error_detail(
                                    state, sym, &yytext, yylineno, yylloc, None, false,
                                )));
                            }
                            symbol = None;
                            continue;
                        }

                        let depth = self.error_recovery_depth(&stack);
                        let detail = self.error_detail(
                            state,
                            sym,
                            &yytext,
                            yylineno,
                            yylloc,
                            lexer.show_position(),
                            depth.is_some(),
                        );
                        let Some(depth) = depth else {
                            return Err(Error::Parse(detail));
                        };
                        trace!("recovering from parse error: {}", detail.message);

                        // Pop to the nearest state that shifts `error`,
                        // shift it, and give the parse three tokens of grace.
                        for _ in 0..depth {
                            stack.pop();
                            stack.pop();
                            vstack.pop();
                            lstack.pop();
                        }
                        let top = stack.last().copied().unwrap_or(0);
                        let Some(target) = self.error_shift_target(top) else {
                            return Err(Error::Parse(detail));
                        };
                        stack.push(symbol::ERROR);
                        stack.push(target);
                        vstack.push(Slot::Text(yytext.clone()));
                        lstack.push(yylloc);
                        recovering = 3;
                        continue;
                    }
                }
            };

            match action {
                Action::Shift(target) => {
                    stack.push(symbol.take().unwrap_or(symbol::END));
                    stack.push(target);
                    vstack.push(Slot::Text(yytext.clone()));
                    lstack.push(yylloc);
                    if recovering > 0 {
                        recovering -= 1;
                    }
                }
                Action::Reduce(production) => {
                    let (lhs, len) = self.production_table[production];

                    let first = lstack[lstack.len() - len.max(1)];
                    let last = lstack[lstack.len() - 1];
                    let mut ctx = ReduceContext {
                        value: Slot::Empty,
                        location: Location::span(&first, &last),
                        yytext: &yytext,
                        yyleng,
                        yylineno,
                        len,
                        vstack: &mut vstack,
                        lstack: &lstack,
                    };
                    match actions.perform(production, &mut ctx) {
                        ActionResult::Continue => {}
                        ActionResult::Return(value) => return Ok(Parsed::Value(value)),
                        ActionResult::Abort => return Err(Error::Aborted),
                    }
                    let ReduceContext {
                        mut value, location, ..
                    } = ctx;

                    for i in 0..len {
                        stack.pop();
                        stack.pop();
                        let slot = vstack.pop().unwrap_or_default();
                        lstack.pop();
                        // Default $$ = $1: the deepest popped frame.
                        if i + 1 == len && matches!(value, Slot::Empty) {
                            value = slot;
                        }
                    }

                    let top = stack.last().copied().unwrap_or(0);
                    let target = match self.table.actions(top, lhs) {
                        Some([Action::Goto(target)]) => *target,
                        _ => {
                            return Err(Error::Parse(ParseErrorDetail::internal(format!(
                                "Parsing halted: no goto from state {} on `{}`",
                                top,
                                self.display_token(lhs)
                            ))));
                        }
                    };
                    stack.push(lhs);
                    stack.push(target);
                    vstack.push(value);
                    lstack.push(location);
                }
                Action::Accept => return Ok(Parsed::Accepted),
                Action::Goto(_) => {
                    return Err(Error::Parse(ParseErrorDetail::internal(format!(
                        "Parsing halted: goto in terminal position at state {}",
                        state
                    ))));
                }
            }
        }
    }

    fn next_token<L: Lexer>(&self, lexer: &mut L) -> SymbolId {
        match lexer.lex() {
            None => symbol::END,
            Some(Token::Id(id)) => id,
            // Unknown names keep a raw id outside the table so the error
            // path reports them instead of a lookup panicking.
            Some(Token::Name(name)) => {
                self.symbol_map.get(&name).copied().unwrap_or(UNKNOWN_TOKEN)
            }
        }
    }

    /// Display names of the non-error terminals with entries in a state.
    fn expected_terminals(&self, state: usize) -> Vec<String> {
        let Some(row) = self.table.rows.get(state) else {
            return Vec::new();
        };
        row.keys()
            .filter(|&&id| id > symbol::ERROR)
            .filter_map(|id| self.terminal_names.get(id))
            .map(|name| format!("'{}'", name))
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn error_detail(
        &self,
        state: usize,
        sym: SymbolId,
        yytext: &str,
        yylineno: usize,
        yylloc: Location,
        position: Option<String>,
        recoverable: bool,
    ) -> ParseErrorDetail {
        let expected = self.expected_terminals(state);
        let token = self.terminal_names.get(&sym).cloned();
        let shown = self.display_token(sym);

        let message = match position {
            Some(position) => format!(
                "Parse error on line {}:\n{}\nExpecting {}, got '{}'",
                yylineno + 1,
                position,
                expected.join(", "),
                shown
            ),
            None => {
                let unexpected = if sym == symbol::END {
                    "end of input".to_string()
                } else {
                    format!("'{}'", shown)
                };
                format!("Parse error on line {}: Unexpected {}", yylineno + 1, unexpected)
            }
        };

        ParseErrorDetail {
            message,
            text: yytext.to_string(),
            token,
            line: yylineno,
            loc: yylloc,
            expected,
            recoverable,
        }
    }

    /// How many frames to pop before reaching a state that shifts `error`.
    fn error_recovery_depth(&self, stack: &[usize]) -> Option<usize> {
        let mut depth = 0;
        let mut i = stack.len();
        while i > 0 {
            if self.error_shift_target(stack[i - 1]).is_some() {
                return Some(depth);
            }
            if i == 1 {
                break;
            }
            i -= 2;
            depth += 1;
        }
        None
    }

    fn error_shift_target(&self, state: usize) -> Option<usize> {
        self.table
            .actions(state, symbol::ERROR)?
            .iter()
            .find_map(|action| match action {
                Action::Shift(target) => Some(*target),
                _ => None,
            })
    }

    fn display_token(&self, sym: SymbolId) -> String {
        match self.terminal_names.get(&sym) {
            Some(name) => name.clone(),
            None => sym.to_string(),
        }
    }
}
