//! Shared test support: grammar fixtures and a trivial word lexer.

// Each integration test crate compiles its own copy and uses a subset.
#![allow(dead_code)]

use lalr_gen::{Generator, GrammarSpec, Lexer, Location, NoopActions, Token};

/// Parses a JSON grammar fixture.
pub fn spec(json: &str) -> GrammarSpec {
    serde_json::from_str(json).expect("grammar fixture should deserialize")
}

/// Builds a generator from a JSON grammar fixture.
pub fn generator(json: &str) -> Generator {
    Generator::new(&spec(json)).expect("grammar fixture should generate")
}

/// Runs the generated parser as a recognizer over one input.
pub fn recognizes(generator: &Generator, input: &str) -> bool {
    let parser = generator.create_parser();
    parser
        .parse(input, &mut WordLexer::new(), &mut NoopActions)
        .is_ok()
}

/// A lexer yielding each whitespace-delimited word as a token named by
/// itself, with line/column/byte-range locations.
pub struct WordLexer {
    words: Vec<(String, Location)>,
    next: usize,
    yytext: String,
    yylineno: usize,
    yylloc: Location,
}

impl WordLexer {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            next: 0,
            yytext: String::new(),
            yylineno: 0,
            yylloc: Location::default(),
        }
    }
}

impl Default for WordLexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer for WordLexer {
    fn set_input(&mut self, input: &str) {
        self.words.clear();
        self.next = 0;
        self.yytext.clear();
        self.yylineno = 0;
        self.yylloc = Location::default();

        let mut line = 0;
        let mut column = 0;
        let mut word_start: Option<(usize, usize, usize)> = None;

        let mut push_word = |start: usize, end: usize, wline: usize, wcol: usize| {
            let text = &input[start..end];
            let width = text.chars().count();
            self.words.push((
                text.to_string(),
                Location {
                    first_line: wline,
                    first_column: wcol,
                    last_line: wline,
                    last_column: wcol + width,
                    range: Some((start, end)),
                },
            ));
        };

        for (offset, ch) in input.char_indices() {
            if ch.is_whitespace() {
                if let Some((start, wline, wcol)) = word_start.take() {
                    push_word(start, offset, wline, wcol);
                }
                if ch == '\n' {
                    line += 1;
                    column = 0;
                } else {
                    column += 1;
                }
            } else {
                if word_start.is_none() {
                    word_start = Some((offset, line, column));
                }
                column += 1;
            }
        }
        if let Some((start, wline, wcol)) = word_start {
            push_word(start, input.len(), wline, wcol);
        }
    }

    fn lex(&mut self) -> Option<Token> {
        match self.words.get(self.next) {
            Some((word, loc)) => {
                self.next += 1;
                self.yytext = word.clone();
                self.yylineno = loc.first_line;
                self.yylloc = *loc;
                Some(Token::Name(word.clone()))
            }
            None => {
                self.yytext.clear();
                None
            }
        }
    }

    fn yytext(&self) -> &str {
        &self.yytext
    }

    fn yylineno(&self) -> usize {
        self.yylineno
    }

    fn yylloc(&self) -> Location {
        self.yylloc
    }
}
