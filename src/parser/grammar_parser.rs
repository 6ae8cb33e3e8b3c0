// src/parser/grammar_parser.rs
//! CFG source reader.
//!
//! ```text
//! %left_delim  = 'soi';
//! %right_delim = 'eoi';
//! program            -> 'soi' expr 'eoi';
//! expr               -> atom sum;
//! sum [sum_add]      -> 'plus' atom sum;
//! sum [sum_end]      -> ;
//! ```
//!
//! Bare words are nonterminals, single-quoted words are terminals, `#`
//! comments run to end of line. A bad statement is skipped up to its `;`.

use super::grammar::{Grammar, NonTerminal, Production, Symbol, Terminal};
use crate::diagnostics::{Diagnostics, DiagnosticsError, SourceLocation};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Quoted(String),
    Percent,
    Equals,
    Semi,
    Arrow,
    LBracket,
    RBracket,
    Eof,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Ident(s) => format!("'{s}'"),
            Tok::Quoted(s) => format!("terminal '{s}'"),
            Tok::Percent => "'%'".into(),
            Tok::Equals => "'='".into(),
            Tok::Semi => "';'".into(),
            Tok::Arrow => "'->'".into(),
            Tok::LBracket => "'['".into(),
            Tok::RBracket => "']'".into(),
            Tok::Eof => "end of input".into(),
        }
    }
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Lexer<'_> {
    fn skip_trivia(&mut self) {
        while let Some(&c) = self.src.get(self.pos) {
            if c.is_ascii_whitespace() {
                self.pos += 1;
            } else if c == b'#' {
                while self.src.get(self.pos).is_some_and(|&c| c != b'\n') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Next token and its offset; unknown characters are reported and skipped.
    fn next(&mut self, diagnostics: &mut Diagnostics) -> (Tok, usize) {
        loop {
            self.skip_trivia();
            let at = self.pos;
            let Some(&c) = self.src.get(at) else {
                return (Tok::Eof, at);
            };
            self.pos += 1;
            let tok = match c {
                b'%' => Tok::Percent,
                b'=' => Tok::Equals,
                b';' => Tok::Semi,
                b'[' => Tok::LBracket,
                b']' => Tok::RBracket,
                b'-' if self.src.get(self.pos) == Some(&b'>') => {
                    self.pos += 1;
                    Tok::Arrow
                }
                b'\'' => {
                    let start = self.pos;
                    while self
                        .src
                        .get(self.pos)
                        .is_some_and(|&c| c != b'\'' && c != b'\n')
                    {
                        self.pos += 1;
                    }
                    if self.src.get(self.pos) != Some(&b'\'') {
                        diagnostics.error(at, "unterminated quoted terminal");
                        continue;
                    }
                    let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                    self.pos += 1;
                    if text.is_empty() {
                        diagnostics.error(at, "empty terminal name");
                        continue;
                    }
                    Tok::Quoted(text)
                }
                c if c.is_ascii_alphabetic() || c == b'_' => {
                    while self
                        .src
                        .get(self.pos)
                        .is_some_and(|&c| c.is_ascii_alphanumeric() || c == b'_')
                    {
                        self.pos += 1;
                    }
                    Tok::Ident(String::from_utf8_lossy(&self.src[at..self.pos]).into_owned())
                }
                _ => {
                    diagnostics.error(at, format!("unexpected character {:?}", c as char));
                    continue;
                }
            };
            return (tok, at);
        }
    }
}

#[derive(Default)]
struct Delimiter {
    name: Option<(String, usize)>,
}

struct GrammarParser<'a> {
    lexer: Lexer<'a>,
    tok: Tok,
    at: usize,
    diagnostics: Diagnostics,
    productions: Vec<Production>,
    left: Delimiter,
    right: Delimiter,
}

/// Raised inside a statement; the statement is abandoned.
struct Skip;

impl<'a> GrammarParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut p = Self {
            lexer: Lexer {
                src: source.as_bytes(),
                pos: 0,
            },
            tok: Tok::Eof,
            at: 0,
            diagnostics: Diagnostics::new(),
            productions: Vec::new(),
            left: Delimiter::default(),
            right: Delimiter::default(),
        };
        p.bump();
        p
    }

    fn bump(&mut self) -> Tok {
        let (tok, at) = self.lexer.next(&mut self.diagnostics);
        self.at = at;
        std::mem::replace(&mut self.tok, tok)
    }

    fn expect(&mut self, want: Tok, what: &str) -> Result<(), Skip> {
        if self.tok == want {
            self.bump();
            Ok(())
        } else {
            self.unexpected(what)
        }
    }

    fn unexpected<T>(&mut self, what: &str) -> Result<T, Skip> {
        self.diagnostics.error(
            self.at,
            format!("expected {what}, found {}", self.tok.describe()),
        );
        Err(Skip)
    }

    fn recover(&mut self) {
        while !matches!(self.tok, Tok::Semi | Tok::Eof) {
            self.bump();
        }
        if self.tok == Tok::Semi {
            self.bump();
        }
    }

    fn parse(&mut self) {
        while self.tok != Tok::Eof {
            let result = if self.tok == Tok::Percent {
                self.directive()
            } else {
                self.production()
            };
            if result.is_err() {
                self.recover();
            }
        }
    }

    fn directive(&mut self) -> Result<(), Skip> {
        let at = self.at;
        self.bump(); // '%'
        let Tok::Ident(name) = self.tok.clone() else {
            return self.unexpected("a directive name");
        };
        self.bump();
        self.expect(Tok::Equals, "'='")?;
        let Tok::Quoted(value) = self.tok.clone() else {
            return self.unexpected("a quoted terminal");
        };
        self.bump();
        self.expect(Tok::Semi, "';'")?;

        let slot = match name.as_str() {
            "left_delim" => &mut self.left,
            "right_delim" => &mut self.right,
            _ => {
                self.diagnostics
                    .error(at, format!("unknown directive '%{name}'"));
                return Ok(());
            }
        };
        if let Some((_, first)) = &slot.name {
            let first = *first;
            self.diagnostics
                .error(at, format!("duplicate '%{name}' directive"));
            self.diagnostics.note(first, "first defined here");
        } else {
            slot.name = Some((value, at));
        }
        Ok(())
    }

    fn production(&mut self) -> Result<(), Skip> {
        let at = self.at;
        let Tok::Ident(lhs) = self.tok.clone() else {
            return self.unexpected("a production or directive");
        };
        self.bump();

        let mut tag = None;
        if self.tok == Tok::LBracket {
            self.bump();
            let Tok::Ident(t) = self.tok.clone() else {
                return self.unexpected("a production tag");
            };
            self.bump();
            self.expect(Tok::RBracket, "']'")?;
            tag = Some(t);
        }
        self.expect(Tok::Arrow, "'->'")?;

        let mut rhs = Vec::new();
        loop {
            match self.tok.clone() {
                Tok::Ident(name) => rhs.push(Symbol::NonTerminal(NonTerminal(name))),
                Tok::Quoted(name) => rhs.push(Symbol::Terminal(Terminal::UserDefined(name))),
                Tok::Semi => {
                    self.bump();
                    break;
                }
                _ => return self.unexpected("a symbol or ';'"),
            }
            self.bump();
        }

        self.productions.push(Production {
            loc: SourceLocation::new(at),
            tag,
            lhs: NonTerminal(lhs),
            rhs,
        });
        Ok(())
    }

    /// Turns the start rule's delimiter terminals into `$soi`/`$eoi`.
    fn resolve_delimiters(&mut self) {
        let eof = self.lexer.src.len();
        let left = self.left.name.take();
        let right = self.right.name.take();
        if left.is_none() {
            self.diagnostics.error(eof, "missing '%left_delim' directive");
        }
        if right.is_none() {
            self.diagnostics.error(eof, "missing '%right_delim' directive");
        }
        let (Some((left, _)), Some((right, _))) = (left, right) else {
            return;
        };

        for (id, p) in self.productions.iter_mut().enumerate() {
            let last = p.rhs.len().saturating_sub(1);
            for (i, sym) in p.rhs.iter_mut().enumerate() {
                let Symbol::Terminal(Terminal::UserDefined(name)) = sym else {
                    continue;
                };
                let is_left = *name == left;
                let is_right = *name == right;
                if id == 0 && i == 0 && is_left {
                    *sym = Symbol::Terminal(Terminal::StartOfInput);
                } else if id == 0 && i == last && i > 0 && is_right {
                    *sym = Symbol::Terminal(Terminal::EndOfInput);
                } else if is_left || is_right {
                    self.diagnostics.error(
                        p.loc.offset,
                        format!("delimiter '{name}' may only open and close the start rule"),
                    );
                }
            }
        }
    }
}

impl Grammar {
    /// Parses and validates a grammar, reporting every error found.
    pub fn parse(source: &str) -> Result<Self, DiagnosticsError> {
        let mut p = GrammarParser::new(source);
        p.parse();
        p.resolve_delimiters();
        Grammar::with_diagnostics(p.productions, p.diagnostics)
    }
}
