// src/lexer/grammar.rs
//! Lexical grammar: named token regexes, one per line.
//!
//! ```text
//! # comment
//! ident   = /[a-zA-Z_][a-zA-Z0-9_]*/
//! call_lp = /\(/ [ident]
//! ```

use std::collections::BTreeMap;

use hashbrown::HashMap;

use super::{
    fsa::{
        Ambiguity,
        Determinized,
        FiniteStateAutomaton,
        LexemeId,
        REJECT,
        START,
        StateIndex,
        SubsetConstruction,
        Transition,
    },
    regex::RegexNode,
    regex_parser::parse_regex,
};
use crate::diagnostics::{Diagnostics, DiagnosticsError, SourceLocation};

#[derive(Debug, Clone)]
pub struct Lexeme {
    pub name: String,
    pub loc: SourceLocation,
    pub regex: RegexNode,
    /// Lexemes this one may directly follow; empty means "anywhere".
    pub preceded_by: Vec<LexemeId>,
    /// Declaration order, used as priority.
    pub order: LexemeId,
}

#[derive(Debug, Clone)]
pub struct LexicalGrammar {
    lexemes: Vec<Lexeme>,
    by_name: HashMap<String, LexemeId>,
}

/// The combined NFA: every unconstrained lexeme hangs off START and every
/// successor root, every constrained one off the successor root of each
/// lexeme it may follow.
#[derive(Debug, Clone)]
pub struct LexerNfa {
    pub fsa: FiniteStateAutomaton,
    pub successor_roots: BTreeMap<LexemeId, StateIndex>,
}

/// Lexer DFA with the lexer loop synthesised.
#[derive(Debug, Clone)]
pub struct LexerDfa {
    pub fsa: FiniteStateAutomaton,
    /// DFA state each preceding lexeme continues from.
    pub successor_roots: BTreeMap<LexemeId, StateIndex>,
    pub ambiguities: Vec<Ambiguity>,
}

struct RawLexeme {
    name: String,
    loc: SourceLocation,
    regex: RegexNode,
    preceded_by: Vec<(String, usize)>,
}

impl LexicalGrammar {
    /// Parses a whole lexical grammar, collecting every error before failing.
    pub fn parse(source: &str) -> Result<Self, DiagnosticsError> {
        let mut diagnostics = Diagnostics::new();
        let mut raws = Vec::new();
        let mut offset = 0;
        for line in source.split_inclusive('\n') {
            let base = offset;
            offset += line.len();
            let body = line.trim_end_matches(['\n', '\r']);
            if let Some(raw) = parse_declaration(body, base, &mut diagnostics) {
                raws.push(raw);
            }
        }

        let mut lexemes: Vec<Lexeme> = Vec::with_capacity(raws.len());
        let mut by_name: HashMap<String, LexemeId> = HashMap::new();
        let mut pending = Vec::with_capacity(raws.len());
        for raw in raws {
            if let Some(&first) = by_name.get(&raw.name) {
                diagnostics.error(
                    raw.loc.offset,
                    format!("duplicate lexeme '{}'", raw.name),
                );
                diagnostics.note(lexemes[first].loc.offset, "first defined here");
                continue;
            }
            if raw.regex.matches_empty() {
                diagnostics.error(
                    raw.loc.offset,
                    format!("lexeme '{}' matches the empty string", raw.name),
                );
            }
            let id = lexemes.len();
            by_name.insert(raw.name.clone(), id);
            lexemes.push(Lexeme {
                name: raw.name,
                loc: raw.loc,
                regex: raw.regex,
                preceded_by: Vec::new(),
                order: id,
            });
            pending.push(raw.preceded_by);
        }

        for (id, preds) in pending.into_iter().enumerate() {
            for (name, offset) in preds {
                match by_name.get(&name) {
                    Some(&pred) => {
                        if !lexemes[id].preceded_by.contains(&pred) {
                            lexemes[id].preceded_by.push(pred);
                        }
                    }
                    None => diagnostics.error(offset, format!("undefined lexeme '{name}'")),
                }
            }
        }

        if lexemes.is_empty() && !diagnostics.has_errors() {
            diagnostics.error(0, "lexical grammar declares no lexemes");
        }
        diagnostics.into_result("lexical grammar")?;
        Ok(Self { lexemes, by_name })
    }

    pub fn lexemes(&self) -> &[Lexeme] {
        &self.lexemes
    }

    pub fn lexeme(&self, id: LexemeId) -> &Lexeme {
        &self.lexemes[id]
    }

    pub fn find(&self, name: &str) -> Option<LexemeId> {
        self.by_name.get(name).copied()
    }

    pub fn build_nfa(&self) -> LexerNfa {
        let mut fsa = FiniteStateAutomaton::new();
        let mut successor_roots = BTreeMap::new();
        for lexeme in &self.lexemes {
            for &pred in &lexeme.preceded_by {
                if !successor_roots.contains_key(&pred) {
                    successor_roots.insert(pred, fsa.add_state());
                }
            }
        }
        let mut unconstrained = Vec::new();
        for (id, lexeme) in self.lexemes.iter().enumerate() {
            let fragment = fsa.add_state();
            let end = lexeme.regex.compile(&mut fsa, fragment);
            fsa.accept(end, id);
            if lexeme.preceded_by.is_empty() {
                fsa.add_epsilon_transition(START, fragment);
                unconstrained.push(fragment);
            }
            for pred in &lexeme.preceded_by {
                fsa.add_epsilon_transition(successor_roots[pred], fragment);
            }
        }
        // A successor root also starts everything START does, so a shared
        // first byte cannot hide an unconstrained lexeme.
        for &root in successor_roots.values() {
            for &fragment in &unconstrained {
                fsa.add_epsilon_transition(root, fragment);
            }
        }
        LexerNfa {
            fsa,
            successor_roots,
        }
    }

    /// Determinises every root into one shared DFA, then adds the lexer
    /// loop: from each accepting state, a byte with no explicit edge
    /// finishes the token and is consumed as the start of the next one.
    pub fn build_lexer_dfa(&self) -> LexerDfa {
        let nfa = self.build_nfa();
        let mut sc = SubsetConstruction::new(&nfa.fsa);
        sc.add_root(START);
        let successor_roots: BTreeMap<LexemeId, StateIndex> = nfa
            .successor_roots
            .iter()
            .map(|(&lexeme, &root)| (lexeme, sc.add_root(root)))
            .collect();
        sc.run();
        let Determinized {
            dfa: mut fsa,
            ambiguities,
        } = sc.finish();

        for a in &ambiguities {
            log::warn!(
                "[lexer] lexemes '{}' and '{}' match the same input; '{}' wins by declaration order",
                self.lexemes[a.lexeme_a].name,
                self.lexemes[a.lexeme_b].name,
                self.lexemes[a.lexeme_a].name,
            );
        }

        synthesize_lexer_loop(&mut fsa, &successor_roots);
        log::info!(
            "[lexer] dfa: {} states, {} successor roots, {} ambiguities",
            fsa.state_count(),
            successor_roots.len(),
            ambiguities.len()
        );
        LexerDfa {
            fsa,
            successor_roots,
            ambiguities,
        }
    }
}

fn synthesize_lexer_loop(
    dfa: &mut FiniteStateAutomaton,
    successor_roots: &BTreeMap<LexemeId, StateIndex>,
) {
    for s in 0..dfa.state_count() {
        let Some(lexeme) = dfa.state(s).lexeme else {
            continue;
        };
        let root = successor_roots.get(&lexeme).copied();
        for b in 0u8..=255 {
            if dfa.step(s, b).is_some() {
                continue;
            }
            let dst = root
                .and_then(|r| dfa.step(r, b))
                .or_else(|| dfa.step(START, b))
                .map_or(REJECT, |t| t.dst);
            dfa.push_transition(
                s,
                Transition {
                    sym: Some(b),
                    dst,
                    produces_token: true,
                },
            );
        }
    }
}

struct LineCursor<'a> {
    line: &'a [u8],
    pos: usize,
    base: usize,
}

impl LineCursor<'_> {
    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.line.get(self.pos).copied()
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn at_end_or_comment(&self) -> bool {
        matches!(self.peek(), None | Some(b'#'))
    }

    fn ident(&mut self) -> Option<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => self.pos += 1,
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        Some(String::from_utf8_lossy(&self.line[start..self.pos]).into_owned())
    }

    /// Position of the `/` closing a regex body that starts at `self.pos`.
    fn find_regex_end(&self) -> Option<usize> {
        let mut i = self.pos;
        let mut in_class = false;
        while let Some(&c) = self.line.get(i) {
            match c {
                b'\\' => i += 1,
                b'[' if !in_class => in_class = true,
                b']' if in_class => in_class = false,
                b'/' if !in_class => return Some(i),
                _ => {}
            }
            i += 1;
        }
        None
    }
}

/// Parses one line; errors are reported and the line is skipped.
fn parse_declaration(
    line: &str,
    base: usize,
    diagnostics: &mut Diagnostics,
) -> Option<RawLexeme> {
    let mut c = LineCursor {
        line: line.as_bytes(),
        pos: 0,
        base,
    };
    c.skip_ws();
    if c.at_end_or_comment() {
        return None;
    }

    let name_offset = c.offset();
    let Some(name) = c.ident() else {
        diagnostics.error(name_offset, "expected a lexeme name");
        return None;
    };
    c.skip_ws();
    if !c.eat(b'=') {
        diagnostics.error(c.offset(), format!("expected '=' after lexeme name '{name}'"));
        return None;
    }
    c.skip_ws();
    let open = c.offset();
    if !c.eat(b'/') {
        diagnostics.error(open, "expected '/' to start a regex");
        return None;
    }
    let Some(end) = c.find_regex_end() else {
        diagnostics.error(open, "unterminated regex");
        return None;
    };
    let regex = match parse_regex(&line[c.pos..end], c.offset()) {
        Ok(regex) => regex,
        Err(e) => {
            e.report(diagnostics);
            return None;
        }
    };
    c.pos = end + 1;
    c.skip_ws();

    let mut preceded_by = Vec::new();
    if c.eat(b'[') {
        loop {
            c.skip_ws();
            let offset = c.offset();
            let Some(pred) = c.ident() else {
                diagnostics.error(offset, "expected a lexeme name in preceded-by list");
                return None;
            };
            preceded_by.push((pred, offset));
            c.skip_ws();
            if c.eat(b',') {
                continue;
            }
            if c.eat(b']') {
                break;
            }
            diagnostics.error(c.offset(), "expected ',' or ']' in preceded-by list");
            return None;
        }
        c.skip_ws();
    }
    if !c.at_end_or_comment() {
        diagnostics.error(c.offset(), "unexpected characters after lexeme declaration");
        return None;
    }

    Some(RawLexeme {
        name,
        loc: SourceLocation::new(name_offset),
        regex,
        preceded_by,
    })
}
