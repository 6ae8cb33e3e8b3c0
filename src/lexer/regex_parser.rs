// src/lexer/regex_parser.rs
//! Recursive-descent regex parser.
//!
//! ```text
//! alternation := sequence ('|' sequence)*
//! sequence    := postfix*
//! postfix     := atom ('*' | '+' | '?')*
//! atom        := '(' alternation ')' | '[' '^'? class-item+ ']' | escape | byte
//! class-item  := class-char ('-' class-char)?
//! ```

use super::{
    char_range::{CharRange, coalesce},
    regex::{RegexNode, RepeatKind},
};
use crate::diagnostics::Diagnostics;

/// Bytes that must be escaped to be matched literally.
const SYNTAX_CHARS: &[u8] = b"\\/|*+?()[]^-.";

/// A regex syntax error. Offsets are absolute (relative to the grammar
/// source the regex was cut from).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at offset {offset})")]
pub struct RegexError {
    pub offset: usize,
    pub message: String,
    pub notes: Vec<(usize, String)>,
}

impl RegexError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    pub fn report(&self, diagnostics: &mut Diagnostics) {
        diagnostics.error(self.offset, self.message.clone());
        for (offset, note) in &self.notes {
            diagnostics.note(*offset, note.clone());
        }
    }
}

/// Parses `pattern`, whose first byte sits at `base_offset` in the source.
pub fn parse_regex(pattern: &str, base_offset: usize) -> Result<RegexNode, RegexError> {
    let mut p = RegexParser {
        input: pattern.as_bytes(),
        pos: 0,
        base: base_offset,
    };
    let node = p.parse_alternation()?;
    match p.peek() {
        None => Ok(node),
        Some(b')') => Err(RegexError::new(p.offset(), "unmatched ')'")),
        Some(c) => Err(RegexError::new(
            p.offset(),
            format!("unexpected character {:?}", c as char),
        )),
    }
}

struct RegexParser<'a> {
    input: &'a [u8],
    pos: usize,
    base: usize,
}

impl RegexParser<'_> {
    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_alternation(&mut self) -> Result<RegexNode, RegexError> {
        let mut branches = vec![self.parse_sequence()?];
        while self.eat(b'|') {
            branches.push(self.parse_sequence()?);
        }
        Ok(if branches.len() == 1 {
            branches.pop().unwrap_or(RegexNode::Empty)
        } else {
            RegexNode::Alternation(branches)
        })
    }

    fn parse_sequence(&mut self) -> Result<RegexNode, RegexError> {
        let mut items = Vec::new();
        while let Some(c) = self.peek() {
            if c == b'|' || c == b')' {
                break;
            }
            items.push(self.parse_postfix()?);
        }
        Ok(match items.len() {
            0 => RegexNode::Empty,
            1 => items.pop().unwrap_or(RegexNode::Empty),
            _ => RegexNode::Sequence(items),
        })
    }

    fn parse_postfix(&mut self) -> Result<RegexNode, RegexError> {
        let mut node = self.parse_atom()?;
        loop {
            let kind = match self.peek() {
                Some(b'*') => RepeatKind::ZeroOrMore,
                Some(b'+') => RepeatKind::OneOrMore,
                Some(b'?') => RepeatKind::ZeroOrOne,
                _ => break,
            };
            self.pos += 1;
            node = RegexNode::Repeat {
                kind,
                child: Box::new(node),
            };
        }
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<RegexNode, RegexError> {
        let start = self.offset();
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let inner = self.parse_alternation()?;
                if !self.eat(b')') {
                    return Err(RegexError::new(start, "unterminated group"));
                }
                Ok(inner)
            }
            Some(b'[') => self.parse_class(),
            Some(b'*' | b'+' | b'?') => Err(RegexError::new(start, "nothing to repeat")),
            Some(b']') => Err(RegexError::new(start, "unmatched ']'")),
            Some(b'\\') => Ok(RegexNode::Char(self.parse_escape()?)),
            Some(c) => {
                self.pos += 1;
                Ok(RegexNode::Char(c))
            }
            None => Err(RegexError::new(start, "unexpected end of regex")),
        }
    }

    fn parse_escape(&mut self) -> Result<u8, RegexError> {
        let start = self.offset();
        self.pos += 1; // '\'
        let Some(c) = self.bump() else {
            return Err(RegexError::new(start, "unterminated escape sequence"));
        };
        match c {
            b'n' => Ok(b'\n'),
            b'r' => Ok(b'\r'),
            b't' => Ok(b'\t'),
            b'x' => {
                let hi = self.bump().and_then(hex_value);
                let lo = self.bump().and_then(hex_value);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
                    _ => Err(RegexError::new(
                        start,
                        "malformed \\x escape: expected two hex digits",
                    )),
                }
            }
            c if SYNTAX_CHARS.contains(&c) => Ok(c),
            c => Err(RegexError::new(
                start,
                format!("unknown escape sequence '\\{}'", c as char),
            )),
        }
    }

    fn parse_class(&mut self) -> Result<RegexNode, RegexError> {
        let open = self.offset();
        self.pos += 1; // '['
        let inverted = self.eat(b'^');
        let mut ranges = Vec::new();
        loop {
            match self.peek() {
                None => return Err(RegexError::new(open, "unterminated character class")),
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let min_offset = self.offset();
                    let min = self.parse_class_char()?;
                    // A '-' right before ']' is literal.
                    let is_range = self.peek() == Some(b'-')
                        && self.input.get(self.pos + 1).is_some_and(|&c| c != b']');
                    if !is_range {
                        ranges.push(CharRange::single(min));
                        continue;
                    }
                    self.pos += 1; // '-'
                    let max_offset = self.offset();
                    let max = self.parse_class_char()?;
                    if min > max {
                        let mut err = RegexError::new(
                            min_offset,
                            format!(
                                "invalid character range: {:?} is greater than {:?}",
                                min as char, max as char
                            ),
                        );
                        err.notes
                            .push((max_offset, "range upper bound is here".to_string()));
                        return Err(err);
                    }
                    ranges.push(CharRange::new(min, max));
                }
            }
        }
        if ranges.is_empty() {
            return Err(RegexError::new(open, "empty character class"));
        }
        coalesce(&mut ranges);
        Ok(RegexNode::CharSet { ranges, inverted })
    }

    fn parse_class_char(&mut self) -> Result<u8, RegexError> {
        match self.peek() {
            Some(b'\\') => self.parse_escape(),
            Some(c) => {
                self.pos += 1;
                Ok(c)
            }
            None => Err(RegexError::new(self.offset(), "unterminated character class")),
        }
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
