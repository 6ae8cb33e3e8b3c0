// src/lexer/cpu.rs
// Sequential streaming-DFA lexer; the oracle both parallel scans are checked against.

use crate::lexer::{fsa::LexemeId, tables::dfa::StreamingDfa};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub lexeme: LexemeId,
    pub start: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error(
        "fell into REJECT at byte {offset} (0x{byte:02X}); context [{context_start}..):\n{context}"
    )]
    Rejected {
        offset: usize,
        byte: u8,
        context_start: usize,
        context: String,
    },
    #[error("input ended inside a token (non-accepting state at byte {offset})")]
    UnexpectedEnd { offset: usize },
}

impl LexError {
    pub fn offset(&self) -> usize {
        match self {
            LexError::Rejected { offset, .. } | LexError::UnexpectedEnd { offset } => *offset,
        }
    }

    pub(crate) fn rejected(src: &[u8], i: usize) -> Self {
        let (context_start, context) = slice_dbg(src, i);
        LexError::Rejected {
            offset: i,
            byte: src[i],
            context_start,
            context,
        }
    }
}

fn slice_dbg(src: &[u8], i: usize) -> (usize, String) {
    let lo = i.saturating_sub(16);
    let hi = (i + 16).min(src.len());
    let s = src[lo..hi]
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || matches!(b, b' ' | b'\n' | b'\t' | b'\r') {
                b as char
            } else {
                '·'
            }
        })
        .collect();
    (lo, s)
}

/// Walks the DFA byte by byte. An emitting edge ends the current token
/// before its byte; the byte then starts the next token.
pub fn lex_on_cpu(dfa: &StreamingDfa, input: &[u8]) -> Result<Vec<Token>, LexError> {
    let mut out = Vec::new();
    if input.is_empty() {
        return Ok(out);
    }

    let mut state = dfa.start;
    let mut tok_start = 0usize;
    for (i, &b) in input.iter().enumerate() {
        let next = dfa.step(state, b);
        if next.state == dfa.reject {
            return Err(LexError::rejected(input, i));
        }
        if next.emit {
            // Only accepting states carry emitting edges.
            let Some(lexeme) = dfa.token_map[state as usize] else {
                return Err(LexError::rejected(input, i));
            };
            out.push(Token {
                lexeme,
                start: tok_start,
                len: i - tok_start,
            });
            tok_start = i;
        }
        state = next.state;
    }

    match dfa.token_map[state as usize] {
        Some(lexeme) => {
            out.push(Token {
                lexeme,
                start: tok_start,
                len: input.len() - tok_start,
            });
            Ok(out)
        }
        None => Err(LexError::UnexpectedEnd {
            offset: input.len(),
        }),
    }
}
