// src/lexer/tables/scan.rs
//! Inclusive prefix scans over parallel states, and token recovery from them.
//!
//! `lex_parallel` runs in three passes: scan inside each block, scan the
//! block summaries, then apply each block's prefix.

use rayon::prelude::*;

use super::{ParallelLexer, ParallelTransition};
use crate::lexer::cpu::{LexError, Token};

impl ParallelLexer {
    /// Sequential inclusive scan: entry `i` covers `input[..=i]`.
    pub fn prefix_scan(&self, input: &[u8]) -> Vec<ParallelTransition> {
        let mut acc = self.identity_state;
        input
            .iter()
            .map(|&b| {
                let t = self.merge(acc, self.initial(b).result_state);
                acc = t.result_state;
                t
            })
            .collect()
    }

    pub fn lex(&self, input: &[u8]) -> Result<Vec<Token>, LexError> {
        let prefixes = self.prefix_scan(input);
        self.tokens_from_prefixes(input, &prefixes)
    }

    pub fn lex_parallel(&self, input: &[u8], block: usize) -> Result<Vec<Token>, LexError> {
        let prefixes = self.prefix_scan_parallel(input, block);
        self.tokens_from_prefixes(input, &prefixes)
    }

    pub fn prefix_scan_parallel(&self, input: &[u8], block: usize) -> Vec<ParallelTransition> {
        let block = block.max(1);

        // 1. scan in block
        let mut scanned: Vec<Vec<ParallelTransition>> = input
            .par_chunks(block)
            .map(|chunk| self.prefix_scan(chunk))
            .collect();

        // 2. exclusive scan of block summaries
        let mut carry = self.identity_state;
        let block_prefix: Vec<u32> = scanned
            .iter()
            .map(|local| {
                let before = carry;
                if let Some(last) = local.last() {
                    carry = self.merge(carry, last.result_state).result_state;
                }
                before
            })
            .collect();

        // 3. apply block prefix
        scanned
            .par_iter_mut()
            .zip(block_prefix.par_iter())
            .for_each(|(local, &prefix)| {
                for t in local.iter_mut() {
                    *t = self.merge(prefix, t.result_state);
                }
            });

        scanned.into_iter().flatten().collect()
    }

    /// Token boundaries from inclusive prefixes: a prefix whose last step
    /// emits closes the token before that byte, with the lexeme the
    /// previous prefix accepts.
    fn tokens_from_prefixes(
        &self,
        input: &[u8],
        prefixes: &[ParallelTransition],
    ) -> Result<Vec<Token>, LexError> {
        let mut out = Vec::new();
        let mut tok_start = 0usize;
        let mut prev = self.identity_state;
        for (i, p) in prefixes.iter().enumerate() {
            if self.rejects[p.result_state as usize] {
                return Err(LexError::rejected(input, i));
            }
            if p.produces_token {
                let Some(lexeme) = self.final_state(prev) else {
                    return Err(LexError::rejected(input, i));
                };
                out.push(Token {
                    lexeme,
                    start: tok_start,
                    len: i - tok_start,
                });
                tok_start = i;
            }
            prev = p.result_state;
        }

        if prefixes.is_empty() {
            return Ok(out);
        }
        match self.final_state(prev) {
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
}
