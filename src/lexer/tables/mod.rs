// src/lexer/tables/mod.rs
pub mod build;
pub mod dfa;
pub mod io;
pub mod scan;

use serde::{Deserialize, Serialize};

pub use build::{LexerError, build_parallel_lexer};
pub use dfa::{Next, StreamingDfa};
pub use io::{load_tables_json_bytes, save_tables_json, write_tables_json};

use crate::lexer::fsa::LexemeId;

/// Id of the neutral element of `merge`.
pub const IDENTITY: u32 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParallelTransition {
    pub result_state: u32,
    /// Whether the last byte covered by the state, run from START, ends a token.
    pub produces_token: bool,
}

/// Lexer tables for an associative scan over the input bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelLexer {
    /// Parallel state of each single byte.
    pub initial_states: [ParallelTransition; 256],
    /// `state_count * state_count`, row-major: `[left][right]`.
    pub merge_table: Vec<ParallelTransition>,
    /// Lexeme accepted after running the state from START.
    pub final_states: Vec<Option<LexemeId>>,
    /// Whether running the state from START ends in REJECT.
    pub rejects: Vec<bool>,
    pub identity_state: u32,
    pub state_count: usize,
}

impl ParallelLexer {
    #[inline]
    pub fn initial(&self, b: u8) -> ParallelTransition {
        self.initial_states[b as usize]
    }

    /// The state covering `left` followed by `right`.
    #[inline]
    pub fn merge(&self, left: u32, right: u32) -> ParallelTransition {
        self.merge_table[left as usize * self.state_count + right as usize]
    }

    /// Left fold of `merge` over the bytes of `input`.
    pub fn fold(&self, input: &[u8]) -> ParallelTransition {
        input.iter().fold(
            ParallelTransition {
                result_state: self.identity_state,
                produces_token: false,
            },
            |acc, &b| self.merge(acc.result_state, self.initial(b).result_state),
        )
    }

    #[inline]
    pub fn final_state(&self, p: u32) -> Option<LexemeId> {
        self.final_states[p as usize]
    }

    pub fn merge_table_bytes(&self) -> usize {
        self.merge_table.len() * std::mem::size_of::<ParallelTransition>()
    }
}
