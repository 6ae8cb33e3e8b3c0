// src/lexer/tables/dfa.rs
use serde::{Deserialize, Serialize};

use crate::lexer::fsa::{FiniteStateAutomaton, LexemeId, REJECT, START};

/// A transition with an 'emit' flag (meaning: the edge emits a token when taken).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Next {
    pub state: u32,
    pub emit: bool,
}

/// Fully materialized streaming DFA.
#[derive(Debug, Clone)]
pub struct StreamingDfa {
    pub next: Vec<[Next; 256]>,           // [state][byte] -> (next, emit)
    pub token_map: Vec<Option<LexemeId>>, // lexeme per state
    pub start: u32,
    pub reject: u32,
}

impl StreamingDfa {
    /// Densifies a lexer DFA. Missing edges go to REJECT without emitting,
    /// and REJECT loops on itself.
    pub fn from_fsa(fsa: &FiniteStateAutomaton) -> Self {
        let reject = Next {
            state: REJECT as u32,
            emit: false,
        };
        let mut next = vec![[reject; 256]; fsa.state_count()];
        let mut token_map = Vec::with_capacity(fsa.state_count());

        for (s, state) in fsa.states().iter().enumerate() {
            token_map.push(state.lexeme);
            if s == REJECT {
                continue;
            }
            for t in &state.transitions {
                let Some(b) = t.sym else {
                    debug_assert!(false, "epsilon edge in lexer DFA");
                    continue;
                };
                next[s][b as usize] = Next {
                    state: t.dst as u32,
                    emit: t.produces_token,
                };
            }
        }

        Self {
            next,
            token_map,
            start: START as u32,
            reject: REJECT as u32,
        }
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.next.len()
    }

    #[inline]
    pub fn step(&self, state: u32, b: u8) -> Next {
        self.next[state as usize][b as usize]
    }
}
