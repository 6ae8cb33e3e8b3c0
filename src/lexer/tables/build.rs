// src/lexer/tables/build.rs
use std::time::Instant;

use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;

use super::{
    IDENTITY,
    ParallelLexer,
    ParallelTransition,
    dfa::{Next, StreamingDfa},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexerError {
    #[error(
        "parallel lexer exceeds {limit} states; raise LLPGEN_MAX_PARALLEL_STATES or simplify the lexical grammar"
    )]
    TooManyParallelStates { limit: usize },
    #[error("merge of parallel states {a} and {b} was never interned")]
    MergeNotClosed { a: u32, b: u32 },
}

/// Interned parallel states: Q -> (Q, emit), one vector per state.
/// Id 0 is the identity; its vector is only a placeholder.
struct Interner {
    funcs: Vec<Vec<Next>>,
    map: HashMap<Vec<Next>, u32>,
}

impl Interner {
    fn new(n_states: usize) -> Self {
        let identity: Vec<Next> = (0..n_states)
            .map(|s| Next {
                state: s as u32,
                emit: false,
            })
            .collect();
        let mut map = HashMap::new();
        map.insert(identity.clone(), IDENTITY);
        Self {
            funcs: vec![identity],
            map,
        }
    }

    fn intern(&mut self, trans: Vec<Next>) -> u32 {
        if let Some(&id) = self.map.get(&trans) {
            return id;
        }
        let id = self.funcs.len() as u32;
        self.map.insert(trans.clone(), id);
        self.funcs.push(trans);
        id
    }

    /// `a` then `b`. The identity is neutral on both sides, so its own
    /// (flag-free) vector never takes part in a composition.
    fn compose(&self, a: u32, b: u32) -> Vec<Next> {
        if a == IDENTITY {
            return self.funcs[b as usize].clone();
        }
        if b == IDENTITY {
            return self.funcs[a as usize].clone();
        }
        compose_trans(&self.funcs[a as usize], &self.funcs[b as usize])
    }
}

#[inline]
fn compose_trans(a: &[Next], b: &[Next]) -> Vec<Next> {
    // keep the LAST edge's emit flag
    a.iter().map(|&Next { state, .. }| b[state as usize]).collect()
}

/// Compositions found in one round, distinct and in discovery order.
#[derive(Default)]
struct Fresh {
    order: Vec<Vec<Next>>,
    seen: HashSet<Vec<Next>>,
}

impl Fresh {
    fn insert(&mut self, trans: Vec<Next>) {
        if self.seen.insert(trans.clone()) {
            self.order.push(trans);
        }
    }

    fn within(self, budget: usize, limit: usize) -> Result<Self, LexerError> {
        if self.order.len() > budget {
            return Err(LexerError::TooManyParallelStates { limit });
        }
        Ok(self)
    }
}

/// Merges every known pair in both orders until no new state appears.
/// Compositions run on the rayon pool and are deduplicated per round;
/// interning is sequential and in pair order, so ids do not depend on
/// scheduling. A round fails as soon as its distinct states overflow
/// `limit`, before any of them is interned.
fn closure_fixpoint_parallel(interner: &mut Interner, limit: usize) -> Result<(), LexerError> {
    let mut round = 0usize;
    // The identity never yields anything new.
    let mut new_start = 1usize;

    loop {
        let cur_len = interner.funcs.len();
        if new_start >= cur_len {
            break;
        }
        let known = &*interner;
        let budget = limit.saturating_sub(cur_len);

        // new × all, then all × new
        let new_by_all = (new_start..cur_len)
            .into_par_iter()
            .flat_map_iter(|i| (1..cur_len).map(move |j| (i as u32, j as u32)));
        let old_by_new = (1..new_start)
            .into_par_iter()
            .flat_map_iter(|i| (new_start..cur_len).map(move |j| (i as u32, j as u32)));
        let found = new_by_all
            .chain(old_by_new)
            .map(|(a, b)| known.compose(a, b))
            .filter(|trans| !known.map.contains_key(trans))
            .try_fold(Fresh::default, |mut local, trans| {
                local.insert(trans);
                local.within(budget, limit)
            })
            .try_reduce(Fresh::default, |mut a, b| {
                for trans in b.order {
                    a.insert(trans);
                }
                a.within(budget, limit)
            })?;

        for trans in found.order {
            interner.intern(trans);
        }

        round += 1;
        log::debug!(
            "[tables] closure round {round}: size now {}",
            interner.funcs.len()
        );
        new_start = cur_len;
    }
    Ok(())
}

fn build_merge_table_parallel(interner: &Interner) -> Result<Vec<ParallelTransition>, LexerError> {
    let m = interner.funcs.len();
    let emit_on_start = emit_on_start(interner);
    let mut merge = vec![ParallelTransition::default(); m * m];

    merge
        .par_chunks_mut(m)
        .enumerate()
        .try_for_each(|(a, row)| {
            for (b, slot) in row.iter_mut().enumerate() {
                let (a, b) = (a as u32, b as u32);
                let trans = interner.compose(a, b);
                let id = *interner
                    .map
                    .get(&trans)
                    .ok_or(LexerError::MergeNotClosed { a, b })?;
                *slot = ParallelTransition {
                    result_state: id,
                    produces_token: emit_on_start[id as usize],
                };
            }
            Ok(())
        })?;
    Ok(merge)
}

fn emit_on_start(interner: &Interner) -> Vec<bool> {
    // START is row 1 of every vector; the identity never emits.
    let start = crate::lexer::fsa::START;
    interner
        .funcs
        .iter()
        .enumerate()
        .map(|(id, f)| id as u32 != IDENTITY && f[start].emit)
        .collect()
}

/// Derives the parallel lexer of `dfa`, failing once more than
/// `max_states` parallel states (identity included) are discovered.
pub fn build_parallel_lexer(
    dfa: &StreamingDfa,
    max_states: usize,
) -> Result<ParallelLexer, LexerError> {
    let t0 = Instant::now();
    let n_states = dfa.n_states();
    let mut interner = Interner::new(n_states);

    // δ_b for each byte. No byte maps START to itself, so none of them
    // collides with the identity.
    let mut char_to_func = [IDENTITY; 256];
    for b in 0u8..=255 {
        let trans: Vec<Next> = (0..n_states).map(|s| dfa.next[s][b as usize]).collect();
        char_to_func[b as usize] = interner.intern(trans);
    }
    if interner.funcs.len() > max_states {
        return Err(LexerError::TooManyParallelStates { limit: max_states });
    }
    log::debug!(
        "[tables] base generators (distinct δ_b) = {}",
        interner.funcs.len() - 1
    );

    let t1 = Instant::now();
    closure_fixpoint_parallel(&mut interner, max_states)?;
    log::debug!("[tables] closure took {} ms", t1.elapsed().as_millis());

    let t2 = Instant::now();
    let merge_table = build_merge_table_parallel(&interner)?;
    log::debug!("[tables] merge took {} ms", t2.elapsed().as_millis());

    let emit = emit_on_start(&interner);
    let start = dfa.start as usize;
    let final_states = interner
        .funcs
        .iter()
        .map(|f| dfa.token_map[f[start].state as usize])
        .collect();
    let rejects = interner
        .funcs
        .iter()
        .map(|f| f[start].state == dfa.reject)
        .collect();
    let initial_states = char_to_func.map(|id| ParallelTransition {
        result_state: id,
        produces_token: emit[id as usize],
    });

    let m = interner.funcs.len();
    log::info!(
        "[tables] parallel lexer: {} dfa states -> {} parallel states, merge table {} entries ({} ms)",
        n_states,
        m,
        m * m,
        t0.elapsed().as_millis()
    );

    Ok(ParallelLexer {
        initial_states,
        merge_table,
        final_states,
        rejects,
        identity_state: IDENTITY,
        state_count: m,
    })
}
