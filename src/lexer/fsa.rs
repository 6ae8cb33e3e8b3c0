// src/lexer/fsa.rs
//! Explicit NFA/DFA over bytes, and subset construction.

use std::collections::{BTreeSet, VecDeque};

use hashbrown::HashMap;

pub type StateIndex = usize;
/// Index of a lexeme in its lexical grammar; lower ids win ties.
pub type LexemeId = usize;

/// Sink state. Never has outgoing transitions of its own.
pub const REJECT: StateIndex = 0;
pub const START: StateIndex = 1;

/// An edge; `sym == None` is an epsilon edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    pub sym: Option<u8>,
    pub dst: StateIndex,
    /// Taking this edge finishes the current token before consuming `sym`.
    pub produces_token: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub lexeme: Option<LexemeId>,
    pub transitions: Vec<Transition>,
}

/// Two lexemes fully matched by the same DFA state. `lexeme_a` (lower
/// declaration order) is the one the DFA accepts; `lexeme_b` is shadowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ambiguity {
    pub lexeme_a: LexemeId,
    pub lexeme_b: LexemeId,
}

#[derive(Debug, Clone)]
pub struct Determinized {
    pub dfa: FiniteStateAutomaton,
    pub ambiguities: Vec<Ambiguity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiniteStateAutomaton {
    states: Vec<State>,
}

impl Default for FiniteStateAutomaton {
    fn default() -> Self {
        Self::new()
    }
}

impl FiniteStateAutomaton {
    /// An automaton holding only REJECT and START.
    pub fn new() -> Self {
        Self {
            states: vec![State::default(), State::default()],
        }
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, s: StateIndex) -> &State {
        &self.states[s]
    }

    pub fn add_state(&mut self) -> StateIndex {
        self.states.push(State::default());
        self.states.len() - 1
    }

    pub fn add_transition(&mut self, src: StateIndex, sym: Option<u8>, dst: StateIndex) {
        self.push_transition(
            src,
            Transition {
                sym,
                dst,
                produces_token: false,
            },
        );
    }

    pub fn add_epsilon_transition(&mut self, src: StateIndex, dst: StateIndex) {
        self.add_transition(src, None, dst);
    }

    pub(crate) fn push_transition(&mut self, src: StateIndex, t: Transition) {
        debug_assert_ne!(src, REJECT, "REJECT has no outgoing transitions");
        self.states[src].transitions.push(t);
    }

    /// Marks `state` as accepting `lexeme`; an existing lower-order lexeme stays.
    pub fn accept(&mut self, state: StateIndex, lexeme: LexemeId) {
        let slot = &mut self.states[state].lexeme;
        *slot = Some(slot.map_or(lexeme, |l| l.min(lexeme)));
    }

    /// The non-epsilon edge leaving `state` on `byte`, if any.
    pub fn step(&self, state: StateIndex, byte: u8) -> Option<Transition> {
        self.states[state]
            .transitions
            .iter()
            .find(|t| t.sym == Some(byte))
            .copied()
    }

    pub fn is_deterministic(&self) -> bool {
        self.states.iter().all(|s| {
            let mut seen = [false; 256];
            s.transitions.iter().all(|t| match t.sym {
                None => false,
                Some(b) => !std::mem::replace(&mut seen[b as usize], true),
            })
        })
    }

    /// Extends `set` with every state reachable through epsilon edges.
    pub fn epsilon_closure(&self, set: &mut BTreeSet<StateIndex>) {
        let mut work: Vec<StateIndex> = set.iter().copied().collect();
        while let Some(s) = work.pop() {
            for t in &self.states[s].transitions {
                if t.sym.is_none() && set.insert(t.dst) {
                    work.push(t.dst);
                }
            }
        }
    }

    fn move_on(&self, set: &[StateIndex], byte: u8) -> BTreeSet<StateIndex> {
        set.iter()
            .flat_map(|&s| self.states[s].transitions.iter())
            .filter(|t| t.sym == Some(byte))
            .map(|t| t.dst)
            .collect()
    }

    fn outgoing_symbols(&self, set: &[StateIndex]) -> BTreeSet<u8> {
        set.iter()
            .flat_map(|&s| self.states[s].transitions.iter())
            .filter_map(|t| t.sym)
            .collect()
    }

    /// Runs the whole input from START (following every epsilon path) and
    /// returns the lowest-order lexeme accepted at the end.
    pub fn accepts(&self, input: &[u8]) -> Option<LexemeId> {
        let mut current = BTreeSet::from([START]);
        self.epsilon_closure(&mut current);
        for &b in input {
            let key: Vec<StateIndex> = current.into_iter().collect();
            current = self.move_on(&key, b);
            if current.is_empty() {
                return None;
            }
            self.epsilon_closure(&mut current);
        }
        current
            .iter()
            .filter_map(|&s| self.states[s].lexeme)
            .min()
    }

    /// Subset construction from START.
    pub fn to_dfa(&self) -> Determinized {
        let mut sc = SubsetConstruction::new(self);
        sc.add_root(START);
        sc.run();
        sc.finish()
    }
}

/// Subset construction that may be seeded from several NFA roots; all of
/// them share one memo table and land in one DFA.
pub(crate) struct SubsetConstruction<'a> {
    nfa: &'a FiniteStateAutomaton,
    dfa: FiniteStateAutomaton,
    seen: HashMap<Vec<StateIndex>, StateIndex>,
    queue: VecDeque<(Vec<StateIndex>, StateIndex)>,
    ambiguities: BTreeSet<Ambiguity>,
}

impl<'a> SubsetConstruction<'a> {
    pub(crate) fn new(nfa: &'a FiniteStateAutomaton) -> Self {
        Self {
            nfa,
            dfa: FiniteStateAutomaton::new(),
            seen: HashMap::new(),
            queue: VecDeque::new(),
            ambiguities: BTreeSet::new(),
        }
    }

    /// Returns the DFA state for the epsilon closure of `nfa_root`. The
    /// NFA's START always becomes the DFA's START.
    pub(crate) fn add_root(&mut self, nfa_root: StateIndex) -> StateIndex {
        let mut set = BTreeSet::from([nfa_root]);
        self.nfa.epsilon_closure(&mut set);
        let key: Vec<StateIndex> = set.into_iter().collect();
        if nfa_root == START {
            if let Some(&d) = self.seen.get(&key) {
                return d;
            }
            self.register(key, START)
        } else {
            self.intern(key)
        }
    }

    fn intern(&mut self, key: Vec<StateIndex>) -> StateIndex {
        if key.is_empty() {
            return REJECT;
        }
        if let Some(&d) = self.seen.get(&key) {
            return d;
        }
        let d = self.dfa.add_state();
        self.register(key, d)
    }

    fn register(&mut self, key: Vec<StateIndex>, d: StateIndex) -> StateIndex {
        let mut lexemes: Vec<LexemeId> = key
            .iter()
            .filter_map(|&s| self.nfa.states[s].lexeme)
            .collect();
        lexemes.sort_unstable();
        lexemes.dedup();
        if let Some((&winner, shadowed)) = lexemes.split_first() {
            self.dfa.states[d].lexeme = Some(winner);
            for &l in shadowed {
                self.ambiguities.insert(Ambiguity {
                    lexeme_a: winner,
                    lexeme_b: l,
                });
            }
        }
        self.seen.insert(key.clone(), d);
        self.queue.push_back((key, d));
        d
    }

    pub(crate) fn run(&mut self) {
        let nfa = self.nfa;
        while let Some((key, d)) = self.queue.pop_front() {
            for b in nfa.outgoing_symbols(&key) {
                let mut target = nfa.move_on(&key, b);
                nfa.epsilon_closure(&mut target);
                let t = self.intern(target.into_iter().collect());
                self.dfa.add_transition(d, Some(b), t);
            }
        }
    }

    pub(crate) fn finish(self) -> Determinized {
        log::debug!(
            "[fsa] subset construction: {} nfa states -> {} dfa states",
            self.nfa.state_count(),
            self.dfa.state_count()
        );
        Determinized {
            dfa: self.dfa,
            ambiguities: self.ambiguities.into_iter().collect(),
        }
    }
}
