// src/parser/terminal_sets.rs
//! first / last / follow / before sets.
//!
//! `last` and `before` are the mirror images of `first` and `follow`: the
//! same fixed points, scanning right-hand sides right to left.

use std::collections::{BTreeSet, VecDeque};

use hashbrown::HashMap;

use super::grammar::{Grammar, NonTerminal, ProductionId, Symbol, Terminal};

pub type TerminalSet = BTreeSet<Terminal>;
pub type TerminalSets = HashMap<NonTerminal, TerminalSet>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// first / follow
    LeftToRight,
    /// last / before
    RightToLeft,
}

fn ordered<'s>(
    symbols: &'s [Symbol],
    dir: ScanDirection,
) -> Box<dyn Iterator<Item = &'s Symbol> + 's> {
    match dir {
        ScanDirection::LeftToRight => Box::new(symbols.iter()),
        ScanDirection::RightToLeft => Box::new(symbols.iter().rev()),
    }
}

fn empty_sets(grammar: &Grammar) -> TerminalSets {
    grammar
        .nonterminals()
        .iter()
        .map(|n| (n.clone(), TerminalSet::new()))
        .collect()
}

/// One greedy scan over `symbols` using finished base sets. Contains
/// `Empty` only when every symbol can vanish (so always for `[]`).
pub fn compute_first_or_last(
    symbols: &[Symbol],
    base: &TerminalSets,
    dir: ScanDirection,
) -> TerminalSet {
    let mut out = TerminalSet::new();
    for sym in ordered(symbols, dir) {
        match sym {
            Symbol::Terminal(Terminal::Empty) => continue,
            Symbol::Terminal(t) => {
                out.insert(t.clone());
                return out;
            }
            Symbol::NonTerminal(n) => {
                let Some(set) = base.get(n) else {
                    return out;
                };
                out.extend(set.iter().filter(|t| !t.is_empty()).cloned());
                if !set.contains(&Terminal::Empty) {
                    return out;
                }
            }
        }
    }
    out.insert(Terminal::Empty);
    out
}

/// Base first (or last) set of every nonterminal.
pub fn compute_base_first_or_last_set(grammar: &Grammar, dir: ScanDirection) -> TerminalSets {
    let mut sets = empty_sets(grammar);
    saturate_base_first_or_last(grammar, dir, &mut sets);
    sets
}

/// Runs the base fixed point starting from `sets`; returns whether
/// anything was added.
pub fn saturate_base_first_or_last(
    grammar: &Grammar,
    dir: ScanDirection,
    sets: &mut TerminalSets,
) -> bool {
    // Productions to revisit when a nonterminal's set grows.
    let mut users: HashMap<&NonTerminal, Vec<ProductionId>> = HashMap::new();
    for (id, p) in grammar.productions().iter().enumerate() {
        for s in &p.rhs {
            if let Symbol::NonTerminal(n) = s {
                let v = users.entry(n).or_default();
                if v.last() != Some(&id) {
                    v.push(id);
                }
            }
        }
    }

    let n = grammar.productions().len();
    let mut queued = vec![true; n];
    let mut work: VecDeque<ProductionId> = (0..n).collect();
    let mut changed = false;
    let mut steps = 0usize;

    while let Some(id) = work.pop_front() {
        queued[id] = false;
        steps += 1;
        let p = grammar.production(id);
        let found = compute_first_or_last(&p.rhs, sets, dir);
        let set = sets.entry(p.lhs.clone()).or_default();
        let before = set.len();
        set.extend(found);
        if set.len() == before {
            continue;
        }
        changed = true;
        for &u in users.get(&p.lhs).map_or(&[][..], Vec::as_slice) {
            if !queued[u] {
                queued[u] = true;
                work.push_back(u);
            }
        }
    }
    log::debug!("[terminal_sets] base {dir:?}: {steps} production visits");
    changed
}

/// Follow (or before) set of every nonterminal, from finished first (or
/// last) sets.
pub fn compute_follow_or_before_sets(
    grammar: &Grammar,
    base: &TerminalSets,
    dir: ScanDirection,
) -> TerminalSets {
    let mut sets = empty_sets(grammar);
    saturate_follow_or_before(grammar, base, dir, &mut sets);
    sets
}

pub fn saturate_follow_or_before(
    grammar: &Grammar,
    base: &TerminalSets,
    dir: ScanDirection,
    sets: &mut TerminalSets,
) -> bool {
    let mut changed = false;
    // lhs -> nonterminals whose neighbouring context can vanish up to the
    // rule boundary; they inherit everything lhs gets.
    let mut inherits: HashMap<NonTerminal, BTreeSet<NonTerminal>> = HashMap::new();

    for p in grammar.productions() {
        for (i, sym) in p.rhs.iter().enumerate() {
            let Symbol::NonTerminal(n) = sym else {
                continue;
            };
            let context = match dir {
                ScanDirection::LeftToRight => &p.rhs[i + 1..],
                ScanDirection::RightToLeft => &p.rhs[..i],
            };
            let found = compute_first_or_last(context, base, dir);
            if found.contains(&Terminal::Empty) && *n != p.lhs {
                inherits.entry(p.lhs.clone()).or_default().insert(n.clone());
            }
            let set = sets.entry(n.clone()).or_default();
            let before = set.len();
            set.extend(found.into_iter().filter(|t| !t.is_empty()));
            changed |= set.len() != before;
        }
    }

    let mut work: VecDeque<NonTerminal> = grammar.nonterminals().iter().cloned().collect();
    while let Some(a) = work.pop_front() {
        let Some(targets) = inherits.get(&a) else {
            continue;
        };
        let from = sets.get(&a).cloned().unwrap_or_default();
        for b in targets {
            let set = sets.entry(b.clone()).or_default();
            let before = set.len();
            set.extend(from.iter().cloned());
            if set.len() != before {
                changed = true;
                work.push_back(b.clone());
            }
        }
    }
    changed
}

/// All four set families of a grammar.
#[derive(Debug, Clone)]
pub struct TerminalSetFunctions {
    first: TerminalSets,
    last: TerminalSets,
    follow: TerminalSets,
    before: TerminalSets,
    none: TerminalSet,
}

impl TerminalSetFunctions {
    pub fn new(grammar: &Grammar) -> Self {
        let first = compute_base_first_or_last_set(grammar, ScanDirection::LeftToRight);
        let last = compute_base_first_or_last_set(grammar, ScanDirection::RightToLeft);
        let follow = compute_follow_or_before_sets(grammar, &first, ScanDirection::LeftToRight);
        let before = compute_follow_or_before_sets(grammar, &last, ScanDirection::RightToLeft);
        Self {
            first,
            last,
            follow,
            before,
            none: TerminalSet::new(),
        }
    }

    pub fn first_sets(&self) -> &TerminalSets {
        &self.first
    }

    pub fn last_sets(&self) -> &TerminalSets {
        &self.last
    }

    pub fn follow_sets(&self) -> &TerminalSets {
        &self.follow
    }

    pub fn before_sets(&self) -> &TerminalSets {
        &self.before
    }

    pub fn first_of(&self, n: &NonTerminal) -> &TerminalSet {
        self.first.get(n).unwrap_or(&self.none)
    }

    pub fn last_of(&self, n: &NonTerminal) -> &TerminalSet {
        self.last.get(n).unwrap_or(&self.none)
    }

    pub fn follow_of(&self, n: &NonTerminal) -> &TerminalSet {
        self.follow.get(n).unwrap_or(&self.none)
    }

    pub fn before_of(&self, n: &NonTerminal) -> &TerminalSet {
        self.before.get(n).unwrap_or(&self.none)
    }

    pub fn first(&self, symbols: &[Symbol]) -> TerminalSet {
        compute_first_or_last(symbols, &self.first, ScanDirection::LeftToRight)
    }

    pub fn last(&self, symbols: &[Symbol]) -> TerminalSet {
        compute_first_or_last(symbols, &self.last, ScanDirection::RightToLeft)
    }

    pub fn can_vanish(&self, n: &NonTerminal) -> bool {
        self.first_of(n).contains(&Terminal::Empty)
    }
}
