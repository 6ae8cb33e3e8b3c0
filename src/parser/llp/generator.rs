// src/parser/llp/generator.rs
use std::{
    collections::{BTreeMap, VecDeque},
    time::Instant,
};

use hashbrown::HashMap;

use super::{Item, ItemSet, LlpError};
use crate::parser::{
    grammar::{Grammar, ProductionId, START_PRODUCTION, Symbol, Terminal},
    tables::{PslsEntry, PslsTable},
    terminal_sets::{TerminalSet, TerminalSetFunctions},
};

pub struct LlpGenerator<'g> {
    grammar: &'g Grammar,
    sets: &'g TerminalSetFunctions,
}

impl<'g> LlpGenerator<'g> {
    pub fn new(grammar: &'g Grammar, sets: &'g TerminalSetFunctions) -> Self {
        Self { grammar, sets }
    }

    /// `[S -> $soi ... $eoi ., $eoi, $empty, []]`
    pub fn initial_item(&self) -> Item {
        Item {
            production: START_PRODUCTION,
            dot: self.grammar.start().rhs.len(),
            lookback: Terminal::EndOfInput,
            lookahead: Terminal::Empty,
            gamma: Vec::new(),
        }
    }

    /// Terminals that can stand right before the dot: `last` of what lies
    /// before it, falling back to `before(lhs)` when that can vanish.
    /// The start rule has nothing before it.
    fn lookbacks(&self, production: ProductionId, dot: usize) -> TerminalSet {
        let p = self.grammar.production(production);
        let mut out = self.sets.last(&p.rhs[..dot]);
        if out.remove(&Terminal::Empty) && production != START_PRODUCTION {
            out.extend(
                self.sets
                    .before_of(&p.lhs)
                    .iter()
                    .filter(|t| !t.is_empty())
                    .cloned(),
            );
        }
        out
    }

    /// Stack left by moving the dot over `sym` when the next terminal is `v`.
    /// When `v` is not in `first(sym)`, the old gamma stays under `sym`
    /// instead of `v` itself: its top is what derives `v`.
    pub fn compute_gamma(&self, v: &Terminal, sym: &Symbol, old: &[Symbol]) -> Vec<Symbol> {
        let mut gamma = vec![sym.clone()];
        if let Symbol::NonTerminal(n) = sym {
            if !self.sets.first_of(n).contains(v) {
                // `sym` vanishes; `v` comes from what the old gamma derives.
                gamma.extend(old.iter().cloned());
            }
        }
        gamma
    }

    pub fn predecessor(&self, set: &ItemSet, sym: &Symbol) -> ItemSet {
        let mut out = ItemSet::new();
        for item in set.iter() {
            if item.before_dot(self.grammar) != Some(sym) {
                continue;
            }
            let dot = item.dot - 1;
            let lookbacks = self.lookbacks(item.production, dot);
            let lookaheads = self
                .sets
                .first(&[sym.clone(), Symbol::Terminal(item.lookahead.clone())]);
            for v in &lookaheads {
                let gamma = self.compute_gamma(v, sym, &item.gamma);
                for u in &lookbacks {
                    out.insert(Item {
                        production: item.production,
                        dot,
                        lookback: u.clone(),
                        lookahead: v.clone(),
                        gamma: gamma.clone(),
                    });
                }
            }
        }
        out
    }

    pub fn closure(&self, mut set: ItemSet) -> ItemSet {
        let mut work: Vec<Item> = set.iter().cloned().collect();
        while let Some(item) = work.pop() {
            let Some(Symbol::NonTerminal(n)) = item.before_dot(self.grammar) else {
                continue;
            };
            for &q in self.grammar.productions_for(n) {
                let dot = self.grammar.production(q).rhs.len();
                for u in self.lookbacks(q, dot) {
                    let new = Item {
                        production: q,
                        dot,
                        lookback: u,
                        lookahead: item.lookahead.clone(),
                        gamma: item.gamma.clone(),
                    };
                    if !set.contains(&new) {
                        set.insert(new.clone());
                        work.push(new);
                    }
                }
            }
        }
        set
    }

    /// Breadth-first over predecessor sets; set ids follow discovery order.
    pub fn build_automaton(&self, max_item_sets: usize) -> Result<Vec<ItemSet>, LlpError> {
        let t0 = Instant::now();
        let mut initial = ItemSet::new();
        initial.insert(self.initial_item());
        let initial = self.closure(initial);

        let mut sets = vec![initial.clone()];
        let mut seen: HashMap<ItemSet, usize> = HashMap::new();
        seen.insert(initial, 0);
        let mut queue = VecDeque::from([0usize]);

        while let Some(i) = queue.pop_front() {
            for sym in sets[i].symbols_before_dots(self.grammar) {
                let next = self.closure(self.predecessor(&sets[i], &sym));
                if next.is_empty() || seen.contains_key(&next) {
                    continue;
                }
                if sets.len() >= max_item_sets {
                    return Err(LlpError::TooManyItemSets {
                        limit: max_item_sets,
                    });
                }
                seen.insert(next.clone(), sets.len());
                queue.push_back(sets.len());
                sets.push(next);
            }
        }

        log::info!(
            "[llp] {} item sets, {} items ({} ms)",
            sets.len(),
            sets.iter().map(ItemSet::len).sum::<usize>(),
            t0.elapsed().as_millis()
        );
        Ok(sets)
    }

    /// Admissible pairs, from items whose dot follows a terminal.
    pub fn extract_psls(&self, item_sets: &[ItemSet]) -> Result<PslsTable, LlpError> {
        let mut entries: BTreeMap<(Terminal, Terminal), PslsEntry> = BTreeMap::new();
        for item in item_sets.iter().flat_map(ItemSet::iter) {
            if !matches!(item.before_dot(self.grammar), Some(Symbol::Terminal(_)))
                || item.lookback.is_empty()
                || item.lookahead.is_empty()
            {
                continue;
            }
            let key = (item.lookback.clone(), item.lookahead.clone());
            match entries.get(&key) {
                Some(e) if e.production != item.production || e.gamma != item.gamma => {
                    return Err(self.conflict(key, e.production, item.production));
                }
                Some(_) => {}
                None => {
                    entries.insert(
                        key,
                        PslsEntry {
                            gamma: item.gamma.clone(),
                            production: item.production,
                        },
                    );
                }
            }
        }
        log::info!("[llp] psls: {} admissible pairs", entries.len());
        Ok(PslsTable { entries })
    }

    fn conflict(&self, (x, y): (Terminal, Terminal), a: ProductionId, b: ProductionId) -> LlpError {
        let (pa, pb) = (self.grammar.production(a), self.grammar.production(b));
        LlpError::PslsConflict {
            x,
            y,
            first: a,
            second: b,
            first_rule: pa.to_string(),
            second_rule: pb.to_string(),
            first_loc: pa.loc,
            second_loc: pb.loc,
        }
    }
}
