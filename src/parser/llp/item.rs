// src/parser/llp/item.rs
use std::{collections::BTreeSet, fmt};

use crate::parser::grammar::{Grammar, ProductionId, Symbol, Terminal};

/// `[A -> α . β, lookback, lookahead, gamma]`. `gamma` is the stack the
/// pair (lookback, lookahead) leaves behind, top first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub production: ProductionId,
    pub dot: usize,
    pub lookback: Terminal,
    pub lookahead: Terminal,
    pub gamma: Vec<Symbol>,
}

impl Item {
    /// Symbol right before the dot.
    pub fn before_dot<'g>(&self, grammar: &'g Grammar) -> Option<&'g Symbol> {
        let p = grammar.production(self.production);
        self.dot.checked_sub(1).and_then(|i| p.rhs.get(i))
    }

    pub fn display<'a>(&'a self, grammar: &'a Grammar) -> ItemDisplay<'a> {
        ItemDisplay {
            item: self,
            grammar,
        }
    }
}

pub struct ItemDisplay<'a> {
    item: &'a Item,
    grammar: &'a Grammar,
}

impl fmt::Display for ItemDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.grammar.production(self.item.production);
        write!(f, "[{} ->", p.lhs)?;
        for (i, s) in p.rhs.iter().enumerate() {
            if i == self.item.dot {
                f.write_str(" .")?;
            }
            write!(f, " {s}")?;
        }
        if self.item.dot == p.rhs.len() {
            f.write_str(" .")?;
        }
        write!(f, ", {}, {}, [", self.item.lookback, self.item.lookahead)?;
        for (i, s) in self.item.gamma.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{s}")?;
        }
        f.write_str("]]")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemSet(pub BTreeSet<Item>);

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: Item) -> bool {
        self.0.insert(item)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.0.iter()
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.0.contains(item)
    }

    /// Symbols right before a dot, each once, in order.
    pub fn symbols_before_dots(&self, grammar: &Grammar) -> BTreeSet<Symbol> {
        self.0
            .iter()
            .filter_map(|i| i.before_dot(grammar).cloned())
            .collect()
    }
}
