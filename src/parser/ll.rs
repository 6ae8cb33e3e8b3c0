// src/parser/ll.rs
use std::collections::BTreeMap;

use super::{
    grammar::{Grammar, NonTerminal, ProductionId, Symbol, Terminal},
    terminal_sets::TerminalSetFunctions,
};
use crate::diagnostics::SourceLocation;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlError {
    #[error("LL(1) conflict on ({nonterminal}, {terminal}) between '{first_rule}' and '{second_rule}'")]
    Conflict {
        nonterminal: NonTerminal,
        terminal: Terminal,
        first: ProductionId,
        second: ProductionId,
        first_rule: String,
        second_rule: String,
        first_loc: SourceLocation,
        second_loc: SourceLocation,
    },
    #[error("no LL(1) rule for ({nonterminal}, {terminal})")]
    NoRule {
        nonterminal: NonTerminal,
        terminal: Terminal,
    },
    #[error("expected {lookahead}, found {found} on top of the stack")]
    Mismatch { lookahead: Terminal, found: Terminal },
    #[error("stack emptied before {lookahead} was reached")]
    StackExhausted { lookahead: Terminal },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlTable {
    entries: BTreeMap<(NonTerminal, Terminal), ProductionId>,
}

impl LlTable {
    /// Classic LL(1) construction; the first doubly-filled cell is an error.
    pub fn build(grammar: &Grammar, sets: &TerminalSetFunctions) -> Result<Self, LlError> {
        let mut table = Self::default();
        for (id, p) in grammar.productions().iter().enumerate() {
            let first = sets.first(&p.rhs);
            let mut targets: Vec<&Terminal> = first.iter().filter(|t| !t.is_empty()).collect();
            if first.contains(&Terminal::Empty) {
                targets.extend(sets.follow_of(&p.lhs));
            }
            for t in targets {
                table.insert(grammar, p.lhs.clone(), t.clone(), id)?;
            }
        }
        log::info!("[ll] table: {} entries", table.entries.len());
        Ok(table)
    }

    fn insert(
        &mut self,
        grammar: &Grammar,
        nonterminal: NonTerminal,
        terminal: Terminal,
        id: ProductionId,
    ) -> Result<(), LlError> {
        match self.entries.get(&(nonterminal.clone(), terminal.clone())) {
            Some(&existing) if existing != id => {
                let (a, b) = (grammar.production(existing), grammar.production(id));
                Err(LlError::Conflict {
                    nonterminal,
                    terminal,
                    first: existing,
                    second: id,
                    first_rule: a.to_string(),
                    second_rule: b.to_string(),
                    first_loc: a.loc,
                    second_loc: b.loc,
                })
            }
            Some(_) => Ok(()),
            None => {
                self.entries.insert((nonterminal, terminal), id);
                Ok(())
            }
        }
    }

    pub fn get(&self, nonterminal: &NonTerminal, terminal: &Terminal) -> Option<ProductionId> {
        self.entries
            .get(&(nonterminal.clone(), terminal.clone()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(NonTerminal, Terminal), &ProductionId)> {
        self.entries.iter()
    }

    /// Expands the stack (top at the end) until `lookahead` is on top, then
    /// pops it. Applied productions are appended to `productions`.
    pub fn partial_parse(
        &self,
        grammar: &Grammar,
        stack: &mut Vec<Symbol>,
        lookahead: &Terminal,
        productions: &mut Vec<ProductionId>,
    ) -> Result<(), LlError> {
        loop {
            match stack.pop() {
                None => {
                    return Err(LlError::StackExhausted {
                        lookahead: lookahead.clone(),
                    });
                }
                Some(Symbol::Terminal(t)) => {
                    if t == *lookahead {
                        return Ok(());
                    }
                    return Err(LlError::Mismatch {
                        lookahead: lookahead.clone(),
                        found: t,
                    });
                }
                Some(Symbol::NonTerminal(n)) => {
                    let Some(id) = self.get(&n, lookahead) else {
                        return Err(LlError::NoRule {
                            nonterminal: n,
                            terminal: lookahead.clone(),
                        });
                    };
                    productions.push(id);
                    stack.extend(grammar.production(id).rhs.iter().rev().cloned());
                }
            }
        }
    }
}
