// src/parser/grammar.rs
//! Context-free grammar model. Productions live in one arena and are
//! referred to by index everywhere else.

use std::{collections::BTreeSet, fmt};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, DiagnosticsError, SourceLocation};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Terminal {
    UserDefined(String),
    Empty,
    StartOfInput,
    EndOfInput,
}

impl Terminal {
    pub fn user(name: impl Into<String>) -> Self {
        Terminal::UserDefined(name.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Terminal::Empty)
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::UserDefined(name) => write!(f, "'{name}'"),
            Terminal::Empty => f.write_str("$empty"),
            Terminal::StartOfInput => f.write_str("$soi"),
            Terminal::EndOfInput => f.write_str("$eoi"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonTerminal(pub String);

impl NonTerminal {
    pub fn new(name: impl Into<String>) -> Self {
        NonTerminal(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    Terminal(Terminal),
    NonTerminal(NonTerminal),
}

impl Symbol {
    pub fn terminal(name: impl Into<String>) -> Self {
        Symbol::Terminal(Terminal::user(name))
    }

    pub fn nonterminal(name: impl Into<String>) -> Self {
        Symbol::NonTerminal(NonTerminal::new(name))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(t) => t.fmt(f),
            Symbol::NonTerminal(n) => n.fmt(f),
        }
    }
}

pub type ProductionId = usize;

/// The start rule is always production 0.
pub const START_PRODUCTION: ProductionId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub loc: SourceLocation,
    pub tag: Option<String>,
    pub lhs: NonTerminal,
    pub rhs: Vec<Symbol>,
}

impl Production {
    pub fn new(lhs: &str, rhs: Vec<Symbol>) -> Self {
        Self {
            loc: SourceLocation::default(),
            tag: None,
            lhs: NonTerminal::new(lhs),
            rhs,
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    /// Number of nonterminals on the right-hand side.
    pub fn arity(&self) -> usize {
        self.rhs
            .iter()
            .filter(|s| matches!(s, Symbol::NonTerminal(_)))
            .count()
    }

    /// The tag, or the left-hand side for untagged productions.
    pub fn name(&self) -> &str {
        self.tag.as_deref().unwrap_or(self.lhs.name())
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lhs)?;
        if let Some(tag) = &self.tag {
            write!(f, " [{tag}]")?;
        }
        f.write_str(" ->")?;
        for s in &self.rhs {
            write!(f, " {s}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Grammar {
    productions: Vec<Production>,
    by_lhs: HashMap<NonTerminal, Vec<ProductionId>>,
    /// Nonterminals in order of first definition.
    nonterminals: Vec<NonTerminal>,
}

impl Grammar {
    /// Validates and indexes `productions`; production 0 is the start rule
    /// and must read `S -> $soi ... $eoi`.
    pub fn new(productions: Vec<Production>) -> Result<Self, DiagnosticsError> {
        Self::with_diagnostics(productions, Diagnostics::new())
    }

    /// Like `new`, but fails with `diagnostics` (earlier syntax errors)
    /// merged ahead of the validation errors.
    pub(crate) fn with_diagnostics(
        productions: Vec<Production>,
        mut diagnostics: Diagnostics,
    ) -> Result<Self, DiagnosticsError> {
        let grammar = Self::new_unchecked(productions);
        grammar.validate(&mut diagnostics);
        diagnostics.into_result("grammar")?;
        log::info!(
            "[grammar] {} productions, {} nonterminals",
            grammar.productions.len(),
            grammar.nonterminals.len()
        );
        Ok(grammar)
    }

    fn new_unchecked(productions: Vec<Production>) -> Self {
        let mut by_lhs: HashMap<NonTerminal, Vec<ProductionId>> = HashMap::new();
        let mut nonterminals = Vec::new();
        for (id, p) in productions.iter().enumerate() {
            by_lhs
                .entry(p.lhs.clone())
                .or_insert_with(|| {
                    nonterminals.push(p.lhs.clone());
                    Vec::new()
                })
                .push(id);
        }
        Self {
            productions,
            by_lhs,
            nonterminals,
        }
    }

    fn validate(&self, diagnostics: &mut Diagnostics) {
        let Some(start) = self.productions.first() else {
            diagnostics.error(0, "grammar has no productions");
            return;
        };

        let shaped = start.rhs.len() >= 2
            && start.rhs.first() == Some(&Symbol::Terminal(Terminal::StartOfInput))
            && start.rhs.last() == Some(&Symbol::Terminal(Terminal::EndOfInput));
        if !shaped {
            diagnostics.error(
                start.loc.offset,
                format!(
                    "start rule must read '{} -> <left delimiter> ... <right delimiter>'",
                    start.lhs
                ),
            );
        }

        let mut tags: HashMap<&str, &Production> = HashMap::new();
        for (id, p) in self.productions.iter().enumerate() {
            if id != START_PRODUCTION && p.lhs == start.lhs {
                diagnostics.error(p.loc.offset, format!("duplicate start rule for '{}'", p.lhs));
                diagnostics.note(start.loc.offset, "start rule defined here");
            }
            if let Some(tag) = &p.tag {
                if let Some(first) = tags.get(tag.as_str()) {
                    diagnostics.error(p.loc.offset, format!("duplicate production tag '{tag}'"));
                    diagnostics.note(first.loc.offset, "first used here");
                } else {
                    tags.insert(tag.as_str(), p);
                }
            }

            let last = p.rhs.len().saturating_sub(1);
            for (i, sym) in p.rhs.iter().enumerate() {
                match sym {
                    Symbol::Terminal(Terminal::StartOfInput) if id == START_PRODUCTION && i == 0 => {}
                    Symbol::Terminal(Terminal::EndOfInput) if id == START_PRODUCTION && i == last => {}
                    Symbol::Terminal(t @ (Terminal::StartOfInput | Terminal::EndOfInput)) => {
                        diagnostics.error(
                            p.loc.offset,
                            format!("input delimiter {t} may only open and close the start rule"),
                        );
                    }
                    Symbol::Terminal(Terminal::Empty) => {
                        diagnostics.error(p.loc.offset, "the empty terminal cannot appear in a rule");
                    }
                    Symbol::Terminal(Terminal::UserDefined(_)) => {}
                    Symbol::NonTerminal(n) => {
                        if *n == start.lhs {
                            diagnostics.error(
                                p.loc.offset,
                                format!("start nonterminal '{n}' used on a right-hand side"),
                            );
                        } else if !self.by_lhs.contains_key(n) {
                            diagnostics.error(p.loc.offset, format!("undefined nonterminal '{n}'"));
                        }
                    }
                }
            }
        }
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id]
    }

    pub fn start(&self) -> &Production {
        &self.productions[START_PRODUCTION]
    }

    pub fn start_symbol(&self) -> &NonTerminal {
        &self.start().lhs
    }

    pub fn productions_for(&self, n: &NonTerminal) -> &[ProductionId] {
        self.by_lhs.get(n).map_or(&[], Vec::as_slice)
    }

    pub fn nonterminals(&self) -> &[NonTerminal] {
        &self.nonterminals
    }

    /// User-defined terminals, in order.
    pub fn terminals(&self) -> BTreeSet<Terminal> {
        self.productions
            .iter()
            .flat_map(|p| p.rhs.iter())
            .filter_map(|s| match s {
                Symbol::Terminal(t @ Terminal::UserDefined(_)) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn find_tag(&self, tag: &str) -> Option<ProductionId> {
        self.productions
            .iter()
            .position(|p| p.tag.as_deref() == Some(tag))
    }

    /// Reports every user terminal for which `known` is false.
    pub fn check_terminals<F>(&self, known: F) -> Result<(), DiagnosticsError>
    where
        F: Fn(&str) -> bool,
    {
        let mut diagnostics = Diagnostics::new();
        let mut reported = BTreeSet::new();
        for p in &self.productions {
            for s in &p.rhs {
                if let Symbol::Terminal(Terminal::UserDefined(name)) = s {
                    if !known(name) && reported.insert(name.as_str()) {
                        diagnostics.error(
                            p.loc.offset,
                            format!("terminal '{name}' is not a lexeme of the lexical grammar"),
                        );
                    }
                }
            }
        }
        diagnostics.into_result("grammar")
    }
}
