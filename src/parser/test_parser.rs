// src/parser/test_parser.rs
//! Sequential reference check of an LLP table: look every adjacent pair up
//! independently, then match the resulting brackets with one stack.

use super::{
    grammar::{ProductionId, Symbol, Terminal},
    tables::LlpTable,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Bracket {
    Left(Symbol),
    Right(Symbol),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestParseError {
    #[error("pair ({x}, {y}) at position {position} is not admissible")]
    MissingPair {
        position: usize,
        x: Terminal,
        y: Terminal,
    },
    #[error("bracket {position}: closing {found} but {}", describe_open(.expected))]
    Mismatch {
        position: usize,
        expected: Option<Symbol>,
        found: Symbol,
    },
    #[error("{open} bracket(s) left open at end of input")]
    Unclosed { open: usize },
}

fn describe_open(expected: &Option<Symbol>) -> String {
    match expected {
        Some(s) => format!("{s} is open"),
        None => "nothing is open".to_string(),
    }
}

pub struct TestParser<'t> {
    table: &'t LlpTable,
}

impl<'t> TestParser<'t> {
    pub fn new(table: &'t LlpTable) -> Self {
        Self { table }
    }

    /// Brackets and productions of every adjacent pair of
    /// `$soi input $eoi`, concatenated in input order.
    pub fn brackets(
        &self,
        input: &[Terminal],
    ) -> Result<(Vec<Bracket>, Vec<ProductionId>), TestParseError> {
        let wrapped: Vec<&Terminal> = std::iter::once(&Terminal::StartOfInput)
            .chain(input)
            .chain(std::iter::once(&Terminal::EndOfInput))
            .collect();

        let mut brackets = Vec::new();
        let mut productions = Vec::new();
        for (position, pair) in wrapped.windows(2).enumerate() {
            let (x, y) = (pair[0], pair[1]);
            let entry = self
                .table
                .get(x, y)
                .ok_or_else(|| TestParseError::MissingPair {
                    position,
                    x: x.clone(),
                    y: y.clone(),
                })?;
            brackets.extend(entry.initial_stack.iter().rev().cloned().map(Bracket::Right));
            brackets.extend(entry.final_stack.iter().cloned().map(Bracket::Left));
            productions.extend_from_slice(&entry.productions);
        }
        Ok((brackets, productions))
    }

    /// Left production sequence of `input`, if the table accepts it.
    pub fn derive(&self, input: &[Terminal]) -> Result<Vec<ProductionId>, TestParseError> {
        let (brackets, productions) = self.brackets(input)?;
        verify_brackets(&brackets)?;
        Ok(productions)
    }

    pub fn parse(&self, input: &[Terminal]) -> bool {
        self.derive(input).is_ok()
    }
}

pub fn verify_brackets(brackets: &[Bracket]) -> Result<(), TestParseError> {
    let mut stack: Vec<&Symbol> = Vec::new();
    for (position, b) in brackets.iter().enumerate() {
        match b {
            Bracket::Left(s) => stack.push(s),
            Bracket::Right(s) => match stack.pop() {
                Some(top) if top == s => {}
                top => {
                    return Err(TestParseError::Mismatch {
                        position,
                        expected: top.cloned(),
                        found: s.clone(),
                    });
                }
            },
        }
    }
    if stack.is_empty() {
        Ok(())
    } else {
        Err(TestParseError::Unclosed { open: stack.len() })
    }
}
