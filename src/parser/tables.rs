// src/parser/tables.rs
//! PSLS and LLP tables, keyed by admissible pairs of adjacent terminals.

use std::{
    collections::BTreeMap,
    io::{BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use super::{
    grammar::{Grammar, ProductionId, START_PRODUCTION, Symbol, Terminal},
    ll::{LlError, LlTable},
    llp::LlpError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PslsEntry {
    /// Top first.
    pub gamma: Vec<Symbol>,
    pub production: ProductionId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PslsTable {
    pub entries: BTreeMap<(Terminal, Terminal), PslsEntry>,
}

impl PslsTable {
    pub fn get(&self, x: &Terminal, y: &Terminal) -> Option<&PslsEntry> {
        self.entries.get(&(x.clone(), y.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the pair `(x, y)` does to the parse stack: pop `initial_stack`
/// (bottom to top, so the last symbol is popped first), apply
/// `productions`, then push `final_stack` (bottom to top).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlpEntry {
    pub initial_stack: Vec<Symbol>,
    pub final_stack: Vec<Symbol>,
    pub productions: Vec<ProductionId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlpTable {
    pub entries: BTreeMap<(Terminal, Terminal), LlpEntry>,
}

impl LlpTable {
    /// Expands every PSLS entry with the LL(1) table's partial parse.
    /// Pairs opening the input start from the start symbol instead and
    /// are driven by both `x` and `y`.
    pub fn build(grammar: &Grammar, ll: &LlTable, psls: &PslsTable) -> Result<Self, LlpError> {
        let mut entries = BTreeMap::new();
        for ((x, y), p) in &psls.entries {
            let wrap = |source: LlError| LlpError::PartialParse {
                x: x.clone(),
                y: y.clone(),
                source,
            };
            let mut productions = Vec::new();
            let entry = if *x == Terminal::StartOfInput {
                debug_assert_eq!(p.production, START_PRODUCTION);
                let mut stack = vec![Symbol::NonTerminal(grammar.start_symbol().clone())];
                ll.partial_parse(grammar, &mut stack, x, &mut productions)
                    .map_err(wrap)?;
                ll.partial_parse(grammar, &mut stack, y, &mut productions)
                    .map_err(wrap)?;
                LlpEntry {
                    initial_stack: Vec::new(),
                    final_stack: stack,
                    productions,
                }
            } else {
                let initial_stack: Vec<Symbol> = p.gamma.iter().rev().cloned().collect();
                let mut stack = initial_stack.clone();
                ll.partial_parse(grammar, &mut stack, y, &mut productions)
                    .map_err(wrap)?;
                LlpEntry {
                    initial_stack,
                    final_stack: stack,
                    productions,
                }
            };
            entries.insert((x.clone(), y.clone()), entry);
        }
        log::info!("[llp] table: {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn get(&self, x: &Terminal, y: &Terminal) -> Option<&LlpEntry> {
        self.entries.get(&(x.clone(), y.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write_json<W: Write>(&self, w: W, grammar: &Grammar) -> serde_json::Result<()> {
        serde_json::to_writer(w, &LlpTableDisk::new(self, grammar))
    }

    pub fn save_json(&self, path: &Path, grammar: &Grammar) -> std::io::Result<()> {
        let f = std::fs::File::create(path)?;
        let mut w = BufWriter::new(f);
        self.write_json(&mut w, grammar)?;
        w.flush()?;
        log::info!("[llp] saved parse tables to {}", path.display());
        Ok(())
    }

    pub fn load_json_bytes(data: &[u8]) -> Result<Self, String> {
        let disk: LlpTableDisk = serde_json::from_slice(data)
            .map_err(|e| format!("Failed to parse parse-table JSON: {e}"))?;
        let entries = disk
            .pairs
            .into_iter()
            .map(|p| {
                (
                    (p.x, p.y),
                    LlpEntry {
                        initial_stack: p.initial_stack,
                        final_stack: p.final_stack,
                        productions: p.productions,
                    },
                )
            })
            .collect();
        Ok(Self { entries })
    }
}

// -------------------- JSON (de)serialization --------------------

#[derive(Serialize, Deserialize)]
struct ProductionDisk {
    name: String,
    rule: String,
    arity: usize,
}

#[derive(Serialize, Deserialize)]
struct PairDisk {
    x: Terminal,
    y: Terminal,
    initial_stack: Vec<Symbol>,
    final_stack: Vec<Symbol>,
    productions: Vec<ProductionId>,
}

#[derive(Serialize, Deserialize)]
struct LlpTableDisk {
    productions: Vec<ProductionDisk>,
    pairs: Vec<PairDisk>,
}

impl LlpTableDisk {
    fn new(t: &LlpTable, grammar: &Grammar) -> Self {
        Self {
            productions: grammar
                .productions()
                .iter()
                .map(|p| ProductionDisk {
                    name: p.name().to_string(),
                    rule: p.to_string(),
                    arity: p.arity(),
                })
                .collect(),
            pairs: t
                .entries
                .iter()
                .map(|((x, y), e)| PairDisk {
                    x: x.clone(),
                    y: y.clone(),
                    initial_stack: e.initial_stack.clone(),
                    final_stack: e.final_stack.clone(),
                    productions: e.productions.clone(),
                })
                .collect(),
        }
    }
}
