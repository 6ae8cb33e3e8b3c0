// src/lexer/tables/io.rs
use std::{
    io::{BufWriter, Write},
    path::Path,
    time::Instant,
};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::{ParallelLexer, ParallelTransition};
use crate::lexer::fsa::LexemeId;

// -------------------- JSON (de)serialization --------------------

#[serde_as]
#[derive(Serialize, Deserialize)]
struct ParallelLexerDisk {
    lexemes: Vec<String>,
    #[serde_as(as = "[_; 256]")]
    initial_states: [ParallelTransition; 256],
    merge_table: Vec<ParallelTransition>,
    final_states: Vec<Option<LexemeId>>,
    rejects: Vec<bool>,
    identity_state: u32,
    state_count: usize,
}

impl ParallelLexerDisk {
    fn new(t: &ParallelLexer, lexemes: &[String]) -> Self {
        Self {
            lexemes: lexemes.to_vec(),
            initial_states: t.initial_states,
            merge_table: t.merge_table.clone(),
            final_states: t.final_states.clone(),
            rejects: t.rejects.clone(),
            identity_state: t.identity_state,
            state_count: t.state_count,
        }
    }

    fn into_tables(self) -> Result<(ParallelLexer, Vec<String>), String> {
        let m = self.state_count;
        if self.merge_table.len() != m * m
            || self.final_states.len() != m
            || self.rejects.len() != m
        {
            return Err(format!(
                "inconsistent table sizes for {m} states: merge={} final={} rejects={}",
                self.merge_table.len(),
                self.final_states.len(),
                self.rejects.len()
            ));
        }
        let in_range = |id: u32| (id as usize) < m;
        if !in_range(self.identity_state) {
            return Err(format!(
                "identity state {} out of range for {m} states",
                self.identity_state
            ));
        }
        if let Some(t) = self
            .initial_states
            .iter()
            .chain(&self.merge_table)
            .find(|t| !in_range(t.result_state))
        {
            return Err(format!(
                "result state {} out of range for {m} states",
                t.result_state
            ));
        }
        if let Some(id) = self
            .final_states
            .iter()
            .flatten()
            .find(|&&id| id >= self.lexemes.len())
        {
            return Err(format!(
                "lexeme id {id} out of range for {} lexemes",
                self.lexemes.len()
            ));
        }
        let lexer = ParallelLexer {
            initial_states: self.initial_states,
            merge_table: self.merge_table,
            final_states: self.final_states,
            rejects: self.rejects,
            identity_state: self.identity_state,
            state_count: m,
        };
        Ok((lexer, self.lexemes))
    }
}

/// Writes the tables, plus the lexeme names their ids refer to.
pub fn write_tables_json<W: Write>(
    w: W,
    t: &ParallelLexer,
    lexemes: &[String],
) -> serde_json::Result<()> {
    serde_json::to_writer(w, &ParallelLexerDisk::new(t, lexemes))
}

pub fn save_tables_json(path: &Path, t: &ParallelLexer, lexemes: &[String]) -> std::io::Result<()> {
    let instant = Instant::now();
    // Stream to disk to avoid giant intermediate strings.
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    write_tables_json(&mut w, t, lexemes)?;
    w.flush()?;
    log::info!(
        "[tables] saved lexer tables to {} in {} ms",
        path.display(),
        instant.elapsed().as_millis()
    );
    Ok(())
}

pub fn load_tables_json_bytes(data: &[u8]) -> Result<(ParallelLexer, Vec<String>), String> {
    serde_json::from_slice::<ParallelLexerDisk>(data)
        .map_err(|e| format!("Failed to parse tables JSON: {e}"))?
        .into_tables()
}
