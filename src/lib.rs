// src/lib.rs
//! Generator for parallel-composable lexers and LLP(1,1) parsing tables.
//!
//! The lexer side turns a lexical grammar into a DFA and then into a
//! [`lexer::tables::ParallelLexer`], whose merge table lets a data-parallel
//! engine lex with an associative scan. The parser side turns a context-free
//! grammar into an [`parser::tables::LlpTable`] indexed by admissible pairs of
//! adjacent terminals.

pub mod config;
pub mod diagnostics;
pub mod generate;
pub mod lexer;
pub mod parser;

pub use config::GeneratorConfig;
pub use generate::{Artifacts, GenerateError, generate};
