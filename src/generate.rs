// src/generate.rs
//! The whole pipeline: lexical grammar to parallel lexer, CFG to LLP table.

use crate::{
    config::GeneratorConfig,
    diagnostics::DiagnosticsError,
    lexer::{
        grammar::{LexerDfa, LexicalGrammar},
        tables::{LexerError, ParallelLexer, StreamingDfa, build_parallel_lexer},
    },
    parser::{ParseTables, build_parse_tables, grammar::Grammar, llp::LlpError},
};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("invalid lexical grammar: {0}")]
    LexicalGrammar(#[source] DiagnosticsError),
    #[error("invalid grammar: {0}")]
    Grammar(#[source] DiagnosticsError),
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parser(#[from] LlpError),
}

#[derive(Debug, Clone)]
pub struct Artifacts {
    pub lexical_grammar: LexicalGrammar,
    pub lexer_dfa: LexerDfa,
    pub dfa: StreamingDfa,
    pub lexer: ParallelLexer,
    pub grammar: Grammar,
    pub parse: ParseTables,
}

impl Artifacts {
    pub fn lexeme_names(&self) -> Vec<String> {
        self.lexical_grammar
            .lexemes()
            .iter()
            .map(|l| l.name.clone())
            .collect()
    }
}

pub fn generate(
    lexical_source: &str,
    grammar_source: &str,
    config: &GeneratorConfig,
) -> Result<Artifacts, GenerateError> {
    let lexical_grammar =
        LexicalGrammar::parse(lexical_source).map_err(GenerateError::LexicalGrammar)?;
    let grammar = Grammar::parse(grammar_source).map_err(GenerateError::Grammar)?;
    grammar
        .check_terminals(|name| lexical_grammar.find(name).is_some())
        .map_err(GenerateError::Grammar)?;

    let lexer_dfa = lexical_grammar.build_lexer_dfa();
    let dfa = StreamingDfa::from_fsa(&lexer_dfa.fsa);
    let lexer = build_parallel_lexer(&dfa, config.max_parallel_states)?;

    let parse = build_parse_tables(&grammar, config.max_item_sets)?;

    Ok(Artifacts {
        lexical_grammar,
        lexer_dfa,
        dfa,
        lexer,
        grammar,
        parse,
    })
}
