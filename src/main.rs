// src/main.rs
// llpgen <lexical-grammar> <grammar> [out-dir]
//
// Writes <out-dir>/lexer_tables.json and <out-dir>/parse_tables.json
// (default out-dir: tables/). RUST_LOG=info shows table sizes.

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};

use anyhow::{Context, Result};
use llpgen::{
    GenerateError,
    GeneratorConfig,
    diagnostics::DiagnosticsError,
    generate,
    lexer::tables::save_tables_json,
};

fn usage() -> ExitCode {
    eprintln!("usage: llpgen <lexical-grammar> <grammar> [out-dir]");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (lex_path, grammar_path, out_dir) = match args.as_slice() {
        [l, g] => (PathBuf::from(l), PathBuf::from(g), PathBuf::from("tables")),
        [l, g, o] => (PathBuf::from(l), PathBuf::from(g), PathBuf::from(o)),
        _ => return usage(),
    };

    match run(&lex_path, &grammar_path, &out_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(lex_path: &Path, grammar_path: &Path, out_dir: &Path) -> Result<()> {
    let t0 = Instant::now();
    let lex_src = fs::read_to_string(lex_path)
        .with_context(|| format!("failed to read lexical grammar at {}", lex_path.display()))?;
    let grammar_src = fs::read_to_string(grammar_path)
        .with_context(|| format!("failed to read grammar at {}", grammar_path.display()))?;

    let config = GeneratorConfig::from_env();
    let artifacts = match generate(&lex_src, &grammar_src, &config) {
        Ok(a) => a,
        Err(e) => {
            match &e {
                GenerateError::LexicalGrammar(d) => print_diagnostics(lex_path, &lex_src, d),
                GenerateError::Grammar(d) => print_diagnostics(grammar_path, &grammar_src, d),
                _ => {}
            }
            return Err(e.into());
        }
    };

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let lexer_out = out_dir.join("lexer_tables.json");
    save_tables_json(&lexer_out, &artifacts.lexer, &artifacts.lexeme_names())
        .with_context(|| format!("failed to write {}", lexer_out.display()))?;

    let parse_out = out_dir.join("parse_tables.json");
    artifacts
        .parse
        .llp
        .save_json(&parse_out, &artifacts.grammar)
        .with_context(|| format!("failed to write {}", parse_out.display()))?;

    println!(
        "[llpgen] {} lexemes, {} parallel states ({} KiB merge table); {} productions, {} admissible pairs ({} ms)",
        artifacts.lexical_grammar.lexemes().len(),
        artifacts.lexer.state_count,
        artifacts.lexer.merge_table_bytes() / 1024,
        artifacts.grammar.productions().len(),
        artifacts.parse.llp.len(),
        t0.elapsed().as_millis()
    );
    println!(
        "[llpgen] wrote {} and {}",
        lexer_out.display(),
        parse_out.display()
    );
    Ok(())
}

fn print_diagnostics(path: &Path, source: &str, e: &DiagnosticsError) {
    eprint!(
        "{}",
        e.diagnostics.render(&path.display().to_string(), source)
    );
}
