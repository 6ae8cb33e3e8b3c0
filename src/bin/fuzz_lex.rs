// src/bin/fuzz_lex.rs
// Random inputs over a lexical grammar; the sequential DFA walk must agree
// with both parallel-lexer scans.
//
//   fuzz_lex [lexical-grammar]          (default: grammar/calc.lex)
//   FUZZ_SEED=42 FUZZ_ITERS=20 FUZZ_LEN=4096 FUZZ_BLOCK=64
//
// Inputs are drawn from the bytes some lexeme starts with, so most of
// them lex; rejected inputs must be rejected by every path at the same
// offset.

use std::{fs, time::Instant};

use anyhow::{Context, Result, bail};
use llpgen::{
    GeneratorConfig,
    lexer::{
        cpu::{LexError, Token, lex_on_cpu},
        grammar::LexicalGrammar,
        tables::{StreamingDfa, build_parallel_lexer},
    },
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "grammar/calc.lex".to_string());
    let src = fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?;
    let grammar = match LexicalGrammar::parse(&src) {
        Ok(g) => g,
        Err(e) => {
            eprint!("{}", e.diagnostics.render(&path, &src));
            return Err(e.into());
        }
    };

    let t0 = Instant::now();
    let lexer_dfa = grammar.build_lexer_dfa();
    let dfa = StreamingDfa::from_fsa(&lexer_dfa.fsa);
    let config = GeneratorConfig::from_env();
    let lexer = build_parallel_lexer(&dfa, config.max_parallel_states)?;
    eprintln!(
        "[fuzz] {} dfa states, {} parallel states (built in {} ms)",
        dfa.n_states(),
        lexer.state_count,
        t0.elapsed().as_millis()
    );

    let seed: u64 = env_or("FUZZ_SEED", 42);
    let iters: usize = env_or("FUZZ_ITERS", 20);
    let len: usize = env_or("FUZZ_LEN", 4096);
    let block: usize = env_or("FUZZ_BLOCK", 64);
    eprintln!("[fuzz] len={len} iters={iters} seed={seed} block={block}");

    let alphabet = alphabet(&dfa);
    if alphabet.is_empty() {
        bail!("no byte leaves the start state");
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut lexed = 0usize;

    for i in 0..iters {
        let input = gen_input(&mut rng, &alphabet, len);
        let cpu = lex_on_cpu(&dfa, &input);
        let seq = lexer.lex(&input);
        let par = lexer.lex_parallel(&input, block);

        if !same(&cpu, &seq) || !same(&cpu, &par) {
            dump(&grammar, &input, &cpu, &seq, &par);
            bail!("iter {i}: parallel lexer disagrees with the sequential walk");
        }
        if let Ok(tokens) = &cpu {
            lexed += 1;
            eprintln!("[fuzz] iter {i}: {} bytes -> {} tokens OK", input.len(), tokens.len());
        } else {
            eprintln!("[fuzz] iter {i}: {} bytes -> rejected by all paths OK", input.len());
        }
    }
    eprintln!("[fuzz] all {iters} iterations matched ({lexed} lexed)");
    Ok(())
}

/// Bytes with an edge out of START, so generated inputs are mostly lexable.
fn alphabet(dfa: &StreamingDfa) -> Vec<u8> {
    (0u8..=255)
        .filter(|&b| dfa.step(dfa.start, b).state != dfa.reject)
        .collect()
}

fn gen_input<R: Rng>(rng: &mut R, alphabet: &[u8], len: usize) -> Vec<u8> {
    let n = rng.random_range(1..=len.max(1));
    (0..n)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect()
}

fn same(a: &Result<Vec<Token>, LexError>, b: &Result<Vec<Token>, LexError>) -> bool {
    match (a, b) {
        (Ok(x), Ok(y)) => x == y,
        (Err(x), Err(y)) => x.offset() == y.offset(),
        _ => false,
    }
}

fn dump(
    grammar: &LexicalGrammar,
    input: &[u8],
    cpu: &Result<Vec<Token>, LexError>,
    seq: &Result<Vec<Token>, LexError>,
    par: &Result<Vec<Token>, LexError>,
) {
    for (who, r) in [("cpu", cpu), ("scan", seq), ("blocks", par)] {
        match r {
            Ok(tokens) => {
                eprintln!("--- {who}: {} tokens ---", tokens.len());
                for t in tokens.iter().take(16) {
                    eprintln!(
                        "  {:>12} @{}+{} {:?}",
                        grammar.lexeme(t.lexeme).name,
                        t.start,
                        t.len,
                        String::from_utf8_lossy(&input[t.start..t.start + t.len])
                    );
                }
            }
            Err(e) => eprintln!("--- {who}: {e}"),
        }
    }
}
