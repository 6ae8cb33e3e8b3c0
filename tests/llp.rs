//! LL(1), LLP(1,1) item sets, PSLS and LLP tables, and the bracket check.

use llpgen::{
    GenerateError,
    GeneratorConfig,
    generate,
    parser::{
        ParseTables,
        build_parse_tables,
        grammar::{Grammar, NonTerminal, ProductionId, START_PRODUCTION, Symbol, Terminal},
        ll::{LlError, LlTable},
        llp::{LlpError, LlpGenerator},
        tables::LlpTable,
        terminal_sets::TerminalSetFunctions,
        test_parser::{Bracket, TestParseError, TestParser, verify_brackets},
    },
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const CALC_LEX: &str = include_str!("../grammar/calc.lex");
const CALC: &str = include_str!("../grammar/calc.g");
const DELIMS: &str = "%left_delim = 'bof';\n%right_delim = 'eof';\n";

fn tables(src: &str) -> (Grammar, ParseTables) {
    let g = Grammar::parse(src).expect("grammar should parse");
    let t = build_parse_tables(&g, 10_000).expect("grammar should be LLP(1,1)");
    (g, t)
}

fn terminals(names: &[&str]) -> Vec<Terminal> {
    names.iter().map(|n| Terminal::user(*n)).collect()
}

fn nt(name: &str) -> Symbol {
    Symbol::nonterminal(name)
}

/// Plain LL(1) parse of `$soi input $eoi`, one partial parse per terminal.
fn ll_derive(g: &Grammar, ll: &LlTable, input: &[Terminal]) -> Result<Vec<ProductionId>, LlError> {
    let mut stack = vec![Symbol::NonTerminal(g.start_symbol().clone())];
    let mut productions = Vec::new();
    let wrapped = std::iter::once(Terminal::StartOfInput)
        .chain(input.iter().cloned())
        .chain(std::iter::once(Terminal::EndOfInput));
    for t in wrapped {
        ll.partial_parse(g, &mut stack, &t, &mut productions)?;
    }
    Ok(productions)
}

fn names(g: &Grammar, ids: &[ProductionId]) -> Vec<String> {
    ids.iter().map(|&id| g.production(id).name().to_string()).collect()
}

/// Random sentence of the calc grammar.
fn calc_expr(rng: &mut StdRng, depth: usize, out: &mut Vec<Terminal>) {
    calc_term(rng, depth, out);
    while rng.random_bool(0.4) {
        out.push(Terminal::user(if rng.random_bool(0.5) { "plus" } else { "minus" }));
        calc_term(rng, depth, out);
    }
}

fn calc_term(rng: &mut StdRng, depth: usize, out: &mut Vec<Terminal>) {
    calc_factor(rng, depth, out);
    while rng.random_bool(0.3) {
        out.push(Terminal::user(if rng.random_bool(0.5) { "star" } else { "slash" }));
        calc_factor(rng, depth, out);
    }
}

fn calc_factor(rng: &mut StdRng, depth: usize, out: &mut Vec<Terminal>) {
    match rng.random_range(0..3) {
        2 if depth > 0 => {
            out.push(Terminal::user("lparen"));
            calc_expr(rng, depth - 1, out);
            out.push(Terminal::user("rparen"));
        }
        1 => out.push(Terminal::user("ident")),
        _ => out.push(Terminal::user("num")),
    }
}

#[test]
fn left_recursion_is_rejected_by_the_ll_table() {
    let src = format!("{DELIMS}s -> 'bof' e 'eof';\ne -> e '+' t;\ne -> t;\nt -> 'a';\n");
    let g = Grammar::parse(&src).unwrap();
    let err = build_parse_tables(&g, 10_000).unwrap_err();
    match err {
        LlpError::Ll(LlError::Conflict {
            nonterminal,
            terminal,
            first,
            second,
            ..
        }) => {
            assert_eq!(nonterminal, NonTerminal::new("e"));
            assert_eq!(terminal, Terminal::user("a"));
            assert_eq!((first, second), (1, 2));
        }
        other => panic!("expected an LL(1) conflict, got {other:?}"),
    }
}

#[test]
fn right_recursive_sum() {
    let src = format!(
        "{DELIMS}s -> 'bof' e 'eof';\ne -> t ep;\nep -> '+' t ep;\nep -> ;\nt -> 'a';\n"
    );
    let (g, t) = tables(&src);
    let a = Terminal::user("a");
    let plus = Terminal::user("+");

    let entry = t.llp.get(&a, &plus).unwrap();
    assert_eq!(entry.initial_stack, vec![nt("ep")]);
    assert_eq!(entry.productions, vec![2]);
    assert_eq!(entry.final_stack, vec![nt("ep"), nt("t")]);

    let psls = t.psls.get(&a, &plus).unwrap();
    assert_eq!(psls.gamma, vec![nt("ep")]);
    assert_eq!(psls.production, 4);

    let start = t.llp.get(&Terminal::StartOfInput, &a).unwrap();
    assert!(start.initial_stack.is_empty());
    assert_eq!(start.productions, vec![0, 1, 4]);
    assert_eq!(
        start.final_stack,
        vec![Symbol::Terminal(Terminal::EndOfInput), nt("ep")]
    );

    let parser = TestParser::new(&t.llp);
    let input = vec![a.clone(), plus.clone(), a.clone()];
    assert_eq!(parser.derive(&input).unwrap(), vec![0, 1, 4, 2, 4, 3]);
    assert_eq!(
        parser.derive(&input).unwrap(),
        ll_derive(&g, &t.ll, &input).unwrap()
    );
    assert!(parser.parse(&[a.clone()]));

    assert_eq!(
        parser.derive(&[a.clone(), a.clone()]),
        Err(TestParseError::MissingPair {
            position: 1,
            x: a.clone(),
            y: a.clone(),
        })
    );
    assert!(!parser.parse(&[a.clone(), plus.clone()]));
    assert!(!parser.parse(&[]));
}

#[test]
fn pairs_not_decided_by_one_lookback_conflict() {
    let src = format!(
        "{DELIMS}s -> 'bof' x 'eof';\nx -> 'p' y;\nx -> 'q' z;\ny -> 'c' 'd';\nz -> 'c' 'd' 'e';\n"
    );
    let g = Grammar::parse(&src).unwrap();
    let sets = TerminalSetFunctions::new(&g);
    // Plain LL(1) is fine with it.
    assert!(LlTable::build(&g, &sets).is_ok());

    match build_parse_tables(&g, 10_000).unwrap_err() {
        LlpError::PslsConflict {
            x,
            y,
            first,
            second,
            ..
        } => {
            assert_eq!((x, y), (Terminal::user("c"), Terminal::user("d")));
            let mut claimed = [first, second];
            claimed.sort();
            assert_eq!(claimed, [3, 4]);
        }
        other => panic!("expected a PSLS conflict, got {other:?}"),
    }
}

#[test]
fn item_set_budget_is_enforced() {
    let g = Grammar::parse(CALC).unwrap();
    assert_eq!(
        build_parse_tables(&g, 2).unwrap_err(),
        LlpError::TooManyItemSets { limit: 2 }
    );
}

#[test]
fn automaton_starts_from_the_end_of_the_start_rule() {
    let g = Grammar::parse(CALC).unwrap();
    let sets = TerminalSetFunctions::new(&g);
    let generator = LlpGenerator::new(&g, &sets);
    let initial = generator.initial_item();
    assert_eq!(initial.production, START_PRODUCTION);
    assert_eq!(initial.dot, 3);
    assert_eq!(initial.lookback, Terminal::EndOfInput);
    assert_eq!(initial.lookahead, Terminal::Empty);
    assert_eq!(
        initial.display(&g).to_string(),
        "[program -> $soi expr $eoi ., $eoi, $empty, []]"
    );

    let item_sets = generator.build_automaton(10_000).unwrap();
    assert!(item_sets[0].contains(&initial));
    assert!(item_sets.iter().all(|s| !s.is_empty()));
    for (i, a) in item_sets.iter().enumerate() {
        for b in &item_sets[i + 1..] {
            assert_ne!(a, b);
        }
    }

    // Moving the dot over `expr_tail` with `eoi` next leaves the tail,
    // then `eoi`, on the stack.
    let tail = nt("expr_tail");
    assert_eq!(
        generator.compute_gamma(&Terminal::EndOfInput, &tail, &[Symbol::Terminal(Terminal::EndOfInput)]),
        vec![tail.clone(), Symbol::Terminal(Terminal::EndOfInput)]
    );
    assert_eq!(
        generator.compute_gamma(&Terminal::user("plus"), &tail, &[Symbol::Terminal(Terminal::EndOfInput)]),
        vec![tail.clone()]
    );
    assert_eq!(
        generator.compute_gamma(&Terminal::user("num"), &Symbol::terminal("num"), &[tail.clone()]),
        vec![Symbol::terminal("num")]
    );
}

#[test]
fn calc_pairs_around_parentheses() {
    let (g, t) = tables(CALC);
    let e = t.llp.get(&Terminal::user("num"), &Terminal::user("rparen")).unwrap();
    assert_eq!(
        e.initial_stack,
        vec![Symbol::terminal("rparen"), nt("expr_tail"), nt("term_tail")]
    );
    assert_eq!(
        names(&g, &e.productions),
        ["term_end", "expr_end"]
    );
    assert!(e.final_stack.is_empty());

    assert!(t.llp.get(&Terminal::user("num"), &Terminal::user("num")).is_none());
    assert!(t.llp.get(&Terminal::user("lparen"), &Terminal::user("rparen")).is_none());
    assert!(t.llp.get(&Terminal::StartOfInput, &Terminal::EndOfInput).is_none());
    assert_eq!(t.llp.len(), t.psls.len());
}

#[test]
fn random_sentences_match_the_ll_derivation() {
    let (g, t) = tables(CALC);
    let parser = TestParser::new(&t.llp);
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..200 {
        let mut input = Vec::new();
        calc_expr(&mut rng, 3, &mut input);
        let expected = ll_derive(&g, &t.ll, &input).unwrap();
        assert_eq!(parser.derive(&input), Ok(expected), "{input:?}");
    }
}

#[test]
fn mutated_sentences_are_rejected() {
    let (g, t) = tables(CALC);
    let parser = TestParser::new(&t.llp);
    let mut rng = StdRng::seed_from_u64(99);
    let mut rejected = 0;
    for _ in 0..300 {
        let mut input = Vec::new();
        calc_expr(&mut rng, 2, &mut input);
        let original = input.clone();
        if rng.random_bool(0.5) || input.len() < 2 {
            input.remove(rng.random_range(0..input.len()));
        } else {
            let i = rng.random_range(0..input.len() - 1);
            input.swap(i, i + 1);
        }
        if input == original {
            continue;
        }
        let by_ll = ll_derive(&g, &t.ll, &input).ok();
        assert_eq!(parser.derive(&input).ok(), by_ll, "{input:?}");
        if by_ll.is_none() {
            rejected += 1;
        }
    }
    assert!(rejected > 100);
}

#[test]
fn bracket_matching() {
    let a = nt("a");
    let b = nt("b");
    assert!(verify_brackets(&[]).is_ok());
    assert!(
        verify_brackets(&[
            Bracket::Left(a.clone()),
            Bracket::Left(b.clone()),
            Bracket::Right(b.clone()),
            Bracket::Right(a.clone()),
        ])
        .is_ok()
    );
    assert_eq!(
        verify_brackets(&[Bracket::Left(a.clone()), Bracket::Right(b.clone())]),
        Err(TestParseError::Mismatch {
            position: 1,
            expected: Some(a.clone()),
            found: b.clone(),
        })
    );
    assert_eq!(
        verify_brackets(&[Bracket::Right(a.clone())]),
        Err(TestParseError::Mismatch {
            position: 0,
            expected: None,
            found: a.clone(),
        })
    );
    assert_eq!(
        verify_brackets(&[Bracket::Left(a.clone()), Bracket::Left(a)]),
        Err(TestParseError::Unclosed { open: 2 })
    );
}

#[test]
fn partial_parse_errors() {
    let (g, t) = tables(CALC);
    let mut productions = Vec::new();

    let mut stack = vec![nt("expr")];
    assert_eq!(
        t.ll.partial_parse(&g, &mut stack, &Terminal::user("rparen"), &mut productions),
        Err(LlError::NoRule {
            nonterminal: NonTerminal::new("expr"),
            terminal: Terminal::user("rparen"),
        })
    );

    let mut stack = vec![Symbol::terminal("num")];
    assert_eq!(
        t.ll.partial_parse(&g, &mut stack, &Terminal::user("plus"), &mut productions),
        Err(LlError::Mismatch {
            lookahead: Terminal::user("plus"),
            found: Terminal::user("num"),
        })
    );

    let mut stack = Vec::new();
    assert_eq!(
        t.ll.partial_parse(&g, &mut stack, &Terminal::user("num"), &mut productions),
        Err(LlError::StackExhausted {
            lookahead: Terminal::user("num"),
        })
    );
    assert!(productions.is_empty());
}

#[test]
fn parse_tables_json_round_trip() {
    let (g, t) = tables(CALC);
    let mut buf = Vec::new();
    t.llp.write_json(&mut buf, &g).unwrap();
    assert_eq!(LlpTable::load_json_bytes(&buf).unwrap(), t.llp);

    let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    let productions = value["productions"].as_array().unwrap();
    assert_eq!(productions.len(), g.productions().len());
    assert_eq!(productions[10]["name"], "var");
    assert_eq!(productions[10]["arity"], 0);
    assert!(LlpTable::load_json_bytes(b"[]").is_err());
}

#[test]
fn end_to_end_on_calc() {
    let artifacts = generate(CALC_LEX, CALC, &GeneratorConfig::default()).unwrap();
    let source = b"1 + (x * 2)";
    let tokens = artifacts.lexer.lex_parallel(source, 4).unwrap();
    let lexemes = artifacts.lexeme_names();
    let input: Vec<Terminal> = tokens
        .iter()
        .map(|t| lexemes[t.lexeme].as_str())
        .filter(|&n| n != "ws")
        .map(Terminal::user)
        .collect();
    assert_eq!(
        input,
        terminals(&["num", "plus", "lparen", "ident", "star", "num", "rparen"])
    );

    let parser = TestParser::new(&artifacts.parse.llp);
    let derivation = parser.derive(&input).unwrap();
    assert_eq!(
        names(&artifacts.grammar, &derivation),
        [
            "program", "expr", "term", "num", "term_end", "add", "term", "group", "expr", "term",
            "var", "mul", "num", "term_end", "expr_end", "term_end", "expr_end",
        ]
    );
}

#[test]
fn generate_reports_which_source_failed() {
    let config = GeneratorConfig::default();
    assert!(matches!(
        generate("num = /[0-9/\n", CALC, &config),
        Err(GenerateError::LexicalGrammar(_))
    ));
    assert!(matches!(
        generate(CALC_LEX, "program -> ;", &config),
        Err(GenerateError::Grammar(_))
    ));

    let lexicon = "num = /[0-9]+/\nhat = /h/\n";
    let grammar = format!("{DELIMS}s -> 'bof' e 'eof';\ne -> 'num' 'caret' 'num';\n");
    match generate(lexicon, &grammar, &config) {
        Err(GenerateError::Grammar(e)) => {
            let m: Vec<_> = e.diagnostics.errors().map(|d| d.message.as_str()).collect();
            assert_eq!(m, ["terminal 'caret' is not a lexeme of the lexical grammar"]);
        }
        other => panic!("expected a grammar error, got {other:?}"),
    }

    let tiny = GeneratorConfig {
        max_parallel_states: 2,
        ..GeneratorConfig::default()
    };
    assert!(matches!(
        generate(CALC_LEX, CALC, &tiny),
        Err(GenerateError::Lexer(_))
    ));
}
