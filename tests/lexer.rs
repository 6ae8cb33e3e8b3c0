//! Regex front end, automata and the sequential lexer.

use llpgen::{
    diagnostics::Severity,
    lexer::{
        cpu::{LexError, Token, lex_on_cpu},
        fsa::{Ambiguity, REJECT, START},
        grammar::LexicalGrammar,
        regex_parser::parse_regex,
        tables::StreamingDfa,
    },
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn dfa_for(src: &str) -> (LexicalGrammar, StreamingDfa) {
    let g = LexicalGrammar::parse(src).expect("lexical grammar should parse");
    let dfa = StreamingDfa::from_fsa(&g.build_lexer_dfa().fsa);
    (g, dfa)
}

fn named(g: &LexicalGrammar, input: &[u8], tokens: &[Token]) -> Vec<(String, String)> {
    tokens
        .iter()
        .map(|t| {
            (
                g.lexeme(t.lexeme).name.clone(),
                String::from_utf8_lossy(&input[t.start..t.start + t.len]).into_owned(),
            )
        })
        .collect()
}

fn pairs(v: &[(&str, &str)]) -> Vec<(String, String)> {
    v.iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

#[test]
fn num_plus_num() {
    let (g, dfa) = dfa_for("num = /[0-9]+/\nplus = /\\+/\n");
    let input = b"12+3";
    let tokens = lex_on_cpu(&dfa, input).unwrap();
    assert_eq!(
        named(&g, input, &tokens),
        pairs(&[("num", "12"), ("plus", "+"), ("num", "3")])
    );
}

#[test]
fn inverted_range_cites_both_endpoints() {
    let err = parse_regex("[z-a]", 0).unwrap_err();
    assert_eq!(err.offset, 1);
    assert_eq!(err.notes.len(), 1);
    assert_eq!(err.notes[0].0, 3);

    // Offsets are absolute within a lexical grammar.
    let err = LexicalGrammar::parse("r = /[z-a]/\n").unwrap_err();
    let ds: Vec<_> = err.diagnostics.iter().collect();
    assert_eq!(ds.len(), 2);
    assert_eq!((ds[0].severity, ds[0].offset), (Severity::Error, 6));
    assert_eq!((ds[1].severity, ds[1].offset), (Severity::Note, 8));
}

#[test]
fn regex_syntax_errors() {
    for (pattern, needle) in [
        ("a)", "unmatched ')'"),
        ("(ab", "unterminated group"),
        ("[ab", "unterminated character class"),
        ("*a", "nothing to repeat"),
        ("a|+", "nothing to repeat"),
        ("]", "unmatched ']'"),
        ("\\q", "unknown escape"),
        ("\\x4", "malformed \\x escape"),
        ("[]", "empty character class"),
        ("ab\\", "unterminated escape"),
    ] {
        let err = parse_regex(pattern, 0).unwrap_err();
        assert!(
            err.message.contains(needle),
            "{pattern:?}: expected {needle:?}, got {:?}",
            err.message
        );
    }
}

#[test]
fn regex_features_accept_expected_strings() {
    let src = r#"
        hex    = /0x[0-9a-fA-F]+/
        word   = /(ab|cd)+e?/
        esc    = /\x41\t\//
        dash   = /[-a]+/
        notab  = /[^ab\n]/
    "#;
    let g = LexicalGrammar::parse(src).unwrap();
    let nfa = g.build_nfa().fsa;
    let id = |n: &str| g.find(n).unwrap();

    assert_eq!(nfa.accepts(b"0x1F"), Some(id("hex")));
    assert_eq!(nfa.accepts(b"0x"), None);
    assert_eq!(nfa.accepts(b"abcde"), Some(id("word")));
    assert_eq!(nfa.accepts(b"cdab"), Some(id("word")));
    assert_eq!(nfa.accepts(b"A\t/"), Some(id("esc")));
    assert_eq!(nfa.accepts(b"-a-"), Some(id("dash")));
    assert_eq!(nfa.accepts(b"z"), Some(id("notab")));
    assert_eq!(nfa.accepts(b"b"), None);
}

#[test]
fn lexical_grammar_errors_are_batched() {
    let src = "a = /x/\na = /y/\nb = /z/ [nope]\nc = /q*/\nd = /(/\n";
    let err = LexicalGrammar::parse(src).unwrap_err();
    let messages: Vec<String> = err
        .diagnostics
        .errors()
        .map(|d| d.message.clone())
        .collect();
    assert_eq!(err.diagnostics.error_count(), 4, "{messages:?}");
    assert!(messages.iter().any(|m| m.contains("duplicate lexeme 'a'")));
    assert!(messages.iter().any(|m| m.contains("undefined lexeme 'nope'")));
    assert!(messages.iter().any(|m| m.contains("matches the empty string")));
    assert!(messages.iter().any(|m| m.contains("unterminated group")));

    // The duplicate carries a note at the first definition.
    let notes: Vec<usize> = err
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Note)
        .map(|d| d.offset)
        .collect();
    assert_eq!(notes, vec![0]);
}

#[test]
fn rendered_diagnostics_show_line_and_column() {
    let src = "ok = /a/\nbad = /[z-a]/\n";
    let err = LexicalGrammar::parse(src).unwrap_err();
    let text = err.diagnostics.render("calc.lex", src);
    assert!(text.contains("calc.lex:2:9: error: invalid character range"), "{text}");
    assert!(text.contains("calc.lex:2:11: note: range upper bound is here"), "{text}");
    assert!(text.contains("bad = /[z-a]/"), "{text}");
}

#[test]
fn lowest_declaration_wins_and_is_reported() {
    let (g, dfa) = dfa_for("kw_if = /if/\nident = /[a-z]+/\nws = / +/\n");
    let lexer_dfa = g.build_lexer_dfa();
    assert_eq!(
        lexer_dfa.ambiguities,
        vec![Ambiguity {
            lexeme_a: g.find("kw_if").unwrap(),
            lexeme_b: g.find("ident").unwrap(),
        }]
    );

    let input = b"if iff i";
    let tokens = lex_on_cpu(&dfa, input).unwrap();
    assert_eq!(
        named(&g, input, &tokens),
        pairs(&[
            ("kw_if", "if"),
            ("ws", " "),
            ("ident", "iff"),
            ("ws", " "),
            ("ident", "i"),
        ])
    );
}

#[test]
fn preceded_by_falls_back_to_start() {
    let src = "a = /a/\nb = /b/ [a]\nc = /c+/\n";
    let (g, dfa) = dfa_for(src);

    let input = b"abacc";
    let tokens = lex_on_cpu(&dfa, input).unwrap();
    assert_eq!(
        named(&g, input, &tokens),
        pairs(&[("a", "a"), ("b", "b"), ("a", "a"), ("c", "cc")])
    );

    // `c` after `a` lexes exactly like `c` from START.
    let after_a = lex_on_cpu(&dfa, b"acc").unwrap();
    let alone = lex_on_cpu(&dfa, b"cc").unwrap();
    assert_eq!(after_a[1].lexeme, alone[0].lexeme);
    assert_eq!(after_a[1].len, alone[0].len);

    // `b` never starts a token on its own, nor after `c`.
    assert!(matches!(
        lex_on_cpu(&dfa, b"b"),
        Err(LexError::Rejected { offset: 0, .. })
    ));
    assert!(matches!(
        lex_on_cpu(&dfa, b"cb"),
        Err(LexError::Rejected { offset: 1, .. })
    ));
}

#[test]
fn shared_first_byte_after_predecessor() {
    let src = "a = /a/\nb = /bb/ [a]\nc = /bc/\n";
    let (g, dfa) = dfa_for(src);

    let alone = lex_on_cpu(&dfa, b"bc").unwrap();
    assert_eq!(named(&g, b"bc", &alone), pairs(&[("c", "bc")]));

    // After `a`, `b` may start either `b` or `c`.
    let input = b"abc";
    let tokens = lex_on_cpu(&dfa, input).unwrap();
    assert_eq!(
        named(&g, input, &tokens),
        pairs(&[("a", "a"), ("c", "bc")])
    );
    let input = b"abbabc";
    let tokens = lex_on_cpu(&dfa, input).unwrap();
    assert_eq!(
        named(&g, input, &tokens),
        pairs(&[("a", "a"), ("b", "bb"), ("a", "a"), ("c", "bc")])
    );
    assert!(lex_on_cpu(&dfa, b"bb").is_err());

    let nfa = g.build_nfa();
    assert_eq!(nfa.fsa.accepts(b"bc"), Some(g.find("c").unwrap()));
}

#[test]
fn successor_roots_do_not_leak_into_start() {
    let g = LexicalGrammar::parse("a = /a/\nb = /b/ [a]\n").unwrap();
    let lexer_dfa = g.build_lexer_dfa();
    let fsa = &lexer_dfa.fsa;
    assert!(fsa.is_deterministic());
    assert!(fsa.step(START, b'b').is_none());
    let root = lexer_dfa.successor_roots[&g.find("a").unwrap()];
    assert!(fsa.step(root, b'b').is_some());
    assert!(fsa.state(REJECT).transitions.is_empty());
}

#[test]
fn lexer_loop_edges_produce_tokens() {
    let g = LexicalGrammar::parse("x = /x/\ny = /y/\n").unwrap();
    let fsa = g.build_lexer_dfa().fsa;
    let s = fsa.step(START, b'x').unwrap();
    assert!(!s.produces_token);
    let after = fsa.step(s.dst, b'y').unwrap();
    assert!(after.produces_token);
    // Bytes nothing can start go to REJECT, still marked.
    let dead = fsa.step(s.dst, b'z').unwrap();
    assert_eq!(dead.dst, REJECT);
    assert!(dead.produces_token);
}

#[test]
fn negative_inputs() {
    let (_, dfa) = dfa_for(
        "str = /\"[^\"\\n]*\"/\ncomment = /\\/\\*([^*]|\\*+[^*\\/])*\\*+\\//\nws = /[ \\n]+/\nid = /[a-z]+/\n",
    );
    assert!(lex_on_cpu(&dfa, b"x \"hello").is_err(), "unterminated string");
    assert!(lex_on_cpu(&dfa, b"\"a\nb\"").is_err(), "newline in string");
    assert!(
        matches!(
            lex_on_cpu(&dfa, b"a /* comment"),
            Err(LexError::UnexpectedEnd { offset: 12 })
        ),
        "unterminated block comment"
    );
    assert!(lex_on_cpu(&dfa, b"a /* ok */ \"s\"").is_ok());
    assert_eq!(lex_on_cpu(&dfa, b"").unwrap(), vec![]);
}

#[test]
fn nfa_and_dfa_accept_the_same_strings() {
    let src = std::fs::read_to_string("grammar/calc.lex").unwrap();
    let g = LexicalGrammar::parse(&src).unwrap();
    let nfa = g.build_nfa().fsa;
    let det = nfa.to_dfa();
    assert!(det.dfa.is_deterministic());

    let alphabet = b"09az_+-*/() \tx";
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..2000 {
        let n = rng.random_range(0..6);
        let s: Vec<u8> = (0..n)
            .map(|_| alphabet[rng.random_range(0..alphabet.len())])
            .collect();
        assert_eq!(nfa.accepts(&s), det.dfa.accepts(&s), "input {s:?}");
    }
}
