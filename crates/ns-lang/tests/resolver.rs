//! Diagnostics through the public `compile()` API.
//!
//! Each test covers one rule of the front end or the analyzer. Codes are
//! phase-prefixed: L (lexer), P (parser), S (semantic).

use ns_lang::{compile, compile_with, run_program, Error, ErrorCode, ErrorKind, Failure, Options, Redeclaration};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn ok(src: &str) {
    compile(src).unwrap_or_else(|errs| {
        panic!("expected compile to succeed, got errors: {errs:#?}");
    });
}

fn err(src: &str) -> Vec<Error> {
    match compile(src) {
        Ok(_)  => panic!("expected compile to fail but it succeeded"),
        Err(e) => e,
    }
}

fn has(errs: &[Error], code: ErrorCode) -> bool {
    errs.iter().any(|e| e.code == code)
}

fn has_msg(errs: &[Error], s: &str) -> bool {
    errs.iter().any(|e| e.message.contains(s))
}

// ─── Lexer and parser ────────────────────────────────────────────────────────

#[test]
fn lexical_errors() {
    assert!(has(&err("x = 1 @ 2"), ErrorCode::L001));
    assert!(has(&err("x = \"open"), ErrorCode::L002));
    assert!(has(&err("x = \"\\q\""), ErrorCode::L003));
    assert!(has(&err("x = 99999999999999999999"), ErrorCode::L004));
    assert_eq!(err("x = 1 @ 2")[0].kind(), ErrorKind::Lexical);
}

#[test]
fn syntax_errors() {
    let errs = err("while True: x = 1");
    assert!(has(&errs, ErrorCode::P002));
    assert_eq!(errs[0].kind(), ErrorKind::Syntax);
    assert!(has(&err("f(1) = 2"), ErrorCode::P003));
    assert!(has(&err("x = )"), ErrorCode::P001));
}

#[test]
fn comments_are_ignored() {
    ok("# a comment\nx = 1 # trailing\n# another");
}

// ─── Resolution ──────────────────────────────────────────────────────────────

#[test]
fn unresolved_identifier() {
    let errs = err("y = x + 1");
    assert!(has(&errs, ErrorCode::S001));
    assert_eq!(errs[0].kind(), ErrorKind::UnresolvedIdentifier);
    assert!(has_msg(&errs, "`x`"));
}

#[test]
fn used_before_declaration() {
    let errs = err("a\na = 1");
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].code, ErrorCode::S002);
    assert_eq!(errs[0].kind(), ErrorKind::UsedBeforeDeclaration);
    assert_eq!((errs[0].line, errs[0].column), (1, 1));
}

#[test]
fn used_before_declaration_in_function_body() {
    assert!(has(&err("def f(): y = x x = 1 end"), ErrorCode::S002));
}

#[test]
fn shadowing_inside_function() {
    ok("a = 1 def f(): a = 2 return a end f() a");
}

#[test]
fn simple_recursion() {
    ok("def fib(n): if n < 2: return n end return fib(n - 1) + fib(n - 2) end fib(10)");
}

#[test]
fn builtins_resolve_everywhere() {
    ok("def f(): for i in range(len(args)): println(i) end end");
}

// ─── Types ───────────────────────────────────────────────────────────────────

#[test]
fn type_mismatch_kind() {
    let errs = err("x = 1 - True");
    assert_eq!(errs[0].code, ErrorCode::S003);
    assert_eq!(errs[0].kind(), ErrorKind::TypeMismatch);
}

#[test]
fn arity_mismatch_kind() {
    let errs = err("len([1], [2])");
    assert_eq!(errs[0].kind(), ErrorKind::ArityMismatch);
}

#[test]
fn io_signatures() {
    ok("f = open(\"out.txt\", \"w\") write(f, [1, 2]) close(f)");
    ok("f = open(\"in.txt\", \"r\") line = read(f) n = int(line) close(f)");
    assert!(has(&err("f = open(\"x\", \"r\") read(f) + 1"), ErrorCode::S003));
    assert!(has(&err("write(\"not a file\", 1)"), ErrorCode::S003));
}

#[test]
fn unknown_defers_to_runtime() {
    ok("def id(x): return x end y = id(1) + id(2) z = id([1])[0]");
}

// ─── Structure ───────────────────────────────────────────────────────────────

#[test]
fn structural_errors() {
    let final_errs = err("final a = 1\na = 2");
    assert!(has_msg(&final_errs, "cannot assign to final variable"));
    assert_eq!(final_errs[0].kind(), ErrorKind::Structural);

    assert!(has(&err("return 3"), ErrorCode::S007));
    assert!(has(&err("if True: 1 else: 2 else: 3 end"), ErrorCode::S008));
    assert!(has(&err("def f(): end def f(): end"), ErrorCode::S006));
    assert!(has(&err("range = 4"), ErrorCode::S011));
}

#[test]
fn redeclaration_policy() {
    let src = "def f(): return 1 end def f(): return 2 end f()";
    assert!(has(&err(src), ErrorCode::S006));
    let options = Options::default().with_redeclaration(Redeclaration::Shadow);
    assert!(compile_with(src, &options).is_ok());
}

// ─── Collection ──────────────────────────────────────────────────────────────

#[test]
fn all_diagnostics_reported_together() {
    let errs = err("x = y\nreturn 1\nz = 1 + \"a\"\nif True: 1 else: 2 else: 3 end");
    assert!(has(&errs, ErrorCode::S001));
    assert!(has(&errs, ErrorCode::S007));
    assert!(has(&errs, ErrorCode::S003));
    assert!(has(&errs, ErrorCode::S008));
    let lines: Vec<_> = errs.iter().map(|e| e.line).collect();
    assert_eq!(lines, [1, 2, 3, 4]);
}

#[test]
fn diagnostics_prevent_evaluation() {
    // the println would run first if evaluation started
    match run_program("println(\"ran\") x = 1 + \"a\"", Vec::new()) {
        Err(Failure::Diagnostics(errs)) => assert_eq!(errs[0].code, ErrorCode::S003),
        other => panic!("expected diagnostics, got {other:?}"),
    }
}

#[test]
fn error_display() {
    let errs = err("print(q)");
    assert_eq!(errs[0].to_string(), "[S001] 1:7: could not resolve `q`");
}

#[test]
fn demos_compile() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
    for name in ["fibonacci.ns", "fizzbuzz.ns", "primes.ns", "files.ns"] {
        let src = std::fs::read_to_string(dir.join(name)).expect("demo exists");
        if let Err(errs) = compile(&src) {
            panic!("{name}: {errs:#?}");
        }
    }
}
