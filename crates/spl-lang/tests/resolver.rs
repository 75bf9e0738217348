//! Resolver tests through the public `compile()` API.
//!
//! Each test covers one semantic rule or success path on whole programs.

use spl_lang::syntax::ast::{Expr, Item, Reference, Scope, Stmt};
use spl_lang::{compile, Error, ErrorCode};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn ok(src: &str) -> spl_lang::ResolveResult {
    compile(src).unwrap_or_else(|errs| {
        panic!("expected compile to succeed, got errors: {errs:#?}");
    })
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

const SORT: &str = r#"
type List = [Int];

insert(x, xs) :: Int List -> List {
    if (isEmpty(xs)) {
        return x : [];
    } elif (x <= xs.hd) {
        return x : xs;
    } else {
        return xs.hd : insert(x, xs.tl);
    }
}

sort(xs) :: List -> List {
    List out = [];
    Int x = 0;
    for (x in xs) {
        out = insert(x, out);
    }
    return out;
}

main() :: -> Void {
    List xs = sort(3 : 1 : 2 : []);
    while (!isEmpty(xs)) {
        print(xs.hd);
        xs = xs.tl;
    }
}
"#;

// ─── Whole programs ──────────────────────────────────────────────────────────

#[test]
fn insertion_sort_resolves() {
    let r = ok(SORT);
    assert!(r.warnings.is_empty());
    assert_eq!(r.symbol_table.functions.len(), 3);
}

#[test]
fn user_operators_and_tuples() {
    ok(r#"
        type Point = (Int, Int);

        infixl 6 <+> (a, b) :: Point Point -> Point {
            return (a.fst + b.fst, a.snd + b.snd);
        }

        prefix ~ (p) :: Point -> Point {
            return (- p.fst, - p.snd);
        }

        Point origin = (0, 0);

        norm(p) :: Point -> Int {
            return p.fst * p.fst + p.snd * p.snd;
        }

        main() :: -> Void {
            Point p = (1, 2) <+> ~ (3, 4) <+> origin;
            print(norm(p));
        }
    "#);
}

#[test]
fn strings_are_char_lists() {
    ok(r#"
        length(s) :: String -> Int {
            Int n = 0;
            Char c = ' ';
            for (c in s) { n = n + 1; }
            return n;
        }
        main() :: -> Void { print(length("hello\n")); }
    "#);
}

#[test]
fn control_flow_keywords() {
    ok(r#"
        firstNegative(xs) :: [Int] -> Int {
            Int x = 0;
            for (x in xs) {
                if (x >= 0) { continue; }
                return x;
            }
            return 0;
        }
    "#);
}

#[test]
fn long_sums_resolve() {
    let terms: Vec<String> = (1..=48).map(|n| n.to_string()).collect();
    let src = format!("total() :: -> Int {{ return {}; }} main() :: -> Void {{ print({}); }}", terms.join(" + "), terms.join(" * "));
    let r = ok(&src);
    let Some(Item::Fn(total)) = r.program.items.first() else { panic!() };
    let Stmt::Return(Some(Expr::Typed(sum)), _) = &total.body[0] else { panic!("expected a bound sum") };
    assert_eq!(sum.name, "+");
}

// ─── Collaborator errors ─────────────────────────────────────────────────────

#[test]
fn lexer_errors_surface() {
    let errs = err("Char c = 'ab';");
    assert!(!errs.is_empty());
}

#[test]
fn parser_errors_surface() {
    let errs = err("Int x = ;");
    assert!(has(&errs, ErrorCode::UnexpectedToken));
}

// ─── Documented behaviour ────────────────────────────────────────────────────

#[test]
fn mutually_cyclic_synonyms() {
    assert!(has(&err("type A = B; type B = A;"), ErrorCode::CyclicTypeSyn));
}

#[test]
fn void_placement() {
    assert!(has(&err("type T = Void;"), ErrorCode::TypeSynVoid));
    ok("f() :: -> Void { }");
    assert!(has(&err("Void g = 1;"), ErrorCode::GlobalVarVoid));
}

#[test]
fn print_overloads() {
    let r = ok("main() :: -> Void { print(3); print('c'); }");
    let Some(Item::Fn(main)) = r.program.items.first() else { panic!() };
    let chosen: Vec<usize> = main.body.iter().map(|s| match s {
        Stmt::Expr(Expr::Typed(t)) => t.overload,
        _ => panic!("expected a bound call"),
    }).collect();
    assert_eq!(chosen, [0, 1]);

    let errs = err("main() :: -> Void { print(True); }");
    assert!(has(&errs, ErrorCode::NoOverloadedFunWithArgs));
    assert!(has_msg(&errs, "print"));
}

#[test]
fn argument_wins_over_global() {
    let r = ok("Int x = 1; f(x) :: Int -> Int { return x; }");
    assert!(r.warnings.is_empty());
    let Some(Item::Fn(f)) = r.program.items.get(1) else { panic!() };
    let Stmt::Return(Some(Expr::Var(v)), _) = &f.body[0] else { panic!() };
    assert_eq!(v.reference, Reference::NonGlobal { scope: Scope::Arg, name: "x".into() });
}

#[test]
fn multiplication_before_addition() {
    let r = ok("Int x = 2 + 3 * 4;");
    let Some(Item::Var(x)) = r.program.items.first() else { panic!() };
    assert_eq!(x.init.to_string(), "(2 + (3 * 4))");
}

#[test]
fn returning_if_else_makes_rest_unreachable() {
    let r = ok("f(a) :: Bool -> Int { if (a) { return 1; } else { return 2; } print(3); }");
    assert!(has(&r.warnings, ErrorCode::UnreachableStmtBranches));

    let errs = err("f(a) :: Bool -> Int { if (a) { return 1; } print(3); }");
    assert!(has(&errs, ErrorCode::NotAllPathsReturn));
    assert!(!has(&errs, ErrorCode::UnreachableStmtBranches));
}

#[test]
fn diagnostics_carry_positions() {
    let errs = err("f() :: -> Int {\n    return y;\n}");
    let e = errs.iter().find(|e| e.code == ErrorCode::UndefinedVar).unwrap();
    assert_eq!((e.line, e.column), (2, 12));
    assert_eq!(e.to_string(), "[UndefinedVar] 2:12: undefined variable `y`");
}

// ─── Round trip ──────────────────────────────────────────────────────────────

#[test]
fn resolve_print_reparse_is_stable() {
    let first = ok(SORT);
    let printed = first.program.to_string();
    let second = ok(&printed);
    assert_eq!(printed, second.program.to_string());
}

#[test]
fn resolved_calls_print_as_source() {
    let r = ok("main() :: -> Void { print(- 1 + 2 * 3); }");
    let Some(Item::Fn(main)) = r.program.items.first() else { panic!() };
    let Stmt::Expr(call @ Expr::Typed(_)) = &main.body[0] else { panic!("expected a bound call") };
    assert_eq!(call.to_string(), "print((- 1 + (2 * 3)))");
}
