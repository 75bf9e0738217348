//! Cross-module tests: compile a library, emit its header, import it.

use spl_lang::header::{self, Header};
use spl_lang::syntax::ast::{Expr, Item, Reference, Stmt};
use spl_lang::{compile_with, CompileOptions, Error, ErrorCode, Headers, ResolveResult};

// ─── Helpers ─────────────────────────────────────────────────────────────────

const LIB: &str = r#"
type Point = (Int, Int);

Point origin = (0, 0);
Int x = 1;

infixl 5 <+> (a, b) :: Point Point -> Point {
    return (a.fst + b.fst, a.snd + b.snd);
}

infixr 7 ^^ (a, b) :: Int Int -> Int {
    return a * b;
}

norm(p) :: Point -> Int {
    return p.fst * p.fst + p.snd * p.snd;
}
"#;

fn library(module: &str, src: &str) -> String {
    let options = CompileOptions::new().with_module(module);
    let result = compile_with(src, &Headers::new(), &options)
        .unwrap_or_else(|errs| panic!("library `{module}` failed: {errs:#?}"));
    result.header().unwrap()
}

fn lib_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert("lib".into(), library("lib", LIB));
    headers
}

fn ok_with(src: &str, headers: &Headers) -> ResolveResult {
    compile_with(src, headers, &CompileOptions::default())
        .unwrap_or_else(|errs| panic!("expected compile to succeed, got errors: {errs:#?}"))
}

fn ok(src: &str) -> ResolveResult {
    ok_with(src, &lib_headers())
}

fn err_with(src: &str, headers: &Headers) -> Vec<Error> {
    match compile_with(src, headers, &CompileOptions::default()) {
        Ok(_)  => panic!("expected compile to fail but it succeeded"),
        Err(e) => e,
    }
}

fn err(src: &str) -> Vec<Error> {
    err_with(src, &lib_headers())
}

fn has(errs: &[Error], code: ErrorCode) -> bool {
    errs.iter().any(|e| e.code == code)
}

fn first_fn(result: &ResolveResult) -> &[Stmt] {
    result
        .program
        .items
        .iter()
        .find_map(|item| match item {
            Item::Fn(f) => Some(f.body.as_slice()),
            _ => None,
        })
        .expect("no function in program")
}

fn returned(body: &[Stmt]) -> String {
    match body.first() {
        Some(Stmt::Return(Some(e), _)) => e.to_string(),
        other => panic!("expected a return, got {other:?}"),
    }
}

// ─── Emission ────────────────────────────────────────────────────────────────

#[test]
fn emitted_header_lists_exports() {
    let header = Header::parse(&library("lib", LIB)).unwrap();
    assert_eq!(header.module, "lib");
    let globals: Vec<&str> = header.globals.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(globals, ["origin", "x"]);
    assert_eq!(header.type_syns.len(), 1);
    assert_eq!(header.functions.len(), 3);
}

// ─── Successful imports ──────────────────────────────────────────────────────

#[test]
fn importall_brings_everything() {
    let r = ok(r#"
        from lib importall;
        main() :: -> Void {
            Point p = origin <+> (1, 2);
            print(norm(p) + x);
        }
    "#);
    assert_eq!(r.modules, ["lib"]);
    assert!(r.warnings.is_empty());
}

#[test]
fn aliases_rename_each_category() {
    ok(r#"
        from lib import norm as size, origin as o, Point as P, <+> as <++>;
        main() :: -> Void {
            P q = o <++> (3, 4);
            print(size(q));
        }
    "#);
}

#[test]
fn imported_globals_are_tagged_with_module() {
    let r = ok(r#"
        from lib import x as y;
        f() :: -> Int { return y; }
    "#);
    let Stmt::Return(Some(Expr::Var(v)), _) = &first_fn(&r)[0] else { panic!("expected return of a variable") };
    assert_eq!(v.reference, Reference::Global {
        module: Some("lib".into()),
        name: "y".into(),
        original: "x".into(),
    });
}

#[test]
fn imported_calls_are_tagged_with_module() {
    let r = ok(r#"
        from lib import norm as size;
        main() :: -> Void { print(size((1, 2))); }
    "#);
    let Stmt::Expr(Expr::Typed(print)) = &first_fn(&r)[0] else { panic!("expected a bound call") };
    assert_eq!(print.module.as_deref(), Some(spl_lang::builtins::BUILTIN_MODULE));
    let Expr::Typed(size) = &print.args[0] else { panic!("expected a bound argument") };
    assert_eq!(size.module.as_deref(), Some("lib"));
    assert_eq!(size.name, "size");
    assert_eq!(size.original, "norm");
}

#[test]
fn imported_fixity_drives_parsing() {
    let r = ok(r#"
        from lib import ^^;
        a() :: -> Int { return 1 + 2 ^^ 3; }
        b() :: -> Int { return 2 ^^ 3 ^^ 4; }
    "#);
    let bodies: Vec<&[Stmt]> = r.program.items.iter().filter_map(|item| match item {
        Item::Fn(f) => Some(f.body.as_slice()),
        _ => None,
    }).collect();
    assert_eq!(returned(bodies[0]), "(1 + (2 ^^ 3))");
    assert_eq!(returned(bodies[1]), "(2 ^^ (3 ^^ 4))");
}

#[test]
fn module_global_shadows_import() {
    let r = ok(r#"
        from lib import x;
        Int x = 5;
        f() :: -> Int { return x; }
    "#);
    assert!(has(&r.warnings, ErrorCode::ShadowImportGlobal));
    let Stmt::Return(Some(Expr::Var(v)), _) = &first_fn(&r)[0] else { panic!() };
    assert!(matches!(&v.reference, Reference::Global { module: None, .. }));
}

#[test]
fn imported_functions_are_not_constant() {
    let errs = err("from lib import norm; Int n = norm((1, 1));");
    assert!(has(&errs, ErrorCode::GlobalDefMustBeConstant));
}

#[test]
fn headers_load_from_disk() {
    let dir = std::env::temp_dir().join(format!("spl-headers-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("lib.splh"), library("lib", LIB)).unwrap();

    let headers = header::load(["lib"], &[dir.clone()], "splh").unwrap();
    ok_with("from lib import norm; f() :: -> Int { return norm((1, 1)); }", &headers);

    std::fs::remove_dir_all(&dir).unwrap();
}

// ─── Warnings ────────────────────────────────────────────────────────────────

#[test]
fn duplicate_import_warns() {
    let r = ok("from lib import norm, norm;");
    assert!(has(&r.warnings, ErrorCode::DuplicateImport));
}

#[test]
fn importall_and_specific_warns() {
    let r = ok("from lib importall; from lib import norm;");
    assert!(has(&r.warnings, ErrorCode::ImportAllAndSpecific));
    assert_eq!(r.modules, ["lib"]);
}

#[test]
fn denied_warnings_block() {
    let options = CompileOptions::new().with_warnings_as_errors(true);
    let errs = compile_with("from lib import norm, norm;", &lib_headers(), &options).unwrap_err();
    assert!(has(&errs, ErrorCode::DuplicateImport));
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[test]
fn missing_module() {
    assert!(has(&err("from nowhere importall;"), ErrorCode::ImportModuleNotFound));
}

#[test]
fn malformed_header() {
    let mut headers = Headers::new();
    headers.insert("lib".into(), "not a header".into());
    assert!(has(&err_with("from lib importall;", &headers), ErrorCode::HeaderFormatIncorrect));
}

#[test]
fn header_for_another_module() {
    let mut headers = Headers::new();
    headers.insert("other".into(), library("lib", LIB));
    assert!(has(&err_with("from other importall;", &headers), ErrorCode::HeaderFormatIncorrect));
}

#[test]
fn unknown_symbol() {
    assert!(has(&err("from lib import missing;"), ErrorCode::ImportUndefinedSymbol));
}

#[test]
fn alias_must_keep_kind() {
    assert!(has(&err("from lib import norm as Norm;"), ErrorCode::ImportAliasKindMismatch));
}

#[test]
fn same_global_from_two_modules_clashes() {
    let mut headers = lib_headers();
    headers.insert("other".into(), library("other", "Int x = 2;"));
    let errs = err_with("from lib importall; from other importall;", &headers);
    assert!(has(&errs, ErrorCode::ClashImportGlobal));
}

#[test]
fn conflicting_fixity_rejected() {
    let mut headers = lib_headers();
    headers.insert("other".into(), library("other", "infixl 2 ^^ (a, b) :: Int Int -> Int { return a; }"));
    let errs = err_with("from lib import ^^; from other import ^^;", &headers);
    assert!(has(&errs, ErrorCode::FixityMismatch));
}

#[test]
fn same_synonym_from_two_modules_clashes() {
    let mut headers = lib_headers();
    headers.insert("other".into(), library("other", "type Point = (Int, Int);"));
    let errs = err_with("from lib importall; from other importall;", &headers);
    assert!(has(&errs, ErrorCode::ClashImportType));
}

#[test]
fn imported_synonym_clashes_with_builtin() {
    let mut headers = Headers::new();
    headers.insert("strs".into(), r#"{
        "module": "strs",
        "type_syns": [{ "name": "String", "type": "LISTTYPE(type=BASICTYPE(type_id=\"Int\"))" }]
    }"#.into());
    let errs = err_with("Int x = 1;\nfrom strs importall;", &headers);
    let clash = errs.iter().find(|e| e.code == ErrorCode::ClashBuiltinType).expect("no builtin clash reported");
    assert_eq!(clash.line, 2);
}

#[test]
fn cyclic_synonym_in_header() {
    let mut headers = Headers::new();
    headers.insert("cyc".into(), r#"{
        "module": "cyc",
        "type_syns": [
            { "name": "A", "type": "LISTTYPE(type=TYPESYN(type_id=\"B\"))" },
            { "name": "B", "type": "TUPLETYPE(type1=BASICTYPE(type_id=\"Int\"), type2=TYPESYN(type_id=\"A\"))" }
        ]
    }"#.into());
    let errs = err_with("from cyc importall;", &headers);
    assert!(has(&errs, ErrorCode::CyclicTypeSynExternal));
    assert!(!has(&errs, ErrorCode::CyclicTypeSyn));
}
