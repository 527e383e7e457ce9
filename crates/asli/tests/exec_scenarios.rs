//! End-to-end execution over the native backend: whole programs built as
//! type-checked ASTs, run through `main`.

mod common;

use asli::ast::{
    ArrayLength, BinOp, Constraint, Decl, Expr, ExprLoc, FuncDecl, ForDirection, IntConstraint, LExpr, LExprLoc,
    Pattern, Slice, Stmt, StmtLoc, SubprogramBody, Ty,
};
use asli::{AslError, AslErrorKind, AslVersion, Config, NativeBackend, NativeValue};
use common::{
    assign, binop, bits, boolean, call, catcher, declare, declare_typed, exception, func, global, iff, int,
    integer, lvar, program, ret, run_for_int, run_program, seq, throw_stmt, try_stmt, var,
};
use pretty_assertions::assert_eq;

#[test]
fn returns_a_literal_sum() {
    let program = program(vec![func("main", vec![ret(binop(BinOp::Add, int(1), int(2)))])]);
    assert_eq!(run_for_int(&program), 3);
}

#[test]
fn writes_and_reads_a_global() {
    let program = program(vec![
        global("g", int(0)),
        func(
            "main",
            vec![assign(lvar("g"), int(7)), ret(var("g"))],
        ),
    ]);
    assert_eq!(run_for_int(&program), 7);
}

#[test]
fn catches_a_thrown_exception() {
    let program = program(vec![
        exception("MyExc", vec![]),
        func(
            "main",
            vec![
                try_stmt(
                    throw_stmt("MyExc", vec![]),
                    vec![catcher(None, "MyExc", ret(int(42)))],
                    None,
                ),
                ret(int(0)),
            ],
        ),
    ]);
    assert_eq!(run_for_int(&program), 42);
}

#[test]
fn writes_a_bit_slice_back() {
    // var s: bits(8) = '00000000'; s[3:0] = '1111'; return UInt(s);
    let slice_write = StmtLoc::new(Stmt::Assign {
        lhs: LExprLoc::new(LExpr::Slice {
            base: Box::new(lvar("s")),
            slices: vec![Slice::Range(int(3), int(0))],
        }),
        rhs: bits("1111"),
    });
    let program = program(vec![func(
        "main",
        vec![
            declare("s", bits("00000000")),
            slice_write,
            ret(call("UInt", vec![var("s")])),
        ],
    )]);
    assert_eq!(run_for_int(&program), 15);
}

#[test]
fn sums_with_a_for_loop() {
    let body = assign(lvar("r"), binop(BinOp::Add, var("r"), var("i")));
    let program = program(vec![func(
        "main",
        vec![
            declare("r", int(0)),
            StmtLoc::new(Stmt::For {
                index: "i".to_owned(),
                start: int(1),
                dir: ForDirection::Up,
                end: int(4),
                body: Box::new(body),
            }),
            ret(var("r")),
        ],
    )]);
    assert_eq!(run_for_int(&program), 10);
}

#[test]
fn failed_assertions_are_fatal() {
    let program = program(vec![func(
        "main",
        vec![
            StmtLoc::new(Stmt::Assert(binop(BinOp::Eq, int(1), int(2)))),
            ret(int(0)),
        ],
    )]);
    let err = run_program(&program).unwrap_err();
    assert!(matches!(err.kind, AslErrorKind::AssertionFailed(_)), "{err}");
}

#[test]
fn counts_down_a_for_loop() {
    let body = assign(lvar("r"), binop(BinOp::Add, var("r"), int(1)));
    let program = program(vec![func(
        "main",
        vec![
            declare("r", int(0)),
            StmtLoc::new(Stmt::For {
                index: "i".to_owned(),
                start: int(3),
                dir: ForDirection::Down,
                end: int(1),
                body: Box::new(body),
            }),
            ret(var("r")),
        ],
    )]);
    assert_eq!(run_for_int(&program), 3);
}

#[test]
fn while_loop_with_a_determined_condition() {
    let program = program(vec![func(
        "main",
        vec![
            declare("r", int(0)),
            StmtLoc::new(Stmt::While {
                cond: binop(BinOp::Lt, var("r"), int(5)),
                body: Box::new(assign(lvar("r"), binop(BinOp::Add, var("r"), int(1)))),
            }),
            ret(var("r")),
        ],
    )]);
    assert_eq!(run_for_int(&program), 5);
}

#[test]
fn repeat_runs_the_body_before_the_condition() {
    let program = program(vec![func(
        "main",
        vec![
            declare("r", int(10)),
            StmtLoc::new(Stmt::Repeat {
                body: Box::new(assign(lvar("r"), binop(BinOp::Add, var("r"), int(1)))),
                cond: binop(BinOp::Ge, var("r"), int(1)),
            }),
            ret(var("r")),
        ],
    )]);
    // The condition already holds, but the body ran once first.
    assert_eq!(run_for_int(&program), 11);
}

#[test]
fn case_takes_the_first_matching_arm() {
    let arm = |value: i64, result: i64| asli::ast::CaseArm {
        pattern: Pattern::Single(int(value)),
        stmt: ret(int(result)),
    };
    let program = program(vec![func(
        "main",
        vec![
            declare("x", int(2)),
            StmtLoc::new(Stmt::Case {
                discriminant: var("x"),
                arms: vec![arm(1, 10), arm(2, 20), arm(2, 99)],
                otherwise: Some(Box::new(ret(int(0)))),
            }),
            ret(int(-1)),
        ],
    )]);
    assert_eq!(run_for_int(&program), 20);
}

#[test]
fn case_falls_through_to_otherwise() {
    let program = program(vec![func(
        "main",
        vec![
            declare("x", int(9)),
            StmtLoc::new(Stmt::Case {
                discriminant: var("x"),
                arms: vec![asli::ast::CaseArm {
                    pattern: Pattern::Single(int(1)),
                    stmt: ret(int(10)),
                }],
                otherwise: Some(Box::new(ret(int(7)))),
            }),
            ret(int(-1)),
        ],
    )]);
    assert_eq!(run_for_int(&program), 7);
}

#[test]
fn pattern_membership_is_an_expression() {
    let test = ExprLoc::new(Expr::Pattern {
        expr: Box::new(int(3)),
        pattern: Box::new(Pattern::Range(int(1), int(5))),
    });
    let program = program(vec![func(
        "main",
        vec![iff(test, ret(int(1)), ret(int(0)))],
    )]);
    assert_eq!(run_for_int(&program), 1);
}

#[test]
fn unknown_collapses_to_the_base_value() {
    let program = program(vec![func(
        "main",
        vec![
            declare("x", ExprLoc::new(Expr::Unknown(integer()))),
            ret(var("x")),
        ],
    )]);
    assert_eq!(run_for_int(&program), 0);
}

#[test]
fn asserting_type_conversion_accepts_and_rejects() {
    let constrained = Ty::Int(IntConstraint::WellConstrained(vec![Constraint::Range(int(0), int(10))]));
    let accepted = program(vec![func(
        "main",
        vec![ret(ExprLoc::new(Expr::AsType {
            expr: Box::new(int(5)),
            ty: constrained.clone(),
        }))],
    )]);
    assert_eq!(run_for_int(&accepted), 5);

    let rejected = program(vec![func(
        "main",
        vec![ret(ExprLoc::new(Expr::AsType {
            expr: Box::new(int(11)),
            ty: constrained,
        }))],
    )]);
    let err = run_program(&rejected).unwrap_err();
    assert!(matches!(err.kind, AslErrorKind::MismatchType { .. }), "{err}");
}

#[test]
fn tuples_project_by_index() {
    let item = |index| {
        ExprLoc::new(Expr::GetItem {
            base: Box::new(var("t")),
            index,
        })
    };
    let program = program(vec![func(
        "main",
        vec![
            declare("t", ExprLoc::new(Expr::Tuple(vec![int(1), int(2)]))),
            ret(binop(BinOp::Add, item(0), item(1))),
        ],
    )]);
    assert_eq!(run_for_int(&program), 3);
}

#[test]
fn record_fields_read_and_write() {
    let point = Decl::Type(asli::ast::TypeDecl {
        name: "Point".to_owned(),
        ty: Ty::Record(vec![("x".to_owned(), integer()), ("y".to_owned(), integer())]),
        supertype: None,
    });
    let literal = ExprLoc::new(Expr::Record {
        ty: "Point".to_owned(),
        fields: vec![("x".to_owned(), int(3)), ("y".to_owned(), int(4))],
    });
    let field = |name: &str| {
        ExprLoc::new(Expr::GetField {
            base: Box::new(var("p")),
            name: name.to_owned(),
        })
    };
    let set_x = StmtLoc::new(Stmt::Assign {
        lhs: LExprLoc::new(LExpr::SetField {
            base: Box::new(lvar("p")),
            name: "x".to_owned(),
        }),
        rhs: int(5),
    });
    let program = program(vec![
        point,
        func(
            "main",
            vec![
                declare("p", literal),
                set_x,
                ret(binop(BinOp::Add, field("x"), field("y"))),
            ],
        ),
    ]);
    assert_eq!(run_for_int(&program), 9);
}

#[test]
fn multi_field_bitvector_reads_and_writes() {
    // type R of record { hi: bits(4), lo: bits(4) };
    let record_ty = Decl::Type(asli::ast::TypeDecl {
        name: "R".to_owned(),
        ty: Ty::Record(vec![
            ("hi".to_owned(), Ty::Bits(Box::new(int(4)))),
            ("lo".to_owned(), Ty::Bits(Box::new(int(4)))),
        ]),
        supertype: None,
    });
    let literal = ExprLoc::new(Expr::Record {
        ty: "R".to_owned(),
        fields: vec![("hi".to_owned(), bits("0000")), ("lo".to_owned(), bits("0000"))],
    });
    // r.[hi, lo] = '10100101'; hi takes the top four bits.
    let set_fields = StmtLoc::new(Stmt::Assign {
        lhs: LExprLoc::new(LExpr::SetFields {
            base: Box::new(lvar("r")),
            names: vec!["hi".to_owned(), "lo".to_owned()],
            ranges: vec![(4, 4), (0, 4)],
        }),
        rhs: bits("10100101"),
    });
    let read_back = ExprLoc::new(Expr::GetFields {
        base: Box::new(var("r")),
        names: vec!["hi".to_owned(), "lo".to_owned()],
    });
    let program = program(vec![
        record_ty,
        func(
            "main",
            vec![declare("r", literal), set_fields, ret(call("UInt", vec![read_back]))],
        ),
    ]);
    assert_eq!(run_for_int(&program), 0b1010_0101);
}

#[test]
fn print_output_is_routed_through_the_writer() {
    use asli::{CollectPrint, NoopTracer};

    let message = ExprLoc::new(Expr::Literal(asli::ast::Literal::String("r=".to_owned())));
    let program = program(vec![func(
        "main",
        vec![
            StmtLoc::new(Stmt::Print {
                args: vec![message, int(42)],
                newline: true,
            }),
            ret(int(0)),
        ],
    )]);
    let mut backend = NativeBackend::new();
    let mut print = CollectPrint::new();
    asli::run_with(&program, &mut backend, &Config::default(), vec![], &mut print, &mut NoopTracer).unwrap();
    assert_eq!(print.into_output(), "r=42\n");
}

#[test]
fn enumeration_labels_are_global_constants() {
    let colors = Decl::Type(asli::ast::TypeDecl {
        name: "Color".to_owned(),
        ty: Ty::Enum(vec!["RED".to_owned(), "GREEN".to_owned(), "BLUE".to_owned()]),
        supertype: None,
    });
    let program = program(vec![colors, func("main", vec![ret(var("GREEN"))])]);
    assert_eq!(run_for_int(&program), 1);
}

#[test]
fn global_initialisers_run_in_dependency_order() {
    // b reads a but is declared first.
    let program = program(vec![
        global("b", binop(BinOp::Add, var("a"), int(1))),
        global("a", int(5)),
        func("main", vec![ret(var("b"))]),
    ]);
    assert_eq!(run_for_int(&program), 6);
}

#[test]
fn primitive_library_round_trips_bitvectors() {
    let program = program(vec![func(
        "main",
        vec![ret(call("UInt", vec![call("Ones", vec![int(4)])]))],
    )]);
    assert_eq!(run_for_int(&program), 15);
}

#[test]
fn bitvector_concatenation_expression() {
    let program = program(vec![func(
        "main",
        vec![ret(call(
            "UInt",
            vec![ExprLoc::new(Expr::Concat(vec![bits("10"), bits("01")]))],
        ))],
    )]);
    assert_eq!(run_for_int(&program), 9);
}

#[test]
fn concat_assignment_splits_the_source() {
    // [hi, lo] = '10101111' with widths 4 and 4.
    let split = StmtLoc::new(Stmt::Assign {
        lhs: LExprLoc::new(LExpr::Concat {
            parts: vec![lvar("hi"), lvar("lo")],
            widths: Some(vec![4, 4]),
        }),
        rhs: bits("10101111"),
    });
    let program = program(vec![func(
        "main",
        vec![
            declare("hi", bits("0000")),
            declare("lo", bits("0000")),
            split,
            ret(binop(
                BinOp::Add,
                binop(BinOp::Mul, call("UInt", vec![var("hi")]), int(100)),
                call("UInt", vec![var("lo")]),
            )),
        ],
    )]);
    assert_eq!(run_for_int(&program), 10 * 100 + 15);
}

#[test]
fn concat_assignment_without_widths_needs_elaboration() {
    let split = StmtLoc::new(Stmt::Assign {
        lhs: LExprLoc::new(LExpr::Concat {
            parts: vec![lvar("hi"), lvar("lo")],
            widths: None,
        }),
        rhs: bits("10101111"),
    });
    let program = program(vec![func(
        "main",
        vec![declare("hi", bits("0000")), declare("lo", bits("0000")), split, ret(int(0))],
    )]);
    let err = run_program(&program).unwrap_err();
    assert!(matches!(err.kind, AslErrorKind::TypeInferenceNeeded(_)), "{err}");
}

#[test]
fn arrays_default_and_update() {
    let array_ty = Ty::Array {
        length: ArrayLength::Expr(Box::new(int(3))),
        element: Box::new(integer()),
    };
    let write = StmtLoc::new(Stmt::Assign {
        lhs: LExprLoc::new(LExpr::SetArray {
            base: Box::new(lvar("a")),
            index: Box::new(int(1)),
        }),
        rhs: int(7),
    });
    let read = ExprLoc::new(Expr::GetArray {
        base: Box::new(var("a")),
        index: Box::new(int(1)),
    });
    let program = program(vec![func(
        "main",
        vec![declare_typed("a", array_ty, None), write, ret(read)],
    )]);
    assert_eq!(run_for_int(&program), 7);
}

#[test]
fn named_arguments_bind_in_declaration_order() {
    let callee = Decl::Func(FuncDecl {
        name: "width".to_owned(),
        args: vec![],
        parameters: vec![("N".to_owned(), Some(integer()))],
        return_type: Some(integer()),
        body: SubprogramBody::Statements(ret(var("N"))),
    });
    let call_site = ExprLoc::new(Expr::Call {
        name: "width".to_owned(),
        args: vec![],
        named_args: vec![("N".to_owned(), int(8))],
    });
    let program = program(vec![callee, func("main", vec![ret(call_site)])]);
    assert_eq!(run_for_int(&program), 8);
}

#[test]
fn procedures_mutate_globals_in_place() {
    let bump = Decl::Func(FuncDecl {
        name: "bump".to_owned(),
        args: vec![],
        parameters: vec![],
        return_type: None,
        body: SubprogramBody::Statements(seq(vec![
            assign(lvar("g"), binop(BinOp::Add, var("g"), int(1))),
            StmtLoc::new(Stmt::Return(None)),
        ])),
    });
    let call_bump = StmtLoc::new(Stmt::Call {
        name: "bump".to_owned(),
        args: vec![],
        named_args: vec![],
    });
    let program = program(vec![
        global("g", int(0)),
        bump,
        func("main", vec![call_bump.clone(), call_bump, ret(var("g"))]),
    ]);
    assert_eq!(run_for_int(&program), 2);
}

#[test]
fn conditional_expression_takes_the_simple_fast_path() {
    // Both branches are simple, so they are evaluated eagerly and the
    // backend selects; the observable value is unchanged.
    let expr = ExprLoc::new(Expr::Cond {
        cond: Box::new(boolean(true)),
        then_branch: Box::new(int(4)),
        else_branch: Box::new(int(5)),
    });
    let program = program(vec![func("main", vec![ret(expr)])]);
    assert_eq!(run_for_int(&program), 4);
}

#[test]
fn v0_promotes_first_assignment_to_a_declaration() {
    let body = vec![assign(lvar("x"), int(1)), ret(var("x"))];
    let program = program(vec![func("main", body)]);

    let mut backend = NativeBackend::new();
    let v0 = Config {
        version: AslVersion::V0,
        ..Config::default()
    };
    let result = asli::run(&program, &mut backend, &v0).unwrap();
    assert_eq!(result, NativeValue::Int(1.into()));

    let err: AslError = run_program(&program).unwrap_err();
    assert!(matches!(err.kind, AslErrorKind::UndefinedIdentifier(_)), "{err}");
}

#[test]
fn calling_an_unknown_subprogram_is_fatal() {
    let program = program(vec![func("main", vec![ret(call("nowhere", vec![]))])]);
    let err = run_program(&program).unwrap_err();
    assert!(matches!(err.kind, AslErrorKind::UndefinedIdentifier(_)), "{err}");
}

#[test]
fn positional_arity_is_checked() {
    let callee = Decl::Func(FuncDecl {
        name: "two".to_owned(),
        args: vec![("a".to_owned(), integer()), ("b".to_owned(), integer())],
        parameters: vec![],
        return_type: Some(integer()),
        body: SubprogramBody::Statements(ret(var("a"))),
    });
    let program = program(vec![callee, func("main", vec![ret(call("two", vec![int(1)]))])]);
    let err = run_program(&program).unwrap_err();
    assert!(
        matches!(
            &err.kind,
            AslErrorKind::BadArity {
                expected: 2,
                got: 1,
                ..
            }
        ),
        "{err}"
    );
}

#[test]
fn uncaught_exceptions_surface_at_the_top_level() {
    let program = program(vec![
        exception("MyExc", vec![]),
        func("main", vec![throw_stmt("MyExc", vec![]), ret(int(0))]),
    ]);
    let err = run_program(&program).unwrap_err();
    assert!(matches!(err.kind, AslErrorKind::UncaughtException(_)), "{err}");
}
