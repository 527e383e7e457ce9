//! A miniature symbolic backend whose values may be undetermined.
//!
//! `UNKNOWN` produces an undetermined value, operations over undetermined
//! operands stay undetermined, and branch decisions over them commit to
//! the positive branch. The evaluator must then meter loops by the unroll
//! budget instead of relying on the condition to become false.

mod common;

use asli::ast::{BinOp, Expr, ExprLoc, ForDirection, FuncDecl, Literal, Stmt, StmtLoc, Ty, UnOp};
use asli::{
    AslError, Backend, CollectPrint, Config, NativeBackend, NativeValue, NoPrint, NoopTracer, PrimitiveFn,
    PrintWriter, Scope,
};
use common::{assign, binop, declare, func, global, int, lvar, program, ret, var};

/// A value that is either fully determined or opaque.
#[derive(Debug, Clone, PartialEq)]
enum SymValue {
    Known(NativeValue),
    Unknown,
}

/// Delegates determined computations to the native backend and absorbs
/// everything else into [`SymValue::Unknown`].
#[derive(Debug, Default)]
struct SymBackend {
    inner: NativeBackend,
    /// How many evaluator warnings were reported, all of them unroll
    /// exhaustions.
    warnings: usize,
}

impl SymBackend {
    fn new() -> Self {
        Self::default()
    }
}

fn known2(a: SymValue, b: SymValue) -> Option<(NativeValue, NativeValue)> {
    match (a, b) {
        (SymValue::Known(a), SymValue::Known(b)) => Some((a, b)),
        _ => None,
    }
}

impl Backend for SymBackend {
    type Value = SymValue;

    fn v_of_literal(&mut self, lit: &Literal) -> SymValue {
        SymValue::Known(self.inner.v_of_literal(lit))
    }

    fn v_of_int(&mut self, i: i64) -> SymValue {
        SymValue::Known(self.inner.v_of_int(i))
    }

    fn v_to_int(&self, v: &SymValue) -> Option<i64> {
        match v {
            SymValue::Known(v) => self.inner.v_to_int(v),
            SymValue::Unknown => None,
        }
    }

    fn binop(&mut self, op: BinOp, lhs: SymValue, rhs: SymValue) -> Result<SymValue, AslError> {
        match known2(lhs, rhs) {
            Some((lhs, rhs)) => Ok(SymValue::Known(self.inner.binop(op, lhs, rhs)?)),
            None => Ok(SymValue::Unknown),
        }
    }

    fn unop(&mut self, op: UnOp, v: SymValue) -> Result<SymValue, AslError> {
        match v {
            SymValue::Known(v) => Ok(SymValue::Known(self.inner.unop(op, v)?)),
            SymValue::Unknown => Ok(SymValue::Unknown),
        }
    }

    fn read_from_bitvector(&mut self, v: &SymValue, slices: &[(SymValue, SymValue)]) -> Result<SymValue, AslError> {
        let SymValue::Known(v) = v else {
            return Ok(SymValue::Unknown);
        };
        let mut concrete = Vec::with_capacity(slices.len());
        for slice in slices {
            match known2(slice.0.clone(), slice.1.clone()) {
                Some(pair) => concrete.push(pair),
                None => return Ok(SymValue::Unknown),
            }
        }
        Ok(SymValue::Known(self.inner.read_from_bitvector(v, &concrete)?))
    }

    fn write_to_bitvector(
        &mut self,
        slices: &[(SymValue, SymValue)],
        src: SymValue,
        dst: SymValue,
    ) -> Result<SymValue, AslError> {
        let Some((src, dst)) = known2(src, dst) else {
            return Ok(SymValue::Unknown);
        };
        let mut concrete = Vec::with_capacity(slices.len());
        for slice in slices {
            match known2(slice.0.clone(), slice.1.clone()) {
                Some(pair) => concrete.push(pair),
                None => return Ok(SymValue::Unknown),
            }
        }
        Ok(SymValue::Known(self.inner.write_to_bitvector(&concrete, src, dst)?))
    }

    fn bitvector_length(&mut self, v: &SymValue) -> Result<SymValue, AslError> {
        match v {
            SymValue::Known(v) => Ok(SymValue::Known(self.inner.bitvector_length(v)?)),
            SymValue::Unknown => Ok(SymValue::Unknown),
        }
    }

    fn concat_bitvectors(&mut self, parts: Vec<SymValue>) -> Result<SymValue, AslError> {
        let mut concrete = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                SymValue::Known(v) => concrete.push(v),
                SymValue::Unknown => return Ok(SymValue::Unknown),
            }
        }
        Ok(SymValue::Known(self.inner.concat_bitvectors(concrete)?))
    }

    fn get_index(&mut self, index: usize, v: &SymValue) -> Result<SymValue, AslError> {
        match v {
            SymValue::Known(v) => Ok(SymValue::Known(self.inner.get_index(index, v)?)),
            SymValue::Unknown => Ok(SymValue::Unknown),
        }
    }

    fn set_index(&mut self, index: usize, element: SymValue, v: SymValue) -> Result<SymValue, AslError> {
        match known2(element, v) {
            Some((element, v)) => Ok(SymValue::Known(self.inner.set_index(index, element, v)?)),
            None => Ok(SymValue::Unknown),
        }
    }

    fn get_field(&mut self, name: &str, v: &SymValue) -> Result<SymValue, AslError> {
        match v {
            SymValue::Known(v) => Ok(SymValue::Known(self.inner.get_field(name, v)?)),
            SymValue::Unknown => Ok(SymValue::Unknown),
        }
    }

    fn set_field(&mut self, name: &str, element: SymValue, record: SymValue) -> Result<SymValue, AslError> {
        match known2(element, record) {
            Some((element, record)) => Ok(SymValue::Known(self.inner.set_field(name, element, record)?)),
            None => Ok(SymValue::Unknown),
        }
    }

    fn create_vector(&mut self, elements: Vec<SymValue>) -> Result<SymValue, AslError> {
        let mut concrete = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                SymValue::Known(v) => concrete.push(v),
                SymValue::Unknown => return Ok(SymValue::Unknown),
            }
        }
        Ok(SymValue::Known(self.inner.create_vector(concrete)?))
    }

    fn create_record(&mut self, fields: Vec<(String, SymValue)>) -> Result<SymValue, AslError> {
        let mut concrete = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            match value {
                SymValue::Known(v) => concrete.push((name, v)),
                SymValue::Unknown => return Ok(SymValue::Unknown),
            }
        }
        Ok(SymValue::Known(self.inner.create_record(concrete)?))
    }

    fn v_unknown_of_type(&mut self, _ty: &Ty, _base: SymValue) -> Result<SymValue, AslError> {
        Ok(SymValue::Unknown)
    }

    fn is_undetermined(&self, v: &SymValue) -> bool {
        matches!(v, SymValue::Unknown)
    }

    fn choice(&mut self, v: &SymValue) -> Result<bool, AslError> {
        match v {
            SymValue::Known(v) => self.inner.choice(v),
            // Commit to the positive branch; the unroll budget bounds the
            // exploration.
            SymValue::Unknown => Ok(true),
        }
    }

    fn ternary(&mut self, cond: SymValue, v_true: SymValue, v_false: SymValue) -> Result<SymValue, AslError> {
        match cond {
            SymValue::Known(cond) => {
                if self.inner.choice(&cond)? {
                    Ok(v_true)
                } else {
                    Ok(v_false)
                }
            }
            SymValue::Unknown => Ok(SymValue::Unknown),
        }
    }

    fn warn(&mut self, print: &mut dyn PrintWriter, msg: &str) {
        self.warnings += 1;
        print.write_str("warning: ");
        print.write_str(msg);
        print.push('\n');
    }

    fn on_read_identifier(&mut self, _name: &str, _scope: &Scope, _v: &SymValue) {}

    fn on_write_identifier(&mut self, _name: &str, _scope: &Scope, _v: &SymValue) {}

    fn debug_value(&self, v: &SymValue) -> String {
        match v {
            SymValue::Known(v) => self.inner.debug_value(v),
            SymValue::Unknown => "?".to_owned(),
        }
    }

    fn primitives() -> Vec<(FuncDecl, PrimitiveFn<Self>)> {
        Vec::new()
    }
}

fn run_sym(program: &asli::ast::Program, unroll: usize) -> (SymValue, usize) {
    let mut backend = SymBackend::new();
    let config = Config {
        unroll,
        ..Config::default()
    };
    let value = asli::run_with(program, &mut backend, &config, vec![], &mut NoPrint, &mut NoopTracer)
        .expect("evaluation succeeds");
    (value, backend.warnings)
}

fn unknown(ty: Ty) -> ExprLoc {
    ExprLoc::new(Expr::Unknown(ty))
}

#[test]
fn undetermined_while_loops_are_bounded_by_the_unroll_budget() {
    let unroll = 4;
    let p = program(vec![
        global("steps", int(0)),
        func(
            "main",
            vec![
                declare("flag", unknown(Ty::Bool)),
                StmtLoc::new(Stmt::While {
                    cond: var("flag"),
                    body: Box::new(assign(lvar("steps"), binop(BinOp::Add, var("steps"), int(1)))),
                }),
                ret(var("steps")),
            ],
        ),
    ]);
    let (value, warnings) = run_sym(&p, unroll);
    let SymValue::Known(NativeValue::Int(steps)) = value else {
        panic!("expected a determined step count, got {value:?}");
    };
    let steps: i64 = steps.try_into().unwrap();
    assert!(steps <= i64::try_from(unroll).unwrap(), "ran {steps} bodies");
    assert_eq!(steps, 3);
    assert_eq!(warnings, 1);
}

/// The exhaustion warning goes through the run's print writer, so hosts
/// that capture or suppress interpreter output control it like any
/// `print` statement.
#[test]
fn unroll_warnings_reach_the_print_writer() {
    let p = program(vec![func(
        "main",
        vec![
            declare("flag", unknown(Ty::Bool)),
            StmtLoc::new(Stmt::While {
                cond: var("flag"),
                body: Box::new(StmtLoc::new(Stmt::Pass)),
            }),
            ret(int(0)),
        ],
    )]);
    let mut backend = SymBackend::new();
    let mut print = CollectPrint::new();
    asli::run_with(&p, &mut backend, &Config::default(), vec![], &mut print, &mut NoopTracer)
        .expect("evaluation succeeds");
    assert_eq!(backend.warnings, 1);
    assert_eq!(print.into_output(), "warning: while loop stopped after 3 unrollings\n");
}

#[test]
fn undetermined_for_bounds_are_metered_too() {
    let p = program(vec![
        global("steps", int(0)),
        func(
            "main",
            vec![
                StmtLoc::new(Stmt::For {
                    index: "i".to_owned(),
                    start: int(1),
                    dir: ForDirection::Up,
                    end: unknown(Ty::Int(asli::ast::IntConstraint::Unconstrained)),
                    body: Box::new(assign(lvar("steps"), binop(BinOp::Add, var("steps"), int(1)))),
                }),
                ret(var("steps")),
            ],
        ),
    ]);
    let (value, warnings) = run_sym(&p, 3);
    assert_eq!(value, SymValue::Known(NativeValue::Int(2.into())));
    assert_eq!(warnings, 1);
}

#[test]
fn undetermined_repeat_gets_one_extra_iteration() {
    let p = program(vec![
        global("steps", int(0)),
        func(
            "main",
            vec![
                StmtLoc::new(Stmt::Repeat {
                    body: Box::new(assign(lvar("steps"), binop(BinOp::Add, var("steps"), int(1)))),
                    cond: unknown(Ty::Bool),
                }),
                ret(var("steps")),
            ],
        ),
    ]);
    let (value, warnings) = run_sym(&p, 3);
    // One unconditional body run plus the metered iterations.
    assert_eq!(value, SymValue::Known(NativeValue::Int(4.into())));
    assert_eq!(warnings, 1);
}

#[test]
fn undetermined_conditionals_select_symbolically() {
    let expr = ExprLoc::new(Expr::Cond {
        cond: Box::new(unknown(Ty::Bool)),
        then_branch: Box::new(int(1)),
        else_branch: Box::new(int(2)),
    });
    let p = program(vec![func("main", vec![ret(expr)])]);
    let (value, warnings) = run_sym(&p, 3);
    assert_eq!(value, SymValue::Unknown);
    assert_eq!(warnings, 0);
}
