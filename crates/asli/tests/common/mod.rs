//! Shared helpers for the integration tests: a small AST-builder
//! vocabulary, runners over the native backend, and a spying backend
//! that records identifier traffic.

#![allow(dead_code)]

use asli::ast::{
    BinOp, Decl, Expr, ExprLoc, FuncDecl, GlobalDecl, GlobalKind, IntConstraint, LExpr, LExprLoc, Literal,
    LocalDeclItem, LocalKind, Program, Stmt, StmtLoc, SubprogramBody, Ty, TypeDecl,
};
use asli::{AslError, Backend, Bitvector, Config, NativeBackend, NativeValue, PrimitiveFn, Scope};
use num_bigint::BigInt;

pub fn int(i: i64) -> ExprLoc {
    ExprLoc::new(Expr::Literal(Literal::Int(BigInt::from(i))))
}

pub fn boolean(b: bool) -> ExprLoc {
    ExprLoc::new(Expr::Literal(Literal::Bool(b)))
}

pub fn bits(s: &str) -> ExprLoc {
    ExprLoc::new(Expr::Literal(Literal::BitVector(
        Bitvector::from_bit_str(s).expect("valid bit string"),
    )))
}

pub fn var(name: &str) -> ExprLoc {
    ExprLoc::new(Expr::Var(name.to_owned()))
}

pub fn binop(op: BinOp, lhs: ExprLoc, rhs: ExprLoc) -> ExprLoc {
    ExprLoc::new(Expr::Binop {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn call(name: &str, args: Vec<ExprLoc>) -> ExprLoc {
    ExprLoc::new(Expr::Call {
        name: name.to_owned(),
        args,
        named_args: vec![],
    })
}

pub fn lvar(name: &str) -> LExprLoc {
    LExprLoc::new(LExpr::Var(name.to_owned()))
}

pub fn assign(lhs: LExprLoc, rhs: ExprLoc) -> StmtLoc {
    StmtLoc::new(Stmt::Assign { lhs, rhs })
}

pub fn declare(name: &str, init: ExprLoc) -> StmtLoc {
    StmtLoc::new(Stmt::Decl {
        keyword: LocalKind::Var,
        item: LocalDeclItem::Var(name.to_owned()),
        init: Some(init),
    })
}

pub fn declare_typed(name: &str, ty: Ty, init: Option<ExprLoc>) -> StmtLoc {
    StmtLoc::new(Stmt::Decl {
        keyword: LocalKind::Var,
        item: LocalDeclItem::Typed(Box::new(LocalDeclItem::Var(name.to_owned())), ty),
        init,
    })
}

pub fn ret(e: ExprLoc) -> StmtLoc {
    StmtLoc::new(Stmt::Return(Some(e)))
}

/// Right-folds statements into a sequence.
pub fn seq(stmts: Vec<StmtLoc>) -> StmtLoc {
    let mut iter = stmts.into_iter().rev();
    let Some(last) = iter.next() else {
        return StmtLoc::new(Stmt::Pass);
    };
    iter.fold(last, |tail, head| StmtLoc::new(Stmt::Seq(Box::new(head), Box::new(tail))))
}

pub fn integer() -> Ty {
    Ty::Int(IntConstraint::Unconstrained)
}

pub fn iff(cond: ExprLoc, then_branch: StmtLoc, else_branch: StmtLoc) -> StmtLoc {
    StmtLoc::new(Stmt::Cond {
        cond,
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
    })
}

/// `throw Ty { fields };` with the dynamic type annotation the checker
/// would attach.
pub fn throw_stmt(ty: &str, fields: Vec<(&str, ExprLoc)>) -> StmtLoc {
    StmtLoc::new(Stmt::Throw(Some(asli::ast::ThrowArg {
        expr: ExprLoc::new(Expr::Record {
            ty: ty.to_owned(),
            fields: fields.into_iter().map(|(n, e)| (n.to_owned(), e)).collect(),
        }),
        ty: Some(Ty::Named(ty.to_owned())),
    })))
}

pub fn catcher(name: Option<&str>, ty: &str, stmt: StmtLoc) -> asli::ast::Catcher {
    asli::ast::Catcher {
        name: name.map(str::to_owned),
        ty: Ty::Named(ty.to_owned()),
        stmt,
    }
}

pub fn try_stmt(body: StmtLoc, catchers: Vec<asli::ast::Catcher>, otherwise: Option<StmtLoc>) -> StmtLoc {
    StmtLoc::new(Stmt::Try {
        body: Box::new(body),
        catchers,
        otherwise: otherwise.map(Box::new),
    })
}

/// A `main`-shaped subprogram returning an unconstrained integer.
pub fn func(name: &str, body: Vec<StmtLoc>) -> Decl {
    func_with(name, vec![], Some(integer()), body)
}

pub fn func_with(name: &str, args: Vec<(&str, Ty)>, return_type: Option<Ty>, body: Vec<StmtLoc>) -> Decl {
    Decl::Func(FuncDecl {
        name: name.to_owned(),
        args: args.into_iter().map(|(n, t)| (n.to_owned(), t)).collect(),
        parameters: vec![],
        return_type,
        body: SubprogramBody::Statements(seq(body)),
    })
}

pub fn global(name: &str, init: ExprLoc) -> Decl {
    Decl::Global(GlobalDecl {
        keyword: GlobalKind::Var,
        name: name.to_owned(),
        ty: None,
        initial_value: Some(init),
    })
}

/// Declares an exception type with the given fields.
pub fn exception(name: &str, fields: Vec<(&str, Ty)>) -> Decl {
    Decl::Type(TypeDecl {
        name: name.to_owned(),
        ty: Ty::Exception(fields.into_iter().map(|(n, t)| (n.to_owned(), t)).collect()),
        supertype: None,
    })
}

pub fn program(decls: Vec<Decl>) -> Program {
    Program { decls }
}

/// Runs `main` on a fresh native backend with default options.
pub fn run_program(program: &Program) -> Result<NativeValue, AslError> {
    let mut backend = NativeBackend::new();
    asli::run(program, &mut backend, &Config::default())
}

/// Runs `main` and unwraps an integer result.
pub fn run_for_int(program: &Program) -> i64 {
    use num_traits::ToPrimitive;
    match run_program(program) {
        Ok(NativeValue::Int(i)) => i.to_i64().expect("result fits in an i64"),
        Ok(other) => panic!("expected an integer result, got {other}"),
        Err(err) => panic!("evaluation failed: {err}"),
    }
}

/// One identifier access observed by [`SpyBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Read(String, Scope),
    Write(String, Scope),
}

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Event::Read(name, _) | Event::Write(name, _) => name,
        }
    }
}

/// A backend that evaluates like [`NativeBackend`] but records every
/// identifier read and write.
#[derive(Debug, Default)]
pub struct SpyBackend {
    inner: NativeBackend,
    pub events: Vec<Event>,
}

impl SpyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The names read, in order.
    pub fn reads(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Read(name, _) => Some(name.as_str()),
                Event::Write(..) => None,
            })
            .collect()
    }

    /// The names written, in order.
    pub fn writes(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Write(name, _) => Some(name.as_str()),
                Event::Read(..) => None,
            })
            .collect()
    }
}

impl Backend for SpyBackend {
    type Value = NativeValue;

    fn v_of_literal(&mut self, lit: &asli::ast::Literal) -> NativeValue {
        self.inner.v_of_literal(lit)
    }

    fn v_of_int(&mut self, i: i64) -> NativeValue {
        self.inner.v_of_int(i)
    }

    fn v_to_int(&self, v: &NativeValue) -> Option<i64> {
        self.inner.v_to_int(v)
    }

    fn binop(&mut self, op: BinOp, lhs: NativeValue, rhs: NativeValue) -> Result<NativeValue, AslError> {
        self.inner.binop(op, lhs, rhs)
    }

    fn unop(&mut self, op: asli::ast::UnOp, v: NativeValue) -> Result<NativeValue, AslError> {
        self.inner.unop(op, v)
    }

    fn read_from_bitvector(
        &mut self,
        v: &NativeValue,
        slices: &[(NativeValue, NativeValue)],
    ) -> Result<NativeValue, AslError> {
        self.inner.read_from_bitvector(v, slices)
    }

    fn write_to_bitvector(
        &mut self,
        slices: &[(NativeValue, NativeValue)],
        src: NativeValue,
        dst: NativeValue,
    ) -> Result<NativeValue, AslError> {
        self.inner.write_to_bitvector(slices, src, dst)
    }

    fn bitvector_length(&mut self, v: &NativeValue) -> Result<NativeValue, AslError> {
        self.inner.bitvector_length(v)
    }

    fn concat_bitvectors(&mut self, parts: Vec<NativeValue>) -> Result<NativeValue, AslError> {
        self.inner.concat_bitvectors(parts)
    }

    fn get_index(&mut self, index: usize, v: &NativeValue) -> Result<NativeValue, AslError> {
        self.inner.get_index(index, v)
    }

    fn set_index(&mut self, index: usize, element: NativeValue, v: NativeValue) -> Result<NativeValue, AslError> {
        self.inner.set_index(index, element, v)
    }

    fn get_field(&mut self, name: &str, v: &NativeValue) -> Result<NativeValue, AslError> {
        self.inner.get_field(name, v)
    }

    fn set_field(&mut self, name: &str, element: NativeValue, record: NativeValue) -> Result<NativeValue, AslError> {
        self.inner.set_field(name, element, record)
    }

    fn create_vector(&mut self, elements: Vec<NativeValue>) -> Result<NativeValue, AslError> {
        self.inner.create_vector(elements)
    }

    fn create_record(&mut self, fields: Vec<(String, NativeValue)>) -> Result<NativeValue, AslError> {
        self.inner.create_record(fields)
    }

    fn is_undetermined(&self, v: &NativeValue) -> bool {
        self.inner.is_undetermined(v)
    }

    fn choice(&mut self, v: &NativeValue) -> Result<bool, AslError> {
        self.inner.choice(v)
    }

    fn ternary(&mut self, cond: NativeValue, v_true: NativeValue, v_false: NativeValue) -> Result<NativeValue, AslError> {
        self.inner.ternary(cond, v_true, v_false)
    }

    fn on_read_identifier(&mut self, name: &str, scope: &Scope, _v: &NativeValue) {
        self.events.push(Event::Read(name.to_owned(), scope.clone()));
    }

    fn on_write_identifier(&mut self, name: &str, scope: &Scope, _v: &NativeValue) {
        self.events.push(Event::Write(name.to_owned(), scope.clone()));
    }

    fn debug_value(&self, v: &NativeValue) -> String {
        self.inner.debug_value(v)
    }

    fn primitives() -> Vec<(FuncDecl, PrimitiveFn<Self>)> {
        // No primitive library; tests that need one run on the native
        // backend directly.
        Vec::new()
    }
}
