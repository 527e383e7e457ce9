//! The typed AST consumed by the evaluator.
//!
//! The AST is produced by an external parser and elaborated by an external
//! type checker before it reaches this crate. Every node carries a source
//! position, and all nodes derive serde so a host can hand the elaborated
//! program over in serialized form (the CLI reads it as JSON).
//!
//! Nodes are immutable once built and contain no cycles; the evaluator
//! shares subtrees freely by reference.

use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::bitvector::Bitvector;

/// A half-open byte range into the original source text.
///
/// The parser records real offsets; programs built programmatically (for
/// example in tests) leave the default zero range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    pub start: u32,
    pub end: u32,
}

impl Pos {
    /// Creates a position covering `start..end`.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// True for the default zero range used by synthesized nodes.
    #[must_use]
    pub fn is_unknown(self) -> bool {
        self.start == 0 && self.end == 0
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// A literal constant.
///
/// Bitvector literals keep their exact width, so `'00'` and `'0000'` are
/// distinct values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Int(BigInt),
    Real(BigRational),
    String(String),
    BitVector(Bitvector),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::BitVector(bv) => write!(f, "{bv}"),
        }
    }
}

/// Binary operators as elaborated by the type checker.
///
/// `BoolAnd`, `BoolOr` and `BoolImpl` are short-circuit forms: the
/// evaluator desugars them to conditionals and never hands them to the
/// backend with an unevaluated operand. All other operators are strict and
/// dispatch straight to [`Backend::binop`](crate::Backend::binop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum BinOp {
    #[strum(serialize = "&&")]
    BoolAnd,
    #[strum(serialize = "||")]
    BoolOr,
    #[strum(serialize = "-->")]
    BoolImpl,
    #[strum(serialize = "<->")]
    BoolEquiv,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    /// Exact integer division; a dynamic error when the divisor does not
    /// divide the dividend.
    #[strum(serialize = "DIV")]
    Div,
    /// Integer division rounding towards negative infinity.
    #[strum(serialize = "DIVRM")]
    DivRm,
    #[strum(serialize = "MOD")]
    Mod,
    #[strum(serialize = "<<")]
    Shl,
    #[strum(serialize = ">>")]
    Shr,
    #[strum(serialize = "^")]
    Pow,
    /// Real division.
    #[strum(serialize = "/")]
    RDiv,
    #[strum(serialize = "AND")]
    BitAnd,
    #[strum(serialize = "OR")]
    BitOr,
    #[strum(serialize = "EOR")]
    BitXor,
}

impl BinOp {
    /// True for the lazily evaluated boolean connectives.
    #[must_use]
    pub fn is_short_circuit(self) -> bool {
        matches!(self, Self::BoolAnd | Self::BoolOr | Self::BoolImpl)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum UnOp {
    #[strum(serialize = "-")]
    Neg,
    #[strum(serialize = "!")]
    BoolNot,
    #[strum(serialize = "NOT")]
    BitNot,
}

/// A bit slice selector, before evaluation.
///
/// All forms evaluate to an `(offset, length)` pair of backend values with
/// the offset counted from the least significant bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Slice {
    /// A single bit `[i]`, length 1.
    Single(ExprLoc),
    /// An inclusive range `[hi:lo]`.
    Range(ExprLoc, ExprLoc),
    /// An offset-and-length slice `[start +: len]`.
    Length(ExprLoc, ExprLoc),
    /// A scaled slice `[factor *: len]`, starting at `factor * len`.
    Scaled(ExprLoc, ExprLoc),
}

/// A pattern on the right of `IN`, or a case-statement arm selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// Matches anything.
    All,
    /// Disjunction of sub-patterns.
    Any(Vec<Pattern>),
    Not(Box<Pattern>),
    /// Equality with the value of an expression.
    Single(ExprLoc),
    Geq(ExprLoc),
    Leq(ExprLoc),
    /// Inclusive range between two expressions.
    Range(ExprLoc, ExprLoc),
    /// Bitvector mask such as `'1x0'`; `x` bits are unconstrained.
    Mask(String),
    /// Element-wise match against a tuple value.
    Tuple(Vec<Pattern>),
}

/// An integer-domain constraint attached to `integer` types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Exactly the value of the expression.
    Exact(ExprLoc),
    /// The inclusive range between two expressions.
    Range(ExprLoc, ExprLoc),
}

/// The constraint kind of an `integer` type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IntConstraint {
    /// Any integer.
    Unconstrained,
    /// A non-empty disjunction of [`Constraint`]s.
    WellConstrained(Vec<Constraint>),
    /// A parameterized integer the type checker was expected to eliminate.
    /// Reaching the evaluator with one of these is an input invariant
    /// violation.
    Parameterized,
}

/// The length of an array type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayLength {
    /// A statically evaluable integer expression.
    Expr(Box<ExprLoc>),
    /// The array is indexed by an enumeration with the given label count.
    Enum(String, usize),
}

/// A type, as elaborated by the type checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ty {
    Bool,
    Real,
    String,
    Int(IntConstraint),
    /// A bitvector whose width is the given (statically evaluable)
    /// expression.
    Bits(Box<ExprLoc>),
    Enum(Vec<String>),
    Tuple(Vec<Ty>),
    Array {
        length: ArrayLength,
        element: Box<Ty>,
    },
    Record(Vec<(String, Ty)>),
    Exception(Vec<(String, Ty)>),
    /// A reference to a declared type, resolved through the static
    /// environment.
    Named(String),
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("boolean"),
            Self::Real => f.write_str("real"),
            Self::String => f.write_str("string"),
            Self::Int(IntConstraint::Unconstrained) => f.write_str("integer"),
            Self::Int(IntConstraint::WellConstrained(_)) => f.write_str("integer {..}"),
            Self::Int(IntConstraint::Parameterized) => f.write_str("integer {,}"),
            Self::Bits(width) => write!(f, "bits({width})"),
            Self::Enum(labels) => write!(f, "enumeration {{{}}}", labels.join(", ")),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Array { element, .. } => write!(f, "array [..] of {element}"),
            Self::Record(_) => f.write_str("record {..}"),
            Self::Exception(_) => f.write_str("exception {..}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// An expression with its source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprLoc {
    pub pos: Pos,
    pub expr: Expr,
}

impl ExprLoc {
    /// Wraps an expression with an unknown position.
    #[must_use]
    pub fn new(expr: Expr) -> Self {
        Self { pos: Pos::default(), expr }
    }
}

impl fmt::Display for ExprLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Var(String),
    Binop {
        op: BinOp,
        lhs: Box<ExprLoc>,
        rhs: Box<ExprLoc>,
    },
    Unop {
        op: UnOp,
        operand: Box<ExprLoc>,
    },
    Cond {
        cond: Box<ExprLoc>,
        then_branch: Box<ExprLoc>,
        else_branch: Box<ExprLoc>,
    },
    /// Bit-slice read `base[slices]`.
    Slice {
        base: Box<ExprLoc>,
        slices: Vec<Slice>,
    },
    Call {
        name: String,
        args: Vec<ExprLoc>,
        named_args: Vec<(String, ExprLoc)>,
    },
    /// Array read; the index must evaluate to a concrete integer.
    GetArray {
        base: Box<ExprLoc>,
        index: Box<ExprLoc>,
    },
    /// Tuple projection with a compile-time index.
    GetItem {
        base: Box<ExprLoc>,
        index: usize,
    },
    /// Record construction; fields are evaluated in source order.
    Record {
        ty: String,
        fields: Vec<(String, ExprLoc)>,
    },
    GetField {
        base: Box<ExprLoc>,
        name: String,
    },
    /// Multi-field read `base.[f1, f2, ..]`; the named bitvector fields are
    /// concatenated left to right.
    GetFields {
        base: Box<ExprLoc>,
        names: Vec<String>,
    },
    /// Bitvector concatenation `[e1, e2, ..]`, most significant first.
    Concat(Vec<ExprLoc>),
    Tuple(Vec<ExprLoc>),
    /// `UNKNOWN: ty`; the backend produces a don't-care value of the type.
    Unknown(Ty),
    /// `expr IN pattern`, a boolean-valued match.
    Pattern {
        expr: Box<ExprLoc>,
        pattern: Box<Pattern>,
    },
    /// The asserting type conversion `expr AS ty`.
    AsType {
        expr: Box<ExprLoc>,
        ty: Ty,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Var(name) => f.write_str(name),
            Self::Binop { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Self::Unop { op, operand } => write!(f, "({op} {operand})"),
            Self::Cond {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "(if {cond} then {then_branch} else {else_branch})"),
            Self::Slice { base, slices } => write!(f, "{base}[<{} slices>]", slices.len()),
            Self::Call { name, args, .. } => write!(f, "{name}(<{} args>)", args.len()),
            Self::GetArray { base, index } => write!(f, "{base}[[{index}]]"),
            Self::GetItem { base, index } => write!(f, "{base}.item{index}"),
            Self::Record { ty, .. } => write!(f, "{ty} {{..}}"),
            Self::GetField { base, name } => write!(f, "{base}.{name}"),
            Self::GetFields { base, names } => write!(f, "{base}.[{}]", names.join(", ")),
            Self::Concat(parts) => write!(f, "[<{} parts>]", parts.len()),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Unknown(ty) => write!(f, "UNKNOWN: {ty}"),
            Self::Pattern { expr, .. } => write!(f, "({expr} IN <pattern>)"),
            Self::AsType { expr, ty } => write!(f, "({expr} AS {ty})"),
        }
    }
}

/// A left-hand-side expression with its source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LExprLoc {
    pub pos: Pos,
    pub lexpr: LExpr,
}

impl LExprLoc {
    /// Wraps a left-hand side with an unknown position.
    #[must_use]
    pub fn new(lexpr: LExpr) -> Self {
        Self { pos: Pos::default(), lexpr }
    }
}

/// A left-hand-side expression, the target of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LExpr {
    /// `-` discards the assigned value.
    Discard,
    Var(String),
    /// Bit-slice write `base[slices] = v`, a read-modify-write of the whole
    /// bitvector.
    Slice {
        base: Box<LExprLoc>,
        slices: Vec<Slice>,
    },
    SetArray {
        base: Box<LExprLoc>,
        index: Box<ExprLoc>,
    },
    SetField {
        base: Box<LExprLoc>,
        name: String,
    },
    /// Multi-field write `base.[f1, f2, ..] = v`. The type checker
    /// annotates the bit range of `v` feeding each field; names and ranges
    /// must have equal length.
    SetFields {
        base: Box<LExprLoc>,
        names: Vec<String>,
        /// `(offset, length)` into the assigned value, one per field.
        ranges: Vec<(usize, usize)>,
    },
    /// Tuple destructuring `(le1, le2, ..) = v`.
    Destructuring(Vec<LExprLoc>),
    /// Bitvector split `[le1, le2, ..] = v`, most significant first. The
    /// type checker annotates the width of every part.
    Concat {
        parts: Vec<LExprLoc>,
        widths: Option<Vec<usize>>,
    },
}

/// A local declaration binding shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocalDeclItem {
    Discard,
    Var(String),
    Typed(Box<LocalDeclItem>, Ty),
    Tuple(Vec<LocalDeclItem>),
}

/// The keyword a local declaration was introduced with. The distinction is
/// enforced by the type checker; the evaluator binds all three identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalKind {
    Var,
    Let,
    Constant,
}

/// Direction of a `for` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForDirection {
    Up,
    Down,
}

/// One `when ty => stmt` clause of a try statement, with an optional
/// binder for the caught value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catcher {
    pub name: Option<String>,
    pub ty: Ty,
    pub stmt: StmtLoc,
}

/// One arm of a case statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseArm {
    pub pattern: Pattern,
    pub stmt: StmtLoc,
}

/// The argument of a `throw` statement. The dynamic type annotation is
/// filled in by the type checker; a missing one is an elaboration failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowArg {
    pub expr: ExprLoc,
    pub ty: Option<Ty>,
}

/// A statement with its source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StmtLoc {
    pub pos: Pos,
    pub stmt: Stmt,
}

impl StmtLoc {
    /// Wraps a statement with an unknown position.
    #[must_use]
    pub fn new(stmt: Stmt) -> Self {
        Self { pos: Pos::default(), stmt }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Pass,
    Seq(Box<StmtLoc>, Box<StmtLoc>),
    Decl {
        keyword: LocalKind,
        item: LocalDeclItem,
        init: Option<ExprLoc>,
    },
    Assign {
        lhs: LExprLoc,
        rhs: ExprLoc,
    },
    /// A procedure call; the callee must return no values.
    Call {
        name: String,
        args: Vec<ExprLoc>,
        named_args: Vec<(String, ExprLoc)>,
    },
    Return(Option<ExprLoc>),
    Cond {
        cond: ExprLoc,
        then_branch: Box<StmtLoc>,
        else_branch: Box<StmtLoc>,
    },
    /// Evaluated as a first-match-wins conditional cascade over the once
    /// evaluated discriminant.
    Case {
        discriminant: ExprLoc,
        arms: Vec<CaseArm>,
        otherwise: Option<Box<StmtLoc>>,
    },
    Assert(ExprLoc),
    While {
        cond: ExprLoc,
        body: Box<StmtLoc>,
    },
    /// `repeat body until cond`; the body runs once before the condition
    /// is first consulted.
    Repeat {
        body: Box<StmtLoc>,
        cond: ExprLoc,
    },
    For {
        index: String,
        start: ExprLoc,
        dir: ForDirection,
        end: ExprLoc,
        body: Box<StmtLoc>,
    },
    /// `throw;` rethrows the exception being handled; `throw e;` raises a
    /// fresh one.
    Throw(Option<ThrowArg>),
    Try {
        body: Box<StmtLoc>,
        catchers: Vec<Catcher>,
        otherwise: Option<Box<StmtLoc>>,
    },
    /// Diagnostic output; arguments must be side-effect-free.
    Print {
        args: Vec<ExprLoc>,
        newline: bool,
    },
}

/// The executable part of a subprogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubprogramBody {
    Statements(StmtLoc),
    /// Implemented by the backend's primitive table.
    Primitive,
}

/// A subprogram declaration.
///
/// `parameters` are the named (type-level) arguments such as the `N` of
/// `bits(N)`; they are bound after the positional arguments and skipped
/// when the positional binding already produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    pub args: Vec<(String, Ty)>,
    pub parameters: Vec<(String, Option<Ty>)>,
    pub return_type: Option<Ty>,
    pub body: SubprogramBody,
}

/// The keyword a global storage element was introduced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlobalKind {
    Var,
    Let,
    Constant,
    Config,
}

/// A global storage declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalDecl {
    pub keyword: GlobalKind,
    pub name: String,
    pub ty: Option<Ty>,
    pub initial_value: Option<ExprLoc>,
}

/// A type declaration, optionally a declared subtype of another named type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub ty: Ty,
    pub supertype: Option<String>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    Func(FuncDecl),
    Global(GlobalDecl),
    Type(TypeDecl),
}

/// A complete, type-checked program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub decls: Vec<Decl>,
}

/// Syntactic side-effect freedom, the guard for the ternary fast path.
///
/// Conservative: only forms that can neither throw, call, nor fail
/// dynamically qualify, so both branches of a conditional over such
/// expressions may be evaluated eagerly.
#[must_use]
pub fn is_simple_expr(e: &ExprLoc) -> bool {
    match &e.expr {
        Expr::Literal(_) | Expr::Var(_) => true,
        Expr::Unop { operand, .. } => is_simple_expr(operand),
        Expr::Binop { op, lhs, rhs } => {
            matches!(
                op,
                BinOp::BoolAnd
                    | BinOp::BoolOr
                    | BinOp::BoolImpl
                    | BinOp::BoolEquiv
                    | BinOp::Eq
                    | BinOp::Ne
                    | BinOp::Le
                    | BinOp::Lt
                    | BinOp::Ge
                    | BinOp::Gt
                    | BinOp::Add
                    | BinOp::Sub
                    | BinOp::Mul
            ) && is_simple_expr(lhs)
                && is_simple_expr(rhs)
        }
        Expr::Cond {
            cond,
            then_branch,
            else_branch,
        } => is_simple_expr(cond) && is_simple_expr(then_branch) && is_simple_expr(else_branch),
        Expr::Tuple(items) => items.iter().all(is_simple_expr),
        Expr::GetItem { base, .. } | Expr::GetField { base, .. } => is_simple_expr(base),
        _ => false,
    }
}

/// Collects the identifiers an expression reads, in first-use order.
///
/// Used by the driver to order global initialisers by dependency.
pub fn used_identifiers(e: &ExprLoc, acc: &mut Vec<String>) {
    fn push(acc: &mut Vec<String>, name: &str) {
        if !acc.iter().any(|n| n == name) {
            acc.push(name.to_owned());
        }
    }
    match &e.expr {
        Expr::Literal(_) => {}
        Expr::Var(name) => push(acc, name),
        Expr::Binop { lhs, rhs, .. } => {
            used_identifiers(lhs, acc);
            used_identifiers(rhs, acc);
        }
        Expr::Unop { operand, .. } => used_identifiers(operand, acc),
        Expr::Cond {
            cond,
            then_branch,
            else_branch,
        } => {
            used_identifiers(cond, acc);
            used_identifiers(then_branch, acc);
            used_identifiers(else_branch, acc);
        }
        Expr::Slice { base, slices } => {
            used_identifiers(base, acc);
            for slice in slices {
                used_identifiers_slice(slice, acc);
            }
        }
        Expr::Call { name, args, named_args } => {
            push(acc, name);
            for arg in args {
                used_identifiers(arg, acc);
            }
            for (_, arg) in named_args {
                used_identifiers(arg, acc);
            }
        }
        Expr::GetArray { base, index } => {
            used_identifiers(base, acc);
            used_identifiers(index, acc);
        }
        Expr::GetItem { base, .. } | Expr::GetField { base, .. } | Expr::GetFields { base, .. } => {
            used_identifiers(base, acc);
        }
        Expr::Record { fields, .. } => {
            for (_, field) in fields {
                used_identifiers(field, acc);
            }
        }
        Expr::Concat(parts) | Expr::Tuple(parts) => {
            for part in parts {
                used_identifiers(part, acc);
            }
        }
        Expr::Unknown(ty) => used_identifiers_ty(ty, acc),
        Expr::Pattern { expr, .. } => used_identifiers(expr, acc),
        Expr::AsType { expr, ty } => {
            used_identifiers(expr, acc);
            used_identifiers_ty(ty, acc);
        }
    }
}

fn used_identifiers_slice(slice: &Slice, acc: &mut Vec<String>) {
    match slice {
        Slice::Single(e) => used_identifiers(e, acc),
        Slice::Range(a, b) | Slice::Length(a, b) | Slice::Scaled(a, b) => {
            used_identifiers(a, acc);
            used_identifiers(b, acc);
        }
    }
}

/// Collects the identifiers a type's embedded expressions read.
pub(crate) fn used_identifiers_ty(ty: &Ty, acc: &mut Vec<String>) {
    match ty {
        Ty::Bits(width) => used_identifiers(width, acc),
        Ty::Int(IntConstraint::WellConstrained(constraints)) => {
            for constraint in constraints {
                match constraint {
                    Constraint::Exact(e) => used_identifiers(e, acc),
                    Constraint::Range(a, b) => {
                        used_identifiers(a, acc);
                        used_identifiers(b, acc);
                    }
                }
            }
        }
        Ty::Tuple(items) => {
            for item in items {
                used_identifiers_ty(item, acc);
            }
        }
        Ty::Array { length, element } => {
            if let ArrayLength::Expr(e) = length {
                used_identifiers(e, acc);
            }
            used_identifiers_ty(element, acc);
        }
        Ty::Record(fields) | Ty::Exception(fields) => {
            for (_, field_ty) in fields {
                used_identifiers_ty(field_ty, acc);
            }
        }
        _ => {}
    }
}

/// Rebuilds the expression that reads the storage a left-hand side writes.
///
/// The slice, array and field assignment rules are read-modify-write: they
/// fetch the current value of the underlying storage, update it and write
/// the whole thing back.
pub fn expr_of_lexpr(le: &LExprLoc) -> ExprLoc {
    let expr = match &le.lexpr {
        // Reading a discarded destination never happens; an arbitrary
        // constant keeps the function total.
        LExpr::Discard => Expr::Literal(Literal::Bool(false)),
        LExpr::Var(name) => Expr::Var(name.clone()),
        LExpr::Slice { base, slices } => Expr::Slice {
            base: Box::new(expr_of_lexpr(base)),
            slices: slices.clone(),
        },
        LExpr::SetArray { base, index } => Expr::GetArray {
            base: Box::new(expr_of_lexpr(base)),
            index: index.clone(),
        },
        LExpr::SetField { base, name } => Expr::GetField {
            base: Box::new(expr_of_lexpr(base)),
            name: name.clone(),
        },
        LExpr::SetFields { base, .. } => return expr_of_lexpr(base),
        LExpr::Destructuring(items) => Expr::Tuple(items.iter().map(expr_of_lexpr).collect()),
        LExpr::Concat { parts, .. } => Expr::Concat(parts.iter().map(expr_of_lexpr).collect()),
    };
    ExprLoc { pos: le.pos, expr }
}
