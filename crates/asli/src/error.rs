//! Fatal interpreter errors and the exception propagation channel.
//!
//! Two very different things travel out of evaluation:
//!
//! - [`AslError`]: a fatal dynamic error from the taxonomy below. Nothing
//!   inside the interpreted program can observe or recover from one; it
//!   unwinds straight to the caller of the driver.
//! - An ASL exception raised by `throw`. These are ordinary semantics and
//!   are caught by `try` statements.
//!
//! Both ride the `Err` arm of [`Interrupt`] so `?` propagates them, and
//! only the try/catch evaluation inspects the [`Interrupt::Raise`] case.

use std::fmt;

use strum::IntoStaticStr;

use crate::{
    ast::{Pos, Ty},
    env::Scope,
};

/// A fatal dynamic error, annotated with a source position where one is
/// known.
#[derive(Debug, Clone, PartialEq)]
pub struct AslError {
    pub pos: Pos,
    pub kind: AslErrorKind,
}

/// The closed taxonomy of fatal dynamic errors.
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
pub enum AslErrorKind {
    /// A lookup or call target does not exist.
    UndefinedIdentifier(String),
    /// An `AS` assertion failed; carries the offending value and the
    /// expected type, both rendered.
    MismatchType { value: String, expected: String },
    /// The type checker did not elaborate enough information for the
    /// construct to be evaluated.
    TypeInferenceNeeded(String),
    /// The expression cannot be evaluated dynamically, typically an array
    /// index without a concrete integer value.
    UnsupportedExpr(String),
    /// A call or tuple assignment with the wrong number of elements.
    BadArity {
        name: String,
        expected: usize,
        got: usize,
    },
    /// An `assert` evaluated to FALSE; carries the rendered expression.
    AssertionFailed(String),
    /// A side-effect-free evaluation observed a throw.
    UnexpectedSideEffect(String),
    /// A well-constrained integer type with no inhabitant was asked for a
    /// base value.
    BaseValueEmptyType(String),
    /// The input AST violated an invariant the parser or type checker is
    /// supposed to guarantee.
    UnrespectedParserInvariant(String),
    /// The entry subprogram has the wrong shape.
    MismatchedReturnValue(String),
    /// An ASL exception escaped the entry subprogram.
    UncaughtException(String),
    /// A backend operation failed dynamically, for example division by
    /// zero or a bitvector width mismatch.
    OperationFailed(String),
}

impl AslError {
    /// Creates an error at a known position.
    #[must_use]
    pub fn new(pos: Pos, kind: AslErrorKind) -> Self {
        Self { pos, kind }
    }

    /// Creates an error with no position information, typically from a
    /// backend operation.
    #[must_use]
    pub fn no_pos(kind: AslErrorKind) -> Self {
        Self {
            pos: Pos::default(),
            kind,
        }
    }

    /// Attaches a position unless the error already carries one.
    #[must_use]
    pub fn at(mut self, pos: Pos) -> Self {
        if self.pos.is_unknown() {
            self.pos = pos;
        }
        self
    }
}

impl fmt::Display for AslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ASL dynamic error: ")?;
        match &self.kind {
            AslErrorKind::UndefinedIdentifier(name) => write!(f, "undefined identifier {name}")?,
            AslErrorKind::MismatchType { value, expected } => {
                write!(f, "value {value} does not match type {expected}")?;
            }
            AslErrorKind::TypeInferenceNeeded(what) => {
                write!(f, "type inference needed for {what}")?;
            }
            AslErrorKind::UnsupportedExpr(expr) => {
                write!(f, "cannot evaluate expression {expr} dynamically")?;
            }
            AslErrorKind::BadArity { name, expected, got } => {
                write!(f, "arity error in {name}: {expected} expected, got {got}")?;
            }
            AslErrorKind::AssertionFailed(expr) => write!(f, "assertion failed: {expr}")?,
            AslErrorKind::UnexpectedSideEffect(msg) => {
                write!(f, "unexpected side effect: {msg}")?;
            }
            AslErrorKind::BaseValueEmptyType(ty) => {
                write!(f, "no base value for the empty type {ty}")?;
            }
            AslErrorKind::UnrespectedParserInvariant(msg) => {
                write!(f, "input invariant violated: {msg}")?;
            }
            AslErrorKind::MismatchedReturnValue(name) => {
                write!(f, "mismatched return value shape for {name}")?;
            }
            AslErrorKind::UncaughtException(msg) => write!(f, "uncaught exception: {msg}")?,
            AslErrorKind::OperationFailed(msg) => f.write_str(msg)?,
        }
        if !self.pos.is_unknown() {
            write!(f, " (at {})", self.pos)?;
        }
        Ok(())
    }
}

impl std::error::Error for AslError {}

/// A thrown ASL exception in flight.
///
/// The value was written to a freshly generated, globally scoped
/// identifier at the throw site so backends can track it; `name` and
/// `scope` record that provenance, and re-reads of the caught value go
/// through it. `ty` is the dynamic type of the throw-site expression,
/// computed once and reused by every catcher that inspects it.
#[derive(Debug, Clone)]
pub struct Thrown<V> {
    pub value: V,
    pub name: String,
    pub scope: Scope,
    pub ty: Ty,
}

/// Why evaluation stopped early.
///
/// `Raise(None)` is the implicit rethrow produced by a bare `throw;`
/// inside a catcher; the enclosing try statement rewrites it to the
/// exception being handled.
#[derive(Debug, Clone)]
pub enum Interrupt<V> {
    /// An ASL exception is propagating.
    Raise(Option<Thrown<V>>),
    /// A fatal dynamic error; never caught by `try`.
    Fatal(AslError),
}

impl<V> From<AslError> for Interrupt<V> {
    fn from(err: AslError) -> Self {
        Self::Fatal(err)
    }
}

impl<V> Interrupt<V> {
    /// Attaches a position to the fatal arm; exceptions are unchanged.
    #[must_use]
    pub fn at(self, pos: Pos) -> Self {
        match self {
            Self::Fatal(err) => Self::Fatal(err.at(pos)),
            raise @ Self::Raise(_) => raise,
        }
    }
}
