//! The backend abstraction: value domain, primitive operations and effect
//! discipline.
//!
//! The evaluator is parameterised over a [`Backend`] and never inspects
//! values itself; swapping the backend swaps the whole value domain. The
//! crate ships a concrete interpreter backend
//! ([`NativeBackend`](crate::NativeBackend)); symbolic or weak-memory
//! backends implement the same trait without touching the evaluator.
//!
//! # Effect discipline
//!
//! Evaluation is strict and strictly left-to-right, so the effect carrier
//! is the call order itself: a backend that needs an effect log or a
//! dependency graph records it as its methods are invoked. Identifier
//! traffic is announced through [`Backend::on_read_identifier`] and
//! [`Backend::on_write_identifier`], branching through
//! [`Backend::choice`] and [`Backend::commit`]. Data dependencies follow
//! from operand positions: every operand of [`Backend::binop`] was
//! produced by an earlier method call on the same backend.
//!
//! The branch and identifier hooks default to no-ops and compile away
//! entirely under monomorphization when unused; warnings default to the
//! run's [`PrintWriter`].

use crate::{
    ast::{BinOp, FuncDecl, Literal, Ty, UnOp},
    env::Scope,
    error::AslError,
    io::PrintWriter,
};

/// The runtime of a primitive subprogram.
///
/// Receives the evaluated positional arguments followed by the resolved
/// named arguments, and returns the tuple of result values (empty for
/// procedures).
pub type PrimitiveFn<B> = fn(&mut B, &[<B as Backend>::Value]) -> Result<Vec<<B as Backend>::Value>, AslError>;

/// A value domain plus the operations the evaluator delegates to it.
///
/// Operations that can fail dynamically return [`AslError`]; such failures
/// are fatal, never ASL exceptions. Values may be *undetermined*: a
/// symbolic backend can represent a boolean or integer whose identity is
/// not statically known, and the evaluator then meters loops by the unroll
/// budget instead of relying on [`Backend::choice`] to terminate them.
pub trait Backend {
    type Value: Clone + std::fmt::Debug;

    /// Builds a value from a literal constant.
    fn v_of_literal(&mut self, lit: &Literal) -> Self::Value;

    /// Builds an integer value from a concrete machine integer.
    fn v_of_int(&mut self, i: i64) -> Self::Value;

    /// Extracts a concrete integer, when the value has one. Array indices
    /// and bitvector widths must pass through here.
    fn v_to_int(&self, v: &Self::Value) -> Option<i64>;

    /// Applies a strict binary operator. Short-circuit connectives are
    /// desugared by the evaluator and arrive here only with both operands
    /// already evaluated.
    fn binop(&mut self, op: BinOp, lhs: Self::Value, rhs: Self::Value) -> Result<Self::Value, AslError>;

    fn unop(&mut self, op: UnOp, v: Self::Value) -> Result<Self::Value, AslError>;

    /// Reads the given `(offset, length)` slices out of a bitvector and
    /// concatenates them in slice order, first slice most significant.
    fn read_from_bitvector(
        &mut self,
        v: &Self::Value,
        slices: &[(Self::Value, Self::Value)],
    ) -> Result<Self::Value, AslError>;

    /// Distributes the bits of `src` over the given slices of `dst`,
    /// first slice taking the most significant bits, and returns the
    /// modified bitvector.
    fn write_to_bitvector(
        &mut self,
        slices: &[(Self::Value, Self::Value)],
        src: Self::Value,
        dst: Self::Value,
    ) -> Result<Self::Value, AslError>;

    /// The width of a bitvector, as an integer value.
    fn bitvector_length(&mut self, v: &Self::Value) -> Result<Self::Value, AslError>;

    /// Concatenates bitvectors, the first part most significant.
    fn concat_bitvectors(&mut self, parts: Vec<Self::Value>) -> Result<Self::Value, AslError>;

    /// Reads element `index` of a vector (tuple or array) value.
    fn get_index(&mut self, index: usize, v: &Self::Value) -> Result<Self::Value, AslError>;

    /// Replaces element `index` of a vector value.
    fn set_index(&mut self, index: usize, element: Self::Value, v: Self::Value) -> Result<Self::Value, AslError>;

    fn get_field(&mut self, name: &str, v: &Self::Value) -> Result<Self::Value, AslError>;

    fn set_field(&mut self, name: &str, element: Self::Value, record: Self::Value)
    -> Result<Self::Value, AslError>;

    fn create_vector(&mut self, elements: Vec<Self::Value>) -> Result<Self::Value, AslError>;

    /// Builds a record; field order is the declaration order and is
    /// preserved.
    fn create_record(&mut self, fields: Vec<(String, Self::Value)>) -> Result<Self::Value, AslError>;

    /// Produces a don't-care value of the given type for `UNKNOWN`.
    ///
    /// `base` is the type's base value, already computed by the evaluator
    /// with the type's width and constraint expressions resolved; concrete
    /// backends can simply keep it, which is what the default does. A
    /// symbolic backend can instead mint a fresh unconstrained value from
    /// `ty`.
    fn v_unknown_of_type(&mut self, ty: &Ty, base: Self::Value) -> Result<Self::Value, AslError> {
        let _ = ty;
        Ok(base)
    }

    /// True when the boolean or integer identity of the value is not
    /// statically known.
    fn is_undetermined(&self, v: &Self::Value) -> bool;

    /// Materialises a boolean value into a branch decision. A symbolic
    /// backend picks a branch here and records the commitment.
    fn choice(&mut self, v: &Self::Value) -> Result<bool, AslError>;

    /// Selects between two eagerly evaluated, side-effect-free branch
    /// values.
    fn ternary(
        &mut self,
        cond: Self::Value,
        v_true: Self::Value,
        v_false: Self::Value,
    ) -> Result<Self::Value, AslError>;

    /// Records a committed branching event. `label` names the construct
    /// that branched.
    fn commit(&mut self, label: &'static str, taken: bool) {
        let _ = (label, taken);
    }

    /// Reports a non-fatal evaluation warning, currently only loop-unroll
    /// exhaustion.
    ///
    /// The warning text goes through the run's [`PrintWriter`], so hosts
    /// that capture or suppress interpreter output see warnings the same
    /// way they see `print` statements. Backends that record warnings as
    /// events override this and decide themselves whether to also write.
    fn warn(&mut self, print: &mut dyn PrintWriter, msg: &str) {
        print.write_str("warning: ");
        print.write_str(msg);
        print.push('\n');
    }

    /// Invoked on every identifier read, with the resolved value.
    fn on_read_identifier(&mut self, name: &str, scope: &Scope, v: &Self::Value) {
        let _ = (name, scope, v);
    }

    /// Invoked on every identifier write, before the store is updated.
    fn on_write_identifier(&mut self, name: &str, scope: &Scope, v: &Self::Value) {
        let _ = (name, scope, v);
    }

    /// Renders a value for diagnostics, `print` statements and error
    /// messages.
    fn debug_value(&self, v: &Self::Value) -> String;

    /// The primitive subprograms this backend implements. The driver
    /// prepends their declarations to the program's, so an ASL declaration
    /// of the same name overrides the primitive.
    #[must_use]
    fn primitives() -> Vec<(FuncDecl, PrimitiveFn<Self>)>
    where
        Self: Sized,
    {
        Vec::new()
    }
}
