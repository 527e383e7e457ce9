//! The primitive subprogram library of the native backend.
//!
//! The driver prepends these declarations to the program under
//! evaluation, so ASL code calls them like any other subprogram. The
//! library covers the bitvector and integer conversions the standard
//! prelude relies on.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{
    ast::{Expr, ExprLoc, FuncDecl, IntConstraint, SubprogramBody, Ty},
    backend::PrimitiveFn,
    bitvector::Bitvector,
    error::{AslError, AslErrorKind},
    native::{NativeBackend, value::NativeValue},
};

fn fail(name: &str, msg: &str) -> AslError {
    AslError::no_pos(AslErrorKind::OperationFailed(format!("{name}: {msg}")))
}

fn integer() -> Ty {
    Ty::Int(IntConstraint::Unconstrained)
}

fn bits(width: Expr) -> Ty {
    Ty::Bits(Box::new(ExprLoc::new(width)))
}

fn var(name: &str) -> Expr {
    Expr::Var(name.to_owned())
}

fn decl(name: &str, args: Vec<(&str, Ty)>, parameters: Vec<&str>, return_type: Ty) -> FuncDecl {
    FuncDecl {
        name: name.to_owned(),
        args: args.into_iter().map(|(n, t)| (n.to_owned(), t)).collect(),
        parameters: parameters
            .into_iter()
            .map(|n| (n.to_owned(), Some(integer())))
            .collect(),
        return_type: Some(return_type),
        body: SubprogramBody::Primitive,
    }
}

fn arg_bits<'a>(name: &'static str, args: &'a [NativeValue], index: usize) -> Result<&'a Bitvector, AslError> {
    args.get(index)
        .and_then(NativeValue::as_bitvector)
        .ok_or_else(|| fail(name, "expected a bitvector argument"))
}

fn arg_natural(name: &'static str, args: &[NativeValue], index: usize) -> Result<usize, AslError> {
    args.get(index)
        .and_then(NativeValue::as_int)
        .and_then(BigInt::to_usize)
        .ok_or_else(|| fail(name, "expected a natural number argument"))
}

fn uint(_: &mut NativeBackend, args: &[NativeValue]) -> Result<Vec<NativeValue>, AslError> {
    let bv = arg_bits("UInt", args, 0)?;
    Ok(vec![NativeValue::Int(bv.to_unsigned())])
}

fn sint(_: &mut NativeBackend, args: &[NativeValue]) -> Result<Vec<NativeValue>, AslError> {
    let bv = arg_bits("SInt", args, 0)?;
    Ok(vec![NativeValue::Int(bv.to_signed())])
}

fn len(_: &mut NativeBackend, args: &[NativeValue]) -> Result<Vec<NativeValue>, AslError> {
    let bv = arg_bits("Len", args, 0)?;
    Ok(vec![NativeValue::Int(BigInt::from(bv.len()))])
}

fn zeros(_: &mut NativeBackend, args: &[NativeValue]) -> Result<Vec<NativeValue>, AslError> {
    let width = arg_natural("Zeros", args, 0)?;
    Ok(vec![NativeValue::BitVector(Bitvector::zeros(width))])
}

fn ones(_: &mut NativeBackend, args: &[NativeValue]) -> Result<Vec<NativeValue>, AslError> {
    let width = arg_natural("Ones", args, 0)?;
    Ok(vec![NativeValue::BitVector(Bitvector::ones(width))])
}

fn replicate(_: &mut NativeBackend, args: &[NativeValue]) -> Result<Vec<NativeValue>, AslError> {
    let bv = arg_bits("Replicate", args, 0)?;
    let count = arg_natural("Replicate", args, 1)?;
    Ok(vec![NativeValue::BitVector(bv.replicate(count))])
}

/// The declaration and runtime of every native primitive.
pub(super) fn table() -> Vec<(FuncDecl, PrimitiveFn<NativeBackend>)> {
    vec![
        (
            decl("UInt", vec![("x", bits(var("N")))], vec!["N"], integer()),
            uint as PrimitiveFn<NativeBackend>,
        ),
        (
            decl("SInt", vec![("x", bits(var("N")))], vec!["N"], integer()),
            sint,
        ),
        (
            decl("Len", vec![("x", bits(var("N")))], vec!["N"], integer()),
            len,
        ),
        (
            decl("Zeros", vec![("N", integer())], vec![], bits(var("N"))),
            zeros,
        ),
        (
            decl("Ones", vec![("N", integer())], vec![], bits(var("N"))),
            ones,
        ),
        (
            decl(
                "Replicate",
                vec![("x", bits(var("M"))), ("N", integer())],
                vec!["M"],
                bits(Expr::Binop {
                    op: crate::ast::BinOp::Mul,
                    lhs: Box::new(ExprLoc::new(var("M"))),
                    rhs: Box::new(ExprLoc::new(var("N"))),
                }),
            ),
            replicate,
        ),
    ]
}
