//! Operator tables of the native backend.
//!
//! Operand kinds were already checked statically; a kind mismatch here
//! means the program bypassed the type checker and is reported as a fatal
//! operation failure, as are genuinely dynamic failures such as division
//! by zero.

use num_bigint::BigInt;
use num_integer::Integer;
#[cfg(test)]
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::{
    ast::{BinOp, UnOp},
    error::{AslError, AslErrorKind},
    native::value::NativeValue,
};

fn fail(msg: String) -> AslError {
    AslError::no_pos(AslErrorKind::OperationFailed(msg))
}

fn bad_operands(op: BinOp, lhs: &NativeValue, rhs: &NativeValue) -> AslError {
    fail(format!("operator {op} undefined on {} and {}", lhs.kind(), rhs.kind()))
}

/// Applies a strict binary operator to two native values.
pub fn binop(op: BinOp, lhs: NativeValue, rhs: NativeValue) -> Result<NativeValue, AslError> {
    use NativeValue::{BitVector, Bool, Int, Real};
    match op {
        BinOp::Eq => Ok(Bool(lhs == rhs)),
        BinOp::Ne => Ok(Bool(lhs != rhs)),
        BinOp::Le | BinOp::Lt | BinOp::Ge | BinOp::Gt => match (&lhs, &rhs) {
            (Int(a), Int(b)) => Ok(Bool(compare(op, a.cmp(b)))),
            (Real(a), Real(b)) => Ok(Bool(compare(op, a.cmp(b)))),
            _ => Err(bad_operands(op, &lhs, &rhs)),
        },
        BinOp::Add | BinOp::Sub | BinOp::Mul => match (lhs, rhs) {
            (Int(a), Int(b)) => Ok(Int(arith(op, a, b))),
            (Real(a), Real(b)) => Ok(Real(arith(op, a, b))),
            // Bitvector arithmetic wraps at the width.
            (BitVector(a), Int(b)) => match op {
                BinOp::Add => Ok(BitVector(a.wrapping_add(&b))),
                BinOp::Sub => Ok(BitVector(a.wrapping_add(&(-b)))),
                _ => Err(bad_operands(op, &BitVector(a), &Int(b))),
            },
            (BitVector(a), BitVector(b)) => {
                if a.len() != b.len() {
                    return Err(fail(format!(
                        "bitvector width mismatch in {op}: {} vs {}",
                        a.len(),
                        b.len()
                    )));
                }
                let amount = b.to_unsigned();
                match op {
                    BinOp::Add => Ok(BitVector(a.wrapping_add(&amount))),
                    BinOp::Sub => Ok(BitVector(a.wrapping_add(&(-amount)))),
                    _ => Err(bad_operands(op, &BitVector(a), &BitVector(b))),
                }
            }
            (lhs, rhs) => Err(bad_operands(op, &lhs, &rhs)),
        },
        BinOp::Div => match (&lhs, &rhs) {
            (Int(a), Int(b)) => {
                if !b.is_positive() {
                    Err(fail(format!("DIV by the non-positive divisor {b}")))
                } else if !(a % b).is_zero() {
                    Err(fail(format!("DIV of {a} by the non-divisor {b}")))
                } else {
                    Ok(Int(a / b))
                }
            }
            _ => Err(bad_operands(op, &lhs, &rhs)),
        },
        BinOp::DivRm => match (&lhs, &rhs) {
            (Int(a), Int(b)) if b.is_positive() => Ok(Int(a.div_floor(b))),
            (Int(_), Int(b)) => Err(fail(format!("DIVRM by the non-positive divisor {b}"))),
            _ => Err(bad_operands(op, &lhs, &rhs)),
        },
        BinOp::Mod => match (&lhs, &rhs) {
            (Int(a), Int(b)) if b.is_positive() => Ok(Int(a.mod_floor(b))),
            (Int(_), Int(b)) => Err(fail(format!("MOD by the non-positive divisor {b}"))),
            _ => Err(bad_operands(op, &lhs, &rhs)),
        },
        BinOp::Shl | BinOp::Shr => match (&lhs, &rhs) {
            (Int(a), Int(b)) => {
                let Some(shift) = b.to_u64() else {
                    return Err(fail(format!("shift amount {b} out of range")));
                };
                let shift = usize::try_from(shift).map_err(|_| fail(format!("shift amount {b} out of range")))?;
                if op == BinOp::Shl {
                    Ok(Int(a << shift))
                } else {
                    Ok(Int(a.div_floor(&(BigInt::from(1) << shift))))
                }
            }
            _ => Err(bad_operands(op, &lhs, &rhs)),
        },
        BinOp::Pow => match (&lhs, &rhs) {
            (Int(a), Int(b)) => {
                let Some(exp) = b.to_u32() else {
                    return Err(fail(format!("exponent {b} out of range")));
                };
                Ok(Int(a.pow(exp)))
            }
            (Real(a), Int(b)) => {
                let Some(exp) = b.to_i32() else {
                    return Err(fail(format!("exponent {b} out of range")));
                };
                if a.is_zero() && exp < 0 {
                    return Err(fail("zero raised to a negative power".to_owned()));
                }
                Ok(Real(a.pow(exp)))
            }
            _ => Err(bad_operands(op, &lhs, &rhs)),
        },
        BinOp::RDiv => match (&lhs, &rhs) {
            (Real(a), Real(b)) => {
                if b.is_zero() {
                    Err(fail("real division by zero".to_owned()))
                } else {
                    Ok(Real(a / b))
                }
            }
            _ => Err(bad_operands(op, &lhs, &rhs)),
        },
        // Strict boolean connectives; the evaluator desugars the
        // short-circuit forms before they reach the backend.
        BinOp::BoolAnd => bool_op(op, lhs, rhs, |a, b| a && b),
        BinOp::BoolOr => bool_op(op, lhs, rhs, |a, b| a || b),
        BinOp::BoolImpl => bool_op(op, lhs, rhs, |a, b| !a || b),
        BinOp::BoolEquiv => bool_op(op, lhs, rhs, |a, b| a == b),
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => match (&lhs, &rhs) {
            (BitVector(a), BitVector(b)) => {
                let result = match op {
                    BinOp::BitAnd => a.and(b),
                    BinOp::BitOr => a.or(b),
                    _ => a.xor(b),
                }?;
                Ok(BitVector(result))
            }
            _ => Err(bad_operands(op, &lhs, &rhs)),
        },
    }
}

/// Applies a unary operator to a native value.
pub fn unop(op: UnOp, v: NativeValue) -> Result<NativeValue, AslError> {
    match (op, v) {
        (UnOp::Neg, NativeValue::Int(i)) => Ok(NativeValue::Int(-i)),
        (UnOp::Neg, NativeValue::Real(r)) => Ok(NativeValue::Real(-r)),
        (UnOp::BoolNot, NativeValue::Bool(b)) => Ok(NativeValue::Bool(!b)),
        (UnOp::BitNot, NativeValue::BitVector(bv)) => Ok(NativeValue::BitVector(bv.not())),
        (op, v) => Err(fail(format!("operator {op} undefined on {}", v.kind()))),
    }
}

fn compare(op: BinOp, ordering: std::cmp::Ordering) -> bool {
    match op {
        BinOp::Le => ordering.is_le(),
        BinOp::Lt => ordering.is_lt(),
        BinOp::Ge => ordering.is_ge(),
        _ => ordering.is_gt(),
    }
}

fn arith<T>(op: BinOp, a: T, b: T) -> T
where
    T: std::ops::Add<Output = T> + std::ops::Sub<Output = T> + std::ops::Mul<Output = T>,
{
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        _ => a * b,
    }
}

fn bool_op(
    op: BinOp,
    lhs: NativeValue,
    rhs: NativeValue,
    f: impl Fn(bool, bool) -> bool,
) -> Result<NativeValue, AslError> {
    match (&lhs, &rhs) {
        (NativeValue::Bool(a), NativeValue::Bool(b)) => Ok(NativeValue::Bool(f(*a, *b))),
        _ => Err(bad_operands(op, &lhs, &rhs)),
    }
}
