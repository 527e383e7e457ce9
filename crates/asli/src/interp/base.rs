//! Base values and runtime type checks.
//!
//! A type's *base value* is its canonical default inhabitant, used when a
//! typed declaration carries no initialiser and as the concrete fallback
//! for `UNKNOWN`. Both operations evaluate embedded expressions (widths,
//! constraints, array lengths) side-effect-free and are therefore
//! fatal-only: no ASL exception can escape them.

use num_rational::BigRational;
use num_traits::Zero;

use crate::{
    ast::{ArrayLength, Constraint, IntConstraint, Literal, Ty},
    backend::Backend,
    bitvector::Bitvector,
    env::LocalEnv,
    error::{AslError, AslErrorKind},
    interp::{Interpreter, Val},
    io::PrintWriter,
    tracer::{RuleTracer, SemanticsRule},
};

impl<B: Backend, T: RuleTracer, P: PrintWriter> Interpreter<'_, B, T, P> {
    /// Computes the base value of a type.
    pub(crate) fn base_value(&mut self, env: &mut LocalEnv<Val<B>>, ty: &Ty) -> Result<Val<B>, AslError> {
        self.rule(SemanticsRule::BaseValue);
        let resolved = self.genv.static_env.structure(ty)?;
        match &resolved {
            Ty::Bool => Ok(self.backend.v_of_literal(&Literal::Bool(false))),
            Ty::Real => Ok(self.backend.v_of_literal(&Literal::Real(BigRational::zero()))),
            Ty::String => Ok(self.backend.v_of_literal(&Literal::String(String::new()))),
            Ty::Int(IntConstraint::Unconstrained) => Ok(self.backend.v_of_int(0)),
            Ty::Int(IntConstraint::WellConstrained(constraints)) => {
                self.constrained_base_value(env, &resolved, constraints)
            }
            Ty::Int(IntConstraint::Parameterized) => Err(AslError::no_pos(
                AslErrorKind::UnrespectedParserInvariant(
                    "base value requested for a parameterized integer".to_owned(),
                ),
            )),
            Ty::Bits(width) => {
                let width_v = self.eval_expr_sef(env, width)?;
                let n = self
                    .backend
                    .v_to_int(&width_v)
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| AslError::new(width.pos, AslErrorKind::UnsupportedExpr(width.to_string())))?;
                Ok(self.backend.v_of_literal(&Literal::BitVector(Bitvector::zeros(n))))
            }
            Ty::Enum(labels) => {
                let first = labels.first().ok_or_else(|| {
                    AslError::no_pos(AslErrorKind::UnrespectedParserInvariant(
                        "empty enumeration".to_owned(),
                    ))
                })?;
                let lit = self.genv.constant(first).cloned().ok_or_else(|| {
                    AslError::no_pos(AslErrorKind::TypeInferenceNeeded(format!(
                        "value of the enumeration label {first}"
                    )))
                })?;
                Ok(self.backend.v_of_literal(&lit))
            }
            Ty::Record(fields) | Ty::Exception(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for (name, field_ty) in fields {
                    values.push((name.clone(), self.base_value(env, field_ty)?));
                }
                self.backend.create_record(values)
            }
            Ty::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.base_value(env, item)?);
                }
                self.backend.create_vector(values)
            }
            Ty::Array { length, element } => {
                let n = match length {
                    ArrayLength::Enum(_, n) => *n,
                    ArrayLength::Expr(e) => {
                        let v = self.eval_expr_sef(env, e)?;
                        self.backend
                            .v_to_int(&v)
                            .and_then(|i| usize::try_from(i).ok())
                            .ok_or_else(|| AslError::new(e.pos, AslErrorKind::UnsupportedExpr(e.to_string())))?
                    }
                };
                let element_base = self.base_value(env, element)?;
                self.backend.create_vector(vec![element_base; n])
            }
            Ty::Named(_) => unreachable!("structure resolution removes named types"),
        }
    }

    /// The base value of a well-constrained integer is the constraint
    /// value with minimum absolute value, ties broken by declaration
    /// order. A range straddling zero contributes zero; an empty range
    /// contributes nothing.
    fn constrained_base_value(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        ty: &Ty,
        constraints: &[Constraint],
    ) -> Result<Val<B>, AslError> {
        if constraints.is_empty() {
            return Err(AslError::no_pos(AslErrorKind::UnrespectedParserInvariant(
                "well-constrained integer with no constraints".to_owned(),
            )));
        }
        let mut best: Option<i64> = None;
        for constraint in constraints {
            let candidate = match constraint {
                Constraint::Exact(e) => {
                    let v = self.eval_expr_sef(env, e)?;
                    let i = self
                        .backend
                        .v_to_int(&v)
                        .ok_or_else(|| AslError::new(e.pos, AslErrorKind::UnsupportedExpr(e.to_string())))?;
                    Some(i)
                }
                Constraint::Range(lo, hi) => {
                    let lo_v = self.eval_expr_sef(env, lo)?;
                    let hi_v = self.eval_expr_sef(env, hi)?;
                    let lo_i = self
                        .backend
                        .v_to_int(&lo_v)
                        .ok_or_else(|| AslError::new(lo.pos, AslErrorKind::UnsupportedExpr(lo.to_string())))?;
                    let hi_i = self
                        .backend
                        .v_to_int(&hi_v)
                        .ok_or_else(|| AslError::new(hi.pos, AslErrorKind::UnsupportedExpr(hi.to_string())))?;
                    if lo_i > hi_i {
                        None
                    } else if lo_i <= 0 && 0 <= hi_i {
                        Some(0)
                    } else if hi_i < 0 {
                        Some(hi_i)
                    } else {
                        Some(lo_i)
                    }
                }
            };
            if let Some(candidate) = candidate {
                best = Some(match best {
                    None => candidate,
                    Some(current) if candidate.unsigned_abs() < current.unsigned_abs() => candidate,
                    Some(current) => current,
                });
            }
        }
        match best {
            Some(value) => Ok(self.backend.v_of_int(value)),
            None => Err(AslError::no_pos(AslErrorKind::BaseValueEmptyType(ty.to_string()))),
        }
    }

    /// The runtime type check behind `AS`: a boolean backend value.
    ///
    /// Only the type shapes the checker leaves for runtime validation are
    /// supported; anything else here means elaboration fell short.
    pub(crate) fn is_val_of_type(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        v: &Val<B>,
        ty: &Ty,
    ) -> Result<Val<B>, AslError> {
        use crate::ast::BinOp;

        self.rule(SemanticsRule::TypeCheckValue);
        match ty {
            Ty::Int(IntConstraint::Unconstrained) => Ok(self.backend.v_of_literal(&Literal::Bool(true))),
            Ty::Int(IntConstraint::Parameterized) => Err(AslError::no_pos(
                AslErrorKind::UnrespectedParserInvariant(
                    "runtime type check against a parameterized integer".to_owned(),
                ),
            )),
            Ty::Bits(width) => {
                let expected = self.eval_expr_sef(env, width)?;
                let actual = self.backend.bitvector_length(v)?;
                self.backend.binop(BinOp::Eq, actual, expected)
            }
            Ty::Int(IntConstraint::WellConstrained(constraints)) => {
                let mut acc: Option<Val<B>> = None;
                for constraint in constraints {
                    let holds = match constraint {
                        Constraint::Exact(e) => {
                            let rhs = self.eval_expr_sef(env, e)?;
                            self.backend.binop(BinOp::Eq, v.clone(), rhs)?
                        }
                        Constraint::Range(lo, hi) => {
                            let lo_v = self.eval_expr_sef(env, lo)?;
                            let hi_v = self.eval_expr_sef(env, hi)?;
                            let ge = self.backend.binop(BinOp::Ge, v.clone(), lo_v)?;
                            let le = self.backend.binop(BinOp::Le, v.clone(), hi_v)?;
                            self.backend.binop(BinOp::BoolAnd, ge, le)?
                        }
                    };
                    acc = Some(match acc {
                        None => holds,
                        Some(prev) => self.backend.binop(BinOp::BoolOr, prev, holds)?,
                    });
                }
                match acc {
                    Some(result) => Ok(result),
                    None => Ok(self.backend.v_of_literal(&Literal::Bool(false))),
                }
            }
            _ => Err(AslError::no_pos(AslErrorKind::TypeInferenceNeeded(format!(
                "runtime type check against {ty}"
            )))),
        }
    }
}
