//! Expression evaluation.
//!
//! Sub-expressions are evaluated strictly left to right, so the backend
//! observes reads in source order. Exceptions raised inside an expression
//! propagate like any other interrupt; the side-effect-free wrapper
//! [`Interpreter::eval_expr_sef`] turns them into fatal errors for the
//! contexts the language requires to be pure.

use crate::{
    ast::{self, BinOp, Expr, ExprLoc, Literal, Pos, Slice},
    backend::Backend,
    env::LocalEnv,
    error::{AslError, AslErrorKind, Interrupt},
    interp::{Interpreter, IResult, Val, at},
    io::PrintWriter,
    tracer::{RuleTracer, SemanticsRule},
};

impl<B: Backend, T: RuleTracer, P: PrintWriter> Interpreter<'_, B, T, P> {
    /// Evaluates an expression to a backend value.
    pub(crate) fn eval_expr(&mut self, env: &mut LocalEnv<Val<B>>, e: &ExprLoc) -> IResult<Val<B>, B> {
        let pos = e.pos;
        match &e.expr {
            Expr::Literal(lit) => {
                self.rule(SemanticsRule::Literal);
                Ok(self.backend.v_of_literal(lit))
            }
            Expr::Var(name) => self.read_var(env, pos, name),
            Expr::Binop { op, lhs, rhs } if op.is_short_circuit() => {
                self.eval_short_circuit(env, pos, *op, lhs, rhs)
            }
            Expr::Binop { op, lhs, rhs } => {
                self.rule(SemanticsRule::Binop);
                let lhs = self.eval_expr(env, lhs)?;
                let rhs = self.eval_expr(env, rhs)?;
                at(self.backend.binop(*op, lhs, rhs), pos)
            }
            Expr::Unop { op, operand } => {
                self.rule(SemanticsRule::Unop);
                let v = self.eval_expr(env, operand)?;
                at(self.backend.unop(*op, v), pos)
            }
            Expr::Cond {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_v = self.eval_expr(env, cond)?;
                if ast::is_simple_expr(then_branch) && ast::is_simple_expr(else_branch) {
                    // Both branches are effect-free, so both can be
                    // evaluated eagerly and selected by the backend.
                    self.rule(SemanticsRule::CondSimple);
                    let v_true = self.eval_expr(env, then_branch)?;
                    let v_false = self.eval_expr(env, else_branch)?;
                    at(self.backend.ternary(cond_v, v_true, v_false), pos)
                } else {
                    self.rule(SemanticsRule::Cond);
                    let taken = self.eval_choice(pos, "if-expression", cond_v)?;
                    self.eval_expr(env, if taken { then_branch } else { else_branch })
                }
            }
            Expr::Slice { base, slices } => {
                self.rule(SemanticsRule::SliceRead);
                let v = self.eval_expr(env, base)?;
                let positions = self.eval_slices(env, slices)?;
                at(self.backend.read_from_bitvector(&v, &positions), pos)
            }
            Expr::Call { name, args, named_args } => {
                self.rule(SemanticsRule::Call);
                let mut returns = self.eval_call(pos, name, env, args, named_args)?;
                if returns.len() == 1 {
                    let read = returns.pop().expect("length checked");
                    Ok(self.read_value_from(read))
                } else {
                    let values = returns.into_iter().map(|read| self.read_value_from(read)).collect();
                    at(self.backend.create_vector(values), pos)
                }
            }
            Expr::GetArray { base, index } => {
                self.rule(SemanticsRule::ArrayRead);
                let v = self.eval_expr(env, base)?;
                let index_v = self.eval_expr(env, index)?;
                let i = self.concrete_index(index, &index_v)?;
                at(self.backend.get_index(i, &v), pos)
            }
            Expr::GetItem { base, index } => {
                self.rule(SemanticsRule::TupleRead);
                let v = self.eval_expr(env, base)?;
                at(self.backend.get_index(*index, &v), pos)
            }
            Expr::Record { fields, .. } => {
                self.rule(SemanticsRule::RecordLit);
                let mut values = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    values.push((name.clone(), self.eval_expr(env, field)?));
                }
                at(self.backend.create_record(values), pos)
            }
            Expr::GetField { base, name } => {
                self.rule(SemanticsRule::FieldRead);
                let v = self.eval_expr(env, base)?;
                at(self.backend.get_field(name, &v), pos)
            }
            Expr::GetFields { base, names } => {
                self.rule(SemanticsRule::FieldsRead);
                let v = self.eval_expr(env, base)?;
                let mut parts = Vec::with_capacity(names.len());
                for name in names {
                    parts.push(at(self.backend.get_field(name, &v), pos)?);
                }
                at(self.backend.concat_bitvectors(parts), pos)
            }
            Expr::Concat(items) => {
                self.rule(SemanticsRule::BitvectorConcat);
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.eval_expr(env, item)?);
                }
                at(self.backend.concat_bitvectors(parts), pos)
            }
            Expr::Tuple(items) => {
                self.rule(SemanticsRule::TupleLit);
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(env, item)?);
                }
                at(self.backend.create_vector(values), pos)
            }
            Expr::Unknown(ty) => {
                self.rule(SemanticsRule::UnknownValue);
                let base = at(self.base_value(env, ty), pos)?;
                at(self.backend.v_unknown_of_type(ty, base), pos)
            }
            Expr::Pattern { expr, pattern } => {
                self.rule(SemanticsRule::PatternTest);
                let v = self.eval_expr(env, expr)?;
                self.eval_pattern(env, pos, &v, pattern)
            }
            Expr::AsType { expr, ty } => {
                self.rule(SemanticsRule::TypeAssertion);
                let v = self.eval_expr(env, expr)?;
                let check = at(self.is_val_of_type(env, &v, ty), pos)?;
                let holds = at(self.backend.choice(&check), pos)?;
                if holds {
                    Ok(v)
                } else {
                    Err(Interrupt::Fatal(AslError::new(
                        pos,
                        AslErrorKind::MismatchType {
                            value: self.backend.debug_value(&v),
                            expected: ty.to_string(),
                        },
                    )))
                }
            }
        }
    }

    /// The short-circuit connectives, desugared to conditionals: the right
    /// operand is only evaluated when the left one does not decide the
    /// result.
    fn eval_short_circuit(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        pos: Pos,
        op: BinOp,
        lhs: &ExprLoc,
        rhs: &ExprLoc,
    ) -> IResult<Val<B>, B> {
        self.rule(match op {
            BinOp::BoolAnd => SemanticsRule::BinopAnd,
            BinOp::BoolOr => SemanticsRule::BinopOr,
            _ => SemanticsRule::BinopImpl,
        });
        let lhs_v = self.eval_expr(env, lhs)?;
        let taken = self.eval_choice(pos, "short-circuit", lhs_v)?;
        match (op, taken) {
            (BinOp::BoolAnd | BinOp::BoolImpl, true) | (BinOp::BoolOr, false) => self.eval_expr(env, rhs),
            (BinOp::BoolAnd, false) => Ok(self.backend.v_of_literal(&Literal::Bool(false))),
            (BinOp::BoolOr | BinOp::BoolImpl, _) => Ok(self.backend.v_of_literal(&Literal::Bool(true))),
            _ => unreachable!("only short-circuit operators reach here"),
        }
    }

    /// Side-effect-free evaluation: any throw is a fatal error. Required
    /// for pattern operands, constraints, loop bounds, `UNKNOWN` widths,
    /// base values, `AS` checks and `print` arguments.
    pub(crate) fn eval_expr_sef(&mut self, env: &mut LocalEnv<Val<B>>, e: &ExprLoc) -> Result<Val<B>, AslError> {
        match self.eval_expr(env, e) {
            Ok(v) => Ok(v),
            Err(Interrupt::Fatal(err)) => Err(err),
            Err(Interrupt::Raise(_)) => Err(AslError::new(
                e.pos,
                AslErrorKind::UnexpectedSideEffect(format!("exception thrown while evaluating {e}")),
            )),
        }
    }

    /// Evaluates slice selectors to `(offset, length)` pairs of backend
    /// values, offsets counted from the least significant bit.
    pub(crate) fn eval_slices(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        slices: &[Slice],
    ) -> IResult<Vec<(Val<B>, Val<B>)>, B> {
        let mut positions = Vec::with_capacity(slices.len());
        for slice in slices {
            let pair = match slice {
                Slice::Single(offset) => {
                    let offset_v = self.eval_expr(env, offset)?;
                    let one = self.backend.v_of_int(1);
                    (offset_v, one)
                }
                Slice::Range(hi, lo) => {
                    let hi_v = self.eval_expr(env, hi)?;
                    let lo_v = self.eval_expr(env, lo)?;
                    let one = self.backend.v_of_int(1);
                    let diff = at(self.backend.binop(BinOp::Sub, hi_v, lo_v.clone()), hi.pos)?;
                    let length = at(self.backend.binop(BinOp::Add, diff, one), hi.pos)?;
                    (lo_v, length)
                }
                Slice::Length(start, length) => {
                    let start_v = self.eval_expr(env, start)?;
                    let length_v = self.eval_expr(env, length)?;
                    (start_v, length_v)
                }
                Slice::Scaled(factor, length) => {
                    let factor_v = self.eval_expr(env, factor)?;
                    let length_v = self.eval_expr(env, length)?;
                    let offset = at(self.backend.binop(BinOp::Mul, factor_v, length_v.clone()), factor.pos)?;
                    (offset, length_v)
                }
            };
            positions.push(pair);
        }
        Ok(positions)
    }

    /// Forces an index value to a concrete natural number.
    pub(crate) fn concrete_index(&self, index: &ExprLoc, v: &Val<B>) -> IResult<usize, B> {
        self.backend
            .v_to_int(v)
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| {
                Interrupt::Fatal(AslError::new(
                    index.pos,
                    AslErrorKind::UnsupportedExpr(index.to_string()),
                ))
            })
    }
}
