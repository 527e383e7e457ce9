//! Pattern evaluation.
//!
//! Patterns evaluate to a boolean backend value, never to a branch
//! decision: the enclosing construct (an `IN` expression or a case arm)
//! decides what to do with the result. Expression operands inside
//! patterns are required to be side-effect-free.

use crate::{
    ast::{BinOp, Literal, Pattern, Pos, UnOp},
    backend::Backend,
    bitvector::Bitvector,
    env::LocalEnv,
    error::{AslError, AslErrorKind, Interrupt},
    interp::{IResult, Interpreter, Val, at},
    io::PrintWriter,
    tracer::{RuleTracer, SemanticsRule},
};

impl<B: Backend, T: RuleTracer, P: PrintWriter> Interpreter<'_, B, T, P> {
    /// Evaluates `v IN pattern` to a boolean backend value.
    pub(crate) fn eval_pattern(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        pos: Pos,
        v: &Val<B>,
        pattern: &Pattern,
    ) -> IResult<Val<B>, B> {
        match pattern {
            Pattern::All => {
                self.rule(SemanticsRule::PatternAll);
                Ok(self.backend.v_of_literal(&Literal::Bool(true)))
            }
            Pattern::Any(patterns) => {
                self.rule(SemanticsRule::PatternAny);
                let mut acc: Option<Val<B>> = None;
                for sub in patterns {
                    let matched = self.eval_pattern(env, pos, v, sub)?;
                    acc = Some(match acc {
                        None => matched,
                        Some(prev) => at(self.backend.binop(BinOp::BoolOr, prev, matched), pos)?,
                    });
                }
                match acc {
                    Some(result) => Ok(result),
                    None => Ok(self.backend.v_of_literal(&Literal::Bool(false))),
                }
            }
            Pattern::Not(sub) => {
                self.rule(SemanticsRule::PatternNot);
                let matched = self.eval_pattern(env, pos, v, sub)?;
                at(self.backend.unop(UnOp::BoolNot, matched), pos)
            }
            Pattern::Single(e) => {
                self.rule(SemanticsRule::PatternSingle);
                let rhs = self.eval_expr_sef(env, e)?;
                at(self.backend.binop(BinOp::Eq, v.clone(), rhs), pos)
            }
            Pattern::Geq(e) => {
                self.rule(SemanticsRule::PatternGeq);
                let rhs = self.eval_expr_sef(env, e)?;
                at(self.backend.binop(BinOp::Ge, v.clone(), rhs), pos)
            }
            Pattern::Leq(e) => {
                self.rule(SemanticsRule::PatternLeq);
                let rhs = self.eval_expr_sef(env, e)?;
                at(self.backend.binop(BinOp::Le, v.clone(), rhs), pos)
            }
            Pattern::Range(lo, hi) => {
                self.rule(SemanticsRule::PatternRange);
                let lo_v = self.eval_expr_sef(env, lo)?;
                let hi_v = self.eval_expr_sef(env, hi)?;
                let ge = at(self.backend.binop(BinOp::Ge, v.clone(), lo_v), pos)?;
                let le = at(self.backend.binop(BinOp::Le, v.clone(), hi_v), pos)?;
                at(self.backend.binop(BinOp::BoolAnd, ge, le), pos)
            }
            Pattern::Mask(mask) => self.eval_mask(pos, v, mask),
            Pattern::Tuple(patterns) => {
                self.rule(SemanticsRule::PatternTuple);
                let mut acc: Option<Val<B>> = None;
                for (i, sub) in patterns.iter().enumerate() {
                    let element = at(self.backend.get_index(i, v), pos)?;
                    let matched = self.eval_pattern(env, pos, &element, sub)?;
                    acc = Some(match acc {
                        None => matched,
                        Some(prev) => at(self.backend.binop(BinOp::BoolAnd, prev, matched), pos)?,
                    });
                }
                match acc {
                    Some(result) => Ok(result),
                    None => Ok(self.backend.v_of_literal(&Literal::Bool(true))),
                }
            }
        }
    }

    /// Mask matching: with `set` the mask's one bits and `unset` its zero
    /// bits, the value matches when `(v AND set) OR (NOT v AND unset)`
    /// equals the specified bits `set OR unset`.
    fn eval_mask(&mut self, pos: Pos, v: &Val<B>, mask: &str) -> IResult<Val<B>, B> {
        self.rule(SemanticsRule::PatternMask);
        let mut set = String::with_capacity(mask.len());
        let mut unset = String::with_capacity(mask.len());
        for c in mask.chars() {
            match c {
                '1' => {
                    set.push('1');
                    unset.push('0');
                }
                '0' => {
                    set.push('0');
                    unset.push('1');
                }
                'x' | 'X' => {
                    set.push('0');
                    unset.push('0');
                }
                ' ' | '_' => {}
                other => {
                    return Err(Interrupt::Fatal(AslError::new(
                        pos,
                        AslErrorKind::UnrespectedParserInvariant(format!(
                            "invalid character {other:?} in the mask {mask:?}"
                        )),
                    )));
                }
            }
        }
        let set_bv = Bitvector::from_bit_str(&set).expect("built from 0 and 1");
        let unset_bv = Bitvector::from_bit_str(&unset).expect("built from 0 and 1");
        let specified = at(set_bv.or(&unset_bv), pos)?;

        let set_v = self.backend.v_of_literal(&Literal::BitVector(set_bv));
        let unset_v = self.backend.v_of_literal(&Literal::BitVector(unset_bv));
        let specified_v = self.backend.v_of_literal(&Literal::BitVector(specified));

        let v_and_set = at(self.backend.binop(BinOp::BitAnd, v.clone(), set_v), pos)?;
        let not_v = at(self.backend.unop(UnOp::BitNot, v.clone()), pos)?;
        let not_v_and_unset = at(self.backend.binop(BinOp::BitAnd, not_v, unset_v), pos)?;
        let selected = at(self.backend.binop(BinOp::BitOr, v_and_set, not_v_and_unset), pos)?;
        at(self.backend.binop(BinOp::Eq, selected, specified_v), pos)
    }
}
