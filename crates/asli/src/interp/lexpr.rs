//! Assignment-target evaluation.
//!
//! Structured targets are read-modify-write: the current value of the
//! underlying storage is fetched through [`expr_of_lexpr`], updated at the
//! selected slice, element or field, and the whole value is assigned back
//! through the enclosing target. Recursion bottoms out at a variable, a
//! discard, or a destructuring of the incoming value.

use crate::{
    ast::{LExpr, LExprLoc, Pos, expr_of_lexpr},
    backend::Backend,
    env::LocalEnv,
    error::{AslError, AslErrorKind, Interrupt},
    interp::{IResult, Interpreter, Val, at},
    io::PrintWriter,
    run::AslVersion,
    tracer::{RuleTracer, SemanticsRule},
};

impl<B: Backend, T: RuleTracer, P: PrintWriter> Interpreter<'_, B, T, P> {
    /// Assigns an already evaluated value to a left-hand side.
    pub(crate) fn eval_lexpr(&mut self, env: &mut LocalEnv<Val<B>>, le: &LExprLoc, value: Val<B>) -> IResult<(), B> {
        let pos = le.pos;
        match &le.lexpr {
            LExpr::Discard => {
                self.rule(SemanticsRule::Discard);
                Ok(())
            }
            LExpr::Var(name) => self.assign_var(env, pos, name, value),
            LExpr::Slice { base, slices } => {
                self.rule(SemanticsRule::SliceWrite);
                let current = self.eval_expr(env, &expr_of_lexpr(base))?;
                let positions = self.eval_slices(env, slices)?;
                let updated = at(self.backend.write_to_bitvector(&positions, value, current), pos)?;
                self.eval_lexpr(env, base, updated)
            }
            LExpr::SetArray { base, index } => {
                self.rule(SemanticsRule::ArrayWrite);
                let current = self.eval_expr(env, &expr_of_lexpr(base))?;
                let index_v = self.eval_expr(env, index)?;
                let i = self.concrete_index(index, &index_v)?;
                let updated = at(self.backend.set_index(i, value, current), pos)?;
                self.eval_lexpr(env, base, updated)
            }
            LExpr::SetField { base, name } => {
                self.rule(SemanticsRule::FieldWrite);
                let current = self.eval_expr(env, &expr_of_lexpr(base))?;
                let updated = at(self.backend.set_field(name, value, current), pos)?;
                self.eval_lexpr(env, base, updated)
            }
            LExpr::SetFields { base, names, ranges } => {
                self.rule(SemanticsRule::FieldsWrite);
                if names.len() != ranges.len() {
                    return Err(Interrupt::Fatal(AslError::new(
                        pos,
                        AslErrorKind::TypeInferenceNeeded("multi-field assignment bit ranges".to_owned()),
                    )));
                }
                let mut current = self.eval_expr(env, &expr_of_lexpr(base))?;
                for (name, (offset, length)) in names.iter().zip(ranges) {
                    let offset_v = self.v_of_width(*offset);
                    let length_v = self.v_of_width(*length);
                    let part = at(self.backend.read_from_bitvector(&value, &[(offset_v, length_v)]), pos)?;
                    current = at(self.backend.set_field(name, part, current), pos)?;
                }
                self.eval_lexpr(env, base, current)
            }
            LExpr::Destructuring(items) => {
                self.rule(SemanticsRule::Destructuring);
                for (i, item) in items.iter().enumerate() {
                    let element = at(self.backend.get_index(i, &value), pos)?;
                    self.eval_lexpr(env, item, element)?;
                }
                Ok(())
            }
            LExpr::Concat { parts, widths } => {
                self.rule(SemanticsRule::ConcatWrite);
                let Some(widths) = widths else {
                    return Err(Interrupt::Fatal(AslError::new(
                        pos,
                        AslErrorKind::TypeInferenceNeeded("bitvector concatenation widths".to_owned()),
                    )));
                };
                if widths.len() != parts.len() {
                    return Err(Interrupt::Fatal(AslError::new(
                        pos,
                        AslErrorKind::TypeInferenceNeeded("bitvector concatenation widths".to_owned()),
                    )));
                }
                // The last part sits at bit zero; offsets grow right to
                // left.
                let mut offsets = vec![0usize; parts.len()];
                let mut acc = 0usize;
                for i in (0..parts.len()).rev() {
                    offsets[i] = acc;
                    acc += widths[i];
                }
                for ((part, width), offset) in parts.iter().zip(widths).zip(offsets) {
                    let offset_v = self.v_of_width(offset);
                    let length_v = self.v_of_width(*width);
                    let piece = at(self.backend.read_from_bitvector(&value, &[(offset_v, length_v)]), pos)?;
                    self.eval_lexpr(env, part, piece)?;
                }
                Ok(())
            }
        }
    }

    /// Assigns to a plain variable, local storage first. An unknown name
    /// is promoted to a local declaration under the legacy V0 rules and is
    /// an error otherwise.
    pub(crate) fn assign_var(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        pos: Pos,
        name: &str,
        value: Val<B>,
    ) -> IResult<(), B> {
        if env.mem(name) {
            self.rule(SemanticsRule::AssignVar);
            self.backend.on_write_identifier(name, env.scope(), &value);
            env.assign(name, value);
            Ok(())
        } else if self.genv.mem(name) {
            self.rule(SemanticsRule::AssignVar);
            let scope = self.global_scope();
            self.backend.on_write_identifier(name, &scope, &value);
            self.genv.assign(name, value);
            Ok(())
        } else {
            match self.config.version {
                AslVersion::V0 => {
                    self.rule(SemanticsRule::AssignVarV0);
                    self.declare_local(env, name, value);
                    Ok(())
                }
                AslVersion::V1 => Err(Interrupt::Fatal(AslError::new(
                    pos,
                    AslErrorKind::UndefinedIdentifier(name.to_owned()),
                ))),
            }
        }
    }

    /// Distributes call results over a tuple of targets, checking the
    /// arities match first.
    pub(crate) fn protected_multi_assign(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        pos: Pos,
        targets: &[LExprLoc],
        values: Vec<Val<B>>,
    ) -> IResult<(), B> {
        if targets.len() != values.len() {
            return Err(Interrupt::Fatal(AslError::new(
                pos,
                AslErrorKind::BadArity {
                    name: "tuple construction".to_owned(),
                    expected: targets.len(),
                    got: values.len(),
                },
            )));
        }
        self.rule(SemanticsRule::MultiAssign);
        for (target, value) in targets.iter().zip(values) {
            self.eval_lexpr(env, target, value)?;
        }
        Ok(())
    }
}
