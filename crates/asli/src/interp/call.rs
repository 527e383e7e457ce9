//! Subprogram calls.
//!
//! Positional arguments are evaluated left to right in the caller's
//! frame, then named arguments in the callee's declaration order. Every
//! call gets a fresh scope instance from the per-function monotonic
//! counter, so recursive activations never share storage. Results come
//! back as provenance-tagged values bound to the synthetic `return-<i>`
//! identifiers of the callee scope; the caller emits the matching read
//! effects when it consumes them.

use std::rc::Rc;

use crate::{
    ast::{ExprLoc, Pos, SubprogramBody},
    backend::Backend,
    env::{LocalEnv, Scope},
    error::{AslError, AslErrorKind, Interrupt},
    interp::{Control, IResult, Interpreter, ReadFrom, Val, at},
    io::PrintWriter,
    tracer::{RuleTracer, SemanticsRule},
};

impl<B: Backend, T: RuleTracer, P: PrintWriter> Interpreter<'_, B, T, P> {
    /// Calls a subprogram and returns its provenance-tagged results, an
    /// empty list for procedures.
    pub(crate) fn eval_call(
        &mut self,
        pos: Pos,
        name: &str,
        env: &mut LocalEnv<Val<B>>,
        args: &[ExprLoc],
        named_args: &[(String, ExprLoc)],
    ) -> IResult<Vec<ReadFrom<Val<B>>>, B> {
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval_expr(env, arg)?);
        }

        let Some(entry) = self.genv.func(name) else {
            return Err(Interrupt::Fatal(AslError::new(
                pos,
                AslErrorKind::UndefinedIdentifier(name.to_owned()),
            )));
        };
        let decl = Rc::clone(&entry.decl);
        let runtime = entry.runtime;

        // Named arguments are evaluated in the order the callee declares
        // its parameters, not the order the call site lists them.
        let mut named_values = Vec::with_capacity(named_args.len());
        for (parameter, _) in &decl.parameters {
            if let Some((_, arg)) = named_args.iter().find(|(n, _)| n == parameter) {
                named_values.push((parameter.clone(), self.eval_expr(env, arg)?));
            }
        }

        if decl.args.len() != arg_values.len() {
            return Err(Interrupt::Fatal(AslError::new(
                pos,
                AslErrorKind::BadArity {
                    name: name.to_owned(),
                    expected: decl.args.len(),
                    got: arg_values.len(),
                },
            )));
        }

        let instance = self.genv.next_instance(name).expect("entry was just found");
        let scope = Scope::Local {
            subprogram: name.to_owned(),
            instance,
        };

        match runtime {
            Some(primitive) => {
                self.rule(SemanticsRule::CallPrimitive);
                let mut all_values = arg_values;
                all_values.extend(named_values.into_iter().map(|(_, v)| v));
                let results = at(primitive(self.backend, &all_values), pos)?;
                Ok(self.tag_returns(&scope, results, true))
            }
            None => {
                self.rule(SemanticsRule::CallSubprogram);
                let SubprogramBody::Statements(body) = &decl.body else {
                    return Err(Interrupt::Fatal(AslError::new(
                        pos,
                        AslErrorKind::UnrespectedParserInvariant(format!(
                            "the primitive {name} has no backend runtime"
                        )),
                    )));
                };
                let mut callee = LocalEnv::new(scope.clone());
                for ((arg_name, _), value) in decl.args.iter().zip(arg_values) {
                    self.backend.on_write_identifier(arg_name, &scope, &value);
                    callee.declare(arg_name, value);
                }
                for (parameter, value) in named_values {
                    // A parameter that doubles as a positional argument is
                    // already bound.
                    if callee.mem(&parameter) {
                        continue;
                    }
                    self.backend.on_write_identifier(&parameter, &scope, &value);
                    callee.declare(&parameter, value);
                }
                let values = match self.eval_stmt(&mut callee, body)? {
                    Control::Continuing => Vec::new(),
                    Control::Returning(values) => values,
                };
                Ok(self.tag_returns(&scope, values, false))
            }
        }
    }

    /// Wraps call results in their `return-<i>` provenance. Primitive
    /// results have not been written anywhere yet, so the write effects
    /// are emitted here; an ASL body already wrote them in its return
    /// statement.
    fn tag_returns(&mut self, scope: &Scope, values: Vec<Val<B>>, emit_writes: bool) -> Vec<ReadFrom<Val<B>>> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let name = format!("return-{i}");
                if emit_writes {
                    self.backend.on_write_identifier(&name, scope, &value);
                }
                ReadFrom {
                    value,
                    name,
                    scope: scope.clone(),
                }
            })
            .collect()
    }
}
