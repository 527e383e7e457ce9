//! The big-step semantic evaluator.
//!
//! One [`Interpreter`] value drives a whole run: it owns the global
//! environment and borrows the backend, the rule tracer and the print
//! writer. Evaluation is split by syntactic class, one module per class,
//! all implemented as inherent methods on [`Interpreter`]:
//!
//! - `expr`: expressions and the side-effect-free wrapper
//! - `lexpr`: assignment targets
//! - `pattern`: `IN` patterns and case selectors
//! - `stmt`: statements, loops and try/catch
//! - `call`: subprogram calls and primitive dispatch
//! - `base`: base values and runtime type checks
//!
//! Local frames are passed as explicit `&mut LocalEnv` parameters; the
//! global environment is updated in place, so callers observe callee
//! updates as soon as the call returns.

mod base;
mod call;
mod expr;
mod lexpr;
mod pattern;
mod stmt;

use crate::{
    ast::{Pos, StmtLoc},
    backend::Backend,
    env::{GlobalEnv, LocalEnv, Scope},
    error::{AslError, AslErrorKind, Interrupt},
    io::PrintWriter,
    run::Config,
    tracer::{RuleTracer, SemanticsRule},
    types::StaticEnv,
};

/// The backend's value type.
pub(crate) type Val<B> = <B as Backend>::Value;

/// Evaluation result: a normal value, a propagating ASL exception, or a
/// fatal error.
pub(crate) type IResult<T, B> = Result<T, Interrupt<Val<B>>>;

/// Converts a fatal-only result into the evaluation result, attaching a
/// position to errors that lack one.
pub(crate) fn at<T, V>(result: Result<T, AslError>, pos: Pos) -> Result<T, Interrupt<V>> {
    result.map_err(|err| Interrupt::Fatal(err.at(pos)))
}

/// How a statement finished.
#[derive(Debug)]
pub(crate) enum Control<V> {
    /// Fall through to the next statement.
    Continuing,
    /// The enclosing subprogram returned with these values.
    Returning(Vec<V>),
}

/// Provenance of a value read back from an identifier, carried so the
/// consumer can emit the read effect at binding time.
#[derive(Debug, Clone)]
pub(crate) struct ReadFrom<V> {
    pub value: V,
    pub name: String,
    pub scope: Scope,
}

/// The evaluator state for one run.
pub(crate) struct Interpreter<'a, B: Backend, T: RuleTracer, P: PrintWriter> {
    pub backend: &'a mut B,
    pub genv: GlobalEnv<B>,
    pub tracer: &'a mut T,
    pub print: &'a mut P,
    pub config: &'a Config,
    /// True while the global environment is being built; read and write
    /// effects on globals are tagged with it.
    pub in_initialiser: bool,
}

impl<'a, B: Backend, T: RuleTracer, P: PrintWriter> Interpreter<'a, B, T, P> {
    pub fn new(
        backend: &'a mut B,
        static_env: StaticEnv,
        config: &'a Config,
        print: &'a mut P,
        tracer: &'a mut T,
    ) -> Self {
        Self {
            backend,
            genv: GlobalEnv::new(static_env),
            tracer,
            print,
            config,
            in_initialiser: true,
        }
    }

    #[inline]
    pub(crate) fn rule(&mut self, rule: SemanticsRule) {
        self.tracer.on_rule(rule);
    }

    /// The scope tag for global storage traffic.
    pub(crate) fn global_scope(&self) -> Scope {
        Scope::Global {
            init: self.in_initialiser,
        }
    }

    /// Resolves an identifier, local storage first, and emits the read
    /// effect.
    pub(crate) fn read_var(&mut self, env: &LocalEnv<Val<B>>, pos: Pos, name: &str) -> IResult<Val<B>, B> {
        match crate::env::find(env, &self.genv, name) {
            crate::env::Lookup::Local(v) => {
                self.rule(SemanticsRule::VarLocal);
                self.backend.on_read_identifier(name, env.scope(), &v);
                Ok(v)
            }
            crate::env::Lookup::Global(v) => {
                self.rule(SemanticsRule::VarGlobal);
                let scope = self.global_scope();
                self.backend.on_read_identifier(name, &scope, &v);
                Ok(v)
            }
            crate::env::Lookup::NotFound => Err(Interrupt::Fatal(AslError::new(
                pos,
                AslErrorKind::UndefinedIdentifier(name.to_owned()),
            ))),
        }
    }

    /// Consumes a provenance-tagged value, emitting its read effect.
    pub(crate) fn read_value_from(&mut self, read: ReadFrom<Val<B>>) -> Val<B> {
        self.backend.on_read_identifier(&read.name, &read.scope, &read.value);
        read.value
    }

    /// Declares a local identifier, emitting the write effect.
    pub(crate) fn declare_local(&mut self, env: &mut LocalEnv<Val<B>>, name: &str, value: Val<B>) {
        self.backend.on_write_identifier(name, env.scope(), &value);
        env.declare(name, value);
    }

    /// Reports an evaluation warning through the backend, handing it the
    /// run's print writer.
    pub(crate) fn warn(&mut self, msg: &str) {
        self.backend.warn(&mut *self.print, msg);
    }

    /// Materialises a boolean into a branch decision and records the
    /// commitment.
    pub(crate) fn eval_choice(&mut self, pos: Pos, label: &'static str, cond: Val<B>) -> IResult<bool, B> {
        let taken = at(self.backend.choice(&cond), pos)?;
        self.backend.commit(label, taken);
        Ok(taken)
    }

    /// Runs a statement inside a fresh lexical block. Block-local
    /// declarations are dropped on every exit path; global updates made
    /// inside the block survive.
    pub(crate) fn eval_block(&mut self, env: &mut LocalEnv<Val<B>>, stmt: &StmtLoc) -> IResult<Control<Val<B>>, B> {
        env.push_scope();
        let result = self.eval_stmt(env, stmt);
        env.pop_scope();
        result
    }

    /// An integer value from a width or offset annotation.
    pub(crate) fn v_of_width(&mut self, n: usize) -> Val<B> {
        let n = i64::try_from(n).expect("width fits in an i64");
        self.backend.v_of_int(n)
    }
}
