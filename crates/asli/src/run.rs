//! Public interface for running a type-checked ASL program.
//!
//! The driver builds the global environment from the program's
//! declarations in dependency order, prepending the backend's primitive
//! library and applying any host-provided seeds, then invokes the entry
//! subprogram and hands back its single return value.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{
    ast::{Decl, GlobalDecl, Pos, Program, Ty, used_identifiers, used_identifiers_ty},
    backend::Backend,
    env::{IdMap, LocalEnv, Scope},
    error::{AslError, AslErrorKind, Interrupt, Thrown},
    interp::Interpreter,
    io::{PrintWriter, StdPrint},
    tracer::{NoopTracer, RuleTracer, SemanticsRule},
    types::StaticEnv,
};

/// The language version the program was written against.
///
/// V0 programs may assign to an undeclared local, which promotes the
/// first assignment to a declaration; V1 makes that an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AslVersion {
    V0,
    #[default]
    V1,
}

/// Evaluation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Iteration budget for loops whose condition is undetermined. Must
    /// be positive.
    pub unroll: usize,
    pub version: AslVersion,
    /// Name of the entry subprogram.
    pub entry_point: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unroll: 3,
            version: AslVersion::default(),
            entry_point: "main".to_owned(),
        }
    }
}

/// Runs a program on the given backend with default output and no
/// tracing.
///
/// # Example
/// ```
/// use asli::ast::*;
/// use asli::{Backend, Config, NativeBackend, run};
///
/// let body = StmtLoc::new(Stmt::Return(Some(ExprLoc::new(Expr::Literal(Literal::Int(
///     1.into(),
/// ))))));
/// let main = FuncDecl {
///     name: "main".to_owned(),
///     args: vec![],
///     parameters: vec![],
///     return_type: Some(Ty::Int(IntConstraint::Unconstrained)),
///     body: SubprogramBody::Statements(body),
/// };
/// let program = Program {
///     decls: vec![Decl::Func(main)],
/// };
///
/// let mut backend = NativeBackend::new();
/// let result = run(&program, &mut backend, &Config::default()).unwrap();
/// assert_eq!(backend.debug_value(&result), "1");
/// ```
pub fn run<B: Backend>(program: &Program, backend: &mut B, config: &Config) -> Result<B::Value, AslError> {
    run_with(program, backend, config, Vec::new(), &mut StdPrint, &mut NoopTracer)
}

/// Runs a program with explicit output, tracing and global seeds.
///
/// Seeds are applied before the program's own global declarations; a
/// declared global whose name was seeded keeps the seeded value and its
/// initialiser is not evaluated.
///
/// # Panics
/// Panics when `config.unroll` is zero.
pub fn run_with<B: Backend, T: RuleTracer, P: PrintWriter>(
    program: &Program,
    backend: &mut B,
    config: &Config,
    seeds: Vec<(String, B::Value)>,
    print: &mut P,
    tracer: &mut T,
) -> Result<B::Value, AslError> {
    assert!(config.unroll > 0, "the unroll budget must be positive");
    let mut interp = Interpreter::new(backend, StaticEnv::default(), config, print, tracer);
    interp.apply_seeds(seeds);
    interp.build_globals(program)?;
    interp.in_initialiser = false;
    interp.call_entry()
}

impl<B: Backend, T: RuleTracer, P: PrintWriter> Interpreter<'_, B, T, P> {
    /// Installs host-provided global values before any declaration runs.
    fn apply_seeds(&mut self, seeds: Vec<(String, B::Value)>) {
        for (name, value) in seeds {
            let scope = self.global_scope();
            self.backend.on_write_identifier(&name, &scope, &value);
            self.genv.declare(&name, value);
        }
    }

    /// Builds the global environment: primitives, type declarations with
    /// their enumeration constants, the function table, and global
    /// storage in initialiser-dependency order.
    fn build_globals(&mut self, program: &Program) -> Result<(), AslError> {
        for (decl, runtime) in B::primitives() {
            self.genv.declare_func(Rc::new(decl), Some(runtime));
        }
        for decl in &program.decls {
            match decl {
                Decl::Type(type_decl) => {
                    self.genv.static_env.declare_type(type_decl.clone());
                    if let Ty::Enum(labels) = &type_decl.ty {
                        for label in labels {
                            let lit = self.genv.constant(label).cloned().expect("label was just recorded");
                            let value = self.backend.v_of_literal(&lit);
                            let scope = self.global_scope();
                            self.backend.on_write_identifier(label, &scope, &value);
                            self.genv.declare(label, value);
                        }
                    }
                }
                Decl::Func(func) => self.genv.declare_func(Rc::new(func.clone()), None),
                Decl::Global(_) => {}
            }
        }
        for global in ordered_globals(program)? {
            self.rule(SemanticsRule::BuildGlobal);
            if self.genv.mem(&global.name) {
                // Seeded by the host; the declaration keeps that value.
                continue;
            }
            let mut frame = LocalEnv::new(self.global_scope());
            let value = match &global.initial_value {
                Some(init) => match self.eval_expr(&mut frame, init) {
                    Ok(v) => v,
                    Err(Interrupt::Fatal(err)) => return Err(err),
                    Err(Interrupt::Raise(thrown)) => return Err(self.uncaught(thrown)),
                },
                None => {
                    let ty = global.ty.as_ref().ok_or_else(|| {
                        AslError::no_pos(AslErrorKind::TypeInferenceNeeded(format!(
                            "untyped global {} without an initialiser",
                            global.name
                        )))
                    })?;
                    self.base_value(&mut frame, ty)?
                }
            };
            let scope = self.global_scope();
            self.backend.on_write_identifier(&global.name, &scope, &value);
            self.genv.declare(&global.name, value);
        }
        Ok(())
    }

    /// Checks the entry subprogram's shape and runs it.
    fn call_entry(&mut self) -> Result<B::Value, AslError> {
        let entry = self.config.entry_point.clone();
        let Some(func) = self.genv.func(&entry) else {
            return Err(AslError::no_pos(AslErrorKind::UndefinedIdentifier(entry)));
        };
        let decl = Rc::clone(&func.decl);
        if !decl.args.is_empty() || !decl.parameters.is_empty() || decl.return_type.is_none() {
            return Err(AslError::no_pos(AslErrorKind::MismatchedReturnValue(entry)));
        }
        let mut frame = LocalEnv::new(Scope::Global { init: false });
        let mut returns = match self.eval_call(Pos::default(), &entry, &mut frame, &[], &[]) {
            Ok(returns) => returns,
            Err(Interrupt::Fatal(err)) => return Err(err),
            Err(Interrupt::Raise(thrown)) => return Err(self.uncaught(thrown)),
        };
        if returns.len() != 1 {
            return Err(AslError::no_pos(AslErrorKind::MismatchedReturnValue(entry)));
        }
        let read = returns.pop().expect("length was just checked");
        Ok(self.read_value_from(read))
    }

    /// Formats an exception that escaped the entry subprogram.
    fn uncaught(&self, thrown: Option<Thrown<B::Value>>) -> AslError {
        let msg = match thrown {
            Some(thrown) => format!("{}: {}", thrown.ty, self.backend.debug_value(&thrown.value)),
            None => "implicit rethrow outside of a catcher".to_owned(),
        };
        AslError::no_pos(AslErrorKind::UncaughtException(msg))
    }
}

/// Orders global storage declarations so every initialiser runs after the
/// globals it reads.
fn ordered_globals(program: &Program) -> Result<Vec<&GlobalDecl>, AslError> {
    let mut decls: IdMap<&GlobalDecl> = IdMap::default();
    for decl in &program.decls {
        if let Decl::Global(global) = decl {
            decls.insert(global.name.clone(), global);
        }
    }
    let mut state: IdMap<bool> = IdMap::default();
    let mut order = Vec::with_capacity(decls.len());
    for name in decls.keys().cloned().collect::<Vec<_>>() {
        visit_global(&name, &decls, &mut state, &mut order)?;
    }
    Ok(order)
}

fn visit_global<'p>(
    name: &str,
    decls: &IdMap<&'p GlobalDecl>,
    state: &mut IdMap<bool>,
    order: &mut Vec<&'p GlobalDecl>,
) -> Result<(), AslError> {
    // Dependencies on subprograms, constants or locals are not storage
    // declarations and impose no ordering.
    let Some(decl) = decls.get(name).copied() else {
        return Ok(());
    };
    match state.get(name) {
        Some(true) => return Ok(()),
        Some(false) => {
            return Err(AslError::no_pos(AslErrorKind::UnrespectedParserInvariant(format!(
                "cyclic global initialisation through {name}"
            ))));
        }
        None => {}
    }
    state.insert(name.to_owned(), false);
    let mut deps = Vec::new();
    if let Some(init) = &decl.initial_value {
        used_identifiers(init, &mut deps);
    }
    if let Some(ty) = &decl.ty {
        used_identifiers_ty(ty, &mut deps);
    }
    for dep in &deps {
        visit_global(dep, decls, state, order)?;
    }
    state.insert(name.to_owned(), true);
    order.push(decl);
    Ok(())
}
