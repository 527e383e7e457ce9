//! ASLI is an interpreter for ASL (Arm Specification Language), the
//! imperative, strongly typed pseudo-language of architecture reference
//! manuals.
//!
//! The crate consumes a program that has already been parsed and
//! type-checked (see [`ast`]) and realises its big-step operational
//! semantics. Evaluation is parameterised over a pluggable [`Backend`]
//! that owns the value domain, the primitive operations and the effect
//! discipline; the bundled [`NativeBackend`] is a concrete interpreter
//! over fully determined values. A [`RuleTracer`] observes every
//! semantics rule the evaluator fires, and a [`PrintWriter`] receives
//! diagnostic output.
//!
//! The top-level entry points are [`run`] and [`run_with`]: they build
//! the global environment from the program's declarations, invoke the
//! `main` subprogram and yield its return value.

pub mod ast;
mod backend;
mod bitvector;
mod env;
mod error;
mod interp;
mod io;
mod native;
mod run;
mod tracer;
mod types;

pub use crate::{
    backend::{Backend, PrimitiveFn},
    bitvector::Bitvector,
    env::{FuncEntry, GlobalEnv, IdMap, LocalEnv, Lookup, Scope, find},
    error::{AslError, AslErrorKind, Interrupt, Thrown},
    io::{CollectPrint, NoPrint, PrintWriter, StdPrint},
    native::{NativeBackend, NativeValue},
    run::{AslVersion, Config, run, run_with},
    tracer::{NoopTracer, RecordingTracer, RuleTracer, SemanticsRule, StderrTracer},
    types::StaticEnv,
};
