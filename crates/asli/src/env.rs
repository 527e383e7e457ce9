//! The runtime environment: scoped local storage, shared global storage
//! and the loop-unrolling budget stack.
//!
//! Identifier maps are insertion-ordered (`IndexMap`) so iteration over
//! declarations, function tables and record fields is deterministic.
//!
//! # Design Rationale
//!
//! Local storage is a stack of maps, one per lexical block. Declarations
//! always land in the innermost map; lookup and assignment walk the stack
//! from the inside out, then fall through to the global storage. Popping a
//! block therefore drops exactly the identifiers declared inside it, while
//! global updates made inside the block survive. Misuse that the external
//! type checker rules out (redeclaration, popping the last scope) panics
//! rather than erroring.

use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    ast::{FuncDecl, Literal},
    backend::{Backend, PrimitiveFn},
    types::StaticEnv,
};

/// Insertion-ordered identifier map.
pub type IdMap<V> = IndexMap<String, V, ahash::RandomState>;

/// Where an identifier lives.
///
/// Two local scopes are the same storage exactly when both the subprogram
/// and the call instance match; the instance comes from the per-function
/// monotonic counter, so recursive calls never share locals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Global storage. `init` marks writes performed while the global
    /// environment is being built, before the entry subprogram runs.
    Global { init: bool },
    Local { subprogram: String, instance: u64 },
}

/// The result of [`find`]: where the identifier resolved, if anywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    Local(V),
    Global(V),
    NotFound,
}

/// Composed identifier lookup, local storage taking precedence.
pub fn find<B: Backend>(env: &LocalEnv<B::Value>, genv: &GlobalEnv<B>, name: &str) -> Lookup<B::Value> {
    if let Some(v) = env.get(name) {
        Lookup::Local(v.clone())
    } else if let Some(v) = genv.get(name) {
        Lookup::Global(v.clone())
    } else {
        Lookup::NotFound
    }
}

/// Local storage of one subprogram activation.
#[derive(Debug)]
pub struct LocalEnv<V> {
    scope: Scope,
    /// Block scopes, innermost last. Never empty.
    maps: Vec<IdMap<V>>,
    /// Unroll budgets of the enclosing loops, innermost last.
    unroll: SmallVec<[usize; 4]>,
}

impl<V: Clone> LocalEnv<V> {
    /// Creates an empty frame for the given scope.
    #[must_use]
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            maps: vec![IdMap::default()],
            unroll: SmallVec::new(),
        }
    }

    /// The scope this frame belongs to.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Looks the identifier up through the block chain, innermost first.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&V> {
        self.maps.iter().rev().find_map(|map| map.get(name))
    }

    /// True when the identifier is bound in any enclosing block.
    #[must_use]
    pub fn mem(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Declares a fresh identifier in the innermost block.
    ///
    /// # Panics
    /// Panics when the identifier already exists there; the type checker
    /// guarantees declarations are unique within a block.
    pub fn declare(&mut self, name: &str, value: V) {
        let innermost = self.maps.last_mut().expect("local env has no scope");
        let previous = innermost.insert(name.to_owned(), value);
        assert!(previous.is_none(), "redeclaration of local {name}");
    }

    /// Updates the innermost binding of the identifier. Returns false when
    /// no block binds it.
    pub fn assign(&mut self, name: &str, value: V) -> bool {
        for map in self.maps.iter_mut().rev() {
            if let Some(slot) = map.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        false
    }

    /// Removes the innermost binding of the identifier, if any. Used by
    /// for loops to retire their index variable.
    pub fn remove(&mut self, name: &str) {
        for map in self.maps.iter_mut().rev() {
            if map.shift_remove(name).is_some() {
                return;
            }
        }
    }

    /// Opens a lexical block.
    pub fn push_scope(&mut self) {
        self.maps.push(IdMap::default());
    }

    /// Closes the innermost lexical block, dropping its bindings.
    ///
    /// # Panics
    /// Panics when only the frame's root block remains.
    pub fn pop_scope(&mut self) {
        assert!(self.maps.len() > 1, "pop of the root scope");
        self.maps.pop();
    }

    /// Seeds a fresh unroll budget for a loop about to run.
    pub fn tick_push(&mut self, budget: usize) {
        self.unroll.push(budget);
    }

    /// Seeds a budget for a loop whose body already ran once before the
    /// condition is first consulted.
    pub fn tick_push_bis(&mut self, budget: usize) {
        self.unroll.push(budget + 1);
    }

    /// Decrements the innermost budget; returns true when it reaches zero.
    ///
    /// # Panics
    /// Panics outside any loop; the evaluator only consults budgets while
    /// one is pushed.
    pub fn tick_decr(&mut self) -> bool {
        let top = self.unroll.last_mut().expect("unroll stack is empty");
        *top = top.saturating_sub(1);
        *top == 0
    }

    /// Retires the innermost budget at loop exit.
    pub fn tick_pop(&mut self) {
        self.unroll.pop().expect("unroll stack is empty");
    }
}

/// One entry of the function table.
pub struct FuncEntry<B: Backend> {
    /// How many times the subprogram has been called. Incremented before
    /// each call, giving every activation a unique scope instance.
    pub runs: u64,
    pub decl: Rc<FuncDecl>,
    /// The backend runtime for primitive subprograms, `None` for ASL
    /// bodies.
    pub runtime: Option<PrimitiveFn<B>>,
}

impl<B: Backend> std::fmt::Debug for FuncEntry<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuncEntry")
            .field("runs", &self.runs)
            .field("decl", &self.decl.name)
            .field("primitive", &self.runtime.is_some())
            .finish()
    }
}

/// The shared global environment.
///
/// Built once by the driver in declaration-dependency order, then updated
/// in place by assignments to global storage; callers and callees observe
/// each other's updates immediately.
#[derive(Debug)]
pub struct GlobalEnv<B: Backend> {
    /// The read-only view handed over by the type checker.
    pub static_env: StaticEnv,
    storage: IdMap<B::Value>,
    funcs: IdMap<FuncEntry<B>>,
    /// Counter behind the fresh identifiers thrown values are promoted to.
    next_thrown: u64,
}

impl<B: Backend> GlobalEnv<B> {
    /// Creates an empty global environment over a static view.
    #[must_use]
    pub fn new(static_env: StaticEnv) -> Self {
        Self {
            static_env,
            storage: IdMap::default(),
            funcs: IdMap::default(),
            next_thrown: 0,
        }
    }

    /// Reads a global storage element.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&B::Value> {
        self.storage.get(name)
    }

    /// True when the name is a global storage element.
    #[must_use]
    pub fn mem(&self, name: &str) -> bool {
        self.storage.contains_key(name)
    }

    /// Declares or replaces a global storage element.
    pub fn declare(&mut self, name: &str, value: B::Value) {
        self.storage.insert(name.to_owned(), value);
    }

    /// Updates an existing global storage element. Returns false when the
    /// name is not global.
    pub fn assign(&mut self, name: &str, value: B::Value) -> bool {
        match self.storage.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Looks a subprogram up.
    #[must_use]
    pub fn func(&self, name: &str) -> Option<&FuncEntry<B>> {
        self.funcs.get(name)
    }

    /// Registers a subprogram. Later declarations of the same name win,
    /// which lets a program override a primitive from the prelude.
    pub fn declare_func(&mut self, decl: Rc<FuncDecl>, runtime: Option<PrimitiveFn<B>>) {
        self.funcs.insert(
            decl.name.clone(),
            FuncEntry {
                runs: 0,
                decl,
                runtime,
            },
        );
    }

    /// Bumps the call counter of a subprogram and returns the fresh
    /// instance number. Strictly increasing across the whole run.
    pub fn next_instance(&mut self, name: &str) -> Option<u64> {
        let entry = self.funcs.get_mut(name)?;
        entry.runs += 1;
        Some(entry.runs)
    }

    /// A fresh, globally unique identifier for a thrown value.
    pub fn fresh_thrown_name(&mut self) -> String {
        let n = self.next_thrown;
        self.next_thrown += 1;
        format!("thrown-{n}")
    }

    /// Iterates the function table in declaration order.
    pub fn funcs(&self) -> impl Iterator<Item = (&String, &FuncEntry<B>)> {
        self.funcs.iter()
    }

    /// Looks up the value of an enumeration label or other named constant
    /// recorded by the type checker.
    #[must_use]
    pub fn constant(&self, name: &str) -> Option<&Literal> {
        self.static_env.constant_values.get(name)
    }
}
