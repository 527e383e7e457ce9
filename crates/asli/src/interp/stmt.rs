//! Statement evaluation: sequencing, control flow, loops with unroll
//! metering, declarations and try/catch.
//!
//! Statements yield a [`Control`]: either fall-through or a return from
//! the enclosing subprogram. ASL exceptions and fatal errors ride the
//! `Err` channel and are only inspected by the try statement.

use crate::{
    ast::{
        BinOp, Catcher, Expr, ExprLoc, ForDirection, LExpr, LocalDeclItem, Pos, Stmt, StmtLoc, ThrowArg, UnOp,
    },
    backend::Backend,
    env::LocalEnv,
    error::{AslError, AslErrorKind, Interrupt, Thrown},
    interp::{Control, IResult, Interpreter, ReadFrom, Val, at},
    io::PrintWriter,
    tracer::{RuleTracer, SemanticsRule},
};

impl<B: Backend, T: RuleTracer, P: PrintWriter> Interpreter<'_, B, T, P> {
    /// Evaluates one statement.
    pub(crate) fn eval_stmt(&mut self, env: &mut LocalEnv<Val<B>>, s: &StmtLoc) -> IResult<Control<Val<B>>, B> {
        let pos = s.pos;
        match &s.stmt {
            Stmt::Pass => {
                self.rule(SemanticsRule::Pass);
                Ok(Control::Continuing)
            }
            Stmt::Seq(first, second) => {
                self.rule(SemanticsRule::Seq);
                match self.eval_stmt(env, first)? {
                    Control::Continuing => self.eval_stmt(env, second),
                    returning @ Control::Returning(_) => Ok(returning),
                }
            }
            Stmt::Decl { item, init, .. } => {
                self.rule(SemanticsRule::Decl);
                self.eval_decl(env, pos, item, init.as_ref())?;
                Ok(Control::Continuing)
            }
            Stmt::Assign { lhs, rhs } => {
                // Fast path: a tuple of targets fed directly by a call
                // binds the call's results one to one.
                if let (LExpr::Destructuring(targets), Expr::Call { name, args, named_args }) =
                    (&lhs.lexpr, &rhs.expr)
                {
                    self.rule(SemanticsRule::Assign);
                    let returns = self.eval_call(rhs.pos, name, env, args, named_args)?;
                    let values = returns.into_iter().map(|read| self.read_value_from(read)).collect();
                    self.protected_multi_assign(env, pos, targets, values)?;
                    return Ok(Control::Continuing);
                }
                self.rule(SemanticsRule::Assign);
                let value = self.eval_expr(env, rhs)?;
                self.eval_lexpr(env, lhs, value)?;
                Ok(Control::Continuing)
            }
            Stmt::Call { name, args, named_args } => {
                self.rule(SemanticsRule::CallStmt);
                let returns = self.eval_call(pos, name, env, args, named_args)?;
                if !returns.is_empty() {
                    return Err(Interrupt::Fatal(AslError::new(
                        pos,
                        AslErrorKind::UnrespectedParserInvariant(format!(
                            "procedure call of {name} produced {} values",
                            returns.len()
                        )),
                    )));
                }
                Ok(Control::Continuing)
            }
            Stmt::Return(e) => self.eval_return(env, e.as_ref()),
            Stmt::Cond {
                cond,
                then_branch,
                else_branch,
            } => {
                self.rule(SemanticsRule::CondStmt);
                let cond_v = self.eval_expr(env, cond)?;
                let taken = self.eval_choice(cond.pos, "if", cond_v)?;
                self.eval_block(env, if taken { then_branch } else { else_branch })
            }
            Stmt::Case {
                discriminant,
                arms,
                otherwise,
            } => {
                self.rule(SemanticsRule::Case);
                let v = self.eval_expr(env, discriminant)?;
                for arm in arms {
                    let matched = self.eval_pattern(env, pos, &v, &arm.pattern)?;
                    let taken = self.eval_choice(pos, "case", matched)?;
                    if taken {
                        return self.eval_block(env, &arm.stmt);
                    }
                }
                match otherwise {
                    Some(stmt) => self.eval_block(env, stmt),
                    None => Ok(Control::Continuing),
                }
            }
            Stmt::Assert(e) => {
                self.rule(SemanticsRule::Assert);
                let v = self.eval_expr(env, e)?;
                let holds = at(self.backend.choice(&v), e.pos)?;
                if holds {
                    Ok(Control::Continuing)
                } else {
                    Err(Interrupt::Fatal(AslError::new(
                        e.pos,
                        AslErrorKind::AssertionFailed(e.to_string()),
                    )))
                }
            }
            Stmt::While { cond, body } => {
                self.rule(SemanticsRule::While);
                env.tick_push(self.config.unroll);
                let result = self.eval_loop(env, "while", true, cond, body);
                if result.is_ok() {
                    env.tick_pop();
                }
                result
            }
            Stmt::Repeat { body, cond } => {
                self.rule(SemanticsRule::Repeat);
                match self.eval_block(env, body)? {
                    Control::Continuing => {}
                    returning @ Control::Returning(_) => return Ok(returning),
                }
                env.tick_push_bis(self.config.unroll);
                let result = self.eval_loop(env, "repeat", false, cond, body);
                if result.is_ok() {
                    env.tick_pop();
                }
                result
            }
            Stmt::For {
                index,
                start,
                dir,
                end,
                body,
            } => self.eval_for_stmt(env, pos, index, start, *dir, end, body),
            Stmt::Throw(argument) => self.eval_throw(env, pos, argument.as_ref()),
            Stmt::Try {
                body,
                catchers,
                otherwise,
            } => {
                self.rule(SemanticsRule::Try);
                match self.eval_block(env, body) {
                    Err(Interrupt::Raise(Some(thrown))) => {
                        self.eval_catchers(env, catchers, otherwise.as_deref(), thrown)
                    }
                    // No catcher is eligible for an implicit rethrow that
                    // escapes the try body, nor of course for a normal
                    // completion or a fatal error.
                    other => other,
                }
            }
            Stmt::Print { args, newline } => {
                self.rule(SemanticsRule::Print);
                for arg in args {
                    let v = self.eval_expr_sef(env, arg)?;
                    let rendered = self.backend.debug_value(&v);
                    self.print.write_str(&rendered);
                }
                if *newline {
                    self.print.push('\n');
                }
                Ok(Control::Continuing)
            }
        }
    }

    /// Local declaration, with or without an initialiser.
    fn eval_decl(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        pos: Pos,
        item: &LocalDeclItem,
        init: Option<&ExprLoc>,
    ) -> IResult<(), B> {
        match init {
            Some(e) => {
                let value = self.eval_expr(env, e)?;
                self.bind_decl_item(env, pos, item, value)
            }
            None => match item {
                LocalDeclItem::Discard => Ok(()),
                LocalDeclItem::Typed(inner, ty) => {
                    let base = at(self.base_value(env, ty), pos)?;
                    self.bind_decl_item(env, pos, inner, base)
                }
                LocalDeclItem::Var(_) | LocalDeclItem::Tuple(_) => Err(Interrupt::Fatal(AslError::new(
                    pos,
                    AslErrorKind::TypeInferenceNeeded("uninitialised declaration without a type".to_owned()),
                ))),
            },
        }
    }

    /// Binds a declaration shape to a value, destructuring tuples.
    fn bind_decl_item(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        pos: Pos,
        item: &LocalDeclItem,
        value: Val<B>,
    ) -> IResult<(), B> {
        match item {
            LocalDeclItem::Discard => Ok(()),
            LocalDeclItem::Var(name) => {
                self.declare_local(env, name, value);
                Ok(())
            }
            LocalDeclItem::Typed(inner, _) => self.bind_decl_item(env, pos, inner, value),
            LocalDeclItem::Tuple(items) => {
                for (i, inner) in items.iter().enumerate() {
                    let element = at(self.backend.get_index(i, &value), pos)?;
                    self.bind_decl_item(env, pos, inner, element)?;
                }
                Ok(())
            }
        }
    }

    /// Return statements write their values to the synthetic `return-<i>`
    /// identifiers of the current scope before yielding them, so the
    /// backend observes the hand-over.
    fn eval_return(&mut self, env: &mut LocalEnv<Val<B>>, e: Option<&ExprLoc>) -> IResult<Control<Val<B>>, B> {
        self.rule(SemanticsRule::Return);
        match e {
            None => Ok(Control::Returning(Vec::new())),
            Some(ExprLoc {
                expr: Expr::Tuple(items),
                ..
            }) => {
                let mut values = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let v = self.eval_expr(env, item)?;
                    self.write_return(env, i, &v);
                    values.push(v);
                }
                Ok(Control::Returning(values))
            }
            Some(single) => {
                let v = self.eval_expr(env, single)?;
                self.write_return(env, 0, &v);
                Ok(Control::Returning(vec![v]))
            }
        }
    }

    fn write_return(&mut self, env: &mut LocalEnv<Val<B>>, i: usize, v: &Val<B>) {
        let name = format!("return-{i}");
        self.backend.on_write_identifier(&name, env.scope(), v);
        env.declare(&name, v.clone());
    }

    /// The shared while/repeat loop. `positive` is false for repeat,
    /// whose condition terminates the loop instead of continuing it.
    ///
    /// When the condition is undetermined, the innermost unroll budget is
    /// consumed one tick per iteration; on exhaustion the evaluator warns
    /// and leaves the loop as if the condition had failed.
    fn eval_loop(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        label: &'static str,
        positive: bool,
        cond: &ExprLoc,
        body: &StmtLoc,
    ) -> IResult<Control<Val<B>>, B> {
        loop {
            let mut cond_v = self.eval_expr(env, cond)?;
            if !positive {
                cond_v = at(self.backend.unop(UnOp::BoolNot, cond_v), cond.pos)?;
            }
            if self.backend.is_undetermined(&cond_v) && env.tick_decr() {
                self.warn(&format!("{label} loop stopped after {} unrollings", self.config.unroll));
                return Ok(Control::Continuing);
            }
            let taken = self.eval_choice(cond.pos, label, cond_v)?;
            if !taken {
                return Ok(Control::Continuing);
            }
            match self.eval_block(env, body)? {
                Control::Continuing => {}
                returning @ Control::Returning(_) => return Ok(returning),
            }
        }
    }

    /// For loops: both bounds are evaluated once, side-effect-free; the
    /// index steps by one towards the end bound and is removed from the
    /// frame when the loop finishes.
    #[expect(clippy::too_many_arguments, reason = "one parameter per syntactic component")]
    fn eval_for_stmt(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        pos: Pos,
        index: &str,
        start: &ExprLoc,
        dir: ForDirection,
        end: &ExprLoc,
        body: &StmtLoc,
    ) -> IResult<Control<Val<B>>, B> {
        self.rule(SemanticsRule::For);
        let start_v = self.eval_expr_sef(env, start)?;
        let end_v = self.eval_expr_sef(env, end)?;
        let metered = self.backend.is_undetermined(&start_v) || self.backend.is_undetermined(&end_v);
        self.declare_local(env, index, start_v);
        if metered {
            env.tick_push(self.config.unroll);
        }
        let result = self.eval_for_loop(env, pos, index, dir, &end_v, body, metered);
        if result.is_ok() {
            if metered {
                env.tick_pop();
            }
            env.remove(index);
        }
        result
    }

    #[expect(clippy::too_many_arguments, reason = "continuation of eval_for_stmt")]
    fn eval_for_loop(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        pos: Pos,
        index: &str,
        dir: ForDirection,
        end_v: &Val<B>,
        body: &StmtLoc,
        metered: bool,
    ) -> IResult<Control<Val<B>>, B> {
        let compare = match dir {
            ForDirection::Up => BinOp::Le,
            ForDirection::Down => BinOp::Ge,
        };
        loop {
            let current = self.read_var(env, pos, index)?;
            let in_range = at(self.backend.binop(compare, current, end_v.clone()), pos)?;
            if metered && self.backend.is_undetermined(&in_range) && env.tick_decr() {
                self.warn(&format!("for loop stopped after {} unrollings", self.config.unroll));
                return Ok(Control::Continuing);
            }
            let taken = self.eval_choice(pos, "for", in_range)?;
            if !taken {
                return Ok(Control::Continuing);
            }
            match self.eval_block(env, body)? {
                Control::Continuing => {}
                returning @ Control::Returning(_) => return Ok(returning),
            }
            let current = self.read_var(env, pos, index)?;
            let step = match dir {
                ForDirection::Up => BinOp::Add,
                ForDirection::Down => BinOp::Sub,
            };
            let one = self.backend.v_of_int(1);
            let next = at(self.backend.binop(step, current, one), pos)?;
            self.backend.on_write_identifier(index, env.scope(), &next);
            env.assign(index, next);
        }
    }

    /// Throw statements. A typed throw promotes the value to a freshly
    /// named, globally scoped identifier so the backend can track it; a
    /// bare `throw;` yields the implicit rethrow marker resolved by the
    /// enclosing try statement.
    fn eval_throw(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        pos: Pos,
        argument: Option<&ThrowArg>,
    ) -> IResult<Control<Val<B>>, B> {
        match argument {
            None => {
                self.rule(SemanticsRule::Rethrow);
                Err(Interrupt::Raise(None))
            }
            Some(ThrowArg { expr, ty: Some(ty) }) => {
                self.rule(SemanticsRule::Throw);
                let value = self.eval_expr(env, expr)?;
                let name = self.genv.fresh_thrown_name();
                let scope = self.global_scope();
                self.backend.on_write_identifier(&name, &scope, &value);
                self.genv.declare(&name, value.clone());
                Err(Interrupt::Raise(Some(Thrown {
                    value,
                    name,
                    scope,
                    ty: ty.clone(),
                })))
            }
            Some(ThrowArg { ty: None, .. }) => Err(Interrupt::Fatal(AslError::new(
                pos,
                AslErrorKind::TypeInferenceNeeded("throw without a dynamic type annotation".to_owned()),
            ))),
        }
    }

    /// Catcher selection: the first catcher whose annotation accepts the
    /// exception's dynamic type wins, then `otherwise`, then the exception
    /// resurfaces unchanged.
    fn eval_catchers(
        &mut self,
        env: &mut LocalEnv<Val<B>>,
        catchers: &[Catcher],
        otherwise: Option<&StmtLoc>,
        thrown: Thrown<Val<B>>,
    ) -> IResult<Control<Val<B>>, B> {
        let eligible = catchers
            .iter()
            .find(|catcher| self.genv.static_env.subtype_satisfies(&thrown.ty, &catcher.ty));
        match eligible {
            Some(catcher) => {
                self.rule(SemanticsRule::Catch);
                let result = match &catcher.name {
                    Some(name) => {
                        // Bind the caught value, re-reading it from the
                        // throw-site identifier, for the catcher body
                        // only.
                        let value = self.read_value_from(ReadFrom {
                            value: thrown.value.clone(),
                            name: thrown.name.clone(),
                            scope: thrown.scope.clone(),
                        });
                        env.push_scope();
                        self.declare_local(env, name, value);
                        let result = self.eval_stmt(env, &catcher.stmt);
                        env.pop_scope();
                        result
                    }
                    None => self.eval_block(env, &catcher.stmt),
                };
                Self::rethrow_implicit(thrown, result)
            }
            None => match otherwise {
                Some(stmt) => {
                    self.rule(SemanticsRule::CatchOtherwise);
                    let result = self.eval_block(env, stmt);
                    Self::rethrow_implicit(thrown, result)
                }
                None => Err(Interrupt::Raise(Some(thrown))),
            },
        }
    }

    /// A bare `throw;` inside the handled branch re-raises the caught
    /// exception with its original value, identifier and type.
    fn rethrow_implicit(
        thrown: Thrown<Val<B>>,
        result: IResult<Control<Val<B>>, B>,
    ) -> IResult<Control<Val<B>>, B> {
        match result {
            Err(Interrupt::Raise(None)) => Err(Interrupt::Raise(Some(thrown))),
            other => other,
        }
    }
}
