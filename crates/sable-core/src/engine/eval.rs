//! Expression evaluation
//!
//! Every expression reduces to a `SymbolicValue`. The `resolve` flag
//! controls the identifier/member duality: resolved evaluation substitutes
//! the bound value, unresolved evaluation keeps the textual name (call
//! arguments stay textual so rule patterns see the source spelling; callees
//! resolve so aliased sinks are still recognized).

use std::collections::HashSet;

use swc_common::{Span, Spanned};
use swc_ecma_ast::{
    ArrowExpr, AssignExpr, AssignTarget, BlockStmtOrExpr, Callee, Expr, ExprOrSpread, FnExpr,
    Lit, MemberExpr, MemberProp, ObjectLit, OptChainBase, Pat, Prop, PropName, PropOrSpread,
    ReturnStmt, SimpleAssignTarget, Stmt, Tpl,
};

use crate::engine::scope::{ScopeId, ScopeKind};
use crate::engine::value::{
    FunctionValue, SymbolicValue, ValueKind, split_member_path,
};
use crate::engine::{EngineError, Interpreter};
use crate::resolver;
use crate::rules::{CallSite, CallbackHandler};

pub(crate) fn pat_ident_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(ident) => Some(ident.sym.to_string()),
        Pat::Assign(assign) => pat_ident_name(&assign.left),
        Pat::Rest(rest) => pat_ident_name(&rest.arg),
        _ => None,
    }
}

pub(crate) fn param_names_from_pats(pats: &[Pat]) -> Vec<String> {
    pats.iter()
        .enumerate()
        .map(|(i, pat)| pat_ident_name(pat).unwrap_or_else(|| format!("arg{i}")))
        .collect()
}

pub(crate) fn param_names(params: &[swc_ecma_ast::Param]) -> Vec<String> {
    params
        .iter()
        .enumerate()
        .map(|(i, param)| pat_ident_name(&param.pat).unwrap_or_else(|| format!("arg{i}")))
        .collect()
}

fn literal_value(lit: &Lit) -> SymbolicValue {
    match lit {
        Lit::Str(s) => SymbolicValue::literal(format!("'{}'", s.value)),
        Lit::Num(n) => SymbolicValue::literal(n.value.to_string()),
        Lit::Bool(b) => SymbolicValue::literal(b.value.to_string()),
        Lit::Null(_) => SymbolicValue::literal("null"),
        Lit::BigInt(b) => SymbolicValue::literal(b.value.to_string()),
        Lit::Regex(r) => SymbolicValue::literal(format!("/{}/{}", r.exp, r.flags)),
        Lit::JSXText(t) => SymbolicValue::literal(t.value.to_string()),
    }
}

impl<'a> Interpreter<'a> {
    pub(crate) fn eval(
        &mut self,
        scope: ScopeId,
        expr: &Expr,
        resolve: bool,
    ) -> Result<SymbolicValue, EngineError> {
        self.bump()?;
        match expr {
            Expr::Lit(lit) => Ok(literal_value(lit)),
            Expr::Ident(ident) => self.eval_ident(scope, &ident.sym, ident.span, resolve),
            Expr::This(this) => self.eval_ident(scope, "this", this.span, resolve),
            Expr::Member(member) => self.eval_member(scope, member, resolve),
            Expr::SuperProp(sp) => Ok(SymbolicValue::member(format!(
                "super.{}",
                match &sp.prop {
                    swc_ecma_ast::SuperProp::Ident(ident) => ident.sym.to_string(),
                    swc_ecma_ast::SuperProp::Computed(computed) => {
                        self.eval(scope, &computed.expr, true)?.raw_name()
                    }
                }
            ))),
            Expr::OptChain(chain) => match chain.base.as_ref() {
                OptChainBase::Member(member) => self.eval_member(scope, member, resolve),
                OptChainBase::Call(call) => {
                    self.eval_call_parts(scope, &call.callee, &call.args, call.span)
                }
            },
            Expr::Call(call) => match &call.callee {
                Callee::Expr(callee) => {
                    self.eval_call_parts(scope, callee, &call.args, call.span)
                }
                Callee::Super(_) | Callee::Import(_) => {
                    let mut args = Vec::with_capacity(call.args.len());
                    for arg in &call.args {
                        args.push(self.eval(scope, &arg.expr, false)?);
                    }
                    Ok(SymbolicValue::new(ValueKind::CallResult {
                        raw: call_raw("import", &args),
                        callee: Box::new(SymbolicValue::unresolved("import")),
                        args,
                    }))
                }
            },
            Expr::New(new_expr) => {
                let args: &[ExprOrSpread] = new_expr.args.as_deref().unwrap_or(&[]);
                self.eval_call_parts(scope, &new_expr.callee, args, new_expr.span)
            }
            Expr::Bin(bin) => {
                let left = self.eval(scope, &bin.left, true)?;
                let right = self.eval(scope, &bin.right, true)?;
                let taint = left.taint.clone().or_else(|| right.taint.clone());
                let mut value = SymbolicValue::new(ValueKind::Binary {
                    op: bin.op.as_str().to_string(),
                    left: Box::new(left),
                    right: Box::new(right),
                });
                value.taint = taint;
                Ok(value)
            }
            Expr::Cond(cond) => {
                self.eval(scope, &cond.test, true)?;
                let cons = self.eval(scope, &cond.cons, true)?;
                let alt = self.eval(scope, &cond.alt, true)?;
                let taint = cons.taint.clone().or_else(|| alt.taint.clone());
                let mut value = SymbolicValue::new(ValueKind::Binary {
                    op: "?:".to_string(),
                    left: Box::new(cons),
                    right: Box::new(alt),
                });
                value.taint = taint;
                Ok(value)
            }
            Expr::Assign(assign) => self.eval_assign(scope, assign),
            Expr::Seq(seq) => {
                let mut last = SymbolicValue::undefined();
                for expr in &seq.exprs {
                    last = self.eval(scope, expr, resolve)?;
                }
                Ok(last)
            }
            Expr::Unary(unary) => self.eval(scope, &unary.arg, resolve),
            Expr::Update(update) => self.eval(scope, &update.arg, resolve),
            Expr::Await(await_expr) => self.eval(scope, &await_expr.arg, resolve),
            Expr::Paren(paren) => self.eval(scope, &paren.expr, resolve),
            Expr::Yield(yield_expr) => match &yield_expr.arg {
                Some(arg) => self.eval(scope, arg, resolve),
                None => Ok(SymbolicValue::undefined()),
            },
            Expr::Tpl(tpl) => self.eval_template(scope, tpl),
            Expr::TaggedTpl(tagged) => {
                self.eval(scope, &tagged.tag, true)?;
                self.eval_template(scope, &tagged.tpl)
            }
            Expr::Arrow(arrow) => self.eval_arrow(scope, arrow),
            Expr::Fn(fn_expr) => self.eval_fn_expr(scope, fn_expr),
            Expr::Object(object) => self.eval_object(scope, object),
            Expr::Array(array) => {
                let mut elements = Vec::with_capacity(array.elems.len());
                for elem in array.elems.iter().flatten() {
                    let value = self.eval(scope, &elem.expr, true)?;
                    self.flag_constituent(&value, elem.expr.span());
                    elements.push(value);
                }
                Ok(SymbolicValue::new(ValueKind::Array { elements }))
            }
            Expr::Class(_) => Ok(SymbolicValue::object(vec![(
                "prototype".to_string(),
                SymbolicValue::object(Vec::new()),
            )])),
            Expr::MetaProp(_) => Ok(SymbolicValue::member("import.meta")),
            Expr::TsNonNull(e) => self.eval(scope, &e.expr, resolve),
            Expr::TsAs(e) => self.eval(scope, &e.expr, resolve),
            Expr::TsSatisfies(e) => self.eval(scope, &e.expr, resolve),
            Expr::TsConstAssertion(e) => self.eval(scope, &e.expr, resolve),
            Expr::TsTypeAssertion(e) => self.eval(scope, &e.expr, resolve),
            Expr::TsInstantiation(e) => self.eval(scope, &e.expr, resolve),
            Expr::JSXMember(_)
            | Expr::JSXNamespacedName(_)
            | Expr::JSXEmpty(_)
            | Expr::JSXElement(_)
            | Expr::JSXFragment(_) => Err(EngineError::UnsupportedNode { kind: "jsx" }),
            Expr::PrivateName(name) => Ok(SymbolicValue::ident(format!("#{}", name.name))),
            Expr::Invalid(_) => Err(EngineError::UnsupportedNode {
                kind: "invalid expression",
            }),
        }
    }

    fn eval_ident(
        &mut self,
        scope: ScopeId,
        name: &str,
        span: Span,
        resolve: bool,
    ) -> Result<SymbolicValue, EngineError> {
        match self.scopes.lookup(scope, name).cloned() {
            Some(value) if resolve => Ok(value),
            Some(_) => Ok(SymbolicValue::ident(name)),
            None => {
                let mut value = SymbolicValue::unresolved(name);
                value.taint = self.match_source(name, span);
                Ok(value)
            }
        }
    }

    fn eval_member(
        &mut self,
        scope: ScopeId,
        member: &MemberExpr,
        resolve: bool,
    ) -> Result<SymbolicValue, EngineError> {
        let path = self.member_path(scope, member)?;

        if resolve {
            if let Some(value) = self.resolve_path(scope, &path) {
                return Ok(value);
            }
        }

        let mut value = SymbolicValue::member(path.clone());
        let root = split_member_path(&path)[0].to_string();
        if let Some(binding) = self.scopes.lookup(scope, &root) {
            value.taint = binding.taint.clone();
        }
        if value.taint.is_none() {
            // Source rules see the whole canonical path, so reports name
            // the full source expression rather than its root.
            value.taint = self.match_source(&path, member.span);
        }
        Ok(value)
    }

    /// Flattens a member expression to its canonical dotted/bracket text.
    pub(crate) fn member_path(
        &mut self,
        scope: ScopeId,
        member: &MemberExpr,
    ) -> Result<String, EngineError> {
        let object = self.member_object_text(scope, &member.obj)?;
        match &member.prop {
            MemberProp::Ident(ident) => Ok(format!("{}.{}", object, ident.sym)),
            MemberProp::PrivateName(name) => Ok(format!("{}.#{}", object, name.name)),
            MemberProp::Computed(computed) => {
                let key = self.eval(scope, &computed.expr, true)?;
                Ok(format!("{}[{}]", object, key.raw_name()))
            }
        }
    }

    fn member_object_text(
        &mut self,
        scope: ScopeId,
        obj: &Expr,
    ) -> Result<String, EngineError> {
        match obj {
            Expr::Ident(ident) => Ok(ident.sym.to_string()),
            Expr::This(_) => Ok("this".to_string()),
            Expr::Member(inner) => self.member_path(scope, inner),
            Expr::OptChain(chain) => match chain.base.as_ref() {
                OptChainBase::Member(inner) => self.member_path(scope, inner),
                OptChainBase::Call(call) => Ok(self
                    .eval_call_parts(scope, &call.callee, &call.args, call.span)?
                    .raw_name()),
            },
            Expr::Paren(paren) => self.member_object_text(scope, &paren.expr),
            other => Ok(self.eval(scope, other, true)?.raw_name()),
        }
    }

    fn eval_assign(
        &mut self,
        scope: ScopeId,
        assign: &AssignExpr,
    ) -> Result<SymbolicValue, EngineError> {
        let value = self.eval(scope, &assign.right, true)?;

        let target = match &assign.left {
            AssignTarget::Simple(SimpleAssignTarget::Ident(ident)) => {
                Some(ident.sym.to_string())
            }
            AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                Some(self.member_path(scope, member)?)
            }
            _ => None,
        };

        if let Some(name) = target {
            self.record_tainted_binding(&value, &name, assign.span);
            self.assign_path(scope, &name, value.clone());
            self.emit("assign", &name, assign.span);
        }
        Ok(value)
    }

    fn eval_template(
        &mut self,
        scope: ScopeId,
        tpl: &Tpl,
    ) -> Result<SymbolicValue, EngineError> {
        let mut folded: Option<SymbolicValue> = None;
        for expr in &tpl.exprs {
            let value = self.eval(scope, expr, true)?;
            folded = Some(match folded {
                None => value,
                Some(prev) => {
                    let taint = prev.taint.clone().or_else(|| value.taint.clone());
                    let mut merged = SymbolicValue::new(ValueKind::Binary {
                        op: "+".to_string(),
                        left: Box::new(prev),
                        right: Box::new(value),
                    });
                    merged.taint = taint;
                    merged
                }
            });
        }
        Ok(folded.unwrap_or_else(|| {
            let text: String = tpl
                .quasis
                .iter()
                .map(|quasi| quasi.raw.as_str())
                .collect();
            SymbolicValue::literal(format!("'{text}'"))
        }))
    }

    fn eval_arrow(
        &mut self,
        scope: ScopeId,
        arrow: &ArrowExpr,
    ) -> Result<SymbolicValue, EngineError> {
        let params = param_names_from_pats(&arrow.params);
        let body = match arrow.body.as_ref() {
            BlockStmtOrExpr::BlockStmt(block) => block.stmts.clone(),
            BlockStmtOrExpr::Expr(expr) => vec![Stmt::Return(ReturnStmt {
                span: expr.span(),
                arg: Some(expr.clone()),
            })],
        };
        self.declare_function(scope, None, params, body, arrow.span)
    }

    fn eval_fn_expr(
        &mut self,
        scope: ScopeId,
        fn_expr: &FnExpr,
    ) -> Result<SymbolicValue, EngineError> {
        let name = fn_expr.ident.as_ref().map(|ident| ident.sym.to_string());
        let params = param_names(&fn_expr.function.params);
        let body = fn_expr
            .function
            .body
            .as_ref()
            .map(|block| block.stmts.clone())
            .unwrap_or_default();
        self.declare_function(scope, name, params, body, fn_expr.function.span)
    }

    /// Binds a function literal (named ones into the enclosing scope) and
    /// eagerly walks its body once with placeholder arguments, so handlers
    /// without a visible call site are still analyzed.
    pub(crate) fn declare_function(
        &mut self,
        scope: ScopeId,
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Stmt>,
        span: Span,
    ) -> Result<SymbolicValue, EngineError> {
        let child = self.scopes.create_child(scope, ScopeKind::Function);
        let func = FunctionValue {
            name: name.clone(),
            params,
            body,
            scope: child,
        };
        let value = SymbolicValue::new(ValueKind::Function(func.clone()));
        if let Some(func_name) = &name {
            self.scopes.bind_local(scope, func_name.clone(), value.clone());
        }
        self.emit("func", name.as_deref().unwrap_or("Function"), span);

        let placeholders: Vec<SymbolicValue> = func
            .params
            .iter()
            .map(|param| SymbolicValue::unresolved(param.clone()))
            .collect();
        // A distinct memo key: the declaration-time walk must not shadow
        // a later real call that happens to carry the same argument text.
        let signature = format!("decl {}", call_signature(&func, &placeholders));
        self.simulate_memoized(&func, placeholders, span, signature)?;
        Ok(value)
    }

    /// Walks a function body with the given arguments bound to its
    /// parameters. Memoized per function by argument signature, which
    /// terminates self-referential and mutually recursive calls.
    pub(crate) fn simulate_call(
        &mut self,
        func: &FunctionValue,
        args: Vec<SymbolicValue>,
        span: Span,
    ) -> Result<(), EngineError> {
        let signature = call_signature(func, &args);
        self.simulate_memoized(func, args, span, signature)
    }

    fn simulate_memoized(
        &mut self,
        func: &FunctionValue,
        args: Vec<SymbolicValue>,
        span: Span,
        signature: String,
    ) -> Result<(), EngineError> {
        if !self.scopes.memoize_call(func.scope, signature) {
            return Ok(());
        }

        for (i, param) in func.params.iter().enumerate() {
            let value = args
                .get(i)
                .cloned()
                .unwrap_or_else(|| SymbolicValue::unresolved(param.clone()));
            self.record_tainted_binding(&value, param, span);
            self.scopes.bind_local(func.scope, param.clone(), value);
        }
        self.traverse(func.scope, &func.body)
    }

    fn eval_object(
        &mut self,
        scope: ScopeId,
        object: &ObjectLit,
    ) -> Result<SymbolicValue, EngineError> {
        let mut props: Vec<(String, SymbolicValue)> = Vec::new();

        for prop_or_spread in &object.props {
            match prop_or_spread {
                PropOrSpread::Spread(spread) => {
                    let value = self.eval(scope, &spread.expr, true)?;
                    if let ValueKind::Object { props: inner } = value.kind {
                        props.extend(inner);
                    }
                }
                PropOrSpread::Prop(prop) => match prop.as_ref() {
                    Prop::Shorthand(ident) => {
                        let value = self.eval_ident(scope, &ident.sym, ident.span, true)?;
                        self.flag_constituent(&value, ident.span);
                        props.push((ident.sym.to_string(), value));
                    }
                    Prop::KeyValue(kv) => {
                        let key = self.prop_name_text(scope, &kv.key)?;
                        let value = self.eval(scope, &kv.value, true)?;
                        self.flag_constituent(&value, kv.value.span());
                        props.push((key, value));
                    }
                    Prop::Method(method) => {
                        let key = self.prop_name_text(scope, &method.key)?;
                        let params = param_names(&method.function.params);
                        let body = method
                            .function
                            .body
                            .as_ref()
                            .map(|block| block.stmts.clone())
                            .unwrap_or_default();
                        let value = self.declare_function(
                            scope,
                            None,
                            params,
                            body,
                            method.function.span,
                        )?;
                        props.push((key, value));
                    }
                    Prop::Assign(assign) => {
                        let value = self.eval(scope, &assign.value, true)?;
                        props.push((assign.key.sym.to_string(), value));
                    }
                    Prop::Getter(_) | Prop::Setter(_) => {}
                },
            }
        }

        Ok(SymbolicValue::object(props))
    }

    fn prop_name_text(
        &mut self,
        scope: ScopeId,
        name: &PropName,
    ) -> Result<String, EngineError> {
        Ok(match name {
            PropName::Ident(ident) => ident.sym.to_string(),
            PropName::Str(s) => s.value.to_string(),
            PropName::Num(n) => n.value.to_string(),
            PropName::BigInt(b) => b.value.to_string(),
            PropName::Computed(computed) => {
                self.eval(scope, &computed.expr, true)?.raw_name()
            }
        })
    }

    /// A tainted constituent of an object/array literal opens its source
    /// report; the container itself is not blanket-tainted.
    fn flag_constituent(&mut self, value: &SymbolicValue, span: Span) {
        if let Some(tag) = value.taint.clone() {
            self.tracker.open_source(crate::report::SourceRef::new(
                &tag.name,
                &tag.file,
                tag.position,
            ));
            self.emit("source", &tag.name, span);
        }
    }

    /// The call-expression rule engine: sink audit, module imports,
    /// callback seeding, then tainted-argument inspection.
    pub(crate) fn eval_call_parts(
        &mut self,
        scope: ScopeId,
        callee_expr: &Expr,
        call_args: &[ExprOrSpread],
        span: Span,
    ) -> Result<SymbolicValue, EngineError> {
        let mut args = Vec::with_capacity(call_args.len());
        for arg in call_args {
            args.push(self.eval(scope, &arg.expr, false)?);
        }

        let callee = self.eval(scope, callee_expr, true)?;
        let callee_name = callee.raw_name();
        let raw = call_raw(&callee_name, &args);

        // A callee resolved to a function literal is walked directly.
        if let Some(func) = callee.as_function() {
            let func = func.clone();
            self.simulate_call(&func, args.clone(), span)?;
            return Ok(SymbolicValue::new(ValueKind::CallResult {
                raw,
                callee: Box::new(callee),
                args,
            }));
        }

        let is_sink = self.rules.sinks.find_match(&callee_name).is_some();
        if is_sink {
            let position = self.position(span);
            let sink = crate::report::SinkRef::new(&callee_name, self.file_label(), position);
            self.reported_sinks.push(sink);
            self.emit("sink", &callee_name, span);
        } else {
            self.emit("call", &callee_name, span);
        }

        if callee_name == "require" {
            if let Some(value) = self.try_require(scope, &args, span) {
                return Ok(value);
            }
        }

        // Callback rules only fire on sink calls; a non-sink callee with a
        // matching shape stays an ordinary call.
        if is_sink {
            if let Some(rule) = self.rules.callbacks.find_match(&callee_name) {
                let rule_name = rule.name.clone();
                let handler = rule.handler;
                if let Err(e) =
                    self.apply_callback_rule(scope, handler, &callee_name, &args, span)
                {
                    if matches!(e, EngineError::BudgetExhausted { .. }) {
                        return Err(e);
                    }
                    let err = EngineError::RuleHandler {
                        name: rule_name,
                        message: e.to_string(),
                    };
                    tracing::debug!(file = %self.file_label(), error = %err, "callback rule failed");
                }
            }
        }

        for arg in &args {
            let mut visited = HashSet::new();
            self.inspect_arg(scope, arg, &callee_name, is_sink, span, &mut visited);
        }

        Ok(SymbolicValue::new(ValueKind::CallResult {
            raw,
            callee: Box::new(callee),
            args,
        }))
    }

    fn apply_callback_rule(
        &mut self,
        scope: ScopeId,
        handler: CallbackHandler,
        name: &str,
        args: &[SymbolicValue],
        span: Span,
    ) -> Result<(), EngineError> {
        match handler {
            CallbackHandler::Params { callback, source } => {
                let Some(index) = callback.resolve(args.len()) else {
                    return Ok(());
                };
                let Some(func) = self.resolve_function(scope, &args[index]) else {
                    return Ok(());
                };
                self.simulate_tainted_callback(&func, source, span)
            }
            CallbackHandler::Custom(custom) => {
                let call = CallSite { name, args, span };
                custom(self, scope, &call)
            }
        }
    }

    /// Recursive tainted-argument inspection: through binary/conditional
    /// wrappers and identifier/member aliasing (with a visited set so
    /// self-referential bindings terminate).
    fn inspect_arg(
        &mut self,
        scope: ScopeId,
        arg: &SymbolicValue,
        callee: &str,
        is_sink: bool,
        span: Span,
        visited: &mut HashSet<String>,
    ) {
        if let Some(tag) = arg.taint.clone() {
            self.report_flow(&tag, callee, is_sink, span);
            return;
        }

        match &arg.kind {
            ValueKind::Binary { left, right, .. } => {
                self.inspect_arg(scope, left, callee, is_sink, span, visited);
                self.inspect_arg(scope, right, callee, is_sink, span, visited);
            }
            ValueKind::Identifier { name }
            | ValueKind::MemberPath { path: name }
            | ValueKind::Unresolved { name } => {
                if !visited.insert(name.clone()) {
                    return;
                }
                if let Some(resolved) = self.resolve_path(scope, name) {
                    self.inspect_arg(scope, &resolved, callee, is_sink, span, visited);
                }
            }
            _ => {}
        }
    }

    /// `require(...)` with a resolvable string specifier. Returns `None`
    /// when the argument is not string-shaped, leaving the generic
    /// call-result path to handle it.
    fn try_require(
        &mut self,
        scope: ScopeId,
        args: &[SymbolicValue],
        span: Span,
    ) -> Option<SymbolicValue> {
        let first = args.first()?;
        let spec_value = match &first.kind {
            ValueKind::Literal { .. } => first.clone(),
            _ => first
                .lookup_name()
                .and_then(|name| self.resolve_path(scope, name))?,
        };
        let ValueKind::Literal { raw } = &spec_value.kind else {
            return None;
        };
        let specifier = raw.trim_matches('\'').to_string();
        self.emit("import", &specifier, span);
        Some(self.require_value(&specifier))
    }

    /// Resolution policy for one specifier: bare specifiers stay opaque
    /// call results unless whitelisted, JSON files splice in as object
    /// shapes, and relative JavaScript files are followed in recursive
    /// mode.
    pub(crate) fn require_value(&mut self, specifier: &str) -> SymbolicValue {
        let external = || {
            SymbolicValue::new(ValueKind::CallResult {
                raw: format!("require('{specifier}')"),
                callee: Box::new(SymbolicValue::unresolved("require")),
                args: vec![SymbolicValue::literal(format!("'{specifier}'"))],
            })
        };

        if !resolver::is_relative(specifier) {
            if self
                .options
                .follow_packages
                .iter()
                .any(|name| name == specifier)
            {
                if let Some(path) = resolver::resolve_package(self.import_dir(), specifier) {
                    return self.follow_module(&path);
                }
                tracing::warn!(
                    file = %self.file_label(),
                    specifier,
                    "followed package not found"
                );
            }
            return external();
        }

        match resolver::resolve_on_disk(self.import_dir(), specifier) {
            Some(path) if resolver::is_json(&path) => match resolver::load_json(&path) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(specifier, error = %e, "json import failed");
                    SymbolicValue::undefined()
                }
            },
            Some(path) if self.options.recursive => self.follow_module(&path),
            Some(_) => external(),
            None => {
                let err = EngineError::UnresolvedModule {
                    specifier: specifier.to_string(),
                };
                tracing::warn!(file = %self.file_label(), error = %err, "import skipped");
                SymbolicValue::unresolved(format!("require('{specifier}')"))
            }
        }
    }
}

fn call_signature(func: &FunctionValue, args: &[SymbolicValue]) -> String {
    format!(
        "{}({})",
        func.name.as_deref().unwrap_or("Function"),
        args.iter()
            .map(|arg| arg.signature())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

fn call_raw(callee: &str, args: &[SymbolicValue]) -> String {
    format!(
        "{}({})",
        callee,
        args.iter()
            .map(|arg| arg.raw_name())
            .collect::<Vec<_>>()
            .join(", ")
    )
}
