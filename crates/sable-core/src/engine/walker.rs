//! Statement and module walking
//!
//! The walker runs two passes over every statement list: a hoisting pass
//! that declares function and class names, then an execution pass. Each
//! top-level statement is error-isolated; only budget exhaustion unwinds
//! past a statement boundary.

use swc_common::Span;
use swc_ecma_ast::{
    Decl, DefaultDecl, ExportSpecifier, ForHead, ImportDecl, ImportSpecifier, Module,
    ModuleDecl, ModuleExportName, ModuleItem, ObjectPatProp, Pat, PropName, Stmt,
    VarDeclOrExpr, VarDeclarator,
};

use crate::engine::eval::{param_names, pat_ident_name};
use crate::engine::scope::{ScopeId, ScopeKind};
use crate::engine::value::{SymbolicValue, ValueKind};
use crate::engine::{EngineError, Interpreter};

fn export_name_text(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(s) => s.value.to_string(),
    }
}

/// Projects a property out of a symbolic value, preserving the container's
/// taint when the shape is opaque. Destructuring and import binding both
/// go through here.
fn shape_prop(value: &SymbolicValue, key: &str) -> SymbolicValue {
    match &value.kind {
        ValueKind::Object { props } => props
            .iter()
            .find_map(|(name, prop)| (name == key).then(|| prop.clone()))
            .unwrap_or_else(|| {
                let mut missing = SymbolicValue::unresolved(key);
                missing.taint = value.taint.clone();
                missing
            }),
        ValueKind::MemberPath { path } => {
            let mut projected = SymbolicValue::member(format!("{path}.{key}"));
            projected.taint = value.taint.clone();
            projected
        }
        ValueKind::CallResult { raw, .. } => {
            let mut projected = SymbolicValue::member(format!("{raw}.{key}"));
            projected.taint = value.taint.clone();
            projected
        }
        _ => {
            let mut projected = SymbolicValue::unresolved(key);
            projected.taint = value.taint.clone();
            projected
        }
    }
}

fn shape_element(value: &SymbolicValue, index: usize) -> SymbolicValue {
    match &value.kind {
        ValueKind::Array { elements } => elements
            .get(index)
            .cloned()
            .unwrap_or_else(SymbolicValue::undefined),
        ValueKind::MemberPath { path } => {
            let mut projected = SymbolicValue::member(format!("{path}[{index}]"));
            projected.taint = value.taint.clone();
            projected
        }
        _ => {
            let mut projected = SymbolicValue::member(format!(
                "{}[{}]",
                value.raw_name(),
                index
            ));
            projected.taint = value.taint.clone();
            projected
        }
    }
}

impl<'a> Interpreter<'a> {
    pub(crate) fn walk_module(&mut self, module: &Module) -> Result<(), EngineError> {
        let root = self.scopes.root();

        for item in &module.body {
            match item {
                ModuleItem::Stmt(stmt) => {
                    let result = self.hoist_stmt_checked(root, stmt);
                    self.recover(result)?;
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                    let result = self.hoist_decl_checked(root, &export.decl);
                    self.recover(result)?;
                }
                ModuleItem::ModuleDecl(_) => {}
            }
        }

        for item in &module.body {
            match item {
                ModuleItem::Stmt(stmt) => {
                    if is_hoisted(stmt) {
                        continue;
                    }
                    let result = self.exec_stmt(root, stmt);
                    self.recover(result)?;
                }
                ModuleItem::ModuleDecl(decl) => {
                    let result = self.exec_module_decl(root, decl);
                    self.recover(result)?;
                }
            }
        }
        Ok(())
    }

    // Wrappers so the hoisting pass shares the recovery discipline.
    fn hoist_stmt_checked(
        &mut self,
        scope: ScopeId,
        stmt: &Stmt,
    ) -> Result<(), EngineError> {
        if let Stmt::Decl(decl) = stmt {
            self.hoist_decl_checked(scope, decl)?;
        }
        Ok(())
    }

    fn hoist_decl_checked(
        &mut self,
        scope: ScopeId,
        decl: &Decl,
    ) -> Result<(), EngineError> {
        match decl {
            Decl::Fn(fn_decl) => {
                let params = param_names(&fn_decl.function.params);
                let body = fn_decl
                    .function
                    .body
                    .as_ref()
                    .map(|block| block.stmts.clone())
                    .unwrap_or_default();
                self.declare_function(
                    scope,
                    Some(fn_decl.ident.sym.to_string()),
                    params,
                    body,
                    fn_decl.function.span,
                )?;
            }
            Decl::Class(class_decl) => {
                self.scopes.bind_local(
                    scope,
                    class_decl.ident.sym.to_string(),
                    SymbolicValue::object(Vec::new()),
                );
            }
            _ => {}
        }
        Ok(())
    }

    /// Statement-level error isolation. Unsupported syntax inside one
    /// statement must not silence the rest of the file.
    fn recover(&mut self, result: Result<(), EngineError>) -> Result<(), EngineError> {
        match result {
            Ok(()) => Ok(()),
            Err(e @ EngineError::BudgetExhausted { .. }) => Err(e),
            Err(e) => {
                if self.options.debug {
                    tracing::debug!(file = %self.file_label(), error = %e, "statement skipped");
                }
                Ok(())
            }
        }
    }

    /// Walks a statement list: hoist pass, then execution with the hoisted
    /// declarations skipped.
    pub(crate) fn traverse(
        &mut self,
        scope: ScopeId,
        stmts: &[Stmt],
    ) -> Result<(), EngineError> {
        for stmt in stmts {
            let result = self.hoist_stmt_checked(scope, stmt);
            self.recover(result)?;
        }
        for stmt in stmts {
            if is_hoisted(stmt) {
                continue;
            }
            let result = self.exec_stmt(scope, stmt);
            self.recover(result)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, scope: ScopeId, stmt: &Stmt) -> Result<(), EngineError> {
        self.bump()?;
        match stmt {
            Stmt::Expr(expr_stmt) => {
                self.eval(scope, &expr_stmt.expr, true)?;
                Ok(())
            }
            Stmt::Decl(decl) => self.exec_decl(scope, decl),
            Stmt::Block(block) => {
                let child = self.scopes.create_child(scope, ScopeKind::Block);
                self.traverse(child, &block.stmts)
            }
            Stmt::If(if_stmt) => {
                self.eval(scope, &if_stmt.test, true)?;
                self.exec_stmt(scope, &if_stmt.cons)?;
                if let Some(alt) = &if_stmt.alt {
                    self.exec_stmt(scope, alt)?;
                }
                Ok(())
            }
            Stmt::Return(ret) => {
                if let Some(arg) = &ret.arg {
                    let value = self.eval(scope, arg, true)?;
                    self.emit("return", &value.raw_name(), ret.span);
                }
                Ok(())
            }
            // Loop bodies are walked once; taint propagation needs reach,
            // not iteration counts.
            Stmt::While(while_stmt) => {
                self.eval(scope, &while_stmt.test, true)?;
                let child = self.scopes.create_child(scope, ScopeKind::Block);
                self.exec_stmt(child, &while_stmt.body)
            }
            Stmt::DoWhile(do_while) => {
                let child = self.scopes.create_child(scope, ScopeKind::Block);
                self.exec_stmt(child, &do_while.body)?;
                self.eval(scope, &do_while.test, true)?;
                Ok(())
            }
            Stmt::For(for_stmt) => {
                let child = self.scopes.create_child(scope, ScopeKind::Block);
                match &for_stmt.init {
                    Some(VarDeclOrExpr::VarDecl(var_decl)) => {
                        self.exec_var_decl(child, &var_decl.decls)?;
                    }
                    Some(VarDeclOrExpr::Expr(expr)) => {
                        self.eval(child, expr, true)?;
                    }
                    None => {}
                }
                if let Some(test) = &for_stmt.test {
                    self.eval(child, test, true)?;
                }
                if let Some(update) = &for_stmt.update {
                    self.eval(child, update, true)?;
                }
                self.exec_stmt(child, &for_stmt.body)
            }
            Stmt::ForIn(for_in) => {
                let right = self.eval(scope, &for_in.right, true)?;
                let child = self.scopes.create_child(scope, ScopeKind::Block);
                self.bind_for_head(child, &for_in.left, right, for_in.span)?;
                self.exec_stmt(child, &for_in.body)
            }
            Stmt::ForOf(for_of) => {
                let right = self.eval(scope, &for_of.right, true)?;
                let child = self.scopes.create_child(scope, ScopeKind::Block);
                self.bind_for_head(child, &for_of.left, right, for_of.span)?;
                self.exec_stmt(child, &for_of.body)
            }
            Stmt::Try(try_stmt) => {
                let child = self.scopes.create_child(scope, ScopeKind::Block);
                self.traverse(child, &try_stmt.block.stmts)?;
                if let Some(handler) = &try_stmt.handler {
                    let catch = self.scopes.create_child(scope, ScopeKind::Catch);
                    if let Some(param) = &handler.param {
                        self.bind_pattern(
                            catch,
                            param,
                            SymbolicValue::error(),
                            handler.body.span,
                        )?;
                    }
                    self.traverse(catch, &handler.body.stmts)?;
                }
                if let Some(finalizer) = &try_stmt.finalizer {
                    let child = self.scopes.create_child(scope, ScopeKind::Block);
                    self.traverse(child, &finalizer.stmts)?;
                }
                Ok(())
            }
            Stmt::Switch(switch) => {
                self.eval(scope, &switch.discriminant, true)?;
                let child = self.scopes.create_child(scope, ScopeKind::Block);
                for case in &switch.cases {
                    if let Some(test) = &case.test {
                        self.eval(child, test, true)?;
                    }
                    self.traverse(child, &case.cons)?;
                }
                Ok(())
            }
            Stmt::Throw(throw) => {
                self.eval(scope, &throw.arg, true)?;
                Ok(())
            }
            Stmt::Labeled(labeled) => self.exec_stmt(scope, &labeled.body),
            Stmt::With(with_stmt) => {
                self.eval(scope, &with_stmt.obj, true)?;
                self.exec_stmt(scope, &with_stmt.body)
            }
            Stmt::Empty(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Debugger(_) => Ok(()),
        }
    }

    fn exec_decl(&mut self, scope: ScopeId, decl: &Decl) -> Result<(), EngineError> {
        match decl {
            Decl::Var(var_decl) => self.exec_var_decl(scope, &var_decl.decls),
            Decl::Using(using) => self.exec_var_decl(scope, &using.decls),
            // Handled by the hoisting pass.
            Decl::Fn(_) | Decl::Class(_) => Ok(()),
            Decl::TsInterface(_) | Decl::TsTypeAlias(_) | Decl::TsEnum(_)
            | Decl::TsModule(_) => Ok(()),
        }
    }

    fn exec_var_decl(
        &mut self,
        scope: ScopeId,
        decls: &[VarDeclarator],
    ) -> Result<(), EngineError> {
        for declarator in decls {
            let value = match &declarator.init {
                Some(init) => self.eval(scope, init, true)?,
                None => SymbolicValue::undefined(),
            };
            self.bind_pattern(scope, &declarator.name, value, declarator.span)?;
        }
        Ok(())
    }

    fn bind_for_head(
        &mut self,
        scope: ScopeId,
        head: &ForHead,
        value: SymbolicValue,
        span: Span,
    ) -> Result<(), EngineError> {
        match head {
            ForHead::VarDecl(var_decl) => {
                if let Some(declarator) = var_decl.decls.first() {
                    self.bind_pattern(scope, &declarator.name, value, declarator.span)?;
                }
                Ok(())
            }
            ForHead::UsingDecl(using) => {
                if let Some(declarator) = using.decls.first() {
                    self.bind_pattern(scope, &declarator.name, value, declarator.span)?;
                }
                Ok(())
            }
            ForHead::Pat(pat) => self.bind_pattern(scope, pat, value, span),
        }
    }

    /// Destructures a binding pattern against a symbolic value.
    fn bind_pattern(
        &mut self,
        scope: ScopeId,
        pat: &Pat,
        value: SymbolicValue,
        span: Span,
    ) -> Result<(), EngineError> {
        self.bump()?;
        match pat {
            Pat::Ident(ident) => {
                let name = ident.sym.to_string();
                self.record_tainted_binding(&value, &name, span);
                self.scopes.bind_local(scope, name.clone(), value);
                self.emit("var", &name, ident.span);
                Ok(())
            }
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => {
                            let key = self.pat_key_text(scope, &kv.key)?;
                            let projected = shape_prop(&value, &key);
                            self.bind_pattern(scope, &kv.value, projected, span)?;
                        }
                        ObjectPatProp::Assign(assign) => {
                            let key = assign.key.sym.to_string();
                            let mut projected = shape_prop(&value, &key);
                            if matches!(projected.kind, ValueKind::Unresolved { .. }) {
                                if let Some(default) = &assign.value {
                                    projected = self.eval(scope, default, true)?;
                                }
                            }
                            self.record_tainted_binding(&projected, &key, span);
                            self.scopes.bind_local(scope, key.clone(), projected);
                            self.emit("var", &key, assign.span);
                        }
                        ObjectPatProp::Rest(rest) => {
                            self.bind_pattern(scope, &rest.arg, value.clone(), span)?;
                        }
                    }
                }
                Ok(())
            }
            Pat::Array(array) => {
                for (i, elem) in array.elems.iter().enumerate() {
                    if let Some(elem_pat) = elem {
                        let projected = shape_element(&value, i);
                        self.bind_pattern(scope, elem_pat, projected, span)?;
                    }
                }
                Ok(())
            }
            Pat::Assign(assign) => {
                let value = if matches!(value.kind, ValueKind::Undefined) {
                    self.eval(scope, &assign.right, true)?
                } else {
                    value
                };
                self.bind_pattern(scope, &assign.left, value, span)
            }
            Pat::Rest(rest) => self.bind_pattern(scope, &rest.arg, value, span),
            Pat::Expr(expr) => {
                if let swc_ecma_ast::Expr::Member(member) = expr.as_ref() {
                    let path = self.member_path(scope, member)?;
                    self.record_tainted_binding(&value, &path, span);
                    self.assign_path(scope, &path, value);
                }
                Ok(())
            }
            Pat::Invalid(_) => Err(EngineError::UnsupportedNode {
                kind: "invalid pattern",
            }),
        }
    }

    fn pat_key_text(&mut self, scope: ScopeId, key: &PropName) -> Result<String, EngineError> {
        Ok(match key {
            PropName::Ident(ident) => ident.sym.to_string(),
            PropName::Str(s) => s.value.to_string(),
            PropName::Num(n) => n.value.to_string(),
            PropName::BigInt(b) => b.value.to_string(),
            PropName::Computed(computed) => {
                self.eval(scope, &computed.expr, true)?.raw_name()
            }
        })
    }

    fn exec_module_decl(
        &mut self,
        scope: ScopeId,
        decl: &ModuleDecl,
    ) -> Result<(), EngineError> {
        self.bump()?;
        match decl {
            ModuleDecl::Import(import) => self.exec_import(scope, import),
            ModuleDecl::ExportDecl(export) => {
                self.exec_decl(scope, &export.decl)?;
                for name in declared_names(&export.decl) {
                    if let Some(value) = self.scopes.lookup(scope, &name).cloned() {
                        self.assign_path(scope, &format!("module.exports.{name}"), value);
                    }
                }
                Ok(())
            }
            ModuleDecl::ExportDefaultExpr(export) => {
                let value = self.eval(scope, &export.expr, true)?;
                self.assign_path(scope, "module.exports.default", value);
                Ok(())
            }
            ModuleDecl::ExportDefaultDecl(export) => match &export.decl {
                DefaultDecl::Fn(fn_expr) => {
                    let name = fn_expr.ident.as_ref().map(|ident| ident.sym.to_string());
                    let params = param_names(&fn_expr.function.params);
                    let body = fn_expr
                        .function
                        .body
                        .as_ref()
                        .map(|block| block.stmts.clone())
                        .unwrap_or_default();
                    let value = self.declare_function(
                        scope,
                        name,
                        params,
                        body,
                        fn_expr.function.span,
                    )?;
                    self.assign_path(scope, "module.exports.default", value);
                    Ok(())
                }
                DefaultDecl::Class(_) => {
                    self.assign_path(
                        scope,
                        "module.exports.default",
                        SymbolicValue::object(Vec::new()),
                    );
                    Ok(())
                }
                DefaultDecl::TsInterfaceDecl(_) => Ok(()),
            },
            ModuleDecl::ExportNamed(named) => {
                let from = named.src.as_ref().map(|src| {
                    let specifier = src.value.to_string();
                    self.emit("import", &specifier, named.span);
                    self.require_value(&specifier)
                });
                for specifier in &named.specifiers {
                    let ExportSpecifier::Named(spec) = specifier else {
                        continue;
                    };
                    let orig = export_name_text(&spec.orig);
                    let exported = spec
                        .exported
                        .as_ref()
                        .map(export_name_text)
                        .unwrap_or_else(|| orig.clone());
                    let value = match &from {
                        Some(source) => shape_prop(source, &orig),
                        None => self
                            .resolve_path(scope, &orig)
                            .unwrap_or_else(|| SymbolicValue::ident(&orig)),
                    };
                    self.assign_path(scope, &format!("module.exports.{exported}"), value);
                }
                Ok(())
            }
            ModuleDecl::ExportAll(export) => {
                let specifier = export.src.value.to_string();
                self.emit("import", &specifier, export.span);
                let value = self.require_value(&specifier);
                if let ValueKind::Object { props } = value.kind {
                    for (key, prop) in props {
                        self.assign_path(scope, &format!("module.exports.{key}"), prop);
                    }
                }
                Ok(())
            }
            ModuleDecl::TsImportEquals(_)
            | ModuleDecl::TsExportAssignment(_)
            | ModuleDecl::TsNamespaceExport(_) => Ok(()),
        }
    }

    fn exec_import(&mut self, scope: ScopeId, import: &ImportDecl) -> Result<(), EngineError> {
        let specifier = import.src.value.to_string();
        self.emit("import", &specifier, import.span);
        let value = self.require_value(&specifier);

        for spec in &import.specifiers {
            match spec {
                ImportSpecifier::Named(named) => {
                    let imported = named
                        .imported
                        .as_ref()
                        .map(export_name_text)
                        .unwrap_or_else(|| named.local.sym.to_string());
                    let bound = shape_prop(&value, &imported);
                    self.scopes
                        .bind_local(scope, named.local.sym.to_string(), bound);
                }
                ImportSpecifier::Default(default) => {
                    // CommonJS interop: a module without an explicit
                    // `default` export is itself the default.
                    let bound = match &value.kind {
                        ValueKind::Object { props }
                            if props.iter().any(|(key, _)| key == "default") =>
                        {
                            shape_prop(&value, "default")
                        }
                        _ => value.clone(),
                    };
                    self.scopes
                        .bind_local(scope, default.local.sym.to_string(), bound);
                }
                ImportSpecifier::Namespace(namespace) => {
                    self.scopes.bind_local(
                        scope,
                        namespace.local.sym.to_string(),
                        value.clone(),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Declarations the hoisting pass already executed.
fn is_hoisted(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Decl(Decl::Fn(_)) | Stmt::Decl(Decl::Class(_)))
}

fn declared_names(decl: &Decl) -> Vec<String> {
    match decl {
        Decl::Fn(fn_decl) => vec![fn_decl.ident.sym.to_string()],
        Decl::Class(class_decl) => vec![class_decl.ident.sym.to_string()],
        Decl::Var(var_decl) => var_decl
            .decls
            .iter()
            .filter_map(|declarator| pat_ident_name(&declarator.name))
            .collect(),
        _ => Vec::new(),
    }
}
