// File: src/lower/mod.rs
//
// Lowering: concrete syntax trees into the shared IR.
//
// One Lowerer walks every language's CST. What differs per language (type
// spelling, library calls, output statements, truthiness, division) comes
// from a SourceRules implementation in the language's submodule. The
// Lowerer owns the symbol table: a stack of scopes mapping each name to its
// binding, so every VarRef in the IR names a declaration visible at that
// point. Errors are collected per statement; a statement that fails to
// lower contributes nothing to the IR and the walk continues.

mod c;
mod cpp;
mod java;
mod javascript;

use crate::cst::{self, Expr, FunctionDecl, Init, Item, Stmt, TypeSpec, VarDecl};
use crate::errors::{find_closest_match, LoweringError, Position};
use crate::ir::transform::negate;
use crate::ir::typing::{expression_type, join};
use crate::ir::{
    BinOp, Block, Builtin, Expression, Function, LValue, Literal, Param, Program, Statement, Type, UnOp, ENTRY_POINT,
};
use crate::language::Language;
use crate::lexer::{decode_quoted, LiteralKind};
use ahash::{AHashMap, AHashSet};
use javascript::Inference;

pub type LResult<T> = Result<T, LoweringError>;

/// Lower a parsed program into the IR
pub fn lower(cst: &cst::Cst) -> Result<Program, Vec<LoweringError>> {
    log::debug!("lowering {} program with {} items", cst.language.tag(), cst.program.items.len());
    match cst.language {
        Language::C => Lowerer::new(&c::RULES, None).lower_program(&cst.program),
        Language::Cpp => Lowerer::new(&cpp::RULES, None).lower_program(&cst.program),
        Language::Java => Lowerer::new(&java::RULES, None).lower_program(&cst.program),
        Language::JavaScript => javascript::lower_script(&cst.program),
    }
}

/// Per-language lowering hooks
pub(crate) trait SourceRules: Sync {
    fn language(&self) -> Language;

    /// Map a written type. `Ok(None)` asks for inference from the initializer.
    fn lower_type(&self, ty: &TypeSpec) -> LResult<Option<Type>>;

    fn directive(&self, _text: &str, _pos: Position) -> LResult<()> {
        Ok(())
    }

    /// Reject parameter forms whose passing convention the IR cannot express
    fn check_param(&self, _param: &cst::ParamDecl, _body: &[Stmt]) -> LResult<()> {
        Ok(())
    }

    /// Statement-only library forms: output, swaps, input
    fn statement(&self, lw: &mut Lowerer<'_>, expr: &Expr) -> Option<LResult<Vec<Statement>>>;

    /// Library calls that map onto builtins or plain IR
    fn call(&self, lw: &mut Lowerer<'_>, callee: &Expr, args: &[Expr], pos: Position) -> Option<LResult<Expression>>;

    /// Library members: `arr.length`, `Math.PI`
    fn member(&self, lw: &mut Lowerer<'_>, object: &Expr, name: &str, pos: Position)
        -> Option<LResult<Expression>>;

    /// Library constants used as bare names: `INT_MAX`
    fn constant(&self, _name: &str) -> Option<Expression> {
        None
    }

    /// Comparison idioms such as `strcmp(a, b) == 0`
    fn comparison(&self, _lw: &mut Lowerer<'_>, _op: &str, _lhs: &Expr, _rhs: &Expr) -> Option<LResult<Expression>> {
        None
    }

    /// Numbers (and JavaScript strings) are accepted as conditions
    fn truthy_conditions(&self) -> bool {
        true
    }

    /// `/` on two integers produces a floating result
    fn floating_division(&self) -> bool {
        false
    }
}

/// One piece of an output statement
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PrintItem {
    Value(Expression),
    Newline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingKind {
    Local,
    /// JavaScript `var` declared ahead of its first use
    HoistedVar,
    /// Extra declarators of a `for` initializer, declared before the loop
    LoopHoisted,
    /// `argc`/`argv`/`args` of the entry point
    MainArgument,
}

#[derive(Debug, Clone)]
struct Binding {
    /// None while JavaScript inference has not settled on a type
    ty: Option<Type>,
    /// Declaration site; keys inferred JavaScript types
    key: Position,
    kind: BindingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    Plain,
    DoWhile,
    /// A `for` whose several step expressions move into the body
    MultiStep,
}

pub(crate) struct Lowerer<'r> {
    rules: &'r dyn SourceRules,
    language: Language,
    scopes: Vec<AHashMap<String, Binding>>,
    /// Return type per function; None while still being inferred
    functions: AHashMap<String, Option<Type>>,
    /// Java classes whose static methods are merged into the program
    classes: AHashSet<String>,
    /// Top-level variables, which only a script's own body may use
    globals: AHashSet<String>,
    current: String,
    loops: Vec<LoopKind>,
    used_names: AHashSet<String>,
    errors: Vec<LoweringError>,
    // JavaScript type inference state
    known: Option<&'r Inference>,
    observed: Inference,
    round: usize,
    finalize: bool,
}

impl<'r> Lowerer<'r> {
    fn new(rules: &'r dyn SourceRules, known: Option<&'r Inference>) -> Self {
        Lowerer {
            rules,
            language: rules.language(),
            scopes: vec![AHashMap::new()],
            functions: AHashMap::new(),
            classes: AHashSet::new(),
            globals: AHashSet::new(),
            current: String::new(),
            loops: Vec::new(),
            used_names: AHashSet::new(),
            errors: Vec::new(),
            known,
            observed: Inference::default(),
            round: 0,
            finalize: known.is_none(),
        }
    }

    fn lower_program(&mut self, program: &cst::Program) -> Result<Program, Vec<LoweringError>> {
        let mut decls: Vec<&FunctionDecl> = Vec::new();
        let mut top_level: Vec<&Stmt> = Vec::new();
        self.collect_items(&program.items, &mut decls, &mut top_level);

        let script_main = if top_level.is_empty() { None } else { self.script_main(&decls, &top_level) };
        let all: Vec<&FunctionDecl> = decls.iter().copied().chain(script_main.as_ref()).collect();

        for f in &all {
            let ret = self.signature_return(f);
            self.functions.entry(f.name.clone()).or_insert(ret);
        }

        let mut functions = Vec::new();
        for f in all {
            match self.lower_function(f) {
                Ok(Some(function)) => functions.push(function),
                Ok(None) => {}
                Err(err) => self.errors.push(err),
            }
        }

        if self.errors.is_empty() {
            log::debug!("lowered {} functions", functions.len());
            Ok(Program::new(functions))
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    fn collect_items<'a>(&mut self, items: &'a [Item], decls: &mut Vec<&'a FunctionDecl>, top_level: &mut Vec<&'a Stmt>) {
        for item in items {
            match item {
                Item::Function(f) => decls.push(f),
                Item::Class(class) => {
                    self.classes.insert(class.name.clone());
                    for member in &class.members {
                        match member {
                            Item::Function(f) if f.modifiers.iter().any(|m| m == "static") => decls.push(f),
                            Item::Function(f) => self.errors.push(LoweringError::unsupported("instance method", f.pos)),
                            Item::Statement(Stmt::Empty(_)) => {}
                            Item::Statement(stmt) => self.errors.push(LoweringError::unsupported("field", stmt.pos())),
                            Item::Unsupported { kind, pos } => self.errors.push(LoweringError::unsupported(kind, *pos)),
                            Item::Class(inner) => {
                                self.errors.push(LoweringError::unsupported("nested class", inner.pos))
                            }
                            Item::Directive { pos, .. } | Item::Using { pos, .. } => {
                                self.errors.push(LoweringError::invalid("unexpected directive in class body", *pos))
                            }
                        }
                    }
                }
                Item::Statement(Stmt::Empty(_)) => {}
                Item::Statement(stmt) if self.language == Language::JavaScript => top_level.push(stmt),
                Item::Statement(stmt) => {
                    if let Stmt::VarDecl(decl) = stmt {
                        self.globals.extend(decl.declarators.iter().map(|d| d.name.clone()));
                    }
                    self.errors.push(LoweringError::unsupported("global variable", stmt.pos()));
                }
                Item::Directive { text, pos } => {
                    if let Err(err) = self.rules.directive(text, *pos) {
                        self.errors.push(err);
                    }
                }
                Item::Using { .. } => {}
                Item::Unsupported { kind, pos } => self.errors.push(LoweringError::unsupported(kind, *pos)),
            }
        }
    }

    fn signature_return(&mut self, f: &FunctionDecl) -> Option<Type> {
        if self.language == Language::JavaScript {
            return self.js_return_type(&f.name);
        }
        if f.name == ENTRY_POINT && self.language == Language::Java {
            return Some(Type::Void);
        }
        f.return_type.as_ref().and_then(|ty| self.rules.lower_type(ty).ok().flatten())
    }

    fn lower_function(&mut self, f: &FunctionDecl) -> LResult<Option<Function>> {
        let Some(body) = &f.body else {
            // Prototype; the definition supplies the body
            return Ok(None);
        };
        self.current = f.name.clone();
        self.scopes = vec![AHashMap::new()];
        self.loops.clear();
        self.used_names.clear();
        collect_names(&body.stmts, &mut self.used_names);

        let is_entry = f.name == ENTRY_POINT;
        let mut params = Vec::new();
        for (index, param) in f.params.iter().enumerate() {
            if let Some(kind) = &param.unsupported {
                return Err(LoweringError::unsupported(kind, param.pos));
            }
            if is_entry {
                self.bind(&param.name, None, param.pos, BindingKind::MainArgument)?;
                continue;
            }
            self.rules.check_param(param, &body.stmts)?;
            let ty = match &param.ty {
                Some(spec) => self.rules.lower_type(spec)?.ok_or_else(|| {
                    LoweringError::invalid(format!("cannot infer the type of parameter '{}'", param.name), param.pos)
                })?,
                None => match self.js_param_type(&f.name, index) {
                    Some(ty) => ty,
                    None => Type::Double,
                },
            };
            let binding_ty = if param.ty.is_some() || self.finalize || self.js_param_known(&f.name, index) {
                Some(ty.clone())
            } else {
                None
            };
            self.bind(&param.name, binding_ty, param.pos, BindingKind::Local)?;
            params.push(Param::new(param.name.clone(), ty));
        }

        let return_type = match self.functions.get(&f.name).cloned().flatten() {
            Some(ty) => ty,
            None => match &f.return_type {
                Some(spec) => self.rules.lower_type(spec)?.ok_or_else(|| {
                    LoweringError::invalid(format!("cannot infer the return type of '{}'", f.name), f.pos)
                })?,
                None => Type::Double,
            },
        };

        let mut statements = Vec::new();
        if self.language == Language::JavaScript {
            statements.extend(self.hoist_vars(&body.stmts));
        }
        statements.extend(self.lower_statements(&body.stmts));

        Ok(Some(Function { name: f.name.clone(), params, return_type, body: Block::new(statements) }))
    }

    // ----- scopes -----

    fn push_scope(&mut self) {
        self.scopes.push(AHashMap::new());
    }

    fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn bind(&mut self, name: &str, ty: Option<Type>, key: Position, kind: BindingKind) -> LResult<()> {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };
        if scope.contains_key(name) {
            return Err(LoweringError::DuplicateDeclaration { name: name.to_string(), position: key });
        }
        scope.insert(name.to_string(), Binding { ty, key, kind });
        Ok(())
    }

    /// Candidate names for "did you mean" hints
    fn visible_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scopes.iter().flat_map(|s| s.keys().map(String::as_str)).collect();
        names.extend(self.functions.keys().map(String::as_str));
        names.sort_unstable();
        names.dedup();
        names
    }

    /// A user function not shadowed by a local
    pub(crate) fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name) && self.lookup(name).is_none()
    }

    /// A name unused anywhere in the current function
    pub(crate) fn fresh_name(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 1;
        while self.used_names.contains(&candidate) || self.lookup(&candidate).is_some() {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        self.used_names.insert(candidate.clone());
        candidate
    }

    /// Type of an IR expression under the current bindings
    pub(crate) fn type_of(&self, expr: &Expression) -> Option<Type> {
        expression_type(
            expr,
            &|name| self.lookup(name).and_then(|b| b.ty.clone()),
            &|name| self.functions.get(name).cloned().flatten(),
        )
    }

    // ----- statements -----

    fn lower_statements(&mut self, stmts: &[Stmt]) -> Vec<Statement> {
        let mut out = Vec::new();
        for stmt in stmts {
            match self.lower_statement(stmt) {
                Ok(lowered) => out.extend(lowered),
                Err(err) => self.errors.push(err),
            }
        }
        out
    }

    /// A branch or loop body in its own scope
    fn lower_branch(&mut self, stmt: &Stmt) -> Block {
        self.push_scope();
        let statements = match stmt {
            Stmt::Block(block) => self.lower_statements(&block.stmts),
            other => self.lower_statements(std::slice::from_ref(other)),
        };
        self.pop_scope();
        Block::new(statements)
    }

    fn lower_loop_body(&mut self, kind: LoopKind, body: &Stmt) -> Block {
        self.loops.push(kind);
        let block = self.lower_branch(body);
        self.loops.pop();
        block
    }

    fn lower_statement(&mut self, stmt: &Stmt) -> LResult<Vec<Statement>> {
        match stmt {
            Stmt::VarDecl(decl) => self.lower_var_decl(decl),
            Stmt::If { cond, then_branch, else_branch, .. } => {
                let cond = self.lower_condition(cond)?;
                let then_block = self.lower_branch(then_branch);
                let else_block = else_branch.as_ref().map(|b| self.lower_branch(b));
                Ok(vec![Statement::If { cond, then_block, else_block }])
            }
            Stmt::While { cond, body, .. } => {
                let cond = self.lower_condition(cond)?;
                let body = self.lower_loop_body(LoopKind::Plain, body);
                Ok(vec![Statement::While { cond, body }])
            }
            Stmt::DoWhile { body, cond, .. } => {
                // do { body } while (c)  =>  while (true) { body; if (!c) break; }
                let mut body = self.lower_loop_body(LoopKind::DoWhile, body);
                let cond = self.lower_condition(cond)?;
                body.statements.push(Statement::If {
                    cond: negate(&cond),
                    then_block: Block::new(vec![Statement::Break]),
                    else_block: None,
                });
                Ok(vec![Statement::While { cond: Expression::bool(true), body }])
            }
            Stmt::For { init, cond, step, body, .. } => self.lower_for(init.as_deref(), cond.as_ref(), step, body),
            Stmt::ForEach { keyword, ty, name, iterable, body, pos } => {
                self.lower_foreach(keyword.as_deref(), ty.as_ref(), name, iterable, body, *pos)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(e) => {
                        let lowered = self.lower_expr(e)?;
                        let ty = self.type_of(&lowered);
                        let current = self.current.clone();
                        self.observe_return(&current, ty);
                        Some(lowered)
                    }
                    None => None,
                };
                Ok(vec![Statement::Return(value)])
            }
            Stmt::Break(_) => Ok(vec![Statement::Break]),
            Stmt::Continue(pos) => match self.loops.last() {
                Some(LoopKind::DoWhile) => Err(LoweringError::unsupported("continue inside do-while", *pos)),
                Some(LoopKind::MultiStep) => {
                    Err(LoweringError::unsupported("continue in a loop with several step expressions", *pos))
                }
                _ => Ok(vec![Statement::Continue]),
            },
            Stmt::Expr { expr, pos } => self.lower_expr_stmt(expr, *pos),
            Stmt::Block(block) => {
                self.push_scope();
                let statements = self.lower_statements(&block.stmts);
                self.pop_scope();
                Ok(vec![Statement::Block(Block::new(statements))])
            }
            Stmt::Goto { pos, .. } => Err(LoweringError::unsupported("goto", *pos)),
            Stmt::Label { pos, .. } => Err(LoweringError::unsupported("label", *pos)),
            Stmt::Empty(_) => Ok(Vec::new()),
            Stmt::Unsupported { kind, pos } => Err(LoweringError::unsupported(kind, *pos)),
        }
    }

    fn lower_var_decl(&mut self, decl: &VarDecl) -> LResult<Vec<Statement>> {
        let base = match &decl.ty {
            Some(spec) => self.rules.lower_type(spec)?,
            None => None,
        };
        let is_var = self.language == Language::JavaScript && decl.keyword.as_deref() == Some("var");

        let mut out = Vec::new();
        for d in &decl.declarators {
            let mut declared = base.clone();
            for _ in &d.array_suffix {
                declared = declared.map(Type::array_of);
            }

            let mut init = match &d.init {
                None => self.default_array(declared.as_ref(), &d.array_suffix, d.pos)?,
                Some(Init::Expr(e)) => Some(self.lower_expr(e)?),
                Some(Init::List(items, pos)) => Some(self.lower_init_list(declared.as_ref(), &d.array_suffix, items, *pos)?),
                Some(Init::Ctor(args, pos)) => Some(self.lower_ctor(declared.as_ref(), args, *pos)?),
            };
            let init_ty = init.as_ref().and_then(|e| self.type_of(e));

            // char name[] = "text" is a string
            if declared == Some(Type::array_of(Type::Char)) && init_ty == Some(Type::String) {
                declared = Some(Type::String);
            }

            // JavaScript `var` redeclaring a function-scoped name is an assignment
            if is_var {
                if let Some(binding) = self.scopes[0].get(&d.name).cloned() {
                    if binding.kind == BindingKind::HoistedVar || self.scopes.len() == 1 {
                        self.observe_var(binding.key, init_ty);
                        if let Some(value) = init {
                            out.push(Statement::Assign { target: LValue::Var(d.name.clone()), value });
                        }
                        continue;
                    }
                }
            }

            let ty = match declared {
                Some(ty) => Some(ty),
                None if self.language == Language::JavaScript => self.js_var_type(d.pos, init_ty.clone()),
                None => match init_ty.clone() {
                    Some(ty) => Some(ty),
                    None => {
                        return Err(LoweringError::invalid(
                            format!("cannot infer the type of '{}'", d.name),
                            d.pos,
                        ))
                    }
                },
            };
            self.observe_var(d.pos, init_ty);
            if self.language == Language::JavaScript {
                self.retype_array_init(&mut init, ty.as_ref());
            }
            self.bind(&d.name, ty.clone(), d.pos, BindingKind::Local)?;
            out.push(Statement::Declare { name: d.name.clone(), ty: ty.unwrap_or(Type::Double), init });
        }
        Ok(out)
    }

    /// `int a[5];` is a zero-filled array of five
    fn default_array(&mut self, declared: Option<&Type>, suffix: &[Option<Expr>], pos: Position) -> LResult<Option<Expression>> {
        let Some(Type::Array(elem)) = declared else {
            return Ok(None);
        };
        match suffix.first() {
            Some(Some(len)) => Ok(Some(Expression::ArrayNew { elem: (**elem).clone(), len: Box::new(self.lower_expr(len)?) })),
            Some(None) => Err(LoweringError::invalid("array declared without a size or initializer", pos)),
            // Typed arrays without a size (`int[] a;`) stay unassigned
            None => Ok(None),
        }
    }

    fn lower_init_list(&mut self, declared: Option<&Type>, suffix: &[Option<Expr>], items: &[Expr], pos: Position) -> LResult<Expression> {
        let Some(Type::Array(elem)) = declared else {
            return Err(LoweringError::unsupported("brace initializer for a non-array", pos));
        };
        let elem = (**elem).clone();
        let mut lowered = items.iter().map(|e| self.lower_expr(e)).collect::<LResult<Vec<_>>>()?;

        // C arrays with an explicit size are zero-padded
        if let Some(Some(size)) = suffix.first() {
            let size_expr = self.lower_expr(size)?;
            let zero = Literal::zero_of(&elem).map(Expression::Literal);
            let all_zero = lowered.iter().all(is_zero_literal);
            if all_zero {
                return Ok(Expression::ArrayNew { elem, len: Box::new(size_expr) });
            }
            if let Expression::Literal(Literal::Int(n)) = size_expr {
                let n = usize::try_from(n).unwrap_or(0);
                if lowered.len() > n {
                    return Err(LoweringError::invalid("too many initializers for array", pos));
                }
                if let Some(zero) = zero {
                    lowered.resize(n, zero);
                }
            } else {
                return Err(LoweringError::unsupported("initializer list with a computed array size", pos));
            }
        }
        Ok(Expression::ArrayLiteral { elem, items: lowered })
    }

    /// C++ constructor syntax: `vector<int> v(n)`, `vector<int> v(n, 0)`, `int x(5)`
    fn lower_ctor(&mut self, declared: Option<&Type>, args: &[Expr], pos: Position) -> LResult<Expression> {
        match (declared, args) {
            (Some(Type::Array(elem)), [len]) => {
                Ok(Expression::ArrayNew { elem: (**elem).clone(), len: Box::new(self.lower_expr(len)?) })
            }
            (Some(Type::Array(elem)), [len, fill]) => {
                let fill = self.lower_expr(fill)?;
                if !is_zero_literal(&fill) {
                    return Err(LoweringError::unsupported("vector fill value other than zero", pos));
                }
                Ok(Expression::ArrayNew { elem: (**elem).clone(), len: Box::new(self.lower_expr(len)?) })
            }
            (Some(_), [value]) => self.lower_expr(value),
            _ => Err(LoweringError::unsupported("constructor call", pos)),
        }
    }

    fn lower_for(&mut self, init: Option<&Stmt>, cond: Option<&Expr>, step: &[Expr], body: &Stmt) -> LResult<Vec<Statement>> {
        let mut out = Vec::new();

        // Several declarators or expressions cannot share the IR's single
        // init slot; they run before the loop instead.
        let single_init = match init {
            Some(Stmt::VarDecl(decl)) if decl.declarators.len() > 1 => {
                out.extend(self.hoist_loop_declarations(decl)?);
                false
            }
            Some(Stmt::Block(block)) => {
                for s in &block.stmts {
                    out.extend(self.lower_statement(s)?);
                }
                false
            }
            Some(_) => true,
            None => false,
        };

        self.push_scope();
        let result = self.lower_for_scoped(if single_init { init } else { None }, cond, step, body);
        self.pop_scope();
        out.extend(result?);
        Ok(out)
    }

    fn lower_for_scoped(&mut self, init: Option<&Stmt>, cond: Option<&Expr>, step: &[Expr], body: &Stmt) -> LResult<Vec<Statement>> {
        let mut prelude = Vec::new();
        let init = match init {
            Some(stmt) => {
                let mut lowered = self.lower_statement(stmt)?;
                if lowered.len() == 1 {
                    lowered.pop().map(Box::new)
                } else {
                    prelude = lowered;
                    None
                }
            }
            None => None,
        };
        let cond = match cond {
            Some(c) => self.lower_condition(c)?,
            None => Expression::bool(true),
        };
        let mut steps = Vec::new();
        for e in step {
            steps.extend(self.lower_expr_stmt(e, e.pos())?);
        }

        if steps.len() <= 1 {
            let body = self.lower_loop_body(LoopKind::Plain, body);
            let step = steps.pop().map(Box::new);
            prelude.push(Statement::For { init, cond, step, body });
            return Ok(prelude);
        }

        // for (init; c; a, b) body  =>  init; while (c) { body; a; b; }
        let mut body = self.lower_loop_body(LoopKind::MultiStep, body);
        body.statements.extend(steps);
        prelude.extend(init.map(|s| *s));
        prelude.push(Statement::While { cond, body });
        Ok(prelude)
    }

    /// `for (int i = 0, j = n; ...)`: declarations before the loop, reused by
    /// later loops declaring the same names with the same types
    fn hoist_loop_declarations(&mut self, decl: &VarDecl) -> LResult<Vec<Statement>> {
        let mut out = Vec::new();
        for stmt in self.lower_var_decl_unbound(decl)? {
            let Statement::Declare { name, ty, init } = stmt else {
                out.push(stmt);
                continue;
            };
            let reusable = self
                .scopes
                .last()
                .and_then(|s| s.get(&name))
                .map_or(false, |b| b.kind == BindingKind::LoopHoisted && b.ty.as_ref() == Some(&ty));
            if reusable {
                if let Some(value) = init {
                    out.push(Statement::Assign { target: LValue::Var(name), value });
                }
                continue;
            }
            let pos = decl.pos;
            self.bind(&name, Some(ty.clone()), pos, BindingKind::LoopHoisted)?;
            out.push(Statement::Declare { name, ty, init });
        }
        Ok(out)
    }

    /// Lower declarators without binding them in the current scope
    fn lower_var_decl_unbound(&mut self, decl: &VarDecl) -> LResult<Vec<Statement>> {
        self.push_scope();
        let result = self.lower_var_decl(decl);
        self.pop_scope();
        result
    }

    fn lower_foreach(
        &mut self,
        keyword: Option<&str>,
        ty: Option<&TypeSpec>,
        name: &str,
        iterable: &Expr,
        body: &Stmt,
        pos: Position,
    ) -> LResult<Vec<Statement>> {
        let iter = self.lower_expr(iterable)?;
        let Expression::VarRef(array) = &iter else {
            return Err(LoweringError::unsupported("for-each over an expression", pos));
        };
        let elem = match self.type_of(&iter) {
            Some(Type::Array(elem)) => Some(*elem),
            Some(Type::String) => Some(Type::Char),
            Some(other) => return Err(LoweringError::invalid(format!("cannot iterate over a value of type {}", other), pos)),
            None => None,
        };
        let declared = match ty {
            Some(spec) => self.rules.lower_type(spec)?.or_else(|| elem.clone()),
            None => elem.clone(),
        };

        let index = self.fresh_name("i");
        self.push_scope();
        self.bind(&index, Some(Type::Int), pos, BindingKind::Local)?;

        let element = Expression::Index {
            array: Box::new(Expression::var(array.clone())),
            index: Box::new(Expression::var(index.clone())),
        };
        let hoisted = keyword == Some("var")
            && self.lookup(name).map_or(false, |b| b.kind == BindingKind::HoistedVar);
        let head = if hoisted {
            let key = self.lookup(name).map(|b| b.key).unwrap_or(pos);
            self.observe_var(key, elem.clone());
            Statement::Assign { target: LValue::Var(name.to_string()), value: element }
        } else {
            self.push_scope();
            let ty = declared.clone().or_else(|| self.finalize.then_some(Type::Double));
            self.observe_var(pos, elem.clone());
            if let Err(err) = self.bind(name, ty.clone(), pos, BindingKind::Local) {
                self.pop_scope();
                self.pop_scope();
                return Err(err);
            }
            Statement::Declare { name: name.to_string(), ty: ty.unwrap_or(Type::Double), init: Some(element) }
        };

        let mut body = self.lower_loop_body(LoopKind::Plain, body);
        body.statements.insert(0, head);
        if !hoisted {
            self.pop_scope();
        }
        self.pop_scope();

        let bound = Expression::builtin(Builtin::Len, vec![Expression::var(array.clone())]);
        Ok(vec![Statement::For {
            init: Some(Box::new(Statement::Declare { name: index.clone(), ty: Type::Int, init: Some(Expression::int(0)) })),
            cond: Expression::binary(BinOp::Lt, Expression::var(index.clone()), bound),
            step: Some(Box::new(increment(LValue::Var(index), BinOp::Add, &Type::Int))),
            body,
        }])
    }

    fn lower_expr_stmt(&mut self, expr: &Expr, pos: Position) -> LResult<Vec<Statement>> {
        let rules = self.rules;
        if let Some(lowered) = rules.statement(self, expr) {
            return lowered;
        }
        match expr {
            Expr::Assign { op, target, value, pos } => Ok(vec![self.lower_assign(op, target, value, *pos)?]),
            Expr::Postfix { op, operand, .. } => Ok(vec![self.lower_increment(op, operand)?]),
            Expr::Unary { op, operand, .. } if op == "++" || op == "--" => {
                Ok(vec![self.lower_increment(op, operand)?])
            }
            Expr::Call { .. } => Ok(vec![Statement::Expr(self.lower_expr(expr)?)]),
            // "use strict" and other bare string directives
            Expr::Literal { kind: LiteralKind::String, .. } if self.language == Language::JavaScript => Ok(Vec::new()),
            _ => Err(LoweringError::unsupported("expression statement without effect", pos)),
        }
    }

    fn lower_assign(&mut self, op: &str, target: &Expr, value: &Expr, pos: Position) -> LResult<Statement> {
        let target = self.lower_lvalue(target)?;
        let rhs = self.lower_expr(value)?;
        let value = if op == "=" {
            rhs
        } else {
            let bin = compound_operator(op).ok_or_else(|| LoweringError::unsupported(format!("'{}' assignment", op), pos))?;
            self.make_binary(bin, target.to_expression(), rhs)
        };
        self.observe_assignment(&target, &value);
        Ok(Statement::Assign { target, value })
    }

    fn lower_increment(&mut self, op: &str, operand: &Expr) -> LResult<Statement> {
        let target = self.lower_lvalue(operand)?;
        let ty = self.type_of(&target.to_expression()).unwrap_or(Type::Int);
        let bin = if op == "++" { BinOp::Add } else { BinOp::Sub };
        Ok(increment(target, bin, &ty))
    }

    fn lower_lvalue(&mut self, target: &Expr) -> LResult<LValue> {
        match target {
            Expr::Identifier { name, pos } => match self.resolve(name, *pos)? {
                Expression::VarRef(name) => Ok(LValue::Var(name)),
                _ => Err(LoweringError::unsupported("assignment to a constant", *pos)),
            },
            Expr::Index { object, index, pos } => match object.as_ref() {
                Expr::Identifier { name, pos: name_pos } => {
                    self.resolve(name, *name_pos)?;
                    let index = self.lower_expr(index)?;
                    Ok(LValue::Index { array: name.clone(), index })
                }
                _ => Err(LoweringError::unsupported("assignment through a nested index", *pos)),
            },
            other => Err(LoweringError::unsupported("assignment target", other.pos())),
        }
    }

    // ----- output -----

    /// Turn output pieces into print/println calls: string concatenations
    /// are split, embedded newlines become println, adjacent text merges.
    pub(crate) fn print_statements(&self, items: Vec<PrintItem>) -> Vec<Statement> {
        let mut normalized = Vec::new();
        for item in items {
            match item {
                PrintItem::Value(value) => {
                    let mut parts = Vec::new();
                    self.flatten_concat(value, &mut parts);
                    for part in parts {
                        push_output(&mut normalized, part);
                    }
                }
                PrintItem::Newline => normalized.push(PrintItem::Newline),
            }
        }

        let mut out = Vec::new();
        let mut pending: Vec<Expression> = Vec::new();
        for item in normalized {
            match item {
                PrintItem::Value(value) => pending.push(value),
                PrintItem::Newline => match pending.pop() {
                    Some(last) => {
                        for value in pending.drain(..) {
                            out.push(Statement::Expr(Expression::builtin(Builtin::Print, vec![value])));
                        }
                        out.push(Statement::Expr(Expression::builtin(Builtin::Println, vec![last])));
                    }
                    None => out.push(Statement::Expr(Expression::builtin(Builtin::Println, Vec::new()))),
                },
            }
        }
        for value in pending {
            out.push(Statement::Expr(Expression::builtin(Builtin::Print, vec![value])));
        }
        out
    }

    fn flatten_concat(&self, value: Expression, out: &mut Vec<Expression>) {
        let is_string = self.type_of(&value) == Some(Type::String);
        match value {
            Expression::Binary { op: BinOp::Add, lhs, rhs } if is_string => {
                self.flatten_concat(*lhs, out);
                self.flatten_concat(*rhs, out);
            }
            other => out.push(other),
        }
    }

    /// printf-style format strings, shared by C, C++ and Java
    pub(crate) fn format_items(&mut self, format: &Expr, args: &[Expr], pos: Position) -> LResult<Vec<PrintItem>> {
        let Expr::Literal { kind: LiteralKind::String, raw, .. } = format else {
            return Err(LoweringError::unsupported("non-literal format string", pos));
        };
        let text = decode_quoted(raw).map_err(|msg| LoweringError::invalid(msg, pos))?;

        let mut items = Vec::new();
        let mut literal = String::new();
        let mut remaining = args.iter();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            let mut spec = String::new();
            while let Some(&n) = chars.peek() {
                if "-+ #0123456789.".contains(n) {
                    spec.push(n);
                    chars.next();
                } else {
                    break;
                }
            }
            while chars.peek().map_or(false, |n| "hlLzjt".contains(*n)) {
                chars.next();
            }
            let conv = chars.next().ok_or_else(|| LoweringError::invalid("incomplete format specifier", pos))?;
            match conv {
                '%' => literal.push('%'),
                'n' if self.language == Language::Java => {
                    flush_literal(&mut literal, &mut items);
                    items.push(PrintItem::Newline);
                }
                // Conversions whose text no target's plain output reproduces
                'f' | 'F' | 'e' | 'E' | 'G' | 'u' | 'a' | 'A' => {
                    return Err(LoweringError::unsupported(format!("format conversion '%{}'", conv), pos));
                }
                'd' | 'i' | 'g' | 's' | 'c' | 'b' => {
                    if !spec.is_empty() {
                        return Err(LoweringError::unsupported("format width or precision", pos));
                    }
                    let arg = remaining.next().ok_or_else(|| {
                        LoweringError::invalid(format!("format string needs more than {} argument(s)", args.len()), pos)
                    })?;
                    flush_literal(&mut literal, &mut items);
                    let mut value = self.lower_expr(arg)?;
                    let ty = self.type_of(&value);
                    match (conv, &ty) {
                        ('d' | 'i', Some(Type::Bool)) => {
                            value = Expression::Ternary {
                                cond: Box::new(value),
                                then: Box::new(Expression::int(1)),
                                otherwise: Box::new(Expression::int(0)),
                            };
                        }
                        ('d' | 'i', Some(Type::Char)) => value = Expression::cast(Type::Int, value),
                        ('c', Some(code)) if code.is_integral() => {
                            value = Expression::cast(Type::Char, value);
                        }
                        ('c', Some(Type::Char)) => {}
                        ('c', _) => return Err(LoweringError::unsupported("'%c' of a non-integer value", pos)),
                        _ => {}
                    }
                    items.push(PrintItem::Value(value));
                }
                other => return Err(LoweringError::unsupported(format!("format conversion '%{}'", other), pos)),
            }
        }
        flush_literal(&mut literal, &mut items);
        if remaining.next().is_some() {
            return Err(LoweringError::invalid("more arguments than format conversions", pos));
        }
        Ok(items)
    }

    // ----- expressions -----

    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> LResult<Expression> {
        match expr {
            Expr::Literal { kind, raw, pos } => self.lower_literal(*kind, raw, *pos),
            Expr::Bool { value, .. } => Ok(Expression::bool(*value)),
            Expr::Null(pos) => Err(LoweringError::unsupported("null", *pos)),
            Expr::Identifier { name, pos } => self.resolve(name, *pos),
            Expr::Binary { op, lhs, rhs, pos } => self.lower_binary(op, lhs, rhs, *pos),
            Expr::Unary { op, operand, pos } => self.lower_unary(op, operand, *pos),
            Expr::Postfix { pos, .. } => Err(LoweringError::unsupported("increment inside an expression", *pos)),
            Expr::Assign { pos, .. } => Err(LoweringError::unsupported("assignment inside an expression", *pos)),
            Expr::Call { callee, args, pos } => self.lower_call(callee, args, *pos),
            Expr::Member { object, name, pos } => {
                let rules = self.rules;
                match rules.member(self, object, name, *pos) {
                    Some(result) => result,
                    None => Err(LoweringError::unsupported("member access", *pos)),
                }
            }
            Expr::Index { object, index, .. } => Ok(Expression::Index {
                array: Box::new(self.lower_expr(object)?),
                index: Box::new(self.lower_expr(index)?),
            }),
            Expr::Ternary { cond, then, otherwise, .. } => Ok(Expression::Ternary {
                cond: Box::new(self.lower_condition(cond)?),
                then: Box::new(self.lower_expr(then)?),
                otherwise: Box::new(self.lower_expr(otherwise)?),
            }),
            Expr::Cast { ty, expr, pos } => {
                let ty = self
                    .rules
                    .lower_type(ty)?
                    .ok_or_else(|| LoweringError::invalid("cast to an inferred type", *pos))?;
                Ok(Expression::cast(ty, self.lower_expr(expr)?))
            }
            Expr::New { class, pos, .. } if class == "Array" => {
                Err(LoweringError::unsupported("new Array without fill", *pos))
            }
            Expr::New { pos, .. } => Err(LoweringError::unsupported("object construction", *pos)),
            Expr::NewArray { pos, .. } if self.language == Language::Cpp => {
                Err(LoweringError::unsupported("heap allocation", *pos))
            }
            Expr::NewArray { elem, len: Some(_), init: None, pos } if elem.array_dims > 0 => {
                Err(LoweringError::unsupported("multi-dimensional array creation", *pos))
            }
            Expr::NewArray { elem, len, init, pos } => {
                let elem = self
                    .rules
                    .lower_type(elem)?
                    .ok_or_else(|| LoweringError::invalid("array of an inferred type", *pos))?;
                match (len, init) {
                    (_, Some(items)) => {
                        let items = items.iter().map(|e| self.lower_expr(e)).collect::<LResult<Vec<_>>>()?;
                        Ok(Expression::ArrayLiteral { elem, items })
                    }
                    (Some(len), None) => Ok(Expression::ArrayNew { elem, len: Box::new(self.lower_expr(len)?) }),
                    (None, None) => Err(LoweringError::invalid("array creation needs a length or initializer", *pos)),
                }
            }
            Expr::ArrayLiteral { items, .. } => {
                let items = items.iter().map(|e| self.lower_expr(e)).collect::<LResult<Vec<_>>>()?;
                let elem = items
                    .iter()
                    .filter_map(|e| self.type_of(e))
                    .reduce(|a, b| join(&a, &b).unwrap_or(a))
                    .unwrap_or(Type::Double);
                Ok(Expression::ArrayLiteral { elem, items })
            }
            Expr::Sizeof { pos, .. } => Err(LoweringError::unsupported("sizeof", *pos)),
            Expr::Unsupported { kind, pos } => Err(LoweringError::unsupported(kind, *pos)),
        }
    }

    fn resolve(&mut self, name: &str, pos: Position) -> LResult<Expression> {
        if let Some(binding) = self.lookup(name) {
            if binding.kind == BindingKind::MainArgument {
                return Err(LoweringError::unsupported("command-line arguments", pos));
            }
            return Ok(Expression::var(name));
        }
        if let Some(constant) = self.rules.constant(name) {
            return Ok(constant);
        }
        if self.functions.contains_key(name) {
            return Err(LoweringError::unsupported("function reference", pos));
        }
        if self.globals.contains(name) {
            return Err(LoweringError::unsupported("global variable", pos));
        }
        let suggestion = find_closest_match(name, self.visible_names());
        Err(LoweringError::UndeclaredIdentifier { name: name.to_string(), position: pos, suggestion })
    }

    /// A condition, with numbers (and JavaScript strings) compared against zero
    pub(crate) fn lower_condition(&mut self, expr: &Expr) -> LResult<Expression> {
        let lowered = self.lower_expr(expr)?;
        Ok(self.truthy(lowered))
    }

    fn truthy(&self, expr: Expression) -> Expression {
        if !self.rules.truthy_conditions() {
            return expr;
        }
        // `while (1)` must stay recognisable as an infinite loop
        match &expr {
            Expression::Literal(Literal::Int(v) | Literal::Long(v)) => return Expression::bool(*v != 0),
            Expression::Literal(Literal::Float(v) | Literal::Double(v)) => return Expression::bool(*v != 0.0),
            _ => {}
        }
        match self.type_of(&expr) {
            Some(ty) if ty.is_numeric() => match Literal::zero_of(&ty) {
                Some(zero) => Expression::binary(BinOp::Ne, expr, Expression::Literal(zero)),
                None => expr,
            },
            Some(Type::String) if self.language == Language::JavaScript => Expression::binary(
                BinOp::Ne,
                Expression::builtin(Builtin::Len, vec![expr]),
                Expression::int(0),
            ),
            _ => expr,
        }
    }

    fn lower_binary(&mut self, op: &str, lhs: &Expr, rhs: &Expr, pos: Position) -> LResult<Expression> {
        // sizeof(a) / sizeof(a[0])
        if op == "/" {
            if let (Expr::Sizeof { operand: whole, .. }, Expr::Sizeof { operand: part, .. }) = (lhs, rhs) {
                if let Some((name, name_pos)) = array_length_idiom(whole, part) {
                    let array = self.resolve(name, name_pos)?;
                    return Ok(Expression::builtin(Builtin::Len, vec![array]));
                }
            }
        }
        let rules = self.rules;
        if let Some(result) = rules.comparison(self, op, lhs, rhs) {
            return result;
        }

        let bin = match op {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "%" => BinOp::Rem,
            "==" | "===" => BinOp::Eq,
            "!=" | "!==" => BinOp::Ne,
            "<" => BinOp::Lt,
            "<=" => BinOp::Le,
            ">" => BinOp::Gt,
            ">=" => BinOp::Ge,
            "&&" => BinOp::And,
            "||" => BinOp::Or,
            "&" => BinOp::BitAnd,
            "|" => BinOp::BitOr,
            "^" => BinOp::BitXor,
            "<<" => BinOp::Shl,
            ">>" => BinOp::Shr,
            ">>>" => return Err(LoweringError::unsupported("unsigned right shift", pos)),
            other => return Err(LoweringError::unsupported(format!("'{}' operator", other), pos)),
        };
        let (l, r) = if bin.is_logical() {
            (self.lower_condition(lhs)?, self.lower_condition(rhs)?)
        } else {
            (self.lower_expr(lhs)?, self.lower_expr(rhs)?)
        };
        Ok(self.make_binary(bin, l, r))
    }

    /// Build a binary node, applying the source language's operator semantics
    pub(crate) fn make_binary(&self, op: BinOp, lhs: Expression, rhs: Expression) -> Expression {
        let (lhs, rhs) = if op.is_comparison() || op.is_equality() {
            let lt = self.type_of(&lhs);
            let rt = self.type_of(&rhs);
            (char_literal_for(lhs, rt.as_ref()), char_literal_for(rhs, lt.as_ref()))
        } else {
            (lhs, rhs)
        };
        if op == BinOp::Div && self.rules.floating_division() {
            let both_integral = matches!(
                (self.type_of(&lhs), self.type_of(&rhs)),
                (Some(a), Some(b)) if a.is_integral() && b.is_integral()
            );
            if both_integral {
                return Expression::binary(BinOp::Div, Expression::cast(Type::Double, lhs), rhs);
            }
        }
        Expression::binary(op, lhs, rhs)
    }

    fn lower_unary(&mut self, op: &str, operand: &Expr, pos: Position) -> LResult<Expression> {
        match op {
            "-" => {
                let value = self.lower_expr(operand)?;
                Ok(match value {
                    Expression::Literal(Literal::Int(v)) => Expression::Literal(Literal::Int(-v)),
                    Expression::Literal(Literal::Long(v)) => Expression::Literal(Literal::Long(-v)),
                    Expression::Literal(Literal::Float(v)) => Expression::Literal(Literal::Float(-v)),
                    Expression::Literal(Literal::Double(v)) => Expression::Literal(Literal::Double(-v)),
                    other => Expression::unary(UnOp::Neg, other),
                })
            }
            "+" => self.lower_expr(operand),
            "!" => {
                let value = self.lower_expr(operand)?;
                let numeric = self.type_of(&value).filter(|t| t.is_numeric());
                match numeric {
                    Some(ty) if self.rules.truthy_conditions() => match Literal::zero_of(&ty) {
                        Some(zero) => Ok(Expression::binary(BinOp::Eq, value, Expression::Literal(zero))),
                        None => Ok(Expression::unary(UnOp::Not, value)),
                    },
                    _ => Ok(Expression::unary(UnOp::Not, self.truthy(value))),
                }
            }
            "~" => Ok(Expression::unary(UnOp::BitNot, self.lower_expr(operand)?)),
            "++" | "--" => Err(LoweringError::unsupported("increment inside an expression", pos)),
            other => Err(LoweringError::unsupported(format!("'{}' operator", other), pos)),
        }
    }

    fn lower_call(&mut self, callee: &Expr, args: &[Expr], pos: Position) -> LResult<Expression> {
        if let Expr::Identifier { name, .. } = callee {
            if self.is_function(name) {
                return self.user_call(name, args);
            }
        }
        let rules = self.rules;
        if let Some(result) = rules.call(self, callee, args, pos) {
            return result;
        }
        match callee {
            // Unknown targets are left for the validator to report
            Expr::Identifier { name, .. } => self.user_call(name, args),
            Expr::Member { object, name, .. } => {
                let qualified = object.path().map_or(false, |class| self.classes.contains(&class));
                if qualified {
                    return self.user_call(name, args);
                }
                Err(LoweringError::unsupported(format!("method call '.{}'", name), pos))
            }
            _ => Err(LoweringError::unsupported("indirect call", pos)),
        }
    }

    fn user_call(&mut self, name: &str, args: &[Expr]) -> LResult<Expression> {
        let args = args.iter().map(|a| self.lower_expr(a)).collect::<LResult<Vec<_>>>()?;
        for (index, arg) in args.iter().enumerate() {
            let ty = self.type_of(arg);
            self.observe_param(name, index, ty);
        }
        Ok(Expression::call(name, args))
    }

    /// Lower call arguments for a builtin, checking the count
    pub(crate) fn builtin_call(&mut self, builtin: Builtin, args: &[Expr], pos: Position) -> LResult<Expression> {
        let (min, max) = builtin.arity();
        if args.len() < min || args.len() > max {
            return Err(LoweringError::invalid(
                format!("'{}' takes {} argument(s), found {}", builtin.name(), min, args.len()),
                pos,
            ));
        }
        let args = args.iter().map(|a| self.lower_expr(a)).collect::<LResult<Vec<_>>>()?;
        Ok(Expression::builtin(builtin, args))
    }

    /// Receiver-style length: `s.length()`, `v.size()`, `arr.length`
    pub(crate) fn length_of(&mut self, object: &Expr) -> LResult<Expression> {
        let value = self.lower_expr(object)?;
        Ok(Expression::builtin(Builtin::Len, vec![value]))
    }

    fn lower_literal(&self, kind: LiteralKind, raw: &str, pos: Position) -> LResult<Expression> {
        let js = self.language == Language::JavaScript;
        let literal = match kind {
            LiteralKind::Integer => {
                let text: String = raw.chars().filter(|c| *c != '_').collect::<String>().to_ascii_lowercase();
                let long_suffix = text.ends_with('l');
                let digits = text.trim_end_matches(|c: char| c == 'l' || c == 'u');
                let parsed = if let Some(hex) = digits.strip_prefix("0x") {
                    i64::from_str_radix(hex, 16)
                } else if let Some(bits) = digits.strip_prefix("0b") {
                    i64::from_str_radix(bits, 2)
                } else if digits.len() > 1 && digits.starts_with('0') {
                    i64::from_str_radix(&digits[1..], 8)
                } else {
                    digits.parse::<i64>()
                };
                let value = parsed
                    .map_err(|_| LoweringError::invalid(format!("invalid integer literal '{}'", raw), pos))?;
                // Script numbers hold integers far past 32 bits
                if js || long_suffix || i32::try_from(value).is_err() {
                    Literal::Long(value)
                } else {
                    Literal::Int(value)
                }
            }
            LiteralKind::Float => {
                let text = raw.replace('_', "").to_ascii_lowercase();
                let single = !js && text.ends_with('f');
                let digits = text.trim_end_matches(|c: char| c == 'f' || c == 'd');
                let value = digits
                    .parse::<f64>()
                    .map_err(|_| LoweringError::invalid(format!("invalid floating literal '{}'", raw), pos))?;
                if single {
                    Literal::Float(value)
                } else {
                    Literal::Double(value)
                }
            }
            LiteralKind::Char => {
                let text = decode_quoted(raw).map_err(|msg| LoweringError::invalid(msg, pos))?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Literal::Char(c),
                    _ => return Err(LoweringError::invalid("character literal must hold exactly one character", pos)),
                }
            }
            LiteralKind::String => Literal::Str(decode_quoted(raw).map_err(|msg| LoweringError::invalid(msg, pos))?),
            LiteralKind::Template => {
                if raw.contains("${") {
                    return Err(LoweringError::unsupported("template literal", pos));
                }
                Literal::Str(decode_quoted(raw).map_err(|msg| LoweringError::invalid(msg, pos))?)
            }
        };
        Ok(Expression::Literal(literal))
    }
}

fn compound_operator(op: &str) -> Option<BinOp> {
    Some(match op {
        "+=" => BinOp::Add,
        "-=" => BinOp::Sub,
        "*=" => BinOp::Mul,
        "/=" => BinOp::Div,
        "%=" => BinOp::Rem,
        "&=" => BinOp::BitAnd,
        "|=" => BinOp::BitOr,
        "^=" => BinOp::BitXor,
        "<<=" => BinOp::Shl,
        ">>=" => BinOp::Shr,
        _ => return None,
    })
}

/// `x = x + 1` with a literal one of the target's type
fn increment(target: LValue, op: BinOp, ty: &Type) -> Statement {
    let one = match ty {
        Type::Long => Literal::Long(1),
        Type::Float => Literal::Float(1.0),
        Type::Double => Literal::Double(1.0),
        _ => Literal::Int(1),
    };
    let value = Expression::binary(op, target.to_expression(), Expression::Literal(one));
    Statement::Assign { target, value }
}

fn is_zero_literal(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::Literal(Literal::Int(0)) | Expression::Literal(Literal::Long(0)) | Expression::Literal(Literal::Bool(false))
    ) || matches!(expr, Expression::Literal(Literal::Double(v)) | Expression::Literal(Literal::Float(v)) if *v == 0.0)
}

/// A one-character string literal compared with a char becomes a char literal
fn char_literal_for(expr: Expression, other: Option<&Type>) -> Expression {
    if other != Some(&Type::Char) {
        return expr;
    }
    match expr {
        Expression::Literal(Literal::Str(s)) if s.chars().count() == 1 => match s.chars().next() {
            Some(c) => Expression::Literal(Literal::Char(c)),
            None => Expression::Literal(Literal::Str(s)),
        },
        other => other,
    }
}

/// `sizeof(a) / sizeof(a[0])` names the array `a`
fn array_length_idiom<'e>(whole: &'e Expr, part: &'e Expr) -> Option<(&'e str, Position)> {
    let Expr::Identifier { name, pos } = whole else {
        return None;
    };
    match part {
        Expr::Index { object, .. } => match object.as_ref() {
            Expr::Identifier { name: inner, .. } if inner == name => Some((name.as_str(), *pos)),
            _ => None,
        },
        _ => None,
    }
}

fn flush_literal(literal: &mut String, items: &mut Vec<PrintItem>) {
    if !literal.is_empty() {
        items.push(PrintItem::Value(Expression::string(std::mem::take(literal))));
    }
}

fn push_output(out: &mut Vec<PrintItem>, value: Expression) {
    match value {
        Expression::Literal(Literal::Str(text)) => {
            for (i, line) in text.split('\n').enumerate() {
                if i > 0 {
                    out.push(PrintItem::Newline);
                }
                if line.is_empty() {
                    continue;
                }
                if let Some(PrintItem::Value(Expression::Literal(Literal::Str(prev)))) = out.last_mut() {
                    prev.push_str(line);
                } else {
                    out.push(PrintItem::Value(Expression::string(line)));
                }
            }
        }
        Expression::Literal(Literal::Char('\n')) => out.push(PrintItem::Newline),
        other => out.push(PrintItem::Value(other)),
    }
}

/// What a CST walk reports: a name a statement declares, or an expression
enum Visit<'s> {
    Declared(&'s String),
    Expr(&'s Expr),
}

/// Every identifier and declared name in a function body
fn collect_names(stmts: &[Stmt], out: &mut AHashSet<String>) {
    walk_stmts(stmts, &mut |visit| match visit {
        Visit::Declared(name) | Visit::Expr(Expr::Identifier { name, .. }) => {
            out.insert(name.clone());
        }
        Visit::Expr(_) => {}
    });
}

/// Visit every declared name and every expression, outermost first
fn walk_stmts<'s>(stmts: &'s [Stmt], visit: &mut impl FnMut(Visit<'s>)) {
    for stmt in stmts {
        walk_stmt(stmt, visit);
    }
}

fn walk_stmt<'s>(stmt: &'s Stmt, visit: &mut impl FnMut(Visit<'s>)) {
    match stmt {
        Stmt::VarDecl(decl) => {
            for d in &decl.declarators {
                visit(Visit::Declared(&d.name));
                match &d.init {
                    Some(Init::Expr(e)) => walk_expr(e, visit),
                    Some(Init::List(items, _)) | Some(Init::Ctor(items, _)) => {
                        items.iter().for_each(|e| walk_expr(e, visit))
                    }
                    None => {}
                }
            }
        }
        Stmt::If { cond, then_branch, else_branch, .. } => {
            walk_expr(cond, visit);
            walk_stmt(then_branch, visit);
            if let Some(b) = else_branch {
                walk_stmt(b, visit);
            }
        }
        Stmt::While { cond, body, .. } | Stmt::DoWhile { body, cond, .. } => {
            walk_expr(cond, visit);
            walk_stmt(body, visit);
        }
        Stmt::For { init, cond, step, body, .. } => {
            if let Some(s) = init {
                walk_stmt(s, visit);
            }
            if let Some(c) = cond {
                walk_expr(c, visit);
            }
            step.iter().for_each(|e| walk_expr(e, visit));
            walk_stmt(body, visit);
        }
        Stmt::ForEach { name, iterable, body, .. } => {
            visit(Visit::Declared(name));
            walk_expr(iterable, visit);
            walk_stmt(body, visit);
        }
        Stmt::Return { value: Some(e), .. } | Stmt::Expr { expr: e, .. } => walk_expr(e, visit),
        Stmt::Block(block) => walk_stmts(&block.stmts, visit),
        Stmt::Label { body, .. } => walk_stmt(body, visit),
        _ => {}
    }
}

fn walk_expr<'s>(expr: &'s Expr, visit: &mut impl FnMut(Visit<'s>)) {
    visit(Visit::Expr(expr));
    match expr {
        Expr::Binary { lhs, rhs, .. } => {
            walk_expr(lhs, visit);
            walk_expr(rhs, visit);
        }
        Expr::Unary { operand, .. } | Expr::Postfix { operand, .. } | Expr::Sizeof { operand, .. } => {
            walk_expr(operand, visit)
        }
        Expr::Assign { target, value, .. } => {
            walk_expr(target, visit);
            walk_expr(value, visit);
        }
        Expr::Call { callee, args, .. } => {
            walk_expr(callee, visit);
            args.iter().for_each(|a| walk_expr(a, visit));
        }
        Expr::Member { object, .. } => walk_expr(object, visit),
        Expr::Index { object, index, .. } => {
            walk_expr(object, visit);
            walk_expr(index, visit);
        }
        Expr::Ternary { cond, then, otherwise, .. } => {
            walk_expr(cond, visit);
            walk_expr(then, visit);
            walk_expr(otherwise, visit);
        }
        Expr::Cast { expr, .. } => walk_expr(expr, visit),
        Expr::New { args, .. } | Expr::ArrayLiteral { items: args, .. } => {
            args.iter().for_each(|a| walk_expr(a, visit))
        }
        Expr::NewArray { len, init, .. } => {
            if let Some(len) = len {
                walk_expr(len, visit);
            }
            if let Some(items) = init {
                items.iter().for_each(|a| walk_expr(a, visit));
            }
        }
        Expr::Identifier { .. } | Expr::Literal { .. } | Expr::Bool { .. } | Expr::Null(_) | Expr::Unsupported { .. } => {}
    }
}

/// True when the body may change the contents of array `name`: element
/// stores, increments, swaps, reassignment, or handing it to a call
fn writes_array(body: &[Stmt], name: &str) -> bool {
    let mut written = false;
    walk_stmts(body, &mut |visit| {
        let Visit::Expr(expr) = visit else { return };
        written |= match expr {
            Expr::Assign { target, .. } => names_array(target, name),
            Expr::Unary { op, operand, .. } if op == "++" || op == "--" => names_array(operand, name),
            Expr::Postfix { operand, .. } => names_array(operand, name),
            Expr::Call { callee, args, .. } if is_swap(callee) => args.iter().any(|a| names_array(a, name)),
            Expr::Call { args, .. } => args.iter().any(|a| matches!(a, Expr::Identifier { name: n, .. } if n == name)),
            _ => false,
        };
    });
    written
}

fn is_swap(callee: &Expr) -> bool {
    matches!(callee, Expr::Identifier { name, .. } if name == "swap" || name == "std::swap")
}

/// `name` itself or one of its elements
fn names_array(expr: &Expr, name: &str) -> bool {
    match expr {
        Expr::Identifier { name: n, .. } => n == name,
        Expr::Index { object, .. } => names_array(object, name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Budget;
    use crate::parser;

    fn lower_src(src: &str, language: Language) -> Result<Program, Vec<LoweringError>> {
        let cst = parser::parse(src, language, &mut Budget::unlimited(), 25).unwrap();
        lower(&cst)
    }

    fn body_of(program: &Program, name: &str) -> Vec<Statement> {
        program.function(name).unwrap().body.statements.clone()
    }

    #[test]
    fn test_factorial_lowers_identically_from_c_and_java() {
        let c = lower_src("int factorial(int n){ if(n<=1) return 1; return n*factorial(n-1); }", Language::C).unwrap();
        let java = lower_src(
            "class M { static int factorial(int n) { if (n <= 1) { return 1; } return n * factorial(n - 1); } }",
            Language::Java,
        )
        .unwrap();
        assert_eq!(c, java);
        assert_eq!(c.functions[0].return_type, Type::Int);
    }

    #[test]
    fn test_undeclared_identifier_reports_name_and_position() {
        let errors = lower_src("int f() {\n  int count = 1;\n  return cout + 1;\n}", Language::C).unwrap_err();
        assert_eq!(
            errors,
            vec![LoweringError::UndeclaredIdentifier {
                name: "cout".to_string(),
                position: Position::new(3, 10, 36),
                suggestion: Some("count".to_string()),
            }]
        );
    }

    #[test]
    fn test_goto_is_unsupported() {
        let errors = lower_src("int main() { goto done; done: return 0; }", Language::C).unwrap_err();
        assert!(matches!(&errors[0], LoweringError::UnsupportedConstruct { kind, .. } if kind == "goto"));
        assert_eq!(errors[0].position(), Position::new(1, 14, 13));
    }

    #[test]
    fn test_errors_are_collected_across_statements() {
        let errors = lower_src("int main() { int a = x; int b = y; return 0; }", Language::C).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_printf_is_split_into_print_calls() {
        let program = lower_src("#include <stdio.h>\nint main() { int x = 4; printf(\"x = %d\\n\", x); return 0; }", Language::C).unwrap();
        let body = body_of(&program, "main");
        assert_eq!(body[1], Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::string("x = ")])));
        assert_eq!(body[2], Statement::Expr(Expression::builtin(Builtin::Println, vec![Expression::var("x")])));
    }

    #[test]
    fn test_printf_conversions_without_a_faithful_rendering_are_rejected() {
        for conv in ["%f", "%F", "%e", "%E", "%G", "%u", "%lf", "%qd"] {
            let src = format!("int main() {{ printf(\"{}\\n\", 2.5); return 0; }}", conv);
            let errors = lower_src(&src, Language::C).unwrap_err();
            assert!(
                matches!(&errors[0], LoweringError::UnsupportedConstruct { kind, .. } if kind.starts_with("format conversion")),
                "{}: {:?}",
                conv,
                errors
            );
        }
    }

    #[test]
    fn test_printf_char_and_integer_conversions_keep_their_meaning() {
        let program = lower_src("int main() { printf(\"%c%d\\n\", 65, 'A'); return 0; }", Language::C).unwrap();
        let body = body_of(&program, "main");
        assert_eq!(
            body[0],
            Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::cast(Type::Char, Expression::int(65))]))
        );
        assert_eq!(
            body[1],
            Statement::Expr(Expression::builtin(
                Builtin::Println,
                vec![Expression::cast(Type::Int, Expression::Literal(Literal::Char('A')))]
            ))
        );

        let errors = lower_src("int main() { printf(\"%c\", 1.5); return 0; }", Language::C).unwrap_err();
        assert!(matches!(&errors[0], LoweringError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn test_compound_assignment_and_increment() {
        let program = lower_src("int f(int n) { int s = 0; s += n; s++; return s; }", Language::C).unwrap();
        let body = body_of(&program, "f");
        let add = |rhs: Expression| Statement::Assign {
            target: LValue::Var("s".to_string()),
            value: Expression::binary(BinOp::Add, Expression::var("s"), rhs),
        };
        assert_eq!(body[1], add(Expression::var("n")));
        assert_eq!(body[2], add(Expression::int(1)));
    }

    #[test]
    fn test_c_truthiness_becomes_comparison() {
        let program = lower_src("int f(int n) { while (n) { n--; } if (!n) return 1; return 0; }", Language::C).unwrap();
        let body = body_of(&program, "f");
        let Statement::While { cond, .. } = &body[0] else { panic!("expected while") };
        assert_eq!(*cond, Expression::binary(BinOp::Ne, Expression::var("n"), Expression::int(0)));
        let Statement::If { cond, .. } = &body[1] else { panic!("expected if") };
        assert_eq!(*cond, Expression::binary(BinOp::Eq, Expression::var("n"), Expression::int(0)));
    }

    #[test]
    fn test_constant_condition_becomes_boolean_literal() {
        let program =
            lower_src("int f(int n) { while (1) { if (n > 3) return n; n++; } }", Language::C).unwrap();
        let Statement::While { cond, .. } = &body_of(&program, "f")[0] else { panic!("expected while") };
        assert_eq!(*cond, Expression::bool(true));

        let program = lower_src("int g() { if (0) return 1; return 2; }", Language::C).unwrap();
        let Statement::If { cond, .. } = &body_of(&program, "g")[0] else { panic!("expected if") };
        assert_eq!(*cond, Expression::bool(false));
    }

    #[test]
    fn test_bare_block_keeps_its_own_scope() {
        let program = lower_src("int f() { int y = 1; { int y = 5; y++; } { int y = 2; } return y; }", Language::C).unwrap();
        let body = body_of(&program, "f");
        assert_eq!(body.len(), 4);
        let Statement::Block(inner) = &body[1] else { panic!("expected block") };
        assert!(matches!(&inner.statements[0], Statement::Declare { name, .. } if name == "y"));
        assert!(matches!(&body[2], Statement::Block(_)));
        assert_eq!(body[3], Statement::Return(Some(Expression::var("y"))));

        let program = lower_src("function f() { let y = 1; { let y = 5; } return y; }", Language::JavaScript).unwrap();
        assert!(matches!(&body_of(&program, "f")[1], Statement::Block(_)));
    }

    #[test]
    fn test_do_while_becomes_while_true_with_break() {
        let program = lower_src("int f() { int i = 0; do { i++; } while (i < 3); return i; }", Language::C).unwrap();
        let Statement::While { cond, body } = &body_of(&program, "f")[1] else { panic!("expected while") };
        assert!(cond.is_true_literal());
        assert!(matches!(body.statements.last(), Some(Statement::If { .. })));

        let errors = lower_src("int f() { int i = 0; do { continue; } while (i < 3); return i; }", Language::C).unwrap_err();
        assert!(matches!(&errors[0], LoweringError::UnsupportedConstruct { kind, .. } if kind == "continue inside do-while"));
    }

    #[test]
    fn test_foreach_becomes_indexed_for() {
        let program = lower_src(
            "class A { static int sum(int[] xs) { int s = 0; for (int x : xs) s += x; return s; } }",
            Language::Java,
        )
        .unwrap();
        let Statement::For { init, cond, body, .. } = &body_of(&program, "sum")[1] else { panic!("expected for") };
        assert!(matches!(init.as_deref(), Some(Statement::Declare { name, .. }) if name == "i"));
        assert_eq!(
            *cond,
            Expression::binary(
                BinOp::Lt,
                Expression::var("i"),
                Expression::builtin(Builtin::Len, vec![Expression::var("xs")])
            )
        );
        assert!(matches!(&body.statements[0], Statement::Declare { name, ty: Type::Int, .. } if name == "x"));
    }

    #[test]
    fn test_c_array_declarations() {
        let program = lower_src(
            "int f() { int a[] = {1, 2, 3}; int b[4] = {0}; int n = sizeof(a) / sizeof(a[0]); return n + b[0]; }",
            Language::C,
        )
        .unwrap();
        let body = body_of(&program, "f");
        assert!(matches!(&body[0], Statement::Declare { ty, init: Some(Expression::ArrayLiteral { items, .. }), .. }
            if *ty == Type::array_of(Type::Int) && items.len() == 3));
        assert!(matches!(&body[1], Statement::Declare { init: Some(Expression::ArrayNew { .. }), .. }));
        assert!(matches!(&body[2], Statement::Declare { init: Some(Expression::Call { .. }), .. }));
    }

    #[test]
    fn test_duplicate_declaration_in_same_scope() {
        let errors = lower_src("int f() { int a = 1; int a = 2; return a; }", Language::C).unwrap_err();
        assert!(matches!(&errors[0], LoweringError::DuplicateDeclaration { name, .. } if name == "a"));
        // Shadowing in a nested block is fine
        assert!(lower_src("int f() { int a = 1; { int a = 2; } return a; }", Language::C).is_ok());
    }

    #[test]
    fn test_lowering_is_deterministic() {
        let src = "int f(int n) { int s = 0; for (int i = 0, j = n; i < j; i++, j--) { s += i * j; } return s; }";
        assert_eq!(lower_src(src, Language::C), lower_src(src, Language::C));
        let bad = "int f() { return a + b; }";
        assert_eq!(lower_src(bad, Language::C), lower_src(bad, Language::C));
    }

    #[test]
    fn test_multi_step_for_becomes_while() {
        let program = lower_src(
            "int f(int n) { int s = 0; for (int i = 0, j = n; i < j; i++, j--) { s += 1; } return s; }",
            Language::C,
        )
        .unwrap();
        let body = body_of(&program, "f");
        assert!(matches!(&body[1], Statement::Declare { name, .. } if name == "i"));
        assert!(matches!(&body[2], Statement::Declare { name, .. } if name == "j"));
        let Statement::While { body: loop_body, .. } = &body[3] else { panic!("expected while") };
        assert_eq!(loop_body.statements.len(), 3);
    }
}
