// File: src/codegen/mod.rs
//
// Code generation: validated IR into target-language source text.
//
// The four targets share C-style statement and expression syntax, so one
// Writer walks the IR for all of them: it tracks scopes and types, picks
// target-safe names, groups consecutive output calls and handles operator
// precedence. What differs per language (type spelling, literals, output,
// casts, library calls, arrays) comes from a Syntax implementation in the
// language's submodule. Each submodule also implements Backend, which
// renders a whole file around the Writer's function bodies.
//
// A backend never fails: every construct that can survive validation has a
// rendering in every target.

mod c;
mod cpp;
mod java;
mod javascript;

use crate::ir::transform::to_iterative;
use crate::ir::typing::{coercion, Coercion, TypeEnv};
use crate::ir::{BinOp, Block, Builtin, Callee, Expression, Function, LValue, Literal, Param, Program, Statement, Type, UnOp};
use crate::language::Language;
use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One generated candidate, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSolution {
    pub title: String,
    pub description: String,
    pub code: String,
}

/// Formatting knobs shared by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub indent_width: usize,
}

impl Default for Style {
    fn default() -> Self {
        Self { indent_width: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    pub style: Style,
    /// Offer a loop-based rendering of recursive programs
    pub iterative_variants: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { style: Style::default(), iterative_variants: true }
    }
}

/// A target-language code generator
pub trait Backend: Send + Sync {
    fn language(&self) -> Language;

    /// Render a validated program as one complete source file
    fn render(&self, program: &Program, style: &Style) -> String;
}

static BACKENDS: Lazy<AHashMap<Language, Box<dyn Backend>>> = Lazy::new(|| {
    Language::ALL
        .iter()
        .map(|&lang| {
            let backend: Box<dyn Backend> = match lang {
                Language::C => Box::new(c::CBackend),
                Language::Cpp => Box::new(cpp::CppBackend),
                Language::Java => Box::new(java::JavaBackend),
                Language::JavaScript => Box::new(javascript::JavaScriptBackend),
            };
            (lang, backend)
        })
        .collect()
});

/// The registered backend for a language
pub fn backend(language: Language) -> &'static dyn Backend {
    match BACKENDS.get(&language) {
        Some(backend) => backend.as_ref(),
        None => unreachable!("no backend registered for {}", language),
    }
}

/// Render every solution for a validated program, in a stable order:
/// recursive first, then iterative, otherwise a single translation.
pub fn generate(program: &Program, target: Language, options: &GenerateOptions) -> Vec<CodeSolution> {
    let backend = backend(target);
    let name = target.display_name();
    let code = backend.render(program, &options.style);

    let recursive: Vec<&str> = program.functions.iter().filter(|f| f.is_recursive()).map(|f| f.name.as_str()).collect();
    if recursive.is_empty() {
        return vec![CodeSolution {
            title: format!("{} Translation", name),
            description: format!("The program translated to {}.", name),
            code,
        }];
    }

    let mut solutions = vec![CodeSolution {
        title: "Recursive Solution".to_string(),
        description: format!("{} translation that keeps the recursion in {}.", name, quote_list(&recursive)),
        code,
    }];
    if options.iterative_variants {
        if let Some(variant) = to_iterative(program) {
            // The rewrite is only offered when it is as valid as its input
            match crate::validator::validate(variant.program) {
                Ok(valid) => {
                    let rewritten: Vec<&str> = variant.rewritten.iter().map(String::as_str).collect();
                    solutions.push(CodeSolution {
                        title: "Iterative Solution".to_string(),
                        description: format!(
                            "{} translation with {} rewritten as a loop instead of recursion.",
                            name,
                            quote_list(&rewritten)
                        ),
                        code: backend.render(&valid.program, &options.style),
                    });
                }
                Err(errors) => log::debug!("dropping iterative variant: {} semantic error(s)", errors.len()),
            }
        }
    }
    solutions
}

fn quote_list(names: &[&str]) -> String {
    names.iter().map(|n| format!("`{}`", n)).collect::<Vec<_>>().join(", ")
}

/// Indentation-aware line buffer
#[derive(Debug, Clone)]
pub(crate) struct Emitter {
    out: String,
    level: usize,
    width: usize,
}

impl Emitter {
    pub fn new(style: &Style) -> Self {
        Self { out: String::new(), level: 0, width: style.indent_width }
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            self.out.push_str(&" ".repeat(self.level * self.width));
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    /// `header {` and one level deeper; a bare `{` without a header
    pub fn open(&mut self, header: impl AsRef<str>) {
        match header.as_ref() {
            "" => self.line("{"),
            header => self.line(format!("{} {{", header)),
        }
        self.level += 1;
    }

    /// One level out and `}` followed by `trailer`
    pub fn close(&mut self, trailer: &str) {
        self.level = self.level.saturating_sub(1);
        self.line(format!("}}{}", trailer));
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Binding strength of ternaries; binary operators use BinOp::precedence
pub(crate) const PREC_TERNARY: u8 = 0;
pub(crate) const PREC_UNARY: u8 = 11;
pub(crate) const PREC_ATOM: u8 = 12;

/// Rendered expression text and how tightly it binds
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rendered {
    pub text: String,
    pub prec: u8,
}

impl Rendered {
    pub fn atom(text: impl Into<String>) -> Self {
        Self { text: text.into(), prec: PREC_ATOM }
    }

    pub fn new(text: impl Into<String>, prec: u8) -> Self {
        Self { text: text.into(), prec }
    }

    /// The text, parenthesized when it binds looser than `min`
    pub fn at(&self, min: u8) -> String {
        if self.prec < min {
            format!("({})", self.text)
        } else {
            self.text.clone()
        }
    }
}

/// Per-language spelling of the shared C-style syntax
pub(crate) trait Syntax: Sync {
    /// Keywords and library names a user identifier must not take
    fn reserved(&self) -> &'static [&'static str];

    /// Locals may not shadow locals of an enclosing scope
    fn rename_shadowed(&self) -> bool {
        false
    }

    /// Declarations without an initializer get the zero value
    fn zero_init(&self) -> bool {
        false
    }

    fn type_name(&self, ty: &Type) -> String;

    fn literal(&self, lit: &Literal) -> Rendered;

    /// A scalar declaration without its terminator, e.g. `int x = 1`
    fn declaration(&self, ty: &Type, name: &str, init: Option<String>, constant: bool) -> String;

    /// Full statements declaring an array initialised by `init`
    fn declare_array(&self, w: &mut Writer<'_>, ir_name: &str, name: &str, elem: &Type, init: &Expression);

    /// An array constructor used as a value
    fn array_value(&self, w: &mut Writer<'_>, elem: &Type, init: &Expression) -> Rendered;

    /// A run of print calls, optionally ending the line
    fn print(&self, w: &mut Writer<'_>, items: &[&Expression], newline: bool);

    fn builtin(&self, w: &mut Writer<'_>, builtin: Builtin, args: &[Expression]) -> Rendered;

    fn cast(&self, w: &mut Writer<'_>, to: &Type, from: &Type, value: Rendered) -> Rendered;

    /// Operators whose spelling depends on operand types
    fn binary(&self, _w: &mut Writer<'_>, _op: BinOp, _lhs: &Expression, _rhs: &Expression, _lt: &Type, _rt: &Type) -> Option<Rendered> {
        None
    }

    fn index(&self, _w: &mut Writer<'_>, array: Rendered, index: Rendered, _container: &Type) -> Rendered {
        Rendered::atom(format!("{}[{}]", array.at(PREC_ATOM), index.text))
    }

    /// Array subscripts must be `int`, so wider indices get a cast
    fn int_indices(&self) -> bool {
        false
    }

    /// Argument text for one parameter; C passes array lengths alongside
    fn call_args(&self, w: &mut Writer<'_>, param: &Param, arg: &Expression) -> Vec<String> {
        vec![w.coerce(arg, &param.ty)]
    }

    /// A return statement, with the terminator
    fn return_statement(&self, w: &mut Writer<'_>, value: Option<&Expression>) -> String {
        match (value, w.return_type()) {
            (Some(value), ty) => format!("return {};", w.coerce(value, &ty)),
            (None, _) => "return;".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Local {
    emitted: String,
    /// C length variable travelling with an array
    companion: Option<String>,
}

/// Maps IR names to names that are legal and unambiguous in the target
#[derive(Debug, Clone)]
pub(crate) struct Names {
    reserved: &'static [&'static str],
    rename_shadowed: bool,
    functions: AHashMap<String, String>,
    scopes: Vec<AHashMap<String, Local>>,
    taken: AHashSet<String>,
}

impl Names {
    fn new(program: &Program, syntax: &dyn Syntax) -> Self {
        let reserved = syntax.reserved();
        let mut taken: AHashSet<String> = program.functions.iter().map(|f| f.name.clone()).collect();
        let mut functions = AHashMap::new();
        for f in &program.functions {
            let emitted = if reserved.contains(&f.name.as_str()) {
                let base = format!("{}_", f.name);
                fresh_in(&mut taken, &base)
            } else {
                f.name.clone()
            };
            functions.insert(f.name.clone(), emitted);
        }
        Self { reserved, rename_shadowed: syntax.rename_shadowed(), functions, scopes: Vec::new(), taken }
    }

    pub fn function(&self, name: &str) -> String {
        self.functions.get(name).cloned().unwrap_or_else(|| name.to_string())
    }

    fn enter_function(&mut self, function: &Function, extra: &[&str]) {
        self.scopes = vec![AHashMap::new()];
        self.taken = self.functions.values().cloned().collect();
        self.taken.extend(self.functions.keys().cloned());
        self.taken.extend(extra.iter().map(|s| s.to_string()));
        for p in &function.params {
            self.taken.insert(p.name.clone());
        }
        collect_names(&function.body, &mut self.taken);
    }

    pub fn push(&mut self) {
        self.scopes.push(AHashMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Name for a new local; `force_fresh` when the initializer still reads
    /// an outer variable of the same name
    pub fn bind(&mut self, name: &str, force_fresh: bool) -> String {
        let shadows = self.scopes.iter().any(|s| s.contains_key(name));
        let clashes = self.reserved.contains(&name) || self.functions.contains_key(name);
        let emitted = if clashes {
            self.fresh(&format!("{}_", name))
        } else if shadows && (self.rename_shadowed || force_fresh) {
            self.fresh(name)
        } else {
            name.to_string()
        };
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Local { emitted: emitted.clone(), companion: None });
        }
        emitted
    }

    pub fn get(&self, name: &str) -> String {
        self.lookup(name).map(|l| l.emitted.clone()).unwrap_or_else(|| name.to_string())
    }

    fn lookup(&self, name: &str) -> Option<&Local> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    /// A name used nowhere else in the current function
    pub fn fresh(&mut self, base: &str) -> String {
        fresh_in(&mut self.taken, base)
    }

    pub fn set_companion(&mut self, name: &str, companion: String) {
        if let Some(local) = self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name)) {
            local.companion = Some(companion);
        }
    }

    pub fn companion(&self, name: &str) -> Option<String> {
        self.lookup(name).and_then(|l| l.companion.clone())
    }
}

fn fresh_in(taken: &mut AHashSet<String>, base: &str) -> String {
    let mut candidate = base.to_string();
    let mut n = 1;
    while taken.contains(&candidate) {
        n += 1;
        candidate = format!("{}{}", base, n);
    }
    taken.insert(candidate.clone());
    candidate
}

fn collect_names(block: &Block, names: &mut AHashSet<String>) {
    for stmt in &block.statements {
        collect_statement_names(stmt, names);
    }
}

fn collect_statement_names(stmt: &Statement, names: &mut AHashSet<String>) {
    match stmt {
        Statement::Declare { name, .. } => {
            names.insert(name.clone());
        }
        Statement::Assign { target, .. } => {
            names.insert(target.name().to_string());
        }
        Statement::If { then_block, else_block, .. } => {
            collect_names(then_block, names);
            if let Some(b) = else_block {
                collect_names(b, names);
            }
        }
        Statement::While { body, .. } | Statement::Block(body) => collect_names(body, names),
        Statement::For { init, step, body, .. } => {
            if let Some(s) = init {
                collect_statement_names(s, names);
            }
            if let Some(s) = step {
                collect_statement_names(s, names);
            }
            collect_names(body, names);
        }
        _ => {}
    }
    stmt.walk_expressions(&mut |e| {
        if let Expression::VarRef(name) = e {
            names.insert(name.clone());
        }
    });
}

fn assigned_names(block: &Block, out: &mut AHashSet<String>) {
    for stmt in &block.statements {
        assigned_in_statement(stmt, out);
    }
}

fn assigned_in_statement(stmt: &Statement, out: &mut AHashSet<String>) {
    match stmt {
        Statement::Assign { target: LValue::Var(name), .. } => {
            out.insert(name.clone());
        }
        Statement::If { then_block, else_block, .. } => {
            assigned_names(then_block, out);
            if let Some(b) = else_block {
                assigned_names(b, out);
            }
        }
        Statement::While { body, .. } | Statement::Block(body) => assigned_names(body, out),
        Statement::For { init, step, body, .. } => {
            for s in [init, step].into_iter().flatten() {
                assigned_in_statement(s, out);
            }
            assigned_names(body, out);
        }
        _ => {}
    }
}

fn mentions(expr: &Expression, name: &str) -> bool {
    let mut found = false;
    expr.walk(&mut |e| {
        found |= matches!(e, Expression::VarRef(n) if n == name);
    });
    found
}

/// Walks function bodies and renders them through a Syntax
pub(crate) struct Writer<'a> {
    syntax: &'a dyn Syntax,
    pub program: &'a Program,
    pub out: Emitter,
    pub names: Names,
    env: TypeEnv<'a>,
    function: Option<&'a Function>,
    assigned: AHashSet<String>,
    /// Headers or helpers the rendered code relies on
    pub needs: BTreeSet<&'static str>,
}

impl<'a> Writer<'a> {
    pub fn new(syntax: &'a dyn Syntax, program: &'a Program, style: &Style) -> Self {
        Self {
            syntax,
            program,
            out: Emitter::new(style),
            names: Names::new(program, syntax),
            env: TypeEnv::new(program),
            function: None,
            assigned: AHashSet::new(),
            needs: BTreeSet::new(),
        }
    }

    pub fn need(&mut self, what: &'static str) {
        self.needs.insert(what);
    }

    /// Start a function; returns the emitted parameter names in order.
    /// `extra` names are occupied by the target's own signature.
    pub fn begin_function(&mut self, function: &'a Function, extra: &[&str]) -> Vec<String> {
        self.function = Some(function);
        self.env.enter_function(function);
        self.names.enter_function(function, extra);
        self.assigned.clear();
        assigned_names(&function.body, &mut self.assigned);
        function.params.iter().map(|p| self.names.bind(&p.name, false)).collect()
    }

    pub fn is_entry(&self) -> bool {
        self.function.map_or(false, Function::is_entry)
    }

    pub fn return_type(&self) -> Type {
        self.function.map_or(Type::Void, |f| f.return_type.clone())
    }

    pub fn type_of(&self, expr: &Expression) -> Type {
        self.env.type_of(expr).unwrap_or(Type::Int)
    }

    /// Statements of a function body, in the parameters' scope
    pub fn body(&mut self, block: &'a Block) {
        self.statements(&block.statements);
    }

    pub fn block(&mut self, block: &'a Block) {
        self.names.push();
        self.env.push_scope();
        self.statements(&block.statements);
        self.env.pop_scope();
        self.names.pop();
    }

    fn statements(&mut self, stmts: &'a [Statement]) {
        let mut i = 0;
        while i < stmts.len() {
            if let Some((items, newline, used)) = print_run(&stmts[i..]) {
                let syntax = self.syntax;
                syntax.print(self, &items, newline);
                i += used;
                continue;
            }
            self.statement(&stmts[i]);
            i += 1;
        }
    }

    fn statement(&mut self, stmt: &'a Statement) {
        match stmt {
            Statement::Declare { name, ty: Type::Array(elem), init } => {
                let fallback = Expression::ArrayNew { elem: (**elem).clone(), len: Box::new(Expression::int(0)) };
                let init = init.as_ref().unwrap_or(&fallback);
                let emitted = self.names.bind(name, mentions(init, name));
                let syntax = self.syntax;
                syntax.declare_array(self, name, &emitted, elem, init);
                self.env.declare(name, Type::array_of((**elem).clone()));
            }
            Statement::Declare { .. } => {
                let text = self.declaration(stmt);
                self.out.line(format!("{};", text));
            }
            Statement::Assign { target, value } => {
                let text = self.assignment(target, value);
                self.out.line(format!("{};", text));
            }
            Statement::If { .. } => self.if_chain(stmt),
            Statement::While { cond, body } => {
                let cond = self.expr(cond).text;
                self.out.open(format!("while ({})", cond));
                self.block(body);
                self.out.close("");
            }
            Statement::For { init, cond, step, body } => {
                self.names.push();
                self.env.push_scope();
                let init = match init.as_deref() {
                    Some(s @ Statement::Declare { .. }) => self.declaration(s),
                    Some(Statement::Assign { target, value }) => self.assignment(target, value),
                    Some(Statement::Expr(e)) => self.expr(e).text,
                    _ => String::new(),
                };
                let cond = self.expr(cond).text;
                let step = match step.as_deref() {
                    Some(Statement::Assign { target, value }) => self.assignment(target, value),
                    Some(Statement::Expr(e)) => self.expr(e).text,
                    _ => String::new(),
                };
                self.out.open(format!("for ({}; {}; {})", init, cond, step));
                self.statements(&body.statements);
                self.out.close("");
                self.env.pop_scope();
                self.names.pop();
            }
            Statement::Return(value) => {
                let syntax = self.syntax;
                let text = syntax.return_statement(self, value.as_ref());
                self.out.line(text);
            }
            Statement::Expr(expr) => {
                let text = self.expr(expr).text;
                self.out.line(format!("{};", text));
            }
            Statement::Break => self.out.line("break;"),
            Statement::Continue => self.out.line("continue;"),
            Statement::Block(block) => {
                self.out.open("");
                self.block(block);
                self.out.close("");
            }
        }
    }

    fn if_chain(&mut self, stmt: &'a Statement) {
        let mut current = stmt;
        let mut first = true;
        loop {
            let Statement::If { cond, then_block, else_block } = current else {
                break;
            };
            let cond = self.expr(cond).text;
            if first {
                self.out.open(format!("if ({})", cond));
                first = false;
            } else {
                self.out.dedent();
                self.out.open(format!("}} else if ({})", cond));
            }
            self.block(then_block);
            match else_block {
                Some(b) if matches!(b.statements.as_slice(), [Statement::If { .. }]) => {
                    current = &b.statements[0];
                }
                Some(b) => {
                    self.out.dedent();
                    self.out.open("} else");
                    self.block(b);
                    break;
                }
                None => break,
            }
        }
        self.out.close("");
    }

    /// A scalar declaration without its terminator; binds the name
    fn declaration(&mut self, stmt: &Statement) -> String {
        let Statement::Declare { name, ty, init } = stmt else {
            return String::new();
        };
        let syntax = self.syntax;
        let init_text = match init {
            Some(e) => Some(self.coerce(e, ty)),
            None if syntax.zero_init() => Literal::zero_of(ty).map(|z| syntax.literal(&z).text),
            None => None,
        };
        let constant = init.is_some() && !self.assigned.contains(name);
        let emitted = self.names.bind(name, init.as_ref().map_or(false, |e| mentions(e, name)));
        self.env.declare(name, ty.clone());
        syntax.declaration(ty, &emitted, init_text, constant)
    }

    /// An assignment without its terminator, using `++`, `--` and `op=`
    /// where the target language would
    fn assignment(&mut self, target: &LValue, value: &Expression) -> String {
        let target_expr = target.to_expression();
        let target_ty = self.type_of(&target_expr);
        let lhs = self.expr(&target_expr).text;

        if let Expression::Binary { op, lhs: left, rhs } = value {
            let same_target = **left == target_expr;
            let single_evaluation = match target {
                LValue::Index { index, .. } => !index.has_user_call(),
                LValue::Var(_) => true,
            };
            let exact = matches!(coercion(&self.type_of(value), &target_ty), Coercion::Exact | Coercion::Widening);
            if same_target && single_evaluation && exact && matches!(op, BinOp::Add | BinOp::Sub | BinOp::Mul) {
                if matches!(**rhs, Expression::Literal(Literal::Int(1) | Literal::Long(1))) && *op != BinOp::Mul {
                    return format!("{}{}", lhs, if *op == BinOp::Add { "++" } else { "--" });
                }
                let rhs = self.operand(rhs, left).text;
                return format!("{} {}= {}", lhs, op.symbol(), rhs);
            }
        }
        format!("{} = {}", lhs, self.coerce(value, &target_ty))
    }

    /// `value` rendered for a slot of type `to`, with an explicit cast when
    /// the conversion narrows
    pub fn coerce(&mut self, value: &Expression, to: &Type) -> String {
        if let (Expression::Literal(Literal::Long(v)), Type::Long) = (value, to) {
            if i32::try_from(*v).is_ok() {
                return self.syntax.literal(&Literal::Int(*v)).text;
            }
        }
        let from = self.type_of(value);
        let rendered = self.expr(value);
        match coercion(&from, to) {
            Coercion::Narrowing => {
                let syntax = self.syntax;
                syntax.cast(self, to, &from, rendered).text
            }
            _ => rendered.text,
        }
    }

    /// A small long literal next to a long operand is promoted by the
    /// operator, so it is written without a suffix
    fn operand(&mut self, expr: &Expression, other: &Expression) -> Rendered {
        match expr {
            Expression::Literal(Literal::Long(v))
                if i32::try_from(*v).is_ok()
                    && !matches!(other, Expression::Literal(_))
                    && self.type_of(other) == Type::Long =>
            {
                self.syntax.literal(&Literal::Int(*v))
            }
            _ => self.expr(expr),
        }
    }

    pub fn expr(&mut self, expr: &Expression) -> Rendered {
        let syntax = self.syntax;
        match expr {
            Expression::Literal(lit) => syntax.literal(lit),
            Expression::VarRef(name) => Rendered::atom(self.names.get(name)),
            Expression::Binary { op, lhs, rhs } => {
                let lt = self.type_of(lhs);
                let rt = self.type_of(rhs);
                if let Some(special) = syntax.binary(self, *op, lhs, rhs, &lt, &rt) {
                    return special;
                }
                let p = op.precedence();
                let l = self.operand(lhs, rhs).at(p);
                let r = self.operand(rhs, lhs).at(p + 1);
                Rendered::new(format!("{} {} {}", l, op.symbol(), r), p)
            }
            Expression::Unary { op, operand } => {
                let inner = self.expr(operand);
                let text = if *op == UnOp::Neg && inner.text.starts_with('-') {
                    format!("({})", inner.text)
                } else {
                    inner.at(PREC_UNARY)
                };
                Rendered::new(format!("{}{}", op.symbol(), text), PREC_UNARY)
            }
            Expression::Call { callee: Callee::Builtin(builtin), args } => syntax.builtin(self, *builtin, args),
            Expression::Call { callee: Callee::Function(name), args } => {
                let program = self.program;
                let params: &[Param] = program.function(name).map_or(&[], |f| f.params.as_slice());
                let mut texts = Vec::new();
                for (i, arg) in args.iter().enumerate() {
                    match params.get(i) {
                        Some(param) => texts.extend(syntax.call_args(self, param, arg)),
                        None => texts.push(self.expr(arg).text),
                    }
                }
                Rendered::atom(format!("{}({})", self.names.function(name), texts.join(", ")))
            }
            Expression::Index { array, index } => {
                let container = self.type_of(array);
                let a = self.expr(array);
                let index_ty = self.type_of(index);
                let i = self.expr(index);
                let i = if syntax.int_indices() && coercion(&index_ty, &Type::Int) == Coercion::Narrowing {
                    syntax.cast(self, &Type::Int, &index_ty, i)
                } else {
                    i
                };
                syntax.index(self, a, i, &container)
            }
            Expression::ArrayLiteral { elem, .. } | Expression::ArrayNew { elem, .. } => {
                syntax.array_value(self, elem, expr)
            }
            Expression::Cast { ty, expr: inner } => {
                let from = self.type_of(inner);
                let rendered = self.expr(inner);
                if from == *ty {
                    rendered
                } else {
                    syntax.cast(self, ty, &from, rendered)
                }
            }
            Expression::Ternary { cond, then, otherwise } => {
                let c = self.expr(cond).at(PREC_TERNARY + 1);
                let t = self.expr(then).text;
                let o = self.expr(otherwise).at(PREC_TERNARY);
                Rendered::new(format!("{} ? {} : {}", c, t, o), PREC_TERNARY)
            }
        }
    }

    pub fn finish(self) -> (String, BTreeSet<&'static str>) {
        (self.out.finish(), self.needs)
    }
}

/// A run of `print` calls, optionally closed by one `println`:
/// (values, ends the line, statements consumed)
fn print_run(stmts: &[Statement]) -> Option<(Vec<&Expression>, bool, usize)> {
    let mut items = Vec::new();
    for (i, stmt) in stmts.iter().enumerate() {
        match stmt {
            Statement::Expr(Expression::Call { callee: Callee::Builtin(Builtin::Print), args }) if args.len() == 1 => {
                items.push(&args[0]);
            }
            Statement::Expr(Expression::Call { callee: Callee::Builtin(Builtin::Println), args }) if args.len() <= 1 => {
                items.extend(args.first());
                return Some((items, true, i + 1));
            }
            _ if i == 0 => return None,
            _ => return Some((items, false, i)),
        }
    }
    (!items.is_empty()).then(|| {
        let used = items.len();
        (items, false, used)
    })
}

/// The program without a final `return 0;` in its entry point, for targets
/// whose entry point has no exit status
pub(crate) fn without_final_success(program: &Program) -> Program {
    let mut program = program.clone();
    if let Some(main) = program.functions.iter_mut().find(|f| f.is_entry()) {
        if matches!(main.body.statements.last(), Some(Statement::Return(Some(Expression::Literal(Literal::Int(0)))))) {
            main.body.statements.pop();
        }
    }
    program
}

/// Output items joined with `+` into one string-typed expression. A leading
/// `""` forces string concatenation when the first item is not a string.
pub(crate) fn concatenation(w: &mut Writer<'_>, items: &[&Expression], force_string: bool) -> String {
    let first_is_string = items.first().map_or(false, |item| w.type_of(item) == Type::String);
    let mut parts = Vec::new();
    if (items.len() > 1 || force_string) && !first_is_string {
        parts.push("\"\"".to_string());
    } else if let [only] = items {
        return w.expr(only).text;
    }
    for item in items {
        parts.push(w.expr(item).at(BinOp::Add.precedence() + 1));
    }
    parts.join(" + ")
}

/// Numeric literal text; a leading minus binds like a unary operator
pub(crate) fn number(text: String) -> Rendered {
    let prec = if text.starts_with('-') { PREC_UNARY } else { PREC_ATOM };
    Rendered::new(text, prec)
}

/// Text of a floating literal that reads back as floating in every target
pub(crate) fn float_text(value: f64) -> String {
    if value.is_nan() {
        return "(0.0 / 0.0)".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "(1.0 / 0.0)" } else { "(-1.0 / 0.0)" }.to_string();
    }
    let text = format!("{}", value);
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{}.0", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Param;

    pub(super) fn factorial_program() -> Program {
        let factorial = Function {
            name: "factorial".to_string(),
            params: vec![Param::new("n", Type::Int)],
            return_type: Type::Int,
            body: Block::new(vec![
                Statement::If {
                    cond: Expression::binary(BinOp::Le, Expression::var("n"), Expression::int(1)),
                    then_block: Block::new(vec![Statement::Return(Some(Expression::int(1)))]),
                    else_block: None,
                },
                Statement::Return(Some(Expression::binary(
                    BinOp::Mul,
                    Expression::var("n"),
                    Expression::call(
                        "factorial",
                        vec![Expression::binary(BinOp::Sub, Expression::var("n"), Expression::int(1))],
                    ),
                ))),
            ]),
        };
        let main = Function {
            name: "main".to_string(),
            params: vec![],
            return_type: Type::Void,
            body: Block::new(vec![Statement::Expr(Expression::builtin(
                Builtin::Println,
                vec![Expression::call("factorial", vec![Expression::int(5)])],
            ))]),
        };
        Program::new(vec![factorial, main])
    }

    #[test]
    fn test_recursive_program_gets_both_variants_in_order() {
        let solutions = generate(&factorial_program(), Language::Java, &GenerateOptions::default());
        let titles: Vec<&str> = solutions.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Recursive Solution", "Iterative Solution"]);
        assert!(solutions[0].code.contains("factorial(n - 1)"));
        assert!(!solutions[1].code.contains("factorial(n - 1)"));
    }

    #[test]
    fn test_variants_can_be_disabled() {
        let options = GenerateOptions { iterative_variants: false, ..GenerateOptions::default() };
        let solutions = generate(&factorial_program(), Language::C, &options);
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].title, "Recursive Solution");
    }

    #[test]
    fn test_non_recursive_program_is_a_translation() {
        let mut program = factorial_program();
        program.functions.remove(0);
        program.functions[0].body = Block::new(vec![Statement::Expr(Expression::builtin(
            Builtin::Println,
            vec![Expression::int(120)],
        ))]);
        let solutions = generate(&program, Language::Cpp, &GenerateOptions::default());
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].title, "C++ Translation");
    }

    #[test]
    fn test_print_runs_group_until_newline() {
        let stmts = vec![
            Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::string("a")])),
            Statement::Expr(Expression::builtin(Builtin::Println, vec![Expression::var("x")])),
            Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::string("b")])),
            Statement::Break,
        ];
        let (items, newline, used) = print_run(&stmts).unwrap();
        assert_eq!((items.len(), newline, used), (2, true, 2));
        let (items, newline, used) = print_run(&stmts[2..]).unwrap();
        assert_eq!((items.len(), newline, used), (1, false, 1));
        assert!(print_run(&stmts[3..]).is_none());
    }

    #[test]
    fn test_names_avoid_reserved_words_and_clashes() {
        let program = Program::new(vec![Function {
            name: "f".to_string(),
            params: vec![Param::new("class", Type::Int)],
            return_type: Type::Void,
            body: Block::new(vec![Statement::Declare { name: "class_".to_string(), ty: Type::Int, init: None }]),
        }]);
        let mut w = Writer::new(&java::JavaBackend, &program, &Style::default());
        let params = w.begin_function(&program.functions[0], &[]);
        assert_eq!(params, ["class_2"]);
        assert_eq!(w.names.bind("class_", false), "class_");
    }

    #[test]
    fn test_bare_blocks_are_emitted_as_blocks() {
        let declare = |value| Statement::Declare { name: "y".to_string(), ty: Type::Int, init: Some(Expression::int(value)) };
        let program = Program::new(vec![Function {
            name: "f".to_string(),
            params: vec![],
            return_type: Type::Int,
            body: Block::new(vec![
                declare(1),
                Statement::Block(Block::new(vec![declare(5)])),
                Statement::Return(Some(Expression::var("y"))),
            ]),
        }]);
        let c = generate(&program, Language::C, &GenerateOptions::default());
        assert!(c[0].code.contains("    int y = 1;\n    {\n        int y = 5;\n    }\n    return y;\n"), "{}", c[0].code);

        // Java forbids the shadowing, so the inner binding is renamed
        let java = generate(&program, Language::Java, &GenerateOptions::default());
        assert!(java[0].code.contains("{\n            int y2 = 5;\n        }\n        return y;\n"), "{}", java[0].code);
    }

    #[test]
    fn test_float_text_always_reads_as_floating() {
        assert_eq!(float_text(3.0), "3.0");
        assert_eq!(float_text(2.5), "2.5");
        assert_eq!(float_text(-0.125), "-0.125");
    }

    #[test]
    fn test_emitter_indents_blocks() {
        let mut e = Emitter::new(&Style { indent_width: 2 });
        e.open("if (x)");
        e.line("y();");
        e.close("");
        assert_eq!(e.finish(), "if (x) {\n  y();\n}\n");
    }
}
