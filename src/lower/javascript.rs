// File: src/lower/javascript.rs
//
// JavaScript lowering. Scripts carry no types, so lowering runs to a fixed
// point: each round records the types it sees flowing into variables,
// parameters and returns, and the next round lowers again with those
// observations as the declared types. Whatever is still unknown once the
// observations stop changing becomes double (or void for functions that
// never return a value).
//
// Top-level statements form the entry point; `var` declarations nested in
// blocks are declared once at the top of their function.

use super::{is_zero_literal, BindingKind, LResult, Lowerer, PrintItem, SourceRules};
use crate::cst::{self, Expr, FunctionDecl, Stmt, TypeSpec};
use crate::errors::{LoweringError, Position};
use crate::ir::typing::numeric_join;
use crate::ir::{BinOp, Builtin, Expression, LValue, Literal, Program, Statement, Type, ENTRY_POINT};
use crate::language::Language;
use ahash::{AHashMap, AHashSet};

const MAX_ROUNDS: usize = 8;

/// Types observed during one lowering round
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Inference {
    vars: AHashMap<Position, Type>,
    params: AHashMap<(String, usize), Type>,
    returns: AHashMap<String, Type>,
    returns_value: AHashSet<String>,
}

pub(super) fn lower_script(program: &cst::Program) -> Result<Program, Vec<LoweringError>> {
    let mut known = Inference::default();
    for round in 0..MAX_ROUNDS {
        let observed = {
            let mut lw = Lowerer::new(&RULES, Some(&known));
            lw.round = round;
            lw.finalize = false;
            // Errors surface in the final round
            let _ = lw.lower_program(program);
            std::mem::take(&mut lw.observed)
        };
        if observed == known {
            log::trace!("type inference settled after {} round(s)", round + 1);
            break;
        }
        known = observed;
    }

    let mut lw = Lowerer::new(&RULES, Some(&known));
    lw.round = MAX_ROUNDS;
    lw.finalize = true;
    lw.lower_program(program)
}

/// Merge two observations of the same slot
fn widen(a: &Type, b: &Type) -> Type {
    if a == b {
        return a.clone();
    }
    match (a, b) {
        (Type::Array(x), Type::Array(y)) => Type::array_of(widen(x, y)),
        _ => numeric_join(a, b).unwrap_or_else(|| a.clone()),
    }
}

fn record<K: std::hash::Hash + Eq>(map: &mut AHashMap<K, Type>, key: K, ty: Option<Type>) {
    let Some(ty) = ty.filter(|t| *t != Type::Void) else {
        return;
    };
    let merged = match map.get(&key) {
        Some(existing) => widen(existing, &ty),
        None => ty,
    };
    map.insert(key, merged);
}

impl Lowerer<'_> {
    pub(super) fn observe_var(&mut self, key: Position, ty: Option<Type>) {
        if self.known.is_some() {
            record(&mut self.observed.vars, key, ty);
        }
    }

    pub(super) fn observe_param(&mut self, function: &str, index: usize, ty: Option<Type>) {
        if self.known.is_some() {
            record(&mut self.observed.params, (function.to_string(), index), ty);
        }
    }

    pub(super) fn observe_return(&mut self, function: &str, ty: Option<Type>) {
        if self.known.is_some() {
            self.observed.returns_value.insert(function.to_string());
            record(&mut self.observed.returns, function.to_string(), ty);
        }
    }

    pub(super) fn observe_assignment(&mut self, target: &LValue, value: &Expression) {
        if self.known.is_none() {
            return;
        }
        let ty = self.type_of(value);
        let Some(key) = self.lookup(target.name()).map(|b| b.key) else {
            return;
        };
        match target {
            LValue::Var(_) => self.observe_var(key, ty),
            LValue::Index { .. } => self.observe_var(key, ty.map(Type::array_of)),
        }
    }

    /// Type of a declared variable: what every round saw flow into it
    pub(super) fn js_var_type(&self, key: Position, init: Option<Type>) -> Option<Type> {
        let known = self.known.and_then(|k| k.vars.get(&key).cloned());
        let ty = known.or(init);
        if self.finalize {
            Some(ty.unwrap_or(Type::Double))
        } else {
            ty
        }
    }

    pub(super) fn js_param_known(&self, function: &str, index: usize) -> bool {
        self.known.map_or(false, |k| k.params.contains_key(&(function.to_string(), index)))
    }

    pub(super) fn js_param_type(&self, function: &str, index: usize) -> Option<Type> {
        let known = self.known?.params.get(&(function.to_string(), index)).cloned();
        if self.finalize {
            Some(known.unwrap_or(Type::Double))
        } else {
            known
        }
    }

    pub(super) fn js_return_type(&self, function: &str) -> Option<Type> {
        let known = self.known?;
        if let Some(ty) = known.returns.get(function) {
            return Some(ty.clone());
        }
        if self.round == 0 {
            return None;
        }
        if known.returns_value.contains(function) {
            self.finalize.then_some(Type::Double)
        } else {
            Some(Type::Void)
        }
    }

    /// Declare, at the top of the function, every `var` that also appears in
    /// a nested block
    pub(super) fn hoist_vars(&mut self, body: &[Stmt]) -> Vec<Statement> {
        let mut found = Vec::new();
        collect_vars(body, false, &mut found);
        let nested: AHashSet<&str> = found.iter().filter(|(_, _, n)| *n).map(|(name, _, _)| name.as_str()).collect();

        let mut out = Vec::new();
        let mut seen = AHashSet::new();
        for (name, pos, _) in &found {
            if !nested.contains(name.as_str()) || !seen.insert(name.clone()) {
                continue;
            }
            let ty = self.js_var_type(*pos, None);
            if self.bind(name, ty.clone(), *pos, BindingKind::HoistedVar).is_ok() {
                out.push(Statement::Declare { name: name.clone(), ty: ty.unwrap_or(Type::Double), init: None });
            }
        }
        out
    }

    /// The script body as an entry point, unless the script defines `main`
    /// itself and only calls it
    pub(super) fn script_main(&mut self, decls: &[&FunctionDecl], top_level: &[&Stmt]) -> Option<FunctionDecl> {
        for stmt in top_level {
            if let Stmt::VarDecl(decl) = stmt {
                self.globals.extend(decl.declarators.iter().map(|d| d.name.clone()));
            }
        }
        let pos = top_level.first().map(|s| s.pos()).unwrap_or_default();

        if decls.iter().any(|f| f.name == ENTRY_POINT) {
            if !top_level.iter().all(|s| is_entry_call(s)) {
                self.errors.push(LoweringError::invalid(
                    "top-level statements next to a function named 'main'",
                    pos,
                ));
            }
            return None;
        }

        Some(FunctionDecl {
            name: ENTRY_POINT.to_string(),
            modifiers: Vec::new(),
            return_type: None,
            params: Vec::new(),
            body: Some(cst::Block { stmts: top_level.iter().map(|s| (*s).clone()).collect(), pos }),
            pos,
        })
    }

    /// `new Array(n).fill(0)` and friends get the element type the
    /// variable settled on
    pub(super) fn retype_array_init(&self, init: &mut Option<Expression>, ty: Option<&Type>) {
        let Some(Type::Array(settled)) = ty else {
            return;
        };
        if let Some(Expression::ArrayNew { elem, .. } | Expression::ArrayLiteral { elem, .. }) = init {
            *elem = (**settled).clone();
        }
    }
}

/// `main();` or a bare directive string
fn is_entry_call(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Expr { expr: Expr::Call { callee, args, .. }, .. } => {
            args.is_empty() && matches!(callee.as_ref(), Expr::Identifier { name, .. } if name == ENTRY_POINT)
        }
        Stmt::Expr { expr: Expr::Literal { .. }, .. } | Stmt::Empty(_) => true,
        _ => false,
    }
}

fn collect_vars(stmts: &[Stmt], nested: bool, out: &mut Vec<(String, Position, bool)>) {
    for stmt in stmts {
        collect_stmt_vars(stmt, nested, out);
    }
}

fn collect_stmt_vars(stmt: &Stmt, nested: bool, out: &mut Vec<(String, Position, bool)>) {
    match stmt {
        Stmt::VarDecl(decl) if decl.keyword.as_deref() == Some("var") => {
            out.extend(decl.declarators.iter().map(|d| (d.name.clone(), d.pos, nested)));
        }
        Stmt::If { then_branch, else_branch, .. } => {
            collect_stmt_vars(then_branch, true, out);
            if let Some(b) = else_branch {
                collect_stmt_vars(b, true, out);
            }
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::Label { body, .. } => {
            collect_stmt_vars(body, true, out)
        }
        Stmt::For { init, body, .. } => {
            if let Some(init) = init {
                collect_stmt_vars(init, true, out);
            }
            collect_stmt_vars(body, true, out);
        }
        Stmt::ForEach { keyword, name, body, pos, .. } => {
            if keyword.as_deref() == Some("var") {
                out.push((name.clone(), *pos, true));
            }
            collect_stmt_vars(body, true, out);
        }
        Stmt::Block(block) => collect_vars(&block.stmts, true, out),
        _ => {}
    }
}

pub(super) struct JsRules;

pub(super) static RULES: JsRules = JsRules;

impl SourceRules for JsRules {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn lower_type(&self, ty: &TypeSpec) -> LResult<Option<Type>> {
        Err(LoweringError::UnknownType { name: ty.base.clone(), position: ty.pos })
    }

    fn statement(&self, lw: &mut Lowerer<'_>, expr: &Expr) -> Option<LResult<Vec<Statement>>> {
        let Expr::Call { callee, args, pos } = expr else {
            return None;
        };
        match callee.path().as_deref() {
            Some("console.log") => Some(console_log(lw, args)),
            Some("console.error") | Some("console.warn") => Some(Err(LoweringError::unsupported("stderr output", *pos))),
            Some("process.stdout.write") => Some((|| {
                let [value] = args.as_slice() else {
                    return Err(LoweringError::invalid("process.stdout.write takes one argument", *pos));
                };
                let value = lw.lower_expr(value)?;
                Ok(lw.print_statements(vec![PrintItem::Value(value)]))
            })()),
            _ => None,
        }
    }

    fn call(&self, lw: &mut Lowerer<'_>, callee: &Expr, args: &[Expr], pos: Position) -> Option<LResult<Expression>> {
        if let Some(path) = callee.path() {
            if let Some(name) = path.strip_prefix("Math.") {
                return Some(math_call(lw, name, args, pos));
            }
            let unsupported = match path.as_str() {
                "parseInt" | "parseFloat" | "Number" | "String" | "Boolean" => Some("type conversion"),
                "require" => Some("module import"),
                "prompt" | "readline" => Some("input"),
                "console.log" | "console.error" | "process.stdout.write" => Some("output inside an expression"),
                "Array.from" | "Array.isArray" | "Object.keys" | "Object.values" | "JSON.stringify" | "JSON.parse" => {
                    Some("standard library call")
                }
                "setTimeout" | "setInterval" => Some("timer"),
                _ => None,
            };
            if let Some(kind) = unsupported {
                return Some(Err(LoweringError::unsupported(kind, pos)));
            }
        }

        let Expr::Member { object, name, .. } = callee else {
            return None;
        };
        match name.as_str() {
            "fill" => Some(array_fill(lw, object, args, pos)),
            "charAt" => Some((|| {
                let [index] = args else {
                    return Err(LoweringError::invalid("charAt takes one argument", pos));
                };
                Ok(Expression::Index { array: Box::new(lw.lower_expr(object)?), index: Box::new(lw.lower_expr(index)?) })
            })()),
            "push" | "pop" | "shift" | "unshift" | "splice" | "slice" | "map" | "filter" | "reduce" | "forEach"
            | "join" | "sort" | "reverse" | "indexOf" | "includes" | "concat" | "split" | "substring" | "toUpperCase"
            | "toLowerCase" | "trim" | "repeat" | "charCodeAt" | "toString" | "toFixed" => {
                Some(Err(LoweringError::unsupported(format!("method '.{}'", name), pos)))
            }
            _ => None,
        }
    }

    fn member(&self, lw: &mut Lowerer<'_>, object: &Expr, name: &str, _pos: Position) -> Option<LResult<Expression>> {
        let constant = match (object.path().as_deref(), name) {
            (Some("Math"), "PI") => Some(Literal::Double(std::f64::consts::PI)),
            (Some("Math"), "E") => Some(Literal::Double(std::f64::consts::E)),
            (Some("Number"), "MAX_SAFE_INTEGER") => Some(Literal::Long(9_007_199_254_740_991)),
            (Some("Number"), "MIN_SAFE_INTEGER") => Some(Literal::Long(-9_007_199_254_740_991)),
            _ => None,
        };
        if let Some(literal) = constant {
            return Some(Ok(Expression::Literal(literal)));
        }
        (name == "length").then(|| lw.length_of(object))
    }

    fn floating_division(&self) -> bool {
        true
    }
}

fn console_log(lw: &mut Lowerer<'_>, args: &[Expr]) -> LResult<Vec<Statement>> {
    let mut items = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            items.push(PrintItem::Value(Expression::string(" ")));
        }
        items.push(PrintItem::Value(lw.lower_expr(arg)?));
    }
    items.push(PrintItem::Newline);
    Ok(lw.print_statements(items))
}

/// JavaScript's rounding functions return integral numbers
fn math_call(lw: &mut Lowerer<'_>, name: &str, args: &[Expr], pos: Position) -> LResult<Expression> {
    match name {
        "floor" | "ceil" | "trunc" => {
            let builtin = match name {
                "floor" => Builtin::Floor,
                "ceil" => Builtin::Ceil,
                _ => Builtin::Trunc,
            };
            Ok(Expression::cast(Type::Long, lw.builtin_call(builtin, args, pos)?))
        }
        "round" => {
            let [value] = args else {
                return Err(LoweringError::invalid("Math.round takes one argument", pos));
            };
            let value = lw.lower_expr(value)?;
            let shifted = Expression::binary(BinOp::Add, value, Expression::Literal(Literal::Double(0.5)));
            Ok(Expression::cast(Type::Long, Expression::builtin(Builtin::Floor, vec![shifted])))
        }
        "random" => Err(LoweringError::unsupported("random numbers", pos)),
        "min" | "max" if args.len() != 2 => Err(LoweringError::unsupported(format!("Math.{} over {} values", name, args.len()), pos)),
        "sqrt" | "abs" | "pow" | "min" | "max" => match Builtin::from_math_name(name) {
            Some(builtin) => lw.builtin_call(builtin, args, pos),
            None => Err(LoweringError::unsupported(format!("Math.{}", name), pos)),
        },
        other => Err(LoweringError::unsupported(format!("Math.{}", other), pos)),
    }
}

/// `new Array(n).fill(0)` is a zero-filled array
fn array_fill(lw: &mut Lowerer<'_>, object: &Expr, args: &[Expr], pos: Position) -> LResult<Expression> {
    let Expr::New { class, args: ctor_args, .. } = object else {
        return Err(LoweringError::unsupported("method '.fill'", pos));
    };
    let ([len], [fill]) = (ctor_args.as_slice(), args) else {
        return Err(LoweringError::unsupported("Array constructor form", pos));
    };
    if class != "Array" {
        return Err(LoweringError::unsupported("object construction", pos));
    }
    let len = lw.lower_expr(len)?;
    let fill = lw.lower_expr(fill)?;
    if !is_zero_literal(&fill) {
        return Err(LoweringError::unsupported("array fill value other than zero", pos));
    }
    let elem = lw.type_of(&fill).unwrap_or(Type::Long);
    Ok(Expression::ArrayNew { elem, len: Box::new(len) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Budget;
    use crate::ir::{Callee, Function};
    use crate::parser;

    fn lower_js(src: &str) -> Result<Program, Vec<LoweringError>> {
        let cst = parser::parse(src, Language::JavaScript, &mut Budget::unlimited(), 25).unwrap();
        super::super::lower(&cst)
    }

    fn function<'p>(program: &'p Program, name: &str) -> &'p Function {
        program.function(name).unwrap()
    }

    #[test]
    fn test_script_gets_typed_functions_and_entry_point() {
        let program = lower_js("function fib(n) {\n  if (n < 2) return n\n  return fib(n - 1) + fib(n - 2)\n}\nconsole.log(fib(10))\n").unwrap();
        let fib = function(&program, "fib");
        assert_eq!(fib.params[0].ty, Type::Long);
        assert_eq!(fib.return_type, Type::Long);
        let main = function(&program, "main");
        assert_eq!(main.return_type, Type::Void);
        assert_eq!(
            main.body.statements,
            vec![Statement::Expr(Expression::builtin(
                Builtin::Println,
                vec![Expression::call("fib", vec![Expression::Literal(Literal::Long(10))])]
            ))]
        );
    }

    #[test]
    fn test_integer_division_produces_double() {
        let program = lower_js("function half(n) { return n / 2; }\nconsole.log(half(5));").unwrap();
        let half = function(&program, "half");
        assert_eq!(half.params[0].ty, Type::Long);
        assert_eq!(half.return_type, Type::Double);
    }

    #[test]
    fn test_integers_are_64_bit() {
        let program = lower_js("let p = 1;\nfor (let i = 0; i < 40; i++) { p = p * 2; }\nconsole.log(p);").unwrap();
        let main = function(&program, "main");
        assert_eq!(
            main.body.statements[0],
            Statement::Declare { name: "p".to_string(), ty: Type::Long, init: Some(Expression::Literal(Literal::Long(1))) }
        );
    }

    #[test]
    fn test_variable_widened_by_later_assignment() {
        let program = lower_js("let x = 1;\nx = x / 2;\nconsole.log(x);").unwrap();
        let main = function(&program, "main");
        assert!(matches!(&main.body.statements[0], Statement::Declare { ty: Type::Double, .. }));
    }

    #[test]
    fn test_nested_var_is_hoisted() {
        let program = lower_js("function last(n) { for (var i = 0; i < n; i++) {} return i; }\nconsole.log(last(3));").unwrap();
        let last = function(&program, "last");
        assert!(matches!(&last.body.statements[0], Statement::Declare { name, init: None, .. } if name == "i"));
        let Statement::For { init, .. } = &last.body.statements[1] else { panic!("expected for") };
        assert!(matches!(init.as_deref(), Some(Statement::Assign { .. })));
    }

    #[test]
    fn test_function_using_top_level_variable_is_unsupported() {
        let errors = lower_js("const limit = 10;\nfunction f() { return limit; }\nconsole.log(f());").unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, LoweringError::UnsupportedConstruct { kind, .. } if kind == "global variable")));
    }

    #[test]
    fn test_stdout_write_prints_without_newline() {
        let program = lower_js("process.stdout.write(\"n = \");\nconsole.log(3);").unwrap();
        let body = &function(&program, "main").body.statements;
        assert_eq!(
            body[0],
            Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::string("n = ")]))
        );
        assert!(matches!(&body[1], Statement::Expr(Expression::Call { callee: Callee::Builtin(Builtin::Println), .. })));
        let errors = lower_js("process.stdout.write(\"a\", \"b\");").unwrap_err();
        assert!(matches!(&errors[0], LoweringError::Invalid { .. }));
    }

    #[test]
    fn test_explicit_main_call_is_dropped() {
        let program = lower_js("function main() { console.log(\"hi\"); }\nmain();").unwrap();
        assert_eq!(program.functions.len(), 1);
        assert!(lower_js("function main() { }\nlet x = 1;").is_err());
    }

    #[test]
    fn test_array_fill_and_length() {
        let program = lower_js(
            "function total(n) {\n  const a = new Array(n).fill(0);\n  let s = 0;\n  for (let i = 0; i < a.length; i++) { a[i] = i * 1.5; s += a[i]; }\n  return s;\n}\nconsole.log(total(4));",
        )
        .unwrap();
        let total = function(&program, "total");
        let Statement::Declare { ty, init: Some(Expression::ArrayNew { elem, .. }), .. } = &total.body.statements[0] else {
            panic!("expected array declaration");
        };
        assert_eq!(*ty, Type::array_of(Type::Double));
        assert_eq!(*elem, Type::Double);
        assert_eq!(total.return_type, Type::Double);
    }

    #[test]
    fn test_library_calls() {
        let program = lower_js("let r = Math.floor(7 / 2);\nconsole.log(r, Math.max(r, 2));").unwrap();
        let main = function(&program, "main");
        assert!(matches!(&main.body.statements[0], Statement::Declare { ty: Type::Long, init: Some(Expression::Cast { .. }), .. }));
        let errors = lower_js("const xs = [];\nxs.push(1);").unwrap_err();
        assert!(matches!(&errors[0], LoweringError::UnsupportedConstruct { kind, .. } if kind == "method '.push'"));
    }

    #[test]
    fn test_string_condition_checks_length() {
        let program = lower_js("let s = \"abc\";\nif (s) { console.log(s); }").unwrap();
        let Statement::If { cond, .. } = &function(&program, "main").body.statements[1] else { panic!("expected if") };
        assert_eq!(
            *cond,
            Expression::binary(
                BinOp::Ne,
                Expression::builtin(Builtin::Len, vec![Expression::var("s")]),
                Expression::int(0)
            )
        );
    }
}
