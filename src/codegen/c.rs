// File: src/codegen/c.rs
//
// C99 backend. Arrays decay to pointers, so every array travels with an
// `int` length variable: declarations introduce `<name>_len` and calls pass
// it as an extra argument. Output is one printf per print run.

use super::{float_text, number, Backend, Emitter, Rendered, Style, Syntax, Writer, PREC_ATOM, PREC_TERNARY, PREC_UNARY};
use crate::ir::typing::numeric_join;
use crate::ir::{BinOp, Block, Builtin, Expression, Function, Literal, Param, Program, Statement, Type};
use crate::language::Language;
use crate::lexer::escape_string;
use crate::validator::block_falls_through;

pub(super) struct CBackend;

const RESERVED: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else", "enum", "extern",
    "float", "for", "goto", "if", "inline", "int", "long", "register", "restrict", "return", "short", "signed",
    "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void", "volatile", "while", "bool",
    "true", "false", "_Bool", "NULL", "printf", "puts", "putchar", "abs", "llabs", "fabs", "sqrt", "pow", "floor",
    "ceil", "trunc", "fmin", "fmax", "fmod", "strlen", "strcmp", "calloc", "malloc", "free", "exit", "imin", "imax",
    "stdout",
];

impl Backend for CBackend {
    fn language(&self) -> Language {
        Language::C
    }

    fn render(&self, program: &Program, style: &Style) -> String {
        let mut w = Writer::new(self, program, style);
        let mut prototypes = Vec::new();
        for function in &program.functions {
            let params = w.begin_function(function, &[]);
            let signature = self.signature(&mut w, function, &params);
            if !function.is_entry() {
                prototypes.push(format!("{};", signature));
            }
            w.out.open(signature);
            w.body(&function.body);
            if function.is_entry() && block_falls_through(&function.body) {
                w.out.line("return 0;");
            }
            w.out.close("");
            w.out.blank();
        }
        if uses_bool(program) {
            w.need("stdbool.h");
        }
        let (body, needs) = w.finish();

        let mut out = Emitter::new(style);
        for header in needs.iter().filter(|n| n.ends_with(".h")) {
            out.line(format!("#include <{}>", header));
        }
        out.blank();
        for (helper, op) in [("imin", "<"), ("imax", ">")] {
            if needs.contains(helper) {
                out.open(format!("static long long {}(long long a, long long b)", helper));
                out.line(format!("return a {} b ? a : b;", op));
                out.close("");
                out.blank();
            }
        }
        if program.functions.len() > 1 {
            for prototype in &prototypes {
                out.line(prototype);
            }
            out.blank();
        }
        let mut text = out.finish();
        text.push_str(&body);
        format!("{}\n", text.trim())
    }
}

impl CBackend {
    /// The function header; array parameters get a length parameter
    fn signature(&self, w: &mut Writer<'_>, function: &Function, params: &[String]) -> String {
        if function.is_entry() {
            return "int main(void)".to_string();
        }
        let mut list = Vec::new();
        for (param, name) in function.params.iter().zip(params) {
            match &param.ty {
                Type::Array(elem) => {
                    let len = w.names.fresh(&format!("{}_len", name));
                    list.push(format!("{} {}[]", self.type_name(elem), name));
                    list.push(format!("int {}", len));
                    w.names.set_companion(&param.name, len);
                }
                ty => list.push(format!("{} {}", self.type_name(ty), name)),
            }
        }
        let list = if list.is_empty() { "void".to_string() } else { list.join(", ") };
        format!("{} {}({})", self.type_name(&function.return_type), w.names.function(&function.name), list)
    }

    /// A printf call for one print run, without the terminator
    fn printf(&self, w: &mut Writer<'_>, items: &[&Expression], newline: bool) -> String {
        w.need("stdio.h");
        let mut format = String::new();
        let mut args = Vec::new();
        for item in items {
            match item {
                Expression::Literal(Literal::Str(s)) => format.push_str(&format_text(s)),
                Expression::Literal(Literal::Char(c)) => format.push_str(&format_text(&c.to_string())),
                value => {
                    let ty = w.type_of(value);
                    let rendered = w.expr(value);
                    let (conversion, arg) = match ty {
                        Type::Long => ("%lld", rendered.text),
                        Type::Float | Type::Double => ("%g", rendered.text),
                        Type::Char => ("%c", rendered.text),
                        Type::String => ("%s", rendered.text),
                        Type::Bool => ("%s", format!("{} ? \"true\" : \"false\"", rendered.at(PREC_TERNARY + 1))),
                        _ => ("%d", rendered.text),
                    };
                    format.push_str(conversion);
                    args.push(arg);
                }
            }
        }
        if newline {
            format.push_str("\\n");
        }
        let mut call = format!("printf(\"{}\"", format);
        for arg in args {
            call.push_str(", ");
            call.push_str(&arg);
        }
        call.push(')');
        call
    }
}

fn format_text(s: &str) -> String {
    escape_string(s).replace('%', "%%")
}

impl Syntax for CBackend {
    fn reserved(&self) -> &'static [&'static str] {
        RESERVED
    }

    fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Int => "int".to_string(),
            Type::Long => "long long".to_string(),
            Type::Float => "float".to_string(),
            Type::Double => "double".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Char => "char".to_string(),
            Type::String => "const char*".to_string(),
            Type::Void => "void".to_string(),
            Type::Array(elem) => format!("{}*", self.type_name(elem)),
        }
    }

    fn literal(&self, lit: &Literal) -> Rendered {
        match lit {
            Literal::Int(v) if *v == i32::MIN as i64 => Rendered::new("(-2147483647 - 1)", PREC_ATOM),
            Literal::Int(v) => number(v.to_string()),
            Literal::Long(v) if *v == i64::MIN => Rendered::new("(-9223372036854775807LL - 1)", PREC_ATOM),
            Literal::Long(v) => number(format!("{}LL", v)),
            Literal::Float(v) if v.is_finite() => number(format!("{}f", float_text(*v))),
            Literal::Float(v) | Literal::Double(v) => number(float_text(*v)),
            Literal::Bool(b) => Rendered::atom(b.to_string()),
            Literal::Char(c) => Rendered::atom(format!("'{}'", crate::lexer::escape_char(*c))),
            Literal::Str(s) => Rendered::atom(format!("\"{}\"", escape_string(s))),
        }
    }

    fn declaration(&self, ty: &Type, name: &str, init: Option<String>, _constant: bool) -> String {
        match init {
            Some(init) => format!("{} {} = {}", self.type_name(ty), name, init),
            None => format!("{} {}", self.type_name(ty), name),
        }
    }

    fn declare_array(&self, w: &mut Writer<'_>, ir_name: &str, name: &str, elem: &Type, init: &Expression) {
        let elem_name = self.type_name(elem);
        let len = w.names.fresh(&format!("{}_len", name));
        match init {
            Expression::ArrayLiteral { items, .. } if items.is_empty() => {
                w.out.line(format!("{} {}[1];", elem_name, name));
                w.out.line(format!("int {} = 0;", len));
            }
            Expression::ArrayLiteral { items, .. } => {
                let values: Vec<String> = items.iter().map(|item| w.coerce(item, elem)).collect();
                w.out.line(format!("{} {}[] = {{{}}};", elem_name, name, values.join(", ")));
                w.out.line(format!("int {} = {};", len, items.len()));
            }
            Expression::ArrayNew { len: size, .. } => {
                let size = w.coerce(size, &Type::Int);
                w.out.line(format!("int {} = {};", len, size));
                w.out.line(format!("{} {}[{}];", elem_name, name, len));
                let zero = Literal::zero_of(elem).map_or_else(|| "0".to_string(), |z| self.literal(&z).text);
                let i = w.names.fresh("i");
                w.out.open(format!("for (int {i} = 0; {i} < {len}; {i}++)", i = i, len = len));
                w.out.line(format!("{}[{}] = {};", name, i, zero));
                w.out.close("");
            }
            other => {
                let value = w.expr(other).text;
                w.out.line(format!("{}* {} = {};", elem_name, name, value));
                w.out.line(format!("int {} = 0;", len));
            }
        }
        w.names.set_companion(ir_name, len);
    }

    fn array_value(&self, w: &mut Writer<'_>, elem: &Type, init: &Expression) -> Rendered {
        match init {
            Expression::ArrayLiteral { items, .. } => {
                let values: Vec<String> = items.iter().map(|item| w.coerce(item, elem)).collect();
                Rendered::atom(format!("({}[]){{{}}}", self.type_name(elem), values.join(", ")))
            }
            Expression::ArrayNew { len, .. } => {
                w.need("stdlib.h");
                let len = w.coerce(len, &Type::Int);
                Rendered::atom(format!("calloc({}, sizeof({}))", len, self.type_name(elem)))
            }
            other => w.expr(other),
        }
    }

    fn print(&self, w: &mut Writer<'_>, items: &[&Expression], newline: bool) {
        if items.is_empty() && !newline {
            return;
        }
        let call = self.printf(w, items, newline);
        w.out.line(format!("{};", call));
    }

    fn builtin(&self, w: &mut Writer<'_>, builtin: Builtin, args: &[Expression]) -> Rendered {
        let types: Vec<Type> = args.iter().map(|a| w.type_of(a)).collect();
        match builtin {
            Builtin::Print | Builtin::Println => {
                let items: Vec<&Expression> = args.iter().collect();
                Rendered::atom(self.printf(w, &items, builtin == Builtin::Println))
            }
            Builtin::Len => match (args.first(), types.first()) {
                (Some(Expression::VarRef(name)), Some(Type::Array(_))) => {
                    Rendered::atom(w.names.companion(name).unwrap_or_else(|| "0".to_string()))
                }
                (Some(value), _) => {
                    w.need("string.h");
                    let value = w.expr(value).text;
                    Rendered::new(format!("(int) strlen({})", value), PREC_UNARY)
                }
                (None, _) => Rendered::atom("0"),
            },
            Builtin::Abs => {
                let value = w.expr(&args[0]).text;
                let function = match types[0] {
                    Type::Long => "llabs",
                    Type::Float | Type::Double => "fabs",
                    _ => "abs",
                };
                w.need(if function == "fabs" { "math.h" } else { "stdlib.h" });
                Rendered::atom(format!("{}({})", function, value))
            }
            Builtin::Min | Builtin::Max => {
                let result = numeric_join(&types[0], &types[1]).unwrap_or(Type::Int);
                let a = w.expr(&args[0]).text;
                let b = w.expr(&args[1]).text;
                if result.is_floating() {
                    w.need("math.h");
                    let function = if builtin == Builtin::Min { "fmin" } else { "fmax" };
                    return Rendered::atom(format!("{}({}, {})", function, a, b));
                }
                let helper = if builtin == Builtin::Min { "imin" } else { "imax" };
                w.need(helper);
                let call = format!("{}({}, {})", helper, a, b);
                if result == Type::Int {
                    Rendered::new(format!("(int) {}", call), PREC_UNARY)
                } else {
                    Rendered::atom(call)
                }
            }
            Builtin::Sqrt | Builtin::Pow | Builtin::Floor | Builtin::Ceil | Builtin::Trunc => {
                w.need("math.h");
                let values: Vec<String> = args.iter().map(|a| w.expr(a).text).collect();
                Rendered::atom(format!("{}({})", builtin.name(), values.join(", ")))
            }
        }
    }

    fn cast(&self, _w: &mut Writer<'_>, to: &Type, _from: &Type, value: Rendered) -> Rendered {
        Rendered::new(format!("({}) {}", self.type_name(to), value.at(PREC_UNARY)), PREC_UNARY)
    }

    fn binary(&self, w: &mut Writer<'_>, op: BinOp, lhs: &Expression, rhs: &Expression, lt: &Type, rt: &Type) -> Option<Rendered> {
        match op {
            BinOp::Eq | BinOp::Ne if *lt == Type::String && *rt == Type::String => {
                w.need("string.h");
                let a = w.expr(lhs).text;
                let b = w.expr(rhs).text;
                Some(Rendered::new(format!("strcmp({}, {}) {} 0", a, b, op.symbol()), op.precedence()))
            }
            BinOp::Rem if lt.is_floating() || rt.is_floating() => {
                w.need("math.h");
                let a = w.expr(lhs).text;
                let b = w.expr(rhs).text;
                Some(Rendered::atom(format!("fmod({}, {})", a, b)))
            }
            _ => None,
        }
    }

    fn call_args(&self, w: &mut Writer<'_>, param: &Param, arg: &Expression) -> Vec<String> {
        match (&param.ty, arg) {
            (Type::Array(_), Expression::VarRef(name)) => {
                let len = w.names.companion(name).unwrap_or_else(|| "0".to_string());
                vec![w.names.get(name), len]
            }
            (Type::Array(_), other) => vec![w.expr(other).text, "0".to_string()],
            (ty, other) => vec![w.coerce(other, ty)],
        }
    }

    fn return_statement(&self, w: &mut Writer<'_>, value: Option<&Expression>) -> String {
        match value {
            Some(value) => {
                let ty = if w.is_entry() { Type::Int } else { w.return_type() };
                format!("return {};", w.coerce(value, &ty))
            }
            None if w.is_entry() => "return 0;".to_string(),
            None => "return;".to_string(),
        }
    }
}

/// Whether any declaration, signature or literal spells `bool`
fn uses_bool(program: &Program) -> bool {
    program.functions.iter().any(|f| {
        is_bool_based(&f.return_type) || f.params.iter().any(|p| is_bool_based(&p.ty)) || block_uses_bool(&f.body)
    })
}

fn is_bool_based(ty: &Type) -> bool {
    match ty {
        Type::Bool => true,
        Type::Array(elem) => is_bool_based(elem),
        _ => false,
    }
}

fn block_uses_bool(block: &Block) -> bool {
    let mut found = block.statements.iter().any(statement_declares_bool);
    block.walk_expressions(&mut |e| {
        found |= match e {
            Expression::Literal(Literal::Bool(_)) => true,
            Expression::Cast { ty, .. } => is_bool_based(ty),
            Expression::ArrayLiteral { elem, .. } | Expression::ArrayNew { elem, .. } => is_bool_based(elem),
            _ => false,
        };
    });
    found
}

fn statement_declares_bool(stmt: &Statement) -> bool {
    match stmt {
        Statement::Declare { ty, .. } => is_bool_based(ty),
        Statement::If { then_block, else_block, .. } => {
            then_block.statements.iter().any(statement_declares_bool)
                || else_block.as_ref().map_or(false, |b| b.statements.iter().any(statement_declares_bool))
        }
        Statement::While { body, .. } | Statement::Block(body) => body.statements.iter().any(statement_declares_bool),
        Statement::For { init, body, .. } => {
            init.as_deref().map_or(false, statement_declares_bool) || body.statements.iter().any(statement_declares_bool)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::factorial_program;
    use super::*;

    fn render(program: &Program) -> String {
        CBackend.render(program, &Style::default())
    }

    #[test]
    fn test_factorial_with_prototypes_and_printf() {
        let code = render(&factorial_program());
        assert!(code.starts_with("#include <stdio.h>\n\nint factorial(int n);\n"));
        assert!(code.contains("int factorial(int n) {\n    if (n <= 1) {\n        return 1;\n    }\n    return n * factorial(n - 1);\n}"));
        assert!(code.contains("int main(void) {\n    printf(\"%d\\n\", factorial(5));\n    return 0;\n}"));
    }

    #[test]
    fn test_arrays_carry_their_length() {
        let sum = Function {
            name: "sum".to_string(),
            params: vec![Param::new("xs", Type::array_of(Type::Int))],
            return_type: Type::Int,
            body: Block::new(vec![Statement::Return(Some(Expression::builtin(Builtin::Len, vec![Expression::var("xs")])))]),
        };
        let main = Function {
            name: "main".to_string(),
            params: vec![],
            return_type: Type::Int,
            body: Block::new(vec![
                Statement::Declare {
                    name: "a".to_string(),
                    ty: Type::array_of(Type::Int),
                    init: Some(Expression::ArrayLiteral { elem: Type::Int, items: vec![Expression::int(1), Expression::int(2)] }),
                },
                Statement::Declare {
                    name: "z".to_string(),
                    ty: Type::array_of(Type::Double),
                    init: Some(Expression::ArrayNew { elem: Type::Double, len: Box::new(Expression::int(3)) }),
                },
                Statement::Return(Some(Expression::call("sum", vec![Expression::var("a")]))),
            ]),
        };
        let code = render(&Program::new(vec![sum, main]));
        assert!(code.contains("int sum(int xs[], int xs_len) {\n    return xs_len;\n}"));
        assert!(code.contains("int a[] = {1, 2};\n    int a_len = 2;"));
        assert!(code.contains("int z_len = 3;\n    double z[z_len];\n    for (int i = 0; i < z_len; i++) {\n        z[i] = 0.0;\n    }"));
        assert!(code.contains("return sum(a, a_len);"));
    }

    #[test]
    fn test_strings_and_booleans() {
        let main = Function {
            name: "main".to_string(),
            params: vec![],
            return_type: Type::Void,
            body: Block::new(vec![
                Statement::Declare { name: "s".to_string(), ty: Type::String, init: Some(Expression::string("100%")) },
                Statement::Declare {
                    name: "same".to_string(),
                    ty: Type::Bool,
                    init: Some(Expression::binary(BinOp::Eq, Expression::var("s"), Expression::string("x"))),
                },
                Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::string("50% ")])),
                Statement::Expr(Expression::builtin(Builtin::Println, vec![Expression::var("same")])),
            ]),
        };
        let code = render(&Program::new(vec![main]));
        assert!(code.contains("#include <stdbool.h>\n#include <stdio.h>\n#include <string.h>"));
        assert!(code.contains("const char* s = \"100%\";"));
        assert!(code.contains("bool same = strcmp(s, \"x\") == 0;"));
        assert!(code.contains("printf(\"50%% %s\\n\", same ? \"true\" : \"false\");"));
    }

    #[test]
    fn test_integer_min_uses_helper() {
        let main = Function {
            name: "main".to_string(),
            params: vec![],
            return_type: Type::Void,
            body: Block::new(vec![Statement::Expr(Expression::builtin(
                Builtin::Println,
                vec![Expression::builtin(Builtin::Min, vec![Expression::int(3), Expression::int(4)])],
            ))]),
        };
        let code = render(&Program::new(vec![main]));
        assert!(code.contains("static long long imin(long long a, long long b) {\n    return a < b ? a : b;\n}"));
        assert!(code.contains("printf(\"%d\\n\", (int) imin(3, 4));"));
    }
}
