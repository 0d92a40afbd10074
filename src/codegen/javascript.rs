// File: src/codegen/javascript.rs
//
// JavaScript (Node) backend. Every number is a double, so integer division
// and narrowing casts truncate explicitly; characters are one-character
// strings.

use super::{
    concatenation, float_text, number, without_final_success, Backend, Rendered, Style, Syntax, Writer, PREC_ATOM,
};
use crate::ir::{BinOp, Builtin, Expression, Literal, Program, Type};
use crate::language::Language;
use crate::lexer::{escape_char, escape_string};

pub(super) struct JavaScriptBackend;

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do", "else",
    "export", "extends", "finally", "for", "function", "if", "import", "in", "instanceof", "let", "new", "return",
    "super", "switch", "this", "throw", "try", "typeof", "var", "void", "while", "with", "yield", "await", "enum",
    "implements", "interface", "package", "private", "protected", "public", "static", "null", "true", "false",
    "undefined", "NaN", "Infinity", "arguments", "eval", "Math", "console", "process", "String", "Array", "Number",
    "Object",
];

impl Backend for JavaScriptBackend {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn render(&self, program: &Program, style: &Style) -> String {
        let program = without_final_success(program);
        let mut w = Writer::new(self, &program, style);
        for function in &program.functions {
            let params = w.begin_function(function, &[]);
            w.out.open(format!("function {}({})", w.names.function(&function.name), params.join(", ")));
            w.body(&function.body);
            w.out.close("");
            w.out.blank();
        }
        if let Some(entry) = program.entry() {
            let call = format!("{}();", w.names.function(&entry.name));
            w.out.line(call);
        }
        format!("{}\n", w.finish().0.trim())
    }
}

impl JavaScriptBackend {
    fn output_call(&self, w: &mut Writer<'_>, items: &[&Expression], newline: bool) -> String {
        if newline {
            format!("console.log({})", concatenation(w, items, false))
        } else {
            format!("process.stdout.write({})", concatenation(w, items, true))
        }
    }
}

impl Syntax for JavaScriptBackend {
    fn reserved(&self) -> &'static [&'static str] {
        RESERVED
    }

    fn zero_init(&self) -> bool {
        true
    }

    fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Int | Type::Long | Type::Float | Type::Double => "number",
            Type::Bool => "boolean",
            Type::Char | Type::String => "string",
            Type::Void => "undefined",
            Type::Array(_) => "Array",
        }
        .to_string()
    }

    fn literal(&self, lit: &Literal) -> Rendered {
        match lit {
            Literal::Int(v) | Literal::Long(v) => number(v.to_string()),
            Literal::Float(v) | Literal::Double(v) if v.is_nan() => Rendered::atom("NaN"),
            Literal::Float(v) | Literal::Double(v) if v.is_infinite() => {
                number(if *v > 0.0 { "Infinity" } else { "-Infinity" }.to_string())
            }
            Literal::Float(v) | Literal::Double(v) => number(float_text(*v)),
            Literal::Bool(b) => Rendered::atom(b.to_string()),
            Literal::Char(c) => Rendered::atom(format!("'{}'", escape_char(*c))),
            Literal::Str(s) => Rendered::atom(format!("\"{}\"", escape_string(s))),
        }
    }

    fn declaration(&self, _ty: &Type, name: &str, init: Option<String>, constant: bool) -> String {
        let keyword = if constant { "const" } else { "let" };
        match init {
            Some(init) => format!("{} {} = {}", keyword, name, init),
            None => format!("{} {}", keyword, name),
        }
    }

    fn declare_array(&self, w: &mut Writer<'_>, _ir_name: &str, name: &str, elem: &Type, init: &Expression) {
        let value = self.array_value(w, elem, init).text;
        w.out.line(format!("const {} = {};", name, value));
    }

    fn array_value(&self, w: &mut Writer<'_>, elem: &Type, init: &Expression) -> Rendered {
        match init {
            Expression::ArrayLiteral { items, .. } => {
                let values: Vec<String> = items.iter().map(|item| w.coerce(item, elem)).collect();
                Rendered::atom(format!("[{}]", values.join(", ")))
            }
            Expression::ArrayNew { len, .. } => {
                let len = w.coerce(len, &Type::Int);
                let zero = Literal::zero_of(elem).map_or_else(|| "0".to_string(), |z| self.literal(&z).text);
                Rendered::atom(format!("new Array({}).fill({})", len, zero))
            }
            other => w.expr(other),
        }
    }

    fn print(&self, w: &mut Writer<'_>, items: &[&Expression], newline: bool) {
        if items.is_empty() && !newline {
            return;
        }
        let call = self.output_call(w, items, newline);
        w.out.line(format!("{};", call));
    }

    fn builtin(&self, w: &mut Writer<'_>, builtin: Builtin, args: &[Expression]) -> Rendered {
        match builtin {
            Builtin::Print | Builtin::Println => {
                let items: Vec<&Expression> = args.iter().collect();
                Rendered::atom(self.output_call(w, &items, builtin == Builtin::Println))
            }
            Builtin::Len => {
                let value = w.expr(&args[0]).at(PREC_ATOM);
                Rendered::atom(format!("{}.length", value))
            }
            _ => {
                let values: Vec<String> = args.iter().map(|a| w.expr(a).text).collect();
                Rendered::atom(format!("Math.{}({})", builtin.name(), values.join(", ")))
            }
        }
    }

    fn cast(&self, _w: &mut Writer<'_>, to: &Type, from: &Type, value: Rendered) -> Rendered {
        if to.is_integral() && from.is_floating() {
            Rendered::atom(format!("Math.trunc({})", value.text))
        } else if *to == Type::Char && from.is_integral() {
            Rendered::atom(format!("String.fromCharCode({})", value.text))
        } else if to.is_integral() && *from == Type::Char {
            Rendered::atom(format!("{}.charCodeAt(0)", value.at(PREC_ATOM)))
        } else {
            value
        }
    }

    fn binary(&self, w: &mut Writer<'_>, op: BinOp, lhs: &Expression, rhs: &Expression, lt: &Type, rt: &Type) -> Option<Rendered> {
        let p = op.precedence();
        match op {
            BinOp::Div if lt.is_integral() && rt.is_integral() => {
                let a = w.expr(lhs).at(p);
                let b = w.expr(rhs).at(p + 1);
                Some(Rendered::atom(format!("Math.trunc({} / {})", a, b)))
            }
            BinOp::Eq | BinOp::Ne => {
                let a = w.expr(lhs).at(p);
                let b = w.expr(rhs).at(p + 1);
                let symbol = if op == BinOp::Eq { "===" } else { "!==" };
                Some(Rendered::new(format!("{} {} {}", a, symbol, b), p))
            }
            _ => None,
        }
    }

    fn return_statement(&self, w: &mut Writer<'_>, value: Option<&Expression>) -> String {
        match value {
            Some(Expression::Literal(Literal::Int(0))) if w.is_entry() => "return;".to_string(),
            Some(value) if w.is_entry() => format!("process.exit({});", w.coerce(value, &Type::Int)),
            Some(value) => {
                let ty = w.return_type();
                format!("return {};", w.coerce(value, &ty))
            }
            None => "return;".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::factorial_program;
    use super::*;
    use crate::ir::{Block, Function, LValue, Statement};

    fn render(program: &Program) -> String {
        JavaScriptBackend.render(program, &Style::default())
    }

    #[test]
    fn test_factorial_script_calls_main() {
        assert_eq!(
            render(&factorial_program()),
            "function factorial(n) {\n    if (n <= 1) {\n        return 1;\n    }\n    return n * factorial(n - 1);\n}\n\nfunction main() {\n    console.log(factorial(5));\n}\n\nmain();\n"
        );
    }

    #[test]
    fn test_integer_division_and_declarations() {
        let main = Function {
            name: "main".to_string(),
            params: vec![],
            return_type: Type::Void,
            body: Block::new(vec![
                Statement::Declare { name: "total".to_string(), ty: Type::Int, init: None },
                Statement::Declare { name: "step".to_string(), ty: Type::Int, init: Some(Expression::int(7)) },
                Statement::Assign {
                    target: LValue::Var("total".to_string()),
                    value: Expression::binary(BinOp::Div, Expression::var("step"), Expression::int(2)),
                },
                Statement::Declare {
                    name: "zeros".to_string(),
                    ty: Type::array_of(Type::Double),
                    init: Some(Expression::ArrayNew { elem: Type::Double, len: Box::new(Expression::var("step")) }),
                },
                Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::var("total")])),
            ]),
        };
        let code = render(&Program::new(vec![main]));
        assert!(code.contains("let total = 0;"));
        assert!(code.contains("const step = 7;"));
        assert!(code.contains("total = Math.trunc(step / 2);"));
        assert!(code.contains("const zeros = new Array(step).fill(0.0);"));
        assert!(code.contains("process.stdout.write(\"\" + total);"));
    }

    #[test]
    fn test_strict_equality_and_char_casts() {
        let main = Function {
            name: "main".to_string(),
            params: vec![],
            return_type: Type::Void,
            body: Block::new(vec![
                Statement::Declare { name: "c".to_string(), ty: Type::Char, init: Some(Expression::Literal(Literal::Char('a'))) },
                Statement::Expr(Expression::builtin(
                    Builtin::Println,
                    vec![Expression::binary(
                        BinOp::Eq,
                        Expression::cast(Type::Int, Expression::var("c")),
                        Expression::int(97),
                    )],
                )),
            ]),
        };
        let code = render(&Program::new(vec![main]));
        assert!(code.contains("const c = 'a';"));
        assert!(code.contains("console.log(c.charCodeAt(0) === 97);"));
    }
}
