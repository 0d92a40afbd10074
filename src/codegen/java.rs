// File: src/codegen/java.rs
//
// Java backend: every function becomes a static method of `Main`. The entry
// point has no exit status in Java, so a non-zero `return` from it turns
// into System.exit.

use super::{
    concatenation, float_text, number, without_final_success, Backend, Rendered, Style, Syntax, Writer, PREC_ATOM,
    PREC_UNARY,
};
use crate::ir::{BinOp, Builtin, Expression, Function, Literal, Program, Type};
use crate::language::Language;
use crate::lexer::{escape_char, escape_string};

pub(super) struct JavaBackend;

const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const", "continue",
    "default", "do", "double", "else", "enum", "extends", "final", "finally", "float", "for", "goto", "if",
    "implements", "import", "instanceof", "int", "interface", "long", "native", "new", "package", "private",
    "protected", "public", "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this",
    "throw", "throws", "transient", "try", "void", "volatile", "while", "true", "false", "null", "var", "record",
    "yield", "Main", "Math", "System", "String", "args",
];

impl Backend for JavaBackend {
    fn language(&self) -> Language {
        Language::Java
    }

    fn render(&self, program: &Program, style: &Style) -> String {
        let program = without_final_success(program);
        let mut w = Writer::new(self, &program, style);
        w.out.open("public class Main");
        for (i, function) in program.functions.iter().enumerate() {
            if i > 0 {
                w.out.blank();
            }
            let extra: &[&str] = if function.is_entry() { &["args"] } else { &[] };
            let params = w.begin_function(function, extra);
            let signature = self.signature(&w, function, &params);
            w.out.open(signature);
            w.body(&function.body);
            w.out.close("");
        }
        w.out.close("");
        w.finish().0
    }
}

impl JavaBackend {
    fn signature(&self, w: &Writer<'_>, function: &Function, params: &[String]) -> String {
        if function.is_entry() {
            return "public static void main(String[] args)".to_string();
        }
        let list: Vec<String> = function
            .params
            .iter()
            .zip(params)
            .map(|(param, name)| format!("{} {}", self.type_name(&param.ty), name))
            .collect();
        format!(
            "public static {} {}({})",
            self.type_name(&function.return_type),
            w.names.function(&function.name),
            list.join(", ")
        )
    }

    fn output_call(&self, w: &mut Writer<'_>, items: &[&Expression], newline: bool) -> String {
        let method = if newline { "println" } else { "print" };
        format!("System.out.{}({})", method, concatenation(w, items, false))
    }
}

impl Syntax for JavaBackend {
    fn reserved(&self) -> &'static [&'static str] {
        RESERVED
    }

    fn rename_shadowed(&self) -> bool {
        true
    }

    fn int_indices(&self) -> bool {
        true
    }

    fn zero_init(&self) -> bool {
        true
    }

    fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Int => "int".to_string(),
            Type::Long => "long".to_string(),
            Type::Float => "float".to_string(),
            Type::Double => "double".to_string(),
            Type::Bool => "boolean".to_string(),
            Type::Char => "char".to_string(),
            Type::String => "String".to_string(),
            Type::Void => "void".to_string(),
            Type::Array(elem) => format!("{}[]", self.type_name(elem)),
        }
    }

    fn literal(&self, lit: &Literal) -> Rendered {
        match lit {
            Literal::Int(v) => number(v.to_string()),
            Literal::Long(v) => number(format!("{}L", v)),
            Literal::Float(v) if v.is_finite() => number(format!("{}f", float_text(*v))),
            Literal::Float(v) => Rendered::new(format!("(float) {}", float_text(*v)), PREC_UNARY),
            Literal::Double(v) => number(float_text(*v)),
            Literal::Bool(b) => Rendered::atom(b.to_string()),
            Literal::Char(c) => Rendered::atom(format!("'{}'", escape_char(*c))),
            Literal::Str(s) => Rendered::atom(format!("\"{}\"", escape_string(s))),
        }
    }

    fn declaration(&self, ty: &Type, name: &str, init: Option<String>, _constant: bool) -> String {
        match init {
            Some(init) => format!("{} {} = {}", self.type_name(ty), name, init),
            None => format!("{} {}", self.type_name(ty), name),
        }
    }

    fn declare_array(&self, w: &mut Writer<'_>, _ir_name: &str, name: &str, elem: &Type, init: &Expression) {
        let ty = self.type_name(&Type::array_of(elem.clone()));
        match init {
            Expression::ArrayLiteral { items, .. } => {
                let values: Vec<String> = items.iter().map(|item| w.coerce(item, elem)).collect();
                w.out.line(format!("{} {} = {{{}}};", ty, name, values.join(", ")));
            }
            Expression::ArrayNew { len, .. } => {
                let len = w.coerce(len, &Type::Int);
                w.out.line(format!("{} {} = new {}[{}];", ty, name, self.type_name(elem), len));
                // Only strings start out as null rather than their zero value
                if *elem == Type::String {
                    let i = w.names.fresh("i");
                    w.out.open(format!("for (int {i} = 0; {i} < {name}.length; {i}++)", i = i, name = name));
                    w.out.line(format!("{}[{}] = \"\";", name, i));
                    w.out.close("");
                }
            }
            other => {
                let value = w.expr(other).text;
                w.out.line(format!("{} {} = {};", ty, name, value));
            }
        }
    }

    fn array_value(&self, w: &mut Writer<'_>, elem: &Type, init: &Expression) -> Rendered {
        match init {
            Expression::ArrayLiteral { items, .. } => {
                let values: Vec<String> = items.iter().map(|item| w.coerce(item, elem)).collect();
                Rendered::atom(format!("new {}[]{{{}}}", self.type_name(elem), values.join(", ")))
            }
            Expression::ArrayNew { len, .. } => {
                let len = w.coerce(len, &Type::Int);
                Rendered::atom(format!("new {}[{}]", self.type_name(elem), len))
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
                let ty = w.type_of(&args[0]);
                let value = w.expr(&args[0]).at(PREC_ATOM);
                if ty == Type::String {
                    Rendered::atom(format!("{}.length()", value))
                } else {
                    Rendered::atom(format!("{}.length", value))
                }
            }
            Builtin::Trunc => {
                let value = w.expr(&args[0]).at(PREC_UNARY);
                Rendered::new(format!("(double) (long) {}", value), PREC_UNARY)
            }
            _ => {
                let values: Vec<String> = args.iter().map(|a| w.expr(a).text).collect();
                Rendered::atom(format!("Math.{}({})", builtin.name(), values.join(", ")))
            }
        }
    }

    fn cast(&self, _w: &mut Writer<'_>, to: &Type, _from: &Type, value: Rendered) -> Rendered {
        Rendered::new(format!("({}) {}", self.type_name(to), value.at(PREC_UNARY)), PREC_UNARY)
    }

    fn binary(&self, w: &mut Writer<'_>, op: BinOp, lhs: &Expression, rhs: &Expression, lt: &Type, rt: &Type) -> Option<Rendered> {
        if !matches!(op, BinOp::Eq | BinOp::Ne) || *lt != Type::String || *rt != Type::String {
            return None;
        }
        let a = w.expr(lhs).at(PREC_ATOM);
        let b = w.expr(rhs).text;
        let call = format!("{}.equals({})", a, b);
        Some(if op == BinOp::Eq { Rendered::atom(call) } else { Rendered::new(format!("!{}", call), PREC_UNARY) })
    }

    fn index(&self, _w: &mut Writer<'_>, array: Rendered, index: Rendered, container: &Type) -> Rendered {
        if *container == Type::String {
            Rendered::atom(format!("{}.charAt({})", array.at(PREC_ATOM), index.text))
        } else {
            Rendered::atom(format!("{}[{}]", array.at(PREC_ATOM), index.text))
        }
    }

    fn return_statement(&self, w: &mut Writer<'_>, value: Option<&Expression>) -> String {
        match value {
            Some(Expression::Literal(Literal::Int(0))) if w.is_entry() => "return;".to_string(),
            Some(value) if w.is_entry() => format!("System.exit({});", w.coerce(value, &Type::Int)),
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
    use crate::ir::{Block, Param, Statement};

    fn render(program: &Program) -> String {
        JavaBackend.render(program, &Style::default())
    }

    #[test]
    fn test_factorial_inside_main_class() {
        let code = render(&factorial_program());
        assert_eq!(
            code,
            "public class Main {\n    public static int factorial(int n) {\n        if (n <= 1) {\n            return 1;\n        }\n        return n * factorial(n - 1);\n    }\n\n    public static void main(String[] args) {\n        System.out.println(factorial(5));\n    }\n}\n"
        );
    }

    #[test]
    fn test_print_runs_become_one_concatenation() {
        let main = Function {
            name: "main".to_string(),
            params: vec![],
            return_type: Type::Int,
            body: Block::new(vec![
                Statement::Declare { name: "n".to_string(), ty: Type::Int, init: Some(Expression::int(2)) },
                Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::var("n")])),
                Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::string(" + 1 = ")])),
                Statement::Expr(Expression::builtin(
                    Builtin::Println,
                    vec![Expression::binary(BinOp::Add, Expression::var("n"), Expression::int(1))],
                )),
                Statement::Return(Some(Expression::int(0))),
            ]),
        };
        let code = render(&Program::new(vec![main]));
        assert!(code.contains("System.out.println(\"\" + n + \" + 1 = \" + (n + 1));"));
        assert!(!code.contains("return"));
    }

    #[test]
    fn test_strings_use_methods_and_shadowing_is_renamed() {
        let f = Function {
            name: "first".to_string(),
            params: vec![Param::new("s", Type::String)],
            return_type: Type::Bool,
            body: Block::new(vec![
                Statement::Declare { name: "ok".to_string(), ty: Type::Bool, init: None },
                Statement::If {
                    cond: Expression::binary(BinOp::Ne, Expression::var("s"), Expression::string("")),
                    then_block: Block::new(vec![
                        Statement::Declare {
                            name: "s".to_string(),
                            ty: Type::Char,
                            init: Some(Expression::Index {
                                array: Box::new(Expression::var("s")),
                                index: Box::new(Expression::int(0)),
                            }),
                        },
                        Statement::Assign {
                            target: crate::ir::LValue::Var("ok".to_string()),
                            value: Expression::binary(BinOp::Eq, Expression::var("s"), Expression::Literal(Literal::Char('x'))),
                        },
                    ]),
                    else_block: None,
                },
                Statement::Return(Some(Expression::var("ok"))),
            ]),
        };
        let code = render(&Program::new(vec![f]));
        assert!(code.contains("boolean ok = false;"));
        assert!(code.contains("if (!s.equals(\"\")) {"));
        assert!(code.contains("char s2 = s.charAt(0);"));
        assert!(code.contains("ok = s2 == 'x';"));
    }

    #[test]
    fn test_non_zero_exit_status() {
        let main = Function {
            name: "main".to_string(),
            params: vec![],
            return_type: Type::Int,
            body: Block::new(vec![Statement::Return(Some(Expression::int(3)))]),
        };
        assert!(render(&Program::new(vec![main])).contains("System.exit(3);"));
    }
}
