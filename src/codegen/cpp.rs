// File: src/codegen/cpp.rs
//
// C++17 backend: std::vector for arrays, std::string for strings and
// iostream output. Names are always `std::` qualified.

use super::{float_text, number, Backend, Emitter, Rendered, Style, Syntax, Writer, PREC_ATOM, PREC_TERNARY, PREC_UNARY};
use crate::ir::typing::numeric_join;
use crate::ir::{BinOp, Builtin, Expression, Function, Literal, Program, Type};
use crate::language::Language;
use crate::lexer::{escape_char, escape_string};
use crate::validator::block_falls_through;

pub(super) struct CppBackend;

const RESERVED: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break", "case", "catch",
    "char", "class", "compl", "const", "constexpr", "const_cast", "continue", "decltype", "default", "delete", "do",
    "double", "dynamic_cast", "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend",
    "goto", "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr",
    "operator", "or", "or_eq", "private", "protected", "public", "register", "reinterpret_cast", "return",
    "short", "signed", "sizeof", "static", "static_assert", "static_cast", "struct", "switch", "template", "this",
    "throw", "true", "try", "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual", "void",
    "volatile", "while", "xor", "xor_eq", "std", "cout", "endl", "string", "vector",
];

impl Backend for CppBackend {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn render(&self, program: &Program, style: &Style) -> String {
        let mut w = Writer::new(self, program, style);
        let mut prototypes = Vec::new();
        for function in &program.functions {
            let params = w.begin_function(function, &[]);
            let signature = self.signature(&w, function, &params);
            if !function.is_entry() {
                prototypes.push(format!("{};", signature));
            }
            if uses_string(function) {
                w.need("string");
            }
            w.out.open(signature);
            w.body(&function.body);
            if function.is_entry() && function.return_type == Type::Int && block_falls_through(&function.body) {
                w.out.line("return 0;");
            }
            w.out.close("");
            w.out.blank();
        }
        let (body, needs) = w.finish();

        let mut out = Emitter::new(style);
        for header in &needs {
            out.line(format!("#include <{}>", header));
        }
        out.blank();
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

impl CppBackend {
    fn signature(&self, w: &Writer<'_>, function: &Function, params: &[String]) -> String {
        if function.is_entry() {
            return "int main()".to_string();
        }
        let list: Vec<String> = function
            .params
            .iter()
            .zip(params)
            .map(|(param, name)| match &param.ty {
                Type::Array(_) => format!("{}& {}", self.type_name(&param.ty), name),
                ty => format!("{} {}", self.type_name(ty), name),
            })
            .collect();
        format!("{} {}({})", self.type_name(&function.return_type), w.names.function(&function.name), list.join(", "))
    }

    fn vector_of(&self, w: &mut Writer<'_>, elem: &Type) -> String {
        w.need("vector");
        self.type_name(&Type::array_of(elem.clone()))
    }
}

/// Whether std::string appears in the function's signature or locals
fn uses_string(function: &Function) -> bool {
    let mentions = |ty: &Type| matches!(ty, Type::String) || ty.element() == Some(&Type::String);
    let mut found = mentions(&function.return_type) || function.params.iter().any(|p| mentions(&p.ty));
    function.body.walk_expressions(&mut |e| {
        found |= matches!(e, Expression::Literal(Literal::Str(_)) | Expression::Index { .. });
    });
    found
}

impl Syntax for CppBackend {
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
            Type::String => "std::string".to_string(),
            Type::Void => "void".to_string(),
            Type::Array(elem) => format!("std::vector<{}>", self.type_name(elem)),
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
        let ty = self.vector_of(w, elem);
        let line = match init {
            Expression::ArrayLiteral { items, .. } => {
                let values: Vec<String> = items.iter().map(|item| w.coerce(item, elem)).collect();
                format!("{} {} = {{{}}};", ty, name, values.join(", "))
            }
            Expression::ArrayNew { len, .. } => {
                let len = w.coerce(len, &Type::Int);
                format!("{} {}({});", ty, name, len)
            }
            other => format!("{} {} = {};", ty, name, w.expr(other).text),
        };
        w.out.line(line);
    }

    fn array_value(&self, w: &mut Writer<'_>, elem: &Type, init: &Expression) -> Rendered {
        let ty = self.vector_of(w, elem);
        match init {
            Expression::ArrayLiteral { items, .. } => {
                let values: Vec<String> = items.iter().map(|item| w.coerce(item, elem)).collect();
                Rendered::atom(format!("{}{{{}}}", ty, values.join(", ")))
            }
            Expression::ArrayNew { len, .. } => {
                let len = w.coerce(len, &Type::Int);
                Rendered::atom(format!("{}({})", ty, len))
            }
            other => w.expr(other),
        }
    }

    fn print(&self, w: &mut Writer<'_>, items: &[&Expression], newline: bool) {
        if items.is_empty() && !newline {
            return;
        }
        w.need("iostream");
        let mut chain = String::from("std::cout");
        for item in items {
            let ty = w.type_of(item);
            let rendered = w.expr(item);
            let text = if ty == Type::Bool {
                format!("({} ? \"true\" : \"false\")", rendered.at(PREC_TERNARY + 1))
            } else {
                rendered.at(BinOp::Shl.precedence() + 1)
            };
            chain.push_str(" << ");
            chain.push_str(&text);
        }
        if newline {
            chain.push_str(" << std::endl");
        }
        w.out.line(format!("{};", chain));
    }

    fn builtin(&self, w: &mut Writer<'_>, builtin: Builtin, args: &[Expression]) -> Rendered {
        let types: Vec<Type> = args.iter().map(|a| w.type_of(a)).collect();
        match builtin {
            Builtin::Print | Builtin::Println => {
                w.need("iostream");
                let mut chain = String::from("std::cout");
                for arg in args {
                    chain.push_str(" << ");
                    chain.push_str(&w.expr(arg).at(BinOp::Shl.precedence() + 1));
                }
                if builtin == Builtin::Println {
                    chain.push_str(" << std::endl");
                }
                Rendered::new(chain, BinOp::Shl.precedence())
            }
            Builtin::Len => {
                let value = w.expr(&args[0]).at(PREC_ATOM);
                Rendered::atom(format!("static_cast<int>({}.size())", value))
            }
            Builtin::Min | Builtin::Max => {
                w.need("algorithm");
                let result = numeric_join(&types[0], &types[1]).unwrap_or(Type::Int);
                let a = w.expr(&args[0]).text;
                let b = w.expr(&args[1]).text;
                let function = if builtin == Builtin::Min { "min" } else { "max" };
                if types[0] == types[1] {
                    Rendered::atom(format!("std::{}({}, {})", function, a, b))
                } else {
                    Rendered::atom(format!("std::{}<{}>({}, {})", function, self.type_name(&result), a, b))
                }
            }
            Builtin::Abs if types[0].is_integral() => {
                w.need("cstdlib");
                let value = w.expr(&args[0]).text;
                Rendered::atom(format!("std::abs({})", value))
            }
            Builtin::Abs | Builtin::Sqrt | Builtin::Pow | Builtin::Floor | Builtin::Ceil | Builtin::Trunc => {
                w.need("cmath");
                let values: Vec<String> = args.iter().map(|a| w.expr(a).text).collect();
                Rendered::atom(format!("std::{}({})", builtin.name(), values.join(", ")))
            }
        }
    }

    fn cast(&self, _w: &mut Writer<'_>, to: &Type, _from: &Type, value: Rendered) -> Rendered {
        Rendered::atom(format!("static_cast<{}>({})", self.type_name(to), value.text))
    }

    fn binary(&self, w: &mut Writer<'_>, op: BinOp, lhs: &Expression, rhs: &Expression, lt: &Type, rt: &Type) -> Option<Rendered> {
        if op != BinOp::Rem || !(lt.is_floating() || rt.is_floating()) {
            return None;
        }
        w.need("cmath");
        let a = w.expr(lhs).text;
        let b = w.expr(rhs).text;
        Some(Rendered::atom(format!("std::fmod({}, {})", a, b)))
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
