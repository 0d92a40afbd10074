// File: src/lower/c.rs
//
// C lowering rules. Most of this is shared with C++: scalar type names,
// <stdio.h> output, <math.h>, <string.h> and <limits.h>.

use super::{LResult, Lowerer, PrintItem, SourceRules};
use crate::cst::{Expr, TypeSpec};
use crate::errors::{LoweringError, Position};
use crate::ir::{BinOp, Builtin, Expression, Literal, Statement, Type};
use crate::language::Language;
use crate::lexer::LiteralKind;

pub(super) struct CRules;

pub(super) static RULES: CRules = CRules;

impl SourceRules for CRules {
    fn language(&self) -> Language {
        Language::C
    }

    fn lower_type(&self, ty: &TypeSpec) -> LResult<Option<Type>> {
        let base = scalar(&ty.base).ok_or_else(|| unknown_type(ty))?;
        with_declarators(base, ty).map(Some)
    }

    fn directive(&self, text: &str, pos: Position) -> LResult<()> {
        directive(text, pos)
    }

    fn statement(&self, lw: &mut Lowerer<'_>, expr: &Expr) -> Option<LResult<Vec<Statement>>> {
        let Expr::Call { callee, args, pos } = expr else {
            return None;
        };
        let Expr::Identifier { name, .. } = callee.as_ref() else {
            return None;
        };
        if lw.is_function(name) {
            return None;
        }
        output_items(lw, name, args, *pos).map(|items| items.map(|items| lw.print_statements(items)))
    }

    fn call(&self, lw: &mut Lowerer<'_>, callee: &Expr, args: &[Expr], pos: Position) -> Option<LResult<Expression>> {
        let Expr::Identifier { name, .. } = callee else {
            return None;
        };
        library_call(lw, name, args, pos)
    }

    fn member(&self, _lw: &mut Lowerer<'_>, _object: &Expr, _name: &str, _pos: Position) -> Option<LResult<Expression>> {
        None
    }

    fn constant(&self, name: &str) -> Option<Expression> {
        constant(name)
    }

    fn comparison(&self, lw: &mut Lowerer<'_>, op: &str, lhs: &Expr, rhs: &Expr) -> Option<LResult<Expression>> {
        strcmp_comparison(lw, op, lhs, rhs)
    }
}

/// Scalar types spelled the same way in C and C++
pub(super) fn scalar(base: &str) -> Option<Type> {
    Some(match base {
        "int" | "short" | "short int" | "signed" | "unsigned" | "int8_t" | "int16_t" | "int32_t" | "uint8_t"
        | "uint16_t" | "uint32_t" => Type::Int,
        "long" | "long int" | "long long" | "long long int" | "size_t" | "int64_t" | "uint64_t" | "ptrdiff_t" => {
            Type::Long
        }
        "float" => Type::Float,
        "double" | "long double" => Type::Double,
        "char" => Type::Char,
        "bool" | "_Bool" => Type::Bool,
        "void" => Type::Void,
        _ => return None,
    })
}

pub(super) fn unknown_type(ty: &TypeSpec) -> LoweringError {
    LoweringError::UnknownType { name: ty.base.clone(), position: ty.pos }
}

/// Apply pointer and array declarators to a base type. `char*` is a string.
pub(super) fn with_declarators(base: Type, ty: &TypeSpec) -> LResult<Type> {
    let mut out = match (ty.pointer_depth, base) {
        (0, t) => t,
        (1, Type::Char) => Type::String,
        _ => return Err(LoweringError::unsupported("pointer", ty.pos)),
    };
    for _ in 0..ty.array_dims {
        out = Type::array_of(out);
    }
    Ok(out)
}

pub(super) fn directive(text: &str, pos: Position) -> LResult<()> {
    let name = text
        .trim_start_matches('#')
        .trim_start()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .unwrap_or_default();
    match name {
        "include" | "pragma" => Ok(()),
        "define" | "undef" => Err(LoweringError::unsupported("macro", pos)),
        "if" | "ifdef" | "ifndef" | "elif" | "else" | "endif" => {
            Err(LoweringError::unsupported("conditional compilation", pos))
        }
        _ => Err(LoweringError::unsupported("preprocessor directive", pos)),
    }
}

/// <stdio.h> output calls as print pieces
pub(super) fn output_items(lw: &mut Lowerer<'_>, name: &str, args: &[Expr], pos: Position) -> Option<LResult<Vec<PrintItem>>> {
    let items = match (name, args) {
        ("printf", [format, rest @ ..]) => lw.format_items(format, rest, pos),
        ("fprintf", [Expr::Identifier { name: stream, .. }, format, rest @ ..]) if stream == "stdout" => {
            lw.format_items(format, rest, pos)
        }
        ("fprintf", _) => Err(LoweringError::unsupported("stderr output", pos)),
        ("puts", [value]) => lw.lower_expr(value).map(|v| vec![PrintItem::Value(v), PrintItem::Newline]),
        ("putchar", [value]) => lw.lower_expr(value).map(|v| {
            let v = match v {
                Expression::Literal(Literal::Int(code)) => match u32::try_from(code).ok().and_then(char::from_u32) {
                    Some(c) => Expression::Literal(Literal::Char(c)),
                    None => Expression::cast(Type::Char, Expression::Literal(Literal::Int(code))),
                },
                other if lw.type_of(&other) == Some(Type::Char) => other,
                other => Expression::cast(Type::Char, other),
            };
            vec![PrintItem::Value(v)]
        }),
        ("printf" | "puts" | "putchar", _) => {
            Err(LoweringError::invalid(format!("wrong number of arguments to {}", name), pos))
        }
        _ => return None,
    };
    Some(items)
}

/// <math.h>, <string.h> and the library calls we refuse by name
pub(super) fn library_call(lw: &mut Lowerer<'_>, name: &str, args: &[Expr], pos: Position) -> Option<LResult<Expression>> {
    if name == "strlen" {
        return Some(match args {
            [value] => lw.length_of(value),
            _ => Err(LoweringError::invalid("strlen takes one argument", pos)),
        });
    }
    if let Some(builtin) = Builtin::from_math_name(name) {
        return Some(lw.builtin_call(builtin, args, pos));
    }
    let kind = match name {
        "printf" | "puts" | "putchar" | "fprintf" => "output inside an expression",
        "scanf" | "gets" | "fgets" | "getchar" | "getline" => "input",
        "malloc" | "calloc" | "realloc" | "free" => "dynamic memory",
        "rand" | "srand" => "random numbers",
        "time" | "clock" => "time",
        "round" | "lround" | "llround" => "round",
        "strcpy" | "strncpy" | "strcat" | "strncat" | "sprintf" | "snprintf" | "strtok" | "strchr" | "strstr"
        | "memset" | "memcpy" => "string library",
        "atoi" | "atof" | "atol" | "strtol" | "strtod" => "string parsing",
        "strcmp" => "strcmp other than a comparison with zero",
        "exit" | "abort" => "exit",
        "qsort" | "bsearch" => "standard algorithm",
        _ => return None,
    };
    Some(Err(LoweringError::unsupported(kind, pos)))
}

/// <limits.h> and <math.h> constants
pub(super) fn constant(name: &str) -> Option<Expression> {
    let literal = match name {
        "INT_MAX" => Literal::Int(i32::MAX as i64),
        "INT_MIN" => Literal::Int(i32::MIN as i64),
        "LONG_MAX" | "LLONG_MAX" => Literal::Long(i64::MAX),
        "LONG_MIN" | "LLONG_MIN" => Literal::Long(i64::MIN),
        "M_PI" => Literal::Double(std::f64::consts::PI),
        "M_E" => Literal::Double(std::f64::consts::E),
        "EXIT_SUCCESS" => Literal::Int(0),
        "EXIT_FAILURE" => Literal::Int(1),
        _ => return None,
    };
    Some(Expression::Literal(literal))
}

/// `strcmp(a, b) == 0` is string equality
pub(super) fn strcmp_comparison(lw: &mut Lowerer<'_>, op: &str, lhs: &Expr, rhs: &Expr) -> Option<LResult<Expression>> {
    let bin = match op {
        "==" => BinOp::Eq,
        "!=" => BinOp::Ne,
        _ => return None,
    };
    let is_zero = |e: &Expr| matches!(e, Expr::Literal { kind: LiteralKind::Integer, raw, .. } if raw == "0");
    let call = if is_zero(rhs) {
        lhs
    } else if is_zero(lhs) {
        rhs
    } else {
        return None;
    };
    let Expr::Call { callee, args, pos } = call else {
        return None;
    };
    let Expr::Identifier { name, .. } = callee.as_ref() else {
        return None;
    };
    if name != "strcmp" && name != "std::strcmp" {
        return None;
    }
    Some(match args.as_slice() {
        [a, b] => match (lw.lower_expr(a), lw.lower_expr(b)) {
            (Ok(a), Ok(b)) => Ok(Expression::binary(bin, a, b)),
            (Err(err), _) | (_, Err(err)) => Err(err),
        },
        _ => Err(LoweringError::invalid("strcmp takes two arguments", *pos)),
    })
}
