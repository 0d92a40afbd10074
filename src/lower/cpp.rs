// File: src/lower/cpp.rs
//
// C++ lowering rules: the C rules plus std::string, std::vector as the
// array type, iostream output and a handful of <algorithm> helpers.

use super::c;
use super::{writes_array, LResult, Lowerer, PrintItem, SourceRules};
use crate::cst::{Expr, ParamDecl, Stmt, TypeSpec};
use crate::errors::{LoweringError, Position};
use crate::ir::{BinOp, Builtin, Expression, Statement, Type};
use crate::language::Language;

pub(super) struct CppRules;

pub(super) static RULES: CppRules = CppRules;

const UNSUPPORTED_CONTAINERS: &[&str] = &[
    "map", "unordered_map", "set", "unordered_set", "multiset", "multimap", "list", "deque", "queue", "stack",
    "priority_queue", "pair", "tuple", "array", "optional", "stringstream", "istringstream", "ostringstream",
];

fn strip_std(name: &str) -> &str {
    name.strip_prefix("std::").unwrap_or(name)
}

impl SourceRules for CppRules {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn lower_type(&self, ty: &TypeSpec) -> LResult<Option<Type>> {
        let base = match strip_std(&ty.base) {
            "auto" => {
                if ty.pointer_depth > 0 || ty.array_dims > 0 {
                    return Err(LoweringError::unsupported("pointer", ty.pos));
                }
                return Ok(None);
            }
            "string" => Type::String,
            "vector" => {
                let [elem] = ty.generic_args.as_slice() else {
                    return Err(LoweringError::invalid("vector takes one element type", ty.pos));
                };
                match self.lower_type(elem)? {
                    Some(elem) => Type::array_of(elem),
                    None => return Err(LoweringError::invalid("vector of an inferred type", ty.pos)),
                }
            }
            name if UNSUPPORTED_CONTAINERS.contains(&name) => {
                return Err(LoweringError::unsupported(format!("std::{}", name), ty.pos))
            }
            name => c::scalar(name).ok_or_else(|| c::unknown_type(ty))?,
        };
        c::with_declarators(base, ty).map(Some)
    }

    fn directive(&self, text: &str, pos: Position) -> LResult<()> {
        c::directive(text, pos)
    }

    /// Scalars and strings passed by mutable reference would need an
    /// out-parameter in every target. Arrays are shared with the caller in
    /// every target, so a vector taken by value must not be modified.
    fn check_param(&self, param: &ParamDecl, body: &[Stmt]) -> LResult<()> {
        let Some(ty) = &param.ty else {
            return Ok(());
        };
        let lowered = self.lower_type(ty)?;
        if !ty.is_reference {
            if matches!(lowered, Some(Type::Array(_))) && ty.array_dims == 0 && writes_array(body, &param.name) {
                return Err(LoweringError::unsupported("modified vector parameter passed by value", param.pos));
            }
            return Ok(());
        }
        if ty.is_const() {
            return Ok(());
        }
        match lowered {
            Some(Type::Array(_)) => Ok(()),
            _ => Err(LoweringError::unsupported("reference parameter", param.pos)),
        }
    }

    fn statement(&self, lw: &mut Lowerer<'_>, expr: &Expr) -> Option<LResult<Vec<Statement>>> {
        if let Some(items) = stream_items(lw, expr) {
            return Some(items.map(|items| lw.print_statements(items)));
        }
        let Expr::Call { callee, args, pos } = expr else {
            return None;
        };
        let Expr::Identifier { name, .. } = callee.as_ref() else {
            return None;
        };
        if lw.is_function(name) {
            return None;
        }
        if strip_std(name) == "swap" {
            return Some(swap(lw, args, *pos));
        }
        c::output_items(lw, strip_std(name), args, *pos).map(|items| items.map(|items| lw.print_statements(items)))
    }

    fn call(&self, lw: &mut Lowerer<'_>, callee: &Expr, args: &[Expr], pos: Position) -> Option<LResult<Expression>> {
        match callee {
            Expr::Identifier { name, .. } => {
                let short = strip_std(name);
                if let Some(result) = c::library_call(lw, short, args, pos) {
                    return Some(result);
                }
                let kind = match short {
                    "to_string" | "stoi" | "stol" | "stoll" | "stod" => "string conversion",
                    "sort" | "reverse" | "fill" | "accumulate" | "find" | "count" | "max_element" | "min_element"
                    | "binary_search" | "lower_bound" | "upper_bound" => "standard algorithm",
                    "swap" => "swap inside an expression",
                    "getline" => "input",
                    _ => return None,
                };
                Some(Err(LoweringError::unsupported(kind, pos)))
            }
            Expr::Member { object, name, .. } => match (name.as_str(), args) {
                ("size" | "length", []) => Some(lw.length_of(object)),
                ("empty", []) => Some(lw.length_of(object).map(|len| Expression::binary(BinOp::Eq, len, Expression::int(0)))),
                ("at", [index]) => Some((|| {
                    Ok(Expression::Index { array: Box::new(lw.lower_expr(object)?), index: Box::new(lw.lower_expr(index)?) })
                })()),
                _ => Some(Err(LoweringError::unsupported(format!("method '.{}'", name), pos))),
            },
            _ => None,
        }
    }

    fn member(&self, _lw: &mut Lowerer<'_>, _object: &Expr, _name: &str, _pos: Position) -> Option<LResult<Expression>> {
        None
    }

    fn constant(&self, name: &str) -> Option<Expression> {
        c::constant(strip_std(name))
    }

    fn comparison(&self, lw: &mut Lowerer<'_>, op: &str, lhs: &Expr, rhs: &Expr) -> Option<LResult<Expression>> {
        c::strcmp_comparison(lw, op, lhs, rhs)
    }
}

/// `cout << a << b << endl` as print pieces; `cin`/`cerr` are refused
fn stream_items(lw: &mut Lowerer<'_>, expr: &Expr) -> Option<LResult<Vec<PrintItem>>> {
    let Expr::Binary { op, pos, .. } = expr else {
        return None;
    };
    let mut operands = Vec::new();
    let mut current = expr;
    while let Expr::Binary { op: link, lhs, rhs, .. } = current {
        if link != op {
            break;
        }
        operands.push(rhs.as_ref());
        current = lhs;
    }
    let Expr::Identifier { name: stream, .. } = current else {
        return None;
    };
    match (strip_std(stream), op.as_str()) {
        ("cout", "<<") => {}
        ("cerr" | "clog", "<<") => return Some(Err(LoweringError::unsupported("stderr output", *pos))),
        ("cin", ">>") => return Some(Err(LoweringError::unsupported("input", *pos))),
        _ => return None,
    }

    let mut items = Vec::new();
    for operand in operands.into_iter().rev() {
        match operand {
            Expr::Identifier { name, .. } if strip_std(name) == "endl" => items.push(PrintItem::Newline),
            Expr::Identifier { name, .. } if strip_std(name) == "flush" => {}
            Expr::Identifier { name, pos } if matches!(strip_std(name), "fixed" | "scientific" | "boolalpha") => {
                return Some(Err(LoweringError::unsupported("stream manipulator", *pos)))
            }
            Expr::Call { callee, pos, .. }
                if matches!(callee.path().as_deref().map(strip_std), Some("setprecision" | "setw" | "setfill")) =>
            {
                return Some(Err(LoweringError::unsupported("stream manipulator", *pos)))
            }
            other => match lw.lower_expr(other) {
                Ok(value) => items.push(PrintItem::Value(value)),
                Err(err) => return Some(Err(err)),
            },
        }
    }
    Some(Ok(items))
}

/// `swap(a[i], a[j])` through a fresh temporary
fn swap(lw: &mut Lowerer<'_>, args: &[Expr], pos: Position) -> LResult<Vec<Statement>> {
    let [a, b] = args else {
        return Err(LoweringError::invalid("swap takes two arguments", pos));
    };
    let first = lw.lower_lvalue(a)?;
    let second = lw.lower_lvalue(b)?;
    let ty = lw
        .type_of(&first.to_expression())
        .ok_or_else(|| LoweringError::invalid("cannot infer the type of swapped values", pos))?;
    let temp = lw.fresh_name("tmp");
    Ok(vec![
        Statement::Declare { name: temp.clone(), ty, init: Some(first.to_expression()) },
        Statement::Assign { target: first, value: second.to_expression() },
        Statement::Assign { target: second, value: Expression::var(temp) },
    ])
}
