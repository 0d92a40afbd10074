// File: src/lower/java.rs
//
// Java lowering rules. Conditions must already be boolean, strings are
// objects with `length()`, `charAt()` and `equals()`, and the static
// methods of every top-level class share one namespace.

use super::{LResult, Lowerer, PrintItem, SourceRules};
use crate::cst::{Expr, TypeSpec};
use crate::errors::{LoweringError, Position};
use crate::ir::{BinOp, Builtin, Expression, Literal, Statement, Type};
use crate::language::Language;

pub(super) struct JavaRules;

pub(super) static RULES: JavaRules = JavaRules;

const LIBRARY_CLASSES: &[&str] = &[
    "Integer", "Long", "Double", "Float", "Character", "Boolean", "String", "Arrays", "Collections", "Objects",
    "List", "Thread", "Scanner", "StringBuilder",
];

const COLLECTION_TYPES: &[&str] = &[
    "List", "ArrayList", "LinkedList", "Map", "HashMap", "TreeMap", "Set", "HashSet", "TreeSet", "Queue", "Deque",
    "ArrayDeque", "Stack", "PriorityQueue", "Optional", "Scanner", "StringBuilder", "Object", "Random",
];

impl SourceRules for JavaRules {
    fn language(&self) -> Language {
        Language::Java
    }

    fn lower_type(&self, ty: &TypeSpec) -> LResult<Option<Type>> {
        let mut out = match ty.base.as_str() {
            "int" | "short" | "byte" | "Integer" | "Short" | "Byte" => Type::Int,
            "long" | "Long" => Type::Long,
            "float" | "Float" => Type::Float,
            "double" | "Double" => Type::Double,
            "boolean" | "Boolean" => Type::Bool,
            "char" | "Character" => Type::Char,
            "String" | "java.lang.String" => Type::String,
            "void" => Type::Void,
            "var" => return Ok(None),
            name if COLLECTION_TYPES.contains(&name) => {
                return Err(LoweringError::unsupported(format!("class type '{}'", name), ty.pos))
            }
            _ => return Err(LoweringError::UnknownType { name: ty.base.clone(), position: ty.pos }),
        };
        for _ in 0..ty.array_dims {
            out = Type::array_of(out);
        }
        Ok(Some(out))
    }

    fn statement(&self, lw: &mut Lowerer<'_>, expr: &Expr) -> Option<LResult<Vec<Statement>>> {
        let Expr::Call { callee, args, pos } = expr else {
            return None;
        };
        let path = callee.path()?;
        let items = match (path.as_str(), args.as_slice()) {
            ("System.out.println", []) => Ok(vec![PrintItem::Newline]),
            ("System.out.println", [value]) => lw.lower_expr(value).map(|v| vec![PrintItem::Value(v), PrintItem::Newline]),
            ("System.out.print", [value]) => lw.lower_expr(value).map(|v| vec![PrintItem::Value(v)]),
            ("System.out.printf" | "System.out.format", [format, rest @ ..]) => lw.format_items(format, rest, *pos),
            ("System.out.println" | "System.out.print" | "System.out.printf" | "System.out.format", _) => {
                Err(LoweringError::invalid(format!("wrong number of arguments to {}", path), *pos))
            }
            (p, _) if p.starts_with("System.err.") => Err(LoweringError::unsupported("stderr output", *pos)),
            _ => return None,
        };
        Some(items.map(|items| lw.print_statements(items)))
    }

    fn call(&self, lw: &mut Lowerer<'_>, callee: &Expr, args: &[Expr], pos: Position) -> Option<LResult<Expression>> {
        let Expr::Member { object, name, .. } = callee else {
            return None;
        };
        if let Some(class) = object.path() {
            match class.as_str() {
                "Math" => return Some(math_call(lw, name, args, pos)),
                "System" => {
                    let kind = match name.as_str() {
                        "exit" => "exit".to_string(),
                        "currentTimeMillis" | "nanoTime" => "time".to_string(),
                        other => format!("library call 'System.{}'", other),
                    };
                    return Some(Err(LoweringError::unsupported(kind, pos)));
                }
                "System.out" | "System.err" => {
                    return Some(Err(LoweringError::unsupported("output inside an expression", pos)))
                }
                c if LIBRARY_CLASSES.contains(&c) => {
                    return Some(Err(LoweringError::unsupported(format!("library call '{}.{}'", c, name), pos)))
                }
                _ => {}
            }
        }
        match (name.as_str(), args) {
            ("length", []) => Some(lw.length_of(object)),
            ("charAt", [index]) => Some((|| {
                Ok(Expression::Index { array: Box::new(lw.lower_expr(object)?), index: Box::new(lw.lower_expr(index)?) })
            })()),
            ("equals", [other]) => Some((|| {
                let lhs = lw.lower_expr(object)?;
                let rhs = lw.lower_expr(other)?;
                Ok(lw.make_binary(BinOp::Eq, lhs, rhs))
            })()),
            ("isEmpty", []) => {
                Some(lw.length_of(object).map(|len| Expression::binary(BinOp::Eq, len, Expression::int(0))))
            }
            (
                "substring" | "indexOf" | "toCharArray" | "compareTo" | "contains" | "split" | "toUpperCase"
                | "toLowerCase" | "trim" | "clone" | "hashCode" | "toString" | "add" | "get" | "put" | "size",
                _,
            ) => Some(Err(LoweringError::unsupported(format!("method '.{}'", name), pos))),
            _ => None,
        }
    }

    fn member(&self, lw: &mut Lowerer<'_>, object: &Expr, name: &str, _pos: Position) -> Option<LResult<Expression>> {
        let constant = match (object.path().as_deref(), name) {
            (Some("Math"), "PI") => Some(Literal::Double(std::f64::consts::PI)),
            (Some("Math"), "E") => Some(Literal::Double(std::f64::consts::E)),
            (Some("Integer"), "MAX_VALUE") => Some(Literal::Int(i32::MAX as i64)),
            (Some("Integer"), "MIN_VALUE") => Some(Literal::Int(i32::MIN as i64)),
            (Some("Long"), "MAX_VALUE") => Some(Literal::Long(i64::MAX)),
            (Some("Long"), "MIN_VALUE") => Some(Literal::Long(i64::MIN)),
            (Some("Double"), "MAX_VALUE") => Some(Literal::Double(f64::MAX)),
            _ => None,
        };
        if let Some(literal) = constant {
            return Some(Ok(Expression::Literal(literal)));
        }
        (name == "length").then(|| lw.length_of(object))
    }

    fn truthy_conditions(&self) -> bool {
        false
    }
}

/// java.lang.Math; `round` rounds half up to a long
fn math_call(lw: &mut Lowerer<'_>, name: &str, args: &[Expr], pos: Position) -> LResult<Expression> {
    match name {
        "sqrt" | "abs" | "pow" | "floor" | "ceil" | "min" | "max" => match Builtin::from_math_name(name) {
            Some(builtin) => lw.builtin_call(builtin, args, pos),
            None => Err(LoweringError::unsupported(format!("Math.{}", name), pos)),
        },
        "round" => {
            let [value] = args else {
                return Err(LoweringError::invalid("Math.round takes one argument", pos));
            };
            let value = lw.lower_expr(value)?;
            let shifted = Expression::binary(BinOp::Add, value, Expression::Literal(Literal::Double(0.5)));
            Ok(Expression::cast(Type::Long, Expression::builtin(Builtin::Floor, vec![shifted])))
        }
        "random" => Err(LoweringError::unsupported("random numbers", pos)),
        other => Err(LoweringError::unsupported(format!("Math.{}", other), pos)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Budget;
    use crate::ir::Program;
    use crate::parser;

    fn lower_java(src: &str) -> Result<Program, Vec<LoweringError>> {
        let cst = parser::parse(src, Language::Java, &mut Budget::unlimited(), 25).unwrap();
        super::super::lower(&cst)
    }

    fn kind(errors: &[LoweringError]) -> String {
        match &errors[0] {
            LoweringError::UnsupportedConstruct { kind, .. } => kind.clone(),
            other => panic!("expected unsupported construct, got {:?}", other),
        }
    }

    #[test]
    fn test_main_prints_concatenation_piecewise() {
        let program = lower_java(
            "public class Main {\n  public static void main(String[] args) {\n    int n = 3;\n    System.out.println(\"n = \" + n);\n  }\n}",
        )
        .unwrap();
        let main = program.entry().unwrap();
        assert_eq!(main.return_type, Type::Void);
        assert!(main.params.is_empty());
        assert_eq!(
            main.body.statements[1..],
            [
                Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::string("n = ")])),
                Statement::Expr(Expression::builtin(Builtin::Println, vec![Expression::var("n")])),
            ]
        );
    }

    #[test]
    fn test_string_methods() {
        let program = lower_java(
            "class S { static boolean same(String a, String b) { return a.equals(b) && a.length() > 0 && a.charAt(0) == 'x'; } }",
        )
        .unwrap();
        let Statement::Return(Some(Expression::Binary { op: BinOp::And, .. })) = &program.functions[0].body.statements[0]
        else {
            panic!("expected conjunction");
        };
    }

    #[test]
    fn test_math_round_and_constants() {
        let program = lower_java("class M { static long r(double x) { return Math.round(x) + Integer.MAX_VALUE; } }").unwrap();
        let Statement::Return(Some(Expression::Binary { lhs, rhs, .. })) = &program.functions[0].body.statements[0] else {
            panic!("expected return");
        };
        assert!(matches!(lhs.as_ref(), Expression::Cast { ty: Type::Long, .. }));
        assert_eq!(**rhs, Expression::Literal(Literal::Int(2147483647)));
    }

    #[test]
    fn test_object_oriented_constructs_are_unsupported() {
        let errors = lower_java("class A { int count; int get() { return count; } }").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(kind(&errors), "field");
        assert_eq!(kind(&errors[1..]), "instance method");

        let errors = lower_java("class A { static void main(String[] args) { System.out.println(args.length); } }").unwrap_err();
        assert_eq!(kind(&errors), "command-line arguments");

        let errors = lower_java("import java.util.*;\nclass A { static int f() { List<Integer> xs = new ArrayList<>(); return 0; } }").unwrap_err();
        assert_eq!(kind(&errors), "class type 'List'");
    }

    #[test]
    fn test_class_qualified_calls_resolve_to_static_methods() {
        let program = lower_java(
            "class Util { static int sq(int x) { return x * x; } }\nclass Main { public static void main(String[] a) { System.out.println(Util.sq(3)); } }",
        )
        .unwrap();
        let main = program.entry().unwrap();
        assert_eq!(
            main.body.statements[0],
            Statement::Expr(Expression::builtin(
                Builtin::Println,
                vec![Expression::call("sq", vec![Expression::int(3)])]
            ))
        );
    }
}
