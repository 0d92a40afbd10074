// File: src/ir/typing.rs
//
// Typing rules shared by lowering, validation and every backend.
//
// The validator uses these rules to accept or reject a program; backends use
// the same rules to recover expression types while rendering (format
// specifiers, explicit narrowing casts). Keeping one table here means a
// program the validator accepts is typed identically everywhere.

use super::{BinOp, Builtin, Callee, Expression, Function, Param, Program, Type, UnOp};
use ahash::AHashMap;

/// How a value of one type may flow into a slot of another type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Exact,
    /// Lossless numeric promotion, e.g. int -> double
    Widening,
    /// Accepted with a warning, e.g. double -> int
    Narrowing,
    Incompatible,
}

pub fn coercion(from: &Type, to: &Type) -> Coercion {
    if from == to {
        return Coercion::Exact;
    }
    match (from.numeric_rank(), to.numeric_rank()) {
        (Some(f), Some(t)) if f < t => Coercion::Widening,
        (Some(_), Some(_)) => Coercion::Narrowing,
        _ => Coercion::Incompatible,
    }
}

/// The wider of two numeric types
pub fn numeric_join(a: &Type, b: &Type) -> Option<Type> {
    match (a.numeric_rank(), b.numeric_rank()) {
        (Some(x), Some(y)) => Some(if x >= y { a.clone() } else { b.clone() }),
        _ => None,
    }
}

/// Join used when two assignments disagree (e.g. inferred JavaScript types)
pub fn join(a: &Type, b: &Type) -> Option<Type> {
    if a == b {
        return Some(a.clone());
    }
    numeric_join(a, b)
}

pub fn is_printable(ty: &Type) -> bool {
    !matches!(ty, Type::Void | Type::Array(_))
}

pub fn binary_result(op: BinOp, lhs: &Type, rhs: &Type) -> Option<Type> {
    match op {
        BinOp::Add if *lhs == Type::String || *rhs == Type::String => {
            if is_printable(lhs) && is_printable(rhs) {
                Some(Type::String)
            } else {
                None
            }
        }
        _ if op.is_arithmetic() => numeric_join(lhs, rhs),
        _ if op.is_comparison() => {
            if numeric_join(lhs, rhs).is_some() || (*lhs == Type::Char && *rhs == Type::Char) {
                Some(Type::Bool)
            } else {
                None
            }
        }
        _ if op.is_equality() => {
            let comparable = numeric_join(lhs, rhs).is_some()
                || (lhs == rhs && matches!(lhs, Type::Bool | Type::Char | Type::String));
            comparable.then_some(Type::Bool)
        }
        _ if op.is_logical() => (*lhs == Type::Bool && *rhs == Type::Bool).then_some(Type::Bool),
        _ if op.is_bitwise() => {
            if lhs.is_integral() && rhs.is_integral() {
                numeric_join(lhs, rhs)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub fn unary_result(op: UnOp, operand: &Type) -> Option<Type> {
    match op {
        UnOp::Neg if operand.is_numeric() => Some(operand.clone()),
        UnOp::Not if *operand == Type::Bool => Some(Type::Bool),
        UnOp::BitNot if operand.is_integral() => Some(operand.clone()),
        _ => None,
    }
}

pub fn builtin_result(builtin: Builtin, args: &[Type]) -> Option<Type> {
    let (min, max) = builtin.arity();
    if args.len() < min || args.len() > max {
        return None;
    }
    match builtin {
        Builtin::Print | Builtin::Println => args.iter().all(is_printable).then_some(Type::Void),
        Builtin::Sqrt | Builtin::Floor | Builtin::Ceil | Builtin::Trunc => {
            args[0].is_numeric().then_some(Type::Double)
        }
        Builtin::Abs => args[0].is_numeric().then(|| args[0].clone()),
        Builtin::Pow => (args[0].is_numeric() && args[1].is_numeric()).then_some(Type::Double),
        Builtin::Min | Builtin::Max => numeric_join(&args[0], &args[1]),
        Builtin::Len => matches!(args[0], Type::Array(_) | Type::String).then_some(Type::Int),
    }
}

/// Element type produced by indexing a value of type `container`
pub fn index_result(container: &Type) -> Option<Type> {
    match container {
        Type::Array(elem) => Some((**elem).clone()),
        Type::String => Some(Type::Char),
        _ => None,
    }
}

/// Scoped name -> type environment over one program
#[derive(Debug, Clone)]
pub struct TypeEnv<'p> {
    signatures: AHashMap<&'p str, (&'p [Param], &'p Type)>,
    scopes: Vec<AHashMap<String, Type>>,
}

impl<'p> TypeEnv<'p> {
    pub fn new(program: &'p Program) -> Self {
        let mut signatures = AHashMap::new();
        for f in &program.functions {
            signatures
                .entry(f.name.as_str())
                .or_insert((f.params.as_slice(), &f.return_type));
        }
        Self { signatures, scopes: vec![AHashMap::new()] }
    }

    /// Reset scopes to just the parameters of `function`
    pub fn enter_function(&mut self, function: &Function) {
        let params = function
            .params
            .iter()
            .map(|p| (p.name.clone(), p.ty.clone()))
            .collect();
        self.scopes = vec![params];
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(AHashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn declare(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    /// True when `name` is declared in the innermost scope
    pub fn declared_in_current_scope(&self, name: &str) -> bool {
        self.scopes.last().map_or(false, |s| s.contains_key(name))
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn signature(&self, name: &str) -> Option<(&'p [Param], &'p Type)> {
        self.signatures.get(name).copied()
    }

    pub fn function_names(&self) -> impl Iterator<Item = &'p str> + '_ {
        self.signatures.keys().copied()
    }

    pub fn visible_names(&self) -> Vec<&str> {
        self.scopes.iter().flat_map(|s| s.keys().map(String::as_str)).collect()
    }

    /// Type of `expr` in the current scope, or None if it does not type-check
    pub fn type_of(&self, expr: &Expression) -> Option<Type> {
        expression_type(
            expr,
            &|name| self.lookup(name).cloned(),
            &|name| self.signature(name).map(|(_, ret)| ret.clone()),
        )
    }
}

/// Type of an expression given lookups for variables and function return
/// types. Lowering uses this with its own symbol table before a Program
/// exists; TypeEnv uses it once one does.
pub fn expression_type(
    expr: &Expression,
    vars: &dyn Fn(&str) -> Option<Type>,
    returns: &dyn Fn(&str) -> Option<Type>,
) -> Option<Type> {
    let recur = |e: &Expression| expression_type(e, vars, returns);
    match expr {
        Expression::Literal(lit) => Some(lit.ty()),
        Expression::VarRef(name) => vars(name),
        Expression::Binary { op, lhs, rhs } => binary_result(*op, &recur(lhs)?, &recur(rhs)?),
        Expression::Unary { op, operand } => unary_result(*op, &recur(operand)?),
        Expression::Call { callee: Callee::Builtin(b), args } => {
            let types = args.iter().map(recur).collect::<Option<Vec<_>>>()?;
            builtin_result(*b, &types)
        }
        Expression::Call { callee: Callee::Function(name), .. } => returns(name),
        Expression::Index { array, .. } => index_result(&recur(array)?),
        Expression::ArrayLiteral { elem, .. } | Expression::ArrayNew { elem, .. } => {
            Some(Type::array_of(elem.clone()))
        }
        Expression::Cast { ty, .. } => Some(ty.clone()),
        Expression::Ternary { then, otherwise, .. } => join(&recur(then)?, &recur(otherwise)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Literal};

    #[test]
    fn test_coercion_table() {
        assert_eq!(coercion(&Type::Int, &Type::Int), Coercion::Exact);
        assert_eq!(coercion(&Type::Int, &Type::Double), Coercion::Widening);
        assert_eq!(coercion(&Type::Int, &Type::Long), Coercion::Widening);
        assert_eq!(coercion(&Type::Double, &Type::Int), Coercion::Narrowing);
        assert_eq!(coercion(&Type::Long, &Type::Int), Coercion::Narrowing);
        assert_eq!(coercion(&Type::Bool, &Type::Int), Coercion::Incompatible);
        assert_eq!(coercion(&Type::Char, &Type::Int), Coercion::Incompatible);
        assert_eq!(
            coercion(&Type::array_of(Type::Int), &Type::array_of(Type::Double)),
            Coercion::Incompatible
        );
    }

    #[test]
    fn test_binary_rules() {
        assert_eq!(binary_result(BinOp::Add, &Type::Int, &Type::Double), Some(Type::Double));
        assert_eq!(binary_result(BinOp::Add, &Type::String, &Type::Int), Some(Type::String));
        assert_eq!(binary_result(BinOp::Sub, &Type::String, &Type::Int), None);
        assert_eq!(binary_result(BinOp::Lt, &Type::Long, &Type::Int), Some(Type::Bool));
        assert_eq!(binary_result(BinOp::Eq, &Type::String, &Type::String), Some(Type::Bool));
        assert_eq!(binary_result(BinOp::Eq, &Type::Bool, &Type::Int), None);
        assert_eq!(binary_result(BinOp::And, &Type::Int, &Type::Bool), None);
        assert_eq!(binary_result(BinOp::Shl, &Type::Int, &Type::Int), Some(Type::Int));
        assert_eq!(binary_result(BinOp::Shl, &Type::Double, &Type::Int), None);
    }

    #[test]
    fn test_builtin_rules() {
        assert_eq!(builtin_result(Builtin::Println, &[]), Some(Type::Void));
        assert_eq!(builtin_result(Builtin::Print, &[]), None);
        assert_eq!(builtin_result(Builtin::Sqrt, &[Type::Int]), Some(Type::Double));
        assert_eq!(builtin_result(Builtin::Abs, &[Type::Long]), Some(Type::Long));
        assert_eq!(builtin_result(Builtin::Max, &[Type::Int, Type::Double]), Some(Type::Double));
        assert_eq!(builtin_result(Builtin::Len, &[Type::array_of(Type::Int)]), Some(Type::Int));
        assert_eq!(builtin_result(Builtin::Len, &[Type::Int]), None);
    }

    #[test]
    fn test_env_scoping_and_calls() {
        let program = Program::new(vec![Function {
            name: "half".to_string(),
            params: vec![Param::new("x", Type::Double)],
            return_type: Type::Double,
            body: Block::default(),
        }]);
        let mut env = TypeEnv::new(&program);
        env.enter_function(&program.functions[0]);
        assert_eq!(env.lookup("x"), Some(&Type::Double));

        env.push_scope();
        env.declare("x", Type::Int);
        assert_eq!(env.type_of(&Expression::var("x")), Some(Type::Int));
        env.pop_scope();
        assert_eq!(env.type_of(&Expression::var("x")), Some(Type::Double));

        let call = Expression::call("half", vec![Expression::Literal(Literal::Int(3))]);
        assert_eq!(env.type_of(&call), Some(Type::Double));
        assert_eq!(env.type_of(&Expression::var("missing")), None);
    }
}
