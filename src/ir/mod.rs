// File: src/ir/mod.rs
//
// Language-agnostic Intermediate Representation.
//
// Every front end lowers into this model and every backend renders from it.
// The IR is a plain tree: blocks own their statements, statements own their
// expressions, and nothing is shared or back-referenced. Names are resolved
// by scope during lowering, so a VarRef is only a name here.

pub mod transform;
pub mod typing;

use serde::Serialize;
use std::fmt;

/// Value types. Arrays are one-dimensional in every supported target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Int,
    Long,
    Float,
    Double,
    Bool,
    Char,
    String,
    Void,
    Array(Box<Type>),
}

impl Type {
    pub fn array_of(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Int | Type::Long)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Type::Float | Type::Double)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_floating()
    }

    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Position in the numeric widening order, None for non-numeric types
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            Type::Int => Some(0),
            Type::Long => Some(1),
            Type::Float => Some(2),
            Type::Double => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Bool => write!(f, "bool"),
            Type::Char => write!(f, "char"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Array(elem) => write!(f, "{}[]", elem),
        }
    }
}

/// A whole converted program. A function named `main` is the entry point.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    pub fn new(functions: Vec<Function>) -> Self {
        Self { functions }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn entry(&self) -> Option<&Function> {
        self.function(ENTRY_POINT)
    }
}

pub const ENTRY_POINT: &str = "main";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
    pub body: Block,
}

impl Function {
    pub fn is_entry(&self) -> bool {
        self.name == ENTRY_POINT
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Call statements are `Statement::Expr` wrapping an `Expression::Call`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    Declare {
        name: String,
        ty: Type,
        init: Option<Expression>,
    },
    Assign {
        target: LValue,
        value: Expression,
    },
    If {
        cond: Expression,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Expression,
        body: Block,
    },
    For {
        init: Option<Box<Statement>>,
        cond: Expression,
        step: Option<Box<Statement>>,
        body: Block,
    },
    Return(Option<Expression>),
    Expr(Expression),
    Break,
    Continue,
    /// A bare `{ ... }` opening its own scope
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LValue {
    Var(String),
    Index { array: String, index: Expression },
}

impl LValue {
    pub fn name(&self) -> &str {
        match self {
            LValue::Var(name) => name,
            LValue::Index { array, .. } => array,
        }
    }

    /// The same location read as an expression
    pub fn to_expression(&self) -> Expression {
        match self {
            LValue::Var(name) => Expression::VarRef(name.clone()),
            LValue::Index { array, index } => Expression::Index {
                array: Box::new(Expression::VarRef(array.clone())),
                index: Box::new(index.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Int(i64),
    Long(i64),
    Float(f64),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(String),
}

impl Literal {
    pub fn ty(&self) -> Type {
        match self {
            Literal::Int(_) => Type::Int,
            Literal::Long(_) => Type::Long,
            Literal::Float(_) => Type::Float,
            Literal::Double(_) => Type::Double,
            Literal::Bool(_) => Type::Bool,
            Literal::Char(_) => Type::Char,
            Literal::Str(_) => Type::String,
        }
    }

    /// The zero value of a scalar type, used for default initialisation
    pub fn zero_of(ty: &Type) -> Option<Literal> {
        Some(match ty {
            Type::Int => Literal::Int(0),
            Type::Long => Literal::Long(0),
            Type::Float => Literal::Float(0.0),
            Type::Double => Literal::Double(0.0),
            Type::Bool => Literal::Bool(false),
            Type::Char => Literal::Char('\0'),
            Type::String => Literal::Str(String::new()),
            Type::Void | Type::Array(_) => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    /// Source spelling shared by all four C-syntax targets
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }

    /// Binding strength; higher binds tighter. Identical in C, C++, Java and JS.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Mul | BinOp::Div | BinOp::Rem => 10,
            BinOp::Add | BinOp::Sub => 9,
            BinOp::Shl | BinOp::Shr => 8,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 7,
            BinOp::Eq | BinOp::Ne => 6,
            BinOp::BitAnd => 5,
            BinOp::BitXor => 4,
            BinOp::BitOr => 3,
            BinOp::And => 2,
            BinOp::Or => 1,
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem)
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
            UnOp::BitNot => "~",
        }
    }
}

/// The built-in abstraction set every backend knows how to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Builtin {
    Print,
    Println,
    Sqrt,
    Abs,
    Pow,
    Floor,
    Ceil,
    Trunc,
    Min,
    Max,
    Len,
}

impl Builtin {
    pub const ALL: [Builtin; 11] = [
        Builtin::Print,
        Builtin::Println,
        Builtin::Sqrt,
        Builtin::Abs,
        Builtin::Pow,
        Builtin::Floor,
        Builtin::Ceil,
        Builtin::Trunc,
        Builtin::Min,
        Builtin::Max,
        Builtin::Len,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Sqrt => "sqrt",
            Builtin::Abs => "abs",
            Builtin::Pow => "pow",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Trunc => "trunc",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Len => "len",
        }
    }

    /// Math functions shared by <math.h>, java.lang.Math and JS Math
    pub fn from_math_name(name: &str) -> Option<Builtin> {
        match name {
            "sqrt" => Some(Builtin::Sqrt),
            "abs" | "fabs" | "labs" | "llabs" => Some(Builtin::Abs),
            "pow" => Some(Builtin::Pow),
            "floor" => Some(Builtin::Floor),
            "ceil" => Some(Builtin::Ceil),
            "trunc" => Some(Builtin::Trunc),
            "min" | "fmin" => Some(Builtin::Min),
            "max" | "fmax" => Some(Builtin::Max),
            _ => None,
        }
    }

    pub fn arity(self) -> (usize, usize) {
        match self {
            Builtin::Println => (0, 1),
            Builtin::Pow | Builtin::Min | Builtin::Max => (2, 2),
            _ => (1, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Callee {
    Builtin(Builtin),
    Function(String),
}

impl Callee {
    pub fn name(&self) -> &str {
        match self {
            Callee::Builtin(b) => b.name(),
            Callee::Function(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    Literal(Literal),
    VarRef(String),
    Binary {
        op: BinOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expression>,
    },
    Call {
        callee: Callee,
        args: Vec<Expression>,
    },
    Index {
        array: Box<Expression>,
        index: Box<Expression>,
    },
    ArrayLiteral {
        elem: Type,
        items: Vec<Expression>,
    },
    /// A zero-initialised array of the given length
    ArrayNew {
        elem: Type,
        len: Box<Expression>,
    },
    Cast {
        ty: Type,
        expr: Box<Expression>,
    },
    Ternary {
        cond: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },
}

impl Expression {
    pub fn int(value: i64) -> Expression {
        Expression::Literal(Literal::Int(value))
    }

    pub fn bool(value: bool) -> Expression {
        Expression::Literal(Literal::Bool(value))
    }

    pub fn string(value: impl Into<String>) -> Expression {
        Expression::Literal(Literal::Str(value.into()))
    }

    pub fn var(name: impl Into<String>) -> Expression {
        Expression::VarRef(name.into())
    }

    pub fn binary(op: BinOp, lhs: Expression, rhs: Expression) -> Expression {
        Expression::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn unary(op: UnOp, operand: Expression) -> Expression {
        Expression::Unary { op, operand: Box::new(operand) }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Expression {
        Expression::Call { callee: Callee::Function(name.into()), args }
    }

    pub fn builtin(builtin: Builtin, args: Vec<Expression>) -> Expression {
        Expression::Call { callee: Callee::Builtin(builtin), args }
    }

    pub fn cast(ty: Type, expr: Expression) -> Expression {
        Expression::Cast { ty, expr: Box::new(expr) }
    }

    /// True when the expression is the literal `true`
    pub fn is_true_literal(&self) -> bool {
        matches!(self, Expression::Literal(Literal::Bool(true)))
    }

    /// True when evaluating the expression calls `name` anywhere
    pub fn calls(&self, name: &str) -> bool {
        let mut found = false;
        self.walk(&mut |e| {
            if let Expression::Call { callee: Callee::Function(f), .. } = e {
                found |= f == name;
            }
        });
        found
    }

    /// True when the expression contains any user function call
    pub fn has_user_call(&self) -> bool {
        let mut found = false;
        self.walk(&mut |e| {
            found |= matches!(e, Expression::Call { callee: Callee::Function(_), .. });
        });
        found
    }

    /// Pre-order visit of this expression and all sub-expressions
    pub fn walk(&self, visit: &mut dyn FnMut(&Expression)) {
        visit(self);
        match self {
            Expression::Literal(_) | Expression::VarRef(_) => {}
            Expression::Binary { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            Expression::Unary { operand, .. } => operand.walk(visit),
            Expression::Call { args, .. } => args.iter().for_each(|a| a.walk(visit)),
            Expression::Index { array, index } => {
                array.walk(visit);
                index.walk(visit);
            }
            Expression::ArrayLiteral { items, .. } => items.iter().for_each(|a| a.walk(visit)),
            Expression::ArrayNew { len, .. } => len.walk(visit),
            Expression::Cast { expr, .. } => expr.walk(visit),
            Expression::Ternary { cond, then, otherwise } => {
                cond.walk(visit);
                then.walk(visit);
                otherwise.walk(visit);
            }
        }
    }
}

impl Statement {
    /// Visit every expression directly or transitively owned by this statement
    pub fn walk_expressions(&self, visit: &mut dyn FnMut(&Expression)) {
        match self {
            Statement::Declare { init, .. } => {
                if let Some(e) = init {
                    e.walk(visit);
                }
            }
            Statement::Assign { target, value } => {
                if let LValue::Index { index, .. } = target {
                    index.walk(visit);
                }
                value.walk(visit);
            }
            Statement::If { cond, then_block, else_block } => {
                cond.walk(visit);
                then_block.walk_expressions(visit);
                if let Some(b) = else_block {
                    b.walk_expressions(visit);
                }
            }
            Statement::While { cond, body } => {
                cond.walk(visit);
                body.walk_expressions(visit);
            }
            Statement::For { init, cond, step, body } => {
                if let Some(s) = init {
                    s.walk_expressions(visit);
                }
                cond.walk(visit);
                if let Some(s) = step {
                    s.walk_expressions(visit);
                }
                body.walk_expressions(visit);
            }
            Statement::Block(block) => block.walk_expressions(visit),
            Statement::Return(Some(e)) | Statement::Expr(e) => e.walk(visit),
            Statement::Return(None) | Statement::Break | Statement::Continue => {}
        }
    }
}

impl Block {
    pub fn walk_expressions(&self, visit: &mut dyn FnMut(&Expression)) {
        for stmt in &self.statements {
            stmt.walk_expressions(visit);
        }
    }
}

impl Function {
    /// True when the body calls this function
    pub fn is_recursive(&self) -> bool {
        let mut found = false;
        self.body.walk_expressions(&mut |e| {
            if let Expression::Call { callee: Callee::Function(f), .. } = e {
                found |= *f == self.name;
            }
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factorial() -> Function {
        Function {
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
        }
    }

    #[test]
    fn test_recursion_detection() {
        assert!(factorial().is_recursive());
        let mut other = factorial();
        other.name = "fact".to_string();
        assert!(!other.is_recursive());
    }

    #[test]
    fn test_type_display() {
        assert_eq!(Type::array_of(Type::Double).to_string(), "double[]");
        assert_eq!(Type::String.to_string(), "string");
    }

    #[test]
    fn test_precedence_orders_multiplicative_above_additive() {
        assert!(BinOp::Mul.precedence() > BinOp::Add.precedence());
        assert!(BinOp::Add.precedence() > BinOp::Lt.precedence());
        assert!(BinOp::And.precedence() > BinOp::Or.precedence());
    }

    #[test]
    fn test_lvalue_reads_back_as_expression() {
        let target = LValue::Index { array: "a".to_string(), index: Expression::int(2) };
        assert_eq!(
            target.to_expression(),
            Expression::Index { array: Box::new(Expression::var("a")), index: Box::new(Expression::int(2)) }
        );
    }
}
