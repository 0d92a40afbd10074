// File: src/validator.rs
//
// Semantic validation of IR programs.
//
// Runs after lowering and before code generation. Works in two passes like
// a classic type checker: function signatures first, then every body with a
// scoped type environment. All problems are collected; the program is only
// handed to the backends when the list is empty. Narrowing conversions are
// accepted and reported as warnings.
//
// Beyond typing, the validator rejects IR that some backend could not render
// faithfully (array aliasing, string concatenation as a value, char
// arithmetic). Anything that passes here must generate in every target.

use crate::errors::{find_closest_match, SemanticError, SemanticWarning};
use crate::ir::typing::{self, coercion, Coercion, TypeEnv};
use crate::ir::{BinOp, Block, Builtin, Callee, Expression, Function, LValue, Program, Statement, Type, ENTRY_POINT};
use ahash::AHashSet;

/// A program that passed validation, with any warnings it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub program: Program,
    pub warnings: Vec<SemanticWarning>,
}

pub fn validate(program: Program) -> Result<Validated, Vec<SemanticError>> {
    let (errors, warnings) = {
        let mut validator = Validator::new(&program);
        validator.check_program();
        (validator.errors, validator.warnings)
    };
    for warning in &warnings {
        log::warn!("{}", warning);
    }
    if errors.is_empty() {
        log::debug!("validated {} function(s)", program.functions.len());
        Ok(Validated { program, warnings })
    } else {
        log::debug!("validation failed with {} error(s)", errors.len());
        Err(errors)
    }
}

/// Where an expression appears, for the handful of rules that depend on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Value,
    /// Initializer of a declaration, where array constructors are allowed
    DeclareInit,
    /// Argument of a user call, `len` or an index base, where arrays may be named
    ArrayUse,
}

struct Validator<'p> {
    program: &'p Program,
    env: TypeEnv<'p>,
    function: String,
    return_type: Type,
    loop_depth: usize,
    errors: Vec<SemanticError>,
    warnings: Vec<SemanticWarning>,
}

impl<'p> Validator<'p> {
    fn new(program: &'p Program) -> Self {
        Self {
            program,
            env: TypeEnv::new(program),
            function: String::new(),
            return_type: Type::Void,
            loop_depth: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn unsupported(&mut self, construct: impl Into<String>) {
        self.errors.push(SemanticError::UnsupportedMapping {
            function: self.function.clone(),
            construct: construct.into(),
        });
    }

    fn mismatch(&mut self, context: impl Into<String>, expected: &Type, found: &Type) {
        self.errors.push(SemanticError::TypeMismatch {
            function: self.function.clone(),
            context: context.into(),
            expected: expected.clone(),
            found: found.clone(),
        });
    }

    fn check_program(&mut self) {
        // First pass: signatures
        let program = self.program;
        let mut seen = AHashSet::new();
        for function in &program.functions {
            if !seen.insert(function.name.as_str()) {
                self.errors.push(SemanticError::DuplicateFunction { function: function.name.clone() });
            }
        }

        // Second pass: bodies
        for function in &program.functions {
            self.check_function(function);
        }
    }

    fn check_signature(&mut self, function: &Function) {
        if function.is_entry() {
            if !function.params.is_empty() {
                self.unsupported("entry point with parameters");
            }
            if !matches!(function.return_type, Type::Void | Type::Int) {
                self.unsupported(format!("entry point returning {}", function.return_type));
            }
        }
        if let Type::Array(_) = function.return_type {
            self.unsupported("array return type");
        }

        let mut names = AHashSet::new();
        for param in &function.params {
            if !names.insert(param.name.as_str()) {
                self.errors.push(SemanticError::DuplicateBinding {
                    function: function.name.clone(),
                    name: param.name.clone(),
                });
            }
            self.check_declared_type(&param.ty, &format!("parameter '{}'", param.name));
        }
    }

    /// Void variables and arrays of arrays have no rendering
    fn check_declared_type(&mut self, ty: &Type, what: &str) {
        match ty {
            Type::Void => self.unsupported(format!("void {}", what)),
            Type::Array(elem) if matches!(**elem, Type::Array(_) | Type::Void) => {
                self.unsupported(format!("array of arrays in {}", what))
            }
            _ => {}
        }
    }

    fn check_function(&mut self, function: &Function) {
        self.function = function.name.clone();
        self.return_type = function.return_type.clone();
        self.loop_depth = 0;
        self.check_signature(function);

        // Parameters and the outermost block share one scope
        self.env.enter_function(function);
        for stmt in &function.body.statements {
            self.check_statement(stmt);
        }

        // `int main` may end without a return; every target supplies exit code 0
        if function.return_type != Type::Void && !function.is_entry() && block_falls_through(&function.body) {
            self.errors.push(SemanticError::MissingReturn { function: function.name.clone() });
        }
    }

    fn check_block(&mut self, block: &Block) {
        self.env.push_scope();
        for stmt in &block.statements {
            self.check_statement(stmt);
        }
        self.env.pop_scope();
    }

    fn check_loop_body(&mut self, block: &Block) {
        self.loop_depth += 1;
        self.check_block(block);
        self.loop_depth -= 1;
    }

    fn check_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Declare { name, ty, init } => {
                self.check_declared_type(ty, &format!("variable '{}'", name));
                // The variable is not yet in scope inside its own initializer
                match (init, ty) {
                    (None, Type::Array(_)) => self.unsupported(format!("array '{}' declared without a length", name)),
                    (None, _) => {}
                    (Some(init), Type::Array(_))
                        if !matches!(init, Expression::ArrayLiteral { .. } | Expression::ArrayNew { .. }) =>
                    {
                        self.unsupported(format!("array alias '{}'", name))
                    }
                    (Some(init), _) => {
                        if let Some(found) = self.check_expr(init, Context::DeclareInit) {
                            if let Type::Array(_) = ty {
                                if found != *ty {
                                    self.mismatch(format!("initializer of '{}'", name), ty, &found);
                                }
                            } else {
                                self.check_flow(&found, ty, &format!("initializer of '{}'", name));
                            }
                        }
                    }
                }
                if self.env.declared_in_current_scope(name) {
                    self.errors.push(SemanticError::DuplicateBinding {
                        function: self.function.clone(),
                        name: name.clone(),
                    });
                }
                self.env.declare(name, ty.clone());
            }

            Statement::Assign { target, value } => {
                let Some(target_ty) = self.check_lvalue(target) else {
                    return;
                };
                if let Some(found) = self.check_expr(value, Context::Value) {
                    self.check_flow(&found, &target_ty, &format!("assignment to '{}'", target.name()));
                }
            }

            Statement::If { cond, then_block, else_block } => {
                self.check_condition(cond, "if condition");
                self.check_block(then_block);
                if let Some(block) = else_block {
                    self.check_block(block);
                }
            }

            Statement::While { cond, body } => {
                self.check_condition(cond, "while condition");
                self.check_loop_body(body);
            }

            Statement::For { init, cond, step, body } => {
                self.env.push_scope();
                if let Some(init) = init {
                    match &**init {
                        Statement::Declare { ty: Type::Array(_), .. } => self.unsupported("array declared in a for initializer"),
                        Statement::Declare { .. } | Statement::Assign { .. } | Statement::Expr(_) => {}
                        _ => self.unsupported("for initializer that is not a declaration or expression"),
                    }
                    self.check_statement(init);
                }
                self.check_condition(cond, "for condition");
                if let Some(step) = step {
                    if !matches!(**step, Statement::Assign { .. } | Statement::Expr(_)) {
                        self.unsupported("for step that is not an expression");
                    }
                    self.check_statement(step);
                }
                // C++ rejects a body redeclaring the loop variable, so share the scope
                self.loop_depth += 1;
                for stmt in &body.statements {
                    self.check_statement(stmt);
                }
                self.loop_depth -= 1;
                self.env.pop_scope();
            }

            Statement::Return(value) => {
                let expected = self.return_type.clone();
                match (value, &expected) {
                    (None, Type::Void) => {}
                    (None, _) => self.mismatch("return", &expected, &Type::Void),
                    (Some(value), Type::Void) => {
                        if let Some(found) = self.check_expr(value, Context::Value) {
                            self.mismatch("return", &Type::Void, &found);
                        }
                    }
                    (Some(value), _) => {
                        if let Some(found) = self.check_expr(value, Context::Value) {
                            self.check_flow(&found, &expected, "return value");
                        }
                    }
                }
            }

            Statement::Expr(expr) => {
                self.check_expr(expr, Context::Value);
            }

            Statement::Block(block) => self.check_block(block),

            Statement::Break | Statement::Continue => {
                if self.loop_depth == 0 {
                    let statement = if *stmt == Statement::Break { "break" } else { "continue" };
                    self.errors.push(SemanticError::OutsideLoop {
                        function: self.function.clone(),
                        statement: statement.to_string(),
                    });
                }
            }
        }
    }

    fn check_lvalue(&mut self, target: &LValue) -> Option<Type> {
        match target {
            LValue::Var(name) => {
                let ty = self.lookup(name)?;
                if let Type::Array(_) = ty {
                    self.unsupported(format!("array reassignment of '{}'", name));
                    return None;
                }
                Some(ty)
            }
            LValue::Index { array, index } => {
                let container = self.lookup(array)?;
                self.check_index(index);
                match container {
                    Type::Array(elem) => Some(*elem),
                    Type::String => {
                        self.unsupported(format!("assignment to a character of string '{}'", array));
                        None
                    }
                    other => {
                        self.errors.push(SemanticError::InvalidOperands {
                            function: self.function.clone(),
                            op: "[]".to_string(),
                            operands: other.to_string(),
                        });
                        None
                    }
                }
            }
        }
    }

    fn lookup(&mut self, name: &str) -> Option<Type> {
        match self.env.lookup(name) {
            Some(ty) => Some(ty.clone()),
            None => {
                self.errors.push(SemanticError::UnboundVariable {
                    function: self.function.clone(),
                    name: name.to_string(),
                });
                None
            }
        }
    }

    fn check_condition(&mut self, cond: &Expression, context: &str) {
        if let Some(found) = self.check_expr(cond, Context::Value) {
            if found != Type::Bool {
                self.mismatch(context, &Type::Bool, &found);
            }
        }
    }

    fn check_index(&mut self, index: &Expression) {
        if let Some(found) = self.check_expr(index, Context::Value) {
            if !found.is_integral() {
                self.mismatch("array index", &Type::Int, &found);
            }
        }
    }

    /// A value of type `found` flowing into a slot of type `expected`
    fn check_flow(&mut self, found: &Type, expected: &Type, context: &str) {
        match coercion(found, expected) {
            Coercion::Exact | Coercion::Widening => {}
            Coercion::Narrowing => self.warnings.push(SemanticWarning::Narrowing {
                function: self.function.clone(),
                context: context.to_string(),
                from: found.clone(),
                to: expected.clone(),
            }),
            Coercion::Incompatible => self.mismatch(context, expected, found),
        }
    }

    fn invalid_operands(&mut self, op: &str, operands: &[&Type]) {
        let operands = operands.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" and ");
        self.errors.push(SemanticError::InvalidOperands {
            function: self.function.clone(),
            op: op.to_string(),
            operands,
        });
    }

    /// Type-check an expression, returning its type when it has one
    fn check_expr(&mut self, expr: &Expression, context: Context) -> Option<Type> {
        match expr {
            Expression::Literal(lit) => Some(lit.ty()),

            Expression::VarRef(name) => {
                let ty = self.lookup(name)?;
                if matches!(ty, Type::Array(_)) && context != Context::ArrayUse {
                    self.unsupported(format!("array value '{}' outside an index, call or length", name));
                    return None;
                }
                Some(ty)
            }

            Expression::Binary { op, lhs, rhs } => {
                let l = self.check_expr(lhs, Context::Value);
                let r = self.check_expr(rhs, Context::Value);
                let (l, r) = (l?, r?);
                if *op == BinOp::Add && (l == Type::String || r == Type::String) {
                    self.unsupported("string concatenation outside of output");
                    return None;
                }
                if op.is_arithmetic() && (l == Type::Char || r == Type::Char) {
                    self.unsupported("character arithmetic");
                    return None;
                }
                let result = typing::binary_result(*op, &l, &r);
                if result.is_none() {
                    self.invalid_operands(op.symbol(), &[&l, &r]);
                }
                result
            }

            Expression::Unary { op, operand } => {
                let ty = self.check_expr(operand, Context::Value)?;
                let result = typing::unary_result(*op, &ty);
                if result.is_none() {
                    self.invalid_operands(op.symbol(), &[&ty]);
                }
                result
            }

            Expression::Call { callee: Callee::Builtin(builtin), args } => self.check_builtin(*builtin, args),

            Expression::Call { callee: Callee::Function(name), args } => self.check_call(name, args),

            Expression::Index { array, index } => {
                let container = self.check_expr(array, Context::ArrayUse);
                self.check_index(index);
                let container = container?;
                let result = typing::index_result(&container);
                if result.is_none() {
                    self.invalid_operands("[]", &[&container]);
                }
                result
            }

            Expression::ArrayLiteral { elem, items } => {
                if context != Context::DeclareInit {
                    self.unsupported("array literal outside a declaration");
                }
                for (i, item) in items.iter().enumerate() {
                    if let Some(found) = self.check_expr(item, Context::Value) {
                        self.check_flow(&found, elem, &format!("array element {}", i));
                    }
                }
                Some(Type::array_of(elem.clone()))
            }

            Expression::ArrayNew { elem, len } => {
                if context != Context::DeclareInit {
                    self.unsupported("array allocation outside a declaration");
                }
                if let Some(found) = self.check_expr(len, Context::Value) {
                    if !found.is_integral() {
                        self.mismatch("array length", &Type::Int, &found);
                    }
                }
                Some(Type::array_of(elem.clone()))
            }

            Expression::Cast { ty, expr } => {
                let from = self.check_expr(expr, Context::Value)?;
                let allowed = from == *ty
                    || (from.is_numeric() && ty.is_numeric())
                    || (from == Type::Char && ty.is_integral())
                    || (from.is_integral() && *ty == Type::Char);
                if !allowed {
                    self.invalid_operands(&format!("({})", ty), &[&from]);
                    return None;
                }
                Some(ty.clone())
            }

            Expression::Ternary { cond, then, otherwise } => {
                self.check_condition(cond, "conditional expression");
                let a = self.check_expr(then, Context::Value);
                let b = self.check_expr(otherwise, Context::Value);
                let (a, b) = (a?, b?);
                let result = typing::join(&a, &b);
                if result.is_none() {
                    self.invalid_operands("?:", &[&a, &b]);
                }
                result
            }
        }
    }

    fn check_builtin(&mut self, builtin: Builtin, args: &[Expression]) -> Option<Type> {
        let context = if builtin == Builtin::Len { Context::ArrayUse } else { Context::Value };
        let types: Vec<Option<Type>> = args.iter().map(|a| self.check_expr(a, context)).collect();
        let (min, max) = builtin.arity();
        if args.len() < min || args.len() > max {
            self.errors.push(SemanticError::ArityMismatch {
                function: self.function.clone(),
                callee: builtin.name().to_string(),
                expected: max,
                found: args.len(),
            });
            return None;
        }
        let types = types.into_iter().collect::<Option<Vec<_>>>()?;
        let result = typing::builtin_result(builtin, &types);
        if result.is_none() {
            let refs: Vec<&Type> = types.iter().collect();
            self.invalid_operands(builtin.name(), &refs);
        }
        result
    }

    fn check_call(&mut self, name: &str, args: &[Expression]) -> Option<Type> {
        let types: Vec<Option<Type>> = args.iter().map(|a| self.check_expr(a, Context::ArrayUse)).collect();
        if name == ENTRY_POINT {
            self.unsupported("call to the entry point");
            return None;
        }
        let Some((params, ret)) = self.env.signature(name) else {
            let suggestion = find_closest_match(name, self.env.function_names());
            self.errors.push(SemanticError::UnknownFunction {
                function: self.function.clone(),
                name: name.to_string(),
                suggestion,
            });
            return None;
        };
        if params.len() != args.len() {
            self.errors.push(SemanticError::ArityMismatch {
                function: self.function.clone(),
                callee: name.to_string(),
                expected: params.len(),
                found: args.len(),
            });
            return Some(ret.clone());
        }
        for (i, (param, found)) in params.iter().zip(types).enumerate() {
            let Some(found) = found else { continue };
            let context = format!("argument {} of '{}'", i + 1, name);
            match (&param.ty, &args[i]) {
                (Type::Array(_), Expression::VarRef(_)) if found == param.ty => {}
                (Type::Array(_), _) => self.mismatch(context, &param.ty, &found),
                _ => self.check_flow(&found, &param.ty, &context),
            }
        }
        Some(ret.clone())
    }
}

/// True when control can reach the end of the block
pub fn block_falls_through(block: &Block) -> bool {
    !block.statements.iter().any(|s| !statement_falls_through(s))
}

fn statement_falls_through(stmt: &Statement) -> bool {
    match stmt {
        Statement::Return(_) => false,
        Statement::If { then_block, else_block: Some(else_block), .. } => {
            block_falls_through(then_block) || block_falls_through(else_block)
        }
        Statement::While { cond, body } | Statement::For { cond, body, .. } => {
            !cond.is_true_literal() || breaks_out(body)
        }
        Statement::Block(block) => block_falls_through(block),
        _ => true,
    }
}

/// True when a `break` in the block leaves the loop that owns it
fn breaks_out(block: &Block) -> bool {
    block.statements.iter().any(|stmt| match stmt {
        Statement::Break => true,
        Statement::If { then_block, else_block, .. } => {
            breaks_out(then_block) || else_block.as_ref().map_or(false, breaks_out)
        }
        Statement::Block(block) => breaks_out(block),
        // Breaks inside nested loops bind to those loops
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Literal, Param};

    fn function(name: &str, params: Vec<Param>, return_type: Type, statements: Vec<Statement>) -> Function {
        Function { name: name.to_string(), params, return_type, body: Block::new(statements) }
    }

    fn errors_of(functions: Vec<Function>) -> Vec<SemanticError> {
        validate(Program::new(functions)).unwrap_err()
    }

    fn declare(name: &str, ty: Type, init: Expression) -> Statement {
        Statement::Declare { name: name.to_string(), ty, init: Some(init) }
    }

    #[test]
    fn test_valid_program_passes_unchanged() {
        let f = function(
            "twice",
            vec![Param::new("x", Type::Int)],
            Type::Long,
            vec![Statement::Return(Some(Expression::binary(BinOp::Mul, Expression::var("x"), Expression::int(2))))],
        );
        let program = Program::new(vec![f]);
        let validated = validate(program.clone()).unwrap();
        assert_eq!(validated.program, program);
        assert!(validated.warnings.is_empty());
    }

    #[test]
    fn test_narrowing_is_a_warning() {
        let f = function(
            "main",
            vec![],
            Type::Void,
            vec![declare("x", Type::Int, Expression::Literal(Literal::Double(2.5)))],
        );
        let validated = validate(Program::new(vec![f])).unwrap();
        assert_eq!(validated.warnings.len(), 1);
        assert!(matches!(&validated.warnings[0], SemanticWarning::Narrowing { from: Type::Double, to: Type::Int, .. }));
    }

    #[test]
    fn test_missing_return() {
        let errors = errors_of(vec![function(
            "sign",
            vec![Param::new("x", Type::Int)],
            Type::Int,
            vec![Statement::If {
                cond: Expression::binary(BinOp::Gt, Expression::var("x"), Expression::int(0)),
                then_block: Block::new(vec![Statement::Return(Some(Expression::int(1)))]),
                else_block: None,
            }],
        )]);
        assert_eq!(errors, vec![SemanticError::MissingReturn { function: "sign".to_string() }]);
    }

    #[test]
    fn test_infinite_loop_does_not_fall_through() {
        let body = vec![Statement::While {
            cond: Expression::bool(true),
            body: Block::new(vec![Statement::Return(Some(Expression::int(1)))]),
        }];
        assert!(validate(Program::new(vec![function("f", vec![], Type::Int, body)])).is_ok());

        let body = vec![Statement::While { cond: Expression::bool(true), body: Block::new(vec![Statement::Break]) }];
        let errors = errors_of(vec![function("f", vec![], Type::Int, body)]);
        assert!(matches!(errors[0], SemanticError::MissingReturn { .. }));
    }

    #[test]
    fn test_nested_blocks_scope_their_bindings() {
        let body = vec![
            declare("y", Type::Int, Expression::int(1)),
            Statement::Block(Block::new(vec![declare("y", Type::Double, Expression::Literal(Literal::Double(0.5)))])),
            Statement::Block(Block::new(vec![declare("q", Type::Int, Expression::int(1))])),
            Statement::Block(Block::new(vec![declare("q", Type::Int, Expression::int(2))])),
            Statement::Return(Some(Expression::var("y"))),
        ];
        let validated = validate(Program::new(vec![function("f", vec![], Type::Int, body)])).unwrap();
        assert!(validated.warnings.is_empty());

        // a block ending in return ends the function
        let body = vec![Statement::Block(Block::new(vec![Statement::Return(Some(Expression::int(1)))]))];
        assert!(validate(Program::new(vec![function("g", vec![], Type::Int, body)])).is_ok());
    }

    #[test]
    fn test_unknown_function_suggests_a_name() {
        let helper = function("square", vec![Param::new("x", Type::Int)], Type::Int, vec![
            Statement::Return(Some(Expression::var("x"))),
        ]);
        let main = function("main", vec![], Type::Void, vec![Statement::Expr(Expression::call("sqare", vec![Expression::int(2)]))]);
        let errors = errors_of(vec![helper, main]);
        assert_eq!(
            errors,
            vec![SemanticError::UnknownFunction {
                function: "main".to_string(),
                name: "sqare".to_string(),
                suggestion: Some("square".to_string()),
            }]
        );
    }

    #[test]
    fn test_condition_must_be_boolean_and_break_needs_a_loop() {
        let errors = errors_of(vec![function(
            "main",
            vec![],
            Type::Void,
            vec![
                Statement::If { cond: Expression::int(1), then_block: Block::default(), else_block: None },
                Statement::Break,
            ],
        )]);
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], SemanticError::TypeMismatch { expected: Type::Bool, found: Type::Int, .. }));
        assert!(matches!(&errors[1], SemanticError::OutsideLoop { statement, .. } if statement == "break"));
    }

    #[test]
    fn test_array_rules() {
        let arr = Type::array_of(Type::Int);
        let literal = Expression::ArrayLiteral { elem: Type::Int, items: vec![Expression::int(1), Expression::int(2)] };
        let ok = function(
            "main",
            vec![],
            Type::Void,
            vec![
                declare("a", arr.clone(), literal.clone()),
                Statement::Assign {
                    target: LValue::Index { array: "a".to_string(), index: Expression::int(0) },
                    value: Expression::builtin(Builtin::Len, vec![Expression::var("a")]),
                },
            ],
        );
        assert!(validate(Program::new(vec![ok])).is_ok());

        let errors = errors_of(vec![function(
            "main",
            vec![],
            Type::Void,
            vec![
                declare("a", arr.clone(), literal.clone()),
                declare("b", arr.clone(), Expression::var("a")),
                Statement::Assign { target: LValue::Var("a".to_string()), value: Expression::var("b") },
            ],
        )]);
        assert!(errors.iter().all(|e| matches!(e, SemanticError::UnsupportedMapping { .. })));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_string_concatenation_and_char_arithmetic_are_rejected() {
        let errors = errors_of(vec![function(
            "main",
            vec![],
            Type::Void,
            vec![
                declare("s", Type::String, Expression::binary(BinOp::Add, Expression::string("a"), Expression::int(1))),
                declare(
                    "d",
                    Type::Int,
                    Expression::binary(BinOp::Sub, Expression::Literal(Literal::Char('7')), Expression::Literal(Literal::Char('0'))),
                ),
            ],
        )]);
        assert_eq!(
            errors,
            vec![
                SemanticError::UnsupportedMapping {
                    function: "main".to_string(),
                    construct: "string concatenation outside of output".to_string(),
                },
                SemanticError::UnsupportedMapping { function: "main".to_string(), construct: "character arithmetic".to_string() },
            ]
        );
    }

    #[test]
    fn test_char_codes_through_casts() {
        let f = function(
            "code",
            vec![Param::new("c", Type::Char)],
            Type::Int,
            vec![Statement::Return(Some(Expression::binary(
                BinOp::Sub,
                Expression::cast(Type::Int, Expression::var("c")),
                Expression::cast(Type::Int, Expression::Literal(Literal::Char('0'))),
            )))],
        );
        assert!(validate(Program::new(vec![f])).is_ok());
    }

    #[test]
    fn test_scopes() {
        let errors = errors_of(vec![function(
            "f",
            vec![Param::new("n", Type::Int)],
            Type::Void,
            vec![
                declare("n", Type::Int, Expression::int(0)),
                Statement::If {
                    cond: Expression::bool(true),
                    then_block: Block::new(vec![declare("t", Type::Int, Expression::int(1))]),
                    else_block: None,
                },
                Statement::Expr(Expression::builtin(Builtin::Println, vec![Expression::var("t")])),
            ],
        )]);
        assert_eq!(
            errors,
            vec![
                SemanticError::DuplicateBinding { function: "f".to_string(), name: "n".to_string() },
                SemanticError::UnboundVariable { function: "f".to_string(), name: "t".to_string() },
            ]
        );
    }

    #[test]
    fn test_calls_check_arity_and_argument_types() {
        let callee = function("f", vec![Param::new("x", Type::Int)], Type::Void, vec![]);
        let caller = function(
            "g",
            vec![],
            Type::Void,
            vec![
                Statement::Expr(Expression::call("f", vec![])),
                Statement::Expr(Expression::call("f", vec![Expression::bool(true)])),
            ],
        );
        let errors = errors_of(vec![callee, caller]);
        assert!(matches!(&errors[0], SemanticError::ArityMismatch { expected: 1, found: 0, .. }));
        assert!(matches!(&errors[1], SemanticError::TypeMismatch { expected: Type::Int, found: Type::Bool, .. }));
    }
}
