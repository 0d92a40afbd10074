// File: src/interpreter/mod.rs
//
// Reference interpreter for validated IR programs.
//
// Used by `polyglot run` and by the round-trip tests: a program and the
// re-lowered form of its translation must print the same thing. Output is
// captured into a String rather than written to stdout. Execution is bounded
// by a step budget and a call depth limit from EngineConfig.

mod control_flow;
mod environment;
pub mod value;

use crate::config::EngineConfig;
use crate::errors::{ResourceError, RuntimeError};
use crate::ir::typing::numeric_join;
use crate::ir::{BinOp, Block, Builtin, Callee, Expression, Function, LValue, Literal, Program, Statement, Type, UnOp};
use control_flow::ControlFlow;
use environment::Environment;
use serde::Serialize;
use std::cmp::Ordering;
use value::Value;

/// Native stack reserved for the interpreter thread; IR recursion maps onto
/// Rust recursion
const INTERPRETER_STACK: usize = 256 * 1024 * 1024;

/// Result of running a program to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Execution {
    pub stdout: String,
    /// `main`'s return value, 0 for a `void` entry point
    pub exit_code: i32,
    pub steps: u64,
}

/// Run `program` from its entry point on a dedicated thread
pub fn run(program: &Program, config: &EngineConfig) -> Result<Execution, RuntimeError> {
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("polyglot-interpreter".to_string())
            .stack_size(INTERPRETER_STACK)
            .spawn_scoped(scope, || Interpreter::new(program, config).run())
            .map_err(|_| RuntimeError::Aborted)?;
        handle.join().unwrap_or(Err(RuntimeError::Aborted))
    })
}

pub struct Interpreter<'p> {
    program: &'p Program,
    env: Environment,
    function: &'p str,
    output: String,
    control_flow: ControlFlow,
    return_value: Option<Value>,
    steps: u64,
    max_steps: u64,
    depth: usize,
    max_depth: usize,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program, config: &EngineConfig) -> Self {
        Self {
            program,
            env: Environment::new(),
            function: "",
            output: String::new(),
            control_flow: ControlFlow::None,
            return_value: None,
            steps: 0,
            max_steps: config.max_steps,
            depth: 0,
            max_depth: config.max_call_depth,
        }
    }

    /// Run on the current thread
    pub fn run(mut self) -> Result<Execution, RuntimeError> {
        let entry = self.program.entry().ok_or(RuntimeError::MissingEntryPoint)?;
        log::debug!("interpreting '{}' ({} function(s))", entry.name, self.program.functions.len());
        let result = self.call_function(entry, Vec::new())?;
        let exit_code = match result {
            Value::Int(code) => code,
            _ => 0,
        };
        log::debug!("program finished after {} steps with status {}", self.steps, exit_code);
        Ok(Execution { stdout: self.output, exit_code, steps: self.steps })
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(ResourceError::Steps { limit: self.max_steps }.into());
        }
        Ok(())
    }

    fn call_function(&mut self, function: &'p Function, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if self.depth >= self.max_depth {
            return Err(ResourceError::CallDepth { limit: self.max_depth }.into());
        }
        self.depth += 1;
        let saved_env = std::mem::take(&mut self.env);
        let saved_function = std::mem::replace(&mut self.function, function.name.as_str());
        for (param, arg) in function.params.iter().zip(args) {
            self.env.define(&param.name, arg.convert(&param.ty));
        }

        let outcome = self.exec_block(&function.body);

        self.env = saved_env;
        self.function = saved_function;
        self.depth -= 1;
        let returned = self.return_value.take();
        outcome?;
        Ok(match returned {
            Some(value) if function.return_type != Type::Void => value.convert(&function.return_type),
            _ => Value::Void,
        })
    }

    fn exec_block(&mut self, block: &'p Block) -> Result<(), RuntimeError> {
        for stmt in &block.statements {
            self.exec_stmt(stmt)?;
            if self.return_value.is_some() || self.control_flow != ControlFlow::None {
                break;
            }
        }
        Ok(())
    }

    fn scoped_block(&mut self, block: &'p Block) -> Result<(), RuntimeError> {
        self.env.push_scope();
        let outcome = self.exec_block(block);
        self.env.pop_scope();
        outcome
    }

    /// Consume a loop body's signal; true when the loop should stop
    fn loop_exit(&mut self) -> bool {
        if self.return_value.is_some() {
            return true;
        }
        match std::mem::replace(&mut self.control_flow, ControlFlow::None) {
            ControlFlow::Break => true,
            ControlFlow::Continue | ControlFlow::None => false,
        }
    }

    fn exec_stmt(&mut self, stmt: &'p Statement) -> Result<(), RuntimeError> {
        self.tick()?;
        match stmt {
            Statement::Declare { name, ty, init } => {
                let value = match init {
                    Some(init) => self.eval(init)?.convert(ty),
                    None => Value::zero(ty),
                };
                self.env.define(name, value);
            }
            Statement::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            Statement::If { cond, then_block, else_block } => {
                if self.eval(cond)?.truthy() {
                    self.scoped_block(then_block)?;
                } else if let Some(else_block) = else_block {
                    self.scoped_block(else_block)?;
                }
            }
            Statement::While { cond, body } => {
                while self.eval(cond)?.truthy() {
                    self.tick()?;
                    self.scoped_block(body)?;
                    if self.loop_exit() {
                        break;
                    }
                }
            }
            Statement::For { init, cond, step, body } => {
                self.env.push_scope();
                let outcome = self.exec_for(init.as_deref(), cond, step.as_deref(), body);
                self.env.pop_scope();
                outcome?;
            }
            Statement::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value)?,
                    None => Value::Void,
                };
                self.return_value = Some(value);
            }
            Statement::Expr(expr) => {
                self.eval(expr)?;
            }
            Statement::Block(block) => self.scoped_block(block)?,
            Statement::Break => self.control_flow = ControlFlow::Break,
            Statement::Continue => self.control_flow = ControlFlow::Continue,
        }
        Ok(())
    }

    fn exec_for(
        &mut self,
        init: Option<&'p Statement>,
        cond: &'p Expression,
        step: Option<&'p Statement>,
        body: &'p Block,
    ) -> Result<(), RuntimeError> {
        if let Some(init) = init {
            self.exec_stmt(init)?;
        }
        while self.eval(cond)?.truthy() {
            self.tick()?;
            self.scoped_block(body)?;
            if self.loop_exit() {
                break;
            }
            if let Some(step) = step {
                self.exec_stmt(step)?;
            }
        }
        Ok(())
    }

    fn assign(&mut self, target: &'p LValue, value: Value) -> Result<(), RuntimeError> {
        match target {
            LValue::Var(name) => {
                let ty = self.lookup(name)?.ty();
                self.env.set(name, value.convert(&ty));
                Ok(())
            }
            LValue::Index { array, index } => {
                let index = self.eval(index)?.as_i64();
                let Value::Array(items) = self.lookup(array)?.clone() else {
                    return Err(self.unbound(array));
                };
                let mut items = items.borrow_mut();
                let len = items.len();
                let slot = usize::try_from(index).ok().and_then(|i| items.get_mut(i)).ok_or_else(|| {
                    RuntimeError::IndexOutOfBounds { function: self.function.to_string(), index, len }
                })?;
                let ty = slot.ty();
                *slot = value.convert(&ty);
                Ok(())
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<&Value, RuntimeError> {
        self.env.get(name).ok_or_else(|| self.unbound(name))
    }

    fn unbound(&self, name: &str) -> RuntimeError {
        RuntimeError::UnboundVariable { function: self.function.to_string(), name: name.to_string() }
    }

    fn eval(&mut self, expr: &'p Expression) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Literal(lit) => Ok(literal(lit)),
            Expression::VarRef(name) => self.lookup(name).cloned(),
            Expression::Binary { op: BinOp::And, lhs, rhs } => {
                Ok(Value::Bool(self.eval(lhs)?.truthy() && self.eval(rhs)?.truthy()))
            }
            Expression::Binary { op: BinOp::Or, lhs, rhs } => {
                Ok(Value::Bool(self.eval(lhs)?.truthy() || self.eval(rhs)?.truthy()))
            }
            Expression::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                self.binary(*op, l, r)
            }
            Expression::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(unary(*op, value))
            }
            Expression::Call { callee: Callee::Builtin(builtin), args } => {
                let values = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
                self.builtin(*builtin, values)
            }
            Expression::Call { callee: Callee::Function(name), args } => {
                let values = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
                let program = self.program;
                let function =
                    program.function(name).ok_or_else(|| RuntimeError::UnknownFunction { name: name.clone() })?;
                self.call_function(function, values)
            }
            Expression::Index { array, index } => {
                let container = self.eval(array)?;
                let index = self.eval(index)?.as_i64();
                self.index(&container, index)
            }
            Expression::ArrayLiteral { elem, items } => {
                let values = items
                    .iter()
                    .map(|item| Ok(self.eval(item)?.convert(elem)))
                    .collect::<Result<Vec<Value>, RuntimeError>>()?;
                Ok(Value::array(values))
            }
            Expression::ArrayNew { elem, len } => {
                let len = self.eval(len)?.as_i64();
                let size = usize::try_from(len)
                    .map_err(|_| RuntimeError::NegativeLength { function: self.function.to_string(), len })?;
                Ok(Value::array(vec![Value::zero(elem); size]))
            }
            Expression::Cast { ty, expr } => Ok(self.eval(expr)?.convert(ty)),
            Expression::Ternary { cond, then, otherwise } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn index(&self, container: &Value, index: i64) -> Result<Value, RuntimeError> {
        let out_of_bounds = |len| RuntimeError::IndexOutOfBounds { function: self.function.to_string(), index, len };
        match container {
            Value::Array(items) => {
                let items = items.borrow();
                usize::try_from(index).ok().and_then(|i| items.get(i)).cloned().ok_or_else(|| out_of_bounds(items.len()))
            }
            Value::Str(s) => usize::try_from(index)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(Value::Char)
                .ok_or_else(|| out_of_bounds(s.chars().count())),
            _ => Err(out_of_bounds(0)),
        }
    }

    fn binary(&self, op: BinOp, l: Value, r: Value) -> Result<Value, RuntimeError> {
        if op == BinOp::Add && (matches!(l, Value::Str(_)) || matches!(r, Value::Str(_))) {
            return Ok(Value::str(&format!("{}{}", l, r)));
        }
        if op.is_equality() {
            let equal = compare(&l, &r) == Some(Ordering::Equal);
            return Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }));
        }
        if op.is_comparison() {
            // NaN compares false under every ordering operator
            let result = compare(&l, &r).map_or(false, |ordering| match op {
                BinOp::Lt => ordering == Ordering::Less,
                BinOp::Le => ordering != Ordering::Greater,
                BinOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            });
            return Ok(Value::Bool(result));
        }

        let joined = numeric_join(&l.ty(), &r.ty()).unwrap_or(Type::Int);
        let division_by_zero = || RuntimeError::DivisionByZero { function: self.function.to_string() };
        Ok(match (l.convert(&joined), r.convert(&joined)) {
            (Value::Int(a), Value::Int(b)) => Value::Int(match op {
                BinOp::Add => a.wrapping_add(b),
                BinOp::Sub => a.wrapping_sub(b),
                BinOp::Mul => a.wrapping_mul(b),
                BinOp::Div if b == 0 => return Err(division_by_zero()),
                BinOp::Div => a.wrapping_div(b),
                BinOp::Rem if b == 0 => return Err(division_by_zero()),
                BinOp::Rem => a.wrapping_rem(b),
                BinOp::BitAnd => a & b,
                BinOp::BitOr => a | b,
                BinOp::BitXor => a ^ b,
                BinOp::Shl => a.wrapping_shl(b as u32),
                _ => a.wrapping_shr(b as u32),
            }),
            (Value::Long(a), Value::Long(b)) => Value::Long(match op {
                BinOp::Add => a.wrapping_add(b),
                BinOp::Sub => a.wrapping_sub(b),
                BinOp::Mul => a.wrapping_mul(b),
                BinOp::Div if b == 0 => return Err(division_by_zero()),
                BinOp::Div => a.wrapping_div(b),
                BinOp::Rem if b == 0 => return Err(division_by_zero()),
                BinOp::Rem => a.wrapping_rem(b),
                BinOp::BitAnd => a & b,
                BinOp::BitOr => a | b,
                BinOp::BitXor => a ^ b,
                BinOp::Shl => a.wrapping_shl(b as u32),
                _ => a.wrapping_shr(b as u32),
            }),
            (Value::Float(a), Value::Float(b)) => Value::Float(float_op(op, a as f64, b as f64) as f32),
            (a, b) => Value::Double(float_op(op, a.as_f64(), b.as_f64())),
        })
    }

    fn builtin(&mut self, builtin: Builtin, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Void);
        Ok(match builtin {
            Builtin::Print | Builtin::Println => {
                for value in &args {
                    self.output.push_str(&value.to_string());
                }
                if builtin == Builtin::Println {
                    self.output.push('\n');
                }
                Value::Void
            }
            Builtin::Sqrt => Value::Double(arg(0).as_f64().sqrt()),
            Builtin::Floor => Value::Double(arg(0).as_f64().floor()),
            Builtin::Ceil => Value::Double(arg(0).as_f64().ceil()),
            Builtin::Trunc => Value::Double(arg(0).as_f64().trunc()),
            Builtin::Pow => Value::Double(arg(0).as_f64().powf(arg(1).as_f64())),
            Builtin::Abs => match arg(0) {
                Value::Int(n) => Value::Int(n.wrapping_abs()),
                Value::Long(n) => Value::Long(n.wrapping_abs()),
                Value::Float(n) => Value::Float(n.abs()),
                other => Value::Double(other.as_f64().abs()),
            },
            Builtin::Min | Builtin::Max => {
                let (a, b) = (arg(0), arg(1));
                let joined = numeric_join(&a.ty(), &b.ty()).unwrap_or(Type::Double);
                let (a, b) = (a.convert(&joined), b.convert(&joined));
                let a_first = match compare(&a, &b) {
                    Some(Ordering::Greater) => builtin == Builtin::Max,
                    Some(_) => builtin == Builtin::Min,
                    None => true,
                };
                if a_first {
                    a
                } else {
                    b
                }
            }
            Builtin::Len => match arg(0) {
                Value::Array(items) => Value::Int(items.borrow().len() as i32),
                Value::Str(s) => Value::Int(s.chars().count() as i32),
                _ => Value::Int(0),
            },
        })
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n as i32),
        Literal::Long(n) => Value::Long(*n),
        Literal::Float(n) => Value::Float(*n as f32),
        Literal::Double(n) => Value::Double(*n),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Char(c) => Value::Char(*c),
        Literal::Str(s) => Value::str(s),
    }
}

fn unary(op: UnOp, value: Value) -> Value {
    match (op, value) {
        (UnOp::Not, v) => Value::Bool(!v.truthy()),
        (UnOp::Neg, Value::Int(n)) => Value::Int(n.wrapping_neg()),
        (UnOp::Neg, Value::Long(n)) => Value::Long(n.wrapping_neg()),
        (UnOp::Neg, Value::Float(n)) => Value::Float(-n),
        (UnOp::Neg, v) => Value::Double(-v.as_f64()),
        (UnOp::BitNot, Value::Long(n)) => Value::Long(!n),
        (UnOp::BitNot, v) => Value::Int(!(v.as_i64() as i32)),
    }
}

fn float_op(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Rem => a % b,
        _ => f64::NAN,
    }
}

/// Ordering of two comparable values; None for NaN or incomparable kinds
fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Array(a), Value::Array(b)) => std::rc::Rc::ptr_eq(a, b).then_some(Ordering::Equal),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            if a.ty().is_integral() && b.ty().is_integral() {
                Some(a.as_i64().cmp(&b.as_i64()))
            } else {
                a.as_f64().partial_cmp(&b.as_f64())
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Param;

    fn main_with(statements: Vec<Statement>) -> Program {
        Program::new(vec![Function {
            name: "main".to_string(),
            params: vec![],
            return_type: Type::Int,
            body: Block::new(statements),
        }])
    }

    fn println(expr: Expression) -> Statement {
        Statement::Expr(Expression::builtin(Builtin::Println, vec![expr]))
    }

    #[test]
    fn test_factorial_runs_and_prints() {
        let factorial = Function {
            name: "factorial".to_string(),
            params: vec![Param::new("n", Type::Int)],
            return_type: Type::Int,
            body: Block::new(vec![Statement::Return(Some(Expression::Ternary {
                cond: Box::new(Expression::binary(BinOp::Le, Expression::var("n"), Expression::int(1))),
                then: Box::new(Expression::int(1)),
                otherwise: Box::new(Expression::binary(
                    BinOp::Mul,
                    Expression::var("n"),
                    Expression::call("factorial", vec![Expression::binary(BinOp::Sub, Expression::var("n"), Expression::int(1))]),
                )),
            }))]),
        };
        let mut program = main_with(vec![println(Expression::call("factorial", vec![Expression::int(5)]))]);
        program.functions.insert(0, factorial);
        let execution = run(&program, &EngineConfig::default()).unwrap();
        assert_eq!(execution.stdout, "120\n");
        assert_eq!(execution.exit_code, 0);
    }

    #[test]
    fn test_integer_semantics() {
        let program = main_with(vec![
            println(Expression::binary(BinOp::Div, Expression::int(-7), Expression::int(2))),
            println(Expression::binary(BinOp::Rem, Expression::int(-7), Expression::int(2))),
            println(Expression::binary(BinOp::Add, Expression::int(2147483647), Expression::int(1))),
            println(Expression::binary(BinOp::Div, Expression::int(7), Expression::Literal(Literal::Double(2.0)))),
            Statement::Return(Some(Expression::int(3))),
        ]);
        let execution = run(&program, &EngineConfig::default()).unwrap();
        assert_eq!(execution.stdout, "-3\n-1\n-2147483648\n3.5\n");
        assert_eq!(execution.exit_code, 3);
    }

    #[test]
    fn test_nested_block_shadows_and_restores() {
        let declare = |value| Statement::Declare { name: "y".to_string(), ty: Type::Int, init: Some(Expression::int(value)) };
        let program = main_with(vec![
            declare(1),
            Statement::Block(Block::new(vec![declare(5), println(Expression::var("y"))])),
            Statement::Block(Block::new(vec![declare(2), println(Expression::var("y"))])),
            println(Expression::var("y")),
            Statement::Return(Some(Expression::int(0))),
        ]);
        let execution = run(&program, &EngineConfig::default()).unwrap();
        assert_eq!(execution.stdout, "5\n2\n1\n");
    }

    #[test]
    fn test_loops_with_break_and_continue() {
        // for (int i = 0; i < 10; i++) { if (i == 5) break; if (i % 2 == 0) continue; print(i); }
        let program = main_with(vec![Statement::For {
            init: Some(Box::new(Statement::Declare { name: "i".to_string(), ty: Type::Int, init: Some(Expression::int(0)) })),
            cond: Expression::binary(BinOp::Lt, Expression::var("i"), Expression::int(10)),
            step: Some(Box::new(Statement::Assign {
                target: LValue::Var("i".to_string()),
                value: Expression::binary(BinOp::Add, Expression::var("i"), Expression::int(1)),
            })),
            body: Block::new(vec![
                Statement::If {
                    cond: Expression::binary(BinOp::Eq, Expression::var("i"), Expression::int(5)),
                    then_block: Block::new(vec![Statement::Break]),
                    else_block: None,
                },
                Statement::If {
                    cond: Expression::binary(
                        BinOp::Eq,
                        Expression::binary(BinOp::Rem, Expression::var("i"), Expression::int(2)),
                        Expression::int(0),
                    ),
                    then_block: Block::new(vec![Statement::Continue]),
                    else_block: None,
                },
                Statement::Expr(Expression::builtin(Builtin::Print, vec![Expression::var("i")])),
            ]),
        }]);
        assert_eq!(run(&program, &EngineConfig::default()).unwrap().stdout, "13");
    }

    #[test]
    fn test_arrays_are_passed_by_reference() {
        let fill = Function {
            name: "fill".to_string(),
            params: vec![Param::new("xs", Type::array_of(Type::Int))],
            return_type: Type::Void,
            body: Block::new(vec![Statement::Assign {
                target: LValue::Index { array: "xs".to_string(), index: Expression::int(1) },
                value: Expression::int(7),
            }]),
        };
        let mut program = main_with(vec![
            Statement::Declare {
                name: "a".to_string(),
                ty: Type::array_of(Type::Int),
                init: Some(Expression::ArrayNew { elem: Type::Int, len: Box::new(Expression::int(3)) }),
            },
            Statement::Expr(Expression::call("fill", vec![Expression::var("a")])),
            println(Expression::Index { array: Box::new(Expression::var("a")), index: Box::new(Expression::int(1)) }),
            println(Expression::builtin(Builtin::Len, vec![Expression::var("a")])),
        ]);
        program.functions.insert(0, fill);
        assert_eq!(run(&program, &EngineConfig::default()).unwrap().stdout, "7\n3\n");
    }

    #[test]
    fn test_runtime_errors() {
        let program = main_with(vec![println(Expression::binary(BinOp::Div, Expression::int(1), Expression::int(0)))]);
        assert!(matches!(run(&program, &EngineConfig::default()), Err(RuntimeError::DivisionByZero { .. })));

        let program = main_with(vec![println(Expression::Index {
            array: Box::new(Expression::string("ab")),
            index: Box::new(Expression::int(2)),
        })]);
        assert!(matches!(
            run(&program, &EngineConfig::default()),
            Err(RuntimeError::IndexOutOfBounds { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn test_step_and_depth_limits() {
        let program = main_with(vec![Statement::While { cond: Expression::bool(true), body: Block::new(vec![]) }]);
        let config = EngineConfig { max_steps: 1000, ..EngineConfig::default() };
        assert_eq!(run(&program, &config), Err(RuntimeError::Resource(ResourceError::Steps { limit: 1000 })));

        let forever = Function {
            name: "forever".to_string(),
            params: vec![],
            return_type: Type::Void,
            body: Block::new(vec![Statement::Expr(Expression::call("forever", vec![]))]),
        };
        let mut program = main_with(vec![Statement::Expr(Expression::call("forever", vec![]))]);
        program.functions.push(forever);
        let config = EngineConfig { max_call_depth: 50, ..EngineConfig::default() };
        assert_eq!(run(&program, &config), Err(RuntimeError::Resource(ResourceError::CallDepth { limit: 50 })));
    }
}
