// File: src/ir/transform.rs
//
// Recursion elimination, used to offer an iterative rendering next to a
// recursive one.
//
// Two shapes are rewritten:
// - tail recursion: `return f(args)` (or a trailing `f(args);` in a void
//   function) becomes parameter reassignment inside `while (true)`
// - linear recursion over + or * on integral results, e.g. factorial's
//   `return n * f(n - 1)`, becomes an accumulator loop
//
// Anything else is left untouched. The input program is never modified; a
// rewritten copy is returned.

use super::{BinOp, Block, Expression, Function, LValue, Literal, Program, Statement, Type, UnOp};
use ahash::AHashSet;

/// A program in which at least one recursive function was made iterative
#[derive(Debug, Clone, PartialEq)]
pub struct IterativeVariant {
    pub program: Program,
    pub rewritten: Vec<String>,
}

pub fn to_iterative(program: &Program) -> Option<IterativeVariant> {
    let mut rewritten = Vec::new();
    let functions = program
        .functions
        .iter()
        .map(|f| {
            if !f.is_recursive() {
                return f.clone();
            }
            match rewrite_tail_recursion(f).or_else(|| rewrite_linear_recursion(f)) {
                Some(iterative) => {
                    log::debug!("rewrote '{}' as an iterative loop", f.name);
                    rewritten.push(f.name.clone());
                    iterative
                }
                None => f.clone(),
            }
        })
        .collect();

    if rewritten.is_empty() {
        None
    } else {
        Some(IterativeVariant { program: Program::new(functions), rewritten })
    }
}

/// Hands out names that do not clash with anything already in a function
struct FreshNames {
    taken: AHashSet<String>,
}

impl FreshNames {
    fn for_function(function: &Function) -> Self {
        let mut taken: AHashSet<String> = function.params.iter().map(|p| p.name.clone()).collect();
        taken.insert(function.name.clone());
        collect_block_names(&function.body, &mut taken);
        Self { taken }
    }

    fn fresh(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 1;
        while self.taken.contains(&candidate) {
            n += 1;
            candidate = format!("{}{}", base, n);
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

fn collect_block_names(block: &Block, names: &mut AHashSet<String>) {
    for stmt in &block.statements {
        collect_statement_names(stmt, names);
    }
}

fn collect_statement_names(stmt: &Statement, names: &mut AHashSet<String>) {
    match stmt {
        Statement::Declare { name, .. } => {
            names.insert(name.clone());
        }
        Statement::If { then_block, else_block, .. } => {
            collect_block_names(then_block, names);
            if let Some(b) = else_block {
                collect_block_names(b, names);
            }
        }
        Statement::While { body, .. } | Statement::Block(body) => collect_block_names(body, names),
        Statement::For { init, step, body, .. } => {
            if let Some(s) = init {
                collect_statement_names(s, names);
            }
            if let Some(s) = step {
                collect_statement_names(s, names);
            }
            collect_block_names(body, names);
        }
        _ => {}
    }
    stmt.walk_expressions(&mut |e| {
        if let Expression::VarRef(name) = e {
            names.insert(name.clone());
        }
    });
}

/// Statements that rebind the parameters to `args` as if by a fresh call.
/// Returns None when an array parameter would have to be rebound.
fn rebind_params(function: &Function, args: &[Expression], names: &mut FreshNames) -> Option<Vec<Statement>> {
    if args.len() != function.params.len() {
        return None;
    }
    let changed: Vec<(&str, &Type, &Expression)> = function
        .params
        .iter()
        .zip(args)
        .filter(|(p, arg)| !matches!(arg, Expression::VarRef(n) if *n == p.name))
        .map(|(p, arg)| (p.name.as_str(), &p.ty, arg))
        .collect();

    if changed.iter().any(|(_, ty, _)| matches!(ty, Type::Array(_))) {
        return None;
    }

    if changed.len() <= 1 {
        return Some(
            changed
                .into_iter()
                .map(|(name, _, arg)| Statement::Assign { target: LValue::Var(name.to_string()), value: arg.clone() })
                .collect(),
        );
    }

    // Evaluate every new argument before overwriting any parameter
    let mut stmts = Vec::new();
    let mut temps = Vec::new();
    for (name, ty, arg) in &changed {
        let temp = names.fresh(&format!("next_{}", name));
        stmts.push(Statement::Declare { name: temp.clone(), ty: (*ty).clone(), init: Some((*arg).clone()) });
        temps.push((name.to_string(), temp));
    }
    for (name, temp) in temps {
        stmts.push(Statement::Assign { target: LValue::Var(name), value: Expression::VarRef(temp) });
    }
    Some(stmts)
}

fn self_call<'a>(expr: &'a Expression, name: &str) -> Option<&'a [Expression]> {
    match expr {
        Expression::Call { callee: super::Callee::Function(f), args } if f == name => Some(args),
        _ => None,
    }
}

fn rewrite_tail_recursion(function: &Function) -> Option<Function> {
    let mut names = FreshNames::for_function(function);
    let mut body = rewrite_tail_block(function, &function.body, 0, &mut names)?;

    let void = function.return_type == Type::Void;
    let mut ends_in_continue = matches!(body.statements.last(), Some(Statement::Continue));
    if void && !ends_in_continue {
        // A trailing `f(args);` in a void function is a tail call too
        if let Some(Statement::Expr(expr)) = body.statements.last() {
            if let Some(args) = self_call(expr, &function.name) {
                let args = args.to_vec();
                body.statements.pop();
                body.statements.extend(rebind_params(function, &args, &mut names)?);
                body.statements.push(Statement::Continue);
                ends_in_continue = true;
            }
        }
    }
    if void && !ends_in_continue {
        body.statements.push(Statement::Return(None));
    }

    // Every remaining self call must have been a tail call
    if body_calls(&body, &function.name) {
        return None;
    }

    Some(Function {
        body: Block::new(vec![Statement::While { cond: Expression::bool(true), body }]),
        ..function.clone()
    })
}

fn body_calls(block: &Block, name: &str) -> bool {
    let mut found = false;
    block.walk_expressions(&mut |e| {
        found |= self_call(e, name).is_some();
    });
    found
}

/// Rewrites `return f(args)` into rebinding + continue. `loop_depth > 0`
/// means we are inside a nested loop where `continue` would bind wrongly.
fn rewrite_tail_block(function: &Function, block: &Block, loop_depth: usize, names: &mut FreshNames) -> Option<Block> {
    let mut out = Vec::with_capacity(block.statements.len());
    for stmt in &block.statements {
        match stmt {
            Statement::Return(Some(expr)) if self_call(expr, &function.name).is_some() => {
                if loop_depth > 0 {
                    return None;
                }
                let args = self_call(expr, &function.name)?;
                if args.iter().any(|a| a.calls(&function.name)) {
                    return None;
                }
                out.extend(rebind_params(function, args, names)?);
                out.push(Statement::Continue);
            }
            Statement::If { cond, then_block, else_block } => {
                let else_block = match else_block {
                    Some(b) => Some(rewrite_tail_block(function, b, loop_depth, names)?),
                    None => None,
                };
                out.push(Statement::If {
                    cond: cond.clone(),
                    then_block: rewrite_tail_block(function, then_block, loop_depth, names)?,
                    else_block,
                });
            }
            Statement::While { cond, body } => out.push(Statement::While {
                cond: cond.clone(),
                body: rewrite_tail_block(function, body, loop_depth + 1, names)?,
            }),
            Statement::For { init, cond, step, body } => out.push(Statement::For {
                init: init.clone(),
                cond: cond.clone(),
                step: step.clone(),
                body: rewrite_tail_block(function, body, loop_depth + 1, names)?,
            }),
            Statement::Block(inner) => out.push(Statement::Block(rewrite_tail_block(function, inner, loop_depth, names)?)),
            other => out.push(other.clone()),
        }
    }
    Some(Block::new(out))
}

/// `base_cond ? base : e op f(args)` in any of its statement spellings
struct LinearShape<'a> {
    base_cond: Expression,
    base: &'a Expression,
    op: BinOp,
    term: &'a Expression,
    args: &'a [Expression],
}

fn match_recursive_step<'a>(expr: &'a Expression, name: &str) -> Option<(BinOp, &'a Expression, &'a [Expression])> {
    let Expression::Binary { op, lhs, rhs } = expr else {
        return None;
    };
    if !matches!(op, BinOp::Add | BinOp::Mul) {
        return None;
    }
    let (term, args) = match (self_call(lhs, name), self_call(rhs, name)) {
        (None, Some(args)) => (&**lhs, args),
        (Some(args), None) => (&**rhs, args),
        _ => return None,
    };
    if term.calls(name) || args.iter().any(|a| a.calls(name)) {
        return None;
    }
    Some((*op, term, args))
}

fn single_return(block: &Block) -> Option<&Expression> {
    match block.statements.as_slice() {
        [Statement::Return(Some(e))] => Some(e),
        _ => None,
    }
}

fn match_linear(function: &Function) -> Option<LinearShape<'_>> {
    let name = &function.name;
    let (cond, base, step, negate_cond) = match function.body.statements.as_slice() {
        [Statement::If { cond, then_block, else_block: None }, Statement::Return(Some(step))] => {
            (cond, single_return(then_block)?, step, false)
        }
        [Statement::If { cond, then_block, else_block: Some(else_block) }] => {
            let (then_e, else_e) = (single_return(then_block)?, single_return(else_block)?);
            if match_recursive_step(else_e, name).is_some() {
                (cond, then_e, else_e, false)
            } else {
                (cond, else_e, then_e, true)
            }
        }
        [Statement::Return(Some(Expression::Ternary { cond, then, otherwise }))] => {
            if match_recursive_step(otherwise, name).is_some() {
                (&**cond, &**then, &**otherwise, false)
            } else {
                (&**cond, &**otherwise, &**then, true)
            }
        }
        _ => return None,
    };

    if cond.calls(name) || base.calls(name) {
        return None;
    }
    let (op, term, args) = match_recursive_step(step, name)?;
    let base_cond = if negate_cond { negate(cond) } else { cond.clone() };
    Some(LinearShape { base_cond, base, op, term, args })
}

fn rewrite_linear_recursion(function: &Function) -> Option<Function> {
    // Reassociation is only exact for integers
    if !function.return_type.is_integral() {
        return None;
    }
    let shape = match_linear(function)?;
    let identity = match (&function.return_type, shape.op) {
        (Type::Long, BinOp::Mul) => Literal::Long(1),
        (Type::Long, _) => Literal::Long(0),
        (_, BinOp::Mul) => Literal::Int(1),
        _ => Literal::Int(0),
    };
    let mut names = FreshNames::for_function(function);
    let acc = names.fresh("result");

    let mut loop_body = vec![Statement::Assign {
        target: LValue::Var(acc.clone()),
        value: Expression::binary(shape.op, Expression::var(acc.clone()), shape.term.clone()),
    }];
    loop_body.extend(rebind_params(function, shape.args, &mut names)?);

    let statements = vec![
        Statement::Declare {
            name: acc.clone(),
            ty: function.return_type.clone(),
            init: Some(Expression::Literal(identity)),
        },
        Statement::While { cond: negate(&shape.base_cond), body: Block::new(loop_body) },
        Statement::Return(Some(if is_identity(shape.base, shape.op) {
            Expression::var(acc)
        } else {
            Expression::binary(shape.op, Expression::var(acc), shape.base.clone())
        })),
    ];

    Some(Function { body: Block::new(statements), ..function.clone() })
}

/// `1` for `*`, `0` for `+`
fn is_identity(expr: &Expression, op: BinOp) -> bool {
    let value = match expr {
        Expression::Literal(Literal::Int(v) | Literal::Long(v)) => *v,
        _ => return false,
    };
    value == if op == BinOp::Mul { 1 } else { 0 }
}

/// Logical negation, folding comparisons instead of wrapping them in `!`
pub fn negate(cond: &Expression) -> Expression {
    match cond {
        Expression::Binary { op, lhs, rhs } => {
            let flipped = match op {
                BinOp::Lt => Some(BinOp::Ge),
                BinOp::Le => Some(BinOp::Gt),
                BinOp::Gt => Some(BinOp::Le),
                BinOp::Ge => Some(BinOp::Lt),
                BinOp::Eq => Some(BinOp::Ne),
                BinOp::Ne => Some(BinOp::Eq),
                _ => None,
            };
            match flipped {
                Some(op) => Expression::Binary { op, lhs: lhs.clone(), rhs: rhs.clone() },
                None => Expression::unary(UnOp::Not, cond.clone()),
            }
        }
        Expression::Unary { op: UnOp::Not, operand } => (**operand).clone(),
        Expression::Literal(Literal::Bool(b)) => Expression::bool(!b),
        other => Expression::unary(UnOp::Not, other.clone()),
    }
}
