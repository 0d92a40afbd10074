// File: src/cst.rs
//
// Concrete syntax tree produced by the front ends.
//
// The node set is shared by the four C-syntax languages, but a tree is
// always tagged with the language that produced it and keeps that
// language's spelling: operators stay as source text, types stay as written
// (`std::vector<int>`, `String[]`, `char*`), declaration keywords (`var`,
// `let`, `const`, `final`) are preserved. A CST lives for one pipeline run:
// it is consumed by the matching lowering pass and then dropped.

use crate::errors::Position;
use crate::language::Language;
use crate::lexer::LiteralKind;

#[derive(Debug, Clone, PartialEq)]
pub struct Cst {
    pub language: Language,
    pub program: Program,
    /// Number of nodes the parser allocated
    pub node_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Function(FunctionDecl),
    /// Top-level statement (JavaScript scripts, C globals)
    Statement(Stmt),
    /// Java class wrapper
    Class(ClassDecl),
    /// `#include`, `import`, `package` and friends, as written
    Directive { text: String, pos: Position },
    /// C++ `using namespace x;` / `using x::y;`
    Using { path: String, pos: Position },
    /// A construct the parser recognised and skipped (struct, template, ...)
    Unsupported { kind: String, pos: Position },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub modifiers: Vec<String>,
    pub members: Vec<Item>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub modifiers: Vec<String>,
    /// None for untyped languages
    pub return_type: Option<TypeSpec>,
    pub params: Vec<ParamDecl>,
    /// None for a prototype (`int f(int);`)
    pub body: Option<Block>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: Option<TypeSpec>,
    /// Set for parameter forms we parse but never convert (`...rest`, defaults)
    pub unsupported: Option<String>,
    pub pos: Position,
}

/// A type as written. `int* const` and friends collapse into the counters.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    /// Base name, possibly multi-word or qualified: `long long`, `std::string`
    pub base: String,
    pub generic_args: Vec<TypeSpec>,
    pub pointer_depth: usize,
    pub is_reference: bool,
    /// Java-style `[]` suffixes on the type
    pub array_dims: usize,
    pub qualifiers: Vec<String>,
    pub pos: Position,
}

impl TypeSpec {
    pub fn named(base: impl Into<String>, pos: Position) -> Self {
        Self {
            base: base.into(),
            generic_args: Vec::new(),
            pointer_depth: 0,
            is_reference: false,
            array_dims: 0,
            qualifiers: Vec::new(),
            pos,
        }
    }

    pub fn is_const(&self) -> bool {
        self.qualifiers.iter().any(|q| q == "const" || q == "final")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    /// `var`, `let`, `const` in JavaScript; None for typed declarations
    pub keyword: Option<String>,
    pub ty: Option<TypeSpec>,
    pub declarators: Vec<Declarator>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    /// C-style `[N]` suffixes on the name; `None` for `[]`
    pub array_suffix: Vec<Option<Expr>>,
    pub init: Option<Init>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Init {
    Expr(Expr),
    /// `{1, 2, 3}`
    List(Vec<Expr>, Position),
    /// C++ constructor syntax: `std::vector<int> v(n);`
    Ctor(Vec<Expr>, Position),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl(VarDecl),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        pos: Position,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        pos: Position,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
        pos: Position,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Vec<Expr>,
        body: Box<Stmt>,
        pos: Position,
    },
    /// `for (T x : xs)`, `for (const x of xs)`
    ForEach {
        keyword: Option<String>,
        ty: Option<TypeSpec>,
        name: String,
        iterable: Expr,
        body: Box<Stmt>,
        pos: Position,
    },
    Return {
        value: Option<Expr>,
        pos: Position,
    },
    Break(Position),
    Continue(Position),
    Expr {
        expr: Expr,
        pos: Position,
    },
    Block(Block),
    Goto {
        label: String,
        pos: Position,
    },
    Label {
        name: String,
        body: Box<Stmt>,
        pos: Position,
    },
    Empty(Position),
    Unsupported {
        kind: String,
        pos: Position,
    },
}

impl Stmt {
    pub fn pos(&self) -> Position {
        match self {
            Stmt::VarDecl(d) => d.pos,
            Stmt::Block(b) => b.pos,
            Stmt::If { pos, .. }
            | Stmt::While { pos, .. }
            | Stmt::DoWhile { pos, .. }
            | Stmt::For { pos, .. }
            | Stmt::ForEach { pos, .. }
            | Stmt::Return { pos, .. }
            | Stmt::Expr { pos, .. }
            | Stmt::Goto { pos, .. }
            | Stmt::Label { pos, .. }
            | Stmt::Unsupported { pos, .. } => *pos,
            Stmt::Break(pos) | Stmt::Continue(pos) | Stmt::Empty(pos) => *pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        kind: LiteralKind,
        raw: String,
        pos: Position,
    },
    Bool {
        value: bool,
        pos: Position,
    },
    /// `null`, `nullptr`, `undefined`, `NULL`
    Null(Position),
    /// Possibly qualified: `x`, `std::cout`
    Identifier {
        name: String,
        pos: Position,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Position,
    },
    /// Prefix operators, including `++x` and `--x`
    Unary {
        op: String,
        operand: Box<Expr>,
        pos: Position,
    },
    /// `x++`, `x--`
    Postfix {
        op: String,
        operand: Box<Expr>,
        pos: Position,
    },
    Assign {
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
        pos: Position,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        pos: Position,
    },
    Member {
        object: Box<Expr>,
        name: String,
        pos: Position,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        pos: Position,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
        pos: Position,
    },
    Cast {
        ty: TypeSpec,
        expr: Box<Expr>,
        pos: Position,
    },
    /// `new Array(n)`
    New {
        class: String,
        args: Vec<Expr>,
        pos: Position,
    },
    /// `new int[n]`, `new int[]{1, 2}`
    NewArray {
        elem: TypeSpec,
        len: Option<Box<Expr>>,
        init: Option<Vec<Expr>>,
        pos: Position,
    },
    /// `[1, 2, 3]`
    ArrayLiteral {
        items: Vec<Expr>,
        pos: Position,
    },
    Sizeof {
        operand: Box<Expr>,
        pos: Position,
    },
    Unsupported {
        kind: String,
        pos: Position,
    },
}

impl Expr {
    pub fn pos(&self) -> Position {
        match self {
            Expr::Null(pos) => *pos,
            Expr::Literal { pos, .. }
            | Expr::Bool { pos, .. }
            | Expr::Identifier { pos, .. }
            | Expr::Binary { pos, .. }
            | Expr::Unary { pos, .. }
            | Expr::Postfix { pos, .. }
            | Expr::Assign { pos, .. }
            | Expr::Call { pos, .. }
            | Expr::Member { pos, .. }
            | Expr::Index { pos, .. }
            | Expr::Ternary { pos, .. }
            | Expr::Cast { pos, .. }
            | Expr::New { pos, .. }
            | Expr::NewArray { pos, .. }
            | Expr::ArrayLiteral { pos, .. }
            | Expr::Sizeof { pos, .. }
            | Expr::Unsupported { pos, .. } => *pos,
        }
    }

    /// Dotted/qualified path of a plain member chain: `System.out.println`
    pub fn path(&self) -> Option<String> {
        match self {
            Expr::Identifier { name, .. } => Some(name.clone()),
            Expr::Member { object, name, .. } => object.path().map(|p| format!("{}.{}", p, name)),
            _ => None,
        }
    }
}
