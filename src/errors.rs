// File: src/errors.rs
//
// Error handling and reporting for the Polyglot conversion pipeline.
// Every stage (parse, lower, validate) collects its full error list; the
// orchestrator wraps the first failing stage's list in a ConversionError.
// Errors flatten into wire-level Diagnostics and pretty-print with source
// context for the terminal.

use crate::ir::Type;
use crate::language::Language;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Position of a token in the source text. Lines and columns are 1-based,
/// the byte offset is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Pipeline stage that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Syntax,
    Lowering,
    Semantic,
    Resource,
    /// Reference interpreter failures, only reached by `run`
    Runtime,
    /// Problems with the request itself (unknown tags, undetectable source)
    Request,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Syntax => write!(f, "Syntax Error"),
            Stage::Lowering => write!(f, "Lowering Error"),
            Stage::Semantic => write!(f, "Semantic Error"),
            Stage::Resource => write!(f, "Resource Limit"),
            Stage::Runtime => write!(f, "Runtime Error"),
            Stage::Request => write!(f, "Request Error"),
        }
    }
}

/// A malformed token or grammar production
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {position}")]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self { message: message.into(), position }
    }
}

/// A construct with no IR mapping, or a failed scope resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    #[error("unsupported construct '{kind}' at {position}")]
    UnsupportedConstruct { kind: String, position: Position },

    #[error("use of undeclared identifier '{name}' at {position}")]
    UndeclaredIdentifier {
        name: String,
        position: Position,
        suggestion: Option<String>,
    },

    #[error("'{name}' is already declared in this scope at {position}")]
    DuplicateDeclaration { name: String, position: Position },

    #[error("unknown type '{name}' at {position}")]
    UnknownType { name: String, position: Position },

    #[error("{message} at {position}")]
    Invalid { message: String, position: Position },
}

impl LoweringError {
    pub fn unsupported(kind: impl Into<String>, position: Position) -> Self {
        LoweringError::UnsupportedConstruct { kind: kind.into(), position }
    }

    pub fn invalid(message: impl Into<String>, position: Position) -> Self {
        LoweringError::Invalid { message: message.into(), position }
    }

    pub fn position(&self) -> Position {
        match self {
            LoweringError::UnsupportedConstruct { position, .. }
            | LoweringError::UndeclaredIdentifier { position, .. }
            | LoweringError::DuplicateDeclaration { position, .. }
            | LoweringError::UnknownType { position, .. }
            | LoweringError::Invalid { position, .. } => *position,
        }
    }
}

/// A type or scope inconsistency detected on the IR. The IR carries no
/// source positions, so errors name the enclosing function instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("in '{function}': variable '{name}' has no binding")]
    UnboundVariable { function: String, name: String },

    #[error("in '{function}': call to unknown function '{name}'")]
    UnknownFunction {
        function: String,
        name: String,
        suggestion: Option<String>,
    },

    #[error("in '{function}': '{callee}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        function: String,
        callee: String,
        expected: usize,
        found: usize,
    },

    #[error("in '{function}': {context} expects {expected}, found {found}")]
    TypeMismatch {
        function: String,
        context: String,
        expected: Type,
        found: Type,
    },

    #[error("in '{function}': operator '{op}' cannot be applied to {operands}")]
    InvalidOperands {
        function: String,
        op: String,
        operands: String,
    },

    #[error("function '{function}' does not return a value on every path")]
    MissingReturn { function: String },

    #[error("function '{function}' is declared more than once")]
    DuplicateFunction { function: String },

    #[error("in '{function}': '{name}' is declared twice in the same scope")]
    DuplicateBinding { function: String, name: String },

    #[error("in '{function}': '{statement}' outside of a loop")]
    OutsideLoop { function: String, statement: String },

    #[error("in '{function}': {construct} has no mapping in every target language")]
    UnsupportedMapping { function: String, construct: String },
}

impl SemanticError {
    pub fn function(&self) -> &str {
        match self {
            SemanticError::UnboundVariable { function, .. }
            | SemanticError::UnknownFunction { function, .. }
            | SemanticError::ArityMismatch { function, .. }
            | SemanticError::TypeMismatch { function, .. }
            | SemanticError::InvalidOperands { function, .. }
            | SemanticError::MissingReturn { function }
            | SemanticError::DuplicateFunction { function }
            | SemanticError::DuplicateBinding { function, .. }
            | SemanticError::OutsideLoop { function, .. }
            | SemanticError::UnsupportedMapping { function, .. } => function,
        }
    }
}

/// Accepted but lossy constructs, e.g. narrowing conversions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum SemanticWarning {
    #[error("in '{function}': {context} narrows {from} to {to}")]
    Narrowing {
        function: String,
        context: String,
        from: Type,
        to: Type,
    },
}

/// A configured ceiling was hit before the pipeline finished
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("input exceeds the limit of {limit} tokens")]
    Tokens { limit: usize },

    #[error("input exceeds the limit of {limit} syntax nodes")]
    Nodes { limit: usize },

    #[error("input nests deeper than the limit of {limit} levels")]
    Depth { limit: usize },

    #[error("conversion exceeded the time budget of {limit_ms} ms")]
    Time { limit_ms: u64 },

    #[error("execution exceeded the limit of {limit} steps")]
    Steps { limit: u64 },

    #[error("execution exceeded the call depth limit of {limit}")]
    CallDepth { limit: usize },
}

/// A program that validated but failed while being interpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("in '{function}': integer division by zero")]
    DivisionByZero { function: String },

    #[error("in '{function}': index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { function: String, index: i64, len: usize },

    #[error("in '{function}': negative array length {len}")]
    NegativeLength { function: String, len: i64 },

    #[error("program has no entry point 'main'")]
    MissingEntryPoint,

    #[error("call to undefined function '{name}'")]
    UnknownFunction { name: String },

    #[error("in '{function}': '{name}' is not bound")]
    UnboundVariable { function: String, name: String },

    #[error("the interpreter thread stopped unexpectedly")]
    Aborted,
}

/// Outcome of a failed conversion: the full error list of the first
/// failing stage, or a problem with the request itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("{} syntax error(s)", .0.len())]
    Syntax(Vec<SyntaxError>),

    #[error("{} lowering error(s)", .0.len())]
    Lowering(Vec<LoweringError>),

    #[error("{} semantic error(s)", .0.len())]
    Semantic(Vec<SemanticError>),

    #[error("resource limit exceeded: {0}")]
    ResourceExceeded(ResourceError),

    #[error("runtime error: {0}")]
    Runtime(RuntimeError),

    #[error("unsupported target language '{0}'")]
    UnsupportedTarget(String),

    #[error("unsupported source language '{0}'")]
    UnsupportedSource(String),

    #[error("could not determine the source language; select one explicitly")]
    AmbiguousSource { candidates: Vec<Language> },
}

impl From<ResourceError> for ConversionError {
    fn from(err: ResourceError) -> Self {
        ConversionError::ResourceExceeded(err)
    }
}

impl From<RuntimeError> for ConversionError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Resource(limit) => ConversionError::ResourceExceeded(limit),
            other => ConversionError::Runtime(other),
        }
    }
}

/// Wire form of a single diagnostic, as returned to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn new(stage: Stage, message: String, position: Option<Position>) -> Self {
        Self {
            stage,
            message,
            line: position.map(|p| p.line),
            column: position.map(|p| p.column),
            help: None,
        }
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Pretty-print this diagnostic with the offending source line and a caret
    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        let kind_str = format!("{}", self.stage);
        out.push_str(&format!("{}: {}\n", kind_str.red().bold(), self.message.bold()));

        if let (Some(line), Some(column)) = (self.line, self.column) {
            out.push_str(&format!("{}\n", format!("  --> {}:{}", line, column).bright_blue()));
            if let Some(text) = source.lines().nth(line.saturating_sub(1)) {
                out.push_str(&format!("   {}\n", "|".bright_blue()));
                out.push_str(&format!(
                    "{} {} {}\n",
                    format!("{:3}", line).bright_blue(),
                    "|".bright_blue(),
                    text
                ));
                out.push_str(&format!(
                    "   {} {}{}\n",
                    "|".bright_blue(),
                    " ".repeat(column.saturating_sub(1)),
                    "^".red().bold()
                ));
                out.push_str(&format!("   {}\n", "|".bright_blue()));
            }
        }

        if let Some(ref help) = self.help {
            out.push_str(&format!(
                "   {} {}\n",
                "=".bright_yellow(),
                format!("help: {}", help).bright_yellow()
            ));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "[{:?}] {}:{}: {}", self.stage, line, column, self.message),
            _ => write!(f, "[{:?}] {}", self.stage, self.message),
        }
    }
}

impl From<&SyntaxError> for Diagnostic {
    fn from(err: &SyntaxError) -> Self {
        Diagnostic::new(Stage::Syntax, err.message.clone(), Some(err.position))
    }
}

impl From<&LoweringError> for Diagnostic {
    fn from(err: &LoweringError) -> Self {
        let message = match err {
            LoweringError::UnsupportedConstruct { kind, .. } => format!("unsupported construct '{}'", kind),
            LoweringError::UndeclaredIdentifier { name, .. } => format!("use of undeclared identifier '{}'", name),
            LoweringError::DuplicateDeclaration { name, .. } => {
                format!("'{}' is already declared in this scope", name)
            }
            LoweringError::UnknownType { name, .. } => format!("unknown type '{}'", name),
            LoweringError::Invalid { message, .. } => message.clone(),
        };
        let diag = Diagnostic::new(Stage::Lowering, message, Some(err.position()));
        match err {
            LoweringError::UndeclaredIdentifier { suggestion: Some(s), .. } => {
                diag.with_help(format!("did you mean '{}'?", s))
            }
            _ => diag,
        }
    }
}

impl From<&SemanticError> for Diagnostic {
    fn from(err: &SemanticError) -> Self {
        let diag = Diagnostic::new(Stage::Semantic, err.to_string(), None);
        match err {
            SemanticError::UnknownFunction { suggestion: Some(s), .. } => {
                diag.with_help(format!("did you mean '{}'?", s))
            }
            _ => diag,
        }
    }
}

impl ConversionError {
    pub fn stage(&self) -> Stage {
        match self {
            ConversionError::Syntax(_) => Stage::Syntax,
            ConversionError::Lowering(_) => Stage::Lowering,
            ConversionError::Semantic(_) => Stage::Semantic,
            ConversionError::ResourceExceeded(_) => Stage::Resource,
            ConversionError::Runtime(_) => Stage::Runtime,
            ConversionError::UnsupportedTarget(_)
            | ConversionError::UnsupportedSource(_)
            | ConversionError::AmbiguousSource { .. } => Stage::Request,
        }
    }

    /// Flatten into the wire diagnostic list, preserving stage order
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            ConversionError::Syntax(errors) => errors.iter().map(Diagnostic::from).collect(),
            ConversionError::Lowering(errors) => errors.iter().map(Diagnostic::from).collect(),
            ConversionError::Semantic(errors) => errors.iter().map(Diagnostic::from).collect(),
            ConversionError::ResourceExceeded(err) => {
                vec![Diagnostic::new(Stage::Resource, err.to_string(), None)]
            }
            ConversionError::Runtime(err) => vec![Diagnostic::new(Stage::Runtime, err.to_string(), None)],
            ConversionError::AmbiguousSource { candidates } if !candidates.is_empty() => {
                let names: Vec<&str> = candidates.iter().map(|l| l.tag()).collect();
                vec![Diagnostic::new(Stage::Request, self.to_string(), None)
                    .with_help(format!("the source looks like one of: {}", names.join(", ")))]
            }
            other => vec![Diagnostic::new(Stage::Request, other.to_string(), None)],
        }
    }
}

/// Computes the Levenshtein distance between two strings
/// Used for "Did you mean?" suggestions
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let (len1, len2) = (s1_chars.len(), s2_chars.len());

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut prev: Vec<usize> = (0..=len2).collect();
    let mut curr = vec![0; len2 + 1];

    for i in 1..=len1 {
        curr[0] = i;
        for j in 1..=len2 {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[len2]
}

/// Find the closest match from a list of candidates using Levenshtein distance
/// Returns None if no good match is found (distance > 2)
pub fn find_closest_match<'a, I>(target: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        if candidate == target {
            continue;
        }
        let distance = levenshtein_distance(target, candidate);
        let better = match best {
            Some((name, d)) => distance < d || (distance == d && candidate < name),
            None => true,
        };
        if distance <= 2 && better {
            best = Some((candidate, distance));
        }
    }
    best.map(|(name, _)| name.to_string())
}
