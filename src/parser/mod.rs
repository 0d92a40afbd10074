// File: src/parser/mod.rs
//
// Front ends: recursive descent parsers for C, C++, Java and JavaScript.
//
// All four grammars share statement and expression syntax, so the cursor,
// error recovery, types, statements and expressions live here and in the
// `stmt` / `expr` submodules. Each language module supplies a lexer profile,
// a Dialect (which optional syntax is enabled) and its top-level grammar
// through the Frontend trait.
//
// Errors are collected, not thrown: a failing statement records a
// SyntaxError, the parser skips to the next statement boundary and keeps
// going until the configured error cap. Any recorded error fails the parse;
// lowering never sees a partial tree.

mod expr;
mod stmt;

pub mod c;
pub mod cpp;
pub mod java;
pub mod javascript;

use crate::config::Budget;
use crate::cst::{Cst, Item, Program, TypeSpec};
use crate::errors::{Position, ResourceError, SyntaxError};
use crate::language::Language;
use crate::lexer::{self, LexerProfile, Token, TokenKind};
use ahash::AHashMap;
use once_cell::sync::Lazy;

/// Which optional pieces of the shared grammar a language uses
#[derive(Debug)]
pub struct Dialect {
    pub language: Language,
    /// Declarations start with a type (C, C++, Java)
    pub typed: bool,
    /// Type keywords, including multi-word prefixes like `unsigned`
    pub primitive_types: &'static [&'static str],
    pub type_qualifiers: &'static [&'static str],
    pub pointers: bool,
    pub references: bool,
    pub generics: bool,
    /// Statement labels and goto
    pub labels: bool,
    /// JavaScript automatic semicolon insertion
    pub optional_semicolons: bool,
    /// `=>` (JavaScript) or `->` (Java)
    pub lambda_arrow: Option<&'static str>,
}

/// Why a production stopped
#[derive(Debug, Clone, PartialEq)]
pub enum Abort {
    /// A syntax error was recorded; recover and continue
    Syntax,
    TooManyErrors,
    Resource(ResourceError),
}

impl From<ResourceError> for Abort {
    fn from(err: ResourceError) -> Self {
        Abort::Resource(err)
    }
}

pub type PResult<T> = Result<T, Abort>;

/// Result of a failed parse
#[derive(Debug, Clone, PartialEq)]
pub enum ParseFailure {
    Syntax(Vec<SyntaxError>),
    Resource(ResourceError),
}

/// A source-language front end
pub trait Frontend: Send + Sync {
    fn language(&self) -> Language;
    fn profile(&self) -> &'static LexerProfile;
    fn dialect(&self) -> &'static Dialect;

    /// Parse one top-level item
    fn parse_item(&self, p: &mut Parser<'_>) -> PResult<Item>;

    /// Tokenize and parse a whole source file
    fn parse(&self, source: &str, budget: &mut Budget, max_errors: usize) -> Result<Cst, ParseFailure> {
        let lexed = lexer::tokenize(source, self.profile(), budget).map_err(ParseFailure::Resource)?;
        log::debug!("{}: {} tokens", self.language().tag(), lexed.tokens.len());

        let mut p = Parser::new(lexed.tokens, self.dialect(), budget, max_errors);
        for err in lexed.errors {
            p.record(err);
        }

        let mut items = Vec::new();
        while !p.at_eof() && !p.error_cap_reached() {
            match self.parse_item(&mut p) {
                Ok(item) => items.push(item),
                Err(Abort::Syntax) => p.recover_item(),
                Err(Abort::TooManyErrors) => break,
                Err(Abort::Resource(err)) => return Err(ParseFailure::Resource(err)),
            }
        }

        if !p.errors.is_empty() {
            return Err(ParseFailure::Syntax(p.errors));
        }
        Ok(Cst {
            language: self.language(),
            program: Program { items },
            node_count: p.nodes,
        })
    }
}

static FRONTENDS: Lazy<AHashMap<Language, Box<dyn Frontend>>> = Lazy::new(|| {
    Language::ALL
        .iter()
        .map(|&lang| {
            let frontend: Box<dyn Frontend> = match lang {
                Language::C => Box::new(c::CFrontend),
                Language::Cpp => Box::new(cpp::CppFrontend),
                Language::Java => Box::new(java::JavaFrontend),
                Language::JavaScript => Box::new(javascript::JavaScriptFrontend),
            };
            (lang, frontend)
        })
        .collect()
});

/// The registered front end for a language
pub fn frontend(language: Language) -> &'static dyn Frontend {
    // The registry is built from Language::ALL, so every tag is present
    match FRONTENDS.get(&language) {
        Some(frontend) => frontend.as_ref(),
        None => unreachable!("no front end registered for {}", language),
    }
}

/// Parse `source` as `language`
pub fn parse(source: &str, language: Language, budget: &mut Budget, max_errors: usize) -> Result<Cst, ParseFailure> {
    frontend(language).parse(source, budget, max_errors)
}

/// Token cursor shared by all grammars
pub struct Parser<'b> {
    tokens: Vec<Token>,
    pos: usize,
    pub(crate) dialect: &'static Dialect,
    budget: &'b mut Budget,
    errors: Vec<SyntaxError>,
    max_errors: usize,
    nodes: usize,
    /// Current nesting of statements and expressions
    depth: usize,
}

impl<'b> Parser<'b> {
    pub fn new(tokens: Vec<Token>, dialect: &'static Dialect, budget: &'b mut Budget, max_errors: usize) -> Self {
        Parser {
            tokens,
            pos: 0,
            dialect,
            budget,
            errors: Vec::new(),
            max_errors: max_errors.max(1),
            nodes: 0,
            depth: 0,
        }
    }

    // ----- cursor -----

    pub fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    pub fn peek_at(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    pub fn position(&self) -> Position {
        self.peek().pos
    }

    pub fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub fn check(&self, symbol: &str) -> bool {
        self.peek().is_symbol(symbol)
    }

    pub fn check_keyword(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    pub fn check_identifier(&self) -> bool {
        self.peek().kind == TokenKind::Identifier
    }

    pub fn eat(&mut self, symbol: &str) -> bool {
        if self.check(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, symbol: &str) -> PResult<Token> {
        if self.check(symbol) {
            Ok(self.advance())
        } else {
            let found = self.describe_current();
            self.fail(format!("expected '{}', found {}", symbol, found))
        }
    }

    pub fn expect_identifier(&mut self) -> PResult<(String, Position)> {
        if self.check_identifier() {
            let tok = self.advance();
            Ok((tok.text, tok.pos))
        } else {
            let found = self.describe_current();
            self.fail(format!("expected identifier, found {}", found))
        }
    }

    /// `;`, or nothing where JavaScript would insert one
    pub fn expect_terminator(&mut self) -> PResult<()> {
        if self.eat(";") {
            return Ok(());
        }
        if self.dialect.optional_semicolons {
            let prev_line = self.pos.checked_sub(1).map(|i| self.tokens[i].pos.line);
            let next = self.peek();
            if next.kind == TokenKind::Eof || next.is_symbol("}") || prev_line.map_or(false, |l| next.pos.line > l) {
                return Ok(());
            }
        }
        let found = self.describe_current();
        self.fail(format!("expected ';', found {}", found))
    }

    pub fn describe_current(&self) -> String {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", tok.text),
        }
    }

    // ----- errors, budget, recovery -----

    fn record(&mut self, err: SyntaxError) {
        if self.errors.len() < self.max_errors {
            self.errors.push(err);
        }
    }

    pub fn error_cap_reached(&self) -> bool {
        self.errors.len() >= self.max_errors
    }

    /// Record an error at the current token and abort the production
    pub fn fail<T>(&mut self, message: impl Into<String>) -> PResult<T> {
        let pos = self.position();
        self.fail_at(message, pos)
    }

    pub fn fail_at<T>(&mut self, message: impl Into<String>, pos: Position) -> PResult<T> {
        self.record(SyntaxError::new(message, pos));
        if self.error_cap_reached() {
            Err(Abort::TooManyErrors)
        } else {
            Err(Abort::Syntax)
        }
    }

    /// Account for one allocated syntax node
    pub fn node(&mut self) -> PResult<()> {
        self.nodes += 1;
        self.budget.charge_node()?;
        Ok(())
    }

    /// Run a production one nesting level deeper. The level is released
    /// however the production ends, so recovery resumes at the right depth.
    pub fn nested<T>(&mut self, production: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        self.depth += 1;
        let result = match self.budget.check_depth(self.depth) {
            Ok(()) => production(self),
            Err(err) => Err(Abort::Resource(err)),
        };
        self.depth -= 1;
        result
    }

    /// Fail when an operator chain of `length` folds would nest too deep
    pub fn check_chain(&self, length: usize) -> PResult<()> {
        self.budget.check_depth(self.depth + length)?;
        Ok(())
    }

    /// Skip to just past the next `;` or to the next unmatched `}`
    pub fn recover_statement(&mut self) {
        let mut depth = 0usize;
        while !self.at_eof() {
            if self.check("{") || self.check("(") || self.check("[") {
                depth += 1;
            } else if self.check("}") || self.check(")") || self.check("]") {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                if depth == 0 && self.check("}") {
                    self.advance();
                    return;
                }
            } else if depth == 0 && self.check(";") {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    /// Skip to the start of the next top-level item
    pub fn recover_item(&mut self) {
        let start = self.pos;
        self.recover_statement();
        if self.check("}") && self.pos == start {
            // Stray closing brace at top level
            self.advance();
        }
    }

    /// Skip a balanced `open ... close` group starting at the current token
    pub fn skip_group(&mut self, open: &str, close: &str) -> PResult<()> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.at_eof() {
                return self.fail(format!("unclosed '{}'", open));
            }
            if self.check(open) {
                depth += 1;
            } else if self.check(close) {
                depth -= 1;
            }
            self.advance();
        }
        Ok(())
    }

    /// Skip a declaration we do not convert: everything up to the next `;`
    /// at depth zero. A brace group ends it unless a declarator follows
    /// (`struct S { ... } s;`, `typedef struct { ... } Name;`).
    pub fn skip_declaration(&mut self) -> PResult<()> {
        loop {
            if self.at_eof() {
                return self.fail("unexpected end of input");
            }
            if self.check("{") {
                self.skip_group("{", "}")?;
                if self.eat(";") {
                    return Ok(());
                }
                if self.check_identifier() || self.check("*") {
                    continue;
                }
                return Ok(());
            }
            if self.eat(";") {
                return Ok(());
            }
            self.advance();
        }
    }

    // ----- types -----

    fn is_type_start(&self, tok: &Token) -> bool {
        match tok.kind {
            TokenKind::Keyword => {
                self.dialect.primitive_types.contains(&tok.text.as_str())
                    || self.dialect.type_qualifiers.contains(&tok.text.as_str())
            }
            TokenKind::Identifier => self.dialect.typed,
            _ => false,
        }
    }

    /// Parse a type without recording errors; restores the cursor on failure
    pub fn try_parse_type(&mut self) -> Option<TypeSpec> {
        let saved = self.pos;
        let ty = self.parse_type_inner();
        if ty.is_none() {
            self.pos = saved;
        }
        ty
    }

    pub fn parse_type(&mut self) -> PResult<TypeSpec> {
        match self.try_parse_type() {
            Some(ty) => Ok(ty),
            None => {
                let found = self.describe_current();
                self.fail(format!("expected type, found {}", found))
            }
        }
    }

    fn parse_type_inner(&mut self) -> Option<TypeSpec> {
        let pos = self.position();
        let mut qualifiers = Vec::new();
        while self.peek().kind == TokenKind::Keyword && self.dialect.type_qualifiers.contains(&self.peek().text.as_str())
        {
            qualifiers.push(self.advance().text);
        }

        let tok = self.peek().clone();
        let signedness = qualifiers.iter().any(|q| q == "unsigned" || q == "signed");
        let base = match tok.kind {
            TokenKind::Keyword if self.dialect.primitive_types.contains(&tok.text.as_str()) => {
                self.advance();
                let mut words = vec![tok.text];
                // long long, unsigned int, long double
                while self.peek().kind == TokenKind::Keyword
                    && self.dialect.primitive_types.contains(&self.peek().text.as_str())
                {
                    words.push(self.advance().text);
                }
                words.join(" ")
            }
            TokenKind::Identifier if self.dialect.typed && !signedness => {
                self.advance();
                let mut name = tok.text;
                while self.check("::") && self.peek_at(1).kind == TokenKind::Identifier {
                    self.advance();
                    name.push_str("::");
                    name.push_str(&self.advance().text);
                }
                name
            }
            _ => {
                // `unsigned x` means `unsigned int x`
                if signedness {
                    "int".to_string()
                } else {
                    return None;
                }
            }
        };

        let mut generic_args = Vec::new();
        if self.dialect.generics && self.check("<") {
            self.advance();
            loop {
                generic_args.push(self.parse_type_inner()?);
                if !self.eat(",") {
                    break;
                }
            }
            if !self.eat(">") {
                return None;
            }
        }

        // Trailing `const` as in `char const *`
        while self.peek().kind == TokenKind::Keyword && self.peek().text == "const" {
            qualifiers.push(self.advance().text);
        }

        let mut pointer_depth = 0;
        let mut is_reference = false;
        loop {
            if self.dialect.pointers && self.check("*") {
                self.advance();
                pointer_depth += 1;
            } else if self.dialect.references && (self.check("&") || self.check("&&")) {
                self.advance();
                is_reference = true;
            } else if self.check_keyword("const") && (pointer_depth > 0 || is_reference) {
                self.advance();
            } else {
                break;
            }
        }

        let mut array_dims = 0;
        while self.check("[") && self.peek_at(1).is_symbol("]") {
            self.advance();
            self.advance();
            array_dims += 1;
        }

        Some(TypeSpec {
            base,
            generic_args,
            pointer_depth,
            is_reference,
            array_dims,
            qualifiers,
            pos,
        })
    }

    /// True when the upcoming tokens read `Type name`
    pub fn looks_like_declaration(&mut self) -> bool {
        if !self.dialect.typed || !self.is_type_start(self.peek()) {
            return false;
        }
        let saved = self.pos;
        let result = self.parse_type_inner().is_some() && self.check_identifier();
        self.pos = saved;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::{Expr, Stmt};

    fn parse_ok(source: &str, language: Language) -> Cst {
        match parse(source, language, &mut Budget::unlimited(), 25) {
            Ok(cst) => cst,
            Err(err) => panic!("parse failed: {:?}", err),
        }
    }

    fn parse_err(source: &str, language: Language) -> Vec<SyntaxError> {
        match parse(source, language, &mut Budget::unlimited(), 25) {
            Err(ParseFailure::Syntax(errors)) => errors,
            other => panic!("expected syntax errors, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_covers_every_language() {
        for lang in Language::ALL {
            assert_eq!(frontend(lang).language(), lang);
        }
    }

    #[test]
    fn test_c_factorial_shape() {
        let cst = parse_ok("int factorial(int n){ if(n<=1) return 1; return n*factorial(n-1); }", Language::C);
        assert_eq!(cst.language, Language::C);
        let Item::Function(f) = &cst.program.items[0] else {
            panic!("expected function");
        };
        assert_eq!(f.name, "factorial");
        assert_eq!(f.params.len(), 1);
        let body = f.body.as_ref().unwrap();
        assert_eq!(body.stmts.len(), 2);
        match &body.stmts[1] {
            Stmt::Return { value: Some(Expr::Binary { op, .. }), .. } => assert_eq!(op, "*"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_errors_are_collected_across_statements() {
        let errors = parse_err("int main() { int x = ; int y = 2 return y; }", Language::C);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].position.line, 1);
        assert!(errors[0].message.contains("expected expression"));
        assert!(errors[1].message.contains("expected ';'"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let src = "function f(a) { let s = 0; for (let i = 0; i < a; i++) { s += i; } return s; }";
        let a = parse_ok(src, Language::JavaScript);
        let b = parse_ok(src, Language::JavaScript);
        assert_eq!(a, b);

        let bad = "int f( { return; }";
        assert_eq!(parse_err(bad, Language::C), parse_err(bad, Language::C));
    }

    #[test]
    fn test_error_cap_stops_parsing() {
        let src = "int main() { int a = ; int b = ; int c = ; }";
        match parse(src, Language::C, &mut Budget::unlimited(), 2) {
            Err(ParseFailure::Syntax(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_node_budget_aborts_parse() {
        let config = crate::config::EngineConfig { max_nodes: 5, ..Default::default() };
        let src = "int f(int a) { return a + a + a + a + a + a; }";
        let result = parse(src, Language::C, &mut config.budget(), 25);
        assert_eq!(result, Err(ParseFailure::Resource(ResourceError::Nodes { limit: 5 })));
    }

    #[test]
    fn test_deep_nesting_is_a_resource_error() {
        let config = crate::config::EngineConfig::default();
        let parens = format!("int f() {{ return {}1{}; }}", "(".repeat(500), ")".repeat(500));
        let result = parse(&parens, Language::C, &mut config.budget(), 25);
        assert_eq!(result, Err(ParseFailure::Resource(ResourceError::Depth { limit: 100 })));

        let blocks = format!("function f() {{ {} {} }}", "{".repeat(300), "}".repeat(300));
        let result = parse(&blocks, Language::JavaScript, &mut config.budget(), 25);
        assert_eq!(result, Err(ParseFailure::Resource(ResourceError::Depth { limit: 100 })));

        let negations = format!("int f(int x) {{ return {}x; }}", "-".repeat(400).replace("--", "- -"));
        let result = parse(&negations, Language::C, &mut config.budget(), 25);
        assert!(matches!(result, Err(ParseFailure::Resource(ResourceError::Depth { .. }))));
    }

    #[test]
    fn test_moderate_nesting_still_parses() {
        let config = crate::config::EngineConfig::default();
        let src = format!("int f() {{ return {}1{}; }}", "(".repeat(20), ")".repeat(20));
        assert!(parse(&src, Language::C, &mut config.budget(), 25).is_ok());
    }
}
