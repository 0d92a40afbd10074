// File: src/parser/expr.rs
//
// Expression grammar shared by all front ends: precedence climbing over
// the common C operator table, then unary, postfix and primary forms.
// Language-only syntax (casts, `new`, array literals, arrow functions) is
// gated on the parser's Dialect. Constructs we recognise but never convert
// are parsed past and returned as Expr::Unsupported so lowering can report
// them by name.

use super::{PResult, Parser};
use crate::cst::{Expr, TypeSpec};
use crate::errors::Position;
use crate::language::Language;
use crate::lexer::TokenKind;

const ASSIGN_OPS: &[&str] = &["=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", ">>>="];

impl<'b> Parser<'b> {
    pub fn parse_expression(&mut self) -> PResult<Expr> {
        self.nested(|p| p.parse_assignment())
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let target = self.parse_ternary()?;
        let tok = self.peek();
        if tok.kind == TokenKind::Operator && ASSIGN_OPS.contains(&tok.text.as_str()) {
            let op_tok = self.advance();
            let value = self.nested(|p| p.parse_assignment())?;
            self.node()?;
            return Ok(Expr::Assign {
                op: op_tok.text,
                target: Box::new(target),
                value: Box::new(value),
                pos: op_tok.pos,
            });
        }
        Ok(target)
    }

    fn parse_ternary(&mut self) -> PResult<Expr> {
        let cond = self.parse_binary(1)?;
        if self.check("?") {
            let pos = self.advance().pos;
            let then = self.nested(|p| p.parse_assignment())?;
            self.expect(":")?;
            let otherwise = self.nested(|p| p.parse_assignment())?;
            self.node()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
                pos,
            });
        }
        Ok(cond)
    }

    fn binary_precedence(&self) -> Option<u8> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Operator => match tok.text.as_str() {
                "||" => Some(1),
                "&&" => Some(2),
                "|" => Some(3),
                "^" => Some(4),
                "&" => Some(5),
                "==" | "!=" | "===" | "!==" => Some(6),
                "<" | "<=" | ">" | ">=" => Some(7),
                "<<" | ">>" | ">>>" => Some(8),
                "+" | "-" => Some(9),
                "*" | "/" | "%" => Some(10),
                _ => None,
            },
            TokenKind::Keyword if tok.text == "instanceof" || tok.text == "in" => Some(7),
            _ => None,
        }
    }

    /// Left-associative binary operators binding at least as tight as `min`
    fn parse_binary(&mut self, min: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        // each fold puts the chain so far one level further down the tree
        let mut folds = 0;
        while let Some(prec) = self.binary_precedence() {
            if prec < min {
                break;
            }
            folds += 1;
            self.check_chain(folds)?;
            let op_tok = self.advance();
            let rhs = self.nested(|p| p.parse_binary(prec + 1))?;
            self.node()?;
            lhs = Expr::Binary {
                op: op_tok.text,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos: op_tok.pos,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Operator if matches!(tok.text.as_str(), "!" | "-" | "+" | "~" | "++" | "--") => {
                self.advance();
                let operand = self.nested(|p| p.parse_unary())?;
                self.node()?;
                Ok(Expr::Unary { op: tok.text, operand: Box::new(operand), pos: tok.pos })
            }
            TokenKind::Operator if self.dialect.pointers && (tok.text == "*" || tok.text == "&") => {
                self.advance();
                self.nested(|p| p.parse_unary())?;
                let kind = if tok.text == "*" { "pointer dereference" } else { "address-of" };
                Ok(Expr::Unsupported { kind: kind.to_string(), pos: tok.pos })
            }
            TokenKind::Keyword if tok.text == "sizeof" => {
                self.advance();
                self.parse_sizeof(tok.pos)
            }
            TokenKind::Keyword if matches!(tok.text.as_str(), "typeof" | "delete" | "void" | "await") => {
                self.advance();
                self.nested(|p| p.parse_unary())?;
                Ok(Expr::Unsupported { kind: tok.text, pos: tok.pos })
            }
            TokenKind::Punctuation if tok.text == "(" && self.dialect.typed && self.looks_like_cast() => {
                self.advance();
                let ty = self.parse_type()?;
                self.expect(")")?;
                let expr = self.nested(|p| p.parse_unary())?;
                self.node()?;
                Ok(Expr::Cast { ty, expr: Box::new(expr), pos: tok.pos })
            }
            _ => self.parse_postfix(),
        }
    }

    /// `(` followed by a keyword type and `)`: `(int) x`, `(long long) y`
    fn looks_like_cast(&mut self) -> bool {
        let next = self.peek_at(1);
        let starts_with_type = next.kind == TokenKind::Keyword
            && (self.dialect.primitive_types.contains(&next.text.as_str())
                || self.dialect.type_qualifiers.contains(&next.text.as_str()));
        if !starts_with_type {
            return false;
        }
        let saved = self.pos;
        self.advance();
        let result = self.try_parse_type().is_some() && self.check(")");
        self.pos = saved;
        result
    }

    fn parse_sizeof(&mut self, pos: Position) -> PResult<Expr> {
        if self.check("(") && self.peek_at(1).kind == TokenKind::Keyword {
            self.skip_group("(", ")")?;
            return Ok(Expr::Unsupported { kind: "sizeof(type)".to_string(), pos });
        }
        let operand = self.nested(|p| p.parse_unary())?;
        self.node()?;
        Ok(Expr::Sizeof { operand: Box::new(operand), pos })
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        let mut folds = 0;
        loop {
            folds += 1;
            self.check_chain(folds)?;
            if self.check("(") {
                let pos = self.advance().pos;
                let args = self.parse_arguments(")")?;
                self.node()?;
                expr = Expr::Call { callee: Box::new(expr), args, pos };
            } else if self.check(".") {
                let pos = self.advance().pos;
                let (name, _) = self.expect_member_name()?;
                self.node()?;
                expr = Expr::Member { object: Box::new(expr), name, pos };
            } else if self.check("->") && self.dialect.pointers {
                let pos = self.advance().pos;
                self.expect_member_name()?;
                expr = Expr::Unsupported { kind: "pointer member access".to_string(), pos };
            } else if self.check("[") {
                let pos = self.advance().pos;
                let index = self.parse_expression()?;
                self.expect("]")?;
                self.node()?;
                expr = Expr::Index { object: Box::new(expr), index: Box::new(index), pos };
            } else if self.check("++") || self.check("--") {
                let tok = self.advance();
                self.node()?;
                expr = Expr::Postfix { op: tok.text, operand: Box::new(expr), pos: tok.pos };
            } else if self.check("::") && self.dialect.language == Language::Java {
                let pos = self.advance().pos;
                self.expect_member_name()?;
                expr = Expr::Unsupported { kind: "method reference".to_string(), pos };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Member names may collide with keywords in the owning language (`.length`, `.new`)
    fn expect_member_name(&mut self) -> PResult<(String, Position)> {
        if self.peek().kind == TokenKind::Keyword {
            let tok = self.advance();
            return Ok((tok.text, tok.pos));
        }
        self.expect_identifier()
    }

    /// Comma-separated expressions up to and including `close`
    pub fn parse_arguments(&mut self, close: &str) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(close) {
            return Ok(args);
        }
        loop {
            if self.check("...") {
                let pos = self.advance().pos;
                self.parse_assignment()?;
                args.push(Expr::Unsupported { kind: "spread".to_string(), pos });
            } else {
                args.push(self.parse_assignment()?);
            }
            if self.eat(",") {
                // Trailing comma in JavaScript array literals and calls
                if self.check(close) {
                    self.advance();
                    return Ok(args);
                }
                continue;
            }
            self.expect(close)?;
            return Ok(args);
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        self.node()?;
        match tok.kind {
            TokenKind::Literal(kind) => {
                self.advance();
                Ok(Expr::Literal { kind, raw: tok.text, pos: tok.pos })
            }
            TokenKind::Keyword => self.parse_keyword_primary(),
            TokenKind::Identifier => {
                if let Some(arrow) = self.dialect.lambda_arrow {
                    if self.peek_at(1).is_symbol(arrow) {
                        return self.skip_lambda(tok.pos);
                    }
                }
                if tok.text == "NULL" && self.dialect.pointers {
                    self.advance();
                    return Ok(Expr::Null(tok.pos));
                }
                if self.dialect.language == Language::Cpp && self.is_named_cast(&tok.text) {
                    return self.parse_named_cast();
                }
                self.advance();
                let mut name = tok.text;
                while self.check("::") && self.dialect.language != Language::Java {
                    self.advance();
                    let (part, _) = self.expect_identifier()?;
                    name.push_str("::");
                    name.push_str(&part);
                }
                Ok(Expr::Identifier { name, pos: tok.pos })
            }
            TokenKind::Punctuation if tok.text == "(" => {
                if let Some(arrow) = self.dialect.lambda_arrow {
                    if self.group_followed_by(arrow) {
                        return self.skip_lambda(tok.pos);
                    }
                }
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(")")?;
                Ok(inner)
            }
            TokenKind::Punctuation if tok.text == "[" && self.dialect.language == Language::JavaScript => {
                self.advance();
                let items = self.parse_arguments("]")?;
                Ok(Expr::ArrayLiteral { items, pos: tok.pos })
            }
            TokenKind::Punctuation if tok.text == "{" => {
                self.skip_group("{", "}")?;
                let kind = match self.dialect.language {
                    Language::JavaScript => "object literal",
                    _ => "initializer list",
                };
                Ok(Expr::Unsupported { kind: kind.to_string(), pos: tok.pos })
            }
            _ => {
                let found = self.describe_current();
                self.fail(format!("expected expression, found {}", found))
            }
        }
    }

    fn parse_keyword_primary(&mut self) -> PResult<Expr> {
        let tok = self.advance();
        match tok.text.as_str() {
            "true" => Ok(Expr::Bool { value: true, pos: tok.pos }),
            "false" => Ok(Expr::Bool { value: false, pos: tok.pos }),
            "null" | "nullptr" | "undefined" => Ok(Expr::Null(tok.pos)),
            "this" => Ok(Expr::Unsupported { kind: "this".to_string(), pos: tok.pos }),
            "new" => self.parse_new(tok.pos),
            "function" => {
                if self.check_identifier() {
                    self.advance();
                }
                self.skip_group("(", ")")?;
                if self.check("{") {
                    self.skip_group("{", "}")?;
                }
                Ok(Expr::Unsupported { kind: "function expression".to_string(), pos: tok.pos })
            }
            "class" => {
                while !self.check("{") && !self.at_eof() {
                    self.advance();
                }
                self.skip_group("{", "}")?;
                Ok(Expr::Unsupported { kind: "class".to_string(), pos: tok.pos })
            }
            _ => self.fail_at(format!("expected expression, found '{}'", tok.text), tok.pos),
        }
    }

    /// `new T[n]`, `new T[]{...}`, `new T(args)`
    fn parse_new(&mut self, pos: Position) -> PResult<Expr> {
        let name_tok = self.peek().clone();
        let mut base = match name_tok.kind {
            TokenKind::Identifier | TokenKind::Keyword => {
                self.advance();
                name_tok.text
            }
            _ => {
                let found = self.describe_current();
                return self.fail(format!("expected type after 'new', found {}", found));
            }
        };
        while (self.check(".") || self.check("::")) && self.peek_at(1).kind == TokenKind::Identifier {
            let sep = self.advance().text;
            base.push_str(&sep);
            base.push_str(&self.advance().text);
        }
        if self.dialect.generics && self.check("<") {
            self.skip_group("<", ">")?;
        }
        let elem = TypeSpec::named(base, name_tok.pos);

        if self.check("[") {
            self.advance();
            let len = if self.check("]") { None } else { Some(Box::new(self.parse_expression()?)) };
            self.expect("]")?;
            let mut elem = elem;
            // Extra dimensions: new int[n][m]
            while self.check("[") {
                self.advance();
                if !self.check("]") {
                    self.parse_expression()?;
                }
                self.expect("]")?;
                elem.array_dims += 1;
            }
            let init = if self.check("{") {
                self.advance();
                Some(self.parse_arguments("}")?)
            } else {
                None
            };
            return Ok(Expr::NewArray { elem, len, init, pos });
        }

        let args = if self.check("(") {
            self.advance();
            self.parse_arguments(")")?
        } else {
            Vec::new()
        };
        if self.check("{") {
            // Anonymous class body
            self.skip_group("{", "}")?;
            return Ok(Expr::Unsupported { kind: "anonymous class".to_string(), pos });
        }
        Ok(Expr::New { class: elem.base, args, pos })
    }

    fn is_named_cast(&self, name: &str) -> bool {
        matches!(name, "static_cast" | "reinterpret_cast" | "const_cast" | "dynamic_cast") && self.peek_at(1).is_symbol("<")
    }

    /// C++ `static_cast<T>(expr)`
    fn parse_named_cast(&mut self) -> PResult<Expr> {
        let tok = self.advance();
        self.expect("<")?;
        let ty = self.parse_type()?;
        self.expect(">")?;
        self.expect("(")?;
        let expr = self.parse_expression()?;
        self.expect(")")?;
        if tok.text != "static_cast" {
            return Ok(Expr::Unsupported { kind: tok.text, pos: tok.pos });
        }
        Ok(Expr::Cast { ty, expr: Box::new(expr), pos: tok.pos })
    }

    /// True when the parenthesised group at the cursor is followed by `symbol`
    fn group_followed_by(&self, symbol: &str) -> bool {
        let mut depth = 0usize;
        let mut i = 0;
        loop {
            let tok = self.peek_at(i);
            if tok.kind == TokenKind::Eof {
                return false;
            }
            if tok.is_symbol("(") {
                depth += 1;
            } else if tok.is_symbol(")") {
                depth -= 1;
                if depth == 0 {
                    return self.peek_at(i + 1).is_symbol(symbol);
                }
            }
            i += 1;
        }
    }

    /// Consume `x => body` / `(a, b) -> { ... }` and report it as unsupported
    fn skip_lambda(&mut self, pos: Position) -> PResult<Expr> {
        if self.check("(") {
            self.skip_group("(", ")")?;
        } else {
            self.advance();
        }
        self.advance(); // arrow
        if self.check("{") {
            self.skip_group("{", "}")?;
        } else {
            self.parse_assignment()?;
        }
        let kind = match self.dialect.language {
            Language::JavaScript => "arrow function",
            _ => "lambda",
        };
        Ok(Expr::Unsupported { kind: kind.to_string(), pos })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Budget;
    use crate::cst::Expr;
    use crate::language::Language;
    use crate::lexer;
    use crate::parser::{frontend, Parser};

    fn expr(src: &str, language: Language) -> Expr {
        let front = frontend(language);
        let mut budget = Budget::unlimited();
        let lexed = lexer::tokenize(src, front.profile(), &budget).unwrap();
        let mut p = Parser::new(lexed.tokens, front.dialect(), &mut budget, 10);
        p.parse_expression().unwrap()
    }

    fn op_of(e: &Expr) -> &str {
        match e {
            Expr::Binary { op, .. } | Expr::Assign { op, .. } => op,
            other => panic!("not an operator node: {:?}", other),
        }
    }

    #[test]
    fn test_precedence_and_associativity() {
        let e = expr("a + b * c - d", Language::C);
        assert_eq!(op_of(&e), "-");
        let Expr::Binary { lhs, .. } = &e else { unreachable!() };
        assert_eq!(op_of(lhs), "+");

        let e = expr("a = b = 3", Language::Java);
        let Expr::Assign { value, .. } = &e else { panic!("expected assignment") };
        assert_eq!(op_of(value), "=");
    }

    #[test]
    fn test_casts_by_dialect() {
        assert!(matches!(expr("(double) x / 2", Language::Java), Expr::Binary { .. }));
        let Expr::Binary { lhs, .. } = expr("(double) x / 2", Language::Java) else { unreachable!() };
        assert!(matches!(*lhs, Expr::Cast { .. }));
        assert!(matches!(expr("static_cast<int>(y)", Language::Cpp), Expr::Cast { .. }));
        // A parenthesised variable is not a cast
        assert!(matches!(expr("(x) + 1", Language::C), Expr::Binary { .. }));
    }

    #[test]
    fn test_member_calls_and_paths() {
        let e = expr("System.out.println(x)", Language::Java);
        let Expr::Call { callee, args, .. } = &e else { panic!("expected call") };
        assert_eq!(callee.path().as_deref(), Some("System.out.println"));
        assert_eq!(args.len(), 1);

        let e = expr("std::cout << x << std::endl", Language::Cpp);
        assert_eq!(op_of(&e), "<<");
    }

    #[test]
    fn test_new_and_array_literals() {
        assert!(matches!(expr("new int[n]", Language::Java), Expr::NewArray { len: Some(_), .. }));
        assert!(matches!(expr("new int[]{1, 2}", Language::Java), Expr::NewArray { init: Some(_), .. }));
        assert!(matches!(expr("new Array(5)", Language::JavaScript), Expr::New { .. }));
        let Expr::ArrayLiteral { items, .. } = expr("[1, 2, 3,]", Language::JavaScript) else {
            panic!("expected array literal")
        };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_unsupported_forms_are_named() {
        let kind = |e: Expr| match e {
            Expr::Unsupported { kind, .. } => kind,
            other => panic!("expected unsupported, got {:?}", other),
        };
        assert_eq!(kind(expr("(a, b) => a + b", Language::JavaScript)), "arrow function");
        assert_eq!(kind(expr("x -> x * 2", Language::Java)), "lambda");
        assert_eq!(kind(expr("*p", Language::C)), "pointer dereference");
        assert_eq!(kind(expr("{ a: 1 }", Language::JavaScript)), "object literal");
    }
}
