// File: src/parser/stmt.rs
//
// Statement, declaration and function grammar shared by all front ends.
// Blocks recover locally: a broken statement is skipped up to its `;` or
// the enclosing `}` and parsing resumes with the next one.

use super::{Abort, PResult, Parser};
use crate::cst::{Block, Declarator, Expr, FunctionDecl, Init, ParamDecl, Stmt, TypeSpec, VarDecl};
use crate::errors::Position;
use crate::language::Language;
use crate::lexer::TokenKind;

impl<'b> Parser<'b> {
    pub fn parse_block(&mut self) -> PResult<Block> {
        let pos = self.expect("{")?.pos;
        let mut stmts = Vec::new();
        loop {
            if self.eat("}") {
                break;
            }
            if self.at_eof() {
                return self.fail("expected '}', found end of input");
            }
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(Abort::Syntax) => self.recover_statement(),
                Err(abort) => return Err(abort),
            }
        }
        self.node()?;
        Ok(Block { stmts, pos })
    }

    pub fn parse_statement(&mut self) -> PResult<Stmt> {
        self.nested(|p| p.statement_at_depth())
    }

    fn statement_at_depth(&mut self) -> PResult<Stmt> {
        let tok = self.peek().clone();
        let pos = tok.pos;
        self.node()?;

        if tok.is_symbol("{") {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if tok.is_symbol(";") {
            self.advance();
            return Ok(Stmt::Empty(pos));
        }
        if tok.is_symbol("@") && self.dialect.language == Language::Java {
            self.skip_annotations()?;
            return self.statement_at_depth();
        }

        if tok.kind == TokenKind::Keyword {
            match tok.text.as_str() {
                "if" => return self.parse_if(),
                "while" => {
                    self.advance();
                    let cond = self.parse_condition()?;
                    let body = Box::new(self.parse_statement()?);
                    return Ok(Stmt::While { cond, body, pos });
                }
                "do" => {
                    self.advance();
                    let body = Box::new(self.parse_statement()?);
                    if !self.eat_keyword("while") {
                        let found = self.describe_current();
                        return self.fail(format!("expected 'while', found {}", found));
                    }
                    let cond = self.parse_condition()?;
                    self.expect_terminator()?;
                    return Ok(Stmt::DoWhile { body, cond, pos });
                }
                "for" => return self.parse_for(),
                "return" => {
                    self.advance();
                    let value = if self.check(";") || self.check("}") || self.at_eof() {
                        None
                    } else {
                        Some(self.parse_expression()?)
                    };
                    self.expect_terminator()?;
                    return Ok(Stmt::Return { value, pos });
                }
                "break" | "continue" => {
                    self.advance();
                    if self.check_identifier() && self.peek().pos.line == pos.line {
                        self.advance();
                        self.expect_terminator()?;
                        return Ok(Stmt::Unsupported { kind: format!("labeled {}", tok.text), pos });
                    }
                    self.expect_terminator()?;
                    return Ok(if tok.text == "break" { Stmt::Break(pos) } else { Stmt::Continue(pos) });
                }
                "goto" if self.dialect.labels => {
                    self.advance();
                    let (label, _) = self.expect_identifier()?;
                    self.expect_terminator()?;
                    return Ok(Stmt::Goto { label, pos });
                }
                "switch" => {
                    self.advance();
                    self.skip_group("(", ")")?;
                    self.skip_group("{", "}")?;
                    return Ok(Stmt::Unsupported { kind: "switch".to_string(), pos });
                }
                "try" => {
                    self.advance();
                    if self.check("(") {
                        self.skip_group("(", ")")?;
                    }
                    self.skip_group("{", "}")?;
                    while self.eat_keyword("catch") || self.eat_keyword("finally") {
                        if self.check("(") {
                            self.skip_group("(", ")")?;
                        }
                        self.skip_group("{", "}")?;
                    }
                    return Ok(Stmt::Unsupported { kind: "exception handling".to_string(), pos });
                }
                "throw" => {
                    self.skip_declaration()?;
                    return Ok(Stmt::Unsupported { kind: "exception handling".to_string(), pos });
                }
                "class" | "struct" | "union" | "enum" | "typedef" | "interface" => {
                    self.skip_declaration()?;
                    return Ok(Stmt::Unsupported { kind: tok.text, pos });
                }
                "var" | "let" | "const" if !self.dialect.typed || tok.text == "var" => {
                    let decl = self.parse_keyword_declaration()?;
                    self.expect_terminator()?;
                    return Ok(Stmt::VarDecl(decl));
                }
                "function" => {
                    self.skip_nested_function()?;
                    return Ok(Stmt::Unsupported { kind: "nested function".to_string(), pos });
                }
                _ => {}
            }
        }

        if self.dialect.labels && tok.kind == TokenKind::Identifier && self.peek_at(1).is_symbol(":") {
            self.advance();
            self.advance();
            let body = if self.check("}") { Stmt::Empty(pos) } else { self.parse_statement()? };
            return Ok(Stmt::Label { name: tok.text, body: Box::new(body), pos });
        }

        if self.looks_like_declaration() {
            let decl = self.parse_typed_declaration()?;
            self.expect_terminator()?;
            return Ok(Stmt::VarDecl(decl));
        }

        let expr = self.parse_expression()?;
        self.expect_terminator()?;
        Ok(Stmt::Expr { expr, pos })
    }

    fn parse_condition(&mut self) -> PResult<Expr> {
        self.expect("(")?;
        let cond = self.parse_expression()?;
        self.expect(")")?;
        Ok(cond)
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let pos = self.advance().pos;
        let cond = self.parse_condition()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat_keyword("else") {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If { cond, then_branch, else_branch, pos })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let pos = self.advance().pos;
        self.expect("(")?;

        // for (let x of xs) / for (x in obj)
        if !self.dialect.typed {
            let has_keyword = matches!(self.peek().text.as_str(), "var" | "let" | "const")
                && self.peek().kind == TokenKind::Keyword;
            let offset = if has_keyword { 1 } else { 0 };
            let name_tok = self.peek_at(offset).clone();
            let sep = self.peek_at(offset + 1).text.clone();
            if name_tok.kind == TokenKind::Identifier && (sep == "of" || sep == "in") {
                let keyword = if has_keyword { Some(self.advance().text) } else { None };
                self.advance();
                self.advance();
                let iterable = self.parse_expression()?;
                self.expect(")")?;
                let body = Box::new(self.parse_statement()?);
                if sep == "in" {
                    return Ok(Stmt::Unsupported { kind: "for-in loop".to_string(), pos });
                }
                return Ok(Stmt::ForEach { keyword, ty: None, name: name_tok.text, iterable, body, pos });
            }
        }

        // for (T x : xs)
        if self.looks_like_declaration() || (self.check_keyword("var") && self.dialect.typed) {
            let saved = self.pos;
            let ty = if self.eat_keyword("var") { None } else { Some(self.parse_type()?) };
            let (name, _) = self.expect_identifier()?;
            if self.eat(":") {
                let iterable = self.parse_expression()?;
                self.expect(")")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::ForEach { keyword: None, ty, name, iterable, body, pos });
            }
            self.pos = saved;
        }

        let init = if self.eat(";") {
            None
        } else if self.looks_like_declaration() {
            let decl = self.parse_typed_declaration()?;
            self.expect(";")?;
            Some(Box::new(Stmt::VarDecl(decl)))
        } else if self.peek().kind == TokenKind::Keyword && matches!(self.peek().text.as_str(), "var" | "let" | "const") {
            let decl = self.parse_keyword_declaration()?;
            self.expect(";")?;
            Some(Box::new(Stmt::VarDecl(decl)))
        } else {
            let init_pos = self.position();
            let mut exprs = vec![self.parse_expression()?];
            while self.eat(",") {
                exprs.push(self.parse_expression()?);
            }
            self.expect(";")?;
            let mut stmts: Vec<Stmt> = exprs.into_iter().map(|expr| Stmt::Expr { pos: expr.pos(), expr }).collect();
            if stmts.len() == 1 {
                stmts.pop().map(Box::new)
            } else {
                Some(Box::new(Stmt::Block(Block { stmts, pos: init_pos })))
            }
        };

        let cond = if self.check(";") { None } else { Some(self.parse_expression()?) };
        self.expect(";")?;

        let mut step = Vec::new();
        if !self.check(")") {
            step.push(self.parse_expression()?);
            while self.eat(",") {
                step.push(self.parse_expression()?);
            }
        }
        self.expect(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For { init, cond, step, body, pos })
    }

    /// `var`/`let`/`const` declarations; the keyword is at the cursor
    pub fn parse_keyword_declaration(&mut self) -> PResult<VarDecl> {
        let tok = self.advance();
        let declarators = self.parse_declarators()?;
        self.node()?;
        Ok(VarDecl { keyword: Some(tok.text), ty: None, declarators, pos: tok.pos })
    }

    /// `Type a = 1, b[3];` up to but not including the terminator
    pub fn parse_typed_declaration(&mut self) -> PResult<VarDecl> {
        let pos = self.position();
        let ty = self.parse_type()?;
        let declarators = self.parse_declarators()?;
        self.node()?;
        Ok(VarDecl { keyword: None, ty: Some(ty), declarators, pos })
    }

    pub fn parse_declarators(&mut self) -> PResult<Vec<Declarator>> {
        let mut declarators = Vec::new();
        loop {
            let (name, pos) = self.expect_identifier()?;
            let mut array_suffix = Vec::new();
            while self.eat("[") {
                if self.eat("]") {
                    array_suffix.push(None);
                } else {
                    array_suffix.push(Some(self.parse_expression()?));
                    self.expect("]")?;
                }
            }

            let init = if self.eat("=") {
                if self.check("{") && self.dialect.typed {
                    let list_pos = self.advance().pos;
                    Some(Init::List(self.parse_arguments("}")?, list_pos))
                } else {
                    Some(Init::Expr(self.parse_expression()?))
                }
            } else if self.dialect.language == Language::Cpp && self.check("(") {
                let ctor_pos = self.advance().pos;
                Some(Init::Ctor(self.parse_arguments(")")?, ctor_pos))
            } else if self.dialect.language == Language::Cpp && self.check("{") {
                let list_pos = self.advance().pos;
                Some(Init::List(self.parse_arguments("}")?, list_pos))
            } else {
                None
            };

            self.node()?;
            declarators.push(Declarator { name, array_suffix, init, pos });
            if !self.eat(",") {
                return Ok(declarators);
            }
        }
    }

    /// Parameter list, body and trailing clauses after a function name
    pub fn parse_function_rest(
        &mut self,
        name: String,
        pos: Position,
        modifiers: Vec<String>,
        return_type: Option<TypeSpec>,
    ) -> PResult<FunctionDecl> {
        self.expect("(")?;
        let params = self.parse_params()?;

        if self.eat_keyword("throws") {
            loop {
                self.expect_identifier()?;
                if !self.eat(",") {
                    break;
                }
            }
        }
        // C++ `int size() const`
        while self.eat_keyword("const") {}

        let body = if self.eat(";") { None } else { Some(self.parse_block()?) };
        self.node()?;
        Ok(FunctionDecl { name, modifiers, return_type, params, body, pos })
    }

    fn parse_params(&mut self) -> PResult<Vec<ParamDecl>> {
        let mut params = Vec::new();
        if self.eat(")") {
            return Ok(params);
        }
        if self.check_keyword("void") && self.peek_at(1).is_symbol(")") {
            self.advance();
            self.advance();
            return Ok(params);
        }
        loop {
            params.push(self.parse_param()?);
            if self.eat(",") {
                continue;
            }
            self.expect(")")?;
            return Ok(params);
        }
    }

    fn parse_param(&mut self) -> PResult<ParamDecl> {
        let pos = self.position();
        if self.check("@") {
            self.skip_annotations()?;
        }
        if self.eat("...") {
            let kind = if self.dialect.typed { "variadic parameter" } else { "rest parameter" };
            let name = if self.check_identifier() { self.advance().text } else { String::new() };
            return Ok(ParamDecl { name, ty: None, unsupported: Some(kind.to_string()), pos });
        }

        if !self.dialect.typed {
            let (name, pos) = self.expect_identifier()?;
            let mut unsupported = None;
            if self.eat("=") {
                self.parse_expression()?;
                unsupported = Some("default parameter".to_string());
            }
            return Ok(ParamDecl { name, ty: None, unsupported, pos });
        }

        let mut ty = self.parse_type()?;
        let mut unsupported = None;
        if self.eat("...") {
            unsupported = Some("variadic parameter".to_string());
        }
        let name = if self.check_identifier() { self.advance().text } else { String::new() };
        while self.eat("[") {
            if !self.check("]") {
                self.parse_expression()?;
            }
            self.expect("]")?;
            ty.array_dims += 1;
        }
        if self.eat("=") {
            self.parse_expression()?;
            unsupported = Some("default parameter".to_string());
        }
        self.node()?;
        Ok(ParamDecl { name, ty: Some(ty), unsupported, pos })
    }

    /// `@Override`, `@SuppressWarnings("x")`
    pub fn skip_annotations(&mut self) -> PResult<()> {
        while self.eat("@") {
            self.expect_identifier()?;
            while self.eat(".") {
                self.expect_identifier()?;
            }
            if self.check("(") {
                self.skip_group("(", ")")?;
            }
        }
        Ok(())
    }

    fn skip_nested_function(&mut self) -> PResult<()> {
        self.advance();
        if self.check_identifier() {
            self.advance();
        }
        self.skip_group("(", ")")?;
        self.skip_group("{", "}")
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Budget;
    use crate::cst::{Init, Stmt};
    use crate::language::Language;
    use crate::lexer;
    use crate::parser::{frontend, Parser};

    fn stmt(src: &str, language: Language) -> Stmt {
        let front = frontend(language);
        let mut budget = Budget::unlimited();
        let lexed = lexer::tokenize(src, front.profile(), &budget).unwrap();
        let mut p = Parser::new(lexed.tokens, front.dialect(), &mut budget, 10);
        p.parse_statement().unwrap()
    }

    #[test]
    fn test_declarations() {
        let Stmt::VarDecl(decl) = stmt("int a = 1, b[5], c[] = {1, 2};", Language::C) else {
            panic!("expected declaration")
        };
        assert_eq!(decl.declarators.len(), 3);
        assert_eq!(decl.declarators[1].array_suffix.len(), 1);
        assert!(matches!(decl.declarators[2].init, Some(Init::List(ref items, _)) if items.len() == 2));

        let Stmt::VarDecl(decl) = stmt("std::vector<int> v(n, 0);", Language::Cpp) else {
            panic!("expected declaration")
        };
        assert_eq!(decl.ty.as_ref().map(|t| t.base.as_str()), Some("std::vector"));
        assert!(matches!(decl.declarators[0].init, Some(Init::Ctor(ref args, _)) if args.len() == 2));

        let Stmt::VarDecl(decl) = stmt("let total = 0", Language::JavaScript) else {
            panic!("expected declaration")
        };
        assert_eq!(decl.keyword.as_deref(), Some("let"));
    }

    #[test]
    fn test_loops() {
        assert!(matches!(
            stmt("for (int i = 0; i < n; i++) sum += i;", Language::Java),
            Stmt::For { init: Some(_), cond: Some(_), .. }
        ));
        assert!(matches!(stmt("for (;;) {}", Language::C), Stmt::For { init: None, cond: None, .. }));
        assert!(matches!(stmt("for (int x : xs) {}", Language::Java), Stmt::ForEach { .. }));
        assert!(matches!(stmt("for (const x of xs) {}", Language::JavaScript), Stmt::ForEach { .. }));
        assert!(matches!(stmt("do { i++; } while (i < 3);", Language::C), Stmt::DoWhile { .. }));
    }

    #[test]
    fn test_goto_and_labels() {
        assert!(matches!(stmt("goto end;", Language::C), Stmt::Goto { .. }));
        assert!(matches!(stmt("end: return 0;", Language::C), Stmt::Label { .. }));
    }

    #[test]
    fn test_expression_statement_is_not_declaration() {
        assert!(matches!(stmt("x = y + 1;", Language::C), Stmt::Expr { .. }));
        assert!(matches!(stmt("a < b;", Language::Cpp), Stmt::Expr { .. }));
        assert!(matches!(stmt("printf(\"%d\", x);", Language::C), Stmt::Expr { .. }));
    }

    #[test]
    fn test_unsupported_statements() {
        let kind = |s: Stmt| match s {
            Stmt::Unsupported { kind, .. } => kind,
            other => panic!("expected unsupported, got {:?}", other),
        };
        assert_eq!(kind(stmt("switch (x) { case 1: break; }", Language::C)), "switch");
        assert_eq!(kind(stmt("try { f(); } catch (Exception e) { }", Language::Java)), "exception handling");
    }
}
