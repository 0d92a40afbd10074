// File: src/parser/javascript.rs
//
// JavaScript front end. A script is a mix of function declarations and
// top-level statements; semicolons are optional where a line break or a
// closing brace ends the statement.

use super::{Dialect, Frontend, PResult, Parser};
use crate::cst::Item;
use crate::language::Language;
use crate::lexer::LexerProfile;

const KEYWORDS: &[&str] = &[
    "function", "var", "let", "const", "if", "else", "while", "for", "do", "return", "break", "continue", "switch",
    "case", "default", "new", "this", "null", "undefined", "true", "false", "class", "in", "typeof", "instanceof",
    "try", "catch", "finally", "throw", "delete", "void", "await", "async", "import", "export", "yield",
];

static PROFILE: LexerProfile = LexerProfile {
    keywords: KEYWORDS,
    preprocessor: false,
    single_quote_strings: true,
    template_strings: true,
};

static DIALECT: Dialect = Dialect {
    language: Language::JavaScript,
    typed: false,
    primitive_types: &[],
    type_qualifiers: &[],
    pointers: false,
    references: false,
    generics: false,
    labels: false,
    optional_semicolons: true,
    lambda_arrow: Some("=>"),
};

pub struct JavaScriptFrontend;

impl Frontend for JavaScriptFrontend {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn profile(&self) -> &'static LexerProfile {
        &PROFILE
    }

    fn dialect(&self) -> &'static Dialect {
        &DIALECT
    }

    fn parse_item(&self, p: &mut Parser<'_>) -> PResult<Item> {
        let tok = p.peek().clone();
        p.node()?;

        if tok.is_keyword("export") {
            p.advance();
            p.eat_keyword("default");
            return self.parse_item(p);
        }
        if tok.is_keyword("import") {
            p.skip_declaration()?;
            return Ok(Item::Unsupported { kind: "module import".to_string(), pos: tok.pos });
        }
        if tok.is_keyword("async") {
            p.advance();
            if p.check_keyword("function") {
                p.advance();
                p.eat("*");
                if p.check_identifier() {
                    p.advance();
                }
                p.skip_group("(", ")")?;
                p.skip_group("{", "}")?;
            }
            return Ok(Item::Unsupported { kind: "async function".to_string(), pos: tok.pos });
        }
        if tok.is_keyword("function") {
            p.advance();
            if p.eat("*") {
                if p.check_identifier() {
                    p.advance();
                }
                p.skip_group("(", ")")?;
                p.skip_group("{", "}")?;
                return Ok(Item::Unsupported { kind: "generator".to_string(), pos: tok.pos });
            }
            let (name, pos) = p.expect_identifier()?;
            return Ok(Item::Function(p.parse_function_rest(name, pos, Vec::new(), None)?));
        }
        if tok.is_keyword("class") {
            p.skip_declaration()?;
            return Ok(Item::Unsupported { kind: "class".to_string(), pos: tok.pos });
        }
        Ok(Item::Statement(p.parse_statement()?))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Budget;
    use crate::cst::{Item, Stmt};
    use crate::language::Language;
    use crate::parser::parse;

    fn items(src: &str) -> Vec<Item> {
        parse(src, Language::JavaScript, &mut Budget::unlimited(), 25).unwrap().program.items
    }

    #[test]
    fn test_script_without_semicolons() {
        let src = "function fib(n) {\n  if (n < 2) return n\n  return fib(n - 1) + fib(n - 2)\n}\n\nconsole.log(fib(10))\n";
        let items = items(src);
        assert_eq!(items.len(), 2);
        let Item::Function(f) = &items[0] else { panic!("expected function") };
        assert_eq!(f.params[0].name, "n");
        assert!(f.return_type.is_none());
        assert!(matches!(&items[1], Item::Statement(Stmt::Expr { .. })));
    }

    #[test]
    fn test_missing_semicolon_on_same_line_is_an_error() {
        let result = parse("let a = 1 let b = 2", Language::JavaScript, &mut Budget::unlimited(), 25);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_and_rest_parameters_are_flagged() {
        let items = items("function f(a, b = 2, ...rest) { return a; }");
        let Item::Function(f) = &items[0] else { panic!("expected function") };
        assert_eq!(f.params[0].unsupported, None);
        assert_eq!(f.params[1].unsupported.as_deref(), Some("default parameter"));
        assert_eq!(f.params[2].unsupported.as_deref(), Some("rest parameter"));
    }

    #[test]
    fn test_single_quoted_and_template_strings() {
        let items = items("const s = 'hi'\nconst t = `there`\n");
        assert_eq!(items.len(), 2);
    }
}
