// File: src/parser/cpp.rs
//
// C++ front end: the C grammar plus `using`, namespaces, templates and
// classes at top level, references and template arguments in types.

use super::c::parse_c_family_item;
use super::{Dialect, Frontend, PResult, Parser};
use crate::cst::Item;
use crate::language::Language;
use crate::lexer::{LexerProfile, TokenKind};

const KEYWORDS: &[&str] = &[
    "int", "long", "short", "float", "double", "char", "void", "bool", "auto", "if", "else", "while", "for", "do",
    "return", "break", "continue", "goto", "switch", "case", "default", "struct", "union", "enum", "typedef",
    "const", "static", "unsigned", "signed", "sizeof", "extern", "register", "volatile", "inline", "true", "false",
    "class", "namespace", "using", "template", "typename", "new", "delete", "public", "private", "protected",
    "virtual", "this", "nullptr", "try", "catch", "throw", "operator", "friend", "constexpr",
];

static PROFILE: LexerProfile = LexerProfile {
    keywords: KEYWORDS,
    preprocessor: true,
    single_quote_strings: false,
    template_strings: false,
};

static DIALECT: Dialect = Dialect {
    language: Language::Cpp,
    typed: true,
    primitive_types: &["int", "long", "short", "float", "double", "char", "void", "bool", "auto"],
    type_qualifiers: &[
        "const", "static", "unsigned", "signed", "extern", "register", "volatile", "inline", "constexpr",
    ],
    pointers: true,
    references: true,
    generics: true,
    labels: true,
    optional_semicolons: false,
    lambda_arrow: None,
};

pub struct CppFrontend;

impl Frontend for CppFrontend {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn profile(&self) -> &'static LexerProfile {
        &PROFILE
    }

    fn dialect(&self) -> &'static Dialect {
        &DIALECT
    }

    fn parse_item(&self, p: &mut Parser<'_>) -> PResult<Item> {
        let tok = p.peek().clone();
        if tok.kind != TokenKind::Keyword {
            return parse_c_family_item(p);
        }
        match tok.text.as_str() {
            "using" => {
                p.advance();
                let mut path = String::new();
                if p.eat_keyword("namespace") {
                    path.push_str("namespace ");
                }
                while !p.check(";") && !p.at_eof() {
                    path.push_str(&p.advance().text);
                }
                p.expect(";")?;
                Ok(Item::Using { path, pos: tok.pos })
            }
            "namespace" => {
                p.advance();
                if p.check_identifier() {
                    p.advance();
                }
                p.skip_group("{", "}")?;
                Ok(Item::Unsupported { kind: "namespace".to_string(), pos: tok.pos })
            }
            "template" => {
                p.advance();
                p.skip_group("<", ">")?;
                // The templated declaration itself
                while !p.check("{") && !p.check(";") && !p.at_eof() {
                    p.advance();
                }
                if p.check("{") {
                    p.skip_group("{", "}")?;
                }
                p.eat(";");
                Ok(Item::Unsupported { kind: "template".to_string(), pos: tok.pos })
            }
            "class" => {
                p.skip_declaration()?;
                Ok(Item::Unsupported { kind: "class".to_string(), pos: tok.pos })
            }
            _ => parse_c_family_item(p),
        }
    }
}
