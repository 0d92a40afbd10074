// File: src/parser/c.rs
//
// C front end. Top level is a sequence of preprocessor lines, function
// definitions or prototypes, and global declarations. Aggregate types
// (struct, union, enum, typedef) are recognised and skipped so lowering can
// name them as unsupported.

use super::{Dialect, Frontend, PResult, Parser};
use crate::cst::{Item, Stmt};
use crate::language::Language;
use crate::lexer::{LexerProfile, TokenKind};

const KEYWORDS: &[&str] = &[
    "int", "long", "short", "float", "double", "char", "void", "bool", "_Bool", "if", "else", "while", "for", "do",
    "return", "break", "continue", "goto", "switch", "case", "default", "struct", "union", "enum", "typedef",
    "const", "static", "unsigned", "signed", "sizeof", "extern", "register", "volatile", "inline", "true", "false",
];

static PROFILE: LexerProfile = LexerProfile {
    keywords: KEYWORDS,
    preprocessor: true,
    single_quote_strings: false,
    template_strings: false,
};

static DIALECT: Dialect = Dialect {
    language: Language::C,
    typed: true,
    primitive_types: &["int", "long", "short", "float", "double", "char", "void", "bool", "_Bool"],
    type_qualifiers: &["const", "static", "unsigned", "signed", "extern", "register", "volatile", "inline"],
    pointers: true,
    references: false,
    generics: false,
    labels: true,
    optional_semicolons: false,
    lambda_arrow: None,
};

pub struct CFrontend;

impl Frontend for CFrontend {
    fn language(&self) -> Language {
        Language::C
    }

    fn profile(&self) -> &'static LexerProfile {
        &PROFILE
    }

    fn dialect(&self) -> &'static Dialect {
        &DIALECT
    }

    fn parse_item(&self, p: &mut Parser<'_>) -> PResult<Item> {
        parse_c_family_item(p)
    }
}

/// Top-level item shared by C and C++
pub(super) fn parse_c_family_item(p: &mut Parser<'_>) -> PResult<Item> {
    let tok = p.peek().clone();
    p.node()?;

    if tok.kind == TokenKind::Directive {
        p.advance();
        return Ok(Item::Directive { text: tok.text, pos: tok.pos });
    }
    if tok.kind == TokenKind::Keyword && matches!(tok.text.as_str(), "typedef" | "struct" | "union" | "enum") {
        p.skip_declaration()?;
        return Ok(Item::Unsupported { kind: tok.text, pos: tok.pos });
    }
    if tok.is_symbol(";") {
        p.advance();
        return Ok(Item::Statement(Stmt::Empty(tok.pos)));
    }
    if !p.looks_like_declaration() {
        let found = p.describe_current();
        return p.fail(format!("expected declaration, found {}", found));
    }

    let start = p.pos;
    let ty = p.parse_type()?;
    let (name, pos) = p.expect_identifier()?;
    if p.check("(") {
        let modifiers = ty.qualifiers.clone();
        return Ok(Item::Function(p.parse_function_rest(name, pos, modifiers, Some(ty))?));
    }

    // Global variable: re-read as an ordinary declaration
    p.pos = start;
    let decl = p.parse_typed_declaration()?;
    p.expect_terminator()?;
    Ok(Item::Statement(Stmt::VarDecl(decl)))
}

#[cfg(test)]
mod tests {
    use crate::config::Budget;
    use crate::cst::{Item, Stmt};
    use crate::language::Language;
    use crate::parser::parse;

    fn items(src: &str) -> Vec<Item> {
        parse(src, Language::C, &mut Budget::unlimited(), 25).unwrap().program.items
    }

    #[test]
    fn test_program_with_includes_and_prototypes() {
        let src = "#include <stdio.h>\n\nint square(int x);\n\nint main(void) {\n    printf(\"%d\\n\", square(4));\n    return 0;\n}\n\nint square(int x) { return x * x; }\n";
        let items = items(src);
        assert_eq!(items.len(), 4);
        assert!(matches!(&items[0], Item::Directive { text, .. } if text == "#include <stdio.h>"));
        assert!(matches!(&items[1], Item::Function(f) if f.body.is_none()));
        assert!(matches!(&items[2], Item::Function(f) if f.name == "main" && f.params.is_empty()));
        assert!(matches!(&items[3], Item::Function(f) if f.body.is_some()));
    }

    #[test]
    fn test_array_parameters_and_globals() {
        let items = items("int total = 0;\nint sum(int a[], int n) { return n; }");
        assert!(matches!(&items[0], Item::Statement(Stmt::VarDecl(_))));
        let Item::Function(f) = &items[1] else { panic!("expected function") };
        assert_eq!(f.params[0].ty.as_ref().map(|t| t.array_dims), Some(1));
    }

    #[test]
    fn test_aggregates_are_skipped() {
        let items = items("typedef struct { int x; } Point;\nstruct Node { int v; };\nint main() { return 0; }");
        assert!(matches!(&items[0], Item::Unsupported { kind, .. } if kind == "typedef"));
        assert!(matches!(&items[1], Item::Unsupported { kind, .. } if kind == "struct"));
        assert!(matches!(&items[2], Item::Function(_)));
    }

    #[test]
    fn test_unsigned_and_long_long() {
        let items = items("unsigned long long big(unsigned n) { return n; }");
        let Item::Function(f) = &items[0] else { panic!("expected function") };
        assert_eq!(f.return_type.as_ref().map(|t| t.base.as_str()), Some("long long"));
        assert_eq!(f.params[0].ty.as_ref().map(|t| t.base.as_str()), Some("int"));
    }
}
