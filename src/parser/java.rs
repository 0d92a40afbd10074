// File: src/parser/java.rs
//
// Java front end. A compilation unit is `package`/`import` lines followed by
// classes; only static methods of top-level classes carry code we convert.
// Members are parsed with their own recovery so one broken method does not
// hide errors in the next.

use super::{Abort, Dialect, Frontend, PResult, Parser};
use crate::cst::{ClassDecl, Item, Stmt};
use crate::language::Language;
use crate::lexer::{LexerProfile, TokenKind};

const KEYWORDS: &[&str] = &[
    "abstract", "boolean", "break", "byte", "case", "catch", "char", "class", "continue", "default", "do", "double",
    "else", "enum", "extends", "final", "finally", "float", "for", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "new", "null", "package", "private", "protected", "public", "return", "short", "static",
    "super", "switch", "this", "throw", "throws", "true", "false", "try", "var", "void", "while", "synchronized",
];

const MODIFIERS: &[&str] = &["public", "private", "protected", "static", "abstract", "synchronized"];

static PROFILE: LexerProfile = LexerProfile {
    keywords: KEYWORDS,
    preprocessor: false,
    single_quote_strings: false,
    template_strings: false,
};

static DIALECT: Dialect = Dialect {
    language: Language::Java,
    typed: true,
    primitive_types: &["int", "long", "short", "byte", "float", "double", "char", "boolean", "void"],
    type_qualifiers: &["final"],
    pointers: false,
    references: false,
    generics: true,
    labels: false,
    optional_semicolons: false,
    lambda_arrow: Some("->"),
};

pub struct JavaFrontend;

impl Frontend for JavaFrontend {
    fn language(&self) -> Language {
        Language::Java
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

        if tok.is_keyword("package") || tok.is_keyword("import") {
            let mut text = p.advance().text;
            while !p.check(";") && !p.at_eof() {
                let part = p.advance().text;
                if part != "." && !text.ends_with('.') {
                    text.push(' ');
                }
                text.push_str(&part);
            }
            p.expect(";")?;
            text.push(';');
            return Ok(Item::Directive { text, pos: tok.pos });
        }

        p.skip_annotations()?;
        let modifiers = parse_modifiers(p);
        if p.check_keyword("class") {
            return Ok(Item::Class(parse_class(p, modifiers)?));
        }
        if p.check_keyword("interface") || p.check_keyword("enum") || (p.check_identifier() && p.peek().text == "record") {
            let kind = p.peek().text.clone();
            p.skip_declaration()?;
            return Ok(Item::Unsupported { kind, pos: tok.pos });
        }
        let found = p.describe_current();
        p.fail(format!("expected class declaration, found {}", found))
    }
}

fn parse_modifiers(p: &mut Parser<'_>) -> Vec<String> {
    let mut modifiers = Vec::new();
    while p.peek().kind == TokenKind::Keyword && MODIFIERS.contains(&p.peek().text.as_str()) {
        modifiers.push(p.advance().text);
    }
    modifiers
}

fn parse_class(p: &mut Parser<'_>, modifiers: Vec<String>) -> PResult<ClassDecl> {
    let pos = p.advance().pos;
    let (name, _) = p.expect_identifier()?;
    if p.check("<") {
        p.skip_group("<", ">")?;
    }
    // extends / implements clauses
    while !p.check("{") && !p.at_eof() {
        p.advance();
    }
    p.expect("{")?;

    let mut members = Vec::new();
    loop {
        if p.eat("}") {
            break;
        }
        if p.at_eof() {
            return p.fail("expected '}', found end of input");
        }
        match parse_member(p, &name) {
            Ok(member) => members.push(member),
            Err(Abort::Syntax) => p.recover_item(),
            Err(abort) => return Err(abort),
        }
    }
    p.node()?;
    Ok(ClassDecl { name, modifiers, members, pos })
}

fn parse_member(p: &mut Parser<'_>, class_name: &str) -> PResult<Item> {
    let pos = p.position();
    p.node()?;
    if p.eat(";") {
        return Ok(Item::Statement(Stmt::Empty(pos)));
    }
    p.skip_annotations()?;
    let mut modifiers = parse_modifiers(p);
    // `final` is a type qualifier for locals but a modifier on members
    while p.check_keyword("final") {
        modifiers.push(p.advance().text);
    }

    if p.check_keyword("class") || p.check_keyword("interface") || p.check_keyword("enum") {
        let kind = format!("nested {}", p.peek().text);
        p.skip_declaration()?;
        return Ok(Item::Unsupported { kind, pos });
    }
    if p.check("{") {
        p.skip_group("{", "}")?;
        return Ok(Item::Unsupported { kind: "initializer block".to_string(), pos });
    }
    if p.check("<") {
        p.skip_group("<", ">")?;
        p.skip_declaration()?;
        return Ok(Item::Unsupported { kind: "generic method".to_string(), pos });
    }
    if p.check_identifier() && p.peek().text == class_name && p.peek_at(1).is_symbol("(") {
        let (name, npos) = p.expect_identifier()?;
        p.parse_function_rest(name, npos, modifiers, None)?;
        return Ok(Item::Unsupported { kind: "constructor".to_string(), pos });
    }

    let start = p.pos;
    let ty = p.parse_type()?;
    let (name, npos) = p.expect_identifier()?;
    if p.check("(") {
        return Ok(Item::Function(p.parse_function_rest(name, npos, modifiers, Some(ty))?));
    }

    p.pos = start;
    let mut decl = p.parse_typed_declaration()?;
    if let Some(ty) = decl.ty.as_mut() {
        ty.qualifiers.extend(modifiers);
    }
    p.expect(";")?;
    Ok(Item::Statement(Stmt::VarDecl(decl)))
}

#[cfg(test)]
mod tests {
    use crate::config::Budget;
    use crate::cst::Item;
    use crate::language::Language;
    use crate::parser::{parse, ParseFailure};

    fn items(src: &str) -> Vec<Item> {
        parse(src, Language::Java, &mut Budget::unlimited(), 25).unwrap().program.items
    }

    #[test]
    fn test_class_with_static_methods() {
        let src = r#"import java.util.Scanner;

public class Main {
    @Override
    public static int factorial(int n) {
        if (n <= 1) return 1;
        return n * factorial(n - 1);
    }

    public static void main(String[] args) {
        System.out.println(factorial(5));
    }
}
"#;
        let items = items(src);
        assert!(matches!(&items[0], Item::Directive { text, .. } if text == "import java.util.Scanner;"));
        let Item::Class(class) = &items[1] else { panic!("expected class") };
        assert_eq!(class.name, "Main");
        assert_eq!(class.members.len(), 2);
        let Item::Function(main) = &class.members[1] else { panic!("expected method") };
        assert_eq!(main.modifiers, vec!["public".to_string(), "static".to_string()]);
        assert_eq!(main.params[0].ty.as_ref().map(|t| t.array_dims), Some(1));
    }

    #[test]
    fn test_member_errors_recover_per_member() {
        let src = "class A {\n  static int f() { return 1 }\n  static int g() { int = 2; return 2; }\n}";
        match parse(src, Language::Java, &mut Budget::unlimited(), 25) {
            Err(ParseFailure::Syntax(errors)) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].position.line, 2);
                assert_eq!(errors[1].position.line, 3);
            }
            other => panic!("expected syntax errors, got {:?}", other),
        }
    }

    #[test]
    fn test_constructors_and_fields() {
        let src = "class Counter {\n  private int count = 0;\n  Counter() { }\n}";
        let items = items(src);
        let Item::Class(class) = &items[0] else { panic!("expected class") };
        assert!(matches!(&class.members[0], Item::Statement(_)));
        assert!(matches!(&class.members[1], Item::Unsupported { kind, .. } if kind == "constructor"));
    }
}
