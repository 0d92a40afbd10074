// File: src/lexer.rs
//
// Shared lexical analyzer for every supported source language.
// Converts source text into a stream of tokens for the front ends.
//
// The four languages share one C-style token grammar; what differs is
// captured in a LexerProfile:
// - the keyword set
// - whether `#` starts a preprocessor directive line (C, C++)
// - whether single quotes delimit strings (JavaScript) or chars
// - whether backtick template strings exist (JavaScript)
//
// Tokens keep their raw source text; literal decoding happens in lowering.
// Lexical errors are collected rather than fatal so the parser can report
// them together with grammar errors.

use crate::config::Budget;
use crate::errors::{Position, ResourceError, SyntaxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Integer,
    Float,
    Char,
    String,
    /// JavaScript backtick string
    Template,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Literal(LiteralKind),
    Operator,
    Punctuation,
    /// A whole preprocessor line such as `#include <stdio.h>`
    Directive,
    Eof,
}

/// A lexical token. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Position,
}

impl Token {
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.is(TokenKind::Keyword, text)
    }

    /// Operator or punctuation with the given spelling
    pub fn is_symbol(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Operator | TokenKind::Punctuation) && self.text == text
    }
}

/// Per-language lexical rules
#[derive(Debug)]
pub struct LexerProfile {
    pub keywords: &'static [&'static str],
    pub preprocessor: bool,
    pub single_quote_strings: bool,
    pub template_strings: bool,
}

impl LexerProfile {
    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(&word)
    }
}

/// Multi-character operators, longest first so maximal munch works
const OPERATORS: &[&str] = &[
    ">>>=", "===", "!==", ">>>", "<<=", ">>=", "...", "::", "->", "=>", "==", "!=", "<=", ">=", "&&", "||",
    "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "+", "-", "*", "/", "%", "=",
    "<", ">", "!", "&", "|", "^", "~", "?", ":", "@",
];

const PUNCTUATION: &[char] = &['(', ')', '{', '}', '[', ']', ';', ',', '.'];

#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub errors: Vec<SyntaxError>,
}

struct Lexer<'a> {
    src: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    profile: &'a LexerProfile,
    out: Lexed,
}

/// Tokenizes source text under the given profile.
///
/// Always ends the stream with an Eof token. Fails only when the token
/// budget is exhausted; malformed input is reported through `Lexed::errors`.
pub fn tokenize(source: &str, profile: &LexerProfile, budget: &Budget) -> Result<Lexed, ResourceError> {
    let mut lexer = Lexer {
        src: source,
        offset: 0,
        line: 1,
        column: 1,
        profile,
        out: Lexed::default(),
    };
    lexer.run(budget)?;
    Ok(lexer.out)
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.offset..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column, self.offset)
    }

    fn push(&mut self, kind: TokenKind, start: Position) {
        let text = self.src[start.offset..self.offset].to_string();
        self.out.tokens.push(Token { kind, text, pos: start });
    }

    fn error(&mut self, message: impl Into<String>, pos: Position) {
        self.out.errors.push(SyntaxError::new(message, pos));
    }

    fn run(&mut self, budget: &Budget) -> Result<(), ResourceError> {
        // Directives are only recognised at the start of a line
        let mut line_start = true;

        while let Some(c) = self.peek() {
            budget.check_tokens(self.out.tokens.len())?;
            let start = self.position();

            match c {
                '\n' => {
                    self.bump();
                    line_start = true;
                    continue;
                }
                c if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                '/' if self.peek_at(1) == Some('/') => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.bump();
                    }
                    continue;
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.bump();
                    self.bump();
                    let mut closed = false;
                    while let Some(ch) = self.bump() {
                        if ch == '*' && self.peek() == Some('/') {
                            self.bump();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        self.error("unterminated block comment", start);
                    }
                    continue;
                }
                '#' if self.profile.preprocessor && line_start => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.bump();
                    }
                    self.push(TokenKind::Directive, start);
                }
                '"' => self.lex_quoted('"', LiteralKind::String, start),
                '\'' if self.profile.single_quote_strings => self.lex_quoted('\'', LiteralKind::String, start),
                '\'' => self.lex_quoted('\'', LiteralKind::Char, start),
                '`' if self.profile.template_strings => self.lex_quoted('`', LiteralKind::Template, start),
                c if c.is_ascii_digit() => self.lex_number(start),
                '.' if self.peek_at(1).map_or(false, |d| d.is_ascii_digit()) => self.lex_number(start),
                c if c.is_alphabetic() || c == '_' || c == '$' => {
                    while let Some(ch) = self.peek() {
                        if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    let word = &self.src[start.offset..self.offset];
                    let kind = if self.profile.is_keyword(word) {
                        TokenKind::Keyword
                    } else {
                        TokenKind::Identifier
                    };
                    self.push(kind, start);
                }
                c if PUNCTUATION.contains(&c) && !(c == '.' && self.src[self.offset..].starts_with("...")) => {
                    self.bump();
                    self.push(TokenKind::Punctuation, start);
                }
                _ => {
                    let rest = &self.src[self.offset..];
                    match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
                        Some(op) => {
                            for _ in 0..op.chars().count() {
                                self.bump();
                            }
                            self.push(TokenKind::Operator, start);
                        }
                        None => {
                            self.bump();
                            self.error(format!("unexpected character '{}'", c), start);
                        }
                    }
                }
            }
            line_start = false;
        }

        self.out.tokens.push(Token { kind: TokenKind::Eof, text: String::new(), pos: self.position() });
        Ok(())
    }

    fn lex_quoted(&mut self, quote: char, kind: LiteralKind, start: Position) {
        self.bump(); // opening quote
        loop {
            match self.peek() {
                None => {
                    self.error("unterminated literal", start);
                    break;
                }
                Some('\n') if kind != LiteralKind::Template => {
                    self.error("unterminated literal", start);
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some(ch) if ch == quote => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        self.push(TokenKind::Literal(kind), start);
    }

    fn lex_number(&mut self, start: Position) {
        let mut is_float = false;

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            while self.peek().map_or(false, |c| c.is_ascii_hexdigit() || c == '_') {
                self.bump();
            }
        } else {
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == '_' {
                    self.bump();
                } else if c == '.' && !is_float && self.peek_at(1) != Some('.') {
                    is_float = true;
                    self.bump();
                } else if (c == 'e' || c == 'E')
                    && (self.peek_at(1).map_or(false, |d| d.is_ascii_digit())
                        || (matches!(self.peek_at(1), Some('+') | Some('-'))
                            && self.peek_at(2).map_or(false, |d| d.is_ascii_digit())))
                {
                    is_float = true;
                    self.bump();
                    self.bump();
                } else {
                    break;
                }
            }
        }

        // Type suffixes: 10L, 10UL, 1.5f, 2.0d
        while let Some(c) = self.peek() {
            match c {
                'l' | 'L' | 'u' | 'U' => {
                    self.bump();
                }
                'f' | 'F' | 'd' | 'D' => {
                    is_float = true;
                    self.bump();
                }
                _ => break,
            }
        }

        if self.peek().map_or(false, |c| c.is_alphanumeric() || c == '_') {
            while self.peek().map_or(false, |c| c.is_alphanumeric() || c == '_') {
                self.bump();
            }
            self.error(format!("invalid numeric literal '{}'", &self.src[start.offset..self.offset]), start);
        }

        let kind = if is_float { LiteralKind::Float } else { LiteralKind::Integer };
        self.push(TokenKind::Literal(kind), start);
    }
}

/// Decodes the body of a quoted literal (quotes included in `raw`)
pub fn decode_quoted(raw: &str) -> Result<String, String> {
    let mut chars = raw.chars();
    let quote = chars.next().ok_or_else(|| "empty literal".to_string())?;
    let body: Vec<char> = chars.collect();
    let body = match body.split_last() {
        Some((last, rest)) if *last == quote => rest,
        _ => return Err("unterminated literal".to_string()),
    };

    let mut out = String::new();
    let mut iter = body.iter().copied();
    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('`') => out.push('`'),
            Some(other) => return Err(format!("unknown escape sequence '\\{}'", other)),
            None => return Err("dangling escape".to_string()),
        }
    }
    Ok(out)
}

/// Escape a string for a double-quoted literal in any of the C-syntax targets
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out
}

/// Escape a char for a single-quoted literal
pub fn escape_char(c: char) -> String {
    match c {
        '\'' => "\\'".to_string(),
        '"' => "\"".to_string(),
        other => escape_string(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: LexerProfile = LexerProfile {
        keywords: &["int", "return", "if"],
        preprocessor: true,
        single_quote_strings: false,
        template_strings: false,
    };

    fn lex(src: &str) -> Lexed {
        tokenize(src, &PROFILE, &Budget::unlimited()).unwrap()
    }

    fn kinds(src: &str) -> Vec<(TokenKind, String)> {
        lex(src).tokens.into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn test_keywords_identifiers_and_operators() {
        let toks = kinds("int x = a<=b;");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Keyword, "int".to_string()),
                (TokenKind::Identifier, "x".to_string()),
                (TokenKind::Operator, "=".to_string()),
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::Operator, "<=".to_string()),
                (TokenKind::Identifier, "b".to_string()),
                (TokenKind::Punctuation, ";".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn test_positions_track_lines_and_offsets() {
        let lexed = lex("int a;\n  return a;");
        let ret = &lexed.tokens[3];
        assert_eq!(ret.text, "return");
        assert_eq!(ret.pos, Position::new(2, 3, 9));
    }

    #[test]
    fn test_directive_and_comments() {
        let toks = kinds("#include <stdio.h>\n// line\n/* block */ int");
        assert_eq!(toks[0], (TokenKind::Directive, "#include <stdio.h>".to_string()));
        assert_eq!(toks[1], (TokenKind::Keyword, "int".to_string()));
    }

    #[test]
    fn test_number_shapes() {
        let toks = kinds("10 10L 3.5 2.0f 1e9 0xFF");
        let expected = [
            LiteralKind::Integer,
            LiteralKind::Integer,
            LiteralKind::Float,
            LiteralKind::Float,
            LiteralKind::Float,
            LiteralKind::Integer,
        ];
        for (tok, kind) in toks.iter().zip(expected) {
            assert_eq!(tok.0, TokenKind::Literal(kind), "token {}", tok.1);
        }
    }

    #[test]
    fn test_lexical_errors_are_collected() {
        let lexed = lex("int ` x = \"open\n;");
        assert_eq!(lexed.errors.len(), 2);
        assert_eq!(lexed.errors[0].position, Position::new(1, 5, 4));
        assert!(lexed.errors[1].message.contains("unterminated"));
        assert_eq!(lexed.tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_decode_and_escape() {
        assert_eq!(decode_quoted(r#""a\n\"b\"""#).unwrap(), "a\n\"b\"");
        assert_eq!(decode_quoted("'x'").unwrap(), "x");
        assert!(decode_quoted(r#""bad\q""#).is_err());
        assert_eq!(escape_string("say \"hi\"\n"), "say \\\"hi\\\"\\n");
    }

    #[test]
    fn test_token_budget_is_enforced() {
        let config = crate::config::EngineConfig { max_tokens: 3, ..Default::default() };
        let result = tokenize("a b c d e", &PROFILE, &config.budget());
        assert_eq!(result.unwrap_err(), ResourceError::Tokens { limit: 3 });
    }
}
