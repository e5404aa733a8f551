//! Reader for the C-header subset the native descriptions are written in.
//!
//! Recognized items:
//!
//! ```text
//! #include <opencv/cvaux.h>          // origin of the structures that follow
//! struct ImgObsInfo;                 // opaque structure
//! struct Camera { float x; };        // body skipped, never interpreted
//! typedef struct _IplROI IplROI;     // the typedef name is the native name
//! enum Event { CV_EVENT_MOUSEMOVE = 0, CV_EVENT_FLAG_ALTKEY = 0x20, };
//! ```
//!
//! Other preprocessor directives and comments are ignored. Everything else is
//! a [`Error::MalformedSource`] carrying the line it was found on.

use crate::catalog::{parse_literal, Catalog, CatalogBuilder};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    Number(String),
    Directive(String),
    Punct(char),
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("`{name}`"),
        TokenKind::Number(text) => format!("`{text}`"),
        TokenKind::Directive(text) => format!("`#{text}`"),
        TokenKind::Punct(ch) => format!("`{ch}`"),
        TokenKind::Eof => "end of input".to_string(),
    }
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self { chars: source.chars().peekable(), line: 1, at_line_start: true }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.at_line_start = true;
        } else if !ch.is_whitespace() {
            self.at_line_start = false;
        }
        Some(ch)
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.chars.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some('/') => {
                            while let Some(ch) = self.chars.peek() {
                                if *ch == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => {
                            let start = self.line;
                            // A comment does not end a line for directive purposes.
                            let line_start = self.at_line_start;
                            self.chars.next();
                            self.chars.next();
                            let mut prev = '\0';
                            loop {
                                match self.chars.next() {
                                    Some('/') if prev == '*' => break,
                                    Some(ch) => {
                                        if ch == '\n' {
                                            self.line += 1;
                                        }
                                        prev = ch;
                                    }
                                    None => {
                                        return Err(Error::malformed_at(
                                            start,
                                            "unterminated block comment",
                                        ));
                                    }
                                }
                            }
                            self.at_line_start = line_start;
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;
        let line = self.line;
        let at_line_start = self.at_line_start;
        let Some(&ch) = self.chars.peek() else {
            return Ok(Token { kind: TokenKind::Eof, line });
        };

        let kind = if ch == '#' && at_line_start {
            self.bump();
            let mut text = String::new();
            while let Some(&ch) = self.chars.peek() {
                if ch == '\n' {
                    // `\` before the newline continues the directive.
                    let trimmed = text.trim_end_matches('\r');
                    if !trimmed.ends_with('\\') {
                        break;
                    }
                    let keep = trimmed.len() - 1;
                    text.truncate(keep);
                    text.push(' ');
                    self.bump();
                    self.at_line_start = false;
                    continue;
                }
                text.push(ch);
                self.bump();
            }
            TokenKind::Directive(text.trim().to_string())
        } else if ch == '_' || ch.is_ascii_alphabetic() {
            TokenKind::Ident(self.take_while(|c| c == '_' || c.is_ascii_alphanumeric()))
        } else if ch.is_ascii_digit() {
            TokenKind::Number(self.take_while(|c| c.is_ascii_alphanumeric()))
        } else {
            self.bump();
            TokenKind::Punct(ch)
        };
        Ok(Token { kind, line })
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if !pred(ch) {
                break;
            }
            text.push(ch);
            self.bump();
        }
        text
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    origin: String,
    builder: CatalogBuilder,
}

/// Parse a header description into a validated [`Catalog`].
pub fn parse(source: &str) -> Result<Catalog> {
    let mut lexer = Lexer::new(source);
    let current = lexer.next_token()?;
    let mut parser = Parser { lexer, current, origin: String::new(), builder: CatalogBuilder::new() };
    parser.parse_items()?;
    parser.builder.build()
}

impl<'a> Parser<'a> {
    fn advance(&mut self) -> Result<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::malformed_at(
            self.current.line,
            format!("expected {expected}, found {}", describe(&self.current.kind)),
        )
    }

    fn expect_punct(&mut self, punct: char) -> Result<()> {
        if self.current.kind == TokenKind::Punct(punct) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{punct}`")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        match &self.current.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn eat_punct(&mut self, punct: char) -> Result<bool> {
        if self.current.kind == TokenKind::Punct(punct) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_items(&mut self) -> Result<()> {
        loop {
            match self.current.kind.clone() {
                TokenKind::Eof => return Ok(()),
                TokenKind::Directive(text) => {
                    self.advance()?;
                    self.directive(&text);
                }
                TokenKind::Ident(keyword) if keyword == "struct" => {
                    self.advance()?;
                    self.struct_item()?;
                }
                TokenKind::Ident(keyword) if keyword == "typedef" => {
                    self.advance()?;
                    self.typedef_item()?;
                }
                TokenKind::Ident(keyword) if keyword == "enum" => {
                    self.advance()?;
                    self.enum_item()?;
                }
                // Stray `;` between declarations is harmless.
                TokenKind::Punct(';') => {
                    self.advance()?;
                }
                other => {
                    return Err(Error::malformed_at(
                        self.current.line,
                        format!("unexpected {} outside of a declaration", describe(&other)),
                    ));
                }
            }
        }
    }

    fn directive(&mut self, text: &str) {
        let Some(rest) = text.strip_prefix("include") else {
            return;
        };
        let rest = rest.trim_start();
        let path = match rest.chars().next() {
            Some('<') => rest[1..].split('>').next().unwrap_or_default(),
            Some('"') => rest[1..].split('"').next().unwrap_or_default(),
            _ => rest.split_whitespace().next().unwrap_or_default(),
        };
        let path = path.trim();
        tracing::trace!(origin = path, "entering include origin");
        self.origin = path.to_string();
    }

    /// `struct Name;` or `struct Name { .. };`
    fn struct_item(&mut self) -> Result<()> {
        let name = self.expect_ident("a structure name")?;
        self.skip_body()?;
        self.expect_punct(';')?;
        self.builder.add_type(name, self.origin.clone());
        Ok(())
    }

    /// `typedef struct Tag [{ .. }] Name;`
    fn typedef_item(&mut self) -> Result<()> {
        match &self.current.kind {
            TokenKind::Ident(keyword) if keyword == "struct" => {
                self.advance()?;
            }
            _ => return Err(self.unexpected("`struct` after `typedef`")),
        }
        let tag = match &self.current.kind {
            TokenKind::Ident(tag) => {
                let tag = tag.clone();
                self.advance()?;
                Some(tag)
            }
            _ => None,
        };
        self.skip_body()?;
        let name = match (&self.current.kind, tag) {
            (TokenKind::Ident(name), _) => {
                let name = name.clone();
                self.advance()?;
                name
            }
            (TokenKind::Punct(';'), Some(tag)) => tag,
            _ => return Err(self.unexpected("a typedef name")),
        };
        self.expect_punct(';')?;
        self.builder.add_type(name, self.origin.clone());
        Ok(())
    }

    fn skip_body(&mut self) -> Result<()> {
        if self.current.kind != TokenKind::Punct('{') {
            return Ok(());
        }
        let start = self.current.line;
        let mut depth = 0usize;
        loop {
            let token = self.advance()?;
            match token.kind {
                TokenKind::Punct('{') => depth += 1,
                TokenKind::Punct('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                TokenKind::Eof => {
                    return Err(Error::malformed_at(start, "unterminated structure body"));
                }
                _ => {}
            }
        }
    }

    /// `enum Group { NAME = literal, .. };`
    fn enum_item(&mut self) -> Result<()> {
        let group = match &self.current.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                name
            }
            TokenKind::Punct('{') => {
                return Err(Error::malformed_at(
                    self.current.line,
                    "anonymous enum: constants need an enumeration group name",
                ));
            }
            _ => return Err(self.unexpected("an enumeration group name")),
        };
        self.expect_punct('{')?;

        let mut members = 0usize;
        while !self.eat_punct('}')? {
            let line = self.current.line;
            let name = self.expect_ident("a constant name")?;
            if !self.eat_punct('=')? {
                return Err(Error::malformed_at(
                    line,
                    format!("constant `{name}` in group `{group}` has no explicit value"),
                ));
            }
            let value_line = self.current.line;
            let negative = self.eat_punct('-')?;
            let literal = match &self.current.kind {
                TokenKind::Number(text) => text.clone(),
                other => {
                    return Err(Error::malformed_at(
                        value_line,
                        format!(
                            "value of `{name}` is not an integer literal: found {}",
                            describe(other)
                        ),
                    ));
                }
            };
            self.advance()?;
            let spelled = if negative { format!("-{literal}") } else { literal };
            let (value, radix) = parse_literal(&spelled).ok_or_else(|| {
                Error::malformed_at(
                    value_line,
                    format!("`{spelled}` is not a 64-bit integer literal (constant `{name}`)"),
                )
            })?;
            self.builder.add_constant_with_radix(group.clone(), name, value, radix);
            members += 1;

            if !self.eat_punct(',')? && self.current.kind != TokenKind::Punct('}') {
                return Err(self.unexpected("`,` or `}`"));
            }
        }
        self.expect_punct(';')?;
        tracing::debug!(group = group.as_str(), members, "parsed enumeration group");
        Ok(())
    }
}
