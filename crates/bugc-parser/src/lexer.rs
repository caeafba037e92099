//! Hand-written lexer: source text → a flat token stream with byte spans.
//!
//! No external lexer-generator dependency, matching the teacher's preference
//! for direct control flow (spec.md §9, SPEC_FULL.md §6.1) over macro-heavy
//! machinery.

use alloy_primitives::U256;
use bugc_ast::Span;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokKind {
    Ident(String),
    Number(U256),
    /// Raw lowercase hex digits (no `0x` prefix, no byte-padding applied
    /// yet) — the parser decides address-vs-bytes from the digit count.
    HexLit(String),
    Str(String),
    True,
    False,

    KwName,
    KwStorage,
    KwCreate,
    KwCode,
    KwStruct,
    KwFn,
    KwLet,
    KwIf,
    KwElse,
    KwFor,
    KwReturn,
    KwBreak,
    KwAs,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semi,
    Dot,
    At,
    Arrow,

    Eq,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AndAnd,
    OrOr,

    Eof,
}

impl fmt::Display for TokKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokKind::Ident(s) => write!(f, "identifier `{s}`"),
            TokKind::Number(n) => write!(f, "number `{n}`"),
            TokKind::HexLit(h) => write!(f, "hex literal `0x{h}`"),
            TokKind::Str(s) => write!(f, "string \"{s}\""),
            TokKind::True => write!(f, "`true`"),
            TokKind::False => write!(f, "`false`"),
            TokKind::KwName => write!(f, "`name`"),
            TokKind::KwStorage => write!(f, "`storage`"),
            TokKind::KwCreate => write!(f, "`create`"),
            TokKind::KwCode => write!(f, "`code`"),
            TokKind::KwStruct => write!(f, "`struct`"),
            TokKind::KwFn => write!(f, "`fn`"),
            TokKind::KwLet => write!(f, "`let`"),
            TokKind::KwIf => write!(f, "`if`"),
            TokKind::KwElse => write!(f, "`else`"),
            TokKind::KwFor => write!(f, "`for`"),
            TokKind::KwReturn => write!(f, "`return`"),
            TokKind::KwBreak => write!(f, "`break`"),
            TokKind::KwAs => write!(f, "`as`"),
            TokKind::LParen => write!(f, "`(`"),
            TokKind::RParen => write!(f, "`)`"),
            TokKind::LBrace => write!(f, "`{{`"),
            TokKind::RBrace => write!(f, "`}}`"),
            TokKind::LBracket => write!(f, "`[`"),
            TokKind::RBracket => write!(f, "`]`"),
            TokKind::Comma => write!(f, "`,`"),
            TokKind::Colon => write!(f, "`:`"),
            TokKind::Semi => write!(f, "`;`"),
            TokKind::Dot => write!(f, "`.`"),
            TokKind::At => write!(f, "`@`"),
            TokKind::Arrow => write!(f, "`->`"),
            TokKind::Eq => write!(f, "`=`"),
            TokKind::EqEq => write!(f, "`==`"),
            TokKind::NotEq => write!(f, "`!=`"),
            TokKind::Lt => write!(f, "`<`"),
            TokKind::Le => write!(f, "`<=`"),
            TokKind::Gt => write!(f, "`>`"),
            TokKind::Ge => write!(f, "`>=`"),
            TokKind::Plus => write!(f, "`+`"),
            TokKind::Minus => write!(f, "`-`"),
            TokKind::Star => write!(f, "`*`"),
            TokKind::Slash => write!(f, "`/`"),
            TokKind::Percent => write!(f, "`%`"),
            TokKind::Bang => write!(f, "`!`"),
            TokKind::AndAnd => write!(f, "`&&`"),
            TokKind::OrOr => write!(f, "`||`"),
            TokKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokKind,
    pub span: Span,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

fn keyword(ident: &str) -> Option<TokKind> {
    Some(match ident {
        "name" => TokKind::KwName,
        "storage" => TokKind::KwStorage,
        "create" => TokKind::KwCreate,
        "code" => TokKind::KwCode,
        "struct" => TokKind::KwStruct,
        "fn" => TokKind::KwFn,
        "let" => TokKind::KwLet,
        "if" => TokKind::KwIf,
        "else" => TokKind::KwElse,
        "for" => TokKind::KwFor,
        "return" => TokKind::KwReturn,
        "break" => TokKind::KwBreak,
        "as" => TokKind::KwAs,
        "true" => TokKind::True,
        "false" => TokKind::False,
        _ => return None,
    })
}

pub struct Lexer<'s> {
    src: &'s str,
    chars: Peekable<CharIndices<'s>>,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Lexer { src, chars: src.char_indices().peekable() }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span { offset: start, length: end - start }
    }

    /// Tokenizes the whole input, skipping whitespace and `//` line comments.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            let Some((start, c)) = self.bump() else {
                out.push(Token { kind: TokKind::Eof, span: self.span(self.src.len(), self.src.len()) });
                break;
            };
            let kind = match c {
                '(' => TokKind::LParen,
                ')' => TokKind::RParen,
                '{' => TokKind::LBrace,
                '}' => TokKind::RBrace,
                '[' => TokKind::LBracket,
                ']' => TokKind::RBracket,
                ',' => TokKind::Comma,
                ':' => TokKind::Colon,
                ';' => TokKind::Semi,
                '.' => TokKind::Dot,
                '@' => TokKind::At,
                '+' => TokKind::Plus,
                '-' => {
                    if self.peek_char() == Some('>') {
                        self.bump();
                        TokKind::Arrow
                    } else {
                        TokKind::Minus
                    }
                }
                '*' => TokKind::Star,
                '/' => TokKind::Slash,
                '%' => TokKind::Percent,
                '=' => {
                    if self.peek_char() == Some('=') {
                        self.bump();
                        TokKind::EqEq
                    } else {
                        TokKind::Eq
                    }
                }
                '!' => {
                    if self.peek_char() == Some('=') {
                        self.bump();
                        TokKind::NotEq
                    } else {
                        TokKind::Bang
                    }
                }
                '<' => {
                    if self.peek_char() == Some('=') {
                        self.bump();
                        TokKind::Le
                    } else {
                        TokKind::Lt
                    }
                }
                '>' => {
                    if self.peek_char() == Some('=') {
                        self.bump();
                        TokKind::Ge
                    } else {
                        TokKind::Gt
                    }
                }
                '&' => {
                    if self.peek_char() == Some('&') {
                        self.bump();
                        TokKind::AndAnd
                    } else {
                        return Err(LexError { message: "expected `&&`".into(), span: self.span(start, start + 1) });
                    }
                }
                '|' => {
                    if self.peek_char() == Some('|') {
                        self.bump();
                        TokKind::OrOr
                    } else {
                        return Err(LexError { message: "expected `||`".into(), span: self.span(start, start + 1) });
                    }
                }
                '"' => {
                    let mut s = String::new();
                    loop {
                        match self.bump() {
                            Some((_, '"')) => break,
                            Some((_, '\\')) => match self.bump() {
                                Some((_, 'n')) => s.push('\n'),
                                Some((_, 't')) => s.push('\t'),
                                Some((_, other)) => s.push(other),
                                None => return Err(LexError { message: "unterminated string literal".into(), span: self.span(start, self.src.len()) }),
                            },
                            Some((_, ch)) => s.push(ch),
                            None => return Err(LexError { message: "unterminated string literal".into(), span: self.span(start, self.src.len()) }),
                        }
                    }
                    TokKind::Str(s)
                }
                '0' if self.peek_char() == Some('x') || self.peek_char() == Some('X') => {
                    self.bump();
                    let digits_start = start + 2;
                    let mut end = digits_start;
                    while let Some(c) = self.peek_char() {
                        if c.is_ascii_hexdigit() {
                            end += c.len_utf8();
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    if end == digits_start {
                        return Err(LexError { message: "empty hex literal".into(), span: self.span(start, end) });
                    }
                    TokKind::HexLit(self.src[digits_start..end].to_ascii_lowercase())
                }
                c if c.is_ascii_digit() => {
                    let mut end = start + c.len_utf8();
                    while let Some(c) = self.peek_char() {
                        if c.is_ascii_digit() || c == '_' {
                            end += c.len_utf8();
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    let text: String = self.src[start..end].chars().filter(|c| *c != '_').collect();
                    let n = U256::from_str_radix(&text, 10)
                        .map_err(|_| LexError { message: format!("invalid number literal `{text}`"), span: self.span(start, end) })?;
                    TokKind::Number(n)
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut end = start + c.len_utf8();
                    while let Some(c) = self.peek_char() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            end += c.len_utf8();
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    let text = &self.src[start..end];
                    keyword(text).unwrap_or_else(|| TokKind::Ident(text.to_string()))
                }
                other => {
                    return Err(LexError { message: format!("unexpected character `{other}`"), span: self.span(start, start + other.len_utf8()) });
                }
            };
            let end = self.chars.peek().map(|(i, _)| *i).unwrap_or(self.src.len());
            let actual_start = start;
            let actual_end = if matches!(kind, TokKind::Str(_)) {
                end
            } else {
                end.max(actual_start + 1)
            };
            out.push(Token { kind, span: self.span(actual_start, actual_end) });
        }
        Ok(out)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if matches!(lookahead.peek(), Some((_, '/'))) {
                        while !matches!(self.peek_char(), Some('\n') | None) {
                            self.bump();
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }
}
