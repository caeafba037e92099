//! Recursive-descent / Pratt-style parser: tokens → [`bugc_ast::Program`].
//!
//! Grammar (informal; this is the concrete surface syntax SPEC_FULL.md §6.1
//! commits to — spec.md itself only constrains the *AST* this must produce):
//!
//! ```text
//! Program    := "name" IDENT ";" Decl* ("create" Block)? "code" Block
//! Decl       := StructDecl | FunctionDecl | StorageDecl
//! StructDecl := "struct" IDENT "{" (IDENT ":" Type ","?)* "}"
//! FnDecl     := "fn" IDENT "(" (IDENT ":" Type ("," IDENT ":" Type)*)? ")" ("->" Type)? Block
//! StorageDecl:= "storage" IDENT ":" Type "@" NUMBER ";"
//! Block      := "{" Stmt* "}"
//! Stmt       := "let" IDENT "=" Expr ";"
//!             | "if" "(" Expr ")" Block ("else" Block)?
//!             | "for" "(" "let" IDENT "=" Expr ";" Expr ";" Expr "=" Expr ")" Block
//!             | "return" Expr? ";"
//!             | "break" ";"
//!             | Expr ("=" Expr)? ";"
//! ```
//! Expression precedence, low to high: `||`, `&&`, `==`/`!=`, relational,
//! `+`/`-`, `*`/`/`/`%`, `as Type` (postfix-chaining cast), unary `!`/`-`,
//! postfix `.field`/`[index]`/`[lo:hi]`/`(args)`, primary.

use crate::codes;
use crate::lexer::{TokKind, Token};
use bugc_ast::{
    BinOp, Block, Decl, Expr, ExprKind, FunctionDecl, NodeId, Program, SpecialExpr, Span, Stmt, StmtKind, StorageDecl,
    StructDecl, TypeExpr, UnOp,
};
use bugc_diagnostics::{Code, Diagnostic};

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub code: Code,
    pub message: String,
    pub span: Span,
}

impl From<ParseError> for Diagnostic {
    fn from(e: ParseError) -> Self {
        Diagnostic::error(e.code, e.message).with_location(e.span)
    }
}

type PResult<T> = Result<T, ParseError>;

pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    next_id: u32,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Parser { tokens, pos: 0, next_id: 0 }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn cur_span(&self) -> Span {
        self.cur().span
    }

    fn prev_end(&self) -> usize {
        let i = self.pos.saturating_sub(1);
        let t = &self.tokens[i];
        t.span.offset + t.span.length
    }

    fn span_from(&self, start: usize) -> Span {
        let end = self.prev_end().max(start);
        Span { offset: start, length: end - start }
    }

    fn advance(&mut self) -> Token {
        let tok = self.cur().clone();
        if !matches!(tok.kind, TokKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokKind) -> bool {
        &self.cur().kind == kind
    }

    fn eat(&mut self, kind: &TokKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokKind) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("expected {kind}")))
        }
    }

    fn unexpected(&self, what: &str) -> ParseError {
        ParseError {
            code: codes::UNEXPECTED_TOKEN,
            message: format!("{what}, found {}", self.cur().kind),
            span: self.cur_span(),
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        match self.cur().kind.clone() {
            TokKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("expected an identifier")),
        }
    }

    // ---- top level -------------------------------------------------------

    pub fn parse_program(&mut self) -> PResult<Program> {
        self.expect(TokKind::KwName)?;
        let name = self.expect_ident()?;
        self.expect(TokKind::Semi)?;

        let mut decls = Vec::new();
        loop {
            match &self.cur().kind {
                TokKind::KwStruct => decls.push(Decl::Struct(self.parse_struct_decl()?)),
                TokKind::KwFn => decls.push(Decl::Function(self.parse_fn_decl()?)),
                TokKind::KwStorage => decls.push(Decl::Storage(self.parse_storage_decl()?)),
                _ => break,
            }
        }

        let create = if self.eat(&TokKind::KwCreate) { Some(self.parse_block()?) } else { None };

        self.expect(TokKind::KwCode)?;
        let body = self.parse_block()?;

        if !matches!(self.cur().kind, TokKind::Eof) {
            return Err(self.unexpected("expected end of input"));
        }

        Ok(Program { name, decls, create, body, locations: Default::default() })
    }

    fn parse_struct_decl(&mut self) -> PResult<StructDecl> {
        let start = self.cur_span().offset;
        let id = self.fresh_id();
        self.expect(TokKind::KwStruct)?;
        let name = self.expect_ident()?;
        self.expect(TokKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(&TokKind::RBrace) {
            let fname = self.expect_ident()?;
            self.expect(TokKind::Colon)?;
            let fty = self.parse_type()?;
            fields.push((fname, fty));
            if !self.eat(&TokKind::Comma) {
                break;
            }
        }
        self.expect(TokKind::RBrace)?;
        Ok(StructDecl { id, span: Some(self.span_from(start)), name, fields })
    }

    fn parse_fn_decl(&mut self) -> PResult<FunctionDecl> {
        let start = self.cur_span().offset;
        let id = self.fresh_id();
        self.expect(TokKind::KwFn)?;
        let name = self.expect_ident()?;
        self.expect(TokKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokKind::RParen) {
            let pname = self.expect_ident()?;
            self.expect(TokKind::Colon)?;
            let pty = self.parse_type()?;
            params.push((pname, pty));
            if !self.eat(&TokKind::Comma) {
                break;
            }
        }
        self.expect(TokKind::RParen)?;
        let ret = if self.eat(&TokKind::Arrow) { Some(self.parse_type()?) } else { None };
        let body = self.parse_block()?;
        Ok(FunctionDecl { id, span: Some(self.span_from(start)), name, params, ret, body })
    }

    fn parse_storage_decl(&mut self) -> PResult<StorageDecl> {
        let start = self.cur_span().offset;
        let id = self.fresh_id();
        self.expect(TokKind::KwStorage)?;
        let name = self.expect_ident()?;
        self.expect(TokKind::Colon)?;
        let ty = self.parse_type()?;
        self.expect(TokKind::At)?;
        let slot_span = self.cur_span();
        let slot = match self.advance().kind {
            TokKind::Number(n) => {
                let limbs = n.as_limbs();
                if n > alloy_primitives::U256::from(u64::MAX) {
                    return Err(ParseError {
                        code: codes::INVALID_LITERAL,
                        message: "storage slot number is out of range".into(),
                        span: slot_span,
                    });
                }
                limbs[0]
            }
            _ => {
                return Err(ParseError {
                    code: codes::UNEXPECTED_TOKEN,
                    message: "expected a storage slot number".into(),
                    span: slot_span,
                })
            }
        };
        self.expect(TokKind::Semi)?;
        Ok(StorageDecl { id, span: Some(self.span_from(start)), name, ty, slot })
    }

    // ---- types -------------------------------------------------------------

    fn parse_type(&mut self) -> PResult<TypeExpr> {
        let span = self.cur_span();
        let name = self.expect_ident().map_err(|_| ParseError {
            code: codes::INVALID_TYPE,
            message: format!("expected a type, found {}", self.cur().kind),
            span,
        })?;
        match name.as_str() {
            "bool" => Ok(TypeExpr::Bool),
            "address" => Ok(TypeExpr::Address),
            "string" => Ok(TypeExpr::String),
            "bytes" => Ok(TypeExpr::Bytes(None)),
            "array" => {
                self.expect(TokKind::Lt)?;
                let elem = self.parse_type()?;
                let len = if self.eat(&TokKind::Comma) {
                    match self.advance().kind {
                        TokKind::Number(n) => Some(n.as_limbs()[0]),
                        _ => {
                            return Err(ParseError {
                                code: codes::INVALID_TYPE,
                                message: "expected array length".into(),
                                span,
                            })
                        }
                    }
                } else {
                    None
                };
                self.expect(TokKind::Gt)?;
                Ok(TypeExpr::Array(Box::new(elem), len))
            }
            "mapping" => {
                self.expect(TokKind::Lt)?;
                let key = self.parse_type()?;
                self.expect(TokKind::Comma)?;
                let value = self.parse_type()?;
                self.expect(TokKind::Gt)?;
                Ok(TypeExpr::Mapping(Box::new(key), Box::new(value)))
            }
            _ if name.starts_with("bytes") && name[5..].chars().all(|c| c.is_ascii_digit()) && name.len() > 5 => {
                let n: u16 = name[5..].parse().map_err(|_| ParseError {
                    code: codes::INVALID_TYPE,
                    message: format!("invalid bytes width in `{name}`"),
                    span,
                })?;
                Ok(TypeExpr::Bytes(Some(n)))
            }
            _ if name.starts_with("uint") && name[4..].chars().all(|c| c.is_ascii_digit()) && name.len() > 4 => {
                let bits: u16 = name[4..].parse().map_err(|_| ParseError {
                    code: codes::INVALID_TYPE,
                    message: format!("invalid integer width in `{name}`"),
                    span,
                })?;
                Ok(TypeExpr::Uint(bits))
            }
            _ if name.starts_with("int") && name[3..].chars().all(|c| c.is_ascii_digit()) && name.len() > 3 => {
                let bits: u16 = name[3..].parse().map_err(|_| ParseError {
                    code: codes::INVALID_TYPE,
                    message: format!("invalid integer width in `{name}`"),
                    span,
                })?;
                Ok(TypeExpr::Int(bits))
            }
            _ => Ok(TypeExpr::Named(name)),
        }
    }

    // ---- statements ----------------------------------------------------

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect(TokKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokKind::RBrace)?;
        Ok(Block { stmts })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let start = self.cur_span().offset;
        let id = self.fresh_id();
        let kind = match &self.cur().kind {
            TokKind::KwLet => {
                let k = self.parse_let_kind()?;
                self.expect(TokKind::Semi)?;
                k
            }
            TokKind::KwIf => self.parse_if_kind()?,
            TokKind::KwFor => self.parse_for_kind()?,
            TokKind::KwReturn => {
                self.advance();
                let value = if self.check(&TokKind::Semi) { None } else { Some(self.parse_expr()?) };
                self.expect(TokKind::Semi)?;
                StmtKind::Return(value)
            }
            TokKind::KwBreak => {
                self.advance();
                self.expect(TokKind::Semi)?;
                StmtKind::Break
            }
            _ => {
                let expr = self.parse_expr()?;
                let kind = if self.eat(&TokKind::Eq) {
                    let value = self.parse_expr()?;
                    StmtKind::Assign { target: expr, value }
                } else {
                    StmtKind::Expr(expr)
                };
                self.expect(TokKind::Semi)?;
                kind
            }
        };
        Ok(Stmt { id, span: Some(self.span_from(start)), kind })
    }

    fn parse_let_kind(&mut self) -> PResult<StmtKind> {
        self.expect(TokKind::KwLet)?;
        let name = self.expect_ident()?;
        self.expect(TokKind::Eq)?;
        let init = self.parse_expr()?;
        Ok(StmtKind::Let { name, init })
    }

    fn parse_if_kind(&mut self) -> PResult<StmtKind> {
        self.expect(TokKind::KwIf)?;
        self.expect(TokKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokKind::RParen)?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.eat(&TokKind::KwElse) {
            if self.check(&TokKind::KwIf) {
                // `else if` desugars to a one-statement block, so the AST
                // stays a plain `Option<Block>` (no dedicated elseif node).
                let start = self.cur_span().offset;
                let id = self.fresh_id();
                let kind = self.parse_if_kind()?;
                Some(Block { stmts: vec![Stmt { id, span: Some(self.span_from(start)), kind }] })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(StmtKind::If { cond, then_branch, else_branch })
    }

    fn parse_for_kind(&mut self) -> PResult<StmtKind> {
        self.expect(TokKind::KwFor)?;
        self.expect(TokKind::LParen)?;

        let init_start = self.cur_span().offset;
        let init_id = self.fresh_id();
        let init_kind = self.parse_let_kind()?;
        let init = Box::new(Stmt { id: init_id, span: Some(self.span_from(init_start)), kind: init_kind });
        self.expect(TokKind::Semi)?;

        let cond = self.parse_expr()?;
        self.expect(TokKind::Semi)?;

        let update_start = self.cur_span().offset;
        let update_id = self.fresh_id();
        let target = self.parse_expr()?;
        self.expect(TokKind::Eq)?;
        let value = self.parse_expr()?;
        let update = Box::new(Stmt {
            id: update_id,
            span: Some(self.span_from(update_start)),
            kind: StmtKind::Assign { target, value },
        });

        self.expect(TokKind::RParen)?;
        let body = self.parse_block()?;
        Ok(StmtKind::For { init, cond, update, body })
    }

    // ---- expressions (Pratt-style, level by level) ----------------------

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.check(&TokKind::OrOr) {
            let start = lhs.span.map(|s| s.offset).unwrap_or(0);
            self.advance();
            let rhs = self.parse_and()?;
            let id = self.fresh_id();
            lhs = Expr { id, span: Some(self.span_from(start)), kind: ExprKind::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs)) };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.check(&TokKind::AndAnd) {
            let start = lhs.span.map(|s| s.offset).unwrap_or(0);
            self.advance();
            let rhs = self.parse_equality()?;
            let id = self.fresh_id();
            lhs = Expr { id, span: Some(self.span_from(start)), kind: ExprKind::Binary(BinOp::And, Box::new(lhs), Box::new(rhs)) };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.cur().kind {
                TokKind::EqEq => BinOp::Eq,
                TokKind::NotEq => BinOp::Ne,
                _ => break,
            };
            let start = lhs.span.map(|s| s.offset).unwrap_or(0);
            self.advance();
            let rhs = self.parse_relational()?;
            let id = self.fresh_id();
            lhs = Expr { id, span: Some(self.span_from(start)), kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)) };
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.cur().kind {
                TokKind::Lt => BinOp::Lt,
                TokKind::Le => BinOp::Le,
                TokKind::Gt => BinOp::Gt,
                TokKind::Ge => BinOp::Ge,
                _ => break,
            };
            let start = lhs.span.map(|s| s.offset).unwrap_or(0);
            self.advance();
            let rhs = self.parse_additive()?;
            let id = self.fresh_id();
            lhs = Expr { id, span: Some(self.span_from(start)), kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)) };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.cur().kind {
                TokKind::Plus => BinOp::Add,
                TokKind::Minus => BinOp::Sub,
                _ => break,
            };
            let start = lhs.span.map(|s| s.offset).unwrap_or(0);
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let id = self.fresh_id();
            lhs = Expr { id, span: Some(self.span_from(start)), kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)) };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_cast()?;
        loop {
            let op = match self.cur().kind {
                TokKind::Star => BinOp::Mul,
                TokKind::Slash => BinOp::Div,
                TokKind::Percent => BinOp::Mod,
                _ => break,
            };
            let start = lhs.span.map(|s| s.offset).unwrap_or(0);
            self.advance();
            let rhs = self.parse_cast()?;
            let id = self.fresh_id();
            lhs = Expr { id, span: Some(self.span_from(start)), kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)) };
        }
        Ok(lhs)
    }

    fn parse_cast(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while self.check(&TokKind::KwAs) {
            let start = lhs.span.map(|s| s.offset).unwrap_or(0);
            self.advance();
            let ty = self.parse_type()?;
            let id = self.fresh_id();
            lhs = Expr { id, span: Some(self.span_from(start)), kind: ExprKind::Cast(Box::new(lhs), ty) };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.cur_span().offset;
        let op = match self.cur().kind {
            TokKind::Bang => Some(UnOp::Not),
            TokKind::Minus => Some(UnOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let id = self.fresh_id();
            let operand = self.parse_unary()?;
            return Ok(Expr { id, span: Some(self.span_from(start)), kind: ExprKind::Unary(op, Box::new(operand)) });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let start = self.cur_span().offset;
        let mut expr = self.parse_primary()?;
        loop {
            match self.cur().kind {
                TokKind::Dot => {
                    self.advance();
                    let field = self.expect_ident()?;
                    let id = self.fresh_id();
                    expr = Expr { id, span: Some(self.span_from(start)), kind: ExprKind::Member(Box::new(expr), field) };
                }
                TokKind::LBracket => {
                    self.advance();
                    let first = self.parse_expr()?;
                    if self.eat(&TokKind::Colon) {
                        let hi = self.parse_expr()?;
                        self.expect(TokKind::RBracket)?;
                        let id = self.fresh_id();
                        expr = Expr {
                            id,
                            span: Some(self.span_from(start)),
                            kind: ExprKind::Slice(Box::new(expr), Box::new(first), Box::new(hi)),
                        };
                    } else {
                        self.expect(TokKind::RBracket)?;
                        let id = self.fresh_id();
                        expr = Expr { id, span: Some(self.span_from(start)), kind: ExprKind::Index(Box::new(expr), Box::new(first)) };
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> PResult<Vec<Expr>> {
        self.expect(TokKind::LParen)?;
        let mut args = Vec::new();
        while !self.check(&TokKind::RParen) {
            args.push(self.parse_expr()?);
            if !self.eat(&TokKind::Comma) {
                break;
            }
        }
        self.expect(TokKind::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.cur_span().offset;
        let id = self.fresh_id();
        let kind = match self.cur().kind.clone() {
            TokKind::Number(n) => {
                self.advance();
                ExprKind::Number(n)
            }
            TokKind::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokKind::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokKind::Str(s) => {
                self.advance();
                ExprKind::Str(s)
            }
            TokKind::HexLit(digits) => {
                self.advance();
                hex_literal_kind(&digits, start, self)?
            }
            TokKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokKind::RParen)?;
                return Ok(Expr { id, span: Some(self.span_from(start)), kind: inner.kind });
            }
            TokKind::Ident(name) => {
                self.advance();
                self.parse_ident_primary(name, start)?
            }
            _ => return Err(self.unexpected("expected an expression")),
        };
        Ok(Expr { id, span: Some(self.span_from(start)), kind })
    }

    fn parse_ident_primary(&mut self, name: String, _start: usize) -> PResult<ExprKind> {
        if name == "msg" && self.check(&TokKind::Dot) {
            let save = self.pos;
            self.advance();
            if let TokKind::Ident(field) = self.cur().kind.clone() {
                let special = match field.as_str() {
                    "sender" => Some(SpecialExpr::MsgSender),
                    "value" => Some(SpecialExpr::MsgValue),
                    "data" => Some(SpecialExpr::MsgData),
                    _ => None,
                };
                if let Some(special) = special {
                    self.advance();
                    return Ok(ExprKind::Special(special));
                }
            }
            self.pos = save;
        }
        if name == "block" && self.check(&TokKind::Dot) {
            let save = self.pos;
            self.advance();
            if let TokKind::Ident(field) = self.cur().kind.clone() {
                let special = match field.as_str() {
                    "timestamp" => Some(SpecialExpr::BlockTimestamp),
                    "number" => Some(SpecialExpr::BlockNumber),
                    _ => None,
                };
                if let Some(special) = special {
                    self.advance();
                    return Ok(ExprKind::Special(special));
                }
            }
            self.pos = save;
        }
        if self.check(&TokKind::LParen) {
            let args = self.parse_call_args()?;
            return Ok(ExprKind::Call(name, args));
        }
        Ok(ExprKind::Ident(name))
    }
}

/// Classifies a `0x`-prefixed hex literal per spec.md §4.1: exactly 40 hex
/// digits is a 20-byte address; otherwise it's a bytes literal of length
/// `⌈digits/2⌉` (spec.md §3.2/§4.1 — "hex of N chars → bytes⌈N/2⌉").
fn hex_literal_kind(digits: &str, start: usize, p: &Parser) -> PResult<ExprKind> {
    if digits.len() == 40 {
        let addr_str = format!("0x{digits}");
        let addr: alloy_primitives::Address = addr_str.parse().map_err(|_| ParseError {
            code: codes::INVALID_LITERAL,
            message: format!("invalid address literal `{addr_str}`"),
            span: Span { offset: start, length: digits.len() + 2 },
        })?;
        return Ok(ExprKind::Address(addr));
    }
    let padded = if digits.len() % 2 == 1 { format!("0{digits}") } else { digits.to_string() };
    let mut bytes = Vec::with_capacity(padded.len() / 2);
    let chars: Vec<char> = padded.chars().collect();
    for pair in chars.chunks(2) {
        let byte_str: String = pair.iter().collect();
        let byte = u8::from_str_radix(&byte_str, 16).map_err(|_| ParseError {
            code: codes::INVALID_LITERAL,
            message: format!("invalid hex literal `0x{digits}`"),
            span: Span { offset: start, length: digits.len() + 2 },
        })?;
        bytes.push(byte);
    }
    let _ = p;
    Ok(ExprKind::Hex(bytes))
}
