//! AST node types produced by the BUG parser.
//!
//! This crate defines the input contract the type checker (`bugc-check`) and
//! everything downstream of it consumes. Parsing itself lives in
//! `bugc-parser`; this crate only carries the shape of the tree plus the
//! stable per-node identity used as a map key throughout the pipeline.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use alloy_primitives::{Address, U256};
use std::collections::BTreeMap;

/// Stable identity for an AST node, assigned once by the parser and never
/// reused. Used as the key of the type checker's node→type map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub u32);

/// A byte offset/length pair into the original source text, used for
/// diagnostics. Absent for synthetic nodes introduced by desugaring (there
/// are none yet, but downstream stages must not assume every node has one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

/// A complete parsed program.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Program {
    pub name: String,
    pub decls: Vec<Decl>,
    /// The constructor body, run once at deployment.
    pub create: Option<Block>,
    /// The runtime body.
    pub body: Block,
    /// Source locations, keyed by node identity. The reference parser
    /// inlines spans on every node it builds; this side table exists so a
    /// parser that prefers not to thread `Option<Span>` through every node
    /// still satisfies the §6.1 contract.
    pub locations: BTreeMap<NodeId, Span>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Decl {
    Struct(StructDecl),
    Function(FunctionDecl),
    Storage(StorageDecl),
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StructDecl {
    pub id: NodeId,
    pub span: Option<Span>,
    pub name: String,
    pub fields: Vec<(String, TypeExpr)>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionDecl {
    pub id: NodeId,
    pub span: Option<Span>,
    pub name: String,
    pub params: Vec<(String, TypeExpr)>,
    pub ret: Option<TypeExpr>,
    pub body: Block,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StorageDecl {
    pub id: NodeId,
    pub span: Option<Span>,
    pub name: String,
    pub ty: TypeExpr,
    pub slot: u64,
}

/// An unresolved type as written in source. The checker (C3) resolves these
/// against the struct table into `bugc_types::Type`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TypeExpr {
    Bool,
    Uint(u16),
    Int(u16),
    Address,
    /// `Bytes(Some(n))` is fixed-size `bytesN`; `Bytes(None)` is dynamic.
    Bytes(Option<u16>),
    String,
    Array(Box<TypeExpr>, Option<u64>),
    Mapping(Box<TypeExpr>, Box<TypeExpr>),
    /// A struct referenced by name; resolved during C3 pass 1.
    Named(String),
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stmt {
    pub id: NodeId,
    pub span: Option<Span>,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StmtKind {
    Let {
        name: String,
        init: Expr,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },
    For {
        init: Box<Stmt>,
        cond: Expr,
        update: Box<Stmt>,
        body: Block,
    },
    Return(Option<Expr>),
    Break,
    Expr(Expr),
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Expr {
    pub id: NodeId,
    pub span: Option<Span>,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExprKind {
    Ident(String),
    Number(U256),
    Bool(bool),
    Str(String),
    /// A `0x...` hex literal, byte length already decoded from the literal's
    /// digit count (§4.1: `hex of N chars → bytes⌈N/2⌉ when ≤32`).
    Hex(Vec<u8>),
    Address(Address),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Cast(Box<Expr>, TypeExpr),
    Special(SpecialExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SpecialExpr {
    MsgSender,
    MsgValue,
    MsgData,
    BlockTimestamp,
    BlockNumber,
}

impl Program {
    pub fn span_of(&self, id: NodeId) -> Option<Span> {
        self.locations.get(&id).copied()
    }
}
