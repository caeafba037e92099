//! Component C4: the typed SSA IR that the EVM code generator consumes.
//!
//! Graphs (block→predecessors, phi→predecessor) are represented by label
//! indirection into maps, never by pointers — blocks own their instructions,
//! functions own their blocks, modules own their functions (spec.md §9).

use alloy_primitives::{Address, U256};
use bugc_types::Type;
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An SSA temporary's identity. Defined exactly once (enforced by the IR
/// generator and checked by `bugc-analysis`'s verifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TempId(pub u32);

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%t{}", self.0)
    }
}

/// A mutable, addressable memory-region local (a `let` binding or function
/// parameter). Unlike a `Temp`, a `Local` may be written more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalId(pub u32);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%l{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockLabel(pub u32);

impl fmt::Display for BlockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstValue {
    Uint(U256),
    Bool(bool),
    Bytes(Vec<u8>),
    Address(Address),
    Str(String),
}

/// An IR value: something an instruction can read. Values other than
/// `Const` are produced by exactly one earlier instruction (`Temp`) or
/// denote an addressable local (`Local`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Const(ConstValue, Type),
    Temp(TempId, Type),
    Local(LocalId, Type),
    /// The implicit calldata buffer backing `msg.data`. Not a loadable
    /// value in the usual sense — only `length`/`slice` instructions may
    /// take it as an operand; codegen lowers those specially to
    /// `CALLDATASIZE`/`CALLDATACOPY` rather than `MLOAD`.
    CallData,
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Const(_, ty) => ty.clone(),
            Value::Temp(_, ty) => ty.clone(),
            Value::Local(_, ty) => ty.clone(),
            Value::CallData => Type::Bytes(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOp {
    MsgSender,
    MsgValue,
    BlockTimestamp,
    BlockNumber,
}

/// A single SSA instruction. Every variant with a `dest` defines exactly one
/// new `Temp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Const {
        dest: TempId,
        value: ConstValue,
        ty: Type,
    },
    Binary {
        dest: TempId,
        op: BinOp,
        left: Value,
        right: Value,
    },
    Unary {
        dest: TempId,
        op: UnOp,
        operand: Value,
    },
    LoadLocal {
        dest: TempId,
        local: LocalId,
    },
    StoreLocal {
        local: LocalId,
        value: Value,
    },
    /// `slot` is itself a `Value` rather than a bare `u64` so that both a
    /// top-level storage variable (`Value::Const` of its declared slot) and
    /// a slot reached through a chain of `compute_slot`/`compute_array_slot`/
    /// `compute_field_offset`/`compute_index_slot` (a `Value::Temp`) load
    /// and store through the same two instructions.
    LoadStorage {
        dest: TempId,
        slot: Value,
        ty: Type,
    },
    StoreStorage {
        slot: Value,
        value: Value,
    },
    LoadIndex {
        dest: TempId,
        base: Value,
        index: Value,
        ty: Type,
    },
    StoreIndex {
        base: Value,
        index: Value,
        value: Value,
    },
    LoadField {
        dest: TempId,
        base: Value,
        field_index: usize,
        ty: Type,
    },
    StoreField {
        base: Value,
        field_index: usize,
        value: Value,
    },
    /// `keccak256(key ∥ base)`, used for mapping value slots.
    ComputeSlot {
        dest: TempId,
        base: Value,
        key: Value,
        key_ty: Type,
    },
    /// `keccak256(base)`, used for a dynamic array's element base.
    ComputeArraySlot {
        dest: TempId,
        base: Value,
    },
    /// `base + field_index`, used for struct field storage slots.
    ComputeFieldOffset {
        dest: TempId,
        base: Value,
        field_index: usize,
    },
    /// `base + index`, used for fixed-size storage array element slots and
    /// for the final offset into a dynamic array's hashed element base.
    /// Unlike `ComputeFieldOffset`, `index` is a runtime `Value` rather than
    /// a compile-time constant.
    ComputeIndexSlot {
        dest: TempId,
        base: Value,
        index: Value,
    },
    /// `base + field_index * 32`, the memory address of a struct field
    /// nested inside a local composite. Distinct from `ComputeFieldOffset`
    /// (word-granularity, storage only): this is byte-granularity and
    /// always addresses memory. Used for the non-leaf steps of a chain like
    /// `a.b.c` where `b` is itself a struct — the leaf step loads/stores
    /// through `LoadField`/`StoreField` directly.
    FieldAddr {
        dest: TempId,
        base: Value,
        field_index: usize,
    },
    /// `base + index * 32`, the memory address of an array element nested
    /// inside a local composite. Memory counterpart of `FieldAddr` for
    /// `Index` steps in a chain.
    IndexAddr {
        dest: TempId,
        base: Value,
        index: Value,
    },
    Cast {
        dest: TempId,
        value: Value,
        ty: Type,
    },
    Hash {
        dest: TempId,
        value: Value,
    },
    Length {
        dest: TempId,
        value: Value,
    },
    Slice {
        dest: TempId,
        value: Value,
        lo: Value,
        hi: Value,
    },
    Env {
        dest: TempId,
        op: EnvOp,
    },
    Call {
        dest: Option<TempId>,
        name: String,
        args: Vec<Value>,
        ty: Option<Type>,
    },
}

impl Instr {
    /// The temporary this instruction defines, if any.
    pub fn dest(&self) -> Option<TempId> {
        match self {
            Instr::Const { dest, .. }
            | Instr::Binary { dest, .. }
            | Instr::Unary { dest, .. }
            | Instr::LoadLocal { dest, .. }
            | Instr::LoadStorage { dest, .. }
            | Instr::LoadIndex { dest, .. }
            | Instr::LoadField { dest, .. }
            | Instr::ComputeSlot { dest, .. }
            | Instr::ComputeArraySlot { dest, .. }
            | Instr::ComputeFieldOffset { dest, .. }
            | Instr::ComputeIndexSlot { dest, .. }
            | Instr::FieldAddr { dest, .. }
            | Instr::IndexAddr { dest, .. }
            | Instr::Cast { dest, .. }
            | Instr::Hash { dest, .. }
            | Instr::Length { dest, .. }
            | Instr::Slice { dest, .. }
            | Instr::Env { dest, .. } => Some(*dest),
            Instr::Call { dest, .. } => *dest,
            Instr::StoreLocal { .. }
            | Instr::StoreStorage { .. }
            | Instr::StoreIndex { .. }
            | Instr::StoreField { .. } => None,
        }
    }

    /// Every value this instruction reads, for liveness (C7) and memory
    /// planning (C8).
    pub fn uses(&self) -> Vec<&Value> {
        match self {
            Instr::Const { .. } | Instr::Env { .. } => vec![],
            Instr::Binary { left, right, .. } => vec![left, right],
            Instr::Unary { operand, .. } => vec![operand],
            Instr::LoadLocal { .. } => vec![],
            Instr::StoreLocal { value, .. } => vec![value],
            Instr::LoadStorage { slot, .. } => vec![slot],
            Instr::StoreStorage { slot, value } => vec![slot, value],
            Instr::LoadIndex { base, index, .. } => vec![base, index],
            Instr::StoreIndex { base, index, value } => vec![base, index, value],
            Instr::LoadField { base, .. } => vec![base],
            Instr::StoreField { base, value, .. } => vec![base, value],
            Instr::ComputeSlot { base, key, .. } => vec![base, key],
            Instr::ComputeArraySlot { base, .. } => vec![base],
            Instr::ComputeFieldOffset { base, .. } => vec![base],
            Instr::ComputeIndexSlot { base, index, .. } => vec![base, index],
            Instr::FieldAddr { base, .. } => vec![base],
            Instr::IndexAddr { base, index, .. } => vec![base, index],
            Instr::Cast { value, .. } => vec![value],
            Instr::Hash { value, .. } => vec![value],
            Instr::Length { value, .. } => vec![value],
            Instr::Slice { value, lo, hi, .. } => vec![value, lo, hi],
            Instr::Call { args, .. } => args.iter().collect(),
        }
    }

    /// Whether this instruction disturbs the EVM stack in a way that
    /// invalidates short-lived stack-resident values (a call, a hash, or
    /// anything that the memory planner must treat as a boundary per
    /// spec.md §4.5).
    pub fn is_stack_disturbing(&self) -> bool {
        matches!(
            self,
            Instr::Call { .. } | Instr::Hash { .. } | Instr::ComputeSlot { .. } | Instr::ComputeArraySlot { .. }
        )
    }

    /// Mutable access to every `Value` operand, for the SSA-renaming
    /// substitution pass in `bugc-analysis`'s phi insertion (C6).
    pub fn values_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Instr::Const { .. } | Instr::Env { .. } | Instr::LoadLocal { .. } => vec![],
            Instr::LoadStorage { slot, .. } => vec![slot],
            Instr::Binary { left, right, .. } => vec![left, right],
            Instr::Unary { operand, .. } => vec![operand],
            Instr::StoreLocal { value, .. } => vec![value],
            Instr::StoreStorage { slot, value } => vec![slot, value],
            Instr::LoadIndex { base, index, .. } => vec![base, index],
            Instr::StoreIndex { base, index, value } => vec![base, index, value],
            Instr::LoadField { base, .. } => vec![base],
            Instr::StoreField { base, value, .. } => vec![base, value],
            Instr::ComputeSlot { base, key, .. } => vec![base, key],
            Instr::ComputeArraySlot { base, .. } => vec![base],
            Instr::ComputeFieldOffset { base, .. } => vec![base],
            Instr::ComputeIndexSlot { base, index, .. } => vec![base, index],
            Instr::FieldAddr { base, .. } => vec![base],
            Instr::IndexAddr { base, index, .. } => vec![base, index],
            Instr::Cast { value, .. } => vec![value],
            Instr::Hash { value, .. } => vec![value],
            Instr::Length { value, .. } => vec![value],
            Instr::Slice { value, lo, hi, .. } => vec![value, lo, hi],
            Instr::Call { args, .. } => args.iter_mut().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phi {
    pub dest: TempId,
    pub ty: Type,
    /// Keyed and iterated in sorted order by predecessor label (spec.md §5).
    pub sources: BTreeMap<BlockLabel, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Jump(BlockLabel),
    Branch {
        cond: Value,
        if_true: BlockLabel,
        if_false: BlockLabel,
    },
    Return(Option<Value>),
}

impl Terminator {
    /// The blocks control flow may transfer to from here, in a fixed order
    /// (`if_true` before `if_false`) so callers that need determinism don't
    /// have to re-derive it.
    pub fn successors(&self) -> Vec<BlockLabel> {
        match self {
            Terminator::Jump(target) => vec![*target],
            Terminator::Branch { if_true, if_false, .. } => vec![*if_true, *if_false],
            Terminator::Return(_) => vec![],
        }
    }

    pub fn values_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Terminator::Jump(_) => vec![],
            Terminator::Branch { cond, .. } => vec![cond],
            Terminator::Return(value) => value.iter_mut().collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub label: BlockLabel,
    pub phis: Vec<Phi>,
    pub instrs: Vec<Instr>,
    pub terminator: Option<Terminator>,
    pub preds: BTreeSet<BlockLabel>,
}

impl Block {
    pub fn new(label: BlockLabel) -> Self {
        Block {
            label,
            phis: Vec::new(),
            instrs: Vec::new(),
            terminator: None,
            preds: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub id: LocalId,
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub entry: BlockLabel,
    pub params: Vec<(TempId, Type)>,
    pub locals: Vec<LocalDecl>,
    /// Insertion order, i.e. creation order during lowering; block layout
    /// (C9) computes its own reverse-post-order independent of this.
    pub blocks: IndexMap<BlockLabel, Block>,
}

impl Function {
    pub fn block(&self, label: BlockLabel) -> &Block {
        self.blocks.get(&label).expect("block label refers to this function")
    }

    pub fn block_mut(&mut self, label: BlockLabel) -> &mut Block {
        self.blocks.get_mut(&label).expect("block label refers to this function")
    }

    /// Labels in insertion order.
    pub fn block_labels(&self) -> Vec<BlockLabel> {
        self.blocks.keys().copied().collect()
    }
}

#[derive(Debug, Clone)]
pub struct StorageSlotDecl {
    pub name: String,
    pub slot: u64,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub storage: Vec<StorageSlotDecl>,
    pub create: Option<Function>,
    pub main: Function,
    /// Declaration order.
    pub functions: IndexMap<String, Function>,
}
