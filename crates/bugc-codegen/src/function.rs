//! Component C10 (instruction lowering): walks one function's SSA body in
//! block-layout order and emits EVM bytecode, keeping the symbolic stack
//! (`stack.rs`) in lockstep with every byte it writes.
//!
//! Jump/call targets are left as [`Patch`]es — two placeholder bytes at a
//! recorded position — because the absolute address they resolve to
//! (another block, another function's entry, the deployment epilogue)
//! isn't known until `module.rs` has laid out every function back to back.

use crate::codes;
use crate::error::CodegenError;
use crate::opcodes as op;
use crate::stack::{Origin, SymbolicStack};
use alloy_primitives::U256;
use bugc_analysis::{layout_predecessor, FunctionAnalysis};
use bugc_diagnostics::{Diagnostic, Diagnostics};
use bugc_ir::{BinOp, BlockLabel, ConstValue, EnvOp, Function, Instr, LocalId, Module, TempId, Terminator, UnOp, Value};
use bugc_types::Type;
use std::collections::BTreeMap;

/// Whether a function is a true EVM entry point, halting with `STOP`/
/// `RETURN` (or, for the constructor, falling into the deployer epilogue),
/// or an internal callee reached and left via the dynamic-`JUMP` return
/// convention (DESIGN.md, "internal calls").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Create,
    Main,
    User,
}

/// Where a callable function's linkage lives in memory: one fixed slot per
/// parameter, one for its return address, one for its return value.
/// Assigned once for the whole module (`module.rs`) so every call site
/// agrees with its callee on where to find them.
#[derive(Debug, Clone)]
pub struct Linkage {
    pub param_slots: Vec<u64>,
    pub ret_addr_slot: u64,
    pub ret_value_slot: u64,
}

#[derive(Debug, Clone)]
pub struct Patch {
    /// Byte offset, within this function's own code, of the two
    /// placeholder bytes a later pass overwrites.
    pub pos: usize,
    pub target: PatchTarget,
}

#[derive(Debug, Clone)]
pub enum PatchTarget {
    /// A block of this same function.
    Block(BlockLabel),
    /// Another function's entry point (index 0 of its own bytes).
    FunctionEntry(String),
    /// A position within this same function, recorded via `bind_local` —
    /// used for a call's return site.
    Local(u32),
    /// The start of the deployment blob's CODECOPY/RETURN epilogue.
    Epilogue,
}

pub struct FunctionCode {
    pub bytes: Vec<u8>,
    pub patches: Vec<Patch>,
    pub block_offsets: BTreeMap<BlockLabel, usize>,
    pub local_labels: BTreeMap<u32, usize>,
}

#[allow(clippy::too_many_arguments)]
pub fn emit_function(
    module: &Module,
    func: &Function,
    role: Role,
    analysis: &FunctionAnalysis,
    region_extra: u64,
    linkage: Option<&Linkage>,
    linkages: &BTreeMap<String, Linkage>,
    is_blob_start: bool,
    is_blob_end: bool,
    diagnostics: &mut Diagnostics,
) -> FunctionCode {
    let mut emitter = FunctionEmitter {
        module,
        func,
        role,
        analysis,
        region_extra,
        linkage,
        linkages,
        is_blob_start,
        is_blob_end,
        diagnostics,
        code: Vec::new(),
        stack: SymbolicStack::new(),
        current_block: func.entry,
        block_offsets: BTreeMap::new(),
        local_labels: BTreeMap::new(),
        next_local_label: 0,
        patches: Vec::new(),
    };
    emitter.run();
    FunctionCode {
        bytes: emitter.code,
        patches: emitter.patches,
        block_offsets: emitter.block_offsets,
        local_labels: emitter.local_labels,
    }
}

struct FunctionEmitter<'a> {
    module: &'a Module,
    func: &'a Function,
    role: Role,
    analysis: &'a FunctionAnalysis,
    region_extra: u64,
    linkage: Option<&'a Linkage>,
    linkages: &'a BTreeMap<String, Linkage>,
    is_blob_start: bool,
    is_blob_end: bool,
    diagnostics: &'a mut Diagnostics,
    code: Vec<u8>,
    stack: SymbolicStack,
    current_block: BlockLabel,
    block_offsets: BTreeMap<BlockLabel, usize>,
    local_labels: BTreeMap<u32, usize>,
    next_local_label: u32,
    patches: Vec<Patch>,
}

impl<'a> FunctionEmitter<'a> {
    fn run(&mut self) {
        let func = self.func;
        let layout = self.analysis.layout.clone();
        for (i, label) in layout.iter().enumerate() {
            self.current_block = *label;
            self.block_offsets.insert(*label, self.code.len());
            let omit_jumpdest = i == 0 && self.is_blob_start;
            if !omit_jumpdest {
                self.emit(op::JUMPDEST);
            }
            let block = func.block(*label);
            for instr in &block.instrs {
                self.emit_instr(instr);
            }
            if let Some(term) = &block.terminator {
                self.emit_terminator(*label, term);
            }
        }
    }

    // -- raw emission -----------------------------------------------------

    fn emit(&mut self, byte: u8) {
        self.code.push(byte);
    }

    fn emit_many(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    fn push_const_bytes(&mut self, value: U256) {
        let bytes = op::minimal_be_bytes(&value);
        if bytes.is_empty() {
            self.emit(op::PUSH0);
        } else {
            self.emit(op::push_n(bytes.len() as u8));
            self.emit_many(&bytes);
        }
        self.stack.push("const", None);
    }

    fn push_u64(&mut self, value: u64) {
        self.push_const_bytes(U256::from(value));
    }

    fn push_const(&mut self, value: &ConstValue) {
        self.push_const_bytes(const_to_u256(value));
    }

    fn fresh_local_label(&mut self) -> u32 {
        let id = self.next_local_label;
        self.next_local_label += 1;
        id
    }

    fn bind_local(&mut self, id: u32) {
        self.local_labels.insert(id, self.code.len());
    }

    fn emit_push2_patch(&mut self, target: PatchTarget) {
        self.emit(op::PUSH2);
        let pos = self.code.len();
        self.emit_many(&[0, 0]);
        self.patches.push(Patch { pos, target });
        self.stack.push("addr", None);
    }

    fn emit_dup(&mut self, k: u8) {
        if !(1..=16).contains(&k) {
            self.diagnostics.push(CodegenError::DupOutOfRange(k).into());
            return;
        }
        if (self.stack.depth() as u8) < k {
            self.diagnostics.push(
                CodegenError::StackUnderflow {
                    function: self.func.name.clone(),
                    needed: k as usize,
                    found: self.stack.depth(),
                }
                .into(),
            );
            return;
        }
        self.emit(op::dup(k));
        self.stack.dup(k);
    }

    // -- small opcode helpers, each keeping `stack` in lockstep ------------

    fn op0(&mut self, byte: u8, brand: &'static str) {
        self.emit(byte);
        self.stack.push(brand, None);
    }

    fn op1(&mut self, byte: u8) {
        self.emit(byte);
        self.stack.pop();
        self.stack.push("result", None);
    }

    fn op2(&mut self, byte: u8) {
        self.emit(byte);
        self.stack.pop_n(2);
        self.stack.push("result", None);
    }

    fn op_mstore(&mut self) {
        self.emit(op::MSTORE);
        self.stack.pop_n(2);
    }

    fn op_sstore(&mut self) {
        self.emit(op::SSTORE);
        self.stack.pop_n(2);
    }

    fn op_mload(&mut self) {
        self.emit(op::MLOAD);
        self.stack.pop();
        self.stack.push("loaded", None);
    }

    fn op_sload(&mut self) {
        self.emit(op::SLOAD);
        self.stack.pop();
        self.stack.push("loaded", None);
    }

    fn op_sha3(&mut self) {
        self.emit(op::SHA3);
        self.stack.pop_n(2);
        self.stack.push("hash", None);
    }

    // -- operand addressing -------------------------------------------------

    fn local_addr(&self, id: LocalId) -> u64 {
        self.analysis.memory.local_offset(id).unwrap_or(0) + self.region_extra
    }

    fn param_slot(&self, id: TempId) -> Option<u64> {
        let linkage = self.linkage?;
        let index = self.func.params.iter().position(|(p, _)| *p == id)?;
        linkage.param_slots.get(index).copied()
    }

    fn temp_addr(&self, id: TempId) -> Option<u64> {
        if let Some(slot) = self.param_slot(id) {
            return Some(slot);
        }
        self.analysis.memory.temp_offset(id).map(|o| o + self.region_extra)
    }

    /// The three-step load strategy (spec.md §4.7): reuse a live copy
    /// already within `DUP`'s reach, else reload from the slot the memory
    /// planner assigned, else the value is lost — an upstream bug.
    fn load_value(&mut self, value: &Value) {
        match value {
            Value::Const(c, _) => self.push_const(c),
            Value::CallData => self.op0(op::CALLDATASIZE, "calldatasize"),
            Value::Local(id, _) => {
                let addr = self.local_addr(*id);
                self.push_u64(addr);
            }
            Value::Temp(id, _) => self.load_temp(*id),
        }
    }

    fn load_temp(&mut self, id: TempId) {
        if let Some(k) = self.stack.position_of(Origin::Temp(id)) {
            self.emit_dup(k);
            return;
        }
        if let Some(addr) = self.temp_addr(id) {
            self.push_u64(addr);
            self.op_mload();
            self.stack.set_top_origin(Origin::Temp(id));
            return;
        }
        self.diagnostics.push(
            CodegenError::ValueUnloadable {
                function: self.func.name.clone(),
            }
            .into(),
        );
        self.push_u64(0);
    }

    /// Tags the value a just-emitted instruction left on top of the stack
    /// as `dest`, then persists it to memory too if the planner gave `dest`
    /// an offset (cross-block lifetime, or a use past a stack-disturbing
    /// instruction). The `DUP1` before the store keeps the original value
    /// on the stack for whatever in this block uses it next.
    fn finish_def(&mut self, dest: TempId) {
        self.stack.set_top_origin(Origin::Temp(dest));
        if let Some(addr) = self.temp_addr(dest) {
            self.emit_dup(1);
            self.push_u64(addr);
            self.op_mstore();
        }
    }

    fn compute_addr_base_index(&mut self, base: &Value, index: &Value) {
        self.load_value(base);
        self.load_value(index);
        self.push_u64(32);
        self.op2(op::MUL);
        self.op2(op::ADD);
    }

    fn compute_addr_base_field(&mut self, base: &Value, field_index: usize) {
        self.load_value(base);
        self.push_u64(field_index as u64 * 32);
        self.op2(op::ADD);
    }

    // -- instruction lowering ----------------------------------------------

    fn emit_instr(&mut self, instr: &Instr) {
        match instr {
            Instr::Const { dest, value, .. } => {
                self.push_const(value);
                self.finish_def(*dest);
            }
            Instr::Binary { dest, op, left, right } => self.lower_binary(*dest, *op, left, right),
            Instr::Unary { dest, op, operand } => self.lower_unary(*dest, *op, operand),
            Instr::LoadLocal { dest, local } => {
                let addr = self.local_addr(*local);
                self.push_u64(addr);
                self.op_mload();
                self.finish_def(*dest);
            }
            Instr::StoreLocal { local, value } => {
                let addr = self.local_addr(*local);
                self.load_value(value);
                self.push_u64(addr);
                self.op_mstore();
            }
            Instr::LoadStorage { dest, slot, .. } => {
                self.load_value(slot);
                self.op_sload();
                self.finish_def(*dest);
            }
            Instr::StoreStorage { slot, value } => {
                self.load_value(value);
                self.load_value(slot);
                self.op_sstore();
            }
            Instr::LoadIndex { dest, base, index, .. } => {
                self.compute_addr_base_index(base, index);
                self.op_mload();
                self.finish_def(*dest);
            }
            Instr::StoreIndex { base, index, value } => {
                self.load_value(value);
                self.compute_addr_base_index(base, index);
                self.op_mstore();
            }
            Instr::LoadField { dest, base, field_index, .. } => {
                self.compute_addr_base_field(base, *field_index);
                self.op_mload();
                self.finish_def(*dest);
            }
            Instr::StoreField { base, field_index, value } => {
                self.load_value(value);
                self.compute_addr_base_field(base, *field_index);
                self.op_mstore();
            }
            Instr::ComputeSlot { dest, base, key, .. } => {
                self.load_value(key);
                self.push_u64(0x00);
                self.op_mstore();
                self.load_value(base);
                self.push_u64(0x20);
                self.op_mstore();
                self.push_u64(0x40);
                self.push_u64(0x00);
                self.op_sha3();
                self.finish_def(*dest);
            }
            Instr::ComputeArraySlot { dest, base } => {
                self.load_value(base);
                self.push_u64(0x00);
                self.op_mstore();
                self.push_u64(0x20);
                self.push_u64(0x00);
                self.op_sha3();
                self.finish_def(*dest);
            }
            Instr::ComputeFieldOffset { dest, base, field_index } => {
                self.load_value(base);
                self.push_u64(*field_index as u64);
                self.op2(op::ADD);
                self.finish_def(*dest);
            }
            Instr::ComputeIndexSlot { dest, base, index } => {
                self.load_value(index);
                self.load_value(base);
                self.op2(op::ADD);
                self.finish_def(*dest);
            }
            Instr::FieldAddr { dest, base, field_index } => {
                self.load_value(base);
                self.push_u64(*field_index as u64 * 32);
                self.op2(op::ADD);
                self.finish_def(*dest);
            }
            Instr::IndexAddr { dest, base, index } => {
                self.compute_addr_base_index(base, index);
                self.finish_def(*dest);
            }
            Instr::Cast { dest, value, ty } => self.lower_cast(*dest, value, ty),
            Instr::Hash { dest, value } => {
                self.load_value(value);
                self.push_u64(0x00);
                self.op_mstore();
                let len = value.ty().fixed_byte_len().unwrap_or(32);
                self.push_u64(len);
                self.push_u64(0x00);
                self.op_sha3();
                self.finish_def(*dest);
            }
            Instr::Length { dest, value } => self.lower_length(*dest, value),
            Instr::Slice { dest, value, lo, hi } => self.lower_slice(*dest, value, lo, hi),
            Instr::Env { dest, op } => {
                let byte = match op {
                    EnvOp::MsgSender => crate::opcodes::CALLER,
                    EnvOp::MsgValue => crate::opcodes::CALLVALUE,
                    EnvOp::BlockTimestamp => crate::opcodes::TIMESTAMP,
                    EnvOp::BlockNumber => crate::opcodes::NUMBER,
                };
                self.op0(byte, "env");
                self.finish_def(*dest);
            }
            Instr::Call { dest, name, args, ty } => self.lower_call(*dest, name, args, ty),
        }
    }

    fn lower_binary(&mut self, dest: TempId, op: BinOp, left: &Value, right: &Value) {
        let signed = left.ty().is_signed().unwrap_or(false);
        self.load_value(right);
        self.stack.rebrand_top("b");
        self.load_value(left);
        self.stack.rebrand_top("a");
        match op {
            BinOp::Add => self.op2(crate::opcodes::ADD),
            BinOp::Sub => self.op2(crate::opcodes::SUB),
            BinOp::Mul => self.op2(crate::opcodes::MUL),
            BinOp::Div => self.op2(if signed { crate::opcodes::SDIV } else { crate::opcodes::DIV }),
            BinOp::Mod => self.op2(if signed { crate::opcodes::SMOD } else { crate::opcodes::MOD }),
            BinOp::Eq => self.op2(crate::opcodes::EQ),
            BinOp::Ne => {
                self.op2(crate::opcodes::EQ);
                self.op1(crate::opcodes::ISZERO);
            }
            BinOp::Lt => self.op2(if signed { crate::opcodes::SLT } else { crate::opcodes::LT }),
            BinOp::Gt => self.op2(if signed { crate::opcodes::SGT } else { crate::opcodes::GT }),
            BinOp::Le => {
                self.op2(if signed { crate::opcodes::SGT } else { crate::opcodes::GT });
                self.op1(crate::opcodes::ISZERO);
            }
            BinOp::Ge => {
                self.op2(if signed { crate::opcodes::SLT } else { crate::opcodes::LT });
                self.op1(crate::opcodes::ISZERO);
            }
            BinOp::And => self.op2(crate::opcodes::AND),
            BinOp::Or => self.op2(crate::opcodes::OR),
        }
        self.finish_def(dest);
    }

    fn lower_unary(&mut self, dest: TempId, op: UnOp, operand: &Value) {
        match op {
            UnOp::Not => {
                self.load_value(operand);
                self.op1(crate::opcodes::ISZERO);
            }
            UnOp::Neg => {
                self.load_value(operand);
                self.stack.rebrand_top("b");
                self.push_u64(0);
                self.stack.rebrand_top("a");
                self.op2(crate::opcodes::SUB);
            }
        }
        self.finish_def(dest);
    }

    fn lower_cast(&mut self, dest: TempId, value: &Value, ty: &Type) {
        self.load_value(value);
        match ty {
            Type::Uint(bits) => {
                if *bits < 256 {
                    self.mask_low_bits(*bits as u32);
                }
            }
            Type::Int(bits) => {
                if *bits < 256 {
                    self.mask_low_bits(*bits as u32);
                    self.sign_extend(*bits as u32);
                }
            }
            Type::Address => self.mask_low_bits(160),
            _ => {}
        }
        self.finish_def(dest);
    }

    fn mask_low_bits(&mut self, bits: u32) {
        let mask = if bits >= 256 {
            U256::MAX
        } else {
            (U256::from(1u8) << bits) - U256::from(1u8)
        };
        self.push_const_bytes(mask);
        self.op2(crate::opcodes::AND);
    }

    /// `SIGNEXTEND(b, x)`: `b` is the index (from the low byte, 0-based) of
    /// the byte whose top bit gets propagated upward.
    fn sign_extend(&mut self, bits: u32) {
        let byte_index = bits / 8 - 1;
        self.push_u64(byte_index as u64);
        self.op2(crate::opcodes::SIGNEXTEND);
    }

    fn lower_length(&mut self, dest: TempId, value: &Value) {
        match value {
            Value::CallData => self.op0(crate::opcodes::CALLDATASIZE, "calldatasize"),
            _ => match value.ty() {
                Type::Array(_, Some(n)) => self.push_u64(n),
                Type::Bytes(Some(n)) => self.push_u64(n as u64),
                // Dynamic bytes/string/array: the IR generator's own load of
                // `value` already produced the length word (storage layout
                // keeps a dynamic collection's length at its base slot).
                _ => self.load_value(value),
            },
        }
        self.finish_def(dest);
    }

    fn lower_slice(&mut self, dest: TempId, value: &Value, lo: &Value, hi: &Value) {
        if !matches!(value, Value::CallData) {
            self.diagnostics.push(Diagnostic::warning(
                codes::UNSUPPORTED_INSTRUCTION,
                format!(
                    "slice of a non-calldata value in function `{}` is not supported; treating it as zero-length",
                    self.func.name
                ),
            ));
            self.push_u64(0);
            self.finish_def(dest);
            return;
        }
        self.load_value(lo);
        self.stack.rebrand_top("b");
        self.load_value(hi);
        self.stack.rebrand_top("a");
        self.op2(crate::opcodes::SUB);
        self.finish_def(dest);

        // Best-effort side-effecting copy into scratch memory. Full
        // dynamic-length byte propagation beyond length tracking is out of
        // scope (the same simplification `bugc-irgen` already applies to
        // every dynamic-length value).
        let dest_ty = Type::Uint(256);
        self.load_value(&Value::Temp(dest, dest_ty));
        self.load_value(lo);
        self.push_u64(0x00);
        self.emit(crate::opcodes::CALLDATACOPY);
        self.stack.pop_n(3);
    }

    fn lower_call(&mut self, dest: Option<TempId>, name: &str, args: &[Value], _ty: &Option<Type>) {
        let Some(linkage) = self.linkages.get(name) else {
            self.diagnostics.push(CodegenError::UnknownCallee(name.to_string()).into());
            if let Some(d) = dest {
                self.push_u64(0);
                self.finish_def(d);
            }
            return;
        };
        let linkage = linkage.clone();
        for (arg, slot) in args.iter().zip(linkage.param_slots.iter()) {
            self.load_value(arg);
            self.push_u64(*slot);
            self.op_mstore();
        }
        let marker = self.fresh_local_label();
        self.emit_push2_patch(PatchTarget::Local(marker));
        self.push_u64(linkage.ret_addr_slot);
        self.op_mstore();
        self.emit_push2_patch(PatchTarget::FunctionEntry(name.to_string()));
        self.emit(op::JUMP);
        self.stack.pop();
        self.bind_local(marker);
        self.emit(op::JUMPDEST);
        if let Some(d) = dest {
            self.push_u64(linkage.ret_value_slot);
            self.op_mload();
            self.finish_def(d);
        }
    }

    // -- terminators ---------------------------------------------------------

    fn emit_terminator(&mut self, label: BlockLabel, term: &Terminator) {
        match term {
            Terminator::Jump(target) => {
                self.materialize_phis_for_target(label, *target);
                self.emit_jump_or_fallthrough(*target);
            }
            Terminator::Branch { cond, if_true, if_false } => {
                self.load_value(cond);
                if self.phis_reference(*if_true, label) {
                    // `if_true` needs phi sources materialized from this
                    // block, but that can only run on the taken branch, so
                    // `JUMPI` can't target it directly: route through a
                    // trampoline that materializes then jumps on.
                    let marker = self.fresh_local_label();
                    self.emit_push2_patch(PatchTarget::Local(marker));
                    self.emit(op::JUMPI);
                    self.stack.pop_n(2);
                    self.materialize_phis_for_target(label, *if_false);
                    self.emit_jump_or_fallthrough(*if_false);
                    self.bind_local(marker);
                    self.emit(op::JUMPDEST);
                    self.materialize_phis_for_target(label, *if_true);
                    self.emit_jump_to_block(*if_true);
                } else {
                    self.emit_push2_patch(PatchTarget::Block(*if_true));
                    self.emit(op::JUMPI);
                    self.stack.pop_n(2);
                    self.materialize_phis_for_target(label, *if_false);
                    self.emit_jump_or_fallthrough(*if_false);
                }
            }
            Terminator::Return(value) => self.emit_return(value.as_ref()),
        }
    }

    fn phis_reference(&self, target: BlockLabel, from: BlockLabel) -> bool {
        self.func.block(target).phis.iter().any(|p| p.sources.contains_key(&from))
    }

    fn materialize_phis_for_target(&mut self, from: BlockLabel, to: BlockLabel) {
        for phi in self.func.block(to).phis.clone() {
            let Some(src) = phi.sources.get(&from).cloned() else {
                self.diagnostics.push(
                    CodegenError::UnresolvedPhiSource {
                        function: self.func.name.clone(),
                        block: to.to_string(),
                        pred: from.to_string(),
                    }
                    .into(),
                );
                continue;
            };
            if let Some(addr) = self.temp_addr(phi.dest) {
                self.load_value(&src);
                self.push_u64(addr);
                self.op_mstore();
            }
        }
    }

    fn emit_jump_to_block(&mut self, target: BlockLabel) {
        self.emit_push2_patch(PatchTarget::Block(target));
        self.emit(op::JUMP);
        self.stack.pop();
    }

    fn emit_jump_or_fallthrough(&mut self, target: BlockLabel) {
        if layout_predecessor(&self.analysis.layout, target) == Some(self.current_block) {
            return;
        }
        self.emit_jump_to_block(target);
    }

    fn emit_jump_to_epilogue(&mut self) {
        self.emit_push2_patch(PatchTarget::Epilogue);
        self.emit(op::JUMP);
        self.stack.pop();
    }

    fn emit_return(&mut self, value: Option<&Value>) {
        match self.role {
            Role::Create => self.emit_jump_to_epilogue(),
            Role::Main => match value {
                None => {
                    // Falling off the end of the runtime blob is itself a
                    // halt under EVM semantics (spec.md §8 scenario 1: the
                    // empty contract's runtime is zero bytes, not a lone
                    // STOP) — but only when this truly is the last byte
                    // this blob will ever emit.
                    let is_last_block = self.analysis.layout.last() == Some(&self.current_block);
                    if !(self.is_blob_end && is_last_block) {
                        self.emit(op::STOP);
                    }
                }
                Some(v) => self.emit_return_value(v),
            },
            Role::User => {
                let linkage = self.linkage.expect("callable function carries linkage").clone();
                if let Some(v) = value {
                    self.load_value(v);
                    self.push_u64(linkage.ret_value_slot);
                    self.op_mstore();
                }
                self.push_u64(linkage.ret_addr_slot);
                self.op_mload();
                self.emit(op::JUMP);
                self.stack.pop();
            }
        }
    }

    fn emit_return_value(&mut self, value: &Value) {
        let existing_addr = match value {
            Value::Temp(id, _) => self.temp_addr(*id),
            Value::Local(id, _) => self.analysis.memory.local_offset(*id).map(|o| o + self.region_extra),
            _ => None,
        };
        let addr = match existing_addr {
            Some(a) => a,
            None => {
                let scratch = self.analysis.memory.free_pointer + self.region_extra;
                self.load_value(value);
                self.push_u64(scratch);
                self.op_mstore();
                scratch
            }
        };
        self.push_u64(32);
        self.push_u64(addr);
        self.emit(op::RETURN);
        self.stack.pop_n(2);
    }
}

fn const_to_u256(c: &ConstValue) -> U256 {
    match c {
        ConstValue::Uint(v) => *v,
        ConstValue::Bool(b) => {
            if *b {
                U256::from(1u8)
            } else {
                U256::ZERO
            }
        }
        ConstValue::Address(a) => U256::from_be_slice(a.as_slice()),
        ConstValue::Bytes(b) => left_aligned_word(b),
        ConstValue::Str(s) => left_aligned_word(s.as_bytes()),
    }
}

/// `bytesN`/`string` constants are modelled left-aligned in their single
/// 32-byte word, matching Solidity's ABI packing for fixed-size byte types.
fn left_aligned_word(bytes: &[u8]) -> U256 {
    let mut word = [0u8; 32];
    let n = bytes.len().min(32);
    word[..n].copy_from_slice(&bytes[..n]);
    U256::from_be_bytes(word)
}
