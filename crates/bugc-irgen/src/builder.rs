//! Builder state threaded through expression/statement lowering (spec.md
//! §4.2): the current function, the current block, fresh-id counters, and a
//! scope stack mapping source names to IR locals.

use crate::codes;
use crate::lower_expr::is_composite;
use bugc_check::CheckedProgram;
use bugc_diagnostics::{Diagnostic, Diagnostics};
use bugc_ir::{Block, BlockLabel, Function, Instr, LocalDecl, LocalId, TempId, Terminator, Value};
use bugc_types::Type;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Tracks the exit block of the nearest enclosing loop, so `break` can jump
/// there without threading loop context through every statement-lowering
/// call (spec.md §9: break targets the nearest enclosing loop's exit).
pub(crate) struct LoopCx {
    pub(crate) exit: BlockLabel,
}

/// What a name in scope resolves to. Almost everything is `Local` (spec.md
/// §4.2: "a scope stack mapping source names to IR locals"); `Alias` is a
/// narrow escape hatch for binding a name directly to `Value::CallData` —
/// `msg.data` has no 32-byte representation a `store_local`/`load_local`
/// round-trip could preserve, so `let b = msg.data;` binds `b` straight to
/// the sentinel instead of spilling it to memory.
#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Local(LocalId),
    Alias(Value),
}

pub(crate) struct Builder<'a> {
    pub(crate) checked: &'a CheckedProgram,
    next_temp: u32,
    next_local: u32,
    next_block: u32,
    scopes: Vec<IndexMap<String, Binding>>,
    local_types: BTreeMap<LocalId, Type>,
    pub(crate) loop_stack: Vec<LoopCx>,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) func: Function,
    pub(crate) current: BlockLabel,
}

impl<'a> Builder<'a> {
    pub(crate) fn new(checked: &'a CheckedProgram) -> Self {
        Builder {
            checked,
            next_temp: 0,
            next_local: 0,
            next_block: 0,
            scopes: Vec::new(),
            local_types: BTreeMap::new(),
            loop_stack: Vec::new(),
            diagnostics: Diagnostics::new(),
            func: Function {
                name: String::new(),
                entry: BlockLabel(0),
                params: Vec::new(),
                locals: Vec::new(),
                blocks: IndexMap::new(),
            },
            current: BlockLabel(0),
        }
    }

    pub(crate) fn fresh_temp(&mut self) -> TempId {
        let id = TempId(self.next_temp);
        self.next_temp += 1;
        id
    }

    fn fresh_local_id(&mut self) -> LocalId {
        let id = LocalId(self.next_local);
        self.next_local += 1;
        id
    }

    pub(crate) fn fresh_block(&mut self) -> BlockLabel {
        let label = BlockLabel(self.next_block);
        self.next_block += 1;
        self.func.blocks.insert(label, Block::new(label));
        label
    }

    /// Starts lowering a fresh function: resets per-function counters and
    /// opens an entry block with no parameters bound yet (callers that have
    /// parameters call [`Builder::bind_param`] before lowering the body).
    pub(crate) fn start_function(&mut self, name: impl Into<String>) {
        self.next_temp = 0;
        self.next_local = 0;
        self.next_block = 0;
        self.scopes.clear();
        self.scopes.push(IndexMap::new());
        self.local_types.clear();
        self.func = Function {
            name: name.into(),
            entry: BlockLabel(0),
            params: Vec::new(),
            locals: Vec::new(),
            blocks: IndexMap::new(),
        };
        let entry = self.fresh_block();
        self.func.entry = entry;
        self.current = entry;
    }

    /// Declares a function parameter: it arrives as a raw `Temp` (the
    /// calling convention's concern) and is immediately spilled into a
    /// fresh `Local` so every named binding — parameter or `let` — goes
    /// through the same load/store discipline that C6 promotes.
    ///
    /// A composite (struct or fixed-array) parameter can't be threaded
    /// through a single `Temp` slot, since the call ABI passes exactly one
    /// word per argument; that's reported here rather than built into
    /// something `bugc-codegen` can't lower.
    pub(crate) fn bind_param(&mut self, name: &str, ty: Type, span: Option<bugc_ast::Span>) {
        let param_temp = self.fresh_temp();
        self.func.params.push((param_temp, ty.clone()));
        let local = self.define_local(name, ty.clone());
        if is_composite(&ty) {
            self.error(
                codes::UNSUPPORTED_VALUE_PATTERN,
                format!("parameter `{name}` of composite type `{ty}` is not supported"),
                span,
            );
            return;
        }
        self.emit(Instr::StoreLocal {
            local,
            value: Value::Temp(param_temp, ty),
        });
    }

    /// Binds `name` to the same local storage as an existing binding,
    /// rather than allocating a fresh one — used for `let q = p;` where `p`
    /// is a composite value. BUG has no struct-literal syntax, so the only
    /// way a composite `let` initializer arises is by naming an existing
    /// local; this gives it reference semantics onto that local's memory
    /// rather than inventing a field-by-field copy.
    pub(crate) fn bind_alias_local(&mut self, name: &str, id: LocalId) {
        self.scopes
            .last_mut()
            .expect("at least one scope while lowering a function body")
            .insert(name.to_string(), Binding::Local(id));
    }

    /// Creates a fresh local, records its declaration, and binds `name` to
    /// it in the innermost scope (shadowing any outer binding).
    pub(crate) fn define_local(&mut self, name: &str, ty: Type) -> LocalId {
        let id = self.fresh_local_id();
        self.func.locals.push(LocalDecl {
            id,
            name: name.to_string(),
            ty: ty.clone(),
        });
        self.local_types.insert(id, ty);
        self.scopes
            .last_mut()
            .expect("at least one scope while lowering a function body")
            .insert(name.to_string(), Binding::Local(id));
        id
    }

    /// Binds `name` directly to `value` (see [`Binding::Alias`]) rather than
    /// spilling it to a fresh local.
    pub(crate) fn define_alias(&mut self, name: &str, value: Value) {
        self.scopes
            .last_mut()
            .expect("at least one scope while lowering a function body")
            .insert(name.to_string(), Binding::Alias(value));
    }

    pub(crate) fn local_type(&self, id: LocalId) -> Type {
        self.local_types
            .get(&id)
            .cloned()
            .expect("every LocalId came from define_local, which records its type")
    }

    /// Looks up `name` as a local binding (parameter or `let`), innermost
    /// scope first. Storage lookups go through `checked.symbols` directly,
    /// since locals shadow storage variables (spec.md §4.2).
    pub(crate) fn lookup_local(&self, name: &str) -> Option<Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).cloned())
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Appends `instr` to the current block, first opening a fresh block if
    /// the current one already has a terminator — dead code (after a
    /// `return`/`break`, or any other already-closed block) lands somewhere
    /// valid instead of corrupting a finished block (spec.md §4.2: "When the
    /// current block has a terminator, subsequent instructions open a new
    /// block").
    pub(crate) fn emit(&mut self, instr: Instr) {
        self.ensure_open();
        self.func.block_mut(self.current).instrs.push(instr);
    }

    /// Closes the current block with `term`, wiring up the target blocks'
    /// `preds` sets so later analyses don't need to re-derive predecessors.
    pub(crate) fn terminate(&mut self, term: Terminator) {
        self.ensure_open();
        for succ in term.successors() {
            self.func.block_mut(succ).preds.insert(self.current);
        }
        self.func.block_mut(self.current).terminator = Some(term);
    }

    fn ensure_open(&mut self) {
        if self.func.block(self.current).terminator.is_some() {
            self.current = self.fresh_block();
        }
    }

    pub(crate) fn switch_to(&mut self, label: BlockLabel) {
        self.current = label;
    }

    /// Finalizes the function being built: an unterminated final block (the
    /// body fell off the end without an explicit `return`) gets an implicit
    /// `return` with no value.
    pub(crate) fn finish_function(&mut self) -> Function {
        if self.func.block(self.current).terminator.is_none() {
            self.terminate(Terminator::Return(None));
        }
        std::mem::replace(
            &mut self.func,
            Function {
                name: String::new(),
                entry: BlockLabel(0),
                params: Vec::new(),
                locals: Vec::new(),
                blocks: IndexMap::new(),
            },
        )
    }

    pub(crate) fn error(&mut self, code: bugc_diagnostics::Code, message: impl Into<String>, span: Option<bugc_ast::Span>) {
        let mut diag = Diagnostic::error(code, message);
        if let Some(span) = span {
            diag = diag.with_location(span);
        }
        self.diagnostics.push(diag);
    }
}
