//! Component C3: the three-pass type checker.

use crate::codes;
use crate::symbol::{Symbol, SymbolKind, SymbolTable};
use bugc_ast::{BinOp, Block, Decl, Expr, ExprKind, NodeId, Program, SpecialExpr, Stmt, StmtKind, TypeExpr, UnOp};
use bugc_diagnostics::{Diagnostic, Diagnostics};
use bugc_types::{FunctionType, StructType, Type};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Everything downstream stages need: the resolved symbol table and a
/// per-node type map, plus the struct/function signature tables the IR
/// generator consults when lowering calls and field access.
pub struct CheckedProgram {
    pub symbols: SymbolTable,
    pub node_types: BTreeMap<NodeId, Type>,
    pub structs: IndexMap<String, StructType>,
    pub functions: IndexMap<String, FunctionType>,
    pub diagnostics: Diagnostics,
}

struct Checker {
    symbols: SymbolTable,
    node_types: BTreeMap<NodeId, Type>,
    structs: IndexMap<String, StructType>,
    functions: IndexMap<String, FunctionType>,
    diagnostics: Diagnostics,
    /// The expected return type of the function body currently being
    /// checked; `None` means "void function" (no return type), not "not in
    /// a function".
    expected_return: Option<Type>,
    loop_depth: u32,
}

pub fn check_program(program: &Program) -> CheckedProgram {
    info!("type-checking program `{}`", program.name);
    let mut checker = Checker {
        symbols: SymbolTable::new(),
        node_types: BTreeMap::new(),
        structs: IndexMap::new(),
        functions: IndexMap::new(),
        diagnostics: Diagnostics::new(),
        expected_return: None,
        loop_depth: 0,
    };
    checker.collect_decls(program);
    checker.resolve_storage(program);
    checker.check_bodies(program);

    debug!(
        "type-checking finished: {} diagnostics, {} node types recorded",
        checker.diagnostics.len(),
        checker.node_types.len()
    );

    CheckedProgram {
        symbols: checker.symbols,
        node_types: checker.node_types,
        structs: checker.structs,
        functions: checker.functions,
        diagnostics: checker.diagnostics,
    }
}

impl Checker {
    // ---- pass 1: collect struct and function declarations -------------

    fn collect_decls(&mut self, program: &Program) {
        // Structs first, in declaration order, so a later pass resolving
        // field types against `self.structs` sees every struct regardless
        // of forward references between them.
        for decl in &program.decls {
            if let Decl::Struct(s) = decl {
                if self.structs.contains_key(&s.name) {
                    self.error(
                        codes::DUPLICATE_DECL,
                        format!("struct `{}` is already declared", s.name),
                        s.span,
                    );
                    continue;
                }
                // Field types are resolved in a second sweep below, once
                // every struct name is known; placeholder fields keep the
                // map key present for `Named` self/forward references.
                self.structs.insert(
                    s.name.clone(),
                    StructType {
                        name: s.name.clone(),
                        fields: Vec::new(),
                    },
                );
            }
        }
        for decl in &program.decls {
            if let Decl::Struct(s) = decl {
                let fields = s
                    .fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), self.resolve_type(ty, s.span)))
                    .collect();
                self.structs.get_mut(&s.name).unwrap().fields = fields;
            }
        }

        for decl in &program.decls {
            if let Decl::Function(f) = decl {
                if self.functions.contains_key(&f.name) {
                    self.error(
                        codes::DUPLICATE_DECL,
                        format!("function `{}` is already declared", f.name),
                        f.span,
                    );
                    continue;
                }
                let params = f
                    .params
                    .iter()
                    .map(|(_, ty)| self.resolve_type(ty, f.span))
                    .collect();
                let ret = f
                    .ret
                    .as_ref()
                    .map(|ty| Box::new(self.resolve_type(ty, f.span)));
                self.functions.insert(
                    f.name.clone(),
                    FunctionType {
                        name: f.name.clone(),
                        params,
                        ret,
                    },
                );
            }
        }
    }

    // ---- pass 2: storage declarations ----------------------------------

    fn resolve_storage(&mut self, program: &Program) {
        let mut seen_slots: BTreeMap<u64, String> = BTreeMap::new();
        for decl in &program.decls {
            if let Decl::Storage(s) = decl {
                let ty = self.resolve_type(&s.ty, s.span);
                if let Some(existing) = seen_slots.insert(s.slot, s.name.clone()) {
                    self.error(
                        codes::INVALID_SLOT,
                        format!(
                            "storage slot {} is used by both `{}` and `{}`",
                            s.slot, existing, s.name
                        ),
                        s.span,
                    );
                }
                let defined = self.symbols.define(Symbol {
                    name: s.name.clone(),
                    ty,
                    kind: SymbolKind::Storage { slot: s.slot },
                });
                if !defined {
                    self.error(
                        codes::DUPLICATE_DECL,
                        format!("storage variable `{}` is already declared", s.name),
                        s.span,
                    );
                }
            }
        }
    }

    // ---- pass 3: bodies -------------------------------------------------

    fn check_bodies(&mut self, program: &Program) {
        for decl in &program.decls {
            if let Decl::Function(f) = decl {
                self.symbols.push_scope();
                for (name, ty_expr) in &f.params {
                    let ty = self.resolve_type(ty_expr, f.span);
                    self.symbols.define(Symbol {
                        name: name.clone(),
                        ty,
                        kind: SymbolKind::Local,
                    });
                }
                let saved = self.expected_return.take();
                self.expected_return = f.ret.as_ref().map(|ty| self.resolve_type(ty, f.span));
                self.check_block(&f.body);
                self.expected_return = saved;
                self.symbols.pop_scope();
            }
        }

        if let Some(create) = &program.create {
            self.symbols.push_scope();
            self.expected_return = None;
            self.check_block(create);
            self.symbols.pop_scope();
        }

        self.symbols.push_scope();
        self.expected_return = None;
        self.check_block(&program.body);
        self.symbols.pop_scope();
    }

    fn check_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Let { name, init } => {
                let ty = self.check_expr(init);
                self.symbols.define(Symbol {
                    name: name.clone(),
                    ty,
                    kind: SymbolKind::Local,
                });
            }
            StmtKind::Assign { target, value } => {
                if !is_assignable_expr(target) {
                    self.error(
                        codes::INVALID_ASSIGN_TARGET,
                        "assignment target must be an identifier, index, slice, or member access",
                        target.span,
                    );
                }
                let target_ty = self.check_expr(target);
                let value_ty = self.check_expr(value);
                if !target_ty.compatible(&value_ty) {
                    self.error_types(
                        codes::TYPE_MISMATCH,
                        "cannot assign value to target of incompatible type",
                        stmt.span,
                        &target_ty,
                        &value_ty,
                    );
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_ty = self.check_expr(cond);
                if cond_ty != Type::Bool && !cond_ty.is_failure() {
                    self.error_types(
                        codes::INVALID_CONDITION,
                        "if-condition must be bool",
                        cond.span,
                        &Type::Bool,
                        &cond_ty,
                    );
                }
                self.symbols.push_scope();
                self.check_block(then_branch);
                self.symbols.pop_scope();
                if let Some(else_branch) = else_branch {
                    self.symbols.push_scope();
                    self.check_block(else_branch);
                    self.symbols.pop_scope();
                }
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                // The init binding gets its own scope, per spec.
                self.symbols.push_scope();
                self.check_stmt(init);
                let cond_ty = self.check_expr(cond);
                if cond_ty != Type::Bool && !cond_ty.is_failure() {
                    self.error_types(
                        codes::INVALID_CONDITION,
                        "for-condition must be bool",
                        cond.span,
                        &Type::Bool,
                        &cond_ty,
                    );
                }
                self.loop_depth += 1;
                self.symbols.push_scope();
                self.check_block(body);
                self.symbols.pop_scope();
                self.check_stmt(update);
                self.loop_depth -= 1;
                self.symbols.pop_scope();
            }
            StmtKind::Return(value) => match (&self.expected_return, value) {
                (Some(expected), Some(expr)) => {
                    let actual = self.check_expr(expr);
                    if !expected.compatible(&actual) {
                        self.error_types(
                            codes::RETURN_MISMATCH,
                            "returned value does not match the function's return type",
                            stmt.span,
                            expected,
                            &actual,
                        );
                    }
                }
                (Some(expected), None) => {
                    let expected = expected.clone();
                    self.error_types(
                        codes::RETURN_MISMATCH,
                        "missing return value",
                        stmt.span,
                        &expected,
                        &Type::Failure("missing".into()),
                    );
                }
                (None, Some(expr)) => {
                    let actual = self.check_expr(expr);
                    self.error_types(
                        codes::RETURN_MISMATCH,
                        "function has no return type but a value was returned",
                        stmt.span,
                        &Type::Failure("void".into()),
                        &actual,
                    );
                }
                (None, None) => {}
            },
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.error(
                        codes::BREAK_OUTSIDE_LOOP,
                        "`break` outside of a loop",
                        stmt.span,
                    );
                }
            }
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Type {
        let ty = self.check_expr_kind(expr);
        self.node_types.insert(expr.id, ty.clone());
        ty
    }

    fn check_expr_kind(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Ident(name) => match self.symbols.lookup(name) {
                Some(sym) => sym.ty.clone(),
                None => {
                    self.error(
                        codes::UNDEFINED_VARIABLE,
                        format!("undefined variable `{name}`"),
                        expr.span,
                    );
                    Type::failure("undefined variable")
                }
            },
            ExprKind::Number(_) => Type::Uint(256),
            ExprKind::Bool(_) => Type::Bool,
            ExprKind::Str(_) => Type::String,
            ExprKind::Hex(bytes) => {
                if bytes.len() <= 32 {
                    Type::Bytes(Some(bytes.len() as u8))
                } else {
                    Type::Bytes(None)
                }
            }
            ExprKind::Address(_) => Type::Address,
            ExprKind::Unary(op, operand) => self.check_unary(*op, operand, expr.span),
            ExprKind::Binary(op, lhs, rhs) => self.check_binary(*op, lhs, rhs, expr.span),
            ExprKind::Member(base, field) => self.check_member(base, field, expr.span),
            ExprKind::Index(base, index) => self.check_index(base, index, expr.span),
            ExprKind::Slice(base, lo, hi) => self.check_slice(base, lo, hi, expr.span),
            ExprKind::Call(name, args) => self.check_call(name, args, expr.span),
            ExprKind::Cast(inner, ty_expr) => self.check_cast(inner, ty_expr, expr.span),
            ExprKind::Special(special) => check_special(*special),
        }
    }

    fn check_unary(&mut self, op: UnOp, operand: &Expr, span: Option<bugc_ast::Span>) -> Type {
        let operand_ty = self.check_expr(operand);
        match op {
            UnOp::Not => {
                if operand_ty != Type::Bool && !operand_ty.is_failure() {
                    self.error_types(
                        codes::INVALID_OPERAND,
                        "`!` requires a bool operand",
                        span,
                        &Type::Bool,
                        &operand_ty,
                    );
                    return Type::failure("invalid operand");
                }
                Type::Bool
            }
            UnOp::Neg => {
                if !operand_ty.is_numeric() && !operand_ty.is_failure() {
                    self.error(
                        codes::INVALID_OPERAND,
                        "unary `-` requires a numeric operand",
                        span,
                    );
                    return Type::failure("invalid operand");
                }
                operand_ty
            }
        }
    }

    fn check_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, span: Option<bugc_ast::Span>) -> Type {
        let lhs_ty = self.check_expr(lhs);
        let rhs_ty = self.check_expr(rhs);
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                if !lhs_ty.is_numeric() || !rhs_ty.is_numeric() {
                    if !lhs_ty.is_failure() && !rhs_ty.is_failure() {
                        self.error(
                            codes::INVALID_OPERAND,
                            "arithmetic operators require numeric operands",
                            span,
                        );
                    }
                    return Type::failure("invalid operand");
                }
                lhs_ty
                    .common_type(&rhs_ty)
                    .unwrap_or_else(|| Type::failure("mismatched numeric signedness"))
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                if !lhs_ty.is_numeric() || !rhs_ty.is_numeric() {
                    if !lhs_ty.is_failure() && !rhs_ty.is_failure() {
                        self.error(
                            codes::INVALID_OPERAND,
                            "relational operators require numeric operands",
                            span,
                        );
                    }
                }
                Type::Bool
            }
            BinOp::Eq | BinOp::Ne => {
                if !lhs_ty.compatible(&rhs_ty) {
                    self.error_types(
                        codes::TYPE_MISMATCH,
                        "equality operands must be mutually assignable",
                        span,
                        &lhs_ty,
                        &rhs_ty,
                    );
                }
                Type::Bool
            }
            BinOp::And | BinOp::Or => {
                if lhs_ty != Type::Bool && !lhs_ty.is_failure() {
                    self.error(
                        codes::INVALID_OPERAND,
                        "logical operators require bool operands",
                        span,
                    );
                }
                if rhs_ty != Type::Bool && !rhs_ty.is_failure() {
                    self.error(
                        codes::INVALID_OPERAND,
                        "logical operators require bool operands",
                        span,
                    );
                }
                Type::Bool
            }
        }
    }

    fn check_member(&mut self, base: &Expr, field: &str, span: Option<bugc_ast::Span>) -> Type {
        let base_ty = self.check_expr(base);
        if field == "length" {
            return match &base_ty {
                Type::Array(_, _) | Type::Bytes(_) | Type::String => Type::Uint(256),
                _ if base_ty.is_failure() => Type::failure("length of error type"),
                _ => {
                    self.error(
                        codes::NO_SUCH_FIELD,
                        format!("`.length` is not valid on `{base_ty}`"),
                        span,
                    );
                    Type::failure("no such field")
                }
            };
        }
        match base_ty.struct_field(field) {
            Some((_, ty)) => ty.clone(),
            None if base_ty.is_failure() => Type::failure("member of error type"),
            None => {
                self.error(
                    codes::NO_SUCH_FIELD,
                    format!("no field `{field}` on `{base_ty}`"),
                    span,
                );
                Type::failure("no such field")
            }
        }
    }

    fn check_index(&mut self, base: &Expr, index: &Expr, span: Option<bugc_ast::Span>) -> Type {
        let base_ty = self.check_expr(base);
        let index_ty = self.check_expr(index);
        match &base_ty {
            Type::Array(elem, _) => {
                if !index_ty.is_numeric() && !index_ty.is_failure() {
                    self.error(codes::INVALID_INDEX, "array index must be numeric", span);
                }
                (**elem).clone()
            }
            Type::Mapping(key, value) => {
                if !key.compatible(&index_ty) {
                    self.error_types(
                        codes::INVALID_INDEX,
                        "mapping key does not match the declared key type",
                        span,
                        key,
                        &index_ty,
                    );
                }
                (**value).clone()
            }
            Type::Bytes(_) => {
                if !index_ty.is_numeric() && !index_ty.is_failure() {
                    self.error(codes::INVALID_INDEX, "bytes index must be numeric", span);
                }
                Type::Uint(8)
            }
            _ if base_ty.is_failure() => Type::failure("index of error type"),
            _ => {
                self.error(
                    codes::INVALID_INDEX,
                    format!("cannot index into `{base_ty}`"),
                    span,
                );
                Type::failure("invalid index")
            }
        }
    }

    fn check_slice(&mut self, base: &Expr, lo: &Expr, hi: &Expr, span: Option<bugc_ast::Span>) -> Type {
        let base_ty = self.check_expr(base);
        let lo_ty = self.check_expr(lo);
        let hi_ty = self.check_expr(hi);
        if !matches!(base_ty, Type::Bytes(_)) && !base_ty.is_failure() {
            self.error(
                codes::INVALID_SLICE,
                format!("slicing is only valid on bytes, found `{base_ty}`"),
                span,
            );
        }
        if !lo_ty.is_numeric() && !lo_ty.is_failure() {
            self.error(codes::INVALID_SLICE, "slice bounds must be numeric", span);
        }
        if !hi_ty.is_numeric() && !hi_ty.is_failure() {
            self.error(codes::INVALID_SLICE, "slice bounds must be numeric", span);
        }
        Type::Bytes(None)
    }

    fn check_call(&mut self, name: &str, args: &[Expr], span: Option<bugc_ast::Span>) -> Type {
        if name == "keccak256" {
            if args.len() != 1 {
                self.error(
                    codes::ARITY_MISMATCH,
                    "keccak256 takes exactly one argument",
                    span,
                );
                return Type::failure("arity mismatch");
            }
            let arg_ty = self.check_expr(&args[0]);
            if !arg_ty.is_bytes_like() && !arg_ty.is_failure() {
                self.error(
                    codes::INVALID_OPERAND,
                    "keccak256 requires a bytes or string argument",
                    span,
                );
            }
            return Type::Bytes(Some(32));
        }

        let Some(sig) = self.functions.get(name).cloned() else {
            for arg in args {
                self.check_expr(arg);
            }
            self.error(
                codes::UNDEFINED_FUNCTION,
                format!("undefined function `{name}`"),
                span,
            );
            return Type::failure("undefined function");
        };

        if sig.params.len() != args.len() {
            self.error(
                codes::ARITY_MISMATCH,
                format!(
                    "function `{name}` expects {} argument(s), found {}",
                    sig.params.len(),
                    args.len()
                ),
                span,
            );
        }
        for (i, arg) in args.iter().enumerate() {
            let arg_ty = self.check_expr(arg);
            if let Some(param_ty) = sig.params.get(i) {
                if !param_ty.compatible(&arg_ty) {
                    self.error_types(
                        codes::TYPE_MISMATCH,
                        format!("argument {} to `{name}` has the wrong type", i + 1),
                        arg.span,
                        param_ty,
                        &arg_ty,
                    );
                }
            }
        }
        sig.ret
            .map(|b| *b)
            .unwrap_or_else(|| Type::failure("void call result"))
    }

    fn check_cast(&mut self, inner: &Expr, ty_expr: &TypeExpr, span: Option<bugc_ast::Span>) -> Type {
        let from = self.check_expr(inner);
        let to = self.resolve_type(ty_expr, span);
        let allowed = from.is_failure()
            || to.is_failure()
            || (from.is_numeric() && to.is_numeric())
            || (from.is_numeric() && to == Type::Address)
            || (from == Type::Address && to.is_numeric())
            || (matches!(from, Type::Bytes(_)) && matches!(to, Type::Bytes(_)))
            || (matches!(from, Type::String) && matches!(to, Type::Bytes(_)))
            || (matches!(from, Type::Bytes(_)) && to.is_numeric())
            || (matches!(from, Type::Bytes(_)) && to == Type::Address);
        if !allowed {
            self.error_types(
                codes::INVALID_CAST,
                format!("cannot cast `{from}` to `{to}`"),
                span,
                &to,
                &from,
            );
            return Type::failure("invalid cast");
        }
        to
    }

    fn resolve_type(&mut self, ty: &TypeExpr, span: Option<bugc_ast::Span>) -> Type {
        match ty {
            TypeExpr::Bool => Type::Bool,
            TypeExpr::Uint(bits) => Type::Uint(*bits),
            TypeExpr::Int(bits) => Type::Int(*bits),
            TypeExpr::Address => Type::Address,
            TypeExpr::Bytes(n) => Type::Bytes(n.map(|n| n as u8)),
            TypeExpr::String => Type::String,
            TypeExpr::Array(elem, len) => {
                Type::Array(Box::new(self.resolve_type(elem, span)), *len)
            }
            TypeExpr::Mapping(key, value) => Type::Mapping(
                Box::new(self.resolve_type(key, span)),
                Box::new(self.resolve_type(value, span)),
            ),
            TypeExpr::Named(name) => match self.structs.get(name) {
                Some(s) => Type::Struct(s.clone()),
                None => {
                    self.error(
                        codes::UNKNOWN_STRUCT,
                        format!("unknown type `{name}`"),
                        span,
                    );
                    Type::failure("unknown struct")
                }
            },
        }
    }

    fn error(&mut self, code: bugc_diagnostics::Code, message: impl Into<String>, span: Option<bugc_ast::Span>) {
        let mut diag = Diagnostic::error(code, message);
        if let Some(span) = span {
            diag = diag.with_location(span);
        }
        self.diagnostics.push(diag);
    }

    fn error_types(
        &mut self,
        code: bugc_diagnostics::Code,
        message: impl Into<String>,
        span: Option<bugc_ast::Span>,
        expected: &Type,
        actual: &Type,
    ) {
        let mut diag = Diagnostic::error(code, message).with_types(expected.to_string(), actual.to_string());
        if let Some(span) = span {
            diag = diag.with_location(span);
        }
        self.diagnostics.push(diag);
    }
}

fn is_assignable_expr(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Ident(_) | ExprKind::Index(_, _) | ExprKind::Slice(_, _, _) | ExprKind::Member(_, _)
    )
}

fn check_special(special: SpecialExpr) -> Type {
    match special {
        SpecialExpr::MsgSender => Type::Address,
        SpecialExpr::MsgValue => Type::Uint(256),
        SpecialExpr::MsgData => Type::Bytes(None),
        SpecialExpr::BlockTimestamp => Type::Uint(256),
        SpecialExpr::BlockNumber => Type::Uint(256),
    }
}
