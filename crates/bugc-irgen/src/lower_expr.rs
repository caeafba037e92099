//! Expression lowering (spec.md §4.2): walks an `Expr`, emitting instructions
//! into the builder's current block and returning the `Value` it computes.
//!
//! `Member`/`Index` access chains go through [`resolve_addr`], which threads
//! a single [`Addr`] representation through both read (here) and write
//! (`lower_stmt`'s `Assign` handling) so the two sides can't drift apart.

use crate::builder::{Binding, Builder};
use crate::codes;
use alloy_primitives::U256;
use bugc_ast::{BinOp as AstBinOp, Expr, ExprKind, SpecialExpr, UnOp as AstUnOp};
use bugc_check::SymbolKind;
use bugc_ir::{BinOp, ConstValue, EnvOp, Instr, UnOp, Value};
use bugc_types::Type;

/// Struct and fixed-size-array values live in memory as multi-word blocks
/// and are never held in a single `Temp`; every other type fits in one EVM
/// word (the dynamic-length types via the pointer convention, spec.md §3.1).
pub(crate) fn is_composite(ty: &Type) -> bool {
    matches!(ty, Type::Struct(_) | Type::Array(_, Some(_)))
}

fn node_ty(b: &Builder, expr: &Expr) -> Type {
    b.checked
        .node_types
        .get(&expr.id)
        .cloned()
        .expect("checker recorded a type for every expression node")
}

fn const_u256(n: u64) -> Value {
    Value::Const(ConstValue::Uint(U256::from(n)), Type::Uint(256))
}

fn dummy_value() -> Value {
    Value::Const(ConstValue::Uint(U256::ZERO), Type::failure("unsupported pattern"))
}

fn to_binop(op: AstBinOp) -> BinOp {
    match op {
        AstBinOp::Add => BinOp::Add,
        AstBinOp::Sub => BinOp::Sub,
        AstBinOp::Mul => BinOp::Mul,
        AstBinOp::Div => BinOp::Div,
        AstBinOp::Mod => BinOp::Mod,
        AstBinOp::Eq => BinOp::Eq,
        AstBinOp::Ne => BinOp::Ne,
        AstBinOp::Lt => BinOp::Lt,
        AstBinOp::Le => BinOp::Le,
        AstBinOp::Gt => BinOp::Gt,
        AstBinOp::Ge => BinOp::Ge,
        AstBinOp::And => BinOp::And,
        AstBinOp::Or => BinOp::Or,
    }
}

fn to_unop(op: AstUnOp) -> UnOp {
    match op {
        AstUnOp::Not => UnOp::Not,
        AstUnOp::Neg => UnOp::Neg,
    }
}

/// An addressable location reached while walking a `Member`/`Index` chain.
/// `Storage` carries a computed slot `Value` (word-granularity); `MemField`/
/// `MemIndex` carry a memory base `Value` (byte-granularity, via
/// `FieldAddr`/`IndexAddr` for anything past the first level).
pub(crate) enum Addr {
    Local(bugc_ir::LocalId, Type),
    Storage { slot: Value, ty: Type },
    MemField { base: Value, field_index: usize, ty: Type },
    MemIndex { base: Value, index: Value, ty: Type },
}

fn addr_type(addr: &Addr) -> Type {
    match addr {
        Addr::Local(_, ty) => ty.clone(),
        Addr::Storage { ty, .. } => ty.clone(),
        Addr::MemField { ty, .. } => ty.clone(),
        Addr::MemIndex { ty, .. } => ty.clone(),
    }
}

/// The memory address a nested `Member`/`Index` step should use as its
/// `base`. Only valid for composite locations — descending through a
/// dynamic-length (pointer-convention) value is out of scope (see
/// `SPEC_FULL.md`'s storage/memory layout notes) and is reported instead.
fn addr_pointer(b: &mut Builder, addr: Addr, span: Option<bugc_ast::Span>) -> Value {
    let ty = addr_type(&addr);
    if !is_composite(&ty) {
        b.error(
            codes::UNSUPPORTED_VALUE_PATTERN,
            format!("cannot access a field or element through `{ty}`"),
            span,
        );
        return dummy_value();
    }
    match addr {
        Addr::Local(id, ty) => Value::Local(id, ty),
        Addr::MemField { base, field_index, ty } => {
            let dest = b.fresh_temp();
            b.emit(Instr::FieldAddr { dest, base, field_index });
            Value::Temp(dest, ty)
        }
        Addr::MemIndex { base, index, ty } => {
            let dest = b.fresh_temp();
            b.emit(Instr::IndexAddr { dest, base, index });
            Value::Temp(dest, ty)
        }
        Addr::Storage { .. } => unreachable!("storage chains never materialize a memory pointer"),
    }
}

fn struct_field_addr<'t>(ty: &'t Type, field: &str) -> Option<(usize, &'t Type)> {
    ty.struct_field(field)
}

/// Resolves the base of a `Member`/`Index`/bare identifier access chain to
/// an [`Addr`], recursing through nested composite accesses.
pub(crate) fn resolve_addr(b: &mut Builder, expr: &Expr) -> Addr {
    match &expr.kind {
        ExprKind::Ident(name) => match b.lookup_local(name) {
            Some(Binding::Local(id)) => Addr::Local(id, b.local_type(id)),
            Some(Binding::Alias(_)) => {
                b.error(
                    codes::UNSUPPORTED_VALUE_PATTERN,
                    format!("`{name}` has no addressable location"),
                    expr.span,
                );
                Addr::Storage { slot: const_u256(0), ty: Type::failure("not addressable") }
            }
            None => match b.checked.symbols.root_scope().get(name) {
                Some(sym) => match sym.kind {
                    SymbolKind::Storage { slot } => {
                        Addr::Storage { slot: const_u256(slot), ty: sym.ty.clone() }
                    }
                    SymbolKind::Local => unreachable!("root scope holds only storage symbols"),
                },
                None => {
                    b.error(codes::UNKNOWN_IDENTIFIER, format!("unknown identifier `{name}`"), expr.span);
                    Addr::Storage { slot: const_u256(0), ty: Type::failure("unknown identifier") }
                }
            },
        },
        ExprKind::Member(base, field) => {
            if field == "length" {
                b.error(
                    codes::UNSUPPORTED_VALUE_PATTERN,
                    "`.length` is not an assignable location",
                    expr.span,
                );
                return Addr::Storage { slot: const_u256(0), ty: Type::failure("length is read-only") };
            }
            let inner = resolve_addr(b, base);
            match inner {
                Addr::Storage { slot, ty } => match struct_field_addr(&ty, field) {
                    Some((idx, field_ty)) => {
                        let field_ty = field_ty.clone();
                        let dest = b.fresh_temp();
                        b.emit(Instr::ComputeFieldOffset { dest, base: slot, field_index: idx });
                        Addr::Storage { slot: Value::Temp(dest, Type::Uint(256)), ty: field_ty }
                    }
                    None => {
                        b.error(codes::UNSUPPORTED_STORAGE_PATTERN, format!("no field `{field}` on `{ty}`"), expr.span);
                        Addr::Storage { slot, ty: Type::failure("no such field") }
                    }
                },
                other => {
                    let base_ty = addr_type(&other);
                    match struct_field_addr(&base_ty, field) {
                        Some((idx, field_ty)) => {
                            let field_ty = field_ty.clone();
                            let base_ptr = addr_pointer(b, other, expr.span);
                            Addr::MemField { base: base_ptr, field_index: idx, ty: field_ty }
                        }
                        None => {
                            b.error(codes::UNSUPPORTED_VALUE_PATTERN, format!("no field `{field}` on `{base_ty}`"), expr.span);
                            Addr::MemField { base: dummy_value(), field_index: 0, ty: Type::failure("no such field") }
                        }
                    }
                }
            }
        }
        ExprKind::Index(base, index_expr) => {
            let inner = resolve_addr(b, base);
            match inner {
                Addr::Storage { slot, ty } => match &ty {
                    Type::Array(elem, Some(_)) => {
                        let idx_val = lower_expr(b, index_expr);
                        let dest = b.fresh_temp();
                        b.emit(Instr::ComputeIndexSlot { dest, base: slot, index: idx_val });
                        Addr::Storage { slot: Value::Temp(dest, Type::Uint(256)), ty: (**elem).clone() }
                    }
                    Type::Array(elem, None) => {
                        let arr_base = b.fresh_temp();
                        b.emit(Instr::ComputeArraySlot { dest: arr_base, base: slot });
                        let idx_val = lower_expr(b, index_expr);
                        let dest = b.fresh_temp();
                        b.emit(Instr::ComputeIndexSlot {
                            dest,
                            base: Value::Temp(arr_base, Type::Uint(256)),
                            index: idx_val,
                        });
                        Addr::Storage { slot: Value::Temp(dest, Type::Uint(256)), ty: (**elem).clone() }
                    }
                    Type::Mapping(key_ty, value_ty) => {
                        let key_ty = (**key_ty).clone();
                        let value_ty = (**value_ty).clone();
                        let key_val = lower_expr(b, index_expr);
                        let dest = b.fresh_temp();
                        b.emit(Instr::ComputeSlot { dest, base: slot, key: key_val, key_ty });
                        Addr::Storage { slot: Value::Temp(dest, Type::Uint(256)), ty: value_ty }
                    }
                    _ => {
                        b.error(
                            codes::UNSUPPORTED_STORAGE_PATTERN,
                            format!("indexing into storage-resident `{ty}` is not supported"),
                            expr.span,
                        );
                        Addr::Storage { slot, ty: Type::failure("unsupported storage index") }
                    }
                },
                other => {
                    let base_ty = addr_type(&other);
                    match &base_ty {
                        Type::Array(elem, Some(_)) => {
                            let elem_ty = (**elem).clone();
                            let idx_val = lower_expr(b, index_expr);
                            let base_ptr = addr_pointer(b, other, expr.span);
                            Addr::MemIndex { base: base_ptr, index: idx_val, ty: elem_ty }
                        }
                        _ => {
                            b.error(
                                codes::UNSUPPORTED_VALUE_PATTERN,
                                format!("indexing into `{base_ty}` outside storage is not supported"),
                                expr.span,
                            );
                            Addr::MemIndex { base: dummy_value(), index: dummy_value(), ty: Type::failure("unsupported index") }
                        }
                    }
                }
            }
        }
        _ => {
            b.error(codes::UNSUPPORTED_VALUE_PATTERN, "not an addressable location", expr.span);
            Addr::Storage { slot: const_u256(0), ty: Type::failure("not addressable") }
        }
    }
}

fn read_addr(b: &mut Builder, addr: Addr) -> Value {
    match addr {
        Addr::Local(id, ty) => {
            if is_composite(&ty) {
                Value::Local(id, ty)
            } else {
                let dest = b.fresh_temp();
                b.emit(Instr::LoadLocal { dest, local: id });
                Value::Temp(dest, ty)
            }
        }
        Addr::Storage { slot, ty } => {
            if is_composite(&ty) {
                // A well-typed chain never stops on a bare composite; this
                // only arises after an already-reported error above.
                dummy_value()
            } else {
                let dest = b.fresh_temp();
                b.emit(Instr::LoadStorage { dest, slot, ty: ty.clone() });
                Value::Temp(dest, ty)
            }
        }
        Addr::MemField { base, field_index, ty } => {
            if is_composite(&ty) {
                let dest = b.fresh_temp();
                b.emit(Instr::FieldAddr { dest, base, field_index });
                Value::Temp(dest, ty)
            } else {
                let dest = b.fresh_temp();
                b.emit(Instr::LoadField { dest, base, field_index, ty: ty.clone() });
                Value::Temp(dest, ty)
            }
        }
        Addr::MemIndex { base, index, ty } => {
            if is_composite(&ty) {
                let dest = b.fresh_temp();
                b.emit(Instr::IndexAddr { dest, base, index });
                Value::Temp(dest, ty)
            } else {
                let dest = b.fresh_temp();
                b.emit(Instr::LoadIndex { dest, base, index, ty: ty.clone() });
                Value::Temp(dest, ty)
            }
        }
    }
}

/// Emits the store half of an access chain; used by `lower_stmt`'s `Assign`.
pub(crate) fn write_addr(b: &mut Builder, addr: Addr, value: Value) {
    match addr {
        Addr::Local(local, _) => b.emit(Instr::StoreLocal { local, value }),
        Addr::Storage { slot, .. } => b.emit(Instr::StoreStorage { slot, value }),
        Addr::MemField { base, field_index, .. } => b.emit(Instr::StoreField { base, field_index, value }),
        Addr::MemIndex { base, index, .. } => b.emit(Instr::StoreIndex { base, index, value }),
    }
}

fn lower_ident(b: &mut Builder, name: &str, expr: &Expr) -> Value {
    match b.lookup_local(name) {
        Some(Binding::Local(id)) => {
            let ty = b.local_type(id);
            if is_composite(&ty) {
                Value::Local(id, ty)
            } else {
                let dest = b.fresh_temp();
                b.emit(Instr::LoadLocal { dest, local: id });
                Value::Temp(dest, ty)
            }
        }
        Some(Binding::Alias(value)) => value,
        None => match b.checked.symbols.root_scope().get(name) {
            Some(sym) => {
                let ty = sym.ty.clone();
                let SymbolKind::Storage { slot } = sym.kind else {
                    unreachable!("root scope holds only storage symbols")
                };
                if is_composite(&ty) {
                    b.error(
                        codes::UNSUPPORTED_VALUE_PATTERN,
                        format!("storage variable `{name}` of composite type `{ty}` cannot be used as a value directly"),
                        expr.span,
                    );
                    dummy_value()
                } else {
                    let dest = b.fresh_temp();
                    b.emit(Instr::LoadStorage { dest, slot: const_u256(slot), ty: ty.clone() });
                    Value::Temp(dest, ty)
                }
            }
            None => {
                b.error(codes::UNKNOWN_IDENTIFIER, format!("unknown identifier `{name}`"), expr.span);
                dummy_value()
            }
        },
    }
}

fn env(b: &mut Builder, op: EnvOp, ty: Type) -> Value {
    let dest = b.fresh_temp();
    b.emit(Instr::Env { dest, op });
    Value::Temp(dest, ty)
}

fn lower_special(b: &mut Builder, special: SpecialExpr) -> Value {
    match special {
        SpecialExpr::MsgSender => env(b, EnvOp::MsgSender, Type::Address),
        SpecialExpr::MsgValue => env(b, EnvOp::MsgValue, Type::Uint(256)),
        SpecialExpr::BlockTimestamp => env(b, EnvOp::BlockTimestamp, Type::Uint(256)),
        SpecialExpr::BlockNumber => env(b, EnvOp::BlockNumber, Type::Uint(256)),
        // `msg.data` has no 32-byte representation; it's only ever consumed
        // by `Length`/`Slice`, which codegen lowers to CALLDATASIZE/CALLDATACOPY.
        SpecialExpr::MsgData => Value::CallData,
    }
}

fn lower_call(b: &mut Builder, name: &str, args: &[Expr], expr: &Expr) -> Value {
    if name == "keccak256" {
        let arg = args.first().map(|a| lower_expr(b, a)).unwrap_or_else(dummy_value);
        let dest = b.fresh_temp();
        b.emit(Instr::Hash { dest, value: arg });
        return Value::Temp(dest, Type::Bytes(Some(32)));
    }

    let ret_ty = node_ty(b, expr);
    let arg_values: Vec<Value> = args.iter().map(|a| lower_expr(b, a)).collect();
    let sig = b.checked.functions.get(name).cloned();
    let returns_value = sig.as_ref().map(|f| f.ret.is_some()).unwrap_or(false);

    if returns_value && is_composite(&ret_ty) {
        b.error(
            codes::UNSUPPORTED_VALUE_PATTERN,
            format!("function `{name}` returning `{ret_ty}` by value is not supported"),
            expr.span,
        );
    }

    let dest = if returns_value && !is_composite(&ret_ty) { Some(b.fresh_temp()) } else { None };
    b.emit(Instr::Call {
        dest,
        name: name.to_string(),
        args: arg_values,
        ty: if returns_value { Some(ret_ty.clone()) } else { None },
    });
    match dest {
        Some(d) => Value::Temp(d, ret_ty),
        None => Value::Const(ConstValue::Bool(false), Type::Bool),
    }
}

pub(crate) fn lower_expr(b: &mut Builder, expr: &Expr) -> Value {
    match &expr.kind {
        ExprKind::Ident(name) => lower_ident(b, name, expr),
        ExprKind::Number(n) => Value::Const(ConstValue::Uint(*n), node_ty(b, expr)),
        ExprKind::Bool(v) => Value::Const(ConstValue::Bool(*v), Type::Bool),
        ExprKind::Str(s) => Value::Const(ConstValue::Str(s.clone()), Type::String),
        ExprKind::Hex(bytes) => Value::Const(ConstValue::Bytes(bytes.clone()), node_ty(b, expr)),
        ExprKind::Address(addr) => Value::Const(ConstValue::Address(*addr), Type::Address),
        ExprKind::Unary(op, inner) => {
            let value = lower_expr(b, inner);
            let dest = b.fresh_temp();
            b.emit(Instr::Unary { dest, op: to_unop(*op), operand: value });
            Value::Temp(dest, node_ty(b, expr))
        }
        ExprKind::Binary(op, lhs, rhs) => {
            let left = lower_expr(b, lhs);
            let right = lower_expr(b, rhs);
            let dest = b.fresh_temp();
            b.emit(Instr::Binary { dest, op: to_binop(*op), left, right });
            Value::Temp(dest, node_ty(b, expr))
        }
        ExprKind::Member(base, field) if field == "length" => {
            let value = lower_expr(b, base);
            let dest = b.fresh_temp();
            b.emit(Instr::Length { dest, value });
            Value::Temp(dest, Type::Uint(256))
        }
        ExprKind::Member(_, _) | ExprKind::Index(_, _) => {
            let addr = resolve_addr(b, expr);
            read_addr(b, addr)
        }
        ExprKind::Slice(base, lo, hi) => {
            let value = lower_expr(b, base);
            let lo = lower_expr(b, lo);
            let hi = lower_expr(b, hi);
            let dest = b.fresh_temp();
            b.emit(Instr::Slice { dest, value, lo, hi });
            Value::Temp(dest, Type::Bytes(None))
        }
        ExprKind::Call(name, args) => lower_call(b, name, args, expr),
        ExprKind::Cast(inner, _) => {
            let value = lower_expr(b, inner);
            let ty = node_ty(b, expr);
            let dest = b.fresh_temp();
            b.emit(Instr::Cast { dest, value, ty: ty.clone() });
            Value::Temp(dest, ty)
        }
        ExprKind::Special(special) => lower_special(b, *special),
    }
}
