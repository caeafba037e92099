//! Statement lowering (spec.md §4.2): `If`/`For` allocate the block shapes
//! scenario 6 requires (a loop header reachable from both the preheader and
//! the latch, so C6 places a real phi there); `break` jumps to the nearest
//! enclosing loop's exit via `Builder::loop_stack`.

use crate::builder::{Binding, Builder, LoopCx};
use crate::codes;
use crate::lower_expr::{is_composite, lower_expr, resolve_addr, write_addr};
use bugc_ast::{Block, Expr, ExprKind, SpecialExpr, Stmt, StmtKind};
use bugc_ir::{Instr, Terminator};

fn node_ty(b: &Builder, expr: &Expr) -> bugc_types::Type {
    b.checked
        .node_types
        .get(&expr.id)
        .cloned()
        .expect("checker recorded a type for every expression node")
}

pub(crate) fn lower_block(b: &mut Builder, block: &Block) {
    for stmt in &block.stmts {
        lower_stmt(b, stmt);
    }
}

pub(crate) fn lower_stmt(b: &mut Builder, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Let { name, init } => lower_let(b, name, init),
        StmtKind::Assign { target, value } => {
            if let ExprKind::Slice(_, _, _) = &target.kind {
                b.error(
                    codes::UNSUPPORTED_VALUE_PATTERN,
                    "assigning into a byte slice is not supported",
                    target.span,
                );
                return;
            }
            // Left-to-right: the target's own sub-expressions (e.g. an
            // index) are evaluated before the value, matching the checker's
            // traversal order.
            let addr = resolve_addr(b, target);
            let value = lower_expr(b, value);
            write_addr(b, addr, value);
        }
        StmtKind::If { cond, then_branch, else_branch } => {
            let cond_v = lower_expr(b, cond);
            let then_label = b.fresh_block();
            let else_label = b.fresh_block();
            let merge_label = b.fresh_block();
            b.terminate(Terminator::Branch { cond: cond_v, if_true: then_label, if_false: else_label });

            b.switch_to(then_label);
            b.push_scope();
            lower_block(b, then_branch);
            b.pop_scope();
            b.terminate(Terminator::Jump(merge_label));

            b.switch_to(else_label);
            b.push_scope();
            if let Some(else_block) = else_branch {
                lower_block(b, else_block);
            }
            b.pop_scope();
            b.terminate(Terminator::Jump(merge_label));

            b.switch_to(merge_label);
        }
        StmtKind::For { init, cond, update, body } => {
            b.push_scope();
            lower_stmt(b, init);

            let header = b.fresh_block();
            let body_label = b.fresh_block();
            let latch = b.fresh_block();
            let exit = b.fresh_block();

            b.terminate(Terminator::Jump(header));

            b.switch_to(header);
            let cond_v = lower_expr(b, cond);
            b.terminate(Terminator::Branch { cond: cond_v, if_true: body_label, if_false: exit });

            b.switch_to(body_label);
            b.loop_stack.push(LoopCx { exit });
            b.push_scope();
            lower_block(b, body);
            b.pop_scope();
            b.loop_stack.pop();
            b.terminate(Terminator::Jump(latch));

            b.switch_to(latch);
            lower_stmt(b, update);
            b.terminate(Terminator::Jump(header));

            b.switch_to(exit);
            b.pop_scope();
        }
        StmtKind::Return(value) => {
            let value = value.as_ref().map(|e| lower_expr(b, e));
            b.terminate(Terminator::Return(value));
        }
        StmtKind::Break => {
            let exit = b
                .loop_stack
                .last()
                .expect("checker rejects `break` outside a loop")
                .exit;
            b.terminate(Terminator::Jump(exit));
        }
        StmtKind::Expr(expr) => {
            lower_expr(b, expr);
        }
    }
}

fn lower_let(b: &mut Builder, name: &str, init: &Expr) {
    if matches!(init.kind, ExprKind::Special(SpecialExpr::MsgData)) {
        b.define_alias(name, bugc_ir::Value::CallData);
        return;
    }

    let ty = node_ty(b, init);
    if is_composite(&ty) {
        if let ExprKind::Ident(src_name) = &init.kind {
            if let Some(Binding::Local(src_id)) = b.lookup_local(src_name) {
                b.bind_alias_local(name, src_id);
                return;
            }
        }
        b.error(
            codes::UNSUPPORTED_VALUE_PATTERN,
            format!("cannot bind `{name}` of composite type `{ty}` from this expression"),
            init.span,
        );
        b.define_local(name, ty);
        return;
    }

    let value = lower_expr(b, init);
    let local = b.define_local(name, ty);
    b.emit(Instr::StoreLocal { local, value });
}
