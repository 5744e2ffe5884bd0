use crate::back::context::{AsmContext, AsmSymbol};
use crate::back::expr_asm::{emit_array_addr, full_rank};
use crate::back::insts::{Instruction, Reg};
use crate::back::value::{load_to_reg, store_base};
use crate::back::GenerateAsm;
use crate::front::ast::*;
use crate::CompilerError;

pub fn generate_block_asm(block: &Block, ctx: &mut AsmContext) -> Result<(), CompilerError> {
    ctx.push_scope();
    for item in block {
        match item {
            BlockItem::Decl(decl) => decl.generate_asm(ctx)?,
            BlockItem::Stmt(stmt) => stmt.generate_asm(ctx)?,
        }
    }
    ctx.pop_scope()
}

/// return：返回值装入 a0，跳到共享的收尾标号
/// 后记只在收尾处展开一次
pub fn generate_return_stmt_asm(
    expr: &Option<Expr>,
    ctx: &mut AsmContext,
) -> Result<(), CompilerError> {
    if let Some(expr) = expr {
        let val = expr.generate_asm(ctx)?;
        load_to_reg(ctx, &val, Reg::A0);
    }
    let target = ctx.return_label.clone();
    ctx.emit(Instruction::J(target));
    Ok(())
}

pub fn generate_assign_stmt_asm(
    lval: &LVal,
    expr: &Expr,
    ctx: &mut AsmContext,
) -> Result<(), CompilerError> {
    let val = expr.generate_asm(ctx)?;
    let sym = ctx.lookup(&lval.name).cloned().ok_or_else(|| {
        ctx.error_at_span(format!("Variable `{}` not found", lval.name), lval.span)
    })?;
    match &sym {
        AsmSymbol::Const(_) => Err(ctx.error_at_span(
            format!("Cannot assign to constant `{}`", lval.name),
            lval.span,
        )),
        AsmSymbol::Slot { offset } => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span("Indexed access on non-array variable", lval.span));
            }
            let offset = *offset;
            load_to_reg(ctx, &val, Reg::T0);
            store_base(&mut ctx.body, Reg::T0, Reg::S0, offset);
            Ok(())
        }
        AsmSymbol::Global { label } => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span("Indexed access on non-array variable", lval.span));
            }
            load_to_reg(ctx, &val, Reg::T0);
            ctx.emit(Instruction::La(Reg::T2, label.clone()));
            ctx.emit(Instruction::Sw(Reg::T0, 0, Reg::T2));
            Ok(())
        }
        AsmSymbol::Array { .. } | AsmSymbol::GlobalArray { .. } | AsmSymbol::ParamPtr { .. } => {
            if lval.indices.len() != full_rank(&sym) {
                return Err(ctx.error_at_span(
                    "Array assignment requires the full index list",
                    lval.span,
                ));
            }
            let mut idx_vals = Vec::with_capacity(lval.indices.len());
            for idx in &lval.indices {
                idx_vals.push(idx.generate_asm(ctx)?);
            }
            // 待存值提前进 t5，地址计算不碰它
            load_to_reg(ctx, &val, Reg::T5);
            emit_array_addr(ctx, &sym, &idx_vals)?;
            ctx.emit(Instruction::Sw(Reg::T5, 0, Reg::T0));
            Ok(())
        }
    }
}

pub fn generate_expr_stmt_asm(
    expr: &Option<Expr>,
    ctx: &mut AsmContext,
) -> Result<(), CompilerError> {
    if let Some(expr) = expr {
        expr.generate_asm(ctx)?;
    }
    Ok(())
}

pub fn generate_if_stmt_asm(
    cond: &Expr,
    then_stmt: &Stmt,
    else_stmt: Option<&Stmt>,
    ctx: &mut AsmContext,
) -> Result<(), CompilerError> {
    let then_label = ctx.new_label("then");
    let end_label = ctx.new_label("end");
    match else_stmt {
        Some(else_stmt) => {
            let else_label = ctx.new_label("else");
            let cond_val = cond.generate_asm(ctx)?;
            load_to_reg(ctx, &cond_val, Reg::T0);
            ctx.emit(Instruction::Beqz(Reg::T0, else_label.clone()));
            ctx.emit_label(&then_label);
            then_stmt.generate_asm(ctx)?;
            if !then_stmt.is_terminator() {
                ctx.emit(Instruction::J(end_label.clone()));
            }
            ctx.emit_label(&else_label);
            else_stmt.generate_asm(ctx)?;
            if !else_stmt.is_terminator() {
                ctx.emit(Instruction::J(end_label.clone()));
            }
            ctx.emit_label(&end_label);
        }
        None => {
            let cond_val = cond.generate_asm(ctx)?;
            load_to_reg(ctx, &cond_val, Reg::T0);
            ctx.emit(Instruction::Beqz(Reg::T0, end_label.clone()));
            ctx.emit_label(&then_label);
            then_stmt.generate_asm(ctx)?;
            ctx.emit_label(&end_label);
        }
    }
    Ok(())
}

pub fn generate_while_stmt_asm(
    cond: &Expr,
    body: &Stmt,
    ctx: &mut AsmContext,
) -> Result<(), CompilerError> {
    let cond_label = ctx.new_label("while_cond");
    let body_label = ctx.new_label("while_body");
    let end_label = ctx.new_label("while_end");
    ctx.emit(Instruction::J(cond_label.clone()));
    ctx.emit_label(&cond_label);
    let cond_val = cond.generate_asm(ctx)?;
    load_to_reg(ctx, &cond_val, Reg::T0);
    ctx.emit(Instruction::Beqz(Reg::T0, end_label.clone()));
    ctx.emit_label(&body_label);
    ctx.break_labels.push(end_label.clone());
    ctx.continue_labels.push(cond_label.clone());
    body.generate_asm(ctx)?;
    ctx.break_labels.pop();
    ctx.continue_labels.pop();
    if !body.is_terminator() {
        ctx.emit(Instruction::J(cond_label));
    }
    ctx.emit_label(&end_label);
    Ok(())
}

pub fn generate_break_stmt_asm(span: Span, ctx: &mut AsmContext) -> Result<(), CompilerError> {
    let target = ctx
        .break_labels
        .last()
        .cloned()
        .ok_or_else(|| ctx.error_at_span("break used outside of loop", span))?;
    ctx.emit(Instruction::J(target));
    Ok(())
}

pub fn generate_continue_stmt_asm(span: Span, ctx: &mut AsmContext) -> Result<(), CompilerError> {
    let target = ctx
        .continue_labels
        .last()
        .cloned()
        .ok_or_else(|| ctx.error_at_span("continue used outside of loop", span))?;
    ctx.emit(Instruction::J(target));
    Ok(())
}
