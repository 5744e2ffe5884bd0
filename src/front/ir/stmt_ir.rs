use crate::front::ast::*;
use crate::front::ir::context::{IrContext, VoidMode};
use crate::front::ir::expr_ir::{gen_to_bool, get_assign_ptr};
use crate::front::ir::GenerateIr;
use crate::CompilerError;

/// 依次生成块内条目
///
/// 终结语句之后的代码属于新的基本块，用 needs-label 标记
/// 在下一个条目前补发 `%bb_n` 标号。
pub fn generate_block_ir(block: &Block, ctx: &mut IrContext) -> Result<(), CompilerError> {
    ctx.push_scope();
    let mut need_label = false;
    for item in block {
        if need_label {
            let label = ctx.new_label("bb");
            ctx.emit_label(&label);
            need_label = false;
        }
        match item {
            BlockItem::Decl(decl) => decl.generate_ir(ctx)?,
            BlockItem::Stmt(stmt) => {
                stmt.generate_ir(ctx)?;
                if stmt.is_terminator() {
                    need_label = true;
                }
            }
        }
    }
    ctx.pop_scope()
}

pub fn generate_return_stmt_ir(
    expr: &Option<Expr>,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    match expr {
        Some(expr) => {
            let val = expr.generate_ir(ctx)?;
            ctx.emit(&format!("ret {}", val));
        }
        None => {
            if ctx.current_func_is_void && ctx.void_mode == VoidMode::VoidAsI32 {
                ctx.emit("ret 0");
            } else {
                ctx.emit("ret");
            }
        }
    }
    Ok(())
}

pub fn generate_assign_stmt_ir(
    lval: &LVal,
    expr: &Expr,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    let ptr = get_assign_ptr(lval, ctx)?;
    let val = expr.generate_ir(ctx)?;
    ctx.emit(&format!("store {}, {}", val, ptr));
    Ok(())
}

pub fn generate_expr_stmt_ir(
    expr: &Option<Expr>,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    if let Some(expr) = expr {
        expr.generate_ir(ctx)?;
    }
    Ok(())
}

pub fn generate_if_stmt_ir(
    cond: &Expr,
    then_stmt: &Stmt,
    else_stmt: Option<&Stmt>,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    let then_label = ctx.new_label("then");
    let end_label = ctx.new_label("end");
    let then_term = then_stmt.is_terminator();
    match else_stmt {
        Some(else_stmt) => {
            let else_term = else_stmt.is_terminator();
            let else_label = ctx.new_label("else");
            let cond_val = cond.generate_ir(ctx)?;
            let cond_bool = gen_to_bool(ctx, &cond_val);
            ctx.emit(&format!("br {}, {}, {}", cond_bool, then_label, else_label));
            ctx.emit_label(&then_label);
            then_stmt.generate_ir(ctx)?;
            if !then_term {
                ctx.emit(&format!("jump {}", end_label));
            }
            ctx.emit_label(&else_label);
            else_stmt.generate_ir(ctx)?;
            if !else_term {
                ctx.emit(&format!("jump {}", end_label));
            }
            // 两个分支都终结时没有汇合块
            if !then_term || !else_term {
                ctx.emit_label(&end_label);
            }
        }
        None => {
            let cond_val = cond.generate_ir(ctx)?;
            let cond_bool = gen_to_bool(ctx, &cond_val);
            ctx.emit(&format!("br {}, {}, {}", cond_bool, then_label, end_label));
            ctx.emit_label(&then_label);
            then_stmt.generate_ir(ctx)?;
            if !then_term {
                ctx.emit(&format!("jump {}", end_label));
            }
            ctx.emit_label(&end_label);
        }
    }
    Ok(())
}

pub fn generate_while_stmt_ir(
    cond: &Expr,
    body: &Stmt,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    let cond_label = ctx.new_label("while_cond");
    let body_label = ctx.new_label("while_body");
    let end_label = ctx.new_label("while_end");
    ctx.emit(&format!("jump {}", cond_label));
    ctx.emit_label(&cond_label);
    let cond_val = cond.generate_ir(ctx)?;
    let cond_bool = gen_to_bool(ctx, &cond_val);
    ctx.emit(&format!("br {}, {}, {}", cond_bool, body_label, end_label));
    ctx.emit_label(&body_label);
    ctx.break_labels.push(end_label.clone());
    ctx.continue_labels.push(cond_label.clone());
    body.generate_ir(ctx)?;
    ctx.break_labels.pop();
    ctx.continue_labels.pop();
    if !body.is_terminator() {
        ctx.emit(&format!("jump {}", cond_label));
    }
    ctx.emit_label(&end_label);
    Ok(())
}

pub fn generate_break_stmt_ir(span: Span, ctx: &mut IrContext) -> Result<(), CompilerError> {
    let target = ctx
        .break_labels
        .last()
        .cloned()
        .ok_or_else(|| ctx.error_at_span("break used outside of loop", span))?;
    ctx.emit(&format!("jump {}", target));
    Ok(())
}

pub fn generate_continue_stmt_ir(span: Span, ctx: &mut IrContext) -> Result<(), CompilerError> {
    let target = ctx
        .continue_labels
        .last()
        .cloned()
        .ok_or_else(|| ctx.error_at_span("continue used outside of loop", span))?;
    ctx.emit(&format!("jump {}", target));
    Ok(())
}
