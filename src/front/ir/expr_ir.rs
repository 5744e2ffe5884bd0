use crate::front::ast::*;
use crate::front::ir::context::{IrContext, IrSymbol, VoidMode};
use crate::front::ir::{is_library_func, GenerateIr};
use crate::CompilerError;

/// 条件值布尔化：`ne x, 0`
pub fn gen_to_bool(ctx: &mut IrContext, val: &str) -> String {
    let tmp = ctx.new_temp();
    ctx.emit(&format!("{} = ne {}, 0", tmp, val));
    tmp
}

/// 数组符号的完整秩；数组指针形参的首维是隐含的
pub fn full_rank(sym: &IrSymbol) -> usize {
    match sym {
        IrSymbol::Array { dims, .. } => dims.len(),
        IrSymbol::ParamPtr { dims, .. } => dims.len() + 1,
        _ => 0,
    }
}

/// 按索引列表构造指针链
///
/// 数组指针形参第一维用 `getptr`，其余用 `getelemptr`；
/// 本地/全局数组不带索引时退化为 `getelemptr p, 0`（传参用）。
pub fn build_lval_ptr(
    lval: &LVal,
    sym: &IrSymbol,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let mut idx_vals = Vec::with_capacity(lval.indices.len());
    for idx in &lval.indices {
        idx_vals.push(idx.generate_ir(ctx)?);
    }
    match sym {
        IrSymbol::ParamPtr { ir_name, .. } => {
            if idx_vals.is_empty() {
                return Ok(ir_name.clone());
            }
            let mut ptr = ctx.new_temp();
            ctx.emit(&format!("{} = getptr {}, {}", ptr, ir_name, idx_vals[0]));
            for idx in &idx_vals[1..] {
                let next = ctx.new_temp();
                ctx.emit(&format!("{} = getelemptr {}, {}", next, ptr, idx));
                ptr = next;
            }
            Ok(ptr)
        }
        IrSymbol::Array { ir_name, .. } => {
            if idx_vals.is_empty() {
                let tmp = ctx.new_temp();
                ctx.emit(&format!("{} = getelemptr {}, 0", tmp, ir_name));
                return Ok(tmp);
            }
            let mut ptr = ir_name.clone();
            for idx in &idx_vals {
                let next = ctx.new_temp();
                ctx.emit(&format!("{} = getelemptr {}, {}", next, ptr, idx));
                ptr = next;
            }
            Ok(ptr)
        }
        _ => Err(ctx.error_at_span(
            format!("`{}` is not an array", lval.name),
            lval.span,
        )),
    }
}

/// 左值在取值位置的 IR
pub fn generate_lval_ir(lval: &LVal, ctx: &mut IrContext) -> Result<String, CompilerError> {
    let sym = ctx.lookup(&lval.name).cloned().ok_or_else(|| {
        ctx.error_at_span(format!("Variable `{}` not found", lval.name), lval.span)
    })?;
    match &sym {
        IrSymbol::Const(value) => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span("Indexed access on non-array variable", lval.span));
            }
            Ok(value.to_string())
        }
        IrSymbol::Var { ir_name } => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span("Indexed access on non-array variable", lval.span));
            }
            let tmp = ctx.new_temp();
            ctx.emit(&format!("{} = load {}", tmp, ir_name));
            Ok(tmp)
        }
        IrSymbol::Array { .. } | IrSymbol::ParamPtr { .. } => {
            let full = full_rank(&sym);
            if lval.indices.len() > full {
                return Err(ctx.error_at_span("Too many indices for array", lval.span));
            }
            let ptr = build_lval_ptr(lval, &sym, ctx)?;
            if lval.indices.len() == full {
                let tmp = ctx.new_temp();
                ctx.emit(&format!("{} = load {}", tmp, ptr));
                Ok(tmp)
            } else if !lval.indices.is_empty() {
                // 部分索引：再退化一层，得到剩余子数组的指针
                let tmp = ctx.new_temp();
                ctx.emit(&format!("{} = getelemptr {}, 0", tmp, ptr));
                Ok(tmp)
            } else {
                Ok(ptr)
            }
        }
    }
}

/// 赋值目标指针；数组必须给满全部索引
pub fn get_assign_ptr(lval: &LVal, ctx: &mut IrContext) -> Result<String, CompilerError> {
    let sym = ctx.lookup(&lval.name).cloned().ok_or_else(|| {
        ctx.error_at_span(format!("Variable `{}` not found", lval.name), lval.span)
    })?;
    match &sym {
        IrSymbol::Const(_) => Err(ctx.error_at_span(
            format!("Cannot assign to constant `{}`", lval.name),
            lval.span,
        )),
        IrSymbol::Var { ir_name } => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span("Indexed access on non-array variable", lval.span));
            }
            Ok(ir_name.clone())
        }
        IrSymbol::Array { .. } | IrSymbol::ParamPtr { .. } => {
            if lval.indices.len() != full_rank(&sym) {
                return Err(ctx.error_at_span(
                    "Array assignment requires the full index list",
                    lval.span,
                ));
            }
            build_lval_ptr(lval, &sym, ctx)
        }
    }
}

pub fn generate_unary_op_ir(
    op: &UnaryOp,
    expr: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let val = expr.generate_ir(ctx)?;
    match op {
        UnaryOp::Plus => Ok(val),
        UnaryOp::Minus => {
            let tmp = ctx.new_temp();
            ctx.emit(&format!("{} = sub 0, {}", tmp, val));
            Ok(tmp)
        }
        UnaryOp::Not => {
            let tmp = ctx.new_temp();
            ctx.emit(&format!("{} = eq {}, 0", tmp, val));
            Ok(tmp)
        }
    }
}

fn gen_binary_inst(
    ctx: &mut IrContext,
    inst: &str,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<String, CompilerError> {
    let lval = lhs.generate_ir(ctx)?;
    let rval = rhs.generate_ir(ctx)?;
    let tmp = ctx.new_temp();
    ctx.emit(&format!("{} = {} {}, {}", tmp, inst, lval, rval));
    Ok(tmp)
}

pub fn generate_binary_op_ir(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let inst = match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "div",
        BinaryOp::Mod => "mod",
    };
    gen_binary_inst(ctx, inst, lhs, rhs)
}

pub fn generate_rel_op_ir(
    op: RelOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let inst = match op {
        RelOp::Lt => "lt",
        RelOp::Gt => "gt",
        RelOp::Le => "le",
        RelOp::Ge => "ge",
    };
    gen_binary_inst(ctx, inst, lhs, rhs)
}

pub fn generate_eq_op_ir(
    op: EqOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let inst = match op {
        EqOp::Eq => "eq",
        EqOp::Ne => "ne",
    };
    gen_binary_inst(ctx, inst, lhs, rhs)
}

/// 逻辑与短路求值：
/// lhs 为假直接置 0，否则 rhs 布尔化后写入结果槽
pub fn generate_land_op_ir(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let res = ctx.new_temp();
    ctx.emit(&format!("{} = alloc i32", res));
    let lhs_val = lhs.generate_ir(ctx)?;
    let lhs_bool = gen_to_bool(ctx, &lhs_val);
    let rhs_label = ctx.new_label("sc_rhs");
    let set_label = ctx.new_label("sc_set");
    let end_label = ctx.new_label("sc_end");
    ctx.emit(&format!("br {}, {}, {}", lhs_bool, rhs_label, set_label));
    ctx.emit_label(&rhs_label);
    let rhs_val = rhs.generate_ir(ctx)?;
    let rhs_bool = gen_to_bool(ctx, &rhs_val);
    ctx.emit(&format!("store {}, {}", rhs_bool, res));
    ctx.emit(&format!("jump {}", end_label));
    ctx.emit_label(&set_label);
    ctx.emit(&format!("store 0, {}", res));
    ctx.emit(&format!("jump {}", end_label));
    ctx.emit_label(&end_label);
    let tmp = ctx.new_temp();
    ctx.emit(&format!("{} = load {}", tmp, res));
    Ok(tmp)
}

/// 逻辑或短路求值：lhs 为真直接置 1
pub fn generate_lor_op_ir(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let res = ctx.new_temp();
    ctx.emit(&format!("{} = alloc i32", res));
    let lhs_val = lhs.generate_ir(ctx)?;
    let lhs_bool = gen_to_bool(ctx, &lhs_val);
    let rhs_label = ctx.new_label("sc_rhs");
    let set_label = ctx.new_label("sc_set");
    let end_label = ctx.new_label("sc_end");
    ctx.emit(&format!("br {}, {}, {}", lhs_bool, set_label, rhs_label));
    ctx.emit_label(&rhs_label);
    let rhs_val = rhs.generate_ir(ctx)?;
    let rhs_bool = gen_to_bool(ctx, &rhs_val);
    ctx.emit(&format!("store {}, {}", rhs_bool, res));
    ctx.emit(&format!("jump {}", end_label));
    ctx.emit_label(&set_label);
    ctx.emit(&format!("store 1, {}", res));
    ctx.emit(&format!("jump {}", end_label));
    ctx.emit_label(&end_label);
    let tmp = ctx.new_temp();
    ctx.emit(&format!("{} = load {}", tmp, res));
    Ok(tmp)
}

pub fn generate_call_ir(
    name: &str,
    args: &[Expr],
    span: Span,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let is_void = match ctx.func_returns_void.get(name) {
        Some(is_void) => *is_void,
        None => {
            return Err(ctx.error_at_span(format!("Function `{}` not found", name), span));
        }
    };
    let mut arg_vals = Vec::with_capacity(args.len());
    for arg in args {
        arg_vals.push(arg.generate_ir(ctx)?);
    }
    let args_str = arg_vals.join(", ");
    // 库函数的 void 声明不受 VoidAsI32 提升影响，调用必须无结果
    if is_void && (ctx.void_mode == VoidMode::Strict || is_library_func(name)) {
        ctx.emit(&format!("call @{}({})", name, args_str));
        return Ok("0".to_string());
    }
    let tmp = ctx.new_temp();
    ctx.emit(&format!("{} = call @{}({})", tmp, name, args_str));
    Ok(tmp)
}
