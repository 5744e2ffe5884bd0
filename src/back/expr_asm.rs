use crate::back::context::{align16, AsmContext, AsmSymbol};
use crate::back::insts::{Instruction, Reg, ARG_REGS};
use crate::back::value::{add_imm, load_base, load_to_reg, store_base, store_from_reg, Value};
use crate::back::GenerateAsm;
use crate::front::ast::*;
use crate::front::init::product;
use crate::CompilerError;

/// 数组符号的完整秩；数组指针形参的首维是隐含的
pub fn full_rank(sym: &AsmSymbol) -> usize {
    match sym {
        AsmSymbol::Array { dims, .. } | AsmSymbol::GlobalArray { dims, .. } => dims.len(),
        AsmSymbol::ParamPtr { dims, .. } => dims.len() + 1,
        _ => 0,
    }
}

/// 把元素地址算进 t0：基址 + 4·Σ idxᵢ·strideᵢ
///
/// t1 累加下标和，t2 装当前下标，t3 装步长；
/// 数组指针形参的首个步长是全部已知内维之积。
pub fn emit_array_addr(
    ctx: &mut AsmContext,
    sym: &AsmSymbol,
    idx_vals: &[Value],
) -> Result<(), CompilerError> {
    let (dims, is_param) = match sym {
        AsmSymbol::GlobalArray { label, dims } => {
            ctx.emit(Instruction::La(Reg::T0, label.clone()));
            (dims, false)
        }
        AsmSymbol::ParamPtr { offset, dims } => {
            let offset = *offset;
            load_base(&mut ctx.body, Reg::T0, Reg::S0, offset);
            (dims, true)
        }
        AsmSymbol::Array { offset, dims } => {
            let offset = *offset;
            add_imm(&mut ctx.body, Reg::T0, Reg::S0, offset);
            (dims, false)
        }
        _ => {
            return Err(CompilerError::CodeGenerationError(
                "Address computation on non-array symbol".to_string(),
            ));
        }
    };
    if idx_vals.is_empty() {
        return Ok(());
    }
    ctx.emit(Instruction::Li(Reg::T1, 0));
    for (i, idx) in idx_vals.iter().enumerate() {
        load_to_reg(ctx, idx, Reg::T2);
        let stride = if is_param {
            if i == 0 {
                product(dims)
            } else {
                product(&dims[i..])
            }
        } else {
            product(&dims[i + 1..])
        };
        if stride != 1 {
            ctx.emit(Instruction::Li(Reg::T3, stride as i32));
            ctx.emit(Instruction::Mul(Reg::T2, Reg::T2, Reg::T3));
        }
        ctx.emit(Instruction::Add(Reg::T1, Reg::T1, Reg::T2));
    }
    ctx.emit(Instruction::Slli(Reg::T1, Reg::T1, 2));
    ctx.emit(Instruction::Add(Reg::T0, Reg::T0, Reg::T1));
    Ok(())
}

fn generate_array_lval(
    lval: &LVal,
    sym: &AsmSymbol,
    base: Value,
    full: usize,
    ctx: &mut AsmContext,
) -> Result<Value, CompilerError> {
    if lval.indices.len() > full {
        return Err(ctx.error_at_span("Too many indices for array", lval.span));
    }
    // 不带索引：整个数组作实参，直接给出基址句柄
    if lval.indices.is_empty() {
        return Ok(base);
    }
    let mut idx_vals = Vec::with_capacity(lval.indices.len());
    for idx in &lval.indices {
        idx_vals.push(idx.generate_asm(ctx)?);
    }
    emit_array_addr(ctx, sym, &idx_vals)?;
    if lval.indices.len() < full {
        // 部分索引：地址本身就是子数组指针
        Ok(store_from_reg(ctx, Reg::T0))
    } else {
        ctx.emit(Instruction::Lw(Reg::T1, 0, Reg::T0));
        Ok(store_from_reg(ctx, Reg::T1))
    }
}

pub fn generate_lval_asm(lval: &LVal, ctx: &mut AsmContext) -> Result<Value, CompilerError> {
    let sym = ctx.lookup(&lval.name).cloned().ok_or_else(|| {
        ctx.error_at_span(format!("Variable `{}` not found", lval.name), lval.span)
    })?;
    match &sym {
        AsmSymbol::Const(value) => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span("Indexed access on non-array variable", lval.span));
            }
            Ok(Value::Imm(*value))
        }
        AsmSymbol::Slot { offset } => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span("Indexed access on non-array variable", lval.span));
            }
            Ok(Value::Slot(*offset))
        }
        AsmSymbol::Global { label } => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span("Indexed access on non-array variable", lval.span));
            }
            ctx.emit(Instruction::La(Reg::T2, label.clone()));
            ctx.emit(Instruction::Lw(Reg::T0, 0, Reg::T2));
            Ok(store_from_reg(ctx, Reg::T0))
        }
        AsmSymbol::Array { offset, dims } => {
            generate_array_lval(lval, &sym, Value::SlotAddr(*offset), dims.len(), ctx)
        }
        AsmSymbol::GlobalArray { label, dims } => {
            generate_array_lval(lval, &sym, Value::GlobalPtr(label.clone()), dims.len(), ctx)
        }
        AsmSymbol::ParamPtr { offset, dims } => {
            generate_array_lval(lval, &sym, Value::PtrSlot(*offset), dims.len() + 1, ctx)
        }
    }
}

pub fn generate_unary_op_asm(
    op: &UnaryOp,
    expr: &Expr,
    ctx: &mut AsmContext,
) -> Result<Value, CompilerError> {
    let val = expr.generate_asm(ctx)?;
    match op {
        UnaryOp::Plus => Ok(val),
        UnaryOp::Minus => {
            load_to_reg(ctx, &val, Reg::T0);
            ctx.emit(Instruction::Neg(Reg::T0, Reg::T0));
            Ok(store_from_reg(ctx, Reg::T0))
        }
        UnaryOp::Not => {
            load_to_reg(ctx, &val, Reg::T0);
            ctx.emit(Instruction::Seqz(Reg::T0, Reg::T0));
            Ok(store_from_reg(ctx, Reg::T0))
        }
    }
}

/// 两个操作数装入 t0/t1 再运算的公共路径
fn gen_operands(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut AsmContext,
) -> Result<(), CompilerError> {
    let lval = lhs.generate_asm(ctx)?;
    let rval = rhs.generate_asm(ctx)?;
    load_to_reg(ctx, &lval, Reg::T0);
    load_to_reg(ctx, &rval, Reg::T1);
    Ok(())
}

pub fn generate_binary_op_asm(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut AsmContext,
) -> Result<Value, CompilerError> {
    gen_operands(lhs, rhs, ctx)?;
    let inst = match op {
        BinaryOp::Add => Instruction::Add(Reg::T0, Reg::T0, Reg::T1),
        BinaryOp::Sub => Instruction::Sub(Reg::T0, Reg::T0, Reg::T1),
        BinaryOp::Mul => Instruction::Mul(Reg::T0, Reg::T0, Reg::T1),
        BinaryOp::Div => Instruction::Div(Reg::T0, Reg::T0, Reg::T1),
        BinaryOp::Mod => Instruction::Rem(Reg::T0, Reg::T0, Reg::T1),
    };
    ctx.emit(inst);
    Ok(store_from_reg(ctx, Reg::T0))
}

pub fn generate_rel_op_asm(
    op: RelOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut AsmContext,
) -> Result<Value, CompilerError> {
    gen_operands(lhs, rhs, ctx)?;
    match op {
        RelOp::Lt => ctx.emit(Instruction::Slt(Reg::T0, Reg::T0, Reg::T1)),
        RelOp::Gt => ctx.emit(Instruction::Slt(Reg::T0, Reg::T1, Reg::T0)),
        RelOp::Le => {
            ctx.emit(Instruction::Slt(Reg::T0, Reg::T1, Reg::T0));
            ctx.emit(Instruction::Seqz(Reg::T0, Reg::T0));
        }
        RelOp::Ge => {
            ctx.emit(Instruction::Slt(Reg::T0, Reg::T0, Reg::T1));
            ctx.emit(Instruction::Seqz(Reg::T0, Reg::T0));
        }
    }
    Ok(store_from_reg(ctx, Reg::T0))
}

pub fn generate_eq_op_asm(
    op: EqOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut AsmContext,
) -> Result<Value, CompilerError> {
    gen_operands(lhs, rhs, ctx)?;
    ctx.emit(Instruction::Xor(Reg::T0, Reg::T0, Reg::T1));
    match op {
        EqOp::Eq => ctx.emit(Instruction::Seqz(Reg::T0, Reg::T0)),
        EqOp::Ne => ctx.emit(Instruction::Snez(Reg::T0, Reg::T0)),
    }
    Ok(store_from_reg(ctx, Reg::T0))
}

/// 逻辑与短路求值：与 IR 端相同的块结构，保证两个后端行为一致
pub fn generate_land_op_asm(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut AsmContext,
) -> Result<Value, CompilerError> {
    let res_offset = ctx.alloc_slot();
    let rhs_label = ctx.new_label("sc_rhs");
    let set_label = ctx.new_label("sc_set");
    let end_label = ctx.new_label("sc_end");

    let lhs_val = lhs.generate_asm(ctx)?;
    load_to_reg(ctx, &lhs_val, Reg::T0);
    ctx.emit(Instruction::Beqz(Reg::T0, set_label.clone()));
    ctx.emit_label(&rhs_label);
    let rhs_val = rhs.generate_asm(ctx)?;
    load_to_reg(ctx, &rhs_val, Reg::T1);
    ctx.emit(Instruction::Snez(Reg::T1, Reg::T1));
    store_base(&mut ctx.body, Reg::T1, Reg::S0, res_offset);
    ctx.emit(Instruction::J(end_label.clone()));
    ctx.emit_label(&set_label);
    store_base(&mut ctx.body, Reg::X0, Reg::S0, res_offset);
    ctx.emit(Instruction::J(end_label.clone()));
    ctx.emit_label(&end_label);
    Ok(Value::Slot(res_offset))
}

pub fn generate_lor_op_asm(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut AsmContext,
) -> Result<Value, CompilerError> {
    let res_offset = ctx.alloc_slot();
    let rhs_label = ctx.new_label("sc_rhs");
    let set_label = ctx.new_label("sc_set");
    let end_label = ctx.new_label("sc_end");

    let lhs_val = lhs.generate_asm(ctx)?;
    load_to_reg(ctx, &lhs_val, Reg::T0);
    ctx.emit(Instruction::Bnez(Reg::T0, set_label.clone()));
    ctx.emit_label(&rhs_label);
    let rhs_val = rhs.generate_asm(ctx)?;
    load_to_reg(ctx, &rhs_val, Reg::T1);
    ctx.emit(Instruction::Snez(Reg::T1, Reg::T1));
    store_base(&mut ctx.body, Reg::T1, Reg::S0, res_offset);
    ctx.emit(Instruction::J(end_label.clone()));
    ctx.emit_label(&set_label);
    ctx.emit(Instruction::Li(Reg::T1, 1));
    store_base(&mut ctx.body, Reg::T1, Reg::S0, res_offset);
    ctx.emit(Instruction::J(end_label.clone()));
    ctx.emit_label(&end_label);
    Ok(Value::Slot(res_offset))
}

pub fn generate_call_asm(
    name: &str,
    args: &[Expr],
    span: Span,
    ctx: &mut AsmContext,
) -> Result<Value, CompilerError> {
    let is_void = match ctx.func_returns_void.get(name) {
        Some(is_void) => *is_void,
        None => {
            return Err(ctx.error_at_span(format!("Function `{}` not found", name), span));
        }
    };
    let mut arg_vals = Vec::with_capacity(args.len());
    for arg in args {
        arg_vals.push(arg.generate_asm(ctx)?);
    }
    // 超过 8 个实参：在 sp 下方开一块 16 字节对齐的传参区
    let mut adjusted = 0;
    if arg_vals.len() > 8 {
        let extra = ((arg_vals.len() - 8) * 4) as i32;
        adjusted = align16(extra);
        add_imm(&mut ctx.body, Reg::Sp, Reg::Sp, -adjusted);
        for (i, val) in arg_vals.iter().enumerate().skip(8) {
            load_to_reg(ctx, val, Reg::T0);
            store_base(&mut ctx.body, Reg::T0, Reg::Sp, ((i - 8) * 4) as i32);
        }
    }
    for (i, val) in arg_vals.iter().take(8).enumerate() {
        load_to_reg(ctx, val, Reg::T0);
        ctx.emit(Instruction::Mv(ARG_REGS[i], Reg::T0));
    }
    ctx.emit(Instruction::Call(name.to_string()));
    if adjusted > 0 {
        add_imm(&mut ctx.body, Reg::Sp, Reg::Sp, adjusted);
    }
    if is_void {
        Ok(Value::Imm(0))
    } else {
        Ok(store_from_reg(ctx, Reg::A0))
    }
}
