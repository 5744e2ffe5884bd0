use crate::back::context::AsmContext;
use crate::back::insts::{Instruction, Reg};

/// 表达式结果的五种表示
///
/// 所有中间结果都落在栈槽里；句柄只记录取回它的方式。
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 立即数
    Imm(i32),
    /// 数据段标号（全局数组基址，la 取地址）
    GlobalPtr(String),
    /// 帧内槽的地址（本地数组基址，addi s0 取地址）
    SlotAddr(i32),
    /// 槽里存的是指针（数组指针形参，lw 取指针值）
    PtrSlot(i32),
    /// 槽里存的是标量（lw 取值）
    Slot(i32),
}

pub fn is_imm12(value: i32) -> bool {
    (-2048..=2047).contains(&value)
}

/// rd = rs + imm；超出 imm12 经由 t4 展开
pub fn add_imm(insts: &mut Vec<Instruction>, rd: Reg, rs: Reg, imm: i32) {
    if is_imm12(imm) {
        insts.push(Instruction::Addi(rd, rs, imm));
    } else {
        insts.push(Instruction::Li(Reg::T4, imm));
        insts.push(Instruction::Add(rd, rs, Reg::T4));
    }
}

/// lw rd, imm(base)；超出 imm12 先把地址算进 t4
pub fn load_base(insts: &mut Vec<Instruction>, rd: Reg, base: Reg, imm: i32) {
    if is_imm12(imm) {
        insts.push(Instruction::Lw(rd, imm, base));
    } else {
        add_imm(insts, Reg::T4, base, imm);
        insts.push(Instruction::Lw(rd, 0, Reg::T4));
    }
}

/// sw rs, imm(base)；超出 imm12 先把地址算进 t4
pub fn store_base(insts: &mut Vec<Instruction>, rs: Reg, base: Reg, imm: i32) {
    if is_imm12(imm) {
        insts.push(Instruction::Sw(rs, imm, base));
    } else {
        add_imm(insts, Reg::T4, base, imm);
        insts.push(Instruction::Sw(rs, 0, Reg::T4));
    }
}

/// 把值取进寄存器：按句柄种类选择 li / la / addi / lw
pub fn load_to_reg(ctx: &mut AsmContext, val: &Value, reg: Reg) {
    match val {
        Value::Imm(imm) => ctx.emit(Instruction::Li(reg, *imm)),
        Value::GlobalPtr(label) => ctx.emit(Instruction::La(reg, label.clone())),
        Value::SlotAddr(offset) => {
            let offset = *offset;
            add_imm(&mut ctx.body, reg, Reg::S0, offset);
        }
        Value::PtrSlot(offset) | Value::Slot(offset) => {
            let offset = *offset;
            load_base(&mut ctx.body, reg, Reg::S0, offset);
        }
    }
}

/// 把寄存器写进新分配的槽，返回槽句柄
pub fn store_from_reg(ctx: &mut AsmContext, reg: Reg) -> Value {
    let offset = ctx.alloc_slot();
    store_base(&mut ctx.body, reg, Reg::S0, offset);
    Value::Slot(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imm12_bounds() {
        assert!(is_imm12(0));
        assert!(is_imm12(-2048));
        assert!(is_imm12(2047));
        assert!(!is_imm12(-2049));
        assert!(!is_imm12(2048));
    }

    #[test]
    fn test_add_imm_small() {
        let mut insts = Vec::new();
        add_imm(&mut insts, Reg::Sp, Reg::Sp, -16);
        let text: Vec<String> = insts.iter().map(|i| i.to_string()).collect();
        assert_eq!(text, vec!["  addi sp, sp, -16"]);
    }

    #[test]
    fn test_add_imm_expands_through_t4() {
        let mut insts = Vec::new();
        add_imm(&mut insts, Reg::Sp, Reg::Sp, -4096);
        let text: Vec<String> = insts.iter().map(|i| i.to_string()).collect();
        assert_eq!(text, vec!["  li t4, -4096", "  add sp, sp, t4"]);
    }

    #[test]
    fn test_load_store_base_expand() {
        let mut insts = Vec::new();
        load_base(&mut insts, Reg::T0, Reg::S0, -3000);
        let text: Vec<String> = insts.iter().map(|i| i.to_string()).collect();
        assert_eq!(
            text,
            vec!["  li t4, -3000", "  add t4, s0, t4", "  lw t0, 0(t4)"]
        );

        let mut insts = Vec::new();
        store_base(&mut insts, Reg::T0, Reg::S0, -12);
        let text: Vec<String> = insts.iter().map(|i| i.to_string()).collect();
        assert_eq!(text, vec!["  sw t0, -12(s0)"]);
    }
}
