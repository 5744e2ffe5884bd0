use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    X0,                 // 恒为 0
    Sp,                 // 栈指针
    S0,                 // 帧指针
    Ra,                 // 返回地址
    A0, A1, A2, A3,     // 参数与返回值
    A4, A5, A6, A7,
    T0, T1, T2, T3,     // 运算临时寄存器
    T4,                 // 保留：大立即数展开
    T5,                 // 保留：数组赋值的待存值
}

/// 前 8 个实参使用的寄存器
pub const ARG_REGS: [Reg; 8] = [
    Reg::A0, Reg::A1, Reg::A2, Reg::A3, Reg::A4, Reg::A5, Reg::A6, Reg::A7,
];

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let r = match self {
            Reg::X0 => "x0",
            Reg::Sp => "sp",
            Reg::S0 => "s0",
            Reg::Ra => "ra",
            Reg::A0 => "a0", Reg::A1 => "a1", Reg::A2 => "a2", Reg::A3 => "a3",
            Reg::A4 => "a4", Reg::A5 => "a5", Reg::A6 => "a6", Reg::A7 => "a7",
            Reg::T0 => "t0", Reg::T1 => "t1", Reg::T2 => "t2", Reg::T3 => "t3",
            Reg::T4 => "t4", Reg::T5 => "t5",
        };
        write!(f, "{}", r)
    }
}

pub enum Instruction {
    // --- 加载与移动 ---
    Li(Reg, i32),        // li rd, imm
    La(Reg, String),     // la rd, label (全局变量地址)
    Mv(Reg, Reg),        // mv rd, rs

    // --- 访存类 ---
    Lw(Reg, i32, Reg),   // lw rd, imm12(rs1)
    Sw(Reg, i32, Reg),   // sw rs2, imm12(rs1)

    // --- 运算类 (寄存器-寄存器) ---
    Add(Reg, Reg, Reg),  Sub(Reg, Reg, Reg),
    Mul(Reg, Reg, Reg),  Div(Reg, Reg, Reg), Rem(Reg, Reg, Reg),
    Xor(Reg, Reg, Reg),  Slt(Reg, Reg, Reg),

    // --- 运算类 (寄存器-立即数) ---
    Addi(Reg, Reg, i32), // addi rd, rs1, imm12
    Slli(Reg, Reg, i32), // slli rd, rs1, shamt

    // --- 比较与取负 (伪指令) ---
    Seqz(Reg, Reg),      // rd = (rs == 0)
    Snez(Reg, Reg),      // rd = (rs != 0)
    Neg(Reg, Reg),       // rd = -rs

    // --- 控制转移类 ---
    Beqz(Reg, String),   // 为 0 跳转
    Bnez(Reg, String),   // 非 0 跳转
    J(String),           // 无条件跳转
    Call(String),        // 函数调用
    Ret,                 // 函数返回

    // --- 汇编指示符 ---
    Label(String),
    Global(String),
    Section(String),
    Word(i32),           // .word <value>
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instruction::Li(rd, imm) => write!(f, "  li {}, {}", rd, imm),
            Instruction::La(rd, label) => write!(f, "  la {}, {}", rd, label),
            Instruction::Mv(rd, rs) => write!(f, "  mv {}, {}", rd, rs),

            // 访存：offset(reg) 格式
            Instruction::Lw(rd, imm, rs1) => write!(f, "  lw {}, {}({})", rd, imm, rs1),
            Instruction::Sw(rs2, imm, rs1) => write!(f, "  sw {}, {}({})", rs2, imm, rs1),

            Instruction::Add(rd, r1, r2) => write!(f, "  add {}, {}, {}", rd, r1, r2),
            Instruction::Sub(rd, r1, r2) => write!(f, "  sub {}, {}, {}", rd, r1, r2),
            Instruction::Mul(rd, r1, r2) => write!(f, "  mul {}, {}, {}", rd, r1, r2),
            Instruction::Div(rd, r1, r2) => write!(f, "  div {}, {}, {}", rd, r1, r2),
            Instruction::Rem(rd, r1, r2) => write!(f, "  rem {}, {}, {}", rd, r1, r2),
            Instruction::Xor(rd, r1, r2) => write!(f, "  xor {}, {}, {}", rd, r1, r2),
            Instruction::Slt(rd, r1, r2) => write!(f, "  slt {}, {}, {}", rd, r1, r2),

            Instruction::Addi(rd, rs, imm) => write!(f, "  addi {}, {}, {}", rd, rs, imm),
            Instruction::Slli(rd, rs, imm) => write!(f, "  slli {}, {}, {}", rd, rs, imm),

            Instruction::Seqz(rd, rs) => write!(f, "  seqz {}, {}", rd, rs),
            Instruction::Snez(rd, rs) => write!(f, "  snez {}, {}", rd, rs),
            Instruction::Neg(rd, rs) => write!(f, "  neg {}, {}", rd, rs),

            Instruction::Beqz(rs, label) => write!(f, "  beqz {}, {}", rs, label),
            Instruction::Bnez(rs, label) => write!(f, "  bnez {}, {}", rs, label),
            Instruction::J(label) => write!(f, "  j {}", label),
            Instruction::Call(label) => write!(f, "  call {}", label),
            Instruction::Ret => write!(f, "  ret"),

            // 标号不缩进
            Instruction::Label(name) => write!(f, "{}:", name),
            Instruction::Global(name) => write!(f, "  .globl {}", name),
            Instruction::Section(name) => write!(f, "  {}", name),
            Instruction::Word(value) => write!(f, "  .word {}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(Instruction::Li(Reg::T0, -3).to_string(), "  li t0, -3");
        assert_eq!(Instruction::Lw(Reg::T1, -12, Reg::S0).to_string(), "  lw t1, -12(s0)");
        assert_eq!(Instruction::Sw(Reg::T5, 0, Reg::T0).to_string(), "  sw t5, 0(t0)");
        assert_eq!(
            Instruction::Slt(Reg::T0, Reg::T1, Reg::T0).to_string(),
            "  slt t0, t1, t0"
        );
        assert_eq!(Instruction::Label("main".to_string()).to_string(), "main:");
        assert_eq!(Instruction::Word(7).to_string(), "  .word 7");
        assert_eq!(Instruction::Slli(Reg::T1, Reg::T1, 2).to_string(), "  slli t1, t1, 2");
    }
}
