use crate::back::insts::Instruction;

/// 汇编程序：顺序排列的指令与指示符，最后统一格式化
pub struct AsmProgram {
    instructions: Vec<Instruction>,
}

impl AsmProgram {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn extend(&mut self, insts: Vec<Instruction>) {
        self.instructions.extend(insts);
    }

    pub fn dump(&self) -> String {
        let mut out = self
            .instructions
            .iter()
            .map(|inst| inst.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        out.push('\n');
        out
    }
}
