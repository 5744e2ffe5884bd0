use std::collections::HashMap;

use crate::back::insts::Instruction;
use crate::back::program::AsmProgram;
use crate::front::ast::Span;
use crate::front::eval::ConstScope;
use crate::utils::SourceMap;
use crate::CompilerError;

/// RISC-V 目标的符号表项：定位器是数据段标号或帧内偏移
#[derive(Debug, Clone, PartialEq)]
pub enum AsmSymbol {
    /// 标量常量：编译期折叠出的值
    Const(i32),
    /// 局部标量：s0 相对偏移
    Slot { offset: i32 },
    /// 全局标量：数据段标号
    Global { label: String },
    /// 局部数组：基址偏移与完整维度
    Array { offset: i32, dims: Vec<usize> },
    /// 全局数组
    GlobalArray { label: String, dims: Vec<usize> },
    /// 数组指针形参：槽里存指针，dims 为省略首维之后的各维
    ParamPtr { offset: i32, dims: Vec<usize> },
}

pub fn align16(value: i32) -> i32 {
    (value + 15) / 16 * 16
}

/// 汇编生成上下文
///
/// 栈帧布局（s0 指向帧顶，即调用者的 sp）：
///
/// ```text
/// [s0 -  4]  保存的 ra
/// [s0 -  8]  保存的旧 s0
/// [s0 - 12]  第一个分配的槽，向下生长
///   ...
/// [sp ...]   超过 8 个实参时的传参区
/// ```
///
/// 帧大小 = align16(stack_size + 8)，在函数体生成完后才能确定，
/// 所以函数体先进 body 缓冲，序言随后补发。
pub struct AsmContext {
    /// 最终的汇编程序
    pub program: AsmProgram,
    /// 数据段内容（全局变量）
    pub data: Vec<Instruction>,
    /// 当前函数体
    pub body: Vec<Instruction>,
    /// 已分配的槽空间总量（字节）
    pub stack_size: i32,
    pub label_id: u32,
    pub func_name: String,
    pub return_label: String,
    pub break_labels: Vec<String>,
    pub continue_labels: Vec<String>,
    /// 函数名 -> 是否 void
    pub func_returns_void: HashMap<String, bool>,
    pub in_global: bool,
    pub scopes: Vec<HashMap<String, AsmSymbol>>,
    pub source_map: Option<SourceMap>,
}

impl AsmContext {
    pub fn new(source_map: Option<SourceMap>) -> Self {
        Self {
            program: AsmProgram::new(),
            data: Vec::new(),
            body: Vec::new(),
            stack_size: 0,
            label_id: 0,
            func_name: String::new(),
            return_label: String::new(),
            break_labels: Vec::new(),
            continue_labels: Vec::new(),
            func_returns_void: HashMap::new(),
            in_global: false,
            scopes: Vec::new(),
            source_map,
        }
    }

    /// 每个函数独立的帧与标号状态
    pub fn reset_for_function(&mut self, name: &str) {
        self.body.clear();
        self.stack_size = 0;
        self.label_id = 0;
        self.func_name = name.to_string();
        self.return_label = format!(".Lreturn_{}", name);
        self.break_labels.clear();
        self.continue_labels.clear();
    }

    pub fn error_at_span(&self, message: impl Into<String>, span: Span) -> CompilerError {
        let mut msg = message.into();
        if let Some(sm) = &self.source_map {
            msg = format!("{} at {}", msg, sm.format_location(span.begin));
        }
        CompilerError::CodeGenerationError(msg)
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) -> Result<(), CompilerError> {
        self.scopes.pop().ok_or_else(|| {
            CompilerError::CodeGenerationError("Cannot pop scope: no scope on stack".to_string())
        })?;
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&AsmSymbol> {
        for scope in self.scopes.iter().rev() {
            if let Some(sym) = scope.get(name) {
                return Some(sym);
            }
        }
        None
    }

    pub fn insert_symbol(
        &mut self,
        name: &str,
        sym: AsmSymbol,
        span: Span,
    ) -> Result<(), CompilerError> {
        let scope = self.scopes.last_mut().ok_or_else(|| {
            CompilerError::CodeGenerationError(
                "Cannot insert symbol: no scope on stack".to_string(),
            )
        })?;
        if scope.contains_key(name) {
            let span_msg = self
                .source_map
                .as_ref()
                .map(|sm| format!(" at {}", sm.format_location(span.begin)))
                .unwrap_or_default();
            return Err(CompilerError::CodeGenerationError(format!(
                "`{}` already declared in this scope{}",
                name, span_msg
            )));
        }
        scope.insert(name.to_string(), sym);
        Ok(())
    }

    /// 分配 4 字节标量槽，返回 s0 相对偏移
    pub fn alloc_slot(&mut self) -> i32 {
        self.stack_size += 4;
        -(self.stack_size + 8)
    }

    /// 为数组分配连续空间，返回基址偏移
    pub fn alloc_array(&mut self, count: usize) -> i32 {
        let bytes = (count as i32) * 4;
        let base = -(self.stack_size + 8 + bytes);
        self.stack_size += bytes;
        base
    }

    /// 局部标号：.L<函数>_<前缀>_<序号>，避免跨函数冲突
    pub fn new_label(&mut self, prefix: &str) -> String {
        let id = self.label_id;
        self.label_id += 1;
        if self.func_name.is_empty() {
            format!(".L{}_{}", prefix, id)
        } else {
            format!(".L{}_{}_{}", self.func_name, prefix, id)
        }
    }

    pub fn emit(&mut self, inst: Instruction) {
        self.body.push(inst);
    }

    pub fn emit_label(&mut self, label: &str) {
        self.body.push(Instruction::Label(label.to_string()));
    }
}

impl ConstScope for AsmContext {
    fn lookup_const(&self, name: &str) -> Option<i32> {
        match self.lookup(name) {
            Some(AsmSymbol::Const(value)) => Some(*value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align16() {
        assert_eq!(align16(0), 0);
        assert_eq!(align16(1), 16);
        assert_eq!(align16(16), 16);
        assert_eq!(align16(24), 32);
    }

    #[test]
    fn test_slot_allocator_layout() {
        let mut ctx = AsmContext::new(None);
        // 第一个槽落在 [s0 - 12]
        assert_eq!(ctx.alloc_slot(), -12);
        assert_eq!(ctx.alloc_slot(), -16);
        // 数组占据连续区间，基址在最低处
        let base = ctx.alloc_array(3);
        assert_eq!(base, -28);
        assert_eq!(ctx.alloc_slot(), -32);
        assert_eq!(ctx.stack_size, 24);
    }

    #[test]
    fn test_labels_are_function_scoped() {
        let mut ctx = AsmContext::new(None);
        ctx.reset_for_function("main");
        assert_eq!(ctx.new_label("then"), ".Lmain_then_0");
        assert_eq!(ctx.new_label("end"), ".Lmain_end_1");
        ctx.reset_for_function("f");
        assert_eq!(ctx.new_label("then"), ".Lf_then_0");
        assert_eq!(ctx.return_label, ".Lreturn_f");
    }
}
