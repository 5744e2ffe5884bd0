use std::collections::HashMap;

use crate::front::ast::Span;
use crate::front::eval::ConstScope;
use crate::utils::SourceMap;
use crate::CompilerError;

/// IR 目标的符号表项：定位器是 IR 中的符号名
#[derive(Debug, Clone, PartialEq)]
pub enum IrSymbol {
    /// 标量常量：编译期折叠出的值
    Const(i32),
    /// 标量变量（局部 `%n` 或全局 `@name`）
    Var { ir_name: String },
    /// 数组（局部或全局），dims 为完整维度
    Array { ir_name: String, dims: Vec<usize> },
    /// 数组指针形参，dims 为省略首维之后的各维
    ParamPtr { ir_name: String, dims: Vec<usize> },
}

/// void 函数在 IR 中的表示方式
///
/// `VoidAsI32` 把 void 返回类型提升为 i32 并补 `ret 0`，
/// 用于兼容不接受 `unit` 的下游工具；`Strict` 按原样输出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoidMode {
    Strict,
    VoidAsI32,
}

/// IR 生成上下文：输出缓冲、编号器、作用域栈与循环目标栈
pub struct IrContext {
    pub out: String,
    pub temp_id: u32,
    pub label_id: u32,
    pub scopes: Vec<HashMap<String, IrSymbol>>,
    pub break_labels: Vec<String>,
    pub continue_labels: Vec<String>,
    /// 函数名 -> 是否 void（用户函数与库函数都登记在此）
    pub func_returns_void: HashMap<String, bool>,
    pub void_mode: VoidMode,
    pub current_func_is_void: bool,
    pub in_global: bool,
    pub source_map: Option<SourceMap>,
}

impl IrContext {
    pub fn new(void_mode: VoidMode, source_map: Option<SourceMap>) -> Self {
        Self {
            out: String::new(),
            temp_id: 0,
            label_id: 0,
            scopes: Vec::new(),
            break_labels: Vec::new(),
            continue_labels: Vec::new(),
            func_returns_void: HashMap::new(),
            void_mode,
            current_func_is_void: false,
            in_global: false,
            source_map,
        }
    }

    pub fn error_at_span(&self, message: impl Into<String>, span: Span) -> CompilerError {
        let mut msg = message.into();
        if let Some(sm) = &self.source_map {
            msg = format!("{} at {}", msg, sm.format_location(span.begin));
        }
        CompilerError::IRGenerationError(msg)
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) -> Result<(), CompilerError> {
        self.scopes.pop().ok_or_else(|| {
            CompilerError::IRGenerationError("Cannot pop scope: no scope on stack".to_string())
        })?;
        Ok(())
    }

    /// 自内向外查找符号
    pub fn lookup(&self, name: &str) -> Option<&IrSymbol> {
        for scope in self.scopes.iter().rev() {
            if let Some(sym) = scope.get(name) {
                return Some(sym);
            }
        }
        None
    }

    /// 在当前作用域登记符号；同一作用域内重复声明是错误
    pub fn insert_symbol(
        &mut self,
        name: &str,
        sym: IrSymbol,
        span: Span,
    ) -> Result<(), CompilerError> {
        let scope = self.scopes.last_mut().ok_or_else(|| {
            CompilerError::IRGenerationError("Cannot insert symbol: no scope on stack".to_string())
        })?;
        if scope.contains_key(name) {
            let span_msg = self
                .source_map
                .as_ref()
                .map(|sm| format!(" at {}", sm.format_location(span.begin)))
                .unwrap_or_default();
            return Err(CompilerError::IRGenerationError(format!(
                "`{}` already declared in this scope{}",
                name, span_msg
            )));
        }
        scope.insert(name.to_string(), sym);
        Ok(())
    }

    pub fn new_temp(&mut self) -> String {
        let id = self.temp_id;
        self.temp_id += 1;
        format!("%{}", id)
    }

    /// 标号带前缀，避免与 `%n` 临时值重名
    pub fn new_label(&mut self, prefix: &str) -> String {
        let id = self.label_id;
        self.label_id += 1;
        format!("%{}_{}", prefix, id)
    }

    pub fn emit(&mut self, line: &str) {
        self.out.push_str("  ");
        self.out.push_str(line);
        self.out.push('\n');
    }

    pub fn emit_raw(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    pub fn emit_label(&mut self, label: &str) {
        self.out.push_str(label);
        self.out.push_str(":\n");
    }
}

impl ConstScope for IrContext {
    fn lookup_const(&self, name: &str) -> Option<i32> {
        match self.lookup(name) {
            Some(IrSymbol::Const(value)) => Some(*value),
            _ => None,
        }
    }
}
