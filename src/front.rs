use crate::front::ast::CompUnit;
use crate::front::ir::{GenerateIr, IrContext, VoidMode};
use crate::utils::SourceMap;
use crate::CompilerError;

pub mod ast;
pub mod eval;
pub mod init;
pub mod ir;

/// 从 AST 生成文本形式的 Koopa IR
pub fn generate_ir(
    ast: &CompUnit,
    void_mode: VoidMode,
    source_map: Option<SourceMap>,
) -> Result<String, CompilerError> {
    let mut ctx = IrContext::new(void_mode, source_map);
    ast.generate_ir(&mut ctx)?;
    Ok(ctx.out)
}
