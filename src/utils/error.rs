use std::fmt;

#[derive(Debug)]
pub enum CompilerError {
    // I/O 错误
    IoError(std::io::Error),
    // 参数解析错误
    ArgsError(String),
    // 语法分析错误
    ParseError(String),
    // 常量求值错误
    ConstEvalError(String),
    // IR 生成错误
    IRGenerationError(String),
    // 汇编生成错误
    CodeGenerationError(String),
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompilerError::IoError(e) => write!(f, "I/O error: {}", e),
            CompilerError::ArgsError(msg) => write!(f, "Argument error: {}", msg),
            CompilerError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            CompilerError::ConstEvalError(msg) => write!(f, "Constant evaluation error: {}", msg),
            CompilerError::IRGenerationError(msg) => write!(f, "IR generation error: {}", msg),
            CompilerError::CodeGenerationError(msg) => write!(f, "Code generation error: {}", msg),
        }
    }
}

impl std::error::Error for CompilerError {}

impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IoError(err)
    }
}
