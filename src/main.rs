use lalrpop_util::lexer::Token;
use lalrpop_util::{lalrpop_mod, ParseError};
use std::fs::read_to_string;

mod back;
mod front;
mod utils;

use crate::back::generate_asm;
use crate::front::generate_ir;
use crate::front::ir::VoidMode;
use utils::args::Params;
use utils::logger::print_error_and_exit;
use utils::SourceMap;

pub use utils::CompilerError;

// 引用 lalrpop 生成的解析器（语法文件为 sysy.lalrpop）
lalrpop_mod!(pub sysy);

fn main() {
    if let Err(e) = run() {
        print_error_and_exit(&e, 1);
    }
}

fn format_expected(expected: Vec<String>) -> String {
    if expected.is_empty() {
        "no expected tokens".to_string()
    } else {
        expected.join(", ")
    }
}

fn format_parse_error(source_map: &SourceMap, err: ParseError<usize, Token<'_>, &str>) -> String {
    match err {
        ParseError::InvalidToken { location } => {
            format!("Invalid token at {}", source_map.format_location(location))
        }
        ParseError::UnrecognizedEof { location, expected } => {
            let expected = format_expected(expected);
            format!(
                "Unexpected end of file at {}. Expected: {}",
                source_map.format_location(location),
                expected
            )
        }
        ParseError::UnrecognizedToken { token, expected } => {
            let (start, tok, _end) = token;
            let expected = format_expected(expected);
            format!(
                "Unrecognized token {:?} at {}. Expected: {}",
                tok,
                source_map.format_location(start),
                expected
            )
        }
        ParseError::ExtraToken { token } => {
            let (start, tok, _end) = token;
            format!(
                "Extra token {:?} at {}",
                tok,
                source_map.format_location(start)
            )
        }
        ParseError::User { error } => {
            format!("Parse error: {}", error)
        }
    }
}

fn run() -> Result<(), CompilerError> {
    // 解析命令行参数
    let params = Params::from_args()?;

    // 读取输入文件
    let input = read_to_string(&params.input)?;
    let source_map = SourceMap::new(&input);

    // 调用 lalrpop 生成的 parser 解析输入文件
    let ast = sysy::CompUnitParser::new()
        .parse(&input)
        .map_err(|e| CompilerError::ParseError(format_parse_error(&source_map, e)))?;

    if params.koopa {
        let mode = if params.strict_unit {
            VoidMode::Strict
        } else {
            VoidMode::VoidAsI32
        };
        let text = generate_ir(&ast, mode, Some(source_map))?;
        return write_output(&params, &text);
    }
    if params.riscv {
        let text = generate_asm(&ast, Some(source_map))?;
        return write_output(&params, &text);
    }
    Ok(())
}

fn write_output(params: &Params, text: &str) -> Result<(), CompilerError> {
    match &params.output {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{}", text),
    }
    Ok(())
}
