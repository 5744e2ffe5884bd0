use std::env::args;

use crate::CompilerError;

#[derive(Debug, Clone)]
pub struct Params {
    pub input: String,
    /// 缺省输出到标准输出
    pub output: Option<String>,
    pub koopa: bool,
    pub riscv: bool,
    /// IR 模式下按原样输出 unit 返回类型
    pub strict_unit: bool,
}

impl Params {
    pub fn from_args() -> Result<Self, CompilerError> {
        let mut iter = args();
        iter.next();
        Self::parse(iter)
    }

    pub fn parse(mut iter: impl Iterator<Item = String>) -> Result<Self, CompilerError> {
        let mut input = String::new();
        let mut output = None;
        let mut koopa = false;
        let mut riscv = false;
        let mut strict_unit = false;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-o" => {
                    if let Some(path) = iter.next() {
                        output = Some(path);
                    } else {
                        return Err(CompilerError::ArgsError(
                            "Output file not specified after -o".to_string(),
                        ));
                    }
                }
                "-koopa" => {
                    koopa = true;
                }
                "-riscv" => {
                    riscv = true;
                }
                "-strict-unit" => {
                    strict_unit = true;
                }
                _ => {
                    if input.is_empty() {
                        input = arg;
                    } else {
                        return Err(CompilerError::ArgsError(
                            "Multiple input files are not supported".to_string(),
                        ));
                    }
                }
            }
        }
        if input.is_empty() {
            return Err(CompilerError::ArgsError(
                "Input file not specified".to_string(),
            ));
        }
        if !koopa && !riscv {
            return Err(CompilerError::ArgsError(
                "No output format specified (-koopa or -riscv)".to_string(),
            ));
        }
        if koopa && riscv {
            return Err(CompilerError::ArgsError(
                "Multiple output formats specified; please choose only one".to_string(),
            ));
        }
        Ok(Params {
            input,
            output,
            koopa,
            riscv,
            strict_unit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Params, CompilerError> {
        Params::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_basic_invocation() {
        let params = parse(&["-koopa", "in.sy", "-o", "out.koopa"]).unwrap();
        assert_eq!(params.input, "in.sy");
        assert_eq!(params.output.as_deref(), Some("out.koopa"));
        assert!(params.koopa);
        assert!(!params.riscv);
        assert!(!params.strict_unit);
    }

    #[test]
    fn test_stdout_when_no_output() {
        let params = parse(&["-riscv", "in.sy"]).unwrap();
        assert!(params.output.is_none());
        assert!(params.riscv);
    }

    #[test]
    fn test_strict_unit_flag() {
        let params = parse(&["-koopa", "-strict-unit", "in.sy"]).unwrap();
        assert!(params.strict_unit);
    }

    #[test]
    fn test_invalid_invocations() {
        assert!(parse(&["-koopa"]).is_err());
        assert!(parse(&["in.sy"]).is_err());
        assert!(parse(&["-koopa", "-riscv", "in.sy"]).is_err());
        assert!(parse(&["-koopa", "a.sy", "b.sy"]).is_err());
        assert!(parse(&["-koopa", "in.sy", "-o"]).is_err());
    }
}
