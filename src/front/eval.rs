use crate::front::ast::*;
use crate::CompilerError;

/// 常量作用域：两个后端的符号环境都实现此接口，
/// 使同一个求值器可以同时服务 IR 生成和汇编生成
pub trait ConstScope {
    /// 按名字查找标量常量的折叠值；非常量或未声明返回 None
    fn lookup_const(&self, name: &str) -> Option<i32>;
}

/// 在给定作用域下求常量表达式的值
///
/// 语义为 32 位补码：算术溢出回绕，除法向零截断。
/// 常量上下文中的 `&&`/`||` 两侧都会被求值（不短路）。
pub fn eval_const_expr<S: ConstScope + ?Sized>(
    expr: &Expr,
    scope: &S,
) -> Result<i32, CompilerError> {
    match expr {
        Expr::IntLiteral(n, _) => Ok(*n),
        Expr::LVal(lval) => {
            if !lval.indices.is_empty() {
                return Err(CompilerError::ConstEvalError(
                    "Array element access is not allowed in constant expressions".to_string(),
                ));
            }
            scope.lookup_const(&lval.name).ok_or_else(|| {
                CompilerError::ConstEvalError(format!(
                    "`{}` is not a constant in this context",
                    lval.name
                ))
            })
        }
        Expr::UnaryOp(op, rhs, _) => {
            let val = eval_const_expr(rhs, scope)?;
            match op {
                UnaryOp::Plus => Ok(val),
                UnaryOp::Minus => Ok(val.wrapping_neg()),
                UnaryOp::Not => Ok(if val == 0 { 1 } else { 0 }),
            }
        }
        Expr::BinaryOp(op, lhs, rhs, _) => {
            let lval = eval_const_expr(lhs, scope)?;
            let rval = eval_const_expr(rhs, scope)?;
            match op {
                BinaryOp::Add => Ok(lval.wrapping_add(rval)),
                BinaryOp::Sub => Ok(lval.wrapping_sub(rval)),
                BinaryOp::Mul => Ok(lval.wrapping_mul(rval)),
                BinaryOp::Div => {
                    if rval == 0 {
                        return Err(CompilerError::ConstEvalError(
                            "Division by zero in constant expression".to_string(),
                        ));
                    }
                    Ok(lval.wrapping_div(rval))
                }
                BinaryOp::Mod => {
                    if rval == 0 {
                        return Err(CompilerError::ConstEvalError(
                            "Modulo by zero in constant expression".to_string(),
                        ));
                    }
                    Ok(lval.wrapping_rem(rval))
                }
            }
        }
        Expr::RelOp(op, lhs, rhs, _) => {
            let lval = eval_const_expr(lhs, scope)?;
            let rval = eval_const_expr(rhs, scope)?;
            let result = match op {
                RelOp::Lt => lval < rval,
                RelOp::Gt => lval > rval,
                RelOp::Le => lval <= rval,
                RelOp::Ge => lval >= rval,
            };
            Ok(result as i32)
        }
        Expr::EqOp(op, lhs, rhs, _) => {
            let lval = eval_const_expr(lhs, scope)?;
            let rval = eval_const_expr(rhs, scope)?;
            let result = match op {
                EqOp::Eq => lval == rval,
                EqOp::Ne => lval != rval,
            };
            Ok(result as i32)
        }
        // 两侧都是纯常量，无需短路
        Expr::LAndOp(_, lhs, rhs, _) => {
            let lval = eval_const_expr(lhs, scope)?;
            let rval = eval_const_expr(rhs, scope)?;
            Ok((lval != 0 && rval != 0) as i32)
        }
        Expr::LOrOp(_, lhs, rhs, _) => {
            let lval = eval_const_expr(lhs, scope)?;
            let rval = eval_const_expr(rhs, scope)?;
            Ok((lval != 0 || rval != 0) as i32)
        }
        Expr::Call(name, _, _) => Err(CompilerError::ConstEvalError(format!(
            "Call to `{}` is not allowed in constant expressions",
            name
        ))),
    }
}

/// 摊平后的初始化表逐项折叠；空位补 0
pub fn eval_flat_init<S: ConstScope + ?Sized>(
    flat: &[Option<&Expr>],
    scope: &S,
) -> Result<Vec<i32>, CompilerError> {
    let mut vals = Vec::with_capacity(flat.len());
    for elem in flat {
        vals.push(match elem {
            Some(expr) => eval_const_expr(expr, scope)?,
            None => 0,
        });
    }
    Ok(vals)
}

/// 求一组维度表达式的值；维度必须是非负常量
pub fn eval_dims<S: ConstScope + ?Sized>(
    dims: &[Expr],
    scope: &S,
) -> Result<Vec<usize>, CompilerError> {
    let mut out = Vec::with_capacity(dims.len());
    for expr in dims {
        let dim = eval_const_expr(expr, scope)?;
        if dim < 0 {
            return Err(CompilerError::ConstEvalError(
                "Array dimension must be non-negative".to_string(),
            ));
        }
        out.push(dim as usize);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapScope(HashMap<String, i32>);

    impl ConstScope for MapScope {
        fn lookup_const(&self, name: &str) -> Option<i32> {
            self.0.get(name).copied()
        }
    }

    fn empty() -> MapScope {
        MapScope(HashMap::new())
    }

    fn int(n: i32) -> Expr {
        Expr::IntLiteral(n, Span::default())
    }

    fn binary(op: BinaryOp, l: Expr, r: Expr) -> Expr {
        Expr::BinaryOp(op, Box::new(l), Box::new(r), Span::default())
    }

    #[test]
    fn test_arith_folding() {
        let e = binary(BinaryOp::Add, int(2), binary(BinaryOp::Mul, int(3), int(4)));
        assert_eq!(eval_const_expr(&e, &empty()).unwrap(), 14);
    }

    #[test]
    fn test_overflow_wraps() {
        let e = binary(BinaryOp::Add, int(i32::MAX), int(1));
        assert_eq!(eval_const_expr(&e, &empty()).unwrap(), i32::MIN);
        let e = binary(BinaryOp::Mul, int(i32::MIN), int(-1));
        assert_eq!(eval_const_expr(&e, &empty()).unwrap(), i32::MIN);
    }

    #[test]
    fn test_truncated_division() {
        let e = binary(BinaryOp::Div, int(-7), int(2));
        assert_eq!(eval_const_expr(&e, &empty()).unwrap(), -3);
        let e = binary(BinaryOp::Mod, int(-7), int(2));
        assert_eq!(eval_const_expr(&e, &empty()).unwrap(), -1);
    }

    #[test]
    fn test_division_by_zero_is_error() {
        let e = binary(BinaryOp::Div, int(1), int(0));
        assert!(eval_const_expr(&e, &empty()).is_err());
        let e = binary(BinaryOp::Mod, int(1), int(0));
        assert!(eval_const_expr(&e, &empty()).is_err());
    }

    #[test]
    fn test_logic_and_not() {
        let not = Expr::UnaryOp(UnaryOp::Not, Box::new(int(0)), Span::default());
        assert_eq!(eval_const_expr(&not, &empty()).unwrap(), 1);
        let not = Expr::UnaryOp(UnaryOp::Not, Box::new(int(5)), Span::default());
        assert_eq!(eval_const_expr(&not, &empty()).unwrap(), 0);

        let and = Expr::LAndOp(LAndOp::And, Box::new(int(2)), Box::new(int(3)), Span::default());
        assert_eq!(eval_const_expr(&and, &empty()).unwrap(), 1);
        let or = Expr::LOrOp(LOrOp::Or, Box::new(int(0)), Box::new(int(0)), Span::default());
        assert_eq!(eval_const_expr(&or, &empty()).unwrap(), 0);
    }

    #[test]
    fn test_relational() {
        let e = Expr::RelOp(RelOp::Le, Box::new(int(3)), Box::new(int(3)), Span::default());
        assert_eq!(eval_const_expr(&e, &empty()).unwrap(), 1);
        let e = Expr::EqOp(EqOp::Ne, Box::new(int(3)), Box::new(int(3)), Span::default());
        assert_eq!(eval_const_expr(&e, &empty()).unwrap(), 0);
    }

    #[test]
    fn test_const_lookup() {
        let mut map = HashMap::new();
        map.insert("N".to_string(), 10);
        let scope = MapScope(map);
        let lval = Expr::LVal(LVal {
            name: "N".to_string(),
            indices: Vec::new(),
            span: Span::default(),
        });
        let e = binary(BinaryOp::Sub, lval, int(4));
        assert_eq!(eval_const_expr(&e, &scope).unwrap(), 6);
    }

    #[test]
    fn test_unknown_name_is_error() {
        let lval = Expr::LVal(LVal {
            name: "missing".to_string(),
            indices: Vec::new(),
            span: Span::default(),
        });
        assert!(eval_const_expr(&lval, &empty()).is_err());
    }

    #[test]
    fn test_negative_dim_rejected() {
        assert!(eval_dims(&[int(-1)], &empty()).is_err());
        assert_eq!(eval_dims(&[int(2), int(3)], &empty()).unwrap(), vec![2, 3]);
    }
}
