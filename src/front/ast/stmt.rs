use super::{Decl, Expr, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    // "return" [Exp] ";"
    Return(Option<Expr>),
    // LVal "=" Exp ";"
    Assign(super::LVal, Expr),
    // Block
    Block(Block),
    // [Exp] ";"
    Expr(Option<Expr>),
    // "if" "(" Exp ")" Stmt ["else" Stmt]
    If {
        cond: Expr,
        then_stmt: Box<Stmt>,
        else_stmt: Option<Box<Stmt>>,
        span: Span,
    },
    // "while" "(" Exp ")" Stmt
    While {
        cond: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    // "break" ";"
    Break(Span),
    // "continue" ";"
    Continue(Span),
}

impl Stmt {
    /// 语句是否必然把控制流带离当前基本块
    /// if 仅当两个分支都终结时才算终结；while 不算
    pub fn is_terminator(&self) -> bool {
        match self {
            Stmt::Return(_) | Stmt::Break(_) | Stmt::Continue(_) => true,
            Stmt::If { then_stmt, else_stmt, .. } => match else_stmt {
                Some(else_stmt) => then_stmt.is_terminator() && else_stmt.is_terminator(),
                None => false,
            },
            Stmt::Block(block) => block_is_terminator(block),
            _ => false,
        }
    }
}

/// 块以终结语句收尾时视为终结
pub fn block_is_terminator(block: &Block) -> bool {
    match block.last() {
        Some(BlockItem::Stmt(stmt)) => stmt.is_terminator(),
        _ => false,
    }
}

// BlockItem ::= Decl | Stmt;
#[derive(Debug, Clone, PartialEq)]
pub enum BlockItem {
    Decl(Decl),
    Stmt(Stmt),
}

// Block ::= "{" {BlockItem} "}";
pub type Block = Vec<BlockItem>;

#[cfg(test)]
mod tests {
    use super::*;

    fn ret() -> Stmt {
        Stmt::Return(None)
    }

    #[test]
    fn test_terminator_basic() {
        assert!(ret().is_terminator());
        assert!(Stmt::Break(Span::default()).is_terminator());
        assert!(Stmt::Continue(Span::default()).is_terminator());
        assert!(!Stmt::Expr(None).is_terminator());
    }

    #[test]
    fn test_terminator_if() {
        let both = Stmt::If {
            cond: Expr::IntLiteral(1, Span::default()),
            then_stmt: Box::new(ret()),
            else_stmt: Some(Box::new(ret())),
            span: Span::default(),
        };
        assert!(both.is_terminator());

        let no_else = Stmt::If {
            cond: Expr::IntLiteral(1, Span::default()),
            then_stmt: Box::new(ret()),
            else_stmt: None,
            span: Span::default(),
        };
        assert!(!no_else.is_terminator());
    }

    #[test]
    fn test_terminator_block() {
        let block = vec![
            BlockItem::Stmt(Stmt::Expr(None)),
            BlockItem::Stmt(ret()),
        ];
        assert!(Stmt::Block(block).is_terminator());
        assert!(!Stmt::Block(Vec::new()).is_terminator());
    }
}
