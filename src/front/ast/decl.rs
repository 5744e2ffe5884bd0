use super::{Expr, Span};

// DataType ::= "int" | "void";
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataType {
    Int,
    Void,
}

// Decl ::= ConstDecl | VarDecl;
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    ConstDecl(ConstDecl),
    VarDecl(VarDecl),
}

// ConstDecl ::= "const" "int" ConstDef {"," ConstDef} ";";
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub ty: DataType,
    pub defs: Vec<ConstDef>,
    pub span: Span,
}

// ConstDef ::= IDENT {"[" ConstExp "]"} "=" ConstInitVal;
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDef {
    pub name: String,
    pub dims: Vec<Expr>,  // 数组维度长度（ConstExp 列表）
    pub init: InitVal,
    pub span: Span,
}

// VarDecl ::= "int" VarDef {"," VarDef} ";";
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub ty: DataType,
    pub defs: Vec<VarDef>,
    pub span: Span,
}

// VarDef ::= IDENT {"[" ConstExp "]"} ["=" InitVal];
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub dims: Vec<Expr>,  // 数组维度长度（ConstExp 列表）
    pub init: Option<InitVal>,
    pub span: Span,
}

// InitVal ::= Exp | "{" [InitVal {"," InitVal}] "}";
// 常量定义与变量定义共用同一种初始化值结构
#[derive(Debug, Clone, PartialEq)]
pub enum InitVal {
    Single(Expr),
    List(Vec<InitVal>),
}
