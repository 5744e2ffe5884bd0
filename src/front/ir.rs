pub mod context;
pub mod expr_ir;
pub mod stmt_ir;

pub use context::{IrContext, IrSymbol, VoidMode};

use crate::front::ast::*;
use crate::front::eval::{eval_const_expr, eval_dims, eval_flat_init};
use crate::front::init::{flatten_init, linear_to_indices, product};
use crate::front::ir::expr_ir::*;
use crate::front::ir::stmt_ir::*;
use crate::CompilerError;

/// SysY 运行时库函数：名字、是否 void、IR 声明行
pub const LIBRARY_FUNCS: &[(&str, bool, &str)] = &[
    ("getint", false, "decl @getint(): i32"),
    ("getch", false, "decl @getch(): i32"),
    ("getarray", false, "decl @getarray(*i32): i32"),
    ("putint", true, "decl @putint(i32)"),
    ("putch", true, "decl @putch(i32)"),
    ("putarray", true, "decl @putarray(i32, *i32)"),
];

pub fn is_library_func(name: &str) -> bool {
    LIBRARY_FUNCS.iter().any(|(n, _, _)| *n == name)
}

pub trait GenerateIr {
    type Output;
    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError>;
}

/// 数组的 IR 类型：自内向外包装，`[[i32, d1], d0]`
fn build_array_type(dims: &[usize]) -> String {
    let mut ty = "i32".to_string();
    for dim in dims.iter().rev() {
        ty = format!("[{}, {}]", ty, dim);
    }
    ty
}

/// 线性值表转嵌套聚合字面量
fn build_aggregate(dims: &[usize], vals: &[i32], start: usize) -> String {
    if dims.is_empty() {
        return vals.get(start).copied().unwrap_or(0).to_string();
    }
    let sub = product(&dims[1..]);
    let mut parts = Vec::with_capacity(dims[0]);
    for i in 0..dims[0] {
        parts.push(build_aggregate(&dims[1..], vals, start + i * sub));
    }
    format!("{{{}}}", parts.join(", "))
}

/// 线性下标处元素的指针：按维展开 getelemptr 链
fn gen_elem_ptr(ctx: &mut IrContext, base: &str, dims: &[usize], linear: usize) -> String {
    let mut ptr = base.to_string();
    for idx in linear_to_indices(linear, dims) {
        let next = ctx.new_temp();
        ctx.emit(&format!("{} = getelemptr {}, {}", next, ptr, idx));
        ptr = next;
    }
    ptr
}

impl GenerateIr for CompUnit {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        ctx.push_scope();

        // 先登记所有函数的返回种类，供调用点与 decl 抑制使用
        for item in &self.items {
            if let GlobalItem::FuncDef(func) = item {
                if ctx.func_returns_void.contains_key(&func.name) {
                    return Err(CompilerError::IRGenerationError(format!(
                        "Function `{}` already defined",
                        func.name
                    )));
                }
                ctx.func_returns_void
                    .insert(func.name.clone(), func.ty == DataType::Void);
            }
        }
        // 库函数声明；用户自己定义了同名函数时不再声明
        for (name, is_void, decl) in LIBRARY_FUNCS {
            if !ctx.func_returns_void.contains_key(*name) {
                ctx.func_returns_void.insert((*name).to_string(), *is_void);
                ctx.emit_raw(decl);
            }
        }

        ctx.in_global = true;
        for item in &self.items {
            if let GlobalItem::Decl(decl) = item {
                decl.generate_ir(ctx)?;
            }
        }
        ctx.in_global = false;

        for item in &self.items {
            if let GlobalItem::FuncDef(func) = item {
                func.generate_ir(ctx)?;
            }
        }
        ctx.pop_scope()
    }
}

impl GenerateIr for FuncDef {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        // 临时值与标号按函数独立编号
        ctx.temp_id = 0;
        ctx.label_id = 0;
        ctx.current_func_is_void = self.ty == DataType::Void;

        let mut param_dims = Vec::with_capacity(self.params.len());
        let mut header = format!("fun @{}(", self.name);
        for (i, param) in self.params.iter().enumerate() {
            if i != 0 {
                header.push_str(", ");
            }
            if param.is_array {
                let dims = eval_dims(&param.dims, ctx)?;
                let base = if dims.is_empty() {
                    "i32".to_string()
                } else {
                    build_array_type(&dims)
                };
                header.push_str(&format!("%{}: *{}", param.name, base));
                param_dims.push(Some(dims));
            } else {
                header.push_str(&format!("%{}: i32", param.name));
                param_dims.push(None);
            }
        }
        let ret = match self.ty {
            DataType::Int => "i32",
            DataType::Void => match ctx.void_mode {
                VoidMode::VoidAsI32 => "i32",
                VoidMode::Strict => "unit",
            },
        };
        header.push_str(&format!("): {} {{", ret));
        ctx.emit_raw(&header);
        ctx.emit_label("%entry");

        ctx.push_scope();
        for (param, dims) in self.params.iter().zip(param_dims) {
            match dims {
                // 数组指针形参直接绑定传入的名字
                Some(dims) => {
                    ctx.insert_symbol(
                        &param.name,
                        IrSymbol::ParamPtr {
                            ir_name: format!("%{}", param.name),
                            dims,
                        },
                        param.span,
                    )?;
                }
                // 标量形参拷贝进新分配的槽，之后的赋值就与局部变量一致
                None => {
                    let alloc = ctx.new_temp();
                    ctx.emit(&format!("{} = alloc i32", alloc));
                    ctx.emit(&format!("store %{}, {}", param.name, alloc));
                    ctx.insert_symbol(
                        &param.name,
                        IrSymbol::Var { ir_name: alloc },
                        param.span,
                    )?;
                }
            }
        }

        generate_block_ir(&self.body, ctx)?;

        if !block_is_terminator(&self.body) {
            match self.ty {
                DataType::Int => ctx.emit("ret 0"),
                DataType::Void => match ctx.void_mode {
                    VoidMode::VoidAsI32 => ctx.emit("ret 0"),
                    VoidMode::Strict => ctx.emit("ret"),
                },
            }
        }
        ctx.pop_scope()?;
        ctx.current_func_is_void = false;
        ctx.emit_raw("}");
        Ok(())
    }
}

impl GenerateIr for Decl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Decl::ConstDecl(decl) => decl.generate_ir(ctx),
            Decl::VarDecl(decl) => decl.generate_ir(ctx),
        }
    }
}

impl GenerateIr for ConstDecl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        for def in &self.defs {
            let dims = eval_dims(&def.dims, ctx)?;
            if dims.is_empty() {
                // 标量常量只进符号表，不产生存储
                let flat = flatten_init(Some(&def.init), &dims);
                let value = match flat[0] {
                    Some(expr) => eval_const_expr(expr, ctx)?,
                    None => 0,
                };
                ctx.insert_symbol(&def.name, IrSymbol::Const(value), def.span)?;
            } else if ctx.in_global {
                let flat = flatten_init(Some(&def.init), &dims);
                let vals = eval_flat_init(&flat, ctx)?;
                let ty = build_array_type(&dims);
                let agg = build_aggregate(&dims, &vals, 0);
                ctx.emit_raw(&format!("global @{} = alloc {}, {}", def.name, ty, agg));
                ctx.insert_symbol(
                    &def.name,
                    IrSymbol::Array {
                        ir_name: format!("@{}", def.name),
                        dims,
                    },
                    def.span,
                )?;
            } else {
                let ty = build_array_type(&dims);
                let alloc = ctx.new_temp();
                ctx.emit(&format!("{} = alloc {}", alloc, ty));
                ctx.insert_symbol(
                    &def.name,
                    IrSymbol::Array {
                        ir_name: alloc.clone(),
                        dims: dims.clone(),
                    },
                    def.span,
                )?;
                let flat = flatten_init(Some(&def.init), &dims);
                let vals = eval_flat_init(&flat, ctx)?;
                for (i, val) in vals.iter().enumerate() {
                    let ptr = gen_elem_ptr(ctx, &alloc, &dims, i);
                    ctx.emit(&format!("store {}, {}", val, ptr));
                }
            }
        }
        Ok(())
    }
}

impl GenerateIr for VarDecl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        for def in &self.defs {
            let dims = eval_dims(&def.dims, ctx)?;
            if ctx.in_global {
                // 全局初始化值一律编译期折叠；数组缺省用 zeroinit
                if dims.is_empty() {
                    let init_val = match &def.init {
                        Some(init) => {
                            let flat = flatten_init(Some(init), &dims);
                            match flat[0] {
                                Some(expr) => eval_const_expr(expr, ctx)?,
                                None => 0,
                            }
                        }
                        None => 0,
                    };
                    ctx.emit_raw(&format!("global @{} = alloc i32, {}", def.name, init_val));
                    ctx.insert_symbol(
                        &def.name,
                        IrSymbol::Var {
                            ir_name: format!("@{}", def.name),
                        },
                        def.span,
                    )?;
                } else {
                    let ty = build_array_type(&dims);
                    match &def.init {
                        None => {
                            ctx.emit_raw(&format!(
                                "global @{} = alloc {}, zeroinit",
                                def.name, ty
                            ));
                        }
                        Some(init) => {
                            let flat = flatten_init(Some(init), &dims);
                            let vals = eval_flat_init(&flat, ctx)?;
                            let agg = build_aggregate(&dims, &vals, 0);
                            ctx.emit_raw(&format!(
                                "global @{} = alloc {}, {}",
                                def.name, ty, agg
                            ));
                        }
                    }
                    ctx.insert_symbol(
                        &def.name,
                        IrSymbol::Array {
                            ir_name: format!("@{}", def.name),
                            dims,
                        },
                        def.span,
                    )?;
                }
            } else if dims.is_empty() {
                let alloc = ctx.new_temp();
                ctx.emit(&format!("{} = alloc i32", alloc));
                ctx.insert_symbol(
                    &def.name,
                    IrSymbol::Var {
                        ir_name: alloc.clone(),
                    },
                    def.span,
                )?;
                if let Some(init) = &def.init {
                    let flat = flatten_init(Some(init), &dims);
                    let val = match flat[0] {
                        Some(expr) => expr.generate_ir(ctx)?,
                        None => "0".to_string(),
                    };
                    ctx.emit(&format!("store {}, {}", val, alloc));
                }
            } else {
                let ty = build_array_type(&dims);
                let alloc = ctx.new_temp();
                ctx.emit(&format!("{} = alloc {}", alloc, ty));
                ctx.insert_symbol(
                    &def.name,
                    IrSymbol::Array {
                        ir_name: alloc.clone(),
                        dims: dims.clone(),
                    },
                    def.span,
                )?;
                if let Some(init) = &def.init {
                    let flat = flatten_init(Some(init), &dims);
                    let total = product(&dims);
                    for i in 0..total {
                        let val = match flat[i] {
                            Some(expr) => expr.generate_ir(ctx)?,
                            None => "0".to_string(),
                        };
                        let ptr = gen_elem_ptr(ctx, &alloc, &dims, i);
                        ctx.emit(&format!("store {}, {}", val, ptr));
                    }
                }
            }
        }
        Ok(())
    }
}

impl GenerateIr for Stmt {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Stmt::Return(expr) => generate_return_stmt_ir(expr, ctx),
            Stmt::Assign(lval, expr) => generate_assign_stmt_ir(lval, expr, ctx),
            Stmt::Block(block) => generate_block_ir(block, ctx),
            Stmt::Expr(expr) => generate_expr_stmt_ir(expr, ctx),
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
                ..
            } => generate_if_stmt_ir(cond, then_stmt, else_stmt.as_deref(), ctx),
            Stmt::While { cond, body, .. } => generate_while_stmt_ir(cond, body, ctx),
            Stmt::Break(span) => generate_break_stmt_ir(*span, ctx),
            Stmt::Continue(span) => generate_continue_stmt_ir(*span, ctx),
        }
    }
}

impl GenerateIr for Expr {
    type Output = String;

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Expr::IntLiteral(n, _) => Ok(n.to_string()),
            Expr::LVal(lval) => generate_lval_ir(lval, ctx),
            Expr::UnaryOp(op, expr, _) => generate_unary_op_ir(op, expr, ctx),
            Expr::BinaryOp(op, lhs, rhs, _) => generate_binary_op_ir(*op, lhs, rhs, ctx),
            Expr::RelOp(op, lhs, rhs, _) => generate_rel_op_ir(*op, lhs, rhs, ctx),
            Expr::EqOp(op, lhs, rhs, _) => generate_eq_op_ir(*op, lhs, rhs, ctx),
            Expr::LAndOp(_, lhs, rhs, _) => generate_land_op_ir(lhs, rhs, ctx),
            Expr::LOrOp(_, lhs, rhs, _) => generate_lor_op_ir(lhs, rhs, ctx),
            Expr::Call(name, args, span) => generate_call_ir(name, args, *span, ctx),
        }
    }
}
