//! Top-level program emission: library declarations, global
//! declarations in source order, and function definitions.

use crate::ast::{BType, CompUnit, FuncDef, FuncType, GlobalItem, ParamKind};
use crate::scope::{ScopeStack, Symbol};

use super::control_flow::emit_block;
use super::decl;
use super::error::CodegenError;
use super::state::Emitter;

/// The SysY runtime library, declared at the top of every program
/// exactly as listed in the external interface: `getint`/`getch`/
/// `getarray`/`putint`/`putch`/`putarray`/`starttime`/`stoptime`.
const LIBRARY_FUNCS: &[(&str, &[ParamShape], bool)] = &[
    ("getint", &[], true),
    ("getch", &[], true),
    ("getarray", &[ParamShape::Pointer], true),
    ("putint", &[ParamShape::Scalar], false),
    ("putch", &[ParamShape::Scalar], false),
    ("putarray", &[ParamShape::Scalar, ParamShape::Pointer], false),
    ("starttime", &[], false),
    ("stoptime", &[], false),
];

enum ParamShape {
    Scalar,
    Pointer,
}

fn declare_library(em: &mut Emitter, scopes: &mut ScopeStack) {
    for (name, params, has_ret) in LIBRARY_FUNCS {
        let sig: Vec<&str> = params
            .iter()
            .map(|p| match p {
                ParamShape::Scalar => "i32",
                ParamShape::Pointer => "*i32",
            })
            .collect();
        let ret = if *has_ret { ": i32" } else { "" };
        em.output.push_str(&format!("decl @{name}({}){ret}\n", sig.join(", ")));
        scopes.insert(
            *name,
            Symbol::Func { ret_ty: if *has_ret { Some(BType::Int) } else { None }, param_count: params.len() },
        );
    }
    em.output.push('\n');
}

fn array_type(dims: &[usize]) -> String {
    let mut ty = "i32".to_string();
    for d in dims.iter().rev() {
        ty = format!("[{ty}, {d}]");
    }
    ty
}

fn param_type(scopes: &ScopeStack, kind: &ParamKind) -> Result<String, CodegenError> {
    match kind {
        ParamKind::Scalar => Ok("i32".to_string()),
        ParamKind::Pointer(dim_exprs) => {
            let dims = decl::eval_dims(scopes, dim_exprs)?;
            if dims.is_empty() {
                Ok("*i32".to_string())
            } else {
                Ok(format!("*{}", array_type(&dims)))
            }
        }
    }
}

pub fn compile(ast: &CompUnit) -> Result<String, CodegenError> {
    let mut em = Emitter::new();
    let mut scopes = ScopeStack::new();
    declare_library(&mut em, &mut scopes);

    let has_main = ast.items.iter().any(|item| {
        matches!(item, GlobalItem::FuncDef(f) if f.name == "main")
    });
    if !has_main {
        return Err("program defines no `main` function".to_string().into());
    }

    for item in &ast.items {
        match item {
            GlobalItem::Decl(d) => decl::emit_global_decl(&mut em, &mut scopes, d)?,
            GlobalItem::FuncDef(f) => emit_func(&mut em, &mut scopes, f)?,
        }
    }
    Ok(em.output)
}

fn emit_func(em: &mut Emitter, scopes: &mut ScopeStack, f: &FuncDef) -> Result<(), CodegenError> {
    let ret_ty = match f.ret_ty {
        FuncType::Int => Some(BType::Int),
        FuncType::Void => None,
    };

    // Pre-compute signature types before entering the function's own
    // scope (dimension expressions in a pointer param may reference
    // const names from the enclosing/global scope).
    let mut param_types = Vec::with_capacity(f.params.len());
    for p in &f.params {
        param_types.push(param_type(scopes, &p.kind)?);
    }

    scopes
        .declare(f.name.clone(), Symbol::Func { ret_ty, param_count: f.params.len() })
        .map_err(|e| format!("{e} at line {}", f.line))?;

    em.reset_function();
    let mut inner = scopes.enter();

    let mut sig_names = Vec::with_capacity(f.params.len());
    for p in &f.params {
        let tid = em.fresh_table_id();
        sig_names.push(format!("@{}_{tid}", p.name));
    }
    let sig = f
        .params
        .iter()
        .zip(sig_names.iter())
        .zip(param_types.iter())
        .map(|((_, name), ty)| format!("{name}: {ty}"))
        .collect::<Vec<_>>()
        .join(", ");
    let ret_text = if ret_ty.is_some() { ": i32" } else { "" };
    em.output.push_str(&format!("fun @{}({sig}){ret_text} {{\n", f.name));
    em.output.push_str("%entry:\n");

    for ((p, sig_name), ty) in f.params.iter().zip(sig_names.iter()).zip(param_types.iter()) {
        let tid = em.fresh_table_id();
        let local_name = format!("@{}_{tid}", p.name);
        em.line(format!("  {local_name} = alloc {ty}"));
        em.line(format!("  store {sig_name}, {local_name}"));
        let sym = match &p.kind {
            ParamKind::Scalar => Symbol::VarScalar { koopa_id: local_name },
            ParamKind::Pointer(dim_exprs) => {
                let dims = decl::eval_dims(&inner, dim_exprs)?;
                Symbol::Pointer { shape: dims, koopa_id: local_name }
            }
        };
        inner
            .declare(p.name.clone(), sym)
            .map_err(|e| format!("{e} at line {}", p.line))?;
    }

    let mut loops = Vec::new();
    let body_returns = emit_block(em, &mut inner, &mut loops, ret_ty, &f.body)?;
    if !body_returns {
        match ret_ty {
            Some(_) => em.terminate_with("  ret 0"),
            None => em.terminate_with("  ret"),
        }
    }
    em.output.push_str("}\n\n");
    Ok(())
}
