//! Resolution pass between the parser and the evaluator.
//!
//! Walks the syntax tree with a scope stack shaped like the future runtime
//! frame chain, turning every name into a `(depth, slot)` coordinate and
//! rewriting the call-shaped `=`, `.`, `&&` and `||` applications into
//! their dedicated forms. Errors here are static: undeclared names, `break`
//! outside a loop, assignment to something that is not an lvalue.

use std::rc::Rc;

use crate::ast;
use crate::parser::ParseError;
use crate::token::SrcLoc;

pub mod symtab;
pub mod tree;

use symtab::SymTab;

/// Analyze one function: parameters become slots 0..n of a fresh scope, the
/// body is analyzed with `break` disallowed until a `while` turns it on.
pub fn analyze_func(
    params: &[String],
    body: &ast::Stmt,
    symtab: &Rc<SymTab>,
) -> Result<Rc<tree::FuncDef>, ParseError> {
    let scope = SymTab::nested(symtab, params);
    let body = match body {
        ast::Stmt::Block(stmts) => analyze_block(stmts, &scope, false)?,
        // The parser only produces block bodies; anything else is a bug.
        other => analyze_block(std::slice::from_ref(other), &scope, false)?,
    };
    Ok(Rc::new(tree::FuncDef {
        num_params: params.len(),
        body,
    }))
}

pub fn analyze_block(
    stmts: &[ast::Stmt],
    symtab: &Rc<SymTab>,
    in_loop: bool,
) -> Result<tree::Block, ParseError> {
    analyze_block_part(None, stmts, symtab, in_loop)
}

// A `var` splits its block: the declaration's initializer is analyzed in
// the current scope, then every following sibling moves into a nested
// block under a fresh width-1 scope holding the new name. That nesting is
// what gives `var` lexical scoping without a dedicated runtime statement.
fn analyze_block_part(
    var_init: Option<tree::Expr>,
    stmts: &[ast::Stmt],
    symtab: &Rc<SymTab>,
    in_loop: bool,
) -> Result<tree::Block, ParseError> {
    let mut out = Vec::new();
    for (i, stmt) in stmts.iter().enumerate() {
        if let ast::Stmt::Var { name, init, loc } = stmt {
            let init = match init {
                Some(init) => analyze_expr(init, symtab)?,
                None => {
                    return Err(ParseError::new(
                        loc,
                        format!("variable '{name}' declared without a value"),
                    ));
                }
            };
            let scope = SymTab::nested(symtab, std::slice::from_ref(name));
            let inner = analyze_block_part(Some(init), &stmts[i + 1..], &scope, in_loop)?;
            out.push(tree::Stmt::Block(inner));
            break;
        }
        out.push(analyze_stmt(stmt, symtab, in_loop)?);
    }
    Ok(tree::Block {
        var_init,
        stmts: out,
    })
}

fn analyze_stmt(
    stmt: &ast::Stmt,
    symtab: &Rc<SymTab>,
    in_loop: bool,
) -> Result<tree::Stmt, ParseError> {
    match stmt {
        ast::Stmt::Block(stmts) => Ok(tree::Stmt::Block(analyze_block(stmts, symtab, in_loop)?)),
        ast::Stmt::Var { loc, .. } => {
            // `var` is handled by the block splitter; reaching one here means
            // it sits where a single statement is required.
            Err(ParseError::new(loc, "'var' is not allowed here"))
        }
        ast::Stmt::If {
            test,
            then_branch,
            else_branch,
        } => {
            let test = analyze_expr(test, symtab)?;
            let then_branch = Box::new(analyze_stmt(then_branch, symtab, in_loop)?);
            let else_branch = match else_branch {
                Some(stmt) => Some(Box::new(analyze_stmt(stmt, symtab, in_loop)?)),
                None => None,
            };
            Ok(tree::Stmt::If {
                test,
                then_branch,
                else_branch,
            })
        }
        ast::Stmt::While { test, body } => {
            let test = analyze_expr(test, symtab)?;
            let body = Box::new(analyze_stmt(body, symtab, true)?);
            Ok(tree::Stmt::While { test, body })
        }
        ast::Stmt::Return(expr) => {
            let expr = match expr {
                Some(expr) => Some(analyze_expr(expr, symtab)?),
                None => None,
            };
            Ok(tree::Stmt::Return(expr))
        }
        ast::Stmt::Break(loc) => {
            if !in_loop {
                return Err(ParseError::new(loc, "break not allowed here"));
            }
            Ok(tree::Stmt::Break)
        }
        ast::Stmt::Expr(expr) => Ok(tree::Stmt::Expr(analyze_expr(expr, symtab)?)),
    }
}

fn analyze_expr(expr: &ast::Expr, symtab: &Rc<SymTab>) -> Result<tree::Expr, ParseError> {
    match expr {
        ast::Expr::Ident { name, loc } => {
            let (depth, index) = symtab
                .lookup(name)
                .ok_or_else(|| ParseError::new(loc, format!("undeclared variable '{name}'")))?;
            Ok(tree::Expr::Slot {
                depth,
                index,
                loc: loc.clone(),
            })
        }
        ast::Expr::Str(text) => Ok(tree::Expr::Str(Rc::from(text.as_str()))),
        ast::Expr::Number(num) => Ok(tree::Expr::Number(*num)),
        ast::Expr::Vector(elements) => {
            let elements = elements
                .iter()
                .map(|el| analyze_expr(el, symtab))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tree::Expr::Vector(elements))
        }
        ast::Expr::Map(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                out.push((analyze_expr(key, symtab)?, analyze_expr(value, symtab)?));
            }
            Ok(tree::Expr::Map(out))
        }
        ast::Expr::Index {
            container,
            index,
            loc,
        } => Ok(tree::Expr::Index {
            container: Box::new(analyze_expr(container, symtab)?),
            index: Box::new(analyze_expr(index, symtab)?),
            loc: loc.clone(),
        }),
        ast::Expr::FuncDef { params, body } => {
            Ok(tree::Expr::FuncDef(analyze_func(params, body, symtab)?))
        }
        ast::Expr::Call { callee, args, loc } => analyze_call(callee, args, loc, symtab),
    }
}

fn analyze_call(
    callee: &ast::Expr,
    args: &[ast::Expr],
    loc: &SrcLoc,
    symtab: &Rc<SymTab>,
) -> Result<tree::Expr, ParseError> {
    // The parser folds every binary operator into a two-argument call of an
    // identifier named after the symbol. Four of those are not ordinary
    // calls and rewrite here.
    if args.len() == 2
        && let ast::Expr::Ident { name, .. } = callee
    {
        match name.as_str() {
            "=" => return analyze_assignment(args, loc, symtab),
            "." => return analyze_member(args, loc, symtab),
            "&&" => {
                return Ok(tree::Expr::And {
                    left: Box::new(analyze_expr(&args[0], symtab)?),
                    right: Box::new(analyze_expr(&args[1], symtab)?),
                });
            }
            "||" => {
                return Ok(tree::Expr::Or {
                    left: Box::new(analyze_expr(&args[0], symtab)?),
                    right: Box::new(analyze_expr(&args[1], symtab)?),
                });
            }
            _ => {}
        }
    }

    let callee = analyze_expr(callee, symtab)?;
    let args = args
        .iter()
        .map(|arg| analyze_expr(arg, symtab))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tree::Expr::Call {
        callee: Box::new(callee),
        args,
        loc: loc.clone(),
    })
}

fn analyze_assignment(
    args: &[ast::Expr],
    loc: &SrcLoc,
    symtab: &Rc<SymTab>,
) -> Result<tree::Expr, ParseError> {
    match &args[0] {
        ast::Expr::Ident { name, loc: at } => {
            let (depth, index) = symtab
                .lookup(name)
                .ok_or_else(|| ParseError::new(at, format!("undeclared variable '{name}'")))?;
            let value = analyze_expr(&args[1], symtab)?;
            Ok(tree::Expr::Assign {
                depth,
                index,
                value: Box::new(value),
                loc: loc.clone(),
            })
        }
        ast::Expr::Index {
            container, index, ..
        } => {
            let container = analyze_expr(container, symtab)?;
            let index = analyze_expr(index, symtab)?;
            let value = analyze_expr(&args[1], symtab)?;
            Ok(tree::Expr::SetIndex {
                container: Box::new(container),
                index: Box::new(index),
                value: Box::new(value),
                loc: loc.clone(),
            })
        }
        // A member-access LHS (`m.key = v`) is an element write through the
        // rewritten string key.
        ast::Expr::Call {
            callee,
            args: member_args,
            loc: member_loc,
        } if member_args.len() == 2
            && matches!(callee.as_ref(), ast::Expr::Ident { name, .. } if name == ".") =>
        {
            let tree::Expr::Index {
                container, index, ..
            } = analyze_member(member_args, member_loc, symtab)?
            else {
                unreachable!("member rewrite always yields an element index");
            };
            let value = analyze_expr(&args[1], symtab)?;
            Ok(tree::Expr::SetIndex {
                container,
                index,
                value: Box::new(value),
                loc: loc.clone(),
            })
        }
        _ => Err(ParseError::new(loc, "assignment to invalid expression")),
    }
}

// `a.b` reads element `"b"` of `a`; the right side must be an identifier.
fn analyze_member(
    args: &[ast::Expr],
    loc: &SrcLoc,
    symtab: &Rc<SymTab>,
) -> Result<tree::Expr, ParseError> {
    let ast::Expr::Ident { name, .. } = &args[1] else {
        return Err(ParseError::new(loc, "expected identifier after '.'"));
    };
    let container = analyze_expr(&args[0], symtab)?;
    Ok(tree::Expr::Index {
        container: Box::new(container),
        index: Box::new(tree::Expr::Str(Rc::from(name.as_str()))),
        loc: loc.clone(),
    })
}
