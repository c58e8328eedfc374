//! Statement and expression walkers over the analyzed tree.
//!
//! Statements produce a [`Flow`] signal; `Return` and `Break` ride the
//! normal return path until the closure-call boundary or the enclosing
//! `while` handles them. Genuine failures travel as `Err(ExecError)`.

use std::rc::Rc;

use crate::analyzer::tree::{Block, Expr, Stmt};

use super::env::Frame;
use super::error::{ExecError, ExecErrorKind};
use super::value::{Closure, Value};

/// Out-of-band result of executing one statement.
pub enum Flow {
    Normal,
    Return(Value),
    Break,
}

pub fn exec_block(block: &Block, env: &Rc<Frame>) -> Result<Flow, ExecError> {
    let mut scope = Rc::clone(env);
    if let Some(init) = &block.var_init {
        // Initializer evaluates outside the frame it populates.
        let value = eval_expr(init, env)?;
        let frame = Frame::new(Some(Rc::clone(env)), 1);
        frame.set(0, 0, value);
        scope = frame;
    }
    for stmt in &block.stmts {
        match exec_stmt(stmt, &scope)? {
            Flow::Normal => {}
            other => return Ok(other),
        }
    }
    Ok(Flow::Normal)
}

pub fn exec_stmt(stmt: &Stmt, env: &Rc<Frame>) -> Result<Flow, ExecError> {
    match stmt {
        Stmt::Block(block) => exec_block(block, env),
        Stmt::If {
            test,
            then_branch,
            else_branch,
        } => {
            if eval_expr(test, env)?.is_truthy() {
                exec_stmt(then_branch, env)
            } else if let Some(stmt) = else_branch {
                exec_stmt(stmt, env)
            } else {
                Ok(Flow::Normal)
            }
        }
        Stmt::While { test, body } => {
            while eval_expr(test, env)?.is_truthy() {
                match exec_stmt(body, env)? {
                    Flow::Normal => {}
                    Flow::Break => break,
                    ret @ Flow::Return(_) => return Ok(ret),
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::Return(expr) => {
            let value = match expr {
                Some(expr) => eval_expr(expr, env)?,
                None => Value::Null,
            };
            Ok(Flow::Return(value))
        }
        Stmt::Break => Ok(Flow::Break),
        Stmt::Expr(expr) => {
            eval_expr(expr, env)?;
            Ok(Flow::Normal)
        }
    }
}

pub fn eval_expr(expr: &Expr, env: &Rc<Frame>) -> Result<Value, ExecError> {
    match expr {
        Expr::Number(num) => Ok(Value::Number(*num)),
        Expr::Str(text) => Ok(Value::Str(Rc::clone(text))),
        Expr::Slot { depth, index, loc } => env
            .get(*depth, *index)
            .ok_or_else(|| ExecError::new(loc, ExecErrorKind::UndefinedVariable)),
        Expr::Assign {
            depth,
            index,
            value,
            loc,
        } => {
            let value = eval_expr(value, env)?;
            if !env.set(*depth, *index, value.clone()) {
                return Err(ExecError::new(loc, ExecErrorKind::BadSlot));
            }
            Ok(value)
        }
        Expr::SetIndex {
            container,
            index,
            value,
            loc,
        } => {
            let container = eval_expr(container, env)?;
            let index = eval_expr(index, env)?;
            let value = eval_expr(value, env)?;
            container.index_set(&index, value.clone(), loc)?;
            Ok(value)
        }
        Expr::Index {
            container,
            index,
            loc,
        } => {
            let container = eval_expr(container, env)?;
            let index = eval_expr(index, env)?;
            container.index_get(&index, loc)
        }
        Expr::Vector(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for el in elements {
                values.push(eval_expr(el, env)?);
            }
            Ok(Value::vector(values))
        }
        Expr::Map(entries) => {
            let mut values = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                let key = eval_expr(key, env)?;
                let value = eval_expr(value, env)?;
                values.push((key, value));
            }
            Ok(Value::map(values))
        }
        Expr::FuncDef(fun) => Ok(Value::Closure(Rc::new(Closure {
            fun: Rc::clone(fun),
            env: Rc::clone(env),
        }))),
        Expr::Call { callee, args, loc } => {
            let callee = eval_expr(callee, env)?;
            // The callee's type is checked before any argument evaluates.
            if !matches!(callee, Value::Closure(_) | Value::Native(_)) {
                return Err(ExecError::new(
                    loc,
                    ExecErrorKind::NotCallable {
                        type_name: callee.type_name(),
                    },
                ));
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, env)?);
            }
            callee.call(&values, env, loc)
        }
        Expr::And { left, right } => {
            let left = eval_expr(left, env)?;
            if left.is_truthy() {
                eval_expr(right, env)
            } else {
                Ok(left)
            }
        }
        Expr::Or { left, right } => {
            let left = eval_expr(left, env)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                eval_expr(right, env)
            }
        }
    }
}
