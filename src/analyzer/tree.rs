use std::fmt;
use std::rc::Rc;

use crate::token::SrcLoc;

/// The analyzed tree the evaluator walks. Identifiers are gone: every name
/// reference is a `(depth, slot)` frame coordinate, assignment and member
/// access have been rewritten, and `var` declarations have become nested
/// blocks carrying their initializer.
#[derive(Debug)]
pub enum Expr {
    Number(f64),
    Str(Rc<str>),
    /// Read of the slot at `depth` frames out, index `index`.
    Slot {
        depth: usize,
        index: usize,
        loc: SrcLoc,
    },
    Assign {
        depth: usize,
        index: usize,
        value: Box<Expr>,
        loc: SrcLoc,
    },
    SetIndex {
        container: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        loc: SrcLoc,
    },
    Index {
        container: Box<Expr>,
        index: Box<Expr>,
        loc: SrcLoc,
    },
    Vector(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    FuncDef(Rc<FuncDef>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        loc: SrcLoc,
    },
    /// Short-circuit conjunction: the right side evaluates only when the
    /// left is truthy; the result is the deciding operand.
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug)]
pub enum Stmt {
    Block(Block),
    If {
        test: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Expr(Expr),
}

/// A statement sequence. When `var_init` is present the block evaluates it
/// in the surrounding frame, then runs its statements inside a fresh frame
/// of width one holding the result.
#[derive(Debug)]
pub struct Block {
    pub var_init: Option<Expr>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug)]
pub struct FuncDef {
    pub num_params: usize,
    pub body: Block,
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(num) => write!(f, "{num}"),
            Expr::Str(text) => write!(f, "{text:?}"),
            Expr::Slot { depth, index, .. } => write!(f, "<{depth}:{index}>"),
            Expr::Assign {
                depth,
                index,
                value,
                ..
            } => write!(f, "<{depth}:{index}> = {value}"),
            Expr::SetIndex {
                container,
                index,
                value,
                ..
            } => write!(f, "{container}[{index}] = {value}"),
            Expr::Index {
                container, index, ..
            } => write!(f, "{container}[{index}]"),
            Expr::Vector(elements) => {
                write!(f, "[ ")?;
                for (i, el) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{el}")?;
                }
                write!(f, " ]")
            }
            Expr::Map(entries) => {
                write!(f, "{{ ")?;
                for (key, value) in entries {
                    write!(f, "{key} : {value}, ")?;
                }
                write!(f, "}}")
            }
            Expr::FuncDef(def) => write!(f, "function/{}", def.num_params),
            Expr::Call { callee, args, .. } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::And { left, right } => write!(f, "({left} && {right})"),
            Expr::Or { left, right } => write!(f, "({left} || {right})"),
        }
    }
}
