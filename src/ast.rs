use std::fmt;

use crate::token::SrcLoc;

/// Syntax tree produced by the parser.
///
/// Every operator application is already call-shaped: `a + b` parses to a
/// call whose callee is the identifier `+`. Assignment and member access
/// keep that shape too and are rewritten during analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident {
        name: String,
        loc: SrcLoc,
    },
    Str(String),
    Number(f64),
    Vector(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Index {
        container: Box<Expr>,
        index: Box<Expr>,
        loc: SrcLoc,
    },
    FuncDef {
        params: Vec<String>,
        body: Box<Stmt>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        loc: SrcLoc,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Var {
        name: String,
        init: Option<Expr>,
        loc: SrcLoc,
    },
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
    Break(SrcLoc),
    Expr(Expr),
}

/// A top-level `function NAME (params) { body }` definition.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedFunc {
    pub name: String,
    pub params: Vec<String>,
    pub body: Stmt,
    pub loc: SrcLoc,
}

fn is_operator_name(name: &str) -> bool {
    name.chars()
        .next()
        .is_some_and(|ch| !ch.is_alphabetic() && ch != '_')
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident { name, .. } => write!(f, "{name}"),
            Expr::Str(text) => write!(f, "{text:?}"),
            Expr::Number(num) => write!(f, "{num}"),
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
            Expr::Index {
                container, index, ..
            } => write!(f, "{container}[{index}]"),
            Expr::FuncDef { params, .. } => {
                write!(f, "function(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") {{...}}")
            }
            Expr::Call { callee, args, .. } => {
                // Render binary operator applications infix.
                if args.len() == 2
                    && let Expr::Ident { name, .. } = callee.as_ref()
                    && is_operator_name(name)
                {
                    return write!(f, "({} {name} {})", args[0], args[1]);
                }
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}
