use crate::ast::Expr;
use crate::ops::{Assoc, Operator};
use crate::token::SrcLoc;

use super::ParseError;

pub(super) struct OperatorToken {
    pub(super) op: Operator,
    pub(super) loc: SrcLoc,
}

/// Operand and operator stacks for shunting-yard expression parsing.
pub(super) struct ExprStacks {
    operands: Vec<Expr>,
    operators: Vec<OperatorToken>,
}

impl ExprStacks {
    pub(super) fn new() -> Self {
        Self {
            operands: Vec::new(),
            operators: Vec::new(),
        }
    }

    pub(super) fn operand_count(&self) -> usize {
        self.operands.len()
    }

    pub(super) fn push_operand(&mut self, operand: Expr) {
        self.operands.push(operand);
    }

    pub(super) fn pop_operand(&mut self) -> Option<Expr> {
        self.operands.pop()
    }

    pub(super) fn push_operator(&mut self, op: Operator, loc: SrcLoc) {
        self.operators.push(OperatorToken { op, loc });
    }

    /// Pop-and-fold stacked operators whose effective precedence is at
    /// least `stop_prec`. Right-associative operators compare with
    /// `prec - 1` so equal precedences stack instead of folding.
    ///
    /// Each fold replaces its operands with a call to an identifier named
    /// after the operator symbol.
    pub(super) fn fold(&mut self, stop_prec: i32, loc: &SrcLoc) -> Result<(), ParseError> {
        while let Some(top) = self.operators.last() {
            let mut prec = top.op.prec;
            if top.op.assoc == Assoc::Right {
                prec -= 1;
            }
            if prec < stop_prec {
                break;
            }
            let top = self.operators.pop().expect("operator stack checked non-empty");

            let args = if top.op.assoc == Assoc::Prefix {
                let operand = self
                    .operands
                    .pop()
                    .ok_or_else(|| ParseError::new(loc, "stack underflow"))?;
                vec![operand]
            } else {
                let right = self
                    .operands
                    .pop()
                    .ok_or_else(|| ParseError::new(loc, "stack underflow"))?;
                let left = self
                    .operands
                    .pop()
                    .ok_or_else(|| ParseError::new(loc, "stack underflow"))?;
                vec![left, right]
            };

            self.operands.push(Expr::Call {
                callee: Box::new(Expr::Ident {
                    name: top.op.symbol.to_string(),
                    loc: top.loc.clone(),
                }),
                args,
                loc: top.loc,
            });
        }
        Ok(())
    }
}
