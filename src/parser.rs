//! Recursive-descent statement parser on top of a shunting-yard expression
//! parser. Sources form a stack: `include "path"` pushes a tokenizer that is
//! fully consumed before the including file resumes.

use std::fs;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{Expr, NamedFunc, Stmt};
use crate::lexer::Tokenizer;
use crate::ops::{self, OperatorSet};
use crate::token::{SrcLoc, Token, TokenKind};

mod stacks;

use stacks::ExprStacks;

/// A static (tokenize/parse/analyze) diagnostic with its source position.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{loc}: {message}")]
pub struct ParseError {
    pub loc: SrcLoc,
    pub message: String,
}

impl ParseError {
    pub fn new(loc: &SrcLoc, message: impl Into<String>) -> Self {
        Self {
            loc: loc.clone(),
            message: message.into(),
        }
    }
}

pub struct Parser {
    sources: Vec<Tokenizer>,
    ops: Rc<OperatorSet>,
    saved: Option<Token>,
    last_loc: SrcLoc,
}

impl Parser {
    pub fn new(ops: Rc<OperatorSet>) -> Self {
        Self {
            sources: Vec::new(),
            ops,
            saved: None,
            last_loc: SrcLoc::native(),
        }
    }

    pub fn parse_file(&mut self, path: &str) -> Result<Vec<NamedFunc>, ParseError> {
        self.open_file(path, None)?;
        self.parse_top_level()
    }

    pub fn parse_source(&mut self, name: &str, source: &str) -> Result<Vec<NamedFunc>, ParseError> {
        self.sources
            .push(Tokenizer::new(name, source, Rc::clone(&self.ops)));
        self.parse_top_level()
    }

    fn open_file(&mut self, path: &str, loc: Option<&SrcLoc>) -> Result<(), ParseError> {
        let source = fs::read_to_string(path).map_err(|error| {
            let loc = loc.cloned().unwrap_or(SrcLoc {
                file: Rc::from(path),
                line: 0,
                col: 0,
            });
            ParseError::new(&loc, format!("{path}: {error}"))
        })?;
        self.sources
            .push(Tokenizer::new(path, &source, Rc::clone(&self.ops)));
        Ok(())
    }

    // Next token from the top source, popping finished sources; lexer error
    // tokens become parse errors here.
    fn get_token(&mut self) -> Result<Token, ParseError> {
        if let Some(token) = self.saved.take() {
            return Ok(token);
        }
        while let Some(source) = self.sources.last_mut() {
            let token = source.next_token();
            if token.is_eof() {
                self.last_loc = token.loc;
                self.sources.pop();
                continue;
            }
            if let TokenKind::Error(message) = token.kind {
                return Err(ParseError::new(&token.loc, message));
            }
            return Ok(token);
        }
        Ok(Token::new(TokenKind::Eof, self.last_loc.clone()))
    }

    fn unget(&mut self, token: Token) {
        debug_assert!(self.saved.is_none(), "only one token of lookahead");
        self.saved = Some(token);
    }

    fn unexpected(&self, token: &Token, expected: &str) -> ParseError {
        ParseError::new(
            &token.loc,
            format!("expected {expected}, found {}", token.kind),
        )
    }

    fn expect_punct(&mut self, ch: char) -> Result<Token, ParseError> {
        let token = self.get_token()?;
        if token.is_punct(ch) {
            Ok(token)
        } else {
            Err(self.unexpected(&token, &format!("'{ch}'")))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(String, SrcLoc), ParseError> {
        let token = self.get_token()?;
        match token.kind {
            TokenKind::Ident(name) => Ok((name, token.loc)),
            _ => Err(self.unexpected(&token, expected)),
        }
    }

    // ----------------------------------------------------------------
    // Top level

    fn parse_top_level(&mut self) -> Result<Vec<NamedFunc>, ParseError> {
        let mut funcs = Vec::new();
        loop {
            let token = self.get_token()?;
            if token.is_eof() {
                return Ok(funcs);
            }
            if token.is_keyword("include") {
                let name_tok = self.get_token()?;
                match name_tok.kind {
                    TokenKind::Str(path) => self.open_file(&path, Some(&name_tok.loc))?,
                    _ => return Err(self.unexpected(&name_tok, "include path string")),
                }
                continue;
            }
            if token.is_keyword("function") {
                funcs.push(self.parse_named_func()?);
                continue;
            }
            return Err(self.unexpected(&token, "'function' or 'include'"));
        }
    }

    fn parse_named_func(&mut self) -> Result<NamedFunc, ParseError> {
        let (name, loc) = self.expect_ident("function name")?;
        let params = self.parse_param_list()?;
        let body = self.parse_block()?;
        Ok(NamedFunc {
            name,
            params,
            body,
            loc,
        })
    }

    // ----------------------------------------------------------------
    // Statements

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let token = self.get_token()?;

        if token.is_eof() {
            return Err(self.unexpected(&token, "statement"));
        }
        // An empty statement is an empty block.
        if token.is_punct(';') {
            return Ok(Stmt::Block(Vec::new()));
        }
        if token.is_punct('{') {
            self.unget(token);
            return self.parse_block();
        }
        if token.is_keyword("var") {
            return self.parse_var();
        }
        if token.is_keyword("if") {
            return self.parse_if();
        }
        if token.is_keyword("while") {
            return self.parse_while();
        }
        if token.is_keyword("return") {
            return self.parse_return();
        }
        if token.is_keyword("break") {
            self.expect_punct(';')?;
            return Ok(Stmt::Break(token.loc));
        }

        self.unget(token);
        let expr = self.parse_expression(&[';'], true)?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_block(&mut self) -> Result<Stmt, ParseError> {
        self.expect_punct('{')?;
        let mut stmts = Vec::new();
        loop {
            let token = self.get_token()?;
            if token.is_punct('}') {
                return Ok(Stmt::Block(stmts));
            }
            self.unget(token);
            stmts.push(self.parse_statement()?);
        }
    }

    fn parse_var(&mut self) -> Result<Stmt, ParseError> {
        let (name, loc) = self.expect_ident("identifier")?;
        let token = self.get_token()?;
        if token.is_op("=") {
            let init = self.parse_expression(&[';'], true)?;
            return Ok(Stmt::Var {
                name,
                init: Some(init),
                loc,
            });
        }
        // The grammar admits `var NAME;`, but a declaration without a value
        // has no slot content to create.
        if token.is_punct(';') {
            return Err(ParseError::new(
                &loc,
                format!("variable '{name}' declared without a value"),
            ));
        }
        Err(self.unexpected(&token, "'='"))
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect_punct('(')?;
        let test = self.parse_expression(&[')'], true)?;
        let then_branch = Box::new(self.parse_statement()?);

        let token = self.get_token()?;
        let else_branch = if token.is_keyword("else") {
            Some(Box::new(self.parse_statement()?))
        } else {
            self.unget(token);
            None
        };

        Ok(Stmt::If {
            test,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect_punct('(')?;
        let test = self.parse_expression(&[')'], true)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While { test, body })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let token = self.get_token()?;
        if token.is_punct(';') {
            return Ok(Stmt::Return(None));
        }
        self.unget(token);
        let expr = self.parse_expression(&[';'], true)?;
        Ok(Stmt::Return(Some(expr)))
    }

    // ----------------------------------------------------------------
    // Expressions

    /// Shunting-yard expression parsing. `stop` is the set of punctuation
    /// characters that terminate the expression; when one is seen the
    /// operator stack drains and exactly one operand must remain.
    fn parse_expression(&mut self, stop: &[char], consume_stop: bool) -> Result<Expr, ParseError> {
        let mut stacks = ExprStacks::new();
        let mut expect_operand = true;

        loop {
            let token = self.get_token()?;

            if let TokenKind::Punct(ch) = token.kind
                && stop.contains(&ch)
            {
                let loc = token.loc.clone();
                if !consume_stop {
                    self.unget(token.clone());
                }
                stacks.fold(ops::MIN_PREC, &loc)?;
                return match stacks.operand_count() {
                    0 => Err(self.unexpected(&token, "expression")),
                    1 => Ok(stacks.pop_operand().expect("one operand left")),
                    n => Err(ParseError::new(
                        &loc,
                        format!("invalid stack: {n} elements left"),
                    )),
                };
            }

            match token.kind {
                TokenKind::Eof => return Err(self.unexpected(&token, "expression")),

                TokenKind::Punct('(') => {
                    if expect_operand {
                        let expr = self.parse_expression(&[')'], true)?;
                        stacks.push_operand(expr);
                        expect_operand = false;
                    } else {
                        // Function call: fold tighter operators, then the
                        // operand on top of the stack is the callee.
                        stacks.fold(ops::FUNC_CALL_PREC, &token.loc)?;
                        let callee = stacks
                            .pop_operand()
                            .ok_or_else(|| ParseError::new(&token.loc, "operand stack is empty"))?;
                        let loc = match &callee {
                            Expr::Ident { loc, .. } => loc.clone(),
                            _ => token.loc.clone(),
                        };
                        self.unget(token);
                        let args = self.parse_argument_list()?;
                        stacks.push_operand(Expr::Call {
                            callee: Box::new(callee),
                            args,
                            loc,
                        });
                    }
                }

                TokenKind::Punct('[') => {
                    if expect_operand {
                        self.unget(token);
                        let vector = self.parse_vector_literal()?;
                        stacks.push_operand(vector);
                        expect_operand = false;
                    } else {
                        stacks.fold(ops::ELEMENT_INDEX_PREC, &token.loc)?;
                        let container = stacks
                            .pop_operand()
                            .ok_or_else(|| ParseError::new(&token.loc, "operand stack is empty"))?;
                        let index = self.parse_expression(&[']'], true)?;
                        stacks.push_operand(Expr::Index {
                            container: Box::new(container),
                            index: Box::new(index),
                            loc: token.loc,
                        });
                    }
                }

                TokenKind::Punct('{') => {
                    if !expect_operand {
                        return Err(self.unexpected(&token, "operator or '('"));
                    }
                    self.unget(token);
                    let map = self.parse_map_literal()?;
                    stacks.push_operand(map);
                    expect_operand = false;
                }

                TokenKind::Keyword(ref word) if word == "function" => {
                    if !expect_operand {
                        return Err(self.unexpected(&token, "operator or '('"));
                    }
                    let def = self.parse_func_def()?;
                    stacks.push_operand(def);
                    expect_operand = false;
                }

                TokenKind::Str(text) => {
                    if !expect_operand {
                        let token = Token::new(TokenKind::Str(text), token.loc);
                        return Err(self.unexpected(&token, "operator or '('"));
                    }
                    stacks.push_operand(Expr::Str(text));
                    expect_operand = false;
                }

                TokenKind::Number(num) => {
                    if !expect_operand {
                        return Err(self.unexpected(&token, "operator or '('"));
                    }
                    stacks.push_operand(Expr::Number(num));
                    expect_operand = false;
                }

                TokenKind::Ident(name) => {
                    if !expect_operand {
                        let token = Token::new(TokenKind::Ident(name), token.loc);
                        return Err(self.unexpected(&token, "operator or '('"));
                    }
                    stacks.push_operand(Expr::Ident {
                        name,
                        loc: token.loc,
                    });
                    expect_operand = false;
                }

                TokenKind::Op(ref symbol) => {
                    if expect_operand {
                        let op = self.ops.prefix(symbol).cloned().ok_or_else(|| {
                            ParseError::new(
                                &token.loc,
                                format!("unknown prefix operator '{symbol}'"),
                            )
                        })?;
                        stacks.push_operator(op, token.loc);
                    } else {
                        let op = self.ops.binary(symbol).cloned().ok_or_else(|| {
                            ParseError::new(
                                &token.loc,
                                format!("unknown binary operator '{symbol}'"),
                            )
                        })?;
                        stacks.fold(op.prec, &token.loc)?;
                        stacks.push_operator(op, token.loc);
                        expect_operand = true;
                    }
                }

                _ => return Err(self.unexpected(&token, "expression")),
            }
        }
    }

    /// `{ key : expr, ... }` where a key is an identifier or a string.
    fn parse_map_literal(&mut self) -> Result<Expr, ParseError> {
        self.expect_punct('{')?;
        let mut entries = Vec::new();
        loop {
            let token = self.get_token()?;
            if token.is_punct('}') {
                break;
            }
            let key = match token.kind {
                TokenKind::Ident(name) => Expr::Str(name),
                TokenKind::Str(text) => Expr::Str(text),
                _ => return Err(self.unexpected(&token, "identifier or string")),
            };
            self.expect_punct(':')?;
            let value = self.parse_expression(&[',', '}'], false)?;
            entries.push((key, value));

            let sep = self.get_token()?;
            if sep.is_punct('}') {
                break;
            }
            if !sep.is_punct(',') {
                return Err(self.unexpected(&sep, "',' or '}'"));
            }
        }
        Ok(Expr::Map(entries))
    }

    /// `[ expr, ... ]`
    fn parse_vector_literal(&mut self) -> Result<Expr, ParseError> {
        self.expect_punct('[')?;
        let mut elements = Vec::new();

        let token = self.get_token()?;
        if token.is_punct(']') {
            return Ok(Expr::Vector(elements));
        }
        self.unget(token);

        loop {
            elements.push(self.parse_expression(&[',', ']'], false)?);
            let sep = self.get_token()?;
            if sep.is_punct(']') {
                break;
            }
            if !sep.is_punct(',') {
                return Err(self.unexpected(&sep, "',' or ']'"));
            }
        }
        Ok(Expr::Vector(elements))
    }

    /// `( expr, ... )`
    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_punct('(')?;
        let mut args = Vec::new();

        let token = self.get_token()?;
        if token.is_punct(')') {
            return Ok(args);
        }
        self.unget(token);

        loop {
            args.push(self.parse_expression(&[',', ')'], false)?);
            let sep = self.get_token()?;
            if sep.is_punct(')') {
                break;
            }
            if !sep.is_punct(',') {
                return Err(self.unexpected(&sep, "',' or ')'"));
            }
        }
        Ok(args)
    }

    /// `( name, ... )`
    fn parse_param_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect_punct('(')?;
        let mut params = Vec::new();

        let token = self.get_token()?;
        if token.is_punct(')') {
            return Ok(params);
        }
        self.unget(token);

        loop {
            let (param, _) = self.expect_ident("parameter name")?;
            params.push(param);
            let sep = self.get_token()?;
            if sep.is_punct(')') {
                break;
            }
            if !sep.is_punct(',') {
                return Err(self.unexpected(&sep, "',' or ')'"));
            }
        }
        Ok(params)
    }

    /// Function definition expression; the `function` keyword is already
    /// consumed.
    fn parse_func_def(&mut self) -> Result<Expr, ParseError> {
        let params = self.parse_param_list()?;
        let body = self.parse_block()?;
        Ok(Expr::FuncDef {
            params,
            body: Box::new(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(source: &str) -> Vec<NamedFunc> {
        let mut parser = Parser::new(Rc::new(OperatorSet::default()));
        parser.parse_source("test", source).expect("parse failed")
    }

    fn parse_err(source: &str) -> ParseError {
        let mut parser = Parser::new(Rc::new(OperatorSet::default()));
        parser
            .parse_source("test", source)
            .expect_err("expected parse failure")
    }

    // Parse `source` as a returned expression and render it; operator
    // folding is easiest to check on the printed tree. The parentheses let
    // map literals sit where a statement would otherwise start a block.
    fn expr_text(source: &str) -> String {
        let funcs = parse(&format!("function f() {{ return ({source}); }}"));
        let Stmt::Block(stmts) = &funcs[0].body else {
            panic!("function body must be a block");
        };
        let Stmt::Return(Some(expr)) = &stmts[0] else {
            panic!("expected return statement, got {:?}", stmts[0]);
        };
        expr.to_string()
    }

    #[test]
    fn binary_operators_fold_left() {
        assert_eq!(expr_text("1 - 2 - 3"), "((1 - 2) - 3)");
        assert_eq!(expr_text("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(expr_text("1 * 2 + 3"), "((1 * 2) + 3)");
    }

    #[test]
    fn power_folds_right() {
        assert_eq!(expr_text("2 ^ 3 ^ 2"), "(2 ^ (3 ^ 2))");
    }

    #[test]
    fn prefix_minus_binds_looser_than_power() {
        assert_eq!(expr_text("-2 ^ 2"), "-((2 ^ 2))");
        assert_eq!(expr_text("-a.b"), "-((a . b))");
    }

    #[test]
    fn member_access_binds_tighter_than_index_and_call() {
        assert_eq!(expr_text("a.b[c](d)"), "(a . b)[c](d)");
    }

    #[test]
    fn call_and_index_are_postfix() {
        assert_eq!(expr_text("f(1, 2)[0]"), "f(1, 2)[0]");
        assert_eq!(expr_text("v[0](x)"), "v[0](x)");
    }

    #[test]
    fn member_access_parses_as_operator_call() {
        assert_eq!(expr_text("m.key"), "(m . key)");
    }

    #[test]
    fn assignment_parses_as_operator_call() {
        assert_eq!(expr_text("x = y + 1"), "(x = (y + 1))");
    }

    #[test]
    fn parenthesized_subexpression() {
        assert_eq!(expr_text("(1 + 2) * 3"), "((1 + 2) * 3)");
    }

    #[test]
    fn literals_and_nesting() {
        assert_eq!(expr_text("[1, 2, [3]]"), "[ 1, 2, [ 3 ] ]");
        assert_eq!(expr_text("{ a: 1, \"b\": 2 }"), "{ \"a\" : 1, \"b\" : 2, }");
        assert_eq!(expr_text("[]"), "[  ]");
        assert_eq!(expr_text("{}"), "{ }");
    }

    #[test]
    fn function_definition_expression() {
        assert_eq!(expr_text("function(a, b) { return a; }"), "function(a, b) {...}");
    }

    #[test]
    fn parses_statement_forms() {
        let funcs = parse(indoc! {r#"
            function f(n) {
                var i = 0;
                while (i < n) {
                    if (i == 2) { break; } else ;
                    i = i + 1;
                }
                return i;
            }
        "#});
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].params, vec!["n".to_string()]);
        let Stmt::Block(stmts) = &funcs[0].body else {
            panic!("body must be a block");
        };
        assert!(matches!(&stmts[0], Stmt::Var { name, init: Some(_), .. } if name == "i"));
        assert!(matches!(&stmts[1], Stmt::While { .. }));
        assert!(matches!(&stmts[2], Stmt::Return(Some(_))));
    }

    #[test]
    fn return_without_value() {
        let funcs = parse("function f() { return; }");
        let Stmt::Block(stmts) = &funcs[0].body else {
            panic!("body must be a block");
        };
        assert!(matches!(&stmts[0], Stmt::Return(None)));
    }

    #[test]
    fn rejects_var_without_initializer() {
        let error = parse_err("function f() { var x; }");
        assert!(
            error.message.contains("declared without a value"),
            "got: {error}"
        );
    }

    #[test]
    fn rejects_unknown_operators() {
        let error = parse_err("function f() { return 1 @ 2; }");
        assert!(
            error.message.contains("unknown binary operator '@'"),
            "got: {error}"
        );
        let error = parse_err("function f() { return @1; }");
        assert!(
            error.message.contains("unknown prefix operator '@'"),
            "got: {error}"
        );
    }

    #[test]
    fn rejects_empty_expression() {
        let error = parse_err("function f() { return (); }");
        assert!(error.message.contains("expected expression"), "got: {error}");
    }

    #[test]
    fn rejects_stray_top_level_token() {
        let error = parse_err("var x = 1;");
        assert!(
            error.message.contains("expected 'function' or 'include'"),
            "got: {error}"
        );
    }

    #[test]
    fn rejects_missing_semicolon() {
        let error = parse_err("function f() { return 1 }");
        assert!(error.message.contains("found '}'"), "got: {error}");
    }

    #[test]
    fn reports_lexer_error_with_location() {
        let error = parse_err("function f() { return \"abc; }");
        assert!(error.message.contains("unterminated string"), "got: {error}");
        assert_eq!(error.loc.line, 1);
    }

    #[test]
    fn error_locations_point_at_the_offending_token() {
        let error = parse_err("function f() {\n  1 +;\n}");
        assert_eq!((error.loc.line, error.loc.col), (2, 6));
    }

    #[test]
    fn missing_include_file_is_an_error() {
        let error = parse_err("include \"no/such/file.glim\"");
        assert!(error.message.contains("no/such/file.glim"), "got: {error}");
    }
}
