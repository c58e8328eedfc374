//! Embedding surface.
//!
//! A host constructs an [`Interp`], optionally binds its own values and
//! native callables, parses one or more script files, then calls a named
//! script function and gets a [`Value`] back. Top-level names live in a
//! single scope/frame pair that grows as bindings are added; every parsed
//! file's functions are hoisted into it before their bodies analyze, so
//! functions may refer to each other in any order.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::analyzer::{self, symtab::SymTab};
use crate::ast::NamedFunc;
use crate::builtins;
use crate::ops::OperatorSet;
use crate::parser::{ParseError, Parser};
use crate::token::SrcLoc;

pub mod env;
pub mod error;
pub mod eval;
pub mod value;

use env::Frame;
use error::{ExecError, ExecErrorKind};
use value::{Closure, Value};

/// Sink for the `printf` builtin's output.
pub type Output = Rc<RefCell<dyn Write>>;

pub struct Interp {
    ops: Rc<OperatorSet>,
    symtab: Rc<SymTab>,
    globals: Rc<Frame>,
}

impl Interp {
    /// An interpreter with the builtin names bound and `printf` writing to
    /// stdout.
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(io::stdout())))
    }

    /// Same as [`Interp::new`] with `printf` writing to `out` instead.
    pub fn with_output(out: Output) -> Self {
        let mut interp = Self {
            ops: Rc::new(OperatorSet::default()),
            symtab: SymTab::root(),
            globals: Frame::new(None, 0),
        };
        builtins::install(&mut interp, out);
        interp
    }

    /// Bind `name` in the top-level scope. Bindings made before parsing
    /// take part in name resolution like any other top-level name.
    pub fn bind(&mut self, name: &str, value: Value) {
        self.bind_slot(name, Some(value));
    }

    fn bind_slot(&mut self, name: &str, value: Option<Value>) {
        let slot = self.symtab.add(name);
        if slot >= self.globals.width() {
            let index = self.globals.grow(value);
            debug_assert_eq!(index, slot, "scope and frame grew out of step");
        } else {
            self.globals.store(slot, value);
        }
    }

    /// Parse, analyze and install every named function of `path`. The
    /// first error wins; functions installed before a failure stay bound.
    pub fn parse_file(&mut self, path: &str) -> Result<(), ParseError> {
        let mut parser = Parser::new(Rc::clone(&self.ops));
        let funcs = parser.parse_file(path)?;
        self.install(&funcs)
    }

    /// [`Interp::parse_file`] for an in-memory source.
    pub fn parse_source(&mut self, name: &str, source: &str) -> Result<(), ParseError> {
        let mut parser = Parser::new(Rc::clone(&self.ops));
        let funcs = parser.parse_source(name, source)?;
        self.install(&funcs)
    }

    fn install(&mut self, funcs: &[NamedFunc]) -> Result<(), ParseError> {
        // Hoist every name first so function bodies can call each other
        // regardless of definition order.
        for func in funcs {
            self.bind_slot(&func.name, None);
        }
        for func in funcs {
            let fun = analyzer::analyze_func(&func.params, &func.body, &self.symtab)?;
            let closure = Value::Closure(Rc::new(Closure {
                fun,
                env: Rc::clone(&self.globals),
            }));
            self.bind(&func.name, closure);
        }
        Ok(())
    }

    /// Call the top-level function `name` with `args`. A `return` from the
    /// invoked function is a normal return here.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExecError> {
        let loc = SrcLoc::native();
        let fun = self
            .symtab
            .lookup(name)
            .and_then(|(depth, index)| self.globals.get(depth, index))
            .ok_or_else(|| {
                ExecError::new(
                    &loc,
                    ExecErrorKind::FunctionNotFound {
                        name: name.to_string(),
                    },
                )
            })?;
        match fun {
            Value::Closure(_) | Value::Native(_) => fun.call(args, &self.globals, &loc),
            other => Err(ExecError::new(
                &loc,
                ExecErrorKind::NotCallable {
                    type_name: other.type_name(),
                },
            )),
        }
    }
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    struct Run {
        interp: Interp,
        out: Rc<RefCell<Vec<u8>>>,
    }

    impl Run {
        fn new(source: &str) -> Self {
            let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
            let sink: Output = out.clone();
            let mut interp = Interp::with_output(sink);
            interp.parse_source("test", source).expect("parse failed");
            Self { interp, out }
        }

        fn output(&self) -> String {
            String::from_utf8(self.out.borrow().clone()).expect("printf output must be utf-8")
        }
    }

    // Parse `source`, call main() and return everything printf wrote.
    fn run_main(source: &str) -> String {
        let run = Run::new(source);
        run.interp.call("main", &[]).expect("main failed");
        run.output()
    }

    // Parse `source`, call main() and return the execution error text.
    fn run_main_err(source: &str) -> ExecError {
        let run = Run::new(source);
        run.interp
            .call("main", &[])
            .expect_err("expected execution error")
    }

    // Parse a script whose main() returns a value.
    fn eval_main(source: &str) -> Value {
        let run = Run::new(source);
        run.interp.call("main", &[]).expect("main failed")
    }

    fn number(value: &Value) -> f64 {
        match value {
            Value::Number(num) => *num,
            other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn evaluates_arithmetic_with_precedence() {
        assert_eq!(
            run_main(r#"function main() { printf("%d\n", 1 + 2 * 3); }"#),
            "7\n"
        );
    }

    #[test]
    fn operator_folds_match_associativity() {
        assert_eq!(number(&eval_main("function main() { return 1 - 2 - 3; }")), -4.0);
        assert_eq!(number(&eval_main("function main() { return 2 ^ 3 ^ 2; }")), 512.0);
        assert_eq!(number(&eval_main("function main() { return -2 ^ 2; }")), -4.0);
        assert_eq!(number(&eval_main("function main() { return 7 % 4; }")), 3.0);
    }

    #[test]
    fn prefix_operators_apply_to_their_operand() {
        assert_eq!(number(&eval_main("function main() { return -(1 + 2); }")), -3.0);
        let value = eval_main("function main() { return !0; }");
        assert!(matches!(value, Value::Bool(true)), "got {value:?}");
        let value = eval_main("function main() { return !\"text\"; }");
        assert!(matches!(value, Value::Bool(false)), "got {value:?}");
    }

    #[test]
    fn recursion_works() {
        let source = indoc! {r#"
            function fact(n) {
                if (n == 0) { return 1; }
                return n * fact(n - 1);
            }
            function main() { printf("%d\n", fact(5)); }
        "#};
        assert_eq!(run_main(source), "120\n");
    }

    #[test]
    fn mutual_recursion_across_hoisted_names() {
        let source = indoc! {r#"
            function is_even(n) {
                if (n == 0) { return true; }
                return is_odd(n - 1);
            }
            function is_odd(n) {
                if (n == 0) { return false; }
                return is_even(n - 1);
            }
            function main() {
                if (is_even(10)) { return 1; }
                return 0;
            }
        "#};
        assert_eq!(number(&eval_main(source)), 1.0);
    }

    #[test]
    fn closures_capture_their_definition_frame() {
        let source = indoc! {r#"
            function make() {
                var c = 0;
                return function() {
                    c = c + 1;
                    return c;
                };
            }
            function main() {
                var f = make();
                printf("%d %d %d\n", f(), f(), f());
            }
        "#};
        assert_eq!(run_main(source), "1 2 3\n");
    }

    #[test]
    fn separate_closures_do_not_share_frames() {
        let source = indoc! {r#"
            function make() {
                var c = 0;
                return function() {
                    c = c + 1;
                    return c;
                };
            }
            function main() {
                var f = make();
                var g = make();
                f();
                f();
                printf("%d %d", f(), g());
            }
        "#};
        assert_eq!(run_main(source), "3 1");
    }

    #[test]
    fn var_shadowing_sees_the_outer_binding_in_initializers() {
        let source = indoc! {r#"
            function main() {
                var x = 1;
                var x = x + 1;
                return x;
            }
        "#};
        assert_eq!(number(&eval_main(source)), 2.0);
    }

    #[test]
    fn vector_writes_append_exactly_at_length() {
        let source = indoc! {r#"
            function main() {
                var v = [10, 20];
                v[2] = 30;
                printf("%d %d %d\n", v[0], v[1], v[2]);
            }
        "#};
        assert_eq!(run_main(source), "10 20 30\n");

        let error = run_main_err(indoc! {r#"
            function main() {
                var v = [10, 20];
                v[3] = 40;
            }
        "#});
        assert!(
            error.to_string().contains("array index out of bounds: 3"),
            "got: {error}"
        );
    }

    #[test]
    fn vectors_share_by_reference() {
        let source = indoc! {r#"
            function push(v, x) { v[1] = x; }
            function main() {
                var v = [1];
                push(v, 2);
                printf("%d%d", v[0], v[1]);
            }
        "#};
        assert_eq!(run_main(source), "12");
    }

    #[test]
    fn map_reads_writes_and_member_sugar() {
        let source = indoc! {r#"
            function main() {
                var m = {};
                m["x"] = 1;
                m.y = 2;
                printf("%d %d\n", m["x"], m.y);
            }
        "#};
        assert_eq!(run_main(source), "1 2\n");
    }

    #[test]
    fn missing_map_key_reads_null() {
        let source = indoc! {r#"
            function main() {
                var m = { a: 1 };
                if (m["b"] == null) { return 1; }
                return 0;
            }
        "#};
        assert_eq!(number(&eval_main(source)), 1.0);
    }

    #[test]
    fn map_display_preserves_insertion_order() {
        let source = indoc! {r#"
            function main() {
                var m = { a: 1, b: 2 };
                m.b = 3;
                m.c = 4;
                printf("%s", m);
            }
        "#};
        assert_eq!(run_main(source), "{ \"a\" : 1, \"b\" : 3, \"c\" : 4, }");
    }

    #[test]
    fn calling_a_map_member_function() {
        let source = indoc! {r#"
            function main() {
                var m = { f: function() { return 1; } };
                return m.f();
            }
        "#};
        assert_eq!(number(&eval_main(source)), 1.0);
    }

    #[test]
    fn while_with_break() {
        let source = indoc! {r#"
            function main() {
                var i = 0;
                while (i < 3) {
                    if (i == 2) { break; }
                    i = i + 1;
                }
                printf("%d\n", i);
            }
        "#};
        assert_eq!(run_main(source), "2\n");
    }

    #[test]
    fn break_only_exits_the_innermost_loop() {
        let source = indoc! {r#"
            function main() {
                var total = 0;
                var i = 0;
                while (i < 2) {
                    var j = 0;
                    while (true) {
                        if (j == 2) { break; }
                        j = j + 1;
                        total = total + 1;
                    }
                    i = i + 1;
                }
                return total;
            }
        "#};
        assert_eq!(number(&eval_main(source)), 4.0);
    }

    #[test]
    fn return_inside_loop_exits_the_function() {
        let source = indoc! {r#"
            function main() {
                var i = 0;
                while (true) {
                    if (i == 5) { return i; }
                    i = i + 1;
                }
            }
        "#};
        assert_eq!(number(&eval_main(source)), 5.0);
    }

    #[test]
    fn equality_semantics() {
        let source = indoc! {r#"
            function main() {
                var a = [1, 2];
                var b = [1, 2];
                var r = [];
                r[0] = a == b;
                r[1] = a == a;
                r[2] = 1 == 1;
                r[3] = 1 == "1";
                r[4] = "x" == "x";
                return r;
            }
        "#};
        let value = eval_main(source);
        assert_eq!(value.to_string(), "[ false, true, true, false, true ]");
    }

    #[test]
    fn arity_mismatch_reports_expected_and_found() {
        let source = indoc! {r#"
            function two(a, b) { return a; }
            function main() { return two(1); }
        "#};
        let error = run_main_err(source);
        assert!(
            error.to_string().contains("expected 2, got 1"),
            "got: {error}"
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        let source = indoc! {r#"
            function boom() { error("must not evaluate"); }
            function main() {
                var a = 0 && boom();
                var b = 1 || boom();
                var c = 2 && 3;
                var d = 0 || 4;
                printf("%d %d %d %d", a, b, c, d);
            }
        "#};
        assert_eq!(run_main(source), "0 1 3 4");
    }

    #[test]
    fn user_exceptions_carry_their_value() {
        let source = indoc! {r#"
            function main() { error({ code: 42 }); }
        "#};
        let error = run_main_err(source);
        let value = error.value();
        assert_eq!(
            value
                .index_get(&Value::string("code"), &SrcLoc::native())
                .expect("map value")
                .to_string(),
            "42"
        );

        let error = run_main_err(r#"function main() { error("boom"); }"#);
        assert!(error.to_string().contains("boom"), "got: {error}");

        let error = run_main_err(r#"function main() { error(); }"#);
        assert!(error.to_string().contains("error"), "got: {error}");
    }

    #[test]
    fn host_bindings_participate_in_resolution() {
        let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let sink: Output = out.clone();
        let mut interp = Interp::with_output(sink);
        interp.bind("greeting", Value::string("hi"));
        interp.bind(
            "double",
            Value::native(|args, _env, loc| {
                let num = args[0].as_number(loc)?;
                Ok(Value::Number(num * 2.0))
            }),
        );
        interp
            .parse_source(
                "test",
                r#"function main() { printf("%s %d", greeting, double(21)); }"#,
            )
            .expect("parse failed");
        interp.call("main", &[]).expect("main failed");
        assert_eq!(String::from_utf8(out.borrow().clone()).expect("utf-8"), "hi 42");
    }

    #[test]
    fn call_passes_host_arguments() {
        let run = Run::new("function add(a, b) { return a + b; }");
        let result = run
            .interp
            .call("add", &[Value::Number(2.0), Value::Number(3.0)])
            .expect("call failed");
        assert_eq!(number(&result), 5.0);
    }

    #[test]
    fn calling_unknown_or_non_callable_names_fails() {
        let run = Run::new("function main() { return 0; }");
        let error = run
            .interp
            .call("missing", &[])
            .expect_err("expected lookup failure");
        assert!(
            error.to_string().contains("function 'missing' not found"),
            "got: {error}"
        );

        let mut interp = Interp::new();
        interp.bind("x", Value::Number(1.0));
        let error = interp.call("x", &[]).expect_err("expected call failure");
        assert!(error.to_string().contains("non-function"), "got: {error}");
    }

    #[test]
    fn failed_analysis_leaves_earlier_functions_installed() {
        let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let sink: Output = out.clone();
        let mut interp = Interp::with_output(sink);
        let error = interp
            .parse_source(
                "test",
                indoc! {r#"
                    function good() { return 1; }
                    function bad() { return missing; }
                "#},
            )
            .expect_err("expected analysis failure");
        assert!(error.message.contains("undeclared variable 'missing'"));

        // `good` analyzed first and stays callable; `bad` is hoisted but
        // never installed, so its slot reads as undefined.
        let result = interp.call("good", &[]).expect("good must stay installed");
        assert!(matches!(result, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn hoisted_but_uninstalled_names_read_as_undefined() {
        let mut interp = Interp::new();
        let error = interp
            .parse_source(
                "test",
                indoc! {r#"
                    function caller() { return broken(); }
                    function broken() { return missing; }
                "#},
            )
            .expect_err("expected analysis failure");
        assert!(error.message.contains("undeclared variable 'missing'"));

        let error = interp
            .call("caller", &[])
            .expect_err("expected undefined variable");
        assert!(error.to_string().contains("undefined variable"), "got: {error}");
    }

    #[test]
    fn parse_errors_carry_file_line_col_prefix() {
        let mut interp = Interp::new();
        let error = interp
            .parse_source("my.glim", "function f() {\n  return missing;\n}")
            .expect_err("expected analysis failure");
        assert_eq!(
            error.to_string(),
            "my.glim:2:10: undeclared variable 'missing'"
        );
    }

    #[test]
    fn top_level_return_is_a_normal_return() {
        let run = Run::new("function main() { return; }");
        let result = run.interp.call("main", &[]).expect("main failed");
        assert!(matches!(result, Value::Null));
    }

    #[test]
    fn strict_argument_order_is_left_to_right() {
        let source = indoc! {r#"
            function first() { printf("a"); return 1; }
            function second() { printf("b"); return 2; }
            function take(x, y) { return x + y; }
            function main() { return take(first(), second()); }
        "#};
        let run = Run::new(source);
        let result = run.interp.call("main", &[]).expect("main failed");
        assert_eq!(number(&result), 3.0);
        assert_eq!(run.output(), "ab");
    }

    #[test]
    fn callee_type_error_fires_before_arguments_evaluate() {
        let source = indoc! {r#"
            function boom() { error("must not evaluate"); }
            function main() {
                var notfn = 1;
                notfn(boom());
            }
        "#};
        let error = run_main_err(source);
        assert!(error.to_string().contains("non-function"), "got: {error}");
    }
}
