use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use glim::Interp;
use glim::interpreter::Output;

/// Bench workloads: (label, script source). Each defines a `main()` sized
/// to exercise the evaluator rather than the builtins.
pub fn workloads() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "fib",
            r#"
            function fib(n) {
                if (n < 2) { return n; }
                return fib(n - 1) + fib(n - 2);
            }
            function main() { return fib(15); }
            "#,
        ),
        (
            "loop_sum",
            r#"
            function main() {
                var total = 0;
                var i = 0;
                while (i < 5000) {
                    total = total + i;
                    i = i + 1;
                }
                return total;
            }
            "#,
        ),
        (
            "containers",
            r#"
            function main() {
                var v = [];
                var m = {};
                var i = 0;
                while (i < 200) {
                    v[i] = i * 2;
                    m[i % 16] = v[i];
                    i = i + 1;
                }
                return m[7];
            }
            "#,
        ),
    ]
}

/// An interpreter with the workload parsed and printf discarded.
pub fn prepared_interp(source: &str) -> Interp {
    let sink: Output = Rc::new(RefCell::new(io::sink()));
    let mut interp = Interp::with_output(sink);
    interp.parse_source("bench", source).expect("parse");
    interp
}
