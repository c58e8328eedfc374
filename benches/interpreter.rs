mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn bench_interpreter(c: &mut Criterion) {
    for (label, source) in common::workloads() {
        c.bench_function(&format!("interpreter_prepare_{label}"), |b| {
            b.iter(|| {
                let interp = common::prepared_interp(black_box(source));
                black_box(interp);
            })
        });

        c.bench_function(&format!("interpreter_run_{label}"), |b| {
            let interp = common::prepared_interp(source);
            b.iter(|| {
                let result = interp.call("main", &[]).expect("run");
                black_box(result);
            })
        });
    }
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
