//! Benchmark group construction, rendering and bytecode decoding time.

use criterion::{criterion_group, criterion_main, Criterion};

use stencil::bytecode;

criterion_main! { benches }
criterion_group! { benches, bench_group, bench_render, bench_decode }

/// Benchmarks the time taken to build a group from compiled templates.
fn bench_group(c: &mut Criterion) {
    let page = benches::page();
    let user = benches::user();
    c.bench_function("group", |b| {
        b.iter(|| {
            stencil::Group::builder()
                .template(page.clone())
                .template(user.clone())
                .build()
                .unwrap()
        });
    });
}

/// Benchmarks the time taken to render a page of users as a string.
fn bench_render(c: &mut Criterion) {
    let mut g = c.benchmark_group("render");
    let group = benches::group();
    for n in [10, 150] {
        let ctx = benches::context::random(n, 42);
        let st = benches::instance(&group, &ctx);
        g.bench_function(format!("users/{n}"), |b| {
            b.iter(|| st.render().to_string());
        });
        g.bench_function(format!("users/{n}/no-indent"), |b| {
            b.iter(|| st.render().with_indent(false).to_string());
        });
    }
}

/// Benchmarks the time taken to decode an encoded program.
fn bench_decode(c: &mut Criterion) {
    let page = benches::page();
    let bytes = bytecode::encode(page.instrs()).unwrap();
    c.bench_function("decode", |b| {
        b.iter(|| bytecode::decode(&bytes).unwrap());
    });
}
