use criterion::{black_box, criterion_group, criterion_main, Criterion};
use formix_numerical::{central_difference, clenshaw_curtis, tanh_sinh, trapezoid};
use formix_types::RealDomain;

// ============================================================================
// Quadrature Benchmarks
// ============================================================================

fn bench_trapezoid(c: &mut Criterion) {
    let d = RealDomain::new();
    c.bench_function("trapezoid 1000 panels", |b| {
        b.iter(|| black_box(trapezoid(&d, |x: &f64| Ok(x.sin()), &0.0, &1.0, 1000).unwrap()))
    });
}

fn bench_tanh_sinh(c: &mut Criterion) {
    let d = RealDomain::new();
    c.bench_function("tanh-sinh to 1e-12", |b| {
        b.iter(|| black_box(tanh_sinh(&d, |x: &f64| Ok(x.exp()), &0.0, &1.0, 10, 1e-12).unwrap()))
    });
}

fn bench_clenshaw_curtis(c: &mut Criterion) {
    let d = RealDomain::new();
    c.bench_function("clenshaw-curtis 65 points", |b| {
        b.iter(|| black_box(clenshaw_curtis(&d, |x: &f64| Ok(x.exp()), &0.0, &1.0, 65).unwrap()))
    });
}

// ============================================================================
// Differentiation Benchmarks
// ============================================================================

fn bench_central_difference(c: &mut Criterion) {
    let d = RealDomain::new();
    c.bench_function("central difference order 4", |b| {
        b.iter(|| black_box(central_difference(&d, |x: &f64| Ok(x.cos()), &1.0, 4, &1e-2).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_trapezoid,
    bench_tanh_sinh,
    bench_clenshaw_curtis,
    bench_central_difference
);
criterion_main!(benches);
