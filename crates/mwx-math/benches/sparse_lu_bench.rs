use criterion::{criterion_group, criterion_main, Criterion};
use mwx_math::parser::Expr;
use mwx_math::sparse::TripletBuilder;
use std::hint::black_box;

/// 2D five-point Dirichlet Laplacian on an `n x n` interior grid.
fn laplacian_2d(n: usize) -> TripletBuilder {
    let idx = |i: usize, j: usize| i * n + j;
    let mut a = TripletBuilder::with_capacity(n * n, 5 * n * n);
    for i in 0..n {
        for j in 0..n {
            a.push(idx(i, j), idx(i, j), -4.0);
            if i > 0 {
                a.push(idx(i, j), idx(i - 1, j), 1.0);
            }
            if i + 1 < n {
                a.push(idx(i, j), idx(i + 1, j), 1.0);
            }
            if j > 0 {
                a.push(idx(i, j), idx(i, j - 1), 1.0);
            }
            if j + 1 < n {
                a.push(idx(i, j), idx(i, j + 1), 1.0);
            }
        }
    }
    a
}

fn bench_factor_64(c: &mut Criterion) {
    let a = laplacian_2d(64);
    c.bench_function("sparse_lu_factor_64x64", |b| {
        b.iter(|| black_box(a.factor().map(|lu| lu.dim())))
    });
}

fn bench_solve_64(c: &mut Criterion) {
    let a = laplacian_2d(64);
    let Ok(lu) = a.factor() else {
        return;
    };
    let rhs: Vec<f64> = (0..a.dim()).map(|i| (i as f64 * 1e-3).cos()).collect();
    c.bench_function("sparse_lu_solve_64x64", |b| {
        b.iter(|| black_box(lu.solve(&rhs).map(|x| x[0])))
    });
}

fn bench_expression_eval(c: &mut Criterion) {
    let Ok(expr) = Expr::parse(
        "max(-((x-1e-6)**2+(z-2e-6)**2-(5e-7)**2),-max(max(x-(4e-6),(2e-6)-x),max(z-(8e-6),(6e-6)-z)))",
    ) else {
        return;
    };
    c.bench_function("implicit_function_eval_4096", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for k in 0..4096 {
                let x = k as f64 * 2.5e-9;
                acc += expr.eval_at(x, 0.0, 5e-6, 0.0);
            }
            black_box(acc)
        })
    });
}

criterion_group!(benches, bench_factor_64, bench_solve_64, bench_expression_eval);
criterion_main!(benches);
