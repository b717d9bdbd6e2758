use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fsirs::qr::{compute_qr_decomposition, DEFAULT_DEFLATION_THRESHOLD};
use fsirs::substitution::backward_substitution_multiple_rhs;
use fsirs::{inv_jacobian_times_residual, HistoryEntry, HistoryStore};
use nalgebra::DVector;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

const INTERFACE_DOFS: usize = 20_000;

fn random_columns(rng: &mut SmallRng, count: usize, len: usize) -> Vec<DVector<f64>> {
    (0..count)
        .map(|_| DVector::from_iterator(len, (0..len).map(|_| StandardNormal.sample(&mut *rng))))
        .collect()
}

fn history(rng: &mut SmallRng, layers: usize, columns: usize) -> HistoryStore<DVector<f64>> {
    let mut store = HistoryStore::new(layers);
    for _ in 0..layers {
        let d = random_columns(rng, columns, INTERFACE_DOFS);
        let r = random_columns(rng, columns, INTERFACE_DOFS);
        let mut q = r.clone();
        let factors = compute_qr_decomposition(&mut q, DEFAULT_DEFLATION_THRESHOLD).unwrap();
        let z = backward_substitution_multiple_rhs(&factors.r, &q).unwrap();
        store.push(HistoryEntry::new(d, r, z).unwrap());
    }
    store
}

fn bench_qr(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(1);
    let mut group = c.benchmark_group("qr");
    for columns in [4, 8, 16] {
        let original = random_columns(&mut rng, columns, INTERFACE_DOFS);
        group.bench_with_input(BenchmarkId::from_parameter(columns), &original, |b, original| {
            b.iter(|| {
                let mut q = original.clone();
                compute_qr_decomposition(black_box(&mut q), DEFAULT_DEFLATION_THRESHOLD).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_history_applier(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(2);
    let residual = random_columns(&mut rng, 1, INTERFACE_DOFS).remove(0);
    let mut group = c.benchmark_group("inv_jacobian_times_residual");
    for layers in [1, 4, 8] {
        let store = history(&mut rng, layers, 6);
        group.bench_with_input(BenchmarkId::from_parameter(layers), &store, |b, store| {
            b.iter(|| inv_jacobian_times_residual(black_box(&residual), store))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_qr, bench_history_applier);
criterion_main!(benches);
