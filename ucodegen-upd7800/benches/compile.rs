use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use ucodegen::pack::pack_table;
use ucodegen_upd7800::{compile, config, generate};

criterion_group!(basic, compile_benchmark, pack_benchmark);

/// Benchmarks for the full instruction set.
fn compile_benchmark(c: &mut Criterion) {
    let config = config();
    c.bench_function("generate-upd7800", |b| {
        b.iter(|| generate(&config).unwrap())
    });
    c.bench_function("compile-upd7800", |b| b.iter(|| compile(&config).unwrap()));
}

/// Packing cost of the control-word table, independent of row order.
fn pack_benchmark(c: &mut Criterion) {
    let (resolved, tables) = generate(&config()).unwrap();
    let layout = resolved.layout("nrom").unwrap();
    let mut table = tables.get("nrom").unwrap().clone();
    let mut rng = Pcg64Mcg::seed_from_u64(0x7800);
    c.bench_function("pack-nrom-shuffled", |b| {
        b.iter_batched_ref(
            || {
                table.rows.shuffle(&mut rng);
                table.clone()
            },
            |table| pack_table(layout, resolved.types(), table).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_main!(basic);
