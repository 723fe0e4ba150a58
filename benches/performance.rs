use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use spillway_core::id::SpillIdGen;
use spillway_core::prelude::{Attribute, DataType, Schema, Tuple, Value};
use spillway_io::MemoryStorage;
use spillway_mem::{Codec, SpillManager};
use spillway_operators::{
    collect_all, ExecContext, ExternalSort, JoinCondition, Operator, SortConfig, SortMergeJoin,
    ValuesScan,
};

const PAGE_SIZE: usize = 4096;

fn context() -> ExecContext {
    let spill = SpillManager::new(Arc::new(MemoryStorage::new()), Codec::None, "bench");
    ExecContext::new(Arc::new(spill), Arc::new(SpillIdGen::new()), PAGE_SIZE)
}

fn keyed_rows(rows: usize, modulo: i64) -> Vec<Tuple> {
    (0..rows as i64)
        .map(|i| {
            let key = (i * 7919) % modulo;
            Tuple::new(vec![Value::Int(key), Value::Str(format!("row-{i}"))])
        })
        .collect()
}

fn schema(table: &str) -> Schema {
    Schema::new(vec![
        Attribute::new(table, "k", DataType::Int),
        Attribute::new(table, "payload", DataType::Str),
    ])
}

fn scan(table: &str, rows: &[Tuple]) -> Box<dyn Operator> {
    Box::new(ValuesScan::new(schema(table), rows.to_vec(), PAGE_SIZE))
}

fn bench_external_sort(c: &mut Criterion) {
    let rows = keyed_rows(50_000, 100_003);
    c.bench_function("external_sort_50k_b8", |b| {
        b.iter(|| {
            let config = SortConfig::ascending(vec![Attribute::new("t", "k", DataType::Int)], 8);
            let mut sort = ExternalSort::new(scan("t", &rows), config, context());
            let out = collect_all(&mut sort).unwrap();
            assert_eq!(out.len(), rows.len());
        })
    });
}

fn bench_sort_merge_join(c: &mut Criterion) {
    let left = keyed_rows(10_000, 5_000);
    let right = keyed_rows(10_000, 5_000);
    let conditions = vec![JoinCondition::new(
        Attribute::new("l", "k", DataType::Int),
        Attribute::new("r", "k", DataType::Int),
    )];
    c.bench_function("sort_merge_join_10k_b8", |b| {
        b.iter(|| {
            let ctx = context();
            let mut join = SortMergeJoin::new(
                scan("l", &left),
                scan("r", &right),
                conditions.clone(),
                8,
                ctx,
            );
            let _ = collect_all(&mut join).unwrap();
        })
    });
}

criterion_group!(benches, bench_external_sort, bench_sort_merge_join);
criterion_main!(benches);
