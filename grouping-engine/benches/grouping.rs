//! FILENAME: grouping-engine/benches/grouping.rs
//! Placement cost of the group tree at display-scale row counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grid_model::{Diagnostics, GroupBy, SortDirection, StructuredValue};
use grouping_engine::{build_groups, RowKeyResolver};
use layout_engine::{ColumnLayout, ColumnSpec, LayoutOptions};

fn rows(count: usize) -> Vec<StructuredValue> {
    (0..count)
        .map(|i| {
            StructuredValue::map([
                ("id", StructuredValue::from(i as i64)),
                ("region", StructuredValue::from(format!("region-{}", i % 12))),
                ("team", StructuredValue::from(format!("team-{}", i % 40))),
                ("amount", StructuredValue::from((i % 997) as f64)),
            ])
        })
        .collect()
}

fn layout() -> ColumnLayout<StructuredValue> {
    let specs = vec![
        ColumnSpec::new("id").primary_key(),
        ColumnSpec::new("region"),
        ColumnSpec::new("team"),
        ColumnSpec::new("amount"),
    ];
    let options = LayoutOptions {
        table_id: "bench",
        ..Default::default()
    };
    ColumnLayout::build(&specs, &options, &mut Diagnostics::new()).unwrap()
}

fn bench_build_groups(c: &mut Criterion) {
    let layout = layout();
    let keys = RowKeyResolver::from_layout(&layout);
    let group_by = vec![
        GroupBy::new("region", SortDirection::Asc),
        GroupBy::new("team", SortDirection::Asc),
    ];

    let mut group = c.benchmark_group("build_groups");
    for count in [100usize, 1_000, 10_000] {
        let data = rows(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |b, data| {
            b.iter(|| build_groups(black_box(data), black_box(&group_by), &layout, &keys));
        });
    }
    group.finish();
}

fn bench_flat(c: &mut Criterion) {
    let layout = layout();
    let keys = RowKeyResolver::from_layout(&layout);
    let data = rows(1_000);

    c.bench_function("build_groups_flat_1000", |b| {
        b.iter(|| build_groups(black_box(&data), &[], &layout, &keys));
    });
}

criterion_group!(benches, bench_build_groups, bench_flat);
criterion_main!(benches);
