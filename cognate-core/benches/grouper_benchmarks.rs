//! Benchmarks for vector fusion and threshold grouping

use cognate_core::{
    vector::{fuse, tokenize},
    AlignmentChoices, AlignmentRecord, DatumId, EntryId, GroupId, ThresholdGrouper, VarietyId,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

/// Build `varieties` grouped alignments of a form `width` segments long
fn generate_records(varieties: u32, width: usize) -> (Vec<VarietyId>, Vec<AlignmentRecord>) {
    let segments = ['p', 't', 'k', 'a', 'e', 'i', 'o', 'u', 's', 'm'];
    let members: Vec<VarietyId> = (1..=varieties).map(VarietyId).collect();
    let records = members
        .iter()
        .map(|&variety| {
            let text: String = (0..width)
                .map(|i| segments[(i + variety as usize) % segments.len()])
                .collect();
            let mut record = AlignmentRecord::new(DatumId(variety), variety, text).unwrap();
            record.set_group(Some(GroupId(1)));
            record
        })
        .collect();
    (members, records)
}

fn benchmark_fuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuse");

    for width in [8, 32, 128].iter() {
        let vector: String = (0..*width).map(|i| if i % 5 == 4 { '-' } else { '=' }).collect();
        let holds = vector.chars().filter(|ch| *ch == '=').count();
        let text: String = "kʷa".chars().cycle().take(holds).collect();

        group.bench_with_input(BenchmarkId::from_parameter(width), &vector, |b, vector| {
            b.iter(|| {
                let display = fuse(black_box(vector), black_box(&text)).unwrap();
                tokenize(&display).unwrap()
            });
        });
    }

    group.finish();
}

fn benchmark_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("threshold_grouping");

    for varieties in [4, 16, 64].iter() {
        let (members, records) = generate_records(*varieties, 12);
        let grouper = ThresholdGrouper::new(2);
        let choices = AlignmentChoices::new();

        group.bench_with_input(
            BenchmarkId::from_parameter(varieties),
            &records,
            |b, records| {
                b.iter(|| {
                    grouper.group(
                        EntryId(1),
                        black_box(&members),
                        &[GroupId(1)],
                        black_box(records),
                        &choices,
                    )
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_fuse, benchmark_grouping);
criterion_main!(benches);
