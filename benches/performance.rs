//! Performance benchmarks for the diagnostic pipeline
//!
//! Covers the pure stages: aggregation of outcomes, classification and
//! report rendering.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use netdiag::{
    diagnose,
    diagnostics::Evidence,
    output::{MarkdownFormatter, OutputFormatter},
    summarize, DiagnosticReport, ProbeMethod, ProbeOutcome, ReportBuilder, ResolutionOutcome, ResolvedAddress,
};
use std::time::Duration;

/// Outcomes with roughly one loss in five
fn create_sample_outcomes(count: u32) -> Vec<ProbeOutcome> {
    (0..count)
        .map(|sequence| match sequence % 5 {
            3 => ProbeOutcome::timeout(sequence, "no reply"),
            _ => ProbeOutcome::success(sequence, Duration::from_micros(9_000 + u64::from(sequence % 37) * 113)),
        })
        .collect()
}

fn create_sample_report(count: u32) -> DiagnosticReport {
    let address = ResolvedAddress::new("192.0.2.7".parse().unwrap(), None);
    let outcomes = create_sample_outcomes(count);
    let summary = summarize(&outcomes);
    let addresses = [address];
    let diagnosis = diagnose(
        &Evidence {
            resolution: Ok(&addresses[..]),
            selected: Some(&address),
            summary: Some(&summary),
            method: ProbeMethod::Icmp,
        },
        0.5,
    );

    ReportBuilder::new()
        .target("bench.example")
        .resolution(ResolutionOutcome::Resolved { addresses: vec![address] })
        .selected_address(address)
        .probe_method(ProbeMethod::Icmp)
        .outcomes(outcomes)
        .summary(summary)
        .diagnosis(diagnosis)
        .loss_threshold(0.5)
        .build()
        .unwrap()
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");

    for count in [4u32, 100, 1_000] {
        let outcomes = create_sample_outcomes(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &outcomes, |b, outcomes| {
            b.iter(|| summarize(black_box(outcomes)))
        });
    }

    group.finish();
}

fn bench_diagnose(c: &mut Criterion) {
    let address = ResolvedAddress::new("192.0.2.7".parse().unwrap(), None);
    let addresses = [address];
    let summary = summarize(&create_sample_outcomes(100));

    c.bench_function("diagnose", |b| {
        b.iter(|| {
            diagnose(
                black_box(&Evidence {
                    resolution: Ok(&addresses[..]),
                    selected: Some(&address),
                    summary: Some(&summary),
                    method: ProbeMethod::Icmp,
                }),
                black_box(0.5),
            )
        })
    });
}

fn bench_render(c: &mut Criterion) {
    let report = create_sample_report(20);
    let markdown = MarkdownFormatter::new();

    c.bench_function("render_markdown", |b| b.iter(|| markdown.format_report(black_box(&report))));
    c.bench_function("render_json", |b| b.iter(|| black_box(&report).to_json()));
}

criterion_group!(benches, bench_summarize, bench_diagnose, bench_render);
criterion_main!(benches);
