//! Aggregation of probe outcomes into summary statistics

use crate::{
    models::metrics::{LatencyStats, ProbeOutcome, ProbeSummary},
    types::ProbeResultKind,
};
use std::collections::BTreeMap;
use std::time::Duration;

/// Reduce a batch of probe outcomes to a summary.
///
/// Loss ratio is kept at full precision. Latency statistics cover successful
/// probes only and are absent when there were none. Every non-success kind is
/// counted separately.
pub fn summarize(outcomes: &[ProbeOutcome]) -> ProbeSummary {
    let attempted = outcomes.len() as u32;

    let mut latencies: Vec<Duration> = Vec::with_capacity(outcomes.len());
    let mut failure_kinds = BTreeMap::new();
    for outcome in outcomes {
        match (outcome.kind, outcome.latency) {
            (ProbeResultKind::Success, Some(latency)) => latencies.push(latency),
            // A success without a measured latency is not a usable reply
            (ProbeResultKind::Success, None) => {
                *failure_kinds.entry(ProbeResultKind::NetworkError).or_insert(0) += 1;
            }
            (kind, _) => *failure_kinds.entry(kind).or_insert(0) += 1,
        }
    }
    let succeeded = latencies.len() as u32;

    let loss_ratio = if attempted == 0 {
        0.0
    } else {
        f64::from(attempted - succeeded) / f64::from(attempted)
    };

    ProbeSummary {
        attempted,
        succeeded,
        loss_ratio,
        latency: latency_stats(&latencies),
        failure_kinds,
    }
}

/// min/avg/max/mdev over a set of latencies; `None` when empty
pub fn latency_stats(latencies: &[Duration]) -> Option<LatencyStats> {
    let min = *latencies.iter().min()?;
    let max = *latencies.iter().max()?;

    let count = latencies.len() as u128;
    let total: u128 = latencies.iter().map(Duration::as_nanos).sum();
    let avg = duration_from_nanos(total / count);

    let mean = avg.as_secs_f64();
    let variance = latencies
        .iter()
        .map(|l| {
            let delta = l.as_secs_f64() - mean;
            delta * delta
        })
        .sum::<f64>()
        / latencies.len() as f64;

    Some(LatencyStats {
        min,
        avg,
        max,
        mdev: Duration::from_secs_f64(variance.sqrt()),
    })
}

fn duration_from_nanos(nanos: u128) -> Duration {
    let secs = (nanos / 1_000_000_000) as u64;
    let subsec = (nanos % 1_000_000_000) as u32;
    Duration::new(secs, subsec)
}
