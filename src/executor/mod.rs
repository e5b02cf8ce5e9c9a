//! Probe execution
//!
//! The [`Prober`] sends a batch of probes to one address:
//! - probes run concurrently under a configurable in-flight ceiling
//! - each probe has its own timeout and never delays the others
//! - every outcome lands in the slot of its own sequence number
//! - an overall deadline or cancellation forces pending probes to Timeout

use crate::{
    client::Transport,
    models::{DiagnosticOptions, ProbeOutcome},
    types::{ProbeMethod, ProbeResult, ResolvedAddress},
};
use futures::stream::{FuturesUnordered, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Detail recorded on probes forced to Timeout by the overall deadline
pub const OVERALL_TIMEOUT_DETAIL: &str = "overall timeout";
/// Detail recorded on probes forced to Timeout by cancellation
pub const CANCELLED_DETAIL: &str = "cancelled";

/// System resource information used to size the in-flight ceiling
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Number of logical CPU cores
    pub cpu_cores: usize,
    /// Default ceiling on probes in flight
    pub optimal_concurrency: usize,
}

impl SystemResources {
    pub fn detect() -> Self {
        let cpu_cores = num_cpus::get();

        // Probes are I/O bound: 2x cores, capped to a sane range
        let optimal_concurrency = (cpu_cores * 2).clamp(4, 50);

        Self { cpu_cores, optimal_concurrency }
    }
}

/// Timing parameters of one probe batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbePlan {
    pub count: u32,
    pub timeout_per_probe: Duration,
    pub overall_timeout: Duration,
}

impl ProbePlan {
    pub fn from_options(options: &DiagnosticOptions) -> Self {
        Self {
            count: options.probe_count,
            timeout_per_probe: options.timeout_per_probe,
            overall_timeout: options.effective_overall_timeout(),
        }
    }
}

/// Sends probe batches through a transport
#[derive(Clone)]
pub struct Prober {
    transport: Arc<dyn Transport>,
    max_in_flight: usize,
}

impl Prober {
    pub fn new(transport: Arc<dyn Transport>, max_in_flight: usize) -> Self {
        Self {
            transport,
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn method(&self) -> ProbeMethod {
        self.transport.method()
    }

    /// Probe `address` `plan.count` times.
    ///
    /// Always returns exactly `plan.count` outcomes ordered by sequence
    /// number 0..N-1, whatever the completion order.
    pub async fn probe(
        &self,
        address: &ResolvedAddress,
        plan: &ProbePlan,
        cancel: &CancellationToken,
    ) -> Vec<ProbeOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut slots: Vec<Option<ProbeOutcome>> = vec![None; plan.count as usize];

        let mut pending: FuturesUnordered<_> = (0..plan.count)
            .map(|sequence| {
                let semaphore = semaphore.clone();
                let transport = self.transport.clone();
                let address = *address;
                let per_probe = plan.timeout_per_probe;

                async move {
                    // The semaphore is never closed; a failed acquire just skips the ceiling
                    let _permit = semaphore.acquire().await.ok();
                    let result = match tokio::time::timeout(per_probe, transport.send_probe(&address, per_probe)).await {
                        Ok(result) => result,
                        Err(_) => ProbeResult::timeout().with_detail(format!("no reply within {:?}", per_probe)),
                    };
                    (sequence, ProbeOutcome::from_result(sequence, result))
                }
            })
            .collect();

        let deadline = tokio::time::sleep(plan.overall_timeout);
        tokio::pin!(deadline);

        let interrupted = loop {
            tokio::select! {
                biased;
                next = pending.next() => match next {
                    Some((sequence, outcome)) => slots[sequence as usize] = Some(outcome),
                    None => break None,
                },
                _ = cancel.cancelled() => break Some(CANCELLED_DETAIL),
                _ = &mut deadline => break Some(OVERALL_TIMEOUT_DETAIL),
            }
        };

        // Dropping the stream cancels whatever is still in flight
        drop(pending);

        slots
            .into_iter()
            .zip(0u32..)
            .map(|(slot, sequence)| {
                slot.unwrap_or_else(|| {
                    ProbeOutcome::timeout(sequence, interrupted.unwrap_or(OVERALL_TIMEOUT_DETAIL))
                })
            })
            .collect()
    }
}
