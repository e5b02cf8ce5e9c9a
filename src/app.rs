//! Diagnostic run orchestration
//!
//! A run resolves the target, probes up to `max_addresses` of the resolved
//! addresses, summarizes the selected batch, diagnoses it and assembles the
//! report. Network failures along the way are data; only contract
//! violations and invalid options abort with an [`AppError`].

use crate::{
    client::{transport_for, TcpConnectTransport, Transport},
    diagnostics::{diagnose, Evidence},
    dns::{name_service_for, NameService, Resolver},
    error::{AppError, Result},
    executor::{ProbePlan, Prober},
    logging::ProbeLogger,
    log_debug, log_info, log_warn,
    models::{DiagnosticOptions, ProbeOutcome, ProbeSummary},
    report::{DiagnosticReport, ReportBuilder, ResolutionOutcome},
    stats::summarize,
    types::{DnsConfig, ProbeMethod, ProbeResultKind, ResolutionError, ResolvedAddress, Target},
};
use std::{sync::Arc, time::Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Batch reported for the selected address
struct Batch {
    address: ResolvedAddress,
    method: ProbeMethod,
    fallback_used: bool,
    outcomes: Vec<ProbeOutcome>,
    summary: ProbeSummary,
}

/// Runs diagnoses against injected name service and transport collaborators
#[derive(Clone)]
pub struct DiagnosticEngine {
    name_service: Arc<dyn NameService>,
    transport: Arc<dyn Transport>,
    fallback: Option<Arc<dyn Transport>>,
    logger: ProbeLogger,
}

impl DiagnosticEngine {
    pub fn new(name_service: Arc<dyn NameService>, transport: Arc<dyn Transport>) -> Self {
        Self {
            name_service,
            transport,
            fallback: None,
            logger: ProbeLogger::quiet(),
        }
    }

    /// Engine backed by the configured resolver and the system transports
    pub fn from_options(dns_config: &DnsConfig, options: &DiagnosticOptions) -> Result<Self> {
        let engine = Self::new(name_service_for(dns_config)?, transport_for(options.probe_method, options.tcp_port));

        Ok(match options.probe_method {
            ProbeMethod::Icmp if options.tcp_fallback => {
                engine.with_fallback(Arc::new(TcpConnectTransport::new(options.tcp_port)))
            }
            _ => engine,
        })
    }

    /// Transport used when every primary probe of a batch is permission-denied
    pub fn with_fallback(mut self, transport: Arc<dyn Transport>) -> Self {
        self.fallback = Some(transport);
        self
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn method(&self) -> ProbeMethod {
        self.transport.method()
    }

    /// Run one diagnosis to completion
    pub async fn run(&self, target: &str, options: &DiagnosticOptions) -> Result<DiagnosticReport> {
        self.run_with_cancel(target, options, CancellationToken::new()).await
    }

    /// Run one diagnosis; cancelling the token forces pending probes to
    /// Timeout and the partial batch is diagnosed normally. A lookup still
    /// in progress ends as a resolution timeout.
    pub async fn run_with_cancel(
        &self,
        target: &str,
        options: &DiagnosticOptions,
        cancel: CancellationToken,
    ) -> Result<DiagnosticReport> {
        options.validate()?;

        let run_id = Uuid::new_v4();
        let correlation_id = run_id.to_string();
        let logger = self.logger.logger();

        logger.start_operation("diagnose", &correlation_id).await;
        let report = self.diagnose_target(target, options, &cancel, run_id, &correlation_id).await;
        logger.end_operation(&correlation_id, "diagnose", report.is_ok()).await;

        report
    }

    async fn diagnose_target(
        &self,
        target: &str,
        options: &DiagnosticOptions,
        cancel: &CancellationToken,
        run_id: Uuid,
        correlation_id: &str,
    ) -> Result<DiagnosticReport> {
        let started = Instant::now();
        let logger = self.logger.logger();

        log_debug!(logger, "Diagnosing '{}' with {} {} probe(s)", target.trim(), options.probe_count, self.method());

        let resolver = Resolver::new(self.name_service.clone(), options.resolve_timeout);
        // A cancelled lookup is reported like one that ran out of time
        let resolution = match Target::parse(target) {
            Ok(parsed) => tokio::select! {
                biased;
                result = resolver.resolve(&parsed) => result,
                _ = cancel.cancelled() => Err(ResolutionError::ResolutionTimeout {
                    name: parsed.host().to_string(),
                    timeout: started.elapsed(),
                }),
            },
            Err(error) => Err(error),
        };
        self.logger
            .log_resolution(target.trim(), &resolver.describe(), &resolution, started.elapsed(), correlation_id)
            .await;

        let builder = ReportBuilder::new()
            .run_id(run_id)
            .target(target.trim())
            .resolution(ResolutionOutcome::from(&resolution))
            .loss_threshold(options.loss_threshold);

        let addresses = match &resolution {
            Ok(addresses) => addresses,
            Err(error) => {
                let diagnosis = diagnose(
                    &Evidence {
                        resolution: Err(error),
                        selected: None,
                        summary: None,
                        method: self.method(),
                    },
                    options.loss_threshold,
                );
                self.logger.log_diagnosis(target.trim(), &diagnosis, correlation_id).await;

                return builder
                    .probe_method(self.method())
                    .diagnosis(diagnosis)
                    .elapsed(started.elapsed())
                    .build();
            }
        };

        let batch = self.probe_addresses(addresses, options, cancel, correlation_id).await?;

        let diagnosis = diagnose(
            &Evidence {
                resolution: Ok(addresses),
                selected: Some(&batch.address),
                summary: Some(&batch.summary),
                method: batch.method,
            },
            options.loss_threshold,
        );
        self.logger.log_diagnosis(target.trim(), &diagnosis, correlation_id).await;
        log_info!(logger, "Diagnosis of '{}' finished in {:?}", target.trim(), started.elapsed());

        builder
            .selected_address(batch.address)
            .probe_method(batch.method)
            .fallback_used(batch.fallback_used)
            .outcomes(batch.outcomes)
            .summary(batch.summary)
            .diagnosis(diagnosis)
            .elapsed(started.elapsed())
            .build()
    }

    /// Probe addresses in resolver order and select the first batch with a
    /// success, or the first batch when none succeeded
    async fn probe_addresses(
        &self,
        addresses: &[ResolvedAddress],
        options: &DiagnosticOptions,
        cancel: &CancellationToken,
        correlation_id: &str,
    ) -> Result<Batch> {
        let mut first: Option<Batch> = None;

        for address in addresses.iter().take(options.max_addresses) {
            let batch = self.probe_address(address, options, cancel, correlation_id).await?;

            if batch.summary.succeeded > 0 {
                return Ok(batch);
            }
            if cancel.is_cancelled() {
                return Ok(first.unwrap_or(batch));
            }
            if first.is_none() {
                first = Some(batch);
            }
        }

        first.ok_or_else(|| AppError::contract_violation("resolution succeeded without any address"))
    }

    async fn probe_address(
        &self,
        address: &ResolvedAddress,
        options: &DiagnosticOptions,
        cancel: &CancellationToken,
        correlation_id: &str,
    ) -> Result<Batch> {
        let plan = ProbePlan::from_options(options);
        let primary = Prober::new(self.transport.clone(), options.max_in_flight);
        let outcomes = self.run_batch(&primary, address, &plan, cancel, correlation_id).await?;

        let all_denied = !outcomes.is_empty()
            && outcomes.iter().all(|o| o.kind == ProbeResultKind::PermissionDenied);

        match &self.fallback {
            Some(fallback) if all_denied && !cancel.is_cancelled() => {
                let reason = outcomes
                    .iter()
                    .find_map(|o| o.detail.clone())
                    .unwrap_or_else(|| ProbeResultKind::PermissionDenied.to_string());
                self.logger.log_fallback(address, &reason, correlation_id).await;

                let secondary = Prober::new(fallback.clone(), options.max_in_flight);
                let outcomes = self.run_batch(&secondary, address, &plan, cancel, correlation_id).await?;
                Ok(self.finish_batch(address, secondary.method(), true, outcomes, correlation_id).await)
            }
            _ => Ok(self.finish_batch(address, primary.method(), false, outcomes, correlation_id).await),
        }
    }

    /// Probe once and enforce the outcome count contract
    async fn run_batch(
        &self,
        prober: &Prober,
        address: &ResolvedAddress,
        plan: &ProbePlan,
        cancel: &CancellationToken,
        correlation_id: &str,
    ) -> Result<Vec<ProbeOutcome>> {
        let outcomes = prober.probe(address, plan, cancel).await;

        let in_order = outcomes.iter().zip(0u32..).all(|(o, seq)| o.sequence == seq);
        if outcomes.len() != plan.count as usize || !in_order {
            let error = AppError::contract_violation(format!(
                "prober returned {} outcomes for {} requested probes",
                outcomes.len(),
                plan.count
            ));
            self.logger.log_error(&error, Some("probe batch"), Some(correlation_id)).await;
            return Err(error);
        }

        for outcome in &outcomes {
            self.logger
                .log_probe_outcome(address, prober.method(), outcome, correlation_id)
                .await;
        }
        Ok(outcomes)
    }

    async fn finish_batch(
        &self,
        address: &ResolvedAddress,
        method: ProbeMethod,
        fallback_used: bool,
        outcomes: Vec<ProbeOutcome>,
        correlation_id: &str,
    ) -> Batch {
        let summary = summarize(&outcomes);
        self.logger.log_batch(address, method, &summary, correlation_id).await;

        if summary.succeeded == 0 {
            log_warn!(self.logger.logger(), "No replies from {} over {}", address, method);
        }

        Batch {
            address: *address,
            method,
            fallback_used,
            outcomes,
            summary,
        }
    }
}

/// Diagnose `target` with the system resolver and transports
pub async fn run_diagnostic(target: &str, options: &DiagnosticOptions) -> Result<DiagnosticReport> {
    DiagnosticEngine::from_options(&DnsConfig::System, options)?
        .run(target, options)
        .await
}
