//! Report assembly
//!
//! [`DiagnosticReport`] is the only record that leaves the engine. It is
//! assembled once per invocation by [`ReportBuilder`] and never mutated.

use crate::{
    diagnostics::Diagnosis,
    error::{AppError, Result},
    models::{ProbeOutcome, ProbeSummary},
    types::{ProbeMethod, ResolutionError, ResolutionErrorKind, ResolvedAddress},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// What name resolution produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved { addresses: Vec<ResolvedAddress> },
    Failed { kind: ResolutionErrorKind, detail: String },
}

impl ResolutionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn addresses(&self) -> &[ResolvedAddress] {
        match self {
            Self::Resolved { addresses } => addresses,
            Self::Failed { .. } => &[],
        }
    }
}

impl From<&std::result::Result<Vec<ResolvedAddress>, ResolutionError>> for ResolutionOutcome {
    fn from(result: &std::result::Result<Vec<ResolvedAddress>, ResolutionError>) -> Self {
        match result {
            Ok(addresses) => Self::Resolved { addresses: addresses.clone() },
            Err(error) => Self::Failed {
                kind: error.kind(),
                detail: error.to_string(),
            },
        }
    }
}

/// Terminal result of one diagnostic run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Unique id of this run, also used as the log correlation id
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Target as given, trimmed
    pub target: String,
    pub resolution: ResolutionOutcome,
    /// Address whose batch is reported; absent when resolution failed
    pub selected_address: Option<ResolvedAddress>,
    /// Mechanism that produced `outcomes`
    pub probe_method: ProbeMethod,
    /// True when ICMP was denied and the batch was re-run over TCP
    pub fallback_used: bool,
    /// Outcomes of the reported batch, ordered by sequence number
    pub outcomes: Vec<ProbeOutcome>,
    /// Absent when no probes were sent
    pub summary: Option<ProbeSummary>,
    pub diagnosis: Diagnosis,
    pub loss_threshold: f64,
    /// Wall-clock duration of the whole run
    pub elapsed: Duration,
}

impl DiagnosticReport {
    pub fn is_healthy(&self) -> bool {
        self.diagnosis.class == crate::diagnostics::DiagnosisClass::Healthy
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Collects the parts of a report as the run progresses
#[derive(Debug, Default)]
pub struct ReportBuilder {
    run_id: Option<Uuid>,
    target: Option<String>,
    resolution: Option<ResolutionOutcome>,
    selected_address: Option<ResolvedAddress>,
    probe_method: Option<ProbeMethod>,
    fallback_used: bool,
    outcomes: Vec<ProbeOutcome>,
    summary: Option<ProbeSummary>,
    diagnosis: Option<Diagnosis>,
    loss_threshold: Option<f64>,
    elapsed: Option<Duration>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn resolution(mut self, resolution: ResolutionOutcome) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn selected_address(mut self, address: ResolvedAddress) -> Self {
        self.selected_address = Some(address);
        self
    }

    pub fn probe_method(mut self, method: ProbeMethod) -> Self {
        self.probe_method = Some(method);
        self
    }

    pub fn fallback_used(mut self, used: bool) -> Self {
        self.fallback_used = used;
        self
    }

    pub fn outcomes(mut self, outcomes: Vec<ProbeOutcome>) -> Self {
        self.outcomes = outcomes;
        self
    }

    pub fn summary(mut self, summary: ProbeSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn diagnosis(mut self, diagnosis: Diagnosis) -> Self {
        self.diagnosis = Some(diagnosis);
        self
    }

    pub fn loss_threshold(mut self, threshold: f64) -> Self {
        self.loss_threshold = Some(threshold);
        self
    }

    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    /// Assemble the report.
    ///
    /// Only presence and consistency are checked. A missing field means the
    /// engine skipped a stage, which is a contract violation.
    pub fn build(self) -> Result<DiagnosticReport> {
        let target = self.target.ok_or_else(|| missing("target"))?;
        let resolution = self.resolution.ok_or_else(|| missing("resolution"))?;
        let probe_method = self.probe_method.ok_or_else(|| missing("probe_method"))?;
        let diagnosis = self.diagnosis.ok_or_else(|| missing("diagnosis"))?;
        let loss_threshold = self.loss_threshold.ok_or_else(|| missing("loss_threshold"))?;

        if resolution.is_resolved() && self.selected_address.is_none() {
            return Err(missing("selected_address"));
        }
        if !resolution.is_resolved() && (self.summary.is_some() || !self.outcomes.is_empty()) {
            return Err(AppError::contract_violation(
                "report carries probe data although resolution failed",
            ));
        }
        if let Some(summary) = &self.summary {
            if summary.attempted as usize != self.outcomes.len() {
                return Err(AppError::contract_violation(format!(
                    "summary covers {} probes but {} outcomes were recorded",
                    summary.attempted,
                    self.outcomes.len()
                )));
            }
        }

        Ok(DiagnosticReport {
            run_id: self.run_id.unwrap_or_else(Uuid::new_v4),
            generated_at: Utc::now(),
            target,
            resolution,
            selected_address: self.selected_address,
            probe_method,
            fallback_used: self.fallback_used,
            outcomes: self.outcomes,
            summary: self.summary,
            diagnosis,
            loss_threshold,
            elapsed: self.elapsed.unwrap_or_default(),
        })
    }
}

fn missing(field: &str) -> AppError {
    AppError::contract_violation(format!("report field '{}' was never set", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosisClass;
    use crate::stats::summarize;

    fn diagnosis(class: DiagnosisClass) -> Diagnosis {
        Diagnosis {
            class,
            explanation: "explanation".to_string(),
            remediation: Vec::new(),
        }
    }

    fn address() -> ResolvedAddress {
        ResolvedAddress::new("192.0.2.1".parse().unwrap(), None)
    }

    #[test]
    fn test_build_resolved_report() {
        let outcomes = vec![
            ProbeOutcome::success(0, Duration::from_millis(10)),
            ProbeOutcome::success(1, Duration::from_millis(12)),
        ];
        let summary = summarize(&outcomes);

        let report = ReportBuilder::new()
            .target("192.0.2.1")
            .resolution(ResolutionOutcome::Resolved { addresses: vec![address()] })
            .selected_address(address())
            .probe_method(ProbeMethod::Icmp)
            .outcomes(outcomes)
            .summary(summary)
            .diagnosis(diagnosis(DiagnosisClass::Healthy))
            .loss_threshold(0.5)
            .elapsed(Duration::from_millis(30))
            .build()
            .unwrap();

        assert!(report.is_healthy());
        assert_eq!(report.outcomes.len(), 2);
        assert!(!report.fallback_used);
        assert_eq!(report.resolution.addresses(), &[address()]);
    }

    #[test]
    fn test_build_failed_resolution_report() {
        let error = ResolutionError::NameNotFound {
            name: "nonexistent.invalid.test".to_string(),
            detail: "NXDOMAIN".to_string(),
        };
        let report = ReportBuilder::new()
            .target("nonexistent.invalid.test")
            .resolution(ResolutionOutcome::from(&Err(error)))
            .probe_method(ProbeMethod::Icmp)
            .diagnosis(diagnosis(DiagnosisClass::DnsFailure))
            .loss_threshold(0.5)
            .build()
            .unwrap();

        assert!(report.summary.is_none());
        assert!(report.outcomes.is_empty());
        assert!(report.selected_address.is_none());
        match report.resolution {
            ResolutionOutcome::Failed { kind, detail } => {
                assert_eq!(kind, ResolutionErrorKind::NameNotFound);
                assert!(detail.contains("NXDOMAIN"));
            }
            other => panic!("unexpected resolution {:?}", other),
        }
    }

    #[test]
    fn test_missing_diagnosis_is_contract_violation() {
        let err = ReportBuilder::new()
            .target("example.com")
            .resolution(ResolutionOutcome::Resolved { addresses: vec![address()] })
            .selected_address(address())
            .probe_method(ProbeMethod::Tcp)
            .loss_threshold(0.5)
            .build()
            .unwrap_err();

        assert!(matches!(err, AppError::ContractViolation(_)));
        assert_eq!(err.exit_code(), 70);
    }

    #[test]
    fn test_missing_selected_address_is_contract_violation() {
        let err = ReportBuilder::new()
            .target("example.com")
            .resolution(ResolutionOutcome::Resolved { addresses: vec![address()] })
            .probe_method(ProbeMethod::Icmp)
            .diagnosis(diagnosis(DiagnosisClass::NoData))
            .loss_threshold(0.5)
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("selected_address"));
    }

    #[test]
    fn test_summary_outcome_mismatch_is_contract_violation() {
        let summary = summarize(&[ProbeOutcome::timeout(0, "no reply")]);
        let err = ReportBuilder::new()
            .target("example.com")
            .resolution(ResolutionOutcome::Resolved { addresses: vec![address()] })
            .selected_address(address())
            .probe_method(ProbeMethod::Icmp)
            .summary(summary)
            .diagnosis(diagnosis(DiagnosisClass::HostSilentOrFiltered))
            .loss_threshold(0.5)
            .build()
            .unwrap_err();

        assert!(matches!(err, AppError::ContractViolation(_)));
    }

    #[test]
    fn test_report_json_shape() {
        let report = ReportBuilder::new()
            .target("192.0.2.1")
            .resolution(ResolutionOutcome::Resolved { addresses: vec![address()] })
            .selected_address(address())
            .probe_method(ProbeMethod::Icmp)
            .diagnosis(diagnosis(DiagnosisClass::NoData))
            .loss_threshold(0.5)
            .build()
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["resolution"]["status"], "resolved");
        assert_eq!(value["diagnosis"]["class"], "NoData");
        assert_eq!(value["probe_method"], "Icmp");

        let parsed: DiagnosticReport = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, report);
    }
}
