//! Compare-and-update loop over the configured DynHost targets.
//!
//! One run resolves the public address once, then walks the targets in
//! order: locate the record, read it, and update it when the published
//! address differs. A failing target is logged and skipped; it never stops
//! the targets after it.

use crate::config::Target;
use crate::detector::IpSource;
use crate::error::{DdnsError, ErrorKind, Result};
use crate::providers::DynHostProvider;
use std::net::Ipv4Addr;
use tracing::{debug, error, info, warn, Instrument};

/// What happened to one target during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The published address already matched.
    InSync,
    /// The record was updated; `previous` is the address it held.
    Updated { previous: String },
    /// The target was skipped.
    Failed { kind: ErrorKind, message: String },
}

/// Per-target result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub target: Target,
    pub outcome: Outcome,
}

/// Summary of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Address the targets were compared against, if it could be resolved.
    pub current_ip: Option<Ipv4Addr>,
    pub targets: Vec<TargetReport>,
}

impl RunReport {
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Updated { .. }))
    }

    pub fn in_sync(&self) -> usize {
        self.count(|o| matches!(o, Outcome::InSync))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.targets.iter().filter(|t| pred(&t.outcome)).count()
    }
}

/// Runs the update loop against a provider and an IP source.
pub struct Reconciler<'a> {
    provider: &'a dyn DynHostProvider,
    ip_source: &'a dyn IpSource,
    preset_ip: Option<Ipv4Addr>,
}

impl<'a> Reconciler<'a> {
    pub fn new(provider: &'a dyn DynHostProvider, ip_source: &'a dyn IpSource) -> Self {
        Self {
            provider,
            ip_source,
            preset_ip: None,
        }
    }

    /// Use `ip` instead of asking the IP source.
    pub fn with_ip(mut self, ip: Option<Ipv4Addr>) -> Self {
        self.preset_ip = ip;
        self
    }

    /// Reconcile every target, in order.
    pub async fn run(&self, targets: &[Target]) -> RunReport {
        let span = tracing::info_span!("update", provider = self.provider.name());
        self.run_targets(targets).instrument(span).await
    }

    async fn run_targets(&self, targets: &[Target]) -> RunReport {
        info!("Update dynhosts records");

        let mut report = RunReport::default();

        if targets.is_empty() {
            warn!("No dynhosts list was specified");
            return report;
        }

        let ip = match self.current_ip().await {
            Ok(ip) => ip,
            Err(e) => {
                error!("Unable to get current IP address ({} error)", e.kind());
                debug!("{}", e);
                report.targets = targets
                    .iter()
                    .map(|target| TargetReport {
                        target: target.clone(),
                        outcome: failed(&e),
                    })
                    .collect();
                return report;
            }
        };

        debug!("Current IP address is {}", ip);
        report.current_ip = Some(ip);

        for target in targets {
            let outcome = match self.reconcile(target, ip).await {
                Ok(outcome) => outcome,
                Err(e) => failed(&e),
            };
            report.targets.push(TargetReport {
                target: target.clone(),
                outcome,
            });
        }

        info!(
            "{} updated, {} in sync, {} failed",
            report.updated(),
            report.in_sync(),
            report.failed()
        );
        report
    }

    async fn current_ip(&self) -> Result<Ipv4Addr> {
        match self.preset_ip {
            Some(ip) => Ok(ip),
            None => self.ip_source.current_ipv4().await,
        }
    }

    async fn reconcile(&self, target: &Target, ip: Ipv4Addr) -> Result<Outcome> {
        let name = target.display_name();
        let zone = target.domain.as_str();

        let id = self
            .provider
            .find_record(target)
            .await
            .map_err(|e| report_failure("Unable to get record ID", &name, e))?;

        let record = self
            .provider
            .read_record(zone, id)
            .await
            .map_err(|e| report_failure(&format!("Unable to get record {}", id), &name, e))?;

        let stored = record.ip.ok_or_else(|| {
            report_failure(
                &format!("Unable to read record {}", id),
                &name,
                DdnsError::Protocol(format!("record {} in zone {} has no ip field", id, zone)),
            )
        })?;

        if stored.trim().parse::<Ipv4Addr>().ok() == Some(ip) {
            debug!("Record {} is up to date ({})", name, ip);
            return Ok(Outcome::InSync);
        }

        debug!("Record {} needs an update ({} -> {})", name, stored, ip);

        self.provider
            .update_record(zone, id, ip)
            .await
            .map_err(|e| report_failure(&format!("Unable to update record {}", id), &name, e))?;

        Ok(Outcome::Updated { previous: stored })
    }
}

fn report_failure(context: &str, name: &str, err: DdnsError) -> DdnsError {
    error!("{} for {} ({} error)", context, name, err.kind());
    debug!("{}", err);
    err
}

fn failed(err: &DdnsError) -> Outcome {
    Outcome::Failed {
        kind: err.kind(),
        message: err.to_string(),
    }
}
