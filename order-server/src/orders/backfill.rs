//! Test-order backfill
//!
//! Re-runs the classifier over orders created in `[from, to)` and marks the
//! ones that should have been flagged as test orders. Writes go through a
//! [`WriteGate`]: disabled unless explicitly allowed, and refused in
//! production without a second override. A closed gate turns the run into a
//! dry run that only counts.

use super::error::OrderResult;
use super::service::OrderService;
use super::storage::ListFilter;
use serde::Serialize;
use std::time::Duration;

/// Backfill tunables (see `Config::backfill_settings`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillSettings {
    pub allow_writes: bool,
    pub allow_production: bool,
    pub is_production: bool,
    pub batch_size: usize,
    pub pause: Duration,
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            allow_writes: false,
            allow_production: false,
            is_production: false,
            batch_size: 50,
            pause: Duration::from_millis(500),
        }
    }
}

/// Explicit permission to mutate stored orders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteGate {
    Open,
    /// Writes disabled (`BACKFILL_ALLOW_WRITES` unset)
    Disabled,
    /// Production without `BACKFILL_ALLOW_PRODUCTION`
    ProductionLocked,
}

impl WriteGate {
    pub fn evaluate(settings: &BackfillSettings) -> Self {
        if !settings.allow_writes {
            WriteGate::Disabled
        } else if settings.is_production && !settings.allow_production {
            WriteGate::ProductionLocked
        } else {
            WriteGate::Open
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, WriteGate::Open)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    /// Orders created inside the window
    pub scanned: usize,
    pub flagged: usize,
    pub updated: usize,
    pub failed: usize,
    pub dry_run: bool,
}

pub struct BackfillJob {
    service: OrderService,
    settings: BackfillSettings,
}

impl BackfillJob {
    pub fn new(service: OrderService, settings: BackfillSettings) -> Self {
        Self { service, settings }
    }

    pub fn gate(&self) -> WriteGate {
        WriteGate::evaluate(&self.settings)
    }

    pub async fn run(&self, from: i64, to: i64) -> OrderResult<BackfillReport> {
        let gate = self.gate();
        let mut report = BackfillReport {
            dry_run: !gate.is_open(),
            ..Default::default()
        };
        if report.dry_run {
            tracing::warn!(gate = ?gate, "Backfill writes not permitted, running dry");
        }

        let orders = self
            .service
            .store()
            .list(&ListFilter::created_between(from, to))
            .await?;
        report.scanned = orders.len();

        let classifier = self.service.classifier();
        let flagged: Vec<String> = orders
            .into_iter()
            .filter_map(|mut o| classifier.apply(&mut o, None).then_some(o.id))
            .collect();
        report.flagged = flagged.len();

        if report.dry_run {
            tracing::info!(report = ?report, "Backfill finished (dry run)");
            return Ok(report);
        }

        let batch_size = self.settings.batch_size.max(1);
        for (index, batch) in flagged.chunks(batch_size).enumerate() {
            if index > 0 && !self.settings.pause.is_zero() {
                tokio::time::sleep(self.settings.pause).await;
            }
            for id in batch {
                match self.service.reclassify(id).await {
                    Ok(Some(_)) => report.updated += 1,
                    Ok(None) => {}
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(order_id = %id, error = %e, "Backfill update failed");
                    }
                }
            }
            tracing::debug!(batch = index, size = batch.len(), "Backfill batch applied");
        }

        tracing::info!(report = ?report, "Backfill finished");
        Ok(report)
    }
}
