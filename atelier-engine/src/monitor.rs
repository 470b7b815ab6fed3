//! SLA monitor
//!
//! A recurring background task that scans every active batch, classifies
//! deadline state against the current pipeline definition, and escalates
//! through the notification dispatcher.
//!
//! Duplicate prevention is two-layered: successful transitions clear both
//! per-batch flags, and the monitor *claims* a flag with an optimistic
//! version check before dispatching, so a batch that transitions between the
//! scan read and the claim write is skipped for that scan. A residual window
//! remains: a transition committing after a successful claim but before the
//! send completes can still produce one stale notification, since the
//! transport is not transactional with state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use atelier_core::domain::batch::Batch;
use atelier_core::domain::pipeline::{PipelineDefinition, PipelineStep};

use crate::config::{ASSIGNED_SELLER_ROLE, Cadence, EngineTables};
use crate::notify::Notifier;
use crate::service::EngineError;
use crate::store::{self, Store, collections};
use atelier_core::domain::project::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Breached,
    Preventive,
}

/// Tally of one scan pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    pub scanned: usize,
    pub breached: usize,
    pub preventive: usize,
    pub sent: usize,
    /// Batches that transitioned between the read and the claim.
    pub claim_conflicts: usize,
}

pub struct SlaMonitor {
    store: Arc<dyn Store>,
    tables: Arc<EngineTables>,
    notifier: Arc<dyn Notifier>,
}

impl SlaMonitor {
    pub fn new(
        store: Arc<dyn Store>,
        tables: Arc<EngineTables>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            tables,
            notifier,
        }
    }

    /// Spawn the recurring task according to the configured cadence.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        match self.tables.sla.cadence {
            Cadence::Interval { seconds } => self.spawn_interval(Duration::from_secs(seconds)),
            Cadence::DailyAt { hour, minute } => self.spawn_daily_at(hour, minute),
        }
    }

    /// Continuous short-interval polling.
    pub fn spawn_interval(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.scan().await {
                    tracing::error!(?e, "SLA scan failed");
                }
                tokio::time::sleep(period).await;
            }
        })
    }

    /// Fixed daily wall-clock trigger (UTC).
    pub fn spawn_daily_at(self: Arc<Self>, hour: u32, minute: u32) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let Some(today) = now
                    .date_naive()
                    .and_hms_opt(hour.min(23), minute.min(59), 0)
                else {
                    tracing::error!(hour, minute, "invalid daily trigger time");
                    return;
                };
                let mut next = today.and_utc();
                if next <= now {
                    next += chrono::Duration::days(1);
                }
                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                if let Err(e) = self.scan().await {
                    tracing::error!(?e, "SLA scan failed");
                }
            }
        })
    }

    pub async fn scan(&self) -> Result<ScanOutcome, EngineError> {
        self.scan_at(Utc::now()).await
    }

    /// One scan pass evaluated at `now` (injected so tests never sleep).
    pub async fn scan_at(&self, now: DateTime<Utc>) -> Result<ScanOutcome, EngineError> {
        let definition: PipelineDefinition =
            match store::load(self.store.as_ref(), collections::CONFIG, crate::store::PIPELINE_DOC)
                .await?
            {
                Some(d) => d,
                None => {
                    tracing::warn!("SLA scan skipped: pipeline definition not seeded");
                    return Ok(ScanOutcome::default());
                }
            };

        let batches: Vec<Batch> =
            store::load_all(self.store.as_ref(), collections::BATCHES).await?;

        let mut outcome = ScanOutcome::default();
        for batch in batches {
            if !batch.is_active() {
                continue;
            }
            outcome.scanned += 1;

            let Some(step) = definition.steps.get(&batch.current_step_id) else {
                // Dangling reference left by a step deletion.
                tracing::warn!(batch = %batch.id, step = %batch.current_step_id,
                    "batch references a missing step; skipping");
                continue;
            };
            if definition.is_terminal(&step.id) || step.sla_days == 0 {
                continue;
            }

            let deadline = batch.last_transition_at + chrono::Duration::days(step.sla_days as i64);
            let classification = if now > deadline && !batch.sla_breach_notified {
                Classification::Breached
            } else if self.tables.sla.preventive_enabled
                && !batch.sla_preventive_notified
                && deadline > now
                && deadline - now < chrono::Duration::hours(24)
            {
                Classification::Preventive
            } else {
                continue;
            };

            // Claim the flag before dispatching; a concurrent transition wins.
            let mut claimed = batch.clone();
            match classification {
                Classification::Breached => claimed.sla_breach_notified = true,
                Classification::Preventive => claimed.sla_preventive_notified = true,
            }
            claimed.version += 1;
            let doc = serde_json::to_value(&claimed).map_err(crate::store::StoreError::from)?;
            let written = self
                .store
                .put_versioned(
                    collections::BATCHES,
                    &claimed.id.to_string(),
                    doc,
                    batch.version,
                )
                .await?;
            if !written {
                outcome.claim_conflicts += 1;
                tracing::debug!(batch = %batch.id, "claim lost to a concurrent transition");
                continue;
            }

            match classification {
                Classification::Breached => outcome.breached += 1,
                Classification::Preventive => outcome.preventive += 1,
            }
            outcome.sent += self
                .escalate(&claimed, step, classification, deadline)
                .await;
        }

        tracing::debug!(
            scanned = outcome.scanned,
            breached = outcome.breached,
            preventive = outcome.preventive,
            sent = outcome.sent,
            "SLA scan complete"
        );
        Ok(outcome)
    }

    /// Resolve recipients and push one throttled message per destination.
    async fn escalate(
        &self,
        batch: &Batch,
        step: &PipelineStep,
        classification: Classification,
        deadline: DateTime<Utc>,
    ) -> usize {
        let roles = self
            .tables
            .sla_recipients
            .get(&step.id)
            .cloned()
            .unwrap_or_else(|| {
                vec![
                    step.owner_role.clone(),
                    self.tables.sla.manager_role.clone(),
                ]
            });

        let message = match classification {
            Classification::Breached => format!(
                "SLA breached: batch \"{}\" has sat at {} ({}) past its {} deadline",
                batch.name,
                step.id,
                step.label,
                deadline.format("%Y-%m-%d")
            ),
            Classification::Preventive => format!(
                "SLA warning: batch \"{}\" at {} ({}) is due by {}",
                batch.name,
                step.id,
                step.label,
                deadline.format("%Y-%m-%d")
            ),
        };

        let mut sent = 0;
        for role in roles {
            let Some(destination) = self.resolve_recipient(&role, batch).await else {
                continue;
            };
            match self.notifier.send(&destination, &message).await {
                Ok(true) => sent += 1,
                Ok(false) => {
                    tracing::warn!(%destination, batch = %batch.id, "SLA notification rejected")
                }
                Err(e) => {
                    tracing::warn!(?e, %destination, batch = %batch.id, "SLA notification failed")
                }
            }
            // Fixed spacing between sends for the transport's rate limit.
            if self.tables.sla.send_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.tables.sla.send_delay_ms)).await;
            }
        }
        sent
    }

    /// The reserved assigned-seller role resolves to the project's specific
    /// salesperson; everything else is delivered to the role itself.
    async fn resolve_recipient(&self, role: &str, batch: &Batch) -> Option<String> {
        if role != ASSIGNED_SELLER_ROLE {
            return Some(role.to_string());
        }
        let project: Option<Project> = store::load(
            self.store.as_ref(),
            collections::PROJECTS,
            &batch.project_id.to_string(),
        )
        .await
        .ok()
        .flatten();
        match project.and_then(|p| p.seller_id) {
            Some(seller) => Some(seller),
            None => {
                tracing::warn!(batch = %batch.id, "no assigned seller for SLA recipient");
                None
            }
        }
    }
}
