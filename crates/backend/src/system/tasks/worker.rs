use std::sync::Arc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::shared::config::SweepsConfig;
use crate::usecases::u502_reconciliation::ReconciliationService;

/// Фоновый воркер периодических сверок.
///
/// Две задачи на каждом тике:
/// 1) брошенные pending-заказы старше порога переводятся в cancelled;
/// 2) оплаченные заказы без выданного доступа догоняются грантером
///    (разрыв возможен только после сбоя между переходом и грантом).
pub struct ReconciliationSweepWorker {
    reconciliation: Arc<ReconciliationService>,
    config: SweepsConfig,
}

impl ReconciliationSweepWorker {
    pub fn new(reconciliation: Arc<ReconciliationService>, config: SweepsConfig) -> Self {
        Self {
            reconciliation,
            config,
        }
    }

    /// Запускает цикл сверок.
    pub async fn run_loop(&self) {
        info!(
            "Reconciliation sweep worker started with interval {} seconds",
            self.config.interval_seconds
        );
        let mut interval = time::interval(time::Duration::from_secs(self.config.interval_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if let Err(e) = self.run_sweeps().await {
                error!("Error running reconciliation sweeps: {:?}", e);
            }
        }
    }

    async fn run_sweeps(&self) -> anyhow::Result<()> {
        let expired = self
            .reconciliation
            .expire_stale_orders(self.config.stale_pending_hours)
            .await?;
        if expired > 0 {
            info!("Expired {} stale pending orders", expired);
        }

        let repaired = self
            .reconciliation
            .repair_ungranted_orders(self.config.gap_min_age_seconds)
            .await?;
        if repaired > 0 {
            info!("Repaired {} succeeded orders without entitlement", repaired);
        }

        Ok(())
    }
}
