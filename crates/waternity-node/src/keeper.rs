//! Keeper
//!
//! Polls the node on a fixed tick: performs upkeep when the interval has
//! elapsed and, if enabled, feeds the latest price to the market adapter for
//! every automated well.

use crate::config::KeeperConfig;
use crate::node::{UpkeepOutcome, WaternityNode};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Keeper counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperStats {
    /// Ticks processed
    pub ticks: u64,
    /// Upkeeps that ran
    pub upkeeps_performed: u64,
    /// Market updates that changed rates
    pub market_adjustments: u64,
    /// Market updates skipped on a stale, missing or invalid price
    pub market_skipped: u64,
    /// Commands that failed outright
    pub errors: u64,
}

/// Drives upkeep and market updates against a node
pub struct Keeper {
    node: Arc<WaternityNode>,
    config: KeeperConfig,
    max_ticks: Option<u64>,
    stats: Arc<RwLock<KeeperStats>>,
}

impl Keeper {
    pub fn new(node: Arc<WaternityNode>, config: KeeperConfig) -> Self {
        Self {
            node,
            config,
            max_ticks: None,
            stats: Arc::new(RwLock::new(KeeperStats::default())),
        }
    }

    /// Stop on its own after `ticks` ticks
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn stats(&self) -> KeeperStats {
        self.stats.read().clone()
    }

    /// Process one tick
    pub fn tick(&self) {
        let mut stats = self.stats.write();
        stats.ticks += 1;

        match self.node.perform_upkeep() {
            Ok(UpkeepOutcome::Performed {
                upkeep_counter,
                wells_updated,
                ..
            }) => {
                stats.upkeeps_performed += 1;
                debug!(upkeep_counter, wells_updated, "Keeper performed upkeep");
            }
            Ok(UpkeepOutcome::NotDue { .. }) => {}
            Err(e) => {
                stats.errors += 1;
                warn!(code = e.code(), "Upkeep failed: {}", e);
            }
        }

        if !self.config.update_market {
            return;
        }
        let wells = self.node.get_active_wells();
        if wells.is_empty() {
            return;
        }

        match self.node.update_yields_with_market_data(&wells) {
            Ok(outcome) if outcome.is_adjustment() => stats.market_adjustments += 1,
            Ok(_) => {}
            Err(e) if e.is_recoverable() => {
                stats.market_skipped += 1;
                debug!(code = e.code(), "Market update skipped: {}", e);
            }
            Err(e) => {
                stats.errors += 1;
                warn!(code = e.code(), "Market update failed: {}", e);
            }
        }
    }

    /// Run until `shutdown_rx` fires or the tick limit is reached
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) -> KeeperStats {
        info!(
            "Starting keeper (tick: {}s, market updates: {})",
            self.config.tick_secs, self.config.update_market
        );

        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.tick_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Keeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick();
                    if self.max_ticks.is_some_and(|max| self.stats.read().ticks >= max) {
                        info!("Keeper reached tick limit");
                        break;
                    }
                }
            }
        }

        self.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WaternityConfig;
    use waternity_core::prelude::*;
    use waternity_economics::{MintWell, StaticPriceFeed};

    fn automated_node(clock: Arc<ManualClock>, feed: Arc<StaticPriceFeed>) -> Arc<WaternityNode> {
        let node = WaternityNode::with_reserve_vault(WaternityConfig::default(), clock, feed).unwrap();
        let admin = node.admin();
        let well = node
            .mint_well(
                &admin,
                MintWell {
                    to: admin,
                    location: "Sumba".into(),
                    capacity: 800,
                    people_served: 120,
                    metadata_uri: String::new(),
                },
            )
            .unwrap();
        node.register_well(&admin, well).unwrap();
        node.add_well_to_automation(&admin, well).unwrap();
        Arc::new(node)
    }

    #[test]
    fn test_tick_runs_due_upkeep_once() {
        let clock = Arc::new(ManualClock::new(0));
        let feed = Arc::new(StaticPriceFeed::empty());
        let node = automated_node(clock.clone(), feed);
        let keeper = Keeper::new(node.clone(), KeeperConfig::default());

        keeper.tick();
        clock.advance(3600);
        keeper.tick();
        keeper.tick();

        let stats = keeper.stats();
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.upkeeps_performed, 1);
        assert_eq!(stats.market_skipped, 3);
        assert_eq!(stats.errors, 0);
        assert_eq!(node.get_yield_rate(0).unwrap(), 800);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_tick_limit() {
        let clock = Arc::new(ManualClock::new(0));
        let feed = Arc::new(StaticPriceFeed::new(2_000, 0));
        let node = automated_node(clock, feed);
        let keeper = Keeper::new(node, KeeperConfig::default()).with_max_ticks(3);

        let (_tx, rx) = mpsc::channel(1);
        let stats = keeper.run(rx).await;
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.market_adjustments, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let clock = Arc::new(ManualClock::new(0));
        let node = automated_node(clock, Arc::new(StaticPriceFeed::empty()));
        let keeper = Keeper::new(node, KeeperConfig::default());

        let (tx, rx) = mpsc::channel(1);
        tx.send(()).await.unwrap();
        let stats = keeper.run(rx).await;
        assert!(stats.ticks <= 1);
    }
}
