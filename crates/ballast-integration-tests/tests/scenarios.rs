//! Integration test: the reference rebalance scenarios, driven through the
//! service façade with an in-memory ledger.
//!
//! - A: 5% premium on a 1,000,000 supply expands by exactly the 5% cap
//! - B: the expansion lands pro-rata on a 60/30/10 holder split
//! - C: a price exactly at the peg never acts
//! - D: a deep discount contracts without driving any balance negative
//! - E: moving the peg re-targets the price feed, so the next epoch acts on
//!   the new target instead of gating on stale confidence

use std::sync::Arc;

use ballast_db::memory::MemoryStore;
use ballast_db::store::{AuditSink, LedgerStore};
use ballast_engine::{EngineConfig, StabilityService};
use ballast_oracle::sampler::StaticSampler;
use ballast_types::config::{ConfigUpdate, StabilityConfig};
use ballast_types::ledger::{TransactionKind, TransactionStatus};
use ballast_types::supply::{AdjustmentStatus, SupplyAction};
use ballast_types::RESERVE_ACCOUNT;
use rust_decimal::Decimal;

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

fn three_holders() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_balances([
        ("alice", dec(600_000)),
        ("bob", dec(300_000)),
        ("carol", dec(100_000)),
    ]))
}

fn engine(store: Arc<MemoryStore>, stability: StabilityConfig) -> StabilityService {
    let config = EngineConfig {
        stability,
        ..EngineConfig::default()
    };
    StabilityService::new(
        store.clone(),
        store,
        Box::new(StaticSampler::new(Decimal::ONE)),
        config,
    )
    .expect("engine")
}

#[tokio::test]
async fn scenario_a_expansion_clamped_to_epoch_limit() {
    let store = three_holders();
    let service = engine(store.clone(), StabilityConfig::default());

    service.set_price(Decimal::new(105, 2)).await.expect("set price");
    let adj = service.perform_rebalance().await.expect("rebalance");

    assert_eq!(adj.action, SupplyAction::Expand);
    assert_eq!(adj.status, AdjustmentStatus::Applied);
    assert_eq!(adj.deviation, Decimal::new(5, 2));
    // Raw correction is 1,000,000 * 0.05 * 1.5 = 75,000.
    assert_eq!(adj.amount, dec(50_000));
    assert!(adj.reason.contains("clamped"), "reason: {}", adj.reason);
    assert_eq!(adj.previous_supply, dec(1_000_000));
    assert_eq!(adj.new_supply, dec(1_050_000));
}

#[tokio::test]
async fn scenario_b_proportional_distribution() {
    let store = three_holders();
    let service = engine(store.clone(), StabilityConfig::default());

    service.set_price(Decimal::new(105, 2)).await.expect("set price");
    let adj = service.perform_rebalance().await.expect("rebalance");
    assert_eq!(adj.amount, dec(50_000));

    let expected_balances = [
        ("alice", 630_000, 30_000),
        ("bob", 315_000, 15_000),
        ("carol", 105_000, 5_000),
    ];
    for (account, expected, delta) in expected_balances {
        let balance = service.user_balance(account).await.expect("balance");
        assert_eq!(balance.balance, dec(expected), "{account}");

        let txs = service.user_transactions(account, 10).await.expect("txs");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, TransactionKind::Rebalance);
        assert_eq!(txs[0].status, TransactionStatus::Completed);
        assert_eq!(txs[0].amount, dec(delta));
        assert_eq!(txs[0].epoch, 1);
    }

    // Exact split, so nothing reaches the reserve.
    assert!(store.balance(RESERVE_ACCOUNT).expect("reserve").is_none());
    assert_eq!(store.total_supply().expect("total"), dec(1_050_000));

    let history = store.supply_history(10).expect("history");
    assert_eq!(history.len(), 1);
    let snapshot = store.latest_metrics().expect("metrics").expect("snapshot");
    assert_eq!(snapshot.total_supply, dec(1_050_000));
    assert_eq!(snapshot.epoch, history[0].epoch);
}

#[tokio::test]
async fn scenario_c_price_at_peg_never_acts() {
    let store = three_holders();
    let service = engine(store.clone(), StabilityConfig::default());

    for band in [Decimal::new(1, 6), Decimal::new(1, 3), Decimal::new(2, 2), Decimal::new(99, 2)] {
        service
            .update_config(ConfigUpdate {
                tolerance_band: Some(band),
                ..ConfigUpdate::default()
            })
            .await
            .expect("band");
        service.set_price(Decimal::ONE).await.expect("set price");

        let adj = service.perform_rebalance().await.expect("rebalance");
        assert_eq!(adj.action, SupplyAction::None, "band {band}");
        assert_eq!(adj.amount, Decimal::ZERO);
        assert_eq!(adj.status, AdjustmentStatus::Skipped);
        assert_eq!(adj.reason, "within tolerance band");
    }

    assert_eq!(store.total_supply().expect("total"), dec(1_000_000));
    assert!(store.transactions_for("alice", 100).expect("txs").is_empty());
}

#[tokio::test]
async fn scenario_d_contraction_never_negative() {
    let store = Arc::new(MemoryStore::with_balances([
        ("whale", dec(999_000)),
        ("minnow", dec(1_000)),
        ("dust", Decimal::new(1, 6)),
        ("dust2", Decimal::new(3, 6)),
    ]));
    let stability = StabilityConfig {
        max_supply_change_per_epoch: Decimal::ONE,
        ..StabilityConfig::default()
    };
    let service = engine(store.clone(), stability);

    service.set_price(Decimal::new(5, 1)).await.expect("set price");
    let before = store.total_supply().expect("total");
    let adj = service.perform_rebalance().await.expect("rebalance");

    assert_eq!(adj.action, SupplyAction::Contract);
    assert_eq!(adj.status, AdjustmentStatus::Applied);
    // 0.5 deviation * 1.5 gain = 75% of supply, under the 100% cap.
    assert_eq!(adj.amount, (before * Decimal::new(75, 2)).round_dp(6));

    let balances = store.load_balances().expect("balances");
    for holder in &balances {
        assert!(holder.balance >= Decimal::ZERO, "{} went negative", holder.account_id);
    }
    let after = store.total_supply().expect("total");
    assert_eq!(after, adj.new_supply);
    assert_eq!(before - after, adj.amount);
}

#[tokio::test]
async fn scenario_e_peg_change_retargets_feed() {
    let store = three_holders();
    let service = engine(store.clone(), StabilityConfig::default());

    service
        .update_config(ConfigUpdate {
            target_price: Some(dec(2)),
            ..ConfigUpdate::default()
        })
        .await
        .expect("stage peg");
    // No price yet: the epoch holds but activates the new peg.
    let activation = service.perform_rebalance().await.expect("activate");
    assert_eq!(activation.action, SupplyAction::None);
    assert_eq!(service.status().await.config.target_price, dec(2));

    service.set_price(Decimal::new(22, 1)).await.expect("set price");
    let sampled = service.sample_price().await.expect("sample");
    assert_eq!(sampled.price, Decimal::new(22, 1));
    assert!(sampled.confidence >= Decimal::new(8, 1), "confidence {}", sampled.confidence);
    assert!(service.status().await.oracle_health.healthy);

    let adj = service.perform_rebalance().await.expect("rebalance");
    assert_eq!(adj.action, SupplyAction::Expand);
    assert_eq!(adj.status, AdjustmentStatus::Applied);
    assert_eq!(adj.target_price, dec(2));
    assert_eq!(adj.deviation, Decimal::new(1, 1));
    assert_eq!(adj.amount, dec(50_000));
    assert_eq!(store.total_supply().expect("total"), dec(1_050_000));
}
