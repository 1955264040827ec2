// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Observability events emitted by a wallet.
//!
//! Every handler reports what it did through an [`EventSink`]. Sinks are plain
//! collaborators: record events in memory, forward them over a channel, turn
//! them into `metrics` counters, or fold them into a [`StakeAggregator`] that
//! tracks stakes and closing balances across many wallets.

use crate::WalletError;
use crate::base::{ChannelId, NodeId};
use crossbeam::channel::Sender;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::sync::Arc;

/// Why a transaction validation request was refused.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum RejectReason {
    InsufficientBalance,
    NonPositiveAmount,
    BalanceOverflow,
}

impl RejectReason {
    /// Maps a debit error to the reason reported in a failure event.
    ///
    /// Returns `None` for errors that are not rejections.
    pub fn from_error(error: &WalletError) -> Option<Self> {
        match error {
            WalletError::InsufficientBalance { .. } => Some(Self::InsufficientBalance),
            WalletError::NonPositiveAmount => Some(Self::NonPositiveAmount),
            WalletError::BalanceOverflow { .. } => Some(Self::BalanceOverflow),
            WalletError::Finalized => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum WalletEvent {
    Initialized {
        initial_balance: Decimal,
        total_staked: Decimal,
    },
    TransactionSucceeded {
        channel_id: ChannelId,
        amount: Decimal,
        /// Balance left after the debit.
        balance: Decimal,
    },
    TransactionFailed {
        channel_id: ChannelId,
        amount: Decimal,
        reason: RejectReason,
    },
    BookUpdated {
        channel_id: ChannelId,
        balance: Decimal,
    },
    Finalized {
        final_balance: Decimal,
    },
}

/// Receives events from a wallet.
///
/// Implementations must not call back into the emitting wallet.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &WalletEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &WalletEvent) {}
}

/// Records events in memory in emission order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<WalletEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WalletEvent> {
        self.events.lock().clone()
    }

    /// Removes and returns every recorded event.
    pub fn drain(&self) -> Vec<WalletEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: &WalletEvent) {
        self.events.lock().push(*event);
    }
}

impl EventSink for Sender<WalletEvent> {
    fn emit(&self, event: &WalletEvent) {
        if self.send(*event).is_err() {
            tracing::debug!(?event, "event receiver dropped");
        }
    }
}

impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&self, event: &WalletEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &WalletEvent) {
        (**self).emit(event);
    }
}

/// Publishes events through the `metrics` facade.
///
/// - `wallet_transactions_total{outcome="success"|"failure"}`
/// - `wallet_book_updates_total`
/// - `wallet_balance` (gauge, the current balance after initialization,
///   every successful debit and finalization)
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsSink;

impl EventSink for MetricsSink {
    fn emit(&self, event: &WalletEvent) {
        match event {
            WalletEvent::Initialized {
                initial_balance, ..
            } => {
                metrics::gauge!("wallet_balance").set(initial_balance.to_f64().unwrap_or_default());
            }
            WalletEvent::TransactionSucceeded { balance, .. } => {
                metrics::counter!("wallet_transactions_total", "outcome" => "success").increment(1);
                metrics::gauge!("wallet_balance").set(balance.to_f64().unwrap_or_default());
            }
            WalletEvent::TransactionFailed { .. } => {
                metrics::counter!("wallet_transactions_total", "outcome" => "failure").increment(1);
            }
            WalletEvent::BookUpdated { .. } => {
                metrics::counter!("wallet_book_updates_total").increment(1);
            }
            WalletEvent::Finalized { final_balance } => {
                metrics::gauge!("wallet_balance").set(final_balance.to_f64().unwrap_or_default());
            }
        }
    }
}

/// Per-node totals collected by a [`StakeAggregator`].
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct NodeReport {
    pub staked: Decimal,
    pub final_balance: Option<Decimal>,
    pub successes: u64,
    pub failures: u64,
}

/// Aggregates stakes and closing balances reported by many wallets.
///
/// Each wallet reports through its own [`AggregatorSink`], obtained from
/// [`StakeAggregator::sink`].
#[derive(Debug, Default)]
pub struct StakeAggregator {
    nodes: DashMap<NodeId, NodeReport>,
}

impl StakeAggregator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a sink that attributes events to `node_id`.
    pub fn sink(self: &Arc<Self>, node_id: NodeId) -> AggregatorSink {
        AggregatorSink {
            node_id,
            aggregator: Arc::clone(self),
        }
    }

    pub fn record(&self, node_id: NodeId, event: &WalletEvent) {
        let mut report = self.nodes.entry(node_id).or_default();
        match event {
            WalletEvent::Initialized { total_staked, .. } => {
                report.staked = *total_staked;
            }
            WalletEvent::TransactionSucceeded { .. } => report.successes += 1,
            WalletEvent::TransactionFailed { .. } => report.failures += 1,
            WalletEvent::BookUpdated { .. } => {}
            WalletEvent::Finalized { final_balance } => {
                report.final_balance = Some(*final_balance);
            }
        }
    }

    pub fn report(&self, node_id: NodeId) -> Option<NodeReport> {
        self.nodes.get(&node_id).map(|report| *report)
    }

    /// Sum of the stakes of every reporting node.
    pub fn total_staked(&self) -> Decimal {
        self.nodes.iter().map(|entry| entry.staked).sum()
    }

    /// Closing balances of finalized nodes, ordered by node id.
    pub fn final_balances(&self) -> Vec<(NodeId, Decimal)> {
        let mut balances: Vec<_> = self
            .nodes
            .iter()
            .filter_map(|entry| entry.final_balance.map(|balance| (*entry.key(), balance)))
            .collect();
        balances.sort_by_key(|(node_id, _)| *node_id);
        balances
    }
}

/// [`EventSink`] feeding one node's events into a [`StakeAggregator`].
#[derive(Debug, Clone)]
pub struct AggregatorSink {
    node_id: NodeId,
    aggregator: Arc<StakeAggregator>,
}

impl EventSink for AggregatorSink {
    fn emit(&self, event: &WalletEvent) {
        self.aggregator.record(self.node_id, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::{SharedString, Unit};
    use metrics_util::MetricKind;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use metrics_util::CompositeKey;
    use rust_decimal_macros::dec;

    fn initialized(amount: Decimal) -> WalletEvent {
        WalletEvent::Initialized {
            initial_balance: amount,
            total_staked: amount,
        }
    }

    #[test]
    fn event_log_records_and_drains() {
        let log = EventLog::new();
        log.emit(&initialized(dec!(10)));
        log.emit(&WalletEvent::Finalized {
            final_balance: dec!(10),
        });
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.drain().len(), 2);
        assert!(log.events().is_empty());
    }

    #[test]
    fn pair_sink_fans_out() {
        let sink = (Arc::new(EventLog::new()), Arc::new(EventLog::new()));
        sink.emit(&initialized(dec!(1)));
        assert_eq!(sink.0.events(), vec![initialized(dec!(1))]);
        assert_eq!(sink.1.events(), vec![initialized(dec!(1))]);
    }

    #[test]
    fn channel_sink_forwards_and_tolerates_closed_receiver() {
        let (tx, rx) = crossbeam::channel::unbounded();
        tx.emit(&initialized(dec!(3)));
        assert_eq!(rx.try_recv().unwrap(), initialized(dec!(3)));
        drop(rx);
        tx.emit(&initialized(dec!(4)));
    }

    /// Value of a captured counter, or 0 if it was never touched.
    fn counter(
        snapshot: &[(CompositeKey, Option<Unit>, Option<SharedString>, DebugValue)],
        name: &str,
        outcome: Option<&str>,
    ) -> u64 {
        snapshot
            .iter()
            .filter(|(key, ..)| key.kind() == MetricKind::Counter)
            .filter(|(key, ..)| key.key().name() == name)
            .filter(|(key, ..)| {
                let label = key.key().labels().find(|label| label.key() == "outcome");
                label.map(|label| label.value()) == outcome
            })
            .map(|(.., value)| match value {
                DebugValue::Counter(count) => *count,
                _ => 0,
            })
            .sum()
    }

    fn gauge(
        snapshot: &[(CompositeKey, Option<Unit>, Option<SharedString>, DebugValue)],
        name: &str,
    ) -> Option<f64> {
        snapshot.iter().find_map(|(key, .., value)| match value {
            DebugValue::Gauge(level) if key.key().name() == name => Some(level.into_inner()),
            _ => None,
        })
    }

    #[test]
    fn metrics_sink_routes_events_to_counters() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let sink = MetricsSink;
            sink.emit(&initialized(dec!(100)));
            sink.emit(&WalletEvent::BookUpdated {
                channel_id: ChannelId(1),
                balance: dec!(40),
            });
            sink.emit(&WalletEvent::TransactionSucceeded {
                channel_id: ChannelId(1),
                amount: dec!(40),
                balance: dec!(60),
            });
            for _ in 0..2 {
                sink.emit(&WalletEvent::TransactionFailed {
                    channel_id: ChannelId(1),
                    amount: dec!(90),
                    reason: RejectReason::InsufficientBalance,
                });
            }
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert_eq!(
            counter(&snapshot, "wallet_transactions_total", Some("success")),
            1
        );
        assert_eq!(
            counter(&snapshot, "wallet_transactions_total", Some("failure")),
            2
        );
        assert_eq!(counter(&snapshot, "wallet_book_updates_total", None), 1);
        assert_eq!(gauge(&snapshot, "wallet_balance"), Some(60.0));
    }

    #[test]
    fn metrics_sink_sets_closing_balance() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            MetricsSink.emit(&initialized(dec!(10)));
            MetricsSink.emit(&WalletEvent::Finalized {
                final_balance: dec!(2.5),
            });
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert_eq!(gauge(&snapshot, "wallet_balance"), Some(2.5));
        assert_eq!(counter(&snapshot, "wallet_book_updates_total", None), 0);
    }

    #[test]
    fn reject_reasons_map_from_errors() {
        assert_eq!(
            RejectReason::from_error(&WalletError::NonPositiveAmount),
            Some(RejectReason::NonPositiveAmount)
        );
        assert_eq!(
            RejectReason::from_error(&WalletError::BalanceOverflow {
                balance: Decimal::MAX,
                amount: dec!(-1),
            }),
            Some(RejectReason::BalanceOverflow)
        );
        assert_eq!(RejectReason::from_error(&WalletError::Finalized), None);
    }

    #[test]
    fn aggregator_sums_stakes_across_nodes() {
        let aggregator = StakeAggregator::new();
        aggregator.sink(NodeId(1)).emit(&initialized(dec!(100)));
        aggregator.sink(NodeId(2)).emit(&initialized(dec!(25.5)));
        assert_eq!(aggregator.total_staked(), dec!(125.5));
    }

    #[test]
    fn aggregator_tracks_outcomes_and_final_balances() {
        let aggregator = StakeAggregator::new();
        let sink = aggregator.sink(NodeId(3));
        sink.emit(&initialized(dec!(50)));
        sink.emit(&WalletEvent::TransactionSucceeded {
            channel_id: ChannelId(1),
            amount: dec!(20),
            balance: dec!(30),
        });
        sink.emit(&WalletEvent::TransactionFailed {
            channel_id: ChannelId(1),
            amount: dec!(80),
            reason: RejectReason::InsufficientBalance,
        });
        sink.emit(&WalletEvent::Finalized {
            final_balance: dec!(30),
        });

        let report = aggregator.report(NodeId(3)).unwrap();
        assert_eq!(report.staked, dec!(50));
        assert_eq!(report.successes, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(aggregator.final_balances(), vec![(NodeId(3), dec!(30))]);
        assert!(aggregator.report(NodeId(4)).is_none());
    }
}
