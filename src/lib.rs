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

//! # Channel Wallet
//!
//! A payment-channel node's local wallet. It validates proposed transactions
//! against the available balance, debits on success, and keeps a per-channel
//! shared book that a peer node synchronizes through update requests.
//!
//! ## Core Components
//!
//! - [`Wallet`]: Balance, stake snapshot and shared book behind one lock
//! - [`WalletRequest`]: The two inbound request kinds
//! - [`WalletConfig`]: Initial balance, logging toggle, amount policy
//! - [`EventSink`]: Receives [`WalletEvent`]s for metrics and aggregation
//! - [`LogSink`]: Receives human-readable log lines when logging is enabled
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use channel_wallet::{
//!     BookUpdateRequest, ChannelId, EventLog, TransactionValidationRequest, Wallet,
//!     WalletConfig, WalletRequest,
//! };
//! use rust_decimal_macros::dec;
//!
//! let events = Arc::new(EventLog::new());
//! let wallet = Wallet::initialize(&WalletConfig::new(dec!(100), false), events.clone());
//!
//! let response = wallet
//!     .handle(WalletRequest::TransactionValidation(TransactionValidationRequest {
//!         amount: dec!(40),
//!         channel_id: ChannelId(1),
//!     }))
//!     .unwrap();
//! assert_eq!(response.map(|r| r.success), Some(true));
//!
//! wallet
//!     .handle(WalletRequest::BookUpdate(BookUpdateRequest {
//!         channel_id: ChannelId(2),
//!         new_balance: dec!(15),
//!     }))
//!     .unwrap();
//!
//! assert_eq!(wallet.current_balance(), dec!(60));
//! assert_eq!(wallet.book_balance(ChannelId(2)), Some(dec!(15)));
//! assert_eq!(wallet.finalize(), Ok(dec!(60)));
//! ```
//!
//! ## Thread Safety
//!
//! A [`Wallet`] can be shared through an `Arc`. Each handler call holds the
//! wallet lock for the whole check-and-debit, so two transactions never
//! spend the same funds.

mod base;
pub mod config;
pub mod error;
pub mod event;
pub mod log;
mod request;
mod wallet;

pub use base::{ChannelId, NodeId};
pub use config::{AmountPolicy, WalletConfig};
pub use error::{ConfigError, WalletError};
pub use event::{
    AggregatorSink, EventLog, EventSink, MetricsSink, NodeReport, NullSink, RejectReason,
    StakeAggregator, WalletEvent,
};
pub use log::{LogSink, MemoryLog, NullLog, TracingLog};
pub use request::{
    BookUpdateRequest, TransactionValidationRequest, TransactionValidationResponse, WalletRequest,
};
pub use wallet::Wallet;
