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

//! Wallet state machine.
//!
//! ```text
//!  initialize ──► Ready ──finalize──► Finalized
//!                 │   ▲
//!                 └───┘  validate_transaction / update_book
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_decimal_macros::dec;
//! use channel_wallet::{ChannelId, NullSink, TransactionValidationRequest, Wallet, WalletConfig};
//!
//! let wallet = Wallet::initialize(&WalletConfig::new(dec!(100), false), Arc::new(NullSink));
//! let response = wallet
//!     .validate_transaction(TransactionValidationRequest {
//!         amount: dec!(40),
//!         channel_id: ChannelId(1),
//!     })
//!     .unwrap();
//! assert!(response.success);
//! assert_eq!(wallet.current_balance(), dec!(60));
//! ```

use crate::base::ChannelId;
use crate::config::{AmountPolicy, WalletConfig};
use crate::event::{EventSink, RejectReason, WalletEvent};
use crate::log::{LogSink, NullLog, TracingLog};
use crate::request::{
    BookUpdateRequest, TransactionValidationRequest, TransactionValidationResponse, WalletRequest,
};
use crate::WalletError;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    Finalized,
}

#[derive(Debug)]
struct WalletData {
    current_balance: Decimal,
    total_staked: Decimal,
    /// Agreed balance per channel, one entry per channel ever touched.
    shared_book: HashMap<ChannelId, Decimal>,
    phase: Phase,
}

impl WalletData {
    fn new(initial_balance: Decimal) -> Self {
        Self {
            current_balance: initial_balance,
            total_staked: initial_balance,
            shared_book: HashMap::new(),
            phase: Phase::Ready,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.current_balance >= Decimal::ZERO,
            "Invariant violated: balance went negative: {}",
            self.current_balance
        );
    }

    fn ensure_ready(&self) -> Result<(), WalletError> {
        match self.phase {
            Phase::Ready => Ok(()),
            Phase::Finalized => Err(WalletError::Finalized),
        }
    }

    /// Decreases the balance and returns what is left. Equality with the
    /// balance is accepted.
    fn debit(&mut self, amount: Decimal, policy: AmountPolicy) -> Result<Decimal, WalletError> {
        if policy == AmountPolicy::RejectNonPositive && amount <= Decimal::ZERO {
            return Err(WalletError::NonPositiveAmount);
        }
        if amount > self.current_balance {
            return Err(WalletError::InsufficientBalance {
                requested: amount,
                available: self.current_balance,
            });
        }
        // A negative amount credits the balance, which can leave the decimal range.
        self.current_balance = self.current_balance.checked_sub(amount).ok_or(
            WalletError::BalanceOverflow {
                balance: self.current_balance,
                amount,
            },
        )?;
        self.assert_invariants();
        Ok(self.current_balance)
    }

    fn write_book(&mut self, channel_id: ChannelId, balance: Decimal) {
        self.shared_book.insert(channel_id, balance);
    }
}

/// A node's wallet: spendable balance plus the shared book of channel balances.
///
/// All handlers take `&self`. State sits behind one mutex, so each handler
/// call is atomic even when the wallet is shared between threads. Events and
/// log lines are emitted after the lock is released.
pub struct Wallet {
    inner: Mutex<WalletData>,
    amount_policy: AmountPolicy,
    logging_enabled: bool,
    log: Arc<dyn LogSink>,
    events: Arc<dyn EventSink>,
}

impl Wallet {
    const DECIMAL_PRECISION: u32 = 4;

    /// Creates a ready wallet that logs through `tracing` when enabled.
    pub fn initialize(config: &WalletConfig, events: Arc<dyn EventSink>) -> Self {
        Self::with_log(config, events, Arc::new(TracingLog))
    }

    /// Creates a ready wallet that logs into `log` when enabled.
    ///
    /// When `config.enable_logging` is false the wallet gets a [`NullLog`]
    /// and `log` is dropped.
    pub fn with_log(
        config: &WalletConfig,
        events: Arc<dyn EventSink>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let log: Arc<dyn LogSink> = if config.enable_logging {
            log
        } else {
            Arc::new(NullLog)
        };
        let wallet = Self {
            inner: Mutex::new(WalletData::new(config.initial_balance)),
            amount_policy: config.amount_policy,
            logging_enabled: config.enable_logging,
            log,
            events,
        };

        wallet.log.log(&format!(
            "Wallet initialized with initial balance: {}",
            config.initial_balance
        ));
        wallet.events.emit(&WalletEvent::Initialized {
            initial_balance: config.initial_balance,
            total_staked: config.initial_balance,
        });
        wallet
    }

    /// Routes a request to its handler.
    ///
    /// Transaction validation yields `Some(response)`; book updates yield `None`.
    ///
    /// # Errors
    ///
    /// [`WalletError::Finalized`] once the wallet has been finalized.
    pub fn handle(
        &self,
        request: WalletRequest,
    ) -> Result<Option<TransactionValidationResponse>, WalletError> {
        match request {
            WalletRequest::TransactionValidation(request) => {
                self.validate_transaction(request).map(Some)
            }
            WalletRequest::BookUpdate(request) => self.update_book(request).map(|()| None),
        }
    }

    /// Debits the balance if it covers `request.amount` and records the
    /// amount in the shared book.
    ///
    /// Exactly one of [`WalletEvent::TransactionSucceeded`] or
    /// [`WalletEvent::TransactionFailed`] is emitted, matching the response.
    /// A success also emits [`WalletEvent::BookUpdated`] first.
    ///
    /// # Errors
    ///
    /// [`WalletError::Finalized`] once the wallet has been finalized. No event
    /// is emitted in that case.
    pub fn validate_transaction(
        &self,
        request: TransactionValidationRequest,
    ) -> Result<TransactionValidationResponse, WalletError> {
        let TransactionValidationRequest { amount, channel_id } = request;

        let outcome = {
            let mut data = self.inner.lock();
            data.ensure_ready()?;
            let outcome = data.debit(amount, self.amount_policy);
            if outcome.is_ok() {
                data.write_book(channel_id, amount);
            }
            outcome
        };

        match outcome {
            Ok(balance) => {
                self.events.emit(&WalletEvent::BookUpdated {
                    channel_id,
                    balance: amount,
                });
                self.events
                    .emit(&WalletEvent::TransactionSucceeded {
                        channel_id,
                        amount,
                        balance,
                    });
                Ok(TransactionValidationResponse { success: true })
            }
            Err(error) => {
                let reason =
                    RejectReason::from_error(&error).unwrap_or(RejectReason::InsufficientBalance);
                tracing::debug!(%channel_id, %amount, %error, "transaction rejected");
                self.events.emit(&WalletEvent::TransactionFailed {
                    channel_id,
                    amount,
                    reason,
                });
                Ok(TransactionValidationResponse { success: false })
            }
        }
    }

    /// Overwrites the shared book entry for a channel.
    ///
    /// No balance check is made and the current balance is not touched.
    ///
    /// # Errors
    ///
    /// [`WalletError::Finalized`] once the wallet has been finalized.
    pub fn update_book(&self, request: BookUpdateRequest) -> Result<(), WalletError> {
        let BookUpdateRequest {
            channel_id,
            new_balance,
        } = request;

        {
            let mut data = self.inner.lock();
            data.ensure_ready()?;
            data.write_book(channel_id, new_balance);
        }

        self.events.emit(&WalletEvent::BookUpdated {
            channel_id,
            balance: new_balance,
        });
        self.log.log(&format!(
            "Updated shared book for channel {channel_id}: {new_balance}"
        ));
        Ok(())
    }

    /// Moves the wallet to its terminal state and returns the closing balance.
    ///
    /// # Errors
    ///
    /// [`WalletError::Finalized`] if called twice.
    pub fn finalize(&self) -> Result<Decimal, WalletError> {
        let final_balance = {
            let mut data = self.inner.lock();
            data.ensure_ready()?;
            data.phase = Phase::Finalized;
            data.current_balance
        };

        self.log.log(&format!(
            "Wallet finished. Final balance: {final_balance}"
        ));
        self.events.emit(&WalletEvent::Finalized { final_balance });
        Ok(final_balance)
    }

    pub fn current_balance(&self) -> Decimal {
        self.inner.lock().current_balance
    }

    /// Balance committed at initialization.
    pub fn total_staked(&self) -> Decimal {
        self.inner.lock().total_staked
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging_enabled
    }

    pub fn amount_policy(&self) -> AmountPolicy {
        self.amount_policy
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.lock().phase == Phase::Finalized
    }

    pub fn book_balance(&self, channel_id: ChannelId) -> Option<Decimal> {
        self.inner.lock().shared_book.get(&channel_id).copied()
    }

    /// Copy of the shared book.
    pub fn shared_book(&self) -> HashMap<ChannelId, Decimal> {
        self.inner.lock().shared_book.clone()
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("inner", &*self.inner.lock())
            .field("amount_policy", &self.amount_policy)
            .field("logging_enabled", &self.logging_enabled)
            .finish_non_exhaustive()
    }
}

impl Serialize for Wallet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let book: BTreeMap<ChannelId, Decimal> = data
            .shared_book
            .iter()
            .map(|(channel_id, balance)| (*channel_id, balance.round_dp(Wallet::DECIMAL_PRECISION)))
            .collect();
        let mut state = serializer.serialize_struct("Wallet", 4)?;
        state.serialize_field(
            "current_balance",
            &data.current_balance.round_dp(Wallet::DECIMAL_PRECISION),
        )?;
        state.serialize_field(
            "total_staked",
            &data.total_staked.round_dp(Wallet::DECIMAL_PRECISION),
        )?;
        state.serialize_field("shared_book", &book)?;
        state.serialize_field("finalized", &(data.phase == Phase::Finalized))?;
        state.end()
    }
}
