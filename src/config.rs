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

//! Wallet configuration.
//!
//! The configuration surface is small: the initial balance, the logging
//! toggle and the policy for zero or negative transaction amounts. It can be
//! built in code or read from a JSON document such as:
//!
//! ```json
//! { "initialBalance": 100.0, "enableLogging": true, "amountPolicy": "permissive" }
//! ```

use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// How a wallet treats transaction amounts that are zero or negative.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AmountPolicy {
    /// Any amount not exceeding the balance is accepted, including zero and
    /// negative amounts. A negative amount therefore credits the balance.
    #[default]
    Permissive,
    /// Zero and negative amounts are refused.
    RejectNonPositive,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WalletConfig {
    #[serde(with = "rust_decimal::serde::float")]
    pub initial_balance: Decimal,
    pub enable_logging: bool,
    #[serde(default)]
    pub amount_policy: AmountPolicy,
}

impl WalletConfig {
    pub fn new(initial_balance: Decimal, enable_logging: bool) -> Self {
        Self {
            initial_balance,
            enable_logging,
            amount_policy: AmountPolicy::default(),
        }
    }

    pub fn with_amount_policy(mut self, amount_policy: AmountPolicy) -> Self {
        self.amount_policy = amount_policy;
        self
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Parse`] if the document is malformed or a required
    ///   field is missing.
    /// - [`ConfigError::NegativeInitialBalance`] if the balance is below zero.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file. See [`WalletConfig::from_reader`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_balance < Decimal::ZERO {
            return Err(ConfigError::NegativeInitialBalance(self.initial_balance));
        }
        Ok(())
    }
}
