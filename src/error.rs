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

//! Error types for wallet operations and configuration loading.

use rust_decimal::Decimal;
use thiserror::Error;

/// Wallet processing errors.
///
/// Only [`WalletError::Finalized`] reaches callers of the request handlers.
/// The other variants are rejection reasons that the handlers turn into a
/// failed [`TransactionValidationResponse`](crate::TransactionValidationResponse).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Transaction amount exceeds the current balance
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    /// Amount is zero or negative and the wallet rejects such amounts
    #[error("invalid amount (must be positive)")]
    NonPositiveAmount,

    /// Applying the amount would take the balance outside the decimal range
    #[error("balance overflow: {balance} - {amount} is out of range")]
    BalanceOverflow { balance: Decimal, amount: Decimal },

    /// Wallet has been finalized and accepts no further requests
    #[error("wallet is finalized")]
    Finalized,
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("initial balance must not be negative, got {0}")]
    NegativeInitialBalance(Decimal),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            WalletError::InsufficientBalance {
                requested: dec!(70),
                available: dec!(60),
            }
            .to_string(),
            "insufficient balance: requested 70, available 60"
        );
        assert_eq!(
            WalletError::NonPositiveAmount.to_string(),
            "invalid amount (must be positive)"
        );
        assert_eq!(
            WalletError::BalanceOverflow {
                balance: dec!(10),
                amount: dec!(-1),
            }
            .to_string(),
            "balance overflow: 10 - -1 is out of range"
        );
        assert_eq!(WalletError::Finalized.to_string(), "wallet is finalized");
        assert_eq!(
            ConfigError::NegativeInitialBalance(dec!(-1)).to_string(),
            "initial balance must not be negative, got -1"
        );
    }

    #[test]
    fn parse_errors_convert() {
        let err: ConfigError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
