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

//! Inbound requests and outbound responses.
//!
//! A [`WalletRequest`] is a closed set of the two request kinds a wallet
//! understands. Transports that carry a string tag go through
//! [`WalletRequest::from_tag`], which drops anything it does not recognize.

use crate::base::ChannelId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Asks the wallet to debit `amount` for a transaction on `channel_id`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionValidationRequest {
    pub amount: Decimal,
    pub channel_id: ChannelId,
}

/// Asks the wallet to overwrite the agreed balance of `channel_id`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookUpdateRequest {
    pub channel_id: ChannelId,
    pub new_balance: Decimal,
}

/// Reply to a [`TransactionValidationRequest`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionValidationResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum WalletRequest {
    #[serde(rename = "TransactionValidationRequest")]
    TransactionValidation(TransactionValidationRequest),
    #[serde(rename = "BookUpdateRequest")]
    BookUpdate(BookUpdateRequest),
}

impl WalletRequest {
    pub const TRANSACTION_VALIDATION_TAG: &'static str = "TransactionValidationRequest";
    pub const BOOK_UPDATE_TAG: &'static str = "BookUpdateRequest";

    /// Builds a request from a transport tag.
    ///
    /// `value` is the transaction amount for a validation request and the new
    /// book balance for a book update. Returns `None` for unknown tags.
    pub fn from_tag(tag: &str, channel_id: ChannelId, value: Decimal) -> Option<Self> {
        match tag {
            Self::TRANSACTION_VALIDATION_TAG => {
                Some(Self::TransactionValidation(TransactionValidationRequest {
                    amount: value,
                    channel_id,
                }))
            }
            Self::BOOK_UPDATE_TAG => Some(Self::BookUpdate(BookUpdateRequest {
                channel_id,
                new_balance: value,
            })),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::TransactionValidation(_) => Self::TRANSACTION_VALIDATION_TAG,
            Self::BookUpdate(_) => Self::BOOK_UPDATE_TAG,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        match self {
            Self::TransactionValidation(request) => request.channel_id,
            Self::BookUpdate(request) => request.channel_id,
        }
    }
}

impl From<TransactionValidationRequest> for WalletRequest {
    fn from(request: TransactionValidationRequest) -> Self {
        Self::TransactionValidation(request)
    }
}

impl From<BookUpdateRequest> for WalletRequest {
    fn from(request: BookUpdateRequest) -> Self {
        Self::BookUpdate(request)
    }
}
