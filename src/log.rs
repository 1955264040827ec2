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

//! Human-readable wallet log lines.
//!
//! A wallet holds exactly one [`LogSink`], picked when it is initialized:
//! [`TracingLog`] when logging is enabled, [`NullLog`] otherwise.

use parking_lot::Mutex;

/// Prefix prepended to every wallet log line.
pub const LOG_PREFIX: &str = "[Wallet] ";

/// Receives informational log lines from a wallet.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards log lines to `tracing` at `INFO` under the `wallet` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log(&self, message: &str) {
        tracing::info!(target: "wallet", "{LOG_PREFIX}{message}");
    }
}

/// Discards every log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl LogSink for NullLog {
    fn log(&self, _message: &str) {}
}

/// Buffers log lines in memory, prefix included.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the buffered lines in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl LogSink for MemoryLog {
    fn log(&self, message: &str) {
        self.lines.lock().push(format!("{LOG_PREFIX}{message}"));
    }
}
