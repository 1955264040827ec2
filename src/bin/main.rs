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

use anyhow::{Context, Result, bail};
use channel_wallet::{
    ChannelId, EventSink, MetricsSink, Wallet, WalletConfig, WalletEvent, WalletRequest,
};
use clap::{ArgAction, Parser};
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Channel Wallet - Replay inbound wallet requests from a CSV file
///
/// Feeds every request through a single wallet and writes one response row
/// per transaction validation request to stdout.
#[derive(Parser, Debug)]
#[command(name = "channel-wallet")]
#[command(about = "Replays wallet requests and prints validation responses", long_about = None)]
struct Args {
    /// Path to CSV file with requests
    ///
    /// Expected format: type,channel,amount
    /// where type is TransactionValidationRequest or BookUpdateRequest and
    /// amount is the transaction amount or the new book balance.
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// JSON configuration file (initialBalance, enableLogging, amountPolicy)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Initial balance, overrides the configuration file
    #[arg(long, value_name = "AMOUNT")]
    initial_balance: Option<Decimal>,

    /// Enable or disable wallet log lines, overrides the configuration file
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    enable_logging: Option<bool>,

    /// Refuse zero and negative transaction amounts
    #[arg(long)]
    reject_non_positive: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Write the final wallet state as JSON to this file
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = resolve_config(&args)?;
    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open `{}`", args.input.display()))?;

    let summary = Arc::new(EventSummary::default());
    let wallet = Wallet::initialize(&config, Arc::new((Arc::clone(&summary), MetricsSink)));

    process_requests(BufReader::new(file), &wallet, std::io::stdout())
        .context("Failed to process requests")?;

    let final_balance = wallet.finalize()?;
    tracing::info!(
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        book_updates = summary.book_updates(),
        %final_balance,
        "replay finished"
    );

    if let Some(path) = &args.state {
        let file = File::create(path)
            .with_context(|| format!("Failed to create `{}`", path.display()))?;
        serde_json::to_writer_pretty(file, &wallet).context("Failed to write wallet state")?;
    }
    Ok(())
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Loads the configuration file, if any, and applies command line overrides.
fn resolve_config(args: &Args) -> Result<WalletConfig> {
    let mut config = match (&args.config, args.initial_balance) {
        (Some(path), _) => WalletConfig::from_path(path)
            .with_context(|| format!("Failed to load `{}`", path.display()))?,
        (None, Some(initial_balance)) => WalletConfig::new(initial_balance, true),
        (None, None) => bail!("either --config or --initial-balance is required"),
    };

    if let Some(initial_balance) = args.initial_balance {
        config.initial_balance = initial_balance;
    }
    if let Some(enable_logging) = args.enable_logging {
        config.enable_logging = enable_logging;
    }
    if args.reject_non_positive {
        config.amount_policy = channel_wallet::AmountPolicy::RejectNonPositive;
    }
    config.validate()?;
    Ok(config)
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, channel, amount`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    tag: String,
    channel: i32,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
}

impl CsvRecord {
    /// Returns `None` for unknown tags or a missing amount.
    fn into_request(self) -> Option<WalletRequest> {
        let amount = self.amount?;
        WalletRequest::from_tag(&self.tag, ChannelId(self.channel), amount)
    }
}

/// One output row per transaction validation request.
#[derive(Debug, Serialize)]
struct ResponseRecord {
    channel: i32,
    success: bool,
}

/// Replays requests from a CSV reader into `wallet`.
///
/// Malformed rows and unknown request types are skipped. Responses are
/// written as `channel,success` rows.
///
/// # Errors
///
/// Returns a CSV error if the reader fails or a response cannot be written.
fn process_requests<R: Read, W: Write>(
    reader: R,
    wallet: &Wallet,
    writer: W,
) -> Result<(), csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);
    let mut wtr = Writer::from_writer(writer);

    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed row");
                continue;
            }
        };
        let Some(request) = record.into_request() else {
            tracing::debug!("skipping unrecognized request");
            continue;
        };

        let channel = request.channel_id();
        match wallet.handle(request) {
            Ok(Some(response)) => wtr.serialize(ResponseRecord {
                channel: channel.0,
                success: response.success,
            })?,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, %channel, "request refused"),
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Counts transaction outcomes and book updates as they are emitted.
#[derive(Debug, Default)]
struct EventSummary {
    succeeded: AtomicU64,
    failed: AtomicU64,
    book_updates: AtomicU64,
}

impl EventSummary {
    fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn book_updates(&self) -> u64 {
        self.book_updates.load(Ordering::Relaxed)
    }
}

impl EventSink for EventSummary {
    fn emit(&self, event: &WalletEvent) {
        let counter = match event {
            WalletEvent::TransactionSucceeded { .. } => &self.succeeded,
            WalletEvent::TransactionFailed { .. } => &self.failed,
            WalletEvent::BookUpdated { .. } => &self.book_updates,
            WalletEvent::Initialized { .. } | WalletEvent::Finalized { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
