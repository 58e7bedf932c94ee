//! `summary` and `prune`: read and trim the duration ledger.

use anyhow::Result;
use chrono::NaiveDate;

use crate::common::constants::LED_LABEL;
use crate::common::utils::{format_minutes, private_path};
use crate::ledger::JsonLedger;

/// Print per-day LED minutes with the running total.
///
/// `since` overrides `cumulative_since` from the configuration.
pub fn handle_summary_command(since: Option<NaiveDate>) -> Result<()> {
    let since = match since {
        Some(date) => Some(date),
        None => crate::config::load()?.cumulative_since()?,
    };

    let ledger = JsonLedger::open_default()?;
    let summary = ledger.daily_summary(LED_LABEL, since)?;

    log_version!();
    log_block_start!("{} on-time from {}", summary.label, private_path(ledger.path()));
    if summary.days.is_empty() {
        log_indented!("No records yet");
        log_end!();
        return Ok(());
    }

    for day in &summary.days {
        log_indented!(
            "{}  {:>7}  {:>9}",
            day.date,
            format_minutes(day.minutes),
            format_minutes(day.cumulative)
        );
    }

    match summary.since {
        Some(since) => log_block_start!(
            "Cumulative since {}: {}",
            since,
            format_minutes(summary.cumulative_minutes)
        ),
        None => log_block_start!("Cumulative: {}", format_minutes(summary.cumulative_minutes)),
    }
    log_end!();
    Ok(())
}

pub fn handle_prune_command(before: NaiveDate) -> Result<()> {
    let ledger = JsonLedger::open_default()?;
    let removed = ledger.prune_before(before)?;

    log_version!();
    log_block_start!(
        "Removed {} record{} dated before {}",
        removed,
        if removed == 1 { "" } else { "s" },
        before
    );
    log_end!();
    Ok(())
}
