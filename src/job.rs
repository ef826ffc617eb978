//! The fetch-and-store run over both sources.

use crate::cli::ui;
use crate::core::rate::NoRatePublished;
use crate::core::summary::{Downloaded, Failed};
use crate::core::{
    RateProvider, RateRecord, RateRepository, ReferenceRepository, RunSummary, Source, WorkItem,
    worklist,
};
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use tracing::{debug, info, warn};

/// Everything a run reads from and writes to.
pub struct JobContext<'a> {
    pub references: &'a dyn ReferenceRepository,
    pub rates: &'a dyn RateRepository,
    /// Processed in order; one provider per source.
    pub providers: &'a [&'a dyn RateProvider],
    pub catch_up_days: u32,
    pub show_progress: bool,
}

/// Runs every provider's worklist for `date`.
///
/// Only a failing reference query aborts the run. Fetch and write errors
/// are recorded per item and processing moves on.
pub async fn run_job(ctx: &JobContext<'_>, date: NaiveDate) -> Result<RunSummary> {
    let mut summary = RunSummary::new(date);

    for provider in ctx.providers {
        let source = provider.source();
        let refs = ctx
            .references
            .enabled_for(source)
            .await
            .with_context(|| format!("Failed to load the {source} worklist"))?;

        let list = worklist(source, &refs);
        info!(
            "{} currencies enabled for {}, {} without identifier",
            list.items.len(),
            source,
            list.missing_key.len()
        );

        for entry in &list.missing_key {
            warn!("{} is enabled for {} but has no identifier", entry.code, source);
            summary.record_failure(
                source,
                Failed {
                    code: entry.code.clone(),
                    key: None,
                    rate_date: None,
                    reason: format!("missing {source} identifier"),
                },
            );
        }

        let pb = ui::new_progress_bar(list.items.len() as u64, ctx.show_progress);
        pb.set_message(format!("Downloading {source} rates..."));
        for item in &list.items {
            process_item(ctx, *provider, item, date, &mut summary).await;
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    info!(
        "Run for {} finished: {} downloaded, {} failed",
        date,
        summary.succeeded(),
        summary.failed()
    );
    Ok(summary)
}

async fn process_item(
    ctx: &JobContext<'_>,
    provider: &dyn RateProvider,
    item: &WorkItem,
    date: NaiveDate,
    summary: &mut RunSummary,
) {
    let source = provider.source();
    let dates = match fetch_dates(ctx, source, item, date).await {
        Ok(dates) => dates,
        Err(e) => {
            warn!("{} {}: {:#}", source, item.code, e);
            summary.record_failure(source, failure(item, None, &e));
            return;
        }
    };

    for day in dates {
        match fetch_and_store(ctx.rates, provider, item, day).await {
            Ok(record) => {
                debug!("Saved {} {} on {}: {}", source, item.code, day, record.value);
                summary.record_success(
                    source,
                    Downloaded {
                        code: item.code.clone(),
                        rate_date: day,
                        nominal: record.nominal,
                        value: record.value,
                    },
                );
            }
            // gaps in a back-filled window are weekends and holidays
            Err(e) if day < date && e.downcast_ref::<NoRatePublished>().is_some() => {
                debug!("{}", e);
            }
            Err(e) => {
                warn!("{} {} on {}: {:#}", source, item.code, day, e);
                summary.record_failure(source, failure(item, Some(day), &e));
            }
        }
    }
}

async fn fetch_and_store(
    rates: &dyn RateRepository,
    provider: &dyn RateProvider,
    item: &WorkItem,
    day: NaiveDate,
) -> Result<RateRecord> {
    let quote = provider.fetch_rate(&item.key, day).await?;
    let record = RateRecord::from_quote(item.currency_id, provider.source(), &quote);
    rates.upsert_rate(&record).await?;
    Ok(record)
}

/// Dates to fetch for one item, oldest first. Always ends with `date`.
async fn fetch_dates(
    ctx: &JobContext<'_>,
    source: Source,
    item: &WorkItem,
    date: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    if ctx.catch_up_days == 0 {
        return Ok(vec![date]);
    }

    let window_start = date
        .checked_sub_days(Days::new(ctx.catch_up_days.into()))
        .with_context(|| format!("Can't get catch-up start date for {date}"))?;
    let latest = ctx
        .rates
        .latest_rate_date(item.currency_id, source)
        .await?;

    let start = match latest.and_then(|d| d.succ_opt()) {
        Some(next) if next > window_start => next.min(date),
        _ => window_start,
    };
    Ok(start.iter_days().take_while(|d| *d <= date).collect())
}

fn failure(item: &WorkItem, day: Option<NaiveDate>, error: &anyhow::Error) -> Failed {
    Failed {
        code: item.code.clone(),
        key: Some(item.key.clone()),
        rate_date: day,
        reason: format!("{error:#}"),
    }
}
