//! In-memory tally of a run, rendered into the notification email.

use crate::core::currency::Source;
use chrono::NaiveDate;
use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::{Cell, CellAlignment, Table};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub code: String,
    pub rate_date: NaiveDate,
    pub nominal: i32,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failed {
    pub code: String,
    pub key: Option<String>,
    pub rate_date: Option<NaiveDate>,
    pub reason: String,
}

#[derive(Debug, Default, Clone)]
pub struct SourceReport {
    pub downloaded: Vec<Downloaded>,
    pub failed: Vec<Failed>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub date: NaiveDate,
    reports: BTreeMap<Source, SourceReport>,
}

impl RunSummary {
    pub fn new(date: NaiveDate) -> Self {
        let reports = Source::ALL
            .iter()
            .map(|s| (*s, SourceReport::default()))
            .collect();
        Self { date, reports }
    }

    pub fn record_success(&mut self, source: Source, item: Downloaded) {
        self.report_mut(source).downloaded.push(item);
    }

    pub fn record_failure(&mut self, source: Source, item: Failed) {
        self.report_mut(source).failed.push(item);
    }

    pub fn report(&self, source: Source) -> &SourceReport {
        // every source is inserted by `new`
        &self.reports[&source]
    }

    fn report_mut(&mut self, source: Source) -> &mut SourceReport {
        self.reports.entry(source).or_default()
    }

    pub fn succeeded(&self) -> usize {
        self.reports.values().map(|r| r.downloaded.len()).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.values().map(|r| r.failed.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.succeeded() == 0 && self.failed() == 0
    }

    pub fn subject(&self, base: &str) -> String {
        match self.failed() {
            0 => format!("{base} {}: OK", self.date),
            n => format!("{base} {}: {n} failed", self.date),
        }
    }

    /// Plain-text email body. Always has at least the header and counts table.
    pub fn render_body(&self) -> String {
        let mut body = format!("Currency exchange rates run for {}\n\n", self.date);

        let mut table = Table::new();
        table.load_preset(ASCII_MARKDOWN);
        table.set_header(vec!["Source", "Downloaded", "Failed"]);
        for (source, report) in &self.reports {
            table.add_row(vec![
                Cell::new(source.code()),
                Cell::new(report.downloaded.len()).set_alignment(CellAlignment::Right),
                Cell::new(report.failed.len()).set_alignment(CellAlignment::Right),
            ]);
        }
        body.push_str(&table.to_string());
        body.push('\n');

        if self.is_empty() {
            body.push_str("\nNo currencies are enabled for download from CBR or NBU.\n");
            return body;
        }

        for (source, report) in &self.reports {
            if !report.downloaded.is_empty() {
                body.push_str(&format!("\nDownloaded exchange rates from {source}:\n"));
                for d in &report.downloaded {
                    body.push_str(&format!(
                        "  {} on {}: {}/{}\n",
                        d.code, d.rate_date, d.value, d.nominal
                    ));
                }
            }
            if !report.failed.is_empty() {
                body.push_str(&format!("\nFailed downloads from {source}:\n"));
                for f in &report.failed {
                    let key = f.key.as_deref().unwrap_or("no identifier");
                    let on = f.rate_date.map(|d| format!(" on {d}")).unwrap_or_default();
                    body.push_str(&format!("  {} ({key}){on}: {}\n", f.code, f.reason));
                }
            }
        }
        body
    }
}

/// Body for a run that aborted before or while loading the worklists.
pub fn render_fatal(date: NaiveDate, error: &anyhow::Error) -> String {
    format!("Currency exchange rates run for {date} aborted.\n\nError: {error:#}\n")
}
