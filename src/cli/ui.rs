use crate::core::{RunSummary, Source};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Success,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Success => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    let cell = Cell::new(count).set_alignment(CellAlignment::Right);
    if count == 0 {
        cell.fg(Color::DarkGrey)
    } else {
        cell.fg(color)
    }
}

/// Creates a progress bar over one worklist. Hidden unless `visible`, and
/// indicatif draws nothing when stderr is not a terminal.
pub fn new_progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Renders the terminal view of a finished run.
pub fn display_summary(summary: &RunSummary, notification_error: Option<&str>) -> String {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Downloaded"),
        header_cell("Failed"),
    ]);
    for source in Source::ALL {
        let report = summary.report(source);
        table.add_row(vec![
            Cell::new(source.code()),
            count_cell(report.downloaded.len(), Color::Green),
            count_cell(report.failed.len(), Color::Red),
        ]);
    }

    let mut output = format!(
        "Exchange rates for {}\n\n",
        style_text(&summary.date.to_string(), StyleType::Title)
    );
    output.push_str(&table.to_string());

    for source in Source::ALL {
        for failed in &summary.report(source).failed {
            output.push_str(&format!(
                "\n{} {} {}: {}",
                style_text("✗", StyleType::Error),
                source,
                failed.code,
                style_text(&failed.reason, StyleType::Subtle)
            ));
        }
    }

    let footer = match notification_error {
        Some(err) => style_text(&format!("Notification failed: {err}"), StyleType::Error),
        None => style_text("Notification sent", StyleType::Success),
    };
    output.push_str(&format!("\n\n{footer}"));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::summary::Failed;
    use chrono::NaiveDate;

    #[test]
    fn test_display_summary_lists_failures() {
        console::set_colors_enabled(false);
        let mut summary = RunSummary::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        summary.record_failure(
            Source::Cbr,
            Failed {
                code: "EUR".to_string(),
                key: Some("R01239".to_string()),
                rate_date: None,
                reason: "malformed response".to_string(),
            },
        );

        let output = display_summary(&summary, Some("connection refused"));
        assert!(output.contains("2024-03-15"));
        assert!(output.contains("CBR EUR: malformed response"));
        assert!(output.contains("Notification failed: connection refused"));

        let output = display_summary(&RunSummary::new(summary.date), None);
        assert!(output.contains("Notification sent"));
    }
}
