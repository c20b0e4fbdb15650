//! Output formatting module for adfcost
//!
//! This module renders a [`Report`] for people and for machines:
//! - Table format for terminal output
//! - JSON format for automation
//! - CSV files via [`write_csv`], the format the report is usually archived in
//!
//! All three use the column order of [`REPORT_COLUMNS`].
//!
//! # Examples
//!
//! ```
//! use adfcost::output::get_formatter;
//! use adfcost_core::aggregation_types::{CostRow, Report, UsageTotals};
//!
//! let report = Report {
//!     region_slug: "us-east".to_string(),
//!     runs: Vec::new(),
//!     total_usage: UsageTotals::default(),
//!     calculated_costs: CostRow::default(),
//! };
//!
//! let table = get_formatter(false).format_report(&report);
//! assert!(table.contains("Total Usage"));
//!
//! let json = get_formatter(true).format_report(&report);
//! assert!(json.contains("\"region\""));
//! ```

use adfcost_core::aggregation_types::{
    CALCULATED_COSTS_LABEL, REPORT_COLUMNS, Report, ReportRow, TOTAL_USAGE_LABEL,
};
use adfcost_core::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use prettytable::{Cell, Row, Table, format};
use serde_json::{Map, Value, json};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Index of the first numeric column in [`REPORT_COLUMNS`]
const FIRST_NUMERIC_COLUMN: usize = 3;

/// Trait for report formatters
pub trait OutputFormatter {
    /// Render the full report
    fn format_report(&self, report: &Report) -> String;
}

/// Table formatter for terminal output
///
/// Counts get thousands separators, durations four decimals, and the cost
/// row a dollar sign. Empty cells stay blank.
pub struct TableFormatter;

impl TableFormatter {
    /// Format a number with thousands separators
    fn format_number(n: u64) -> String {
        let s = n.to_string();
        let mut result = String::new();

        for (count, ch) in s.chars().rev().enumerate() {
            if count > 0 && count % 3 == 0 {
                result.push(',');
            }
            result.push(ch);
        }

        result.chars().rev().collect()
    }

    fn format_currency(amount: f64) -> String {
        format!("${amount:.2}")
    }

    fn format_hours(hours: f64) -> String {
        format!("{hours:.4}")
    }

    fn format_cell(column: &str, value: Option<f64>, is_cost: bool) -> String {
        match value {
            None => String::new(),
            Some(v) if is_cost => Self::format_currency(v),
            Some(v) if is_count_column(column) => Self::format_number(v.max(0.0).round() as u64),
            Some(v) => Self::format_hours(v),
        }
    }

    fn table_row(row: &ReportRow) -> Row {
        let is_summary = row.pipeline_name == TOTAL_USAGE_LABEL
            || row.pipeline_name == CALCULATED_COSTS_LABEL;
        let is_cost = row.pipeline_name == CALCULATED_COSTS_LABEL;
        let (text_style, number_style) = if is_summary { ("b", "br") } else { ("", "r") };

        let mut cells = vec![
            Cell::new(&row.pipeline_name).style_spec(text_style),
            Cell::new(&row.run_id),
            Cell::new(&row.run_start.map(format_timestamp).unwrap_or_default()),
        ];
        for (column, value) in REPORT_COLUMNS[FIRST_NUMERIC_COLUMN..].iter().zip(&row.cells) {
            let text = Self::format_cell(column, *value, is_cost);
            cells.push(Cell::new(&text).style_spec(number_style));
        }
        Row::new(cells)
    }
}

impl OutputFormatter for TableFormatter {
    fn format_report(&self, report: &Report) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(Row::new(
            REPORT_COLUMNS
                .iter()
                .map(|title| Cell::new(title).style_spec("b"))
                .collect(),
        ));

        let rows = report.rows();
        let run_rows = rows.len().saturating_sub(2);
        for (i, row) in rows.iter().enumerate() {
            if i == run_rows && run_rows > 0 {
                table.add_row(Row::new(vec![Cell::new(""); REPORT_COLUMNS.len()]));
            }
            table.add_row(Self::table_row(row));
        }

        let mut output = format!("Pricing region: {}\n", report.region_slug);
        output.push_str(&table.to_string());
        output
    }
}

/// JSON formatter for automation
///
/// Each row becomes an object keyed by column name; empty cells are `null`.
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &Report) -> String {
        let rows: Vec<Value> = report.rows().iter().map(row_json).collect();
        let output = json!({
            "region": report.region_slug,
            "columns": REPORT_COLUMNS,
            "rows": rows,
            "total_cost": report.calculated_costs.total_cost,
        });
        format!("{output:#}")
    }
}

fn row_json(row: &ReportRow) -> Value {
    let mut object = Map::new();
    object.insert(REPORT_COLUMNS[0].to_string(), json!(row.pipeline_name));
    object.insert(REPORT_COLUMNS[1].to_string(), json!(row.run_id));
    object.insert(
        REPORT_COLUMNS[2].to_string(),
        json!(row.run_start.map(format_timestamp)),
    );
    for (column, value) in REPORT_COLUMNS[FIRST_NUMERIC_COLUMN..].iter().zip(&row.cells) {
        object.insert(column.to_string(), json!(value));
    }
    Value::Object(object)
}

fn is_count_column(column: &str) -> bool {
    column.ends_with("ActivityRuns")
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Get the appropriate formatter based on output preference
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter)
    }
}

/// Write the report as CSV to `path`
pub fn write_csv(report: &Report, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv_to(report, io::BufWriter::new(file))?;
    info!("Wrote {} runs to {}", report.runs.len(), path.display());
    Ok(())
}

/// Write the report as CSV to any writer
///
/// The header is [`REPORT_COLUMNS`]; empty cells are empty fields.
pub fn write_csv_to<W: Write>(report: &Report, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(REPORT_COLUMNS)?;

    for row in report.rows() {
        let mut record = vec![
            row.pipeline_name.clone(),
            row.run_id.clone(),
            row.run_start.map(format_timestamp).unwrap_or_default(),
        ];
        record.extend(
            row.cells
                .iter()
                .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
        );
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}
