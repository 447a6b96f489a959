//! Plain-text rendering of results, schemas and history.

use std::fmt::Write as _;

use chrono::Local;
use sqlrun_core::HistoryEntry;
use sqlrun_protocol::{QueryKind, ResultSet, TableDetailResponse};
use sqlrun_telemetry::LogEntry;

use crate::editor::QueryRun;

pub fn render_run(run: &QueryRun) -> String {
    let response = &run.response;
    if let Some(message) = response.error_message() {
        return format!("Error: {message}");
    }
    if run.kind.is_modification() {
        return render_modification(run.kind, response.rowcount.unwrap_or(0));
    }
    let set = response.result_set();
    if set.is_empty() {
        return "Query executed successfully\nNo rows returned".to_string();
    }
    let mut out = render_table(&set);
    let count = response.rowcount.unwrap_or(set.rows.len() as i64);
    let _ = write!(out, "\n{count} row(s) returned ({} ms)", run.duration_ms);
    out
}

/// Summary shown instead of a table for statements that change data or schema.
pub fn render_modification(kind: QueryKind, count: i64) -> String {
    let noun = |one: &str, many: &str| {
        if count == 1 {
            format!("{count} {one}")
        } else {
            format!("{count} {many}")
        }
    };
    let (warning, message, detail) = match kind {
        QueryKind::Insert if count == 0 => (
            true,
            "Insert executed but no rows were inserted",
            "A constraint or trigger may have prevented the insert".to_string(),
        ),
        QueryKind::Insert => (
            false,
            if count == 1 {
                "Row inserted successfully"
            } else {
                "Rows inserted successfully"
            },
            noun("row inserted", "rows inserted"),
        ),
        QueryKind::Update if count == 0 => (
            true,
            "Update executed but no rows were affected",
            "No rows matched the WHERE condition, or the values were unchanged".to_string(),
        ),
        QueryKind::Update => (
            false,
            if count == 1 {
                "Row updated successfully"
            } else {
                "Rows updated successfully"
            },
            noun("row updated", "rows updated"),
        ),
        QueryKind::Delete if count == 0 => (
            true,
            "Delete executed but no rows were removed",
            "No rows matched the WHERE condition".to_string(),
        ),
        QueryKind::Delete => (
            false,
            if count == 1 {
                "Row deleted successfully"
            } else {
                "Rows deleted successfully"
            },
            noun("row deleted", "rows deleted"),
        ),
        QueryKind::Create => (
            false,
            "Object created successfully",
            "Table, index, or view has been created".to_string(),
        ),
        QueryKind::Drop => (
            false,
            "Object dropped successfully",
            "Table, index, or view has been removed".to_string(),
        ),
        QueryKind::Alter => (
            false,
            "Table altered successfully",
            "Table structure has been modified".to_string(),
        ),
        QueryKind::Select => (
            false,
            "Query executed successfully",
            if count > 0 {
                format!("{count} row(s) affected")
            } else {
                "No rows affected".to_string()
            },
        ),
    };
    let icon = if warning { "⚠" } else { "✓" };
    format!("{icon} {message}\n  {detail}")
}

/// Grid with one header line; NULL cells print as `NULL`.
pub fn render_table(set: &ResultSet) -> String {
    let cells: Vec<Vec<String>> = (0..set.rows.len())
        .map(|row| {
            set.columns
                .iter()
                .map(|col| set.cell(row, col).to_string().replace('\n', " "))
                .collect()
        })
        .collect();
    let widths: Vec<usize> = set
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let separator = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let line = |values: &[String]| {
        values
            .iter()
            .zip(widths.iter().copied())
            .map(|(value, width)| format!(" {value:<width$} "))
            .collect::<Vec<_>>()
            .join("|")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(set.columns.as_slice()));
    out.push_str(&separator);
    for row in &cells {
        out.push('\n');
        out.push_str(&line(row.as_slice()));
    }
    out
}

pub fn render_table_detail(name: &str, detail: &TableDetailResponse) -> String {
    if !detail.success {
        let message = detail.error.as_deref().unwrap_or("Unknown error");
        return format!("Error: {message}");
    }
    let mut out = format!("Table {name}\n");
    for column in &detail.columns {
        let _ = writeln!(out, "  {:<24} {}", column.name, column.data_type);
    }
    let sample = detail.sample_set();
    if sample.is_empty() {
        out.push_str("\n(no sample rows)");
    } else {
        let _ = write!(out, "\n{}", render_table(&sample));
    }
    out
}

pub fn render_tables(tables: &[String]) -> String {
    if tables.is_empty() {
        return "No tables".to_string();
    }
    tables
        .iter()
        .map(|t| format!("  {t}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "History is empty".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let when = entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
            format!("{:>2}. [{when}] {}", i + 1, entry.query)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_log(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return "No log entries".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            let kind = entry.kind().unwrap_or("-");
            format!(
                "{} {:<5} {} [{kind}] {}",
                entry.timestamp.with_timezone(&Local).format("%H:%M:%S%.3f"),
                entry.level,
                entry.message,
                entry.correlation_id,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
