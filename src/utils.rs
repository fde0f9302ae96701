//! # Console Helpers
//!
//! Small formatting helpers for command output that is printed to the
//! terminal rather than written into a run directory.
//!
//! ## Usage Examples
//!
//! ```rust
//! use kafka_perf_report::utils::{column_widths, format_table_row};
//!
//! let rows = vec![vec!["run-a".to_string(), "complete".to_string()]];
//! let widths = column_widths(&["Run", "Status"], &rows);
//! assert_eq!(widths, vec![5, 8]);
//! assert_eq!(format_table_row(&["Run", "Status"], &widths), "| Run   | Status   |");
//! ```

/// Column widths wide enough for the header and every row
pub fn column_widths(header: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

/// Format one table row
///
/// Columns are left-aligned and padded to `widths`; a missing width falls
/// back to 10 characters.
pub fn format_table_row(columns: &[&str], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        line.push_str(&format!(" {:width$} |", column, width = width));
    }
    line
}

/// Format a table separator
///
/// ```text
/// +-------+----------+
/// | Run   | Status   |
/// +-------+----------+
/// ```
pub fn format_table_separator(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for &width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    println!("{}", format_table_row(columns, widths));
}

pub fn print_table_separator(widths: &[usize]) {
    println!("{}", format_table_separator(widths));
}

/// Print a header and rows as a bordered table.
pub fn print_table(header: &[&str], rows: &[Vec<String>]) {
    let widths = column_widths(header, rows);
    print_table_separator(&widths);
    print_table_row(header, &widths);
    print_table_separator(&widths);
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        print_table_row(&cells, &widths);
    }
    print_table_separator(&widths);
}
