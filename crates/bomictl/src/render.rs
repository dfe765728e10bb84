//! Terminal rendering for normalized tables and view models.
//!
//! Everything arriving here is already a plain string (the normalizer
//! guarantees it), so rendering is pure layout: box-drawn tables with
//! display-width-aware padding (Korean text is double-width) and colored
//! headers.

use console::measure_text_width;
use owo_colors::OwoColorize;

use bomi_common::table::NormalizedTable;
use bomi_common::view::AssistantMessageVm;

/// Pad a cell to a target display width (not char count; Hangul is wide).
fn pad(text: &str, width: usize) -> String {
    let current = measure_text_width(text);
    let padding = width.saturating_sub(current);
    format!("{}{}", text, " ".repeat(padding))
}

/// Render one normalized table with box-drawing borders.
pub fn render_table(table: &NormalizedTable) -> String {
    let mut widths: Vec<usize> = table
        .columns
        .iter()
        .map(|c| measure_text_width(c))
        .collect();
    for row in &table.rows {
        if !widths.is_empty() {
            widths[0] = widths[0].max(measure_text_width(&row.label));
        }
        for (i, value) in row.values.iter().enumerate() {
            if i + 1 < widths.len() {
                widths[i + 1] = widths[i + 1].max(measure_text_width(value));
            }
        }
    }

    let mut lines = Vec::new();
    if !table.title.is_empty() {
        lines.push(format!("{}", table.title.bold()));
    }
    if widths.is_empty() {
        return lines.join("\n");
    }

    let separator = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    lines.push(separator.clone());
    let header = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!(" {} ", pad(c, widths[i])))
        .collect::<Vec<_>>()
        .join("|");
    lines.push(format!("|{}|", header));
    lines.push(separator.clone());

    for row in &table.rows {
        let mut cells = vec![format!(" {} ", pad(&row.label, widths[0]))];
        for (i, value) in row.values.iter().enumerate() {
            cells.push(format!(" {} ", pad(value, widths[i + 1])));
        }
        lines.push(format!("|{}|", cells.join("|")));
    }
    lines.push(separator);

    lines.join("\n")
}

/// Render an assistant answer for the terminal.
pub fn render_vm(vm: &AssistantMessageVm) -> String {
    match vm {
        AssistantMessageVm::Q1 { view_model } => {
            let mut out = vec![format!("{}", view_model.title.cyan().bold())];
            out.push(render_table(&view_model.table));
            out.join("\n")
        }
        AssistantMessageVm::Report {
            title,
            summary_bullets,
            sections,
            ..
        } => {
            let mut out = vec![format!("{}", title.cyan().bold())];
            for bullet in summary_bullets {
                out.push(format!("  • {}", bullet));
            }
            for section in sections {
                out.push(String::new());
                out.push(render_table(section));
            }
            out.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomi_common::table::{NormalizedRow, NormalizedTable};

    fn sample_table() -> NormalizedTable {
        NormalizedTable {
            title: "보장한도".to_string(),
            columns: vec!["담보".to_string(), "삼성".to_string(), "메리츠".to_string()],
            rows: vec![
                NormalizedRow {
                    label: "암진단비".to_string(),
                    values: vec!["3,000".to_string(), "5,000".to_string()],
                },
                NormalizedRow {
                    label: "암수술비".to_string(),
                    values: vec!["1,000".to_string(), "-".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_render_table_contains_all_cells() {
        let rendered = render_table(&sample_table());
        for needle in ["담보", "삼성", "메리츠", "암진단비", "3,000", "-"] {
            assert!(rendered.contains(needle), "missing {}", needle);
        }
    }

    #[test]
    fn test_render_table_rows_align() {
        let rendered = render_table(&sample_table());
        let body_lines: Vec<&str> = rendered
            .lines()
            .filter(|l| l.starts_with('|'))
            .collect();
        // Header + 2 rows, all the same display width.
        assert_eq!(body_lines.len(), 3);
        let width = measure_text_width(body_lines[0]);
        for line in &body_lines {
            assert_eq!(measure_text_width(line), width);
        }
    }

    #[test]
    fn test_render_empty_table() {
        let table = NormalizedTable {
            title: String::new(),
            columns: vec![],
            rows: vec![],
        };
        assert_eq!(render_table(&table), "");
    }
}
