//! Cell and table normalization.
//!
//! The backend returns tables in several shapes depending on the endpoint
//! and its version. Everything is reconciled here into one renderable
//! contract: a title, a column list, and rows whose `values` length always
//! equals `columns.len() - 1` (the first column is the row-label column).
//! Every cell is a rendered string; malformed input degrades to
//! placeholders ("-", "Row N", "Column N") instead of failing the render.
//!
//! [`render_cell_value`] is total over arbitrary JSON. The precedence
//! ladder is checked in order and the first applicable rule wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder for empty/unrenderable cells.
pub const EMPTY_CELL: &str = "-";

/// Max rendered length for one string field inside a JSON fallback.
const FIELD_TRUNCATE: usize = 120;
/// Max overall length for a JSON fallback rendering.
const CELL_TRUNCATE: usize = 160;

/// Canonical table structure consumed by presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<NormalizedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub label: String,
    pub values: Vec<String>,
}

/// Render an arbitrary JSON value as a display string. Total: never fails,
/// never returns anything but a string.
pub fn render_cell_value(value: &Value) -> String {
    match value {
        Value::Null => EMPTY_CELL.to_string(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                EMPTY_CELL.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "O".to_string(),
        Value::Bool(false) => "X".to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(render_cell_value)
                .filter(|s| s != EMPTY_CELL)
                .collect();
            if parts.is_empty() {
                EMPTY_CELL.to_string()
            } else {
                parts.join(", ")
            }
        }
        Value::Object(_) => render_object(value),
    }
}

/// Object rendering, tried in order: display field, value+unit, amount,
/// composite amount structure, insurer field, JSON fallback.
fn render_object(value: &Value) -> String {
    // (a) Direct display field.
    for key in ["text", "display", "label", "name", "title", "value_text"] {
        if let Some(s) = value.get(key).and_then(Value::as_str) {
            if !s.trim().is_empty() {
                return s.trim().to_string();
            }
        }
    }

    // (b) value + optional unit.
    if let Some(v) = value.get("value") {
        if !v.is_null() {
            let rendered = render_cell_value(v);
            if let Some(unit) = value.get("unit").and_then(Value::as_str) {
                if !unit.trim().is_empty() {
                    return format!("{} {}", rendered, unit.trim());
                }
            }
            return rendered;
        }
    }

    // (c) amount (+ currency/unit), comma-grouped from 10,000 up.
    if let Some(amount) = value.get("amount") {
        if let Some(rendered) = render_amount(amount) {
            let suffix = value
                .get("currency")
                .or_else(|| value.get("unit"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty());
            return match suffix {
                Some(s) => format!("{} {}", rendered, s),
                None => rendered,
            };
        }
    }

    // (d) Composite amount structure: payment_type | conditions | limit.
    if value.get("payment_type").is_some()
        || value.get("conditions").is_some()
        || value.get("limit").is_some()
    {
        let rendered = render_amount_structure(value);
        if rendered != EMPTY_CELL {
            return rendered;
        }
    }

    // (e) Insurer-like field.
    for key in ["insurer", "insurer_name", "insurer_key", "company"] {
        if let Some(s) = value.get(key).and_then(Value::as_str) {
            if !s.trim().is_empty() {
                return s.trim().to_string();
            }
        }
    }

    // (f) Fallback: truncated JSON.
    render_json_fallback(value)
}

fn render_amount(amount: &Value) -> Option<String> {
    let n = amount.as_f64()?;
    if !n.is_finite() {
        return None;
    }
    if n.abs() >= 10_000.0 && n.fract() == 0.0 {
        Some(group_thousands(n as i64))
    } else if n.fract() == 0.0 {
        Some(format!("{}", n as i64))
    } else {
        Some(format!("{}", n))
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// payment_type, conditions (array or string), limit (object or string),
/// joined with " | ".
fn render_amount_structure(value: &Value) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(s) = value.get("payment_type").and_then(Value::as_str) {
        if !s.trim().is_empty() {
            parts.push(s.trim().to_string());
        }
    }

    match value.get("conditions") {
        Some(Value::Array(items)) => {
            let joined: Vec<String> = items
                .iter()
                .map(render_cell_value)
                .filter(|s| s != EMPTY_CELL)
                .collect();
            if !joined.is_empty() {
                parts.push(joined.join(", "));
            }
        }
        Some(Value::String(s)) if !s.trim().is_empty() => parts.push(s.trim().to_string()),
        _ => {}
    }

    match value.get("limit") {
        Some(Value::Object(limit)) => {
            let mut limit_parts: Vec<String> = Vec::new();
            if let Some(count) = limit.get("count") {
                if !count.is_null() {
                    limit_parts.push(format!("{}회", render_cell_value(count)));
                }
            }
            if let Some(period) = limit.get("period").and_then(Value::as_str) {
                if !period.trim().is_empty() {
                    limit_parts.push(period.trim().to_string());
                }
            }
            if !limit_parts.is_empty() {
                parts.push(limit_parts.join(" "));
            }
        }
        Some(Value::String(s)) if !s.trim().is_empty() => parts.push(s.trim().to_string()),
        _ => {}
    }

    if parts.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        parts.join(" | ")
    }
}

fn render_json_fallback(value: &Value) -> String {
    let compact = truncate_string_fields(value);
    let rendered = compact.to_string();
    let chars: Vec<char> = rendered.chars().collect();
    if chars.len() > CELL_TRUNCATE {
        let cut: String = chars[..CELL_TRUNCATE].iter().collect();
        format!("{}...", cut)
    } else {
        rendered
    }
}

fn truncate_string_fields(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            if chars.len() > FIELD_TRUNCATE {
                Value::String(chars[..FIELD_TRUNCATE].iter().collect())
            } else {
                value.clone()
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(truncate_string_fields).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_string_fields(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// The row shapes the backend is known to produce. Classified first so each
/// shape has its own adapter and the fallback is explicit, not the tail of
/// a probe chain.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowShape {
    /// `{cells: [label, v1, v2, ...]}`
    Cells(Vec<Value>),
    /// `{label, values}`
    LabelValues(Value, Vec<Value>),
    /// `[label, v1, v2, ...]`
    BareArray(Vec<Value>),
    /// `{label}` with no values at all.
    LabelOnly(Value),
    Malformed,
}

fn classify_row(row: &Value) -> RowShape {
    if let Some(cells) = row.get("cells").and_then(Value::as_array) {
        return RowShape::Cells(cells.clone());
    }
    if let Some(label) = row.get("label") {
        if let Some(values) = row.get("values").and_then(Value::as_array) {
            return RowShape::LabelValues(label.clone(), values.clone());
        }
        return RowShape::LabelOnly(label.clone());
    }
    if let Some(items) = row.as_array() {
        return RowShape::BareArray(items.clone());
    }
    RowShape::Malformed
}

/// Normalize one backend table section into the canonical structure.
///
/// Guarantees: every row has exactly `columns.len() - 1` values; every
/// label and value is a rendered string. Unrecognized rows become
/// `"Row N"` with placeholder values.
pub fn normalize_table_section(section: &Value) -> NormalizedTable {
    let title = section
        .get("title")
        .map(render_cell_value)
        .filter(|t| t != EMPTY_CELL)
        .unwrap_or_default();

    let raw_columns = section
        .get("columns")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let raw_rows = section
        .get("rows")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    // Column labels go through the same coercion as cells, with an
    // index-based fallback. A section with no columns at all gets a header
    // wide enough for its widest row.
    let mut columns: Vec<String> = raw_columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let rendered = render_cell_value(c);
            if rendered == EMPTY_CELL {
                format!("Column {}", i + 1)
            } else {
                rendered
            }
        })
        .collect();

    if columns.is_empty() {
        let width = raw_rows.iter().map(row_width).max().unwrap_or(0);
        columns = (0..width).map(|i| format!("Column {}", i + 1)).collect();
    }

    let value_count = columns.len().saturating_sub(1);
    let rows: Vec<NormalizedRow> = raw_rows
        .iter()
        .enumerate()
        .map(|(i, row)| adapt_row(row, i, value_count))
        .collect();

    NormalizedTable { title, columns, rows }
}

/// Total width (label column included) a row would occupy.
fn row_width(row: &Value) -> usize {
    match classify_row(row) {
        RowShape::Cells(cells) => cells.len(),
        RowShape::LabelValues(_, values) => values.len() + 1,
        RowShape::BareArray(items) => items.len(),
        RowShape::LabelOnly(_) => 1,
        RowShape::Malformed => 0,
    }
}

fn adapt_row(row: &Value, index: usize, value_count: usize) -> NormalizedRow {
    let (label, values) = match classify_row(row) {
        RowShape::Cells(cells) => {
            let label = cells.first().map(render_cell_value);
            let values = cells.iter().skip(1).map(render_cell_value).collect();
            (label, values)
        }
        RowShape::LabelValues(label, values) => (
            Some(render_cell_value(&label)),
            values.iter().map(render_cell_value).collect(),
        ),
        RowShape::BareArray(items) => {
            let label = items.first().map(render_cell_value);
            let values = items.iter().skip(1).map(render_cell_value).collect();
            (label, values)
        }
        RowShape::LabelOnly(label) => (Some(render_cell_value(&label)), Vec::new()),
        RowShape::Malformed => (None, Vec::new()),
    };

    let label = match label {
        Some(l) if l != EMPTY_CELL => l,
        _ => format!("Row {}", index + 1),
    };

    // Pad short rows, truncate long ones; resize does both.
    let mut values: Vec<String> = values;
    values.resize(value_count, EMPTY_CELL.to_string());

    NormalizedRow { label, values }
}
