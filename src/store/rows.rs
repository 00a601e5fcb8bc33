//! Conversion between sheet cells and inventory items
//!
//! Row 1 is the header `name, spec, qty`; every later row is one item.
//! Columns are located by header name when reading and written in header
//! order.

use serde_json::Value;

use super::error::LoadError;
use crate::inventory::Item;

pub const HEADER: [&str; 3] = ["name", "spec", "qty"];

/// Parse the sheet's cell grid into items.
///
/// A sheet without any rows is an empty inventory. Rows whose cells are all
/// blank are skipped; missing trailing cells read as empty.
pub fn parse_rows(rows: Vec<Vec<Value>>) -> Result<Vec<Item>, LoadError> {
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let header: Vec<String> = header.iter().map(cell_text).collect();
    let column = |name: &'static str| {
        header
            .iter()
            .position(|cell| cell == name)
            .ok_or(LoadError::MissingColumn(name))
    };
    let name_col = column("name")?;
    let spec_col = column("spec")?;
    let qty_col = column("qty")?;

    let mut items = Vec::new();
    for (offset, row) in rows.enumerate() {
        if row.iter().all(|cell| cell_text(cell).trim().is_empty()) {
            continue;
        }

        let cell = |col: usize| row.get(col).map(cell_text).unwrap_or_default();
        let qty_text = cell(qty_col);
        let qty = parse_qty(&qty_text).ok_or_else(|| LoadError::InvalidQuantity {
            // 1-based sheet row, counting the header
            row: offset + 2,
            value: qty_text.clone(),
        })?;

        items.push(Item {
            name: cell(name_col),
            spec: cell(spec_col),
            qty,
        });
    }

    Ok(items)
}

/// Header plus one row per item, `qty` as a number
pub fn encode_rows(items: &[Item]) -> Vec<Vec<Value>> {
    let mut rows = Vec::with_capacity(items.len() + 1);
    rows.push(HEADER.iter().map(|h| Value::from(*h)).collect());
    rows.extend(items.iter().map(|item| {
        vec![
            Value::from(item.name.as_str()),
            Value::from(item.spec.as_str()),
            Value::from(item.qty),
        ]
    }));
    rows
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
        other => other.to_string(),
    }
}

/// Blank reads as 0; integral floats ("12.0") are accepted if they fit in i64.
fn parse_qty(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0);
    }
    if let Ok(qty) = text.parse::<i64>() {
        return Some(qty);
    }
    text.parse::<f64>()
        .ok()
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        .filter(|qty| qty.fract() == 0.0 && *qty >= i64::MIN as f64 && *qty < i64::MAX as f64)
        .map(|qty| qty as i64)
}
