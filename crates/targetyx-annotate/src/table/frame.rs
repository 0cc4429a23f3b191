//! Reference frame: one flat row per target.
//!
//! Each source object is flattened by joining nested object keys with `.`
//! and prefixing the source's column tag, so `knownDrugs.rows` from Open
//! Targets becomes `OT_knownDrugs.rows`. Arrays, scalars and `null` are
//! leaves; empty objects contribute no column.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::record::{AnnotationRecord, Field, SourceName};

#[derive(Debug, Clone, Default)]
pub struct RefFrame {
    targets: Vec<String>,
    columns: Vec<String>,
    rows: Vec<HashMap<String, Value>>,
}

impl RefFrame {
    pub fn from_record(record: &AnnotationRecord) -> Self {
        let mut frame = RefFrame::default();
        for (target, entry) in record.iter() {
            let mut row = HashMap::new();
            for source in SourceName::ALL {
                if let Value::Object(obj) = entry.source(source) {
                    flatten_into(obj, source.column_prefix(), &mut row, &mut frame.columns);
                }
            }
            frame.targets.push(target.to_string());
            frame.rows.push(row);
        }
        frame
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Column names in first-seen order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn field(&self, row: usize, column: &str) -> Field<'_> {
        Field::of(self.rows.get(row).and_then(|r| r.get(column)))
    }

    /// Non-null values of `column`, by row index.
    pub fn present<'a>(&'a self, column: &'a str) -> impl Iterator<Item = (usize, &'a Value)> + 'a {
        (0..self.len()).filter_map(move |i| self.field(i, column).value().map(|v| (i, v)))
    }
}

fn flatten_into(
    obj: &Map<String, Value>,
    path: &str,
    row: &mut HashMap<String, Value>,
    columns: &mut Vec<String>,
) {
    for (key, value) in obj {
        let column = format!("{}{}", path, key);
        match value {
            Value::Object(inner) => flatten_into(inner, &format!("{}.", column), row, columns),
            leaf => {
                if !columns.contains(&column) {
                    columns.push(column.clone());
                }
                row.insert(column, leaf.clone());
            }
        }
    }
}
